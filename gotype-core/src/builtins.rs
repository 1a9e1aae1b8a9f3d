//! Built-in functions of the GoType dialect.
//!
//! Builtins are recognized by name in the lexer (they get their own token
//! kinds) and need no user definition. The analyzer takes their
//! signatures from this table.

use crate::lexer::TokenKind;
use crate::types::{ANY, Function, INT, NULL};

/// Metadata about a single builtin symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltinDescriptor {
    /// Name at the source level.
    pub name: &'static str,

    /// Token kind the lexer assigns to the name.
    pub token: TokenKind,

    /// Parameter types in declaration order.
    pub params: &'static [&'static str],

    /// Result type.
    pub returns: &'static str,
}

impl BuiltinDescriptor {
    /// Signature in the form the analyzer keeps for user functions.
    pub fn signature(&self) -> Function {
        Function::new(
            self.name,
            self.params.iter().map(|param| param.to_string()).collect(),
            self.returns,
        )
    }
}

/// The complete list of builtins known to the core.
pub const BUILTINS: &[BuiltinDescriptor] = &[
    BuiltinDescriptor {
        name: "print",
        token: TokenKind::Print,
        params: &[ANY],
        returns: NULL,
    },
    BuiltinDescriptor {
        name: "range",
        token: TokenKind::Range,
        params: &[INT, INT],
        returns: NULL,
    },
];

/// Look up a builtin by its source-level name.
pub fn find_builtin(name: &str) -> Option<&'static BuiltinDescriptor> {
    BUILTINS.iter().find(|builtin| builtin.name == name)
}

/// Look up a builtin by the token kind the lexer gave it.
pub fn builtin_for_token(kind: TokenKind) -> Option<&'static BuiltinDescriptor> {
    BUILTINS.iter().find(|builtin| builtin.token == kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn print_accepts_a_single_value_of_any_type() {
        let print = find_builtin("print").expect("print is a builtin");
        let signature = print.signature();
        assert_eq!(signature.params, vec!["any".to_string()]);
        assert_eq!(signature.returns, "null");
    }

    #[test]
    fn builtins_are_found_by_token_kind() {
        let range = builtin_for_token(TokenKind::Range).expect("range is a builtin");
        assert_eq!(range.name, "range");
        assert_eq!(range.params, &[INT, INT]);
        assert!(builtin_for_token(TokenKind::Identifier).is_none());
    }

    #[test]
    fn unknown_names_are_not_builtins() {
        assert!(find_builtin("len").is_none());
    }
}
