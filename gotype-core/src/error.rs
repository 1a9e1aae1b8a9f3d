use std::fmt;

use thiserror::Error;

use crate::diagnostic::Diagnostic;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("lex error: {0}")]
    Lex(Diagnostic),
    #[error("parse error: {0}")]
    Parse(Diagnostic),
    #[error("analysis error [{rule}]: {diagnostic}")]
    Analysis {
        rule: AnalysisRule,
        diagnostic: Diagnostic,
    },
    #[error("emission error: {0}")]
    Emission(Diagnostic),
}

impl CoreError {
    pub fn diagnostic(&self) -> &Diagnostic {
        match self {
            CoreError::Lex(diagnostic)
            | CoreError::Parse(diagnostic)
            | CoreError::Emission(diagnostic)
            | CoreError::Analysis { diagnostic, .. } => diagnostic,
        }
    }

    /// The analyzer rule that was violated, if this is an analysis error.
    pub fn rule(&self) -> Option<AnalysisRule> {
        match self {
            CoreError::Analysis { rule, .. } => Some(*rule),
            _ => None,
        }
    }
}

/// Static rules enforced by the analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisRule {
    /// Assignment to a variable that was never declared.
    UndeclaredManipulation,
    /// An identifier operand or argument that names no visible variable.
    UndeclaredReference,
    /// A call to a function that is neither user-defined nor a builtin.
    UndeclaredFunction,
    /// An argument whose static kind does not fit the parameter type.
    ArgumentType,
    /// A call with the wrong number of arguments.
    ArgumentCount,
    /// A declaration whose initializer does not fit the declared type.
    DeclarationType,
    /// A second declaration of a name in the same block.
    Redeclaration,
    /// A `return` in the program body rather than a function body.
    ReturnOutsideFunction,
}

impl fmt::Display for AnalysisRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AnalysisRule::UndeclaredManipulation => "undeclared-manipulation",
            AnalysisRule::UndeclaredReference => "undeclared-reference",
            AnalysisRule::UndeclaredFunction => "undeclared-function",
            AnalysisRule::ArgumentType => "argument-type",
            AnalysisRule::ArgumentCount => "argument-count",
            AnalysisRule::DeclarationType => "declaration-type",
            AnalysisRule::Redeclaration => "redeclaration",
            AnalysisRule::ReturnOutsideFunction => "return-outside-function",
        };
        f.write_str(name)
    }
}
