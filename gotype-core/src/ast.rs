//! Abstract syntax tree for GoType programs.
//!
//! Every grammar production has its own named-field node. Leaves that come
//! straight from the source (identifiers, literals, operators, keywords)
//! are `Terminal`s which keep their token kind so the emitter can render
//! them through its translation table.

use crate::lexer::{Token, TokenKind};

/// A leaf node: one source token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Terminal {
    pub kind: TokenKind,
    pub lexeme: String,
    pub line: usize,
}

impl Terminal {
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, line: usize) -> Self {
        Terminal {
            kind,
            lexeme: lexeme.into(),
            line,
        }
    }

    pub fn is_identifier(&self) -> bool {
        self.kind == TokenKind::Identifier
    }
}

impl From<Token> for Terminal {
    fn from(token: Token) -> Self {
        Terminal {
            kind: token.kind,
            lexeme: token.lexeme,
            line: token.line,
        }
    }
}

/// A parsed program.
///
/// The leading import clause is kept apart from `body`. Function
/// definitions are hoisted into `functions`; `body` holds a
/// `Statement::HoistedFunction` placeholder where each one was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    pub import: Import,
    pub body: Vec<Statement>,
    pub functions: Vec<FunctionDef>,
}

/// `import Module` or `from Module import item`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    pub module: Terminal,
    /// `None` for the `import Module` form; `*` or an identifier otherwise.
    pub item: Option<Terminal>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub statements: Vec<Statement>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    For(ForRange),
    While(While),
    If(IfChain),
    Declaration(Declaration),
    Manipulation(Manipulation),
    Call(Call),
    Return(Return),
    /// Position of a function definition moved to `Program::functions`.
    HoistedFunction { index: usize, line: usize },
}

impl Statement {
    pub fn line(&self) -> usize {
        match self {
            Statement::For(stmt) => stmt.keyword.line,
            Statement::While(stmt) => stmt.keyword.line,
            Statement::If(stmt) => stmt.branches.first().map_or(0, |branch| branch.keyword.line),
            Statement::Declaration(stmt) => stmt.name.line,
            Statement::Manipulation(stmt) => stmt.target.line,
            Statement::Call(call) => call.callee.line,
            Statement::Return(stmt) => stmt.keyword.line,
            Statement::HoistedFunction { line, .. } => *line,
        }
    }

    /// Statements whose last part is an indented block. They are
    /// terminated by the block's close marker instead of a newline.
    pub fn ends_with_block(&self) -> bool {
        matches!(
            self,
            Statement::For(_)
                | Statement::While(_)
                | Statement::If(_)
                | Statement::HoistedFunction { .. }
        )
    }
}

/// `for variable in range(start, end): body`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForRange {
    pub keyword: Terminal,
    pub variable: Terminal,
    /// Integer literal or identifier.
    pub start: Terminal,
    /// Integer literal or identifier.
    pub end: Terminal,
    pub body: Block,
}

/// `while condition: body`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct While {
    pub keyword: Terminal,
    pub condition: Comparison,
    pub body: Block,
}

/// An `if` with its `elif` branches and optional `else`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IfChain {
    /// The `if` branch first, then every `elif` in source order.
    pub branches: Vec<Branch>,
    pub otherwise: Option<Block>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branch {
    /// `if` or `elif`.
    pub keyword: Terminal,
    pub condition: Comparison,
    pub body: Block,
}

/// `name: ty = value`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub name: Terminal,
    pub ty: Terminal,
    pub value: Value,
}

/// `target = value`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manipulation {
    pub target: Terminal,
    pub value: Expression,
}

/// `callee(arguments...)`; the callee is an identifier or `print`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub callee: Terminal,
    pub arguments: Vec<Value>,
}

/// A declaration initializer or a call argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Terminal(Terminal),
    Call(Call),
}

impl Value {
    pub fn line(&self) -> usize {
        match self {
            Value::Terminal(terminal) => terminal.line,
            Value::Call(call) => call.callee.line,
        }
    }
}

/// `def name(params...) -> returns: body`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDef {
    pub keyword: Terminal,
    pub name: Terminal,
    pub params: Vec<Param>,
    /// `None` when the function returns nothing (`-> None` or no arrow).
    pub returns: Option<Terminal>,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: Terminal,
    pub ty: Terminal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Return {
    pub keyword: Terminal,
    pub value: Terminal,
}

/// `left` or `left operator right`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expression {
    pub left: Terminal,
    pub tail: Option<(Terminal, Terminal)>,
}

impl Expression {
    pub fn operands(&self) -> impl Iterator<Item = &Terminal> {
        std::iter::once(&self.left).chain(self.tail.as_ref().map(|(_, right)| right))
    }
}

/// `left` or `left comparator right`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparison {
    pub left: Expression,
    pub tail: Option<(Terminal, Expression)>,
}

impl Comparison {
    pub fn expressions(&self) -> impl Iterator<Item = &Expression> {
        std::iter::once(&self.left).chain(self.tail.as_ref().map(|(_, right)| right))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(name: &str) -> Terminal {
        Terminal::new(TokenKind::Identifier, name, 1)
    }

    #[test]
    fn expression_yields_one_or_two_operands() {
        let single = Expression {
            left: ident("a"),
            tail: None,
        };
        assert_eq!(single.operands().count(), 1);

        let binary = Expression {
            left: ident("a"),
            tail: Some((Terminal::new(TokenKind::Plus, "+", 1), ident("b"))),
        };
        let names: Vec<_> = binary.operands().map(|t| t.lexeme.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn compound_statements_end_with_a_block() {
        let call = Statement::Call(Call {
            callee: Terminal::new(TokenKind::Print, "print", 2),
            arguments: Vec::new(),
        });
        assert!(!call.ends_with_block());
        assert_eq!(call.line(), 2);
        assert!(Statement::HoistedFunction { index: 0, line: 1 }.ends_with_block());
    }
}
