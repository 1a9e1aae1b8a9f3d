//! Recursive-descent parser for normalized GoType tokens.
//!
//! Dispatch is on the current token, with one token of lookahead to tell
//! declarations, manipulations and calls apart. Optional continuations
//! (`elif`/`else` after an `if`, a call vs. a literal on the right of a
//! declaration) are probed after taking a `Checkpoint` and undone with
//! `rewind` when they do not match.

use tracing::{debug, trace};

use crate::ast::{
    Block, Branch, Call, Comparison, Declaration, Expression, ForRange, FunctionDef, IfChain,
    Import, Manipulation, Param, Program, Return, Statement, Terminal, Value, While,
};
use crate::diagnostic::Diagnostic;
use crate::error::CoreError;
use crate::lexer::{Token, TokenKind};

/// Module that every program has to import first.
pub const RUNTIME_MODULE: &str = "GoType";

const MISSING_IMPORT: &str = "source should start with \"from GoType import *\"";

const LITERALS: &[TokenKind] = &[
    TokenKind::BoolLiteral,
    TokenKind::IntLiteral,
    TokenKind::StringLiteral,
    TokenKind::NullLiteral,
];

const OPERANDS: &[TokenKind] = &[
    TokenKind::Identifier,
    TokenKind::BoolLiteral,
    TokenKind::IntLiteral,
    TokenKind::StringLiteral,
    TokenKind::NullLiteral,
];

const BOUNDS: &[TokenKind] = &[TokenKind::IntLiteral, TokenKind::Identifier];

const CALLEES: &[TokenKind] = &[TokenKind::Identifier, TokenKind::Print];

/// Parse a normalized token stream into a `Program`.
pub fn parse(tokens: Vec<Token>) -> Result<Program, CoreError> {
    let mut parser = Parser::new(tokens);
    let program = parser.program()?;
    debug!(
        statements = program.body.len(),
        functions = program.functions.len(),
        "parsed program"
    );
    Ok(program)
}

/// Saved cursor position for speculative parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint(usize);

struct Parser {
    tokens: Vec<Token>,
    position: usize,
    trail: Vec<&'static str>,
    functions: Vec<FunctionDef>,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Parser {
            tokens,
            position: 0,
            trail: vec!["parse"],
            functions: Vec::new(),
        }
    }

    // -----------------------------------------------------------------
    // Productions
    // -----------------------------------------------------------------

    fn program(&mut self) -> Result<Program, CoreError> {
        self.production("program", |p| {
            p.skip_newlines();
            let import = p.import_clause()?;
            p.expect_statement_end()?;

            let mut body = Vec::new();
            loop {
                p.skip_newlines();
                match p.current_kind() {
                    None => break,
                    Some(TokenKind::CloseBlock) => {
                        return Err(p.error("unexpected end of block outside any block"));
                    }
                    Some(_) => body.push(p.terminated_statement()?),
                }
            }

            Ok(Program {
                import,
                body,
                functions: std::mem::take(&mut p.functions),
            })
        })
    }

    fn import_clause(&mut self) -> Result<Import, CoreError> {
        self.production("import", |p| {
            let line = p.current_line();
            let import = match p.current_kind() {
                Some(TokenKind::Import) => {
                    p.advance();
                    let module = p.expect(TokenKind::Identifier)?;
                    Import {
                        module,
                        item: None,
                        line,
                    }
                }
                Some(TokenKind::From) => {
                    p.advance();
                    let module = p.expect(TokenKind::Identifier)?;
                    p.expect(TokenKind::Import)?;
                    let item = p.expect_one_of(&[TokenKind::Star, TokenKind::Identifier])?;
                    Import {
                        module,
                        item: Some(item),
                        line,
                    }
                }
                _ => return Err(p.error(MISSING_IMPORT)),
            };

            if import.module.lexeme != RUNTIME_MODULE {
                return Err(p.error_at(import.module.line, MISSING_IMPORT));
            }
            Ok(import)
        })
    }

    /// A statement followed by whatever must come after it: a newline, a
    /// close marker or end of input for simple statements; nothing for
    /// statements that end in a block.
    fn terminated_statement(&mut self) -> Result<Statement, CoreError> {
        let statement = self.statement()?;
        if !statement.ends_with_block() {
            self.expect_statement_end()?;
        }
        Ok(statement)
    }

    fn statement(&mut self) -> Result<Statement, CoreError> {
        self.production("statement", |p| match p.current_kind() {
            Some(TokenKind::For) => p.for_range().map(Statement::For),
            Some(TokenKind::While) => p.while_loop().map(Statement::While),
            Some(TokenKind::If) => p.if_chain().map(Statement::If),
            Some(TokenKind::Def) => p.function(),
            Some(TokenKind::Return) => p.return_statement().map(Statement::Return),
            Some(TokenKind::Print) => p.call().map(Statement::Call),
            Some(TokenKind::Identifier) => match p.peek_kind() {
                Some(TokenKind::Colon) => p.declaration().map(Statement::Declaration),
                Some(TokenKind::Assign) => p.manipulation().map(Statement::Manipulation),
                Some(TokenKind::LParen) => p.call().map(Statement::Call),
                _ => {
                    p.advance();
                    Err(p.unexpected(&[TokenKind::Colon, TokenKind::Assign, TokenKind::LParen]))
                }
            },
            Some(TokenKind::Import | TokenKind::From) => {
                Err(p.error("the import clause must be the first statement"))
            }
            _ => Err(p.error(format!("expected a statement, got {}", p.describe_current()))),
        })
    }

    /// `":" NEWLINE statements CLOSE`
    fn block(&mut self) -> Result<Block, CoreError> {
        self.production("block", |p| {
            let line = p.current_line();
            p.expect(TokenKind::Colon)?;
            p.expect(TokenKind::Newline)?;

            let mut statements = Vec::new();
            loop {
                p.skip_newlines();
                match p.current_kind() {
                    Some(TokenKind::CloseBlock) => {
                        if statements.is_empty() {
                            return Err(p.error("expected an indented block"));
                        }
                        p.advance();
                        break;
                    }
                    None => return Err(p.error("unterminated block")),
                    Some(_) => statements.push(p.terminated_statement()?),
                }
            }

            Ok(Block { statements, line })
        })
    }

    fn for_range(&mut self) -> Result<ForRange, CoreError> {
        self.production("for", |p| {
            let keyword = p.expect(TokenKind::For)?;
            let variable = p.expect(TokenKind::Identifier)?;
            p.expect(TokenKind::In)?;
            p.expect(TokenKind::Range)?;
            p.expect(TokenKind::LParen)?;
            let start = p.expect_one_of(BOUNDS)?;
            p.expect(TokenKind::Comma)?;
            let end = p.expect_one_of(BOUNDS)?;
            p.expect(TokenKind::RParen)?;
            let body = p.block()?;
            Ok(ForRange {
                keyword,
                variable,
                start,
                end,
                body,
            })
        })
    }

    fn while_loop(&mut self) -> Result<While, CoreError> {
        self.production("while", |p| {
            let keyword = p.expect(TokenKind::While)?;
            let condition = p.comparison()?;
            let body = p.block()?;
            Ok(While {
                keyword,
                condition,
                body,
            })
        })
    }

    fn if_chain(&mut self) -> Result<IfChain, CoreError> {
        self.production("if", |p| {
            let mut branches = vec![p.branch(TokenKind::If)?];
            let mut otherwise = None;

            loop {
                let checkpoint = p.checkpoint();
                p.skip_newlines();
                match p.current_kind() {
                    Some(TokenKind::Elif) => branches.push(p.branch(TokenKind::Elif)?),
                    Some(TokenKind::Else) => {
                        p.advance();
                        otherwise = Some(p.block()?);
                        break;
                    }
                    _ => {
                        p.rewind(checkpoint);
                        break;
                    }
                }
            }

            Ok(IfChain {
                branches,
                otherwise,
            })
        })
    }

    fn branch(&mut self, keyword: TokenKind) -> Result<Branch, CoreError> {
        let keyword = self.expect(keyword)?;
        let condition = self.comparison()?;
        let body = self.block()?;
        Ok(Branch {
            keyword,
            condition,
            body,
        })
    }

    fn declaration(&mut self) -> Result<Declaration, CoreError> {
        self.production("declaration", |p| {
            let name = p.expect(TokenKind::Identifier)?;
            p.expect(TokenKind::Colon)?;
            let ty = p.expect(TokenKind::Identifier)?;
            p.expect(TokenKind::Assign)?;

            let call_shaped = p.at_call();
            let checkpoint = p.checkpoint();
            let value = match p.call() {
                Ok(call) => Value::Call(call),
                Err(err) if call_shaped => return Err(err),
                Err(err) => {
                    trace!(%err, "declaration value is not a call");
                    p.rewind(checkpoint);
                    Value::Terminal(p.expect_one_of(LITERALS)?)
                }
            };

            Ok(Declaration { name, ty, value })
        })
    }

    fn manipulation(&mut self) -> Result<Manipulation, CoreError> {
        self.production("manipulation", |p| {
            let target = p.expect(TokenKind::Identifier)?;
            p.expect(TokenKind::Assign)?;
            let value = p.expression()?;
            Ok(Manipulation { target, value })
        })
    }

    fn call(&mut self) -> Result<Call, CoreError> {
        self.production("call", |p| {
            let callee = p.expect_one_of(CALLEES)?;
            p.expect(TokenKind::LParen)?;

            let mut arguments = Vec::new();
            if p.current_kind() != Some(TokenKind::RParen) {
                loop {
                    arguments.push(p.argument()?);
                    if p.current_kind() == Some(TokenKind::Comma) {
                        p.advance();
                    } else {
                        break;
                    }
                }
            }
            p.expect(TokenKind::RParen)?;

            Ok(Call { callee, arguments })
        })
    }

    fn argument(&mut self) -> Result<Value, CoreError> {
        if self.at_call() {
            self.call().map(Value::Call)
        } else {
            self.expect_one_of(OPERANDS).map(Value::Terminal)
        }
    }

    /// Parses a definition, records it in the hoisted function list and
    /// returns the placeholder left at its position.
    fn function(&mut self) -> Result<Statement, CoreError> {
        self.production("function", |p| {
            let keyword = p.expect(TokenKind::Def)?;
            let name = p.expect(TokenKind::Identifier)?;
            p.expect(TokenKind::LParen)?;

            let mut params = Vec::new();
            if p.current_kind() != Some(TokenKind::RParen) {
                loop {
                    let name = p.expect(TokenKind::Identifier)?;
                    p.expect(TokenKind::Colon)?;
                    let ty = p.expect(TokenKind::Identifier)?;
                    params.push(Param { name, ty });
                    if p.current_kind() == Some(TokenKind::Comma) {
                        p.advance();
                    } else {
                        break;
                    }
                }
            }
            p.expect(TokenKind::RParen)?;

            let returns = if p.current_kind() == Some(TokenKind::Arrow) {
                p.advance();
                let ty = p.expect_one_of(&[TokenKind::Identifier, TokenKind::NullLiteral])?;
                ty.is_identifier().then_some(ty)
            } else {
                None
            };

            let body = p.block()?;
            let line = keyword.line;
            let index = p.functions.len();
            trace!(name = %name.lexeme, index, "hoisted function");
            p.functions.push(FunctionDef {
                keyword,
                name,
                params,
                returns,
                body,
            });

            Ok(Statement::HoistedFunction { index, line })
        })
    }

    fn return_statement(&mut self) -> Result<Return, CoreError> {
        self.production("return", |p| {
            let keyword = p.expect(TokenKind::Return)?;
            let value = p.expect_one_of(OPERANDS)?;
            Ok(Return { keyword, value })
        })
    }

    fn expression(&mut self) -> Result<Expression, CoreError> {
        self.production("expression", |p| {
            let left = p.expect_one_of(OPERANDS)?;
            let tail = match p.current_kind() {
                Some(kind) if kind.is_math_operator() => {
                    let operator = p.take();
                    let right = p.expect_one_of(OPERANDS)?;
                    Some((operator, right))
                }
                _ => None,
            };
            Ok(Expression { left, tail })
        })
    }

    fn comparison(&mut self) -> Result<Comparison, CoreError> {
        self.production("comparison", |p| {
            let left = p.expression()?;
            let tail = match p.current_kind() {
                Some(kind) if kind.is_comparator() => {
                    let comparator = p.take();
                    let right = p.expression()?;
                    Some((comparator, right))
                }
                _ => None,
            };
            Ok(Comparison { left, tail })
        })
    }

    // -----------------------------------------------------------------
    // Cursor helpers
    // -----------------------------------------------------------------

    fn production<T>(
        &mut self,
        name: &'static str,
        parse: impl FnOnce(&mut Self) -> Result<T, CoreError>,
    ) -> Result<T, CoreError> {
        self.trail.push(name);
        let result = parse(self);
        self.trail.pop();
        result
    }

    /// A callee followed by `(`.
    fn at_call(&self) -> bool {
        matches!(self.current_kind(), Some(kind) if CALLEES.contains(&kind))
            && self.peek_kind() == Some(TokenKind::LParen)
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint(self.position)
    }

    fn rewind(&mut self, checkpoint: Checkpoint) {
        trace!(from = self.position, to = checkpoint.0, "rewinding parser");
        self.position = checkpoint.0;
    }

    fn current(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn current_kind(&self) -> Option<TokenKind> {
        self.current().map(|token| token.kind)
    }

    fn peek_kind(&self) -> Option<TokenKind> {
        self.tokens.get(self.position + 1).map(|token| token.kind)
    }

    fn current_line(&self) -> usize {
        self.current()
            .or_else(|| self.tokens.last())
            .map_or(1, |token| token.line)
    }

    fn advance(&mut self) {
        if self.position < self.tokens.len() {
            self.position += 1;
        }
    }

    /// Consume the current token. Callers check that one exists.
    fn take(&mut self) -> Terminal {
        let terminal = self
            .current()
            .cloned()
            .map(Terminal::from)
            .unwrap_or_else(|| Terminal::new(TokenKind::Illegal, "", self.current_line()));
        self.advance();
        terminal
    }

    fn skip_newlines(&mut self) {
        while self.current_kind() == Some(TokenKind::Newline) {
            self.advance();
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Terminal, CoreError> {
        self.expect_one_of(&[kind])
    }

    fn expect_one_of(&mut self, kinds: &[TokenKind]) -> Result<Terminal, CoreError> {
        match self.current_kind() {
            Some(kind) if kinds.contains(&kind) => Ok(self.take()),
            _ => Err(self.unexpected(kinds)),
        }
    }

    fn expect_statement_end(&mut self) -> Result<(), CoreError> {
        match self.current_kind() {
            None | Some(TokenKind::Newline | TokenKind::CloseBlock) => Ok(()),
            Some(_) => Err(self.error(format!(
                "expected end of line, got {}",
                self.describe_current()
            ))),
        }
    }

    fn describe_current(&self) -> String {
        match self.current() {
            None => "end of input".to_string(),
            Some(token) => match token.kind {
                TokenKind::Newline | TokenKind::CloseBlock => token.kind.describe().to_string(),
                _ => format!("`{}`", token.lexeme),
            },
        }
    }

    fn unexpected(&self, expected: &[TokenKind]) -> CoreError {
        let expected = expected
            .iter()
            .map(|kind| kind.describe())
            .collect::<Vec<_>>()
            .join(" or ");
        self.error(format!("expected {expected}, got {}", self.describe_current()))
    }

    fn error(&self, message: impl Into<String>) -> CoreError {
        self.error_at(self.current_line(), message)
    }

    fn error_at(&self, line: usize, message: impl Into<String>) -> CoreError {
        CoreError::Parse(Diagnostic::new(&self.trail, line, message))
    }
}
