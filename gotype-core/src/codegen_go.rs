//! Go backend.
//!
//! Renders an analyzed `Program` as a single Go source file. Terminals go
//! through a fixed kind-to-text table; statements are laid out one per line
//! and indented with tabs like `gofmt` output.

use tracing::debug;

use crate::ast::{
    Block, Call, Comparison, Expression, ForRange, FunctionDef, IfChain, Program, Statement,
    Terminal, Value,
};
use crate::diagnostic::Diagnostic;
use crate::error::CoreError;
use crate::lexer::TokenKind;

pub const PREAMBLE: &str = "package main\n";

/// Kinds whose Go spelling differs from the source lexeme.
const TRANSLATION: &[(TokenKind, &str)] = &[
    (TokenKind::If, "if"),
    (TokenKind::Elif, "else if"),
    (TokenKind::Else, "else"),
    (TokenKind::While, "for"),
    (TokenKind::For, "for"),
    (TokenKind::Def, "func"),
    (TokenKind::Return, "return"),
    (TokenKind::Print, "println"),
    (TokenKind::Not, "!"),
    (TokenKind::And, "&&"),
    (TokenKind::Or, "||"),
    (TokenKind::NullLiteral, "nil"),
];

/// Kinds emitted as their original lexeme.
const PASS_THROUGH: &[TokenKind] = &[
    TokenKind::Identifier,
    TokenKind::IntLiteral,
    TokenKind::StringLiteral,
    TokenKind::Plus,
    TokenKind::Minus,
    TokenKind::Star,
    TokenKind::Slash,
    TokenKind::Percent,
    TokenKind::Equals,
    TokenKind::NotEquals,
    TokenKind::Greater,
    TokenKind::GreaterEquals,
    TokenKind::Less,
    TokenKind::LessEquals,
    TokenKind::LParen,
    TokenKind::RParen,
    TokenKind::LBracket,
    TokenKind::RBracket,
    TokenKind::LBrace,
    TokenKind::RBrace,
    TokenKind::Comma,
    TokenKind::Assign,
];

/// Generate Go source for `program`.
pub fn emit(program: &Program) -> Result<String, CoreError> {
    let mut emitter = GoEmitter::new(program);
    emitter.program()?;
    debug!(bytes = emitter.output.len(), "emitted go source");
    Ok(emitter.output)
}

/// Go spelling of a single terminal.
pub fn render(terminal: &Terminal) -> Option<String> {
    if let Some((_, text)) = TRANSLATION.iter().find(|(kind, _)| *kind == terminal.kind) {
        return Some((*text).to_string());
    }
    match terminal.kind {
        TokenKind::BoolLiteral => Some(terminal.lexeme.to_lowercase()),
        kind if PASS_THROUGH.contains(&kind) => Some(terminal.lexeme.clone()),
        _ => None,
    }
}

struct GoEmitter<'a> {
    program: &'a Program,
    output: String,
    depth: usize,
    trail: Vec<&'static str>,
}

impl<'a> GoEmitter<'a> {
    fn new(program: &'a Program) -> Self {
        GoEmitter {
            program,
            output: String::new(),
            depth: 0,
            trail: vec!["emit"],
        }
    }

    fn program(&mut self) -> Result<(), CoreError> {
        let program = self.program;
        self.output.push_str(PREAMBLE);

        for function in &program.functions {
            self.output.push('\n');
            self.step("function", |e| e.function(function))?;
        }

        self.output.push('\n');
        self.line("func main() {");
        self.indented(&program.body)?;
        self.line("}");
        Ok(())
    }

    fn function(&mut self, function: &FunctionDef) -> Result<(), CoreError> {
        let keyword = self.text(&function.keyword)?;
        let name = self.text(&function.name)?;
        let params = function
            .params
            .iter()
            .map(|param| Ok(format!("{} {}", self.text(&param.name)?, self.text(&param.ty)?)))
            .collect::<Result<Vec<_>, CoreError>>()?
            .join(", ");
        let returns = match &function.returns {
            Some(ty) => format!(" {}", self.text(ty)?),
            None => String::new(),
        };
        self.line(&format!("{keyword} {name}({params}){returns} {{"));
        self.block(&function.body)?;
        self.line("}");
        Ok(())
    }

    fn block(&mut self, block: &Block) -> Result<(), CoreError> {
        self.indented(&block.statements)
    }

    fn indented(&mut self, statements: &[Statement]) -> Result<(), CoreError> {
        self.depth += 1;
        let result = statements
            .iter()
            .try_for_each(|statement| self.statement(statement));
        self.depth -= 1;
        result
    }

    fn statement(&mut self, statement: &Statement) -> Result<(), CoreError> {
        match statement {
            Statement::Declaration(decl) => self.step("declaration", |e| {
                let name = e.text(&decl.name)?;
                let ty = e.text(&decl.ty)?;
                let value = e.value(&decl.value)?;
                e.line(&format!("var {name} {ty} = {value}"));
                Ok(())
            }),
            Statement::Manipulation(stmt) => self.step("manipulation", |e| {
                let target = e.text(&stmt.target)?;
                let value = e.expression(&stmt.value)?;
                e.line(&format!("{target} = {value}"));
                Ok(())
            }),
            Statement::Call(call) => self.step("call", |e| {
                let text = e.call(call)?;
                e.line(&text);
                Ok(())
            }),
            Statement::Return(stmt) => self.step("return", |e| {
                let keyword = e.text(&stmt.keyword)?;
                let value = e.text(&stmt.value)?;
                e.line(&format!("{keyword} {value}"));
                Ok(())
            }),
            Statement::For(stmt) => self.step("for", |e| e.for_range(stmt)),
            Statement::While(stmt) => self.step("while", |e| {
                let keyword = e.text(&stmt.keyword)?;
                let condition = e.comparison(&stmt.condition)?;
                e.line(&format!("{keyword} {condition} {{"));
                e.block(&stmt.body)?;
                e.line("}");
                Ok(())
            }),
            Statement::If(chain) => self.step("if", |e| e.if_chain(chain)),
            Statement::HoistedFunction { .. } => {
                self.output.push('\n');
                Ok(())
            }
        }
    }

    fn for_range(&mut self, stmt: &ForRange) -> Result<(), CoreError> {
        let keyword = self.text(&stmt.keyword)?;
        let var = self.text(&stmt.variable)?;
        let start = self.text(&stmt.start)?;
        let end = self.text(&stmt.end)?;
        self.line(&format!(
            "{keyword} {var} := {start}; {var} < {end}; {var}++ {{"
        ));
        self.block(&stmt.body)?;
        self.line("}");
        Ok(())
    }

    fn if_chain(&mut self, chain: &IfChain) -> Result<(), CoreError> {
        for (index, branch) in chain.branches.iter().enumerate() {
            let keyword = self.text(&branch.keyword)?;
            let condition = self.comparison(&branch.condition)?;
            if index == 0 {
                self.line(&format!("{keyword} {condition} {{"));
            } else {
                self.line(&format!("}} {keyword} {condition} {{"));
            }
            self.block(&branch.body)?;
        }
        if let Some(otherwise) = &chain.otherwise {
            self.line("} else {");
            self.block(otherwise)?;
        }
        self.line("}");
        Ok(())
    }

    fn call(&self, call: &Call) -> Result<String, CoreError> {
        let callee = self.text(&call.callee)?;
        let arguments = call
            .arguments
            .iter()
            .map(|argument| self.value(argument))
            .collect::<Result<Vec<_>, CoreError>>()?;
        Ok(format!("{callee}({})", arguments.join(", ")))
    }

    fn value(&self, value: &Value) -> Result<String, CoreError> {
        match value {
            Value::Terminal(terminal) => self.text(terminal),
            Value::Call(call) => self.call(call),
        }
    }

    fn expression(&self, expression: &Expression) -> Result<String, CoreError> {
        let left = self.text(&expression.left)?;
        match &expression.tail {
            Some((operator, right)) => Ok(format!(
                "{left} {} {}",
                self.text(operator)?,
                self.text(right)?
            )),
            None => Ok(left),
        }
    }

    fn comparison(&self, comparison: &Comparison) -> Result<String, CoreError> {
        let left = self.expression(&comparison.left)?;
        match &comparison.tail {
            Some((comparator, right)) => Ok(format!(
                "{left} {} {}",
                self.text(comparator)?,
                self.expression(right)?
            )),
            None => Ok(left),
        }
    }

    fn text(&self, terminal: &Terminal) -> Result<String, CoreError> {
        render(terminal).ok_or_else(|| {
            CoreError::Emission(Diagnostic::new(
                &self.trail,
                terminal.line,
                format!(
                    "cannot render {} `{}` as Go",
                    terminal.kind.describe(),
                    terminal.lexeme
                ),
            ))
        })
    }

    fn line(&mut self, text: &str) {
        for _ in 0..self.depth {
            self.output.push('\t');
        }
        self.output.push_str(text);
        self.output.push('\n');
    }

    fn step<T>(
        &mut self,
        name: &'static str,
        emit: impl FnOnce(&mut Self) -> Result<T, CoreError>,
    ) -> Result<T, CoreError> {
        self.trail.push(name);
        let result = emit(self);
        self.trail.pop();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Import, Return};
    use crate::indent::normalize;
    use crate::lexer::lex;
    use crate::parser::parse;

    fn go(body: &str) -> String {
        let source = format!("from GoType import *\n{body}");
        let tokens = normalize(lex(source.as_bytes()).expect("lex")).expect("normalize");
        emit(&parse(tokens).expect("parse")).expect("emit")
    }

    fn terminal(kind: TokenKind, lexeme: &str) -> Terminal {
        Terminal::new(kind, lexeme, 1)
    }

    fn program_with(body: Vec<Statement>) -> Program {
        Program {
            import: Import {
                module: terminal(TokenKind::Identifier, "GoType"),
                item: None,
                line: 1,
            },
            body,
            functions: Vec::new(),
        }
    }

    #[test]
    fn translates_keywords_and_literals() {
        let cases = [
            (TokenKind::Print, "print", "println"),
            (TokenKind::Elif, "elif", "else if"),
            (TokenKind::Not, "not", "!"),
            (TokenKind::And, "and", "&&"),
            (TokenKind::Or, "or", "||"),
            (TokenKind::NullLiteral, "None", "nil"),
            (TokenKind::BoolLiteral, "True", "true"),
            (TokenKind::BoolLiteral, "False", "false"),
            (TokenKind::StringLiteral, "\"hi\"", "\"hi\""),
            (TokenKind::GreaterEquals, ">=", ">="),
        ];
        for (kind, lexeme, expected) in cases {
            assert_eq!(render(&terminal(kind, lexeme)).as_deref(), Some(expected));
        }
        assert_eq!(render(&terminal(TokenKind::Illegal, "$")), None);
        assert_eq!(render(&terminal(TokenKind::Class, "class")), None);
    }

    #[test]
    fn emits_main_with_declaration_and_print() {
        assert_eq!(
            go("x: int = 5\nprint(x)\n"),
            "package main\n\nfunc main() {\n\tvar x int = 5\n\tprintln(x)\n}\n"
        );
    }

    #[test]
    fn emits_counted_for_loop() {
        assert_eq!(
            go("for i in range(0, 5):\n    print(i)\n"),
            "package main\n\nfunc main() {\n\tfor i := 0; i < 5; i++ {\n\t\tprintln(i)\n\t}\n}\n"
        );
    }

    #[test]
    fn emits_while_as_condition_only_for() {
        let out = go("n: int = 0\nwhile n < 3:\n    n = n + 1\n");
        assert!(out.contains("\tfor n < 3 {\n\t\tn = n + 1\n\t}\n"));
    }

    #[test]
    fn emits_if_chain() {
        let out = go(
            "a: int = 1\nif a == 1:\n    print(\"one\")\nelif a == 2:\n    print(\"two\")\nelse:\n    print(False)\n",
        );
        let expected = "\
\tif a == 1 {
\t\tprintln(\"one\")
\t} else if a == 2 {
\t\tprintln(\"two\")
\t} else {
\t\tprintln(false)
\t}
";
        assert!(out.contains(expected), "got:\n{out}");
    }

    #[test]
    fn hoists_functions_above_main() {
        let out = go(
            "def add(a: int, b: int) -> int:\n    total: int = 0\n    total = a + b\n    return total\ndef show(v: any):\n    print(v)\nshow(add(1, 2))\n",
        );
        let expected = "\
package main

func add(a int, b int) int {
\tvar total int = 0
\ttotal = a + b
\treturn total
}

func show(v any) {
\tprintln(v)
}

func main() {


\tshow(add(1, 2))
}
";
        assert_eq!(out, expected);
    }

    #[test]
    fn nested_blocks_indent_one_tab_per_level() {
        let out = go("for i in range(0, 2):\n    if i > 0:\n        print(i)\n");
        assert!(out.contains("\n\t\t\tprintln(i)\n\t\t}\n\t}\n"));
    }

    #[test]
    fn rejects_illegal_terminal() {
        let program = program_with(vec![Statement::Call(Call {
            callee: terminal(TokenKind::Print, "print"),
            arguments: vec![Value::Terminal(Terminal::new(TokenKind::Illegal, "$", 7))],
        })]);
        let err = emit(&program).unwrap_err();
        let CoreError::Emission(diag) = err else {
            panic!("expected emission error");
        };
        assert_eq!(diag.line, 7);
        assert_eq!(diag.trail, vec!["emit", "call"]);
        assert!(diag.message.contains("`$`"));
    }

    #[test]
    fn rejects_unrenderable_return_value() {
        let program = program_with(vec![Statement::Return(Return {
            keyword: terminal(TokenKind::Return, "return"),
            value: terminal(TokenKind::Colon, ":"),
        })]);
        assert!(matches!(emit(&program), Err(CoreError::Emission(_))));
    }
}
