//! Static analysis: declare-before-use and nominal type compatibility.
//!
//! A single pre-order walk over the program. Names live in a stack of
//! scopes: every block pushes a frame on entry and pops it on exit, so a
//! declaration made inside a block is not visible after the block closes.
//! The first violation aborts the walk.

use tracing::{debug, trace};

use crate::ast::{
    Block, Call, Comparison, Declaration, Expression, ForRange, FunctionDef, IfChain,
    Manipulation, Program, Statement, Terminal, Value,
};
use crate::builtins::builtin_for_token;
use crate::diagnostic::Diagnostic;
use crate::error::{AnalysisRule, CoreError};
use crate::lexer::TokenKind;
use crate::types::{
    BOOL, Compatibility, Function, INT, NULL, STRING, StaticType, Variable, compatibility,
};

/// Check `program` against the analyzer rules.
///
/// `variables` and `functions` seed the outermost scope, ahead of anything
/// the program declares itself.
pub fn analyze(
    program: &Program,
    variables: &[Variable],
    functions: &[Function],
) -> Result<(), CoreError> {
    let mut analyzer = Analyzer {
        program,
        env: Environment::seeded(variables, functions),
        trail: vec!["analyze"],
        in_function: false,
    };
    analyzer.statements(&program.body)?;
    debug!(
        statements = program.body.len(),
        functions = program.functions.len(),
        "analysis passed"
    );
    Ok(())
}

/// One lexical frame.
#[derive(Debug, Default)]
struct Scope {
    variables: Vec<Variable>,
    functions: Vec<Function>,
}

/// Stack of scopes, innermost last.
#[derive(Debug)]
struct Environment {
    frames: Vec<Scope>,
}

impl Environment {
    fn seeded(variables: &[Variable], functions: &[Function]) -> Self {
        Environment {
            frames: vec![Scope {
                variables: variables.to_vec(),
                functions: functions.to_vec(),
            }],
        }
    }

    fn push(&mut self) {
        self.frames.push(Scope::default());
        trace!(depth = self.frames.len(), "entered scope");
    }

    fn pop(&mut self) {
        self.frames.pop();
        trace!(depth = self.frames.len(), "left scope");
    }

    fn innermost(&mut self) -> &mut Scope {
        if self.frames.is_empty() {
            self.frames.push(Scope::default());
        }
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }

    /// A name already bound in the innermost frame, if any.
    fn declared_here(&self, name: &str) -> Option<&Variable> {
        self.frames
            .last()
            .and_then(|scope| scope.variables.iter().find(|variable| variable.name == name))
    }

    fn declare_variable(&mut self, variable: Variable) {
        self.innermost().variables.push(variable);
    }

    fn declare_function(&mut self, function: Function) {
        self.innermost().functions.push(function);
    }

    fn variable(&self, name: &str) -> Option<&Variable> {
        self.frames
            .iter()
            .rev()
            .flat_map(|scope| scope.variables.iter().rev())
            .find(|variable| variable.name == name)
    }

    fn function(&self, name: &str) -> Option<&Function> {
        self.frames
            .iter()
            .rev()
            .flat_map(|scope| scope.functions.iter().rev())
            .find(|function| function.name == name)
    }

    fn visible_functions(&self) -> Vec<Function> {
        self.frames
            .iter()
            .flat_map(|scope| scope.functions.iter().cloned())
            .collect()
    }
}

struct Analyzer<'a> {
    program: &'a Program,
    env: Environment,
    trail: Vec<&'static str>,
    in_function: bool,
}

impl<'a> Analyzer<'a> {
    fn statements(&mut self, statements: &[Statement]) -> Result<(), CoreError> {
        statements
            .iter()
            .try_for_each(|statement| self.statement(statement))
    }

    fn statement(&mut self, statement: &Statement) -> Result<(), CoreError> {
        match statement {
            Statement::Declaration(decl) => self.step("declaration", |a| a.declaration(decl)),
            Statement::Manipulation(stmt) => self.step("manipulation", |a| a.manipulation(stmt)),
            Statement::Call(call) => self.step("call", |a| a.call(call).map(|_| ())),
            Statement::For(stmt) => self.step("for", |a| a.for_range(stmt)),
            Statement::While(stmt) => self.step("while", |a| {
                a.comparison(&stmt.condition)?;
                a.block(&stmt.body, Vec::new())
            }),
            Statement::If(chain) => self.step("if", |a| a.if_chain(chain)),
            Statement::Return(stmt) => self.step("return", |a| {
                if !a.in_function {
                    return Err(a.fail(
                        AnalysisRule::ReturnOutsideFunction,
                        stmt.keyword.line,
                        "`return` outside of a function body".to_string(),
                    ));
                }
                a.reference(&stmt.value)
            }),
            Statement::HoistedFunction { index, line } => {
                self.step("function", |a| a.hoisted_function(*index, *line))
            }
        }
    }

    fn block(&mut self, block: &Block, bindings: Vec<Variable>) -> Result<(), CoreError> {
        self.env.push();
        for binding in bindings {
            self.env.declare_variable(binding);
        }
        let result = self.statements(&block.statements);
        self.env.pop();
        result
    }

    /// The initializer is checked before the name is bound, so it cannot
    /// refer to the variable it initializes.
    fn declaration(&mut self, decl: &Declaration) -> Result<(), CoreError> {
        if let Some(existing) = self.env.declared_here(&decl.name.lexeme) {
            return Err(self.fail(
                AnalysisRule::Redeclaration,
                decl.name.line,
                format!(
                    "variable `{}` is already declared as `{}` in this block",
                    decl.name.lexeme, existing.ty
                ),
            ));
        }

        let actual = self.value_type(&decl.value)?;
        if !self.accepts(&actual, &decl.ty.lexeme) {
            return Err(self.fail(
                AnalysisRule::DeclarationType,
                decl.name.line,
                format!(
                    "variable `{}` is declared as `{}` but initialized with `{}`",
                    decl.name.lexeme,
                    decl.ty.lexeme,
                    actual.name()
                ),
            ));
        }

        self.env
            .declare_variable(Variable::new(&decl.name.lexeme, &decl.ty.lexeme));
        Ok(())
    }

    fn manipulation(&mut self, stmt: &Manipulation) -> Result<(), CoreError> {
        if self.env.variable(&stmt.target.lexeme).is_none() {
            return Err(self.fail(
                AnalysisRule::UndeclaredManipulation,
                stmt.target.line,
                format!(
                    "assignment to undeclared variable `{}`",
                    stmt.target.lexeme
                ),
            ));
        }
        self.expression(&stmt.value)
    }

    fn for_range(&mut self, stmt: &ForRange) -> Result<(), CoreError> {
        self.reference(&stmt.start)?;
        self.reference(&stmt.end)?;
        let counter = Variable::new(&stmt.variable.lexeme, INT);
        self.block(&stmt.body, vec![counter])
    }

    fn if_chain(&mut self, chain: &IfChain) -> Result<(), CoreError> {
        for branch in &chain.branches {
            self.comparison(&branch.condition)?;
            self.block(&branch.body, Vec::new())?;
        }
        if let Some(otherwise) = &chain.otherwise {
            self.block(otherwise, Vec::new())?;
        }
        Ok(())
    }

    /// Registers the function at its original position, then checks its
    /// body in a fresh environment: the functions visible here (itself
    /// included) and its parameters. Variables of the surrounding code are
    /// not visible because the function is emitted at top level.
    fn hoisted_function(&mut self, index: usize, line: usize) -> Result<(), CoreError> {
        let program = self.program;
        let Some(function) = program.functions.get(index) else {
            return Err(self.fail(
                AnalysisRule::UndeclaredFunction,
                line,
                format!("no hoisted function at index {index}"),
            ));
        };

        self.env.declare_function(signature(function));

        let params = function
            .params
            .iter()
            .map(|param| Variable::new(&param.name.lexeme, &param.ty.lexeme))
            .collect();
        let isolated = Environment::seeded(&[], &self.env.visible_functions());
        let outer = std::mem::replace(&mut self.env, isolated);
        let was_in_function = std::mem::replace(&mut self.in_function, true);
        let result = self.block(&function.body, params);
        self.in_function = was_in_function;
        self.env = outer;
        result
    }

    fn expression(&mut self, expression: &Expression) -> Result<(), CoreError> {
        self.step("expression", |a| {
            expression
                .operands()
                .try_for_each(|operand| a.reference(operand))
        })
    }

    fn comparison(&mut self, comparison: &Comparison) -> Result<(), CoreError> {
        self.step("comparison", |a| {
            comparison
                .expressions()
                .try_for_each(|expression| a.expression(expression))
        })
    }

    /// Checks a call and returns its result type.
    fn call(&mut self, call: &Call) -> Result<StaticType, CoreError> {
        let name = &call.callee.lexeme;
        let signature = match builtin_for_token(call.callee.kind) {
            Some(builtin) => builtin.signature(),
            None => self.env.function(name).cloned().ok_or_else(|| {
                self.fail(
                    AnalysisRule::UndeclaredFunction,
                    call.callee.line,
                    format!("call to undeclared function `{name}`"),
                )
            })?,
        };

        if call.arguments.len() != signature.params.len() {
            return Err(self.fail(
                AnalysisRule::ArgumentCount,
                call.callee.line,
                format!(
                    "function `{name}` expects {} argument(s) but received {}",
                    signature.params.len(),
                    call.arguments.len()
                ),
            ));
        }

        for (position, (argument, expected)) in
            call.arguments.iter().zip(&signature.params).enumerate()
        {
            let actual = self.value_type(argument)?;
            if !self.accepts(&actual, expected) {
                return Err(self.fail(
                    AnalysisRule::ArgumentType,
                    argument.line(),
                    format!(
                        "argument {} of `{name}`: expected `{expected}`, got `{}`",
                        position + 1,
                        actual.name()
                    ),
                ));
            }
        }

        Ok(StaticType::Named(signature.returns))
    }

    fn accepts(&self, actual: &StaticType, expected: &str) -> bool {
        let verdict = compatibility(actual, expected);
        if verdict == Compatibility::Widened {
            trace!(from = actual.name(), to = expected, "widened value");
        }
        verdict.is_ok()
    }

    fn value_type(&mut self, value: &Value) -> Result<StaticType, CoreError> {
        match value {
            Value::Call(call) => self.step("call", |a| a.call(call)),
            Value::Terminal(terminal) => self.terminal_type(terminal),
        }
    }

    fn terminal_type(&self, terminal: &Terminal) -> Result<StaticType, CoreError> {
        let named = |name: &str| -> Result<StaticType, CoreError> {
            Ok(StaticType::Named(name.to_string()))
        };
        match terminal.kind {
            TokenKind::IntLiteral => Ok(StaticType::IntLiteral),
            TokenKind::StringLiteral => named(STRING),
            TokenKind::BoolLiteral => named(BOOL),
            TokenKind::NullLiteral => named(NULL),
            _ => match self.env.variable(&terminal.lexeme) {
                Some(variable) => named(&variable.ty),
                None => Err(self.undeclared_reference(terminal)),
            },
        }
    }

    /// An identifier operand must name a visible variable; literals pass.
    fn reference(&self, terminal: &Terminal) -> Result<(), CoreError> {
        if terminal.is_identifier() && self.env.variable(&terminal.lexeme).is_none() {
            return Err(self.undeclared_reference(terminal));
        }
        Ok(())
    }

    fn undeclared_reference(&self, terminal: &Terminal) -> CoreError {
        self.fail(
            AnalysisRule::UndeclaredReference,
            terminal.line,
            format!("use of undeclared variable `{}`", terminal.lexeme),
        )
    }

    fn step<T>(
        &mut self,
        name: &'static str,
        check: impl FnOnce(&mut Self) -> Result<T, CoreError>,
    ) -> Result<T, CoreError> {
        self.trail.push(name);
        let result = check(self);
        self.trail.pop();
        result
    }

    fn fail(&self, rule: AnalysisRule, line: usize, message: String) -> CoreError {
        CoreError::Analysis {
            rule,
            diagnostic: Diagnostic::new(&self.trail, line, message),
        }
    }
}

fn signature(function: &FunctionDef) -> Function {
    Function::new(
        &function.name.lexeme,
        function
            .params
            .iter()
            .map(|param| param.ty.lexeme.clone())
            .collect(),
        function
            .returns
            .as_ref()
            .map_or(NULL, |returns| returns.lexeme.as_str()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indent::normalize;
    use crate::lexer::lex;
    use crate::parser::parse;

    const HEADER: &str = "from GoType import *\n";

    fn check(body: &str) -> Result<(), CoreError> {
        let source = format!("{HEADER}{body}");
        let tokens = normalize(lex(source.as_bytes()).expect("lex")).expect("normalize");
        let program = parse(tokens).expect("parse");
        analyze(&program, &[], &[])
    }

    fn violated(body: &str) -> (AnalysisRule, Diagnostic) {
        match check(body) {
            Err(CoreError::Analysis { rule, diagnostic }) => (rule, diagnostic),
            other => panic!("expected analysis error, got {other:?}"),
        }
    }

    #[test]
    fn accepts_declared_use() {
        check("x: int = 5\nprint(x)\nx = x + 1\nwhile x < 10:\n    x = x * 2\n")
            .expect("valid program");
    }

    #[test]
    fn rejects_manipulation_of_undeclared_variable() {
        let (rule, diag) = violated("y = 3\n");
        assert_eq!(rule, AnalysisRule::UndeclaredManipulation);
        assert_eq!(diag.line, 2);
        assert!(diag.message.contains("`y`"));
    }

    #[test]
    fn rejects_undeclared_operand() {
        let (rule, diag) = violated("x: int = 1\nx = x + z\n");
        assert_eq!(rule, AnalysisRule::UndeclaredReference);
        assert!(diag.message.contains("`z`"));
        assert_eq!(diag.trail, vec!["analyze", "manipulation", "expression"]);
    }

    #[test]
    fn rejects_undeclared_identifier_in_comparison() {
        let (rule, _) = violated("if flag == True:\n    print(1)\n");
        assert_eq!(rule, AnalysisRule::UndeclaredReference);
    }

    #[test]
    fn rejects_undeclared_print_argument() {
        let (rule, diag) = violated("print(missing)\n");
        assert_eq!(rule, AnalysisRule::UndeclaredReference);
        assert!(diag.message.contains("`missing`"));
    }

    #[test]
    fn rejects_call_to_undeclared_function() {
        let (rule, diag) = violated("launch(1)\n");
        assert_eq!(rule, AnalysisRule::UndeclaredFunction);
        assert!(diag.message.contains("`launch`"));
    }

    #[test]
    fn functions_must_be_defined_before_use() {
        let (rule, _) = violated("one()\ndef one() -> int:\n    return 1\n");
        assert_eq!(rule, AnalysisRule::UndeclaredFunction);
    }

    #[test]
    fn rejects_argument_type_mismatch() {
        let (rule, diag) = violated(
            "def add(a: int, b: int) -> int:\n    return a\nadd(1, \"x\")\n",
        );
        assert_eq!(rule, AnalysisRule::ArgumentType);
        assert_eq!(diag.line, 4);
        assert!(diag.message.contains("argument 2"));
        assert!(diag.message.contains("expected `int`, got `string`"));
    }

    #[test]
    fn rejects_wrong_argument_count() {
        let (rule, _) = violated("def one(a: int) -> int:\n    return a\none(1, 2)\n");
        assert_eq!(rule, AnalysisRule::ArgumentCount);
        let (rule, _) = violated("print(1, 2)\n");
        assert_eq!(rule, AnalysisRule::ArgumentCount);
    }

    #[test]
    fn any_parameters_accept_every_kind() {
        check("def show(value: any):\n    print(value)\nshow(\"text\")\nshow(True)\nshow(3)\n")
            .expect("any accepts everything");
    }

    #[test]
    fn integer_family_accepts_integer_literals() {
        check(
            "def wide(a: int64, b: uint8, c: float64, d: byte):\n    print(a)\nwide(1, 2, 3, 4)\nsmall: int8 = 5\n",
        )
        .expect("integer literals widen");
    }

    #[test]
    fn typed_variables_do_not_widen() {
        let (rule, _) = violated(
            "def wide(a: int64):\n    print(a)\nx: int = 1\nwide(x)\n",
        );
        assert_eq!(rule, AnalysisRule::ArgumentType);
    }

    #[test]
    fn nested_call_results_are_typed_by_return_type() {
        check(
            "def name() -> string:\n    return \"go\"\ndef greet(who: string):\n    print(who)\ngreet(name())\nlabel: string = name()\n",
        )
        .expect("nested call types match");

        let (rule, diag) = violated("def name() -> string:\n    return \"go\"\ncount: int = name()\n");
        assert_eq!(rule, AnalysisRule::DeclarationType);
        assert!(diag.message.contains("`count`"));
    }

    #[test]
    fn rejects_declaration_type_mismatch() {
        let (rule, diag) = violated("x: int = \"five\"\n");
        assert_eq!(rule, AnalysisRule::DeclarationType);
        assert!(diag.message.contains("declared as `int` but initialized with `string`"));
    }

    #[test]
    fn for_loop_counter_is_visible_in_body() {
        check("for i in range(0, 5):\n    print(i)\n").expect("counter in scope");
        let (rule, _) = violated("for i in range(0, limit):\n    print(i)\n");
        assert_eq!(rule, AnalysisRule::UndeclaredReference);
    }

    #[test]
    fn block_declarations_do_not_leak() {
        check("if True:\n    inner: int = 1\n    print(inner)\n").expect("visible inside block");

        let (rule, diag) = violated("if True:\n    inner: int = 1\nprint(inner)\n");
        assert_eq!(rule, AnalysisRule::UndeclaredReference);
        assert_eq!(diag.line, 4);

        let (rule, _) = violated("for i in range(0, 2):\n    print(i)\ni = 3\n");
        assert_eq!(rule, AnalysisRule::UndeclaredManipulation);
    }

    #[test]
    fn outer_declarations_are_visible_in_nested_blocks() {
        check("total: int = 0\nfor i in range(0, 3):\n    if i > 0:\n        total = total + i\n")
            .expect("outer variable visible");
    }

    #[test]
    fn parameters_are_scoped_to_the_function_body() {
        check("def echo(word: string) -> string:\n    return word\n").expect("param visible");
        let (rule, _) = violated("def echo(word: string) -> string:\n    return word\nprint(word)\n");
        assert_eq!(rule, AnalysisRule::UndeclaredReference);
    }

    #[test]
    fn function_bodies_do_not_see_surrounding_variables() {
        let (rule, _) = violated("x: int = 1\ndef peek() -> int:\n    return x\n");
        assert_eq!(rule, AnalysisRule::UndeclaredReference);
    }

    #[test]
    fn functions_may_call_themselves_and_earlier_functions() {
        check(
            "def base(n: int) -> int:\n    return n\ndef again(n: int) -> int:\n    x: int = base(n)\n    y: int = again(x)\n    return y\n",
        )
        .expect("recursion and earlier functions");
    }

    #[test]
    fn initializer_cannot_reference_its_own_name() {
        let (rule, diag) = violated("def id(v: int) -> int:\n    return v\nx: int = id(x)\n");
        assert_eq!(rule, AnalysisRule::UndeclaredReference);
        assert_eq!(diag.line, 4);
        assert!(diag.message.contains("`x`"));
    }

    #[test]
    fn declared_name_is_visible_after_its_declaration() {
        check("def id(v: int) -> int:\n    return v\nx: int = 1\ny: int = id(x)\n")
            .expect("earlier declaration visible");
    }

    #[test]
    fn return_is_only_valid_inside_functions() {
        let (rule, diag) = violated("return 1\n");
        assert_eq!(rule, AnalysisRule::ReturnOutsideFunction);
        assert_eq!(diag.line, 2);

        let (rule, _) = violated("if True:\n    return 1\n");
        assert_eq!(rule, AnalysisRule::ReturnOutsideFunction);

        let (rule, _) = violated("def one() -> int:\n    return 1\nreturn 2\n");
        assert_eq!(rule, AnalysisRule::ReturnOutsideFunction);

        check("def one() -> int:\n    if True:\n        return 1\n    return 2\n")
            .expect("nested return inside a function");
    }

    #[test]
    fn rejects_redeclaration_in_the_same_block() {
        let (rule, diag) = violated("x: int = 1\nx: string = \"a\"\n");
        assert_eq!(rule, AnalysisRule::Redeclaration);
        assert_eq!(diag.line, 3);
        assert!(diag.message.contains("`x`"));

        let (rule, _) = violated("def f(a: int):\n    a: int = 2\n");
        assert_eq!(rule, AnalysisRule::Redeclaration);
    }

    #[test]
    fn inner_blocks_may_shadow_outer_names() {
        check("x: int = 1\nif x > 0:\n    x: string = \"inner\"\n    print(x)\nprint(x)\n")
            .expect("shadowing in a nested block");
    }

    #[test]
    fn seeded_environment_is_visible() {
        let source = "from GoType import *\nprint(limit)\nstep(1)\n";
        let tokens = normalize(lex(source.as_bytes()).unwrap()).unwrap();
        let program = parse(tokens).unwrap();
        let variables = [Variable::new("limit", "int")];
        let functions = [Function::new("step", vec!["int".to_string()], NULL)];
        analyze(&program, &variables, &functions).expect("seeded names resolve");
        assert!(analyze(&program, &[], &[]).is_err());
    }
}
