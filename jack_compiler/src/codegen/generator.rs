//! Single-pass AST walk emitting stack-machine commands
//!
//! Calling conventions:
//! - constructor: `push constant nFields`, `call Memory.alloc 1`, `pop pointer 0`
//! - method: `push argument 0`, `pop pointer 0`
//! - function: no receiver binding
//!
//! `if` and `while` labels come from two independent counters owned by the
//! generator, so every label is unique within the class and compiling the
//! same class twice yields the same text.

use crate::codegen::command::{ArithmeticOp, Segment, VmCommand};
use crate::codegen::error::CodeGenError;
use crate::config::compile_time::codegen::MAX_COMMANDS_PER_CLASS;
use crate::grammar::ast::nodes::*;
use crate::symbols::{
    collect_class_symbols, collect_subroutine_symbols, Scope, ScopeLevel, SymbolEntry, SymbolTable,
};
use crate::utils::Span;
use crate::{log_debug, log_error};

pub struct CodeGenerator<'a> {
    class: &'a ClassDecl,
    class_table: SymbolTable,
    subroutine_table: SymbolTable,
    subroutine_name: String,
    if_counter: usize,
    while_counter: usize,
    commands: Vec<VmCommand>,
}

impl<'a> CodeGenerator<'a> {
    /// Fill the class table; subroutines are compiled by [`Self::generate`]
    pub fn new(class: &'a ClassDecl) -> Self {
        Self {
            class,
            class_table: collect_class_symbols(class),
            subroutine_table: SymbolTable::new(ScopeLevel::Subroutine),
            subroutine_name: String::new(),
            if_counter: 0,
            while_counter: 0,
            commands: Vec::new(),
        }
    }

    pub fn class_table(&self) -> &SymbolTable {
        &self.class_table
    }

    pub fn generate(mut self) -> Result<Vec<VmCommand>, CodeGenError> {
        let class = self.class;
        for subroutine in &class.subroutines {
            self.compile_subroutine(subroutine)?;
        }
        Ok(self.commands)
    }

    fn compile_subroutine(&mut self, subroutine: &SubroutineDecl) -> Result<(), CodeGenError> {
        self.subroutine_table = collect_subroutine_symbols(&self.class.name, subroutine);
        self.subroutine_name = format!("{}.{}", self.class.name, subroutine.name);

        let n_locals = self.count_u16(subroutine.local_count(), "local count", subroutine.span)?;
        self.emit(VmCommand::Function {
            name: self.subroutine_name.clone(),
            n_locals,
        })?;

        match subroutine.kind {
            SubroutineKind::Constructor => {
                let n_fields =
                    self.count_u16(self.class.field_count(), "field count", subroutine.span)?;
                self.emit(VmCommand::push(Segment::Constant, n_fields))?;
                self.emit(VmCommand::call("Memory.alloc", 1))?;
                self.emit(VmCommand::pop(Segment::Pointer, 0))?;
            }
            SubroutineKind::Method => {
                self.emit(VmCommand::push(Segment::Argument, 0))?;
                self.emit(VmCommand::pop(Segment::Pointer, 0))?;
            }
            SubroutineKind::Function => {}
        }

        self.compile_statements(&subroutine.body)?;

        log_debug!("Subroutine compiled",
            "subroutine" => self.subroutine_name.as_str(),
            "symbols" => self.subroutine_table.len(),
            "commands_so_far" => self.commands.len()
        );
        Ok(())
    }

    // === STATEMENTS ===

    fn compile_statements(&mut self, statements: &[Statement]) -> Result<(), CodeGenError> {
        for statement in statements {
            self.compile_statement(statement)?;
        }
        Ok(())
    }

    fn compile_statement(&mut self, statement: &Statement) -> Result<(), CodeGenError> {
        match statement {
            Statement::Let {
                target,
                index,
                value,
                span,
            } => self.compile_let(target, index.as_ref(), value, *span),
            Statement::If {
                condition,
                consequent,
                alternate,
                ..
            } => self.compile_if(condition, consequent, alternate.as_deref()),
            Statement::While {
                condition, body, ..
            } => self.compile_while(condition, body),
            Statement::Do { call, .. } => {
                self.compile_call(call)?;
                self.emit(VmCommand::pop(Segment::Temp, 0))
            }
            Statement::Return { value, .. } => {
                match value {
                    Some(value) => self.compile_expression(value)?,
                    None => self.emit(VmCommand::push(Segment::Constant, 0))?,
                }
                self.emit(VmCommand::Return)
            }
        }
    }

    fn compile_let(
        &mut self,
        target: &str,
        index: Option<&Expression>,
        value: &Expression,
        span: Span,
    ) -> Result<(), CodeGenError> {
        let entry = self.resolve(target, span)?;

        let Some(index) = index else {
            self.compile_expression(value)?;
            return self.emit(VmCommand::pop(entry.segment(), entry.index));
        };

        // Address first, parked in temp 0 while the value is computed, since
        // the value may itself go through pointer 1
        self.emit(VmCommand::push(entry.segment(), entry.index))?;
        self.compile_expression(index)?;
        self.emit(VmCommand::Arithmetic(ArithmeticOp::Add))?;
        self.compile_expression(value)?;
        self.emit(VmCommand::pop(Segment::Temp, 0))?;
        self.emit(VmCommand::pop(Segment::Pointer, 1))?;
        self.emit(VmCommand::push(Segment::Temp, 0))?;
        self.emit(VmCommand::pop(Segment::That, 0))
    }

    fn compile_if(
        &mut self,
        condition: &Expression,
        consequent: &[Statement],
        alternate: Option<&[Statement]>,
    ) -> Result<(), CodeGenError> {
        let n = self.if_counter;
        self.if_counter += 1;
        let end_label = format!("IF_END_{}", n);

        self.compile_expression(condition)?;
        self.emit(VmCommand::Arithmetic(ArithmeticOp::Not))?;

        match alternate {
            None => {
                self.emit(VmCommand::IfGoto(end_label.clone()))?;
                self.compile_statements(consequent)?;
            }
            Some(alternate) => {
                let else_label = format!("IF_ELSE_{}", n);
                self.emit(VmCommand::IfGoto(else_label.clone()))?;
                self.compile_statements(consequent)?;
                self.emit(VmCommand::Goto(end_label.clone()))?;
                self.emit(VmCommand::Label(else_label))?;
                self.compile_statements(alternate)?;
            }
        }

        self.emit(VmCommand::Label(end_label))
    }

    fn compile_while(
        &mut self,
        condition: &Expression,
        body: &[Statement],
    ) -> Result<(), CodeGenError> {
        let n = self.while_counter;
        self.while_counter += 1;
        let loop_label = format!("WHILE_{}", n);
        let end_label = format!("WHILE_END_{}", n);

        self.emit(VmCommand::Label(loop_label.clone()))?;
        self.compile_expression(condition)?;
        self.emit(VmCommand::Arithmetic(ArithmeticOp::Not))?;
        self.emit(VmCommand::IfGoto(end_label.clone()))?;
        self.compile_statements(body)?;
        self.emit(VmCommand::Goto(loop_label))?;
        self.emit(VmCommand::Label(end_label))
    }

    // === EXPRESSIONS ===

    fn compile_expression(&mut self, expr: &Expression) -> Result<(), CodeGenError> {
        match &expr.kind {
            ExpressionKind::IntegerConstant(value) => {
                self.emit(VmCommand::push(Segment::Constant, *value))
            }
            ExpressionKind::StringConstant(value) => self.compile_string(value, expr.span),
            ExpressionKind::BooleanConstant(true) => {
                self.emit(VmCommand::push(Segment::Constant, 1))?;
                self.emit(VmCommand::Arithmetic(ArithmeticOp::Neg))
            }
            ExpressionKind::BooleanConstant(false) | ExpressionKind::Null => {
                self.emit(VmCommand::push(Segment::Constant, 0))
            }
            ExpressionKind::This => self.emit(VmCommand::push(Segment::Pointer, 0)),
            ExpressionKind::Variable(name) => {
                let entry = self.resolve(name, expr.span)?;
                self.emit(VmCommand::push(entry.segment(), entry.index))
            }
            ExpressionKind::ArrayMember { array, index } => {
                let entry = self.resolve(array, expr.span)?;
                self.emit(VmCommand::push(entry.segment(), entry.index))?;
                self.compile_expression(index)?;
                self.emit(VmCommand::Arithmetic(ArithmeticOp::Add))?;
                self.emit(VmCommand::pop(Segment::Pointer, 1))?;
                self.emit(VmCommand::push(Segment::That, 0))
            }
            ExpressionKind::Call(call) => self.compile_call(call),
            ExpressionKind::Unary { op, operand } => {
                self.compile_expression(operand)?;
                let op = match op {
                    UnaryOp::Negate => ArithmeticOp::Neg,
                    UnaryOp::Not => ArithmeticOp::Not,
                };
                self.emit(VmCommand::Arithmetic(op))
            }
            ExpressionKind::Binary { op, left, right } => {
                self.compile_expression(left)?;
                self.compile_expression(right)?;
                self.compile_binary_op(*op)
            }
        }
    }

    fn compile_binary_op(&mut self, op: BinaryOp) -> Result<(), CodeGenError> {
        let arithmetic = |op| VmCommand::Arithmetic(op);
        match op {
            BinaryOp::Multiply => self.emit(VmCommand::call("Math.multiply", 2)),
            BinaryOp::Divide => self.emit(VmCommand::call("Math.divide", 2)),
            BinaryOp::Add => self.emit(arithmetic(ArithmeticOp::Add)),
            BinaryOp::Subtract => self.emit(arithmetic(ArithmeticOp::Sub)),
            BinaryOp::Equal => self.emit(arithmetic(ArithmeticOp::Eq)),
            BinaryOp::LessThan => self.emit(arithmetic(ArithmeticOp::Lt)),
            BinaryOp::GreaterThan => self.emit(arithmetic(ArithmeticOp::Gt)),
            BinaryOp::And => self.emit(arithmetic(ArithmeticOp::And)),
            BinaryOp::Or => self.emit(arithmetic(ArithmeticOp::Or)),
            BinaryOp::LessThanOrEqual => {
                self.emit(arithmetic(ArithmeticOp::Gt))?;
                self.emit(arithmetic(ArithmeticOp::Not))
            }
            BinaryOp::GreaterThanOrEqual => {
                self.emit(arithmetic(ArithmeticOp::Lt))?;
                self.emit(arithmetic(ArithmeticOp::Not))
            }
        }
    }

    fn compile_string(&mut self, value: &str, span: Span) -> Result<(), CodeGenError> {
        let codes = value
            .chars()
            .map(|c| u16::try_from(u32::from(c)).ok().filter(|code| *code <= 0x7FFF))
            .collect::<Option<Vec<u16>>>();
        let Some(codes) = codes else {
            return Err(self.report(CodeGenError::UnsupportedNode {
                description: "string literal with characters outside the 15-bit range".to_string(),
                span,
            }));
        };

        let length = self.count_u16(codes.len(), "string length", span)?;
        self.emit(VmCommand::push(Segment::Constant, length))?;
        self.emit(VmCommand::call("String.new", 1))?;
        for code in codes {
            self.emit(VmCommand::push(Segment::Constant, code))?;
            self.emit(VmCommand::call("String.appendChar", 2))?;
        }
        Ok(())
    }

    /// Member calls on a known variable dispatch through its declared type
    /// with the variable as receiver. Member calls on any other name are
    /// static calls on that name. Bare calls target the current class with
    /// the current receiver.
    fn compile_call(&mut self, call: &SubroutineCall) -> Result<(), CodeGenError> {
        let (target, implicit_args) = match &call.receiver {
            Some(receiver) => match self.lookup(receiver).cloned() {
                Some(entry) => {
                    self.emit(VmCommand::push(entry.segment(), entry.index))?;
                    (format!("{}.{}", entry.declared_type, call.name), 1)
                }
                None => (format!("{}.{}", receiver, call.name), 0),
            },
            None => {
                self.emit(VmCommand::push(Segment::Pointer, 0))?;
                (format!("{}.{}", self.class.name, call.name), 1)
            }
        };

        for argument in &call.arguments {
            self.compile_expression(argument)?;
        }

        let n_args = self.count_u16(call.arguments.len() + implicit_args, "argument count", call.span)?;
        self.emit(VmCommand::call(target, n_args))
    }

    // === HELPERS ===

    fn lookup(&self, name: &str) -> Option<&SymbolEntry> {
        Scope::new(&self.class_table, &self.subroutine_table).resolve(name)
    }

    fn resolve(&self, name: &str, span: Span) -> Result<SymbolEntry, CodeGenError> {
        match self.lookup(name) {
            Some(entry) => Ok(entry.clone()),
            None => Err(self.report(CodeGenError::UnresolvedIdentifier {
                name: name.to_string(),
                subroutine: self.subroutine_name.clone(),
                span,
            })),
        }
    }

    fn count_u16(&self, count: usize, what: &str, span: Span) -> Result<u16, CodeGenError> {
        u16::try_from(count).map_err(|_| {
            self.report(CodeGenError::UnsupportedNode {
                description: format!("{} {}", what, count),
                span,
            })
        })
    }

    fn emit(&mut self, command: VmCommand) -> Result<(), CodeGenError> {
        if self.commands.len() >= MAX_COMMANDS_PER_CLASS {
            return Err(self.report(CodeGenError::CommandLimitExceeded {
                class: self.class.name.clone(),
            }));
        }
        self.commands.push(command);
        Ok(())
    }

    fn report(&self, err: CodeGenError) -> CodeGenError {
        match err.span() {
            Some(span) => log_error!(err.error_code(), &err.to_string(), span = span,
                "class" => self.class.name.as_str()),
            None => log_error!(err.error_code(), &err.to_string(),
                "class" => self.class.name.as_str()),
        }
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::command::render;
    use crate::syntax::parse_source;
    use assert_matches::assert_matches;

    fn compile(source: &str) -> Result<String, CodeGenError> {
        let class = parse_source(source).unwrap();
        CodeGenerator::new(&class).generate().map(|c| render(&c))
    }

    fn compile_main(body: &str) -> String {
        compile(&format!("class Main {{ function void main() {{ {} }} }}", body)).unwrap()
    }

    fn lines(text: &str) -> Vec<&str> {
        text.lines().collect()
    }

    #[test]
    fn test_print_sum_scenario() {
        let text = compile_main("do Output.printInt(1+2); return;");
        assert_eq!(
            lines(&text),
            vec![
                "function Main.main 0",
                "push constant 1",
                "push constant 2",
                "add",
                "call Output.printInt 1",
                "pop temp 0",
                "push constant 0",
                "return",
            ]
        );
    }

    #[test]
    fn test_if_without_else_has_no_goto() {
        let text = compile_main("var int x; if (false) { let x = 1; } return;");
        assert_eq!(
            lines(&text),
            vec![
                "function Main.main 1",
                "push constant 0",
                "not",
                "if-goto IF_END_0",
                "push constant 1",
                "pop local 0",
                "label IF_END_0",
                "push constant 0",
                "return",
            ]
        );
    }

    #[test]
    fn test_if_else_layout() {
        let text = compile_main("var int x; if (true) { let x = 1; } else { let x = 2; } return;");
        let body: Vec<_> = lines(&text)[1..12].to_vec();
        assert_eq!(
            body,
            vec![
                "push constant 1",
                "neg",
                "not",
                "if-goto IF_ELSE_0",
                "push constant 1",
                "pop local 0",
                "goto IF_END_0",
                "label IF_ELSE_0",
                "push constant 2",
                "pop local 0",
                "label IF_END_0",
            ]
        );
    }

    #[test]
    fn test_while_keeps_trailing_jump_after_return() {
        let text = compile_main("var int i; while (i < 3) { return; } return;");
        assert_eq!(
            lines(&text)[1..11].to_vec(),
            vec![
                "label WHILE_0",
                "push local 0",
                "push constant 3",
                "lt",
                "not",
                "if-goto WHILE_END_0",
                "push constant 0",
                "return",
                "goto WHILE_0",
                "label WHILE_END_0",
            ]
        );
    }

    #[test]
    fn test_label_counters_span_the_class() {
        let text = compile(
            "class A {
                function void f() { if (true) { } while (false) { } return; }
                function void g() { if (true) { } else { } while (false) { } return; }
            }",
        )
        .unwrap();
        assert!(text.contains("label IF_END_0"));
        assert!(text.contains("label IF_ELSE_1"));
        assert!(text.contains("label IF_END_1"));
        assert!(text.contains("label WHILE_1"));
        assert_eq!(text.matches("label IF_END_0").count(), 1);
    }

    #[test]
    fn test_constructor_and_method_preambles() {
        let text = compile(
            "class Point {
                field int x, y;
                static int count;
                constructor Point new(int ax) { let x = ax; let count = count + 1; return this; }
                method int getY() { return y; }
            }",
        )
        .unwrap();
        assert_eq!(
            lines(&text),
            vec![
                "function Point.new 0",
                "push constant 2",
                "call Memory.alloc 1",
                "pop pointer 0",
                "push argument 0",
                "pop this 0",
                "push static 0",
                "push constant 1",
                "add",
                "pop static 0",
                "push pointer 0",
                "return",
                "function Point.getY 0",
                "push argument 0",
                "pop pointer 0",
                "push this 1",
                "return",
            ]
        );
    }

    #[test]
    fn test_call_dispatch_forms() {
        let text = compile(
            "class Game {
                field Ball ball;
                method void run(int speed) {
                    var Ball spare;
                    do ball.move(speed);
                    do spare.reset();
                    do draw(1);
                    do Screen.clearScreen();
                    return;
                }
                method void draw(int c) { return; }
            }",
        )
        .unwrap();
        let calls: Vec<_> = lines(&text)[3..15].to_vec();
        assert_eq!(
            calls,
            vec![
                "push this 0",
                "push argument 1",
                "call Ball.move 2",
                "pop temp 0",
                "push local 0",
                "call Ball.reset 1",
                "pop temp 0",
                "push pointer 0",
                "push constant 1",
                "call Game.draw 2",
                "pop temp 0",
                "call Screen.clearScreen 0",
            ]
        );
    }

    #[test]
    fn test_array_read_and_write() {
        let text = compile_main("var Array a; let a[1] = a[0]; return;");
        assert_eq!(
            lines(&text)[1..15].to_vec(),
            vec![
                "push local 0",
                "push constant 1",
                "add",
                "push local 0",
                "push constant 0",
                "add",
                "pop pointer 1",
                "push that 0",
                "pop temp 0",
                "pop pointer 1",
                "push temp 0",
                "pop that 0",
                "push constant 0",
                "return",
            ]
        );
    }

    #[test]
    fn test_string_and_keyword_constants() {
        let text = compile_main("var String s; var int n; let s = \"Hi\"; let n = null; return;");
        assert_eq!(
            lines(&text)[1..10].to_vec(),
            vec![
                "push constant 2",
                "call String.new 1",
                "push constant 72",
                "call String.appendChar 2",
                "push constant 105",
                "call String.appendChar 2",
                "pop local 0",
                "push constant 0",
                "pop local 1",
            ]
        );
    }

    #[test]
    fn test_operator_lowering() {
        let text = compile_main(
            "var int a; let a = (a * 2) / 3; let a = -a; let a = ~a; let a = (a <= 1) | (a >= 2); return;",
        );
        assert!(text.contains("call Math.multiply 2\npush constant 3\ncall Math.divide 2\n"));
        assert!(text.contains("push local 0\nneg\n"));
        assert!(text.contains("push local 0\nnot\n"));
        assert!(text.contains("push constant 1\ngt\nnot\n"));
        assert!(text.contains("push constant 2\nlt\nnot\nor\n"));
    }

    #[test]
    fn test_unresolved_identifier() {
        let err = compile("class Main { function void main() { let x = y; return; } }").unwrap_err();
        assert_matches!(&err, CodeGenError::UnresolvedIdentifier { name, subroutine, .. }
            if name == "x" && subroutine == "Main.main");

        let err = compile("class Main { function void main() { var int x; let x = y + 1; return; } }")
            .unwrap_err();
        assert_matches!(&err, CodeGenError::UnresolvedIdentifier { name, .. } if name == "y");
        assert_eq!(err.error_code(), crate::logging::codes::codegen::UNRESOLVED_IDENTIFIER);
    }

    #[test]
    fn test_function_count_and_idempotence() {
        let source = "class A {
            constructor A new() { return this; }
            method void m() { if (true) { } return; }
            function int f() { while (false) { } return 1; }
        }";
        let first = compile(source).unwrap();
        let second = compile(source).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.lines().filter(|l| l.starts_with("function ")).count(), 3);
    }
}
