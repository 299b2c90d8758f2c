//! Compiled code against the source it came from
//!
//! Each case compiles Jack classes, parses the emitted command text back,
//! runs it on the interpreter and compares printed output and the return
//! value of `Main.main` with a direct evaluation of the class ASTs.

use crate::interpreter::{run_sources, DEFAULT_ENTRY, HEAP_BASE, RAM_SIZE};
use jack_compiler::grammar::ast::{
    BinaryOp, ClassDecl, ClassVarKind, Expression, ExpressionKind, Statement, SubroutineCall,
    SubroutineKind, TypeName, UnaryOp,
};
use jack_compiler::syntax::parse_source;
use std::collections::HashMap;

/// Tree-walking evaluator sharing the interpreter's heap layout
struct Evaluator<'a> {
    classes: HashMap<&'a str, &'a ClassDecl>,
    statics: HashMap<(String, String), i16>,
    memory: Vec<i16>,
    heap_next: usize,
    output: String,
}

struct Frame<'a> {
    class: &'a ClassDecl,
    this: i16,
    vars: HashMap<String, (TypeName, i16)>,
}

fn truth(value: bool) -> i16 {
    if value {
        -1
    } else {
        0
    }
}

impl<'a> Evaluator<'a> {
    fn new(classes: &'a [ClassDecl]) -> Self {
        Self {
            classes: classes.iter().map(|class| (class.name.as_str(), class)).collect(),
            statics: HashMap::new(),
            memory: vec![0; RAM_SIZE],
            heap_next: HEAP_BASE as usize,
            output: String::new(),
        }
    }

    fn alloc(&mut self, size: i16) -> i16 {
        let object = self.heap_next;
        self.heap_next += size as usize;
        object as i16
    }

    fn invoke(&mut self, class_name: &str, sub_name: &str, args: Vec<i16>) -> i16 {
        let user = self
            .classes
            .get(class_name)
            .copied()
            .and_then(|class| class.subroutine(sub_name).map(|sub| (class, sub)));

        let Some((class, sub)) = user else {
            return self.builtin(&format!("{}.{}", class_name, sub_name), &args);
        };

        let (this, explicit) = match sub.kind {
            SubroutineKind::Constructor => (self.alloc(class.field_count() as i16), &args[..]),
            SubroutineKind::Method => (args[0], &args[1..]),
            SubroutineKind::Function => (0, &args[..]),
        };

        let mut vars = HashMap::new();
        for (param, value) in sub.parameters.iter().zip(explicit) {
            vars.insert(param.name.clone(), (param.var_type.clone(), *value));
        }
        for decl in &sub.locals {
            for name in &decl.names {
                vars.insert(name.clone(), (decl.var_type.clone(), 0));
            }
        }

        let mut frame = Frame { class, this, vars };
        self.run_block(&mut frame, &sub.body).unwrap_or(0)
    }

    fn builtin(&mut self, name: &str, args: &[i16]) -> i16 {
        match (name, args) {
            ("Math.multiply", [x, y]) => x.wrapping_mul(*y),
            ("Math.divide", [x, y]) => x.wrapping_div(*y),
            ("Math.abs", [x]) => x.wrapping_abs(),
            ("Memory.alloc" | "Array.new", [size]) => self.alloc(*size),
            ("String.new", [capacity]) => {
                let object = self.alloc(capacity + 2);
                self.memory[object as usize + 1] = *capacity;
                object
            }
            ("String.appendChar", [s, c]) => {
                let length = self.memory[*s as usize];
                self.memory[*s as usize + 2 + length as usize] = *c;
                self.memory[*s as usize] = length + 1;
                *s
            }
            ("String.length", [s]) => self.memory[*s as usize],
            ("String.charAt", [s, i]) => self.memory[*s as usize + 2 + *i as usize],
            ("Output.printInt", [value]) => {
                self.output.push_str(&value.to_string());
                0
            }
            ("Output.printString", [s]) => {
                let length = self.memory[*s as usize] as usize;
                let text: String = (0..length)
                    .map(|i| char::from_u32(self.memory[*s as usize + 2 + i] as u32).unwrap())
                    .collect();
                self.output.push_str(&text);
                0
            }
            ("Output.printChar", [c]) => {
                self.output.push(char::from_u32(*c as u32).unwrap());
                0
            }
            ("Output.println", []) => {
                self.output.push('\n');
                0
            }
            ("Memory.deAlloc" | "Array.dispose", [_]) => 0,
            _ => panic!("no routine {} with {} arguments", name, args.len()),
        }
    }

    /// `Some` when a `return` ran
    fn run_block(&mut self, frame: &mut Frame<'a>, statements: &'a [Statement]) -> Option<i16> {
        for statement in statements {
            if let Some(value) = self.run_statement(frame, statement) {
                return Some(value);
            }
        }
        None
    }

    fn run_statement(&mut self, frame: &mut Frame<'a>, statement: &'a Statement) -> Option<i16> {
        match statement {
            Statement::Let {
                target,
                index: None,
                value,
                ..
            } => {
                let value = self.eval(frame, value);
                self.assign(frame, target, value);
                None
            }
            Statement::Let {
                target,
                index: Some(index),
                value,
                ..
            } => {
                let address = self.read_var(frame, target).1 as usize + self.eval(frame, index) as usize;
                let value = self.eval(frame, value);
                self.memory[address] = value;
                None
            }
            Statement::If {
                condition,
                consequent,
                alternate,
                ..
            } => {
                if self.eval(frame, condition) != 0 {
                    self.run_block(frame, consequent)
                } else {
                    alternate
                        .as_ref()
                        .and_then(|alternate| self.run_block(frame, alternate))
                }
            }
            Statement::While { condition, body, .. } => {
                while self.eval(frame, condition) != 0 {
                    if let Some(value) = self.run_block(frame, body) {
                        return Some(value);
                    }
                }
                None
            }
            Statement::Do { call, .. } => {
                self.call(frame, call);
                None
            }
            Statement::Return { value, .. } => {
                Some(value.as_ref().map_or(0, |value| self.eval(frame, value)))
            }
        }
    }

    fn field_index(class: &ClassDecl, kind: ClassVarKind, name: &str) -> Option<(TypeName, usize)> {
        class
            .class_vars
            .iter()
            .filter(|decl| decl.kind == kind)
            .flat_map(|decl| decl.names.iter().map(move |n| (n, &decl.var_type)))
            .enumerate()
            .find(|(_, (n, _))| n.as_str() == name)
            .map(|(index, (_, var_type))| (var_type.clone(), index))
    }

    fn read_var(&self, frame: &Frame<'a>, name: &str) -> (TypeName, i16) {
        if let Some(var) = frame.vars.get(name) {
            return var.clone();
        }
        if let Some((var_type, index)) = Self::field_index(frame.class, ClassVarKind::Field, name) {
            return (var_type, self.memory[frame.this as usize + index]);
        }
        let (var_type, _) = Self::field_index(frame.class, ClassVarKind::Static, name)
            .unwrap_or_else(|| panic!("unresolved {}", name));
        let value = self
            .statics
            .get(&(frame.class.name.clone(), name.to_string()))
            .copied()
            .unwrap_or(0);
        (var_type, value)
    }

    fn assign(&mut self, frame: &mut Frame<'a>, name: &str, value: i16) {
        if let Some(var) = frame.vars.get_mut(name) {
            var.1 = value;
        } else if let Some((_, index)) = Self::field_index(frame.class, ClassVarKind::Field, name) {
            self.memory[frame.this as usize + index] = value;
        } else {
            self.statics
                .insert((frame.class.name.clone(), name.to_string()), value);
        }
    }

    fn is_variable(frame: &Frame<'a>, name: &str) -> bool {
        frame.vars.contains_key(name)
            || Self::field_index(frame.class, ClassVarKind::Field, name).is_some()
            || Self::field_index(frame.class, ClassVarKind::Static, name).is_some()
    }

    fn call(&mut self, frame: &mut Frame<'a>, call: &'a SubroutineCall) -> i16 {
        let mut args = Vec::new();
        let class_name = match &call.receiver {
            Some(receiver) if Self::is_variable(frame, receiver) => {
                let (var_type, object) = self.read_var(frame, receiver);
                args.push(object);
                var_type.as_str().to_string()
            }
            Some(class_name) => class_name.clone(),
            None => {
                args.push(frame.this);
                frame.class.name.clone()
            }
        };
        for argument in &call.arguments {
            let value = self.eval(frame, argument);
            args.push(value);
        }
        self.invoke(&class_name, &call.name, args)
    }

    fn eval(&mut self, frame: &mut Frame<'a>, expression: &'a Expression) -> i16 {
        match &expression.kind {
            ExpressionKind::IntegerConstant(value) => *value as i16,
            ExpressionKind::StringConstant(text) => {
                let object = self.builtin("String.new", &[text.chars().count() as i16]);
                for c in text.chars() {
                    self.builtin("String.appendChar", &[object, c as i16]);
                }
                object
            }
            ExpressionKind::BooleanConstant(value) => truth(*value),
            ExpressionKind::Null => 0,
            ExpressionKind::This => frame.this,
            ExpressionKind::Variable(name) => self.read_var(frame, name).1,
            ExpressionKind::ArrayMember { array, index } => {
                let base = self.read_var(frame, array).1;
                let offset = self.eval(frame, index);
                self.memory[(base as usize) + offset as usize]
            }
            ExpressionKind::Call(call) => self.call(frame, call),
            ExpressionKind::Unary { op, operand } => {
                let value = self.eval(frame, operand);
                match op {
                    UnaryOp::Negate => value.wrapping_neg(),
                    UnaryOp::Not => !value,
                }
            }
            ExpressionKind::Binary { op, left, right } => {
                let x = self.eval(frame, left);
                let y = self.eval(frame, right);
                match op {
                    BinaryOp::Add => x.wrapping_add(y),
                    BinaryOp::Subtract => x.wrapping_sub(y),
                    BinaryOp::Multiply => x.wrapping_mul(y),
                    BinaryOp::Divide => x.wrapping_div(y),
                    BinaryOp::And => x & y,
                    BinaryOp::Or => x | y,
                    BinaryOp::Equal => truth(x == y),
                    BinaryOp::LessThan => truth(x < y),
                    BinaryOp::GreaterThan => truth(x > y),
                    BinaryOp::LessThanOrEqual => truth(x <= y),
                    BinaryOp::GreaterThanOrEqual => truth(x >= y),
                }
            }
        }
    }
}

/// Run `Main.main` both ways and require the same observable behavior
fn assert_equivalent(sources: &[&str]) -> (i16, String) {
    let classes: Vec<ClassDecl> = sources
        .iter()
        .map(|source| parse_source(source).unwrap())
        .collect();

    let mut evaluator = Evaluator::new(&classes);
    let expected_value = evaluator.invoke("Main", "main", Vec::new());

    let compiled: Vec<(String, String)> = sources
        .iter()
        .map(|source| {
            let class = jack_compiler::compile_source("roundtrip", source).unwrap();
            (class.class_name, class.text)
        })
        .collect();
    let execution = run_sources(compiled.as_slice(), DEFAULT_ENTRY).unwrap();

    assert_eq!(execution.output, evaluator.output);
    assert_eq!(execution.return_value, expected_value);
    (execution.return_value, execution.output)
}

#[test]
fn test_print_sum_scenario() {
    let (_, output) = assert_equivalent(&[
        "class Main { function void main() { do Output.printInt(1+2); return; } }",
    ]);
    assert_eq!(output, "3");
}

#[test]
fn test_arithmetic_and_logic() {
    let (value, output) = assert_equivalent(&["
        class Main {
            function int main() {
                var int a, b;
                let a = 7;
                let b = -3;
                do Output.printInt(a * b);
                do Output.println();
                do Output.printInt(a / b);
                do Output.println();
                do Output.printInt((a + b) - (a - b));
                do Output.println();
                do Output.printInt((a & 5) | (~b));
                do Output.println();
                do Output.printInt((a > b) & (b < a));
                do Output.println();
                do Output.printInt((a <= 7) + (a >= 8) + (a = 7));
                do Output.println();
                do Output.printInt(Math.abs(b));
                return 32767 + 1;
            }
        }
    "]);
    assert_eq!(value, -32768);
    assert!(output.starts_with("-21\n-2\n"));
}

#[test]
fn test_control_flow() {
    let (value, output) = assert_equivalent(&["
        class Main {
            function int main() {
                var int i, sum;
                let i = 0;
                let sum = 0;
                while (i < 10) {
                    if ((i / 2) * 2 = i) {
                        let sum = sum + i;
                    } else {
                        do Output.printInt(i);
                    }
                    let i = i + 1;
                }
                if (false) { let sum = 0; }
                while (true) {
                    return sum;
                }
                return -1;
            }
        }
    "]);
    assert_eq!(value, 20);
    assert_eq!(output, "13579");
}

#[test]
fn test_arrays() {
    let (value, _) = assert_equivalent(&["
        class Main {
            function int main() {
                var Array a, b;
                var int i;
                let a = Array.new(5);
                let b = Array.new(5);
                let i = 0;
                while (i < 5) {
                    let a[i] = i * i;
                    let i = i + 1;
                }
                let b[a[2]] = a[3] + a[4];
                let a[a[1]] = b[4];
                do Output.printInt(a[1]);
                return b[4] - a[0];
            }
        }
    "]);
    assert_eq!(value, 25);
}

#[test]
fn test_objects_and_statics() {
    let point = "
        class Point {
            field int x, y;
            static int created;

            constructor Point new(int ax, int ay) {
                let x = ax;
                let y = ay;
                let created = created + 1;
                return this;
            }

            method int sum() { return x + y; }

            method Point plus(Point other) {
                return Point.new(x + other.getX(), y + other.getY());
            }

            method int getX() { return x; }
            method int getY() { return y; }

            function int count() { return created; }

            method int scaled(int k) { return sum() * k; }
        }
    ";
    let main = "
        class Main {
            function int main() {
                var Point p, q;
                let p = Point.new(1, 2);
                let q = p.plus(Point.new(10, 20));
                do Output.printInt(q.sum());
                do Output.printChar(32);
                do Output.printInt(Point.count());
                return q.scaled(2);
            }
        }
    ";
    let (value, output) = assert_equivalent(&[main, point]);
    assert_eq!(value, 66);
    assert_eq!(output, "33 3");
}

#[test]
fn test_strings() {
    let (value, output) = assert_equivalent(&["
        class Main {
            function int main() {
                var String s;
                let s = \"Hello, Jack\";
                do Output.printString(s);
                do Output.printChar(s.charAt(0));
                return s.length();
            }
        }
    "]);
    assert_eq!(value, 11);
    assert_eq!(output, "Hello, JackH");
}
