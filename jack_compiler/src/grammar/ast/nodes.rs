//! AST nodes for Jack classes
//!
//! The tree is owned top-down: a class owns its variable and subroutine
//! lists, a subroutine owns its parameters, locals and statements, and
//! statements own their expressions. There are no back-references.

use crate::grammar::keywords::Keyword;
use crate::tokens::Symbol;
use crate::utils::Span;
use serde::{Deserialize, Serialize};
use std::fmt;

pub type Identifier = String;

// === TYPES ===

/// Declared type of a variable, parameter or return value
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeName {
    Int,
    Char,
    Boolean,
    /// Any class name, including `Array` and `String`
    Class(Identifier),
}

impl TypeName {
    pub fn from_keyword(keyword: Keyword) -> Option<Self> {
        match keyword {
            Keyword::Int => Some(Self::Int),
            Keyword::Char => Some(Self::Char),
            Keyword::Boolean => Some(Self::Boolean),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Int => "int",
            Self::Char => "char",
            Self::Boolean => "boolean",
            Self::Class(name) => name,
        }
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Return type of a subroutine; `None` is `void`
pub type ReturnType = Option<TypeName>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClassVarKind {
    Static,
    Field,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubroutineKind {
    Constructor,
    Function,
    Method,
}

impl SubroutineKind {
    pub fn from_keyword(keyword: Keyword) -> Option<Self> {
        match keyword {
            Keyword::Constructor => Some(Self::Constructor),
            Keyword::Function => Some(Self::Function),
            Keyword::Method => Some(Self::Method),
            _ => None,
        }
    }
}

impl fmt::Display for SubroutineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Constructor => "constructor",
            Self::Function => "function",
            Self::Method => "method",
        };
        f.write_str(s)
    }
}

// === OPERATORS ===

/// Binary operators with their precedence level, lowest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Or,
    And,
    Equal,
    LessThan,
    GreaterThan,
    LessThanOrEqual,
    GreaterThanOrEqual,
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl BinaryOp {
    pub const LOWEST_PRECEDENCE: u8 = 1;
    pub const HIGHEST_PRECEDENCE: u8 = 6;

    pub fn from_symbol(symbol: Symbol) -> Option<Self> {
        Some(match symbol {
            Symbol::Or => Self::Or,
            Symbol::And => Self::And,
            Symbol::Equals => Self::Equal,
            Symbol::LessThan => Self::LessThan,
            Symbol::GreaterThan => Self::GreaterThan,
            Symbol::LessThanOrEqual => Self::LessThanOrEqual,
            Symbol::GreaterThanOrEqual => Self::GreaterThanOrEqual,
            Symbol::Plus => Self::Add,
            Symbol::Minus => Self::Subtract,
            Symbol::Multiply => Self::Multiply,
            Symbol::Divide => Self::Divide,
            _ => return None,
        })
    }

    /// 1 (`|`) binds loosest, 6 (`*` `/`) tightest
    pub fn precedence(self) -> u8 {
        match self {
            Self::Or => 1,
            Self::And => 2,
            Self::Equal => 3,
            Self::LessThan
            | Self::GreaterThan
            | Self::LessThanOrEqual
            | Self::GreaterThanOrEqual => 4,
            Self::Add | Self::Subtract => 5,
            Self::Multiply | Self::Divide => 6,
        }
    }

    pub fn symbol(self) -> Symbol {
        match self {
            Self::Or => Symbol::Or,
            Self::And => Symbol::And,
            Self::Equal => Symbol::Equals,
            Self::LessThan => Symbol::LessThan,
            Self::GreaterThan => Symbol::GreaterThan,
            Self::LessThanOrEqual => Symbol::LessThanOrEqual,
            Self::GreaterThanOrEqual => Symbol::GreaterThanOrEqual,
            Self::Add => Symbol::Plus,
            Self::Subtract => Symbol::Minus,
            Self::Multiply => Symbol::Multiply,
            Self::Divide => Symbol::Divide,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    /// `-`
    Negate,
    /// `~`
    Not,
}

impl UnaryOp {
    pub fn from_symbol(symbol: Symbol) -> Option<Self> {
        match symbol {
            Symbol::Minus => Some(Self::Negate),
            Symbol::Not => Some(Self::Not),
            _ => None,
        }
    }
}

// === DECLARATIONS ===

/// `class Name { ClassVarDecl* SubroutineDecl* }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDecl {
    pub name: Identifier,
    pub class_vars: Vec<ClassVarDecl>,
    pub subroutines: Vec<SubroutineDecl>,
    pub span: Span,
}

impl ClassDecl {
    /// Number of field slots an instance occupies
    pub fn field_count(&self) -> usize {
        self.class_vars
            .iter()
            .filter(|decl| decl.kind == ClassVarKind::Field)
            .map(|decl| decl.names.len())
            .sum()
    }

    pub fn static_count(&self) -> usize {
        self.class_vars
            .iter()
            .filter(|decl| decl.kind == ClassVarKind::Static)
            .map(|decl| decl.names.len())
            .sum()
    }

    pub fn subroutine(&self, name: &str) -> Option<&SubroutineDecl> {
        self.subroutines.iter().find(|s| s.name == name)
    }
}

/// `(static|field) Type name (, name)* ;`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassVarDecl {
    pub kind: ClassVarKind,
    pub var_type: TypeName,
    pub names: Vec<Identifier>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubroutineDecl {
    pub kind: SubroutineKind,
    pub return_type: ReturnType,
    pub name: Identifier,
    pub parameters: Vec<Parameter>,
    pub locals: Vec<VarDecl>,
    pub body: Vec<Statement>,
    pub span: Span,
}

impl SubroutineDecl {
    /// Local slots needed by `function Class.name nLocals`
    pub fn local_count(&self) -> usize {
        self.locals.iter().map(|decl| decl.names.len()).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub var_type: TypeName,
    pub name: Identifier,
    pub span: Span,
}

/// `var Type name (, name)* ;`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarDecl {
    pub var_type: TypeName,
    pub names: Vec<Identifier>,
    pub span: Span,
}

// === STATEMENTS ===

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Statement {
    /// `let name ([index])? = value ;`
    Let {
        target: Identifier,
        index: Option<Expression>,
        value: Expression,
        span: Span,
    },
    If {
        condition: Expression,
        consequent: Vec<Statement>,
        alternate: Option<Vec<Statement>>,
        span: Span,
    },
    While {
        condition: Expression,
        body: Vec<Statement>,
        span: Span,
    },
    Do {
        call: SubroutineCall,
        span: Span,
    },
    Return {
        value: Option<Expression>,
        span: Span,
    },
}

impl Statement {
    pub fn span(&self) -> Span {
        match self {
            Self::Let { span, .. }
            | Self::If { span, .. }
            | Self::While { span, .. }
            | Self::Do { span, .. }
            | Self::Return { span, .. } => *span,
        }
    }
}

// === EXPRESSIONS ===

/// A call; `receiver` is `Some` only for the dotted form `recv.name(args)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubroutineCall {
    pub receiver: Option<Identifier>,
    pub name: Identifier,
    pub arguments: Vec<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expression {
    pub kind: ExpressionKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExpressionKind {
    IntegerConstant(u16),
    StringConstant(String),
    BooleanConstant(bool),
    Null,
    This,
    Variable(Identifier),
    ArrayMember {
        array: Identifier,
        index: Box<Expression>,
    },
    Call(SubroutineCall),
    Unary {
        op: UnaryOp,
        operand: Box<Expression>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
}

impl Expression {
    pub fn new(kind: ExpressionKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn binary(op: BinaryOp, left: Expression, right: Expression) -> Self {
        let span = left.span.merge(right.span);
        Self::new(
            ExpressionKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            span,
        )
    }
}
