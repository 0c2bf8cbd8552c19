//! Defines the AST for SQL expressions.

use crate::query::ast::select::Select;
use model::core::value::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A column or table identifier, e.g., `users` or `users.id`.
    Identifier(Ident),

    /// A bound value. Always rendered as a placeholder, never inlined.
    Value(Value),

    /// Raw SQL emitted verbatim, e.g. the `1` in `SELECT 1`.
    Literal(String),

    /// A binary operation, e.g., `column = 'value'` or `a LIKE b`.
    BinaryOp(Box<BinaryOp>),

    /// An n-ary `AND` / `OR` over its operands.
    Logical(Logical),

    /// `NOT (expr)`
    Not(Box<Expr>),

    /// `expr IN (a, b)` or `expr NOT IN (a, b)`
    InList {
        expr: Box<Expr>,
        list: Vec<Expr>,
        negated: bool,
    },

    /// `expr IS NULL` or `expr IS NOT NULL`
    IsNull { expr: Box<Expr>, negated: bool },

    /// `EXISTS (subquery)` or `NOT EXISTS (subquery)`
    Exists { subquery: Box<Select>, negated: bool },

    /// A function call, e.g., `COUNT(*)` or `COUNT(DISTINCT id)`.
    FunctionCall(FunctionCall),

    /// An aliased expression, e.g. `COUNT(*) AS total_count`
    Alias { expr: Box<Expr>, alias: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    pub qualifier: Option<String>, // e.g., the 'users' in 'users.id'
    pub name: String,              // e.g., the 'id' in 'users.id'
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryOp {
    pub left: Expr,
    pub op: BinaryOperator,
    pub right: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Logical {
    pub op: LogicalOperator,
    pub operands: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    pub args: Vec<Expr>,
    pub wildcard: bool, // represents the '*' in 'COUNT(*)'
    pub distinct: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Eq,    // =
    NotEq, // <>
    Lt,    // <
    LtEq,  // <=
    Gt,    // >
    GtEq,  // >=
    Like,
    NotLike,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOperator {
    And,
    Or,
}

impl Expr {
    pub fn binary(left: Expr, op: BinaryOperator, right: Expr) -> Self {
        Expr::BinaryOp(Box::new(BinaryOp { left, op, right }))
    }

    /// Combines operands with `op`, collapsing a single operand to itself.
    pub fn logical(op: LogicalOperator, mut operands: Vec<Expr>) -> Self {
        if operands.len() == 1 {
            return operands.remove(0);
        }
        Expr::Logical(Logical { op, operands })
    }

    pub fn and(operands: Vec<Expr>) -> Self {
        Self::logical(LogicalOperator::And, operands)
    }

    pub fn or(operands: Vec<Expr>) -> Self {
        Self::logical(LogicalOperator::Or, operands)
    }

    pub fn negate(self) -> Self {
        Expr::Not(Box::new(self))
    }

    pub fn is_null(self) -> Self {
        Expr::IsNull {
            expr: Box::new(self),
            negated: false,
        }
    }

    pub fn is_not_null(self) -> Self {
        Expr::IsNull {
            expr: Box::new(self),
            negated: true,
        }
    }

    pub fn function(name: &str, args: Vec<Expr>) -> Self {
        Expr::FunctionCall(FunctionCall {
            name: name.to_string(),
            args,
            wildcard: false,
            distinct: false,
        })
    }
}
