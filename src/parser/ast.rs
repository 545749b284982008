//! Statement shapes understood by the in-memory store.
//!
//! Single-table INSERT / UPDATE / DELETE / SELECT with equality filters.
//! Anything richer is rejected during conversion.

use crate::core::Value;

/// Root statement type
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Insert(InsertStmt),
    Update(UpdateStmt),
    Delete(DeleteStmt),
    Query(QueryStmt),
}

/// INSERT statement
#[derive(Debug, Clone, PartialEq)]
pub struct InsertStmt {
    pub table_name: String,
    pub columns: Vec<String>,
    pub values: Vec<Vec<Expr>>,
    pub returning: Vec<SelectItem>,
}

/// UPDATE statement
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateStmt {
    pub table_name: String,
    pub assignments: Vec<Assignment>,
    pub selection: Option<Condition>,
    pub returning: Vec<SelectItem>,
}

/// DELETE statement
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteStmt {
    pub table_name: String,
    pub selection: Option<Condition>,
    pub returning: Vec<SelectItem>,
}

/// SELECT query statement
#[derive(Debug, Clone, PartialEq)]
pub struct QueryStmt {
    pub table_name: String,
    pub projection: Vec<SelectItem>,
    pub selection: Option<Condition>,
    pub order_by: Option<OrderByExpr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub column: String,
    pub value: Expr,
}

/// `column = value`
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub column: String,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectItem {
    Wildcard,
    Column(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderByExpr {
    pub column: String,
    pub descending: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Column(String),
    Literal(Value),
    /// 1-based positional parameter (`$1` is `Placeholder(1)`)
    Placeholder(usize),
}
