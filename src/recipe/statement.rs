//! Parameterized statements for the recipes table.
//!
//! Identifiers come only from [`RecipeField::column`] and the table name the
//! caller passes in; every value travels as a bound parameter.

use super::error::IntentError;
use super::intent::UpdateIntent;
use super::model::{NewRecipe, Recipe, RecipeField};
use crate::core::Value;
use crate::storage::table::ID_COLUMN;

/// SQL text plus its positional parameters (`$1` is `params[0]`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

impl Statement {
    fn new(sql: String, params: Vec<Value>) -> Self {
        Self { sql, params }
    }
}

/// `UPDATE t SET f1 = $1, ... WHERE id = $n+1 RETURNING id`
///
/// Fields appear in canonical order and the id is always the last parameter.
pub fn build_patch(table: &str, id: i64, intent: &UpdateIntent) -> Result<Statement, IntentError> {
    if intent.is_empty() {
        return Err(IntentError::invalid("no fields to update"));
    }
    intent.validate()?;

    Ok(build_update(
        table,
        id,
        intent.iter().map(|(field, value)| (field, value.to_string())),
    ))
}

/// Full-set update used by replace.
pub fn build_replace(table: &str, id: i64, recipe: &NewRecipe) -> Statement {
    build_update(
        table,
        id,
        RecipeField::ALL
            .into_iter()
            .map(|field| (field, recipe.value(field).to_string())),
    )
}

fn build_update(
    table: &str,
    id: i64,
    fields: impl Iterator<Item = (RecipeField, String)>,
) -> Statement {
    let mut assignments = Vec::new();
    let mut params = Vec::new();
    for (position, (field, value)) in fields.enumerate() {
        assignments.push(format!("{} = ${}", field.column(), position + 1));
        params.push(Value::Text(value));
    }
    params.push(Value::Integer(id));

    let sql = format!(
        "UPDATE {} SET {} WHERE {} = ${} RETURNING {}",
        table,
        assignments.join(", "),
        ID_COLUMN,
        params.len(),
        ID_COLUMN
    );
    Statement::new(sql, params)
}

/// `INSERT INTO t (name, description, photo) VALUES ($1, $2, $3) RETURNING id`
pub fn build_insert(table: &str, recipe: &NewRecipe) -> Statement {
    let columns: Vec<&str> = RecipeField::ALL.iter().map(|f| f.column()).collect();
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("${}", i)).collect();
    let params = RecipeField::ALL
        .into_iter()
        .map(|field| Value::from(recipe.value(field)))
        .collect();

    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
        table,
        columns.join(", "),
        placeholders.join(", "),
        ID_COLUMN
    );
    Statement::new(sql, params)
}

pub fn build_delete(table: &str, id: i64) -> Statement {
    Statement::new(
        format!(
            "DELETE FROM {} WHERE {} = $1 RETURNING {}",
            table, ID_COLUMN, ID_COLUMN
        ),
        vec![Value::Integer(id)],
    )
}

pub fn build_select_one(table: &str, id: i64) -> Statement {
    Statement::new(
        format!(
            "SELECT {} FROM {} WHERE {} = $1",
            Recipe::COLUMNS.join(", "),
            table,
            ID_COLUMN
        ),
        vec![Value::Integer(id)],
    )
}

pub fn build_select_all(table: &str) -> Statement {
    Statement::new(
        format!(
            "SELECT {} FROM {} ORDER BY {}",
            Recipe::COLUMNS.join(", "),
            table,
            ID_COLUMN
        ),
        Vec::new(),
    )
}
