use super::table::{RowFilter, Table, TableSchema, compare_values};
use crate::core::{Column, DataType, DbError, Result, Row, Value};
use crate::interface::{DatabaseClient, DatabaseFactory};
use crate::parser::SqlParserAdapter;
use crate::parser::ast::{
    Condition, DeleteStmt, Expr, InsertStmt, QueryStmt, SelectItem, Statement, UpdateStmt,
};
use crate::result::QueryResult;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-process SQL store.
///
/// Clones share the same tables, so one `MemoryStore` can serve as both the
/// connection factory and every connection it hands out. Each statement runs
/// under a single table-map lock and is therefore atomic.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<HashMap<String, Table>>>,
    parser: Arc<SqlParserAdapter>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store with the `recipes` table already declared:
    /// `recipes(id serial primary key, name text not null, description text not null, photo text not null)`
    pub fn recipes() -> Self {
        let schema = TableSchema::with_serial_id(
            "recipes",
            vec![
                Column::new("name", DataType::Text).not_null(),
                Column::new("description", DataType::Text).not_null(),
                Column::new("photo", DataType::Text).not_null(),
            ],
        );
        let tables = HashMap::from([(schema.name().to_string(), Table::new(schema))]);
        Self {
            tables: Arc::new(RwLock::new(tables)),
            parser: Arc::new(SqlParserAdapter::new()),
        }
    }

    pub async fn row_count(&self, table_name: &str) -> Result<usize> {
        let tables = self.tables.read().await;
        lookup(&tables, table_name).map(Table::row_count)
    }

    async fn run(&self, stmt: Statement, params: &[Value]) -> Result<QueryResult> {
        match stmt {
            Statement::Query(query) => {
                let tables = self.tables.read().await;
                execute_query(lookup(&tables, &query.table_name)?, query, params)
            }
            Statement::Insert(insert) => {
                let mut tables = self.tables.write().await;
                execute_insert(lookup_mut(&mut tables, &insert.table_name)?, insert, params)
            }
            Statement::Update(update) => {
                let mut tables = self.tables.write().await;
                execute_update(lookup_mut(&mut tables, &update.table_name)?, update, params)
            }
            Statement::Delete(delete) => {
                let mut tables = self.tables.write().await;
                execute_delete(lookup_mut(&mut tables, &delete.table_name)?, delete, params)
            }
        }
    }
}

#[async_trait]
impl DatabaseClient for MemoryStore {
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        let stmt = self.parser.parse(sql)?;
        self.run(stmt, params).await
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl DatabaseFactory for MemoryStore {
    type Client = MemoryStore;

    async fn connect(&self) -> Result<MemoryStore> {
        Ok(self.clone())
    }
}

fn lookup<'a>(tables: &'a HashMap<String, Table>, name: &str) -> Result<&'a Table> {
    tables
        .get(name)
        .ok_or_else(|| DbError::TableNotFound(name.to_string()))
}

fn lookup_mut<'a>(tables: &'a mut HashMap<String, Table>, name: &str) -> Result<&'a mut Table> {
    tables
        .get_mut(name)
        .ok_or_else(|| DbError::TableNotFound(name.to_string()))
}

/// Evaluate an expression; column references read from `row` when present.
fn resolve(expr: &Expr, params: &[Value], schema: &TableSchema, row: Option<&Row>) -> Result<Value> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Placeholder(idx) => params.get(idx - 1).cloned().ok_or_else(|| {
            DbError::Parse(format!(
                "placeholder ${} has no bound parameter ({} given)",
                idx,
                params.len()
            ))
        }),
        Expr::Column(name) => {
            let idx = schema.find_column_index(name)?;
            row.map(|r| r[idx].clone()).ok_or_else(|| {
                DbError::Unsupported(format!("column '{}' cannot be used here", name))
            })
        }
    }
}

fn resolve_filter(
    selection: Option<&Condition>,
    params: &[Value],
    schema: &TableSchema,
) -> Result<RowFilter> {
    let Some(cond) = selection else {
        return Ok(RowFilter::All);
    };

    let column = schema.find_column_index(&cond.column)?;
    let value = resolve(&cond.value, params, schema, None)?;
    let col = &schema.columns()[column];
    if !col.data_type.is_compatible(&value) {
        return Err(DbError::TypeMismatch(format!(
            "cannot compare column '{}' of type {} with {}",
            col.name,
            col.data_type,
            value.type_name()
        )));
    }

    Ok(RowFilter::Eq { column, value })
}

/// Column names and indices for a projection list
fn project(schema: &TableSchema, items: &[SelectItem]) -> Result<(Vec<String>, Vec<usize>)> {
    let mut names = Vec::new();
    let mut indices = Vec::new();
    for item in items {
        match item {
            SelectItem::Wildcard => {
                names.extend(schema.column_names());
                indices.extend(0..schema.columns().len());
            }
            SelectItem::Column(name) => {
                indices.push(schema.find_column_index(name)?);
                names.push(name.clone());
            }
        }
    }
    Ok((names, indices))
}

fn pick(rows: Vec<Row>, indices: &[usize]) -> Vec<Row> {
    rows.into_iter()
        .map(|row| indices.iter().map(|i| row[*i].clone()).collect())
        .collect()
}

/// Rows for a RETURNING clause, or just the count when there is none
fn returning_result(schema: &TableSchema, returning: &[SelectItem], rows: Vec<Row>) -> Result<QueryResult> {
    if returning.is_empty() {
        return Ok(QueryResult::affected(rows.len() as u64));
    }
    let (columns, indices) = project(schema, returning)?;
    Ok(QueryResult::new(columns, pick(rows, &indices)))
}

fn execute_query(table: &Table, query: QueryStmt, params: &[Value]) -> Result<QueryResult> {
    let schema = table.schema();
    let filter = resolve_filter(query.selection.as_ref(), params, schema)?;
    let (columns, indices) = project(schema, &query.projection)?;

    let mut rows = table.scan(&filter);
    if let Some(order) = &query.order_by {
        let idx = schema.find_column_index(&order.column)?;
        rows.sort_by(|a, b| {
            let ord = compare_values(&a[idx], &b[idx]);
            if order.descending { ord.reverse() } else { ord }
        });
    }

    Ok(QueryResult::new(columns, pick(rows, &indices)))
}

fn execute_insert(table: &mut Table, insert: InsertStmt, params: &[Value]) -> Result<QueryResult> {
    let schema = table.schema().clone();
    let indices = insert
        .columns
        .iter()
        .map(|c| schema.find_column_index(c))
        .collect::<Result<Vec<_>>>()?;

    // Resolve everything first so a bad row inserts nothing.
    let mut staged = Vec::with_capacity(insert.values.len());
    for row in &insert.values {
        if row.len() != indices.len() {
            return Err(DbError::Parse(format!(
                "INSERT has {} target columns but {} values",
                indices.len(),
                row.len()
            )));
        }
        let values = row
            .iter()
            .zip(&indices)
            .map(|(expr, idx)| Ok((*idx, resolve(expr, params, &schema, None)?)))
            .collect::<Result<Vec<_>>>()?;
        staged.push(values);
    }

    let mut inserted = Vec::with_capacity(staged.len());
    for values in staged {
        inserted.push(table.insert(values)?);
    }

    returning_result(&schema, &insert.returning, inserted)
}

fn execute_update(table: &mut Table, update: UpdateStmt, params: &[Value]) -> Result<QueryResult> {
    let schema = table.schema().clone();
    let filter = resolve_filter(update.selection.as_ref(), params, &schema)?;
    let targets = update
        .assignments
        .iter()
        .map(|a| Ok((schema.find_column_index(&a.column)?, &a.value)))
        .collect::<Result<Vec<_>>>()?;

    let updated = table.update(&filter, |row| {
        targets
            .iter()
            .map(|(idx, expr)| Ok((*idx, resolve(expr, params, &schema, Some(row))?)))
            .collect()
    })?;

    returning_result(&schema, &update.returning, updated)
}

fn execute_delete(table: &mut Table, delete: DeleteStmt, params: &[Value]) -> Result<QueryResult> {
    let schema = table.schema().clone();
    let filter = resolve_filter(delete.selection.as_ref(), params, &schema)?;
    let deleted = table.delete(&filter);
    returning_result(&schema, &delete.returning, deleted)
}
