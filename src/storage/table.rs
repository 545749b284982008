use crate::core::{Column, DataType, DbError, Result, Row, Value};
use std::cmp::Ordering;
use std::collections::BTreeMap;

pub const ID_COLUMN: &str = "id";

#[derive(Debug, Clone)]
pub struct TableSchema {
    name: String,
    columns: Vec<Column>,
}

impl TableSchema {
    /// Schema with a leading `id` column filled from the table's sequence,
    /// like `id serial primary key`.
    pub fn with_serial_id(name: impl Into<String>, columns: Vec<Column>) -> Self {
        let mut all = Vec::with_capacity(columns.len() + 1);
        all.push(Column::new(ID_COLUMN, DataType::Integer).not_null());
        all.extend(columns);
        Self {
            name: name.into(),
            columns: all,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn find_column_index(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|col| col.name == name)
            .ok_or_else(|| DbError::ColumnNotFound(name.to_string(), self.name.clone()))
    }
}

/// Rows keyed by their serial id.
#[derive(Debug, Clone)]
pub struct Table {
    schema: TableSchema,
    rows: BTreeMap<i64, Row>,
    next_id: i64,
}

impl Table {
    pub fn new(schema: TableSchema) -> Self {
        Self {
            schema,
            rows: BTreeMap::new(),
            next_id: 1,
        }
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Insert a row given as `(column index, value)` pairs. Columns not listed
    /// are NULL; the id comes from the sequence unless given explicitly.
    pub fn insert(&mut self, values: Vec<(usize, Value)>) -> Result<Row> {
        let mut row: Row = vec![Value::Null; self.schema.columns.len()];
        for (idx, value) in values {
            row[idx] = value;
        }

        let id = match &row[0] {
            Value::Null => {
                let id = self.next_id;
                self.next_id += 1;
                row[0] = Value::Integer(id);
                id
            }
            Value::Integer(id) => *id,
            other => {
                return Err(DbError::TypeMismatch(format!(
                    "Column 'id' expects type INTEGER, got {}",
                    other.type_name()
                )));
            }
        };

        self.validate_row(&row)?;
        if self.rows.contains_key(&id) {
            return Err(DbError::ConstraintViolation(format!(
                "duplicate key value violates unique constraint: id={}",
                id
            )));
        }

        self.rows.insert(id, row.clone());
        Ok(row)
    }

    /// Apply `assign` to every row matching `filter`, returning the new rows.
    ///
    /// All candidate rows are validated before any is written, so a failing
    /// statement leaves the table untouched.
    pub fn update<A>(&mut self, filter: &RowFilter, mut assign: A) -> Result<Vec<Row>>
    where
        A: FnMut(&Row) -> Result<Vec<(usize, Value)>>,
    {
        let mut staged = Vec::new();
        for (id, row) in self.rows.iter().filter(|(_, row)| filter.matches(row)) {
            let mut new_row = row.clone();
            for (idx, value) in assign(row)? {
                if idx == 0 {
                    return Err(DbError::Unsupported("Updating 'id' is not supported".into()));
                }
                new_row[idx] = value;
            }
            self.validate_row(&new_row)?;
            staged.push((*id, new_row));
        }

        let mut updated = Vec::with_capacity(staged.len());
        for (id, new_row) in staged {
            self.rows.insert(id, new_row.clone());
            updated.push(new_row);
        }
        Ok(updated)
    }

    pub fn delete(&mut self, filter: &RowFilter) -> Vec<Row> {
        let ids: Vec<i64> = self
            .rows
            .iter()
            .filter(|(_, row)| filter.matches(row))
            .map(|(id, _)| *id)
            .collect();

        ids.into_iter()
            .filter_map(|id| self.rows.remove(&id))
            .collect()
    }

    /// Matching rows in id order.
    pub fn scan(&self, filter: &RowFilter) -> Vec<Row> {
        self.rows
            .values()
            .filter(|row| filter.matches(row))
            .cloned()
            .collect()
    }

    fn validate_row(&self, row: &Row) -> Result<()> {
        for (col, value) in self.schema.columns.iter().zip(row) {
            col.validate(value)?;
        }
        Ok(())
    }
}

/// Resolved `WHERE column = value` filter; `All` when there is no WHERE.
#[derive(Debug, Clone, PartialEq)]
pub enum RowFilter {
    All,
    Eq { column: usize, value: Value },
}

impl RowFilter {
    pub fn matches(&self, row: &Row) -> bool {
        match self {
            Self::All => true,
            // NULL never compares equal, as in SQL
            Self::Eq { value: Value::Null, .. } => false,
            Self::Eq { column, value } => row.get(*column) == Some(value),
        }
    }
}

/// Total order used for ORDER BY: integers, then text, NULLs last.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Integer(_) => 0,
            Value::Text(_) => 1,
            Value::Null => 2,
        }
    }

    match (a, b) {
        (Value::Integer(x), Value::Integer(y)) => x.cmp(y),
        (Value::Text(x), Value::Text(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recipes() -> Table {
        Table::new(TableSchema::with_serial_id(
            "recipes",
            vec![
                Column::new("name", DataType::Text).not_null(),
                Column::new("description", DataType::Text).not_null(),
            ],
        ))
    }

    fn text(s: &str) -> Value {
        Value::Text(s.to_string())
    }

    #[test]
    fn test_serial_ids_are_never_reused() {
        let mut table = recipes();
        let first = table.insert(vec![(1, text("a")), (2, text("x"))]).unwrap();
        assert_eq!(first[0], Value::Integer(1));

        table.delete(&RowFilter::Eq {
            column: 0,
            value: Value::Integer(1),
        });
        let second = table.insert(vec![(1, text("b")), (2, text("y"))]).unwrap();
        assert_eq!(second[0], Value::Integer(2));
    }

    #[test]
    fn test_not_null_enforced_on_insert() {
        let mut table = recipes();
        let err = table.insert(vec![(1, text("a"))]).unwrap_err();
        assert!(matches!(err, DbError::ConstraintViolation(_)));
        assert_eq!(table.row_count(), 0);
    }

    #[test]
    fn test_update_is_all_or_nothing() {
        let mut table = recipes();
        table.insert(vec![(1, text("a")), (2, text("x"))]).unwrap();
        table.insert(vec![(1, text("b")), (2, text("y"))]).unwrap();

        let result = table.update(&RowFilter::All, |row| {
            if row[1] == text("b") {
                Ok(vec![(2, Value::Null)])
            } else {
                Ok(vec![(2, text("changed"))])
            }
        });

        assert!(result.is_err());
        assert!(table.scan(&RowFilter::All).iter().all(|r| r[2] != text("changed")));
    }

    #[test]
    fn test_null_filter_matches_nothing() {
        let mut table = recipes();
        table.insert(vec![(1, text("a")), (2, text("x"))]).unwrap();
        let filter = RowFilter::Eq {
            column: 1,
            value: Value::Null,
        };
        assert!(table.scan(&filter).is_empty());
    }

    #[test]
    fn test_compare_values_puts_nulls_last() {
        assert_eq!(
            compare_values(&Value::Integer(1), &Value::Integer(2)),
            Ordering::Less
        );
        assert_eq!(compare_values(&Value::Null, &text("a")), Ordering::Greater);
    }
}
