use crate::core::{Row, Value};

/// Rows returned by a statement plus the number of rows it touched.
///
/// For statements with a `RETURNING` clause `rows_affected` equals the number
/// of returned rows; for a plain SELECT it is the number of rows read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    pub rows_affected: u64,
}

impl QueryResult {
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        let rows_affected = rows.len() as u64;
        Self {
            columns,
            rows,
            rows_affected,
        }
    }

    /// Result of a statement that reports a count but returns no rows.
    pub fn affected(count: u64) -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
            rows_affected: count,
        }
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn rows_affected(&self) -> u64 {
        self.rows_affected
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Value of `column` in the first row, if any.
    pub fn first_value(&self, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.first().and_then(|row| row.get(idx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_counts_rows_as_affected() {
        let result = QueryResult::new(
            vec!["id".into()],
            vec![vec![Value::Integer(1)], vec![Value::Integer(2)]],
        );
        assert_eq!(result.rows_affected(), 2);
        assert_eq!(result.first_value("id"), Some(&Value::Integer(1)));
        assert_eq!(result.first_value("name"), None);
    }

    #[test]
    fn test_affected_only() {
        let result = QueryResult::affected(3);
        assert!(result.is_empty());
        assert_eq!(result.rows_affected(), 3);
    }
}
