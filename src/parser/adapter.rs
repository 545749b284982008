use crate::core::{DbError, Result, Value};
use crate::parser::ast::*;
use sqlparser::ast as sql_ast;
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;

/// Lowers PostgreSQL-dialect SQL into the store's statement AST.
pub struct SqlParserAdapter {
    dialect: PostgreSqlDialect,
}

impl SqlParserAdapter {
    pub fn new() -> Self {
        Self {
            dialect: PostgreSqlDialect {},
        }
    }

    /// Parse exactly one statement.
    pub fn parse(&self, sql: &str) -> Result<Statement> {
        let mut external_stmts =
            Parser::parse_sql(&self.dialect, sql).map_err(|e| DbError::Parse(e.to_string()))?;

        if external_stmts.len() != 1 {
            return Err(DbError::Parse(format!(
                "expected exactly one statement, got {}",
                external_stmts.len()
            )));
        }

        self.convert_statement(external_stmts.remove(0))
    }

    fn convert_statement(&self, stmt: sql_ast::Statement) -> Result<Statement> {
        match stmt {
            sql_ast::Statement::Insert(insert) => Ok(Statement::Insert(self.convert_insert(insert)?)),
            sql_ast::Statement::Query(query) => Ok(Statement::Query(self.convert_query(*query)?)),
            sql_ast::Statement::Delete(delete) => Ok(Statement::Delete(self.convert_delete(delete)?)),
            sql_ast::Statement::Update {
                table,
                assignments,
                selection,
                returning,
                ..
            } => Ok(Statement::Update(self.convert_update(
                table,
                assignments,
                selection,
                returning,
            )?)),
            _ => Err(DbError::Unsupported(format!(
                "Statement type not supported: {}",
                stmt
            ))),
        }
    }

    fn convert_insert(&self, insert: sql_ast::Insert) -> Result<InsertStmt> {
        let table_name = insert.table.to_string();

        if insert.columns.is_empty() {
            return Err(DbError::Unsupported(
                "INSERT requires an explicit column list".into(),
            ));
        }
        let columns = insert.columns.into_iter().map(|id| id.value).collect();

        let Some(source) = insert.source else {
            return Err(DbError::Parse("INSERT requires a VALUES clause".into()));
        };
        let sql_ast::SetExpr::Values(vals) = *source.body else {
            return Err(DbError::Unsupported("Only VALUES clause supported".into()));
        };

        let values = vals
            .rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|expr| self.convert_expr(expr))
                    .collect::<Result<Vec<_>>>()
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(InsertStmt {
            table_name,
            columns,
            values,
            returning: self.convert_returning(insert.returning)?,
        })
    }

    fn convert_update(
        &self,
        table: sql_ast::TableWithJoins,
        assignments: Vec<sql_ast::Assignment>,
        selection: Option<sql_ast::Expr>,
        returning: Option<Vec<sql_ast::SelectItem>>,
    ) -> Result<UpdateStmt> {
        if !table.joins.is_empty() {
            return Err(DbError::Unsupported("JOIN not supported in UPDATE".into()));
        }
        let table_name = self.convert_table_factor(table.relation)?;

        let assignments = assignments
            .into_iter()
            .map(|assign| {
                let column = match assign.target {
                    sql_ast::AssignmentTarget::ColumnName(col_name) => {
                        if col_name.0.len() == 1 {
                            col_name.0[0].to_string()
                        } else {
                            return Err(DbError::Unsupported(
                                "Qualified column names not supported in UPDATE".into(),
                            ));
                        }
                    }
                    _ => {
                        return Err(DbError::Unsupported(
                            "Only simple column names supported in UPDATE".into(),
                        ));
                    }
                };

                let value = self.convert_expr(assign.value)?;

                Ok(Assignment { column, value })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(UpdateStmt {
            table_name,
            assignments,
            selection: selection.map(|expr| self.convert_condition(expr)).transpose()?,
            returning: self.convert_returning(returning)?,
        })
    }

    fn convert_delete(&self, delete: sql_ast::Delete) -> Result<DeleteStmt> {
        let tables = match delete.from {
            sql_ast::FromTable::WithFromKeyword(tables) => tables,
            sql_ast::FromTable::WithoutKeyword(tables) => tables,
        };

        let mut tables = tables.into_iter();
        let (Some(table), None) = (tables.next(), tables.next()) else {
            return Err(DbError::Parse("DELETE requires exactly one table".into()));
        };
        if !table.joins.is_empty() {
            return Err(DbError::Unsupported("JOIN not supported in DELETE".into()));
        }

        Ok(DeleteStmt {
            table_name: self.convert_table_factor(table.relation)?,
            selection: delete
                .selection
                .map(|expr| self.convert_condition(expr))
                .transpose()?,
            returning: self.convert_returning(delete.returning)?,
        })
    }

    fn convert_query(&self, query: sql_ast::Query) -> Result<QueryStmt> {
        let sql_ast::SetExpr::Select(select) = *query.body else {
            return Err(DbError::Unsupported("Only SELECT queries supported".into()));
        };
        let select = *select;

        let mut from = select.from.into_iter();
        let (Some(table), None) = (from.next(), from.next()) else {
            return Err(DbError::Unsupported(
                "SELECT must read from exactly one table".into(),
            ));
        };
        if !table.joins.is_empty() {
            return Err(DbError::Unsupported("JOIN not supported".into()));
        }

        let projection = select
            .projection
            .into_iter()
            .map(|item| self.convert_select_item(item))
            .collect::<Result<Vec<_>>>()?;

        Ok(QueryStmt {
            table_name: self.convert_table_factor(table.relation)?,
            projection,
            selection: select
                .selection
                .map(|expr| self.convert_condition(expr))
                .transpose()?,
            order_by: self.convert_order_by(query.order_by)?,
        })
    }

    fn convert_order_by(&self, order_by: Option<sql_ast::OrderBy>) -> Result<Option<OrderByExpr>> {
        let Some(order_by) = order_by else {
            return Ok(None);
        };

        let sql_ast::OrderByKind::Expressions(exprs) = order_by.kind else {
            return Err(DbError::Unsupported("ORDER BY ALL not supported".into()));
        };

        let mut exprs = exprs.into_iter();
        let (Some(order), None) = (exprs.next(), exprs.next()) else {
            return Err(DbError::Unsupported(
                "Only a single ORDER BY column is supported".into(),
            ));
        };

        let Expr::Column(column) = self.convert_expr(order.expr)? else {
            return Err(DbError::Unsupported("ORDER BY must name a column".into()));
        };

        // asc: Some(true) = ASC, Some(false) = DESC, None = ASC
        let descending = order.options.asc.map(|asc| !asc).unwrap_or(false);

        Ok(Some(OrderByExpr { column, descending }))
    }

    fn convert_returning(
        &self,
        returning: Option<Vec<sql_ast::SelectItem>>,
    ) -> Result<Vec<SelectItem>> {
        returning
            .unwrap_or_default()
            .into_iter()
            .map(|item| self.convert_select_item(item))
            .collect()
    }

    fn convert_select_item(&self, item: sql_ast::SelectItem) -> Result<SelectItem> {
        match item {
            sql_ast::SelectItem::Wildcard(_) => Ok(SelectItem::Wildcard),
            sql_ast::SelectItem::UnnamedExpr(expr) => match self.convert_expr(expr)? {
                Expr::Column(name) => Ok(SelectItem::Column(name)),
                other => Err(DbError::Unsupported(format!(
                    "Only column projections supported, got {:?}",
                    other
                ))),
            },
            _ => Err(DbError::Unsupported("Unsupported select item".into())),
        }
    }

    fn convert_table_factor(&self, factor: sql_ast::TableFactor) -> Result<String> {
        match factor {
            sql_ast::TableFactor::Table { name, .. } => extract_table_name(&name),
            _ => Err(DbError::Unsupported(
                "Complex table references not supported".into(),
            )),
        }
    }

    /// `column = expr`, the only filter shape the store evaluates
    fn convert_condition(&self, expr: sql_ast::Expr) -> Result<Condition> {
        match expr {
            sql_ast::Expr::Nested(inner) => self.convert_condition(*inner),
            sql_ast::Expr::BinaryOp {
                left,
                op: sql_ast::BinaryOperator::Eq,
                right,
            } => {
                let Expr::Column(column) = self.convert_expr(*left)? else {
                    return Err(DbError::Unsupported(
                        "WHERE must compare a column on the left-hand side".into(),
                    ));
                };
                Ok(Condition {
                    column,
                    value: self.convert_expr(*right)?,
                })
            }
            other => Err(DbError::Unsupported(format!(
                "Only `column = value` filters supported, got: {}",
                other
            ))),
        }
    }

    fn convert_expr(&self, expr: sql_ast::Expr) -> Result<Expr> {
        match expr {
            sql_ast::Expr::Identifier(ident) => Ok(Expr::Column(ident.value)),
            sql_ast::Expr::Nested(inner) => self.convert_expr(*inner),
            sql_ast::Expr::Value(val) => self.convert_value(val.value),
            other => Err(DbError::Unsupported(format!(
                "Unsupported expression: {}",
                other
            ))),
        }
    }

    fn convert_value(&self, val: sql_ast::Value) -> Result<Expr> {
        match val {
            sql_ast::Value::Placeholder(p) => parse_placeholder(&p).map(Expr::Placeholder),
            sql_ast::Value::Number(n, _) => n
                .parse::<i64>()
                .map(|i| Expr::Literal(Value::Integer(i)))
                .map_err(|_| DbError::TypeMismatch(format!("Invalid integer: {}", n))),
            sql_ast::Value::SingleQuotedString(s) => Ok(Expr::Literal(Value::Text(s))),
            sql_ast::Value::Null => Ok(Expr::Literal(Value::Null)),
            other => Err(DbError::Unsupported(format!("Unsupported value: {}", other))),
        }
    }
}

impl Default for SqlParserAdapter {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_placeholder(raw: &str) -> Result<usize> {
    raw.strip_prefix('$')
        .and_then(|digits| digits.parse::<usize>().ok())
        .filter(|idx| *idx >= 1)
        .ok_or_else(|| DbError::Parse(format!("Invalid placeholder: {}", raw)))
}

fn extract_table_name(name: &sql_ast::ObjectName) -> Result<String> {
    name.0
        .last()
        .map(|ident| ident.to_string())
        .ok_or_else(|| DbError::Parse("Invalid table name".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_patch_update() {
        let adapter = SqlParserAdapter::new();
        let stmt = adapter
            .parse("UPDATE recipes SET name = $1, photo = $2 WHERE id = $3 RETURNING id")
            .unwrap();

        let Statement::Update(update) = stmt else {
            panic!("Expected Update");
        };

        assert_eq!(update.table_name, "recipes");
        assert_eq!(
            update.assignments,
            vec![
                Assignment {
                    column: "name".into(),
                    value: Expr::Placeholder(1)
                },
                Assignment {
                    column: "photo".into(),
                    value: Expr::Placeholder(2)
                },
            ]
        );
        assert_eq!(
            update.selection,
            Some(Condition {
                column: "id".into(),
                value: Expr::Placeholder(3)
            })
        );
        assert_eq!(update.returning, vec![SelectItem::Column("id".into())]);
    }

    #[test]
    fn test_parse_insert_returning() {
        let adapter = SqlParserAdapter::new();
        let stmt = adapter
            .parse("INSERT INTO recipes (name, description, photo) VALUES ($1, $2, $3) RETURNING id")
            .unwrap();

        let Statement::Insert(insert) = stmt else {
            panic!("Expected Insert");
        };

        assert_eq!(insert.columns, vec!["name", "description", "photo"]);
        assert_eq!(
            insert.values,
            vec![vec![
                Expr::Placeholder(1),
                Expr::Placeholder(2),
                Expr::Placeholder(3)
            ]]
        );
        assert_eq!(insert.returning, vec![SelectItem::Column("id".into())]);
    }

    #[test]
    fn test_parse_delete_and_select() {
        let adapter = SqlParserAdapter::new();

        let Statement::Delete(delete) = adapter.parse("DELETE FROM recipes WHERE id = $1").unwrap()
        else {
            panic!("Expected Delete");
        };
        assert_eq!(delete.table_name, "recipes");
        assert!(delete.returning.is_empty());

        let Statement::Query(query) = adapter
            .parse("SELECT id, name FROM recipes ORDER BY id DESC")
            .unwrap()
        else {
            panic!("Expected Query");
        };
        assert_eq!(
            query.projection,
            vec![SelectItem::Column("id".into()), SelectItem::Column("name".into())]
        );
        assert_eq!(
            query.order_by,
            Some(OrderByExpr {
                column: "id".into(),
                descending: true
            })
        );
        assert!(query.selection.is_none());
    }

    #[test]
    fn test_literals_are_understood() {
        let adapter = SqlParserAdapter::new();
        let Statement::Query(query) = adapter
            .parse("SELECT * FROM recipes WHERE name = 'Toast'")
            .unwrap()
        else {
            panic!("Expected Query");
        };
        assert_eq!(query.projection, vec![SelectItem::Wildcard]);
        assert_eq!(
            query.selection.unwrap().value,
            Expr::Literal(Value::Text("Toast".into()))
        );
    }

    #[test]
    fn test_rejects_unsupported_shapes() {
        let adapter = SqlParserAdapter::new();
        assert!(matches!(
            adapter.parse("SELECT * FROM recipes WHERE id > 1"),
            Err(DbError::Unsupported(_))
        ));
        assert!(matches!(
            adapter.parse("SELECT 1; SELECT 2"),
            Err(DbError::Parse(_))
        ));
        assert!(matches!(
            adapter.parse("UPDATE recipes SET"),
            Err(DbError::Parse(_))
        ));
    }

    #[test]
    fn test_placeholder_index_must_be_positive() {
        assert_eq!(parse_placeholder("$12").unwrap(), 12);
        assert!(parse_placeholder("$0").is_err());
        assert!(parse_placeholder("?").is_err());
    }
}
