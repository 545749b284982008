use crate::core::{DbError, Result, Value};
use crate::interface::{DatabaseClient, DatabaseFactory};
use crate::result::QueryResult;
use async_trait::async_trait;
use bytes::BytesMut;
use std::error::Error;
use tokio_postgres::types::{IsNull, ToSql, Type, WrongType, to_sql_checked};
use tokio_postgres::{Client, NoTls, Row as PgRow};
use tracing::{debug, error};

/// A single PostgreSQL connection.
pub struct PgStore {
    client: Client,
}

impl PgStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DatabaseClient for PgStore {
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        let statement = self
            .client
            .prepare_typed(sql, &param_types(params))
            .await?;
        let refs: Vec<&(dyn ToSql + Sync)> = params
            .iter()
            .map(|p| p as &(dyn ToSql + Sync))
            .collect();

        if statement.columns().is_empty() {
            let affected = self.client.execute(&statement, &refs).await?;
            return Ok(QueryResult::affected(affected));
        }

        let columns = statement
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        let rows = self
            .client
            .query(&statement, &refs)
            .await?
            .iter()
            .map(decode_row)
            .collect::<Result<Vec<_>>>()?;

        Ok(QueryResult::new(columns, rows))
    }

    async fn ping(&self) -> Result<()> {
        if self.client.is_closed() {
            return Err(DbError::Connection("connection is closed".into()));
        }
        self.client.batch_execute("SELECT 1").await?;
        Ok(())
    }
}

/// Opens `tokio_postgres` connections for the pool.
#[derive(Debug, Clone)]
pub struct PgFactory {
    url: String,
}

impl PgFactory {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl DatabaseFactory for PgFactory {
    type Client = PgStore;

    async fn connect(&self) -> Result<PgStore> {
        let (client, connection) = tokio_postgres::connect(&self.url, NoTls)
            .await
            .map_err(|e| DbError::Connection(e.to_string()))?;

        tokio::spawn(async move {
            if let Err(err) = connection.await {
                error!(error = %err, "postgres connection terminated");
            }
        });

        debug!("postgres connection established");
        Ok(PgStore::new(client))
    }
}

fn decode_row(row: &PgRow) -> Result<Vec<Value>> {
    row.columns()
        .iter()
        .enumerate()
        .map(|(idx, column)| decode_value(row, idx, column.type_()))
        .collect()
}

fn decode_value(row: &PgRow, idx: usize, ty: &Type) -> Result<Value> {
    let value = if *ty == Type::INT2 {
        row.try_get::<_, Option<i16>>(idx)?.map(|v| Value::Integer(v.into()))
    } else if *ty == Type::INT4 {
        row.try_get::<_, Option<i32>>(idx)?.map(|v| Value::Integer(v.into()))
    } else if *ty == Type::INT8 {
        row.try_get::<_, Option<i64>>(idx)?.map(Value::Integer)
    } else if is_text(ty) {
        row.try_get::<_, Option<String>>(idx)?.map(Value::Text)
    } else {
        return Err(DbError::TypeMismatch(format!(
            "unsupported column type {} at position {}",
            ty, idx
        )));
    };

    Ok(value.unwrap_or(Value::Null))
}

fn is_text(ty: &Type) -> bool {
    *ty == Type::TEXT || *ty == Type::VARCHAR || *ty == Type::BPCHAR || *ty == Type::NAME
}

/// Declared parameter types for `params`.
///
/// Integers bind as INT8 so any `i64` compares against narrower integer
/// columns on the server; an id outside the column's range simply matches no
/// row. `NULL` is left for the server to infer.
fn param_types(params: &[Value]) -> Vec<Type> {
    params
        .iter()
        .map(|p| match p {
            Value::Null => Type::UNKNOWN,
            Value::Integer(_) => Type::INT8,
            Value::Text(_) => Type::TEXT,
        })
        .collect()
}

impl ToSql for Value {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> std::result::Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Integer(i) if *ty == Type::INT8 => i.to_sql(ty, out),
            Value::Integer(_) => Err(Box::new(WrongType::new::<i64>(ty.clone()))),
            Value::Text(s) if <String as ToSql>::accepts(ty) => s.to_sql(ty, out),
            Value::Text(_) => Err(Box::new(WrongType::new::<String>(ty.clone()))),
        }
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::INT8 || <String as ToSql>::accepts(ty)
    }

    to_sql_checked!();
}
