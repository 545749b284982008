use super::error::{EngineError, EngineResult};
use super::intent::UpdateIntent;
use super::model::{NewRecipe, RECIPES_TABLE, Recipe};
use super::outcome::Outcome;
use super::statement::{self, Statement};
use crate::connection::{ConnectionPool, PoolGuard};
use crate::interface::{DatabaseClient, DatabaseFactory};
use crate::result::QueryResult;
use tracing::{debug, error, info};

/// Record reconciliation engine
///
/// Turns create / replace / patch / delete / read requests into parameterized
/// statements and maps the store's answer onto an [`Outcome`]. Statements are
/// built before a connection is taken, so a rejected intent never touches the
/// pool.
pub struct RecipeEngine<F: DatabaseFactory> {
    pool: ConnectionPool<F>,
    table: &'static str,
}

impl<F: DatabaseFactory> RecipeEngine<F> {
    pub fn new(pool: ConnectionPool<F>) -> Self {
        Self {
            pool,
            table: RECIPES_TABLE,
        }
    }

    pub fn pool(&self) -> &ConnectionPool<F> {
        &self.pool
    }

    /// Insert a new recipe. Always creates.
    pub async fn create(&self, recipe: &NewRecipe) -> EngineResult<Outcome> {
        let stmt = statement::build_insert(self.table, recipe);
        let mut conn = self.connect("create").await?;

        let result = logged("create", run(&mut conn, &stmt).await)?;
        let id = returned_id(&result)?
            .ok_or_else(|| EngineError::Corrupt("insert returned no id".into()))?;

        info!(id, "recipe created");
        Ok(Outcome::Created(id))
    }

    /// Replace every field of `id`, inserting a new row when `id` does not exist.
    ///
    /// The fallback row gets a store-assigned id; the requested one is only
    /// reported back. Both steps run on the same connection.
    pub async fn replace(&self, id: i64, recipe: &NewRecipe) -> EngineResult<Outcome> {
        let update = statement::build_replace(self.table, id, recipe);
        let insert = statement::build_insert(self.table, recipe);
        let mut conn = self.connect("replace").await?;

        let updated = logged("replace", run(&mut conn, &update).await)?;
        if let Some(id) = returned_id(&updated)? {
            debug!(id, "recipe replaced");
            return Ok(Outcome::Updated(id));
        }

        let inserted = logged("replace", run(&mut conn, &insert).await)?;
        let new_id = returned_id(&inserted)?
            .ok_or_else(|| EngineError::Corrupt("insert returned no id".into()))?;

        info!(id = new_id, requested = id, "recipe missing on replace, created instead");
        Ok(Outcome::CreatedFallback {
            id: new_id,
            requested: id,
        })
    }

    /// Update the fields named in `intent`. Never creates.
    pub async fn patch(&self, id: i64, intent: &UpdateIntent) -> EngineResult<Outcome> {
        let stmt = statement::build_patch(self.table, id, intent)?;
        let mut conn = self.connect("patch").await?;

        let result = logged("patch", run(&mut conn, &stmt).await)?;
        match returned_id(&result)? {
            Some(id) => {
                debug!(id, fields = intent.len(), "recipe patched");
                Ok(Outcome::Updated(id))
            }
            None => {
                debug!(id, "patch target not found");
                Ok(Outcome::NotFound)
            }
        }
    }

    pub async fn delete(&self, id: i64) -> EngineResult<Outcome> {
        let stmt = statement::build_delete(self.table, id);
        let mut conn = self.connect("delete").await?;

        let result = logged("delete", run(&mut conn, &stmt).await)?;
        match returned_id(&result)? {
            Some(id) => {
                info!(id, "recipe deleted");
                Ok(Outcome::Deleted(id))
            }
            None => Ok(Outcome::NotFound),
        }
    }

    /// `Found(recipe)` or `NotFound`.
    pub async fn get(&self, id: i64) -> EngineResult<Outcome> {
        let stmt = statement::build_select_one(self.table, id);
        let mut conn = self.connect("get").await?;

        let result = logged("get", run(&mut conn, &stmt).await)?;
        match result.rows() {
            [] => Ok(Outcome::NotFound),
            [row] => Ok(Outcome::Found(Recipe::from_row(row)?)),
            rows => Err(EngineError::Corrupt(format!(
                "{} rows share id {}",
                rows.len(),
                id
            ))),
        }
    }

    /// Every recipe, ordered by id.
    pub async fn list(&self) -> EngineResult<Vec<Recipe>> {
        let stmt = statement::build_select_all(self.table);
        let mut conn = self.connect("list").await?;

        let result = logged("list", run(&mut conn, &stmt).await)?;
        result.rows().iter().map(Recipe::from_row).collect()
    }

    /// Check that the store answers.
    pub async fn ping(&self) -> EngineResult<()> {
        let conn = self.connect("ping").await?;
        logged("ping", conn.client().ping().await)
    }

    async fn connect(&self, op: &'static str) -> EngineResult<PoolGuard<F>> {
        logged(op, self.pool.get_connection().await)
    }
}

async fn run<F: DatabaseFactory>(
    conn: &mut PoolGuard<F>,
    stmt: &Statement,
) -> crate::core::Result<QueryResult> {
    conn.execute(&stmt.sql, &stmt.params).await
}

fn logged<T>(op: &'static str, result: crate::core::Result<T>) -> EngineResult<T> {
    result.map_err(|err| {
        error!(op, error = %err, "store operation failed");
        EngineError::Store(err)
    })
}

/// The id from a `RETURNING id` result; `None` when no row was touched.
fn returned_id(result: &QueryResult) -> EngineResult<Option<i64>> {
    match result.rows() {
        [] if result.rows_affected() == 0 => Ok(None),
        [] => Err(EngineError::Corrupt(format!(
            "{} rows affected but no id returned",
            result.rows_affected()
        ))),
        [row] => row
            .first()
            .and_then(|value| value.as_i64())
            .map(Some)
            .ok_or_else(|| EngineError::Corrupt("returned id is not an integer".into())),
        rows => Err(EngineError::Corrupt(format!(
            "expected at most one row, got {}",
            rows.len()
        ))),
    }
}
