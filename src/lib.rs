// ============================================================================
// Recipe API Library
// ============================================================================

pub mod config;
pub mod connection;
pub mod core;
pub mod interface;
pub mod parser;
pub mod recipe;
pub mod result;
pub mod storage;
pub mod web;

// Re-export main types for convenience
pub use crate::core::{DbError, Result, Value};
pub use interface::{DatabaseClient, DatabaseFactory};
pub use result::QueryResult;

// Re-export connection API
pub use connection::{ConnectionPool, PoolConfig, PoolGuard, PoolStats};

// Stores
pub use storage::{MemoryStore, PgFactory, PgStore};

// Engine
pub use recipe::{
    EngineError, IntentError, NewRecipe, Outcome, Recipe, RecipeEngine, RecipeField,
    RecipeRepository, UpdateIntent,
};

pub use web::{AppState, build_router};

/// Engine over an in-process store with the recipes table declared.
///
/// # Examples
///
/// ```
/// # #[tokio::main]
/// # async fn main() -> recipe_api::Result<()> {
/// use recipe_api::{NewRecipe, Outcome, PoolConfig};
///
/// let engine = recipe_api::memory_engine(PoolConfig::default()).await?;
/// let recipe = NewRecipe::new("Toast", "Simple", "").unwrap();
/// assert_eq!(engine.create(&recipe).await.unwrap(), Outcome::Created(1));
/// # Ok(())
/// # }
/// ```
pub async fn memory_engine(config: PoolConfig) -> Result<RecipeEngine<MemoryStore>> {
    let pool = ConnectionPool::new(config, MemoryStore::recipes()).await?;
    Ok(RecipeEngine::new(pool))
}

/// Engine over PostgreSQL. The `recipes` table must already exist.
pub async fn postgres_engine(
    config: PoolConfig,
    database_url: impl Into<String>,
) -> Result<RecipeEngine<PgFactory>> {
    let pool = ConnectionPool::new(config, PgFactory::new(database_url)).await?;
    Ok(RecipeEngine::new(pool))
}
