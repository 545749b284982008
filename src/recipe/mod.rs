//! Recipe records and the reconciliation engine over them.

mod engine;
mod error;
mod intent;
mod model;
mod outcome;
pub mod statement;

pub use engine::RecipeEngine;
pub use error::{EngineError, EngineResult, IntentError};
pub use intent::UpdateIntent;
pub use model::{NewRecipe, RECIPES_TABLE, Recipe, RecipeField};
pub use outcome::Outcome;
pub use statement::Statement;

use crate::interface::DatabaseFactory;
use async_trait::async_trait;

/// Object-safe view of the engine, used by the HTTP layer.
#[async_trait]
pub trait RecipeRepository: Send + Sync {
    async fn create(&self, recipe: NewRecipe) -> EngineResult<Outcome>;
    async fn replace(&self, id: i64, recipe: NewRecipe) -> EngineResult<Outcome>;
    async fn patch(&self, id: i64, intent: UpdateIntent) -> EngineResult<Outcome>;
    async fn delete(&self, id: i64) -> EngineResult<Outcome>;
    async fn get(&self, id: i64) -> EngineResult<Outcome>;
    async fn list(&self) -> EngineResult<Vec<Recipe>>;
    async fn ping(&self) -> EngineResult<()>;
}

#[async_trait]
impl<F: DatabaseFactory> RecipeRepository for RecipeEngine<F> {
    async fn create(&self, recipe: NewRecipe) -> EngineResult<Outcome> {
        RecipeEngine::create(self, &recipe).await
    }

    async fn replace(&self, id: i64, recipe: NewRecipe) -> EngineResult<Outcome> {
        RecipeEngine::replace(self, id, &recipe).await
    }

    async fn patch(&self, id: i64, intent: UpdateIntent) -> EngineResult<Outcome> {
        RecipeEngine::patch(self, id, &intent).await
    }

    async fn delete(&self, id: i64) -> EngineResult<Outcome> {
        RecipeEngine::delete(self, id).await
    }

    async fn get(&self, id: i64) -> EngineResult<Outcome> {
        RecipeEngine::get(self, id).await
    }

    async fn list(&self) -> EngineResult<Vec<Recipe>> {
        RecipeEngine::list(self).await
    }

    async fn ping(&self) -> EngineResult<()> {
        RecipeEngine::ping(self).await
    }
}
