use crate::recipe::RecipeRepository;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub recipes: Arc<dyn RecipeRepository>,
}

impl AppState {
    pub fn new(recipes: Arc<dyn RecipeRepository>) -> Self {
        Self { recipes }
    }
}
