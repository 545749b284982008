use super::handlers::{
    create_recipe, delete_recipe, get_recipe, healthcheck, list_recipes, patch_recipe,
    replace_recipe,
};
use super::state::AppState;
use axum::{
    Router,
    http::Method,
    routing::{delete, get, patch, post, put},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(healthcheck))
        .route("/all-recipes", get(list_recipes))
        .route("/recipe/:id", get(get_recipe))
        .route("/create-recipe", post(create_recipe))
        .route("/update-recipe/:id", put(replace_recipe))
        .route("/patch-recipe/:id", patch(patch_recipe))
        .route("/delete-recipe/:id", delete(delete_recipe))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_headers(Any)
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::PATCH,
                    Method::DELETE,
                    Method::OPTIONS,
                ]),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
