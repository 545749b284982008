use super::state::AppState;
use super::{ApiMessage, ApiResponse, Result, WebError};
use crate::recipe::{NewRecipe, Outcome, Recipe, UpdateIntent};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};
use tracing::warn;

type JsonObject = Map<String, JsonValue>;

/// Body returned by the mutating endpoints.
#[derive(Debug, Serialize)]
pub struct OutcomeBody {
    pub id: i64,
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_id: Option<i64>,
}

impl OutcomeBody {
    fn new(id: i64, outcome: &'static str) -> Self {
        Self {
            id,
            outcome,
            requested_id: None,
        }
    }
}

type Mutation = (StatusCode, Json<ApiResponse<OutcomeBody>>);

/// Map a mutation outcome onto its status code and body.
fn respond(outcome: Outcome) -> Result<Mutation> {
    let kind = outcome.kind();
    let (status, body) = match outcome {
        Outcome::Created(id) => (StatusCode::CREATED, OutcomeBody::new(id, kind)),
        Outcome::Updated(id) | Outcome::Deleted(id) => {
            (StatusCode::OK, OutcomeBody::new(id, kind))
        }
        Outcome::CreatedFallback { id, requested } => (
            StatusCode::CREATED,
            OutcomeBody {
                requested_id: Some(requested),
                ..OutcomeBody::new(id, kind)
            },
        ),
        Outcome::NotFound => return Err(WebError::NotFound("recipe not found".to_string())),
        Outcome::Found(_) => {
            warn!("read outcome returned from a mutation");
            return Err(WebError::Internal);
        }
    };

    Ok((status, Json(ApiResponse::new(body))))
}

pub async fn healthcheck(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<ApiMessage>>> {
    state.recipes.ping().await.map_err(|_| WebError::Unavailable)?;

    Ok(Json(ApiResponse::new(ApiMessage {
        message: "ok".to_string(),
    })))
}

pub async fn list_recipes(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<Recipe>>>> {
    let recipes = state.recipes.list().await?;
    Ok(Json(ApiResponse::new(recipes)))
}

pub async fn get_recipe(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Recipe>>> {
    match state.recipes.get(id).await? {
        Outcome::Found(recipe) => Ok(Json(ApiResponse::new(recipe))),
        _ => Err(WebError::NotFound("recipe not found".to_string())),
    }
}

pub async fn create_recipe(
    State(state): State<AppState>,
    Json(payload): Json<JsonObject>,
) -> Result<Mutation> {
    let recipe = NewRecipe::from_json_object(&payload)?;
    respond(state.recipes.create(recipe).await?)
}

pub async fn replace_recipe(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<JsonObject>,
) -> Result<Mutation> {
    let recipe = NewRecipe::from_json_object(&payload)?;
    respond(state.recipes.replace(id, recipe).await?)
}

pub async fn patch_recipe(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<JsonObject>,
) -> Result<Mutation> {
    let intent = UpdateIntent::from_json_object(&payload)?;
    respond(state.recipes.patch(id, intent).await?)
}

pub async fn delete_recipe(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Mutation> {
    respond(state.recipes.delete(id).await?)
}
