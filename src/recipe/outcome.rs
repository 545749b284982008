use super::model::Recipe;

/// Result of one reconciliation operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Created(i64),
    Updated(i64),
    /// A replace found no row for `requested` and inserted a new one as `id`.
    CreatedFallback { id: i64, requested: i64 },
    Deleted(i64),
    Found(Recipe),
    NotFound,
}

impl Outcome {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Created(_) => "created",
            Self::Updated(_) => "updated",
            Self::CreatedFallback { .. } => "created_fallback",
            Self::Deleted(_) => "deleted",
            Self::Found(_) => "found",
            Self::NotFound => "not_found",
        }
    }

    /// Id of the row the operation produced or touched.
    pub fn id(&self) -> Option<i64> {
        match self {
            Self::Created(id)
            | Self::Updated(id)
            | Self::Deleted(id)
            | Self::CreatedFallback { id, .. } => Some(*id),
            Self::Found(recipe) => Some(recipe.id),
            Self::NotFound => None,
        }
    }
}
