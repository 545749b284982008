use super::error::IntentError;
use super::model::{RecipeField, parse_json_fields};
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeMap;

/// The fields a caller wants changed on one recipe.
///
/// Holds at most one value per field; iteration is always in canonical
/// [`RecipeField`] order, independent of the order fields were set in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateIntent {
    fields: BTreeMap<RecipeField, String>,
}

impl UpdateIntent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`set`](Self::set).
    pub fn with(mut self, field: RecipeField, value: impl Into<String>) -> Self {
        self.set(field, value);
        self
    }

    /// Set a field; a later value for the same field replaces the earlier one.
    pub fn set(&mut self, field: RecipeField, value: impl Into<String>) -> &mut Self {
        self.fields.insert(field, value.into());
        self
    }

    /// Build from a JSON object of `field -> string`.
    ///
    /// An empty object yields an empty intent; emptiness is rejected when the
    /// statement is built.
    pub fn from_json_object(object: &Map<String, JsonValue>) -> Result<Self, IntentError> {
        let mut intent = Self::new();
        for (field, value) in parse_json_fields(object)? {
            intent.set(field, value);
        }
        Ok(intent)
    }

    pub fn get(&self, field: RecipeField) -> Option<&str> {
        self.fields.get(&field).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (RecipeField, &str)> {
        self.fields.iter().map(|(field, value)| (*field, value.as_str()))
    }

    /// Check every present value against its field's constraints.
    pub fn validate(&self) -> Result<(), IntentError> {
        self.iter()
            .try_for_each(|(field, value)| field.validate(value))
    }
}
