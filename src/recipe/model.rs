use super::error::{EngineError, IntentError};
use crate::core::{Row, Value};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::fmt;
use std::str::FromStr;

pub const RECIPES_TABLE: &str = "recipes";

/// The mutable columns of a recipe, in canonical statement order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecipeField {
    Name,
    Description,
    Photo,
}

impl RecipeField {
    pub const ALL: [RecipeField; 3] = [Self::Name, Self::Description, Self::Photo];

    pub fn column(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Description => "description",
            Self::Photo => "photo",
        }
    }

    /// Check a value against the field's constraints.
    pub fn validate(self, value: &str) -> Result<(), IntentError> {
        if self == Self::Name && value.trim().is_empty() {
            return Err(IntentError::invalid("name must not be empty"));
        }
        Ok(())
    }
}

impl FromStr for RecipeField {
    type Err = IntentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|field| field.column() == s)
            .ok_or_else(|| IntentError::InvalidField(s.to_string()))
    }
}

impl fmt::Display for RecipeField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// A stored recipe row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub photo: String,
}

impl Recipe {
    /// Columns selected when reading recipes, in `from_row` order.
    pub const COLUMNS: [&'static str; 4] = ["id", "name", "description", "photo"];

    pub(crate) fn from_row(row: &Row) -> Result<Self, EngineError> {
        let [id, name, description, photo] = row.as_slice() else {
            return Err(EngineError::Corrupt(format!(
                "expected 4 recipe columns, got {}",
                row.len()
            )));
        };

        Ok(Self {
            id: id
                .as_i64()
                .ok_or_else(|| EngineError::Corrupt(format!("id is {}", id.type_name())))?,
            name: text_column(name, "name")?,
            description: text_column(description, "description")?,
            photo: text_column(photo, "photo")?,
        })
    }
}

fn text_column(value: &Value, column: &str) -> Result<String, EngineError> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| EngineError::Corrupt(format!("{} is {}", column, value.type_name())))
}

/// A complete field set, as required by create and full replace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRecipe {
    pub name: String,
    pub description: String,
    pub photo: String,
}

impl NewRecipe {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        photo: impl Into<String>,
    ) -> Result<Self, IntentError> {
        let recipe = Self {
            name: name.into(),
            description: description.into(),
            photo: photo.into(),
        };
        RecipeField::Name.validate(&recipe.name)?;
        Ok(recipe)
    }

    /// Build from a JSON object that must carry every field.
    pub fn from_json_object(object: &Map<String, JsonValue>) -> Result<Self, IntentError> {
        let mut name = None;
        let mut description = None;
        let mut photo = None;

        for (field, value) in parse_json_fields(object)? {
            match field {
                RecipeField::Name => name = Some(value),
                RecipeField::Description => description = Some(value),
                RecipeField::Photo => photo = Some(value),
            }
        }

        match (name, description, photo) {
            (Some(name), Some(description), Some(photo)) => Self::new(name, description, photo),
            (name, description, photo) => {
                let missing: Vec<&str> = [
                    (RecipeField::Name, name.is_none()),
                    (RecipeField::Description, description.is_none()),
                    (RecipeField::Photo, photo.is_none()),
                ]
                .into_iter()
                .filter(|(_, absent)| *absent)
                .map(|(field, _)| field.column())
                .collect();
                Err(IntentError::invalid(format!(
                    "missing required field(s): {}",
                    missing.join(", ")
                )))
            }
        }
    }

    pub fn value(&self, field: RecipeField) -> &str {
        match field {
            RecipeField::Name => &self.name,
            RecipeField::Description => &self.description,
            RecipeField::Photo => &self.photo,
        }
    }

    pub fn into_record(self, id: i64) -> Recipe {
        Recipe {
            id,
            name: self.name,
            description: self.description,
            photo: self.photo,
        }
    }
}

/// Validate a JSON object's keys against the allow-list and its values as strings.
///
/// Unknown keys are reported before type errors, in key order.
pub(crate) fn parse_json_fields(
    object: &Map<String, JsonValue>,
) -> Result<Vec<(RecipeField, String)>, IntentError> {
    let fields = object
        .keys()
        .map(|key| key.parse::<RecipeField>())
        .collect::<Result<Vec<_>, _>>()?;

    fields
        .into_iter()
        .zip(object.values())
        .map(|(field, value)| match value {
            JsonValue::String(s) => Ok((field, s.clone())),
            other => Err(IntentError::invalid(format!(
                "field '{}' must be a string, got {}",
                field,
                json_type_name(other)
            ))),
        })
        .collect()
}

fn json_type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}
