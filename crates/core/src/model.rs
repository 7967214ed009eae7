//! Catalog record types and their JSON wire format.
//!
//! The wire keys are the ones used by existing `plantes.json` documents
//! (`nom_comu`, `nom_cientific`, `imatges`, ...). Decoding is permissive:
//! a field holding the wrong JSON type decodes to its empty default and
//! unknown keys are kept in [`PlantRecord::extra`] so a load/save cycle
//! does not drop data the editor does not understand.

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::naming;
use crate::tags::TagSet;

// ---------------------------------------------------------------------------
// Image categories
// ---------------------------------------------------------------------------

/// What part of the plant an image shows.
///
/// Serialised as the wire token that also appears in image file names.
/// Unknown tokens decode as [`ImageCategory::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ImageCategory {
    Flower,
    Leaf,
    Fruit,
    Stem,
    Habit,
    Other,
}

impl ImageCategory {
    /// Every category, in the order asset discovery probes them.
    pub const PROBE_ORDER: [ImageCategory; 6] = [
        Self::Flower,
        Self::Leaf,
        Self::Fruit,
        Self::Stem,
        Self::Other,
        Self::Habit,
    ];

    /// Wire / file-name token.
    pub fn token(self) -> &'static str {
        match self {
            Self::Flower => "flor",
            Self::Leaf => "fulla",
            Self::Fruit => "fruit",
            Self::Stem => "tija",
            Self::Habit => "habit",
            Self::Other => "altres",
        }
    }

    /// Parse a wire token. Accepts the English variant names as well.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "flor" | "flower" => Some(Self::Flower),
            "fulla" | "leaf" => Some(Self::Leaf),
            "fruit" => Some(Self::Fruit),
            "tija" | "stem" => Some(Self::Stem),
            "habit" => Some(Self::Habit),
            "altres" | "other" => Some(Self::Other),
            _ => None,
        }
    }

    /// Guess the category of a newly attached file from its name.
    ///
    /// Checks are applied in order and a later match overrides an earlier
    /// one, so `"flor_i_fruit.jpg"` is a fruit.
    pub fn guess_from_file_name(file_name: &str) -> Self {
        let name = file_name.to_lowercase();
        let mut guessed = Self::Other;
        if name.contains("flor") {
            guessed = Self::Flower;
        }
        if name.contains("fulla") || name.contains("leaf") {
            guessed = Self::Leaf;
        }
        if name.contains("fruit") {
            guessed = Self::Fruit;
        }
        if name.contains("tija") || name.contains("stem") {
            guessed = Self::Stem;
        }
        guessed
    }
}

impl std::fmt::Display for ImageCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.token())
    }
}

impl std::str::FromStr for ImageCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_token(s).ok_or_else(|| format!("unknown image category '{s}'"))
    }
}

impl From<String> for ImageCategory {
    fn from(token: String) -> Self {
        Self::from_token(&token).unwrap_or(Self::Other)
    }
}

impl From<ImageCategory> for String {
    fn from(category: ImageCategory) -> Self {
        category.token().to_string()
    }
}

// ---------------------------------------------------------------------------
// Record parts
// ---------------------------------------------------------------------------

/// An image attached to a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    #[serde(rename = "type")]
    pub category: ImageCategory,
    #[serde(rename = "nom")]
    pub file_name: String,
}

/// One placed map marker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// A catalog entry for one plant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlantRecord {
    #[serde(default, deserialize_with = "lenient")]
    pub id: String,
    #[serde(rename = "nom_comu", default, deserialize_with = "lenient")]
    pub display_name: String,
    #[serde(rename = "nom_cientific", default, deserialize_with = "lenient")]
    pub scientific_name: String,
    #[serde(rename = "familia", default, deserialize_with = "lenient")]
    pub family: String,
    #[serde(rename = "tipus", default, deserialize_with = "lenient")]
    pub kind: String,
    #[serde(rename = "descripcio", default, deserialize_with = "lenient")]
    pub description: String,
    /// Open attribute map (`floracio`, `fullatge`, `alcada`, ...).
    #[serde(rename = "caracteristiques", default, deserialize_with = "lenient")]
    pub traits: IndexMap<String, Value>,
    #[serde(rename = "habitat", default, deserialize_with = "lenient")]
    pub habitats: TagSet,
    #[serde(default, deserialize_with = "lenient")]
    pub colors: TagSet,
    #[serde(rename = "usos", default, deserialize_with = "lenient")]
    pub uses: TagSet,
    #[serde(rename = "coordenades", default, deserialize_with = "lenient")]
    pub locations: Vec<Coordinates>,
    #[serde(rename = "fonts", default, deserialize_with = "lenient")]
    pub sources: Vec<String>,
    #[serde(rename = "imatges", default, deserialize_with = "lenient")]
    pub images: Vec<ImageRef>,
    /// Keys this editor does not model, re-emitted after the known ones.
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

impl PlantRecord {
    /// Recompute [`id`](Self::id) from the display name.
    pub fn refresh_id(&mut self) {
        self.id = naming::record_id(&self.display_name);
    }

    /// Slug prefixing this plant's image file names.
    pub fn asset_slug(&self) -> String {
        naming::asset_slug(&self.scientific_name)
    }

    /// Look up a trait rendered as text (strings as is, arrays joined by
    /// `", "`).
    pub fn trait_text(&self, key: &str) -> Option<String> {
        match self.traits.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Array(items) => Some(
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}

/// Decode a field, falling back to its default when the JSON value has the
/// wrong shape.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    match serde_json::from_value(value) {
        Ok(decoded) => Ok(decoded),
        Err(e) => {
            tracing::debug!(error = %e, "Ignoring malformed record field");
            Ok(T::default())
        }
    }
}
