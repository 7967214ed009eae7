//! Build catalog records from plain structured input.
//!
//! [`RecordInput`] carries what an edit form (or a JSON file on the command
//! line) collects. [`build_record`] derives the id, assembles the trait
//! map and reconciles the edit buffer into the image list.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::bloom::BloomSpec;
use crate::error::CoreError;
use crate::images::EditBuffer;
use crate::model::{Coordinates, PlantRecord};
use crate::naming;
use crate::tags::TagSet;

pub const TRAIT_BLOOM: &str = "floracio";
pub const TRAIT_FOLIAGE: &str = "fullatge";
pub const TRAIT_HEIGHT: &str = "alcada";
pub const TRAIT_OTHER: &str = "altres_caracteristiques_rellevants";

/// Editable fields of a plant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordInput {
    pub display_name: String,
    pub scientific_name: String,
    pub family: String,
    pub kind: String,
    pub description: String,
    pub bloom_seasons: Vec<String>,
    pub bloom_qualifier: Option<String>,
    pub foliage: String,
    pub height: String,
    pub other_traits: String,
    /// Trait keys not covered by the fields above, kept across edits.
    pub extra_traits: IndexMap<String, Value>,
    pub habitats: Vec<String>,
    pub colors: Vec<String>,
    pub uses: Vec<String>,
    pub locations: Vec<Coordinates>,
    pub sources: Vec<String>,
}

impl RecordInput {
    /// Pre-fill the input from a stored record.
    pub fn from_record(record: &PlantRecord) -> Self {
        let bloom = record
            .trait_text(TRAIT_BLOOM)
            .map(|text| BloomSpec::parse(&text))
            .unwrap_or_default();
        let text = |key: &str| record.trait_text(key).unwrap_or_default();

        let extra_traits = record
            .traits
            .iter()
            .filter(|(key, _)| ![TRAIT_BLOOM, TRAIT_FOLIAGE, TRAIT_HEIGHT, TRAIT_OTHER].contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        Self {
            display_name: record.display_name.clone(),
            scientific_name: record.scientific_name.clone(),
            family: record.family.clone(),
            kind: record.kind.clone(),
            description: record.description.clone(),
            bloom_seasons: bloom.seasons,
            bloom_qualifier: bloom.qualifier,
            foliage: text(TRAIT_FOLIAGE),
            height: text(TRAIT_HEIGHT),
            other_traits: text(TRAIT_OTHER),
            extra_traits,
            habitats: record.habitats.as_slice().to_vec(),
            colors: record.colors.as_slice().to_vec(),
            uses: record.uses.as_slice().to_vec(),
            locations: record.locations.clone(),
            sources: record.sources.clone(),
        }
    }

    /// Asset slug for the scientific name currently entered.
    pub fn asset_slug(&self) -> String {
        naming::asset_slug(&self.scientific_name)
    }
}

/// Check required fields. Drafts may be saved with names missing.
pub fn validate_input(input: &RecordInput, draft: bool) -> Result<(), CoreError> {
    if draft {
        return Ok(());
    }
    if input.display_name.trim().is_empty() || input.scientific_name.trim().is_empty() {
        return Err(CoreError::Validation(
            "common name and scientific name are required".into(),
        ));
    }
    Ok(())
}

/// Assemble a record from `input` and the images held in `buffer`.
pub fn build_record(input: RecordInput, buffer: &EditBuffer) -> PlantRecord {
    let images = buffer.reconcile(&input.asset_slug());

    let mut traits = IndexMap::new();
    let bloom = BloomSpec {
        seasons: input.bloom_seasons,
        qualifier: input.bloom_qualifier,
    };
    if let Some(text) = bloom.render() {
        traits.insert(TRAIT_BLOOM.to_string(), Value::String(text));
    }
    traits.insert(TRAIT_FOLIAGE.to_string(), Value::String(input.foliage));
    traits.insert(TRAIT_HEIGHT.to_string(), Value::String(input.height));
    traits.insert(TRAIT_OTHER.to_string(), Value::String(input.other_traits));
    for (key, value) in input.extra_traits {
        traits.entry(key).or_insert(value);
    }

    let mut record = PlantRecord {
        id: String::new(),
        display_name: input.display_name,
        scientific_name: input.scientific_name,
        family: input.family,
        kind: input.kind,
        description: input.description,
        traits,
        habitats: input.habitats.into_iter().collect::<TagSet>(),
        colors: input.colors.into_iter().collect::<TagSet>(),
        uses: input.uses.into_iter().collect::<TagSet>(),
        locations: input.locations,
        sources: input
            .sources
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        images,
        extra: IndexMap::new(),
    };
    record.refresh_id();
    record
}
