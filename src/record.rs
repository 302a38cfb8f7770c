//! Canonical movie record and the normalizer that produces it
use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Sentinel for fields the OMDb response did not carry
pub const NOT_AVAILABLE: &str = "N/A";

/// One entry of the OMDb `Ratings` list, e.g. `{"Source": "IMDb", "Value": "8.5"}`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Rating {
    pub source: String,
    pub value: String,
}

/// Fixed output schema of the pipeline. Serializes with the OMDb field
/// names, so the topic payload looks exactly like a trimmed API response.
/// `(title, year)` is the primary key in the sink.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MovieRecord {
    pub title: String,
    pub year: String,
    pub director: String,
    pub actors: String,
    pub plot: String,
    pub ratings: Vec<Rating>,
    pub box_office: String,
}

impl MovieRecord {
    /// Projects a raw API response into the fixed schema. Total over any
    /// JSON value: missing or non-string scalars become [NOT_AVAILABLE],
    /// a missing list of ratings becomes empty, malformed rating entries
    /// are skipped, present fields pass through unchanged.
    pub fn from_raw(raw: &Value) -> MovieRecord {
        MovieRecord {
            title: scalar(raw, "Title"),
            year: scalar(raw, "Year"),
            director: scalar(raw, "Director"),
            actors: scalar(raw, "Actors"),
            plot: scalar(raw, "Plot"),
            ratings: ratings(raw),
            box_office: scalar(raw, "BoxOffice"),
        }
    }

    /// Reduces the ordered ratings list into the Source -> Value mapping
    /// stored in the sink's `ratings MAP<TEXT, TEXT>` column. A duplicated
    /// source keeps the last value, same as the map column would.
    pub fn ratings_map(&self) -> HashMap<String, String> {
        self.ratings
            .iter()
            .map(|r| (r.source.clone(), r.value.clone()))
            .collect()
    }
}

fn scalar(raw: &Value, key: &str) -> String {
    match raw.get(key).and_then(Value::as_str) {
        Some(s) => s.to_owned(),
        None => NOT_AVAILABLE.to_owned(),
    }
}

fn ratings(raw: &Value) -> Vec<Rating> {
    let Some(entries) = raw.get("Ratings").and_then(Value::as_array) else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(|e| {
            Some(Rating {
                source: e.get("Source").and_then(Value::as_str)?.to_owned(),
                value: e.get("Value").and_then(Value::as_str)?.to_owned(),
            })
        })
        .collect()
}
