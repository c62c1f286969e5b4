//! Raw review listing.
//!
//! Every review is flattened to its scalar fields and serialized to a JSON
//! string, keyed by review hash. List and object fields (keywords, nested
//! attributes) are left out.

use super::{Calculator, StatContext};
use crate::error::StatError;
use crate::models::{ReviewRecord, StatValues};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::debug;

/// Returns `reviewHash -> JSON` for every record.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawReviews;

/// Scalar view of a record: stored attributes that are strings or numbers.
pub fn scalar_fields(record: &ReviewRecord) -> Map<String, Value> {
    let mut fields: Map<String, Value> = record
        .extra
        .iter()
        .filter(|(_, value)| value.is_string() || value.is_number())
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    fields.insert(
        "appIdStore".to_string(),
        Value::String(record.app_id_store.clone()),
    );
    fields.insert(
        "date".to_string(),
        Value::String(record.date.format("%Y-%m-%d").to_string()),
    );
    fields.insert("version".to_string(), Value::String(record.version.clone()));
    fields.insert(
        "reviewHash".to_string(),
        Value::String(record.review_hash.clone()),
    );
    fields.insert(
        "sentiment".to_string(),
        Value::String(
            record
                .sentiment
                .map(|s| s.as_str().to_string())
                .unwrap_or_default(),
        ),
    );

    fields
}

impl Calculator for RawReviews {
    fn compute(
        &self,
        records: &[ReviewRecord],
        _context: &StatContext,
    ) -> Result<StatValues, StatError> {
        let mut reviews = BTreeMap::new();

        for record in records {
            let json = serde_json::to_string(&Value::Object(scalar_fields(record))).map_err(
                |e| StatError::Serialize {
                    review_hash: record.review_hash.clone(),
                    message: e.to_string(),
                },
            )?;

            if reviews.insert(record.review_hash.clone(), json).is_some() {
                debug!("Duplicate review hash {}, keeping the later record", record.review_hash);
            }
        }

        Ok(StatValues::Reviews(reviews))
    }
}
