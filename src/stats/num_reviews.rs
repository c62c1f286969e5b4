//! Review count.

use super::{Calculator, StatContext};
use crate::error::StatError;
use crate::models::{ReviewRecord, StatValues};

/// Returns `{"total": n}` for the records in the sample.
#[derive(Debug, Clone, Copy, Default)]
pub struct NumReviews;

impl Calculator for NumReviews {
    fn compute(
        &self,
        records: &[ReviewRecord],
        _context: &StatContext,
    ) -> Result<StatValues, StatError> {
        Ok(StatValues::Count {
            total: records.len(),
        })
    }
}
