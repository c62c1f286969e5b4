//! Collaborators: where review records and named parameters come from.
//!
//! The statistics engine never reads storage itself. It is handed records by
//! a [`ReviewSource`] and the ignore list by a [`ParameterStore`]; both are
//! traits so callers can plug in their own backends.

pub mod parameters;
pub mod reviews;

pub use parameters::{FileParameterStore, ParameterStore};
pub use reviews::{FileReviewSource, ReviewSource};

#[cfg(test)]
pub use parameters::MemoryParameterStore;
#[cfg(test)]
pub use reviews::MemoryReviewSource;

/// Append the deployment stage to a parameter name (`ignoreList` -> `ignoreList-dev`).
///
/// An empty stage leaves the name unchanged.
pub fn staged_name(name: &str, stage: &str) -> String {
    if stage.is_empty() {
        name.to_string()
    } else {
        format!("{}-{}", name, stage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_staged_name() {
        assert_eq!(staged_name("ignoreList", "prod"), "ignoreList-prod");
        assert_eq!(staged_name("appList", ""), "appList");
    }
}
