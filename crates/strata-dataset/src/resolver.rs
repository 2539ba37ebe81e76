use std::fmt;
use std::sync::Arc;

use strata_core::{GenerationError, Result};

use crate::hierarchy::DatasetHierarchy;

const PLACEHOLDER: &str = "{0}";

/// Filename template with exactly one `{0}` placeholder for the dataset id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilenamePattern(String);

impl FilenamePattern {
    pub fn parse(pattern: &str) -> Result<Self> {
        let count = pattern.matches(PLACEHOLDER).count();
        if count != 1 {
            return Err(GenerationError::configuration(
                format!("pattern '{pattern}'"),
                format!("expected exactly one {PLACEHOLDER} placeholder, found {count}"),
            ));
        }
        Ok(Self(pattern.to_string()))
    }

    pub fn render(&self, dataset: &str) -> String {
        self.0.replacen(PLACEHOLDER, dataset, 1)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FilenamePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Candidate files for one leaf dataset, most specific first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafCandidates {
    pub leaf: String,
    pub candidates: Vec<String>,
}

/// Maps logical dataset ids onto candidate filenames.
#[derive(Debug, Clone, Default)]
pub struct DatasetResolver {
    hierarchy: Arc<DatasetHierarchy>,
}

impl DatasetResolver {
    pub fn new(hierarchy: Arc<DatasetHierarchy>) -> Self {
        Self { hierarchy }
    }

    pub fn hierarchy(&self) -> &DatasetHierarchy {
        &self.hierarchy
    }

    /// Expand `dataset` into its leaves and list each leaf's candidate files.
    ///
    /// With `fallback`, a leaf's candidates continue with every ancestor's
    /// file up to the root; without it only the leaf's own file is listed.
    pub fn resolve(
        &self,
        dataset: &str,
        pattern: &FilenamePattern,
        fallback: bool,
    ) -> Vec<LeafCandidates> {
        self.hierarchy
            .leaves(dataset)
            .into_iter()
            .map(|leaf| {
                let mut candidates = vec![pattern.render(&leaf)];
                if fallback {
                    candidates.extend(
                        self.hierarchy
                            .ancestors(&leaf)
                            .into_iter()
                            .map(|ancestor| pattern.render(ancestor)),
                    );
                }
                LeafCandidates { leaf, candidates }
            })
            .collect()
    }
}
