use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use schemars::JsonSchema;
use schemars::schema::RootSchema;
use schemars::schema_for;
use serde::{Deserialize, Serialize};
use tracing::info;

use strata_core::{GenerationContext, GenerationError, Result};
use strata_dataset::{
    DatasetHierarchy, DatasetRequest, DatasetResolver, Encoding, FilenamePattern, SampleLoader,
    ValueType,
};

use crate::distribution::DistributionSettings;
use crate::registry::DistributionRegistry;
use crate::sampling::{DatasetSource, SamplingGenerator};

/// Declarative description of one dataset-backed generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SamplingPlan {
    /// Logical dataset id, leaf or composite.
    pub dataset: String,
    /// Filename pattern with one `{0}` placeholder, e.g. `city_{0}.csv`.
    pub pattern: String,
    /// Directory sample files are resolved against.
    #[serde(default = "default_root")]
    pub root: PathBuf,
    #[serde(default = "default_separator")]
    pub separator: char,
    #[serde(default = "default_encoding")]
    pub encoding: String,
    #[serde(default = "default_true")]
    pub fallback: bool,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub value_type: ValueType,
    /// Distribution spec such as `shuffle` or `gaussian(40, 8)`. Absent means
    /// the per-line weights decide.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distribution: Option<String>,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub seed: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_count: Option<u64>,
    #[serde(default = "default_locale")]
    pub locale: String,
    #[serde(default)]
    pub settings: DistributionSettings,
    /// Composite datasets and the ids they cover.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub hierarchy: BTreeMap<String, Vec<String>>,
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_separator() -> char {
    ','
}

fn default_encoding() -> String {
    "utf-8".to_string()
}

fn default_true() -> bool {
    true
}

fn default_locale() -> String {
    "en".to_string()
}

/// An uninitialized generator and the context to initialize it with.
#[derive(Debug)]
pub struct PlannedGenerator {
    pub generator: SamplingGenerator,
    pub context: GenerationContext,
}

impl SamplingPlan {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text)
            .map_err(|err| GenerationError::configuration("sampling plan", err.to_string()))
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|err| GenerationError::configuration("sampling plan", err.to_string()))
    }

    /// The hierarchy declared inline in the plan.
    pub fn inline_hierarchy(&self) -> Result<DatasetHierarchy> {
        DatasetHierarchy::try_from(self.hierarchy.clone())
    }

    pub fn request(&self) -> Result<DatasetRequest> {
        if !self.separator.is_ascii() {
            return Err(GenerationError::configuration(
                "sampling plan",
                format!("separator '{}' must be a single ASCII character", self.separator),
            ));
        }
        Ok(
            DatasetRequest::new(self.dataset.clone(), FilenamePattern::parse(&self.pattern)?)
                .with_separator(self.separator as u8)
                .with_encoding(Encoding::from_name(&self.encoding)?)
                .with_fallback(self.fallback)
                .required(self.required),
        )
    }

    pub fn context(&self) -> GenerationContext {
        let context = GenerationContext::new()
            .with_seed(self.seed)
            .with_locale(self.locale.clone());
        match self.max_count {
            Some(max_count) => context.with_max_count(max_count),
            None => context,
        }
    }

    /// Resolve the distribution and assemble the generator and its context.
    ///
    /// Nothing is read from disk until the generator is initialized.
    pub fn build(
        &self,
        hierarchy: Arc<DatasetHierarchy>,
        registry: &DistributionRegistry,
    ) -> Result<PlannedGenerator> {
        let distribution = self
            .distribution
            .as_deref()
            .map(|spec| registry.resolve(spec))
            .transpose()?;
        let source = DatasetSource::new(
            self.request()?,
            DatasetResolver::new(hierarchy),
            self.value_type,
        );
        let generator = SamplingGenerator::from_dataset(source, distribution, self.unique)?
            .with_settings(self.settings);
        let loader = Arc::new(SampleLoader::new(self.root.clone()));
        let context = self
            .context()
            .with_resource(SampleLoader::RESOURCE_KEY, loader);

        info!(
            dataset = %self.dataset,
            distribution = %generator.distribution().name(),
            unique = self.unique,
            root = %self.root.display(),
            "sampling plan built"
        );
        Ok(PlannedGenerator { generator, context })
    }
}

/// Emit the JSON Schema for sampling plan files.
pub fn sampling_plan_json_schema() -> RootSchema {
    schema_for!(SamplingPlan)
}
