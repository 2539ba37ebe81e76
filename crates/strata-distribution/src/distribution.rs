use std::fmt;
use std::sync::Arc;

use rand::RngCore;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use strata_core::{
    BoxedGenerator, DEFAULT_WEIGHT, GeneratedValue, GenerationError, NumberRange, Result,
    WeightedSample,
};

use crate::sampling::SamplingGenerator;

/// Bounds applied while building selection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct DistributionSettings {
    /// Consecutive inverse-transform draws allowed to miss the domain.
    pub max_inverse_attempts: u32,
    /// Largest candidate list a strategy may materialize.
    pub max_candidates: usize,
}

impl Default for DistributionSettings {
    fn default() -> Self {
        Self {
            max_inverse_attempts: 1_000,
            max_candidates: 1_000_000,
        }
    }
}

impl DistributionSettings {
    pub(crate) fn ensure_materializable(&self, strategy: &str, len: usize) -> Result<()> {
        if len > self.max_candidates {
            return Err(GenerationError::configuration(
                format!("distribution '{strategy}'"),
                format!(
                    "{len} candidates exceed the materialization limit of {}",
                    self.max_candidates
                ),
            ));
        }
        Ok(())
    }
}

/// Candidates a strategy selects indices from.
#[derive(Debug, Clone, Copy)]
pub enum Domain<'a> {
    Samples(&'a [WeightedSample<GeneratedValue>]),
    Range(&'a NumberRange),
}

impl Domain<'_> {
    pub fn len(&self) -> usize {
        match self {
            Domain::Samples(samples) => samples.len(),
            Domain::Range(range) => range.point_count(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn value(&self, index: usize) -> Option<GeneratedValue> {
        match self {
            Domain::Samples(samples) => samples.get(index).map(|sample| sample.value.clone()),
            Domain::Range(range) => (index < range.point_count()).then(|| range.value_at(index)),
        }
    }

    /// Numeric reading of the candidate, if it has one.
    pub fn number(&self, index: usize) -> Option<f64> {
        match self {
            Domain::Samples(samples) => samples.get(index).and_then(|sample| sample.value.as_f64()),
            Domain::Range(range) => (index < range.point_count()).then(|| range.number_at(index)),
        }
    }

    /// Intrinsic weight; range points all weigh the default.
    pub fn weight(&self, index: usize) -> f64 {
        match self {
            Domain::Samples(samples) => samples.get(index).map_or(0.0, |sample| sample.weight),
            Domain::Range(_) => DEFAULT_WEIGHT,
        }
    }
}

/// Per-generator selection state built by a strategy over one domain.
///
/// `Ok(None)` means the selection is exhausted.
pub trait Selector: Send {
    fn next_index(&mut self, rng: &mut dyn RngCore) -> Result<Option<usize>>;
}

/// Stateless strategy choosing the order or probability of emission.
///
/// Implementations are shared across generators; all mutable selection
/// state lives in the [`Selector`] a generator builds.
pub trait Distribution: fmt::Debug + Send + Sync {
    fn name(&self) -> &str;

    /// Whether the strategy can emit each distinct candidate at most once.
    fn supports_unique(&self) -> bool;

    /// Whether the strategy can synthesize numbers over a [`NumberRange`].
    fn supports_numbers(&self) -> bool {
        true
    }

    /// Reject candidates the strategy cannot select from.
    ///
    /// Generators call this as soon as their candidates are known, before
    /// the first draw.
    fn check_domain(&self, _domain: Domain<'_>) -> Result<()> {
        Ok(())
    }

    fn selector(
        &self,
        domain: Domain<'_>,
        unique: bool,
        settings: &DistributionSettings,
        rng: &mut dyn RngCore,
    ) -> Result<Box<dyn Selector>>;

    fn to_shared(&self) -> Arc<dyn Distribution>;

    /// Wrap `source` so its values are re-emitted under this strategy.
    ///
    /// The source is drained on the first `generate` of the returned
    /// generator, not here.
    fn apply_to(
        &self,
        source: BoxedGenerator<GeneratedValue>,
        unique: bool,
    ) -> Result<BoxedGenerator<GeneratedValue>> {
        let generator = SamplingGenerator::from_source(source, self.to_shared(), unique)?;
        Ok(Box::new(generator))
    }

    /// Generator of numbers on the grid of `range`, chosen by this strategy.
    fn create_number_generator(
        &self,
        range: NumberRange,
        unique: bool,
    ) -> Result<BoxedGenerator<GeneratedValue>> {
        let generator = SamplingGenerator::from_range(range, self.to_shared(), unique)?;
        Ok(Box::new(generator))
    }
}

/// Fail eagerly on capability mismatches.
pub(crate) fn check_capabilities(
    distribution: &dyn Distribution,
    unique: bool,
    numbers: bool,
) -> Result<()> {
    if numbers && !distribution.supports_numbers() {
        return Err(GenerationError::Unsupported(format!(
            "distribution '{}' cannot synthesize numbers",
            distribution.name()
        )));
    }
    if unique && !distribution.supports_unique() {
        return Err(GenerationError::InvalidArgument(format!(
            "distribution '{}' cannot produce unique values",
            distribution.name()
        )));
    }
    Ok(())
}

/// Reject weights a weighted draw cannot use.
pub(crate) fn validate_weights(strategy: &str, weights: &[f64]) -> Result<()> {
    if let Some(bad) = weights.iter().find(|weight| !weight.is_finite() || **weight < 0.0) {
        return Err(GenerationError::InvalidArgument(format!(
            "distribution '{strategy}' produced invalid weight {bad}"
        )));
    }
    if !weights.is_empty() && weights.iter().sum::<f64>() <= 0.0 {
        return Err(GenerationError::InvalidArgument(format!(
            "distribution '{strategy}' has no positive weight"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_domain_reads_grid_points() {
        let range = NumberRange::int(10, 20, 5).expect("range");
        let domain = Domain::Range(&range);
        assert_eq!(domain.len(), 3);
        assert_eq!(domain.value(2), Some(GeneratedValue::Int(20)));
        assert_eq!(domain.number(3), None);
        assert_eq!(domain.weight(1), DEFAULT_WEIGHT);
    }

    #[test]
    fn weights_must_be_finite_and_not_all_zero() {
        assert!(validate_weights("w", &[0.0, 2.0]).is_ok());
        assert!(validate_weights("w", &[]).is_ok());
        assert!(validate_weights("w", &[0.0, 0.0]).is_err());
        assert!(validate_weights("w", &[1.0, -1.0]).is_err());
        assert!(validate_weights("w", &[f64::NAN]).is_err());
    }
}
