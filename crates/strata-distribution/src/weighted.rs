use std::fmt;
use std::sync::Arc;

use rand::RngCore;

use strata_core::{GeneratedValue, GenerationError, Result};

use crate::distribution::{
    Distribution, DistributionSettings, Domain, Selector, validate_weights,
};
use crate::table::{UniformDraw, WeightedDraw, WorkingSet};

/// Draws proportionally to each candidate's own weight.
///
/// Over a number range every grid point weighs the same. With `unique`,
/// candidates are drawn without replacement: heavier ones tend to come
/// first and each appears exactly once.
#[derive(Debug, Clone, Copy, Default)]
pub struct SampleWeighting;

impl Distribution for SampleWeighting {
    fn name(&self) -> &str {
        "random"
    }

    fn supports_unique(&self) -> bool {
        true
    }

    fn selector(
        &self,
        domain: Domain<'_>,
        unique: bool,
        settings: &DistributionSettings,
        _rng: &mut dyn RngCore,
    ) -> Result<Box<dyn Selector>> {
        let len = domain.len();
        if unique {
            settings.ensure_materializable(self.name(), len)?;
            return Ok(Box::new(WorkingSet::new(
                (0..len).map(|index| domain.weight(index)),
            )));
        }
        match domain {
            Domain::Range(_) => Ok(Box::new(UniformDraw::new(len))),
            Domain::Samples(samples) => {
                let weights: Vec<f64> = samples.iter().map(|sample| sample.weight).collect();
                if weights.iter().all(|weight| *weight <= 0.0) {
                    return Ok(Box::new(UniformDraw::new(0)));
                }
                Ok(Box::new(WeightedDraw::new(self.name(), &weights)?))
            }
        }
    }

    fn to_shared(&self) -> Arc<dyn Distribution> {
        Arc::new(*self)
    }
}

/// Positional weights: the i-th weight belongs to the i-th candidate.
#[derive(Debug, Clone)]
pub struct StandardWeightingFunction {
    weights: Arc<[f64]>,
}

impl StandardWeightingFunction {
    pub fn new(weights: Vec<f64>) -> Result<Self> {
        if weights.is_empty() {
            return Err(GenerationError::InvalidArgument(
                "weighted distribution needs at least one weight".to_string(),
            ));
        }
        validate_weights("weighted", &weights)?;
        Ok(Self {
            weights: weights.into(),
        })
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }
}

impl Distribution for StandardWeightingFunction {
    fn name(&self) -> &str {
        "weighted"
    }

    fn supports_unique(&self) -> bool {
        false
    }

    fn check_domain(&self, domain: Domain<'_>) -> Result<()> {
        if domain.len() != self.weights.len() {
            return Err(GenerationError::InvalidArgument(format!(
                "'weighted' has {} weights but the domain has {} candidates",
                self.weights.len(),
                domain.len()
            )));
        }
        Ok(())
    }

    fn selector(
        &self,
        domain: Domain<'_>,
        _unique: bool,
        _settings: &DistributionSettings,
        _rng: &mut dyn RngCore,
    ) -> Result<Box<dyn Selector>> {
        self.check_domain(domain)?;
        Ok(Box::new(WeightedDraw::new(self.name(), &self.weights)?))
    }

    fn to_shared(&self) -> Arc<dyn Distribution> {
        Arc::new(self.clone())
    }
}

/// Weight of a candidate derived from its value.
pub trait IndividualWeight: fmt::Debug + Send + Sync {
    fn weight(&self, value: &GeneratedValue) -> f64;
}

struct FnWeight<F> {
    name: String,
    weight: F,
}

impl<F> fmt::Debug for FnWeight<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnWeight").field("name", &self.name).finish()
    }
}

impl<F> IndividualWeight for FnWeight<F>
where
    F: Fn(&GeneratedValue) -> f64 + Send + Sync,
{
    fn weight(&self, value: &GeneratedValue) -> f64 {
        (self.weight)(value)
    }
}

/// Draws each candidate with probability proportional to `weight(value)`.
///
/// Works on explicit candidates only; there is no value-to-weight mapping
/// for a range that has not been enumerated.
#[derive(Debug, Clone)]
pub struct IndividualWeighting {
    name: String,
    weight: Arc<dyn IndividualWeight>,
}

impl IndividualWeighting {
    pub fn new(name: impl Into<String>, weight: impl IndividualWeight + 'static) -> Self {
        Self {
            name: name.into(),
            weight: Arc::new(weight),
        }
    }

    pub fn from_fn<F>(name: impl Into<String>, weight: F) -> Self
    where
        F: Fn(&GeneratedValue) -> f64 + Send + Sync + 'static,
    {
        let name = name.into();
        Self {
            weight: Arc::new(FnWeight {
                name: name.clone(),
                weight,
            }),
            name,
        }
    }
}

impl Distribution for IndividualWeighting {
    fn name(&self) -> &str {
        &self.name
    }

    fn supports_unique(&self) -> bool {
        false
    }

    fn supports_numbers(&self) -> bool {
        false
    }

    fn selector(
        &self,
        domain: Domain<'_>,
        _unique: bool,
        _settings: &DistributionSettings,
        _rng: &mut dyn RngCore,
    ) -> Result<Box<dyn Selector>> {
        let Domain::Samples(samples) = domain else {
            return Err(GenerationError::Unsupported(format!(
                "distribution '{}' cannot synthesize numbers",
                self.name
            )));
        };
        if samples.is_empty() {
            return Ok(Box::new(UniformDraw::new(0)));
        }
        let weights: Vec<f64> = samples
            .iter()
            .map(|sample| self.weight.weight(&sample.value))
            .collect();
        validate_weights(&self.name, &weights)?;
        Ok(Box::new(WeightedDraw::new(&self.name, &weights)?))
    }

    fn to_shared(&self) -> Arc<dyn Distribution> {
        Arc::new(self.clone())
    }
}

/// Weight as a function of a numeric candidate.
pub trait WeightFunction: fmt::Debug + Send + Sync {
    fn value(&self, x: f64) -> f64;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantFunction {
    pub value: f64,
}

impl WeightFunction for ConstantFunction {
    fn value(&self, _x: f64) -> f64 {
        self.value
    }
}

/// Normal density around `mean`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaussianFunction {
    mean: f64,
    deviation: f64,
}

impl GaussianFunction {
    pub fn new(mean: f64, deviation: f64) -> Result<Self> {
        if !mean.is_finite() || !deviation.is_finite() || deviation <= 0.0 {
            return Err(GenerationError::InvalidArgument(format!(
                "gaussian needs a finite mean and a positive deviation, got ({mean}, {deviation})"
            )));
        }
        Ok(Self { mean, deviation })
    }
}

impl WeightFunction for GaussianFunction {
    fn value(&self, x: f64) -> f64 {
        let z = (x - self.mean) / self.deviation;
        (-0.5 * z * z).exp() / (self.deviation * (2.0 * std::f64::consts::PI).sqrt())
    }
}

/// `rate * exp(-rate * x)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExponentialFunction {
    rate: f64,
}

impl ExponentialFunction {
    pub fn new(rate: f64) -> Result<Self> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(GenerationError::InvalidArgument(format!(
                "exponential rate must be positive, got {rate}"
            )));
        }
        Ok(Self { rate })
    }
}

impl WeightFunction for ExponentialFunction {
    fn value(&self, x: f64) -> f64 {
        self.rate * (-self.rate * x).exp()
    }
}

/// Weights numeric candidates by a [`WeightFunction`] of their value.
#[derive(Debug, Clone)]
pub struct FunctionWeighting {
    name: String,
    function: Arc<dyn WeightFunction>,
}

impl FunctionWeighting {
    pub fn new(name: impl Into<String>, function: impl WeightFunction + 'static) -> Self {
        Self {
            name: name.into(),
            function: Arc::new(function),
        }
    }
}

impl Distribution for FunctionWeighting {
    fn name(&self) -> &str {
        &self.name
    }

    fn supports_unique(&self) -> bool {
        false
    }

    fn check_domain(&self, domain: Domain<'_>) -> Result<()> {
        let Domain::Samples(samples) = domain else {
            return Ok(());
        };
        match samples.iter().position(|sample| !sample.value.is_numeric()) {
            Some(index) => Err(GenerationError::InvalidArgument(format!(
                "distribution '{}' needs numeric candidates, index {index} is not",
                self.name
            ))),
            None => Ok(()),
        }
    }

    fn selector(
        &self,
        domain: Domain<'_>,
        _unique: bool,
        settings: &DistributionSettings,
        _rng: &mut dyn RngCore,
    ) -> Result<Box<dyn Selector>> {
        let len = domain.len();
        if len == 0 {
            return Ok(Box::new(UniformDraw::new(0)));
        }
        settings.ensure_materializable(&self.name, len)?;
        self.check_domain(domain)?;
        let weights: Vec<f64> = (0..len)
            .filter_map(|index| domain.number(index))
            .map(|x| self.function.value(x))
            .collect();
        validate_weights(&self.name, &weights)?;
        Ok(Box::new(WeightedDraw::new(&self.name, &weights)?))
    }

    fn to_shared(&self) -> Arc<dyn Distribution> {
        Arc::new(self.clone())
    }
}
