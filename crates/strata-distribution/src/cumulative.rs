use std::fmt;
use std::sync::Arc;

use rand::{Rng, RngCore};

use strata_core::{GenerationError, NumberRange, Result};

use crate::distribution::{Distribution, DistributionSettings, Domain, Selector};

/// A cumulative distribution and its inverse.
pub trait CumulativeDistributionFunction: fmt::Debug + Send + Sync {
    fn cumulative_probability(&self, value: f64) -> f64;

    /// Value at which the cumulative probability reaches `probability` in [0, 1).
    fn inverse(&self, probability: f64) -> f64;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UniformCdf {
    min: f64,
    max: f64,
}

impl UniformCdf {
    pub fn new(min: f64, max: f64) -> Result<Self> {
        if !min.is_finite() || !max.is_finite() || min >= max {
            return Err(GenerationError::InvalidArgument(format!(
                "uniform cdf needs finite min < max, got ({min}, {max})"
            )));
        }
        Ok(Self { min, max })
    }
}

impl CumulativeDistributionFunction for UniformCdf {
    fn cumulative_probability(&self, value: f64) -> f64 {
        ((value - self.min) / (self.max - self.min)).clamp(0.0, 1.0)
    }

    fn inverse(&self, probability: f64) -> f64 {
        self.min + probability * (self.max - self.min)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExponentialCdf {
    lambda: f64,
}

impl ExponentialCdf {
    pub fn new(lambda: f64) -> Result<Self> {
        if !lambda.is_finite() || lambda <= 0.0 {
            return Err(GenerationError::InvalidArgument(format!(
                "exponential cdf needs a positive lambda, got {lambda}"
            )));
        }
        Ok(Self { lambda })
    }
}

impl CumulativeDistributionFunction for ExponentialCdf {
    fn cumulative_probability(&self, value: f64) -> f64 {
        if value < 0.0 {
            0.0
        } else {
            1.0 - (-self.lambda * value).exp()
        }
    }

    fn inverse(&self, probability: f64) -> f64 {
        -(1.0 - probability).ln() / self.lambda
    }
}

type Curve = Arc<dyn Fn(f64) -> f64 + Send + Sync>;

/// A cdf given as a pair of closures.
#[derive(Clone)]
pub struct InverseFn {
    name: String,
    cumulative: Curve,
    inverse: Curve,
}

impl InverseFn {
    pub fn new<C, I>(name: impl Into<String>, cumulative: C, inverse: I) -> Self
    where
        C: Fn(f64) -> f64 + Send + Sync + 'static,
        I: Fn(f64) -> f64 + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            cumulative: Arc::new(cumulative),
            inverse: Arc::new(inverse),
        }
    }
}

impl fmt::Debug for InverseFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InverseFn").field("name", &self.name).finish()
    }
}

impl CumulativeDistributionFunction for InverseFn {
    fn cumulative_probability(&self, value: f64) -> f64 {
        (self.cumulative)(value)
    }

    fn inverse(&self, probability: f64) -> f64 {
        (self.inverse)(probability)
    }
}

/// Inverse-transform sampling through a [`CumulativeDistributionFunction`].
///
/// Over a number range, `inverse(p)` is snapped down onto the grid; over
/// explicit candidates `floor(inverse(p))` is the index. Draws landing
/// outside the domain are repeated up to
/// [`DistributionSettings::max_inverse_attempts`] times in a row.
#[derive(Debug, Clone)]
pub struct InverseTransform {
    name: String,
    cdf: Arc<dyn CumulativeDistributionFunction>,
}

impl InverseTransform {
    pub fn new(
        name: impl Into<String>,
        cdf: impl CumulativeDistributionFunction + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            cdf: Arc::new(cdf),
        }
    }

    pub fn cdf(&self) -> &dyn CumulativeDistributionFunction {
        self.cdf.as_ref()
    }
}

impl Distribution for InverseTransform {
    fn name(&self) -> &str {
        &self.name
    }

    fn supports_unique(&self) -> bool {
        false
    }

    fn selector(
        &self,
        domain: Domain<'_>,
        _unique: bool,
        settings: &DistributionSettings,
        _rng: &mut dyn RngCore,
    ) -> Result<Box<dyn Selector>> {
        let target = match domain {
            Domain::Range(range) => Target::Grid(*range),
            Domain::Samples(samples) => Target::Indices(samples.len()),
        };
        Ok(Box::new(InverseDraw {
            name: self.name.clone(),
            cdf: Arc::clone(&self.cdf),
            target,
            max_attempts: settings.max_inverse_attempts.max(1),
        }))
    }

    fn to_shared(&self) -> Arc<dyn Distribution> {
        Arc::new(self.clone())
    }
}

enum Target {
    Grid(NumberRange),
    Indices(usize),
}

impl Target {
    fn locate(&self, x: f64) -> Option<usize> {
        match self {
            Target::Grid(range) => range.index_of(x),
            Target::Indices(len) => {
                if !x.is_finite() || x < 0.0 {
                    return None;
                }
                let index = x.floor() as usize;
                (index < *len).then_some(index)
            }
        }
    }

    fn is_empty(&self) -> bool {
        match self {
            Target::Grid(range) => range.point_count() == 0,
            Target::Indices(len) => *len == 0,
        }
    }
}

struct InverseDraw {
    name: String,
    cdf: Arc<dyn CumulativeDistributionFunction>,
    target: Target,
    max_attempts: u32,
}

impl Selector for InverseDraw {
    fn next_index(&mut self, rng: &mut dyn RngCore) -> Result<Option<usize>> {
        if self.target.is_empty() {
            return Ok(None);
        }
        for _ in 0..self.max_attempts {
            let probability: f64 = rng.random();
            if let Some(index) = self.target.locate(self.cdf.inverse(probability)) {
                return Ok(Some(index));
            }
        }
        Err(GenerationError::configuration(
            format!("distribution '{}'", self.name),
            format!(
                "inverse transform missed the domain {} times in a row",
                self.max_attempts
            ),
        ))
    }
}
