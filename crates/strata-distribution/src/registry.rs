use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use strata_core::{GenerationError, Result};

use crate::cumulative::{ExponentialCdf, InverseTransform, UniformCdf};
use crate::distribution::Distribution;
use crate::sequence::{BitReverseOrder, Sequence, ShuffleOrder, StepOrder, WedgeOrder};
use crate::weighted::{
    ConstantFunction, ExponentialFunction, FunctionWeighting, GaussianFunction, SampleWeighting,
    StandardWeightingFunction,
};

type Factory = Arc<dyn Fn(&DistributionArgs) -> Result<Arc<dyn Distribution>> + Send + Sync>;

/// Positional arguments of a distribution spec such as `gaussian(5, 1.5)`.
#[derive(Debug, Clone, PartialEq)]
pub struct DistributionArgs {
    values: Vec<String>,
}

impl DistributionArgs {
    /// Split `spec` into its lower-cased name and argument list.
    pub fn parse(spec: &str) -> Result<(String, Self)> {
        let spec = spec.trim();
        let invalid = |message: &str| {
            GenerationError::configuration(format!("distribution '{spec}'"), message)
        };

        let (name, values) = match spec.find('(') {
            None => (spec, Vec::new()),
            Some(open) => {
                let Some(inner) = spec[open + 1..].strip_suffix(')') else {
                    return Err(invalid("unbalanced parentheses"));
                };
                let values = if inner.trim().is_empty() {
                    Vec::new()
                } else {
                    inner.split(',').map(|value| value.trim().to_string()).collect()
                };
                (spec[..open].trim(), values)
            }
        };

        let valid_name = !name.is_empty()
            && name
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '-'));
        if !valid_name {
            return Err(invalid("expected a name like 'step' or 'gaussian(0, 1)'"));
        }
        if values.iter().any(String::is_empty) {
            return Err(invalid("empty argument"));
        }
        Ok((name.to_ascii_lowercase(), Self { values }))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn str_at(&self, index: usize) -> Option<&str> {
        self.values.get(index).map(String::as_str)
    }

    pub fn expect_at_most(&self, count: usize) -> Result<()> {
        if self.values.len() > count {
            return Err(GenerationError::InvalidArgument(format!(
                "expected at most {count} arguments, got {}",
                self.values.len()
            )));
        }
        Ok(())
    }

    pub fn f64_at(&self, index: usize) -> Result<Option<f64>> {
        let Some(raw) = self.str_at(index) else {
            return Ok(None);
        };
        raw.parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .map(Some)
            .ok_or_else(|| {
                GenerationError::InvalidArgument(format!(
                    "argument {index} is not a number: '{raw}'"
                ))
            })
    }

    pub fn required_f64(&self, index: usize, what: &str) -> Result<f64> {
        self.f64_at(index)?.ok_or_else(|| {
            GenerationError::InvalidArgument(format!("missing argument {index} ({what})"))
        })
    }

    pub fn f64_list(&self) -> Result<Vec<f64>> {
        (0..self.values.len())
            .map(|index| self.required_f64(index, "number"))
            .collect()
    }
}

/// Named distribution factories, resolved from textual specs.
#[derive(Clone)]
pub struct DistributionRegistry {
    factories: BTreeMap<String, Factory>,
}

impl fmt::Debug for DistributionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DistributionRegistry")
            .field("ids", &self.ids())
            .finish()
    }
}

impl Default for DistributionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DistributionRegistry {
    /// Registry preloaded with the built-in strategies.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        register_builtins(&mut registry);
        registry
    }

    pub fn empty() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Register or replace the factory behind `name`.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(&DistributionArgs) -> Result<Arc<dyn Distribution>> + Send + Sync + 'static,
    {
        self.factories
            .insert(name.into().to_ascii_lowercase(), Arc::new(factory));
    }

    /// Register a fixed instance that takes no arguments.
    pub fn register_instance(
        &mut self,
        name: impl Into<String>,
        distribution: Arc<dyn Distribution>,
    ) {
        self.register(name, move |args: &DistributionArgs| {
            args.expect_at_most(0)?;
            Ok(Arc::clone(&distribution))
        });
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(&name.to_ascii_lowercase())
    }

    /// Registered names in sorted order.
    pub fn ids(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }

    /// Build the distribution described by `spec`.
    ///
    /// Unknown names and rejected arguments are configuration errors
    /// carrying the spec as resource.
    pub fn resolve(&self, spec: &str) -> Result<Arc<dyn Distribution>> {
        let (name, args) = DistributionArgs::parse(spec)?;
        let resource = format!("distribution '{}'", spec.trim());
        let factory = self.factories.get(&name).ok_or_else(|| {
            GenerationError::configuration(
                resource.clone(),
                format!("unknown distribution '{name}'"),
            )
        })?;
        factory(&args).map_err(|err| match err {
            GenerationError::Configuration { .. } => err,
            other => GenerationError::configuration(resource, other.to_string()),
        })
    }
}

fn register_builtins(registry: &mut DistributionRegistry) {
    registry.register("step", |args: &DistributionArgs| {
        args.expect_at_most(1)?;
        let increment = args.f64_at(0)?.unwrap_or(1.0);
        if increment.fract() != 0.0 {
            return Err(GenerationError::InvalidArgument(format!(
                "step increment must be an integer, got {increment}"
            )));
        }
        let order = StepOrder::new(increment as i64)?;
        Ok(Arc::new(Sequence::new(order)) as Arc<dyn Distribution>)
    });
    registry.register_instance("shuffle", Arc::new(Sequence::new(ShuffleOrder)));
    registry.register_instance("wedge", Arc::new(Sequence::new(WedgeOrder)));
    registry.register_instance("bitreverse", Arc::new(Sequence::new(BitReverseOrder)));
    registry.register_instance("random", Arc::new(SampleWeighting));
    registry.register("weighted", |args: &DistributionArgs| {
        if args.is_empty() {
            return Ok(Arc::new(SampleWeighting) as Arc<dyn Distribution>);
        }
        let weights = StandardWeightingFunction::new(args.f64_list()?)?;
        Ok(Arc::new(weights) as Arc<dyn Distribution>)
    });
    registry.register("constant", |args: &DistributionArgs| {
        args.expect_at_most(1)?;
        let value = args.f64_at(0)?.unwrap_or(1.0);
        let function = FunctionWeighting::new("constant", ConstantFunction { value });
        Ok(Arc::new(function) as Arc<dyn Distribution>)
    });
    registry.register("gaussian", |args: &DistributionArgs| {
        args.expect_at_most(2)?;
        let mean = args.required_f64(0, "mean")?;
        let deviation = args.required_f64(1, "deviation")?;
        let function = FunctionWeighting::new("gaussian", GaussianFunction::new(mean, deviation)?);
        Ok(Arc::new(function) as Arc<dyn Distribution>)
    });
    registry.register("exponential", |args: &DistributionArgs| {
        args.expect_at_most(1)?;
        let rate = args.required_f64(0, "rate")?;
        let function = FunctionWeighting::new("exponential", ExponentialFunction::new(rate)?);
        Ok(Arc::new(function) as Arc<dyn Distribution>)
    });
    registry.register("cdf.uniform", |args: &DistributionArgs| {
        args.expect_at_most(2)?;
        let min = args.required_f64(0, "min")?;
        let max = args.required_f64(1, "max")?;
        let cdf = InverseTransform::new("cdf.uniform", UniformCdf::new(min, max)?);
        Ok(Arc::new(cdf) as Arc<dyn Distribution>)
    });
    registry.register("cdf.exponential", |args: &DistributionArgs| {
        args.expect_at_most(1)?;
        let lambda = args.required_f64(0, "lambda")?;
        let cdf = InverseTransform::new("cdf.exponential", ExponentialCdf::new(lambda)?);
        Ok(Arc::new(cdf) as Arc<dyn Distribution>)
    });
}
