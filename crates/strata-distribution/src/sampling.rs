use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::sync::Arc;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, warn};

use strata_core::{
    BoxedGenerator, GeneratedValue, GenerationContext, GenerationError, Generator, GeneratorState,
    Lifecycle, NumberRange, Result, WeightedSample, hash_seed,
};
use strata_dataset::{DatasetRequest, DatasetResolver, SampleLoader, ValueType};

use crate::distribution::{Distribution, DistributionSettings, Domain, Selector, check_capabilities};
use crate::weighted::SampleWeighting;

type Samples = Vec<WeightedSample<GeneratedValue>>;

/// Dataset-backed candidates, loaded when the generator is initialized.
#[derive(Debug, Clone)]
pub struct DatasetSource {
    request: DatasetRequest,
    resolver: DatasetResolver,
    value_type: ValueType,
    loader: Option<Arc<SampleLoader>>,
}

impl DatasetSource {
    pub fn new(request: DatasetRequest, resolver: DatasetResolver, value_type: ValueType) -> Self {
        Self {
            request,
            resolver,
            value_type,
            loader: None,
        }
    }

    /// Use `loader` instead of the one registered in the generation context.
    pub fn with_loader(mut self, loader: Arc<SampleLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    pub fn request(&self) -> &DatasetRequest {
        &self.request
    }

    fn load(&self, ctx: &GenerationContext) -> Result<Samples> {
        let loader = match &self.loader {
            Some(loader) => Arc::clone(loader),
            None => ctx
                .resource::<SampleLoader>(SampleLoader::RESOURCE_KEY)
                .ok_or_else(|| {
                    GenerationError::configuration(
                        format!("dataset '{}'", self.request.dataset),
                        format!(
                            "no sample loader registered under '{}'",
                            SampleLoader::RESOURCE_KEY
                        ),
                    )
                })?,
        };
        loader.parse_dataset_files(&self.request, &self.resolver, &self.value_type)
    }
}

enum Origin {
    /// Candidates handed over at construction.
    Samples,
    Source(BoxedGenerator<GeneratedValue>),
    Dataset(DatasetSource),
    Range(NumberRange),
}

impl fmt::Debug for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Samples => f.write_str("Samples"),
            Origin::Source(source) => f
                .debug_tuple("Source")
                .field(&source.state())
                .finish(),
            Origin::Dataset(source) => f.debug_tuple("Dataset").field(source).finish(),
            Origin::Range(range) => f.debug_tuple("Range").field(range).finish(),
        }
    }
}

/// Generator emitting candidates chosen by a [`Distribution`].
///
/// Candidates come from weighted samples, a dataset, another generator or a
/// number range. Selection state is built lazily on the first `generate`, so
/// a generator capped at zero values never drains its source or builds a
/// table.
pub struct SamplingGenerator {
    lifecycle: Lifecycle,
    origin: Origin,
    samples: Option<Samples>,
    distribution: Arc<dyn Distribution>,
    unique: bool,
    settings: DistributionSettings,
    seed: u64,
    rng: ChaCha8Rng,
    max_count: Option<u64>,
    emitted: u64,
    selector: Option<Box<dyn Selector>>,
}

impl fmt::Debug for SamplingGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SamplingGenerator")
            .field("name", &self.lifecycle.name())
            .field("state", &self.lifecycle.state())
            .field("origin", &self.origin)
            .field("distribution", &self.distribution.name())
            .field("unique", &self.unique)
            .field("emitted", &self.emitted)
            .finish()
    }
}

impl SamplingGenerator {
    fn new(
        name: String,
        origin: Origin,
        samples: Option<Samples>,
        distribution: Arc<dyn Distribution>,
        unique: bool,
    ) -> Result<Self> {
        let numbers = matches!(origin, Origin::Range(_));
        check_capabilities(distribution.as_ref(), unique, numbers)?;
        let samples = match samples {
            Some(samples) if unique => Some(collapse_duplicates(samples)),
            other => other,
        };
        match (&origin, &samples) {
            (Origin::Range(range), _) => distribution.check_domain(Domain::Range(range))?,
            (_, Some(samples)) => distribution.check_domain(Domain::Samples(samples))?,
            (_, None) => {}
        }
        Ok(Self {
            lifecycle: Lifecycle::new(name),
            origin,
            samples,
            distribution,
            unique,
            settings: DistributionSettings::default(),
            seed: 0,
            rng: ChaCha8Rng::seed_from_u64(0),
            max_count: None,
            emitted: 0,
            selector: None,
        })
    }

    /// Sample from explicit weighted candidates. Without a distribution the
    /// candidates' own weights decide.
    pub fn from_samples(
        name: impl Into<String>,
        samples: Samples,
        distribution: Option<Arc<dyn Distribution>>,
        unique: bool,
    ) -> Result<Self> {
        let distribution = distribution.unwrap_or_else(|| Arc::new(SampleWeighting));
        Self::new(name.into(), Origin::Samples, Some(samples), distribution, unique)
    }

    /// Sample from the files backing a dataset. Without a distribution the
    /// per-line weights decide.
    pub fn from_dataset(
        source: DatasetSource,
        distribution: Option<Arc<dyn Distribution>>,
        unique: bool,
    ) -> Result<Self> {
        let distribution = distribution.unwrap_or_else(|| Arc::new(SampleWeighting));
        let name = format!("dataset.{}", source.request.dataset);
        Self::new(name, Origin::Dataset(source), None, distribution, unique)
    }

    /// Re-emit the values of `source` under `distribution`.
    pub fn from_source(
        source: BoxedGenerator<GeneratedValue>,
        distribution: Arc<dyn Distribution>,
        unique: bool,
    ) -> Result<Self> {
        let name = format!("{}.source", distribution.name());
        Self::new(name, Origin::Source(source), None, distribution, unique)
    }

    /// Synthesize grid points of `range` under `distribution`.
    pub fn from_range(
        range: NumberRange,
        distribution: Arc<dyn Distribution>,
        unique: bool,
    ) -> Result<Self> {
        let name = format!("{}.numbers", distribution.name());
        Self::new(name, Origin::Range(range), None, distribution, unique)
    }

    /// Rename the generator; the name also keys its seeded RNG stream.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.lifecycle = Lifecycle::new(name);
        self
    }

    pub fn with_settings(mut self, settings: DistributionSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn name(&self) -> &str {
        self.lifecycle.name()
    }

    pub fn distribution(&self) -> &dyn Distribution {
        self.distribution.as_ref()
    }

    pub fn is_unique(&self) -> bool {
        self.unique
    }

    /// Materialized candidates, once loaded or drained.
    pub fn samples(&self) -> Option<&[WeightedSample<GeneratedValue>]> {
        self.samples.as_deref()
    }

    fn build(&mut self) -> Result<()> {
        if self.samples.is_none()
            && let Origin::Source(source) = &mut self.origin
        {
            let drained = drain(
                &mut **source,
                self.settings.max_candidates,
                self.lifecycle.name(),
            )?;
            self.samples = Some(if self.unique {
                collapse_duplicates(drained)
            } else {
                drained
            });
        }

        let domain = match (&self.origin, &self.samples) {
            (Origin::Range(range), _) => Domain::Range(range),
            (_, Some(samples)) => Domain::Samples(samples),
            (_, None) => Domain::Samples(&[]),
        };
        let candidates = domain.len();
        if candidates == 0 {
            warn!(generator = %self.lifecycle.name(), "no candidates to sample from");
        }
        let selector = self
            .distribution
            .selector(domain, self.unique, &self.settings, &mut self.rng)?;
        self.selector = Some(selector);
        debug!(
            generator = %self.lifecycle.name(),
            distribution = %self.distribution.name(),
            candidates,
            unique = self.unique,
            "selection built"
        );
        Ok(())
    }

    fn value_at(&self, index: usize) -> Result<GeneratedValue> {
        let value = match (&self.origin, &self.samples) {
            (Origin::Range(range), _) => {
                (index < range.point_count()).then(|| range.value_at(index))
            }
            (_, Some(samples)) => samples.get(index).map(|sample| sample.value.clone()),
            (_, None) => None,
        };
        value.ok_or_else(|| {
            GenerationError::IllegalState(format!(
                "distribution '{}' selected index {index} outside the candidates of '{}'",
                self.distribution.name(),
                self.lifecycle.name()
            ))
        })
    }
}

impl Generator<GeneratedValue> for SamplingGenerator {
    fn init(&mut self, ctx: &GenerationContext) -> Result<()> {
        self.lifecycle.ensure_uninitialized()?;
        match &mut self.origin {
            Origin::Source(source) if source.state() == GeneratorState::Uninitialized => {
                source.init(ctx)?;
            }
            Origin::Dataset(source) => {
                let mut samples = source.load(ctx)?;
                if self.unique {
                    samples = collapse_duplicates(samples);
                }
                self.distribution.check_domain(Domain::Samples(&samples))?;
                self.samples = Some(samples);
            }
            _ => {}
        }
        self.seed = hash_seed(ctx.seed(), self.lifecycle.name());
        self.rng = ChaCha8Rng::seed_from_u64(self.seed);
        self.max_count = ctx.max_count();
        self.emitted = 0;
        self.lifecycle.mark_initialized();
        debug!(
            generator = %self.lifecycle.name(),
            distribution = %self.distribution.name(),
            unique = self.unique,
            max_count = ?self.max_count,
            "generator initialized"
        );
        Ok(())
    }

    fn generate(&mut self) -> Result<Option<GeneratedValue>> {
        self.lifecycle.ensure_initialized("generate")?;
        if let Some(max_count) = self.max_count
            && self.emitted >= max_count
        {
            return Ok(None);
        }
        if self.selector.is_none() {
            self.build()?;
        }
        let Some(selector) = self.selector.as_mut() else {
            return Ok(None);
        };
        let Some(index) = selector.next_index(&mut self.rng)? else {
            return Ok(None);
        };
        let value = self.value_at(index)?;
        self.emitted += 1;
        Ok(Some(value))
    }

    /// Restart selection from the initial seed. Materialized candidates are
    /// kept; the selection table is rebuilt on the next `generate`.
    fn reset(&mut self) -> Result<()> {
        self.lifecycle.ensure_initialized("reset")?;
        self.rng = ChaCha8Rng::seed_from_u64(self.seed);
        self.emitted = 0;
        self.selector = None;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if !self.lifecycle.close() {
            return Ok(());
        }
        self.selector = None;
        self.samples = None;
        if let Origin::Source(source) = &mut self.origin {
            source.close()?;
        }
        debug!(generator = %self.lifecycle.name(), emitted = self.emitted, "generator closed");
        Ok(())
    }

    fn state(&self) -> GeneratorState {
        self.lifecycle.state()
    }
}

fn drain(
    source: &mut dyn Generator<GeneratedValue>,
    limit: usize,
    owner: &str,
) -> Result<Samples> {
    let mut samples = Vec::new();
    while let Some(value) = source.generate()? {
        if samples.len() >= limit {
            return Err(GenerationError::configuration(
                format!("source of '{owner}'"),
                format!("source produced more than {limit} candidates"),
            ));
        }
        samples.push(WeightedSample::unweighted(value));
    }
    Ok(samples)
}

/// Merge equal values, summing their weights and keeping first-seen order.
fn collapse_duplicates(samples: Samples) -> Samples {
    let mut positions: HashMap<_, usize> = HashMap::with_capacity(samples.len());
    let mut merged: Samples = Vec::with_capacity(samples.len());
    for sample in samples {
        match positions.entry(sample.value.key()) {
            Entry::Occupied(entry) => merged[*entry.get()].weight += sample.weight,
            Entry::Vacant(entry) => {
                entry.insert(merged.len());
                merged.push(sample);
            }
        }
    }
    merged
}
