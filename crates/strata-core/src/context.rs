use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Shared settings and services a generator binds to in `init`.
#[derive(Clone)]
pub struct GenerationContext {
    seed: u64,
    max_count: Option<u64>,
    locale: String,
    resources: BTreeMap<String, Arc<dyn Any + Send + Sync>>,
}

impl Default for GenerationContext {
    fn default() -> Self {
        Self {
            seed: 0,
            max_count: None,
            locale: "en".to_string(),
            resources: BTreeMap::new(),
        }
    }
}

impl fmt::Debug for GenerationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationContext")
            .field("seed", &self.seed)
            .field("max_count", &self.max_count)
            .field("locale", &self.locale)
            .field("resources", &self.resources.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl GenerationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Upper bound on values a single generator emits before end-of-data.
    pub fn with_max_count(mut self, max_count: u64) -> Self {
        self.max_count = Some(max_count);
        self
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    /// Register a shared service (sample loader, sibling source) under `key`.
    pub fn with_resource<R: Any + Send + Sync>(
        mut self,
        key: impl Into<String>,
        resource: Arc<R>,
    ) -> Self {
        self.resources.insert(key.into(), resource);
        self
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn max_count(&self) -> Option<u64> {
        self.max_count
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    pub fn resource<R: Any + Send + Sync>(&self, key: &str) -> Option<Arc<R>> {
        self.resources
            .get(key)
            .cloned()
            .and_then(|resource| resource.downcast::<R>().ok())
    }

    /// Deterministic RNG for the generator identified by `key`.
    pub fn rng_for(&self, key: &str) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(hash_seed(self.seed, key))
    }
}

/// FNV-1a mix of a base seed and a stable key.
pub fn hash_seed(seed: u64, key: &str) -> u64 {
    let mut hash = seed ^ 0xcbf29ce484222325;
    for byte in key.as_bytes() {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}
