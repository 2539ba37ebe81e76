use rand::distr::Distribution as _;
use rand::distr::weighted::WeightedIndex;
use rand::{Rng, RngCore};

use strata_core::{GenerationError, Result};

use crate::distribution::Selector;

/// Draws indices with replacement, proportional to fixed weights.
#[derive(Debug, Clone)]
pub struct WeightedDraw {
    index: WeightedIndex<f64>,
}

impl WeightedDraw {
    pub fn new(strategy: &str, weights: &[f64]) -> Result<Self> {
        let index = WeightedIndex::new(weights.iter().copied()).map_err(|err| {
            GenerationError::InvalidArgument(format!(
                "distribution '{strategy}' cannot build a weighted table: {err}"
            ))
        })?;
        Ok(Self { index })
    }
}

impl Selector for WeightedDraw {
    fn next_index(&mut self, rng: &mut dyn RngCore) -> Result<Option<usize>> {
        Ok(Some(self.index.sample(rng)))
    }
}

/// Uniform draws with replacement over `len` indices. Empty means exhausted.
#[derive(Debug, Clone, Copy)]
pub struct UniformDraw {
    len: usize,
}

impl UniformDraw {
    pub fn new(len: usize) -> Self {
        Self { len }
    }
}

impl Selector for UniformDraw {
    fn next_index(&mut self, rng: &mut dyn RngCore) -> Result<Option<usize>> {
        if self.len == 0 {
            return Ok(None);
        }
        Ok(Some(rng.random_range(0..self.len)))
    }
}

/// Weighted draws without replacement.
///
/// Zero-weight candidates never enter the set. Each draw removes the chosen
/// candidate, so every remaining one is emitted exactly once. Weights live in
/// a Fenwick tree, making a draw and its removal `O(log n)`.
#[derive(Debug, Clone, Default)]
pub struct WorkingSet {
    indices: Vec<usize>,
    weights: Vec<f64>,
    /// 1-based Fenwick tree over `weights`.
    tree: Vec<f64>,
    remaining: usize,
}

impl WorkingSet {
    pub fn new(weights: impl IntoIterator<Item = f64>) -> Self {
        let mut indices = Vec::new();
        let mut live = Vec::new();
        for (index, weight) in weights.into_iter().enumerate() {
            if weight > 0.0 {
                indices.push(index);
                live.push(weight);
            }
        }

        let mut tree = vec![0.0; live.len() + 1];
        for (slot, weight) in live.iter().enumerate() {
            let node = slot + 1;
            tree[node] += weight;
            let parent = node + (node & node.wrapping_neg());
            if parent < tree.len() {
                tree[parent] += tree[node];
            }
        }

        Self {
            remaining: indices.len(),
            indices,
            weights: live,
            tree,
        }
    }

    pub fn remaining(&self) -> usize {
        self.remaining
    }

    fn total(&self) -> f64 {
        let mut node = self.weights.len();
        let mut sum = 0.0;
        while node > 0 {
            sum += self.tree[node];
            node &= node - 1;
        }
        sum
    }

    /// Slot whose cumulative weight range contains `target`.
    fn find(&self, mut target: f64) -> usize {
        let len = self.weights.len();
        let mut position = 0;
        let mut step = if len == 0 { 0 } else { 1 << len.ilog2() };
        while step > 0 {
            let next = position + step;
            if next <= len && self.tree[next] <= target {
                position = next;
                target -= self.tree[next];
            }
            step >>= 1;
        }
        position
    }

    fn remove(&mut self, slot: usize) {
        let weight = std::mem::take(&mut self.weights[slot]);
        let mut node = slot + 1;
        while node < self.tree.len() {
            self.tree[node] -= weight;
            node += node & node.wrapping_neg();
        }
        self.remaining -= 1;
    }

    /// Nearest slot still in the set, for targets lost to rounding.
    fn nearest_live(&self, slot: usize) -> Option<usize> {
        let slot = slot.min(self.weights.len().saturating_sub(1));
        (slot..self.weights.len())
            .chain((0..slot).rev())
            .find(|candidate| self.weights[*candidate] > 0.0)
    }
}

impl Selector for WorkingSet {
    fn next_index(&mut self, rng: &mut dyn RngCore) -> Result<Option<usize>> {
        if self.remaining == 0 {
            return Ok(None);
        }
        let target = rng.random::<f64>() * self.total().max(0.0);
        let mut slot = self.find(target);
        if self.weights.get(slot).is_none_or(|weight| *weight <= 0.0) {
            let Some(live) = self.nearest_live(slot) else {
                return Ok(None);
            };
            slot = live;
        }
        self.remove(slot);
        Ok(Some(self.indices[slot]))
    }
}
