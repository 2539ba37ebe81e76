use std::fmt;
use std::sync::Arc;

use rand::RngCore;
use rand::seq::SliceRandom;

use strata_core::{GenerationError, Result};

use crate::distribution::{Distribution, DistributionSettings, Domain, Selector};

/// Finite walk over the indices `0..len` of a domain.
pub trait IndexCursor: Send {
    fn next_index(&mut self) -> Option<usize>;
}

/// Deterministic (or seeded) visiting order for a [`Sequence`].
pub trait OrderingPolicy: fmt::Debug + Send + Sync {
    fn name(&self) -> &str;

    /// Whether the cursor holds the whole order in memory.
    fn materializes(&self) -> bool {
        false
    }

    fn cursor(&self, len: usize, rng: &mut dyn RngCore) -> Result<Box<dyn IndexCursor>>;
}

/// Every `increment`-th index; negative increments walk down from the top.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepOrder {
    increment: i64,
}

impl StepOrder {
    pub fn new(increment: i64) -> Result<Self> {
        if increment == 0 {
            return Err(GenerationError::InvalidArgument(
                "step increment must not be zero".to_string(),
            ));
        }
        Ok(Self { increment })
    }

    pub fn increment(&self) -> i64 {
        self.increment
    }
}

impl OrderingPolicy for StepOrder {
    fn name(&self) -> &str {
        "step"
    }

    fn cursor(&self, len: usize, _rng: &mut dyn RngCore) -> Result<Box<dyn IndexCursor>> {
        let descending = self.increment < 0;
        let step = usize::try_from(self.increment.unsigned_abs()).unwrap_or(usize::MAX);
        let next = match (len, descending) {
            (0, _) => None,
            (_, false) => Some(0),
            (_, true) => Some(len - 1),
        };
        Ok(Box::new(StepCursor {
            next,
            step,
            descending,
            len,
        }))
    }
}

struct StepCursor {
    next: Option<usize>,
    step: usize,
    descending: bool,
    len: usize,
}

impl IndexCursor for StepCursor {
    fn next_index(&mut self) -> Option<usize> {
        let current = self.next?;
        self.next = if self.descending {
            current.checked_sub(self.step)
        } else {
            current
                .checked_add(self.step)
                .filter(|index| *index < self.len)
        };
        Some(current)
    }
}

/// Seeded random permutation.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShuffleOrder;

impl OrderingPolicy for ShuffleOrder {
    fn name(&self) -> &str {
        "shuffle"
    }

    fn materializes(&self) -> bool {
        true
    }

    fn cursor(&self, len: usize, rng: &mut dyn RngCore) -> Result<Box<dyn IndexCursor>> {
        let mut order: Vec<usize> = (0..len).collect();
        order.shuffle(rng);
        Ok(Box::new(ExplicitOrder { order, position: 0 }))
    }
}

/// Alternates between the low and the high end, meeting in the middle.
#[derive(Debug, Clone, Copy, Default)]
pub struct WedgeOrder;

impl OrderingPolicy for WedgeOrder {
    fn name(&self) -> &str {
        "wedge"
    }

    fn cursor(&self, len: usize, _rng: &mut dyn RngCore) -> Result<Box<dyn IndexCursor>> {
        Ok(Box::new(WedgeCursor { position: 0, len }))
    }
}

struct WedgeCursor {
    position: usize,
    len: usize,
}

impl IndexCursor for WedgeCursor {
    fn next_index(&mut self) -> Option<usize> {
        if self.position >= self.len {
            return None;
        }
        let half = self.position / 2;
        let index = if self.position % 2 == 0 {
            half
        } else {
            self.len - 1 - half
        };
        self.position += 1;
        Some(index)
    }
}

/// Visits indices in bit-reversed counter order, spreading early picks
/// across the whole domain.
#[derive(Debug, Clone, Copy, Default)]
pub struct BitReverseOrder;

impl OrderingPolicy for BitReverseOrder {
    fn name(&self) -> &str {
        "bitreverse"
    }

    fn cursor(&self, len: usize, _rng: &mut dyn RngCore) -> Result<Box<dyn IndexCursor>> {
        let bits = if len <= 1 {
            0
        } else {
            usize::BITS - (len - 1).leading_zeros()
        };
        Ok(Box::new(BitReverseCursor {
            counter: 0,
            limit: 1_usize.checked_shl(bits).unwrap_or(usize::MAX),
            bits,
            len,
        }))
    }
}

struct BitReverseCursor {
    counter: usize,
    limit: usize,
    bits: u32,
    len: usize,
}

impl IndexCursor for BitReverseCursor {
    fn next_index(&mut self) -> Option<usize> {
        while self.counter < self.limit {
            let counter = self.counter;
            self.counter += 1;
            let index = if self.bits == 0 {
                counter
            } else {
                counter.reverse_bits() >> (usize::BITS - self.bits)
            };
            if index < self.len {
                return Some(index);
            }
        }
        None
    }
}

/// Precomputed permutation; custom policies hand one back from `cursor`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplicitOrder {
    order: Vec<usize>,
    position: usize,
}

impl ExplicitOrder {
    /// Accepts any subset of `0..len` in any order, each index at most once.
    pub fn new(order: Vec<usize>, len: usize) -> Result<Self> {
        let mut seen = vec![false; len];
        for index in &order {
            match seen.get_mut(*index) {
                Some(slot) if !*slot => *slot = true,
                Some(_) => {
                    return Err(GenerationError::InvalidArgument(format!(
                        "ordering visits index {index} twice"
                    )));
                }
                None => {
                    return Err(GenerationError::InvalidArgument(format!(
                        "ordering index {index} outside 0..{len}"
                    )));
                }
            }
        }
        Ok(Self { order, position: 0 })
    }
}

impl IndexCursor for ExplicitOrder {
    fn next_index(&mut self) -> Option<usize> {
        let index = self.order.get(self.position).copied()?;
        self.position += 1;
        Some(index)
    }
}

/// Emits candidates in the order of a policy, each at most once.
///
/// A sequence is finite: once the policy's walk ends the generator reports
/// end-of-data until reset.
#[derive(Debug, Clone)]
pub struct Sequence {
    policy: Arc<dyn OrderingPolicy>,
}

impl Sequence {
    pub fn new(policy: impl OrderingPolicy + 'static) -> Self {
        Self {
            policy: Arc::new(policy),
        }
    }

    pub fn step(increment: i64) -> Result<Self> {
        Ok(Self::new(StepOrder::new(increment)?))
    }

    pub fn ascending() -> Self {
        Self::new(StepOrder { increment: 1 })
    }

    pub fn shuffle() -> Self {
        Self::new(ShuffleOrder)
    }

    pub fn wedge() -> Self {
        Self::new(WedgeOrder)
    }

    pub fn bit_reverse() -> Self {
        Self::new(BitReverseOrder)
    }

    pub fn policy(&self) -> &dyn OrderingPolicy {
        self.policy.as_ref()
    }
}

impl Distribution for Sequence {
    fn name(&self) -> &str {
        self.policy.name()
    }

    fn supports_unique(&self) -> bool {
        true
    }

    fn selector(
        &self,
        domain: Domain<'_>,
        _unique: bool,
        settings: &DistributionSettings,
        rng: &mut dyn RngCore,
    ) -> Result<Box<dyn Selector>> {
        if self.policy.materializes() {
            settings.ensure_materializable(self.name(), domain.len())?;
        }
        let cursor = self.policy.cursor(domain.len(), rng)?;
        Ok(Box::new(CursorSelector { cursor }))
    }

    fn to_shared(&self) -> Arc<dyn Distribution> {
        Arc::new(self.clone())
    }
}

struct CursorSelector {
    cursor: Box<dyn IndexCursor>,
}

impl Selector for CursorSelector {
    fn next_index(&mut self, _rng: &mut dyn RngCore) -> Result<Option<usize>> {
        Ok(self.cursor.next_index())
    }
}
