/// Weight assumed when a sample source omits or blanks the weight column.
pub const DEFAULT_WEIGHT: f64 = 1.0;

/// A value paired with the non-negative weight steering its draw probability.
///
/// Equality compares values only. Lists of samples keep duplicates as
/// distinct entries; nothing at this layer merges them.
#[derive(Debug, Clone)]
pub struct WeightedSample<T> {
    pub value: T,
    pub weight: f64,
}

impl<T> WeightedSample<T> {
    pub fn new(value: T, weight: f64) -> Self {
        Self { value, weight }
    }

    pub fn unweighted(value: T) -> Self {
        Self::new(value, DEFAULT_WEIGHT)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> WeightedSample<U> {
        WeightedSample {
            value: f(self.value),
            weight: self.weight,
        }
    }
}

impl<T: PartialEq> PartialEq for WeightedSample<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

pub fn total_weight<T>(samples: &[WeightedSample<T>]) -> f64 {
    samples.iter().map(|sample| sample.weight).sum()
}
