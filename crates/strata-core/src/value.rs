use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{GenerationError, Result};

const GRID_EPSILON: f64 = 1e-9;

/// Value produced by dataset and distribution generators.
#[derive(Debug, Clone, PartialEq)]
pub enum GeneratedValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
}

/// Hashable identity of a [`GeneratedValue`], used for uniqueness bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueKey {
    Bool(bool),
    Int(i64),
    Float(u64),
    Text(String),
    Date(NaiveDate),
}

impl GeneratedValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            GeneratedValue::Int(value) => Some(*value as f64),
            GeneratedValue::Float(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            GeneratedValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            GeneratedValue::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            GeneratedValue::Date(value) => Some(*value),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, GeneratedValue::Int(_) | GeneratedValue::Float(_))
    }

    pub fn key(&self) -> ValueKey {
        match self {
            GeneratedValue::Bool(value) => ValueKey::Bool(*value),
            GeneratedValue::Int(value) => ValueKey::Int(*value),
            // -0.0 and 0.0 compare equal, so they must share a key.
            GeneratedValue::Float(value) if *value == 0.0 => ValueKey::Float(0),
            GeneratedValue::Float(value) => ValueKey::Float(value.to_bits()),
            GeneratedValue::Text(value) => ValueKey::Text(value.clone()),
            GeneratedValue::Date(value) => ValueKey::Date(*value),
        }
    }
}

impl fmt::Display for GeneratedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeneratedValue::Bool(value) => write!(f, "{value}"),
            GeneratedValue::Int(value) => write!(f, "{value}"),
            GeneratedValue::Float(value) => write!(f, "{value}"),
            GeneratedValue::Text(value) => f.write_str(value),
            GeneratedValue::Date(value) => write!(f, "{}", value.format("%Y-%m-%d")),
        }
    }
}

impl From<bool> for GeneratedValue {
    fn from(value: bool) -> Self {
        GeneratedValue::Bool(value)
    }
}

impl From<i64> for GeneratedValue {
    fn from(value: i64) -> Self {
        GeneratedValue::Int(value)
    }
}

impl From<f64> for GeneratedValue {
    fn from(value: f64) -> Self {
        GeneratedValue::Float(value)
    }
}

impl From<&str> for GeneratedValue {
    fn from(value: &str) -> Self {
        GeneratedValue::Text(value.to_string())
    }
}

impl From<String> for GeneratedValue {
    fn from(value: String) -> Self {
        GeneratedValue::Text(value)
    }
}

impl From<NaiveDate> for GeneratedValue {
    fn from(value: NaiveDate) -> Self {
        GeneratedValue::Date(value)
    }
}

/// Numeric representation requested from number synthesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericType {
    Int,
    Float,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Bounds {
    Int { min: i64, max: i64, step: i64 },
    Float { min: f64, max: f64, granularity: f64 },
}

/// Closed arithmetic progression `min, min + g, ..., <= max`.
///
/// Integer ranges keep exact `i64` bounds, so every grid point is distinct
/// across the whole `i64` domain. The number of points must fit in `usize`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumberRange {
    bounds: Bounds,
    points: usize,
}

impl NumberRange {
    pub fn new(kind: NumericType, min: f64, max: f64, granularity: f64) -> Result<Self> {
        if !(min.is_finite() && max.is_finite() && granularity.is_finite()) {
            return Err(GenerationError::InvalidArgument(format!(
                "number range bounds must be finite (min={min}, max={max}, granularity={granularity})"
            )));
        }
        match kind {
            NumericType::Int => {
                let integral = |x: f64| {
                    (x.fract() == 0.0 && x >= i64::MIN as f64 && x < i64::MAX as f64)
                        .then_some(x as i64)
                };
                match (integral(min), integral(max), integral(granularity)) {
                    (Some(min), Some(max), Some(step)) => Self::int(min, max, step),
                    _ => Err(GenerationError::InvalidArgument(format!(
                        "integer range requires integral bounds (min={min}, max={max}, granularity={granularity})"
                    ))),
                }
            }
            NumericType::Float => Self::float(min, max, granularity),
        }
    }

    pub fn int(min: i64, max: i64, granularity: i64) -> Result<Self> {
        if granularity <= 0 {
            return Err(GenerationError::InvalidArgument(format!(
                "number range granularity must be > 0, got {granularity}"
            )));
        }
        if min > max {
            return Err(GenerationError::InvalidArgument(format!(
                "number range min must be <= max (min={min}, max={max})"
            )));
        }
        let steps = (i128::from(max) - i128::from(min)) / i128::from(granularity);
        let points = usize::try_from(steps)
            .ok()
            .and_then(|steps| steps.checked_add(1))
            .ok_or_else(|| too_many_points(min as f64, max as f64, granularity as f64))?;
        Ok(Self {
            bounds: Bounds::Int {
                min,
                max,
                step: granularity,
            },
            points,
        })
    }

    pub fn float(min: f64, max: f64, granularity: f64) -> Result<Self> {
        if !(min.is_finite() && max.is_finite() && granularity.is_finite()) {
            return Err(GenerationError::InvalidArgument(format!(
                "number range bounds must be finite (min={min}, max={max}, granularity={granularity})"
            )));
        }
        if granularity <= 0.0 {
            return Err(GenerationError::InvalidArgument(format!(
                "number range granularity must be > 0, got {granularity}"
            )));
        }
        if min > max {
            return Err(GenerationError::InvalidArgument(format!(
                "number range min must be <= max (min={min}, max={max})"
            )));
        }
        let steps = ((max - min) / granularity + GRID_EPSILON).floor();
        // `usize::MAX as f64` rounds up, so `<` keeps the cast in range.
        let points = (steps.is_finite() && steps < usize::MAX as f64)
            .then_some(steps as usize)
            .and_then(|steps| steps.checked_add(1))
            .ok_or_else(|| too_many_points(min, max, granularity))?;
        Ok(Self {
            bounds: Bounds::Float {
                min,
                max,
                granularity,
            },
            points,
        })
    }

    pub fn kind(&self) -> NumericType {
        match self.bounds {
            Bounds::Int { .. } => NumericType::Int,
            Bounds::Float { .. } => NumericType::Float,
        }
    }

    pub fn min(&self) -> f64 {
        match self.bounds {
            Bounds::Int { min, .. } => min as f64,
            Bounds::Float { min, .. } => min,
        }
    }

    pub fn max(&self) -> f64 {
        match self.bounds {
            Bounds::Int { max, .. } => max as f64,
            Bounds::Float { max, .. } => max,
        }
    }

    pub fn granularity(&self) -> f64 {
        match self.bounds {
            Bounds::Int { step, .. } => step as f64,
            Bounds::Float { granularity, .. } => granularity,
        }
    }

    /// Exact `(min, max, step)` of an integer range.
    pub fn int_bounds(&self) -> Option<(i64, i64, i64)> {
        match self.bounds {
            Bounds::Int { min, max, step } => Some((min, max, step)),
            Bounds::Float { .. } => None,
        }
    }

    /// Number of grid points in the progression; always at least one.
    pub fn point_count(&self) -> usize {
        self.points
    }

    pub fn number_at(&self, index: usize) -> f64 {
        match self.bounds {
            Bounds::Int { .. } => self.int_at(index) as f64,
            Bounds::Float {
                min, granularity, ..
            } => min + index as f64 * granularity,
        }
    }

    pub fn value_at(&self, index: usize) -> GeneratedValue {
        match self.bounds {
            Bounds::Int { .. } => GeneratedValue::Int(self.int_at(index)),
            Bounds::Float { .. } => GeneratedValue::Float(self.number_at(index)),
        }
    }

    /// Snaps `x` down onto the grid, returning `None` outside `[min, max]`.
    pub fn index_of(&self, x: f64) -> Option<usize> {
        if !x.is_finite() {
            return None;
        }
        let offset = (x - self.min()) / self.granularity();
        if offset < -GRID_EPSILON {
            return None;
        }
        let index = (offset + GRID_EPSILON).floor();
        if index < self.points as f64 {
            // The float bound can round up to `points`.
            Some((index.max(0.0) as usize).min(self.points - 1))
        } else {
            None
        }
    }

    /// Grid point `index` of an integer range, clamped to `max`.
    fn int_at(&self, index: usize) -> i64 {
        let Bounds::Int { min, max, step } = self.bounds else {
            return self.number_at(index) as i64;
        };
        let index = i128::try_from(index).unwrap_or(i128::MAX);
        let value = index
            .checked_mul(i128::from(step))
            .and_then(|offset| offset.checked_add(i128::from(min)))
            .unwrap_or(i128::MAX)
            .min(i128::from(max));
        // Bounded by `max` above and `min` below.
        value as i64
    }
}

fn too_many_points(min: f64, max: f64, granularity: f64) -> GenerationError {
    GenerationError::InvalidArgument(format!(
        "number range has more grid points than fit in usize (min={min}, max={max}, granularity={granularity})"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_count_includes_both_bounds() {
        let range = NumberRange::float(1.0, 4.0, 0.5).expect("valid range");
        assert_eq!(range.point_count(), 7);
        assert_eq!(range.value_at(6), GeneratedValue::Float(4.0));

        let range = NumberRange::int(1, 10, 3).expect("valid range");
        assert_eq!(range.point_count(), 4);
        assert_eq!(range.value_at(3), GeneratedValue::Int(10));
    }

    #[test]
    fn index_of_snaps_down_and_rejects_outside() {
        let range = NumberRange::float(1.0, 4.0, 0.5).expect("valid range");
        assert_eq!(range.index_of(1.0), Some(0));
        assert_eq!(range.index_of(1.49), Some(0));
        assert_eq!(range.index_of(4.4), Some(6));
        assert_eq!(range.index_of(4.5), None);
        assert_eq!(range.index_of(0.99), None);
        assert_eq!(range.index_of(f64::NAN), None);
    }

    #[test]
    fn invalid_ranges_are_rejected() {
        assert!(matches!(
            NumberRange::float(4.0, 1.0, 0.5),
            Err(GenerationError::InvalidArgument(_))
        ));
        assert!(matches!(
            NumberRange::float(1.0, 4.0, 0.0),
            Err(GenerationError::InvalidArgument(_))
        ));
        assert!(matches!(
            NumberRange::new(NumericType::Int, 1.0, 4.5, 1.0),
            Err(GenerationError::InvalidArgument(_))
        ));
        assert!(matches!(
            NumberRange::int(3, 9, 0),
            Err(GenerationError::InvalidArgument(_))
        ));
    }

    #[test]
    fn integer_points_stay_exact_beyond_f64_precision() {
        let base = 1_i64 << 53;
        let range = NumberRange::int(base, base + 7, 1).expect("valid range");
        assert_eq!(range.point_count(), 8);
        let values: Vec<i64> = (0..8)
            .map(|index| range.value_at(index).as_i64().expect("int"))
            .collect();
        assert_eq!(values, (base..=base + 7).collect::<Vec<_>>());

        let range = NumberRange::int(i64::MAX - 4, i64::MAX, 2).expect("valid range");
        assert_eq!(range.point_count(), 3);
        assert_eq!(range.value_at(2), GeneratedValue::Int(i64::MAX));
    }

    #[test]
    fn ranges_wider_than_usize_are_rejected() {
        assert!(matches!(
            NumberRange::int(i64::MIN, i64::MAX, 1),
            Err(GenerationError::InvalidArgument(_))
        ));
        assert!(matches!(
            NumberRange::float(-1e300, 1e300, 1e-300),
            Err(GenerationError::InvalidArgument(_))
        ));

        let range = NumberRange::int(i64::MIN, i64::MAX, 2).expect("half of i64 fits");
        assert_eq!(range.point_count(), 1_usize << 63);
        assert_eq!(range.value_at(0), GeneratedValue::Int(i64::MIN));
        assert_eq!(
            range.value_at(range.point_count() - 1),
            GeneratedValue::Int(i64::MAX - 1)
        );
    }

    #[test]
    fn float_zero_keys_match() {
        assert_eq!(
            GeneratedValue::Float(0.0).key(),
            GeneratedValue::Float(-0.0).key()
        );
        assert_ne!(GeneratedValue::Int(1).key(), GeneratedValue::Float(1.0).key());
    }
}
