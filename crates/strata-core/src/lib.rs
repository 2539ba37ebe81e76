//! Core contracts for the Strata sampling engine.
//!
//! This crate defines the weighted sample model, the dynamically typed value
//! flowing through distributions, and the generator lifecycle shared by every
//! dataset and distribution generator.

pub mod context;
pub mod error;
pub mod lifecycle;
pub mod sample;
pub mod sources;
pub mod value;

pub use context::{GenerationContext, hash_seed};
pub use error::{GenerationError, Result};
pub use lifecycle::{BoxedGenerator, Generator, GeneratorState, Lifecycle, SynchronizedGenerator};
pub use sample::{DEFAULT_WEIGHT, WeightedSample, total_weight};
pub use sources::{IterGenerator, NumberSequence};
pub use value::{GeneratedValue, NumberRange, NumericType, ValueKey};
