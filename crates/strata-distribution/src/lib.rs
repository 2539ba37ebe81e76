//! Distribution strategies and the sampling generator that applies them.
//!
//! A [`Distribution`] is a stateless strategy deciding the order or the
//! probability with which candidates are emitted. [`SamplingGenerator`]
//! composes a candidate domain (weighted samples, a source generator, a
//! dataset or a number range) with one strategy.

pub mod cumulative;
pub mod distribution;
pub mod plan;
pub mod registry;
pub mod sampling;
pub mod sequence;
pub mod table;
pub mod weighted;

pub use cumulative::{
    CumulativeDistributionFunction, ExponentialCdf, InverseFn, InverseTransform, UniformCdf,
};
pub use distribution::{Distribution, DistributionSettings, Domain, Selector};
pub use plan::{PlannedGenerator, SamplingPlan, sampling_plan_json_schema};
pub use registry::{DistributionArgs, DistributionRegistry};
pub use sampling::{DatasetSource, SamplingGenerator};
pub use sequence::{
    BitReverseOrder, ExplicitOrder, IndexCursor, OrderingPolicy, Sequence, ShuffleOrder,
    StepOrder, WedgeOrder,
};
pub use weighted::{
    ConstantFunction, ExponentialFunction, FunctionWeighting, GaussianFunction, IndividualWeight,
    IndividualWeighting, SampleWeighting, StandardWeightingFunction, WeightFunction,
};
