use std::collections::BTreeMap;
use std::sync::Arc;

use strata_core::{
    BoxedGenerator, GeneratedValue, GenerationContext, GenerationError, Generator, IterGenerator,
    NumberRange, WeightedSample,
};
use strata_distribution::{
    Distribution, FunctionWeighting, GaussianFunction, IndividualWeighting, SamplingGenerator,
    StandardWeightingFunction,
};

fn source(values: Vec<GeneratedValue>) -> BoxedGenerator<GeneratedValue> {
    Box::new(IterGenerator::new("candidates", values))
}

fn texts(values: &[&str]) -> Vec<GeneratedValue> {
    values.iter().map(|value| GeneratedValue::from(*value)).collect()
}

fn tally(generator: &mut dyn Generator<GeneratedValue>, draws: usize) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for _ in 0..draws {
        let value = generator
            .generate()
            .expect("generate")
            .expect("weighted draws never end");
        *counts.entry(value.to_string()).or_insert(0) += 1;
    }
    counts
}

#[test]
fn positional_weights_set_long_run_frequencies() {
    let weights = StandardWeightingFunction::new(vec![50.0, 30.0, 20.0]).expect("weights");
    let mut generator = weights
        .apply_to(source(texts(&["a", "b", "c"])), false)
        .expect("apply");
    generator
        .init(&GenerationContext::new().with_seed(42))
        .expect("init");

    let counts = tally(&mut *generator, 10_000);
    let (a, b, c) = (counts["a"], counts["b"], counts["c"]);
    assert!(a > b && b > c, "counts {counts:?}");
    assert!(a.abs_diff(5_000) <= 500, "a = {a}");
    assert!(b.abs_diff(3_000) <= 500, "b = {b}");
    assert!(c.abs_diff(2_000) <= 500, "c = {c}");
}

#[test]
fn weighting_strategies_reject_unique_eagerly() {
    let weights = StandardWeightingFunction::new(vec![1.0, 1.0]).expect("weights");
    let result = weights.apply_to(source(texts(&["a", "b"])), true);
    assert!(matches!(result, Err(GenerationError::InvalidArgument(_))));

    let gaussian = FunctionWeighting::new(
        "gaussian",
        GaussianFunction::new(0.0, 1.0).expect("gaussian"),
    );
    let range = NumberRange::int(-3, 3, 1).expect("range");
    let result = gaussian.create_number_generator(range, true);
    assert!(matches!(result, Err(GenerationError::InvalidArgument(_))));
}

#[test]
fn weight_count_must_match_candidates() {
    let weights = StandardWeightingFunction::new(vec![1.0, 2.0]).expect("weights");
    let mut generator = weights
        .apply_to(source(texts(&["a", "b", "c"])), false)
        .expect("apply");
    generator.init(&GenerationContext::new()).expect("init");
    assert!(matches!(
        generator.generate(),
        Err(GenerationError::InvalidArgument(_))
    ));
}

#[test]
fn known_candidates_are_checked_at_construction() {
    let weights: Arc<dyn Distribution> =
        Arc::new(StandardWeightingFunction::new(vec![1.0, 2.0]).expect("weights"));
    let samples = weighted(&[("a", 1.0), ("b", 1.0), ("c", 1.0)]);
    assert!(matches!(
        SamplingGenerator::from_samples("letters", samples, Some(Arc::clone(&weights)), false),
        Err(GenerationError::InvalidArgument(_))
    ));

    let range = NumberRange::int(1, 3, 1).expect("range");
    assert!(matches!(
        weights.create_number_generator(range, false),
        Err(GenerationError::InvalidArgument(_))
    ));

    let gaussian: Arc<dyn Distribution> = Arc::new(FunctionWeighting::new(
        "gaussian",
        GaussianFunction::new(0.0, 1.0).expect("gaussian"),
    ));
    let samples = weighted(&[("north", 1.0), ("south", 1.0)]);
    assert!(matches!(
        SamplingGenerator::from_samples("regions", samples, Some(gaussian), false),
        Err(GenerationError::InvalidArgument(_))
    ));
}

#[test]
fn individual_weights_follow_value() {
    let weighting = IndividualWeighting::from_fn("identity", |value: &GeneratedValue| {
        value.as_f64().unwrap_or(0.0)
    });
    let values = vec![
        GeneratedValue::Int(1),
        GeneratedValue::Int(2),
        GeneratedValue::Int(3),
    ];
    let mut generator = weighting.apply_to(source(values), false).expect("apply");
    generator
        .init(&GenerationContext::new().with_seed(9))
        .expect("init");

    let counts = tally(&mut *generator, 12_000);
    assert!(counts["1"].abs_diff(2_000) <= 300, "counts {counts:?}");
    assert!(counts["2"].abs_diff(4_000) <= 300, "counts {counts:?}");
    assert!(counts["3"].abs_diff(6_000) <= 300, "counts {counts:?}");
}

#[test]
fn individual_weights_cannot_synthesize_numbers() {
    let weighting = IndividualWeighting::from_fn("identity", |_: &GeneratedValue| 1.0);
    let range = NumberRange::int(1, 3, 1).expect("range");
    assert!(matches!(
        weighting.create_number_generator(range, false),
        Err(GenerationError::Unsupported(_))
    ));
}

#[test]
fn gaussian_numbers_cluster_around_mean() {
    let gaussian = FunctionWeighting::new(
        "gaussian",
        GaussianFunction::new(5.0, 1.0).expect("gaussian"),
    );
    let range = NumberRange::int(0, 10, 1).expect("range");
    let mut generator = gaussian
        .create_number_generator(range, false)
        .expect("number generator");
    generator.init(&GenerationContext::new()).expect("init");

    let counts = tally(&mut *generator, 5_000);
    let peak = counts
        .iter()
        .max_by_key(|(_, count)| **count)
        .map(|(value, _)| value.clone());
    assert_eq!(peak.as_deref(), Some("5"));
    assert!(counts.get("0").copied().unwrap_or(0) < 10);
    assert!(counts.get("10").copied().unwrap_or(0) < 10);
}

fn weighted(values: &[(&str, f64)]) -> Vec<WeightedSample<GeneratedValue>> {
    values
        .iter()
        .map(|(value, weight)| WeightedSample::new(GeneratedValue::from(*value), *weight))
        .collect()
}

#[test]
fn intrinsic_weights_drive_default_sampling() {
    let samples = weighted(&[("common", 3.0), ("rare", 1.0), ("never", 0.0)]);
    let mut generator =
        SamplingGenerator::from_samples("words", samples, None, false).expect("generator");
    generator
        .init(&GenerationContext::new().with_seed(5))
        .expect("init");

    let counts = tally(&mut generator, 8_000);
    assert!(counts["common"].abs_diff(6_000) <= 300, "counts {counts:?}");
    assert!(!counts.contains_key("never"));
}

#[test]
fn intrinsic_weights_without_replacement_emit_each_once() {
    let samples = weighted(&[("a", 5.0), ("b", 1.0), ("c", 2.0), ("d", 0.0)]);
    let mut generator =
        SamplingGenerator::from_samples("letters", samples, None, true).expect("generator");
    generator.init(&GenerationContext::new()).expect("init");

    let mut emitted = Vec::new();
    while let Some(value) = generator.generate().expect("generate") {
        emitted.push(value.to_string());
    }
    emitted.sort();
    assert_eq!(emitted, vec!["a", "b", "c"]);
}

#[test]
fn duplicate_samples_merge_weights_under_unique() {
    let samples = weighted(&[("a", 1.0), ("b", 1.0), ("a", 2.0)]);
    let generator =
        SamplingGenerator::from_samples("letters", samples, None, true).expect("generator");
    let merged = generator.samples().expect("samples");
    assert_eq!(merged.len(), 2);
    assert_eq!(merged[0].weight, 3.0);
}

#[test]
fn zero_total_weight_is_end_of_data() {
    let samples = weighted(&[("a", 0.0), ("b", 0.0)]);
    let mut generator =
        SamplingGenerator::from_samples("empty", samples, None, false).expect("generator");
    generator.init(&GenerationContext::new()).expect("init");
    assert_eq!(generator.generate().expect("generate"), None);
}

#[test]
fn reset_replays_the_same_draws() {
    let weights: Arc<dyn Distribution> =
        Arc::new(StandardWeightingFunction::new(vec![1.0, 1.0, 1.0]).expect("weights"));
    let samples = weighted(&[("x", 1.0), ("y", 1.0), ("z", 1.0)]);
    let mut generator =
        SamplingGenerator::from_samples("xyz", samples, Some(weights), false).expect("generator");
    generator
        .init(&GenerationContext::new().with_seed(77))
        .expect("init");

    let first: Vec<GeneratedValue> = (0..20)
        .filter_map(|_| generator.generate().expect("generate"))
        .collect();
    generator.reset().expect("reset");
    let second: Vec<GeneratedValue> = (0..20)
        .filter_map(|_| generator.generate().expect("generate"))
        .collect();
    assert_eq!(first, second);
}
