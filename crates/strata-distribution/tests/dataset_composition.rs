use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use strata_core::{
    GeneratedValue, GenerationContext, GenerationError, Generator, GeneratorState, NumberRange,
    SynchronizedGenerator,
};
use strata_dataset::{
    DatasetHierarchy, DatasetRequest, DatasetResolver, FilenamePattern, SampleLoader, ValueType,
};
use strata_distribution::{DatasetSource, SamplingGenerator, Sequence, StandardWeightingFunction};

fn temp_data_dir(label: &str) -> PathBuf {
    let mut dir = std::env::temp_dir();
    dir.push(format!("strata_distribution_{label}_{}", uuid::Uuid::new_v4()));
    fs::create_dir_all(&dir).expect("create temp data dir");
    dir
}

fn write_cities(dir: &Path) {
    fs::write(
        dir.join("city_north_america.csv"),
        "New York\nSan Francisco\nMexico\nVillahermosa\n",
    )
    .expect("write north america");
    fs::write(dir.join("city_south_america.csv"), "Sao Paolo\nBrasilia\n")
        .expect("write south america");
}

fn america_source(dataset: &str) -> DatasetSource {
    let hierarchy = DatasetHierarchy::builder()
        .composite("america", ["north_america", "south_america"])
        .build()
        .expect("hierarchy");
    let request = DatasetRequest::new(
        dataset,
        FilenamePattern::parse("city_{0}.csv").expect("pattern"),
    );
    DatasetSource::new(
        request,
        DatasetResolver::new(Arc::new(hierarchy)),
        ValueType::Text,
    )
}

fn collect(generator: &mut SamplingGenerator) -> Vec<String> {
    let mut values = Vec::new();
    while let Some(value) = generator.generate().expect("generate") {
        values.push(value.to_string());
    }
    values
}

#[test]
fn composite_sequence_emits_union_of_leaves_once() {
    let dir = temp_data_dir("union");
    write_cities(&dir);
    let source = america_source("america").with_loader(Arc::new(SampleLoader::new(&dir)));
    let mut generator =
        SamplingGenerator::from_dataset(source, Some(Arc::new(Sequence::shuffle())), true)
            .expect("generator");
    generator.init(&GenerationContext::new()).expect("init");

    let values = collect(&mut generator);
    assert_eq!(values.len(), 6);
    let union: BTreeSet<&str> = values.iter().map(String::as_str).collect();
    assert_eq!(
        union,
        BTreeSet::from([
            "New York",
            "San Francisco",
            "Mexico",
            "Villahermosa",
            "Sao Paolo",
            "Brasilia"
        ])
    );
}

#[test]
fn loader_is_taken_from_context_resources() {
    let dir = temp_data_dir("context_loader");
    write_cities(&dir);
    let mut generator = SamplingGenerator::from_dataset(
        america_source("south_america"),
        Some(Arc::new(Sequence::ascending())),
        true,
    )
    .expect("generator");
    let ctx = GenerationContext::new()
        .with_resource(SampleLoader::RESOURCE_KEY, Arc::new(SampleLoader::new(&dir)));
    generator.init(&ctx).expect("init");
    assert_eq!(collect(&mut generator), vec!["Sao Paolo", "Brasilia"]);
}

#[test]
fn missing_loader_fails_init() {
    let mut generator =
        SamplingGenerator::from_dataset(america_source("america"), None, false).expect("generator");
    let err = generator
        .init(&GenerationContext::new())
        .expect_err("no loader");
    assert_eq!(err.resource(), Some("dataset 'america'"));
    assert_eq!(generator.state(), GeneratorState::Uninitialized);
}

#[test]
fn malformed_dataset_fails_fast_at_init() {
    let dir = temp_data_dir("malformed");
    fs::write(dir.join("city_north_america.csv"), "Boston,often\n").expect("write");
    let source = america_source("north_america").with_loader(Arc::new(SampleLoader::new(&dir)));
    let mut generator = SamplingGenerator::from_dataset(source, None, false).expect("generator");

    let err = generator
        .init(&GenerationContext::new())
        .expect_err("malformed weight");
    assert!(matches!(err, GenerationError::Configuration { .. }));
    let resource = err.resource().expect("resource").to_string();
    assert!(resource.ends_with("city_north_america.csv:1"), "{resource}");
}

#[test]
fn positional_weights_are_checked_when_dataset_loads() {
    let dir = temp_data_dir("weight_count");
    write_cities(&dir);
    let source = america_source("south_america").with_loader(Arc::new(SampleLoader::new(&dir)));
    let weights = StandardWeightingFunction::new(vec![1.0, 2.0, 3.0]).expect("weights");
    let mut generator =
        SamplingGenerator::from_dataset(source, Some(Arc::new(weights)), false).expect("generator");

    assert!(matches!(
        generator.init(&GenerationContext::new()),
        Err(GenerationError::InvalidArgument(_))
    ));
    assert_eq!(generator.state(), GeneratorState::Uninitialized);
}

#[test]
fn file_weights_decide_without_distribution() {
    let dir = temp_data_dir("file_weights");
    fs::write(dir.join("city_south_america.csv"), "Lima,0\nQuito,1\n").expect("write");
    let source = america_source("south_america").with_loader(Arc::new(SampleLoader::new(&dir)));
    let mut generator = SamplingGenerator::from_dataset(source, None, false).expect("generator");
    generator.init(&GenerationContext::new()).expect("init");

    for _ in 0..50 {
        let value = generator.generate().expect("generate").expect("value");
        assert_eq!(value, GeneratedValue::from("Quito"));
    }
}

#[test]
fn lifecycle_is_enforced() {
    let dir = temp_data_dir("lifecycle");
    write_cities(&dir);
    let source = america_source("america").with_loader(Arc::new(SampleLoader::new(&dir)));
    let mut generator = SamplingGenerator::from_dataset(source, None, false).expect("generator");

    assert!(matches!(
        generator.generate(),
        Err(GenerationError::IllegalState(_))
    ));
    generator.init(&GenerationContext::new()).expect("init");
    assert!(matches!(
        generator.init(&GenerationContext::new()),
        Err(GenerationError::IllegalState(_))
    ));
    assert!(generator.generate().expect("generate").is_some());

    generator.close().expect("close");
    generator.close().expect("close is idempotent");
    assert_eq!(generator.state(), GeneratorState::Closed);
    assert!(matches!(
        generator.generate(),
        Err(GenerationError::IllegalState(_))
    ));
}

#[test]
fn synchronized_generator_hands_out_each_value_once() {
    let range = NumberRange::int(1, 400, 1).expect("range");
    let mut generator =
        SamplingGenerator::from_range(range, Arc::new(Sequence::bit_reverse()), true)
            .expect("generator");
    generator.init(&GenerationContext::new()).expect("init");
    let shared = SynchronizedGenerator::new(generator);
    assert!(Generator::<GeneratedValue>::is_thread_safe(&shared));

    let collected: Vec<i64> = thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                scope.spawn(|| {
                    let mut local = Vec::new();
                    while let Some(value) = shared
                        .generate_shared::<GeneratedValue>()
                        .expect("generate")
                    {
                        local.push(value.as_i64().expect("int"));
                    }
                    local
                })
            })
            .collect();
        handles
            .into_iter()
            .flat_map(|handle| handle.join().expect("worker"))
            .collect()
    });

    let distinct: BTreeSet<i64> = collected.iter().copied().collect();
    assert_eq!(collected.len(), 400);
    assert_eq!(distinct, (1..=400).collect());
}
