use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use strata_core::{GeneratedValue, GenerationError};
use strata_dataset::{
    DatasetHierarchy, DatasetRequest, DatasetResolver, Encoding, FilenamePattern, SampleLoader,
    ValueType,
};

fn temp_data_dir(label: &str) -> PathBuf {
    let mut dir = std::env::temp_dir();
    dir.push(format!("strata_dataset_{label}_{}", uuid::Uuid::new_v4()));
    fs::create_dir_all(&dir).expect("create temp data dir");
    dir
}

fn write(dir: &Path, name: &str, contents: &str) {
    fs::write(dir.join(name), contents).expect("write sample file");
}

fn regions() -> DatasetResolver {
    let hierarchy = DatasetHierarchy::builder()
        .composite("america", ["north_america", "south_america"])
        .build()
        .expect("hierarchy");
    DatasetResolver::new(Arc::new(hierarchy))
}

fn texts(samples: &[strata_core::WeightedSample<GeneratedValue>]) -> Vec<String> {
    samples.iter().map(|sample| sample.value.to_string()).collect()
}

#[test]
fn parse_file_yields_one_sample_per_non_blank_line() {
    let dir = temp_data_dir("parse_file");
    write(
        &dir,
        "fruits.csv",
        "Apple,5\n\nBanana\nCherry,0.5\n   \nApple,2\n",
    );
    let loader = SampleLoader::new(&dir);

    let samples = loader
        .parse_file(Path::new("fruits.csv"), b',', Encoding::Utf8, &ValueType::Text)
        .expect("parse fruits");

    assert_eq!(samples.len(), 4);
    assert_eq!(texts(&samples), vec!["Apple", "Banana", "Cherry", "Apple"]);
    let weights: Vec<f64> = samples.iter().map(|sample| sample.weight).collect();
    assert_eq!(weights, vec![5.0, 1.0, 0.5, 2.0]);
    assert!(samples.iter().all(|sample| sample.weight > 0.0));
}

#[test]
fn malformed_weight_names_file_and_line() {
    let dir = temp_data_dir("malformed");
    write(&dir, "fruits.csv", "Apple,5\nBanana,heavy\n");
    let loader = SampleLoader::new(&dir);

    let err = loader
        .parse_file(Path::new("fruits.csv"), b',', Encoding::Utf8, &ValueType::Text)
        .expect_err("malformed weight");

    let resource = err.resource().expect("resource attached").to_string();
    assert!(resource.ends_with("fruits.csv:2"), "resource was {resource}");
    assert!(matches!(err, GenerationError::Configuration { .. }));
}

#[test]
fn converter_failure_is_configuration_error() {
    let dir = temp_data_dir("converter");
    write(&dir, "ages.csv", "31\nthirty\n");
    let loader = SampleLoader::new(&dir);

    let result = loader.parse_file(Path::new("ages.csv"), b',', Encoding::Utf8, &ValueType::Int);
    assert!(matches!(result, Err(GenerationError::Configuration { .. })));
}

#[test]
fn custom_separator_and_latin1_encoding() {
    let dir = temp_data_dir("latin1");
    fs::write(dir.join("cities.csv"), b"S\xE3o Paulo;3\nBras\xEDlia;1\n").expect("write latin1");
    let loader = SampleLoader::new(&dir);

    let samples = loader
        .parse_file(
            Path::new("cities.csv"),
            b';',
            Encoding::Latin1,
            &ValueType::Text,
        )
        .expect("parse latin1");
    assert_eq!(texts(&samples), vec!["São Paulo", "Brasília"]);
    assert_eq!(samples[0].weight, 3.0);
}

#[test]
fn missing_explicit_file_is_configuration_error() {
    let dir = temp_data_dir("missing");
    let loader = SampleLoader::new(&dir);
    let result = loader.parse_file(
        Path::new("nothing.csv"),
        b',',
        Encoding::Utf8,
        &ValueType::Text,
    );
    assert!(matches!(result, Err(GenerationError::Configuration { .. })));
}

#[test]
fn composite_dataset_concatenates_leaf_files() {
    let dir = temp_data_dir("composite");
    write(&dir, "city_north_america.csv", "New York\nSan Francisco\nMexico\nVillahermosa\n");
    write(&dir, "city_south_america.csv", "Sao Paolo\nBrasilia\n");
    let loader = SampleLoader::new(&dir);
    let request = DatasetRequest::new(
        "america",
        FilenamePattern::parse("city_{0}.csv").expect("pattern"),
    )
    .with_fallback(false);

    let samples = loader
        .parse_dataset_files(&request, &regions(), &ValueType::Text)
        .expect("load america");

    assert_eq!(
        texts(&samples),
        vec![
            "New York",
            "San Francisco",
            "Mexico",
            "Villahermosa",
            "Sao Paolo",
            "Brasilia"
        ]
    );
}

#[test]
fn missing_leaf_without_fallback_contributes_nothing() {
    let dir = temp_data_dir("sparse");
    write(&dir, "city_north_america.csv", "New York\n");
    write(&dir, "city_america.csv", "Panama\n");
    let loader = SampleLoader::new(&dir);
    let request = DatasetRequest::new(
        "america",
        FilenamePattern::parse("city_{0}.csv").expect("pattern"),
    )
    .with_fallback(false);

    let samples = loader
        .parse_dataset_files(&request, &regions(), &ValueType::Text)
        .expect("load sparse america");
    assert_eq!(texts(&samples), vec!["New York"]);
}

#[test]
fn fallback_substitutes_parent_file_once() {
    let dir = temp_data_dir("fallback");
    write(&dir, "city_america.csv", "Panama\n");
    let loader = SampleLoader::new(&dir);
    let request = DatasetRequest::new(
        "america",
        FilenamePattern::parse("city_{0}.csv").expect("pattern"),
    )
    .with_fallback(true);

    let samples = loader
        .parse_dataset_files(&request, &regions(), &ValueType::Text)
        .expect("load with fallback");
    assert_eq!(texts(&samples), vec!["Panama"]);
}

#[test]
fn required_dataset_without_any_file_fails() {
    let dir = temp_data_dir("required");
    let loader = SampleLoader::new(&dir);
    let pattern = FilenamePattern::parse("city_{0}.csv").expect("pattern");

    let optional = DatasetRequest::new("south_america", pattern.clone()).with_fallback(false);
    let samples = loader
        .parse_dataset_files(&optional, &regions(), &ValueType::Text)
        .expect("optional dataset");
    assert!(samples.is_empty());

    let required = DatasetRequest::new("south_america", pattern)
        .with_fallback(false)
        .required(true);
    let err = loader
        .parse_dataset_files(&required, &regions(), &ValueType::Text)
        .expect_err("required dataset");
    assert_eq!(err.resource(), Some("dataset 'south_america'"));
}

#[test]
fn loader_serves_cached_rows_after_file_changes() {
    let dir = temp_data_dir("cache");
    write(&dir, "colors.csv", "red\n");
    let loader = SampleLoader::new(&dir);
    let first = loader
        .parse_file(Path::new("colors.csv"), b',', Encoding::Utf8, &ValueType::Text)
        .expect("first load");

    write(&dir, "colors.csv", "blue\ngreen\n");
    let second = loader
        .parse_file(Path::new("colors.csv"), b',', Encoding::Utf8, &ValueType::Text)
        .expect("second load");

    assert_eq!(texts(&first), texts(&second));
}
