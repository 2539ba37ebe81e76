use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use tracing::{debug, info};

use strata_core::{DEFAULT_WEIGHT, GenerationError, Result, WeightedSample};

use crate::converter::Converter;
use crate::encoding::Encoding;
use crate::resolver::{DatasetResolver, FilenamePattern};

/// Token row of a sample file, before value conversion.
#[derive(Debug, Clone)]
struct RawSample {
    line: u64,
    value: String,
    weight: f64,
}

#[derive(Debug, Clone)]
enum CachedFile {
    Rows(Arc<Vec<RawSample>>),
    Missing,
}

type CacheKey = (PathBuf, u8, Encoding);

/// A request for the samples behind a logical dataset id.
#[derive(Debug, Clone)]
pub struct DatasetRequest {
    pub dataset: String,
    pub pattern: FilenamePattern,
    pub separator: u8,
    pub encoding: Encoding,
    /// Substitute ancestor files for missing leaf files.
    pub fallback: bool,
    /// Fail when no file at all backs the dataset.
    pub required: bool,
}

impl DatasetRequest {
    pub fn new(dataset: impl Into<String>, pattern: FilenamePattern) -> Self {
        Self {
            dataset: dataset.into(),
            pattern,
            separator: b',',
            encoding: Encoding::Utf8,
            fallback: true,
            required: false,
        }
    }

    pub fn with_separator(mut self, separator: u8) -> Self {
        self.separator = separator;
        self
    }

    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_fallback(mut self, fallback: bool) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }
}

/// Parses weighted sample files below a root directory, caching token rows.
#[derive(Debug)]
pub struct SampleLoader {
    root: PathBuf,
    cache: RwLock<BTreeMap<CacheKey, CachedFile>>,
}

impl SampleLoader {
    /// Key under which generators look up a shared loader in their context.
    pub const RESOURCE_KEY: &'static str = "strata.sample_loader";

    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cache: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Parse one sample file. A missing file is a configuration error.
    pub fn parse_file<T, C>(
        &self,
        uri: &Path,
        separator: u8,
        encoding: Encoding,
        converter: &C,
    ) -> Result<Vec<WeightedSample<T>>>
    where
        C: Converter<T> + ?Sized,
    {
        let path = self.root.join(uri);
        match self.rows(&path, separator, encoding)? {
            Some(rows) => convert_rows(&path, &rows, converter),
            None => Err(GenerationError::configuration(
                path.display().to_string(),
                "sample file not found",
            )),
        }
    }

    /// Load and concatenate every file backing `request.dataset`.
    ///
    /// Each leaf takes its first existing candidate file. Leaves without any
    /// file contribute nothing unless the request is marked required and no
    /// leaf resolved at all.
    pub fn parse_dataset_files<T, C>(
        &self,
        request: &DatasetRequest,
        resolver: &DatasetResolver,
        converter: &C,
    ) -> Result<Vec<WeightedSample<T>>>
    where
        C: Converter<T> + ?Sized,
    {
        let leaves = resolver.resolve(&request.dataset, &request.pattern, request.fallback);
        let mut samples = Vec::new();
        let mut loaded_paths = BTreeSet::new();
        let mut resolved_leaves = 0_usize;

        for leaf in &leaves {
            let mut found = false;
            for candidate in &leaf.candidates {
                let path = self.root.join(candidate);
                let Some(rows) = self.rows(&path, request.separator, request.encoding)? else {
                    continue;
                };
                found = true;
                if loaded_paths.insert(path.clone()) {
                    samples.extend(convert_rows(&path, &rows, converter)?);
                    debug!(
                        dataset = %request.dataset,
                        leaf = %leaf.leaf,
                        file = %path.display(),
                        rows = rows.len(),
                        "dataset file loaded"
                    );
                }
                break;
            }
            if found {
                resolved_leaves += 1;
            } else {
                debug!(
                    dataset = %request.dataset,
                    leaf = %leaf.leaf,
                    "no file for dataset leaf"
                );
            }
        }

        if resolved_leaves == 0 && request.required {
            return Err(GenerationError::configuration(
                format!("dataset '{}'", request.dataset),
                format!(
                    "no data file found for mandatory dataset (pattern '{}', fallback {})",
                    request.pattern, request.fallback
                ),
            ));
        }

        info!(
            dataset = %request.dataset,
            leaves = leaves.len(),
            resolved_leaves,
            samples = samples.len(),
            "dataset loaded"
        );
        Ok(samples)
    }

    fn rows(
        &self,
        path: &Path,
        separator: u8,
        encoding: Encoding,
    ) -> Result<Option<Arc<Vec<RawSample>>>> {
        let key = (path.to_path_buf(), separator, encoding);
        if let Some(entry) = self.cached(&key) {
            return Ok(match entry {
                CachedFile::Rows(rows) => Some(rows),
                CachedFile::Missing => None,
            });
        }

        let entry = match fs::read(path) {
            Ok(bytes) => {
                let resource = path.display().to_string();
                let text = encoding.decode(&bytes, &resource)?;
                CachedFile::Rows(Arc::new(read_rows(&text, separator, &resource)?))
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => CachedFile::Missing,
            Err(err) => return Err(GenerationError::io(path.display().to_string(), err)),
        };

        let mut cache = self
            .cache
            .write()
            .map_err(|_| GenerationError::IllegalState("sample cache poisoned".to_string()))?;
        cache.insert(key, entry.clone());

        Ok(match entry {
            CachedFile::Rows(rows) => Some(rows),
            CachedFile::Missing => None,
        })
    }

    fn cached(&self, key: &CacheKey) -> Option<CachedFile> {
        let cache = self.cache.read().ok()?;
        cache.get(key).cloned()
    }
}

fn read_rows(text: &str, separator: u8, resource: &str) -> Result<Vec<RawSample>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(separator)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|err| {
            GenerationError::configuration(resource, format!("malformed sample line: {err}"))
        })?;
        let line = record.position().map(|position| position.line()).unwrap_or(0);
        if record.iter().all(str::is_empty) {
            continue;
        }
        let value = record.get(0).unwrap_or_default().to_string();
        let weight = parse_weight(record.get(1), resource, line)?;
        rows.push(RawSample {
            line,
            value,
            weight,
        });
    }
    Ok(rows)
}

fn parse_weight(token: Option<&str>, resource: &str, line: u64) -> Result<f64> {
    let Some(token) = token.filter(|token| !token.is_empty()) else {
        return Ok(DEFAULT_WEIGHT);
    };
    match token.parse::<f64>() {
        Ok(weight) if weight.is_finite() && weight >= 0.0 => Ok(weight),
        _ => Err(GenerationError::configuration(
            format!("{resource}:{line}"),
            format!("malformed weight '{token}'"),
        )),
    }
}

fn convert_rows<T, C>(
    path: &Path,
    rows: &[RawSample],
    converter: &C,
) -> Result<Vec<WeightedSample<T>>>
where
    C: Converter<T> + ?Sized,
{
    rows.iter()
        .map(|row| {
            let value = converter.convert(&row.value).map_err(|message| {
                GenerationError::configuration(format!("{}:{}", path.display(), row.line), message)
            })?;
            Ok(WeightedSample::new(value, row.weight))
        })
        .collect()
}
