use strata_core::{GenerationError, Result};

/// Character encodings accepted for sample files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Encoding {
    #[default]
    Utf8,
    Latin1,
}

impl Encoding {
    pub fn from_name(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Ok(Encoding::Utf8),
            "iso-8859-1" | "iso8859-1" | "latin1" | "latin-1" => Ok(Encoding::Latin1),
            other => Err(GenerationError::configuration(
                format!("encoding '{name}'"),
                format!("unsupported encoding '{other}'"),
            )),
        }
    }

    pub fn decode(&self, bytes: &[u8], resource: &str) -> Result<String> {
        match self {
            Encoding::Utf8 => {
                let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
                String::from_utf8(bytes.to_vec()).map_err(|err| {
                    GenerationError::configuration(resource, format!("invalid UTF-8: {err}"))
                })
            }
            Encoding::Latin1 => Ok(bytes.iter().map(|byte| char::from(*byte)).collect()),
        }
    }
}
