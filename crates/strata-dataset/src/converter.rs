use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use strata_core::GeneratedValue;

/// Turns the value token of a sample line into a typed value.
pub trait Converter<T>: Send + Sync {
    fn convert(&self, text: &str) -> Result<T, String>;
}

impl<T, F> Converter<T> for F
where
    F: Fn(&str) -> Result<T, String> + Send + Sync,
{
    fn convert(&self, text: &str) -> Result<T, String> {
        self(text)
    }
}

/// Built-in conversions into [`GeneratedValue`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    #[default]
    Text,
    Int,
    Float,
    Bool,
    Date,
}

impl ValueType {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "text" | "string" => Some(ValueType::Text),
            "int" | "integer" | "long" => Some(ValueType::Int),
            "float" | "double" | "decimal" => Some(ValueType::Float),
            "bool" | "boolean" => Some(ValueType::Bool),
            "date" => Some(ValueType::Date),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ValueType::Text => "text",
            ValueType::Int => "int",
            ValueType::Float => "float",
            ValueType::Bool => "bool",
            ValueType::Date => "date",
        }
    }
}

impl Converter<GeneratedValue> for ValueType {
    fn convert(&self, text: &str) -> Result<GeneratedValue, String> {
        match self {
            ValueType::Text => Ok(GeneratedValue::Text(text.to_string())),
            ValueType::Int => text
                .parse::<i64>()
                .map(GeneratedValue::Int)
                .map_err(|err| format!("invalid integer '{text}': {err}")),
            ValueType::Float => text
                .parse::<f64>()
                .map(GeneratedValue::Float)
                .map_err(|err| format!("invalid decimal '{text}': {err}")),
            ValueType::Bool => match text.to_ascii_lowercase().as_str() {
                "true" => Ok(GeneratedValue::Bool(true)),
                "false" => Ok(GeneratedValue::Bool(false)),
                _ => Err(format!("invalid boolean '{text}'")),
            },
            ValueType::Date => NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .map(GeneratedValue::Date)
                .map_err(|err| format!("invalid date '{text}': {err}")),
        }
    }
}
