//! Conversion stage - JSON array of records to an XML document
//!
//! The document has one `<item>` per record and one child element per field,
//! named after the key, in the record's key order:
//!
//! ```text
//! <root>
//! <item>
//! <id>1</id>
//! <done>false</done>
//! </item>
//! </root>
//! ```
//!
//! Field names and values are written as-is. Reserved XML characters
//! (`<`, `&`, `"`) are NOT escaped, so a value containing them yields a
//! document that is not well-formed. Strings are written without quotes and
//! `null` as the literal text `null`. Whole-valued floats print as integers
//! (`10.0` as `10`, `-0` as `0`).
//!
//! Nested arrays and objects are written as compact JSON (`["a","b"]`,
//! `{"lat":1}`). This differs from JavaScript template-string rendering,
//! which gives `a,b` and `[object Object]` for the same values.

use crate::stage::{Chunk, Outlet, Stage, StageError};
use async_trait::async_trait;
use bytes::Bytes;
use serde_json::{Map, Number, Value};
use std::borrow::Cow;
use thiserror::Error;
use tracing::debug;

/// One parsed JSON object
pub type Record = Map<String, Value>;

/// Error types for conversion
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("Malformed input: {0}")]
    MalformedInput(String),
}

/// Parse a chunk as a JSON array of objects
pub fn parse_records(chunk: &[u8]) -> Result<Vec<Record>, ConversionError> {
    let value: Value = serde_json::from_slice(chunk)
        .map_err(|e| ConversionError::MalformedInput(format!("invalid JSON: {}", e)))?;

    let items = match value {
        Value::Array(items) => items,
        other => {
            return Err(ConversionError::MalformedInput(format!(
                "expected a JSON array, found {}",
                kind(&other)
            )))
        }
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(record) => Ok(record),
            other => Err(ConversionError::MalformedInput(format!(
                "element {} is {}, expected an object",
                index,
                kind(&other)
            ))),
        })
        .collect()
}

/// Serialize records into the XML document
pub fn records_to_xml(records: &[Record]) -> String {
    let mut xml = String::from("<root>\n");
    for record in records {
        xml.push_str("<item>\n");
        for (key, value) in record {
            xml.push_str(&format!("<{}>{}</{}>\n", key, value_text(value), key));
        }
        xml.push_str("</item>\n");
    }
    xml.push_str("</root>\n");
    xml
}

/// Convert a complete JSON chunk into an XML chunk
pub fn convert(chunk: &[u8]) -> Result<Chunk, ConversionError> {
    let records = parse_records(chunk)?;
    let xml = records_to_xml(&records);
    debug!("Converted {} record(s) into {} bytes of XML", records.len(), xml.len());
    Ok(Bytes::from(xml))
}

/// Largest integer an IEEE double holds exactly
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

fn value_text(value: &Value) -> Cow<'_, str> {
    match value {
        Value::String(s) => Cow::Borrowed(s.as_str()),
        Value::Null => Cow::Borrowed("null"),
        Value::Number(n) => Cow::Owned(number_text(n)),
        other => Cow::Owned(other.to_string()),
    }
}

fn number_text(n: &Number) -> String {
    match n.as_f64() {
        Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() <= MAX_SAFE_INTEGER => {
            // Also folds -0 into 0
            format!("{}", f as i64)
        }
        _ => n.to_string(),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Stage wrapping [`convert`]
///
/// Every chunk it receives must be a complete JSON document; the converted
/// document is forwarded as a single chunk.
#[derive(Debug, Clone, Default)]
pub struct ConvertStage;

impl ConvertStage {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Stage for ConvertStage {
    fn name(&self) -> &'static str {
        "convert"
    }

    async fn process(&mut self, chunk: Chunk, out: &Outlet) -> Result<(), StageError> {
        let xml = convert(&chunk)?;
        out.send(xml).await
    }
}
