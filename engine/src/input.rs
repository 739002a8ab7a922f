//! Input loading with encoding and format auto-detection.
//!
//! A collection can come from a JSON document or a CSV file. JSON arrays are
//! used as-is, any other JSON value becomes a one-record collection. CSV rows
//! become objects keyed by the header row, every value a string.

use std::path::Path;

use serde_json::{Map, Value};

use crate::error::{InputError, InputResult};

/// Detected input format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Json,
    Csv,
}

/// A loaded collection with the metadata found while loading it.
#[derive(Debug, Clone)]
pub struct LoadedInput {
    pub records: Vec<Value>,
    pub format: InputFormat,
    /// Detected or used encoding
    pub encoding: String,
    /// CSV delimiter (CSV only)
    pub delimiter: Option<char>,
    /// CSV column headers (CSV only)
    pub headers: Vec<String>,
}

/// Load a collection from a file.
///
/// `.json` files are parsed as JSON; anything else is sniffed from content.
pub fn load_path<P: AsRef<Path>>(path: P) -> InputResult<LoadedInput> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|source| InputError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if is_json {
        let encoding = detect_encoding(&bytes);
        let content = decode_content(&bytes, &encoding)?;
        return Ok(LoadedInput {
            records: parse_json(&content)?,
            format: InputFormat::Json,
            encoding,
            delimiter: None,
            headers: Vec::new(),
        });
    }

    load_bytes(&bytes)
}

/// Load a collection from raw bytes.
///
/// Content starting with `[` or `{` is JSON, everything else CSV.
pub fn load_bytes(bytes: &[u8]) -> InputResult<LoadedInput> {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding)?;
    let trimmed = content.trim_start_matches('\u{feff}').trim_start();

    if trimmed.is_empty() {
        return Err(InputError::Empty);
    }

    if trimmed.starts_with('[') || trimmed.starts_with('{') {
        return Ok(LoadedInput {
            records: parse_json(trimmed)?,
            format: InputFormat::Json,
            encoding,
            delimiter: None,
            headers: Vec::new(),
        });
    }

    let delimiter = detect_delimiter(trimmed);
    let (headers, records) = csv_to_json(trimmed, delimiter)?;
    Ok(LoadedInput {
        records,
        format: InputFormat::Csv,
        encoding,
        delimiter: Some(delimiter),
        headers,
    })
}

/// Parse a JSON document into a collection.
pub fn parse_json(content: &str) -> InputResult<Vec<Value>> {
    if content.trim().is_empty() {
        return Err(InputError::Empty);
    }
    match serde_json::from_str(content)? {
        Value::Array(items) => Ok(items),
        other => Ok(vec![other]),
    }
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let (charset, _confidence, _language) = chardet::detect(bytes);

    match charset.to_lowercase().as_str() {
        "" | "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        other => other.to_string(),
    }
}

/// Decode bytes with the named encoding.
pub fn decode_content(bytes: &[u8], encoding: &str) -> InputResult<String> {
    if encoding.eq_ignore_ascii_case("utf-8") {
        return Ok(String::from_utf8_lossy(bytes).into_owned());
    }

    let codec = encoding_rs::Encoding::for_label(encoding.as_bytes())
        .ok_or_else(|| InputError::Encoding(encoding.to_string()))?;
    let (decoded, _, had_errors) = codec.decode(bytes);
    if had_errors {
        tracing::warn!(encoding = %encoding, "input contained undecodable bytes");
    }
    Ok(decoded.into_owned())
}

/// Detect the delimiter by counting occurrences in the first line
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let mut best = (';', 0);
    for sep in [';', ',', '\t', '|'] {
        let count = first_line.matches(sep).count();
        if count > best.1 {
            best = (sep, count);
        }
    }
    best.0
}

/// Parse CSV content into JSON objects keyed by the header row.
///
/// # Example
/// ```ignore
/// let (headers, rows) = csv_to_json("name;age\nAlice;30", ';')?;
/// assert_eq!(headers, vec!["name", "age"]);
/// assert_eq!(rows[0]["age"], "30");
/// ```
pub fn csv_to_json(content: &str, delimiter: char) -> InputResult<(Vec<String>, Vec<Value>)> {
    let delimiter = u8::try_from(delimiter)
        .map_err(|_| InputError::Csv {
            line: 1,
            message: format!("delimiter '{}' is not a single byte", delimiter),
        })?;

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    if headers.iter().all(String::is_empty) {
        return Err(InputError::Empty);
    }

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        if row.iter().all(str::is_empty) {
            continue;
        }

        let record: Map<String, Value> = headers
            .iter()
            .enumerate()
            .map(|(i, header)| {
                let value = row.get(i).unwrap_or("");
                (header.clone(), Value::String(value.to_string()))
            })
            .collect();
        records.push(Value::Object(record));
    }

    Ok((headers, records))
}
