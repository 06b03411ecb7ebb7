//! Input file loading.

use serde::de::DeserializeOwned;
use std::fs;
use std::io::{self, Read};
use std::path::Path;
use thiserror::Error;

/// Error type for input loading.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("failed to read input: {0}")]
    Read(#[from] io::Error),
    #[error("failed to parse YAML: {0}")]
    ParseYaml(#[from] serde_yaml::Error),
    #[error("failed to parse JSON: {0}")]
    ParseJson(#[from] serde_json::Error),
    #[error("failed to parse input (tried JSON and YAML)")]
    ParseFailed,
}

/// Reads a whole file, or stdin when `path` is `-`.
pub fn read_text(path: &str) -> Result<String, InputError> {
    if path == "-" {
        let mut text = String::new();
        io::stdin().read_to_string(&mut text)?;
        return Ok(text);
    }
    Ok(fs::read_to_string(path)?)
}

/// Loads a YAML or JSON file (stdin for `-`) into the provided type.
pub fn load_document<T: DeserializeOwned>(path: &str) -> Result<T, InputError> {
    let data = read_text(path)?;
    parse_document(&data, path)
}

/// Parses data based on the file extension, falling back to trying JSON
/// then YAML.
pub fn parse_document<T: DeserializeOwned>(
    data: &str,
    path: impl AsRef<Path>,
) -> Result<T, InputError> {
    let ext = path
        .as_ref()
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());

    match ext.as_deref() {
        Some("yaml") | Some("yml") => Ok(serde_yaml::from_str(data)?),
        Some("json") => Ok(serde_json::from_str(data)?),
        _ => {
            if let Ok(v) = serde_json::from_str(data) {
                return Ok(v);
            }
            if let Ok(v) = serde_yaml::from_str(data) {
                return Ok(v);
            }
            Err(InputError::ParseFailed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_yaml_embeddings() {
        let mut file = NamedTempFile::with_suffix(".yaml").unwrap();
        writeln!(file, "- [0.1, 0.2, 0.3]\n- [0.11, 0.2, 0.3]").unwrap();

        let samples: Vec<Vec<f32>> = load_document(file.path().to_str().unwrap()).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[1], vec![0.11, 0.2, 0.3]);
    }

    #[test]
    fn test_load_json_embedding() {
        let mut file = NamedTempFile::with_suffix(".json").unwrap();
        writeln!(file, "[0.1, 0.2, 0.3, 0.4]").unwrap();

        let query: Vec<f32> = load_document(file.path().to_str().unwrap()).unwrap();
        assert_eq!(query.len(), 4);
    }

    #[test]
    fn test_parse_unknown_extension() {
        let query: Vec<f32> = parse_document("- 0.5\n- 0.25", "query.txt").unwrap();
        assert_eq!(query, vec![0.5, 0.25]);
    }

    #[test]
    fn test_parse_invalid() {
        let result: Result<Vec<f32>, _> = parse_document("invalid data {{{{", "query.txt");
        assert!(matches!(result, Err(InputError::ParseFailed)));
    }
}
