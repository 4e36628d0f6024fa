//! Vehicle observation documents
//!
//! A document is a JSON object shaped like [`VehicleInput`], or an array of
//! them. `source_file` defaults to the document's file name and
//! `uploaded_at` to its modification time.

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Deserialize;
use spn_inventory::{Timestamp, VehicleInput};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Deserialize)]
#[serde(untagged)]
enum VehicleDocument {
    Many(Vec<VehicleInput>),
    One(VehicleInput),
}

/// Load every vehicle in one document
pub fn load_document(path: &Path) -> Result<Vec<VehicleInput>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read vehicle document: {:?}", path))?;
    let document: VehicleDocument = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse vehicle document: {:?}", path))?;

    let mut inputs = match document {
        VehicleDocument::Many(inputs) => inputs,
        VehicleDocument::One(input) => vec![input],
    };

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();
    let uploaded_at: Timestamp = fs::metadata(path)
        .and_then(|m| m.modified())
        .map(Timestamp::from)
        .unwrap_or_else(|_| Utc::now());

    for input in &mut inputs {
        if input.source_file.trim().is_empty() {
            input.source_file = file_name.clone();
        }
        input.uploaded_at.get_or_insert(uploaded_at);
    }

    log::debug!("Loaded {} vehicles from {:?}", inputs.len(), path);
    Ok(inputs)
}

/// Load all documents, keeping file order then in-file order
pub fn load_documents(paths: &[PathBuf]) -> Result<Vec<VehicleInput>> {
    let mut inputs = Vec::new();
    for path in paths {
        inputs.extend(load_document(path)?);
    }
    log::info!("Loaded {} vehicles from {} documents", inputs.len(), paths.len());
    Ok(inputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use spn_inventory::PgnToken;

    #[test]
    fn test_single_object_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("volvo_fh.json");
        fs::write(&path, r#"{"observations": [{"pgn": 61444}, {"pgn": "0xFEF1"}]}"#).unwrap();

        let inputs = load_document(&path).unwrap();
        assert_eq!(inputs.len(), 1);
        assert_eq!(inputs[0].source_file, "volvo_fh.json");
        assert!(inputs[0].uploaded_at.is_some());
        assert_eq!(inputs[0].observations[1].pgn, PgnToken::Text("0xFEF1".to_string()));
    }

    #[test]
    fn test_array_document_keeps_given_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("batch.json");
        fs::write(
            &path,
            r#"[
                {"name": "Truck 1", "source_file": "truck1.csv", "uploaded_at": "2024-03-01T10:00:00Z"},
                {"brand": "Scania", "observations": [{"pgn": 65265}]}
            ]"#,
        )
        .unwrap();

        let inputs = load_document(&path).unwrap();
        assert_eq!(inputs.len(), 2);
        assert_eq!(inputs[0].source_file, "truck1.csv");
        assert_eq!(
            inputs[0].uploaded_at.unwrap().to_rfc3339(),
            "2024-03-01T10:00:00+00:00"
        );
        assert_eq!(inputs[1].source_file, "batch.json");
        assert_eq!(inputs[1].brand.as_deref(), Some("Scania"));
    }

    #[test]
    fn test_documents_load_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.json");
        let b = dir.path().join("b.json");
        fs::write(&a, r#"{"name": "A"}"#).unwrap();
        fs::write(&b, r#"[{"name": "B"}, {"name": "C"}]"#).unwrap();

        let inputs = load_documents(&[a, b]).unwrap();
        let names: Vec<_> = inputs.iter().filter_map(|i| i.name.as_deref()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_odd_pgn_tokens_still_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("odd.json");
        fs::write(&path, r#"{"observations": [{"pgn": 61444}, {"pgn": 61443.0}, {"pgn": null}]}"#).unwrap();

        let inputs = load_document(&path).unwrap();
        assert_eq!(inputs[0].observations.len(), 3);
        assert_eq!(inputs[0].observations[1].pgn.as_text(), "61443.0");
    }

    #[test]
    fn test_malformed_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "not json").unwrap();
        let err = load_document(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse vehicle document"));
    }
}
