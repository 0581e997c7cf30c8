use crate::orchestrator::ExtractedData;
use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use std::path::Path;
use tracing::info;

pub const DEFAULT_OUTPUT_FILE: &str = "extracted_aeterna_data.json";

/// Overwrite `path` with `data` as 4-space indented JSON.
pub fn save_extracted_data(data: &ExtractedData, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();

    let mut buf = Vec::new();
    let mut ser = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    data.serialize(&mut ser)
        .context("serializing extracted data failed")?;
    buf.push(b'\n');

    std::fs::write(path, &buf)
        .with_context(|| format!("writing extracted data to {} failed", path.display()))?;

    info!(
        target: "crawl.output",
        path = %path.display(),
        urls = data.len(),
        "extracted data saved"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn writes_four_space_indent_with_trailing_newline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        let mut data = ExtractedData::new();
        data.insert("https://x/1".into(), json!({"a": 1}));

        save_extracted_data(&data, &path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "{\n    \"https://x/1\": {\n        \"a\": 1\n    }\n}\n");
    }

    #[test]
    fn empty_map_writes_empty_object() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        save_extracted_data(&ExtractedData::new(), &path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}\n");
    }

    #[test]
    fn overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        std::fs::write(&path, "stale contents that are much longer than the new ones").unwrap();
        save_extracted_data(&ExtractedData::new(), &path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}\n");
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope").join("out.json");
        let err = save_extracted_data(&ExtractedData::new(), &path).unwrap_err();
        assert!(err.to_string().contains("writing extracted data"));
    }
}
