//! Result persistence
//!
//! Combined results are written as pretty-printed JSON wrapped in a small
//! envelope:
//!
//! ```text
//! {
//!   "format_version": "1",
//!   "result": { "status": "completed", ... }
//! }
//! ```
//!
//! Loading also accepts a bare result without the envelope.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::coordinator::CombinedResult;
use crate::error::{Error, Result};

/// Envelope version written by [`save_result`]
pub const FORMAT_VERSION: &str = "1";

#[derive(Serialize)]
struct Envelope<'a> {
    format_version: &'static str,
    result: &'a CombinedResult,
}

/// Write `result` to `path`, creating parent directories
pub fn save_result(path: impl AsRef<Path>, result: &CombinedResult) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    let envelope = Envelope {
        format_version: FORMAT_VERSION,
        result,
    };
    fs::write(path, serde_json::to_string_pretty(&envelope)?)?;
    debug!(path = %path.display(), "Saved result");
    Ok(())
}

/// Read a result saved by [`save_result`], `Ok(None)` if the file is missing
pub fn load_result(path: impl AsRef<Path>) -> Result<Option<CombinedResult>> {
    let path = path.as_ref();
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(Error::Io(e)),
    };

    let mut value: Value = serde_json::from_str(&contents)?;
    let wrapped = value
        .as_object_mut()
        .and_then(|map| map.remove("result").map(|result| (map.remove("format_version"), result)));

    let result = match wrapped {
        Some((version, result)) => {
            match version {
                None | Some(Value::Null) => {}
                Some(Value::String(v)) if v == FORMAT_VERSION => {}
                Some(other) => {
                    return Err(Error::Other(format!(
                        "Unsupported result format version: {}",
                        other.as_str().map(str::to_string).unwrap_or_else(|| other.to_string())
                    )));
                }
            }
            serde_json::from_value::<CombinedResult>(result)?
        }
        None => serde_json::from_value::<CombinedResult>(value)?,
    };

    Ok(Some(result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out").join("result.json");
        let result = CombinedResult::error("Task timed out after 90 seconds");

        save_result(&path, &result).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["format_version"], "1");
        assert_eq!(raw["result"]["status"], "error");

        assert_eq!(load_result(&path).unwrap(), Some(result));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        assert_eq!(load_result(dir.path().join("nope.json")).unwrap(), None);
    }

    #[test]
    fn test_load_bare_result() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bare.json");
        fs::write(&path, r#"{"status": "error", "message": "Research phase failed"}"#).unwrap();

        let loaded = load_result(&path).unwrap().unwrap();
        assert_eq!(loaded.message(), Some("Research phase failed"));
    }

    #[test]
    fn test_load_rejects_unknown_version() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("v9.json");
        fs::write(
            &path,
            r#"{"format_version": "9", "result": {"status": "error", "message": "x"}}"#,
        )
        .unwrap();

        assert!(load_result(&path).is_err());
    }

    #[test]
    fn test_load_rejects_plan_without_research() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("plan-only.json");
        fs::write(
            &path,
            r#"{
  "format_version": "1",
  "result": {
    "status": "completed",
    "planning_phase": {
      "plan": "1. Add limiter",
      "technical_specifications": "t",
      "timeline": "1 sprint",
      "resources": "redis",
      "risks_and_mitigations": "r",
      "confidence": 0.9
    },
    "confidence_scores": {"planning": 0.9}
  }
}"#,
        )
        .unwrap();

        match load_result(&path) {
            Err(Error::Serialization(e)) => {
                assert!(e.to_string().contains("research_phase is required"))
            }
            other => panic!("expected a serialization error, got {:?}", other),
        }
    }

    #[test]
    fn test_load_invalid_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{not json").unwrap();

        assert!(matches!(load_result(&path), Err(Error::Serialization(_))));
    }
}
