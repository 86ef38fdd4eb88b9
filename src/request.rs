//! Evaluation request envelope
//!
//! The CLI accepts either a bare dataset or an envelope carrying the test
//! family and alpha alongside it:
//!
//! ```json
//! {"test": "t_test", "alpha": 0.05, "data": [[1, 2, 3], [4, 5, 6]]}
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EvaluationRequest {
    #[serde(default)]
    pub test: Option<String>,
    #[serde(default)]
    pub alpha: Option<f64>,
    pub data: Value,
}

impl EvaluationRequest {
    /// An object with a `data` key is an envelope; anything else is the dataset
    pub fn from_value(value: Value) -> Result<Self> {
        let is_envelope = value
            .as_object()
            .is_some_and(|map| map.contains_key("data"));
        if is_envelope {
            serde_json::from_value(value).context("Invalid request envelope")
        } else {
            Ok(Self {
                test: None,
                alpha: None,
                data: value,
            })
        }
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(content).context("Input is not valid JSON")?;
        Self::from_value(value)
    }

    /// Read from a file, or from stdin when `path` is `None` or `-`
    pub fn read(path: Option<&Path>) -> Result<Self> {
        let content = match path {
            Some(p) if p != Path::new("-") => std::fs::read_to_string(p)
                .with_context(|| format!("Failed to read input file {}", p.display()))?,
            _ => {
                let mut buf = String::new();
                std::io::stdin()
                    .read_to_string(&mut buf)
                    .context("Failed to read input from stdin")?;
                buf
            }
        };
        Self::from_json_str(&content)
    }
}
