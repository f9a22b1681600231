//! Machine-readable results file.
//!
//! ```json
//! { "cmd": "basic", "results": { "int_add": "pass", "image_copy": "skip" } }
//! ```
//!
//! Entries keep registry order.

use std::fs;
use std::io;
use std::path::Path;

use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Serialize, Serializer};
use tracing::info;

use crate::error::HarnessError;
use crate::status::TestStatus;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultsReport<'a> {
    pub suite: &'a str,
    pub results: Vec<(&'a str, TestStatus)>,
}

struct OrderedResults<'r, 'a>(&'r [(&'a str, TestStatus)]);

impl Serialize for OrderedResults<'_, '_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, status) in self.0 {
            map.serialize_entry(name, status)?;
        }
        map.end()
    }
}

impl Serialize for ResultsReport<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut report = serializer.serialize_struct("ResultsReport", 2)?;
        report.serialize_field("cmd", self.suite)?;
        report.serialize_field("results", &OrderedResults(&self.results))?;
        report.end()
    }
}

impl<'a> ResultsReport<'a> {
    pub fn new(suite: &'a str) -> Self {
        Self { suite, results: Vec::new() }
    }

    pub fn push(&mut self, name: &'a str, status: TestStatus) {
        self.results.push((name, status));
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn write_to(&self, path: &Path) -> Result<(), HarnessError> {
        let results_error = |source: io::Error| HarnessError::Results { path: path.to_path_buf(), source };
        let json = self.to_json().map_err(|e| results_error(e.into()))?;
        fs::write(path, json + "\n").map_err(results_error)?;
        info!("saved results for {} tests to {}", self.results.len(), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_registry_order() {
        let mut report = ResultsReport::new("basic");
        report.push("zeta", TestStatus::Pass);
        report.push("alpha", TestStatus::Fail);
        report.push("mid", TestStatus::Skip);
        let json = report.to_json().unwrap();

        let zeta = json.find("\"zeta\"").unwrap();
        let alpha = json.find("\"alpha\"").unwrap();
        let mid = json.find("\"mid\"").unwrap();
        assert!(zeta < alpha && alpha < mid);

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["cmd"], "basic");
        assert_eq!(value["results"]["alpha"], "fail");
        assert_eq!(value["results"]["mid"], "skip");
    }

    #[test]
    fn writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.json");
        let mut report = ResultsReport::new("suite");
        report.push("only", TestStatus::Pass);
        report.write_to(&path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value, serde_json::json!({"cmd": "suite", "results": {"only": "pass"}}));
    }

    #[test]
    fn unwritable_path_is_a_results_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("results.json");
        let err = ResultsReport::new("suite").write_to(&path).unwrap_err();
        assert!(matches!(err, HarnessError::Results { .. }));
    }
}
