// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::errors::{ScannerError, ScannerResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VulnerabilityRecord {
    pub title: String,

    /// First version that is no longer affected
    #[serde(default)]
    pub fixed_in: Option<String>,

    #[serde(default, rename = "type")]
    pub vuln_type: Option<String>,

    #[serde(default)]
    pub references: Vec<String>,
}

impl VulnerabilityRecord {
    /// Whether an item at `version` is affected. Unknown version or no fix
    /// version means affected.
    pub fn affects(&self, version: Option<&str>) -> bool {
        match (&self.fixed_in, version) {
            (Some(fixed_in), Some(version)) => version_lower(version, fixed_in),
            _ => true,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct VulnEntry {
    #[serde(default)]
    vulnerabilities: Vec<VulnerabilityRecord>,
}

/// Static vulnerability database: component name → records.
///
/// On disk it is a JSON object keyed by component name:
/// `{"akismet": {"vulnerabilities": [{"title": "...", "fixed_in": "2.5.7"}]}}`
#[derive(Debug, Clone, Default)]
pub struct VulnDatabase {
    path: Option<PathBuf>,
    entries: BTreeMap<String, Vec<VulnerabilityRecord>>,
}

impl VulnDatabase {
    pub fn load(path: &Path) -> ScannerResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ScannerError::io(path, e))?;
        let mut db = Self::from_json(&content).map_err(|reason| ScannerError::VulnDatabase {
            path: path.to_path_buf(),
            reason,
        })?;
        db.path = Some(path.to_path_buf());
        debug!("Loaded {} vulnerable components from {:?}", db.len(), path);
        Ok(db)
    }

    /// `None` when the file does not exist
    pub fn load_optional(path: &Path) -> ScannerResult<Option<Self>> {
        if path.is_file() {
            Self::load(path).map(Some)
        } else {
            Ok(None)
        }
    }

    pub fn from_json(content: &str) -> Result<Self, String> {
        let raw: BTreeMap<String, VulnEntry> =
            serde_json::from_str(content).map_err(|e| e.to_string())?;

        Ok(Self {
            path: None,
            entries: raw
                .into_iter()
                .map(|(name, entry)| (name, entry.vulnerabilities))
                .collect(),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Component names, sorted
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn vulnerabilities_for(&self, name: &str) -> &[VulnerabilityRecord] {
        self.entries.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Dotted numeric comparison, `current < fixed`
pub fn version_lower(current: &str, fixed: &str) -> bool {
    let parse_version = |v: &str| -> Vec<u32> {
        v.split('.')
            .map(|s| {
                s.chars()
                    .take_while(|c| c.is_ascii_digit())
                    .collect::<String>()
                    .parse()
                    .unwrap_or(0)
            })
            .collect()
    };

    let current_parts = parse_version(current);
    let fixed_parts = parse_version(fixed);
    let len = current_parts.len().max(fixed_parts.len());

    for i in 0..len {
        let c = current_parts.get(i).copied().unwrap_or(0);
        let f = fixed_parts.get(i).copied().unwrap_or(0);
        if c != f {
            return c < f;
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    const DB: &str = r#"{
        "akismet": {"vulnerabilities": [
            {"title": "Akismet XSS", "fixed_in": "2.5.7", "type": "XSS", "references": ["https://example.org/1"]}
        ]},
        "revslider": {"vulnerabilities": [
            {"title": "Revslider arbitrary file download"}
        ]},
        "empty-one": {}
    }"#;

    #[test]
    fn test_version_comparison() {
        assert!(version_lower("1.0.0", "1.0.1"));
        assert!(version_lower("1.0", "1.0.1"));
        assert!(!version_lower("1.0.2", "1.0.1"));
        assert!(!version_lower("5.3.1", "5.3.1"));
        assert!(!version_lower("5.3.1.0", "5.3.1"));
        assert!(version_lower("2.5.6-beta", "2.5.7"));
    }

    #[test]
    fn test_parse_database() {
        let db = VulnDatabase::from_json(DB).unwrap();
        assert_eq!(db.len(), 3);
        assert_eq!(
            db.names().collect::<Vec<_>>(),
            vec!["akismet", "empty-one", "revslider"]
        );
        assert_eq!(db.vulnerabilities_for("akismet")[0].vuln_type.as_deref(), Some("XSS"));
        assert!(db.vulnerabilities_for("empty-one").is_empty());
        assert!(db.vulnerabilities_for("unknown").is_empty());
    }

    #[test]
    fn test_affects() {
        let db = VulnDatabase::from_json(DB).unwrap();
        let record = &db.vulnerabilities_for("akismet")[0];
        assert!(record.affects(None));
        assert!(record.affects(Some("2.5.6")));
        assert!(!record.affects(Some("2.5.7")));

        let unfixed = &db.vulnerabilities_for("revslider")[0];
        assert!(unfixed.affects(Some("99.0")));
    }

    #[test]
    fn test_invalid_json_rejected() {
        assert!(VulnDatabase::from_json("[1, 2]").is_err());
    }
}
