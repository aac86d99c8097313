// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

use serde::{Deserialize, Serialize};
use url::Url;

use super::vulnerability::{VulnDatabase, VulnerabilityRecord};

/// Closed set of component kinds the engine knows how to find
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Plugin,
    Theme,
    Timthumb,
    User,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Plugin => "plugin",
            ItemKind::Theme => "theme",
            ItemKind::Timthumb => "timthumb",
            ItemKind::User => "user",
        }
    }

    pub fn plural(&self) -> &'static str {
        match self {
            ItemKind::Plugin => "plugins",
            ItemKind::Theme => "themes",
            ItemKind::Timthumb => "timthumbs",
            ItemKind::User => "users",
        }
    }
}

impl std::fmt::Display for ItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub trait Identifiable {
    fn kind(&self) -> ItemKind;
    fn name(&self) -> &str;
    fn uri(&self) -> &Url;
}

pub trait Confirmable {
    fn is_confirmed(&self) -> bool;
    fn confirm(self) -> Self;
}

pub trait VulnerabilityMatchable {
    fn vulnerabilities(&self) -> &[VulnerabilityRecord];

    fn version(&self) -> Option<&str>;

    /// Any record that still applies at the known version
    fn is_vulnerable(&self) -> bool {
        let version = self.version();
        self.vulnerabilities().iter().any(|v| v.affects(version))
    }
}

/// One candidate component on the target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub kind: ItemKind,
    pub name: String,
    pub uri: Url,
    pub confirmed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Numeric author id, users only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub vulnerabilities: Vec<VulnerabilityRecord>,
}

impl Item {
    pub fn new(kind: ItemKind, name: impl Into<String>, uri: Url) -> Self {
        Self {
            kind,
            name: name.into(),
            uri,
            confirmed: false,
            version: None,
            id: None,
            vulnerabilities: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: u32) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Attach the records the database holds for this name
    pub fn with_vulnerabilities_from(mut self, db: Option<&VulnDatabase>) -> Self {
        if let Some(db) = db {
            self.vulnerabilities = db.vulnerabilities_for(&self.name).to_vec();
        }
        self
    }
}

impl Identifiable for Item {
    fn kind(&self) -> ItemKind {
        self.kind
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn uri(&self) -> &Url {
        &self.uri
    }
}

impl Confirmable for Item {
    fn is_confirmed(&self) -> bool {
        self.confirmed
    }

    fn confirm(mut self) -> Self {
        self.confirmed = true;
        self
    }
}

impl VulnerabilityMatchable for Item {
    fn vulnerabilities(&self) -> &[VulnerabilityRecord] {
        &self.vulnerabilities
    }

    fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plugin(name: &str) -> Item {
        let uri = Url::parse("http://example.com/wp-content/plugins/")
            .unwrap()
            .join(&format!("{}/", name))
            .unwrap();
        Item::new(ItemKind::Plugin, name, uri)
    }

    #[test]
    fn test_confirm_only_flips_flag() {
        let item = plugin("akismet");
        assert!(!item.is_confirmed());

        let confirmed = item.clone().confirm();
        assert!(confirmed.is_confirmed());
        assert_eq!(confirmed.name(), item.name());
        assert_eq!(confirmed.uri(), item.uri());
    }

    #[test]
    fn test_vulnerability_matching_by_name_and_version() {
        let db = VulnDatabase::from_json(
            r#"{"akismet": {"vulnerabilities": [{"title": "XSS", "fixed_in": "2.5.7"}]}}"#,
        )
        .unwrap();

        let unknown_version = plugin("akismet").with_vulnerabilities_from(Some(&db));
        assert!(unknown_version.is_vulnerable());

        let patched = plugin("akismet")
            .with_version("3.0")
            .with_vulnerabilities_from(Some(&db));
        assert_eq!(patched.vulnerabilities().len(), 1);
        assert!(!patched.is_vulnerable());

        let clean = plugin("hello-dolly").with_vulnerabilities_from(Some(&db));
        assert!(!clean.is_vulnerable());
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(ItemKind::Timthumb.plural(), "timthumbs");
        assert_eq!(ItemKind::User.to_string(), "user");
    }
}
