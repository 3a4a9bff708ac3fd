use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{HistoError, Result};

pub const DEFAULT_CUSTOM_NAMES_FILE: &str = "CustomPidNames.xml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename = "pids")]
struct PidsDocument {
    #[serde(rename = "pid", default)]
    pids: Vec<PidAlias>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct PidAlias {
    #[serde(rename = "@name")]
    name: String,
    #[serde(rename = "@custom")]
    custom: String,
}

/// Display aliases for PID names, stored as
/// `<pids><pid name="RPM" custom="Engine RPM"/></pids>`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CustomNames {
    entries: Vec<PidAlias>,
}

impl CustomNames {
    /// Read the alias file. A missing file is an empty store.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        Self::from_xml(&text)
    }

    pub fn from_xml(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let doc: PidsDocument = quick_xml::de::from_str(text)?;
        Ok(Self { entries: doc.pids })
    }

    pub fn to_xml(&self) -> Result<String> {
        let doc = PidsDocument { pids: self.entries.clone() };
        quick_xml::se::to_string(&doc).map_err(|e| HistoError::Xml(e.to_string()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_xml()?)?;
        tracing::info!("Saved {} custom PID names to {:?}", self.entries.len(), path);
        Ok(())
    }

    /// Set or replace the alias for `name`.
    pub fn insert(&mut self, name: &str, custom: &str) {
        match self.entries.iter_mut().find(|e| e.name.eq_ignore_ascii_case(name)) {
            Some(entry) => entry.custom = custom.to_string(),
            None => self.entries.push(PidAlias {
                name: name.to_string(),
                custom: custom.to_string(),
            }),
        }
    }

    /// Drop the alias for `name`; returns whether one existed.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| !e.name.eq_ignore_ascii_case(name));
        self.entries.len() != before
    }

    pub fn alias(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.name.eq_ignore_ascii_case(name))
            .map(|e| e.custom.as_str())
            .filter(|c| !c.is_empty())
    }

    /// Alias for `name` if there is one, else `name` itself.
    pub fn apply<'a>(&'a self, name: &'a str) -> &'a str {
        self.alias(name).unwrap_or(name)
    }

    /// `(name, alias)` pairs in file order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|e| (e.name.as_str(), e.custom.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
