//! Per-site linking rules and anchor texts for heading rewrites.
//!
//! File shape: `{"sites": {"<domain>": {"rules": {...}, "anchors": [{"text": "..."}]}}}`.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use serde_json::{Map, Value};

use seoforge_common::PipelineError;

use crate::traits::Result;

#[derive(Debug, Deserialize)]
struct PolicyFile {
    #[serde(default)]
    sites: BTreeMap<String, SiteEntry>,
}

#[derive(Debug, Deserialize)]
struct SiteEntry {
    #[serde(default)]
    rules: Option<Value>,
    #[serde(default)]
    anchors: Vec<AnchorEntry>,
}

#[derive(Debug, Deserialize)]
struct AnchorEntry {
    #[serde(default)]
    text: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SitePolicy {
    pub homepage: String,
    pub rules: Map<String, Value>,
    pub anchors: Vec<String>,
}

impl SitePolicy {
    /// No rules and no anchors. Used when no policy file is configured.
    pub fn empty(homepage: impl Into<String>) -> Self {
        Self {
            homepage: homepage.into(),
            rules: Map::new(),
            anchors: Vec::new(),
        }
    }

    pub fn load(path: impl AsRef<Path>, domain: Option<&str>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::SitePolicy(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json_str(&raw, domain)
    }

    /// Pick the entry for `domain`, or the only entry when no domain is given.
    pub fn from_json_str(raw: &str, domain: Option<&str>) -> Result<Self> {
        let file: PolicyFile = serde_json::from_str(raw)
            .map_err(|e| PipelineError::SitePolicy(format!("invalid JSON: {e}")))?;

        if file.sites.is_empty() {
            return Err(PipelineError::SitePolicy(
                "config must contain a non-empty 'sites' object".into(),
            ));
        }
        let available = || file.sites.keys().cloned().collect::<Vec<_>>().join(", ");

        let (key, entry) = match domain {
            Some(domain) => {
                let wanted = normalize_domain(domain);
                file.sites
                    .iter()
                    .find(|(k, _)| normalize_domain(k) == wanted)
                    .ok_or_else(|| {
                        PipelineError::SitePolicy(format!(
                            "domain '{domain}' not found. Available: {}",
                            available()
                        ))
                    })?
            }
            None if file.sites.len() == 1 => file
                .sites
                .iter()
                .next()
                .ok_or_else(|| PipelineError::SitePolicy("no sites".into()))?,
            None => {
                return Err(PipelineError::SitePolicy(format!(
                    "multiple sites present; specify a domain. Available: {}",
                    available()
                )))
            }
        };

        let rules = match &entry.rules {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(map)) => map.clone(),
            Some(_) => {
                return Err(PipelineError::SitePolicy(format!(
                    "'rules' for '{key}' must be an object"
                )))
            }
        };

        let anchors: Vec<String> = entry
            .anchors
            .iter()
            .filter_map(|a| match a.text.as_ref()? {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Null => None,
                other => Some(other.to_string()),
            })
            .filter(|s| !s.is_empty())
            .collect();
        if anchors.is_empty() {
            return Err(PipelineError::SitePolicy(format!("no anchors found for '{key}'")));
        }

        Ok(Self {
            homepage: key.clone(),
            rules,
            anchors,
        })
    }

    /// Rules as pretty-printed JSON.
    pub fn rules_text(&self) -> String {
        serde_json::to_string_pretty(&self.rules).unwrap_or_else(|_| "{}".to_string())
    }

    /// One anchor text per line.
    pub fn anchors_text(&self) -> String {
        self.anchors.join("\n")
    }
}

/// Lowercase, without scheme, `www.` or path.
fn normalize_domain(raw: &str) -> String {
    let lower = raw.trim().to_lowercase();
    let without_scheme = lower
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(&lower);
    let host = without_scheme.split('/').next().unwrap_or(without_scheme);
    host.strip_prefix("www.").unwrap_or(host).to_string()
}
