//! Annotator configuration (`newtab.yaml`)

use crate::classify::LinkRules;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file looked up in the working directory when `--config` is absent
pub const DEFAULT_CONFIG_FILE: &str = "newtab.yaml";

/// Marker appended to external links
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerConfig {
    /// Marker text (escaped before insertion)
    pub text: String,
    /// Inline CSS for the marker span
    pub style: String,
    /// Optional class for the marker span
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            text: " \u{2197}".to_string(),
            style: "font-size: 0.85em; color: inherit; margin-left: 0.15em".to_string(),
            class: None,
        }
    }
}

impl MarkerConfig {
    /// Render the marker as an HTML fragment
    pub fn to_html(&self) -> String {
        let mut html = String::from("<span");
        if let Some(class) = self.class.as_deref().filter(|c| !c.is_empty()) {
            html.push_str(&format!(" class=\"{}\"", escape_html(class)));
        }
        if !self.style.is_empty() {
            html.push_str(&format!(" style=\"{}\"", escape_html(&self.style)));
        }
        html.push('>');
        html.push_str(&escape_html(&self.text));
        html.push_str("</span>");
        html
    }
}

/// Full annotator configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotatorConfig {
    /// Value written to `target` on rewritten links
    pub target: String,
    /// Value written to `rel` on rewritten links
    pub rel: String,
    /// Tag rewritten links and skip already tagged ones on later runs
    pub mark_processed: bool,
    pub marker: MarkerConfig,
    pub rules: LinkRules,
}

impl Default for AnnotatorConfig {
    fn default() -> Self {
        Self {
            target: "_blank".to_string(),
            rel: "noopener noreferrer".to_string(),
            mark_processed: false,
            marker: MarkerConfig::default(),
            rules: LinkRules::default(),
        }
    }
}

impl AnnotatorConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml).context("Failed to parse config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.target.trim().is_empty() {
            bail!("config: `target` must not be empty");
        }
        if self.rules.pdf_suffix.is_empty() {
            bail!("config: `rules.pdf_suffix` must not be empty");
        }
        Ok(())
    }
}

/// Load from an explicit path, else `./newtab.yaml` when present, else defaults
pub async fn load(explicit: Option<&Path>) -> Result<AnnotatorConfig> {
    let path: PathBuf = match explicit {
        Some(p) => p.to_path_buf(),
        None => {
            let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
            if !fallback.is_file() {
                tracing::debug!("no {} found, using defaults", DEFAULT_CONFIG_FILE);
                return Ok(AnnotatorConfig::default());
            }
            fallback
        }
    };

    let content = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("Failed to read config: {}", path.display()))?;
    let config = AnnotatorConfig::from_yaml(&content)
        .with_context(|| format!("Invalid config: {}", path.display()))?;
    tracing::debug!("loaded config from {}", path.display());
    Ok(config)
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
