use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, Result};

/// Root configuration, loaded from `~/.config/unicat/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnionConfig {
    pub matching: MatchingConfig,
    pub merge: MergeConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Minimum token-sort similarity (percent, inclusive) for a fuzzy match.
    pub fuzzy_threshold: u8,
    /// Extract and index author/title/year keys.
    pub fuzzy: bool,
    /// Match on ISBN/ISSN only, even when fuzzy keys are extracted.
    pub strong_only: bool,
    /// Verify ISBN/ISSN check digits.
    pub checksums: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Source labels, in priority order, used to break score ties.
    pub prefer_sources: Vec<String>,
    /// Tags whose content is copied whole from a single donor member.
    pub prefer_fields: Vec<String>,
    pub provenance_tag: String,
    pub holdings_tag: String,
    pub merge_note_tag: String,
    /// Reserved. Accepted and threaded through to the merger, no effect on output.
    pub keep_legacy_fields: bool,
}

// ─── Defaults ──────────────────────────────────────────────

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            fuzzy_threshold: 92,
            fuzzy: true,
            strong_only: false,
            checksums: true,
        }
    }
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            prefer_sources: Vec::new(),
            prefer_fields: vec!["245".to_string(), "260".to_string(), "264".to_string()],
            provenance_tag: "035".to_string(),
            holdings_tag: "910".to_string(),
            merge_note_tag: "948".to_string(),
            keep_legacy_fields: false,
        }
    }
}

impl MatchingConfig {
    /// Whether the fuzzy index is consulted when assigning records.
    pub fn fuzzy_matching(&self) -> bool {
        self.fuzzy && !self.strong_only
    }
}

// ─── Load / Save ───────────────────────────────────────────

impl UnionConfig {
    /// Standard config file path: `~/.config/unicat/config.toml`
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("UNICAT_CONFIG") {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("unicat")
            .join("config.toml")
    }

    /// Load config from disk, falling back to defaults if the file doesn't exist.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let toml_str = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_str)?;
        Ok(())
    }

    /// Normalize list entries and reject values the engine cannot use.
    pub fn validate(mut self) -> Result<Self> {
        if self.matching.fuzzy_threshold > 100 {
            return Err(CatalogError::Config(format!(
                "fuzzy_threshold must be between 0 and 100, got {}",
                self.matching.fuzzy_threshold
            )));
        }

        self.merge.prefer_sources = clean_list(&self.merge.prefer_sources);
        self.merge.prefer_fields = clean_list(&self.merge.prefer_fields);

        for (name, tag) in [
            ("provenance_tag", &self.merge.provenance_tag),
            ("holdings_tag", &self.merge.holdings_tag),
            ("merge_note_tag", &self.merge.merge_note_tag),
        ] {
            if !is_numeric_tag(tag) {
                return Err(CatalogError::Config(format!(
                    "{name} must be three digits, got '{tag}'"
                )));
            }
        }
        Ok(self)
    }
}

/// Split a comma-separated option value, dropping blank entries.
pub fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn clean_list(items: &[String]) -> Vec<String> {
    items
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn is_numeric_tag(tag: &str) -> bool {
    tag.len() == 3 && tag.bytes().all(|b| b.is_ascii_digit())
}
