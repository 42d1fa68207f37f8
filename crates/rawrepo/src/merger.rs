//! Field overlay merger.
//!
//! Content is read as one field per line, keyed by the first token:
//!
//! ```text
//! 001 00 *a 25912233 *b 870970
//! 245 00 *a Title
//! ```
//!
//! Enrichment fields replace every base field with the same tag, in the
//! position of the first one. Tags the base lacks are appended.

use std::collections::BTreeSet;

use rawrepo_core::Result;
use rawrepo_core::RecordMerger;
use rawrepo_core::error::MergeError;

#[derive(Clone, Debug, Default)]
pub struct FieldOverlayMerger {
    final_only: BTreeSet<String>,
}

impl FieldOverlayMerger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tags only the requesting agency's own enrichment may override.
    pub fn with_final_only<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.final_only.extend(tags.into_iter().map(Into::into));
        self
    }
}

fn fields(content: &[u8]) -> Result<Vec<(&str, &str)>> {
    let text = std::str::from_utf8(content).map_err(|e| MergeError::Content {
        message: format!("content is not UTF-8: {}", e),
    })?;
    Ok(text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| (line.split_whitespace().next().unwrap_or_default(), line))
        .collect())
}

impl RecordMerger for FieldOverlayMerger {
    fn merge(&self, base: &[u8], enrichment: &[u8], is_final: bool) -> Result<Vec<u8>> {
        let base = fields(base)?;
        let overlay: Vec<(&str, &str)> = fields(enrichment)?
            .into_iter()
            .filter(|(tag, _)| is_final || !self.final_only.contains(*tag))
            .collect();
        let overlay_tags: BTreeSet<&str> = overlay.iter().map(|(tag, _)| *tag).collect();

        let mut written: BTreeSet<&str> = BTreeSet::new();
        let mut lines: Vec<&str> = Vec::with_capacity(base.len() + overlay.len());
        for (tag, line) in &base {
            if !overlay_tags.contains(tag) {
                lines.push(*line);
            } else if written.insert(*tag) {
                lines.extend(overlay.iter().filter(|(t, _)| t == tag).map(|(_, l)| *l));
            }
        }
        for (tag, line) in &overlay {
            if !written.contains(tag) {
                lines.push(*line);
            }
        }

        let mut merged = lines.join("\n");
        if !merged.is_empty() {
            merged.push('\n');
        }
        Ok(merged.into_bytes())
    }

    fn cache_key(&self) -> String {
        let tags: Vec<&str> = self.final_only.iter().map(String::as_str).collect();
        format!("field-overlay[{}]", tags.join(","))
    }
}
