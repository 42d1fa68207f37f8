//! Repository location and engine construction.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context as _, Result};
use directories::ProjectDirs;
use serde::de::DeserializeOwned;
use tracing::debug;

use rawrepo::{EngineConfig, FieldOverlayMerger, RawRepo};
use rawrepo_core::StaticRelationHints;
use rawrepo_file::FileStore;

pub type Engine = RawRepo<FileStore, StaticRelationHints, FieldOverlayMerger>;

/// Where the repository lives for this invocation.
#[derive(Debug, Clone)]
pub struct Context {
    root: PathBuf,
}

impl Context {
    /// `--root`, then `$RAWREPO_ROOT`, then the per-user data directory.
    pub fn resolve(flag: Option<PathBuf>) -> Result<Self> {
        let root = match flag {
            Some(root) => root,
            None => match std::env::var_os("RAWREPO_ROOT") {
                Some(root) => PathBuf::from(root),
                None => ProjectDirs::from("", "", "rawrepo")
                    .context("Could not determine data directory")?
                    .data_dir()
                    .to_path_buf(),
            },
        };
        debug!(root = %root.display(), "Using repository");
        Ok(Self { root })
    }

    pub fn store(&self) -> FileStore {
        FileStore::new(&self.root)
    }

    /// Build the engine from `hints.json` and `engine.json` in the root.
    pub fn engine(&self) -> Result<Engine> {
        let hints: StaticRelationHints = self
            .read_optional("hints.json")?
            .unwrap_or_default();
        let config: EngineConfig = self.read_optional("engine.json")?.unwrap_or_default();
        Ok(RawRepo::with_config(
            self.store(),
            hints,
            FieldOverlayMerger::default(),
            config,
        ))
    }

    fn read_optional<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        let path = self.root.join(name);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let value = serde_json::from_str(&content)
            .with_context(|| format!("Invalid {}", path.display()))?;
        Ok(Some(value))
    }
}
