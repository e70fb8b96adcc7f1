//! The only place that touches durable storage or the active stylesheet.

use crate::error::{Result, ThemeError};
use crate::storage::StyleStorage;
use crate::style::theme_css;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const DEFAULT_STORAGE_KEY: &str = "vendor_portal:dynamic_theme_css";
pub const DEFAULT_EXPORT_NAME: &str = "theme.css";
const DYNAMIC_SHEET_ID: &str = "dynamic-css";

/// The single dynamic stylesheet the page currently obeys.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveStylesheet {
    pub id: &'static str,
    pub css: String,
    /// Bumped on every apply.
    pub generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistOutcome {
    Stored,
    /// Storage failed; the text lives in memory for the rest of the session.
    SessionOnly,
}

pub struct StylesheetApplicator<S: StyleStorage> {
    storage: S,
    key: String,
    active: Option<ActiveStylesheet>,
    generation: u64,
    session_fallback: HashMap<String, String>,
}

impl<S: StyleStorage> StylesheetApplicator<S> {
    pub fn new(storage: S) -> Self {
        Self::with_key(storage, DEFAULT_STORAGE_KEY)
    }

    pub fn with_key(storage: S, key: impl Into<String>) -> Self {
        StylesheetApplicator {
            storage,
            key: key.into(),
            active: None,
            generation: 0,
            session_fallback: HashMap::new(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn active(&self) -> Option<&ActiveStylesheet> {
        self.active.as_ref()
    }

    /// Make `css` the one active dynamic sheet, replacing any previous one.
    pub fn apply(&mut self, css: &str) -> &ActiveStylesheet {
        self.generation += 1;
        log::debug!(
            "applying {DYNAMIC_SHEET_ID} generation {} ({} bytes)",
            self.generation,
            css.len()
        );
        self.active.insert(ActiveStylesheet {
            id: DYNAMIC_SHEET_ID,
            css: css.to_string(),
            generation: self.generation,
        })
    }

    pub fn persist(&mut self, css: &str) -> PersistOutcome {
        let key = self.key.clone();
        self.persist_to(&key, css)
    }

    /// Overwrite `key` with `css`. Storage failures are logged and absorbed.
    pub fn persist_to(&mut self, key: &str, css: &str) -> PersistOutcome {
        match self.storage.set(key, css) {
            Ok(()) => {
                self.session_fallback.remove(key);
                PersistOutcome::Stored
            }
            Err(e) => {
                log::warn!("could not persist {key:?}, keeping it for this session only: {e}");
                self.session_fallback.insert(key.to_string(), css.to_string());
                PersistOutcome::SessionOnly
            }
        }
    }

    pub fn load_persisted(&self) -> String {
        self.load_persisted_from(&self.key)
    }

    /// Stored text for `key`, or empty. A session-only copy wins, since it is
    /// newer than whatever storage refused to overwrite.
    pub fn load_persisted_from(&self, key: &str) -> String {
        if let Some(css) = self.session_fallback.get(key) {
            return css.clone();
        }
        match self.storage.get(key) {
            Ok(css) => css.unwrap_or_default(),
            Err(e) => {
                log::warn!("could not read {key:?}, starting from an empty sheet: {e}");
                String::new()
            }
        }
    }

    /// Forget persisted CSS and drop the active sheet.
    pub fn clear(&mut self) -> PersistOutcome {
        self.active = None;
        self.session_fallback.remove(&self.key);
        match self.storage.remove(&self.key) {
            Ok(()) => PersistOutcome::Stored,
            Err(e) => {
                log::warn!("could not remove {:?}: {e}", self.key);
                self.session_fallback.insert(self.key.clone(), String::new());
                PersistOutcome::SessionOnly
            }
        }
    }

    /// Write the persisted CSS to a file. A directory target gets
    /// [`DEFAULT_EXPORT_NAME`] inside it.
    pub fn export(&self, target: &Path, minify: bool) -> Result<PathBuf> {
        let path = if target.is_dir() {
            target.join(DEFAULT_EXPORT_NAME)
        } else {
            target.to_path_buf()
        };
        let css = self.load_persisted();
        let css = if minify { theme_css::minify(&css)? } else { css };
        std::fs::write(&path, css).map_err(|source| ThemeError::Export {
            path: path.clone(),
            source,
        })?;
        log::info!("exported theme to {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    #[test]
    fn apply_keeps_a_single_sheet() {
        let mut applicator = StylesheetApplicator::new(MemoryStorage::new());
        applicator.apply(".a { color: red; }");
        let active = applicator.apply(".b { color: blue; }").clone();
        assert_eq!(active.css, ".b { color: blue; }");
        assert_eq!(active.generation, 2);
        assert_eq!(applicator.active(), Some(&active));
    }

    #[test]
    fn persist_overwrites() {
        let mut applicator = StylesheetApplicator::new(MemoryStorage::new());
        assert_eq!(applicator.load_persisted(), "");
        assert_eq!(applicator.persist(".a { color: red; }"), PersistOutcome::Stored);
        assert_eq!(applicator.persist(".b { }"), PersistOutcome::Stored);
        assert_eq!(applicator.load_persisted(), ".b { }");
    }

    #[test]
    fn storage_failure_degrades_to_session_memory() {
        let mut applicator = StylesheetApplicator::with_key(MemoryStorage::with_quota(40), "css");
        assert_eq!(applicator.persist(".a { color: red; }"), PersistOutcome::Stored);

        let big = ".b { background-image: url(data:image/png;base64,AAAA); }";
        assert_eq!(applicator.persist(big), PersistOutcome::SessionOnly);
        assert_eq!(applicator.load_persisted(), big);
        assert_eq!(
            applicator.storage().get("css").unwrap().as_deref(),
            Some(".a { color: red; }")
        );

        applicator.clear();
        assert_eq!(applicator.load_persisted(), "");
        assert!(applicator.active().is_none());
    }

    #[test]
    fn export_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut applicator = StylesheetApplicator::new(MemoryStorage::new());
        applicator.persist(".a {\n  color: #ffffff;\n}\n");

        let written = applicator.export(dir.path(), false).unwrap();
        assert_eq!(written, dir.path().join(DEFAULT_EXPORT_NAME));
        assert_eq!(
            std::fs::read_to_string(&written).unwrap(),
            ".a {\n  color: #ffffff;\n}\n"
        );

        let minified = applicator.export(&dir.path().join("min.css"), true).unwrap();
        assert_eq!(std::fs::read_to_string(minified).unwrap().trim(), ".a{color:#fff}");
    }
}
