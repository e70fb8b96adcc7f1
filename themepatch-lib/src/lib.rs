//! Theme personalization engine.
//!
//! Edits to CSS custom styling for page regions are accumulated in a change
//! store, merged into previously persisted CSS by a pure synthesizer, and
//! applied/persisted as a single dynamic stylesheet.

pub mod applicator;
pub mod color;
pub mod config;
pub mod debounce;
pub mod error;
pub mod events;
pub mod storage;
pub mod theme_editor;

pub mod style {
    pub mod change_set;
    pub mod owned_css;
    pub mod synthesizer;
    pub mod theme_css;
}

pub use applicator::{PersistOutcome, StylesheetApplicator, DEFAULT_STORAGE_KEY};
pub use config::ThemeConfig;
pub use error::{ConfigError, Result, StorageError, ThemeError};
pub use storage::{FileStorage, MemoryStorage, StyleStorage};
pub use style::change_set::{BoxSides, StyleChangeSet, StyleChangeStore, StyleValue};
pub use style::synthesizer::rebuild;
pub use theme_editor::{SaveOutcome, StyleUpdate, ThemeEditor};
