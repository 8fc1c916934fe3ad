//! Stowage: archival file manager with a rebuildable index, an integrity ledger and
//! one-way backup sync.
//!
//! Content lives in `files/`, one JSON sidecar per file in `metadata/`. The sidecars are
//! the source of truth; the index store (`project.db`) is derived from them and can always
//! be rebuilt with [`IndexEngine::rebuild_all`].
//!
//! ```ignore
//! let ctx = stowage::ProjectContext::open("/archive")?;
//! let index = stowage::IndexEngine::open(&ctx.layout, std::time::Duration::from_secs(1))?;
//! for f in index.search("report", stowage::MatchMode::Prefix, stowage::Bucket::Filename)? {
//!     println!("{} {}", f.id, f.filename);
//! }
//! ```

pub mod backup;
pub mod disk_detect;
pub mod engine;
pub mod error;
pub mod index;
pub mod integrity;
pub mod orphan;
pub mod project;
pub mod store;
pub mod types;
pub mod utils;

/// Re-export types for API
pub use types::*;

pub use error::{Error, Result};
pub use index::IndexEngine;
pub use integrity::Ledger;
pub use project::{ProjectContext, ProjectLayout};
