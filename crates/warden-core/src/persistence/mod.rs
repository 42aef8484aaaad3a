//! Persistence layer for durable approvals.
//!
//! # File Locations
//!
//! All data lives under the config directory:
//!
//! ```text
//! ~/.config/warden/                (or WARDEN_CONFIG_DIR)
//! ├── settings.json                # Shared settings, approvals under "approvals"
//! ├── settings.json.lock           # Advisory lock for writers
//! └── logs/
//!     └── decisions.log            # One line per resolved chain
//! ```
//!
//! # Atomic Writes
//!
//! Saves write to `settings.json.tmp` and rename over the original, so a
//! reader never observes a half-written document.
//!
//! # Usage
//!
//! ```ignore
//! use warden_core::persistence::PolicyStore;
//!
//! let store = PolicyStore::new(&config_dir);
//! let snapshot = store.snapshot()?;
//! ```

mod lock;
pub mod policy;
pub mod types;

pub use lock::DocumentLock;
pub use policy::{
    load_document, save_document, snapshot_from_document, PolicyError, PolicyStore, SETTINGS_FILE,
};
pub use types::{PolicySnapshot, ScopeRules, APPROVALS_KEY};
