//! WardenContext - the shared state behind every front-end.
//!
//! Front-ends (the `warden` CLI, editor integrations) build one context and
//! ask it for a [`Resolver`] or a [`PolicyStore`]. Path resolution and log
//! setup live here so front-ends stay thin.

use std::path::{Path, PathBuf};

use crate::approval::Resolver;
use crate::logging::{open_log_file, LogHandle};
use crate::persistence::PolicyStore;

/// Log directory inside the config dir.
pub const LOG_DIR: &str = "logs";

/// Decision log file stem.
pub const DECISION_LOG: &str = "decisions";

/// Configuration for building a WardenContext.
#[derive(Default)]
pub struct WardenContextBuilder {
    config_dir: Option<PathBuf>,
    project: Option<String>,
    decision_log: bool,
}

impl WardenContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the configuration directory.
    pub fn config_dir(mut self, dir: PathBuf) -> Self {
        self.config_dir = Some(dir);
        self
    }

    /// Set the active project. Blank names are ignored.
    pub fn project(mut self, project: Option<String>) -> Self {
        self.project = project.filter(|p| !p.trim().is_empty());
        self
    }

    /// Append each decision to `logs/decisions.log`.
    pub fn decision_log(mut self, enabled: bool) -> Self {
        self.decision_log = enabled;
        self
    }

    /// Build the context, falling back to the default config dir.
    pub fn build(self) -> Result<WardenContext, String> {
        let config_dir = crate::paths::resolve_config_dir(self.config_dir)?;
        let decision_log = self
            .decision_log
            .then(|| open_log_file(Some(&config_dir.join(LOG_DIR)), DECISION_LOG));

        log::debug!(
            "Warden context: config_dir={} project={:?}",
            config_dir.display(),
            self.project
        );

        Ok(WardenContext {
            store: PolicyStore::new(&config_dir),
            config_dir,
            project: self.project,
            decision_log,
        })
    }
}

/// Central shared state for approval operations.
#[derive(Clone)]
pub struct WardenContext {
    config_dir: PathBuf,
    project: Option<String>,
    store: PolicyStore,
    decision_log: Option<LogHandle>,
}

impl WardenContext {
    pub fn builder() -> WardenContextBuilder {
        WardenContextBuilder::new()
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn project(&self) -> Option<&str> {
        self.project.as_deref()
    }

    pub fn store(&self) -> &PolicyStore {
        &self.store
    }

    /// A resolver bound to this context's store, project and decision log.
    pub fn resolver(&self) -> Resolver {
        let resolver = Resolver::new(self.store.clone(), self.project.clone());
        match &self.decision_log {
            Some(handle) => resolver.with_decision_log(handle.clone()),
            None => resolver,
        }
    }
}
