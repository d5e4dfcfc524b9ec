//! Per-invocation context handed to every component.

use std::path::{Path, PathBuf};

use crate::config::Settings;
use crate::instance::InstanceNames;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    #[default]
    Normal,
    Verbose,
}

impl Verbosity {
    pub fn from_flag(verbose: bool) -> Self {
        if verbose {
            Self::Verbose
        } else {
            Self::Normal
        }
    }

    pub fn is_verbose(&self) -> bool {
        matches!(self, Self::Verbose)
    }

    /// Default `tracing-subscriber` filter directive for this level.
    pub fn filter(&self) -> &'static str {
        match self {
            Self::Normal => "info",
            Self::Verbose => "debug",
        }
    }
}

/// Verbosity, deployment root and settings for one command.
#[derive(Debug, Clone)]
pub struct Context {
    verbosity: Verbosity,
    root: PathBuf,
    settings: Settings,
}

impl Context {
    pub fn new(verbosity: Verbosity, root: impl Into<PathBuf>, settings: Settings) -> Self {
        Self {
            verbosity,
            root: root.into(),
            settings,
        }
    }

    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    /// Directory holding every instance directory, templates and image contexts.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn names(&self, instance: &str) -> InstanceNames {
        InstanceNames::new(self.settings.prefix.clone(), instance)
    }

    /// Resolve a settings path against the root.
    pub fn root_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}
