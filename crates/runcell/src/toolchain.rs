//! Host toolchain discovery
//!
//! Every language assumes its compiler or interpreter is installed on the
//! host. The executor asks a [`ToolchainLocator`] before doing any work, so a
//! missing toolchain is reported without allocating a workspace.

use std::path::{Path, PathBuf};

use crate::config::Language;

/// Answers whether a language can be executed on this host
pub trait ToolchainLocator: Send + Sync + std::fmt::Debug {
    fn is_available(&self, language: &Language) -> bool;
}

/// Locates toolchain programs through the host `PATH`
#[derive(Debug, Clone, Default)]
pub struct PathLocator;

impl ToolchainLocator for PathLocator {
    fn is_available(&self, language: &Language) -> bool {
        language
            .programs()
            .into_iter()
            .all(|program| resolve_program(program).is_some())
    }
}

/// Resolve a program name to a path using the host's PATH.
///
/// Programs that already contain a `/` (like `./main` or `/usr/bin/g++`) are
/// checked as given.
pub fn resolve_program(program: &str) -> Option<PathBuf> {
    if program.is_empty() {
        return None;
    }

    if program.contains('/') {
        let path = Path::new(program);
        return path.exists().then(|| path.to_path_buf());
    }

    let path_var = std::env::var("PATH").unwrap_or_default();
    path_var
        .split(':')
        .filter(|dir| !dir.is_empty())
        .map(|dir| Path::new(dir).join(program))
        .find(|candidate| candidate.is_file())
}
