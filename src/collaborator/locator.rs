//! Finding the JLECmd executable.
//!
//! Resolution is an ordered list of [`LocatorStep`]s; the first step that
//! yields an existing file wins. Tests swap the list for one pointing at a
//! stub collaborator.

use std::{
    env,
    path::{Path, PathBuf},
};

use crate::error::{JumpListError, Result};

pub const JLECMD_ENV_VAR: &str = "JLECMD_PATH";
pub const JLECMD_EXECUTABLE: &str = "JLECmd.exe";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocatorStep {
    /// A path supplied by the caller or configuration.
    Explicit(PathBuf),
    /// A path read from the named environment variable.
    EnvVar(String),
    /// A path shipped next to the running executable.
    Bundled(PathBuf),
    /// An executable name looked up in each `PATH` entry.
    SearchPath(String),
    WellKnown(Vec<PathBuf>),
}

impl LocatorStep {
    fn resolve(&self) -> Option<PathBuf> {
        match self {
            LocatorStep::Explicit(path) => existing_file(path),
            LocatorStep::EnvVar(name) => env::var_os(name)
                .filter(|value| !value.is_empty())
                .and_then(|value| existing_file(Path::new(&value))),
            LocatorStep::Bundled(relative) => env::current_exe()
                .ok()
                .and_then(|exe| exe.parent().map(|dir| dir.join(relative)))
                .and_then(|candidate| existing_file(&candidate)),
            LocatorStep::SearchPath(name) => search_path(name),
            LocatorStep::WellKnown(paths) => paths.iter().find_map(|p| existing_file(p)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollaboratorLocator {
    steps: Vec<LocatorStep>,
}

impl Default for CollaboratorLocator {
    fn default() -> Self {
        Self::jlecmd(None)
    }
}

impl CollaboratorLocator {
    pub fn new(steps: Vec<LocatorStep>) -> Self {
        Self { steps }
    }

    /// Standard JLECmd resolution order, optionally led by an explicit path.
    pub fn jlecmd(explicit: Option<PathBuf>) -> Self {
        let mut steps = Vec::new();
        if let Some(path) = explicit {
            steps.push(LocatorStep::Explicit(path));
        }
        steps.push(LocatorStep::EnvVar(JLECMD_ENV_VAR.to_string()));
        steps.push(LocatorStep::Bundled(
            ["tools", "JLECmd", JLECMD_EXECUTABLE].iter().collect(),
        ));
        steps.push(LocatorStep::SearchPath(JLECMD_EXECUTABLE.to_string()));
        steps.push(LocatorStep::WellKnown(vec![
            PathBuf::from(r"C:\Tools\JLECmd.exe"),
            PathBuf::from(r"C:\Tools\JLECmd\JLECmd.exe"),
            PathBuf::from(r"C:\Program Files\JLECmd\JLECmd.exe"),
        ]));
        Self { steps }
    }

    pub fn steps(&self) -> &[LocatorStep] {
        &self.steps
    }

    pub fn resolve(&self) -> Result<PathBuf> {
        self.steps
            .iter()
            .find_map(LocatorStep::resolve)
            .ok_or_else(|| {
                JumpListError::Input(format!(
                    "{JLECMD_EXECUTABLE} not found; set {JLECMD_ENV_VAR} or pass an explicit path \
                     (download from https://ericzimmerman.github.io/)"
                ))
            })
    }
}

fn existing_file(path: &Path) -> Option<PathBuf> {
    path.is_file().then(|| path.to_path_buf())
}

fn search_path(name: &str) -> Option<PathBuf> {
    let path = env::var_os("PATH")?;
    env::split_paths(&path)
        .filter(|dir| !dir.as_os_str().is_empty())
        .find_map(|dir| existing_file(&dir.join(name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn first_existing_step_wins() {
        let dir = tempdir().unwrap();
        let first = dir.path().join("first.exe");
        let second = dir.path().join("second.exe");
        fs::write(&second, b"").unwrap();
        fs::write(&first, b"").unwrap();

        let locator = CollaboratorLocator::new(vec![
            LocatorStep::Explicit(dir.path().join("missing.exe")),
            LocatorStep::WellKnown(vec![dir.path().join("nope.exe"), first.clone()]),
            LocatorStep::Explicit(second),
        ]);
        assert_eq!(locator.resolve().unwrap(), first);
    }

    #[test]
    fn unresolvable_is_an_input_error() {
        let dir = tempdir().unwrap();
        let locator =
            CollaboratorLocator::new(vec![LocatorStep::Explicit(dir.path().join("absent.exe"))]);
        assert!(locator.resolve().unwrap_err().is_input());
    }

    #[test]
    fn directories_do_not_count_as_executables() {
        let dir = tempdir().unwrap();
        let locator = CollaboratorLocator::new(vec![LocatorStep::Explicit(dir.path().into())]);
        assert!(locator.resolve().is_err());
    }

    #[test]
    fn explicit_path_leads_default_order() {
        let locator = CollaboratorLocator::jlecmd(Some(PathBuf::from("/opt/jlecmd")));
        assert_eq!(
            locator.steps()[0],
            LocatorStep::Explicit(PathBuf::from("/opt/jlecmd"))
        );
        assert_eq!(
            locator.steps()[1],
            LocatorStep::EnvVar(JLECMD_ENV_VAR.to_string())
        );
        assert_eq!(CollaboratorLocator::default().steps().len(), 4);
    }
}
