//! Build workspace.
//!
//! Every file a build produces lives under one directory owned by that build.
//! Stages receive the handle explicitly and never rely on the process working
//! directory, so concurrent builds with distinct workspaces cannot collide.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Component, Path, PathBuf};

use tracing::debug;

use crate::error::{GeneratorError, Result};

/// Exclusive directory for one build.
#[derive(Debug)]
pub struct InstallerWorkspace {
    root: PathBuf,
}

impl InstallerWorkspace {
    /// Use `root` as the workspace, creating it if needed.
    pub fn create(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| GeneratorError::staging(&root, e))?;
        debug!("Workspace ready at {}", root.display());
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of a workspace-relative file.
    ///
    /// Relative paths that climb out of the workspace are rejected.
    pub fn path(&self, relative: &str) -> Result<PathBuf> {
        let rel = Path::new(relative);
        let escapes = rel
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes || relative.is_empty() {
            return Err(GeneratorError::staging(
                rel,
                "path must be relative and stay inside the workspace",
            ));
        }
        Ok(self.root.join(rel))
    }

    pub fn exists(&self, relative: &str) -> bool {
        self.path(relative).map(|p| p.exists()).unwrap_or(false)
    }

    pub fn create_dir(&self, relative: &str) -> Result<PathBuf> {
        let dir = self.path(relative)?;
        fs::create_dir_all(&dir).map_err(|e| GeneratorError::staging(&dir, e))?;
        Ok(dir)
    }

    /// Write a staged file (certificates, profile documents, assets).
    pub fn write_staged(&self, relative: &str, contents: &[u8]) -> Result<PathBuf> {
        let path = self.prepare(relative, GeneratorError::staging)?;
        fs::write(&path, contents).map_err(|e| GeneratorError::staging(&path, e))?;
        Ok(path)
    }

    /// Copy an external file into the workspace.
    pub fn copy_in(&self, source: &Path, relative: &str) -> Result<PathBuf> {
        let target = self.prepare(relative, GeneratorError::staging)?;
        fs::copy(source, &target).map_err(|e| GeneratorError::staging(source, e))?;
        Ok(target)
    }

    /// Write a script fragment, replacing any previous contents.
    pub fn write_script(&self, relative: &str, contents: &str) -> Result<PathBuf> {
        let path = self.prepare(relative, GeneratorError::emission)?;
        fs::write(&path, contents).map_err(|e| GeneratorError::emission(&path, e))?;
        Ok(path)
    }

    /// Append to a script fragment, creating it if needed.
    pub fn append_script(&self, relative: &str, contents: &str) -> Result<PathBuf> {
        let path = self.prepare(relative, GeneratorError::emission)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| GeneratorError::emission(&path, e))?;
        file.write_all(contents.as_bytes())
            .map_err(|e| GeneratorError::emission(&path, e))?;
        Ok(path)
    }

    /// Delete a file if present. Returns whether anything was removed.
    pub fn remove_file(&self, relative: &str) -> Result<bool> {
        let path = self.path(relative)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(GeneratorError::staging(&path, e)),
        }
    }

    pub fn rename(&self, from: &str, to: &str) -> Result<PathBuf> {
        let source = self.path(from)?;
        let target = self.path(to)?;
        fs::rename(&source, &target).map_err(|e| GeneratorError::staging(&source, e))?;
        Ok(target)
    }

    fn prepare(
        &self,
        relative: &str,
        on_error: fn(PathBuf, std::io::Error) -> GeneratorError,
    ) -> Result<PathBuf> {
        let path = self.path(relative)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| on_error(parent.to_path_buf(), e))?;
        }
        Ok(path)
    }
}
