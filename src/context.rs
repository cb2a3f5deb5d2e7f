// File: ./src/context.rs
/*! Run context abstraction for filesystem paths.

The `AppContext` trait encapsulates where a run reads its inputs
(`config.toml` and the backgrounds folder) and where it writes the
rendered lockscreen. Two concrete implementations are provided:

- `StandardContext`: resolves everything relative to the working
  directory, or to an override root passed on the command line.
- `TestContext`: creates a temporary directory for isolated tests and
  cleans it up when dropped.

Consumers pass `&dyn AppContext` explicitly to anything that touches the
filesystem; there is no global path state.
*/

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Defines the file system context for one run.
pub trait AppContext: Send + Sync + std::fmt::Debug {
    fn get_inputs_dir(&self) -> Result<PathBuf>;
    fn get_output_dir(&self) -> Result<PathBuf>;

    fn get_config_file_path(&self) -> Result<PathBuf> {
        Ok(self.get_inputs_dir()?.join("config.toml"))
    }

    /// Backgrounds live below the inputs directory unless the configured
    /// folder is absolute.
    fn get_backgrounds_dir(&self, folder: &str) -> Result<PathBuf> {
        let folder = Path::new(folder);
        if folder.is_absolute() {
            return Ok(folder.to_path_buf());
        }
        Ok(self.get_inputs_dir()?.join(folder))
    }

    fn get_output_path(&self, file_name: &str) -> Result<PathBuf> {
        let file = Path::new(file_name);
        if file.is_absolute() {
            return Ok(file.to_path_buf());
        }
        Ok(self.get_output_dir()?.join(file))
    }
}

// --- Production Implementation ---

#[derive(Clone, Debug)]
pub struct StandardContext {
    override_root: Option<PathBuf>,
}

impl StandardContext {
    /// Create a new StandardContext.
    ///
    /// When `override_root` is `Some(path)`, inputs are read from
    /// `<path>/inputs` and output is written under `<path>`. Otherwise the
    /// current working directory plays the role of the root.
    pub fn new(override_root: Option<PathBuf>) -> Self {
        Self { override_root }
    }

    fn root(&self) -> Result<PathBuf> {
        match &self.override_root {
            Some(root) => Ok(root.clone()),
            None => std::env::current_dir().context("Failed to resolve working directory"),
        }
    }

    fn ensure_exists(path: PathBuf) -> Result<PathBuf> {
        if !path.exists() {
            std::fs::create_dir_all(&path)
                .with_context(|| format!("Failed to create directory: {:?}", path))?;
        }
        Ok(path)
    }
}

impl AppContext for StandardContext {
    fn get_inputs_dir(&self) -> Result<PathBuf> {
        // Inputs are never created on demand: a missing folder means a missing config.
        Ok(self.root()?.join("inputs"))
    }

    fn get_output_dir(&self) -> Result<PathBuf> {
        Self::ensure_exists(self.root()?)
    }
}

// --- Test Implementation ---

#[derive(Clone, Debug)]
pub struct TestContext {
    pub root: PathBuf,
}

impl TestContext {
    /// Creates a new TestContext backed by a unique temporary directory.
    ///
    /// The directory is created immediately and removed when the `TestContext`
    /// is dropped.
    pub fn new() -> Self {
        let uuid = uuid::Uuid::new_v4();
        let root = std::env::temp_dir().join(format!("lockcal_test_{}", uuid));
        std::fs::create_dir_all(&root).expect("failed to create TestContext temp dir");
        Self { root }
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl AppContext for TestContext {
    fn get_inputs_dir(&self) -> Result<PathBuf> {
        let p = self.root.join("inputs");
        std::fs::create_dir_all(&p)?;
        Ok(p)
    }

    fn get_output_dir(&self) -> Result<PathBuf> {
        let p = self.root.join("output");
        std::fs::create_dir_all(&p)?;
        Ok(p)
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        // Best-effort cleanup; ignore errors.
        let _ = std::fs::remove_dir_all(&self.root);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_backgrounds_resolve_under_inputs() {
        let ctx = TestContext::new();
        let dir = ctx.get_backgrounds_dir("backgrounds").unwrap();
        assert_eq!(dir, ctx.root.join("inputs").join("backgrounds"));
    }

    #[test]
    fn test_absolute_output_path_is_kept() {
        let ctx = TestContext::new();
        let abs = std::env::temp_dir().join("elsewhere.jpg");
        assert_eq!(ctx.get_output_path(abs.to_str().unwrap()).unwrap(), abs);
        assert_eq!(
            ctx.get_output_path("lockscreen.jpg").unwrap(),
            ctx.root.join("output").join("lockscreen.jpg")
        );
    }
}
