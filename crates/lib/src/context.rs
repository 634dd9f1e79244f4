//! Per-build state shared by every stage.

use std::path::{Path, PathBuf};

use crate::cache::BuildCache;
use crate::env::{self, Environment, ScopedUnset};

/// The mutable state of one build invocation.
///
/// Holds the build directory, the pipeline environment and the cache handle.
/// Stages receive it by reference and never consult the process working
/// directory or process environment directly.
#[derive(Debug, Clone)]
pub struct BuildContext {
  build_dir: PathBuf,
  env: Environment,
  cache: BuildCache,
}

impl BuildContext {
  pub fn new(build_dir: impl Into<PathBuf>, env: Environment, cache: BuildCache) -> Self {
    Self {
      build_dir: build_dir.into(),
      env,
      cache,
    }
  }

  pub fn build_dir(&self) -> &Path {
    &self.build_dir
  }

  /// Resolve `relative` against the build directory.
  pub fn path(&self, relative: impl AsRef<Path>) -> PathBuf {
    self.build_dir.join(relative)
  }

  pub fn env(&self) -> &Environment {
    &self.env
  }

  pub fn env_mut(&mut self) -> &mut Environment {
    &mut self.env
  }

  pub fn cache(&self) -> &BuildCache {
    &self.cache
  }

  /// Remove `key` from the environment until the returned guard is dropped.
  pub fn without_var(&mut self, key: &str) -> ScopedUnset<'_, BuildContext> {
    env::without_var(self, key)
  }
}

impl AsMut<Environment> for BuildContext {
  fn as_mut(&mut self) -> &mut Environment {
    &mut self.env
  }
}
