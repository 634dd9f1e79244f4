//! Cross-build cache.
//!
//! The cache persists named subtrees of the build directory between builds.
//! Entries are keyed by their path relative to the build directory and are not
//! content-addressed: a stored entry is reused as is, and callers decide
//! whether a subtree is worth storing.
//!
//! # Layout
//!
//! ```text
//! <cache_dir>/
//!   .bundle/            # stored from <build>/.bundle
//!   vendor/bundle/      # stored from <build>/vendor/bundle
//! ```

use std::io;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::util::fs::{copy_tree, remove_path};

/// Errors that can occur during cache operations.
#[derive(Debug, Error)]
pub enum CacheError {
  /// The cache key is absolute or leaves the build directory.
  #[error("invalid cache path '{0}': must be relative and stay inside the build directory")]
  InvalidPath(String),

  /// Failed to copy a subtree into or out of the cache.
  #[error("failed to copy '{from}' to '{to}'")]
  Copy {
    from: PathBuf,
    to: PathBuf,
    #[source]
    source: io::Error,
  },

  /// Failed to remove a stale cache entry.
  #[error("failed to remove '{path}'")]
  Remove {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// Outcome of a [`BuildCache::load`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheLoad {
  Hit,
  Miss,
}

/// Handle to the persistent cache directory.
#[derive(Debug, Clone)]
pub struct BuildCache {
  dir: PathBuf,
}

impl BuildCache {
  pub fn new(dir: impl Into<PathBuf>) -> Self {
    Self { dir: dir.into() }
  }

  /// Path of the cached copy for `relative`.
  pub fn entry_path(&self, relative: &str) -> Result<PathBuf, CacheError> {
    Ok(self.dir.join(checked_relative(relative)?))
  }

  /// Restore the cached copy of `relative` into `build_dir`.
  ///
  /// A cache miss is not an error. Cached files overwrite files already in
  /// the build tree.
  pub fn load(&self, build_dir: &Path, relative: &str) -> Result<CacheLoad, CacheError> {
    let rel = checked_relative(relative)?;
    let cached = self.dir.join(&rel);

    if cached.symlink_metadata().is_err() {
      debug!(path = relative, "cache miss");
      return Ok(CacheLoad::Miss);
    }

    let target = build_dir.join(&rel);
    copy_tree(&cached, &target).map_err(|source| CacheError::Copy {
      from: cached.clone(),
      to: target.clone(),
      source,
    })?;

    info!(path = relative, "loaded from cache");
    Ok(CacheLoad::Hit)
  }

  /// Persist `relative` from `build_dir`, replacing any earlier copy.
  ///
  /// When the subtree does not exist in the build directory the stale entry is
  /// dropped and nothing is stored.
  pub fn store(&self, build_dir: &Path, relative: &str) -> Result<(), CacheError> {
    let rel = checked_relative(relative)?;
    let cached = self.dir.join(&rel);
    let source = build_dir.join(&rel);

    let remove_stale = || {
      remove_path(&cached).map_err(|e| CacheError::Remove {
        path: cached.clone(),
        source: e,
      })
    };

    if source.symlink_metadata().is_err() {
      remove_stale()?;
      debug!(path = relative, "nothing to store");
      return Ok(());
    }

    // Copy into a sibling staging directory first so a failed copy never
    // leaves a partial entry behind for the next load.
    let copy_err = |e| CacheError::Copy {
      from: source.clone(),
      to: cached.clone(),
      source: e,
    };
    let parent = cached.parent().unwrap_or(self.dir.as_path());
    std::fs::create_dir_all(parent).map_err(copy_err)?;
    let staging = tempfile::Builder::new()
      .prefix(".store-")
      .tempdir_in(parent)
      .map_err(copy_err)?;
    let staged = staging.path().join("entry");
    copy_tree(&source, &staged).map_err(copy_err)?;

    remove_stale()?;
    std::fs::rename(&staged, &cached).map_err(copy_err)?;

    info!(path = relative, "stored in cache");
    Ok(())
  }
}

fn checked_relative(relative: &str) -> Result<PathBuf, CacheError> {
  let path = Path::new(relative);
  let valid = !relative.is_empty()
    && path
      .components()
      .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
  if !valid {
    return Err(CacheError::InvalidPath(relative.to_string()));
  }
  Ok(path.to_path_buf())
}
