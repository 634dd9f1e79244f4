//! Overlay of the emulator checkout onto the build directory.
//!
//! The application's own top-level entries end up under `local-roms/` and the
//! checkout takes their place. Hidden entries are left alone on both sides.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::consts::LOCAL_CONTENT_DIR;
use crate::context::BuildContext;
use crate::process::{self, ProcessError};
use crate::util::fs::{move_path, visible_entries};

#[derive(Debug, Error)]
pub enum OverlayError {
  #[error("failed to create a temporary directory")]
  TempDir(#[source] io::Error),

  #[error(transparent)]
  Process(#[from] ProcessError),

  #[error("git clone of {url} failed:\n{output}")]
  Clone { url: String, output: String },

  #[error("failed to list '{path}'")]
  List {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to create '{path}'")]
  CreateDir {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to move '{from}' to '{to}'")]
  Move {
    from: PathBuf,
    to: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// Clones an external repository and lays it over the build directory.
#[derive(Debug, Clone)]
pub struct SourceOverlay {
  git: String,
  url: String,
}

impl SourceOverlay {
  pub fn new(git: impl Into<String>, url: impl Into<String>) -> Self {
    Self {
      git: git.into(),
      url: url.into(),
    }
  }

  /// Clone into a fresh temporary directory and swap it with the build
  /// directory's contents. The temporary directory is removed on every exit
  /// path.
  pub async fn apply(&self, ctx: &BuildContext) -> Result<(), OverlayError> {
    let checkout = tempfile::Builder::new()
      .prefix("jsnes-")
      .tempdir()
      .map_err(OverlayError::TempDir)?;

    info!("Cloning {}", self.url);
    let out = process::run(&self.git, &["clone", self.url.as_str(), "."], ctx.env(), checkout.path()).await?;
    if !out.success() {
      return Err(OverlayError::Clone {
        url: self.url.clone(),
        output: out.output,
      });
    }

    merge_local_content(checkout.path(), ctx.build_dir())
  }
}

/// Move the build directory's visible entries into `<checkout>/local-roms`,
/// then move every visible entry of `checkout` into the build directory.
pub fn merge_local_content(checkout: &Path, build_dir: &Path) -> Result<(), OverlayError> {
  let local = checkout.join(LOCAL_CONTENT_DIR);
  std::fs::create_dir_all(&local).map_err(|source| OverlayError::CreateDir {
    path: local.clone(),
    source,
  })?;

  move_entries(build_dir, &local)?;
  move_entries(checkout, build_dir)
}

fn move_entries(from_dir: &Path, to_dir: &Path) -> Result<(), OverlayError> {
  let entries = visible_entries(from_dir).map_err(|source| OverlayError::List {
    path: from_dir.to_path_buf(),
    source,
  })?;

  for from in entries {
    let Some(name) = from.file_name() else { continue };
    let to = to_dir.join(name);
    debug!(from = %from.display(), to = %to.display(), "moving");
    move_path(&from, &to).map_err(|source| OverlayError::Move { from, to, source })?;
  }
  Ok(())
}
