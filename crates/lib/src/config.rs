//! Build configuration.
//!
//! Values come from `SLUGPACK_*` variables in the build environment, falling
//! back to the built-in defaults. The CLI overrides the pack and format.

use std::path::PathBuf;

use crate::consts::{JSNES_GIT_URL, VENDOR_URL};
use crate::env::Environment;
use crate::generate::ManifestFormat;
use crate::pack::PackKind;

pub const VENDOR_URL_VAR: &str = "SLUGPACK_VENDOR_URL";
pub const SOURCE_URL_VAR: &str = "SLUGPACK_SOURCE_URL";
pub const SCRATCH_DIR_VAR: &str = "SLUGPACK_SCRATCH_DIR";
pub const BUNDLER_VAR: &str = "SLUGPACK_BUNDLER";
pub const GIT_VAR: &str = "SLUGPACK_GIT";
pub const BINARIES_VAR: &str = "SLUGPACK_BINARIES";

/// Configuration for one build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackConfig {
  /// Base of the artifact store: an http(s) URL, a `file://` URL or a directory.
  pub vendor_url: String,

  /// Repository overlaid onto the build directory.
  pub source_url: String,

  /// Where runtime build tools are unpacked.
  pub scratch_dir: PathBuf,

  /// Program used for `bundle` invocations.
  pub bundler: String,

  /// Program used for `git` invocations.
  pub git: String,

  /// Extra binary archives unpacked into `bin/`.
  pub binaries: Vec<String>,

  pub pack: PackKind,

  pub format: ManifestFormat,
}

impl Default for PackConfig {
  fn default() -> Self {
    Self {
      vendor_url: VENDOR_URL.to_string(),
      source_url: JSNES_GIT_URL.to_string(),
      scratch_dir: PathBuf::from("/tmp"),
      bundler: "bundle".to_string(),
      git: "git".to_string(),
      binaries: Vec::new(),
      pack: PackKind::default(),
      format: ManifestFormat::default(),
    }
  }
}

impl PackConfig {
  /// Defaults overridden by any `SLUGPACK_*` variables present in `env`.
  pub fn from_env(env: &Environment) -> Self {
    let mut config = Self::default();
    let non_empty = |key: &str| env.get(key).filter(|v| !v.trim().is_empty()).map(str::to_string);

    if let Some(url) = non_empty(VENDOR_URL_VAR) {
      config.vendor_url = url;
    }
    if let Some(url) = non_empty(SOURCE_URL_VAR) {
      config.source_url = url;
    }
    if let Some(dir) = non_empty(SCRATCH_DIR_VAR) {
      config.scratch_dir = PathBuf::from(dir);
    }
    if let Some(program) = non_empty(BUNDLER_VAR) {
      config.bundler = program;
    }
    if let Some(program) = non_empty(GIT_VAR) {
      config.git = program;
    }
    if let Some(list) = non_empty(BINARIES_VAR) {
      config.binaries = list
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    }
    config
  }

  pub fn with_pack(mut self, pack: PackKind) -> Self {
    self.pack = pack;
    self
  }

  pub fn with_format(mut self, format: ManifestFormat) -> Self {
    self.format = format;
    self
  }
}
