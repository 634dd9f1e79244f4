//! Ruby runtime resolution and installation.
//!
//! A runtime is only installed when `RUBY_VERSION` is set. The requested
//! version is checked against the published catalog (`ruby_versions.yml`)
//! before anything is downloaded, then two archives are fetched:
//!
//! - `ruby-build-<x>` (the version with its first `ruby` replaced by
//!   `ruby-build`) into `<scratch>/<version>`, used while building
//! - `<version>` itself into `vendor/<version>` inside the slug
//!
//! Finally the runtime's executables are copied into the slug's `bin/`.
//!
//! Any failure names the requested version together with every valid one.

use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{info, warn};

use crate::consts::{RUBY_VERSION_VAR, RUBY_VERSIONS_DOC};
use crate::context::BuildContext;
use crate::env::Environment;
use crate::fetch::{ArtifactStore, FetchError};
use crate::util::fs::{add_mode, copy_tree, remove_path};

/// Errors that can occur while installing a runtime.
#[derive(Debug, Error)]
pub enum RuntimeError {
  /// The requested version is not installable.
  #[error("Invalid RUBY_VERSION specified: {version}\nValid versions: {valid}")]
  InvalidVersion { version: String, valid: String },

  /// The catalog document could not be downloaded.
  #[error("failed to fetch the Ruby version catalog")]
  CatalogUnavailable(#[source] FetchError),

  /// The catalog document is not a list of version strings.
  #[error("the Ruby version catalog is malformed")]
  CatalogMalformed(#[source] serde_yaml::Error),

  /// Copying the runtime executables into the slug failed.
  #[error("failed to install runtime executables into '{path}'")]
  InstallBin {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// A requested runtime version such as `ruby-1.9.3-p0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RuntimeVersion(String);

impl RuntimeVersion {
  pub fn new(version: impl Into<String>) -> Self {
    Self(version.into())
  }

  /// Read the requested version from the environment. Unset or empty means
  /// no runtime was requested.
  pub fn from_env(env: &Environment) -> Option<Self> {
    env
      .get(RUBY_VERSION_VAR)
      .map(str::trim)
      .filter(|v| !v.is_empty())
      .map(Self::new)
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }

  /// Name of the build-time toolchain archive.
  pub fn build_archive(&self) -> String {
    self.0.replacen("ruby", "ruby-build", 1)
  }

  /// Slug-relative directory the runtime is installed into.
  pub fn vendor_dir(&self) -> PathBuf {
    Path::new("vendor").join(&self.0)
  }

  /// Directory the build-time toolchain is unpacked into.
  pub fn build_path(&self, scratch_dir: &Path) -> PathBuf {
    scratch_dir.join(&self.0)
  }

  /// `bin` directory of the build-time toolchain, put in front of `PATH`.
  pub fn build_bin(&self, scratch_dir: &Path) -> PathBuf {
    self.build_path(scratch_dir).join("bin")
  }
}

impl std::fmt::Display for RuntimeVersion {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// The set of installable versions, sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionCatalog {
  versions: BTreeSet<String>,
}

impl VersionCatalog {
  /// Parse a YAML list of version strings.
  pub fn parse(document: &[u8]) -> Result<Self, RuntimeError> {
    let versions: Vec<String> = serde_yaml::from_slice(document).map_err(RuntimeError::CatalogMalformed)?;
    Ok(versions.into_iter().collect())
  }

  pub fn contains(&self, version: &RuntimeVersion) -> bool {
    self.versions.contains(version.as_str())
  }

  pub fn iter(&self) -> impl Iterator<Item = &str> {
    self.versions.iter().map(String::as_str)
  }

  pub fn len(&self) -> usize {
    self.versions.len()
  }

  pub fn is_empty(&self) -> bool {
    self.versions.is_empty()
  }

  /// All versions joined with `", "`.
  pub fn joined(&self) -> String {
    self.iter().collect::<Vec<_>>().join(", ")
  }
}

impl<S: Into<String>> FromIterator<S> for VersionCatalog {
  fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
    Self {
      versions: iter.into_iter().map(Into::into).collect(),
    }
  }
}

/// Installs the requested runtime into a build.
///
/// The catalog is fetched at most once per installer.
#[derive(Debug)]
pub struct RuntimeInstaller {
  store: ArtifactStore,
  scratch_dir: PathBuf,
  catalog: OnceCell<VersionCatalog>,
}

impl RuntimeInstaller {
  pub fn new(store: ArtifactStore, scratch_dir: impl Into<PathBuf>) -> Self {
    Self {
      store,
      scratch_dir: scratch_dir.into(),
      catalog: OnceCell::new(),
    }
  }

  pub fn scratch_dir(&self) -> &Path {
    &self.scratch_dir
  }

  /// The version catalog, fetched on first use.
  pub async fn catalog(&self) -> Result<&VersionCatalog, RuntimeError> {
    self
      .catalog
      .get_or_try_init(|| async {
        let document = self
          .store
          .fetch_document(RUBY_VERSIONS_DOC)
          .await
          .map_err(RuntimeError::CatalogUnavailable)?;
        VersionCatalog::parse(&document)
      })
      .await
  }

  /// Install the runtime requested through `RUBY_VERSION`, if any.
  ///
  /// Returns the installed version, or `None` when no version was requested.
  pub async fn install(&self, ctx: &BuildContext) -> Result<Option<RuntimeVersion>, RuntimeError> {
    let Some(version) = RuntimeVersion::from_env(ctx.env()) else {
      return Ok(None);
    };

    let catalog = self.catalog().await?;
    let invalid = || RuntimeError::InvalidVersion {
      version: version.to_string(),
      valid: catalog.joined(),
    };

    if !catalog.contains(&version) {
      return Err(invalid());
    }

    let build_path = version.build_path(&self.scratch_dir);
    if let Err(e) = self.store.fetch(&version.build_archive(), &build_path).await {
      warn!(version = %version, error = ?e, "build runtime fetch failed");
      return Err(invalid());
    }

    let vendor_dir = ctx.path(version.vendor_dir());
    if let Err(e) = self.store.fetch(version.as_str(), &vendor_dir).await {
      warn!(version = %version, error = ?e, "runtime fetch failed");
      return Err(invalid());
    }

    install_executables(&vendor_dir.join("bin"), &ctx.path("bin"))?;

    info!("Using RUBY_VERSION: {}", version);
    Ok(Some(version))
  }
}

/// Copy every entry of `from` into `to` and mark each copy executable.
///
/// Symlinks are followed: the slug gets a real copy of what each link points
/// at, since relative links would dangle once copied.
fn install_executables(from: &Path, to: &Path) -> Result<(), RuntimeError> {
  let bin_err = |source| RuntimeError::InstallBin {
    path: to.to_path_buf(),
    source,
  };

  std::fs::create_dir_all(to).map_err(bin_err)?;

  let entries = match std::fs::read_dir(from) {
    Ok(entries) => entries,
    Err(e) if e.kind() == io::ErrorKind::NotFound => {
      warn!(path = %from.display(), "runtime has no bin directory");
      return Ok(());
    }
    Err(e) => return Err(bin_err(e)),
  };

  for entry in entries {
    let entry = entry.map_err(bin_err)?;
    let source = entry.path();
    let target = to.join(entry.file_name());
    remove_path(&target).map_err(bin_err)?;
    if std::fs::metadata(&source).map_err(bin_err)?.is_dir() {
      copy_tree(&source, &target).map_err(bin_err)?;
    } else {
      std::fs::copy(&source, &target).map_err(bin_err)?;
    }
    add_mode(&target, 0o111).map_err(bin_err)?;
  }
  Ok(())
}
