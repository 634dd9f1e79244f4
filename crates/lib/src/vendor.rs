//! Vendored archives installed straight into the slug.
//!
//! Two kinds exist: gems the language pack itself needs (bundler) which are
//! unpacked into the bundler gem tree, and extra binaries unpacked into
//! `bin/`.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::consts::{BUNDLER_VERSION, SLUG_VENDOR_BASE};
use crate::context::BuildContext;
use crate::fetch::{ArtifactStore, FetchError};
use crate::util::fs::{add_mode_bits, set_mode_all};

#[derive(Debug, Error)]
pub enum VendorError {
  #[error("failed to vendor {name}")]
  Fetch {
    name: String,
    #[source]
    source: FetchError,
  },

  #[error("failed to set permissions under '{path}'")]
  Permissions {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// Archive names of the gems the language pack vendors into every slug.
pub fn language_pack_gems() -> Vec<String> {
  vec![format!("bundler-{}", BUNDLER_VERSION)]
}

/// Unpack each gem archive into the bundler gem tree, then set every entry
/// of its `bin/` to mode `0755`.
pub async fn install_gems(store: &ArtifactStore, ctx: &BuildContext, gems: &[String]) -> Result<(), VendorError> {
  let base = ctx.path(SLUG_VENDOR_BASE);
  fetch_all(store, gems, &base).await?;

  let bin = base.join("bin");
  set_mode_all(&bin, 0o755).map_err(|source| VendorError::Permissions { path: bin, source })
}

/// Unpack each binary archive into the slug's `bin/`, then make every entry
/// there executable.
pub async fn install_binaries(
  store: &ArtifactStore,
  ctx: &BuildContext,
  binaries: &[String],
) -> Result<(), VendorError> {
  let bin = ctx.path("bin");
  fetch_all(store, binaries, &bin).await?;
  add_mode_bits(&bin, 0o111).map_err(|source| VendorError::Permissions { path: bin, source })
}

async fn fetch_all(store: &ArtifactStore, names: &[String], dest: &Path) -> Result<(), VendorError> {
  for name in names {
    debug!(name = %name, dest = %dest.display(), "vendoring");
    store.fetch(name, dest).await.map_err(|source| VendorError::Fetch {
      name: name.clone(),
      source,
    })?;
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::BuildCache;
  use crate::env::Environment;
  use crate::util::testutil::ArtifactMirror;
  use tempfile::TempDir;

  fn ctx(temp: &TempDir) -> BuildContext {
    BuildContext::new(temp.path().join("build"), Environment::new(), BuildCache::new(temp.path().join("cache")))
  }

  #[test]
  fn bundler_is_the_default_gem() {
    assert_eq!(language_pack_gems(), vec!["bundler-1.1.rc".to_string()]);
  }

  #[tokio::test]
  #[cfg(unix)]
  async fn install_gems_unpacks_into_vendor_base() {
    use std::os::unix::fs::PermissionsExt;

    let mirror = ArtifactMirror::new();
    mirror.add_archive(
      "bundler-1.1.rc",
      &[("bin/bundle", "#!/bin/sh\n", 0o600), ("gems/bundler-1.1.rc/lib/bundler.rb", "", 0o644)],
    );
    let temp = TempDir::new().unwrap();
    let ctx = ctx(&temp);

    install_gems(&mirror.store(), &ctx, &language_pack_gems()).await.unwrap();

    let base = ctx.path(SLUG_VENDOR_BASE);
    assert!(base.join("gems/bundler-1.1.rc/lib/bundler.rb").exists());
    let mode = std::fs::metadata(base.join("bin/bundle")).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o755);
  }

  #[tokio::test]
  #[cfg(unix)]
  async fn install_binaries_unpacks_into_bin_and_marks_executable() {
    use std::os::unix::fs::PermissionsExt;

    let mirror = ArtifactMirror::new();
    mirror.add_archive("node-0.4.7", &[("node", "#!/bin/sh\n", 0o644), ("npm", "#!/bin/sh\n", 0o600)]);
    let temp = TempDir::new().unwrap();
    let ctx = ctx(&temp);

    install_binaries(&mirror.store(), &ctx, &["node-0.4.7".to_string()]).await.unwrap();

    for name in ["node", "npm"] {
      let path = ctx.path("bin").join(name);
      let mode = std::fs::metadata(&path).unwrap().permissions().mode();
      assert_eq!(mode & 0o111, 0o111, "{} should be executable by everyone", name);
    }
  }

  #[tokio::test]
  async fn install_binaries_fails_on_missing_archive() {
    let mirror = ArtifactMirror::new();
    let temp = TempDir::new().unwrap();

    let result = install_binaries(&mirror.store(), &ctx(&temp), &["node-0.4.7".to_string()]).await;

    assert!(matches!(result, Err(VendorError::Fetch { ref name, .. }) if name == "node-0.4.7"));
  }

  #[tokio::test]
  async fn install_binaries_with_none_is_a_no_op() {
    let mirror = ArtifactMirror::new();
    let temp = TempDir::new().unwrap();

    install_binaries(&mirror.store(), &ctx(&temp), &[]).await.unwrap();
  }
}
