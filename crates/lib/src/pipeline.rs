//! The compile pipeline.
//!
//! Stages run strictly in order and the first failure ends the build. The
//! environment is composed once up front; everything from the overlay onwards
//! runs with `GIT_DIR` removed, and the variable is put back however that
//! region ends.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::bundler::{Bundler, BundlerError};
use crate::cache::BuildCache;
use crate::config::PackConfig;
use crate::consts::GIT_DIR_VAR;
use crate::context::BuildContext;
use crate::env::{self, Environment};
use crate::fetch::ArtifactStore;
use crate::generate::{self, GenerateError};
use crate::overlay::{OverlayError, SourceOverlay};
use crate::process::{self, ProcessError};
use crate::runtime::{RuntimeError, RuntimeInstaller, RuntimeVersion};
use crate::vendor::{self, VendorError};

#[derive(Debug, Error)]
pub enum PipelineError {
  #[error("build directory '{0}' does not exist")]
  BuildDirNotFound(PathBuf),

  #[error(transparent)]
  Runtime(#[from] RuntimeError),

  #[error(transparent)]
  Overlay(#[from] OverlayError),

  #[error(transparent)]
  Vendor(#[from] VendorError),

  #[error(transparent)]
  Bundler(#[from] BundlerError),

  #[error(transparent)]
  Process(#[from] ProcessError),

  #[error("asset build failed (exit code {code:?})")]
  AssetBuild { code: Option<i32> },

  #[error(transparent)]
  Generate(#[from] GenerateError),
}

/// What a successful compile produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileResult {
  /// The runtime installed, if one was requested.
  pub runtime: Option<RuntimeVersion>,
  /// The manifest written, for packs that write one.
  pub manifest: Option<PathBuf>,
}

/// The stages of a build, wired to one configuration.
#[derive(Debug)]
pub struct Pipeline {
  config: PackConfig,
  store: ArtifactStore,
  runtime: RuntimeInstaller,
  overlay: SourceOverlay,
  bundler: Bundler,
}

impl Pipeline {
  pub fn new(config: PackConfig) -> Self {
    let store = ArtifactStore::new(&config.vendor_url);
    Self {
      runtime: RuntimeInstaller::new(store.clone(), &config.scratch_dir),
      overlay: SourceOverlay::new(&config.git, &config.source_url),
      bundler: Bundler::new(&config.bundler, store.clone()),
      store,
      config,
    }
  }

  /// Run every stage against `ctx`.
  ///
  /// 1. Compose the environment
  /// 2. Install the requested runtime, if any
  /// 3. With `GIT_DIR` removed: overlay the source checkout, vendor the
  ///    language pack gems, install dependencies, vendor binaries, build
  ///    assets and write the manifest
  pub async fn compile(&self, ctx: &mut BuildContext) -> Result<CompileResult, PipelineError> {
    let pack = self.config.pack;
    info!(pack = %pack, build_dir = %ctx.build_dir().display(), "starting compile");

    if !ctx.build_dir().is_dir() {
      return Err(PipelineError::BuildDirNotFound(ctx.build_dir().to_path_buf()));
    }

    let requested = RuntimeVersion::from_env(ctx.env());
    let runtime_bin = requested.as_ref().map(|v| v.build_bin(&self.config.scratch_dir));
    env::compose(ctx.env_mut(), &pack.default_config_vars(), runtime_bin.as_deref());

    let runtime = self.runtime.install(ctx).await?;

    let scoped = ctx.without_var(GIT_DIR_VAR);
    self.overlay.apply(&scoped).await?;
    vendor::install_gems(&self.store, &scoped, &vendor::language_pack_gems()).await?;
    self.bundler.install(&scoped).await?;
    vendor::install_binaries(&self.store, &scoped, &self.config.binaries).await?;
    self.build_assets(&scoped).await?;

    let manifest = if pack.generates_manifest() {
      Some(generate::write_manifest(scoped.build_dir(), self.config.format)?)
    } else {
      None
    };

    info!("compile finished");
    Ok(CompileResult { runtime, manifest })
  }

  async fn build_assets(&self, ctx: &BuildContext) -> Result<(), PipelineError> {
    info!("Running jake");
    let out = process::pipe(&self.config.bundler, &["exec", "jake"], ctx.env(), ctx.build_dir()).await?;
    if !out.success() {
      return Err(PipelineError::AssetBuild { code: out.code() });
    }
    Ok(())
  }
}

/// Compile `build_dir` with the process environment, caching into `cache_dir`.
pub async fn run(build_dir: &Path, cache_dir: &Path, config: PackConfig) -> Result<CompileResult, PipelineError> {
  let mut ctx = BuildContext::new(build_dir, Environment::from_process(), BuildCache::new(cache_dir));
  Pipeline::new(config).compile(&mut ctx).await
}
