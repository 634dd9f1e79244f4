//! Dependency installation through Bundler.
//!
//! Bundler is driven as an external program; this module only decides how to
//! call it and what its exit status means.
//!
//! # Flow
//!
//! 1. A `Gemfile.lock` is required. Without one the stage fails before any
//!    subprocess is started.
//! 2. A lock generated on Windows cannot be installed strictly: it is removed
//!    and Bundler resolves again without `--deployment`. Otherwise
//!    `--deployment` is used and the cached `.bundle` config is restored.
//! 3. The cached gem tree (`vendor/bundle`) is restored.
//! 4. libyaml is fetched into a temporary directory and exposed through
//!    `CPATH`, `CPPATH` and `LIBRARY_PATH` so native extensions build.
//! 5. On success the gem tree is cleaned and both cache entries are stored.

use std::path::Path;
use std::sync::OnceLock;

use thiserror::Error;
use tracing::{info, warn};

use crate::cache::CacheError;
use crate::consts::{BUNDLE_WITHOUT_VAR, DEFAULT_BUNDLE_WITHOUT, GEMFILE_NAME, LIBYAML_VERSION, LOCKFILE_NAME};
use crate::context::BuildContext;
use crate::env::Environment;
use crate::fetch::{ArtifactStore, FetchError};
use crate::lockfile::{LockFile, LockFileError};
use crate::process::{self, ProcessError};

/// Cache entries owned by this stage.
pub const BUNDLE_CONFIG_DIR: &str = ".bundle";
pub const BUNDLE_VENDOR_DIR: &str = "vendor/bundle";

const SQLITE3_NOTE: &str = "\
Detected sqlite3 gem which is not supported on Heroku.
http://devcenter.heroku.com/articles/how-do-i-use-sqlite3-for-development";

#[derive(Debug, Error)]
pub enum BundlerError {
  #[error("Gemfile.lock is required. Please run \"bundle install\" locally\nand commit your Gemfile.lock.")]
  MissingLockfile,

  #[error(transparent)]
  LockFile(#[from] LockFileError),

  #[error("failed to remove '{path}'")]
  RemoveLockfile {
    path: std::path::PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error(transparent)]
  Cache(#[from] CacheError),

  #[error("failed to fetch libyaml")]
  Libyaml(#[source] FetchError),

  #[error("failed to create a temporary directory")]
  TempDir(#[source] std::io::Error),

  #[error(transparent)]
  Process(#[from] ProcessError),

  /// Bundler exited unsuccessfully.
  #[error("{message}")]
  InstallFailed { message: String, code: Option<i32> },
}

/// How Bundler will be invoked for a given lock file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallPlan {
  pub args: Vec<String>,
  /// `--deployment` is passed and the cached `.bundle` is restored first.
  pub deployment: bool,
  /// The lock file is deleted before installing.
  pub remove_lockfile: bool,
}

impl InstallPlan {
  pub fn new(lock: &LockFile, without: &str) -> Self {
    let mut args = vec![
      "install".to_string(),
      "--without".to_string(),
      without.to_string(),
      "--path".to_string(),
      BUNDLE_VENDOR_DIR.to_string(),
    ];

    let windows = lock.has_windows_platform();
    if !windows {
      args.push("--deployment".to_string());
    }
    args.push("--no-clean".to_string());

    Self {
      args,
      deployment: !windows,
      remove_lockfile: windows,
    }
  }
}

/// The dependency installation stage.
#[derive(Debug)]
pub struct Bundler {
  program: String,
  store: ArtifactStore,
  lock: OnceLock<LockFile>,
}

impl Bundler {
  pub fn new(program: impl Into<String>, store: ArtifactStore) -> Self {
    Self {
      program: program.into(),
      store,
      lock: OnceLock::new(),
    }
  }

  /// The parsed lock file, read at most once.
  ///
  /// The parse survives the lock file being removed by the fallback path.
  pub fn lockfile(&self, build_dir: &Path) -> Result<&LockFile, BundlerError> {
    if let Some(lock) = self.lock.get() {
      return Ok(lock);
    }
    let lock = LockFile::read(&build_dir.join(LOCKFILE_NAME))?;
    Ok(self.lock.get_or_init(|| lock))
  }

  /// Install the application's gems.
  pub async fn install(&self, ctx: &BuildContext) -> Result<(), BundlerError> {
    let lock_path = ctx.path(LOCKFILE_NAME);
    if !lock_path.exists() {
      return Err(BundlerError::MissingLockfile);
    }

    let without = ctx.env().get(BUNDLE_WITHOUT_VAR).unwrap_or(DEFAULT_BUNDLE_WITHOUT);
    let plan = InstallPlan::new(self.lockfile(ctx.build_dir())?, without);

    if plan.remove_lockfile {
      info!("Removing Gemfile.lock because it was generated on Windows");
      std::fs::remove_file(&lock_path).map_err(|source| BundlerError::RemoveLockfile {
        path: lock_path.clone(),
        source,
      })?;
    } else {
      ctx.cache().load(ctx.build_dir(), BUNDLE_CONFIG_DIR)?;
    }
    ctx.cache().load(ctx.build_dir(), BUNDLE_VENDOR_DIR)?;

    match process::run(&self.program, &["version"], ctx.env(), ctx.build_dir()).await {
      Ok(out) if out.success() => info!("Installing dependencies using {}", out.output),
      Ok(out) => warn!(output = %out.output, "could not determine the Bundler version"),
      Err(e) => warn!(error = ?e, "could not determine the Bundler version"),
    }

    let output = {
      let libyaml = tempfile::Builder::new()
        .prefix("libyaml-")
        .tempdir()
        .map_err(BundlerError::TempDir)?;
      let libyaml_dir = libyaml.path().join(format!("libyaml-{}", LIBYAML_VERSION));
      self
        .store
        .fetch(&format!("libyaml-{}", LIBYAML_VERSION), &libyaml_dir)
        .await
        .map_err(BundlerError::Libyaml)?;

      let env = install_env(ctx, &libyaml_dir);
      info!("Running: {}", process::display_command(&self.program, &plan.args));
      process::pipe(&self.program, &plan.args, &env, ctx.build_dir()).await?
    };

    if !output.success() {
      warn!(code = ?output.code(), "bundle install failed");
      return Err(BundlerError::InstallFailed {
        message: self.failure_message(ctx.build_dir()),
        code: output.code(),
      });
    }

    info!("Cleaning up the bundler cache.");
    match process::run(&self.program, &["clean"], ctx.env(), ctx.build_dir()).await {
      Ok(out) if out.success() => {}
      Ok(out) => warn!(output = %out.output, "bundle clean failed"),
      Err(e) => warn!(error = ?e, "bundle clean failed"),
    }

    ctx.cache().store(ctx.build_dir(), BUNDLE_CONFIG_DIR)?;
    ctx.cache().store(ctx.build_dir(), BUNDLE_VENDOR_DIR)?;
    Ok(())
  }

  fn failure_message(&self, build_dir: &Path) -> String {
    let mut message = String::from("Failed to install gems via Bundler.");
    let sqlite = self
      .lockfile(build_dir)
      .map(|lock| lock.is_bundled("sqlite3"))
      .unwrap_or(false);
    if sqlite {
      message.push_str("\n\n");
      message.push_str(SQLITE3_NOTE);
    }
    message
  }
}

/// Environment for the install invocation only.
fn install_env(ctx: &BuildContext, libyaml_dir: &Path) -> Environment {
  let include = libyaml_dir.join("include").display().to_string();
  let lib = libyaml_dir.join("lib").display().to_string();
  let env = ctx.env();

  env.overlaid([
    ("BUNDLE_GEMFILE", ctx.path(GEMFILE_NAME).display().to_string()),
    ("BUNDLE_CONFIG", ctx.path(BUNDLE_CONFIG_DIR).join("config").display().to_string()),
    ("CPATH", env.prefixed("CPATH", &include)),
    ("CPPATH", env.prefixed("CPPATH", &include)),
    ("LIBRARY_PATH", env.prefixed("LIBRARY_PATH", &lib)),
  ])
}
