//! Implementation of the `slugpack compile` command.
//!
//! Resolves the pack, configuration and cache directory, then runs the
//! pipeline on a tokio runtime.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result, anyhow};
use tracing::debug;

use slugpack_lib::config::PackConfig;
use slugpack_lib::env::Environment;
use slugpack_lib::generate::ManifestFormat;
use slugpack_lib::pack::PackKind;
use slugpack_lib::pipeline;
use slugpack_lib::platform::paths;

use super::detect::resolve_pack;
use crate::output::{format_duration, print_info, print_stat, print_success};

/// Execute the compile command.
///
/// The build directory is modified in place. Without an explicit cache
/// directory the user cache directory is used.
pub fn cmd_compile(
  build_dir: &Path,
  cache_dir: Option<&Path>,
  pack: Option<PackKind>,
  format: ManifestFormat,
) -> Result<()> {
  let start = Instant::now();
  let env = Environment::from_process();

  let kind = resolve_pack(build_dir, pack)?;
  let build_dir = dunce::canonicalize(build_dir)
    .with_context(|| format!("Failed to resolve build directory '{}'", build_dir.display()))?;
  let cache_dir = resolve_cache_dir(cache_dir, &env)?;
  debug!(build_dir = %build_dir.display(), cache_dir = %cache_dir.display(), "resolved directories");

  let config = PackConfig::from_env(&env).with_pack(kind).with_format(format);
  print_info(&format!("Compiling with the {} pack", kind));

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let result = rt.block_on(pipeline::run(&build_dir, &cache_dir, config))?;

  print_success(&format!("Compiled in {}", format_duration(start.elapsed())));
  if let Some(version) = &result.runtime {
    print_stat("Runtime", version.as_str());
  }
  if let Some(manifest) = &result.manifest {
    print_stat("Manifest", &manifest.display().to_string());
  }
  Ok(())
}

fn resolve_cache_dir(explicit: Option<&Path>, env: &Environment) -> Result<PathBuf> {
  let dir = match explicit {
    Some(dir) => dir.to_path_buf(),
    None => paths::cache_dir(env).ok_or_else(|| anyhow!("Could not determine a cache directory; pass CACHE_DIR"))?,
  };
  std::fs::create_dir_all(&dir).with_context(|| format!("Failed to create cache directory '{}'", dir.display()))?;
  Ok(dunce::canonicalize(&dir).unwrap_or(dir))
}
