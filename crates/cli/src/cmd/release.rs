//! Implementation of the `slugpack release` command.

use std::path::Path;

use anyhow::{Context, Result};
use slugpack_lib::pack::PackKind;

use super::detect::resolve_pack;

/// Print addons, config vars and default process types as YAML.
pub fn cmd_release(build_dir: &Path, pack: Option<PackKind>) -> Result<()> {
  let kind = resolve_pack(build_dir, pack)?;
  let yaml = kind.release().to_yaml().context("Failed to serialize release metadata")?;
  print!("{}", yaml);
  Ok(())
}
