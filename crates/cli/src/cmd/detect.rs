//! Implementation of the `slugpack detect` command.

use std::path::Path;

use anyhow::{Result, bail};
use slugpack_lib::pack::{self, PackKind};

/// Print the name of the matching pack. Fails when none matches.
pub fn cmd_detect(build_dir: &Path) -> Result<()> {
  let kind = resolve_pack(build_dir, None)?;
  println!("{}", kind);
  Ok(())
}

/// The forced pack if given, otherwise the detected one.
pub(crate) fn resolve_pack(build_dir: &Path, forced: Option<PackKind>) -> Result<PackKind> {
  if !build_dir.is_dir() {
    bail!("build directory '{}' does not exist", build_dir.display());
  }
  if let Some(kind) = forced {
    return Ok(kind);
  }
  match pack::detect(build_dir) {
    Some(kind) => Ok(kind),
    None => bail!("no pack matches '{}'", build_dir.display()),
  }
}
