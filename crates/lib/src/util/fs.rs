//! Filesystem helpers.
//!
//! Tree copies keep file modes and, on unix, recreate symlinks instead of
//! following them.

use std::fs;
use std::io;
use std::path::Path;

use walkdir::WalkDir;

/// Copy the tree at `src` onto `dst`, merging into anything already there.
///
/// Files present in both are overwritten by the copy from `src`. Directory
/// modes are applied once their contents are in place, deepest first, so
/// read-only directories copy like any other.
pub fn copy_tree(src: &Path, dst: &Path) -> io::Result<()> {
  let meta = fs::symlink_metadata(src)?;
  if !meta.is_dir() {
    if let Some(parent) = dst.parent() {
      fs::create_dir_all(parent)?;
    }
    return copy_entry(src, dst, &meta);
  }

  let mut dirs = Vec::new();
  for entry in WalkDir::new(src).follow_links(false) {
    let entry = entry.map_err(io::Error::other)?;
    let relative = entry.path().strip_prefix(src).map_err(io::Error::other)?;
    let target = dst.join(relative);
    let meta = entry.path().symlink_metadata()?;

    if meta.is_dir() {
      if target.is_dir() {
        make_owner_writable(&target)?;
      } else {
        fs::create_dir_all(&target)?;
      }
      dirs.push((target, meta.permissions()));
    } else {
      copy_entry(entry.path(), &target, &meta)?;
    }
  }

  for (dir, perms) in dirs.into_iter().rev() {
    fs::set_permissions(&dir, perms)?;
  }
  Ok(())
}

fn copy_entry(src: &Path, dst: &Path, meta: &fs::Metadata) -> io::Result<()> {
  if dst.symlink_metadata().is_ok() {
    remove_path(dst)?;
  }
  if meta.file_type().is_symlink() {
    return copy_symlink(src, dst);
  }
  fs::copy(src, dst)?;
  Ok(())
}

#[cfg(unix)]
fn copy_symlink(src: &Path, dst: &Path) -> io::Result<()> {
  let target = fs::read_link(src)?;
  std::os::unix::fs::symlink(target, dst)
}

#[cfg(not(unix))]
fn copy_symlink(src: &Path, dst: &Path) -> io::Result<()> {
  fs::copy(src, dst).map(|_| ())
}

/// Remove a path (file, directory, or symlink). Missing paths are ignored.
///
/// Read-only directories inside the tree are made writable first.
pub fn remove_path(path: &Path) -> io::Result<()> {
  let meta = match fs::symlink_metadata(path) {
    Ok(meta) => meta,
    Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
    Err(e) => return Err(e),
  };
  if meta.is_dir() {
    for entry in WalkDir::new(path).follow_links(false) {
      let entry = entry.map_err(io::Error::other)?;
      if entry.file_type().is_dir() {
        make_owner_writable(entry.path())?;
      }
    }
    fs::remove_dir_all(path)
  } else {
    fs::remove_file(path)
  }
}

/// Give the owner full access to a directory so entries can be added or
/// removed.
#[cfg(unix)]
fn make_owner_writable(dir: &Path) -> io::Result<()> {
  add_mode(dir, 0o700)
}

#[cfg(not(unix))]
fn make_owner_writable(dir: &Path) -> io::Result<()> {
  let mut perms = fs::metadata(dir)?.permissions();
  if perms.readonly() {
    #[allow(clippy::permissions_set_readonly_false)]
    perms.set_readonly(false);
    fs::set_permissions(dir, perms)?;
  }
  Ok(())
}

/// Move `src` to `dst`, copying and removing when a rename is not possible
/// (for example across filesystems).
pub fn move_path(src: &Path, dst: &Path) -> io::Result<()> {
  match fs::rename(src, dst) {
    Ok(()) => Ok(()),
    Err(_) => {
      copy_tree(src, dst)?;
      remove_path(src)
    }
  }
}

/// Entries directly under `dir`, skipping names that start with a dot.
pub fn visible_entries(dir: &Path) -> io::Result<Vec<std::path::PathBuf>> {
  let mut entries = Vec::new();
  for entry in fs::read_dir(dir)? {
    let entry = entry?;
    if entry.file_name().to_string_lossy().starts_with('.') {
      continue;
    }
    entries.push(entry.path());
  }
  entries.sort();
  Ok(entries)
}

/// OR `bits` into the mode of every entry directly under `dir`.
///
/// A missing directory is not an error.
#[cfg(unix)]
pub fn add_mode_bits(dir: &Path, bits: u32) -> io::Result<()> {
  let entries = match fs::read_dir(dir) {
    Ok(entries) => entries,
    Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
    Err(e) => return Err(e),
  };
  for entry in entries {
    add_mode(&entry?.path(), bits)?;
  }
  Ok(())
}

#[cfg(not(unix))]
pub fn add_mode_bits(_dir: &Path, _bits: u32) -> io::Result<()> {
  Ok(())
}

/// OR `bits` into the mode of `path`.
#[cfg(unix)]
pub fn add_mode(path: &Path, bits: u32) -> io::Result<()> {
  use std::os::unix::fs::PermissionsExt;

  let mut perms = fs::metadata(path)?.permissions();
  perms.set_mode(perms.mode() | bits);
  fs::set_permissions(path, perms)
}

#[cfg(not(unix))]
pub fn add_mode(_path: &Path, _bits: u32) -> io::Result<()> {
  Ok(())
}

/// Set the mode of every entry directly under `dir` to exactly `mode`.
#[cfg(unix)]
pub fn set_mode_all(dir: &Path, mode: u32) -> io::Result<()> {
  use std::os::unix::fs::PermissionsExt;

  let entries = match fs::read_dir(dir) {
    Ok(entries) => entries,
    Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
    Err(e) => return Err(e),
  };
  for entry in entries {
    fs::set_permissions(entry?.path(), fs::Permissions::from_mode(mode))?;
  }
  Ok(())
}

#[cfg(not(unix))]
pub fn set_mode_all(_dir: &Path, _mode: u32) -> io::Result<()> {
  Ok(())
}
