//! Test utilities for slugpack-lib.
//!
//! Provides a local artifact mirror serving `.tgz` fixtures built on the fly,
//! and stand-in executables for the external tools the pipeline drives.

use std::fs;
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::write::GzEncoder;
use tempfile::TempDir;

use crate::fetch::ArtifactStore;

/// A directory of archives and documents served through [`ArtifactStore::local`].
pub struct ArtifactMirror {
  pub dir: TempDir,
}

impl ArtifactMirror {
  pub fn new() -> Self {
    Self {
      dir: TempDir::new().unwrap(),
    }
  }

  pub fn store(&self) -> ArtifactStore {
    ArtifactStore::local(self.dir.path())
  }

  /// Write `<name>.tgz` containing `(path, content, mode)` entries.
  pub fn add_archive(&self, name: &str, files: &[(&str, &str, u32)]) {
    write_tgz(&self.dir.path().join(format!("{}.tgz", name)), files);
  }

  /// Like [`Self::add_archive`], with extra symlink entries.
  pub fn add_archive_with_links(&self, name: &str, files: &[(&str, &str, u32)], links: &[(&str, &str)]) {
    write_tgz_with_links(&self.dir.path().join(format!("{}.tgz", name)), files, links);
  }

  /// Write a raw document into the mirror.
  pub fn add_document(&self, file: &str, content: &str) {
    fs::write(self.dir.path().join(file), content).unwrap();
  }
}

/// Build a gzip-compressed tarball at `path`.
pub fn write_tgz(path: &Path, files: &[(&str, &str, u32)]) {
  write_tgz_with_links(path, files, &[]);
}

/// Build a tarball holding `files` plus `(path, target)` symlink entries.
pub fn write_tgz_with_links(path: &Path, files: &[(&str, &str, u32)], links: &[(&str, &str)]) {
  let file = fs::File::create(path).unwrap();
  let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
  for (name, content, mode) in files {
    let mut header = tar::Header::new_gnu();
    header.set_size(content.len() as u64);
    header.set_mode(*mode);
    header.set_cksum();
    builder.append_data(&mut header, name, content.as_bytes()).unwrap();
  }
  for (name, target) in links {
    let mut header = tar::Header::new_gnu();
    header.set_entry_type(tar::EntryType::Symlink);
    header.set_size(0);
    header.set_mode(0o777);
    builder.append_link(&mut header, name, target).unwrap();
  }
  builder.into_inner().unwrap().finish().unwrap();
}

/// Write an executable shell script named `name` into `dir`.
#[cfg(unix)]
pub fn fake_tool(dir: &Path, name: &str, script: &str) -> PathBuf {
  use std::os::unix::fs::PermissionsExt;

  fs::create_dir_all(dir).unwrap();
  let path = dir.join(name);
  fs::write(&path, format!("#!/bin/sh\n{}\n", script)).unwrap();
  fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
  path
}

/// Write `content` to `relative` under `root`, creating parents.
pub fn write_file(root: &Path, relative: &str, content: &str) {
  let path = root.join(relative);
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent).unwrap();
  }
  fs::write(path, content).unwrap();
}

/// All regular files under `root` as sorted `(relative path, content)` pairs.
pub fn snapshot_tree(root: &Path) -> Vec<(String, Vec<u8>)> {
  let mut files: Vec<_> = walkdir::WalkDir::new(root)
    .into_iter()
    .map(|e| e.unwrap())
    .filter(|e| e.file_type().is_file())
    .map(|e| {
      let rel = e.path().strip_prefix(root).unwrap().to_string_lossy().to_string();
      (rel, fs::read(e.path()).unwrap())
    })
    .collect();
  files.sort();
  files
}

/// A lock file with the given platforms and gem specs.
pub fn lockfile(platforms: &[&str], gems: &[&str]) -> String {
  let mut out = String::from("GEM\n  remote: http://rubygems.org/\n  specs:\n");
  for gem in gems {
    out.push_str(&format!("    {} (1.0.0)\n", gem));
  }
  out.push_str("\nPLATFORMS\n");
  for platform in platforms {
    out.push_str(&format!("  {}\n", platform));
  }
  out.push_str("\nDEPENDENCIES\n");
  for gem in gems {
    out.push_str(&format!("  {}\n", gem));
  }
  out
}
