//! Minimal `Gemfile.lock` reader.
//!
//! Only the two facts the pipeline acts on are extracted: the declared
//! platforms and the names of the locked gems. Everything else in the file is
//! ignored.
//!
//! ```text
//! GEM
//!   remote: http://rubygems.org/
//!   specs:
//!     rack (1.4.0)          <- gem name at four spaces of indent
//!       dep (>= 0)          <- dependency lines are deeper, skipped
//!
//! PLATFORMS
//!   x86-mingw32             <- platform at two spaces of indent
//! ```

use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
#[error("failed to read lock file '{path}'")]
pub struct LockFileError {
  pub path: PathBuf,
  #[source]
  pub source: io::Error,
}

/// Platforms and gem names declared in a lock file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LockFile {
  platforms: Vec<String>,
  specs: BTreeSet<String>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
  Specs,
  Platforms,
  Other,
}

impl LockFile {
  pub fn read(path: &Path) -> Result<Self, LockFileError> {
    let content = std::fs::read_to_string(path).map_err(|source| LockFileError {
      path: path.to_path_buf(),
      source,
    })?;
    Ok(Self::parse(&content))
  }

  pub fn parse(content: &str) -> Self {
    let mut lock = LockFile::default();
    let mut section = Section::Other;
    let mut in_source = false;

    for raw in content.lines() {
      let line = raw.trim_end();
      if line.is_empty() {
        continue;
      }

      let indent = line.len() - line.trim_start().len();
      let text = line.trim_start();

      match indent {
        0 => {
          in_source = matches!(text, "GEM" | "GIT" | "PATH");
          section = if text == "PLATFORMS" { Section::Platforms } else { Section::Other };
        }
        2 if in_source => {
          section = if text == "specs:" { Section::Specs } else { Section::Other };
        }
        2 if section == Section::Platforms => lock.platforms.push(text.to_string()),
        4 if section == Section::Specs => {
          let name = text.split_whitespace().next().unwrap_or(text);
          lock.specs.insert(name.to_string());
        }
        _ => {}
      }
    }

    lock
  }

  pub fn platforms(&self) -> &[String] {
    &self.platforms
  }

  pub fn specs(&self) -> impl Iterator<Item = &str> {
    self.specs.iter().map(String::as_str)
  }

  /// Whether the lock was generated on Windows.
  ///
  /// Platforms such as `x86-mingw32` or `mswin32` cannot be honoured by a
  /// strict install on this platform.
  pub fn has_windows_platform(&self) -> bool {
    self.platforms.iter().any(|p| is_windows_platform(p))
  }

  pub fn is_bundled(&self, gem: &str) -> bool {
    self.specs.contains(gem)
  }
}

fn is_windows_platform(platform: &str) -> bool {
  if platform == "ruby" {
    return false;
  }
  platform.split('-').any(|part| part.contains("mingw") || part.contains("mswin"))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::util::testutil::lockfile;

  const GIT_AND_GEM: &str = "\
GIT
  remote: git://github.com/hone/jake.git
  revision: abc123
  specs:
    jake (1.1.1)
      eventful (>= 1.0.2)

GEM
  remote: http://rubygems.org/
  specs:
    eventful (1.0.2)
      methodphitamine
    rack (1.4.0)
    sqlite3 (1.3.5)
    sqlite3 (1.3.5-x86-mingw32)

PLATFORMS
  ruby
  x86-mingw32

DEPENDENCIES
  jake!
  rack
";

  #[test]
  fn parses_platforms_and_specs() {
    let lock = LockFile::parse(GIT_AND_GEM);

    assert_eq!(lock.platforms(), &["ruby".to_string(), "x86-mingw32".to_string()]);
    assert_eq!(lock.specs().collect::<Vec<_>>(), vec!["eventful", "jake", "rack", "sqlite3"]);
  }

  #[test]
  fn dependency_lines_are_not_specs() {
    let lock = LockFile::parse(GIT_AND_GEM);
    assert!(!lock.is_bundled("methodphitamine"));
    assert!(!lock.is_bundled("remote:"));
  }

  #[test]
  fn detects_windows_platforms() {
    assert!(LockFile::parse(&lockfile(&["x86-mingw32"], &[])).has_windows_platform());
    assert!(LockFile::parse(&lockfile(&["mswin32"], &[])).has_windows_platform());
    assert!(LockFile::parse(&lockfile(&["ruby", "x64-mingw32"], &[])).has_windows_platform());
  }

  #[test]
  fn ruby_and_unix_platforms_are_compatible() {
    assert!(!LockFile::parse(&lockfile(&["ruby"], &["rack"])).has_windows_platform());
    assert!(!LockFile::parse(&lockfile(&["x86_64-linux", "universal-darwin-11"], &[])).has_windows_platform());
  }

  #[test]
  fn empty_lock_has_nothing() {
    let lock = LockFile::parse("");
    assert!(lock.platforms().is_empty());
    assert_eq!(lock.specs().count(), 0);
  }

  #[test]
  fn read_missing_file_fails() {
    let result = LockFile::read(Path::new("/nonexistent/Gemfile.lock"));
    assert!(result.is_err());
  }
}
