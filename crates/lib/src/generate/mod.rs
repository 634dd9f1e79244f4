//! Manifest of the application's ROMs.
//!
//! After the overlay the application's files live under `local-roms/`. Every
//! `.nes` file found there becomes one entry, rendered either into the
//! emulator page or into a JSON list.

mod template;

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::consts::{LOCAL_CONTENT_DIR, ROM_EXTENSION};

#[derive(Debug, Error)]
pub enum GenerateError {
  #[error("failed to scan '{path}'")]
  Scan {
    path: PathBuf,
    #[source]
    source: walkdir::Error,
  },

  #[error("failed to serialize the ROM list")]
  Serialize(#[from] serde_json::Error),

  #[error("failed to write '{path}'")]
  Write {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// Output format of the manifest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ManifestFormat {
  /// The emulator page, `index.html`.
  #[default]
  Html,
  /// A plain list, `roms.json`.
  Json,
}

impl ManifestFormat {
  pub fn file_name(self) -> &'static str {
    match self {
      ManifestFormat::Html => "index.html",
      ManifestFormat::Json => "roms.json",
    }
  }
}

impl fmt::Display for ManifestFormat {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ManifestFormat::Html => write!(f, "html"),
      ManifestFormat::Json => write!(f, "json"),
    }
  }
}

impl FromStr for ManifestFormat {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "html" => Ok(ManifestFormat::Html),
      "json" => Ok(ManifestFormat::Json),
      other => Err(format!("unknown manifest format '{}' (expected html or json)", other)),
    }
  }
}

/// One ROM: display name and path relative to the build directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RomEntry {
  pub name: String,
  pub path: String,
}

/// Collect every ROM under `<build_dir>/local-roms`, sorted by path.
///
/// A missing directory yields an empty list.
pub fn scan(build_dir: &Path) -> Result<Vec<RomEntry>, GenerateError> {
  let root = build_dir.join(LOCAL_CONTENT_DIR);
  if !root.is_dir() {
    return Ok(Vec::new());
  }

  let mut entries = Vec::new();
  for entry in WalkDir::new(&root).sort_by_file_name() {
    let entry = entry.map_err(|source| GenerateError::Scan {
      path: root.clone(),
      source,
    })?;
    let path = entry.path();
    if !entry.file_type().is_file() || path.extension().is_none_or(|ext| ext != ROM_EXTENSION) {
      continue;
    }

    let Some(name) = path.file_stem() else { continue };
    let Ok(relative) = path.strip_prefix(build_dir) else { continue };
    let relative = relative
      .components()
      .map(|c| c.as_os_str().to_string_lossy())
      .collect::<Vec<_>>()
      .join("/");

    entries.push(RomEntry {
      name: name.to_string_lossy().to_string(),
      path: relative,
    });
  }

  debug!(count = entries.len(), "scanned local roms");
  Ok(entries)
}

fn quote(s: &str) -> String {
  s.replace('\\', "\\\\").replace('\'', "\\'")
}

/// The emulator page with `entries` in its local ROM list.
pub fn render_html(entries: &[RomEntry]) -> String {
  let list = entries
    .iter()
    .map(|e| format!("['{}', '{}']", quote(&e.name), quote(&e.path)))
    .collect::<Vec<_>>()
    .join(",\n");

  let mut page = String::with_capacity(template::PAGE_HEAD.len() + list.len() + template::PAGE_TAIL.len() + 1);
  page.push_str(template::PAGE_HEAD);
  page.push_str(&list);
  page.push('\n');
  page.push_str(template::PAGE_TAIL);
  page
}

pub fn render_json(entries: &[RomEntry]) -> Result<String, GenerateError> {
  let mut json = serde_json::to_string_pretty(entries)?;
  json.push('\n');
  Ok(json)
}

/// Scan, render and write the manifest. Returns the written path.
pub fn write_manifest(build_dir: &Path, format: ManifestFormat) -> Result<PathBuf, GenerateError> {
  let entries = scan(build_dir)?;
  let content = match format {
    ManifestFormat::Html => render_html(&entries),
    ManifestFormat::Json => render_json(&entries)?,
  };

  let path = build_dir.join(format.file_name());
  info!("Writing {}", format.file_name());
  std::fs::write(&path, content).map_err(|source| GenerateError::Write {
    path: path.clone(),
    source,
  })?;
  Ok(path)
}
