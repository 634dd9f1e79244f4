//! Pack variants, detection and the release document.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::Serialize;

use crate::consts::{DEFAULT_PATH, GEMFILE_NAME, SLUG_VENDOR_BASE};

/// Variants checked by [`detect`], in order.
const DETECTION_ORDER: [PackKind; 1] = [PackKind::Jsnes];

/// Which flavour of build to run.
///
/// Every variant runs the same stages. They differ in environment defaults,
/// process types and whether the ROM manifest is written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PackKind {
  /// The emulator build.
  #[default]
  Jsnes,
  /// A plain Ruby application.
  Ruby,
  /// A Rack application.
  Rack,
}

impl PackKind {
  pub fn name(self) -> &'static str {
    match self {
      PackKind::Jsnes => "JSNES",
      PackKind::Ruby => "Ruby",
      PackKind::Rack => "Rack",
    }
  }

  /// Whether this variant applies to the application in `build_dir`.
  pub fn matches(self, build_dir: &Path) -> bool {
    match self {
      PackKind::Jsnes | PackKind::Rack => true,
      PackKind::Ruby => build_dir.join(GEMFILE_NAME).exists(),
    }
  }

  pub fn generates_manifest(self) -> bool {
    matches!(self, PackKind::Jsnes)
  }

  /// Variables written into the build environment unless already set, and
  /// reported as config vars on release.
  pub fn default_config_vars(self) -> BTreeMap<String, String> {
    let mut vars = BTreeMap::from([
      ("LANG".to_string(), "en_US.UTF-8".to_string()),
      ("PATH".to_string(), DEFAULT_PATH.to_string()),
      ("GEM_PATH".to_string(), SLUG_VENDOR_BASE.to_string()),
    ]);
    if matches!(self, PackKind::Jsnes | PackKind::Rack) {
      vars.insert("RACK_ENV".to_string(), "production".to_string());
    }
    vars
  }

  pub fn default_process_types(self) -> BTreeMap<String, String> {
    let mut types = BTreeMap::new();
    if matches!(self, PackKind::Ruby | PackKind::Rack) {
      types.insert("rake".to_string(), "bundle exec rake".to_string());
      types.insert("console".to_string(), "bundle exec irb".to_string());
    }
    if matches!(self, PackKind::Jsnes | PackKind::Rack) {
      types.insert("web".to_string(), "bundle exec rackup config.ru -p $PORT".to_string());
    }
    types
  }

  pub fn release(self) -> Release {
    Release {
      addons: Vec::new(),
      config_vars: self.default_config_vars(),
      default_process_types: self.default_process_types(),
    }
  }
}

impl fmt::Display for PackKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

impl FromStr for PackKind {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "jsnes" => Ok(PackKind::Jsnes),
      "ruby" => Ok(PackKind::Ruby),
      "rack" => Ok(PackKind::Rack),
      other => Err(format!("unknown pack '{}' (expected jsnes, ruby or rack)", other)),
    }
  }
}

/// The first variant that matches `build_dir`.
pub fn detect(build_dir: &Path) -> Option<PackKind> {
  DETECTION_ORDER.into_iter().find(|kind| kind.matches(build_dir))
}

/// Metadata handed to the platform after a build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Release {
  pub addons: Vec<String>,
  pub config_vars: BTreeMap<String, String>,
  pub default_process_types: BTreeMap<String, String>,
}

impl Release {
  pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
    serde_yaml::to_string(self)
  }
}
