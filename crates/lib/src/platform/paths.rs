use std::path::PathBuf;

use crate::consts::APP_NAME;
use crate::env::Environment;

/// Returns the user's home directory
pub fn home_dir(env: &Environment) -> Option<PathBuf> {
  env.get("HOME").filter(|h| !h.is_empty()).map(PathBuf::from)
}

/// Returns the directory for cache files for the application
///
/// `$XDG_CACHE_HOME/slugpack`, falling back to `~/.cache/slugpack`.
pub fn cache_dir(env: &Environment) -> Option<PathBuf> {
  let cache_home = env
    .get("XDG_CACHE_HOME")
    .filter(|p| !p.is_empty())
    .map(PathBuf::from)
    .or_else(|| home_dir(env).map(|home| home.join(".cache")))?;
  Some(cache_home.join(APP_NAME))
}
