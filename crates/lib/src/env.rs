//! The pipeline environment.
//!
//! Every stage reads variables from, and spawns subprocesses with, an explicit
//! [`Environment`] value rather than the process environment. The value is
//! snapshotted once at start-up; subprocesses are started with a cleared
//! environment plus exactly these variables.
//!
//! # Scoped mutation
//!
//! Some stages must run with a variable temporarily removed (`GIT_DIR` around
//! the git-sensitive stages). [`without_var`] returns a guard that removes the
//! variable and puts the saved value back when it is dropped, so the value is
//! restored on early returns as well.

use std::collections::BTreeMap;
use std::ops::{Deref, DerefMut};
use std::path::Path;

use tracing::debug;

use crate::consts::{DEFAULT_PATH, GEM_HOME_VAR, PATH_VAR, SLUG_VENDOR_BASE};

/// An ordered map of environment variables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
  vars: BTreeMap<String, String>,
}

impl Environment {
  pub fn new() -> Self {
    Self::default()
  }

  /// Snapshot the current process environment.
  ///
  /// Variables whose name or value is not valid UTF-8 are skipped.
  pub fn from_process() -> Self {
    std::env::vars_os()
      .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
      .collect()
  }

  pub fn get(&self, key: &str) -> Option<&str> {
    self.vars.get(key).map(String::as_str)
  }

  pub fn contains(&self, key: &str) -> bool {
    self.vars.contains_key(key)
  }

  pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
    self.vars.insert(key.into(), value.into());
  }

  /// Set `key` only if it is not already present.
  ///
  /// Returns `true` if the value was written.
  pub fn set_default(&mut self, key: impl Into<String>, value: impl Into<String>) -> bool {
    let key = key.into();
    if self.vars.contains_key(&key) {
      return false;
    }
    self.vars.insert(key, value.into());
    true
  }

  pub fn remove(&mut self, key: &str) -> Option<String> {
    self.vars.remove(key)
  }

  /// Returns `prefix` joined in front of the current value of `key` with `:`.
  ///
  /// An unset or empty current value yields `prefix` alone.
  pub fn prefixed(&self, key: &str, prefix: &str) -> String {
    match self.get(key) {
      Some(existing) if !existing.is_empty() => format!("{}:{}", prefix, existing),
      _ => prefix.to_string(),
    }
  }

  /// A copy of this environment with `overlay` written on top.
  pub fn overlaid<'a>(&self, overlay: impl IntoIterator<Item = (&'a str, String)>) -> Environment {
    let mut merged = self.clone();
    for (key, value) in overlay {
      merged.set(key, value);
    }
    merged
  }

  /// Replace a command's environment with exactly these variables.
  pub fn apply_to(&self, command: &mut tokio::process::Command) {
    command.env_clear().envs(&self.vars);
  }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Environment {
  fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
    Self {
      vars: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
    }
  }
}

impl AsMut<Environment> for Environment {
  fn as_mut(&mut self) -> &mut Environment {
    self
  }
}

/// Guard returned by [`without_var`].
///
/// Dereferences to the wrapped value so stages can keep using it while the
/// variable is absent.
pub struct ScopedUnset<'a, T: AsMut<Environment>> {
  target: &'a mut T,
  key: String,
  saved: Option<String>,
}

/// Remove `key` from the environment of `target` until the guard is dropped.
pub fn without_var<'a, T: AsMut<Environment>>(target: &'a mut T, key: &str) -> ScopedUnset<'a, T> {
  let saved = target.as_mut().remove(key);
  debug!(key, was_set = saved.is_some(), "unset for scope");
  ScopedUnset {
    target,
    key: key.to_string(),
    saved,
  }
}

impl<T: AsMut<Environment>> Deref for ScopedUnset<'_, T> {
  type Target = T;

  fn deref(&self) -> &T {
    self.target
  }
}

impl<T: AsMut<Environment>> DerefMut for ScopedUnset<'_, T> {
  fn deref_mut(&mut self) -> &mut T {
    self.target
  }
}

impl<T: AsMut<Environment>> Drop for ScopedUnset<'_, T> {
  fn drop(&mut self) {
    let env = self.target.as_mut();
    match self.saved.take() {
      Some(value) => env.set(self.key.clone(), value),
      None => {
        env.remove(&self.key);
      }
    }
    debug!(key = %self.key, "restored after scope");
  }
}

/// Compose the build environment.
///
/// Each default is written only if the variable is unset, so user supplied
/// values win. `GEM_HOME` and `PATH` are always overwritten; `PATH` becomes the
/// default search path, prefixed with `runtime_bin` when a runtime was
/// requested.
pub fn compose(env: &mut Environment, defaults: &BTreeMap<String, String>, runtime_bin: Option<&Path>) {
  for (key, value) in defaults {
    if env.set_default(key.as_str(), value.as_str()) {
      debug!(key = %key, "applied default");
    }
  }

  env.set(GEM_HOME_VAR, SLUG_VENDOR_BASE);

  let default_path = defaults.get(PATH_VAR).map(String::as_str).unwrap_or(DEFAULT_PATH);
  let path = match runtime_bin {
    Some(bin) => format!("{}:{}", bin.display(), default_path),
    None => default_path.to_string(),
  };
  env.set(PATH_VAR, path);
}
