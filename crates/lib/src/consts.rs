//! Fixed names, paths and URLs shared across the pipeline.

pub const APP_NAME: &str = "slugpack";

/// Base URL of the remote artifact store.
pub const VENDOR_URL: &str = "https://s3.amazonaws.com/heroku-buildpack-ruby";

/// Git repository overlaid onto the build directory.
pub const JSNES_GIT_URL: &str = "https://github.com/hone/jsnes.git";

/// Catalog document listing the installable runtime versions.
pub const RUBY_VERSIONS_DOC: &str = "ruby_versions.yml";

pub const LIBYAML_VERSION: &str = "0.1.4";
pub const BUNDLER_VERSION: &str = "1.1.rc";

/// Relative path of the bundler gem tree inside the slug.
pub const SLUG_VENDOR_BASE: &str = "vendor/bundle/ruby/1.9.1";

/// Search path used by every pack, before the optional runtime prefix.
pub const DEFAULT_PATH: &str = "bin:vendor/bundle/ruby/1.9.1/bin:/usr/local/bin:/usr/bin:/bin";

pub const DEFAULT_BUNDLE_WITHOUT: &str = "development:test";

/// Directory that receives the application's own top-level entries after the overlay.
pub const LOCAL_CONTENT_DIR: &str = "local-roms";

pub const ROM_EXTENSION: &str = "nes";

pub const LOCKFILE_NAME: &str = "Gemfile.lock";
pub const GEMFILE_NAME: &str = "Gemfile";

// Environment variables read or written by the pipeline.
pub const RUBY_VERSION_VAR: &str = "RUBY_VERSION";
pub const BUNDLE_WITHOUT_VAR: &str = "BUNDLE_WITHOUT";
pub const GIT_DIR_VAR: &str = "GIT_DIR";
pub const GEM_HOME_VAR: &str = "GEM_HOME";
pub const PATH_VAR: &str = "PATH";
