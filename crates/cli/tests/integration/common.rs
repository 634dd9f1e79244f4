//! Shared test helpers for CLI integration tests.

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use flate2::Compression;
use flate2::write::GzEncoder;
use tempfile::TempDir;

/// A lock file without Windows platforms.
pub const LOCKFILE: &str = "\
GEM
  remote: http://rubygems.org/
  specs:
    jake (1.1.1)
    rack (1.4.0)

PLATFORMS
  ruby

DEPENDENCIES
  jake
  rack
";

/// Isolated test environment.
///
/// Holds a build directory, an artifact mirror served from disk and stand-in
/// `git` and `bundle` programs that record their invocations.
pub struct TestEnv {
  pub temp: TempDir,
}

impl TestEnv {
  pub fn new() -> Self {
    let env = Self {
      temp: TempDir::new().unwrap(),
    };
    fs::create_dir_all(env.build_path()).unwrap();
    fs::create_dir_all(env.mirror_path()).unwrap();
    env.add_archive("bundler-1.1.rc", &[("bin/bundle", "#!/bin/sh\n")]);
    env.add_archive("libyaml-0.1.4", &[("include/yaml.h", ""), ("lib/libyaml.a", "")]);
    env.add_document("ruby_versions.yml", "- ruby-1.9.2-p290\n- ruby-1.9.3-p0\n");
    env
  }

  pub fn build_path(&self) -> PathBuf {
    self.temp.path().join("build")
  }

  pub fn cache_path(&self) -> PathBuf {
    self.temp.path().join("cache")
  }

  pub fn mirror_path(&self) -> PathBuf {
    self.temp.path().join("mirror")
  }

  pub fn log_path(&self) -> PathBuf {
    self.temp.path().join("calls.log")
  }

  /// Invocations recorded by the stand-in tools.
  pub fn calls(&self) -> String {
    fs::read_to_string(self.log_path()).unwrap_or_default()
  }

  /// Write a file relative to the build directory.
  pub fn write_build_file(&self, relative_path: &str, content: &str) {
    write(&self.build_path().join(relative_path), content);
  }

  pub fn add_archive(&self, name: &str, files: &[(&str, &str)]) {
    let file = fs::File::create(self.mirror_path().join(format!("{}.tgz", name))).unwrap();
    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
    for (path, content) in files {
      let mut header = tar::Header::new_gnu();
      header.set_size(content.len() as u64);
      header.set_mode(0o644);
      header.set_cksum();
      builder.append_data(&mut header, path, content.as_bytes()).unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap();
  }

  pub fn add_document(&self, name: &str, content: &str) {
    fs::write(self.mirror_path().join(name), content).unwrap();
  }

  /// Install the stand-in tools.
  ///
  /// The fake checkout ships `lockfile` as its `Gemfile.lock` when given.
  /// `install_status` is the exit code of `bundle install`.
  #[cfg(unix)]
  pub fn install_tools(&self, lockfile: Option<&str>, install_status: i32) {
    let log = self.log_path().display().to_string();

    let mut git = format!(
      "echo \"git $@ GIT_DIR=${{GIT_DIR:-unset}}\" >> \"{log}\"\nmkdir -p source\necho js > source/nes.js\necho gems > Gemfile"
    );
    if let Some(lock) = lockfile {
      let fixture = self.temp.path().join("fixture.lock");
      fs::write(&fixture, lock).unwrap();
      git.push_str(&format!("\ncp \"{}\" Gemfile.lock", fixture.display()));
    }
    self.write_tool("git", &git);

    self.write_tool(
      "bundle",
      &format!(
        r#"echo "bundle $@" >> "{log}"
case "$1" in
  version) echo "Bundler version 1.1.rc" ;;
  install) mkdir -p vendor/bundle; echo gem > vendor/bundle/gem.rb; exit {install_status} ;;
esac"#
      ),
    );
  }

  #[cfg(unix)]
  fn write_tool(&self, name: &str, script: &str) {
    use std::os::unix::fs::PermissionsExt;

    let path = self.tool_path(name);
    write(&path, &format!("#!/bin/sh\n{}\n", script));
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
  }

  pub fn tool_path(&self, name: &str) -> PathBuf {
    self.temp.path().join("tools").join(name)
  }

  /// A `slugpack` command wired to the mirror, the stand-in tools and an
  /// isolated scratch and cache location.
  pub fn slugpack_cmd(&self) -> Command {
    let mut cmd: Command = cargo_bin_cmd!("slugpack");
    cmd.env("SLUGPACK_VENDOR_URL", self.mirror_path());
    cmd.env("SLUGPACK_SCRATCH_DIR", self.temp.path().join("scratch"));
    cmd.env("SLUGPACK_GIT", self.tool_path("git"));
    cmd.env("SLUGPACK_BUNDLER", self.tool_path("bundle"));
    cmd.env("XDG_CACHE_HOME", self.temp.path().join("xdg-cache"));
    cmd.env_remove("RUBY_VERSION");
    cmd.env_remove("BUNDLE_WITHOUT");
    cmd.env_remove("GIT_DIR");
    cmd.env_remove("SLUGPACK_SOURCE_URL");
    cmd.env_remove("SLUGPACK_BINARIES");
    cmd
  }
}

fn write(path: &Path, content: &str) {
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent).unwrap();
  }
  fs::write(path, content).unwrap();
}
