//! Compile command integration tests.
#![cfg(unix)]

use predicates::prelude::*;

use super::common::{LOCKFILE, TestEnv};

fn app_with_roms() -> TestEnv {
  let env = TestEnv::new();
  env.write_build_file("a.nes", "rom a");
  env.write_build_file("sub/b.nes", "rom b");
  env.write_build_file("README", "readme");
  env
}

#[test]
fn compile_writes_index_html() {
  let env = app_with_roms();
  env.install_tools(Some(LOCKFILE), 0);

  env
    .slugpack_cmd()
    .env("GIT_DIR", "/elsewhere/.git")
    .arg("compile")
    .arg(env.build_path())
    .arg(env.cache_path())
    .assert()
    .success()
    .stdout(predicate::str::contains("Compiled in"))
    .stdout(predicate::str::contains("index.html"));

  let index = std::fs::read_to_string(env.build_path().join("index.html")).unwrap();
  assert!(index.contains("['a', 'local-roms/a.nes'],\n['b', 'local-roms/sub/b.nes']"));
  assert!(env.build_path().join("local-roms/README").exists());
  assert!(env.build_path().join("source/nes.js").exists());
  assert!(env.cache_path().join("vendor/bundle/gem.rb").exists());

  let calls = env.calls();
  assert!(calls.contains("GIT_DIR=unset"));
  assert!(calls.contains("bundle install --without development:test --path vendor/bundle --deployment --no-clean"));
  assert!(calls.contains("bundle exec jake"));
}

#[test]
fn compile_json_format_writes_rom_list() {
  let env = app_with_roms();
  env.install_tools(Some(LOCKFILE), 0);

  env
    .slugpack_cmd()
    .args(["compile", "--format", "json"])
    .arg(env.build_path())
    .arg(env.cache_path())
    .assert()
    .success();

  let json = std::fs::read_to_string(env.build_path().join("roms.json")).unwrap();
  assert!(json.contains("\"name\": \"a\""));
  assert!(json.contains("\"path\": \"local-roms/sub/b.nes\""));
  assert!(!env.build_path().join("index.html").exists());
}

#[test]
fn compile_without_lock_file_fails() {
  let env = app_with_roms();
  env.install_tools(None, 0);

  env
    .slugpack_cmd()
    .arg("compile")
    .arg(env.build_path())
    .arg(env.cache_path())
    .assert()
    .code(1)
    .stderr(predicate::str::contains("Gemfile.lock is required"));

  assert!(!env.calls().contains("bundle"));
}

#[test]
fn compile_with_invalid_ruby_version_lists_valid_versions() {
  let env = app_with_roms();
  env.install_tools(Some(LOCKFILE), 0);

  env
    .slugpack_cmd()
    .env("RUBY_VERSION", "ruby-0.0.1")
    .arg("compile")
    .arg(env.build_path())
    .arg(env.cache_path())
    .assert()
    .code(1)
    .stderr(predicate::str::contains("Invalid RUBY_VERSION specified: ruby-0.0.1"))
    .stderr(predicate::str::contains("Valid versions: ruby-1.9.2-p290, ruby-1.9.3-p0"));

  assert!(env.calls().is_empty());
  assert!(env.build_path().join("a.nes").exists());
}

#[test]
fn compile_installs_requested_runtime() {
  let env = app_with_roms();
  env.install_tools(Some(LOCKFILE), 0);
  env.add_archive("ruby-build-1.9.3-p0", &[("bin/ruby", "#!/bin/sh\n")]);
  env.add_archive("ruby-1.9.3-p0", &[("bin/ruby", "#!/bin/sh\n"), ("bin/gem", "#!/bin/sh\n")]);

  env
    .slugpack_cmd()
    .env("RUBY_VERSION", "ruby-1.9.3-p0")
    .arg("compile")
    .arg(env.build_path())
    .arg(env.cache_path())
    .assert()
    .success()
    .stdout(predicate::str::contains("Runtime: ruby-1.9.3-p0"))
    .stderr(predicate::str::contains("Using RUBY_VERSION: ruby-1.9.3-p0"));

  // The runtime lands before the overlay, so it moves along with the app.
  let local = env.build_path().join("local-roms");
  assert!(local.join("bin/ruby").exists());
  assert!(local.join("bin/gem").exists());
  assert!(local.join("vendor/ruby-1.9.3-p0/bin/ruby").exists());
  assert!(env.temp.path().join("scratch/ruby-1.9.3-p0/bin/ruby").exists());
}

#[test]
fn compile_with_windows_lock_drops_deployment() {
  let env = app_with_roms();
  env.install_tools(Some(&LOCKFILE.replace("  ruby\n", "  x86-mingw32\n")), 0);

  env
    .slugpack_cmd()
    .arg("compile")
    .arg(env.build_path())
    .arg(env.cache_path())
    .assert()
    .success();

  let calls = env.calls();
  assert!(calls.contains("bundle install"));
  assert!(!calls.contains("--deployment"));
  assert!(!env.build_path().join("Gemfile.lock").exists());
}

#[test]
fn failed_install_mentions_sqlite3() {
  let env = app_with_roms();
  env.install_tools(Some(&LOCKFILE.replace("    rack (1.4.0)\n", "    rack (1.4.0)\n    sqlite3 (1.3.5)\n")), 5);

  env
    .slugpack_cmd()
    .arg("compile")
    .arg(env.build_path())
    .arg(env.cache_path())
    .assert()
    .code(1)
    .stderr(predicate::str::contains("Failed to install gems via Bundler."))
    .stderr(predicate::str::contains("Detected sqlite3 gem which is not supported on Heroku."));

  assert!(!env.calls().contains("bundle exec jake"));
}

#[test]
fn compile_defaults_to_user_cache_dir() {
  let env = app_with_roms();
  env.install_tools(Some(LOCKFILE), 0);

  env
    .slugpack_cmd()
    .arg("compile")
    .arg(env.build_path())
    .assert()
    .success();

  assert!(env.temp.path().join("xdg-cache/slugpack/vendor/bundle/gem.rb").exists());
}
