mod cmd;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use slugpack_lib::generate::ManifestFormat;
use slugpack_lib::pack::PackKind;
use tracing_subscriber::EnvFilter;

use crate::cmd::{cmd_compile, cmd_detect, cmd_release};
use crate::output::print_error;

/// slugpack - build JSNES slugs from application source trees
#[derive(Parser)]
#[command(name = "slugpack")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable debug logging
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Compile the application in BUILD_DIR into a slug
  Compile {
    /// Application source tree, modified in place
    build_dir: PathBuf,

    /// Directory persisted between builds (default: the user cache directory)
    cache_dir: Option<PathBuf>,

    /// Pack variant to use instead of the detected one (jsnes, ruby, rack)
    #[arg(long)]
    pack: Option<PackKind>,

    /// Format of the ROM manifest (html, json)
    #[arg(long, default_value_t)]
    format: ManifestFormat,
  },

  /// Print the name of the pack that applies to BUILD_DIR
  Detect {
    build_dir: PathBuf,
  },

  /// Print release metadata as YAML
  Release {
    build_dir: PathBuf,

    /// Pack variant to use instead of the detected one (jsnes, ruby, rack)
    #[arg(long)]
    pack: Option<PackKind>,
  },
}

fn main() -> ExitCode {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "info" };
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
    .with_writer(std::io::stderr)
    .with_target(false)
    .without_time()
    .init();

  let result = match cli.command {
    Commands::Compile {
      build_dir,
      cache_dir,
      pack,
      format,
    } => cmd_compile(&build_dir, cache_dir.as_deref(), pack, format),
    Commands::Detect { build_dir } => cmd_detect(&build_dir),
    Commands::Release { build_dir, pack } => cmd_release(&build_dir, pack),
  };

  match result {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      print_error(&format!("{:#}", e));
      ExitCode::FAILURE
    }
  }
}
