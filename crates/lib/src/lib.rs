//! slugpack-lib: build pipeline for JSNES slugs
//!
//! This crate turns an application source tree into a deployable slug:
//! - `env`: the pipeline's explicit environment and its composer
//! - `runtime`: Ruby version resolution and installation
//! - `bundler`: driving Bundler against the application's lock file
//! - `overlay`: merging the JSNES repository over the application
//! - `generate`: the ROM manifest consumed by the emulator page
//! - `pack`: pack variants, detection and release metadata
//! - `pipeline`: the fixed stage order tying it all together

pub mod bundler;
pub mod cache;
pub mod config;
pub mod consts;
pub mod context;
pub mod env;
pub mod fetch;
pub mod generate;
pub mod lockfile;
pub mod overlay;
pub mod pack;
pub mod pipeline;
pub mod platform;
pub mod process;
pub mod runtime;
pub mod util;
pub mod vendor;

pub use context::BuildContext;
pub use pipeline::{CompileResult, Pipeline, PipelineError, run};
