#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Entry point for the airshed data preparation pipeline.
//!
//! There is deliberately no CLI surface beyond "run the whole pipeline":
//! every step skips work whose output already exists, so re-running after
//! a partial failure only redoes what is missing. `RUST_LOG` controls
//! verbosity.

mod pipeline;

use pipeline::PipelineConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();

    let config = PipelineConfig::default();
    pipeline::run(&config).await
}
