//! `arraysense`: fuse per-node CSI captures into one array tensor.
//!
//! ## Usage
//!
//! ```bash
//! # Run with a config file
//! arraysense --config config/arraysense.toml
//!
//! # Keep raw frames and timestamps in the artifact
//! arraysense --config config/arraysense.toml --full
//!
//! # Tighter coincidence window, no artifact written
//! ARRAYSENSE__PROCESSING__TIMESTAMP_TOLERANCE=20000 arraysense -c config/arraysense.toml --dry-run
//!
//! # Save the built-in two-AX210 configuration as a JSON config file
//! arraysense --print-default > arraysense.json
//! arraysense --config arraysense.json
//! ```

mod config;
mod logging;
mod output;

use std::path::PathBuf;

use clap::Parser;

use arraysense_csi::{ArrayFusion, ArtifactWriter, FusionArtifact, OutputMode, StreamLoader};

use crate::config::FusionConfig;
use crate::output::JsonArtifactWriter;

#[derive(Parser, Debug)]
#[command(
    name = "arraysense",
    version,
    about = "Fuse distributed CSI captures into one array tensor"
)]
struct Args {
    /// Configuration file (toml, json or yaml)
    #[arg(short, long, default_value = "config/arraysense.toml")]
    config: String,

    /// Override the artifact path
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Write per-node counts, sources, raw frames and timestamps as well
    #[arg(long)]
    full: bool,

    /// Run the fusion but do not write the artifact
    #[arg(long)]
    dry_run: bool,

    /// Print the default configuration as JSON and exit
    ///
    /// The output is itself a valid `--config` file (format picked by the
    /// `.json` extension).
    #[arg(long)]
    print_default: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    if args.print_default {
        println!("{}", FusionConfig::default().to_json()?);
        return Ok(());
    }

    let mut config = FusionConfig::from_file(&args.config)?;
    if let Some(path) = args.output {
        config.output.path = path;
    }
    if args.full {
        config.output.mode = OutputMode::Full;
    }

    logging::init_logging(&config.logging);
    tracing::info!("Starting arraysense v{}", env!("CARGO_PKG_VERSION"));

    let fusion = ArrayFusion::new(config.registry(), config.processing.timestamp_tolerance)?;
    tracing::debug!(
        nodes = fusion.registry().node_count(),
        tolerance = fusion.tolerance(),
        "Geometry registry validated"
    );
    let sources = config.sources();
    let streams = StreamLoader::new(fusion.registry()).load(&sources).await?;

    let output = fusion.run(&streams)?;
    tracing::info!(
        snapshots = output.snapshot_count(),
        shape = ?output.tensor.dim(),
        "Output matrix (numTX, numRX, numSubcarriers, numSnapshots)"
    );

    if args.dry_run {
        tracing::info!("Dry run, artifact not written");
        return Ok(());
    }

    let writer = JsonArtifactWriter::new(&config.output.path);
    let artifact = FusionArtifact::new(&output, fusion.registry(), &streams, config.output.mode);
    writer.write(&artifact)?;
    tracing::info!(mode = ?config.output.mode, "Saved to {}", writer.path().display());

    Ok(())
}
