use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use log::{info, warn};

use particle_shape_rust_lib::config::Config;
use particle_shape_rust_lib::distribution::InputDistributions;
use particle_shape_rust_lib::output::describe_json;
use particle_shape_rust_lib::pipeline::run_workers;
use particle_shape_rust_lib::shape_analysis::extract;

/// Command-line arguments
#[derive(Parser, Debug)]
#[clap(author, version, about = "Particle shape generator - inverse design of particle outlines")]
struct Args {
    /// Path to configuration file
    #[clap(short, long, default_value = "config.toml")]
    config: String,

    /// Path to the distribution table (overwrites config)
    #[clap(short, long)]
    input: Option<String>,

    /// Path to output directory (overwrites config)
    #[clap(short, long)]
    output: Option<String>,

    /// Total number of particles, split over the workers (overwrites config)
    #[clap(short, long)]
    particles: Option<usize>,

    /// Number of workers (overwrites config)
    #[clap(short, long)]
    workers: Option<usize>,

    /// Generate circles only, sampling just the CE diameter
    #[clap(long)]
    only_spherical: bool,

    /// Base random seed (overwrites config)
    #[clap(short, long)]
    seed: Option<u64>,

    /// Print the descriptors of a comma-separated offset vector and exit
    #[clap(long, value_delimiter = ',', allow_hyphen_values = true)]
    describe: Option<Vec<f64>>,

    /// Image scale (um/pix) used with --describe
    #[clap(long, default_value_t = 1.0)]
    scale: f64,

    /// Write a configuration file with default values and exit
    #[clap(long)]
    write_default_config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    if let Some(path) = &args.write_default_config {
        Config::default()
            .save_to_file(path)
            .with_context(|| format!("writing default configuration to {}", path.display()))?;
        info!("Default configuration written to {}", path.display());
        return Ok(());
    }

    if let Some(offsets) = &args.describe {
        let descriptors = extract(args.scale, offsets).context("describing offset vector")?;
        println!("{}", describe_json(&descriptors)?);
        return Ok(());
    }

    // Load configuration
    let mut config = Config::from_file(&args.config)?;

    // Override config with command-line arguments
    if let Some(input) = args.input {
        config.input_path = input;
    }
    if let Some(output) = args.output {
        config.output_base_dir = output;
    }
    if let Some(particles) = args.particles {
        config.particles_num = particles;
    }
    if let Some(workers) = args.workers {
        config.workers = workers;
    }
    if args.only_spherical {
        config.only_spherical = true;
    }
    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }

    config.validate().context("invalid configuration")?;

    let distributions = InputDistributions::from_path(&config.input_path)
        .with_context(|| format!("loading distributions from {}", config.input_path))?;

    let start_time = Instant::now();

    let summaries = run_workers(&config, &distributions)?;

    for summary in &summaries {
        if summary.stopped {
            warn!("Worker {} was stopped after {} particles", summary.worker, summary.generated);
        }
        info!(
            "Worker {}: {} particles -> {}, {}",
            summary.worker,
            summary.generated,
            summary.data_path.display(),
            summary.info_path.display()
        );
    }

    let total: usize = summaries.iter().map(|s| s.generated).sum();
    info!(
        "Generated {} particles in {:.2} seconds",
        total,
        start_time.elapsed().as_secs_f64()
    );

    Ok(())
}
