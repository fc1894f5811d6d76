// src/pipeline.rs - Particle generation loop: sample targets, search shapes, collect results

use std::f64::consts::PI;
use std::path::{Path, PathBuf};
use std::time::Instant;

use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::config::{Config, SwarmConfig};
use crate::distribution::{InputDistributions, ParticleHistograms};
use crate::errors::Result;
use crate::output::{write_info_csv, write_particles_csv, write_spheres_csv, ParticleRecord};
use crate::shape_analysis::{extract, scale_for_ce_diameter, ShapeDescriptors};
use crate::swarm::search;

/// Stop file is polled every this many particles
const STOP_CHECK_PERIOD: usize = 10;

/// Result of one worker's generation run
#[derive(Debug, Clone)]
pub struct GenerationSummary {
    pub worker: usize,
    /// Number of particles written
    pub generated: usize,
    pub total_area_um2: f64,
    /// True when the stop file ended the run early
    pub stopped: bool,
    pub histograms: ParticleHistograms,
    pub data_path: PathBuf,
    pub info_path: PathBuf,
}

/// Format seconds as HH:MM:SS
pub fn format_duration(seconds: u64) -> String {
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}

/// Smoothed remaining-time estimate
fn smooth_eta(previous: u64, estimate: f64) -> u64 {
    ((8.0 * previous as f64 + 2.0 * estimate) / 10.0).round().max(0.0) as u64
}

/// Generate one particle: sample targets, search a matching shape and
/// rescale it to the sampled CE diameter.
pub fn generate_particle<R: Rng>(
    index: usize,
    swarm: &SwarmConfig,
    distributions: &InputDistributions,
    rng: &mut R,
) -> Result<(ParticleRecord, ShapeDescriptors)> {
    let (target_ce_diameter, target) = distributions.sample_target(rng);

    let result = search(&target, swarm, rng)?;

    // Two passes: measure the area at unit scale, then extract at the scale
    // that gives the sampled CE diameter
    let unit = extract(1.0, &result.best_position)?;
    let scale = scale_for_ce_diameter(unit.area_pixels, target_ce_diameter);
    let descriptors = extract(scale, &result.best_position)?;

    debug!(
        "Particle {}: target ({:.3}, {:.3}, {:.3}) -> cost {:.5} after {} iterations",
        index, target.circularity, target.convexity, target.elongation, result.best_cost, result.iterations
    );

    let record = ParticleRecord {
        index,
        scale,
        best_cost: result.best_cost,
        iterations: result.iterations,
        offsets: result.best_position,
    };

    Ok((record, descriptors))
}

/// Split `total` particles over at most `workers` workers: each gets
/// `total / workers` and the last one also takes the remainder. The number of
/// workers is capped at `total`.
pub fn worker_shares(total: usize, workers: usize) -> Vec<usize> {
    let workers = workers.min(total);
    if workers == 0 {
        return Vec::new();
    }

    let share = total / workers;
    let mut shares = vec![share; workers];
    shares[workers - 1] += total - share * workers;
    shares
}

/// Generate `particles_num` particles for one worker and write its data and
/// info files into `output_dir`.
///
/// The stop file is checked before every tenth particle; when it exists the
/// run ends early and the particles generated so far are still written.
/// With `only_spherical` set only the CE diameter is sampled and no shape is
/// searched.
pub fn generate_particles<R: Rng>(
    worker: usize,
    particles_num: usize,
    config: &Config,
    distributions: &InputDistributions,
    rng: &mut R,
    output_dir: &Path,
) -> Result<GenerationSummary> {
    config.validate_run_settings()?;

    let stop_file = Path::new(&config.stop_file);

    let mut histograms = ParticleHistograms::new(distributions);
    let mut records: Vec<ParticleRecord> = Vec::new();
    let mut spheres: Vec<f64> = Vec::new();
    let mut total_area_um2 = 0.0;
    let mut stopped = false;

    let start_time = Instant::now();
    let mut checkpoint = Instant::now();
    let mut eta_seconds: u64 = 0;

    for i in 0..particles_num {
        if i % STOP_CHECK_PERIOD == 0 && stop_file.exists() {
            warn!("Worker {}: stop file {} found, generation stopped", worker, stop_file.display());
            stopped = true;
            break;
        }

        if i % config.progress_every == 0 && i > 0 {
            let delta = checkpoint.elapsed().as_secs_f64();
            checkpoint = Instant::now();
            let estimate = (particles_num - i - 1) as f64 / config.progress_every as f64 * delta;
            eta_seconds = smooth_eta(eta_seconds, estimate);
        }

        let descriptors = if config.only_spherical {
            let ce_diameter = distributions.ce_diameter.sample(rng);
            histograms.ce_diameter.record(ce_diameter);
            total_area_um2 += PI * ce_diameter * ce_diameter / 4.0;
            spheres.push(ce_diameter);
            None
        } else {
            let (record, descriptors) = generate_particle(i, &config.swarm, distributions, rng)?;
            histograms.record(&descriptors);
            total_area_um2 += descriptors.area_um2;
            records.push(record);
            Some(descriptors)
        };

        if i % config.progress_every == 0 {
            let percent = if particles_num > 1 {
                i as f64 * 100.0 / (particles_num - 1) as f64
            } else {
                100.0
            };
            let elapsed = format_duration(start_time.elapsed().as_secs());
            let eta = format_duration(eta_seconds);
            match descriptors {
                Some(d) => info!(
                    "Worker {} particle {} {} {} | {:5.1}% | {:5.2} | {:5.2} | {:5.2} | {:5.2}",
                    worker, i, elapsed, eta, percent, d.ce_diameter, d.circularity, d.convexity, d.elongation
                ),
                None => info!(
                    "Worker {} particle {} {} {} | {:5.1}% | {:5.2}",
                    worker,
                    i,
                    elapsed,
                    eta,
                    percent,
                    spheres.last().copied().unwrap_or_default()
                ),
            }
        }
    }

    let (generated, data_path) = if config.only_spherical {
        (spheres.len(), write_spheres_csv(&spheres, output_dir, worker)?)
    } else {
        (
            records.len(),
            write_particles_csv(&records, config.swarm.n_var, output_dir, worker)?,
        )
    };
    let info_path = write_info_csv(
        generated,
        total_area_um2,
        &histograms,
        config.only_spherical,
        output_dir,
        worker,
    )?;

    info!(
        "Worker {} finished: {} particles, total area {:.1} um^2 in {}",
        worker,
        generated,
        total_area_um2,
        format_duration(start_time.elapsed().as_secs())
    );

    Ok(GenerationSummary {
        worker,
        generated,
        total_area_um2,
        stopped,
        histograms,
        data_path,
        info_path,
    })
}

fn worker_rng(seed: Option<u64>, worker: usize) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(worker as u64)),
        None => StdRng::from_entropy(),
    }
}

fn run_worker(
    worker: usize,
    particles_num: usize,
    config: &Config,
    distributions: &InputDistributions,
) -> Result<GenerationSummary> {
    let mut rng = worker_rng(config.seed, worker);
    let output_dir = PathBuf::from(&config.output_base_dir);
    generate_particles(worker, particles_num, config, distributions, &mut rng, &output_dir)
}

/// Generate `config.particles_num` particles split over `config.workers`
/// workers, each with its own output files and random stream. Workers run on
/// the rayon pool when `use_parallel` is set; every swarm search itself stays
/// sequential.
pub fn run_workers(config: &Config, distributions: &InputDistributions) -> Result<Vec<GenerationSummary>> {
    config.validate_run_settings()?;

    let shares = worker_shares(config.particles_num, config.workers);
    info!(
        "Generating {} particles on {} worker(s)",
        config.particles_num,
        shares.len()
    );

    if config.use_parallel {
        shares
            .par_iter()
            .enumerate()
            .map(|(worker, &share)| run_worker(worker, share, config, distributions))
            .collect()
    } else {
        shares
            .iter()
            .enumerate()
            .map(|(worker, &share)| run_worker(worker, share, config, distributions))
            .collect()
    }
}
