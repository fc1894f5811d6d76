// src/swarm.rs - Particle swarm search for offset vectors matching target descriptors

use log::debug;
use rand::Rng;

use crate::config::SwarmConfig;
use crate::cost::{calculate_cost, TargetDescriptors};
use crate::errors::Result;

/// Outcome of one swarm search
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    /// Best offset vector found
    pub best_position: Vec<f64>,
    pub best_cost: f64,
    /// Number of iterations performed (1-based count)
    pub iterations: usize,
    /// Global best cost after initialization and after each iteration,
    /// present when trajectory recording is enabled
    pub trajectory: Option<Vec<f64>>,
}

/// One member of the swarm
#[derive(Debug, Clone)]
struct Candidate {
    position: Vec<f64>,
    velocity: Vec<f64>,
    cost: f64,
    best_position: Vec<f64>,
    best_cost: f64,
}

/// Uniform draw in [min, max)
fn draw_uniform<R: Rng>(rng: &mut R, min: f64, max: f64) -> f64 {
    min + (max - min) * rng.gen::<f64>()
}

fn draw_position<R: Rng>(rng: &mut R, config: &SwarmConfig) -> Vec<f64> {
    (0..config.n_var)
        .map(|_| draw_uniform(rng, config.var_min, config.var_max))
        .collect()
}

/// Keep a coordinate inside the unit interval; outside it is replaced by a
/// fresh draw from `[var_min, var_max]`, never clamped
fn settle_coordinate<R: Rng>(value: f64, rng: &mut R, config: &SwarmConfig) -> f64 {
    if (0.0..=1.0).contains(&value) {
        value
    } else {
        draw_uniform(rng, config.var_min, config.var_max)
    }
}

/// Replace the stored best when `cost` is strictly lower; ties keep the old best
fn improve_best(best_position: &mut Vec<f64>, best_cost: &mut f64, position: &[f64], cost: f64) -> bool {
    if cost < *best_cost {
        *best_cost = cost;
        best_position.clear();
        best_position.extend_from_slice(position);
        true
    } else {
        false
    }
}

/// Search for an offset vector whose circularity, convexity and elongation match `target`.
///
/// The swarm starts from uniform draws in `[var_min, var_max]` with zero velocity.
/// Each iteration moves every candidate with the inertia/personal/social update,
/// redraws any coordinate that leaves `[0, 1]`, redraws every `a`-th candidate
/// entirely, and on every `b`-th iteration redraws all candidates and reseeds the
/// inertia weight. The inertia weight is damped once after each iteration, so a
/// reseeded weight is already damped before its first use.
///
/// Improvements require a strictly lower cost. The search ends when the iteration
/// limit is reached or, failing that, when the global best cost drops to the
/// precision limit.
pub fn search<R: Rng>(
    target: &TargetDescriptors,
    config: &SwarmConfig,
    rng: &mut R,
) -> Result<SearchResult> {
    config.validate()?;

    let n_var = config.n_var;

    // Initialization
    let mut swarm: Vec<Candidate> = Vec::with_capacity(config.n_pop);
    let mut global_best_position: Vec<f64> = Vec::new();
    let mut global_best_cost = f64::INFINITY;

    for _ in 0..config.n_pop {
        let position = draw_position(rng, config);
        let cost = calculate_cost(target, &position)?;

        if global_best_position.is_empty() || cost < global_best_cost {
            global_best_cost = cost;
            global_best_position = position.clone();
        }

        swarm.push(Candidate {
            velocity: vec![0.0; n_var],
            cost,
            best_position: position.clone(),
            best_cost: cost,
            position,
        });
    }

    let mut trajectory = if config.record_trajectory {
        let mut costs = Vec::with_capacity(config.iter_limit);
        if config.iter_limit > 0 {
            costs.push(global_best_cost);
        }
        Some(costs)
    } else {
        None
    };

    let mut w = config.w;
    let mut iteration: usize = 1;

    loop {
        let reset_swarm = iteration % config.b == 0;

        for (i, candidate) in swarm.iter_mut().enumerate() {
            for j in 0..n_var {
                let r1: f64 = rng.gen();
                let r2: f64 = rng.gen();

                candidate.velocity[j] = w * candidate.velocity[j]
                    + r1 * config.c1 * (candidate.best_position[j] - candidate.position[j])
                    + r2 * config.c2 * (global_best_position[j] - candidate.position[j]);
                candidate.position[j] =
                    settle_coordinate(candidate.position[j] + candidate.velocity[j], rng, config);
            }

            if i % config.a == 0 {
                candidate.position = draw_position(rng, config);
            }

            if reset_swarm {
                candidate.position = draw_position(rng, config);
                w = rng.gen();
            }

            candidate.cost = calculate_cost(target, &candidate.position)?;

            improve_best(
                &mut candidate.best_position,
                &mut candidate.best_cost,
                &candidate.position,
                candidate.cost,
            );
            improve_best(
                &mut global_best_position,
                &mut global_best_cost,
                &candidate.position,
                candidate.cost,
            );
        }

        w *= config.w_damp;

        if let Some(costs) = trajectory.as_mut() {
            if iteration < config.iter_limit {
                costs.push(global_best_cost);
            }
        }

        if config.use_iter_limit && iteration >= config.iter_limit {
            break;
        }
        if config.use_precision_limit && global_best_cost <= config.precision_limit {
            break;
        }
        iteration += 1;
    }

    debug!(
        "Swarm search finished after {} iterations with cost {:.6}",
        iteration, global_best_cost
    );

    Ok(SearchResult {
        best_position: global_best_position,
        best_cost: global_best_cost,
        iterations: iteration,
        trajectory,
    })
}
