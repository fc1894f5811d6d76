// src/lib.rs - Library interface for the particle shape generator

pub mod config;
pub mod convex_hull;
pub mod cost;
pub mod distribution;
pub mod errors;
pub mod output;
pub mod pipeline;
pub mod shape_analysis;
pub mod swarm;

// Re-export commonly used types and functions
pub use errors::{ShapeGenError, Result};
pub use config::{Config, SwarmConfig};
pub use pipeline::{generate_particles, run_workers, worker_shares, GenerationSummary};

// Geometry kernel
pub use shape_analysis::{
    extract,
    polygon_vertices,
    principal_angle,
    scale_for_ce_diameter,
    AxisEndpoints,
    ShapeDescriptors,
};
pub use convex_hull::{convex_hull, ring_area, ring_perimeter};

// Search
pub use cost::{calculate_cost, TargetDescriptors};
pub use swarm::{search, SearchResult};

// Distributions
pub use distribution::{Distribution, Histogram, InputDistributions, ParticleHistograms};
