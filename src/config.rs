// src/config.rs - Generator and swarm search configuration

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{Result, ShapeGenError};

/// Configuration for a particle generation run
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    /// CSV table with the measured channel distributions
    pub input_path: String,
    pub output_base_dir: String,

    /// Generation stops early once this file exists
    #[serde(default = "default_stop_file")]
    pub stop_file: String,

    #[serde(default = "default_particles_num")]
    pub particles_num: usize,

    /// Generate circles only: sample the CE diameter and skip the shape search
    #[serde(default)]
    pub only_spherical: bool,

    /// Number of generation workers sharing `particles_num`
    /// (one output file pair each)
    #[serde(default = "default_workers")]
    pub workers: usize,

    #[serde(default = "default_parallel")]
    pub use_parallel: bool,

    /// Base seed; worker `w` uses `seed + w`. Entropy-seeded when absent.
    #[serde(default)]
    pub seed: Option<u64>,

    /// Log progress and ETA every n particles
    #[serde(default = "default_progress_every")]
    pub progress_every: usize,

    #[serde(default)]
    pub swarm: SwarmConfig,
}

/// Parameters of the swarm search
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SwarmConfig {
    /// Number of decision variables (polygon vertices)
    #[serde(default = "default_n_var")]
    pub n_var: usize,

    /// Lower bound used when drawing fresh positions
    #[serde(default = "default_var_min")]
    pub var_min: f64,

    /// Upper bound used when drawing fresh positions
    #[serde(default = "default_var_max")]
    pub var_max: f64,

    #[serde(default = "default_true")]
    pub use_iter_limit: bool,

    #[serde(default = "default_iter_limit")]
    pub iter_limit: usize,

    #[serde(default = "default_true")]
    pub use_precision_limit: bool,

    #[serde(default = "default_precision_limit")]
    pub precision_limit: f64,

    /// Keep the per-iteration global best cost (capacity `iter_limit`)
    #[serde(default)]
    pub record_trajectory: bool,

    /// Population (swarm) size
    #[serde(default = "default_n_pop")]
    pub n_pop: usize,

    /// Inertia weight
    #[serde(default = "default_w")]
    pub w: f64,

    /// Damping ratio applied to the inertia weight after every iteration
    #[serde(default = "default_w_damp")]
    pub w_damp: f64,

    /// Personal acceleration coefficient
    #[serde(default = "default_c1")]
    pub c1: f64,

    /// Social acceleration coefficient
    #[serde(default = "default_c2")]
    pub c2: f64,

    /// Every a-th candidate is redrawn each iteration
    #[serde(default = "default_a")]
    pub a: usize,

    /// Every b-th iteration the whole swarm is redrawn and `w` reseeded
    #[serde(default = "default_b")]
    pub b: usize,
}

fn default_stop_file() -> String {
    "./stop.txt".to_string()
}

fn default_particles_num() -> usize {
    1000
}

fn default_workers() -> usize {
    1
}

fn default_parallel() -> bool {
    true
}

fn default_progress_every() -> usize {
    20
}

fn default_true() -> bool {
    true
}

fn default_n_var() -> usize {
    12
}

fn default_var_min() -> f64 {
    0.0
}

fn default_var_max() -> f64 {
    1.0
}

fn default_iter_limit() -> usize {
    1000
}

fn default_precision_limit() -> f64 {
    0.01
}

fn default_n_pop() -> usize {
    5
}

fn default_w() -> f64 {
    1.0
}

fn default_w_damp() -> f64 {
    0.99
}

fn default_c1() -> f64 {
    2.0
}

fn default_c2() -> f64 {
    2.0
}

fn default_a() -> usize {
    5
}

fn default_b() -> usize {
    200
}

impl Default for SwarmConfig {
    fn default() -> Self {
        Self {
            n_var: default_n_var(),
            var_min: default_var_min(),
            var_max: default_var_max(),
            use_iter_limit: true,
            iter_limit: default_iter_limit(),
            use_precision_limit: true,
            precision_limit: default_precision_limit(),
            record_trajectory: false,
            n_pop: default_n_pop(),
            w: default_w(),
            w_damp: default_w_damp(),
            c1: default_c1(),
            c2: default_c2(),
            a: default_a(),
            b: default_b(),
        }
    }
}

impl SwarmConfig {
    /// Reject configurations the search cannot run with.
    ///
    /// Positions that leave `[0, 1]` are redrawn from `[var_min, var_max]`, so
    /// bounds outside the unit interval would feed out-of-domain offsets into the
    /// geometry kernel. Such bounds are refused instead of silently reinterpreted.
    pub fn validate(&self) -> Result<()> {
        if self.n_var < 3 {
            return Err(ShapeGenError::InvalidSearch(format!(
                "n_var must be >= 3 to form a polygon (got {})",
                self.n_var
            )));
        }

        if self.n_pop == 0 {
            return Err(ShapeGenError::InvalidSearch("n_pop must be > 0".to_string()));
        }

        if self.a == 0 || self.b == 0 {
            return Err(ShapeGenError::InvalidSearch(
                "perturbation periods a and b must be > 0".to_string(),
            ));
        }

        if !self.use_iter_limit && !self.use_precision_limit {
            return Err(ShapeGenError::InvalidSearch(
                "at least one of use_iter_limit or use_precision_limit must be enabled".to_string(),
            ));
        }

        if self.use_iter_limit && self.iter_limit == 0 {
            return Err(ShapeGenError::InvalidSearch("iter_limit must be > 0".to_string()));
        }

        if self.use_precision_limit && !(self.precision_limit >= 0.0) {
            return Err(ShapeGenError::InvalidSearch(
                "precision_limit must be >= 0.0".to_string(),
            ));
        }

        if !(self.var_min <= self.var_max) {
            return Err(ShapeGenError::InvalidSearch(format!(
                "var_min ({}) must not exceed var_max ({})",
                self.var_min, self.var_max
            )));
        }

        if self.var_min < 0.0 || self.var_max > 1.0 {
            return Err(ShapeGenError::InvalidSearch(format!(
                "bounds [{}, {}] leave the unit interval that positions are checked against",
                self.var_min, self.var_max
            )));
        }

        let coefficients = [
            ("w", self.w),
            ("w_damp", self.w_damp),
            ("c1", self.c1),
            ("c2", self.c2),
        ];
        for (name, value) in coefficients {
            if !value.is_finite() {
                return Err(ShapeGenError::InvalidSearch(format!("{} must be finite", name)));
            }
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_path: "./input/distributions.csv".to_string(),
            output_base_dir: "./output".to_string(),
            stop_file: default_stop_file(),
            particles_num: default_particles_num(),
            only_spherical: false,
            workers: default_workers(),
            use_parallel: default_parallel(),
            seed: None,
            progress_every: default_progress_every(),
            swarm: SwarmConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            ShapeGenError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;

        toml::from_str(&content).map_err(|source| ShapeGenError::ConfigLoad {
            source,
            path: path.to_path_buf(),
        })
    }

    /// Check the counts and search settings a generation run depends on.
    /// Unlike `validate` this does not touch the filesystem.
    pub fn validate_run_settings(&self) -> Result<()> {
        if self.particles_num == 0 {
            return Err(ShapeGenError::Config("particles_num must be > 0".to_string()));
        }

        if self.workers == 0 {
            return Err(ShapeGenError::Config("workers must be > 0".to_string()));
        }

        if self.progress_every == 0 {
            return Err(ShapeGenError::Config("progress_every must be > 0".to_string()));
        }

        if !self.only_spherical {
            self.swarm.validate()?;
        }

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let input_path = PathBuf::from(&self.input_path);
        if !input_path.is_file() {
            return Err(ShapeGenError::InvalidPath(input_path));
        }

        self.validate_run_settings()?;

        fs::create_dir_all(&self.output_base_dir).map_err(|e| {
            ShapeGenError::Config(format!(
                "Failed to create output directory '{}': {}",
                self.output_base_dir, e
            ))
        })?;

        Ok(())
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| {
            ShapeGenError::Config(format!("Failed to serialize config: {}", e))
        })?;

        fs::write(path, content)?;

        Ok(())
    }
}
