// src/cost.rs - Distance between computed and target shape descriptors

use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::shape_analysis::extract;

/// The three descriptors a search tries to reproduce
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetDescriptors {
    pub circularity: f64,
    pub convexity: f64,
    pub elongation: f64,
}

impl TargetDescriptors {
    pub fn new(circularity: f64, convexity: f64, elongation: f64) -> Self {
        Self { circularity, convexity, elongation }
    }

    /// Euclidean distance to another descriptor triple
    pub fn distance(&self, other: &TargetDescriptors) -> f64 {
        ((self.circularity - other.circularity).powi(2)
            + (self.convexity - other.convexity).powi(2)
            + (self.elongation - other.elongation).powi(2))
        .sqrt()
    }
}

/// Cost of a candidate offset vector: Euclidean distance between its
/// (circularity, convexity, elongation) at scale 1.0 and the target.
pub fn calculate_cost(target: &TargetDescriptors, offsets: &[f64]) -> Result<f64> {
    let descriptors = extract(1.0, offsets)?;
    let achieved = TargetDescriptors::new(
        descriptors.circularity,
        descriptors.convexity,
        descriptors.elongation,
    );
    Ok(target.distance(&achieved))
}
