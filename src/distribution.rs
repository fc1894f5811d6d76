// src/distribution.rs - Measured channel distributions: sampling targets and counting results

use rand::Rng;
use serde::Deserialize;
use std::io;
use std::path::Path;

use crate::cost::TargetDescriptors;
use crate::errors::{Result, ShapeGenError};
use crate::shape_analysis::ShapeDescriptors;

/// One histogram channel [lower, upper]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Channel {
    pub lower: f64,
    pub centre: f64,
    pub upper: f64,
}

impl Channel {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }
}

/// Index of the first channel containing `value`
fn find_channel(channels: &[Channel], value: f64) -> Option<usize> {
    channels.iter().position(|ch| ch.contains(value))
}

/// Differential distribution from a cumulative one (negative steps become 0)
pub fn diff_from_cumulative(cumulative: &[f64]) -> Vec<f64> {
    let mut diff = Vec::with_capacity(cumulative.len());
    for (i, &value) in cumulative.iter().enumerate() {
        if i == 0 {
            diff.push(value);
        } else {
            diff.push((value - cumulative[i - 1]).max(0.0));
        }
    }
    diff
}

/// Scale a differential distribution so its largest channel is 1.0
pub fn normalize(diff: &[f64]) -> Result<Vec<f64>> {
    let max = diff.iter().cloned().fold(0.0, f64::max);
    if max <= 0.0 {
        return Err(ShapeGenError::Distribution(
            "distribution has no positive channel".to_string(),
        ));
    }
    Ok(diff.iter().map(|v| v / max).collect())
}

/// First and last channel with a positive value.
/// Falls back to the full range when no channel is positive.
pub fn boundaries(normalized: &[f64]) -> (usize, usize) {
    let last = normalized.len().saturating_sub(1);
    let left = normalized.iter().position(|&v| v > 0.0).unwrap_or(0);
    let right = normalized.iter().rposition(|&v| v > 0.0).unwrap_or(last);
    (left, right)
}

/// A normalized differential distribution that can be sampled
#[derive(Debug, Clone)]
pub struct Distribution {
    channels: Vec<Channel>,
    normalized: Vec<f64>,
    left: usize,
    right: usize,
    log_scale: bool,
}

impl Distribution {
    /// Build from channel bounds and the cumulative percentages measured on them
    pub fn from_cumulative(channels: Vec<Channel>, cumulative: &[f64], log_scale: bool) -> Result<Self> {
        if channels.is_empty() || channels.len() != cumulative.len() {
            return Err(ShapeGenError::Distribution(format!(
                "{} channels but {} cumulative values",
                channels.len(),
                cumulative.len()
            )));
        }

        let normalized = normalize(&diff_from_cumulative(cumulative))?;
        let (left, right) = boundaries(&normalized);

        if log_scale && channels[left].lower <= 0.0 {
            return Err(ShapeGenError::Distribution(format!(
                "log-scale distribution needs a positive lower bound, got {}",
                channels[left].lower
            )));
        }

        Ok(Self { channels, normalized, left, right, log_scale })
    }

    pub fn boundaries(&self) -> (usize, usize) {
        (self.left, self.right)
    }

    /// Draw a value by rejection sampling.
    ///
    /// Candidates are uniform between the outer bounds of the non-empty channel
    /// range (uniform in log10 for log-scale distributions) and are accepted with
    /// the normalized weight of their channel, or always when no channel holds them.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> f64 {
        let (low, high) = if self.log_scale {
            (self.channels[self.left].lower.log10(), self.channels[self.right].upper.log10())
        } else {
            (self.channels[self.left].lower, self.channels[self.right].upper)
        };

        loop {
            let mut x = low + (high - low) * rng.gen::<f64>();
            if self.log_scale {
                x = 10f64.powf(x);
            }

            let probability = find_channel(&self.channels, x)
                .map(|i| self.normalized[i])
                .unwrap_or(1.0);

            if rng.gen::<f64>() < probability {
                return x;
            }
        }
    }
}

/// Counts of generated values per channel
#[derive(Debug, Clone)]
pub struct Histogram {
    channels: Vec<Channel>,
    counts: Vec<u64>,
}

impl Histogram {
    pub fn new(channels: Vec<Channel>) -> Self {
        let counts = vec![0; channels.len()];
        Self { channels, counts }
    }

    /// Count `value` in its channel; returns false when no channel holds it
    pub fn record(&mut self, value: f64) -> bool {
        match find_channel(&self.channels, value) {
            Some(i) => {
                self.counts[i] += 1;
                true
            }
            None => false,
        }
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    /// Differential (percent per channel) and cumulative distributions of the counts
    pub fn distributions(&self) -> (Vec<f64>, Vec<f64>) {
        let total: u64 = self.counts.iter().sum();
        let diff: Vec<f64> = if total == 0 {
            vec![0.0; self.counts.len()]
        } else {
            self.counts
                .iter()
                .map(|&c| c as f64 * 100.0 / total as f64)
                .collect()
        };

        let mut running = 0.0;
        let cumulative = diff
            .iter()
            .map(|d| {
                running += d;
                running
            })
            .collect();

        (diff, cumulative)
    }
}

/// Histograms of the descriptors achieved by generated particles
#[derive(Debug, Clone)]
pub struct ParticleHistograms {
    pub ce_diameter: Histogram,
    pub circularity: Histogram,
    pub convexity: Histogram,
    pub elongation: Histogram,
    pub solidity: Histogram,
}

impl ParticleHistograms {
    /// Empty histograms on the channels of the input table
    pub fn new(distributions: &InputDistributions) -> Self {
        let shape = || Histogram::new(distributions.shape_channels.clone());
        Self {
            ce_diameter: Histogram::new(distributions.ce_channels.clone()),
            circularity: shape(),
            convexity: shape(),
            elongation: shape(),
            solidity: shape(),
        }
    }

    pub fn record(&mut self, descriptors: &ShapeDescriptors) {
        self.ce_diameter.record(descriptors.ce_diameter);
        self.circularity.record(descriptors.circularity);
        self.convexity.record(descriptors.convexity);
        self.elongation.record(descriptors.elongation);
        self.solidity.record(descriptors.solidity);
    }

    /// Number of channels (rows of the info table)
    pub fn channel_count(&self) -> usize {
        self.ce_diameter.channels().len()
    }
}

/// One row of the input distribution table
#[derive(Debug, Deserialize)]
struct ChannelRow {
    #[allow(dead_code)]
    channel: usize,
    ce_lower: f64,
    ce_centre: f64,
    ce_upper: f64,
    ce_cumulative: f64,
    shape_lower: f64,
    shape_centre: f64,
    shape_upper: f64,
    circularity_cumulative: f64,
    convexity_cumulative: f64,
    elongation_cumulative: f64,
}

fn column(rows: &[ChannelRow], field: fn(&ChannelRow) -> f64) -> Vec<f64> {
    rows.iter().map(field).collect()
}

/// Measured distributions of CE diameter, circularity, convexity and elongation.
///
/// CE diameter has its own channels (sampled on a log scale); the three shape
/// descriptors share one set of linear channels.
#[derive(Debug, Clone)]
pub struct InputDistributions {
    pub ce_channels: Vec<Channel>,
    pub shape_channels: Vec<Channel>,
    pub ce_diameter: Distribution,
    pub circularity: Distribution,
    pub convexity: Distribution,
    pub elongation: Distribution,
}

impl InputDistributions {
    /// Load the distribution table from a CSV file with a header row
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ShapeGenError::InvalidPath(path.to_path_buf()));
        }
        let reader = csv::Reader::from_path(path)?;
        Self::from_csv(reader)
    }

    /// Load the distribution table from any reader
    pub fn from_reader<R: io::Read>(reader: R) -> Result<Self> {
        Self::from_csv(csv::Reader::from_reader(reader))
    }

    fn from_csv<R: io::Read>(mut reader: csv::Reader<R>) -> Result<Self> {
        let mut rows: Vec<ChannelRow> = Vec::new();
        for record in reader.deserialize() {
            rows.push(record?);
        }

        if rows.is_empty() {
            return Err(ShapeGenError::Distribution("distribution table is empty".to_string()));
        }

        for (i, row) in rows.iter().enumerate() {
            if row.ce_lower > row.ce_upper || row.shape_lower > row.shape_upper {
                return Err(ShapeGenError::Distribution(format!(
                    "channel {} has lower bound above upper bound",
                    i
                )));
            }
        }

        let ce_channels: Vec<Channel> = rows
            .iter()
            .map(|r| Channel { lower: r.ce_lower, centre: r.ce_centre, upper: r.ce_upper })
            .collect();
        let shape_channels: Vec<Channel> = rows
            .iter()
            .map(|r| Channel { lower: r.shape_lower, centre: r.shape_centre, upper: r.shape_upper })
            .collect();

        Ok(Self {
            ce_diameter: Distribution::from_cumulative(
                ce_channels.clone(),
                &column(&rows, |r| r.ce_cumulative),
                true,
            )?,
            circularity: Distribution::from_cumulative(
                shape_channels.clone(),
                &column(&rows, |r| r.circularity_cumulative),
                false,
            )?,
            convexity: Distribution::from_cumulative(
                shape_channels.clone(),
                &column(&rows, |r| r.convexity_cumulative),
                false,
            )?,
            elongation: Distribution::from_cumulative(
                shape_channels.clone(),
                &column(&rows, |r| r.elongation_cumulative),
                false,
            )?,
            ce_channels,
            shape_channels,
        })
    }

    /// Draw a target CE diameter and descriptor triple for one particle
    pub fn sample_target<R: Rng>(&self, rng: &mut R) -> (f64, TargetDescriptors) {
        let ce_diameter = self.ce_diameter.sample(rng);
        let target = TargetDescriptors::new(
            self.circularity.sample(rng),
            self.convexity.sample(rng),
            self.elongation.sample(rng),
        );
        (ce_diameter, target)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn linear_channels(n: usize, low: f64, high: f64) -> Vec<Channel> {
        let step = (high - low) / n as f64;
        (0..n)
            .map(|i| {
                let lower = low + i as f64 * step;
                Channel { lower, centre: lower + step / 2.0, upper: lower + step }
            })
            .collect()
    }

    /// Table with 10 channels; shape mass sits in channels 7..=8, CE mass in 2..=4
    pub(crate) fn sample_table() -> String {
        let mut text = String::from(
            "channel,ce_lower,ce_centre,ce_upper,ce_cumulative,shape_lower,shape_centre,shape_upper,\
             circularity_cumulative,convexity_cumulative,elongation_cumulative\n",
        );
        let ce_cum = [0.0, 0.0, 20.0, 70.0, 100.0, 100.0, 100.0, 100.0, 100.0, 100.0];
        let circ_cum = [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 40.0, 100.0, 100.0];
        let conv_cum = [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 50.0, 100.0];
        let elong_cum = [10.0, 60.0, 90.0, 100.0, 100.0, 100.0, 100.0, 100.0, 100.0, 100.0];
        for i in 0..10 {
            let ce_lower = 10f64.powf(i as f64 * 0.2);
            let ce_upper = 10f64.powf((i + 1) as f64 * 0.2);
            let shape_lower = i as f64 * 0.1;
            text.push_str(&format!(
                "{},{},{},{},{},{},{},{},{},{},{}\n",
                i,
                ce_lower,
                (ce_lower * ce_upper).sqrt(),
                ce_upper,
                ce_cum[i],
                shape_lower,
                shape_lower + 0.05,
                shape_lower + 0.1,
                circ_cum[i],
                conv_cum[i],
                elong_cum[i]
            ));
        }
        text
    }

    #[test]
    fn differential_from_cumulative_clamps_negative_steps() {
        let diff = diff_from_cumulative(&[5.0, 15.0, 12.0, 40.0]);
        assert_eq!(diff, vec![5.0, 10.0, 0.0, 28.0]);
    }

    #[test]
    fn normalize_scales_peak_to_one() {
        let norm = normalize(&[1.0, 4.0, 2.0]).unwrap();
        assert_eq!(norm, vec![0.25, 1.0, 0.5]);
        assert!(normalize(&[0.0, 0.0]).is_err());
    }

    #[test]
    fn boundaries_find_non_empty_range() {
        assert_eq!(boundaries(&[0.0, 0.0, 0.3, 1.0, 0.0]), (2, 3));
        assert_eq!(boundaries(&[0.0, 0.0]), (0, 1));
    }

    #[test]
    fn samples_stay_inside_non_empty_channels() {
        let channels = linear_channels(10, 0.0, 1.0);
        let cumulative = [0.0, 0.0, 0.0, 10.0, 60.0, 100.0, 100.0, 100.0, 100.0, 100.0];
        let dist = Distribution::from_cumulative(channels, &cumulative, false).unwrap();
        assert_eq!(dist.boundaries(), (3, 5));

        let mut rng = StdRng::seed_from_u64(17);
        for _ in 0..2000 {
            let x = dist.sample(&mut rng);
            assert!((0.3..=0.6).contains(&x), "sample {} outside range", x);
        }
    }

    #[test]
    fn sample_frequencies_follow_weights() {
        let channels = linear_channels(2, 0.0, 1.0);
        // Channel 1 carries three times the mass of channel 0
        let dist = Distribution::from_cumulative(channels, &[25.0, 100.0], false).unwrap();
        let mut rng = StdRng::seed_from_u64(4);
        let upper = (0..20_000).filter(|_| dist.sample(&mut rng) > 0.5).count();
        let share = upper as f64 / 20_000.0;
        assert!((share - 0.75).abs() < 0.02, "share {}", share);
    }

    #[test]
    fn histogram_builds_percent_distributions() {
        let mut hist = Histogram::new(linear_channels(4, 0.0, 1.0));
        assert!(hist.record(0.1));
        assert!(hist.record(0.6));
        assert!(hist.record(0.7));
        assert!(hist.record(0.95));
        assert!(!hist.record(1.5));
        assert_eq!(hist.counts(), &[1, 0, 2, 1]);

        let (diff, cum) = hist.distributions();
        assert_eq!(diff, vec![25.0, 0.0, 50.0, 25.0]);
        assert_approx_eq!(cum[3], 100.0);
    }

    #[test]
    fn empty_histogram_has_zero_distributions() {
        let hist = Histogram::new(linear_channels(3, 0.0, 1.0));
        let (diff, cum) = hist.distributions();
        assert_eq!(diff, vec![0.0; 3]);
        assert_eq!(cum, vec![0.0; 3]);
    }

    #[test]
    fn loads_table_and_samples_targets() {
        let input = InputDistributions::from_reader(sample_table().as_bytes()).unwrap();
        assert_eq!(input.shape_channels.len(), 10);
        assert_eq!(input.circularity.boundaries(), (7, 8));
        assert_eq!(input.ce_diameter.boundaries(), (2, 4));

        let mut rng = StdRng::seed_from_u64(8);
        for _ in 0..200 {
            let (ce, target) = input.sample_target(&mut rng);
            assert!(ce >= 10f64.powf(0.4) - 1e-9 && ce <= 10f64.powf(1.0) + 1e-9);
            assert!(target.circularity >= 0.7 && target.circularity <= 0.9 + 1e-12);
            assert!(target.convexity >= 0.8 && target.convexity <= 1.0 + 1e-12);
            assert!(target.elongation >= 0.0 && target.elongation <= 0.4 + 1e-12);
        }
    }

    #[test]
    fn rejects_empty_table() {
        let header = "channel,ce_lower,ce_centre,ce_upper,ce_cumulative,shape_lower,shape_centre,shape_upper,\
                      circularity_cumulative,convexity_cumulative,elongation_cumulative\n";
        assert!(matches!(
            InputDistributions::from_reader(header.as_bytes()),
            Err(ShapeGenError::Distribution(_))
        ));
    }

    #[test]
    fn shipped_table_loads() {
        let tables = InputDistributions::from_reader(include_str!("../input/distributions.csv").as_bytes()).unwrap();
        assert_eq!(tables.ce_channels.len(), 100);
        let mut rng = StdRng::seed_from_u64(2);
        let (ce, target) = tables.sample_target(&mut rng);
        assert!(ce > 0.0);
        assert!((0.0..=1.0).contains(&target.convexity));
    }
}
