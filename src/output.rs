// src/output.rs - CSV and JSON output for generated particles

use std::fs;
use std::path::{Path, PathBuf};
use csv::{Writer, WriterBuilder};

use crate::distribution::ParticleHistograms;
use crate::errors::Result;
use crate::shape_analysis::ShapeDescriptors;

/// One generated particle as written to the data file
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleRecord {
    pub index: usize,
    /// Image scale (um/pix) that gives the sampled CE diameter
    pub scale: f64,
    pub best_cost: f64,
    pub iterations: usize,
    pub offsets: Vec<f64>,
}

pub fn data_file_path<P: AsRef<Path>>(output_dir: P, worker: usize) -> PathBuf {
    output_dir.as_ref().join(format!("generated_data_{}.csv", worker))
}

pub fn info_file_path<P: AsRef<Path>>(output_dir: P, worker: usize) -> PathBuf {
    output_dir.as_ref().join(format!("generated_info_{}.csv", worker))
}

/// Write the generated particles of one worker to `generated_data_<worker>.csv`
pub fn write_particles_csv<P: AsRef<Path>>(
    records: &[ParticleRecord],
    n_var: usize,
    output_dir: P,
    worker: usize,
) -> Result<PathBuf> {
    fs::create_dir_all(output_dir.as_ref())?;
    let output_path = data_file_path(output_dir, worker);

    let mut writer = Writer::from_path(&output_path)?;

    let mut header = vec![
        "index".to_string(),
        "scale".to_string(),
        "best_cost".to_string(),
        "iterations".to_string(),
    ];
    header.extend((0..n_var).map(|j| format!("dim_{}", j)));
    writer.write_record(&header)?;

    for record in records {
        let mut row = vec![
            record.index.to_string(),
            format!("{:.6}", record.scale),
            format!("{:.6}", record.best_cost),
            record.iterations.to_string(),
        ];
        row.extend(record.offsets.iter().map(|x| format!("{:.6}", x)));
        writer.write_record(&row)?;
    }

    writer.flush()?;

    Ok(output_path)
}

/// Write spherical particles (`index, ce_diameter`) to `generated_data_<worker>.csv`
pub fn write_spheres_csv<P: AsRef<Path>>(
    ce_diameters: &[f64],
    output_dir: P,
    worker: usize,
) -> Result<PathBuf> {
    fs::create_dir_all(output_dir.as_ref())?;
    let output_path = data_file_path(output_dir, worker);

    let mut writer = Writer::from_path(&output_path)?;
    writer.write_record(&["index", "ce_diameter"])?;

    for (index, ce_diameter) in ce_diameters.iter().enumerate() {
        writer.write_record(&[index.to_string(), format!("{:.6}", ce_diameter)])?;
    }

    writer.flush()?;

    Ok(output_path)
}

/// Write the run summary of one worker to `generated_info_<worker>.csv`.
///
/// Two leading rows hold the particle count and the total area (um^2), followed by
/// one row per channel with the channel centres and the cumulative distributions
/// of the generated CE diameter, circularity, convexity, elongation and solidity.
/// With `only_spherical` the shape columns are left empty.
pub fn write_info_csv<P: AsRef<Path>>(
    generated: usize,
    total_area_um2: f64,
    histograms: &ParticleHistograms,
    only_spherical: bool,
    output_dir: P,
    worker: usize,
) -> Result<PathBuf> {
    fs::create_dir_all(output_dir.as_ref())?;
    let output_path = info_file_path(output_dir, worker);

    let mut writer = WriterBuilder::new().flexible(true).from_path(&output_path)?;

    writer.write_record(&["generated".to_string(), generated.to_string()])?;
    writer.write_record(&["total_area_um2".to_string(), format!("{:.6}", total_area_um2)])?;

    writer.write_record(&[
        "ce_centre",
        "ce_diameter_cumulative",
        "shape_centre",
        "circularity_cumulative",
        "convexity_cumulative",
        "elongation_cumulative",
        "solidity_cumulative",
    ])?;

    let (_, ce_cum) = histograms.ce_diameter.distributions();
    let (_, circ_cum) = histograms.circularity.distributions();
    let (_, conv_cum) = histograms.convexity.distributions();
    let (_, elong_cum) = histograms.elongation.distributions();
    let (_, solid_cum) = histograms.solidity.distributions();

    let ce_channels = histograms.ce_diameter.channels();
    let shape_channels = histograms.circularity.channels();

    for j in 0..histograms.channel_count() {
        let shape_columns = if only_spherical {
            vec![String::new(); 5]
        } else {
            vec![
                format!("{:.6}", shape_channels[j].centre),
                format!("{:.6}", circ_cum[j]),
                format!("{:.6}", conv_cum[j]),
                format!("{:.6}", elong_cum[j]),
                format!("{:.6}", solid_cum[j]),
            ]
        };

        let mut row = vec![format!("{:.6}", ce_channels[j].centre), format!("{:.6}", ce_cum[j])];
        row.extend(shape_columns);
        writer.write_record(&row)?;
    }

    writer.flush()?;

    Ok(output_path)
}

/// Full descriptor record as pretty-printed JSON
pub fn describe_json(descriptors: &ShapeDescriptors) -> Result<String> {
    Ok(serde_json::to_string_pretty(descriptors)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distribution::tests::sample_table;
    use crate::distribution::InputDistributions;
    use crate::shape_analysis::extract;
    use tempfile::tempdir;

    #[test]
    fn particle_file_has_header_and_rows() {
        let dir = tempdir().unwrap();
        let records = vec![
            ParticleRecord { index: 0, scale: 0.25, best_cost: 0.004, iterations: 12, offsets: vec![0.1, 0.5, 0.9] },
            ParticleRecord { index: 1, scale: 1.5, best_cost: 0.009, iterations: 40, offsets: vec![0.3, 0.3, 0.3] },
        ];

        let path = write_particles_csv(&records, 3, dir.path(), 2).unwrap();
        assert_eq!(path, dir.path().join("generated_data_2.csv"));

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(
            headers.iter().collect::<Vec<_>>(),
            vec!["index", "scale", "best_cost", "iterations", "dim_0", "dim_1", "dim_2"]
        );

        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[1][0], "1");
        assert_eq!(&rows[1][1], "1.500000");
        assert_eq!(&rows[1][3], "40");
        assert_eq!(&rows[0][6], "0.900000");
    }

    #[test]
    fn info_file_has_totals_and_one_row_per_channel() {
        let dir = tempdir().unwrap();
        let distributions = InputDistributions::from_reader(sample_table().as_bytes()).unwrap();
        let mut histograms = ParticleHistograms::new(&distributions);
        let descriptors = extract(1.0, &[0.5; 8]).unwrap();
        histograms.record(&descriptors);

        let path = write_info_csv(1, descriptors.area_um2, &histograms, false, dir.path(), 0).unwrap();
        let text = fs::read_to_string(path).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "generated,1");
        assert!(lines[1].starts_with("total_area_um2,"));
        assert!(lines[2].starts_with("ce_centre,"));
        assert_eq!(lines.len(), 3 + histograms.channel_count());

        // Channel 0 of the sample table: CE [1, 10^0.2], shape [0, 0.1]
        let first: Vec<&str> = lines[3].split(',').collect();
        assert_eq!(first.len(), 7);
        assert_eq!(first[0], format!("{:.6}", 10f64.powf(0.1)));
        assert_eq!(first[2], "0.050000");
        let last: Vec<&str> = lines.last().unwrap().split(',').collect();
        assert_eq!(last[5], "100.000000");
    }

    #[test]
    fn spherical_info_leaves_shape_columns_empty() {
        let dir = tempdir().unwrap();
        let distributions = InputDistributions::from_reader(sample_table().as_bytes()).unwrap();
        let mut histograms = ParticleHistograms::new(&distributions);
        histograms.ce_diameter.record(5.0);

        let path = write_info_csv(1, 19.634954, &histograms, true, dir.path(), 1).unwrap();
        let text = fs::read_to_string(path).unwrap();
        let row: Vec<&str> = text.lines().nth(3).unwrap().split(',').collect();

        assert_eq!(row.len(), 7);
        assert!(!row[0].is_empty());
        assert!(row[2..].iter().all(|cell| cell.is_empty()));
    }

    #[test]
    fn sphere_file_has_index_and_diameter() {
        let dir = tempdir().unwrap();
        let path = write_spheres_csv(&[2.5, 7.25], dir.path(), 0).unwrap();
        let text = fs::read_to_string(path).unwrap();
        assert_eq!(text, "index,ce_diameter\n0,2.500000\n1,7.250000\n");
    }

    #[test]
    fn describe_contains_all_descriptors() {
        let descriptors = extract(2.0, &[0.4, 0.8, 0.6, 0.9, 0.5]).unwrap();
        let json = describe_json(&descriptors).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["n_dim"], 5);
        assert_eq!(value["scale"], 2.0);
        assert!(value["major_axis"]["x1"].is_number());
        assert!(value["elongation"].as_f64().unwrap() >= 0.0);
    }
}
