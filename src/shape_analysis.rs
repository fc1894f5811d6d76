// src/shape_analysis.rs - Shape descriptors of a star-shaped particle polygon

use nalgebra::Point2;
use serde::Serialize;
use std::f64::consts::PI;

use crate::convex_hull::{convex_hull, ring_area, ring_perimeter};
use crate::errors::{Result, ShapeGenError};

/// Width of the nominal particle image in pixels
pub const IMAGE_WIDTH: f64 = 360.0;

/// Outer radius reached by an offset of 1.0 (half the image width)
pub const OUTER_RADIUS: f64 = 180.0;

/// Radius reached by an offset of 0.0; keeps every vertex off the centre
pub const CENTRE_RADIUS: f64 = 5.0;

/// Endpoints of a principal axis, in pixels relative to the image centre
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AxisEndpoints {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

/// Full descriptor record of one particle polygon
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShapeDescriptors {
    pub n_dim: usize,
    /// Image scale (um/pix)
    pub scale: f64,
    pub image_width: f64,
    pub real_width: f64,
    /// Centroid (pix, relative to image centre)
    pub centre_x: f64,
    pub centre_y: f64,
    /// Signed shoelace area (pix^2)
    pub area_pixels: f64,
    pub area_um2: f64,
    pub ce_diameter: f64,
    /// Perimeter (um)
    pub perimeter: f64,
    pub circularity: f64,
    /// High sensitivity circularity
    pub hs_circularity: f64,
    pub convexity: f64,
    pub solidity: f64,
    /// Spherical equivalent volume
    pub se_volume: f64,
    pub major_axis: AxisEndpoints,
    pub minor_axis: AxisEndpoints,
    /// Major axis angle in degrees
    pub major_axis_deg: f64,
    /// Length along the major axis (um)
    pub length: f64,
    /// Width along the minor axis (um)
    pub width: f64,
    pub aspect_ratio: f64,
    pub elongation: f64,
    /// Largest distance between two vertices (um)
    pub max_distance: f64,
}

/// Place the polygon vertices: vertex `i` sits at angle `i * 2π/n` with its
/// radius interpolated between the centre radius and the outer radius.
/// Coordinates are relative to the image centre.
pub fn polygon_vertices(offsets: &[f64]) -> Vec<Point2<f64>> {
    let step = 2.0 * PI / offsets.len() as f64;
    offsets
        .iter()
        .enumerate()
        .map(|(i, &offset)| {
            let radius = offset * (OUTER_RADIUS - CENTRE_RADIUS) + CENTRE_RADIUS;
            let angle = i as f64 * step;
            Point2::new(angle.cos() * radius, angle.sin() * radius)
        })
        .collect()
}

/// Centroid of a closed vertex ring with the given signed area
fn calculate_centroid(ring: &[Point2<f64>], area: f64) -> Point2<f64> {
    let n = ring.len();
    let mut sum_x = 0.0;
    let mut sum_y = 0.0;
    for i in 0..n {
        let p = &ring[i];
        let q = &ring[(i + 1) % n];
        let cross = p.x * q.y - q.x * p.y;
        sum_x += (p.x + q.x) * cross;
        sum_y += (p.y + q.y) * cross;
    }
    Point2::new(sum_x / (6.0 * area), sum_y / (6.0 * area))
}

/// Second moments of area (Ixx, Iyy, Ixy) about the centroid
fn calculate_inertia(ring: &[Point2<f64>], area: f64, centre: &Point2<f64>) -> (f64, f64, f64) {
    let n = ring.len();
    let mut sxx = 0.0;
    let mut syy = 0.0;
    let mut sxy = 0.0;
    for i in 0..n {
        let p = &ring[i];
        let q = &ring[(i + 1) % n];
        let cross = p.x * q.y - q.x * p.y;
        sxx += (p.y * p.y + p.y * q.y + q.y * q.y) * cross;
        syy += (p.x * p.x + p.x * q.x + q.x * q.x) * cross;
        sxy += (p.x * q.y + 2.0 * p.x * p.y + 2.0 * q.x * q.y + q.x * p.y) * cross;
    }

    let ixx = sxx / 12.0 - area * centre.y * centre.y;
    let iyy = syy / 12.0 - area * centre.x * centre.x;
    let ixy = sxy / 24.0 - area * centre.x * centre.y;
    (ixx, iyy, ixy)
}

/// Principal angle (rad) from the moments of area.
///
/// A half-difference of moments strictly inside (-1, 0) or (0, 1) is pushed out
/// to -1 or 1 so near-circular shapes do not get an arbitrary orientation.
pub fn principal_angle(ixx: f64, iyy: f64, ixy: f64) -> f64 {
    let mut diff = (ixx - iyy) / 2.0;
    if diff < 1.0 && diff > 0.0 {
        diff = 1.0;
    }
    if diff > -1.0 && diff < 0.0 {
        diff = -1.0;
    }
    (-ixy).atan2(diff) / 2.0
}

/// Length (um) of the vertex projections onto the line through the axis endpoints.
///
/// Near-horizontal or near-vertical axes (coordinate delta <= 0.5 pix) project by
/// keeping the matching coordinate, the extremes are taken along whichever
/// coordinate the axis spans more of.
fn calculate_projection_length(axis: &AxisEndpoints, vertices: &[Point2<f64>], scale: f64) -> f64 {
    let dy = axis.y2 - axis.y1;
    let dx = axis.x2 - axis.x1;

    let projections: Vec<Point2<f64>> = vertices
        .iter()
        .map(|v| {
            if dy.abs() <= 0.5 {
                Point2::new(v.x, axis.y1)
            } else if dx.abs() <= 0.5 {
                Point2::new(axis.x1, v.y)
            } else {
                let intercept = -axis.x1 * dy / dx + axis.y1;
                let normal_intercept = v.x * dx / dy + v.y;
                let x = ((normal_intercept - intercept) * dx * dy) / (dy * dy + dx * dx);
                Point2::new(x, x * dy / dx + intercept)
            }
        })
        .collect();

    let use_x = dx.abs() > dy.abs();
    let key = |p: &Point2<f64>| if use_x { p.x } else { p.y };

    let mut min_point = projections[0];
    let mut max_point = projections[0];
    for p in &projections[1..] {
        if key(p) > key(&max_point) {
            max_point = *p;
        }
        if key(p) < key(&min_point) {
            min_point = *p;
        }
    }

    nalgebra::distance(&min_point, &max_point) * scale
}

/// Largest pairwise vertex distance (pix)
fn calculate_max_distance(vertices: &[Point2<f64>]) -> f64 {
    let mut max_distance: f64 = 0.0;
    for (i, p) in vertices.iter().enumerate() {
        for q in &vertices[i + 1..] {
            max_distance = max_distance.max(nalgebra::distance(p, q));
        }
    }
    max_distance
}

/// Compute the full descriptor record of the polygon described by `offsets`.
///
/// # Arguments
/// * `scale` - Image scale in um/pix
/// * `offsets` - Normalized radial offsets, one per vertex, nominally in [0, 1]
///
/// # Returns
/// The descriptor record, or `DegeneratePolygon` when fewer than three vertices
/// are given, an input is not finite, or the polygon or its hull has no area.
pub fn extract(scale: f64, offsets: &[f64]) -> Result<ShapeDescriptors> {
    let n_dim = offsets.len();
    if n_dim < 3 {
        return Err(ShapeGenError::DegeneratePolygon(format!(
            "need at least 3 vertices, got {}",
            n_dim
        )));
    }
    if !scale.is_finite() || scale <= 0.0 {
        return Err(ShapeGenError::DegeneratePolygon(format!("invalid scale {}", scale)));
    }
    if let Some(bad) = offsets.iter().find(|o| !o.is_finite()) {
        return Err(ShapeGenError::DegeneratePolygon(format!("non-finite offset {}", bad)));
    }

    let vertices = polygon_vertices(offsets);

    let area_pixels = ring_area(&vertices);
    if area_pixels == 0.0 {
        return Err(ShapeGenError::DegeneratePolygon("polygon has zero area".to_string()));
    }
    let centre = calculate_centroid(&vertices, area_pixels);

    let area_um2 = scale * scale * area_pixels;
    let ce_diameter = (area_um2 * 4.0 / PI).sqrt();
    let perimeter = ring_perimeter(&vertices) * scale;

    let circularity = 2.0 * (PI * area_um2).sqrt() / perimeter;
    let hs_circularity = (4.0 * PI * area_um2) / (perimeter * perimeter);

    let hull = convex_hull(&vertices);
    let hull_area_pixels = ring_area(&hull);
    if hull_area_pixels == 0.0 {
        return Err(ShapeGenError::DegeneratePolygon("convex hull has zero area".to_string()));
    }
    let hull_perimeter = ring_perimeter(&hull) * scale;

    let convexity = hull_perimeter / perimeter;
    let solidity = area_pixels / hull_area_pixels;
    let se_volume = (PI * ce_diameter.powi(3)) / 6.0;

    // Major axis angle from the horizontal
    let (ixx, iyy, ixy) = calculate_inertia(&vertices, area_pixels, &centre);
    let orientation = PI / 2.0 - principal_angle(ixx, iyy, ixy);

    // Axis endpoints lie on the CE circle (in pixels)
    let half = ce_diameter / (2.0 * scale);
    let (sin_o, cos_o) = orientation.sin_cos();
    let mut major_axis = AxisEndpoints {
        x1: centre.x + cos_o * half,
        y1: centre.y - sin_o * half,
        x2: centre.x - cos_o * half,
        y2: centre.y + sin_o * half,
    };
    let mut minor_axis = AxisEndpoints {
        x1: centre.x - sin_o * half,
        y1: centre.y - cos_o * half,
        x2: centre.x + sin_o * half,
        y2: centre.y + cos_o * half,
    };
    let mut major_axis_deg = 180.0 - orientation.to_degrees();

    let mut length = calculate_projection_length(&major_axis, &vertices, scale);
    let mut width = calculate_projection_length(&minor_axis, &vertices, scale);

    let mut aspect_ratio = width / length;
    if aspect_ratio > 1.0 {
        std::mem::swap(&mut major_axis, &mut minor_axis);
        std::mem::swap(&mut length, &mut width);
        aspect_ratio = width / length;
        if major_axis_deg > 90.0 {
            major_axis_deg -= 90.0;
        } else {
            major_axis_deg += 90.0;
        }
    }
    let elongation = 1.0 - aspect_ratio;

    let max_distance = calculate_max_distance(&vertices) * scale;

    Ok(ShapeDescriptors {
        n_dim,
        scale,
        image_width: IMAGE_WIDTH,
        real_width: scale * IMAGE_WIDTH,
        centre_x: centre.x,
        centre_y: centre.y,
        area_pixels,
        area_um2,
        ce_diameter,
        perimeter,
        circularity,
        hs_circularity,
        convexity,
        solidity,
        se_volume,
        major_axis,
        minor_axis,
        major_axis_deg,
        length,
        width,
        aspect_ratio,
        elongation,
        max_distance,
    })
}

/// Scale (um/pix) at which the polygon reaches the requested CE diameter.
///
/// Callers extract at scale 1.0 first, then re-extract at the returned scale.
pub fn scale_for_ce_diameter(area_pixels: f64, target_ce_diameter: f64) -> f64 {
    target_ce_diameter * (PI / (area_pixels * 4.0)).sqrt()
}
