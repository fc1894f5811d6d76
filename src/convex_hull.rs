// src/convex_hull.rs - Convex hull of the polygon vertices (Andrew's monotone chain)

use nalgebra::Point2;

/// Z-component of the cross product of OA and OB.
/// Positive for a counter-clockwise turn O->A->B, negative for clockwise, zero if collinear.
fn cross(o: &Point2<f64>, a: &Point2<f64>, b: &Point2<f64>) -> f64 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

/// Push points onto a chain, popping while the last two and the new point do not turn left.
fn build_chain<'a, I>(points: I, capacity: usize) -> Vec<Point2<f64>>
where
    I: Iterator<Item = &'a Point2<f64>>,
{
    let mut chain: Vec<Point2<f64>> = Vec::with_capacity(capacity);
    for p in points {
        while chain.len() >= 2 && cross(&chain[chain.len() - 2], &chain[chain.len() - 1], p) <= 0.0 {
            chain.pop();
        }
        chain.push(*p);
    }
    chain
}

/// Compute the convex hull of a point set.
///
/// Points are sorted by x (ties broken by y), a lower and an upper chain are swept,
/// and the two chains are joined without their repeated endpoints. The hull is
/// returned counter-clockwise, starting at the leftmost point. Collinear boundary
/// points are dropped, so the result may have fewer vertices than the input.
pub fn convex_hull(points: &[Point2<f64>]) -> Vec<Point2<f64>> {
    let mut sorted = points.to_vec();
    sorted.sort_by(|p, q| p.x.total_cmp(&q.x).then(p.y.total_cmp(&q.y)));

    let mut lower = build_chain(sorted.iter(), sorted.len());
    let mut upper = build_chain(sorted.iter().rev(), sorted.len());

    // Last point of each chain is the first point of the other
    lower.pop();
    upper.pop();

    lower.extend(upper);
    lower
}

/// Signed shoelace area of a closed vertex ring (positive for counter-clockwise winding)
pub fn ring_area(ring: &[Point2<f64>]) -> f64 {
    let n = ring.len();
    let mut sum = 0.0;
    for i in 0..n {
        let p = &ring[i];
        let q = &ring[(i + 1) % n];
        sum += p.x * q.y - q.x * p.y;
    }
    sum / 2.0
}

/// Sum of the edge lengths of a closed vertex ring
pub fn ring_perimeter(ring: &[Point2<f64>]) -> f64 {
    let n = ring.len();
    let mut perimeter = 0.0;
    for i in 0..n {
        perimeter += nalgebra::distance(&ring[i], &ring[(i + 1) % n]);
    }
    perimeter
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn pts(coords: &[(f64, f64)]) -> Vec<Point2<f64>> {
        coords.iter().map(|&(x, y)| Point2::new(x, y)).collect()
    }

    #[test]
    fn square_with_interior_point() {
        let points = pts(&[(0.0, 0.0), (1.0, 0.0), (0.5, 0.5), (1.0, 1.0), (0.0, 1.0)]);
        let hull = convex_hull(&points);
        assert_eq!(hull, pts(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]));
        assert_approx_eq!(ring_area(&hull), 1.0);
        assert_approx_eq!(ring_perimeter(&hull), 4.0);
    }

    #[test]
    fn collinear_edge_points_are_dropped() {
        let points = pts(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (2.0, 2.0), (0.0, 2.0)]);
        let hull = convex_hull(&points);
        assert_eq!(hull.len(), 4);
        assert!(!hull.contains(&Point2::new(1.0, 0.0)));
    }

    #[test]
    fn reflex_vertex_is_excluded() {
        // Arrow shape: the notch at (1, 1) is not on the hull
        let points = pts(&[(0.0, 0.0), (2.0, 0.0), (2.0, 2.0), (1.0, 1.0), (0.0, 2.0)]);
        let hull = convex_hull(&points);
        assert_eq!(hull.len(), 4);
        assert_approx_eq!(ring_area(&hull), 4.0);
        assert!(ring_area(&points) < ring_area(&hull));
    }

    #[test]
    fn hull_is_counter_clockwise() {
        let points = pts(&[(3.0, 1.0), (-1.0, 2.0), (0.0, -2.0), (0.5, 0.1)]);
        let hull = convex_hull(&points);
        assert_eq!(hull.len(), 3);
        assert!(ring_area(&hull) > 0.0);
        assert_eq!(hull[0], Point2::new(-1.0, 2.0));
    }

    #[test]
    fn clockwise_ring_has_negative_area() {
        let ring = pts(&[(0.0, 0.0), (0.0, 1.0), (1.0, 1.0), (1.0, 0.0)]);
        assert_approx_eq!(ring_area(&ring), -1.0);
    }
}
