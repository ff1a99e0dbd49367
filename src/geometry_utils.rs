use geo::{Coord, Euclidean, InterpolatableLine, LineString};
use std::f64::consts::PI;

// Segments shorter than this are treated as degenerate when deriving bearings.
const MIN_SEGMENT_LEN: f64 = 1e-9;

/// Angle in radians (counter-clockwise from +x) of the vector a -> b.
pub fn angle_between(a: Coord, b: Coord) -> f64 {
    (b.y - a.y).atan2(b.x - a.x)
}

/// Maps an angle into [0, 2π) so that "noon" (straight up) lands at 0 and
/// sorting by descending value walks the node clockwise from noon.
pub fn normalize_bearing(angle: f64) -> f64 {
    (angle + PI * 1.5).rem_euclid(2.0 * PI)
}

/// First non-degenerate segment of `coords`, walked from the start
/// (`from_start`) or from the end. Returns it oriented away from that end.
pub fn front_segment(coords: &[Coord], from_start: bool) -> Option<(Coord, Coord)> {
    if coords.len() < 2 {
        return None;
    }
    let anchor = if from_start {
        coords[0]
    } else {
        coords[coords.len() - 1]
    };

    let probe = |c: &Coord| {
        let dx = c.x - anchor.x;
        let dy = c.y - anchor.y;
        (dx * dx + dy * dy).sqrt() > MIN_SEGMENT_LEN
    };

    let next = if from_start {
        coords.iter().skip(1).find(|c| probe(*c))
    } else {
        coords.iter().rev().skip(1).find(|c| probe(*c))
    };
    next.map(|c| (anchor, *c))
}

/// Straight segment between two points, used when an edge comes without geometry.
pub fn straight_line(a: Coord, b: Coord) -> LineString {
    LineString::new(vec![a, b])
}

/// Point at `fraction` of the way along `line`, falling back to `fallback`
/// for empty or zero-length geometries.
pub fn interpolate_along(line: &LineString, fraction: f64, fallback: Coord) -> Coord {
    if line.0.is_empty() {
        return fallback;
    }
    match line.point_at_ratio_from_start(&Euclidean, fraction.clamp(0.0, 1.0)) {
        Some(p) if p.x().is_finite() && p.y().is_finite() => p.0,
        _ => fallback,
    }
}
