//! Time ordering over points.
//!
//! Upper layers merge per-shard response streams and rely on a stable,
//! deterministic order. A point with no timestamp has no position in time;
//! it sorts after every timestamped point and keeps its relative order
//! among other untimestamped points (the sorts are stable).

use super::Point;
use std::cmp::Ordering;

/// Compare two points by timestamp ascending. Untimestamped points compare
/// greater than timestamped ones and equal to each other.
pub fn cmp_point_time_asc(a: &Point, b: &Point) -> Ordering {
    match (a.timestamp, b.timestamp) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Compare two points by timestamp descending. Untimestamped points still
/// sort last.
pub fn cmp_point_time_desc(a: &Point, b: &Point) -> Ordering {
    match (a.timestamp, b.timestamp) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Stable sort by timestamp ascending.
pub fn sort_points_time_ascending(points: &mut [Point]) {
    points.sort_by(cmp_point_time_asc);
}

/// Stable sort by timestamp descending.
pub fn sort_points_time_descending(points: &mut [Point]) {
    points.sort_by(cmp_point_time_desc);
}
