//! Ear-clipping triangulation of a simple polygon ring.

use glam::Vec2;

/// Twice the signed area of triangle (a, b, c). Positive for counter-clockwise.
#[inline]
fn cross(a: Vec2, b: Vec2, c: Vec2) -> f32 {
    (b - a).perp_dot(c - a)
}

fn signed_area(pts: &[Vec2], ring: &[usize]) -> f32 {
    let n = ring.len();
    (0..n)
        .map(|i| pts[ring[i]].perp_dot(pts[ring[(i + 1) % n]]))
        .sum::<f32>()
        * 0.5
}

/// Inclusive point-in-triangle test for a counter-clockwise triangle.
fn contains(a: Vec2, b: Vec2, c: Vec2, p: Vec2) -> bool {
    cross(a, b, p) >= 0.0 && cross(b, c, p) >= 0.0 && cross(c, a, p) >= 0.0
}

fn is_ear(pts: &[Vec2], ring: &[usize], prev: usize, cur: usize, next: usize) -> bool {
    let (a, b, c) = (pts[prev], pts[cur], pts[next]);
    ring.iter()
        .filter(|&&k| k != prev && k != cur && k != next)
        .map(|&k| pts[k])
        .filter(|&p| p != a && p != b && p != c)
        .all(|p| !contains(a, b, c, p))
}

/// Triangulates an ordered polygon boundary into an index list, three
/// indices per triangle, referring to positions in `ring`.
///
/// Either winding is accepted and a repeated closing vertex is ignored.
/// Collinear vertices are dropped without emitting a zero-area triangle.
/// If the ring is not simple and no valid ear can be found, clipping
/// continues best-effort instead of looping, so a self-intersecting ring
/// still yields as many triangles as it can.
pub fn triangulate(ring: &[Vec2]) -> Vec<u32> {
    let mut n = ring.len();
    if n > 1 && ring[0] == ring[n - 1] {
        n -= 1;
    }
    if n < 3 {
        return Vec::new();
    }
    let pts = &ring[..n];

    let (lo, hi) = pts
        .iter()
        .fold((pts[0], pts[0]), |(lo, hi), &p| (lo.min(p), hi.max(p)));
    let extent = (hi - lo).max_element();
    // collinearity tolerance scales with the polygon so projected (tiny)
    // coordinates behave like screen-sized ones
    let eps = extent * extent * 1e-10;

    let mut remaining: Vec<usize> = (0..n).collect();
    remaining.dedup_by(|a, b| pts[*a] == pts[*b]);
    if remaining.len() > 1 && pts[remaining[0]] == pts[remaining[remaining.len() - 1]] {
        remaining.pop();
    }
    if signed_area(pts, &remaining) < 0.0 {
        remaining.reverse();
    }

    let mut indices = Vec::with_capacity(n.saturating_sub(2) * 3);
    let mut i = 0;
    let mut stalled = 0;

    while remaining.len() > 3 {
        let m = remaining.len();
        let pos = i % m;
        let prev = remaining[(pos + m - 1) % m];
        let cur = remaining[pos];
        let next = remaining[(pos + 1) % m];
        let turn = cross(pts[prev], pts[cur], pts[next]);

        if turn.abs() <= eps {
            remaining.remove(pos);
            stalled = 0;
            i = pos;
            continue;
        }

        let forced = stalled >= m;
        if turn > 0.0 && (forced || is_ear(pts, &remaining, prev, cur, next)) {
            indices.extend_from_slice(&[prev as u32, cur as u32, next as u32]);
            remaining.remove(pos);
            stalled = 0;
            i = pos;
            continue;
        }
        if forced {
            // reflex everywhere: the ring is not simple
            remaining.remove(pos);
            stalled = 0;
            i = pos;
            continue;
        }

        i = (pos + 1) % m;
        stalled += 1;
    }

    if let [a, b, c] = remaining[..] {
        if cross(pts[a], pts[b], pts[c]).abs() > eps {
            indices.extend_from_slice(&[a as u32, b as u32, c as u32]);
        }
    }

    indices
}
