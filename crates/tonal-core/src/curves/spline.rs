//! Catmull-Rom spline plotting into integer curve tables.
//!
//! Catmull-Rom splines (1974) provide C1 continuity through control points.
//! For each segment between P1 and P2, with neighbors P0 and P3:
//! ```text
//! q(t) = 0.5 × ((2×P1) + (-P0 + P2)×t + (2×P0 - 5×P1 + 4×P2 - P3)×t² + (-P0 + 3×P1 - 3×P2 + P3)×t³)
//! ```
//!
//! Segments are rasterized with forward differencing: the polynomial is
//! stepped `3 × segment_max` times and every rounded sample that differs
//! from the previous one is written into the table as `curve[x] = y`.

/// 4×4 matrix, row-major.
pub type Matrix4 = [[f64; 4]; 4];

/// Catmull-Rom basis matrix.
pub const CATMULL_ROM_BASIS: Matrix4 = [
    [-0.5, 1.5, -1.5, 0.5],
    [1.0, -2.5, 2.0, -0.5],
    [-0.5, 0.0, 0.5, 0.0],
    [0.0, 1.0, 0.0, 0.0],
];

fn compose(a: &Matrix4, b: &Matrix4) -> Matrix4 {
    let mut ab = [[0.0; 4]; 4];
    for i in 0..4 {
        for j in 0..4 {
            ab[i][j] = a[i][0] * b[0][j] + a[i][1] * b[1][j] + a[i][2] * b[2][j] + a[i][3] * b[3][j];
        }
    }
    ab
}

/// Catmull-Rom cubic interpolation between P1 and P2 for `t` in `[0, 1]`.
pub fn catmull_rom(p0: f64, p1: f64, p2: f64, p3: f64, t: f64) -> f64 {
    let t2 = t * t;
    let t3 = t2 * t;
    0.5 * ((2.0 * p1)
        + (-p0 + p2) * t
        + (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3) * t2
        + (-p0 + 3.0 * p1 - 3.0 * p2 + p3) * t3)
}

/// Plot the segment between `points[1]` and `points[2]` into `curve`.
///
/// `points` holds `[x, y]` pairs in table units; `curve` must have
/// `segment_max + 1` entries. Samples are clamped to `[0, segment_max]`.
pub fn plot_segment(curve: &mut [u16], segment_max: i32, points: [[i32; 2]; 4]) {
    let loopdiv = segment_max * 3;
    let max = segment_max as f64;

    let mut geometry = [[0.0; 4]; 4];
    for (row, p) in geometry.iter_mut().zip(points) {
        row[0] = p[0] as f64;
        row[1] = p[1] as f64;
    }

    let d1 = 1.0 / loopdiv as f64;
    let d2 = d1 * d1;
    let d3 = d1 * d1 * d1;

    // Forward-differencing deltas for a cubic with step d1.
    let steps: Matrix4 = [
        [0.0, 0.0, 0.0, 1.0],
        [d3, d2, d1, 0.0],
        [6.0 * d3, 2.0 * d2, 0.0, 0.0],
        [6.0 * d3, 0.0, 0.0, 0.0],
    ];

    let coefficients = compose(&CATMULL_ROM_BASIS, &geometry);
    let deltas = compose(&steps, &coefficients);

    let (mut x, mut dx, mut dx2, dx3) = (deltas[0][0], deltas[1][0], deltas[2][0], deltas[3][0]);
    let (mut y, mut dy, mut dy2, dy3) = (deltas[0][1], deltas[1][1], deltas[2][1], deltas[3][1]);

    let mut last_x = x.clamp(0.0, max) as i32;
    let mut last_y = y.clamp(0.0, max) as i32;
    curve[last_x as usize] = last_y as u16;

    for _ in 0..loopdiv {
        x += dx;
        dx += dx2;
        dx2 += dx3;

        y += dy;
        dy += dy2;
        dy2 += dy3;

        let new_x = (x.round() as i32).clamp(0, segment_max);
        let new_y = (y.round() as i32).clamp(0, segment_max);

        if last_x != new_x || last_y != new_y {
            curve[new_x as usize] = new_y as u16;
        }

        last_x = new_x;
        last_y = new_y;
    }
}
