//! Small vector and polygon helpers shared by the pipeline stages.

pub(crate) fn sub(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

pub(crate) fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

pub(crate) fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

pub(crate) fn length(a: [f64; 3]) -> f64 {
    dot(a, a).sqrt()
}

pub(crate) fn normalize(a: [f64; 3]) -> [f64; 3] {
    let len = length(a);
    if len == 0.0 {
        [0.0; 3]
    } else {
        [a[0] / len, a[1] / len, a[2] / len]
    }
}

/// Newell normal of a polygon loop; magnitude is twice the enclosed area.
pub(crate) fn polygon_normal(points: &[[f64; 3]]) -> [f64; 3] {
    let mut n = [0.0; 3];
    for i in 0..points.len() {
        let a = points[i];
        let b = points[(i + 1) % points.len()];
        n[0] += (a[1] - b[1]) * (a[2] + b[2]);
        n[1] += (a[2] - b[2]) * (a[0] + b[0]);
        n[2] += (a[0] - b[0]) * (a[1] + b[1]);
    }
    n
}

pub(crate) fn polygon_area(points: &[[f64; 3]]) -> f64 {
    0.5 * length(polygon_normal(points))
}

fn dominant_axis(n: [f64; 3]) -> usize {
    let mut axis = 0;
    for i in 1..3 {
        if n[i].abs() > n[axis].abs() {
            axis = i;
        }
    }
    axis
}

/// Projects a near-planar loop onto the dominant plane of its Newell
/// normal, oriented so the projection turns counterclockwise.
fn project_loop(points: &[[f64; 3]]) -> Vec<[f64; 2]> {
    let normal = polygon_normal(points);
    let axis = dominant_axis(normal);
    let (u, v) = ((axis + 1) % 3, (axis + 2) % 3);
    if normal[axis] >= 0.0 {
        points.iter().map(|p| [p[u], p[v]]).collect()
    } else {
        points.iter().map(|p| [p[v], p[u]]).collect()
    }
}

fn turn(a: [f64; 2], b: [f64; 2], c: [f64; 2]) -> f64 {
    (b[0] - a[0]) * (c[1] - a[1]) - (b[1] - a[1]) * (c[0] - a[0])
}

fn point_strictly_inside(p: [f64; 2], a: [f64; 2], b: [f64; 2], c: [f64; 2]) -> bool {
    turn(a, b, p) > 0.0 && turn(b, c, p) > 0.0 && turn(c, a, p) > 0.0
}

/// Whether the loop makes no clockwise turn in its own plane. Collinear
/// corners count as convex.
pub(crate) fn is_convex_polygon(points: &[[f64; 3]]) -> bool {
    if points.len() <= 3 {
        return true;
    }
    let proj = project_loop(points);
    let n = proj.len();
    (0..n).all(|i| turn(proj[(i + n - 1) % n], proj[i], proj[(i + 1) % n]) >= 0.0)
}

/// Ear-clips a simple near-planar polygon. Returns index triples into
/// `points`, winding as the input loop does. Falls back to a fan when the
/// ring degenerates, so the triangle count is always `len - 2`.
pub(crate) fn triangulate_polygon(points: &[[f64; 3]]) -> Vec<[usize; 3]> {
    let n = points.len();
    let mut triangles = Vec::new();
    if n < 3 {
        return triangles;
    }
    if n == 3 {
        triangles.push([0, 1, 2]);
        return triangles;
    }
    let proj = project_loop(points);
    let mut remaining: Vec<usize> = (0..n).collect();
    while remaining.len() > 3 {
        let m = remaining.len();
        let mut clipped = false;
        for i in 0..m {
            let prev = remaining[(i + m - 1) % m];
            let cur = remaining[i];
            let next = remaining[(i + 1) % m];
            if turn(proj[prev], proj[cur], proj[next]) <= 0.0 {
                continue;
            }
            let blocked = remaining.iter().any(|&o| {
                o != prev
                    && o != cur
                    && o != next
                    && point_strictly_inside(proj[o], proj[prev], proj[cur], proj[next])
            });
            if blocked {
                continue;
            }
            triangles.push([prev, cur, next]);
            remaining.remove(i);
            clipped = true;
            break;
        }
        if !clipped {
            for i in 1..remaining.len() - 1 {
                triangles.push([remaining[0], remaining[i], remaining[i + 1]]);
            }
            return triangles;
        }
    }
    triangles.push([remaining[0], remaining[1], remaining[2]]);
    triangles
}
