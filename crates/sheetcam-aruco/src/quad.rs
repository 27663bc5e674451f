//! Quad candidates from dark connected components.
//!
//! Each 4-connected blob of dark pixels is reduced to its boundary, four
//! corners are picked with a farthest-point heuristic, and every side is then
//! refined with a total-least-squares line fit. Decoding decides later whether
//! a candidate is actually a marker.

use nalgebra::{Point2, Vector2};

/// Limits applied while extracting quad candidates.
#[derive(Clone, Copy, Debug)]
pub(crate) struct QuadLimits {
    pub min_component_px: usize,
    pub max_component_px: usize,
    pub min_side_px: f32,
    pub border_margin_px: f32,
}

/// Label 4-connected components of `dark` and fit a quad to each one.
///
/// Returned quads are ordered clockwise in image coordinates (y down), in
/// continuous coordinates where pixel `(i, j)` covers `[i, i+1) × [j, j+1)`.
pub(crate) fn find_quads(
    dark: &[bool],
    width: usize,
    height: usize,
    limits: &QuadLimits,
) -> Vec<[Point2<f32>; 4]> {
    let mut visited = vec![false; dark.len()];
    let mut stack: Vec<usize> = Vec::new();
    let mut pixels: Vec<usize> = Vec::new();
    let mut quads = Vec::new();
    let mut components = 0usize;

    for seed in 0..dark.len() {
        if !dark[seed] || visited[seed] {
            continue;
        }

        pixels.clear();
        visited[seed] = true;
        stack.push(seed);
        let mut touches_edge = false;

        while let Some(idx) = stack.pop() {
            pixels.push(idx);
            let x = idx % width;
            let y = idx / width;
            if x == 0 || y == 0 || x + 1 == width || y + 1 == height {
                touches_edge = true;
            }
            for n in neighbors4(x, y, width, height).into_iter().flatten() {
                if dark[n] && !visited[n] {
                    visited[n] = true;
                    stack.push(n);
                }
            }
        }
        components += 1;

        if touches_edge
            || pixels.len() < limits.min_component_px
            || pixels.len() > limits.max_component_px
        {
            continue;
        }

        let boundary = boundary_points(&pixels, dark, width, height);
        if let Some(quad) = fit_quad(&boundary, limits) {
            if within_margin(&quad, width, height, limits.border_margin_px) {
                quads.push(quad);
            }
        }
    }

    log::debug!(
        "quad search: {} components, {} quad candidates",
        components,
        quads.len()
    );
    quads
}

#[inline]
fn neighbors4(x: usize, y: usize, width: usize, height: usize) -> [Option<usize>; 4] {
    let idx = y * width + x;
    [
        (x > 0).then(|| idx - 1),
        (x + 1 < width).then(|| idx + 1),
        (y > 0).then(|| idx - width),
        (y + 1 < height).then(|| idx + width),
    ]
}

/// Pixel centres of component pixels that have a non-dark 4-neighbour.
fn boundary_points(pixels: &[usize], dark: &[bool], width: usize, height: usize) -> Vec<Point2<f32>> {
    pixels
        .iter()
        .filter(|&&idx| {
            let x = idx % width;
            let y = idx / width;
            neighbors4(x, y, width, height)
                .into_iter()
                .any(|n| n.is_none_or(|n| !dark[n]))
        })
        .map(|&idx| Point2::new((idx % width) as f32 + 0.5, (idx / width) as f32 + 0.5))
        .collect()
}

fn fit_quad(boundary: &[Point2<f32>], limits: &QuadLimits) -> Option<[Point2<f32>; 4]> {
    if boundary.len() < 8 {
        return None;
    }

    let centroid = mean(boundary);
    let a = *farthest_from(boundary, centroid)?;
    let b = *farthest_from(boundary, a)?;

    let ab = b - a;
    let ab_len = ab.norm();
    if ab_len < limits.min_side_px {
        return None;
    }

    let mut c: Option<(f32, Point2<f32>)> = None;
    let mut d: Option<(f32, Point2<f32>)> = None;
    for &p in boundary {
        let s = cross(ab, p - a) / ab_len;
        if s > 0.0 && c.is_none_or(|(best, _)| s > best) {
            c = Some((s, p));
        } else if s < 0.0 && d.is_none_or(|(best, _)| -s > best) {
            d = Some((-s, p));
        }
    }
    let (dist_c, c) = c?;
    let (dist_d, d) = d?;
    if dist_c < limits.min_side_px * 0.5 || dist_d < limits.min_side_px * 0.5 {
        return None;
    }

    let coarse = sort_clockwise([a, c, b, d]);
    if !is_convex(&coarse) {
        return None;
    }

    let quad = refine_sides(boundary, &coarse).unwrap_or_else(|| pad_outward(&coarse));
    if !is_convex(&quad) || min_side(&quad) < limits.min_side_px {
        return None;
    }
    Some(quad)
}

fn mean(points: &[Point2<f32>]) -> Point2<f32> {
    let n = points.len().max(1) as f32;
    let (sx, sy) = points
        .iter()
        .fold((0.0f32, 0.0f32), |(sx, sy), p| (sx + p.x, sy + p.y));
    Point2::new(sx / n, sy / n)
}

fn farthest_from(points: &[Point2<f32>], from: Point2<f32>) -> Option<&Point2<f32>> {
    points.iter().max_by(|p, q| {
        (**p - from)
            .norm_squared()
            .total_cmp(&(**q - from).norm_squared())
    })
}

#[inline]
fn cross(a: Vector2<f32>, b: Vector2<f32>) -> f32 {
    a.x * b.y - a.y * b.x
}

/// Ascending image angle around the centroid, i.e. clockwise on screen.
pub(crate) fn sort_clockwise(mut pts: [Point2<f32>; 4]) -> [Point2<f32>; 4] {
    let c = mean(&pts);
    pts.sort_by(|p, q| {
        let ap = (p.y - c.y).atan2(p.x - c.x);
        let aq = (q.y - c.y).atan2(q.x - c.x);
        ap.total_cmp(&aq)
    });
    pts
}

/// Strictly convex with clockwise (positive cross product in y-down) winding.
pub(crate) fn is_convex(quad: &[Point2<f32>; 4]) -> bool {
    (0..4).all(|i| {
        let p0 = quad[i];
        let p1 = quad[(i + 1) % 4];
        let p2 = quad[(i + 2) % 4];
        cross(p1 - p0, p2 - p1) > 0.0
    })
}

fn min_side(quad: &[Point2<f32>; 4]) -> f32 {
    (0..4)
        .map(|i| (quad[(i + 1) % 4] - quad[i]).norm())
        .fold(f32::INFINITY, f32::min)
}

fn within_margin(quad: &[Point2<f32>; 4], width: usize, height: usize, margin: f32) -> bool {
    quad.iter().all(|p| {
        p.x >= margin
            && p.y >= margin
            && p.x <= width as f32 - margin
            && p.y <= height as f32 - margin
    })
}

/// Boundary pixel centres sit half a pixel inside the true edge; push the
/// coarse corners out along the diagonal from the quad centre.
fn pad_outward(quad: &[Point2<f32>; 4]) -> [Point2<f32>; 4] {
    let c = mean(quad);
    quad.map(|p| {
        let dir = p - c;
        let len = dir.norm();
        if len > 0.0 {
            p + dir * (std::f32::consts::SQRT_2 * 0.5 / len)
        } else {
            p
        }
    })
}

/// Line `n · p = d` with unit normal `n`.
#[derive(Clone, Copy, Debug)]
struct Line {
    n: Vector2<f32>,
    d: f32,
}

impl Line {
    fn intersect(&self, other: &Line) -> Option<Point2<f32>> {
        let det = self.n.x * other.n.y - self.n.y * other.n.x;
        if det.abs() < 1e-6 {
            return None;
        }
        let x = (self.d * other.n.y - self.n.y * other.d) / det;
        let y = (self.n.x * other.d - self.d * other.n.x) / det;
        Some(Point2::new(x, y))
    }
}

/// Fit one line per side to the boundary points near that side and
/// intersect neighbouring lines.
fn refine_sides(boundary: &[Point2<f32>], coarse: &[Point2<f32>; 4]) -> Option<[Point2<f32>; 4]> {
    let center = mean(coarse);
    let mut lines = [Line {
        n: Vector2::zeros(),
        d: 0.0,
    }; 4];

    for (i, line) in lines.iter_mut().enumerate() {
        let p0 = coarse[i];
        let p1 = coarse[(i + 1) % 4];
        let dir = p1 - p0;
        let len = dir.norm();
        let unit = dir / len;
        let tol = (0.04 * len).max(1.5);

        let near: Vec<Point2<f32>> = boundary
            .iter()
            .copied()
            .filter(|&p| {
                let t = (p - p0).dot(&unit) / len;
                (0.1..=0.9).contains(&t) && cross(unit, p - p0).abs() <= tol
            })
            .collect();
        if near.len() < 3 {
            return None;
        }

        let mut fitted = fit_line(&near)?;
        // Shift half a pixel outward: boundary samples are pixel centres.
        if fitted.n.dot(&center.coords) > fitted.d {
            fitted.n = -fitted.n;
            fitted.d = -fitted.d;
        }
        fitted.d += 0.5;
        *line = fitted;
    }

    let mut refined = *coarse;
    for i in 0..4 {
        let prev = &lines[(i + 3) % 4];
        let p = prev.intersect(&lines[i])?;
        let limit = 3.0 + 0.1 * (coarse[(i + 1) % 4] - coarse[i]).norm();
        if !p.x.is_finite() || !p.y.is_finite() || (p - coarse[i]).norm() > limit {
            return None;
        }
        refined[i] = p;
    }
    Some(refined)
}

/// Total-least-squares line through `points`.
fn fit_line(points: &[Point2<f32>]) -> Option<Line> {
    let m = mean(points);
    let (mut sxx, mut sxy, mut syy) = (0.0f32, 0.0f32, 0.0f32);
    for p in points {
        let dx = p.x - m.x;
        let dy = p.y - m.y;
        sxx += dx * dx;
        sxy += dx * dy;
        syy += dy * dy;
    }
    if sxx + syy <= f32::EPSILON {
        return None;
    }
    let theta = 0.5 * (2.0 * sxy).atan2(sxx - syy);
    let n = Vector2::new(-theta.sin(), theta.cos());
    Some(Line {
        n,
        d: n.dot(&m.coords),
    })
}
