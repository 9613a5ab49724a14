//! Ray intersection tests used for picking.
//!
//! Distances are expressed in units of the ray vector, so with a unit-length
//! ray they are world distances along the ray.

use nalgebra::Vector3;

/// Intersect the ray `origin + t·ray` with a sphere.
///
/// Returns the parameter `t` of the entry point, clamped to zero when the
/// origin is already inside the sphere. Returns `None` on a miss or when the
/// sphere lies entirely behind the origin.
#[must_use]
pub fn intersect_ray_sphere(
    origin: &Vector3<f64>,
    ray: &Vector3<f64>,
    center: &Vector3<f64>,
    radius: f64,
) -> Option<f64> {
    let to_center = center - origin;
    let v = to_center.dot(ray);
    let inside = radius * radius - to_center.norm_squared();
    if inside < 0.0 && v < 0.0 {
        return None;
    }
    let ray_sq = ray.norm_squared();
    let d = inside * ray_sq + v * v;
    if d < 0.0 || ray_sq <= 0.0 {
        return None;
    }
    Some((v - d.sqrt()).max(0.0) / ray_sq)
}

/// Intersect the ray `origin + t·ray` with triangle `(a, b, c)`
/// (Möller-Trumbore, both faces).
///
/// Returns the parameter `t ≥ 0` of the hit.
#[must_use]
pub fn intersect_ray_triangle(
    origin: &Vector3<f64>,
    ray: &Vector3<f64>,
    a: &Vector3<f64>,
    b: &Vector3<f64>,
    c: &Vector3<f64>,
) -> Option<f64> {
    let e1 = b - a;
    let e2 = c - a;
    let p = ray.cross(&e2);
    let det = e1.dot(&p);
    if det == 0.0 {
        return None;
    }
    let r = origin - a;
    let u = r.dot(&p) / det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let q = r.cross(&e1);
    let v = ray.dot(&q) / det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    let t = e2.dot(&q) / det;
    (t >= 0.0).then_some(t)
}
