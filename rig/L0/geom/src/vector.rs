//! Small vector helpers.

use nalgebra::Vector3;

use crate::EPSILON;

/// Normalize `v`, returning `fallback` when `v` is (nearly) zero.
#[inline]
#[must_use]
pub fn safe_normalize(v: &Vector3<f64>, fallback: Vector3<f64>) -> Vector3<f64> {
    let n = v.norm();
    if n > EPSILON { v / n } else { fallback }
}

/// A vector perpendicular to `v` (not normalized).
///
/// Built by swapping the dominant component with its successor, so the
/// result is zero only when `v` is.
#[must_use]
pub fn orthogonal(v: &Vector3<f64>) -> Vector3<f64> {
    let (x, y, z) = (v.x.abs(), v.y.abs(), v.z.abs());
    let i = if x > y {
        if x > z { 0 } else { 2 }
    } else if y > z {
        1
    } else {
        2
    };
    let mut o = Vector3::zeros();
    o[i] = v[(i + 1) % 3];
    o[(i + 1) % 3] = -v[i];
    o
}

/// Unit direction for a yaw/pitch pair (radians).
///
/// Yaw 0 looks down -Y, positive pitch looks up +Z.
#[must_use]
pub fn from_yaw_pitch(yaw: f64, pitch: f64) -> Vector3<f64> {
    let c = pitch.cos();
    Vector3::new(yaw.sin() * c, -yaw.cos() * c, pitch.sin())
}

/// Arithmetic mean of a set of points given as coordinate vectors.
///
/// Returns `None` for an empty set.
#[must_use]
pub fn centroid<'a, I>(points: I) -> Option<Vector3<f64>>
where
    I: IntoIterator<Item = &'a Vector3<f64>>,
{
    let mut sum = Vector3::zeros();
    let mut count = 0usize;
    for p in points {
        sum += p;
        count += 1;
    }
    if count == 0 {
        return None;
    }
    #[allow(clippy::cast_precision_loss)]
    let n = count as f64;
    Some(sum / n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_safe_normalize() {
        let v = safe_normalize(&Vector3::new(3.0, 0.0, 4.0), Vector3::x());
        assert_relative_eq!(v.norm(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(v.z, 0.8, epsilon = 1e-12);

        let z = safe_normalize(&Vector3::zeros(), Vector3::y());
        assert_eq!(z, Vector3::y());
    }

    #[test]
    fn test_orthogonal() {
        for v in [
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(0.0, -2.0, 0.5),
            Vector3::new(0.3, 0.3, 5.0),
        ] {
            let o = orthogonal(&v);
            assert!(o.norm() > 0.0);
            assert_relative_eq!(o.dot(&v), 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_yaw_pitch() {
        let forward = from_yaw_pitch(0.0, 0.0);
        assert_relative_eq!(forward, Vector3::new(0.0, -1.0, 0.0), epsilon = 1e-12);

        let up = from_yaw_pitch(0.0, std::f64::consts::FRAC_PI_2);
        assert_relative_eq!(up.z, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_centroid() {
        let pts = [
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(3.0, 0.0, 0.0),
            Vector3::new(0.0, 3.0, 0.0),
        ];
        let c = centroid(pts.iter()).unwrap_or_else(Vector3::zeros);
        assert_relative_eq!(c, Vector3::new(1.0, 1.0, 0.0), epsilon = 1e-12);
        assert!(centroid(std::iter::empty::<&Vector3<f64>>()).is_none());
    }
}
