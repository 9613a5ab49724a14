//! Homogeneous 4×4 matrices: guarded inversion and unprojection.

use nalgebra::{Matrix4, Vector3, Vector4};

use crate::EPSILON;

/// Default determinant threshold for [`invert`].
pub const MIN_DETERMINANT: f64 = 1e-10;

/// Invert `m`, or `None` if `|det(m)| < min_det`.
#[must_use]
pub fn invert(m: &Matrix4<f64>, min_det: f64) -> Option<Matrix4<f64>> {
    if m.determinant().abs() < min_det {
        return None;
    }
    m.try_inverse()
}

/// Transpose of the inverse, used to carry plane equations and normals.
#[must_use]
pub fn inverse_transpose(m: &Matrix4<f64>, min_det: f64) -> Option<Matrix4<f64>> {
    invert(m, min_det).map(|inv| inv.transpose())
}

/// Map a normalized-device-coordinate point back through an inverse
/// view-projection matrix, with perspective divide.
///
/// Returns `None` when the homogeneous `w` is zero.
#[must_use]
pub fn unproject(inv_view_proj: &Matrix4<f64>, ndc: &Vector3<f64>) -> Option<Vector3<f64>> {
    let h = inv_view_proj * Vector4::new(ndc.x, ndc.y, ndc.z, 1.0);
    if h.w.abs() < EPSILON {
        return None;
    }
    Some(h.xyz() / h.w)
}

/// Origin and unit direction of the ray through a cursor position given in
/// normalized device coordinates (`[-1, 1]` on both axes).
///
/// The ray starts on the near plane and points towards the far plane.
#[must_use]
pub fn cursor_ray(inv_view_proj: &Matrix4<f64>, x: f64, y: f64) -> Option<(Vector3<f64>, Vector3<f64>)> {
    let near = unproject(inv_view_proj, &Vector3::new(x, y, -1.0))?;
    let far = unproject(inv_view_proj, &Vector3::new(x, y, 1.0))?;
    let dir = far - near;
    let len = dir.norm();
    if len < EPSILON {
        return None;
    }
    Some((near, dir / len))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{Perspective3, Point3};

    #[test]
    fn test_invert_singular() {
        assert!(invert(&Matrix4::zeros(), MIN_DETERMINANT).is_none());
        let mut m = Matrix4::identity();
        m[(2, 2)] = 1e-12;
        assert!(invert(&m, MIN_DETERMINANT).is_none());
    }

    #[test]
    fn test_invert_roundtrip() {
        let m = Matrix4::new(
            2.0, 0.0, 0.0, 1.0, //
            0.0, 3.0, 0.0, 2.0, //
            0.0, 0.0, 4.0, 3.0, //
            0.0, 0.0, 0.0, 1.0,
        );
        let inv = invert(&m, MIN_DETERMINANT).unwrap_or_else(Matrix4::zeros);
        assert_relative_eq!(m * inv, Matrix4::identity(), epsilon = 1e-12);

        let it = inverse_transpose(&m, MIN_DETERMINANT).unwrap_or_else(Matrix4::zeros);
        assert_relative_eq!(it, inv.transpose(), epsilon = 1e-12);
    }

    #[test]
    fn test_unproject_perspective() {
        let proj = Perspective3::new(1.0, 1.0, 0.5, 100.0).to_homogeneous();
        let inv = invert(&proj, MIN_DETERMINANT).unwrap_or_else(Matrix4::zeros);

        let p = Point3::new(0.3, -0.2, -5.0);
        let ndc = proj.transform_point(&p);
        let back = unproject(&inv, &ndc.coords).unwrap_or_else(Vector3::zeros);
        assert_relative_eq!(back, p.coords, epsilon = 1e-9);
    }

    #[test]
    fn test_cursor_ray_center() {
        let proj = Perspective3::new(1.0, 1.0, 0.5, 100.0).to_homogeneous();
        let inv = invert(&proj, MIN_DETERMINANT).unwrap_or_else(Matrix4::zeros);
        let (origin, dir) = cursor_ray(&inv, 0.0, 0.0).unwrap_or((Vector3::zeros(), Vector3::zeros()));
        assert_relative_eq!(origin.z, -0.5, epsilon = 1e-9);
        assert_relative_eq!(dir, Vector3::new(0.0, 0.0, -1.0), epsilon = 1e-9);
    }
}
