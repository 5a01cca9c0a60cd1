use display_plugins_api::utils::EPSILON;
use euclid::default::Point2D;
use euclid::default::Size2D;
use euclid::default::Vector3D;
use std::f32::consts::PI;

pub const VIRTUAL_SCREEN_SIZE_X: f32 = 3960.0;
pub const VIRTUAL_SCREEN_SIZE_Y: f32 = 1188.0;
pub const VIRTUAL_UI_ASPECT_RATIO: f32 = VIRTUAL_SCREEN_SIZE_X / VIRTUAL_SCREEN_SIZE_Y;
// Angular extent of the UI sphere section
pub const VIRTUAL_UI_TARGET_FOV_X: f32 = PI * 3.0 / 2.0;
pub const VIRTUAL_UI_TARGET_FOV_Y: f32 = VIRTUAL_UI_TARGET_FOV_X / VIRTUAL_UI_ASPECT_RATIO;
// Angular range the HMD reticle may roam, beyond the UI itself
pub const MOUSE_EXTENTS_ANGULAR_SIZE_X: f32 = PI * 2.0;
pub const MOUSE_EXTENTS_ANGULAR_SIZE_Y: f32 = PI * 0.95;
pub const MOUSE_EXTENTS_PIXELS_X: f32 =
    VIRTUAL_SCREEN_SIZE_X * (MOUSE_EXTENTS_ANGULAR_SIZE_X / VIRTUAL_UI_TARGET_FOV_X);
pub const MOUSE_EXTENTS_PIXELS_Y: f32 =
    VIRTUAL_SCREEN_SIZE_Y * (MOUSE_EXTENTS_ANGULAR_SIZE_Y / VIRTUAL_UI_TARGET_FOV_Y);
pub const UI_RADIUS: f32 = 1.0;

/// Unit sphere point for the given yaw and pitch. Yaw 0, pitch 0 faces -Z.
pub fn sphere_point(yaw: f32, pitch: f32) -> Vector3D<f32> {
    Vector3D::new(
        (-pitch).cos() * -yaw.sin(),
        (-pitch).sin(),
        (-pitch).cos() * -yaw.cos(),
    )
}

/// Inverse of `sphere_point` for any non-zero direction.
pub fn yaw_pitch(direction: Vector3D<f32>) -> Point2D<f32> {
    let direction = direction.normalize();
    Point2D::new(
        -direction.x.atan2(-direction.z),
        -direction.y.clamp(-1.0, 1.0).asin(),
    )
}

/// Overlay pixels to (yaw, pitch). Increasing x turns right, which is
/// decreasing yaw.
pub fn overlay_to_spherical(overlay: Point2D<f32>, ui_size: Size2D<f32>) -> Point2D<f32> {
    let x = (overlay.x / ui_size.width - 0.5) * VIRTUAL_UI_TARGET_FOV_Y * VIRTUAL_UI_ASPECT_RATIO;
    let y = (overlay.y / ui_size.height - 0.5) * VIRTUAL_UI_TARGET_FOV_Y;
    Point2D::new(-x, y)
}

pub fn spherical_to_overlay(polar: Point2D<f32>, ui_size: Size2D<f32>) -> Point2D<f32> {
    let x = -polar.x / VIRTUAL_UI_ASPECT_RATIO / VIRTUAL_UI_TARGET_FOV_Y;
    let y = polar.y / VIRTUAL_UI_TARGET_FOV_Y;
    Point2D::new((x + 0.5) * ui_size.width, (y + 0.5) * ui_size.height)
}

/// Distance along `direction` to the first hit of the sphere of `radius`
/// centered at the origin. Rays starting inside hit the far side.
pub fn ray_sphere_intersect(direction: Vector3D<f32>, origin: Vector3D<f32>, radius: f32) -> Option<f32> {
    let a = direction.dot(direction);
    if a < EPSILON {
        return None;
    }
    let b = 2.0 * direction.dot(origin);
    let c = origin.dot(origin) - radius * radius;
    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        return None;
    }
    let dist_sqrt = disc.sqrt();
    let q = if b < 0.0 {
        (-b + dist_sqrt) / 2.0
    } else {
        (-b - dist_sqrt) / 2.0
    };
    if q.abs() < EPSILON {
        // Origin on the surface, direction tangent
        let t = -b / (2.0 * a);
        return if t >= 0.0 { Some(t) } else { None };
    }
    let mut t0 = q / a;
    let mut t1 = c / q;
    if t0 > t1 {
        std::mem::swap(&mut t0, &mut t1);
    }
    if t1 < 0.0 {
        return None;
    }
    if t0 < 0.0 {
        Some(t1)
    } else {
        Some(t0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f32, b: f32) {
        assert!((a - b).abs() < 1.0e-3, "{} != {}", a, b);
    }

    #[test]
    fn forward_is_negative_z() {
        let p = sphere_point(0.0, 0.0);
        assert_close(p.x, 0.0);
        assert_close(p.y, 0.0);
        assert_close(p.z, -1.0);
    }

    #[test]
    fn positive_pitch_looks_down() {
        assert!(sphere_point(0.0, 0.3).y < 0.0);
        assert!(sphere_point(0.3, 0.0).x < 0.0);
    }

    #[test]
    fn yaw_pitch_inverts_sphere_point() {
        for &(yaw, pitch) in &[(0.0, 0.0), (1.2, -0.4), (-2.5, 0.7), (0.3, 1.3)] {
            let polar = yaw_pitch(sphere_point(yaw, pitch));
            assert_close(polar.x, yaw);
            assert_close(polar.y, pitch);
        }
    }

    #[test]
    fn overlay_spherical_round_trip() {
        let ui = Size2D::new(VIRTUAL_SCREEN_SIZE_X, VIRTUAL_SCREEN_SIZE_Y);
        let mut x = 0.0;
        while x <= ui.width {
            let mut y = 0.0;
            while y <= ui.height {
                let p = Point2D::new(x, y);
                let back = spherical_to_overlay(overlay_to_spherical(p, ui), ui);
                assert!((back - p).length() < 0.01, "{:?} != {:?}", back, p);
                y += 99.0;
            }
            x += 330.0;
        }
    }

    #[test]
    fn overlay_center_is_straight_ahead() {
        let ui = Size2D::new(1920.0, 1080.0);
        let polar = overlay_to_spherical(Point2D::new(960.0, 540.0), ui);
        assert_close(polar.x, 0.0);
        assert_close(polar.y, 0.0);
        let left = overlay_to_spherical(Point2D::new(0.0, 540.0), ui);
        assert_close(left.x, VIRTUAL_UI_TARGET_FOV_X / 2.0);
    }

    #[test]
    fn mouse_extents_exceed_ui() {
        assert!((MOUSE_EXTENTS_PIXELS_X - 5280.0).abs() < 0.01);
        assert!((MOUSE_EXTENTS_PIXELS_Y - 2508.0).abs() < 0.01);
    }

    #[test]
    fn ray_toward_sphere_hits_near_side() {
        let origin = Vector3D::new(0.0, 0.0, 5.0);
        let t = ray_sphere_intersect(Vector3D::new(0.0, 0.0, -1.0), origin, 1.0).unwrap();
        assert_close(t, 4.0);
    }

    #[test]
    fn ray_away_from_sphere_misses() {
        let origin = Vector3D::new(0.0, 0.0, 5.0);
        assert_eq!(ray_sphere_intersect(Vector3D::new(0.0, 0.0, 1.0), origin, 1.0), None);
    }

    #[test]
    fn ray_beside_sphere_misses() {
        let origin = Vector3D::new(2.0, 0.0, 5.0);
        assert_eq!(ray_sphere_intersect(Vector3D::new(0.0, 0.0, -1.0), origin, 1.0), None);
    }

    #[test]
    fn ray_from_inside_hits_forward() {
        let origin = Vector3D::new(0.0, 0.0, 0.5);
        let t = ray_sphere_intersect(Vector3D::new(0.0, 0.0, -1.0), origin, 1.0).unwrap();
        assert_close(t, 1.5);
    }

    #[test]
    fn unnormalized_direction_scales_distance() {
        let origin = Vector3D::new(0.0, 0.0, 5.0);
        let t = ray_sphere_intersect(Vector3D::new(0.0, 0.0, -2.0), origin, 1.0).unwrap();
        assert_close(t, 2.0);
    }
}
