use crate::compositor::geometry::ray_sphere_intersect;
use crate::compositor::geometry::UI_RADIUS;
use crate::compositor::geometry::VIRTUAL_UI_TARGET_FOV_X;
use crate::compositor::geometry::VIRTUAL_UI_TARGET_FOV_Y;
use crate::compositor::ModelTransform;
use display_plugins_api::utils;
use display_plugins_api::utils::EPSILON;
use display_plugins_api::HandLaserInfo;
use euclid::default::Transform3D;
use euclid::default::Vector3D;

pub const NO_GLOW_POINT: [f32; 2] = [-1.0, -1.0];

/// A tracked hand whose laser is switched on, cast into sensor space.
struct LaserCast {
    origin: Vector3D<f32>,
    direction: Vector3D<f32>,
}

fn cast(hand_pose: &Transform3D<f32>, laser: &HandLaserInfo) -> Option<LaserCast> {
    // Untracked hands report identity
    if utils::is_identity(hand_pose) || !laser.valid() {
        return None;
    }
    let direction = utils::rotation_of(hand_pose).transform_vector3d(laser.direction);
    if direction.length() < EPSILON {
        return None;
    }
    Some(LaserCast {
        origin: utils::translation_of(hand_pose),
        direction: direction.normalize(),
    })
}

/// Distance from the hand to where its laser meets the UI sphere.
pub fn laser_distance(hand_pose: &Transform3D<f32>, laser: &HandLaserInfo, ui_center: Vector3D<f32>) -> Option<f32> {
    let cast = cast(hand_pose, laser)?;
    ray_sphere_intersect(cast.direction, cast.origin - ui_center, UI_RADIUS)
}

/// Overlay texture coordinate the laser points at, or `None` when it misses
/// the UI sphere or hits it outside the overlay's angular extent.
pub fn hand_glow_point(hand_pose: &Transform3D<f32>, laser: &HandLaserInfo, ui_model: &ModelTransform) -> Option<[f32; 2]> {
    let cast = cast(hand_pose, laser)?;
    let center = ui_model.translation;
    let distance = ray_sphere_intersect(cast.direction, cast.origin - center, UI_RADIUS)?;
    let hit = cast.origin + cast.direction * distance - center;
    let local = ui_model.rotation.inverse().transform_vector3d(hit);

    let horizontal = (local.x * local.x + local.z * local.z).sqrt();
    if horizontal < EPSILON {
        // Straight up or down, outside any overlay
        return None;
    }
    let yaw = local.x.atan2(-local.z);
    let pitch = (local.y / UI_RADIUS).clamp(-1.0, 1.0).asin();
    if yaw.abs() > VIRTUAL_UI_TARGET_FOV_X / 2.0 || pitch.abs() > VIRTUAL_UI_TARGET_FOV_Y / 2.0 {
        return None;
    }
    Some([yaw / VIRTUAL_UI_TARGET_FOV_X + 0.5, pitch / VIRTUAL_UI_TARGET_FOV_Y + 0.5])
}

/// Model matrix of the unit laser line (origin to -Z) for one hand: turned
/// toward the laser direction and stretched to the UI sphere.
pub fn laser_model(hand_pose: &Transform3D<f32>, laser: &HandLaserInfo, ui_center: Vector3D<f32>) -> Option<Transform3D<f32>> {
    let distance = laser_distance(hand_pose, laser, ui_center)?;
    let aim = utils::rotation_between(Vector3D::new(0.0, 0.0, -1.0), laser.direction);
    Some(
        Transform3D::scale(distance, distance, distance)
            .then(&aim.to_transform())
            .then(hand_pose),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use display_plugins_api::HandLaserMode;
    use euclid::default::Point3D;
    use euclid::default::Rotation3D;
    use euclid::Angle;

    fn laser(direction: Vector3D<f32>) -> HandLaserInfo {
        HandLaserInfo {
            mode: HandLaserMode::Overlay,
            color: [1.0, 0.0, 0.0, 1.0],
            direction,
        }
    }

    fn forward() -> Vector3D<f32> {
        Vector3D::new(0.0, 0.0, -1.0)
    }

    #[test]
    fn straight_ahead_glows_at_overlay_center() {
        let pose = Transform3D::translation(0.0, 0.0, 0.1);
        let point = hand_glow_point(&pose, &laser(forward()), &ModelTransform::default()).unwrap();
        assert!((point[0] - 0.5).abs() < 1.0e-4);
        assert!((point[1] - 0.5).abs() < 1.0e-4);
    }

    #[test]
    fn pointing_right_moves_glow_right() {
        let pose = Transform3D::translation(0.0, 0.0, 0.1);
        let turned = Rotation3D::around_y(Angle::radians(-0.5)).transform_vector3d(forward());
        let point = hand_glow_point(&pose, &laser(turned), &ModelTransform::default()).unwrap();
        assert!(point[0] > 0.5);
    }

    #[test]
    fn behind_the_user_is_out_of_range() {
        let pose = Transform3D::translation(0.0, 0.0, 0.1);
        let back = Vector3D::new(0.0, 0.0, 1.0);
        assert_eq!(hand_glow_point(&pose, &laser(back), &ModelTransform::default()), None);
    }

    #[test]
    fn untracked_or_disabled_hands_cast_nothing() {
        let identity = Transform3D::identity();
        assert_eq!(hand_glow_point(&identity, &laser(forward()), &ModelTransform::default()), None);
        let pose = Transform3D::translation(0.0, 0.0, 0.1);
        assert_eq!(laser_model(&pose, &HandLaserInfo::default(), Vector3D::zero()), None);
    }

    #[test]
    fn laser_reaches_the_sphere() {
        let pose = Transform3D::translation(0.0, 0.0, 0.5);
        let model = laser_model(&pose, &laser(forward()), Vector3D::zero()).unwrap();
        let tip = model.transform_point3d(Point3D::new(0.0, 0.0, -1.0)).unwrap();
        assert!((tip.z + 1.0).abs() < 1.0e-4);
        let start = model.transform_point3d(Point3D::origin()).unwrap();
        assert!((start.z - 0.5).abs() < 1.0e-4);
    }

    #[test]
    fn laser_follows_requested_direction() {
        let pose = Transform3D::translation(0.0, 0.0, 0.2);
        let down = Vector3D::new(0.0, -1.0, 0.0);
        let model = laser_model(&pose, &laser(down), Vector3D::zero()).unwrap();
        let tip = model.transform_point3d(Point3D::new(0.0, 0.0, -1.0)).unwrap();
        assert!(tip.y < -0.9);
        assert!(((tip.x * tip.x + tip.y * tip.y + tip.z * tip.z).sqrt() - 1.0).abs() < 1.0e-4);
    }
}
