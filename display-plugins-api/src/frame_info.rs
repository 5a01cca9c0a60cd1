use crate::utils;
use euclid::default::Rotation3D;
use euclid::default::Transform3D;

/// Per-frame pose bookkeeping shared between the render and present sides of
/// an HMD plugin.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde-serialization", derive(Deserialize, Serialize))]
pub struct FrameInfo {
    // Head pose sampled when rendering started
    pub render_pose: Transform3D<f32>,
    // Head pose at present time, equal to the render pose unless the device
    // late-latches a newer sample
    pub present_pose: Transform3D<f32>,
    // Seconds
    pub sensor_sample_time: f64,
    // Seconds
    pub predicted_display_time: f64,
    // Rotation-only delta from the render pose to the present pose
    pub present_reprojection: Rotation3D<f32>,
}

impl Default for FrameInfo {
    fn default() -> FrameInfo {
        FrameInfo {
            render_pose: Transform3D::identity(),
            present_pose: Transform3D::identity(),
            sensor_sample_time: 0.0,
            predicted_display_time: 0.0,
            present_reprojection: Rotation3D::identity(),
        }
    }
}

impl FrameInfo {
    pub fn new(render_pose: Transform3D<f32>, sensor_sample_time: f64, predicted_display_time: f64) -> FrameInfo {
        FrameInfo {
            render_pose,
            present_pose: render_pose,
            sensor_sample_time,
            predicted_display_time,
            present_reprojection: Rotation3D::identity(),
        }
    }

    /// Recomputes `present_reprojection` from the two poses. Translation
    /// between them is ignored.
    pub fn update_reprojection(&mut self) {
        let render = utils::rotation_of(&self.render_pose);
        let present = utils::rotation_of(&self.present_pose);
        self.present_reprojection = present.then(&render.inverse());
    }

    pub fn has_reprojection(&self) -> bool {
        !utils::is_identity_rotation(&self.present_reprojection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use euclid::Angle;

    #[test]
    fn same_poses_need_no_reprojection() {
        let pose = Rotation3D::around_y(Angle::radians(0.3)).to_transform();
        let mut info = FrameInfo::new(pose, 1.0, 1.011);
        info.update_reprojection();
        assert!(!info.has_reprojection());
    }

    #[test]
    fn rotated_present_pose_needs_reprojection() {
        let mut info = FrameInfo::new(Transform3D::identity(), 1.0, 1.011);
        info.present_pose = Rotation3D::around_y(Angle::radians(0.05)).to_transform();
        info.update_reprojection();
        assert!(info.has_reprojection());
    }

    #[test]
    fn translation_alone_needs_no_reprojection() {
        let mut info = FrameInfo::new(Transform3D::identity(), 1.0, 1.011);
        info.present_pose = Transform3D::translation(0.0, 0.1, 0.0);
        info.update_reprojection();
        assert!(!info.has_reprojection());
    }
}
