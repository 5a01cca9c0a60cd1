use crate::error::Error;
use crate::eye::Eye;
use crate::eye::PerEye;
use crate::frame_info::FrameInfo;
use crate::gpu::TextureSource;
use euclid::default::Rect;
use euclid::default::Size2D;
use euclid::default::Transform3D;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrackingState {
    pub head_pose: Transform3D<f32>,
    // Identity when the hand is not tracked
    pub hand_poses: [Transform3D<f32>; 2],
    // Seconds
    pub sample_time: f64,
}

impl Default for TrackingState {
    fn default() -> TrackingState {
        TrackingState {
            head_pose: Transform3D::identity(),
            hand_poses: [Transform3D::identity(); 2],
            sample_time: 0.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EyeRenderDesc {
    pub projection: Transform3D<f32>,
    pub eye_to_head: Transform3D<f32>,
}

/// The composited stereo image handed to the vendor compositor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SubmitLayer {
    pub texture: TextureSource,
    pub size: Size2D<u32>,
    pub viewports: PerEye<Rect<i32>>,
    // Pose the composite was reprojected to
    pub pose: Transform3D<f32>,
}

/// The vendor runtime behind an HMD plugin.
///
/// Implementations wrap one SDK session. `acquire`/`release` bracket its use;
/// share a device between subsystems through a reference-counted session
/// rather than calling them directly.
pub trait HmdDevice: Send + Sync {
    fn name(&self) -> &str;

    /// Whether the runtime reports a connected headset.
    fn is_available(&self) -> bool;

    fn acquire(&self) -> Result<(), Error>;

    fn release(&self);

    /// Size of the side-by-side stereo render target.
    fn recommended_render_size(&self) -> Size2D<u32>;

    fn render_desc(&self, eye: Eye, near: f32, far: f32) -> EyeRenderDesc;

    fn refresh_rate(&self) -> f32 {
        90.0
    }

    /// Predicted time in seconds at which the given frame reaches the display.
    fn predicted_display_time(&self, frame_index: u32) -> f64;

    fn tracking_state(&self, time: f64) -> TrackingState;

    /// Late-latches a present pose. Devices without one present with the
    /// render pose.
    fn update_present_pose(&self, info: &mut FrameInfo) {
        info.present_pose = info.render_pose;
    }

    fn submit(&self, frame_index: u32, layer: &SubmitLayer) -> Result<(), Error>;

    fn is_mounted(&self) -> bool {
        true
    }

    /// Recenters tracking on the current head pose.
    fn reset_sensors(&self) {}
}

pub type HmdDevicePtr = Arc<dyn HmdDevice>;
