use display_plugins_api::utils;
use display_plugins_api::Error;
use display_plugins_api::Eye;
use display_plugins_api::EyeRenderDesc;
use display_plugins_api::FrameInfo;
use display_plugins_api::HmdDevice;
use display_plugins_api::SubmitLayer;
use display_plugins_api::TrackingState;
use euclid::default::Rotation3D;
use euclid::default::Size2D;
use euclid::default::Transform3D;
use std::sync::mpsc::channel;
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::sync::Mutex;
use std::thread;
use super::DebugHmdControlMsg;

// Simulates an HTC Vive
const EYE_RENDER_WIDTH: u32 = 1512;
const EYE_RENDER_HEIGHT: u32 = 1680;
const REFRESH_RATE: f32 = 90.0;
const HALF_IPD: f32 = 0.032;
const STANDING_EYE_HEIGHT: f32 = 1.6;

// Up, down, left and right half angles in degrees
const LEFT_EYE_FOV: [f32; 4] = [55.82093, 55.707802, 54.422634, 51.269485];
const RIGHT_EYE_FOV: [f32; 4] = [55.898048, 55.614716, 51.304901, 54.374104];

pub struct DebugHmdState {
    // Head pose before sensor reset
    raw_head_pose: Transform3D<f32>,
    sensor_reset: Transform3D<f32>,
    hand_poses: [Transform3D<f32>; 2],
    // Head rotation between render and present
    present_drift: Rotation3D<f32>,
    mounted: bool,
    available: bool,
    fail_acquire: bool,
    fail_next_submit: bool,
    acquired: bool,
    submitted_frames: Vec<u32>,
    last_layer: Option<SubmitLayer>,
}

impl Default for DebugHmdState {
    fn default() -> DebugHmdState {
        DebugHmdState {
            raw_head_pose: Transform3D::translation(0.0, STANDING_EYE_HEIGHT, 0.0),
            sensor_reset: Transform3D::identity(),
            hand_poses: [Transform3D::identity(); 2],
            present_drift: Rotation3D::identity(),
            mounted: true,
            available: true,
            fail_acquire: false,
            fail_next_submit: false,
            acquired: false,
            submitted_frames: Vec::new(),
            last_layer: None,
        }
    }
}

impl DebugHmdState {
    pub fn handle_msg(&mut self, msg: DebugHmdControlMsg) {
        match msg {
            DebugHmdControlMsg::SetHeadPose(pose) => self.raw_head_pose = pose,
            DebugHmdControlMsg::SetHandPoses(poses) => self.hand_poses = poses,
            DebugHmdControlMsg::SetPresentDrift(drift) => self.present_drift = drift,
            DebugHmdControlMsg::Mount => self.mounted = true,
            DebugHmdControlMsg::Unmount => self.mounted = false,
            DebugHmdControlMsg::SetAvailable(available) => self.available = available,
            DebugHmdControlMsg::FailAcquire(fail) => self.fail_acquire = fail,
            DebugHmdControlMsg::FailNextSubmit => self.fail_next_submit = true,
        }
    }

    fn head_pose(&self) -> Transform3D<f32> {
        self.raw_head_pose.then(&self.sensor_reset)
    }
}

/// A simulated headset for development and tests. It presents nowhere and
/// records what it was asked to submit.
pub struct DebugHmdDevice {
    state: Arc<Mutex<DebugHmdState>>,
}

impl DebugHmdDevice {
    pub fn new() -> Arc<DebugHmdDevice> {
        Arc::new(DebugHmdDevice {
            state: Default::default(),
        })
    }

    /// A device driven from another thread through control messages.
    pub fn new_with_remote() -> (Arc<DebugHmdDevice>, Sender<DebugHmdControlMsg>) {
        let (sender, receiver) = channel();
        let device = DebugHmdDevice::new();
        let state = device.state_handle();
        thread::spawn(move || {
            while let Ok(msg) = receiver.recv() {
                utils::lock(&state).handle_msg(msg);
            }
        });
        (device, sender)
    }

    pub fn state_handle(&self) -> Arc<Mutex<DebugHmdState>> {
        self.state.clone()
    }

    pub fn handle_msg(&self, msg: DebugHmdControlMsg) {
        utils::lock(&self.state).handle_msg(msg);
    }

    pub fn is_acquired(&self) -> bool {
        utils::lock(&self.state).acquired
    }

    /// Frame indices submitted successfully, oldest first.
    pub fn submitted_frames(&self) -> Vec<u32> {
        utils::lock(&self.state).submitted_frames.clone()
    }

    pub fn last_submitted_layer(&self) -> Option<SubmitLayer> {
        utils::lock(&self.state).last_layer
    }

    fn fov_projection(fov: [f32; 4], near: f32, far: f32) -> Transform3D<f32> {
        let [up, down, left, right] = fov.map(|degrees| degrees.to_radians().tan());
        let x_scale = 2.0 / (left + right);
        let y_scale = 2.0 / (up + down);
        let x_offset = (right - left) / (left + right);
        let y_offset = (up - down) / (up + down);
        let nf = 1.0 / (near - far);

        // Transposed relative to the usual column-vector layout
        #[rustfmt::skip]
        let projection = Transform3D::new(
            x_scale,  0.0,      0.0,                   0.0,
            0.0,      y_scale,  0.0,                   0.0,
            x_offset, y_offset, (far + near) * nf,     -1.0,
            0.0,      0.0,      2.0 * far * near * nf, 0.0,
        );
        projection
    }
}

impl HmdDevice for DebugHmdDevice {
    fn name(&self) -> &str {
        "Debug HMD"
    }

    fn is_available(&self) -> bool {
        utils::lock(&self.state).available
    }

    fn acquire(&self) -> Result<(), Error> {
        let mut state = utils::lock(&self.state);
        if !state.available {
            return Err(Error::DeviceUnavailable("debug headset disconnected".into()));
        }
        if state.fail_acquire {
            return Err(Error::Activation {
                plugin: self.name().into(),
                reason: "session create failed".into(),
            });
        }
        state.acquired = true;
        debug!("Debug HMD acquired");
        Ok(())
    }

    fn release(&self) {
        utils::lock(&self.state).acquired = false;
        debug!("Debug HMD released");
    }

    fn recommended_render_size(&self) -> Size2D<u32> {
        Size2D::new(EYE_RENDER_WIDTH * 2, EYE_RENDER_HEIGHT)
    }

    fn render_desc(&self, eye: Eye, near: f32, far: f32) -> EyeRenderDesc {
        let (fov, offset) = match eye {
            Eye::Left => (LEFT_EYE_FOV, -HALF_IPD),
            Eye::Right => (RIGHT_EYE_FOV, HALF_IPD),
        };
        EyeRenderDesc {
            projection: DebugHmdDevice::fov_projection(fov, near, far),
            eye_to_head: Transform3D::translation(offset, 0.0, 0.0),
        }
    }

    fn refresh_rate(&self) -> f32 {
        REFRESH_RATE
    }

    fn predicted_display_time(&self, _frame_index: u32) -> f64 {
        utils::seconds() + 1.0 / REFRESH_RATE as f64
    }

    fn tracking_state(&self, time: f64) -> TrackingState {
        let state = utils::lock(&self.state);
        TrackingState {
            head_pose: state.head_pose(),
            hand_poses: state.hand_poses,
            sample_time: time,
        }
    }

    fn update_present_pose(&self, info: &mut FrameInfo) {
        let drift = utils::lock(&self.state).present_drift;
        // The head kept turning after the render pose was sampled
        info.present_pose = drift.to_transform().then(&info.render_pose);
    }

    fn submit(&self, frame_index: u32, layer: &SubmitLayer) -> Result<(), Error> {
        let mut state = utils::lock(&self.state);
        if !state.acquired {
            return Err(Error::NotActive);
        }
        if state.fail_next_submit {
            state.fail_next_submit = false;
            return Err(Error::Submit(format!("debug compositor rejected frame {}", frame_index)));
        }
        state.submitted_frames.push(frame_index);
        state.last_layer = Some(*layer);
        Ok(())
    }

    fn is_mounted(&self) -> bool {
        utils::lock(&self.state).mounted
    }

    fn reset_sensors(&self) {
        let mut state = utils::lock(&self.state);
        let level = utils::cancel_out_roll_and_pitch(&state.raw_head_pose);
        state.sensor_reset = level.inverse().unwrap_or_else(Transform3D::identity);
        debug!("Debug HMD recentered");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use euclid::default::{Point3D, Rect, Vector3D};
    use euclid::Angle;
    use std::time::Duration;

    #[test]
    fn projection_maps_near_plane_to_ndc() {
        let device = DebugHmdDevice::new();
        let desc = device.render_desc(Eye::Left, 0.1, 100.0);
        let near = desc.projection.transform_point3d(Point3D::new(0.0, 0.0, -0.1)).unwrap();
        assert!((near.z + 1.0).abs() < 1.0e-4);
        let far = desc.projection.transform_point3d(Point3D::new(0.0, 0.0, -100.0)).unwrap();
        assert!((far.z - 1.0).abs() < 1.0e-3);
    }

    #[test]
    fn eyes_are_an_ipd_apart() {
        let device = DebugHmdDevice::new();
        let left = utils::translation_of(&device.render_desc(Eye::Left, 0.1, 100.0).eye_to_head);
        let right = utils::translation_of(&device.render_desc(Eye::Right, 0.1, 100.0).eye_to_head);
        assert!(((right - left).length() - 0.064).abs() < 1.0e-6);
    }

    #[test]
    fn submit_requires_acquire() {
        let device = DebugHmdDevice::new();
        let layer = SubmitLayer {
            texture: display_plugins_api::TextureSource::Composite,
            size: Size2D::new(10, 10),
            viewports: display_plugins_api::PerEye::new(Rect::zero(), Rect::zero()),
            pose: Transform3D::identity(),
        };
        assert!(device.submit(1, &layer).is_err());
        device.acquire().unwrap();
        device.handle_msg(DebugHmdControlMsg::FailNextSubmit);
        assert!(device.submit(2, &layer).is_err());
        device.submit(3, &layer).unwrap();
        assert_eq!(device.submitted_frames(), vec![3]);
    }

    #[test]
    fn reset_sensors_cancels_yaw_and_position() {
        let device = DebugHmdDevice::new();
        let yawed = Rotation3D::around_y(Angle::radians(0.8))
            .then(&Rotation3D::around_x(Angle::radians(0.2)))
            .to_transform()
            .then(&Transform3D::translation(0.3, 1.7, -0.4));
        device.handle_msg(DebugHmdControlMsg::SetHeadPose(yawed));
        device.reset_sensors();
        let head = device.tracking_state(0.0).head_pose;
        assert!(utils::translation_of(&head).length() < 1.0e-4);
        let forward = head.transform_vector3d(Vector3D::new(0.0, 0.0, -1.0));
        // Pitch is kept, yaw is gone
        assert!(forward.x.abs() < 1.0e-4);
        assert!(forward.y.abs() > 0.1);
    }

    #[test]
    fn remote_messages_reach_the_device() {
        let (device, sender) = DebugHmdDevice::new_with_remote();
        sender.send(DebugHmdControlMsg::Unmount).unwrap();
        let mut mounted = true;
        for _ in 0..100 {
            mounted = device.is_mounted();
            if !mounted {
                break;
            }
            thread::sleep(Duration::from_millis(5));
        }
        assert!(!mounted);
    }

    #[test]
    fn present_drift_rotates_present_pose() {
        let device = DebugHmdDevice::new();
        device.handle_msg(DebugHmdControlMsg::SetPresentDrift(Rotation3D::around_y(Angle::radians(0.05))));
        let mut info = FrameInfo::new(Transform3D::translation(0.0, 1.6, 0.0), 0.0, 0.011);
        device.update_present_pose(&mut info);
        info.update_reprojection();
        assert!(info.has_reprojection());
        assert_eq!(utils::translation_of(&info.present_pose), utils::translation_of(&info.render_pose));
    }
}
