//! The HMD frame pipeline: render pose bookkeeping, present pose
//! reprojection, the composite passes and the desktop mirror.

mod lasers;
mod overlay_mesh;
mod preview;

pub use self::lasers::{hand_glow_point, laser_distance, laser_model, NO_GLOW_POINT};
pub use self::overlay_mesh::{OverlayMesh, OverlayVertex, OVERLAY_SLICES, OVERLAY_STACKS};
pub use self::preview::{mirror_viewport, preview_uv_rect};

use super::desktop::CLEAR_COLOR;
use super::desktop::FULL_UV_RECT;
use super::window_surface::WindowSurface;
use crate::compositor::CompositorHelper;
use crate::compositor::ModelTransform;
use crate::session::SessionLease;
use crate::session::VendorSession;
use display_plugins_api::settings::ENABLE_REPROJECTION_KEY;
use display_plugins_api::settings::IPD_SCALE_KEY;
use display_plugins_api::settings::MONO_PREVIEW_KEY;
use display_plugins_api::utils;
use display_plugins_api::Batch;
use display_plugins_api::Error;
use display_plugins_api::Eye;
use display_plugins_api::Frame;
use display_plugins_api::FrameInfo;
use display_plugins_api::FramebufferTarget;
use display_plugins_api::Geometry;
use display_plugins_api::Hand;
use display_plugins_api::HandLaserInfo;
use display_plugins_api::HandLaserMode;
use display_plugins_api::Hands;
use display_plugins_api::HmdDevicePtr;
use display_plugins_api::PerEye;
use display_plugins_api::PipelineKind;
use display_plugins_api::PluginContainer;
use display_plugins_api::SubmitLayer;
use display_plugins_api::TextureSource;
use display_plugins_api::Uniforms;
use display_plugins_api::DEFAULT_FAR_CLIP;
use display_plugins_api::DEFAULT_NEAR_CLIP;
use euclid::default::Point2D;
use euclid::default::Rect;
use euclid::default::Size2D;
use euclid::default::Transform3D;
use euclid::default::Vector3D;
use std::collections::BTreeMap;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::RwLock;

/// Frames the render side may run ahead of the present side.
pub const MAX_FRAMES_IN_FLIGHT: usize = 3;
// Render poses below this height come from lost tracking
const BAD_POSE_FLOOR: f32 = -0.2;

// Written by the render side, consumed by the present side. Always taken as
// a whole so the two never race on the frame map.
struct SharedState {
    frame_infos: BTreeMap<u32, FrameInfo>,
    // Most recent render side info
    render_info: FrameInfo,
    last_good_pose: Transform3D<f32>,
    hand_lasers: [HandLaserInfo; 2],
    hand_poses: [Transform3D<f32>; 2],
}

impl Default for SharedState {
    fn default() -> SharedState {
        SharedState {
            frame_infos: BTreeMap::new(),
            render_info: FrameInfo::default(),
            last_good_pose: Transform3D::identity(),
            hand_lasers: [HandLaserInfo::default(); 2],
            hand_poses: [Transform3D::identity(); 2],
        }
    }
}

// Snapshot the present side composites from
#[derive(Clone, Copy)]
struct PresentState {
    frame_info: FrameInfo,
    hand_lasers: [HandLaserInfo; 2],
    hand_poses: [Transform3D<f32>; 2],
    ui_model: ModelTransform,
}

impl Default for PresentState {
    fn default() -> PresentState {
        PresentState {
            frame_info: FrameInfo::default(),
            hand_lasers: [HandLaserInfo::default(); 2],
            hand_poses: [Transform3D::identity(); 2],
            ui_model: ModelTransform::default(),
        }
    }
}

#[derive(Clone, Copy)]
struct EyeGeometry {
    render_size: Size2D<u32>,
    projections: PerEye<Transform3D<f32>>,
    // Unscaled by the IPD scale
    eye_to_head: PerEye<Transform3D<f32>>,
}

impl Default for EyeGeometry {
    fn default() -> EyeGeometry {
        EyeGeometry {
            render_size: Size2D::zero(),
            projections: PerEye::new(Transform3D::identity(), Transform3D::identity()),
            eye_to_head: PerEye::new(Transform3D::identity(), Transform3D::identity()),
        }
    }
}

/// Everything an HMD backend does between `begin_frame_render` and the
/// vendor submit, independent of the window it mirrors into.
pub struct HmdFramePipeline {
    session: Arc<VendorSession>,
    lease: Mutex<Option<SessionLease>>,
    compositor: Arc<CompositorHelper>,
    shared: Mutex<SharedState>,
    present: Mutex<PresentState>,
    eyes: RwLock<EyeGeometry>,
    ipd_scale: Mutex<f32>,
    mono_preview: AtomicBool,
    enable_reprojection: AtomicBool,
    // Mirroring only runs when vsync could be turned off on the window
    enable_preview: AtomicBool,
    mounted: AtomicBool,
}

impl HmdFramePipeline {
    pub fn new(session: Arc<VendorSession>, compositor: Arc<CompositorHelper>) -> HmdFramePipeline {
        HmdFramePipeline {
            session,
            lease: Mutex::new(None),
            compositor,
            shared: Mutex::new(SharedState::default()),
            present: Mutex::new(PresentState::default()),
            eyes: RwLock::new(EyeGeometry::default()),
            ipd_scale: Mutex::new(1.0),
            mono_preview: AtomicBool::new(true),
            enable_reprojection: AtomicBool::new(true),
            enable_preview: AtomicBool::new(false),
            mounted: AtomicBool::new(false),
        }
    }

    pub fn device(&self) -> &HmdDevicePtr {
        self.session.device()
    }

    pub fn session(&self) -> &Arc<VendorSession> {
        &self.session
    }

    pub fn is_supported(&self) -> bool {
        self.device().is_available()
    }

    pub fn is_active(&self) -> bool {
        utils::lock(&self.lease).is_some()
    }

    /// Opens the vendor session, reads the persisted display options and
    /// caches the eye geometry.
    pub fn activate(&self, container: &dyn PluginContainer) -> Result<(), Error> {
        let lease = self.session.open()?;

        self.mono_preview
            .store(container.bool_setting(MONO_PREVIEW_KEY, true), Ordering::SeqCst);
        self.enable_reprojection
            .store(container.bool_setting(ENABLE_REPROJECTION_KEY, true), Ordering::SeqCst);
        *utils::lock(&self.ipd_scale) = container.float_setting(IPD_SCALE_KEY, 1.0);

        let device = self.device();
        let left = device.render_desc(Eye::Left, DEFAULT_NEAR_CLIP, DEFAULT_FAR_CLIP);
        let right = device.render_desc(Eye::Right, DEFAULT_NEAR_CLIP, DEFAULT_FAR_CLIP);
        *utils::write(&self.eyes) = EyeGeometry {
            render_size: device.recommended_render_size(),
            projections: PerEye::new(left.projection, right.projection),
            eye_to_head: PerEye::new(left.eye_to_head, right.eye_to_head),
        };

        *utils::lock(&self.shared) = SharedState::default();
        *utils::lock(&self.present) = PresentState::default();
        self.mounted.store(device.is_mounted(), Ordering::SeqCst);
        *utils::lock(&self.lease) = Some(lease);
        Ok(())
    }

    pub fn deactivate(&self) {
        let dropped = {
            let mut shared = utils::lock(&self.shared);
            let dropped = shared.frame_infos.len();
            shared.frame_infos.clear();
            dropped
        };
        if dropped > 0 {
            debug!("Discarding {} frames still in flight", dropped);
        }
        self.enable_preview.store(false, Ordering::SeqCst);
        utils::lock(&self.lease).take();
    }

    /// Turns vsync off on the mirror window. The vendor compositor paces
    /// presentation, so mirroring is only enabled when the window will not
    /// block on a second vsync.
    pub fn customize_context(&self, window: &WindowSurface) {
        let vsync = window.enable_vsync(false);
        let enable_preview = !vsync;
        self.enable_preview.store(enable_preview, Ordering::SeqCst);
        if enable_preview {
            info!("Mirroring {} into the desktop window", self.device().name());
        } else {
            info!("Vsync could not be disabled, desktop mirror is off");
        }
    }

    pub fn is_preview_enabled(&self) -> bool {
        self.enable_preview.load(Ordering::SeqCst)
    }

    /// The mirror is the only thing drawn to the window.
    pub fn needs_swap(&self) -> bool {
        self.is_preview_enabled()
    }

    pub fn mono_preview(&self) -> bool {
        self.mono_preview.load(Ordering::SeqCst)
    }

    pub fn set_mono_preview(&self, mono: bool) {
        self.mono_preview.store(mono, Ordering::SeqCst);
    }

    pub fn is_reprojection_enabled(&self) -> bool {
        self.enable_reprojection.load(Ordering::SeqCst)
    }

    pub fn set_reprojection_enabled(&self, enabled: bool) {
        self.enable_reprojection.store(enabled, Ordering::SeqCst);
    }

    pub fn ipd_scale(&self) -> f32 {
        *utils::lock(&self.ipd_scale)
    }

    pub fn set_ipd_scale(&self, scale: f32) {
        *utils::lock(&self.ipd_scale) = scale;
    }

    pub fn render_size(&self) -> Size2D<u32> {
        utils::read(&self.eyes).render_size
    }

    pub fn eye_projection(&self, eye: Eye) -> Transform3D<f32> {
        utils::read(&self.eyes).projections[eye]
    }

    /// The left eye frustum, used for culling both eyes.
    pub fn culling_projection(&self) -> Transform3D<f32> {
        self.eye_projection(Eye::Left)
    }

    /// Eye offset with the IPD scale applied.
    pub fn eye_to_head(&self, eye: Eye) -> Transform3D<f32> {
        let offset = utils::read(&self.eyes).eye_to_head[eye];
        let translation = utils::translation_of(&offset) * self.ipd_scale();
        utils::with_translation(&offset, translation)
    }

    pub fn eye_viewports(&self) -> PerEye<Rect<i32>> {
        let size = self.render_size().to_i32();
        let half = Size2D::new(size.width / 2, size.height);
        PerEye::new(
            Rect::new(Point2D::new(0, 0), half),
            Rect::new(Point2D::new(size.width - half.width, 0), half),
        )
    }

    /// Render pose of the most recently begun frame.
    pub fn head_pose(&self) -> Transform3D<f32> {
        utils::lock(&self.shared).render_info.render_pose
    }

    pub fn frames_in_flight(&self) -> usize {
        utils::lock(&self.shared).frame_infos.len()
    }

    pub fn reset_sensors(&self) {
        self.device().reset_sensors();
    }

    pub fn is_mounted(&self) -> bool {
        self.device().is_mounted()
    }

    /// Returns the new mounted state when it changed since the last call.
    pub fn poll_mount_change(&self) -> Option<bool> {
        let mounted = self.is_mounted();
        if self.mounted.swap(mounted, Ordering::SeqCst) != mounted {
            Some(mounted)
        } else {
            None
        }
    }

    pub fn set_hand_laser(&self, hands: Hands, mode: HandLaserMode, color: [f32; 4], direction: Vector3D<f32>) {
        let info = HandLaserInfo { mode, color, direction };
        let mut shared = utils::lock(&self.shared);
        for hand in Hand::BOTH.iter() {
            if hands.contains(hand.flag()) {
                shared.hand_lasers[hand.index()] = info;
            }
        }
    }

    /// Samples the predicted pose for `frame_index` and records it for the
    /// present side.
    pub fn begin_frame_render(&self, frame_index: u32) -> Result<bool, Error> {
        if !self.is_active() {
            return Err(Error::NotActive);
        }
        let device = self.device();
        let predicted = device.predicted_display_time(frame_index);
        let tracking = device.tracking_state(predicted);

        let mut shared = utils::lock(&self.shared);
        if shared.frame_infos.contains_key(&frame_index) {
            return Err(Error::FrameInFlight(frame_index));
        }

        let mut render_pose = tracking.head_pose;
        if utils::translation_of(&render_pose).y < BAD_POSE_FLOOR {
            warn!("Ignoring bad head pose for frame {}", frame_index);
            render_pose = shared.last_good_pose;
        } else {
            shared.last_good_pose = render_pose;
        }

        let info = FrameInfo::new(render_pose, tracking.sample_time, predicted);
        shared.render_info = info;
        shared.hand_poses = tracking.hand_poses;
        shared.frame_infos.insert(frame_index, info);
        while shared.frame_infos.len() > MAX_FRAMES_IN_FLIGHT {
            if let Some((&oldest, _)) = shared.frame_infos.iter().next() {
                warn!("Frame {} was never presented, discarding it", oldest);
                shared.frame_infos.remove(&oldest);
            }
        }
        Ok(true)
    }

    /// Takes the recorded info for `frame_index` and late-latches its
    /// present pose. Infos of older, skipped frames are dropped.
    pub fn update_frame_data(&self, frame_index: u32) -> Result<(), Error> {
        let mut present = {
            let mut shared = utils::lock(&self.shared);
            let info = match shared.frame_infos.remove(&frame_index) {
                Some(info) => info,
                None => return Err(Error::MissingFrameInfo(frame_index)),
            };
            let newer = shared.frame_infos.split_off(&frame_index);
            let stale = std::mem::replace(&mut shared.frame_infos, newer);
            if !stale.is_empty() {
                warn!("Skipped presenting frames {:?}", stale.keys().collect::<Vec<_>>());
            }
            PresentState {
                frame_info: info,
                hand_lasers: shared.hand_lasers,
                hand_poses: shared.hand_poses,
                ui_model: self.compositor.model_transform(),
            }
        };

        self.device().update_present_pose(&mut present.frame_info);
        present.frame_info.update_reprojection();
        *utils::lock(&self.present) = present;
        Ok(())
    }

    /// Present pose of the frame being composited.
    pub fn present_pose(&self) -> Transform3D<f32> {
        utils::lock(&self.present).frame_info.present_pose
    }

    /// Composites, submits and mirrors one frame. Returns whether the vendor
    /// compositor accepted it. A rejected frame is dropped, not an error.
    pub fn present(&self, frame: &Frame, window: &WindowSurface) -> Result<bool, Error> {
        if !self.is_active() {
            return Err(Error::NotActive);
        }
        self.update_frame_data(frame.frame_index)?;

        window.render(self.composite(frame));

        let layer = SubmitLayer {
            texture: TextureSource::Composite,
            size: self.render_size(),
            viewports: self.eye_viewports(),
            pose: self.present_pose(),
        };
        let submitted = match self.device().submit(frame.frame_index, &layer) {
            Ok(()) => true,
            Err(err) => {
                warn!("Dropping frame {} ({})", frame.frame_index, err);
                false
            },
        };

        if self.is_preview_enabled() {
            window.render(self.preview(window.size()));
        }
        Ok(submitted)
    }

    /// Scene, overlay, pointer and lasers into the composite framebuffer,
    /// in that order.
    pub fn composite(&self, frame: &Frame) -> Batch {
        let present = *utils::lock(&self.present);
        let mut batch = Batch::new();
        self.composite_scene(&mut batch, frame, &present);
        self.composite_overlay(&mut batch, frame, &present);
        self.composite_pointer(&mut batch, &present);
        self.composite_extra(&mut batch, &present);
        batch
    }

    fn eye_view(&self, eye: Eye, present: &PresentState) -> Transform3D<f32> {
        let eye_pose = self.eye_to_head(eye).then(&present.frame_info.present_pose);
        eye_pose.inverse().unwrap_or_else(Transform3D::identity)
    }

    fn composite_scene(&self, batch: &mut Batch, frame: &Frame, present: &PresentState) {
        let render_size = self.render_size();
        batch.set_framebuffer(FramebufferTarget::Composite(render_size));
        batch.set_viewport(Rect::from_size(render_size.to_i32()));
        batch.clear(CLEAR_COLOR);
        batch.set_texture(TextureSource::External(frame.scene.texture));

        let info = &present.frame_info;
        if !self.is_reprojection_enabled() || !info.has_reprojection() {
            batch.set_pipeline(PipelineKind::Present);
            batch.set_uniforms(Uniforms::Present { uv_rect: FULL_UV_RECT });
        } else {
            let projections = utils::read(&self.eyes).projections;
            batch.set_pipeline(PipelineKind::Reprojection);
            batch.set_uniforms(Uniforms::Reprojection {
                reprojection: utils::rotation_to_mat3(&info.present_reprojection),
                projections,
                inverse_projections: projections.map(|p| p.inverse().unwrap_or_else(Transform3D::identity)),
            });
        }
        batch.draw(Geometry::Quad);
    }

    fn composite_overlay(&self, batch: &mut Batch, frame: &Frame, present: &PresentState) {
        let mut glow_points = [NO_GLOW_POINT; 2];
        let mut glow_colors = [[0.0; 4]; 2];
        for hand in Hand::BOTH.iter() {
            let i = hand.index();
            if let Some(point) = hand_glow_point(&present.hand_poses[i], &present.hand_lasers[i], &present.ui_model) {
                glow_points[i] = point;
                glow_colors[i] = present.hand_lasers[i].color;
            }
        }

        let overlay = match frame.overlay {
            Some(overlay) => overlay,
            None => return,
        };
        let model = present.ui_model.to_matrix();
        let viewports = self.eye_viewports();
        batch.set_pipeline(PipelineKind::Overlay);
        batch.set_texture(TextureSource::External(overlay.texture));
        for eye in Eye::BOTH.iter() {
            let mvp = model
                .then(&self.eye_view(*eye, present))
                .then(&self.eye_projection(*eye));
            batch.set_viewport(viewports[*eye]);
            batch.set_uniforms(Uniforms::Overlay {
                mvp,
                alpha: self.compositor.alpha(),
                glow_points,
                glow_colors,
            });
            batch.draw(Geometry::OverlaySphere);
        }
    }

    fn composite_pointer(&self, batch: &mut Batch, present: &PresentState) {
        if !self.compositor.is_reticle_visible() {
            return;
        }
        let present_pose = present.frame_info.present_pose;
        let head_position = utils::translation_of(&present_pose);
        let viewports = self.eye_viewports();
        batch.set_pipeline(PipelineKind::Cursor);
        batch.set_texture(TextureSource::Cursor);
        for eye in Eye::BOTH.iter() {
            let eye_pose = self.eye_to_head(*eye).then(&present_pose);
            let mvp = self
                .compositor
                .reticle_transform(&eye_pose, head_position)
                .then(&self.eye_projection(*eye));
            batch.set_viewport(viewports[*eye]);
            batch.set_uniforms(Uniforms::Cursor { mvp });
            batch.draw(Geometry::Quad);
        }
    }

    fn composite_extra(&self, batch: &mut Batch, present: &PresentState) {
        if !present.hand_lasers.iter().any(HandLaserInfo::valid) {
            return;
        }
        if present.hand_poses.iter().all(utils::is_identity) {
            return;
        }
        let center = present.ui_model.translation;
        let models: Vec<(Transform3D<f32>, [f32; 4])> = Hand::BOTH
            .iter()
            .filter_map(|hand| {
                let i = hand.index();
                laser_model(&present.hand_poses[i], &present.hand_lasers[i], center)
                    .map(|model| (model, present.hand_lasers[i].color))
            })
            .collect();
        if models.is_empty() {
            return;
        }

        let viewports = self.eye_viewports();
        batch.set_pipeline(PipelineKind::Laser);
        for eye in Eye::BOTH.iter() {
            let view_projection = self.eye_view(*eye, present).then(&self.eye_projection(*eye));
            batch.set_viewport(viewports[*eye]);
            for &(model, color) in &models {
                batch.set_uniforms(Uniforms::Laser {
                    mvp: model.then(&view_projection),
                    color,
                });
                batch.draw(Geometry::LaserLine);
            }
        }
    }

    /// Blit of the composite into the window, letterboxed to keep its
    /// aspect ratio.
    pub fn preview(&self, window: Size2D<u32>) -> Batch {
        let mono = self.mono_preview();
        let mut batch = Batch::new();
        batch.set_framebuffer(FramebufferTarget::Default);
        batch.set_viewport(Rect::from_size(window.to_i32()));
        batch.clear(CLEAR_COLOR);
        batch.set_viewport(mirror_viewport(window, self.render_size(), mono));
        batch.set_pipeline(PipelineKind::Present);
        batch.set_texture(TextureSource::Composite);
        batch.set_uniforms(Uniforms::Present {
            uv_rect: preview_uv_rect(mono),
        });
        batch.draw(Geometry::Quad);
        batch
    }
}
