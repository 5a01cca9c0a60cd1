//! Placement of the 2D UI on a sphere around the user, and the reticle that
//! points at it.

mod cursor;
pub mod geometry;
mod reticle;

pub use self::cursor::{CursorHost, SimulatedCursorHost};
pub use self::reticle::ReticleInterface;

use self::geometry::*;
use display_plugins_api::utils;
use display_plugins_api::utils::EPSILON;
use display_plugins_api::DisplayPlugin;
use display_plugins_api::DisplayPluginPtr;
use display_plugins_api::NoHit;
use euclid::default::Box2D;
use euclid::default::Point2D;
use euclid::default::Point3D;
use euclid::default::Rect;
use euclid::default::Rotation3D;
use euclid::default::Size2D;
use euclid::default::Transform3D;
use euclid::default::Vector3D;
use std::f32::consts::PI;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::RwLock;
use std::sync::Weak;

pub fn virtual_screen_size() -> Size2D<u32> {
    Size2D::new(VIRTUAL_SCREEN_SIZE_X as u32, VIRTUAL_SCREEN_SIZE_Y as u32)
}

pub fn virtual_screen_recommended_overlay_rect() -> Rect<u32> {
    Rect::new(Point2D::new(956, 0), Size2D::new(2048, 1188))
}

// Angular size of the HMD reticle at unit scale
const RETICLE_SIZE: f32 = 2.0 * PI / 100.0;
const CURSOR_PIXEL_SIZE: f32 = 32.0;
const DEFAULT_RETICLE_DEPTH: f32 = 1.0;

/// Scale, rotation and translation placing the UI sphere in sensor space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ModelTransform {
    pub scale: Vector3D<f32>,
    pub rotation: Rotation3D<f32>,
    pub translation: Vector3D<f32>,
}

impl Default for ModelTransform {
    fn default() -> ModelTransform {
        ModelTransform {
            scale: Vector3D::new(1.0, 1.0, 1.0),
            rotation: Rotation3D::identity(),
            translation: Vector3D::zero(),
        }
    }
}

impl ModelTransform {
    pub fn to_matrix(&self) -> Transform3D<f32> {
        utils::scale_rotation_translation(self.scale, &self.rotation, self.translation)
    }

    pub fn transform_point(&self, point: Vector3D<f32>) -> Vector3D<f32> {
        let scaled = Vector3D::new(point.x * self.scale.x, point.y * self.scale.y, point.z * self.scale.z);
        self.rotation.transform_vector3d(scaled) + self.translation
    }
}

struct ReticleState {
    position_in_hmd: Point2D<f32>,
    last_known_real_mouse: Point2D<i32>,
    // Set when we warp the OS cursor ourselves
    ignore_mouse_move: bool,
}

#[derive(Clone, Copy)]
struct Transforms {
    model: ModelTransform,
    sensor_to_world: Transform3D<f32>,
    current_camera: Transform3D<f32>,
}

#[derive(Clone, Copy)]
struct ReticleParams {
    depth: f32,
    cursor_scale: f32,
    alpha: f32,
}

/// Maps between overlay pixels, spherical HUD angles and world space, and
/// owns the HMD reticle and the mouse capture policy.
pub struct CompositorHelper {
    display: RwLock<Option<Weak<dyn DisplayPlugin>>>,
    cursor_host: Arc<dyn CursorHost>,
    reticle: Mutex<ReticleState>,
    transforms: RwLock<Transforms>,
    params: Mutex<ReticleParams>,
    reticle_visible: AtomicBool,
    allow_mouse_capture: AtomicBool,
    is_over_desktop: AtomicBool,
}

impl CompositorHelper {
    pub fn new(cursor_host: Arc<dyn CursorHost>) -> Arc<CompositorHelper> {
        let last_known_real_mouse = cursor_host.cursor_position();
        Arc::new(CompositorHelper {
            display: RwLock::new(None),
            cursor_host,
            reticle: Mutex::new(ReticleState {
                position_in_hmd: Point2D::zero(),
                last_known_real_mouse,
                ignore_mouse_move: false,
            }),
            transforms: RwLock::new(Transforms {
                model: ModelTransform::default(),
                sensor_to_world: Transform3D::identity(),
                current_camera: Transform3D::identity(),
            }),
            params: Mutex::new(ReticleParams {
                depth: DEFAULT_RETICLE_DEPTH,
                cursor_scale: 1.0,
                alpha: 1.0,
            }),
            reticle_visible: AtomicBool::new(true),
            allow_mouse_capture: AtomicBool::new(true),
            is_over_desktop: AtomicBool::new(true),
        })
    }

    pub fn set_display_plugin(&self, display: Option<&DisplayPluginPtr>) {
        *utils::write(&self.display) = display.map(Arc::downgrade);
        if let Some(display) = self.display_plugin() {
            debug!("Compositor now tracking {}", display.name());
            if display.is_hmd() {
                // Start centered on the UI
                let ui = display.recommended_ui_size();
                utils::lock(&self.reticle).position_in_hmd =
                    Point2D::new(ui.width as f32 / 2.0, ui.height as f32 / 2.0);
            }
        }
    }

    pub fn display_plugin(&self) -> Option<DisplayPluginPtr> {
        utils::read(&self.display).as_ref().and_then(Weak::upgrade)
    }

    pub fn is_hmd(&self) -> bool {
        self.display_plugin().map_or(false, |display| display.is_hmd())
    }

    fn ui_size(&self) -> Size2D<f32> {
        let size = match self.display_plugin() {
            Some(display) => display.recommended_ui_size(),
            None => virtual_screen_size(),
        };
        size.to_f32()
    }

    pub fn set_model_transform(&self, model: ModelTransform) {
        utils::write(&self.transforms).model = model;
    }

    pub fn model_transform(&self) -> ModelTransform {
        utils::read(&self.transforms).model
    }

    pub fn set_sensor_to_world_matrix(&self, sensor_to_world: Transform3D<f32>) {
        utils::write(&self.transforms).sensor_to_world = sensor_to_world;
    }

    pub fn set_current_camera(&self, camera: Transform3D<f32>) {
        utils::write(&self.transforms).current_camera = camera;
    }

    /// Model transform followed by sensor to world.
    pub fn ui_transform(&self) -> Transform3D<f32> {
        let transforms = utils::read(&self.transforms);
        transforms.model.to_matrix().then(&transforms.sensor_to_world)
    }

    pub fn overlay_to_spherical(&self, overlay: Point2D<f32>) -> Point2D<f32> {
        overlay_to_spherical(overlay, self.ui_size())
    }

    pub fn spherical_to_overlay(&self, polar: Point2D<f32>) -> Point2D<f32> {
        spherical_to_overlay(polar, self.ui_size())
    }

    /// World-space point on the UI sphere under an overlay position.
    pub fn sphere_surface_from_overlay(&self, overlay: Point2D<f32>) -> Point3D<f32> {
        let polar = self.overlay_to_spherical(overlay);
        let point = sphere_point(polar.x, polar.y).to_point();
        self.ui_transform().transform_point3d(point).unwrap_or(point)
    }

    pub fn overlay_from_sphere_surface(&self, surface_point: Point3D<f32>) -> Point2D<f32> {
        let local = self
            .ui_transform()
            .inverse()
            .and_then(|inverse| inverse.transform_point3d(surface_point))
            .unwrap_or(surface_point);
        let polar = yaw_pitch(local.to_vector());
        self.spherical_to_overlay(polar)
    }

    /// Intersects a world-space ray with the UI sphere.
    pub fn calculate_ray_ui_collision_point(
        &self,
        position: Point3D<f32>,
        direction: Vector3D<f32>,
    ) -> Result<Point3D<f32>, NoHit> {
        let ui_transform = self.ui_transform();
        let world_to_ui = match ui_transform.inverse() {
            Some(inverse) => inverse,
            None => {
                warn!("UI transform is not invertible");
                return Err(NoHit);
            },
        };
        let local_position = world_to_ui.transform_point3d(position).ok_or(NoHit)?;
        let local_direction = world_to_ui.transform_vector3d(direction);
        if local_direction.length() < EPSILON {
            return Err(NoHit);
        }
        let local_direction = local_direction.normalize();
        let distance = ray_sphere_intersect(local_direction, local_position.to_vector(), UI_RADIUS).ok_or(NoHit)?;
        let local_hit = local_position + local_direction * distance;
        ui_transform.transform_point3d(local_hit).ok_or(NoHit)
    }

    /// Ray from the camera through the UI sphere point under `cursor`.
    pub fn compute_hmd_pick_ray(&self, cursor: Point2D<f32>) -> (Point3D<f32>, Vector3D<f32>) {
        let surface_point = self.sphere_surface_from_overlay(cursor);
        let camera = utils::read(&self.transforms).current_camera;
        let origin = utils::translation_of(&camera).to_point();
        let direction = surface_point - origin;
        let direction = if direction.length() < EPSILON {
            Vector3D::new(0.0, 0.0, -1.0)
        } else {
            direction.normalize()
        };
        (origin, direction)
    }

    pub fn reticle_position(&self) -> Point2D<f32> {
        if self.is_hmd() {
            return utils::lock(&self.reticle).position_in_hmd;
        }
        let local = self.cursor_host.map_from_global(self.cursor_host.cursor_position());
        local.to_f32()
    }

    /// Widget-local position a mouse event should be handled at. In HMD mode
    /// that is the virtual reticle, not the event's own position.
    pub fn mouse_event_position(&self, event_position: Point2D<f32>) -> Point2D<f32> {
        if self.is_hmd() {
            return utils::lock(&self.reticle).position_in_hmd;
        }
        event_position
    }

    /// In HMD mode moves the virtual reticle, clamped to the mouse extents.
    /// On the desktop moves the OS cursor.
    pub fn set_reticle_position(&self, position: Point2D<f32>, send_fake_event: bool) {
        if self.is_hmd() {
            let (min_mouse, max_mouse) = self.reticle_bounds();
            let clamped = position.clamp(min_mouse, max_mouse);
            utils::lock(&self.reticle).position_in_hmd = clamped;
            if send_fake_event {
                self.send_fake_mouse_event();
            }
        } else {
            let local = position.round().to_i32();
            self.cursor_host.set_cursor_position(self.cursor_host.map_to_global(local));
        }
    }

    /// Smallest and largest HMD reticle positions.
    pub fn reticle_bounds(&self) -> (Point2D<f32>, Point2D<f32>) {
        let max_overlay = self.ui_size();
        let extra_x = (MOUSE_EXTENTS_PIXELS_X - max_overlay.width) / 2.0;
        let extra_y = (MOUSE_EXTENTS_PIXELS_Y - max_overlay.height) / 2.0;
        (
            Point2D::new(-extra_x, -extra_y),
            Point2D::new(max_overlay.width + extra_x, max_overlay.height + extra_y),
        )
    }

    pub fn send_fake_mouse_event(&self) {
        let position = utils::lock(&self.reticle).position_in_hmd;
        self.cursor_host.send_mouse_move(position);
    }

    pub fn should_capture_mouse(&self) -> bool {
        self.allow_mouse_capture.load(Ordering::SeqCst)
            && self.is_hmd()
            && self.cursor_host.has_active_window()
            && !self.cursor_host.is_menu_shown()
    }

    /// Feeds a real OS mouse move. Returns true when the event was consumed
    /// by the capture logic and must not reach the UI.
    pub fn handle_real_mouse_move_event(&self, send_fake_event: bool) -> bool {
        {
            let mut reticle = utils::lock(&self.reticle);
            if reticle.ignore_mouse_move {
                // The move we caused by warping the cursor back
                reticle.ignore_mouse_move = false;
                return true;
            }
        }

        if !self.should_capture_mouse() {
            utils::lock(&self.reticle).last_known_real_mouse = self.cursor_host.cursor_position();
            return false;
        }

        let new_position = self.cursor_host.cursor_position();
        let (last_known, current) = {
            let reticle = utils::lock(&self.reticle);
            (reticle.last_known_real_mouse, reticle.position_in_hmd)
        };
        let delta = (new_position - last_known).to_f32();
        self.set_reticle_position(current + delta, send_fake_event);
        utils::lock(&self.reticle).ignore_mouse_move = true;
        self.cursor_host.set_cursor_position(last_known);
        true
    }

    /// Keeps a captured cursor inside the main window by warping it to the
    /// center of the part of the window no other window covers.
    pub fn handle_leave_event(&self) {
        if !self.should_capture_mouse() {
            return;
        }
        let main_frame = self.cursor_host.widget_geometry().to_box2d();
        let mut uncovered = main_frame;
        for frame in self.cursor_host.other_window_frames() {
            let frame = frame.to_box2d();
            let intersection = match uncovered.intersection(&frame) {
                Some(intersection) => intersection,
                None => continue,
            };
            if intersection.min.y > uncovered.min.y {
                uncovered.max.y = intersection.min.y;
            } else if intersection.max.y < uncovered.max.y {
                uncovered.min.y = intersection.max.y;
            }
            if intersection.min.x > uncovered.min.x {
                uncovered.max.x = intersection.min.x;
            } else if intersection.max.x < uncovered.max.x {
                uncovered.min.x = intersection.max.x;
            }
        }
        let target = box_center(&uncovered);
        {
            let mut reticle = utils::lock(&self.reticle);
            reticle.ignore_mouse_move = true;
            reticle.last_known_real_mouse = target;
        }
        self.cursor_host.set_cursor_position(target);
    }

    pub fn reticle_over_desktop(&self) -> bool {
        if self.is_hmd() {
            let max_overlay = self.ui_size();
            let position = utils::lock(&self.reticle).position_in_hmd;
            if position.x < 0.0 || position.y < 0.0 || position.x > max_overlay.width || position.y > max_overlay.height {
                return true;
            }
        }
        self.is_over_desktop.load(Ordering::SeqCst)
    }

    pub fn set_reticle_over_desktop(&self, over_desktop: bool) {
        self.is_over_desktop.store(over_desktop, Ordering::SeqCst);
    }

    pub fn reticle_maximum_position(&self) -> Point2D<f32> {
        if self.is_hmd() {
            return Point2D::new(VIRTUAL_SCREEN_SIZE_X, VIRTUAL_SCREEN_SIZE_Y);
        }
        let screen = self.cursor_host.screen_geometry();
        Point2D::new((screen.max_x() - 1) as f32, (screen.max_y() - 1) as f32)
    }

    pub fn is_reticle_visible(&self) -> bool {
        self.reticle_visible.load(Ordering::SeqCst)
    }

    pub fn set_reticle_visible(&self, visible: bool) {
        self.reticle_visible.store(visible, Ordering::SeqCst);
    }

    pub fn allow_mouse_capture(&self) -> bool {
        self.allow_mouse_capture.load(Ordering::SeqCst)
    }

    pub fn set_allow_mouse_capture(&self, allow: bool) {
        if self.allow_mouse_capture.swap(allow, Ordering::SeqCst) != allow {
            debug!("Mouse capture {}", if allow { "allowed" } else { "disallowed" });
        }
    }

    pub fn reticle_depth(&self) -> f32 {
        utils::lock(&self.params).depth
    }

    /// Ignores non-positive depths.
    pub fn set_reticle_depth(&self, depth: f32) {
        if !(depth > 0.0) {
            warn!("Ignoring reticle depth {}", depth);
            return;
        }
        utils::lock(&self.params).depth = depth;
    }

    pub fn cursor_scale(&self) -> f32 {
        utils::lock(&self.params).cursor_scale
    }

    pub fn set_cursor_scale(&self, scale: f32) {
        utils::lock(&self.params).cursor_scale = scale;
    }

    /// Opacity of the composited UI.
    pub fn alpha(&self) -> f32 {
        utils::lock(&self.params).alpha
    }

    pub fn set_alpha(&self, alpha: f32) {
        utils::lock(&self.params).alpha = alpha.clamp(0.0, 1.0);
    }

    /// Model-view transform of the reticle sprite.
    ///
    /// In HMD mode the sprite floats at the reticle depth along the line from
    /// the head to the reticle's point on the UI sphere, facing the user
    /// without roll. On the desktop it is a fixed pixel size quad in NDC at
    /// the OS cursor.
    pub fn reticle_transform(&self, eye_pose: &Transform3D<f32>, head_position: Vector3D<f32>) -> Transform3D<f32> {
        let params = *utils::lock(&self.params);
        if self.is_hmd() {
            let polar = self.overlay_to_spherical(self.reticle_position());
            let overlay_surface_point = sphere_point(polar.x, polar.y);
            let sensor_surface_point = self.model_transform().transform_point(overlay_surface_point);
            let d = sensor_surface_point - head_position;
            let d = if d.length() >= EPSILON {
                d.normalize()
            } else {
                overlay_surface_point.normalize()
            };
            let reticle_position = head_position + d * params.depth;
            let head_pose = self.display_plugin().map_or_else(Transform3D::identity, |display| display.head_pose());
            let orientation = utils::cancel_out_roll(&utils::rotation_of(&head_pose));
            let scale = params.cursor_scale * RETICLE_SIZE * params.depth;
            let model = utils::scale_rotation_translation(Vector3D::new(scale, scale, scale), &orientation, reticle_position);
            let view = eye_pose.inverse().unwrap_or_else(Transform3D::identity);
            model.then(&view)
        } else {
            let canvas = self.cursor_host.widget_geometry().size.to_f32();
            if canvas.width <= 0.0 || canvas.height <= 0.0 {
                return Transform3D::identity();
            }
            let mouse = self.cursor_host.map_from_global(self.cursor_host.cursor_position()).to_f32();
            let x = mouse.x / canvas.width * 2.0 - 1.0;
            let y = -(mouse.y / canvas.height * 2.0 - 1.0);
            let size_x = CURSOR_PIXEL_SIZE * params.cursor_scale / canvas.width;
            let size_y = CURSOR_PIXEL_SIZE * params.cursor_scale / canvas.height;
            Transform3D::scale(size_x, size_y, 1.0).then(&Transform3D::translation(x, y, 0.0))
        }
    }
}

fn box_center(b: &Box2D<i32>) -> Point2D<i32> {
    Point2D::new((b.min.x + b.max.x) / 2, (b.min.y + b.max.y) / 2)
}
