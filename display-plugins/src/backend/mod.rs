//! Display plugins built from a window surface and a present strategy.

mod desktop;
pub mod hmd;
mod redraw_timer;
mod stats;
mod stereo;
mod window_surface;

pub use self::hmd::HmdFramePipeline;
pub use self::redraw_timer::RedrawTimer;
pub use self::stats::PresentStats;
pub use self::stereo::{StereoLayout, DEFAULT_IPD};
pub use self::window_surface::WindowSurface;

use crate::compositor::virtual_screen_recommended_overlay_rect;
use crate::compositor::virtual_screen_size;
use crate::compositor::CompositorHelper;
use crate::session::VendorSession;
use display_plugins_api::settings::ENABLE_REPROJECTION_KEY;
use display_plugins_api::settings::FULLSCREEN_KEY;
use display_plugins_api::settings::IPD_SCALE_KEY;
use display_plugins_api::settings::MONO_PREVIEW_KEY;
use display_plugins_api::settings::VSYNC_KEY;
use display_plugins_api::utils;
use display_plugins_api::ContextGuard;
use display_plugins_api::DisplayEvent;
use display_plugins_api::DisplayPlugin;
use display_plugins_api::Error;
use display_plugins_api::Eye;
use display_plugins_api::Frame;
use display_plugins_api::Grouping;
use display_plugins_api::HandLaserMode;
use display_plugins_api::Hands;
use display_plugins_api::MenuCallback;
use display_plugins_api::Plugin;
use display_plugins_api::PluginContainerPtr;
use display_plugins_api::PluginType;
use display_plugins_api::SurfacePtr;
use display_plugins_api::DEVELOPER_MENU_PATH;
use display_plugins_api::MENU_PATH;
use euclid::default::Rect;
use euclid::default::Size2D;
use euclid::default::Transform3D;
use euclid::default::Vector3D;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::Weak;
use std::time::Duration;

pub const DESKTOP_NAME: &str = "Desktop";
pub const FULLSCREEN_MENU_ITEM: &str = "Fullscreen";
pub const VSYNC_MENU_ITEM: &str = "Vsync";
pub const MONO_PREVIEW_MENU_ITEM: &str = "Mono Preview";
pub const REPROJECTION_MENU_ITEM: &str = "Allow Reprojection";
// Redraw rate of window plugins
const DESKTOP_REFRESH_RATE: f32 = 60.0;

/// How a backend turns a rendered frame into pixels.
pub enum PresentStrategy {
    // Scene, flat UI and cursor into the window
    Desktop,
    // Both eyes packed into the window for a passive 3D display
    Stereo(StereoLayout),
    // Composited for and submitted to a headset, mirrored into the window
    Hmd(HmdFramePipeline),
}

impl PresentStrategy {
    fn menu_items(&self) -> Vec<(&'static str, &'static str)> {
        match *self {
            PresentStrategy::Desktop | PresentStrategy::Stereo(_) => {
                vec![(MENU_PATH, FULLSCREEN_MENU_ITEM), (MENU_PATH, VSYNC_MENU_ITEM)]
            },
            PresentStrategy::Hmd(_) => vec![
                (MENU_PATH, MONO_PREVIEW_MENU_ITEM),
                (DEVELOPER_MENU_PATH, REPROJECTION_MENU_ITEM),
            ],
        }
    }
}

/// A display plugin: one window surface plus one present strategy.
pub struct DisplayBackend {
    id: u32,
    name: String,
    window: WindowSurface,
    strategy: PresentStrategy,
    container: PluginContainerPtr,
    compositor: Arc<CompositorHelper>,
    // Handed to menu callbacks
    weak_self: Weak<DisplayBackend>,
    active: AtomicBool,
    timer: Mutex<Option<RedrawTimer>>,
    stats: Mutex<PresentStats>,
    // Held for a whole present so deactivation waits for it
    frame_lock: Mutex<()>,
    events: Mutex<Vec<DisplayEvent>>,
    // Stereo layouts only, HMDs keep their own
    ipd_scale: Mutex<f32>,
}

impl DisplayBackend {
    fn new(
        name: String,
        surface: SurfacePtr,
        strategy: PresentStrategy,
        container: PluginContainerPtr,
        compositor: Arc<CompositorHelper>,
    ) -> Arc<DisplayBackend> {
        Arc::new_cyclic(|weak_self| DisplayBackend {
            id: utils::new_id(),
            name,
            window: WindowSurface::new(surface),
            strategy,
            container,
            compositor,
            weak_self: weak_self.clone(),
            active: AtomicBool::new(false),
            timer: Mutex::new(None),
            stats: Mutex::new(PresentStats::new(DESKTOP_REFRESH_RATE)),
            frame_lock: Mutex::new(()),
            events: Mutex::new(Vec::new()),
            ipd_scale: Mutex::new(1.0),
        })
    }

    /// The plain window. Never fails to activate while its surface works.
    pub fn desktop(surface: SurfacePtr, container: PluginContainerPtr, compositor: Arc<CompositorHelper>) -> Arc<DisplayBackend> {
        DisplayBackend::new(DESKTOP_NAME.into(), surface, PresentStrategy::Desktop, container, compositor)
    }

    pub fn stereo(
        layout: StereoLayout,
        surface: SurfacePtr,
        container: PluginContainerPtr,
        compositor: Arc<CompositorHelper>,
    ) -> Arc<DisplayBackend> {
        DisplayBackend::new(layout.name().into(), surface, PresentStrategy::Stereo(layout), container, compositor)
    }

    /// A headset driven through `session`, mirrored into `surface`.
    pub fn hmd(
        session: Arc<VendorSession>,
        surface: SurfacePtr,
        container: PluginContainerPtr,
        compositor: Arc<CompositorHelper>,
    ) -> Arc<DisplayBackend> {
        let name = session.device().name().to_owned();
        let pipeline = HmdFramePipeline::new(session, compositor.clone());
        DisplayBackend::new(name, surface, PresentStrategy::Hmd(pipeline), container, compositor)
    }

    pub fn strategy(&self) -> &PresentStrategy {
        &self.strategy
    }

    pub fn window(&self) -> &WindowSurface {
        &self.window
    }

    pub fn hmd_pipeline(&self) -> Option<&HmdFramePipeline> {
        match self.strategy {
            PresentStrategy::Hmd(ref pipeline) => Some(pipeline),
            _ => None,
        }
    }

    fn refresh_rate(&self) -> f32 {
        match self.strategy {
            PresentStrategy::Hmd(ref pipeline) => pipeline.device().refresh_rate(),
            _ => DESKTOP_REFRESH_RATE,
        }
    }

    fn stereo_ipd(&self) -> f32 {
        DEFAULT_IPD * *utils::lock(&self.ipd_scale)
    }

    // Runs with the context current
    fn customize_context(&self) {
        match self.strategy {
            PresentStrategy::Hmd(ref pipeline) => pipeline.customize_context(&self.window),
            _ => {
                self.window.enable_vsync(self.container.bool_setting(VSYNC_KEY, true));
            },
        }
    }

    fn menu_callback<F>(&self, on_clicked: F) -> MenuCallback
    where
        F: Fn(&DisplayBackend, bool) + Send + Sync + 'static,
    {
        let weak = self.weak_self.clone();
        Arc::new(move |checked| {
            if let Some(backend) = weak.upgrade() {
                on_clicked(&backend, checked);
            }
        })
    }

    fn register_menus(&self) {
        let container = &self.container;
        match self.strategy {
            PresentStrategy::Desktop | PresentStrategy::Stereo(_) => {
                let fullscreen = container.bool_setting(FULLSCREEN_KEY, false);
                container.add_menu_item(
                    PluginType::Display,
                    MENU_PATH,
                    FULLSCREEN_MENU_ITEM,
                    self.menu_callback(|backend, checked| {
                        backend.container.set_bool_setting(FULLSCREEN_KEY, checked);
                        backend.window.set_fullscreen(checked);
                    }),
                    true,
                    fullscreen,
                );
                container.add_menu_item(
                    PluginType::Display,
                    MENU_PATH,
                    VSYNC_MENU_ITEM,
                    self.menu_callback(|backend, checked| {
                        backend.container.set_bool_setting(VSYNC_KEY, checked);
                        backend.enable_vsync(checked);
                    }),
                    true,
                    self.window.is_vsync_enabled(),
                );
            },
            PresentStrategy::Hmd(ref pipeline) => {
                container.add_menu_item(
                    PluginType::Display,
                    MENU_PATH,
                    MONO_PREVIEW_MENU_ITEM,
                    self.menu_callback(|backend, checked| {
                        backend.container.set_bool_setting(MONO_PREVIEW_KEY, checked);
                        if let Some(pipeline) = backend.hmd_pipeline() {
                            pipeline.set_mono_preview(checked);
                        }
                    }),
                    true,
                    pipeline.mono_preview(),
                );
                container.add_menu(DEVELOPER_MENU_PATH);
                container.add_menu_item(
                    PluginType::Display,
                    DEVELOPER_MENU_PATH,
                    REPROJECTION_MENU_ITEM,
                    self.menu_callback(|backend, checked| {
                        backend.container.set_bool_setting(ENABLE_REPROJECTION_KEY, checked);
                        if let Some(pipeline) = backend.hmd_pipeline() {
                            pipeline.set_reprojection_enabled(checked);
                        }
                    }),
                    true,
                    pipeline.is_reprojection_enabled(),
                );
            },
        }
    }

    fn remove_menus(&self) {
        for (path, name) in self.strategy.menu_items() {
            self.container.remove_menu_item(path, name);
        }
    }

    fn start_timer(&self) {
        let interval = Duration::from_secs_f32(1.0 / self.refresh_rate());
        let surface = self.window.surface().clone();
        let throttles = !self.is_hmd();
        let container = self.container.clone();
        let timer = RedrawTimer::start(
            interval,
            move || throttles && !surface.has_focus(),
            move || container.request_render(),
        );
        *utils::lock(&self.timer) = Some(timer);
    }

    fn stop_timer(&self) {
        // Joined outside the lock, a tick may be waiting on the container
        let timer = utils::lock(&self.timer).take();
        if let Some(mut timer) = timer {
            timer.stop();
        }
    }

    fn push_event(&self, event: DisplayEvent) {
        utils::lock(&self.events).push(event);
    }
}

impl Plugin for DisplayBackend {
    fn id(&self) -> u32 {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn grouping(&self) -> Grouping {
        match self.strategy {
            PresentStrategy::Stereo(_) => Grouping::Advanced,
            _ => Grouping::Standard,
        }
    }

    fn is_supported(&self) -> bool {
        match self.strategy {
            PresentStrategy::Hmd(ref pipeline) => pipeline.is_supported(),
            _ => true,
        }
    }

    fn activate(&self) -> Result<(), Error> {
        if self.is_active() {
            return Ok(());
        }
        if let PresentStrategy::Hmd(ref pipeline) = self.strategy {
            if let Err(err) = pipeline.activate(&*self.container) {
                error!("Failed to open {} ({})", self.name, err);
                return Err(err);
            }
        }

        match ContextGuard::acquire(&**self.window.surface()) {
            Ok(_guard) => self.customize_context(),
            Err(err) => {
                error!("Failed to make {} context current ({})", self.name, err);
                if let PresentStrategy::Hmd(ref pipeline) = self.strategy {
                    pipeline.deactivate();
                }
                return Err(Error::Activation {
                    plugin: self.name.clone(),
                    reason: err.to_string(),
                });
            },
        }

        *utils::lock(&self.ipd_scale) = self.container.float_setting(IPD_SCALE_KEY, 1.0);
        if !self.is_hmd() {
            self.window.set_fullscreen(self.container.bool_setting(FULLSCREEN_KEY, false));
        }
        self.window.set_visible(true);
        self.register_menus();
        {
            let mut stats = utils::lock(&self.stats);
            stats.reset();
            stats.set_target_rate(self.refresh_rate());
        }
        self.active.store(true, Ordering::SeqCst);
        self.start_timer();
        info!("Activated {}", self.name);
        Ok(())
    }

    fn deactivate(&self) {
        self.stop_timer();
        let _frame = utils::lock(&self.frame_lock);
        if !self.active.swap(false, Ordering::SeqCst) {
            return;
        }
        self.remove_menus();
        if let PresentStrategy::Hmd(ref pipeline) = self.strategy {
            pipeline.deactivate();
        }
        info!("Deactivated {}", self.name);
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

impl DisplayPlugin for DisplayBackend {
    fn is_hmd(&self) -> bool {
        matches!(self.strategy, PresentStrategy::Hmd(_))
    }

    fn is_stereo(&self) -> bool {
        !matches!(self.strategy, PresentStrategy::Desktop)
    }

    fn is_throttled(&self) -> bool {
        !self.is_hmd() && !self.window.has_focus()
    }

    fn recommended_render_size(&self) -> Size2D<u32> {
        match self.strategy {
            PresentStrategy::Desktop => self.window.size(),
            PresentStrategy::Stereo(layout) => layout.render_size(self.window.size()),
            PresentStrategy::Hmd(ref pipeline) => pipeline.render_size(),
        }
    }

    fn recommended_ui_size(&self) -> Size2D<u32> {
        match self.strategy {
            PresentStrategy::Hmd(_) => virtual_screen_size(),
            _ => self.window.size(),
        }
    }

    fn recommended_overlay_rect(&self) -> Rect<u32> {
        match self.strategy {
            PresentStrategy::Hmd(_) => virtual_screen_recommended_overlay_rect(),
            _ => Rect::from_size(self.recommended_ui_size()),
        }
    }

    fn device_pixel_ratio(&self) -> f32 {
        self.window.device_pixel_ratio()
    }

    fn has_focus(&self) -> bool {
        self.window.has_focus()
    }

    fn is_vsync_enabled(&self) -> bool {
        self.window.is_vsync_enabled()
    }

    fn enable_vsync(&self, enable: bool) {
        if self.is_hmd() {
            warn!("Vsync of {} is managed by its headset", self.name);
            return;
        }
        self.window.enable_vsync(enable);
    }

    fn eye_projection(&self, eye: Eye, base_projection: &Transform3D<f32>) -> Transform3D<f32> {
        match self.strategy {
            PresentStrategy::Desktop => *base_projection,
            PresentStrategy::Stereo(layout) => layout.eye_projection(eye, base_projection, self.stereo_ipd()),
            PresentStrategy::Hmd(ref pipeline) => pipeline.eye_projection(eye),
        }
    }

    fn culling_projection(&self, base_projection: &Transform3D<f32>) -> Transform3D<f32> {
        match self.strategy {
            PresentStrategy::Hmd(ref pipeline) => pipeline.culling_projection(),
            _ => *base_projection,
        }
    }

    fn eye_to_head_transform(&self, eye: Eye) -> Transform3D<f32> {
        match self.strategy {
            PresentStrategy::Desktop => Transform3D::identity(),
            PresentStrategy::Stereo(layout) => layout.eye_to_head(eye, self.stereo_ipd()),
            PresentStrategy::Hmd(ref pipeline) => pipeline.eye_to_head(eye),
        }
    }

    fn head_pose(&self) -> Transform3D<f32> {
        match self.strategy {
            PresentStrategy::Hmd(ref pipeline) => pipeline.head_pose(),
            _ => Transform3D::identity(),
        }
    }

    fn set_ipd_scale(&self, scale: f32) {
        match self.strategy {
            PresentStrategy::Hmd(ref pipeline) => pipeline.set_ipd_scale(scale),
            PresentStrategy::Stereo(_) => *utils::lock(&self.ipd_scale) = scale,
            PresentStrategy::Desktop => {},
        }
    }

    fn reset_sensors(&self) {
        if let PresentStrategy::Hmd(ref pipeline) = self.strategy {
            pipeline.reset_sensors();
        }
    }

    fn is_hmd_mounted(&self) -> bool {
        match self.strategy {
            PresentStrategy::Hmd(ref pipeline) => self.is_active() && pipeline.is_mounted(),
            _ => false,
        }
    }

    fn pre_render(&self) {
        if !self.is_active() {
            return;
        }
        if let PresentStrategy::Hmd(ref pipeline) = self.strategy {
            match pipeline.poll_mount_change() {
                Some(true) => {
                    info!("{} mounted", self.name);
                    self.push_event(DisplayEvent::Mounted(self.name.clone()));
                },
                Some(false) => {
                    info!("{} unmounted", self.name);
                    self.push_event(DisplayEvent::Unmounted(self.name.clone()));
                },
                None => {},
            }
        }
    }

    fn begin_frame_render(&self, frame_index: u32) -> Result<bool, Error> {
        match self.strategy {
            PresentStrategy::Hmd(ref pipeline) => pipeline.begin_frame_render(frame_index),
            _ => Ok(true),
        }
    }

    fn pre_display(&self) -> Result<(), Error> {
        if !self.is_active() {
            return Err(Error::NotActive);
        }
        self.window.begin_frame()
    }

    fn display(&self, frame: Frame) -> Result<(), Error> {
        let _frame = utils::lock(&self.frame_lock);
        if !self.is_active() {
            return Err(Error::NotActive);
        }
        let size = self.window.size();
        let presented = match self.strategy {
            PresentStrategy::Desktop => {
                self.window.render(desktop::composite(&frame, size, &self.compositor));
                true
            },
            PresentStrategy::Stereo(layout) => {
                self.window.render(layout.composite(&frame, size, &self.compositor));
                true
            },
            PresentStrategy::Hmd(ref pipeline) => pipeline.present(&frame, &self.window)?,
        };

        let now = utils::seconds();
        let mut stats = utils::lock(&self.stats);
        if presented {
            stats.record_present(now, frame.frame_index);
        } else {
            stats.record_drop(now);
        }
        Ok(())
    }

    fn finish_frame(&self) {
        let swap = match self.strategy {
            PresentStrategy::Hmd(ref pipeline) => pipeline.needs_swap(),
            _ => true,
        };
        self.window.end_frame(swap);
    }

    fn set_hand_laser(&self, hands: Hands, mode: HandLaserMode, color: [f32; 4], direction: Vector3D<f32>) -> bool {
        match self.strategy {
            PresentStrategy::Hmd(ref pipeline) => {
                pipeline.set_hand_laser(hands, mode, color, direction);
                true
            },
            _ => false,
        }
    }

    fn present_rate(&self) -> f32 {
        utils::lock(&self.stats).present_rate(utils::seconds())
    }

    fn new_frame_present_rate(&self) -> f32 {
        utils::lock(&self.stats).new_frame_present_rate(utils::seconds())
    }

    fn dropped_frame_rate(&self) -> f32 {
        utils::lock(&self.stats).dropped_frame_rate(utils::seconds())
    }

    fn stutter_rate(&self) -> f32 {
        utils::lock(&self.stats).stutter_rate(utils::seconds())
    }

    fn poll_events(&self) -> Vec<DisplayEvent> {
        std::mem::take(&mut *utils::lock(&self.events))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::HeadlessSurface;
    use crate::compositor::SimulatedCursorHost;
    use crate::host_container::HostContainer;
    use display_plugins_api::present_frame;
    use display_plugins_api::Layer;
    use display_plugins_api::PipelineKind;
    use display_plugins_api::PluginContainer;
    use display_plugins_api::Surface;
    use euclid::default::Point2D;

    struct Fixture {
        surface: Arc<HeadlessSurface>,
        container: Arc<HostContainer>,
        compositor: Arc<CompositorHelper>,
    }

    fn fixture() -> Fixture {
        let screen = Rect::new(Point2D::new(0, 0), Size2D::new(1920, 1080));
        Fixture {
            surface: HeadlessSurface::new(1920, 1080),
            container: HostContainer::new(),
            compositor: CompositorHelper::new(Arc::new(SimulatedCursorHost::new(screen, screen))),
        }
    }

    impl Fixture {
        fn desktop(&self) -> Arc<DisplayBackend> {
            DisplayBackend::desktop(self.surface.clone(), self.container.clone(), self.compositor.clone())
        }

        fn stereo(&self, layout: StereoLayout) -> Arc<DisplayBackend> {
            DisplayBackend::stereo(layout, self.surface.clone(), self.container.clone(), self.compositor.clone())
        }
    }

    fn frame(index: u32) -> Frame {
        Frame::new(index, Layer::new(1, 1920, 1080)).with_overlay(Layer::new(2, 1920, 1080))
    }

    #[test]
    fn desktop_activation_registers_menus() {
        let f = fixture();
        let desktop = f.desktop();
        desktop.activate().unwrap();
        assert!(desktop.is_active());
        assert!(f.surface.is_visible());
        assert!(!f.surface.is_current());
        assert_eq!(f.container.menu_items(MENU_PATH), vec![FULLSCREEN_MENU_ITEM, VSYNC_MENU_ITEM]);
        desktop.deactivate();
        assert!(!desktop.is_active());
        assert!(f.container.menu_items(MENU_PATH).is_empty());
    }

    #[test]
    fn desktop_present_swaps_and_releases() {
        let f = fixture();
        let desktop = f.desktop();
        desktop.activate().unwrap();
        present_frame(&*desktop, frame(1)).unwrap();
        assert_eq!(f.surface.swap_count(), 1);
        assert!(!f.surface.is_current());
        let batches = f.surface.take_batches();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].draws()[0].0, PipelineKind::Present);
        assert!(desktop.present_rate() > 0.0);
        desktop.deactivate();
    }

    #[test]
    fn inactive_backend_refuses_frames() {
        let f = fixture();
        let desktop = f.desktop();
        assert!(matches!(present_frame(&*desktop, frame(1)), Err(Error::NotActive)));
        assert!(!f.surface.is_current());
    }

    #[test]
    fn lost_context_fails_activation() {
        let f = fixture();
        f.surface.set_fail_make_current(true);
        let desktop = f.desktop();
        assert!(matches!(desktop.activate(), Err(Error::Activation { .. })));
        assert!(!desktop.is_active());
        assert!(f.container.menu_items(MENU_PATH).is_empty());
    }

    #[test]
    fn menu_toggles_persist() {
        let f = fixture();
        let desktop = f.desktop();
        desktop.activate().unwrap();
        assert!(f.container.trigger_menu_item(MENU_PATH, FULLSCREEN_MENU_ITEM));
        assert!(f.surface.is_fullscreen());
        assert!(f.container.bool_setting(FULLSCREEN_KEY, false));
        assert!(f.container.trigger_menu_item(MENU_PATH, VSYNC_MENU_ITEM));
        assert!(!f.surface.is_vsync_enabled());
        assert!(!f.container.bool_setting(VSYNC_KEY, true));
        desktop.deactivate();
    }

    #[test]
    fn unfocused_window_is_throttled() {
        let f = fixture();
        let desktop = f.desktop();
        assert!(!desktop.is_throttled());
        f.surface.set_focus(false);
        assert!(desktop.is_throttled());
    }

    #[test]
    fn stereo_geometry_follows_ipd_scale() {
        let f = fixture();
        let stereo = f.stereo(StereoLayout::SideBySide);
        assert!(stereo.is_stereo());
        assert!(!stereo.is_hmd());
        assert_eq!(stereo.recommended_render_size(), Size2D::new(3840, 1080));
        assert!((stereo.ipd() - DEFAULT_IPD).abs() < 1.0e-6);
        stereo.set_ipd_scale(0.5);
        assert!((stereo.ipd() - DEFAULT_IPD / 2.0).abs() < 1.0e-6);
        assert_eq!(stereo.grouping(), Grouping::Advanced);
    }

    #[test]
    fn stereo_without_hands_draws_no_lasers() {
        let f = fixture();
        let stereo = f.stereo(StereoLayout::Interleaved);
        assert!(!stereo.set_hand_laser(Hands::BOTH, HandLaserMode::Overlay, [1.0; 4], Vector3D::new(0.0, 0.0, -1.0)));
        assert_eq!(stereo.name(), "3D TV - Interleaved");
    }

    #[cfg(feature = "debug-hmd")]
    mod headset {
        use super::*;
        use crate::api::DebugHmdControlMsg;
        use crate::api::DebugHmdDevice;

        fn hmd(f: &Fixture) -> (Arc<DebugHmdDevice>, Arc<DisplayBackend>) {
            let device = DebugHmdDevice::new();
            let session = VendorSession::new(device.clone());
            let backend = DisplayBackend::hmd(session, f.surface.clone(), f.container.clone(), f.compositor.clone());
            (device, backend)
        }

        #[test]
        fn activation_opens_session_and_mirror() {
            let f = fixture();
            let (device, backend) = hmd(&f);
            assert_eq!(backend.name(), "Debug HMD");
            backend.activate().unwrap();
            assert!(device.is_acquired());
            assert!(backend.hmd_pipeline().map_or(false, |p| p.is_preview_enabled()));
            assert_eq!(backend.recommended_ui_size(), Size2D::new(3960, 1188));
            assert_eq!(f.container.menu_items(DEVELOPER_MENU_PATH), vec![REPROJECTION_MENU_ITEM]);
            backend.deactivate();
            assert!(!device.is_acquired());
        }

        #[test]
        fn failed_context_releases_device() {
            let f = fixture();
            f.surface.set_fail_make_current(true);
            let (device, backend) = hmd(&f);
            assert!(backend.activate().is_err());
            assert!(!device.is_acquired());
        }

        #[test]
        fn unavailable_headset_is_unsupported() {
            let f = fixture();
            let (device, backend) = hmd(&f);
            device.handle_msg(DebugHmdControlMsg::SetAvailable(false));
            assert!(!backend.is_supported());
            assert!(matches!(backend.activate(), Err(Error::DeviceUnavailable(_))));
        }

        #[test]
        fn dropped_submit_is_counted() {
            let f = fixture();
            let (device, backend) = hmd(&f);
            backend.activate().unwrap();
            backend.begin_frame_render(1).unwrap();
            device.handle_msg(DebugHmdControlMsg::FailNextSubmit);
            present_frame(&*backend, frame(1)).unwrap();
            assert!(backend.dropped_frame_rate() > 0.0);
            backend.begin_frame_render(2).unwrap();
            present_frame(&*backend, frame(2)).unwrap();
            assert_eq!(device.submitted_frames(), vec![2]);
            // The mirror swaps since vsync went off
            assert_eq!(f.surface.swap_count(), 2);
            backend.deactivate();
        }

        #[test]
        fn mount_transitions_become_events() {
            let f = fixture();
            let (device, backend) = hmd(&f);
            backend.activate().unwrap();
            device.handle_msg(DebugHmdControlMsg::Unmount);
            backend.pre_render();
            device.handle_msg(DebugHmdControlMsg::Mount);
            backend.pre_render();
            assert_eq!(
                backend.poll_events(),
                vec![
                    DisplayEvent::Unmounted("Debug HMD".into()),
                    DisplayEvent::Mounted("Debug HMD".into()),
                ]
            );
            assert!(backend.poll_events().is_empty());
            backend.deactivate();
        }

        #[test]
        fn mono_preview_menu_updates_pipeline() {
            let f = fixture();
            let (_device, backend) = hmd(&f);
            backend.activate().unwrap();
            assert!(f.container.trigger_menu_item(MENU_PATH, MONO_PREVIEW_MENU_ITEM));
            assert!(!backend.hmd_pipeline().map_or(true, |p| p.mono_preview()));
            assert!(!f.container.bool_setting(MONO_PREVIEW_KEY, true));
            backend.deactivate();
        }
    }
}
