use display_plugins::present_frame;
use display_plugins::settings::FULLSCREEN_KEY;
use display_plugins::settings::VSYNC_KEY;
use display_plugins::CompositorHelper;
use display_plugins::DisplayEvent;
use display_plugins::DisplayPluginManager;
use display_plugins::Frame;
use display_plugins::HeadlessSurface;
use display_plugins::HostContainer;
use display_plugins::Layer;
use display_plugins::PluginContainer;
use display_plugins::Settings;
use display_plugins::SimulatedCursorHost;
use display_plugins::MENU_PATH;
use euclid::default::Point2D;
use euclid::default::Rect;
use euclid::default::Size2D;
use std::sync::Arc;

fn compositor() -> Arc<CompositorHelper> {
    let _ = env_logger::builder().is_test(true).try_init();
    let screen = Rect::new(Point2D::new(0, 0), Size2D::new(1920, 1080));
    CompositorHelper::new(Arc::new(SimulatedCursorHost::new(screen, screen)))
}

fn frame(index: u32) -> Frame {
    Frame::new(index, Layer::new(1, 1920, 1080))
}

#[test]
fn settings_survive_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("display.toml");
    {
        let container = HostContainer::open(&path).unwrap();
        let surface = HeadlessSurface::new(1280, 720);
        let mut manager = DisplayPluginManager::new(compositor());
        manager.register_defaults(surface.clone(), container.clone());
        manager.activate("Desktop").unwrap();
        assert!(container.trigger_menu_item(MENU_PATH, "Fullscreen"));
        assert!(container.trigger_menu_item(MENU_PATH, "Vsync"));
        assert!(surface.is_fullscreen());
    }

    let saved = Settings::load(&path).unwrap();
    assert!(saved.bool(FULLSCREEN_KEY, false));
    assert!(!saved.bool(VSYNC_KEY, true));

    // A new session starts from the saved state
    let container = HostContainer::open(&path).unwrap();
    let surface = HeadlessSurface::new(1280, 720);
    let mut manager = DisplayPluginManager::new(compositor());
    manager.register_defaults(surface.clone(), container.clone());
    let desktop = manager.activate("Desktop").unwrap();
    assert!(surface.is_fullscreen());
    assert!(!desktop.is_vsync_enabled());
    assert!(container.is_option_checked("Fullscreen"));
}

#[test]
fn contract_modules_are_reachable_from_the_crate_root() {
    assert_eq!(display_plugins::container::MENU_PATH, MENU_PATH);
    let container = display_plugins::HostContainer::new();
    assert!(!container.has_menu(display_plugins::container::DEVELOPER_MENU_PATH));
}

#[test]
fn presenting_through_the_active_plugin() {
    let surface = HeadlessSurface::new(1280, 720);
    let mut manager = DisplayPluginManager::new(compositor());
    manager.register_defaults(surface.clone(), HostContainer::new());
    let stereo = manager.activate("3D TV - Side by Side Stereo").unwrap();
    assert_eq!(stereo.recommended_render_size(), Size2D::new(2560, 720));
    present_frame(&*stereo, frame(1)).unwrap();
    assert_eq!(surface.swap_count(), 1);

    manager.deactivate();
    assert!(manager.active_display_plugin().is_none());
    assert!(present_frame(&*stereo, frame(2)).is_err());
    assert_eq!(surface.swap_count(), 1);
}

#[cfg(feature = "debug-hmd")]
mod headset {
    use super::*;
    use display_plugins::DebugHmdControlMsg;
    use display_plugins::DebugHmdDevice;
    use display_plugins::DisplayBackend;
    use display_plugins::VendorSession;

    #[test]
    fn failed_headset_falls_back_to_desktop() {
        let surface = HeadlessSurface::new(1280, 720);
        let container = HostContainer::new();
        let compositor = compositor();
        let device = DebugHmdDevice::new();
        let session = VendorSession::new(device.clone());
        let mut manager = DisplayPluginManager::new(compositor.clone());
        manager.register(DisplayBackend::desktop(surface.clone(), container.clone(), compositor.clone()));
        manager.register(DisplayBackend::hmd(session.clone(), surface.clone(), container.clone(), compositor.clone()));

        device.handle_msg(DebugHmdControlMsg::FailAcquire(true));
        let active = manager.activate("Debug HMD").unwrap();
        assert_eq!(active.name(), "Desktop");
        assert!(!device.is_acquired());
        assert_eq!(session.lease_count(), 0);
        assert!(compositor.display_plugin().map_or(false, |plugin| !plugin.is_hmd()));

        let events = manager.poll_events();
        assert!(events.contains(&DisplayEvent::Connected("Debug HMD".into())));
        assert!(events
            .iter()
            .any(|event| matches!(event, DisplayEvent::ActivationFailed { plugin, .. } if plugin == "Debug HMD")));
        assert!(events.contains(&DisplayEvent::Activated("Desktop".into())));

        // The device recovers on the next attempt
        device.handle_msg(DebugHmdControlMsg::FailAcquire(false));
        let active = manager.activate("Debug HMD").unwrap();
        assert!(active.is_hmd());
        assert!(device.is_acquired());
        assert_eq!(session.lease_count(), 1);
        drop(manager);
        assert!(!device.is_acquired());
    }

    #[test]
    fn unplugged_headset_is_not_listed() {
        let surface = HeadlessSurface::new(1280, 720);
        let container = HostContainer::new();
        let compositor = compositor();
        let device = DebugHmdDevice::new();
        device.handle_msg(DebugHmdControlMsg::SetAvailable(false));
        let mut manager = DisplayPluginManager::new(compositor.clone());
        manager.register(DisplayBackend::desktop(surface.clone(), container.clone(), compositor.clone()));
        manager.register(DisplayBackend::hmd(VendorSession::new(device), surface, container, compositor));

        let names: Vec<String> = manager.display_plugins().iter().map(|plugin| plugin.name().to_owned()).collect();
        assert_eq!(names, vec!["Desktop".to_owned()]);
        assert!(!manager.poll_events().contains(&DisplayEvent::Connected("Debug HMD".into())));
    }
}
