use crate::backend::DisplayBackend;
use crate::backend::StereoLayout;
use crate::backend::DESKTOP_NAME;
use crate::compositor::CompositorHelper;
use display_plugins_api::DisplayEvent;
use display_plugins_api::DisplayPluginPtr;
use display_plugins_api::Error;
use display_plugins_api::PluginContainerPtr;
use display_plugins_api::SurfacePtr;
use std::collections::HashMap;
use std::sync::Arc;

#[cfg(feature = "debug-hmd")]
use crate::api::DebugHmdDevice;
#[cfg(feature = "debug-hmd")]
use crate::session::VendorSession;

// Single entry point for all the display plugins
pub struct DisplayPluginManager {
    initialized: bool,
    plugins: HashMap<u32, DisplayPluginPtr>,
    compositor: Arc<CompositorHelper>,
    active: Option<DisplayPluginPtr>,
    events: Vec<DisplayEvent>,
}

impl Drop for DisplayPluginManager {
    fn drop(&mut self) {
        self.deactivate();
        for plugin in self.plugins.values() {
            plugin.deinit();
        }
        self.plugins.clear();
    }
}

impl DisplayPluginManager {
    pub fn new(compositor: Arc<CompositorHelper>) -> DisplayPluginManager {
        DisplayPluginManager {
            initialized: false,
            plugins: HashMap::new(),
            compositor,
            active: None,
            events: Vec::new(),
        }
    }

    // Register the desktop, 3D TV and feature-enabled HMD plugins, all
    // presenting into `surface`
    pub fn register_defaults(&mut self, surface: SurfacePtr, container: PluginContainerPtr) {
        let compositor = self.compositor.clone();
        let plugins: Vec<DisplayPluginPtr> = vec![
            DisplayBackend::desktop(surface.clone(), container.clone(), compositor.clone()),
            DisplayBackend::stereo(StereoLayout::SideBySide, surface.clone(), container.clone(), compositor.clone()),
            DisplayBackend::stereo(StereoLayout::Interleaved, surface.clone(), container.clone(), compositor.clone()),
            #[cfg(feature = "debug-hmd")]
            DisplayBackend::hmd(VendorSession::new(DebugHmdDevice::new()), surface.clone(), container.clone(), compositor.clone()),
        ];

        for plugin in plugins {
            self.register(plugin);
        }
    }

    // Register a new display plugin
    pub fn register(&mut self, plugin: DisplayPluginPtr) {
        debug!("Registered display plugin {}", plugin.name());
        if self.initialized {
            self.init_plugin(&plugin);
        }
        self.plugins.insert(plugin.id(), plugin);
    }

    // Initializes all the plugins
    pub fn initialize_plugins(&mut self) {
        if self.initialized {
            return;
        }
        let plugins: Vec<DisplayPluginPtr> = self.sorted_plugins();
        for plugin in &plugins {
            self.init_plugin(plugin);
        }
        self.initialized = true;
    }

    fn init_plugin(&mut self, plugin: &DisplayPluginPtr) {
        plugin.init();
        if plugin.is_supported() {
            self.events.push(DisplayEvent::Connected(plugin.name().to_owned()));
        } else {
            info!("Display plugin {} is not supported", plugin.name());
        }
    }

    fn sorted_plugins(&self) -> Vec<DisplayPluginPtr> {
        let mut result: Vec<DisplayPluginPtr> = self.plugins.values().cloned().collect();
        // Sort by id to match registration order
        result.sort_by(|a, b| a.id().cmp(&b.id()));
        result
    }

    /// Supported plugins in registration order.
    pub fn display_plugins(&mut self) -> Vec<DisplayPluginPtr> {
        self.initialize_plugins();
        self.sorted_plugins()
            .into_iter()
            .filter(|plugin| plugin.is_supported())
            .collect()
    }

    pub fn get_display_plugin(&self, name: &str) -> Option<DisplayPluginPtr> {
        self.plugins.values().find(|plugin| plugin.name() == name).cloned()
    }

    pub fn active_display_plugin(&self) -> Option<DisplayPluginPtr> {
        self.active.clone()
    }

    /// Activates the named plugin, deactivating the current one. When it
    /// cannot be activated the desktop plugin takes over.
    pub fn activate(&mut self, name: &str) -> Result<DisplayPluginPtr, Error> {
        self.initialize_plugins();
        if let Some(ref active) = self.active {
            if active.name() == name {
                return Ok(active.clone());
            }
        }

        let mut candidates = Vec::new();
        match self.get_display_plugin(name) {
            Some(ref plugin) if plugin.is_supported() => candidates.push(plugin.clone()),
            Some(_) => self.activation_failed(name, "not supported"),
            None => self.activation_failed(name, "not registered"),
        }
        if name != DESKTOP_NAME {
            if let Some(desktop) = self.get_display_plugin(DESKTOP_NAME) {
                candidates.push(desktop);
            }
        }

        self.deactivate();
        for candidate in candidates {
            match candidate.activate() {
                Ok(()) => {
                    info!("Display plugin is now {}", candidate.name());
                    self.compositor.set_display_plugin(Some(&candidate));
                    self.events.push(DisplayEvent::Activated(candidate.name().to_owned()));
                    self.active = Some(candidate.clone());
                    return Ok(candidate);
                },
                Err(err) => self.activation_failed(candidate.name(), &err.to_string()),
            }
        }

        Err(Error::Activation {
            plugin: name.to_owned(),
            reason: "no display plugin could be activated".into(),
        })
    }

    fn activation_failed(&mut self, plugin: &str, reason: &str) {
        error!("Failed to activate {}: {}", plugin, reason);
        self.events.push(DisplayEvent::ActivationFailed {
            plugin: plugin.to_owned(),
            reason: reason.to_owned(),
        });
    }

    pub fn deactivate(&mut self) {
        if let Some(active) = self.active.take() {
            active.deactivate();
            self.compositor.set_display_plugin(None);
            self.events.push(DisplayEvent::Deactivated(active.name().to_owned()));
        }
    }

    pub fn poll_events(&mut self) -> Vec<DisplayEvent> {
        let mut events = std::mem::take(&mut self.events);
        for plugin in self.sorted_plugins() {
            events.append(&mut plugin.poll_events());
        }
        events
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::HeadlessSurface;
    use crate::compositor::SimulatedCursorHost;
    use crate::host_container::HostContainer;
    use euclid::default::{Point2D, Rect, Size2D};

    fn manager() -> (DisplayPluginManager, Arc<HeadlessSurface>) {
        let screen = Rect::new(Point2D::new(0, 0), Size2D::new(1920, 1080));
        let compositor = CompositorHelper::new(Arc::new(SimulatedCursorHost::new(screen, screen)));
        let surface = HeadlessSurface::new(1920, 1080);
        let mut manager = DisplayPluginManager::new(compositor);
        manager.register_defaults(surface.clone(), HostContainer::new());
        (manager, surface)
    }

    #[test]
    fn plugins_keep_registration_order() {
        let (mut manager, _surface) = manager();
        let names: Vec<String> = manager
            .display_plugins()
            .iter()
            .map(|plugin| plugin.name().to_owned())
            .collect();
        assert_eq!(&names[..3], &["Desktop", "3D TV - Side by Side Stereo", "3D TV - Interleaved"]);
        assert!(manager.is_initialized());
    }

    #[test]
    fn switching_deactivates_previous() {
        let (mut manager, _surface) = manager();
        let desktop = manager.activate(DESKTOP_NAME).unwrap();
        let stereo = manager.activate("3D TV - Interleaved").unwrap();
        assert!(!desktop.is_active());
        assert!(stereo.is_active());
        assert!(manager.compositor.display_plugin().map_or(false, |p| p.is_stereo()));
        let events = manager.poll_events();
        assert!(events.contains(&DisplayEvent::Deactivated("Desktop".into())));
        assert!(events.contains(&DisplayEvent::Activated("3D TV - Interleaved".into())));
    }

    #[test]
    fn unknown_plugin_falls_back_to_desktop() {
        let (mut manager, _surface) = manager();
        let active = manager.activate("Holodeck").unwrap();
        assert_eq!(active.name(), DESKTOP_NAME);
        let events = manager.poll_events();
        assert!(events.iter().any(|event| matches!(event, DisplayEvent::ActivationFailed { plugin, .. } if plugin == "Holodeck")));
    }

    #[test]
    fn nothing_activates_without_a_context() {
        let (mut manager, surface) = manager();
        surface.set_fail_make_current(true);
        assert!(manager.activate(DESKTOP_NAME).is_err());
        assert!(manager.active_display_plugin().is_none());
    }

    #[test]
    fn drop_deactivates_active_plugin() {
        let (mut manager, _surface) = manager();
        let desktop = manager.activate(DESKTOP_NAME).unwrap();
        drop(manager);
        assert!(!desktop.is_active());
    }
}
