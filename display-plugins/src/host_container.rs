use display_plugins_api::utils;
use display_plugins_api::Error;
use display_plugins_api::MenuCallback;
use display_plugins_api::PluginContainer;
use display_plugins_api::PluginType;
use display_plugins_api::Settings;
use std::collections::BTreeMap;
use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex;

struct MenuItem {
    name: String,
    plugin_type: PluginType,
    checkable: bool,
    checked: bool,
    on_clicked: MenuCallback,
}

type RenderCallback = Box<dyn Fn() + Send + Sync>;

/// A `PluginContainer` backed by a `Settings` store and an in-memory menu
/// model.
pub struct HostContainer {
    settings: Mutex<Settings>,
    // Settings are written back here on every change when set
    settings_path: Option<PathBuf>,
    menus: Mutex<BTreeMap<String, Vec<MenuItem>>>,
    render_requests: AtomicU64,
    on_render_request: Mutex<Option<RenderCallback>>,
}

impl HostContainer {
    pub fn new() -> Arc<HostContainer> {
        HostContainer::with_settings(Settings::new(), None)
    }

    fn with_settings(settings: Settings, settings_path: Option<PathBuf>) -> Arc<HostContainer> {
        Arc::new(HostContainer {
            settings: Mutex::new(settings),
            settings_path,
            menus: Mutex::new(BTreeMap::new()),
            render_requests: AtomicU64::new(0),
            on_render_request: Mutex::new(None),
        })
    }

    /// Opens a container persisting to `path`. A missing file starts empty.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Arc<HostContainer>, Error> {
        let path = path.as_ref().to_path_buf();
        let settings = match Settings::load(&path) {
            Ok(settings) => settings,
            Err(Error::Io(ref err)) if err.kind() == io::ErrorKind::NotFound => {
                debug!("No settings at {}, starting with defaults", path.display());
                Settings::new()
            },
            Err(err) => return Err(err),
        };
        Ok(HostContainer::with_settings(settings, Some(path)))
    }

    pub fn settings(&self) -> Settings {
        utils::lock(&self.settings).clone()
    }

    pub fn set_render_callback<F: Fn() + Send + Sync + 'static>(&self, callback: F) {
        *utils::lock(&self.on_render_request) = Some(Box::new(callback));
    }

    pub fn render_requests(&self) -> u64 {
        self.render_requests.load(Ordering::SeqCst)
    }

    pub fn has_menu(&self, path: &str) -> bool {
        utils::lock(&self.menus).contains_key(path)
    }

    pub fn menu_items(&self, path: &str) -> Vec<String> {
        utils::lock(&self.menus)
            .get(path)
            .map(|items| items.iter().map(|item| item.name.clone()).collect())
            .unwrap_or_default()
    }

    /// Simulates a click on a menu item. Checkable items toggle first.
    /// Returns false when no such item exists.
    pub fn trigger_menu_item(&self, path: &str, name: &str) -> bool {
        let (callback, checked) = {
            let mut menus = utils::lock(&self.menus);
            let item = match menus.get_mut(path).and_then(|items| items.iter_mut().find(|item| item.name == name)) {
                Some(item) => item,
                None => return false,
            };
            if item.checkable {
                item.checked = !item.checked;
            }
            debug!("Menu item {}>{} ({:?}) triggered", path, name, item.plugin_type);
            (item.on_clicked.clone(), item.checked)
        };
        // The callback may come back into the container
        callback(checked);
        true
    }

    fn persist(&self, settings: &Settings) {
        if let Some(ref path) = self.settings_path {
            if let Err(err) = settings.save(path) {
                error!("Failed to save settings to {}: {}", path.display(), err);
            }
        }
    }
}

impl PluginContainer for HostContainer {
    fn add_menu(&self, path: &str) {
        utils::lock(&self.menus).entry(path.to_owned()).or_default();
    }

    fn remove_menu(&self, path: &str) {
        utils::lock(&self.menus).remove(path);
    }

    fn add_menu_item(
        &self,
        plugin_type: PluginType,
        path: &str,
        name: &str,
        on_clicked: MenuCallback,
        checkable: bool,
        checked: bool,
    ) {
        let mut menus = utils::lock(&self.menus);
        let items = menus.entry(path.to_owned()).or_default();
        items.retain(|item| item.name != name);
        items.push(MenuItem {
            name: name.to_owned(),
            plugin_type,
            checkable,
            checked,
            on_clicked,
        });
    }

    fn remove_menu_item(&self, path: &str, name: &str) {
        if let Some(items) = utils::lock(&self.menus).get_mut(path) {
            items.retain(|item| item.name != name);
        }
    }

    fn is_option_checked(&self, name: &str) -> bool {
        utils::lock(&self.menus)
            .values()
            .flat_map(|items| items.iter())
            .any(|item| item.name == name && item.checked)
    }

    fn set_is_option_checked(&self, name: &str, checked: bool) {
        for items in utils::lock(&self.menus).values_mut() {
            for item in items.iter_mut().filter(|item| item.name == name) {
                item.checked = checked;
            }
        }
    }

    fn bool_setting(&self, key: &str, default: bool) -> bool {
        utils::lock(&self.settings).bool(key, default)
    }

    fn set_bool_setting(&self, key: &str, value: bool) {
        let mut settings = utils::lock(&self.settings);
        settings.set_bool(key, value);
        self.persist(&settings);
    }

    fn float_setting(&self, key: &str, default: f32) -> f32 {
        utils::lock(&self.settings).float(key, default)
    }

    fn set_float_setting(&self, key: &str, value: f32) {
        let mut settings = utils::lock(&self.settings);
        settings.set_float(key, value);
        self.persist(&settings);
    }

    fn request_render(&self) {
        self.render_requests.fetch_add(1, Ordering::SeqCst);
        if let Some(ref callback) = *utils::lock(&self.on_render_request) {
            callback();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use display_plugins_api::settings::MONO_PREVIEW_KEY;
    use std::sync::atomic::AtomicBool;
    use std::sync::Weak;
    use tempfile::tempdir;

    #[test]
    fn checkable_item_toggles_and_calls_back() {
        let container = HostContainer::new();
        let seen = Arc::new(AtomicBool::new(true));
        let seen_clone = seen.clone();
        container.add_menu_item(
            PluginType::Display,
            "Display",
            "Mono Preview",
            Arc::new(move |checked| seen_clone.store(checked, Ordering::SeqCst)),
            true,
            true,
        );
        assert!(container.is_option_checked("Mono Preview"));
        assert!(container.trigger_menu_item("Display", "Mono Preview"));
        assert!(!seen.load(Ordering::SeqCst));
        assert!(!container.is_option_checked("Mono Preview"));
        assert!(!container.trigger_menu_item("Display", "Missing"));
    }

    #[test]
    fn callback_can_write_settings() {
        let container = HostContainer::new();
        let weak: Weak<HostContainer> = Arc::downgrade(&container);
        container.add_menu_item(
            PluginType::Display,
            "Display",
            "Mono Preview",
            Arc::new(move |checked| {
                if let Some(container) = weak.upgrade() {
                    container.set_bool_setting(MONO_PREVIEW_KEY, checked);
                }
            }),
            true,
            true,
        );
        container.trigger_menu_item("Display", "Mono Preview");
        assert!(!container.bool_setting(MONO_PREVIEW_KEY, true));
    }

    #[test]
    fn settings_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        {
            let container = HostContainer::open(&path).unwrap();
            container.set_float_setting("hmd.ipdScale", 2.0);
        }
        let container = HostContainer::open(&path).unwrap();
        assert_eq!(container.float_setting("hmd.ipdScale", 1.0), 2.0);
    }

    #[test]
    fn render_requests_are_counted() {
        let container = HostContainer::new();
        let called = Arc::new(AtomicBool::new(false));
        let called_clone = called.clone();
        container.set_render_callback(move || called_clone.store(true, Ordering::SeqCst));
        container.request_render();
        container.request_render();
        assert_eq!(container.render_requests(), 2);
        assert!(called.load(Ordering::SeqCst));
    }
}
