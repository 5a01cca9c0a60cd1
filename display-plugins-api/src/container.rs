use crate::plugin::PluginType;
use std::sync::Arc;

pub const MENU_PATH: &str = "Display";
pub const DEVELOPER_MENU_PATH: &str = "Developer>Display";

/// Invoked with the new checked state when a menu item is triggered.
pub type MenuCallback = Arc<dyn Fn(bool) + Send + Sync>;

/// The host application, as seen by a plugin: menus, persisted settings and
/// render requests.
pub trait PluginContainer: Send + Sync {
    fn add_menu(&self, path: &str);

    fn remove_menu(&self, path: &str);

    fn add_menu_item(
        &self,
        plugin_type: PluginType,
        path: &str,
        name: &str,
        on_clicked: MenuCallback,
        checkable: bool,
        checked: bool,
    );

    fn remove_menu_item(&self, path: &str, name: &str);

    fn is_option_checked(&self, name: &str) -> bool;

    fn set_is_option_checked(&self, name: &str, checked: bool);

    fn bool_setting(&self, key: &str, default: bool) -> bool;

    fn set_bool_setting(&self, key: &str, value: bool);

    fn float_setting(&self, key: &str, default: f32) -> f32;

    fn set_float_setting(&self, key: &str, value: f32);

    /// Asks the application to render a new frame.
    fn request_render(&self);
}

pub type PluginContainerPtr = Arc<dyn PluginContainer>;
