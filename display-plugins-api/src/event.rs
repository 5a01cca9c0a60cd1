#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde-serialization", derive(Deserialize, Serialize))]
pub enum DisplayEvent {
    // Indicates that a display plugin has been registered and is supported
    Connected(String),
    // Indicates that a display plugin has been removed
    Disconnected(String),
    Activated(String),
    Deactivated(String),
    // The requested plugin failed to activate and a fallback was chosen
    ActivationFailed { plugin: String, reason: String },
    // The user put the headset on
    Mounted(String),
    // The user took the headset off
    Unmounted(String),
}
