use crate::error::Error;
use serde::Deserialize;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

pub const IPD_SCALE_KEY: &str = "hmd.ipdScale";
pub const MONO_PREVIEW_KEY: &str = "monoPreview";
pub const ENABLE_REPROJECTION_KEY: &str = "enableReprojection";
pub const VSYNC_KEY: &str = "vsyncEnabled";
pub const FULLSCREEN_KEY: &str = "fullscreen";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

/// Flat key-value settings, persisted as TOML.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Settings {
    values: BTreeMap<String, SettingValue>,
}

impl Settings {
    pub fn new() -> Settings {
        Settings::default()
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Settings, Error> {
        let text = fs::read_to_string(path.as_ref())?;
        let settings = Settings::parse(&text)?;
        debug!("Loaded {} settings from {}", settings.values.len(), path.as_ref().display());
        Ok(settings)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        fs::write(path.as_ref(), self.to_toml()?)?;
        Ok(())
    }

    pub fn parse(text: &str) -> Result<Settings, Error> {
        Ok(toml::from_str(text)?)
    }

    pub fn to_toml(&self) -> Result<String, Error> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn get(&self, key: &str) -> Option<&SettingValue> {
        self.values.get(key)
    }

    pub fn set(&mut self, key: &str, value: SettingValue) {
        self.values.insert(key.to_owned(), value);
    }

    pub fn remove(&mut self, key: &str) -> Option<SettingValue> {
        self.values.remove(key)
    }

    pub fn bool(&self, key: &str, default: bool) -> bool {
        match self.values.get(key) {
            Some(SettingValue::Bool(value)) => *value,
            Some(other) => {
                warn!("Setting {} is not a bool ({:?})", key, other);
                default
            },
            None => default,
        }
    }

    pub fn set_bool(&mut self, key: &str, value: bool) {
        self.set(key, SettingValue::Bool(value));
    }

    pub fn float(&self, key: &str, default: f32) -> f32 {
        match self.values.get(key) {
            Some(SettingValue::Float(value)) => *value as f32,
            Some(SettingValue::Int(value)) => *value as f32,
            Some(other) => {
                warn!("Setting {} is not a number ({:?})", key, other);
                default
            },
            None => default,
        }
    }

    pub fn set_float(&mut self, key: &str, value: f32) {
        self.set(key, SettingValue::Float(value as f64));
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn typed_getters_fall_back_to_default() {
        let mut settings = Settings::new();
        assert!(settings.bool(MONO_PREVIEW_KEY, true));
        settings.set_bool(MONO_PREVIEW_KEY, false);
        assert!(!settings.bool(MONO_PREVIEW_KEY, true));
        // Wrong type reads as the default
        assert_eq!(settings.float(MONO_PREVIEW_KEY, 2.5), 2.5);
    }

    #[test]
    fn integers_read_as_floats() {
        let settings = Settings::parse("\"hmd.ipdScale\" = 2\n").unwrap();
        assert_eq!(settings.float(IPD_SCALE_KEY, 1.0), 2.0);
    }

    #[test]
    fn persists_to_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("display.toml");

        let mut settings = Settings::new();
        settings.set_float(IPD_SCALE_KEY, 1.5);
        settings.set_bool(ENABLE_REPROJECTION_KEY, false);
        settings.save(&path).unwrap();

        let loaded = Settings::load(&path).unwrap();
        assert_eq!(loaded.float(IPD_SCALE_KEY, 1.0), 1.5);
        assert!(!loaded.bool(ENABLE_REPROJECTION_KEY, true));
        assert_eq!(loaded, settings);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempdir().unwrap();
        match Settings::load(dir.path().join("absent.toml")) {
            Err(Error::Io(_)) => {},
            other => panic!("unexpected {:?}", other),
        }
    }
}
