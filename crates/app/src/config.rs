//! Key=value configuration with environment overrides.
//!
//! Settings load once at startup from `app.properties` next to the
//! executable's working directory. A process environment variable with
//! the same name and a non-blank value always wins over the file, so
//! single runs can be reconfigured without editing anything.

use std::collections::HashMap;
use std::path::Path;

pub const CONFIG_FILE: &str = "app.properties";

#[derive(Debug, Clone, Default)]
pub struct Config {
    values: HashMap<String, String>,
}

impl Config {
    /// Loads `app.properties` from the working directory. A missing
    /// file is not an error; every lookup then falls back to its
    /// default.
    pub fn load_default() -> Self {
        Self::load(Path::new(CONFIG_FILE))
    }

    pub fn load(path: &Path) -> Self {
        let mut values = HashMap::new();
        match dotenvy::from_path_iter(path) {
            Ok(entries) => {
                for entry in entries {
                    match entry {
                        Ok((key, value)) => {
                            values.insert(key, value);
                        }
                        Err(err) => {
                            log::warn!("skipping bad line in {}: {err}", path.display());
                        }
                    }
                }
                log::info!("loaded {} settings from {}", values.len(), path.display());
            }
            Err(err) => {
                log::debug!("no config file at {}: {err}", path.display());
            }
        }
        Self { values }
    }

    #[cfg(test)]
    pub(crate) fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        Self {
            values: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    /// Raw lookup. Environment first when non-blank, then the file.
    pub fn get(&self, key: &str) -> Option<String> {
        if let Ok(value) = std::env::var(key) {
            if !value.trim().is_empty() {
                return Some(value);
            }
        }
        self.values.get(key).cloned()
    }

    pub fn get_or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    /// Integer lookup; unparsable values fall back to the default.
    pub fn get_int(&self, key: &str, default: i64) -> i64 {
        match self.get(key) {
            Some(value) => value.trim().parse().unwrap_or(default),
            None => default,
        }
    }

    /// Boolean lookup. A present value is truthy only for
    /// 1/true/yes/y/on; anything else present reads as false.
    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.get(key) {
            Some(value) => matches!(
                value.trim().to_lowercase().as_str(),
                "1" | "true" | "yes" | "y" | "on"
            ),
            None => default,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn write_config(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "spyglass-config-{name}-{}.properties",
            std::process::id()
        ));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn reads_keys_and_skips_comments() {
        let path = write_config(
            "basic",
            "# answers backend\nBACKEND_URL=http://127.0.0.1:9000\n\nAPP_LOCALE=en_US\n",
        );
        let config = Config::load(&path);
        assert_eq!(
            config.get("BACKEND_URL").as_deref(),
            Some("http://127.0.0.1:9000")
        );
        assert_eq!(config.get_or("APP_LOCALE", "zh_CN"), "en_US");
        assert_eq!(config.get("PERISCOPE_DISPLAY_ID"), None);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn missing_file_yields_defaults() {
        let config = Config::load(Path::new("/nonexistent/spyglass.properties"));
        assert_eq!(config.get_or("BACKEND_URL", "http://localhost:8080"), "http://localhost:8080");
        assert_eq!(config.get_int("PERISCOPE_REFRESH_MS", 120), 120);
        assert!(config.get_bool("OVERLAY_EXCLUDE_FROM_CAPTURE", true));
    }

    #[test]
    fn environment_overrides_the_file() {
        let config = Config::from_pairs(&[("SPYGLASS_TEST_OVERRIDE", "from-file")]);
        std::env::set_var("SPYGLASS_TEST_OVERRIDE", "from-env");
        assert_eq!(config.get_or("SPYGLASS_TEST_OVERRIDE", ""), "from-env");
        std::env::remove_var("SPYGLASS_TEST_OVERRIDE");
        assert_eq!(config.get_or("SPYGLASS_TEST_OVERRIDE", ""), "from-file");
    }

    #[test]
    fn blank_environment_values_are_ignored() {
        let config = Config::from_pairs(&[("SPYGLASS_TEST_BLANK", "kept")]);
        std::env::set_var("SPYGLASS_TEST_BLANK", "   ");
        assert_eq!(config.get_or("SPYGLASS_TEST_BLANK", ""), "kept");
        std::env::remove_var("SPYGLASS_TEST_BLANK");
    }

    #[test]
    fn int_parsing_falls_back_on_garbage() {
        let config = Config::from_pairs(&[
            ("GOOD", " 250 "),
            ("BAD", "soon"),
            ("NEGATIVE", "-5"),
        ]);
        assert_eq!(config.get_int("GOOD", 120), 250);
        assert_eq!(config.get_int("BAD", 120), 120);
        assert_eq!(config.get_int("NEGATIVE", 120), -5);
        assert_eq!(config.get_int("ABSENT", 360), 360);
    }

    #[test]
    fn bool_accepts_the_truthy_spellings_only() {
        for truthy in ["1", "true", "YES", " y ", "On"] {
            let config = Config::from_pairs(&[("FLAG", truthy)]);
            assert!(config.get_bool("FLAG", false), "{truthy:?} should be true");
        }
        for falsy in ["0", "false", "off", "no", "2", ""] {
            let config = Config::from_pairs(&[("FLAG", falsy)]);
            assert!(!config.get_bool("FLAG", true), "{falsy:?} should be false");
        }
        assert!(Config::default().get_bool("FLAG", true));
    }
}
