//! Embedded message bundles.
//!
//! Strings live in `resources/messages_*.properties` and are compiled
//! into the binary. Lookup order is the active locale, then English,
//! then the key itself so a missing translation never blanks a label.

use std::collections::HashMap;

use once_cell::sync::Lazy;

pub const DEFAULT_LOCALE: &str = "zh_CN";

static EN_US: Lazy<HashMap<String, String>> =
    Lazy::new(|| parse_bundle(include_str!("../resources/messages_en_US.properties")));
static ZH_CN: Lazy<HashMap<String, String>> =
    Lazy::new(|| parse_bundle(include_str!("../resources/messages_zh_CN.properties")));

fn parse_bundle(raw: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in raw.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            map.insert(key.trim().to_string(), value.trim().to_string());
        }
    }
    map
}

fn bundle_for(locale: &str) -> Option<&'static HashMap<String, String>> {
    match locale {
        "zh_CN" => Some(&ZH_CN),
        "en_US" => Some(&EN_US),
        _ => None,
    }
}

#[derive(Debug, Clone)]
pub struct Translator {
    locale: String,
}

impl Translator {
    pub fn new(locale: &str) -> Self {
        let locale = locale.trim();
        let locale = if locale.is_empty() {
            DEFAULT_LOCALE
        } else {
            locale
        };
        Self {
            locale: locale.to_string(),
        }
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    /// Returns true when the locale actually changed.
    pub fn set_locale(&mut self, locale: &str) -> bool {
        let locale = locale.trim();
        if locale.is_empty() || locale == self.locale {
            return false;
        }
        self.locale = locale.to_string();
        true
    }

    fn lookup<'a>(&self, key: &'a str) -> &'a str {
        if let Some(bundle) = bundle_for(&self.locale) {
            if let Some(value) = bundle.get(key) {
                if !value.is_empty() {
                    return value;
                }
            }
        }
        match EN_US.get(key) {
            Some(value) => value,
            None => key,
        }
    }

    pub fn tr(&self, key: &str) -> String {
        self.lookup(key).to_string()
    }

    /// Substitutes `{0}`, `{1}`, ... with the given arguments.
    pub fn format(&self, key: &str, args: &[&str]) -> String {
        let mut text = self.lookup(key).to_string();
        for (index, arg) in args.iter().enumerate() {
            text = text.replace(&format!("{{{index}}}"), arg);
        }
        text
    }
}

impl Default for Translator {
    fn default() -> Self {
        Self::new(DEFAULT_LOCALE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_chinese() {
        let i18n = Translator::new("");
        assert_eq!(i18n.locale(), "zh_CN");
        assert_eq!(i18n.tr("button.select_region"), "选择区域");
    }

    #[test]
    fn english_bundle_resolves() {
        let i18n = Translator::new("en_US");
        assert_eq!(i18n.tr("button.select_region"), "Select Region");
        assert_eq!(i18n.tr("status.done"), "Done");
    }

    #[test]
    fn unknown_locale_falls_back_to_english() {
        let i18n = Translator::new("fr_FR");
        assert_eq!(i18n.tr("status.done"), "Done");
    }

    #[test]
    fn missing_key_comes_back_verbatim() {
        let i18n = Translator::new("zh_CN");
        assert_eq!(i18n.tr("no.such.key"), "no.such.key");
    }

    #[test]
    fn format_substitutes_positionally() {
        let i18n = Translator::new("en_US");
        assert_eq!(
            i18n.format("status.region", &["(10, 20, 300, 200)"]),
            "Region: (10, 20, 300, 200)"
        );
        assert_eq!(
            i18n.format("label.detected_displays", &["3"]),
            "Detected displays: 3"
        );
    }

    #[test]
    fn set_locale_ignores_blank_and_same() {
        let mut i18n = Translator::new("zh_CN");
        assert!(!i18n.set_locale("   "));
        assert!(!i18n.set_locale("zh_CN"));
        assert!(i18n.set_locale("en_US"));
        assert_eq!(i18n.tr("status.done"), "Done");
    }

    #[test]
    fn parse_bundle_trims_and_keeps_later_equals() {
        let map = parse_bundle("# comment\n\n a = b \nurl=http://host?x=1\nempty=\n");
        assert_eq!(map.get("a").map(String::as_str), Some("b"));
        assert_eq!(map.get("url").map(String::as_str), Some("http://host?x=1"));
        assert_eq!(map.get("empty").map(String::as_str), Some(""));
    }

    #[test]
    fn bundles_cover_the_same_keys() {
        for key in ZH_CN.keys() {
            assert!(EN_US.contains_key(key), "missing en_US string for {key}");
        }
        for key in EN_US.keys() {
            assert!(ZH_CN.contains_key(key), "missing zh_CN string for {key}");
        }
    }
}
