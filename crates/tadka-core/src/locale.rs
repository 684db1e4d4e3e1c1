//! Locale tables: key to message lookup over bundled TOML string tables.
//!
//! Lookup never fails: a key missing from (or empty in) the active table
//! resolves to the key itself. Tables are passed explicitly through a
//! [`Translator`] instead of an ambient provider.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

const EN_TABLE: &str = include_str!("../locales/en.toml");
const HI_TABLE: &str = include_str!("../locales/hi.toml");

/// Supported locales, in toggle order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Hi,
}

impl Locale {
    pub const SUPPORTED: [Locale; 2] = [Locale::En, Locale::Hi];

    pub fn code(self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Hi => "hi",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        let code = code.trim();
        Self::SUPPORTED
            .into_iter()
            .find(|l| l.code().eq_ignore_ascii_case(code))
    }

    /// Next locale in the fixed cycle. Pure; the caller persists the choice.
    pub fn toggle(self) -> Self {
        let idx = Self::SUPPORTED
            .iter()
            .position(|l| *l == self)
            .unwrap_or(0);
        Self::SUPPORTED[(idx + 1) % Self::SUPPORTED.len()]
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// `toggle(current) -> next`.
pub fn toggle(current: Locale) -> Locale {
    current.toggle()
}

type Table = HashMap<String, String>;

static BUNDLED: Lazy<Arc<LocaleTables>> = Lazy::new(|| {
    let mut tables = LocaleTables::empty();
    for (locale, src) in [(Locale::En, EN_TABLE), (Locale::Hi, HI_TABLE)] {
        if let Err(e) = tables.load_toml(locale, src) {
            // Lookups still succeed by falling back to keys.
            warn!("Bundled {} table failed to parse: {}", locale, e);
        }
    }
    Arc::new(tables)
});

/// Message tables for every supported locale.
#[derive(Debug, Clone, Default)]
pub struct LocaleTables {
    tables: HashMap<Locale, Table>,
}

impl LocaleTables {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Shared copy of the tables compiled into the crate.
    pub fn bundled() -> Arc<LocaleTables> {
        Arc::clone(&BUNDLED)
    }

    /// Replace `locale`'s table with the flat `key = "message"` TOML in `src`.
    pub fn load_toml(&mut self, locale: Locale, src: &str) -> Result<(), toml::de::Error> {
        let table: Table = toml::from_str(src)?;
        debug!("Loaded {} messages for {}", table.len(), locale);
        self.tables.insert(locale, table);
        Ok(())
    }

    pub fn insert(&mut self, locale: Locale, key: impl Into<String>, message: impl Into<String>) {
        self.tables
            .entry(locale)
            .or_default()
            .insert(key.into(), message.into());
    }

    /// Message for `key` in `locale`, or `key` itself.
    pub fn resolve<'a>(&'a self, locale: Locale, key: &'a str) -> &'a str {
        self.tables
            .get(&locale)
            .and_then(|t| t.get(key))
            .map(String::as_str)
            .filter(|m| !m.is_empty())
            .unwrap_or(key)
    }

    /// Keys of the default locale that `locale` does not translate.
    pub fn missing_keys(&self, locale: Locale) -> Vec<&str> {
        let Some(reference) = self.tables.get(&Locale::default()) else {
            return Vec::new();
        };
        let target = self.tables.get(&locale);
        let mut missing: Vec<&str> = reference
            .keys()
            .filter(|k| {
                target
                    .and_then(|t| t.get(k.as_str()))
                    .map_or(true, |m| m.is_empty())
            })
            .map(String::as_str)
            .collect();
        missing.sort_unstable();
        missing
    }
}

/// Current locale plus the tables, handed to whatever needs to render text.
#[derive(Debug, Clone)]
pub struct Translator {
    locale: Locale,
    tables: Arc<LocaleTables>,
}

impl Translator {
    pub fn new(locale: Locale, tables: Arc<LocaleTables>) -> Self {
        Self { locale, tables }
    }

    /// Translator over the bundled tables.
    pub fn bundled(locale: Locale) -> Self {
        Self::new(locale, LocaleTables::bundled())
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    pub fn set_locale(&mut self, locale: Locale) {
        self.locale = locale;
    }

    /// Switch to the next locale and return it.
    pub fn toggle(&mut self) -> Locale {
        self.locale = self.locale.toggle();
        self.locale
    }

    pub fn t<'a>(&'a self, key: &'a str) -> &'a str {
        self.tables.resolve(self.locale, key)
    }

    /// Choose between an English and a Hindi variant of record text.
    pub fn pick<'a>(&self, en: &'a str, hi: &'a str) -> &'a str {
        match self.locale {
            Locale::En => en,
            Locale::Hi if hi.is_empty() => en,
            Locale::Hi => hi,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_bundled_messages() {
        let tables = LocaleTables::bundled();
        assert_eq!(tables.resolve(Locale::En, "favorites"), "Favorites");
        assert_eq!(tables.resolve(Locale::Hi, "favorites"), "पसंदीदा");
    }

    #[test]
    fn missing_key_resolves_to_itself() {
        let tables = LocaleTables::bundled();
        for locale in Locale::SUPPORTED {
            assert_eq!(tables.resolve(locale, "noSuchKey"), "noSuchKey");
        }
    }

    #[test]
    fn empty_message_falls_back_to_key() {
        let mut tables = LocaleTables::empty();
        tables.insert(Locale::Hi, "home", "");
        assert_eq!(tables.resolve(Locale::Hi, "home"), "home");
    }

    #[test]
    fn unknown_locale_table_falls_back_to_key() {
        let tables = LocaleTables::empty();
        assert_eq!(tables.resolve(Locale::Hi, "home"), "home");
    }

    #[test]
    fn bundled_hindi_covers_every_english_key() {
        let tables = LocaleTables::bundled();
        assert!(tables.missing_keys(Locale::Hi).is_empty());
    }

    #[test]
    fn toggle_twice_returns_to_start() {
        for locale in Locale::SUPPORTED {
            assert_eq!(toggle(toggle(locale)), locale);
        }
        assert_eq!(toggle(Locale::En), Locale::Hi);
    }

    #[test]
    fn from_code_is_case_insensitive() {
        assert_eq!(Locale::from_code("HI"), Some(Locale::Hi));
        assert_eq!(Locale::from_code(" en "), Some(Locale::En));
        assert_eq!(Locale::from_code("fr"), None);
    }

    #[test]
    fn translator_follows_toggle() {
        let mut t = Translator::bundled(Locale::En);
        assert_eq!(t.t("close"), "Close");
        assert_eq!(t.toggle(), Locale::Hi);
        assert_eq!(t.t("close"), "बंद करें");
        assert_eq!(t.pick("Butter Chicken", ""), "Butter Chicken");
    }
}
