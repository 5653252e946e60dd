//! Locale preferences used to pick display names.

use std::collections::BTreeMap;

use crate::error::GeoIp2Error;

/// Localized names keyed by locale code (e.g. `"en"`, `"zh-CN"`).
pub type Names = BTreeMap<String, String>;

/// An ordered, non-empty list of locale codes. The first locale with an
/// entry in a record's `names` supplies that record's `name`.
///
/// ```
/// use geoip2::{Locales, Names};
///
/// let locales = Locales::new(["ru", "zh-CN", "en"]).unwrap();
/// let mut names = Names::new();
/// names.insert("en".to_owned(), "United States".to_owned());
/// names.insert("zh-CN".to_owned(), "美国".to_owned());
/// assert_eq!(locales.resolve(&names), Some("美国"));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Locales(Vec<String>);

impl Locales {
    /// Builds a locale list, failing with [`GeoIp2Error::InvalidArgument`]
    /// if it is empty.
    pub fn new<I, S>(locales: I) -> Result<Self, GeoIp2Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let locales: Vec<String> = locales.into_iter().map(Into::into).collect();
        if locales.is_empty() {
            return Err(GeoIp2Error::invalid_argument(
                "the locale list must contain at least one locale",
            ));
        }
        Ok(Locales(locales))
    }

    /// Returns the name for the first locale present in `names`.
    #[must_use]
    pub fn resolve<'n>(&self, names: &'n Names) -> Option<&'n str> {
        self.0
            .iter()
            .find_map(|locale| names.get(locale))
            .map(String::as_str)
    }

    /// Iterates over the locales in preference order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl Default for Locales {
    fn default() -> Self {
        Locales(vec!["en".to_owned()])
    }
}
