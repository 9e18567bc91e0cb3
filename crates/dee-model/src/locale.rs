use std::fmt;

/// A locale in `lang_COUNTRY.ENCODING@MODIFIER` form; everything but `lang` is optional.
///
/// The encoding is kept for display but ignored when matching localized keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locale {
    pub lang: String,
    pub country: Option<String>,
    pub encoding: Option<String>,
    pub modifier: Option<String>,
}

impl Locale {
    pub fn parse(input: &str) -> Self {
        let (rest, modifier) = split_off(input, '@');
        let (rest, encoding) = split_off(rest, '.');
        let (lang, country) = match rest.split_once('_') {
            Some((lang, country)) => (lang, Some(country.to_string())),
            None => (rest, None),
        };
        Self {
            lang: lang.to_string(),
            country,
            encoding,
            modifier,
        }
    }

    /// Reads `LC_ALL`, `LC_MESSAGES` then `LANG`, ignoring the `C`/`POSIX` locales.
    pub fn from_env() -> Option<Self> {
        ["LC_ALL", "LC_MESSAGES", "LANG"]
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .find(|v| !v.is_empty())
            .filter(|v| v != "C" && v != "POSIX" && !v.starts_with("C."))
            .map(|v| Self::parse(&v))
    }

    /// Suffixes to try, most specific first, as the Desktop Entry Specification orders them.
    pub fn candidates(&self) -> Vec<String> {
        let mut out = Vec::with_capacity(4);
        if let (Some(country), Some(modifier)) = (&self.country, &self.modifier) {
            out.push(format!("{}_{country}@{modifier}", self.lang));
        }
        if let Some(country) = &self.country {
            out.push(format!("{}_{country}", self.lang));
        }
        if let Some(modifier) = &self.modifier {
            out.push(format!("{}@{modifier}", self.lang));
        }
        out.push(self.lang.clone());
        out
    }
}

fn split_off(input: &str, sep: char) -> (&str, Option<String>) {
    match input.rsplit_once(sep) {
        Some((head, tail)) => (head, Some(tail.to_string())),
        None => (input, None),
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.lang)?;
        if let Some(country) = &self.country {
            write!(f, "_{country}")?;
        }
        if let Some(encoding) = &self.encoding {
            write!(f, ".{encoding}")?;
        }
        if let Some(modifier) = &self.modifier {
            write!(f, "@{modifier}")?;
        }
        Ok(())
    }
}

/// Splits `Name[fr_FR]` into `("Name", Some("fr_FR"))`.
pub fn split_locale(key: &str) -> (&str, Option<&str>) {
    match key.strip_suffix(']').and_then(|k| k.split_once('[')) {
        Some((base, locale)) => (base, Some(locale)),
        None => (key, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_components() {
        let locale = Locale::parse("sr_YU.UTF-8@Latn");
        assert_eq!(locale.lang, "sr");
        assert_eq!(locale.country.as_deref(), Some("YU"));
        assert_eq!(locale.encoding.as_deref(), Some("UTF-8"));
        assert_eq!(locale.modifier.as_deref(), Some("Latn"));
        assert_eq!(locale.to_string(), "sr_YU.UTF-8@Latn");
    }

    #[test]
    fn candidate_order_drops_encoding() {
        let locale = Locale::parse("sr_YU.UTF-8@Latn");
        assert_eq!(
            locale.candidates(),
            ["sr_YU@Latn", "sr_YU", "sr@Latn", "sr"]
        );
        assert_eq!(Locale::parse("fr").candidates(), ["fr"]);
    }

    #[test]
    fn splits_locale_suffix() {
        assert_eq!(split_locale("Name[de_DE]"), ("Name", Some("de_DE")));
        assert_eq!(split_locale("Name"), ("Name", None));
        assert_eq!(split_locale("Name[de"), ("Name[de", None));
    }
}
