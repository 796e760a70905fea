//! Document identifiers (DOIs) and identifier lists.

use std::fmt;

/// Prefixes people paste along with a DOI.
const STRIP_PREFIXES: &[&str] = &[
    "https://doi.org/",
    "http://doi.org/",
    "https://dx.doi.org/",
    "http://dx.doi.org/",
    "doi:",
];

/// An opaque identifier used to build the canonical resolution URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier(String);

impl Identifier {
    /// Parse a raw input token. Returns `None` for blanks and comments.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut s = raw.trim();
        if s.is_empty() || s.starts_with('#') {
            return None;
        }
        for prefix in STRIP_PREFIXES {
            if s.get(..prefix.len())
                .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
            {
                s = s[prefix.len()..].trim();
                break;
            }
        }
        if s.is_empty() {
            None
        } else {
            Some(Self(s.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `<resolver_base>/<identifier>`, e.g. `https://doi.org/10.1111/pce.14906`.
    pub fn resolver_url(&self, resolver_base: &str) -> String {
        format!("{}/{}", resolver_base.trim_end_matches('/'), self.0)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parse one identifier per line, skipping blanks and `#` comments.
pub fn parse_identifier_list(text: &str) -> Vec<Identifier> {
    text.lines().filter_map(Identifier::parse).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_strips_resolver_prefix() {
        let id = Identifier::parse("  https://doi.org/10.1038/s41477-023-01387-z ").unwrap();
        assert_eq!(id.as_str(), "10.1038/s41477-023-01387-z");
        let id = Identifier::parse("DOI:10.1093/plphys/kiab489").unwrap();
        assert_eq!(id.as_str(), "10.1093/plphys/kiab489");
    }

    #[test]
    fn test_resolver_url() {
        let id = Identifier::parse("10.1111/pce.14906").unwrap();
        assert_eq!(
            id.resolver_url("https://doi.org/"),
            "https://doi.org/10.1111/pce.14906"
        );
    }

    #[test]
    fn test_list_skips_comments_and_blanks() {
        let ids = parse_identifier_list(
            "# plant papers\n10.3389/fpls.2024.1274013\n\n   \n10.1186/s13059-023-02908-x\n",
        );
        let ids: Vec<&str> = ids.iter().map(|i| i.as_str()).collect();
        assert_eq!(
            ids,
            vec!["10.3389/fpls.2024.1274013", "10.1186/s13059-023-02908-x"]
        );
    }
}
