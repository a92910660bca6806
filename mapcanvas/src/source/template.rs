//! URL template substitution with subdomain rotation.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use super::{SourceError, TileSource};
use crate::tile::TileId;

/// A tile source defined by a URL template.
///
/// The template contains `{x}` (column), `{y}` (row) and `{z}` (zoom)
/// placeholders, plus an optional `{s}` subdomain token. Subdomains are
/// selected by hashing the tile id, which spreads requests across hosts
/// without any shared rotation state on the hot path.
///
/// Validation happens once at construction; building a URL from a
/// validated template cannot fail.
#[derive(Debug, Clone)]
pub struct UrlTemplate {
    id: String,
    template: String,
    subdomains: Vec<String>,
}

impl UrlTemplate {
    /// Creates a source from an identifier and a URL template.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Template`] when a mandatory placeholder is
    /// missing, or when `{s}` appears without configured subdomains (use
    /// [`UrlTemplate::with_subdomains`]). Returns [`SourceError::Id`] for
    /// identifiers that are empty or unsafe as a path segment.
    pub fn new(id: impl Into<String>, template: impl Into<String>) -> Result<Self, SourceError> {
        let id = id.into();
        let template = template.into();

        // The id doubles as a cache path segment: dot-only ids ("." and
        // "..") would traverse out of the cache root.
        if id.is_empty()
            || id.chars().all(|c| c == '.')
            || id
                .chars()
                .any(|c| !(c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.'))
        {
            return Err(SourceError::Id(id));
        }

        for placeholder in ["{x}", "{y}", "{z}"] {
            if !template.contains(placeholder) {
                return Err(SourceError::Template(format!(
                    "missing {} placeholder in {:?}",
                    placeholder, template
                )));
            }
        }

        Ok(Self {
            id,
            template,
            subdomains: Vec::new(),
        })
    }

    /// Sets the subdomain list substituted for `{s}`.
    pub fn with_subdomains(mut self, subdomains: Vec<String>) -> Result<Self, SourceError> {
        if self.template.contains("{s}") && subdomains.is_empty() {
            return Err(SourceError::Template(
                "template uses {s} but no subdomains were provided".to_string(),
            ));
        }
        self.subdomains = subdomains;
        Ok(self)
    }

    /// Validates that `{s}` usage and the subdomain list agree.
    ///
    /// Called at activation so a `{s}` template without subdomains fails
    /// once, up front, instead of per tile.
    pub fn validate(&self) -> Result<(), SourceError> {
        if self.template.contains("{s}") && self.subdomains.is_empty() {
            return Err(SourceError::Template(
                "template uses {s} but no subdomains were provided".to_string(),
            ));
        }
        Ok(())
    }

    fn subdomain_for(&self, tile: &TileId) -> Option<&str> {
        if self.subdomains.is_empty() {
            return None;
        }
        let mut hasher = DefaultHasher::new();
        tile.hash(&mut hasher);
        let index = (hasher.finish() % self.subdomains.len() as u64) as usize;
        Some(&self.subdomains[index])
    }
}

impl TileSource for UrlTemplate {
    fn id(&self) -> &str {
        &self.id
    }

    fn url(&self, tile: &TileId) -> String {
        let mut url = self
            .template
            .replace("{x}", &tile.column.to_string())
            .replace("{y}", &tile.row.to_string())
            .replace("{z}", &tile.zoom.to_string());

        if let Some(subdomain) = self.subdomain_for(tile) {
            url = url.replace("{s}", subdomain);
        }

        url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_substitutes_coordinates() {
        let source = UrlTemplate::new("osm", "https://tile.example.org/{z}/{x}/{y}.png").unwrap();
        let url = source.url(&TileId::new(5, 10, 11));
        assert_eq!(url, "https://tile.example.org/5/10/11.png");
    }

    #[test]
    fn test_missing_placeholder_rejected() {
        let result = UrlTemplate::new("osm", "https://tile.example.org/{z}/{x}.png");
        assert!(matches!(result, Err(SourceError::Template(_))));
    }

    #[test]
    fn test_unsafe_id_rejected() {
        let result = UrlTemplate::new("../evil", "https://t.example.org/{z}/{x}/{y}.png");
        assert!(matches!(result, Err(SourceError::Id(_))));
        let result = UrlTemplate::new("", "https://t.example.org/{z}/{x}/{y}.png");
        assert!(matches!(result, Err(SourceError::Id(_))));
    }

    #[test]
    fn test_traversal_id_rejected() {
        // "." and ".." are valid characters but invalid path segments; as a
        // cache key prefix they would write outside the cache root.
        for id in [".", "..", "..."] {
            let result = UrlTemplate::new(id, "https://t.example.org/{z}/{x}/{y}.png");
            assert!(matches!(result, Err(SourceError::Id(_))), "id {:?}", id);
        }
        // Dots inside a normal id stay legal.
        assert!(UrlTemplate::new("tiles.v2", "https://t.example.org/{z}/{x}/{y}.png").is_ok());
    }

    #[test]
    fn test_subdomain_substitution_is_deterministic() {
        let source = UrlTemplate::new("osm", "https://{s}.example.org/{z}/{x}/{y}.png")
            .unwrap()
            .with_subdomains(vec!["a".into(), "b".into(), "c".into()])
            .unwrap();

        let tile = TileId::new(10, 300, 400);
        assert_eq!(source.url(&tile), source.url(&tile));
        assert!(!source.url(&tile).contains("{s}"));
    }

    #[test]
    fn test_subdomains_spread_across_tiles() {
        let source = UrlTemplate::new("osm", "https://{s}.example.org/{z}/{x}/{y}.png")
            .unwrap()
            .with_subdomains(vec!["a".into(), "b".into(), "c".into()])
            .unwrap();

        let mut seen = HashSet::new();
        for column in 0..64 {
            for row in 0..4 {
                let url = source.url(&TileId::new(10, column, row));
                let host_start = "https://".len();
                seen.insert(url[host_start..host_start + 1].to_string());
            }
        }
        // With 256 tiles all three subdomains should show up.
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn test_subdomain_template_without_subdomains_fails_validation() {
        let source = UrlTemplate::new("osm", "https://{s}.example.org/{z}/{x}/{y}.png").unwrap();
        assert!(source.validate().is_err());
    }
}
