use std::collections::BTreeMap;

use serde_json::Value;

/// Candidate title fields, in priority order, used for content types without
/// an explicit mapping.
///
/// `headline` is listed because editorial content types often carry no
/// `title`. An entry whose only title-like field is `headline` therefore gets
/// a fresh title on populate; set `title_fields` in the config without
/// `headline` to keep the node's previous title instead.
pub const DEFAULT_TITLE_FIELDS: &[&str] = &["title", "name", "label", "headline", "subject"];

/// Chooses the display title of an entry record.
///
/// Entries of arbitrary content types have no fixed title attribute, so the
/// first candidate field holding a string wins. A content type can carry its
/// own candidate list, which then replaces the default list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleFields {
    defaults: Vec<String>,
    overrides: BTreeMap<String, Vec<String>>,
}

impl Default for TitleFields {
    fn default() -> Self {
        Self::new(DEFAULT_TITLE_FIELDS.iter().map(|s| s.to_string()).collect())
    }
}

impl TitleFields {
    pub fn new(defaults: Vec<String>) -> Self {
        Self {
            defaults,
            overrides: BTreeMap::new(),
        }
    }

    /// Sets the candidate list for one content type.
    pub fn with_override(mut self, content_type: impl Into<String>, fields: Vec<String>) -> Self {
        self.overrides.insert(content_type.into(), fields);
        self
    }

    /// The candidate list that applies to `content_type`.
    pub fn candidates(&self, content_type: &str) -> &[String] {
        self.overrides
            .get(content_type)
            .unwrap_or(&self.defaults)
            .as_slice()
    }

    /// Returns the value of the first candidate field of `record` that is a string.
    pub fn select(&self, content_type: &str, record: &Value) -> Option<String> {
        self.candidates(content_type)
            .iter()
            .find_map(|field| record.get(field).and_then(Value::as_str))
            .map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_priority_order() {
        let titles = TitleFields::default();
        let record = json!({"subject": "S", "name": "N", "label": "L"});
        assert_eq!(titles.select("api::post.post", &record), Some("N".to_string()));
    }

    #[test]
    fn test_non_string_candidates_are_skipped() {
        let titles = TitleFields::default();
        let record = json!({"title": 42, "name": null, "headline": "H"});
        assert_eq!(titles.select("api::post.post", &record), Some("H".to_string()));
    }

    #[test]
    fn test_headline_is_a_default_candidate() {
        let record = json!({"headline": "Breaking", "slug": "breaking"});
        assert_eq!(
            TitleFields::default().select("api::article.article", &record),
            Some("Breaking".to_string())
        );

        let without = TitleFields::new(vec!["title".to_string(), "name".to_string()]);
        assert_eq!(without.select("api::article.article", &record), None);
    }

    #[test]
    fn test_no_candidate_yields_none() {
        let titles = TitleFields::default();
        assert_eq!(titles.select("api::post.post", &json!({"slug": "x"})), None);
    }

    #[test]
    fn test_override_replaces_defaults() {
        let titles = TitleFields::default()
            .with_override("api::product.product", vec!["sku".to_string()]);
        let record = json!({"title": "T", "sku": "SKU-1"});
        assert_eq!(
            titles.select("api::product.product", &record),
            Some("SKU-1".to_string())
        );
        assert_eq!(titles.select("api::post.post", &record), Some("T".to_string()));
    }
}
