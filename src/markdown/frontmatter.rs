//! YAML front matter parsing and deterministic rendering.
//!
//! The file format is:
//!
//! ```text
//! ---
//! id: my-doc
//! category: howto
//! ...
//! ---
//!
//! body, verbatim
//! ```
//!
//! Rendering emits keys in a fixed order so re-exporting an unchanged
//! document produces byte-identical output.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use serde_yaml::{Mapping, Value as Yaml};

use crate::kb::types::Document;

/// Parsed front matter fields. All optional at parse time; the importer
/// decides what is required.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FrontMatter {
    pub id: Option<String>,
    pub category: Option<String>,
    pub title: Option<String>,
    pub tags: Vec<String>,
    pub created: Option<String>,
    pub updated: Option<String>,
    pub metadata: Option<serde_yaml::Value>,
}

impl FrontMatter {
    /// Front matter metadata as a JSON object. Missing or non-mapping
    /// metadata becomes an empty object.
    pub fn metadata_json(&self) -> serde_json::Value {
        self.metadata
            .as_ref()
            .and_then(|y| serde_json::to_value(y).ok())
            .filter(|v| v.is_object())
            .unwrap_or_else(|| serde_json::json!({}))
    }
}

/// Split a markdown file into front matter and verbatim body.
pub fn parse(text: &str) -> Result<(FrontMatter, String)> {
    let rest = text
        .strip_prefix("---\n")
        .context("missing front matter: file does not start with ---")?;

    let Some(end) = rest.find("\n---\n") else {
        bail!("missing front matter: no closing --- delimiter");
    };

    let yaml = &rest[..end + 1];
    let front: FrontMatter =
        serde_yaml::from_str(yaml).context("malformed YAML front matter")?;

    // The renderer puts one blank line between the delimiter and the body;
    // strip exactly that much so the body round-trips verbatim.
    let mut body = &rest[end + "\n---\n".len()..];
    body = body.strip_prefix('\n').unwrap_or(body);

    Ok((front, body.to_string()))
}

/// Render a document to markdown with deterministic front matter.
///
/// Key order is fixed (id, category, title, tags, created, updated,
/// metadata); metadata is omitted when empty.
pub fn render(doc: &Document) -> Result<String> {
    let mut map = Mapping::new();
    map.insert(Yaml::from("id"), Yaml::from(doc.id.as_str()));
    map.insert(Yaml::from("category"), Yaml::from(doc.category.as_str()));
    map.insert(Yaml::from("title"), Yaml::from(doc.title.as_str()));
    map.insert(
        Yaml::from("tags"),
        Yaml::Sequence(doc.tags.iter().map(|t| Yaml::from(t.as_str())).collect()),
    );
    map.insert(Yaml::from("created"), Yaml::from(doc.created.as_str()));
    map.insert(Yaml::from("updated"), Yaml::from(doc.updated.as_str()));

    let has_metadata = doc
        .metadata
        .as_object()
        .is_some_and(|m| !m.is_empty());
    if has_metadata {
        let metadata: Yaml =
            serde_yaml::to_value(&doc.metadata).context("metadata not representable as YAML")?;
        map.insert(Yaml::from("metadata"), metadata);
    }

    let yaml = serde_yaml::to_string(&map).context("failed to render front matter")?;
    Ok(format!("---\n{yaml}---\n\n{}", doc.content))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> Document {
        Document {
            id: "deploy-staging".to_string(),
            category: "howto".to_string(),
            title: "Deploy the staging stack".to_string(),
            tags: vec!["deploy".to_string(), "staging".to_string()],
            content: "Run the pipeline.\n\nThen verify.".to_string(),
            metadata: serde_json::json!({}),
            has_embedding: false,
            created: "2026-01-01T00:00:00.000000Z".to_string(),
            updated: "2026-01-02T00:00:00.000000Z".to_string(),
        }
    }

    #[test]
    fn render_parse_round_trip() {
        let d = doc();
        let text = render(&d).unwrap();
        let (front, body) = parse(&text).unwrap();

        assert_eq!(front.id.as_deref(), Some("deploy-staging"));
        assert_eq!(front.category.as_deref(), Some("howto"));
        assert_eq!(front.title.as_deref(), Some("Deploy the staging stack"));
        assert_eq!(front.tags, vec!["deploy", "staging"]);
        assert_eq!(front.created.as_deref(), Some("2026-01-01T00:00:00.000000Z"));
        assert_eq!(front.updated.as_deref(), Some("2026-01-02T00:00:00.000000Z"));
        assert_eq!(body, d.content);
    }

    #[test]
    fn render_is_deterministic() {
        let d = doc();
        assert_eq!(render(&d).unwrap(), render(&d).unwrap());
    }

    #[test]
    fn empty_metadata_is_omitted() {
        let text = render(&doc()).unwrap();
        assert!(!text.contains("metadata:"));
    }

    #[test]
    fn metadata_survives_round_trip() {
        let mut d = doc();
        d.metadata = serde_json::json!({"source": "wiki", "priority": 2});
        let text = render(&d).unwrap();
        let (front, _) = parse(&text).unwrap();
        assert_eq!(front.metadata_json(), d.metadata);
    }

    #[test]
    fn body_with_yaml_like_lines_survives() {
        let mut d = doc();
        d.content = "intro\n\n---\n\nkey: value after a rule".to_string();
        let text = render(&d).unwrap();
        let (_, body) = parse(&text).unwrap();
        assert_eq!(body, d.content);
    }

    #[test]
    fn missing_front_matter_is_an_error() {
        assert!(parse("no front matter here").is_err());
        assert!(parse("---\nid: x\nnever closed").is_err());
    }
}
