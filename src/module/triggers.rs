//! Declarative entry-point triggers
//!
//! Markup can name entry points through an attribute on any element, e.g.
//! `<div data-hr-run="page.home">`. At bootstrap every value found is run
//! as a named entry point, in document order.

use regex::Regex;

use crate::config::TriggerConfig;
use crate::module::traits::ModuleError;

/// Finds trigger attribute values in markup text
///
/// Only attributes of start tags count. Comments are skipped, and text
/// inside another attribute's quoted value is never read as an attribute.
#[derive(Debug, Clone)]
pub struct TriggerScanner {
    attribute: String,
    comments: Regex,
    tags: Regex,
    attributes: Regex,
}

const COMMENT_PATTERN: &str = r"(?s)<!--.*?-->";
const TAG_PATTERN: &str = r#"<[A-Za-z][^\s/>]*((?:[^>"']|"[^"]*"|'[^']*')*)>"#;
const ATTRIBUTE_PATTERN: &str =
    r#"\s([^\s"'>/=]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#;

fn compile(pattern: &str) -> Result<Regex, ModuleError> {
    Regex::new(pattern)
        .map_err(|e| ModuleError::InvalidConfig(format!("invalid trigger pattern: {}", e)))
}

impl TriggerScanner {
    pub fn new(attribute: &str) -> Result<Self, ModuleError> {
        if attribute.is_empty() {
            return Err(ModuleError::InvalidConfig(
                "trigger attribute cannot be empty".to_string(),
            ));
        }

        Ok(Self {
            attribute: attribute.to_string(),
            comments: compile(COMMENT_PATTERN)?,
            tags: compile(TAG_PATTERN)?,
            attributes: compile(ATTRIBUTE_PATTERN)?,
        })
    }

    pub fn from_config(config: &TriggerConfig) -> Result<Self, ModuleError> {
        Self::new(&config.attribute)
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    /// Every non-empty trigger value, in document order, duplicates included
    ///
    /// Attribute names match case-insensitively. Raw text elements such as
    /// `<script>` are not special-cased.
    pub fn scan(&self, markup: &str) -> Vec<String> {
        let markup = self.comments.replace_all(markup, " ");
        let mut names = Vec::new();
        for tag in self.tags.captures_iter(&markup) {
            let Some(body) = tag.get(1) else {
                continue;
            };
            for attr in self.attributes.captures_iter(body.as_str()) {
                if !attr[1].eq_ignore_ascii_case(&self.attribute) {
                    continue;
                }
                let value = attr
                    .get(2)
                    .or_else(|| attr.get(3))
                    .or_else(|| attr.get(4))
                    .map(|value| value.as_str().trim())
                    .unwrap_or_default();
                if !value.is_empty() {
                    names.push(value.to_string());
                }
            }
        }
        names
    }
}

impl Default for TriggerScanner {
    fn default() -> Self {
        Self::new(&TriggerConfig::default().attribute).expect("default trigger attribute is valid")
    }
}
