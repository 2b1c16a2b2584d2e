//! Trigger snippet generation.
//!
//! Renders a code sample showing how to fire a workflow: the template's
//! trigger identifier plus a payload with one placeholder per variable
//! token found in step content. Output is deterministic; variables are
//! sorted lexicographically.

use std::collections::BTreeMap;
use std::fmt;

use anyhow::{Context, Result};
use handlebars::Handlebars;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::SnippetConfig;
use crate::templates::schema::Template;
use crate::templates::variables::collect_variables;

const NODE_TEMPLATE: &str = r#"import { {{client}} } from '{{package}}';

const {{client_var}} = new {{client}}('{{api_key}}');

{{client_var}}.trigger('{{identifier}}', {
  to: {
    subscriberId: '{{placeholder}}'
  },
  payload: {
{{#each variables}}    {{this.key}}: '{{../placeholder}}'{{#unless @last}},{{/unless}}
{{/each}}  }
});
"#;

const CURL_TEMPLATE: &str = r#"curl --location --request POST '{{api_url}}/v1/events/trigger' \
     --header 'Authorization: ApiKey {{api_key}}' \
     --header 'Content-Type: application/json' \
     --data-raw '{{body}}'
"#;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnippetLanguage {
    #[default]
    Node,
    Curl,
}

impl SnippetLanguage {
    pub fn from_key(key: &str) -> Option<SnippetLanguage> {
        match key.to_lowercase().as_str() {
            "node" | "nodejs" | "js" => Some(SnippetLanguage::Node),
            "curl" => Some(SnippetLanguage::Curl),
            _ => None,
        }
    }
}

impl fmt::Display for SnippetLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnippetLanguage::Node => write!(f, "Node.js"),
            SnippetLanguage::Curl => write!(f, "cURL"),
        }
    }
}

/// A rendered trigger snippet
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TriggerSnippet {
    pub language: SnippetLanguage,
    pub identifier: String,
    pub variables: Vec<String>,
    pub code: String,
}

/// Renders trigger snippets for templates
pub struct SnippetGenerator {
    handlebars: Handlebars<'static>,
    options: SnippetConfig,
}

impl SnippetGenerator {
    pub fn new(options: SnippetConfig) -> Self {
        let mut handlebars = Handlebars::new();
        // Snippets are code, not HTML
        handlebars.register_escape_fn(handlebars::no_escape);
        handlebars.set_strict_mode(false);
        Self {
            handlebars,
            options,
        }
    }

    pub fn options(&self) -> &SnippetConfig {
        &self.options
    }

    /// Render with the configured default language
    pub fn render(&self, template: &Template) -> Result<TriggerSnippet> {
        self.render_as(template, self.options.language)
    }

    pub fn render_as(&self, template: &Template, language: SnippetLanguage) -> Result<TriggerSnippet> {
        let variables: Vec<String> = collect_variables(template).into_iter().collect();
        let identifier = template.trigger_identifier.clone();

        let code = match language {
            SnippetLanguage::Node => self.render_node(&identifier, &variables)?,
            SnippetLanguage::Curl => self.render_curl(&identifier, &variables)?,
        };

        Ok(TriggerSnippet {
            language,
            identifier,
            variables,
            code,
        })
    }

    fn render_node(&self, identifier: &str, variables: &[String]) -> Result<String> {
        let keys: Vec<_> = variables
            .iter()
            .map(|name| json!({ "key": object_key(name) }))
            .collect();

        let data = json!({
            "client": self.options.client,
            "client_var": self.options.client.to_lowercase(),
            "package": self.options.package,
            "api_key": self.options.api_key_placeholder,
            "identifier": identifier,
            "placeholder": self.options.data_placeholder,
            "variables": keys,
        });

        self.handlebars
            .render_template(NODE_TEMPLATE, &data)
            .context("Failed to render Node.js trigger snippet")
    }

    fn render_curl(&self, identifier: &str, variables: &[String]) -> Result<String> {
        let payload: BTreeMap<&str, &str> = variables
            .iter()
            .map(|name| (name.as_str(), self.options.data_placeholder.as_str()))
            .collect();
        let body = json!({
            "name": identifier,
            "to": { "subscriberId": self.options.data_placeholder },
            "payload": payload,
        });
        let body = serde_json::to_string_pretty(&body).context("Failed to encode trigger body")?;

        let data = json!({
            "api_url": self.options.api_url.trim_end_matches('/'),
            "api_key": self.options.api_key_placeholder,
            "body": body,
        });

        self.handlebars
            .render_template(CURL_TEMPLATE, &data)
            .context("Failed to render cURL trigger snippet")
    }
}

/// Bare identifier when valid in a JS object literal, quoted otherwise
fn object_key(name: &str) -> String {
    let mut chars = name.chars();
    let starts_ok = chars
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
        .unwrap_or(false);
    if starts_ok && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$') {
        name.to_string()
    } else {
        format!("'{}'", name)
    }
}
