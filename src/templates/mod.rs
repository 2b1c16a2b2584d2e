//! Notification workflow templates.
//!
//! A [`Template`] is the aggregate the editor works on: template-level
//! settings live here, the ordered step list is managed through the store
//! operations in [`store`], and [`variables`] scans step content for
//! `{{name}}` tokens.

pub mod schema;
pub mod store;
pub mod variables;

use chrono::Utc;

pub use schema::{
    BlockKind, BlockStyles, EmailBlock, EmailContent, EmailEditorMode, Environment, InAppContent,
    PushContent, Step, StepContent, StepId, StepType, Template, TemplateId, TextAlign,
    TextContent, TimeUnit, WaitContent,
};

impl Template {
    /// Create an unsaved, active template with no steps.
    ///
    /// The trigger identifier is derived from the name once and never
    /// follows later renames.
    pub fn new(name: impl Into<String>, environment: Environment) -> Self {
        let name = name.into();
        let now = Utc::now();
        Self {
            id: None,
            trigger_identifier: slugify(&name),
            name,
            description: String::new(),
            active: true,
            environment,
            steps: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.touch();
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
        self.touch();
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
        self.touch();
    }

    /// Label shown next to the template's active switch
    pub fn status_label(&self) -> &'static str {
        if self.active {
            "Enabled"
        } else {
            "Disabled"
        }
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Lowercase ASCII slug: alphanumeric runs joined by single dashes
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}
