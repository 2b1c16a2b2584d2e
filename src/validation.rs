//! Validation of committed template state.
//!
//! [`validate`] is a pure function of the template and the feed catalog.
//! It never sees an open draft: in-progress edits surface errors only once
//! they are committed.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::feeds::FeedCatalog;
use crate::templates::schema::{StepContent, StepId, Template};

/// A field that can carry an error flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Title,
    Subject,
    Content,
    Feeds,
    Amount,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::Subject => "subject",
            Field::Content => "content",
            Field::Feeds => "feeds",
            Field::Amount => "amount",
        }
    }
}

/// Error indicators shown on the top-level navigation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NavBadges {
    pub workflow: bool,
    pub settings: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub template_errors: BTreeSet<Field>,
    /// Only steps with at least one error appear here
    pub step_errors: BTreeMap<StepId, BTreeSet<Field>>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.template_errors.is_empty() && self.step_errors.is_empty()
    }

    pub fn step_has_errors(&self, step_id: &StepId) -> bool {
        self.step_errors.contains_key(step_id)
    }

    pub fn errors_for(&self, step_id: &StepId) -> BTreeSet<Field> {
        self.step_errors.get(step_id).cloned().unwrap_or_default()
    }

    pub fn badges(&self) -> NavBadges {
        NavBadges {
            workflow: !self.step_errors.is_empty(),
            settings: !self.template_errors.is_empty(),
        }
    }
}

/// Compute error flags for the template settings and every step
pub fn validate(template: &Template, feeds: &FeedCatalog) -> ValidationResult {
    let mut result = ValidationResult::default();

    if is_blank(&template.name) {
        result.template_errors.insert(Field::Title);
    }

    for step in &template.steps {
        let errors = step_errors(&step.content, feeds);
        if !errors.is_empty() {
            result.step_errors.insert(step.id.clone(), errors);
        }
    }

    result
}

fn step_errors(content: &StepContent, feeds: &FeedCatalog) -> BTreeSet<Field> {
    let mut errors = BTreeSet::new();
    match content {
        StepContent::Email(email) => {
            if is_blank(&email.subject) {
                errors.insert(Field::Subject);
            }
        }
        StepContent::InApp(in_app) => {
            if is_blank(&in_app.text) {
                errors.insert(Field::Content);
            }
            if in_app.feeds.iter().any(|id| !feeds.contains(id)) {
                errors.insert(Field::Feeds);
            }
        }
        StepContent::Sms(text) | StepContent::Chat(text) => {
            if is_blank(&text.text) {
                errors.insert(Field::Content);
            }
        }
        StepContent::Push(push) => {
            if is_blank(&push.title) {
                errors.insert(Field::Title);
            }
            if is_blank(&push.text) {
                errors.insert(Field::Content);
            }
        }
        StepContent::Digest(wait) | StepContent::Delay(wait) => {
            if wait.amount == 0 {
                errors.insert(Field::Amount);
            }
        }
    }
    errors
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}
