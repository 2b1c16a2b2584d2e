//! Schema definitions for notification workflow templates and their steps

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::feeds::FeedId;

/// Identifier assigned to a template by the persistence collaborator
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateId(pub String);

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stable step identifier; survives reorders and reloads
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepId(pub String);

impl StepId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Environment a template record lives in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }

    /// Parse from a user-supplied name ("dev", "Production", ...)
    pub fn from_key(key: &str) -> Option<Environment> {
        match key.to_lowercase().as_str() {
            "development" | "dev" => Some(Environment::Development),
            "production" | "prod" => Some(Environment::Production),
            _ => None,
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Development => write!(f, "Development"),
            Environment::Production => write!(f, "Production"),
        }
    }
}

/// Delivery channel or flow-control action a step performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepType {
    InApp,
    Email,
    Sms,
    Push,
    Chat,
    Digest,
    Delay,
}

impl StepType {
    /// Returns all step types in the order the add-step menu shows them
    pub fn all() -> &'static [StepType] {
        &[
            StepType::InApp,
            StepType::Email,
            StepType::Sms,
            StepType::Push,
            StepType::Chat,
            StepType::Digest,
            StepType::Delay,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StepType::InApp => "in_app",
            StepType::Email => "email",
            StepType::Sms => "sms",
            StepType::Push => "push",
            StepType::Chat => "chat",
            StepType::Digest => "digest",
            StepType::Delay => "delay",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            StepType::InApp => "In-App",
            StepType::Email => "Email",
            StepType::Sms => "SMS",
            StepType::Push => "Push",
            StepType::Chat => "Chat",
            StepType::Digest => "Digest",
            StepType::Delay => "Delay",
        }
    }

    /// Parse step type from a key (e.g., "email", "inApp", "in-app")
    pub fn from_key(key: &str) -> Option<StepType> {
        let normalized: String = key
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "inapp" => Some(StepType::InApp),
            "email" => Some(StepType::Email),
            "sms" => Some(StepType::Sms),
            "push" => Some(StepType::Push),
            "chat" => Some(StepType::Chat),
            "digest" => Some(StepType::Digest),
            "delay" => Some(StepType::Delay),
            _ => None,
        }
    }
}

impl fmt::Display for StepType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// A notification workflow template (aggregate root)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    /// Assigned on first successful create; `None` for unsaved templates
    #[serde(default)]
    pub id: Option<TemplateId>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub active: bool,
    /// Identifier external callers trigger the workflow with
    pub trigger_identifier: String,
    pub environment: Environment,
    /// Steps kept sorted by `order`
    #[serde(default)]
    pub steps: Vec<Step>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One node of the workflow graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub id: StepId,
    pub active: bool,
    /// Position in the workflow, contiguous from 0
    pub order: usize,
    pub content: StepContent,
}

/// Type-specific step payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepContent {
    InApp(InAppContent),
    Email(EmailContent),
    Sms(TextContent),
    Push(PushContent),
    Chat(TextContent),
    Digest(WaitContent),
    Delay(WaitContent),
}

/// In-app message with optional feed filtering
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InAppContent {
    pub text: String,
    /// Whether delivery is scoped to `feeds`
    #[serde(default)]
    pub use_feeds: bool,
    #[serde(default)]
    pub feeds: BTreeSet<FeedId>,
}

/// Email content; both editor representations are kept side by side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailContent {
    pub subject: String,
    #[serde(default)]
    pub editor_mode: EmailEditorMode,
    /// Body as edited in the visual block editor
    #[serde(default)]
    pub blocks: Vec<EmailBlock>,
    /// Body as edited in the custom code editor
    #[serde(default)]
    pub html: String,
}

impl Default for EmailContent {
    fn default() -> Self {
        Self {
            subject: String::new(),
            editor_mode: EmailEditorMode::Visual,
            blocks: vec![EmailBlock::text("")],
            html: String::new(),
        }
    }
}

impl EmailContent {
    /// Body of the currently selected editor mode
    pub fn body_text(&self) -> String {
        match self.editor_mode {
            EmailEditorMode::Visual => self
                .blocks
                .iter()
                .map(|b| b.content.as_str())
                .collect::<Vec<_>>()
                .join("\n"),
            EmailEditorMode::CustomCode => self.html.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailEditorMode {
    #[default]
    Visual,
    CustomCode,
}

/// A block of the visual email editor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailBlock {
    pub kind: BlockKind,
    pub content: String,
    #[serde(default)]
    pub styles: BlockStyles,
}

impl EmailBlock {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            kind: BlockKind::Text,
            content: content.into(),
            styles: BlockStyles::default(),
        }
    }

    pub fn button(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            kind: BlockKind::Button { url: url.into() },
            content: label.into(),
            styles: BlockStyles::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BlockKind {
    Text,
    Button { url: String },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockStyles {
    #[serde(default)]
    pub text_align: TextAlign,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

/// Plain text content (SMS, chat)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextContent {
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PushContent {
    pub title: String,
    pub text: String,
}

/// Digest window or delay duration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WaitContent {
    pub amount: u32,
    #[serde(default)]
    pub unit: TimeUnit,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Seconds,
    #[default]
    Minutes,
    Hours,
    Days,
}

impl StepContent {
    /// Empty content for a freshly added step
    pub fn empty(step_type: StepType) -> Self {
        match step_type {
            StepType::InApp => StepContent::InApp(InAppContent::default()),
            StepType::Email => StepContent::Email(EmailContent::default()),
            StepType::Sms => StepContent::Sms(TextContent::default()),
            StepType::Push => StepContent::Push(PushContent::default()),
            StepType::Chat => StepContent::Chat(TextContent::default()),
            StepType::Digest => StepContent::Digest(WaitContent::default()),
            StepType::Delay => StepContent::Delay(WaitContent::default()),
        }
    }

    pub fn step_type(&self) -> StepType {
        match self {
            StepContent::InApp(_) => StepType::InApp,
            StepContent::Email(_) => StepType::Email,
            StepContent::Sms(_) => StepType::Sms,
            StepContent::Push(_) => StepType::Push,
            StepContent::Chat(_) => StepType::Chat,
            StepContent::Digest(_) => StepType::Digest,
            StepContent::Delay(_) => StepType::Delay,
        }
    }

    /// Every user-authored string that may carry variable tokens
    pub fn text_fields(&self) -> Vec<&str> {
        match self {
            StepContent::InApp(c) => vec![c.text.as_str()],
            StepContent::Email(c) => {
                let mut fields = vec![c.subject.as_str(), c.html.as_str()];
                for block in &c.blocks {
                    fields.push(block.content.as_str());
                    if let BlockKind::Button { url } = &block.kind {
                        fields.push(url.as_str());
                    }
                }
                fields
            }
            StepContent::Sms(c) | StepContent::Chat(c) => vec![c.text.as_str()],
            StepContent::Push(c) => vec![c.title.as_str(), c.text.as_str()],
            StepContent::Digest(_) | StepContent::Delay(_) => Vec::new(),
        }
    }
}

impl Step {
    pub fn step_type(&self) -> StepType {
        self.content.step_type()
    }

    /// Label shown next to the step's active switch
    pub fn status_label(&self) -> &'static str {
        if self.active {
            "Step is active"
        } else {
            "Step is not active"
        }
    }
}
