//! External collaborators the editor talks to
//!
//! This module provides:
//! - Collaborator traits for template persistence, feeds, environments and assets
//! - An in-memory backend implementing all of them (tests, demos)
//! - A JSON file-backed template repository used by the CLI
//!
//! The editor core never assumes a collaborator call succeeds; every call
//! returns `Result<_, ApiError>` and the session decides what a failure means.

pub mod error;
pub mod file_store;
pub mod memory;

pub use error::ApiError;
pub use file_store::JsonFileRepository;
pub use memory::InMemoryBackend;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::feeds::Feed;
use crate::templates::schema::{Environment, Template, TemplateId};

/// Template persistence, keyed by `(environment, template id)`
#[async_trait]
pub trait TemplateRepository: Send + Sync {
    /// Collaborator name (for logging)
    fn name(&self) -> &str;

    /// Store a new template and return its assigned id
    async fn create_template(
        &self,
        environment: Environment,
        template: &Template,
    ) -> Result<TemplateId, ApiError>;

    /// Replace an existing template
    async fn update_template(
        &self,
        environment: Environment,
        id: &TemplateId,
        template: &Template,
    ) -> Result<TemplateId, ApiError>;

    /// Fetch a template; `Ok(None)` when it does not exist in that environment
    async fn get_template(
        &self,
        environment: Environment,
        id: &TemplateId,
    ) -> Result<Option<Template>, ApiError>;

    /// Persist only the template's active flag
    async fn update_template_status(
        &self,
        environment: Environment,
        id: &TemplateId,
        active: bool,
    ) -> Result<(), ApiError>;

    /// All templates of an environment
    async fn list_templates(&self, environment: Environment) -> Result<Vec<Template>, ApiError>;
}

/// Feed catalog source
#[async_trait]
pub trait FeedProvider: Send + Sync {
    async fn list_feeds(&self) -> Result<Vec<Feed>, ApiError>;

    async fn create_feed(&self, name: &str) -> Result<Feed, ApiError>;
}

/// Tracks the environment the user is working in
#[async_trait]
pub trait EnvironmentProvider: Send + Sync {
    async fn current_environment(&self) -> Environment;

    async fn switch_environment(&self, environment: Environment) -> Result<(), ApiError>;
}

/// Organization branding used by the email editor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branding {
    /// Logo URL; uploads from the editor require one to be configured
    #[serde(default)]
    pub logo: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

/// Image upload and organization branding
#[async_trait]
pub trait AssetStorage: Send + Sync {
    async fn branding(&self) -> Result<Option<Branding>, ApiError>;

    /// Upload an image and return its public URL
    async fn upload_image(&self, file_name: &str, bytes: &[u8]) -> Result<String, ApiError>;
}

/// The set of collaborators an editor session works against
#[derive(Clone)]
pub struct Collaborators {
    pub templates: Arc<dyn TemplateRepository>,
    pub feeds: Arc<dyn FeedProvider>,
    pub environments: Arc<dyn EnvironmentProvider>,
    pub assets: Arc<dyn AssetStorage>,
}

impl Collaborators {
    /// Use one in-memory backend for every collaborator
    pub fn in_memory(backend: Arc<InMemoryBackend>) -> Self {
        Self {
            templates: backend.clone(),
            feeds: backend.clone(),
            environments: backend.clone(),
            assets: backend,
        }
    }

    /// Swap the template repository, keeping the other collaborators
    pub fn with_templates(mut self, templates: Arc<dyn TemplateRepository>) -> Self {
        self.templates = templates;
        self
    }
}
