//! In-memory implementation of every collaborator.
//!
//! Used by tests and demos. Writes can be made to fail on demand so the
//! editor's failure paths can be exercised.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{ApiError, AssetStorage, Branding, EnvironmentProvider, FeedProvider, TemplateRepository};
use crate::feeds::{Feed, FeedId};
use crate::templates::schema::{Environment, Template, TemplateId};

const NAME: &str = "memory";

#[derive(Default)]
pub struct InMemoryBackend {
    templates: RwLock<HashMap<(Environment, TemplateId), Template>>,
    feeds: RwLock<Vec<Feed>>,
    environment: RwLock<Environment>,
    branding: RwLock<Option<Branding>>,
    uploads: RwLock<Vec<String>>,
    fail_writes: AtomicBool,
    write_calls: AtomicUsize,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend preloaded with feeds named in order
    pub fn with_feeds(names: &[&str]) -> Self {
        let feeds = names
            .iter()
            .map(|name| Feed {
                id: FeedId(Uuid::new_v4().to_string()),
                name: (*name).to_string(),
            })
            .collect();
        Self {
            feeds: RwLock::new(feeds),
            ..Self::default()
        }
    }

    /// Make every subsequent write fail (or succeed again)
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of write calls received, failed ones included
    pub fn write_count(&self) -> usize {
        self.write_calls.load(Ordering::SeqCst)
    }

    pub async fn set_branding(&self, branding: Option<Branding>) {
        *self.branding.write().await = branding;
    }

    pub async fn uploads(&self) -> Vec<String> {
        self.uploads.read().await.clone()
    }

    /// Store a template directly, bypassing write failures. Keeps the
    /// template's id when it has one.
    ///
    /// Stands in for records that reach an environment by other means
    /// (e.g. promotion from development).
    pub async fn insert_template(&self, environment: Environment, template: &Template) -> TemplateId {
        let id = template
            .id
            .clone()
            .unwrap_or_else(|| TemplateId(Uuid::new_v4().to_string()));
        let mut stored = template.clone();
        stored.id = Some(id.clone());
        stored.environment = environment;
        self.templates
            .write()
            .await
            .insert((environment, id.clone()), stored);
        id
    }

    fn begin_write(&self) -> Result<(), ApiError> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(ApiError::http(NAME, 500, "write rejected"));
        }
        Ok(())
    }
}

#[async_trait]
impl TemplateRepository for InMemoryBackend {
    fn name(&self) -> &str {
        NAME
    }

    async fn create_template(
        &self,
        environment: Environment,
        template: &Template,
    ) -> Result<TemplateId, ApiError> {
        self.begin_write()?;
        let id = TemplateId(Uuid::new_v4().to_string());
        let mut stored = template.clone();
        stored.id = Some(id.clone());
        stored.environment = environment;
        self.templates
            .write()
            .await
            .insert((environment, id.clone()), stored);
        Ok(id)
    }

    async fn update_template(
        &self,
        environment: Environment,
        id: &TemplateId,
        template: &Template,
    ) -> Result<TemplateId, ApiError> {
        self.begin_write()?;
        let mut templates = self.templates.write().await;
        let slot = templates
            .get_mut(&(environment, id.clone()))
            .ok_or_else(|| ApiError::not_found(NAME, format!("template {}", id)))?;
        let mut stored = template.clone();
        stored.id = Some(id.clone());
        stored.environment = environment;
        *slot = stored;
        Ok(id.clone())
    }

    async fn get_template(
        &self,
        environment: Environment,
        id: &TemplateId,
    ) -> Result<Option<Template>, ApiError> {
        Ok(self
            .templates
            .read()
            .await
            .get(&(environment, id.clone()))
            .cloned())
    }

    async fn update_template_status(
        &self,
        environment: Environment,
        id: &TemplateId,
        active: bool,
    ) -> Result<(), ApiError> {
        self.begin_write()?;
        let mut templates = self.templates.write().await;
        let stored = templates
            .get_mut(&(environment, id.clone()))
            .ok_or_else(|| ApiError::not_found(NAME, format!("template {}", id)))?;
        stored.active = active;
        Ok(())
    }

    async fn list_templates(&self, environment: Environment) -> Result<Vec<Template>, ApiError> {
        let mut templates: Vec<Template> = self
            .templates
            .read()
            .await
            .iter()
            .filter(|((env, _), _)| *env == environment)
            .map(|(_, t)| t.clone())
            .collect();
        templates.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(templates)
    }
}

#[async_trait]
impl FeedProvider for InMemoryBackend {
    async fn list_feeds(&self) -> Result<Vec<Feed>, ApiError> {
        Ok(self.feeds.read().await.clone())
    }

    async fn create_feed(&self, name: &str) -> Result<Feed, ApiError> {
        self.begin_write()?;
        let feed = Feed {
            id: FeedId(Uuid::new_v4().to_string()),
            name: name.to_string(),
        };
        self.feeds.write().await.push(feed.clone());
        Ok(feed)
    }
}

#[async_trait]
impl EnvironmentProvider for InMemoryBackend {
    async fn current_environment(&self) -> Environment {
        *self.environment.read().await
    }

    async fn switch_environment(&self, environment: Environment) -> Result<(), ApiError> {
        self.begin_write()?;
        *self.environment.write().await = environment;
        Ok(())
    }
}

#[async_trait]
impl AssetStorage for InMemoryBackend {
    async fn branding(&self) -> Result<Option<Branding>, ApiError> {
        Ok(self.branding.read().await.clone())
    }

    async fn upload_image(&self, file_name: &str, bytes: &[u8]) -> Result<String, ApiError> {
        self.begin_write()?;
        if bytes.is_empty() {
            return Err(ApiError::http(NAME, 400, "empty image"));
        }
        let url = format!("memory://assets/{}/{}", Uuid::new_v4(), file_name);
        self.uploads.write().await.push(url.clone());
        Ok(url)
    }
}
