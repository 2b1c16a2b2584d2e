//! JSON file-backed template repository.
//!
//! Layout under the store root:
//! - `<environment>/<template id>.json` for each template
//! - `feeds.json` for the feed catalog

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;
use uuid::Uuid;

use super::{ApiError, FeedProvider, TemplateRepository};
use crate::feeds::{Feed, FeedId};
use crate::templates::schema::{Environment, Template, TemplateId};

const NAME: &str = "file_store";

pub struct JsonFileRepository {
    root: PathBuf,
}

impl JsonFileRepository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn environment_dir(&self, environment: Environment) -> PathBuf {
        self.root.join(environment.as_str())
    }

    /// Ids become file names, so only `[A-Za-z0-9_-]` is accepted
    fn template_path(&self, environment: Environment, id: &TemplateId) -> Result<PathBuf, ApiError> {
        let safe = !id.0.is_empty()
            && id
                .0
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !safe {
            return Err(ApiError::storage(NAME, format!("invalid template id {:?}", id.0)));
        }
        Ok(self.environment_dir(environment).join(format!("{}.json", id.0)))
    }

    fn feeds_path(&self) -> PathBuf {
        self.root.join("feeds.json")
    }

    async fn write_template(
        &self,
        environment: Environment,
        id: &TemplateId,
        template: &Template,
    ) -> Result<(), ApiError> {
        let path = self.template_path(environment, id)?;
        let mut stored = template.clone();
        stored.id = Some(id.clone());
        stored.environment = environment;

        fs::create_dir_all(self.environment_dir(environment))
            .await
            .map_err(storage_error)?;
        let contents = serde_json::to_string_pretty(&stored).map_err(storage_error)?;
        fs::write(&path, contents).await.map_err(storage_error)?;
        debug!(path = %path.display(), "Wrote template");
        Ok(())
    }

    async fn read_template(path: &Path) -> Result<Template, ApiError> {
        let contents = fs::read_to_string(path).await.map_err(storage_error)?;
        serde_json::from_str(&contents).map_err(storage_error)
    }
}

fn storage_error(err: impl std::fmt::Display) -> ApiError {
    ApiError::storage(NAME, err.to_string())
}

#[async_trait]
impl TemplateRepository for JsonFileRepository {
    fn name(&self) -> &str {
        NAME
    }

    async fn create_template(
        &self,
        environment: Environment,
        template: &Template,
    ) -> Result<TemplateId, ApiError> {
        let id = TemplateId(Uuid::new_v4().to_string());
        self.write_template(environment, &id, template).await?;
        Ok(id)
    }

    async fn update_template(
        &self,
        environment: Environment,
        id: &TemplateId,
        template: &Template,
    ) -> Result<TemplateId, ApiError> {
        if !self.template_path(environment, id)?.exists() {
            return Err(ApiError::not_found(NAME, format!("template {}", id)));
        }
        self.write_template(environment, id, template).await?;
        Ok(id.clone())
    }

    async fn get_template(
        &self,
        environment: Environment,
        id: &TemplateId,
    ) -> Result<Option<Template>, ApiError> {
        let path = self.template_path(environment, id)?;
        if !path.exists() {
            return Ok(None);
        }
        Self::read_template(&path).await.map(Some)
    }

    async fn update_template_status(
        &self,
        environment: Environment,
        id: &TemplateId,
        active: bool,
    ) -> Result<(), ApiError> {
        let mut template = self
            .get_template(environment, id)
            .await?
            .ok_or_else(|| ApiError::not_found(NAME, format!("template {}", id)))?;
        template.active = active;
        self.write_template(environment, id, &template).await
    }

    async fn list_templates(&self, environment: Environment) -> Result<Vec<Template>, ApiError> {
        let dir = self.environment_dir(environment);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut templates = Vec::new();
        let mut entries = fs::read_dir(&dir).await.map_err(storage_error)?;
        while let Some(entry) = entries.next_entry().await.map_err(storage_error)? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                templates.push(Self::read_template(&path).await?);
            }
        }
        templates.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(templates)
    }
}

#[async_trait]
impl FeedProvider for JsonFileRepository {
    async fn list_feeds(&self) -> Result<Vec<Feed>, ApiError> {
        let path = self.feeds_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let contents = fs::read_to_string(&path).await.map_err(storage_error)?;
        serde_json::from_str(&contents).map_err(storage_error)
    }

    async fn create_feed(&self, name: &str) -> Result<Feed, ApiError> {
        let mut feeds = self.list_feeds().await?;
        let feed = Feed {
            id: FeedId(Uuid::new_v4().to_string()),
            name: name.to_string(),
        };
        feeds.push(feed.clone());

        fs::create_dir_all(&self.root).await.map_err(storage_error)?;
        let contents = serde_json::to_string_pretty(&feeds).map_err(storage_error)?;
        fs::write(self.feeds_path(), contents)
            .await
            .map_err(storage_error)?;
        Ok(feed)
    }
}
