//! Editor session: one template open for editing in one environment.
//!
//! The session owns the template, the draft buffer, the view state machine
//! and the feed catalog. Store operations, navigation and settings are
//! synchronous; only calls to collaborators suspend. While a submission is
//! in flight every mutating call fails with `SubmissionInFlight`.

use tracing::{debug, info, warn};

use crate::api::{ApiError, Collaborators};
use crate::config::{Config, SnippetConfig};
use crate::error::{EditorError, EditorResult};
use crate::feeds::{Feed, FeedCatalog};
use crate::snippet::{SnippetGenerator, SnippetLanguage, TriggerSnippet};
use crate::steps::{Draft, DraftBuffer, DraftEdit};
use crate::templates::schema::{
    Environment, Step, StepContent, StepId, StepType, Template, TemplateId,
};
use crate::validation::{validate, NavBadges, ValidationResult};

use super::navigation::{Navigator, View};

/// Session behaviour taken from configuration
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Park deletions until confirmed
    pub confirm_destructive: bool,
    pub snippet: SnippetConfig,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            confirm_destructive: true,
            snippet: SnippetConfig::default(),
        }
    }
}

impl SessionOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            confirm_destructive: config.editor.confirm_destructive,
            snippet: config.snippet.clone(),
        }
    }
}

/// An action waiting for the user's confirmation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingAction {
    DeleteStep(StepId),
    /// Uploads need organization branding; leave the editor to set it up
    LeaveForBrandingSettings,
}

/// Result of confirming a pending action
#[derive(Debug, Clone, PartialEq)]
pub enum Confirmed {
    StepDeleted(Step),
    RedirectToSettings,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LogoUpload {
    Uploaded(String),
    /// No branding configured; the caller must confirm leaving for settings
    ConfirmRedirect,
}

/// Snapshot handed to the persistence collaborator
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionRequest {
    pub environment: Environment,
    /// `None` for a template that has never been saved
    pub id: Option<TemplateId>,
    pub template: Template,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BeginSubmit {
    Ready(SubmissionRequest),
    /// Nothing was sent; the template has field errors
    Invalid(ValidationResult),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Saved {
        id: TemplateId,
        snippet: TriggerSnippet,
    },
    Invalid(ValidationResult),
}

/// Result of switching environment with a template open
pub enum EnvironmentSwitch {
    /// The template exists in the target environment and was reloaded
    Reloaded(Box<EditorSession>),
    /// The template does not exist there; the editor must close
    NavigatedAway { template_id: Option<TemplateId> },
    /// The switch did not happen; the original session is handed back as it was
    Failed {
        session: Box<EditorSession>,
        error: EditorError,
    },
}

pub struct EditorSession {
    collaborators: Collaborators,
    options: SessionOptions,
    environment: Environment,
    template: Template,
    feeds: FeedCatalog,
    drafts: DraftBuffer,
    navigator: Navigator,
    pending: Option<PendingAction>,
    in_flight: Option<SubmissionRequest>,
    snippets: SnippetGenerator,
}

impl EditorSession {
    /// Start editing a new, unsaved template in the current environment
    pub async fn create(
        collaborators: Collaborators,
        name: &str,
        options: SessionOptions,
    ) -> EditorResult<Self> {
        let environment = collaborators.environments.current_environment().await;
        let template = Template::new(name, environment);
        info!(environment = %environment, name, "Creating template");
        Self::open(collaborators, template, options).await
    }

    /// Load a saved template from the current environment
    pub async fn load(
        collaborators: Collaborators,
        id: &TemplateId,
        options: SessionOptions,
    ) -> EditorResult<Self> {
        let environment = collaborators.environments.current_environment().await;
        let template = collaborators
            .templates
            .get_template(environment, id)
            .await
            .map_err(EditorError::collaborator)?
            .ok_or_else(|| EditorError::TemplateNotFound(id.to_string()))?;
        info!(environment = %environment, template_id = %id, "Loaded template");
        Self::open(collaborators, template, options).await
    }

    async fn open(
        collaborators: Collaborators,
        mut template: Template,
        options: SessionOptions,
    ) -> EditorResult<Self> {
        let feeds = collaborators
            .feeds
            .list_feeds()
            .await
            .map_err(EditorError::collaborator)?;
        template.normalize_order();

        Ok(Self {
            environment: template.environment,
            snippets: SnippetGenerator::new(options.snippet.clone()),
            collaborators,
            options,
            template,
            feeds: FeedCatalog::new(feeds),
            drafts: DraftBuffer::new(),
            navigator: Navigator::new(),
            pending: None,
            in_flight: None,
        })
    }

    // --- Reads ---

    /// Committed template state; excludes the open draft
    pub fn template(&self) -> &Template {
        &self.template
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    pub fn view(&self) -> &View {
        self.navigator.view()
    }

    pub fn draft(&self) -> Option<&Draft> {
        self.drafts.current()
    }

    pub fn feeds(&self) -> &FeedCatalog {
        &self.feeds
    }

    pub fn pending(&self) -> Option<&PendingAction> {
        self.pending.as_ref()
    }

    pub fn is_submitting(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn step(&self, step_id: &StepId) -> EditorResult<&Step> {
        self.template.get_step(step_id)
    }

    /// Field errors of the committed template
    pub fn validation(&self) -> ValidationResult {
        validate(&self.template, &self.feeds)
    }

    pub fn badges(&self) -> NavBadges {
        self.validation().badges()
    }

    /// Trigger snippet for the committed template
    pub fn snippet(&self) -> EditorResult<TriggerSnippet> {
        self.snippet_as(self.snippets.options().language)
    }

    pub fn snippet_as(&self, language: SnippetLanguage) -> EditorResult<TriggerSnippet> {
        self.render_snippet(&self.template, language)
    }

    fn render_snippet(
        &self,
        template: &Template,
        language: SnippetLanguage,
    ) -> EditorResult<TriggerSnippet> {
        self.snippets
            .render_as(template, language)
            .map_err(|e| EditorError::Snippet(format!("{:#}", e)))
    }

    // --- Navigation ---

    pub fn open_step(&mut self, step_id: &StepId) -> EditorResult<()> {
        self.ensure_idle()?;
        self.navigator
            .open_step(&mut self.drafts, &mut self.template, step_id)
    }

    pub fn go_back(&mut self) -> EditorResult<()> {
        self.ensure_idle()?;
        self.navigator
            .go_back(&mut self.drafts, &mut self.template, &self.feeds)
    }

    pub fn open_settings(&mut self) -> EditorResult<()> {
        self.ensure_idle()?;
        self.navigator
            .open_settings(&mut self.drafts, &mut self.template)
    }

    pub fn open_workflow(&mut self) -> EditorResult<()> {
        self.ensure_idle()?;
        self.navigator
            .open_workflow(&mut self.drafts, &mut self.template, &self.feeds)
    }

    pub fn close_snippet(&mut self) {
        self.navigator.close_snippet();
    }

    // --- Draft ---

    pub fn edit(&mut self, edit: DraftEdit) -> EditorResult<()> {
        self.ensure_idle()?;
        self.drafts.edit(edit)
    }

    /// Throw away the open draft and return to the graph
    pub fn discard_draft(&mut self) -> EditorResult<Option<Draft>> {
        self.ensure_idle()?;
        Ok(self.navigator.discard(&mut self.drafts))
    }

    // --- Step store ---

    /// Insert a new active step at `at_index` and return its id
    pub fn insert_step(&mut self, step_type: StepType, at_index: usize) -> EditorResult<StepId> {
        self.ensure_idle()?;
        if at_index > self.template.step_count() {
            return Err(EditorError::InvalidIndex {
                index: at_index,
                len: self.template.step_count(),
            });
        }
        self.flush_draft()?;
        let step = self.template.insert_step(step_type, at_index)?;
        Ok(step.id.clone())
    }

    pub fn push_step(&mut self, step_type: StepType) -> EditorResult<StepId> {
        let at_end = self.template.step_count();
        self.insert_step(step_type, at_end)
    }

    /// Ask to delete a step.
    ///
    /// With confirmation enabled the deletion is parked and `Ok(None)` is
    /// returned; otherwise the step is removed right away.
    pub fn request_delete_step(&mut self, step_id: &StepId) -> EditorResult<Option<Step>> {
        self.ensure_idle()?;
        self.ensure_nothing_pending()?;
        self.template.get_step(step_id)?;

        if self.options.confirm_destructive {
            debug!(step_id = %step_id, "Delete awaiting confirmation");
            self.pending = Some(PendingAction::DeleteStep(step_id.clone()));
            return Ok(None);
        }
        self.delete_step_now(step_id).map(Some)
    }

    pub fn confirm(&mut self) -> EditorResult<Confirmed> {
        self.ensure_idle()?;
        let action = self.pending.take().ok_or(EditorError::NoPendingAction)?;
        match action {
            PendingAction::DeleteStep(step_id) => {
                self.delete_step_now(&step_id).map(Confirmed::StepDeleted)
            }
            PendingAction::LeaveForBrandingSettings => {
                self.navigator
                    .open_settings(&mut self.drafts, &mut self.template)?;
                info!("Leaving editor for branding settings");
                Ok(Confirmed::RedirectToSettings)
            }
        }
    }

    pub fn cancel(&mut self) -> EditorResult<PendingAction> {
        let action = self.pending.take().ok_or(EditorError::NoPendingAction)?;
        debug!(?action, "Pending action cancelled");
        Ok(action)
    }

    fn delete_step_now(&mut self, step_id: &StepId) -> EditorResult<Step> {
        self.template.get_step(step_id)?;
        self.drafts.commit(&mut self.template)?;
        let removed = self.template.delete_step(step_id)?;
        self.navigator.step_removed(step_id);
        self.reopen_draft()?;
        info!(step_id = %step_id, remaining = self.template.step_count(), "Deleted step");
        Ok(removed)
    }

    pub fn set_step_active(&mut self, step_id: &StepId, active: bool) -> EditorResult<()> {
        self.ensure_idle()?;
        self.template.set_step_active(step_id, active)
    }

    /// Flip a step's active flag and return the new value
    pub fn toggle_step_active(&mut self, step_id: &StepId) -> EditorResult<bool> {
        self.ensure_idle()?;
        let active = !self.template.get_step(step_id)?.active;
        self.template.set_step_active(step_id, active)?;
        Ok(active)
    }

    pub fn reorder_step(&mut self, step_id: &StepId, new_index: usize) -> EditorResult<()> {
        self.ensure_idle()?;
        self.template.get_step(step_id)?;
        if new_index >= self.template.step_count() {
            return Err(EditorError::InvalidIndex {
                index: new_index,
                len: self.template.step_count(),
            });
        }
        self.flush_draft()?;
        self.template.reorder_step(step_id, new_index)
    }

    /// Commit the open draft; keep editing the same step afterwards
    fn flush_draft(&mut self) -> EditorResult<()> {
        self.drafts.commit(&mut self.template)?;
        self.reopen_draft()
    }

    fn reopen_draft(&mut self) -> EditorResult<()> {
        if let Some(step_id) = self.navigator.view().editing().cloned() {
            self.drafts.open(&mut self.template, &step_id)?;
        }
        Ok(())
    }

    // --- Template settings ---

    pub fn set_name(&mut self, name: &str) -> EditorResult<()> {
        self.ensure_idle()?;
        self.template.set_name(name);
        Ok(())
    }

    pub fn set_description(&mut self, description: &str) -> EditorResult<()> {
        self.ensure_idle()?;
        self.template.set_description(description);
        Ok(())
    }

    /// Set the template's active flag, persisting it at once for saved
    /// templates. A rejected write restores the previous value.
    pub async fn set_active(&mut self, active: bool) -> EditorResult<()> {
        self.ensure_idle()?;
        let previous = self.template.active;
        self.template.set_active(active);

        let Some(id) = self.template.id.clone() else {
            return Ok(());
        };
        if let Err(err) = self
            .collaborators
            .templates
            .update_template_status(self.environment, &id, active)
            .await
        {
            warn!(template_id = %id, error = %err, "Status update rejected");
            self.template.set_active(previous);
            return Err(err.into());
        }
        info!(template_id = %id, active, "Template status persisted");
        Ok(())
    }

    pub async fn toggle_active(&mut self) -> EditorResult<bool> {
        let active = !self.template.active;
        self.set_active(active).await?;
        Ok(active)
    }

    // --- Feeds ---

    /// Create a feed and bind it to the open in-app draft, if any
    pub async fn create_feed(&mut self, name: &str) -> EditorResult<Feed> {
        self.ensure_idle()?;
        let feed = self
            .collaborators
            .feeds
            .create_feed(name)
            .await
            .map_err(EditorError::collaborator)?;
        self.feeds.push(feed.clone());
        debug!(feed = %feed.id, name, "Feed created");

        if self.drafts.current().map(|d| d.step_type()) == Some(StepType::InApp) {
            self.drafts.edit(DraftEdit::UseFeeds(true))?;
            self.drafts.edit(DraftEdit::SelectFeed {
                feed: feed.id.clone(),
                selected: true,
            })?;
        }
        Ok(feed)
    }

    /// Toggle a feed on the open in-app draft by its 1-based position
    pub fn select_feed_by_index(&mut self, index: usize, selected: bool) -> EditorResult<()> {
        self.ensure_idle()?;
        let feed = self
            .feeds
            .by_index(index)
            .ok_or_else(|| EditorError::FeedNotFound(format!("#{}", index)))?
            .id
            .clone();
        self.drafts.edit(DraftEdit::SelectFeed { feed, selected })
    }

    pub async fn reload_feeds(&mut self) -> EditorResult<()> {
        let feeds = self
            .collaborators
            .feeds
            .list_feeds()
            .await
            .map_err(EditorError::collaborator)?;
        self.feeds = FeedCatalog::new(feeds);
        Ok(())
    }

    // --- Assets ---

    /// Upload an image for the email editor.
    ///
    /// Without a branding logo configured nothing is uploaded; a
    /// `LeaveForBrandingSettings` action is parked instead.
    pub async fn request_logo_upload(
        &mut self,
        file_name: &str,
        bytes: &[u8],
    ) -> EditorResult<LogoUpload> {
        self.ensure_idle()?;
        self.ensure_nothing_pending()?;
        self.flush_draft()?;

        let branding = self
            .collaborators
            .assets
            .branding()
            .await
            .map_err(EditorError::collaborator)?;
        if branding.and_then(|b| b.logo).is_none() {
            debug!(file_name, "Upload blocked until branding is configured");
            self.pending = Some(PendingAction::LeaveForBrandingSettings);
            return Ok(LogoUpload::ConfirmRedirect);
        }

        let url = self
            .collaborators
            .assets
            .upload_image(file_name, bytes)
            .await
            .map_err(EditorError::collaborator)?;
        info!(file_name, url = %url, "Image uploaded");
        Ok(LogoUpload::Uploaded(url))
    }

    // --- Submission ---

    /// Validate the template with the open draft applied and, if valid,
    /// enter the submitting state.
    ///
    /// The session itself is untouched until [`Self::complete_submit`].
    pub fn begin_submit(&mut self) -> EditorResult<BeginSubmit> {
        self.ensure_idle()?;

        let mut snapshot = self.template.clone();
        if let Some(draft) = self.drafts.current() {
            if draft.is_dirty() {
                snapshot.upsert_step_content(draft.step_id(), draft.content().clone())?;
            }
        }
        snapshot.normalize_order();

        let validation = validate(&snapshot, &self.feeds);
        if !validation.is_valid() {
            debug!(
                template_errors = validation.template_errors.len(),
                step_errors = validation.step_errors.len(),
                "Submission blocked by validation"
            );
            return Ok(BeginSubmit::Invalid(validation));
        }

        let request = SubmissionRequest {
            environment: self.environment,
            id: self.template.id.clone(),
            template: snapshot,
        };
        self.in_flight = Some(request.clone());
        Ok(BeginSubmit::Ready(request))
    }

    /// Resolve the in-flight submission with the collaborator's answer.
    ///
    /// On success the snapshot becomes the committed template and the view
    /// moves to the trigger snippet. On failure nothing changes.
    pub fn complete_submit(
        &mut self,
        result: Result<TemplateId, ApiError>,
    ) -> EditorResult<SubmitOutcome> {
        let request = self.in_flight.take().ok_or(EditorError::NoPendingAction)?;

        let id = match result {
            Ok(id) => id,
            Err(err) => {
                warn!(error = %err, "Submission failed");
                return Err(err.into());
            }
        };

        let mut saved = request.template;
        saved.id = Some(id.clone());
        let snippet = self.render_snippet(&saved, self.snippets.options().language)?;

        self.template = saved;
        self.drafts.discard();
        self.navigator.show_snippet(snippet.clone());
        info!(template_id = %id, environment = %self.environment, "Template saved");
        Ok(SubmitOutcome::Saved { id, snippet })
    }

    /// Validate, persist through the template repository, and complete
    pub async fn submit(&mut self) -> EditorResult<SubmitOutcome> {
        let request = match self.begin_submit()? {
            BeginSubmit::Ready(request) => request,
            BeginSubmit::Invalid(validation) => return Ok(SubmitOutcome::Invalid(validation)),
        };

        let repo = self.collaborators.templates.clone();
        debug!(collaborator = repo.name(), "Submitting template");
        let result = match &request.id {
            Some(id) => {
                repo.update_template(request.environment, id, &request.template)
                    .await
            }
            None => {
                repo.create_template(request.environment, &request.template)
                    .await
            }
        };
        self.complete_submit(result)
    }

    // --- Environment ---

    /// Switch environment and reload the template there.
    ///
    /// Nothing carries over: on success the open draft and any pending
    /// action are dropped with this session. If the switch fails the
    /// session comes back untouched in [`EnvironmentSwitch::Failed`].
    pub async fn switch_environment(self, environment: Environment) -> EnvironmentSwitch {
        if self.in_flight.is_some() {
            return EnvironmentSwitch::Failed {
                session: Box::new(self),
                error: EditorError::SubmissionInFlight,
            };
        }

        match self.reload_in(environment).await {
            Ok(Some(session)) => EnvironmentSwitch::Reloaded(Box::new(session)),
            Ok(None) => EnvironmentSwitch::NavigatedAway {
                template_id: self.template.id.clone(),
            },
            Err(error) => {
                warn!(to = %environment, error = %error, "Environment switch failed");
                EnvironmentSwitch::Failed {
                    session: Box::new(self),
                    error,
                }
            }
        }
    }

    /// `Ok(None)` when the template has no record in `environment`
    async fn reload_in(&self, environment: Environment) -> EditorResult<Option<EditorSession>> {
        self.collaborators
            .environments
            .switch_environment(environment)
            .await
            .map_err(EditorError::collaborator)?;
        info!(from = %self.environment, to = %environment, "Switched environment");

        let Some(id) = self.template.id.as_ref() else {
            return Ok(None);
        };

        let found = match self
            .collaborators
            .templates
            .get_template(environment, id)
            .await
        {
            Ok(found) => found,
            Err(err) => {
                self.restore_environment().await;
                return Err(EditorError::collaborator(err));
            }
        };

        let Some(template) = found else {
            info!(template_id = %id, environment = %environment, "Template missing; leaving editor");
            return Ok(None);
        };

        match Self::open(self.collaborators.clone(), template, self.options.clone()).await {
            Ok(session) => Ok(Some(session)),
            Err(err) => {
                self.restore_environment().await;
                Err(err)
            }
        }
    }

    async fn restore_environment(&self) {
        if let Err(err) = self
            .collaborators
            .environments
            .switch_environment(self.environment)
            .await
        {
            warn!(environment = %self.environment, error = %err, "Failed to restore environment");
        }
    }

    fn ensure_nothing_pending(&self) -> EditorResult<()> {
        if self.pending.is_some() {
            return Err(EditorError::ConfirmationPending);
        }
        Ok(())
    }

    fn ensure_idle(&self) -> EditorResult<()> {
        if self.in_flight.is_some() {
            return Err(EditorError::SubmissionInFlight);
        }
        Ok(())
    }
}

/// Committed body text of an email step, for display
pub fn email_body(step: &Step) -> Option<String> {
    match &step.content {
        StepContent::Email(email) => Some(email.body_text()),
        _ => None,
    }
}
