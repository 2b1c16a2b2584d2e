//! View state machine of the editor.
//!
//! Every transition flushes the draft buffer before the view changes, so
//! leaving a step editor never loses edits. Only [`Navigator::discard`]
//! drops a draft, and only when asked to.

use tracing::debug;

use crate::error::{EditorError, EditorResult};
use crate::feeds::FeedCatalog;
use crate::snippet::TriggerSnippet;
use crate::steps::{Draft, DraftBuffer};
use crate::templates::schema::{StepId, Template};
use crate::validation::validate;

#[derive(Debug, Clone, Default, PartialEq)]
pub enum View {
    /// Step graph; initial view after loading a template
    #[default]
    Graph,
    StepEditor(StepId),
    Settings,
    /// Shown after a successful submission
    TriggerSnippet(TriggerSnippet),
}

impl View {
    pub fn name(&self) -> &'static str {
        match self {
            View::Graph => "graph",
            View::StepEditor(_) => "step_editor",
            View::Settings => "settings",
            View::TriggerSnippet(_) => "trigger_snippet",
        }
    }

    /// Step currently open in the editor, if any
    pub fn editing(&self) -> Option<&StepId> {
        match self {
            View::StepEditor(step_id) => Some(step_id),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct Navigator {
    view: View,
}

impl Navigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    /// Open a step editor from any view.
    ///
    /// A missing step is rejected before anything is committed.
    pub fn open_step(
        &mut self,
        drafts: &mut DraftBuffer,
        template: &mut Template,
        step_id: &StepId,
    ) -> EditorResult<()> {
        drafts.open(template, step_id)?;
        self.transition(View::StepEditor(step_id.clone()));
        Ok(())
    }

    /// Back to the graph.
    ///
    /// From settings this is the same as [`Self::open_workflow`] and is
    /// refused while the template has settings errors.
    pub fn go_back(
        &mut self,
        drafts: &mut DraftBuffer,
        template: &mut Template,
        feeds: &FeedCatalog,
    ) -> EditorResult<()> {
        if self.view == View::Settings {
            return self.open_workflow(drafts, template, feeds);
        }
        drafts.commit(template)?;
        self.transition(View::Graph);
        Ok(())
    }

    pub fn open_settings(
        &mut self,
        drafts: &mut DraftBuffer,
        template: &mut Template,
    ) -> EditorResult<()> {
        drafts.commit(template)?;
        self.transition(View::Settings);
        Ok(())
    }

    /// Return to the graph; refused while template settings have errors.
    pub fn open_workflow(
        &mut self,
        drafts: &mut DraftBuffer,
        template: &mut Template,
        feeds: &FeedCatalog,
    ) -> EditorResult<()> {
        drafts.commit(template)?;
        if !validate(template, feeds).template_errors.is_empty() {
            debug!(view = self.view.name(), "Workflow blocked by settings errors");
            return Err(EditorError::SettingsIncomplete);
        }
        self.transition(View::Graph);
        Ok(())
    }

    /// Drop the open draft and leave the step editor
    pub fn discard(&mut self, drafts: &mut DraftBuffer) -> Option<Draft> {
        let dropped = drafts.discard();
        if self.view.editing().is_some() {
            self.transition(View::Graph);
        }
        dropped
    }

    pub(crate) fn show_snippet(&mut self, snippet: TriggerSnippet) {
        self.transition(View::TriggerSnippet(snippet));
    }

    pub fn close_snippet(&mut self) {
        if matches!(self.view, View::TriggerSnippet(_)) {
            self.transition(View::Graph);
        }
    }

    /// The step under edit was removed from the template
    pub(crate) fn step_removed(&mut self, step_id: &StepId) {
        if self.view.editing() == Some(step_id) {
            self.transition(View::Graph);
        }
    }

    fn transition(&mut self, next: View) {
        debug!(from = self.view.name(), to = next.name(), "View transition");
        self.view = next;
    }
}
