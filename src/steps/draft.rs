//! Draft buffer for the step editor.
//!
//! A [`Draft`] is an editable snapshot of one step's content. At most one
//! draft is open per editor session; opening another commits the first.
//! Edits never touch the template until [`DraftBuffer::commit`].

use tracing::{debug, trace};

use crate::error::{EditorError, EditorResult};
use crate::feeds::FeedId;
use crate::templates::schema::{
    EmailBlock, EmailEditorMode, Step, StepContent, StepId, StepType, Template, TextAlign,
    TimeUnit,
};

/// A single field edit applied to the open draft
#[derive(Debug, Clone, PartialEq)]
pub enum DraftEdit {
    /// Email subject line
    Subject(String),
    /// Switch the email body editor; both bodies are kept
    EditorMode(EmailEditorMode),
    /// Custom code email body
    Html(String),
    /// Replace all visual email blocks
    Blocks(Vec<EmailBlock>),
    BlockText { index: usize, text: String },
    BlockAlign { index: usize, align: TextAlign },
    /// Message text of in-app, SMS, chat and push steps
    Text(String),
    /// Push notification title
    Title(String),
    UseFeeds(bool),
    SelectFeed { feed: FeedId, selected: bool },
    Amount(u32),
    Unit(TimeUnit),
}

impl DraftEdit {
    pub fn field_name(&self) -> &'static str {
        match self {
            DraftEdit::Subject(_) => "subject",
            DraftEdit::EditorMode(_) => "editor_mode",
            DraftEdit::Html(_) => "html",
            DraftEdit::Blocks(_) => "blocks",
            DraftEdit::BlockText { .. } => "block_text",
            DraftEdit::BlockAlign { .. } => "block_align",
            DraftEdit::Text(_) => "text",
            DraftEdit::Title(_) => "title",
            DraftEdit::UseFeeds(_) => "use_feeds",
            DraftEdit::SelectFeed { .. } => "feeds",
            DraftEdit::Amount(_) => "amount",
            DraftEdit::Unit(_) => "unit",
        }
    }
}

/// Uncommitted copy of one step's content
#[derive(Debug, Clone, PartialEq)]
pub struct Draft {
    step_id: StepId,
    content: StepContent,
    dirty: bool,
}

impl Draft {
    pub fn from_step(step: &Step) -> Self {
        Self {
            step_id: step.id.clone(),
            content: step.content.clone(),
            dirty: false,
        }
    }

    pub fn step_id(&self) -> &StepId {
        &self.step_id
    }

    pub fn content(&self) -> &StepContent {
        &self.content
    }

    pub fn step_type(&self) -> StepType {
        self.content.step_type()
    }

    /// Whether any edit was applied since the draft was opened
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Apply an edit to the draft content.
    ///
    /// Fails without changing the draft if the field does not belong to the
    /// step's type or a block index is out of range.
    pub fn apply(&mut self, edit: DraftEdit) -> EditorResult<()> {
        let step_type = self.step_type();
        let not_applicable = EditorError::FieldNotApplicable {
            field: edit.field_name(),
            step_type,
        };

        match (&mut self.content, edit) {
            (StepContent::Email(email), DraftEdit::Subject(subject)) => email.subject = subject,
            (StepContent::Email(email), DraftEdit::EditorMode(mode)) => email.editor_mode = mode,
            (StepContent::Email(email), DraftEdit::Html(html)) => email.html = html,
            (StepContent::Email(email), DraftEdit::Blocks(blocks)) => email.blocks = blocks,
            (StepContent::Email(email), DraftEdit::BlockText { index, text }) => {
                let len = email.blocks.len();
                let block = email
                    .blocks
                    .get_mut(index)
                    .ok_or(EditorError::InvalidIndex { index, len })?;
                block.content = text;
            }
            (StepContent::Email(email), DraftEdit::BlockAlign { index, align }) => {
                let len = email.blocks.len();
                let block = email
                    .blocks
                    .get_mut(index)
                    .ok_or(EditorError::InvalidIndex { index, len })?;
                block.styles.text_align = align;
            }
            (StepContent::InApp(in_app), DraftEdit::Text(text)) => in_app.text = text,
            (StepContent::InApp(in_app), DraftEdit::UseFeeds(enabled)) => {
                in_app.use_feeds = enabled
            }
            (StepContent::InApp(in_app), DraftEdit::SelectFeed { feed, selected }) => {
                if selected {
                    in_app.feeds.insert(feed);
                } else {
                    in_app.feeds.remove(&feed);
                }
            }
            (StepContent::Sms(sms), DraftEdit::Text(text)) => sms.text = text,
            (StepContent::Chat(chat), DraftEdit::Text(text)) => chat.text = text,
            (StepContent::Push(push), DraftEdit::Text(text)) => push.text = text,
            (StepContent::Push(push), DraftEdit::Title(title)) => push.title = title,
            (
                StepContent::Digest(wait) | StepContent::Delay(wait),
                DraftEdit::Amount(amount),
            ) => wait.amount = amount,
            (StepContent::Digest(wait) | StepContent::Delay(wait), DraftEdit::Unit(unit)) => {
                wait.unit = unit
            }
            _ => return Err(not_applicable),
        }

        self.dirty = true;
        Ok(())
    }
}

/// Holds the single open draft of an editor session
#[derive(Debug, Default)]
pub struct DraftBuffer {
    open: Option<Draft>,
}

impl DraftBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&Draft> {
        self.open.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    /// Snapshot a step into a new draft, committing any draft already open.
    pub fn open(&mut self, template: &mut Template, step_id: &StepId) -> EditorResult<()> {
        template.get_step(step_id)?;
        self.commit(template)?;
        let snapshot = Draft::from_step(template.get_step(step_id)?);
        debug!(step_id = %step_id, "Opened step draft");
        self.open = Some(snapshot);
        Ok(())
    }

    pub fn edit(&mut self, edit: DraftEdit) -> EditorResult<()> {
        let draft = self.open.as_mut().ok_or(EditorError::NoDraftOpen)?;
        trace!(step_id = %draft.step_id, field = edit.field_name(), "Draft edit");
        draft.apply(edit)
    }

    /// Write the open draft back into the template and close it.
    ///
    /// Returns the committed step id, or `None` when no draft was open.
    /// Untouched drafts close without a write.
    pub fn commit(&mut self, template: &mut Template) -> EditorResult<Option<StepId>> {
        let Some(draft) = self.open.take() else {
            return Ok(None);
        };

        if draft.dirty {
            template.upsert_step_content(&draft.step_id, draft.content)?;
            debug!(step_id = %draft.step_id, "Committed step draft");
        }
        Ok(Some(draft.step_id))
    }

    /// Close the open draft without writing it
    pub fn discard(&mut self) -> Option<Draft> {
        let draft = self.open.take();
        if let Some(ref d) = draft {
            debug!(step_id = %d.step_id, "Discarded step draft");
        }
        draft
    }
}
