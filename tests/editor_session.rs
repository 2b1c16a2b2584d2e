//! Integration tests for the editor session
//!
//! These drive `EditorSession` through its public API against the in-memory
//! collaborators (and the JSON file store for the round trip), covering:
//! - edits surviving navigation between step editors
//! - step deletion, the confirmation gate and order compaction
//! - validation flags and navigation badges
//! - submission success, failure and the trigger snippet
//! - environment switching and the logo upload guard

use std::sync::Arc;

use tempfile::TempDir;

use notiflow::api::{
    Branding, Collaborators, EnvironmentProvider, InMemoryBackend, JsonFileRepository,
    TemplateRepository,
};
use notiflow::editor::{
    email_body, Confirmed, EditorSession, EnvironmentSwitch, LogoUpload, PendingAction,
    SessionOptions, SubmitOutcome, View,
};
use notiflow::error::EditorError;
use notiflow::steps::DraftEdit;
use notiflow::templates::schema::{
    EmailEditorMode, Environment, StepContent, StepId, StepType, TemplateId,
};
use notiflow::validation::{Field, NavBadges};

// ─── Helpers ──────────────────────────────────────────────────────────────────

async fn new_session(backend: &Arc<InMemoryBackend>, name: &str) -> EditorSession {
    EditorSession::create(
        Collaborators::in_memory(backend.clone()),
        name,
        SessionOptions::default(),
    )
    .await
    .unwrap()
}

fn text_of(session: &EditorSession, step_id: &StepId) -> String {
    match &session.step(step_id).unwrap().content {
        StepContent::InApp(c) => c.text.clone(),
        StepContent::Sms(c) | StepContent::Chat(c) => c.text.clone(),
        other => panic!("Expected text content, got {:?}", other),
    }
}

fn orders(session: &EditorSession) -> Vec<usize> {
    session.template().steps.iter().map(|s| s.order).collect()
}

async fn save(session: &mut EditorSession) -> TemplateId {
    match session.submit().await.unwrap() {
        SubmitOutcome::Saved { id, .. } => id,
        SubmitOutcome::Invalid(v) => panic!("Unexpected validation errors: {:?}", v),
    }
}

// ─── Navigation ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_switching_steps_preserves_edits() {
    let backend = Arc::new(InMemoryBackend::new());
    let mut session = new_session(&backend, "Switching").await;
    let a = session.push_step(StepType::InApp).unwrap();
    let b = session.push_step(StepType::Sms).unwrap();

    session.open_step(&a).unwrap();
    session.edit(DraftEdit::Text("Hello".into())).unwrap();
    session.open_step(&b).unwrap();
    session.edit(DraftEdit::Text("SMS body".into())).unwrap();
    session.open_step(&a).unwrap();

    // the draft of A reopens with its committed edits
    match session.draft().unwrap().content() {
        StepContent::InApp(c) => assert_eq!(c.text, "Hello"),
        other => panic!("Expected in-app draft, got {:?}", other),
    }
    session.edit(DraftEdit::Text("Hello {{firstName}}".into())).unwrap();
    session.go_back().unwrap();
    session.open_settings().unwrap();
    session.open_workflow().unwrap();

    assert_eq!(session.view(), &View::Graph);
    assert_eq!(text_of(&session, &a), "Hello {{firstName}}");
    assert_eq!(text_of(&session, &b), "SMS body");
}

#[tokio::test]
async fn test_email_editor_mode_round_trip() {
    let backend = Arc::new(InMemoryBackend::new());
    let mut session = new_session(&backend, "Modes").await;
    let email = session.push_step(StepType::Email).unwrap();

    session.open_step(&email).unwrap();
    session
        .edit(DraftEdit::BlockText {
            index: 0,
            text: "visual body".into(),
        })
        .unwrap();
    session
        .edit(DraftEdit::EditorMode(EmailEditorMode::CustomCode))
        .unwrap();
    session.edit(DraftEdit::Html("<p>code</p>".into())).unwrap();
    session.go_back().unwrap();

    session.open_step(&email).unwrap();
    session
        .edit(DraftEdit::EditorMode(EmailEditorMode::Visual))
        .unwrap();
    session.go_back().unwrap();

    match &session.step(&email).unwrap().content {
        StepContent::Email(c) => {
            assert_eq!(c.editor_mode, EmailEditorMode::Visual);
            assert_eq!(c.blocks[0].content, "visual body");
            assert_eq!(c.html, "<p>code</p>");
        }
        other => panic!("Expected email content, got {:?}", other),
    }
}

// ─── Step store ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_delete_requires_confirmation() {
    let backend = Arc::new(InMemoryBackend::new());
    let mut session = new_session(&backend, "Delete").await;
    let first = session.push_step(StepType::InApp).unwrap();
    let middle = session.push_step(StepType::Email).unwrap();
    let last = session.push_step(StepType::Sms).unwrap();

    assert!(session.request_delete_step(&middle).unwrap().is_none());
    assert_eq!(
        session.pending(),
        Some(&PendingAction::DeleteStep(middle.clone()))
    );
    assert_eq!(session.template().step_count(), 3);

    session.cancel().unwrap();
    assert_eq!(session.template().step_count(), 3);

    session.request_delete_step(&middle).unwrap();
    match session.confirm().unwrap() {
        Confirmed::StepDeleted(step) => assert_eq!(step.id, middle),
        other => panic!("Expected deletion, got {:?}", other),
    }

    let ids: Vec<StepId> = session.template().steps.iter().map(|s| s.id.clone()).collect();
    assert_eq!(ids, vec![first, last]);
    assert_eq!(orders(&session), vec![0, 1]);
    assert!(matches!(
        session.step(&middle),
        Err(EditorError::StepNotFound(_))
    ));
}

#[tokio::test]
async fn test_delete_without_confirmation_gate() {
    let backend = Arc::new(InMemoryBackend::new());
    let options = SessionOptions {
        confirm_destructive: false,
        ..SessionOptions::default()
    };
    let mut session = EditorSession::create(Collaborators::in_memory(backend), "Quick", options)
        .await
        .unwrap();
    let a = session.push_step(StepType::Sms).unwrap();
    let b = session.push_step(StepType::Sms).unwrap();

    let removed = session.request_delete_step(&a).unwrap().unwrap();
    assert_eq!(removed.id, a);
    assert!(session.pending().is_none());
    assert_eq!(session.template().steps[0].id, b);
    assert_eq!(orders(&session), vec![0]);
}

#[tokio::test]
async fn test_deleting_step_under_edit_returns_to_graph() {
    let backend = Arc::new(InMemoryBackend::new());
    let mut session = new_session(&backend, "Delete open").await;
    let a = session.push_step(StepType::Sms).unwrap();
    let b = session.push_step(StepType::Sms).unwrap();

    session.open_step(&a).unwrap();
    session.request_delete_step(&a).unwrap();
    session.confirm().unwrap();
    assert_eq!(session.view(), &View::Graph);
    assert!(session.draft().is_none());

    // deleting another step keeps the current editor open
    let c = session.push_step(StepType::Sms).unwrap();
    session.open_step(&b).unwrap();
    session.edit(DraftEdit::Text("kept".into())).unwrap();
    session.request_delete_step(&c).unwrap();
    session.confirm().unwrap();
    assert_eq!(session.view(), &View::StepEditor(b.clone()));
    assert_eq!(text_of(&session, &b), "kept");
}

#[tokio::test]
async fn test_insert_shifts_following_steps() {
    let backend = Arc::new(InMemoryBackend::new());
    let mut session = new_session(&backend, "Insert").await;
    let a = session.push_step(StepType::InApp).unwrap();
    let c = session.push_step(StepType::Sms).unwrap();

    let b = session.insert_step(StepType::Delay, 1).unwrap();
    let ids: Vec<StepId> = session.template().steps.iter().map(|s| s.id.clone()).collect();
    assert_eq!(ids, vec![a, b.clone(), c]);
    assert_eq!(orders(&session), vec![0, 1, 2]);
    assert!(session.step(&b).unwrap().active);

    let err = session.insert_step(StepType::Sms, 9).unwrap_err();
    assert_eq!(err, EditorError::InvalidIndex { index: 9, len: 3 });
    assert_eq!(session.template().step_count(), 3);
}

#[tokio::test]
async fn test_toggle_step_twice() {
    let backend = Arc::new(InMemoryBackend::new());
    let mut session = new_session(&backend, "Toggle").await;
    let step = session.push_step(StepType::InApp).unwrap();

    assert_eq!(session.step(&step).unwrap().status_label(), "Step is active");
    assert!(!session.toggle_step_active(&step).unwrap());
    assert_eq!(
        session.step(&step).unwrap().status_label(),
        "Step is not active"
    );
    assert!(session.toggle_step_active(&step).unwrap());
    assert_eq!(session.step(&step).unwrap().status_label(), "Step is active");
}

// ─── Validation ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_title_and_subject_errors_clear_independently() {
    let backend = Arc::new(InMemoryBackend::new());
    let mut session = new_session(&backend, "").await;
    let email = session.push_step(StepType::Email).unwrap();

    let validation = session.validation();
    assert!(validation.template_errors.contains(&Field::Title));
    assert!(validation.errors_for(&email).contains(&Field::Subject));
    assert_eq!(
        session.badges(),
        NavBadges {
            workflow: true,
            settings: true
        }
    );

    session.set_name("Named").unwrap();
    let validation = session.validation();
    assert!(validation.template_errors.is_empty());
    assert!(validation.errors_for(&email).contains(&Field::Subject));

    session.open_step(&email).unwrap();
    session.edit(DraftEdit::Subject("Subject".into())).unwrap();
    session.go_back().unwrap();
    assert!(session.validation().is_valid());
}

#[tokio::test]
async fn test_open_draft_does_not_surface_errors() {
    let backend = Arc::new(InMemoryBackend::new());
    let mut session = new_session(&backend, "Typing").await;
    let sms = session.push_step(StepType::Sms).unwrap();

    session.open_step(&sms).unwrap();
    session.edit(DraftEdit::Text("typed".into())).unwrap();
    assert!(session.validation().step_has_errors(&sms));

    session.go_back().unwrap();
    assert!(!session.validation().step_has_errors(&sms));
}

#[tokio::test]
async fn test_settings_gate_blocks_workflow_without_title() {
    let backend = Arc::new(InMemoryBackend::new());
    let mut session = new_session(&backend, "").await;

    session.open_settings().unwrap();
    assert_eq!(
        session.open_workflow(),
        Err(EditorError::SettingsIncomplete)
    );
    session.set_name("Now titled").unwrap();
    session.open_workflow().unwrap();
    assert_eq!(session.view(), &View::Graph);
}

#[tokio::test]
async fn test_back_from_settings_is_gated_on_title() {
    let backend = Arc::new(InMemoryBackend::new());
    let mut session = new_session(&backend, "").await;

    session.open_settings().unwrap();
    assert_eq!(session.go_back(), Err(EditorError::SettingsIncomplete));
    assert_eq!(session.view(), &View::Settings);

    session.set_name("Titled after all").unwrap();
    session.go_back().unwrap();
    assert_eq!(session.view(), &View::Graph);
}

// ─── Feeds ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_created_feed_binds_to_open_in_app_draft() {
    let backend = Arc::new(InMemoryBackend::with_feeds(&["news"]));
    let mut session = new_session(&backend, "Feeds").await;
    let in_app = session.push_step(StepType::InApp).unwrap();

    session.open_step(&in_app).unwrap();
    let feed = session.create_feed("test4").await.unwrap();
    session.select_feed_by_index(1, true).unwrap();
    assert!(matches!(
        session.select_feed_by_index(3, true),
        Err(EditorError::FeedNotFound(_))
    ));
    session.edit(DraftEdit::Text("Feed text".into())).unwrap();
    session.go_back().unwrap();

    assert_eq!(session.feeds().index_of(&feed.id), Some(2));
    match &session.step(&in_app).unwrap().content {
        StepContent::InApp(c) => {
            assert!(c.use_feeds);
            assert_eq!(c.feeds.len(), 2);
            assert!(c.feeds.contains(&feed.id));
        }
        other => panic!("Expected in-app content, got {:?}", other),
    }
    assert!(session.validation().is_valid());
}

// ─── Submission ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_round_trip_through_submit_and_reload() {
    let backend = Arc::new(InMemoryBackend::new());
    let mut session = new_session(&backend, "Round Trip").await;
    let email = session.push_step(StepType::Email).unwrap();

    session.open_step(&email).unwrap();
    session.edit(DraftEdit::Subject("S".into())).unwrap();
    session
        .edit(DraftEdit::BlockText {
            index: 0,
            text: "B {{x}}".into(),
        })
        .unwrap();

    // submit straight from the step editor; the open draft is included
    let (id, snippet) = match session.submit().await.unwrap() {
        SubmitOutcome::Saved { id, snippet } => (id, snippet),
        SubmitOutcome::Invalid(v) => panic!("Unexpected validation errors: {:?}", v),
    };
    assert!(matches!(session.view(), View::TriggerSnippet(_)));
    assert_eq!(snippet.identifier, "round-trip");
    assert_eq!(snippet.variables, vec!["x"]);
    session.close_snippet();
    assert_eq!(session.view(), &View::Graph);

    let reloaded = EditorSession::load(
        Collaborators::in_memory(backend.clone()),
        &id,
        SessionOptions::default(),
    )
    .await
    .unwrap();
    let step = reloaded.step(&email).unwrap();
    match &step.content {
        StepContent::Email(c) => assert_eq!(c.subject, "S"),
        other => panic!("Expected email content, got {:?}", other),
    }
    assert_eq!(email_body(step).as_deref(), Some("B {{x}}"));
    assert_eq!(reloaded.template().trigger_identifier, "round-trip");
}

#[tokio::test]
async fn test_round_trip_through_file_store() {
    let temp_dir = TempDir::new().unwrap();
    let backend = Arc::new(InMemoryBackend::new());
    let store = Arc::new(JsonFileRepository::new(temp_dir.path()));
    let collaborators = Collaborators::in_memory(backend).with_templates(store.clone());

    let mut session =
        EditorSession::create(collaborators.clone(), "On Disk", SessionOptions::default())
            .await
            .unwrap();
    let sms = session.push_step(StepType::Sms).unwrap();
    session.open_step(&sms).unwrap();
    session.edit(DraftEdit::Text("Hi {{name}}".into())).unwrap();
    session.go_back().unwrap();
    let id = save(&mut session).await;

    // a second save updates the same record
    session.set_description("second save").unwrap();
    assert_eq!(save(&mut session).await, id);

    let listed = store.list_templates(Environment::Development).await.unwrap();
    assert_eq!(listed.len(), 1);

    let reloaded = EditorSession::load(collaborators, &id, SessionOptions::default())
        .await
        .unwrap();
    assert_eq!(text_of(&reloaded, &sms), "Hi {{name}}");
    assert_eq!(reloaded.template().description, "second save");
}

#[tokio::test]
async fn test_failed_submission_leaves_state_unchanged() {
    let backend = Arc::new(InMemoryBackend::new());
    let mut session = new_session(&backend, "Fails").await;
    let sms = session.push_step(StepType::Sms).unwrap();
    session.open_step(&sms).unwrap();
    session.edit(DraftEdit::Text("pending".into())).unwrap();

    backend.fail_writes(true);
    let err = session.submit().await.unwrap_err();
    assert!(matches!(err, EditorError::SubmissionFailed(_)));
    assert!(!session.is_submitting());
    assert!(!session.template().is_persisted());
    assert_eq!(session.view(), &View::StepEditor(sms.clone()));
    assert!(session.draft().unwrap().is_dirty());
    assert_eq!(text_of(&session, &sms), "");

    // resubmission is allowed
    backend.fail_writes(false);
    save(&mut session).await;
    assert!(session.template().is_persisted());
    assert_eq!(text_of(&session, &sms), "pending");
    assert_eq!(backend.write_count(), 2);
}

#[tokio::test]
async fn test_snippet_lists_every_variable_once() {
    let backend = Arc::new(InMemoryBackend::new());
    let mut session = new_session(&backend, "Test SMS Notification Title").await;
    let sms = session.push_step(StepType::Sms).unwrap();
    let in_app = session.push_step(StepType::InApp).unwrap();

    session.open_step(&sms).unwrap();
    session
        .edit(DraftEdit::Text("{{firstName}} someone assigned you to {{taskName}}".into()))
        .unwrap();
    session.open_step(&in_app).unwrap();
    session
        .edit(DraftEdit::Text("{{taskName}} for {{firstName}}".into()))
        .unwrap();
    session.go_back().unwrap();

    let snippet = session.snippet().unwrap();
    assert_eq!(snippet.variables, vec!["firstName", "taskName"]);
    assert_eq!(snippet.code.matches("firstName").count(), 1);
    assert_eq!(snippet.code.matches("taskName").count(), 1);
    assert!(snippet.code.contains("'test-sms-notification-title'"));
    assert_eq!(session.snippet().unwrap(), snippet);
}

// ─── Template settings ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_template_status_persists_immediately() {
    let backend = Arc::new(InMemoryBackend::new());
    let mut session = new_session(&backend, "Status").await;
    let id = save(&mut session).await;

    backend.fail_writes(true);
    assert!(session.set_active(false).await.is_err());
    assert!(session.template().active);
    assert_eq!(session.template().status_label(), "Enabled");

    backend.fail_writes(false);
    assert!(!session.toggle_active().await.unwrap());
    assert_eq!(session.template().status_label(), "Disabled");
    let stored = backend
        .get_template(Environment::Development, &id)
        .await
        .unwrap()
        .unwrap();
    assert!(!stored.active);

    assert!(session.toggle_active().await.unwrap());
    assert_eq!(session.template().status_label(), "Enabled");
}

// ─── Environments ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_switch_environment_leaves_when_template_missing() {
    let backend = Arc::new(InMemoryBackend::new());
    let mut session = new_session(&backend, "Dev only").await;
    let id = save(&mut session).await;

    match session.switch_environment(Environment::Production).await {
        EnvironmentSwitch::NavigatedAway { template_id } => assert_eq!(template_id, Some(id)),
        EnvironmentSwitch::Reloaded(_) => panic!("Template should not exist in production"),
        EnvironmentSwitch::Failed { error, .. } => panic!("Switch failed: {}", error),
    }
}

#[tokio::test]
async fn test_switch_environment_reloads_promoted_template() {
    let backend = Arc::new(InMemoryBackend::new());
    let mut session = new_session(&backend, "Promoted").await;
    let sms = session.push_step(StepType::Sms).unwrap();
    session.open_step(&sms).unwrap();
    session.edit(DraftEdit::Text("Live".into())).unwrap();
    session.go_back().unwrap();
    let id = save(&mut session).await;

    backend
        .insert_template(Environment::Production, session.template())
        .await;

    // unsaved dev edits do not follow the switch
    session.open_step(&sms).unwrap();
    session.edit(DraftEdit::Text("dev only".into())).unwrap();

    match session.switch_environment(Environment::Production).await {
        EnvironmentSwitch::Reloaded(prod) => {
            assert_eq!(prod.environment(), Environment::Production);
            assert_eq!(prod.template().id, Some(id));
            assert_eq!(prod.view(), &View::Graph);
            assert!(prod.draft().is_none());
            assert_eq!(text_of(&prod, &sms), "Live");
        }
        EnvironmentSwitch::NavigatedAway { .. } => panic!("Template exists in production"),
        EnvironmentSwitch::Failed { error, .. } => panic!("Switch failed: {}", error),
    }
}

#[tokio::test]
async fn test_unsaved_template_navigates_away_on_switch() {
    let backend = Arc::new(InMemoryBackend::new());
    let session = new_session(&backend, "Never saved").await;

    match session.switch_environment(Environment::Production).await {
        EnvironmentSwitch::NavigatedAway { template_id } => assert!(template_id.is_none()),
        EnvironmentSwitch::Reloaded(_) => panic!("Unsaved template cannot reload"),
        EnvironmentSwitch::Failed { error, .. } => panic!("Switch failed: {}", error),
    }
}

#[tokio::test]
async fn test_failed_switch_hands_back_session_with_draft() {
    let backend = Arc::new(InMemoryBackend::new());
    let mut session = new_session(&backend, "Stays put").await;
    let sms = session.push_step(StepType::Sms).unwrap();
    session.open_step(&sms).unwrap();
    session.edit(DraftEdit::Text("saved".into())).unwrap();
    save(&mut session).await;
    session.open_step(&sms).unwrap();
    session.edit(DraftEdit::Text("unsaved work".into())).unwrap();

    backend.fail_writes(true);
    let session = match session.switch_environment(Environment::Production).await {
        EnvironmentSwitch::Failed { session, error } => {
            assert!(matches!(error, EditorError::Collaborator(_)));
            session
        }
        EnvironmentSwitch::Reloaded(_) => panic!("Switch should have failed"),
        EnvironmentSwitch::NavigatedAway { .. } => panic!("Switch should have failed"),
    };
    backend.fail_writes(false);

    assert_eq!(session.environment(), Environment::Development);
    assert_eq!(
        backend.current_environment().await,
        Environment::Development
    );
    assert_eq!(session.view(), &View::StepEditor(sms.clone()));
    let draft = session.draft().unwrap();
    assert!(draft.is_dirty());
    match draft.content() {
        StepContent::Sms(c) => assert_eq!(c.text, "unsaved work"),
        other => panic!("Expected SMS content, got {:?}", other),
    }
}

// ─── Assets ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_logo_upload_requires_branding() {
    let backend = Arc::new(InMemoryBackend::new());
    let mut session = new_session(&backend, "Logo").await;
    let email = session.push_step(StepType::Email).unwrap();
    session.open_step(&email).unwrap();
    session.edit(DraftEdit::Subject("Branded".into())).unwrap();

    let outcome = session
        .request_logo_upload("logo.png", b"png-bytes")
        .await
        .unwrap();
    assert_eq!(outcome, LogoUpload::ConfirmRedirect);
    assert_eq!(
        session.pending(),
        Some(&PendingAction::LeaveForBrandingSettings)
    );
    assert!(backend.uploads().await.is_empty());

    // the draft was committed before the guard and editing continues
    assert_eq!(session.view(), &View::StepEditor(email.clone()));
    match &session.step(&email).unwrap().content {
        StepContent::Email(c) => assert_eq!(c.subject, "Branded"),
        other => panic!("Expected email content, got {:?}", other),
    }

    assert_eq!(session.confirm().unwrap(), Confirmed::RedirectToSettings);
    assert_eq!(session.view(), &View::Settings);
    assert!(session.draft().is_none());
    assert!(session.pending().is_none());
}

#[tokio::test]
async fn test_logo_upload_keeps_pending_delete() {
    let backend = Arc::new(InMemoryBackend::new());
    let mut session = new_session(&backend, "Logo").await;
    let email = session.push_step(StepType::Email).unwrap();
    let sms = session.push_step(StepType::Sms).unwrap();
    session.request_delete_step(&sms).unwrap();

    let err = session
        .request_logo_upload("logo.png", b"png-bytes")
        .await
        .unwrap_err();
    assert_eq!(err, EditorError::ConfirmationPending);
    assert_eq!(session.pending(), Some(&PendingAction::DeleteStep(sms.clone())));

    match session.confirm().unwrap() {
        Confirmed::StepDeleted(step) => assert_eq!(step.id, sms),
        other => panic!("Expected deletion, got {:?}", other),
    }
    assert!(session.step(&email).is_ok());
}

#[tokio::test]
async fn test_logo_upload_with_branding() {
    let backend = Arc::new(InMemoryBackend::new());
    backend
        .set_branding(Some(Branding {
            logo: Some("https://cdn.example.com/logo.png".into()),
            color: None,
        }))
        .await;
    let mut session = new_session(&backend, "Logo").await;

    match session
        .request_logo_upload("header.png", b"png-bytes")
        .await
        .unwrap()
    {
        LogoUpload::Uploaded(url) => assert!(url.ends_with("/header.png")),
        LogoUpload::ConfirmRedirect => panic!("Branding is configured"),
    }
    assert_eq!(backend.uploads().await.len(), 1);
    assert!(session.pending().is_none());
}
