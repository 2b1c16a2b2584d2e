//! Template editor: view state machine plus the session that ties the step
//! store, draft buffer, validation and collaborators together.

pub mod navigation;
pub mod session;

pub use navigation::{Navigator, View};
pub use session::{
    email_body, BeginSubmit, Confirmed, EditorSession, EnvironmentSwitch, LogoUpload,
    PendingAction, SessionOptions, SubmissionRequest, SubmitOutcome,
};
