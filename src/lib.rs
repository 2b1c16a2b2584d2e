//! Notiflow - state model for a notification workflow editor
//!
//! A template is an ordered list of delivery steps. The editor keeps one
//! draft per open step, commits it on every navigation, validates committed
//! state, and renders a trigger snippet once the template is saved.

pub mod api;
pub mod config;
pub mod editor;
pub mod error;
pub mod feeds;
pub mod logging;
pub mod snippet;
pub mod steps;
pub mod templates;
pub mod validation;

pub use editor::{EditorSession, SessionOptions, View};
pub use error::{EditorError, EditorResult};
