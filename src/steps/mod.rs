//! Step editing: the per-session draft buffer

pub mod draft;

pub use draft::{Draft, DraftBuffer, DraftEdit};
