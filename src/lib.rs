//! Client-side conversation state for a hosted chat backend.
//!
//! The [`session::ChatController`] owns the active session and the list of
//! saved conversations and talks to the backend through an
//! [`api::ChatGateway`]. The [`render`] module turns controller snapshots into
//! something a terminal can show.

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod identity;
pub mod render;
pub mod session;

pub use error::AppError;
