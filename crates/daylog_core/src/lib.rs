//! Core domain logic for Daylog.
//! This crate is the single source of truth for business invariants.

pub mod db;
pub mod hashtag;
pub mod logging;
pub mod markdown;
pub mod model;
pub mod repo;
pub mod service;

pub use hashtag::{HashTagExtractor, RegexHashTagExtractor};
pub use logging::{default_log_level, init_logging, logging_status};
pub use markdown::{MarkdownRenderer, RegexMarkdownRenderer, Rendering};
pub use model::event::{
    duration_minutes, Event, EventDraft, EventField, EventId, EventValidationError, FieldError,
    FieldErrorKind, ParsedDraft, MAX_DESCRIPTION_CHARS,
};
pub use model::user::{User, UserId};
pub use repo::event_repo::{
    EventListQuery, EventRecord, EventRepository, RepoError, RepoResult, SqliteEventRepository,
};
pub use repo::user_repo::{SqliteUserRepository, UserRepository};
pub use service::event_service::{EventService, EventServiceError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
