//! Event use-case service.
//!
//! # Responsibility
//! - Provide create/update/get/list/delete entry points for events.
//! - Keep derived fields in sync: duration from the time fields, hashtags
//!   and renderings from the description.
//! - Run the close-previous chain step after creation when requested.
//!
//! # Invariants
//! - `duration` is recomputed only when `start_time` or `end_time` changed,
//!   and is `None` while no end time exists.
//! - Hashtags and both renderings are recomputed exactly when `description`
//!   changed; an unchanged description leaves them untouched.
//! - Change detection compares stored values against the incoming draft
//!   explicitly; there is no hidden dirty tracking.
//! - A missing previous event in the chain step is a no-op, not an error.

use crate::hashtag::{HashTagExtractor, RegexHashTagExtractor};
use crate::markdown::{MarkdownRenderer, RegexMarkdownRenderer};
use crate::model::event::{
    duration_minutes, Event, EventDraft, EventId, EventValidationError,
};
use crate::repo::event_repo::{
    EventListQuery, EventRecord, EventRepository, RepoError, RepoResult,
};
use chrono_tz::Tz;
use log::debug;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for event use-cases.
#[derive(Debug)]
pub enum EventServiceError {
    /// Draft input failed field validation.
    Validation(EventValidationError),
    /// Target event does not exist or is deleted.
    EventNotFound(EventId),
    /// Persistence-layer failure.
    Repo(RepoError),
    /// Internal consistency mismatch between write and read-back.
    InconsistentState(&'static str),
}

impl Display for EventServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::EventNotFound(event_id) => write!(f, "event not found: {event_id}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => write!(f, "inconsistent event state: {details}"),
        }
    }
}

impl Error for EventServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for EventServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(event_id) => Self::EventNotFound(event_id),
            other => Self::Repo(other),
        }
    }
}

impl From<EventValidationError> for EventServiceError {
    fn from(value: EventValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Event service facade over repository and collaborator implementations.
///
/// The time zone is threaded explicitly into every date/time combination;
/// there is no ambient zone.
pub struct EventService<R, M = RegexMarkdownRenderer, H = RegexHashTagExtractor> {
    repo: R,
    tz: Tz,
    markdown: M,
    extractor: H,
}

impl<R: EventRepository> EventService<R> {
    /// Creates a service with the default regex collaborators.
    pub fn new(repo: R, tz: Tz) -> Self {
        Self {
            repo,
            tz,
            markdown: RegexMarkdownRenderer,
            extractor: RegexHashTagExtractor,
        }
    }
}

impl<R, M, H> EventService<R, M, H>
where
    R: EventRepository,
    M: MarkdownRenderer,
    H: HashTagExtractor,
{
    /// Creates a service with caller-provided collaborator implementations.
    pub fn with_collaborators(repo: R, tz: Tz, markdown: M, extractor: H) -> Self {
        Self {
            repo,
            tz,
            markdown,
            extractor,
        }
    }

    /// Returns the time zone used for date/time combination.
    pub fn time_zone(&self) -> Tz {
        self.tz
    }

    /// Creates one event from a draft.
    ///
    /// Validates all fields, derives duration/hashtags/renderings, persists
    /// the record with its hashtag links, then runs the chain step when the
    /// draft's `ends_previous` flag is set.
    pub fn create_event(&mut self, draft: &EventDraft) -> Result<EventRecord, EventServiceError> {
        let parsed = draft.validate()?;

        let hash_tags = self.extractor.extract(&parsed.description);
        let rendering = self.markdown.render(&parsed.description, &hash_tags);

        let mut event = Event::new(
            draft.user_id,
            parsed.date,
            parsed.start_time,
            parsed.description,
        );
        event.end_time = parsed.end_time;
        event.duration = parsed
            .end_time
            .map(|end| duration_minutes(event.date, event.start_time, end, self.tz));
        event.html_description = rendering.html;
        event.text_description = rendering.text;

        let event_id = self.repo.create_event(&event)?;
        self.repo
            .set_event_hash_tags(event_id, event.user_uuid, &hash_tags)?;

        if draft.ends_previous {
            self.close_previous_open_event(&event)?;
        }

        self.repo
            .get_event(event_id, false)?
            .ok_or(EventServiceError::InconsistentState(
                "created event not found in read-back",
            ))
    }

    /// Replaces an event's fields with the draft, full-replacement
    /// semantics.
    ///
    /// Stored values are compared against the validated draft field by
    /// field: duration is re-derived only when a time field changed, and
    /// hashtags/renderings only when the description changed. The stored
    /// owner is kept and the draft's `ends_previous` flag is ignored.
    pub fn update_event(
        &mut self,
        event_id: EventId,
        draft: &EventDraft,
    ) -> Result<EventRecord, EventServiceError> {
        let existing = self
            .repo
            .get_event(event_id, false)?
            .ok_or(EventServiceError::EventNotFound(event_id))?;
        let current = existing.event;

        let parsed = draft.validate()?;

        let times_changed =
            parsed.start_time != current.start_time || parsed.end_time != current.end_time;
        let description_changed = parsed.description != current.description;

        let mut updated = current;
        updated.date = parsed.date;
        updated.start_time = parsed.start_time;
        updated.end_time = parsed.end_time;

        if times_changed {
            updated.duration = parsed
                .end_time
                .map(|end| duration_minutes(updated.date, updated.start_time, end, self.tz));
        }

        let new_hash_tags = if description_changed {
            let tags = self.extractor.extract(&parsed.description);
            let rendering = self.markdown.render(&parsed.description, &tags);
            updated.description = parsed.description;
            updated.html_description = rendering.html;
            updated.text_description = rendering.text;
            Some(tags)
        } else {
            None
        };

        self.repo.update_event(&updated)?;
        if let Some(tags) = new_hash_tags {
            self.repo
                .set_event_hash_tags(event_id, updated.user_uuid, &tags)?;
        }

        self.repo
            .get_event(event_id, false)?
            .ok_or(EventServiceError::InconsistentState(
                "updated event not found in read-back",
            ))
    }

    /// Gets one event by stable ID with optional deleted-row visibility.
    pub fn get_event(
        &self,
        event_id: EventId,
        include_deleted: bool,
    ) -> RepoResult<Option<EventRecord>> {
        self.repo.get_event(event_id, include_deleted)
    }

    /// Lists events using filter and pagination options.
    pub fn list_events(&self, query: &EventListQuery) -> RepoResult<Vec<EventRecord>> {
        self.repo.list_events(query)
    }

    /// Soft-deletes an event by ID, stamping the deletion instant.
    pub fn soft_delete_event(&self, event_id: EventId) -> RepoResult<()> {
        self.repo.soft_delete_event(event_id)
    }

    /// Returns the longest-duration report: `(text_description, duration)`
    /// entries, longest first, capped by `limit` before collapsing.
    ///
    /// Entries rendering identical text collapse into one: the first
    /// occurrence keeps its position and the later duration wins.
    pub fn longest_durations(&self, limit: Option<u32>) -> RepoResult<Vec<(String, i64)>> {
        let rows = self.repo.longest_durations(limit)?;
        let mut ordered: Vec<(String, i64)> = Vec::with_capacity(rows.len());
        for (text, duration) in rows {
            if let Some(entry) = ordered.iter_mut().find(|(key, _)| *key == text) {
                entry.1 = duration;
            } else {
                ordered.push((text, duration));
            }
        }
        Ok(ordered)
    }

    fn close_previous_open_event(&mut self, event: &Event) -> Result<(), EventServiceError> {
        let previous =
            self.repo
                .latest_open_event_before(event.user_uuid, event.date, event.start_time)?;
        let Some(mut previous) = previous else {
            debug!(
                "event=close_previous module=service status=noop user={} date={}",
                event.user_uuid, event.date
            );
            return Ok(());
        };

        previous.end_time = Some(event.start_time);
        previous.duration = Some(duration_minutes(
            previous.date,
            previous.start_time,
            event.start_time,
            self.tz,
        ));
        self.repo.update_event(&previous)?;
        Ok(())
    }
}
