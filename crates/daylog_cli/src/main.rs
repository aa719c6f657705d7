//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `daylog_core` wiring.
//! - Seed one demo day in memory and print the day view plus the
//!   longest-durations report, deterministically.

use chrono_tz::Tz;
use daylog_core::db::open_db_in_memory;
use daylog_core::{
    EventDraft, EventListQuery, EventService, SqliteEventRepository, SqliteUserRepository, User,
    UserRepository,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("daylog_core version={}", daylog_core::core_version());

    let mut conn = open_db_in_memory()?;
    let user = User::with_id(
        "11111111-2222-4333-8444-555555555555".parse()?,
        "demo user",
    );
    {
        let users = SqliteUserRepository::try_new(&conn)?;
        users.create_user(&user)?;
    }

    let repo = SqliteEventRepository::try_new(&mut conn)?;
    let mut service = EventService::new(repo, Tz::UTC);

    let mut breakfast = EventDraft::new(
        user.uuid,
        "2026-08-05",
        "08:00",
        "breakfast with #family",
    );
    breakfast.end_time = Some("08:30".to_string());
    service.create_event(&breakfast)?;

    let standup = EventDraft::new(user.uuid, "2026-08-05", "09:30", "daily #standup notes");
    service.create_event(&standup)?;

    let mut review = EventDraft::new(
        user.uuid,
        "2026-08-05",
        "10:15",
        "review the release **checklist**",
    );
    review.end_time = Some("11:30".to_string());
    review.ends_previous = true;
    service.create_event(&review)?;

    let day = service.list_events(&EventListQuery {
        user_id: Some(user.uuid),
        date: Some("2026-08-05".parse()?),
        ..EventListQuery::default()
    })?;

    println!("day view:");
    for record in &day {
        let end = record
            .event
            .end_time
            .map(|time| time.format("%H:%M").to_string())
            .unwrap_or_else(|| "--:--".to_string());
        println!(
            "  {} {}-{}  {}  tags=[{}]",
            record.event.date,
            record.event.start_time.format("%H:%M"),
            end,
            record.event.text_description,
            record.hash_tags.join(","),
        );
    }

    println!("longest durations:");
    for (text, minutes) in service.longest_durations(Some(3))? {
        println!("  {minutes:>4} min  {text}");
    }

    Ok(())
}
