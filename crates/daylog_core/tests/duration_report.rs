use chrono_tz::Tz;
use daylog_core::db::open_db_in_memory;
use daylog_core::{
    EventDraft, EventService, SqliteEventRepository, SqliteUserRepository, User, UserRepository,
};
use rusqlite::Connection;

fn seeded_user(conn: &Connection) -> User {
    let user = User::new("report tester");
    SqliteUserRepository::try_new(conn)
        .unwrap()
        .create_user(&user)
        .unwrap();
    user
}

fn timed_draft(user: &User, start: &str, end: &str, description: &str) -> EventDraft {
    let mut draft = EventDraft::new(user.uuid, "2026-08-05", start, description);
    draft.end_time = Some(end.to_string());
    draft
}

#[test]
fn report_orders_longest_first_and_respects_the_limit() {
    let mut conn = open_db_in_memory().unwrap();
    let user = seeded_user(&conn);
    let repo = SqliteEventRepository::try_new(&mut conn).unwrap();
    let mut service = EventService::new(repo, Tz::UTC);

    service
        .create_event(&timed_draft(&user, "08:00", "08:30", "half hour walk"))
        .unwrap();
    service
        .create_event(&timed_draft(&user, "09:00", "09:45", "focused writing"))
        .unwrap();
    service
        .create_event(&timed_draft(&user, "10:00", "10:10", "quick call"))
        .unwrap();

    let report = service.longest_durations(Some(2)).unwrap();
    assert_eq!(
        report,
        vec![
            ("focused writing".to_string(), 45),
            ("half hour walk".to_string(), 30),
        ]
    );
}

#[test]
fn report_without_limit_returns_every_timed_event() {
    let mut conn = open_db_in_memory().unwrap();
    let user = seeded_user(&conn);
    let repo = SqliteEventRepository::try_new(&mut conn).unwrap();
    let mut service = EventService::new(repo, Tz::UTC);

    service
        .create_event(&timed_draft(&user, "08:00", "08:30", "walk"))
        .unwrap();
    service
        .create_event(&timed_draft(&user, "09:00", "09:45", "writing"))
        .unwrap();
    service
        .create_event(&timed_draft(&user, "10:00", "10:10", "call"))
        .unwrap();

    let report = service.longest_durations(None).unwrap();
    assert_eq!(report.len(), 3);
    assert_eq!(report[0].1, 45);
    assert_eq!(report[2].1, 10);
}

#[test]
fn open_ended_and_deleted_events_are_excluded() {
    let mut conn = open_db_in_memory().unwrap();
    let user = seeded_user(&conn);
    let repo = SqliteEventRepository::try_new(&mut conn).unwrap();
    let mut service = EventService::new(repo, Tz::UTC);

    service
        .create_event(&EventDraft::new(
            user.uuid,
            "2026-08-05",
            "08:00",
            "still running",
        ))
        .unwrap();
    let deleted = service
        .create_event(&timed_draft(&user, "09:00", "10:00", "removed later"))
        .unwrap();
    service.soft_delete_event(deleted.event.uuid).unwrap();
    service
        .create_event(&timed_draft(&user, "11:00", "11:20", "kept"))
        .unwrap();

    let report = service.longest_durations(None).unwrap();
    assert_eq!(report, vec![("kept".to_string(), 20)]);
}

#[test]
fn identical_text_descriptions_collapse_with_the_later_value_winning() {
    let mut conn = open_db_in_memory().unwrap();
    let user = seeded_user(&conn);
    let repo = SqliteEventRepository::try_new(&mut conn).unwrap();
    let mut service = EventService::new(repo, Tz::UTC);

    service
        .create_event(&timed_draft(&user, "08:00", "08:50", "repeat block"))
        .unwrap();
    service
        .create_event(&timed_draft(&user, "09:00", "09:20", "repeat block"))
        .unwrap();
    service
        .create_event(&timed_draft(&user, "10:00", "10:35", "unique block"))
        .unwrap();

    let report = service.longest_durations(None).unwrap();
    // Both "repeat block" rows collapse into the first position; the row
    // seen later (the shorter one) supplies the surviving value.
    assert_eq!(
        report,
        vec![
            ("repeat block".to_string(), 20),
            ("unique block".to_string(), 35),
        ]
    );
}

#[test]
fn the_limit_caps_rows_before_collapsing() {
    let mut conn = open_db_in_memory().unwrap();
    let user = seeded_user(&conn);
    let repo = SqliteEventRepository::try_new(&mut conn).unwrap();
    let mut service = EventService::new(repo, Tz::UTC);

    service
        .create_event(&timed_draft(&user, "08:00", "09:00", "twin"))
        .unwrap();
    service
        .create_event(&timed_draft(&user, "10:00", "10:40", "twin"))
        .unwrap();
    service
        .create_event(&timed_draft(&user, "11:00", "11:10", "solo"))
        .unwrap();

    // Limit 2 selects the 60- and 40-minute rows; they share one text and
    // collapse to a single entry, so "solo" never enters the report.
    let report = service.longest_durations(Some(2)).unwrap();
    assert_eq!(report, vec![("twin".to_string(), 40)]);
}
