use chrono::{NaiveDate, NaiveTime};
use daylog_core::db::migrations::latest_version;
use daylog_core::db::open_db_in_memory;
use daylog_core::{
    Event, EventListQuery, EventRepository, RepoError, SqliteEventRepository,
    SqliteUserRepository, User, UserRepository,
};
use rusqlite::Connection;

fn date(value: &str) -> NaiveDate {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").unwrap()
}

fn time(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
}

fn seeded_user(conn: &Connection) -> User {
    let user = User::new("crud tester");
    SqliteUserRepository::try_new(conn)
        .unwrap()
        .create_user(&user)
        .unwrap();
    user
}

fn sample_event(user: &User, day: &str, hour: u32, minute: u32, description: &str) -> Event {
    let mut event = Event::new(user.uuid, date(day), time(hour, minute), description);
    event.html_description = format!("<p>{description}</p>");
    event.text_description = description.to_string();
    event
}

#[test]
fn create_and_get_roundtrip() {
    let mut conn = open_db_in_memory().unwrap();
    let user = seeded_user(&conn);
    let repo = SqliteEventRepository::try_new(&mut conn).unwrap();

    let mut event = sample_event(&user, "2026-08-05", 9, 30, "first entry");
    event.end_time = Some(time(10, 45));
    event.duration = Some(75);
    let id = repo.create_event(&event).unwrap();

    let record = repo.get_event(id, false).unwrap().unwrap();
    assert_eq!(record.event, event);
    assert!(record.hash_tags.is_empty());
    assert!(record.created_at > 0);
    assert!(record.updated_at > 0);
}

#[test]
fn update_existing_event() {
    let mut conn = open_db_in_memory().unwrap();
    let user = seeded_user(&conn);
    let repo = SqliteEventRepository::try_new(&mut conn).unwrap();

    let mut event = sample_event(&user, "2026-08-05", 9, 30, "draft entry");
    repo.create_event(&event).unwrap();

    event.end_time = Some(time(10, 0));
    event.duration = Some(30);
    event.description = "finished entry".to_string();
    event.text_description = "finished entry".to_string();
    repo.update_event(&event).unwrap();

    let record = repo.get_event(event.uuid, false).unwrap().unwrap();
    assert_eq!(record.event.end_time, Some(time(10, 0)));
    assert_eq!(record.event.duration, Some(30));
    assert_eq!(record.event.description, "finished entry");
}

#[test]
fn update_not_found_returns_not_found() {
    let mut conn = open_db_in_memory().unwrap();
    let user = seeded_user(&conn);
    let repo = SqliteEventRepository::try_new(&mut conn).unwrap();

    let event = sample_event(&user, "2026-08-05", 9, 30, "missing");
    let err = repo.update_event(&event).unwrap_err();
    assert!(matches!(err, RepoError::NotFound(id) if id == event.uuid));
}

#[test]
fn validation_failure_blocks_create_and_update() {
    let mut conn = open_db_in_memory().unwrap();
    let user = seeded_user(&conn);
    let repo = SqliteEventRepository::try_new(&mut conn).unwrap();

    let invalid = sample_event(&user, "2026-08-05", 9, 30, "   ");
    let create_err = repo.create_event(&invalid).unwrap_err();
    assert!(matches!(create_err, RepoError::Validation(_)));

    let mut valid = sample_event(&user, "2026-08-05", 9, 30, "good window");
    valid.end_time = Some(time(10, 0));
    valid.duration = Some(30);
    repo.create_event(&valid).unwrap();

    valid.end_time = Some(time(9, 0));
    let update_err = repo.update_event(&valid).unwrap_err();
    assert!(matches!(update_err, RepoError::Validation(_)));
}

#[test]
fn list_excludes_deleted_by_default_and_can_include_them() {
    let mut conn = open_db_in_memory().unwrap();
    let user = seeded_user(&conn);
    let repo = SqliteEventRepository::try_new(&mut conn).unwrap();

    let event_a = sample_event(&user, "2026-08-05", 9, 0, "kept");
    let event_b = sample_event(&user, "2026-08-05", 10, 0, "deleted later");
    repo.create_event(&event_a).unwrap();
    repo.create_event(&event_b).unwrap();
    repo.soft_delete_event(event_b.uuid).unwrap();

    let visible = repo.list_events(&EventListQuery::default()).unwrap();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].event.uuid, event_a.uuid);

    let include_deleted = EventListQuery {
        include_deleted: true,
        ..EventListQuery::default()
    };
    let all = repo.list_events(&include_deleted).unwrap();
    assert_eq!(all.len(), 2);
}

#[test]
fn soft_delete_is_idempotent_and_stamps_deleted_at() {
    let mut conn = open_db_in_memory().unwrap();
    let user = seeded_user(&conn);
    let repo = SqliteEventRepository::try_new(&mut conn).unwrap();

    let event = sample_event(&user, "2026-08-05", 9, 0, "to delete");
    repo.create_event(&event).unwrap();

    repo.soft_delete_event(event.uuid).unwrap();
    let first = repo.get_event(event.uuid, true).unwrap().unwrap();
    let stamp = first.event.deleted_at.unwrap();
    assert!(first.event.is_deleted);
    assert!(stamp > 0);

    repo.soft_delete_event(event.uuid).unwrap();
    let second = repo.get_event(event.uuid, true).unwrap().unwrap();
    assert_eq!(second.event.deleted_at, Some(stamp));

    assert!(repo.get_event(event.uuid, false).unwrap().is_none());
}

#[test]
fn soft_delete_unknown_event_returns_not_found() {
    let mut conn = open_db_in_memory().unwrap();
    let _ = seeded_user(&conn);
    let repo = SqliteEventRepository::try_new(&mut conn).unwrap();

    let missing = uuid::Uuid::new_v4();
    let err = repo.soft_delete_event(missing).unwrap_err();
    assert!(matches!(err, RepoError::NotFound(id) if id == missing));
}

#[test]
fn list_filters_by_user_and_date_in_start_time_order() {
    let mut conn = open_db_in_memory().unwrap();
    let user_a = seeded_user(&conn);
    let user_b = seeded_user(&conn);
    let repo = SqliteEventRepository::try_new(&mut conn).unwrap();

    let late = sample_event(&user_a, "2026-08-05", 14, 0, "afternoon");
    let early = sample_event(&user_a, "2026-08-05", 8, 0, "morning");
    let other_day = sample_event(&user_a, "2026-08-06", 9, 0, "tomorrow");
    let other_user = sample_event(&user_b, "2026-08-05", 9, 0, "not mine");
    for event in [&late, &early, &other_day, &other_user] {
        repo.create_event(event).unwrap();
    }

    let query = EventListQuery {
        user_id: Some(user_a.uuid),
        date: Some(date("2026-08-05")),
        ..EventListQuery::default()
    };
    let day = repo.list_events(&query).unwrap();
    assert_eq!(day.len(), 2);
    assert_eq!(day[0].event.uuid, early.uuid);
    assert_eq!(day[1].event.uuid, late.uuid);
}

#[test]
fn list_pagination_with_limit_and_offset_is_stable() {
    let mut conn = open_db_in_memory().unwrap();
    let user = seeded_user(&conn);
    let repo = SqliteEventRepository::try_new(&mut conn).unwrap();

    let first = sample_event(&user, "2026-08-05", 8, 0, "a");
    let second = sample_event(&user, "2026-08-05", 9, 0, "b");
    let third = sample_event(&user, "2026-08-05", 10, 0, "c");
    for event in [&third, &first, &second] {
        repo.create_event(event).unwrap();
    }

    let query = EventListQuery {
        limit: Some(2),
        offset: 1,
        ..EventListQuery::default()
    };
    let page = repo.list_events(&query).unwrap();
    assert_eq!(page.len(), 2);
    assert_eq!(page[0].event.uuid, second.uuid);
    assert_eq!(page[1].event.uuid, third.uuid);

    let offset_only = EventListQuery {
        offset: 2,
        ..EventListQuery::default()
    };
    let tail = repo.list_events(&offset_only).unwrap();
    assert_eq!(tail.len(), 1);
    assert_eq!(tail[0].event.uuid, third.uuid);
}

#[test]
fn set_event_hash_tags_replaces_full_set() {
    let mut conn = open_db_in_memory().unwrap();
    let user = seeded_user(&conn);
    let mut repo = SqliteEventRepository::try_new(&mut conn).unwrap();

    let event = sample_event(&user, "2026-08-05", 9, 0, "tag target");
    repo.create_event(&event).unwrap();

    repo.set_event_hash_tags(
        event.uuid,
        user.uuid,
        &["work".to_string(), "focus".to_string()],
    )
    .unwrap();
    let first = repo.get_event(event.uuid, false).unwrap().unwrap();
    assert_eq!(first.hash_tags, vec!["focus".to_string(), "work".to_string()]);

    repo.set_event_hash_tags(event.uuid, user.uuid, &["personal".to_string()])
        .unwrap();
    let second = repo.get_event(event.uuid, false).unwrap().unwrap();
    assert_eq!(second.hash_tags, vec!["personal".to_string()]);
}

#[test]
fn hash_tags_are_scoped_per_user() {
    let mut conn = open_db_in_memory().unwrap();
    let user_a = seeded_user(&conn);
    let user_b = seeded_user(&conn);

    {
        let mut repo = SqliteEventRepository::try_new(&mut conn).unwrap();
        let event_a = sample_event(&user_a, "2026-08-05", 9, 0, "mine");
        let event_b = sample_event(&user_b, "2026-08-05", 9, 0, "theirs");
        repo.create_event(&event_a).unwrap();
        repo.create_event(&event_b).unwrap();
        repo.set_event_hash_tags(event_a.uuid, user_a.uuid, &["shared".to_string()])
            .unwrap();
        repo.set_event_hash_tags(event_b.uuid, user_b.uuid, &["shared".to_string()])
            .unwrap();
    }

    let rows: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM hash_tags WHERE name = 'shared';",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(rows, 2);
}

#[test]
fn set_event_hash_tags_for_unknown_event_returns_not_found() {
    let mut conn = open_db_in_memory().unwrap();
    let user = seeded_user(&conn);
    let mut repo = SqliteEventRepository::try_new(&mut conn).unwrap();

    let missing = uuid::Uuid::new_v4();
    let err = repo
        .set_event_hash_tags(missing, user.uuid, &["tag".to_string()])
        .unwrap_err();
    assert!(matches!(err, RepoError::NotFound(id) if id == missing));
}

#[test]
fn repository_rejects_uninitialized_connection() {
    let mut conn = Connection::open_in_memory().unwrap();

    let result = SqliteEventRepository::try_new(&mut conn);
    match result {
        Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version: 0,
        }) => assert!(expected_version > 0),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected uninitialized connection error"),
    }
}

#[test]
fn repository_rejects_connection_without_required_events_table() {
    let mut conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version()))
        .unwrap();

    let result = SqliteEventRepository::try_new(&mut conn);
    assert!(matches!(
        result,
        Err(RepoError::MissingRequiredTable("events"))
    ));
}

#[test]
fn repository_rejects_connection_missing_required_events_column() {
    let mut conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE users (uuid TEXT PRIMARY KEY NOT NULL);
         CREATE TABLE hash_tags (id INTEGER PRIMARY KEY, user_uuid TEXT, name TEXT);
         CREATE TABLE event_hash_tags (event_uuid TEXT, hash_tag_id INTEGER);
         CREATE TABLE events (
            uuid TEXT PRIMARY KEY NOT NULL,
            user_uuid TEXT NOT NULL,
            date TEXT NOT NULL,
            start_time TEXT NOT NULL,
            end_time TEXT,
            duration INTEGER,
            description TEXT NOT NULL
         );",
    )
    .unwrap();
    conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version()))
        .unwrap();

    let result = SqliteEventRepository::try_new(&mut conn);
    assert!(matches!(
        result,
        Err(RepoError::MissingRequiredColumn {
            table: "events",
            column: "html_description"
        })
    ));
}
