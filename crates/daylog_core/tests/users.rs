use daylog_core::db::open_db_in_memory;
use daylog_core::{RepoError, SqliteUserRepository, User, UserRepository};

#[test]
fn create_and_get_user_roundtrip() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteUserRepository::try_new(&conn).unwrap();

    let user = User::new("day planner");
    let id = repo.create_user(&user).unwrap();

    let loaded = repo.get_user(id).unwrap().unwrap();
    assert_eq!(loaded, user);
    assert!(!loaded.online);
}

#[test]
fn get_unknown_user_returns_none() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteUserRepository::try_new(&conn).unwrap();

    assert!(repo.get_user(uuid::Uuid::new_v4()).unwrap().is_none());
}

#[test]
fn set_online_persists_the_presence_flag() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteUserRepository::try_new(&conn).unwrap();

    let user = User::new("presence tester");
    repo.create_user(&user).unwrap();

    repo.set_online(user.uuid, true).unwrap();
    assert!(repo.get_user(user.uuid).unwrap().unwrap().online);

    repo.set_online(user.uuid, false).unwrap();
    assert!(!repo.get_user(user.uuid).unwrap().unwrap().online);
}

#[test]
fn set_online_for_unknown_user_returns_not_found() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteUserRepository::try_new(&conn).unwrap();

    let missing = uuid::Uuid::new_v4();
    let err = repo.set_online(missing, true).unwrap_err();
    assert!(matches!(err, RepoError::NotFound(id) if id == missing));
}

#[test]
fn blank_display_name_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteUserRepository::try_new(&conn).unwrap();

    let user = User::new("   ");
    let err = repo.create_user(&user).unwrap_err();
    assert!(matches!(err, RepoError::InvalidData(_)));
}
