//! `SQLite` End-to-End Tests
//!
//! Loads desired-state documents from disk, reconciles them into a
//! file-backed `SQLite` catalog and inspects the persisted result.

// Integration tests use expect/unwrap for simplicity - panics are acceptable in tests
#![allow(clippy::expect_used, clippy::unwrap_used)]

use permsync::desired::{Template, load_and_validate, write_template};
use permsync::storage::DatabaseLocation;
use permsync::{Ability, Action, Error, Reconciler, RoleStore, SqliteRoleStore, SyncOptions};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

// ============================================================================
// Test Helpers
// ============================================================================

fn write_roles(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

fn open(dir: &TempDir) -> SqliteRoleStore {
    SqliteRoleStore::new(dir.path().join("catalog.db")).unwrap()
}

fn sync_file(store: &SqliteRoleStore, path: &Path, options: SyncOptions) -> permsync::SyncReport {
    let desired = load_and_validate(path).unwrap();
    Reconciler::new(store, options).run(&desired)
}

const BLOG: &str = r#"
roles:
  Admin:
    - { action: manage, subject: all }
  Editor:
    - { action: read, subject: Post }
    - { action: update, subject: Post }
  User:
    - { action: read, subject: Post }
    - action: update
      subject: Comment
      conditions: { authorId: "${user.id}" }
"#;

// ============================================================================
// Tests
// ============================================================================

#[test]
fn test_first_sync_persists_catalog() {
    let dir = TempDir::new().unwrap();
    let path = write_roles(&dir, "roles.yaml", BLOG);
    let store = open(&dir);

    let report = sync_file(&store, &path, SyncOptions::default());
    assert_eq!(report.stats.created, 3);

    let roles = store.list_roles().unwrap();
    let names: Vec<_> = roles.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["Admin", "Editor", "User"]);

    // read Post is shared between Editor and User
    let editor = store.find_role_by_name("Editor").unwrap().unwrap();
    let user = store.find_role_by_name("User").unwrap().unwrap();
    assert_eq!(editor.permissions[0].id, user.permissions[0].id);
}

#[test]
fn test_catalog_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let path = write_roles(&dir, "roles.yaml", BLOG);
    {
        let store = open(&dir);
        sync_file(&store, &path, SyncOptions::default());
    }

    let store = open(&dir);
    let report = sync_file(&store, &path, SyncOptions::default());
    assert_eq!(report.stats.skipped, 3);
    assert_eq!(report.stats.created, 0);
}

#[test]
fn test_force_after_document_change() {
    let dir = TempDir::new().unwrap();
    let path = write_roles(&dir, "roles.yaml", BLOG);
    let store = open(&dir);
    sync_file(&store, &path, SyncOptions::default());

    let narrowed = write_roles(
        &dir,
        "narrowed.json",
        r#"{"Editor": [{"action": "read", "subject": "Post"}]}"#,
    );
    let report = sync_file(&store, &narrowed, SyncOptions::default().with_force(true));
    assert_eq!(report.stats.updated, 1);

    let editor = store.find_role_by_name("Editor").unwrap().unwrap();
    assert_eq!(editor.permissions.len(), 1);
    assert_eq!(editor.permissions[0].action, Action::Read);
    // Admin and User are untouched by a document that does not mention them.
    assert_eq!(store.list_roles().unwrap().len(), 3);
}

#[test]
fn test_dry_run_leaves_database_empty() {
    let dir = TempDir::new().unwrap();
    let path = write_roles(&dir, "roles.yaml", BLOG);
    let store = open(&dir);

    let report = sync_file(&store, &path, SyncOptions::default().with_dry_run(true));
    assert_eq!(report.count("would_create"), 3);
    assert!(store.list_roles().unwrap().is_empty());
}

#[test]
fn test_invalid_document_is_rejected_before_any_write() {
    let dir = TempDir::new().unwrap();
    let path = write_roles(
        &dir,
        "roles.yaml",
        "Admin:\n  - { action: manage, subject: all }\nEditor:\n  - { action: publish, subject: Post }\n",
    );

    let err = load_and_validate(&path).unwrap_err();
    assert!(err.is_config_error());
    assert!(matches!(err, Error::Validation(ref v) if v.role == "Editor" && v.index == Some(0)));
}

#[test]
fn test_missing_document() {
    let dir = TempDir::new().unwrap();
    let err = load_and_validate(dir.path().join("config").join("roles.yaml")).unwrap_err();
    assert!(matches!(err, Error::ConfigNotFound { .. }));
    assert!(err.is_config_error());
}

#[test]
fn test_example_template_syncs_and_grants() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config").join("roles.yaml");
    write_template(&path, Template::Example, false).unwrap();

    let store = DatabaseLocation::parse(&format!("sqlite://{}", dir.path().join("db.sqlite").display()))
        .unwrap()
        .open()
        .unwrap();
    let report = sync_file(&store, &path, SyncOptions::default());
    assert_eq!(report.stats.created, 5);

    let guest = Ability::for_role(&store.find_role_by_name("Guest").unwrap().unwrap());
    assert!(guest.can(Action::Read, "Post"));
    assert!(guest.cannot(Action::Create, "Comment"));

    let root = Ability::for_role(&store.find_role_by_name("SuperAdmin").unwrap().unwrap());
    assert!(root.can(Action::Delete, "User"));
}
