use remember_core::{
    BackupError, BackupManager, ErrorKind, ResourceKind, ResourceService, ResourceStore,
    RestoreOptions,
};
use std::fs;
use std::thread;

fn seeded_store() -> ResourceStore {
    let store = ResourceStore::open_in_memory().unwrap();
    let service = ResourceService::new(&store);
    service
        .set_rule("me", "greet", "MUST", "Always greet the user")
        .unwrap();
    service.set_snippet("coding", "hello", "print(1)", None).unwrap();
    service.set_summary("me", "chat", "# Chat", None).unwrap();
    store
}

#[test]
fn restore_brings_back_removed_rule() {
    let store = seeded_store();
    let dir = tempfile::tempdir().unwrap();
    let manager = BackupManager::new(&store, dir.path()).unwrap();
    let service = ResourceService::new(&store);

    let backup = manager.create(Some("pre-refactor")).unwrap();
    assert_eq!(backup.label.as_deref(), Some("pre-refactor"));
    assert_eq!(backup.resource_count, 3);

    assert!(service.remove(ResourceKind::Rule, "me", "greet").unwrap());
    assert!(service.list(ResourceKind::Rule, "me").unwrap().is_empty());

    manager.restore(&backup.id.to_string()).unwrap();

    let rules = service.list(ResourceKind::Rule, "me").unwrap();
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].key, "greet");
}

#[test]
fn create_does_not_alter_live_resources() {
    let store = seeded_store();
    let dir = tempfile::tempdir().unwrap();
    let manager = BackupManager::new(&store, dir.path()).unwrap();

    let before = store.snapshot().unwrap();
    manager.create(None).unwrap();
    assert_eq!(store.snapshot().unwrap(), before);
}

#[test]
fn restore_roundtrip_is_observationally_identical() {
    let store = seeded_store();
    let dir = tempfile::tempdir().unwrap();
    let manager = BackupManager::new(&store, dir.path()).unwrap();
    let service = ResourceService::new(&store);

    let before = store.snapshot().unwrap();
    let backup = manager.create(None).unwrap();

    service.set_rule("me", "greet", "MAY", "Greet sometimes").unwrap();
    service.set_snippet("coding", "new", "x", None).unwrap();
    service.remove(ResourceKind::Summary, "me", "chat").unwrap();
    service.set_summary("work", "standup", "notes", None).unwrap();

    manager.restore(&backup.id.to_string()).unwrap();

    assert_eq!(store.snapshot().unwrap(), before);
    let rule = store.get("me", ResourceKind::Rule, "greet").unwrap().unwrap();
    assert_eq!(rule.version, 1);
}

#[test]
fn restore_of_empty_snapshot_clears_store() {
    let store = ResourceStore::open_in_memory().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let manager = BackupManager::new(&store, dir.path()).unwrap();
    let backup = manager.create(None).unwrap();

    ResourceService::new(&store)
        .set_snippet("me", "k", "x", None)
        .unwrap();
    manager.restore(&backup.id.to_string()).unwrap();

    assert_eq!(store.count().unwrap(), 0);
}

#[test]
fn restore_unknown_id_is_not_found_and_leaves_store_untouched() {
    let store = seeded_store();
    let dir = tempfile::tempdir().unwrap();
    let manager = BackupManager::new(&store, dir.path()).unwrap();
    let before = store.snapshot().unwrap();

    let err = manager
        .restore("0b8f5b5e-6f3c-4d8e-9a63-6e0f0d6b9b11")
        .unwrap_err();
    assert!(matches!(err, BackupError::NotFound(_)));
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = manager.restore("does-not-exist").unwrap_err();
    assert!(matches!(err, BackupError::NotFound(_)));

    assert_eq!(store.snapshot().unwrap(), before);
}

#[test]
fn remove_unknown_id_is_not_found_and_catalog_unchanged() {
    let store = seeded_store();
    let dir = tempfile::tempdir().unwrap();
    let manager = BackupManager::new(&store, dir.path()).unwrap();
    let backup = manager.create(None).unwrap();

    let err = manager.remove("does-not-exist").unwrap_err();
    assert!(matches!(err, BackupError::NotFound(ref id) if id == "does-not-exist"));

    let listed = manager.list().unwrap();
    assert_eq!(listed, vec![backup]);
}

#[test]
fn remove_deletes_one_backup() {
    let store = seeded_store();
    let dir = tempfile::tempdir().unwrap();
    let manager = BackupManager::new(&store, dir.path()).unwrap();
    let keep = manager.create(Some("keep")).unwrap();
    let drop_me = manager.create(Some("drop")).unwrap();

    assert!(manager.remove(&drop_me.id.to_string()).unwrap());

    let ids: Vec<_> = manager.list().unwrap().into_iter().map(|b| b.id).collect();
    assert_eq!(ids, vec![keep.id]);
    assert!(manager.get(&drop_me.id.to_string()).unwrap().is_none());
    assert!(matches!(
        manager.remove(&drop_me.id.to_string()),
        Err(BackupError::NotFound(_))
    ));
}

#[test]
fn list_is_most_recent_first() {
    let store = seeded_store();
    let dir = tempfile::tempdir().unwrap();
    let manager = BackupManager::new(&store, dir.path()).unwrap();

    let created: Vec<_> = (0..5)
        .map(|i| manager.create(Some(&format!("b{i}"))).unwrap())
        .collect();

    let listed = manager.list().unwrap();
    let ids: Vec<_> = listed.iter().map(|b| b.id).collect();
    let expected: Vec<_> = created.iter().rev().map(|b| b.id).collect();
    assert_eq!(ids, expected);
    assert!(listed.windows(2).all(|w| w[0].created_at > w[1].created_at));
}

#[test]
fn list_skips_unreadable_archive_but_keeps_healthy_ones() {
    let store = seeded_store();
    let dir = tempfile::tempdir().unwrap();
    let manager = BackupManager::new(&store, dir.path()).unwrap();
    let healthy = manager.create(Some("healthy")).unwrap();
    let broken = manager.create(Some("broken")).unwrap();
    fs::write(dir.path().join(format!("{}.json", broken.id)), b"{ not json").unwrap();

    let listed = manager.list().unwrap();
    assert_eq!(listed, vec![healthy.clone()]);
    assert!(matches!(
        manager.get(&broken.id.to_string()),
        Err(BackupError::InvalidArchive { .. })
    ));
    manager.restore(&healthy.id.to_string()).unwrap();
}

#[test]
fn clear_removes_all_backups_but_not_resources() {
    let store = seeded_store();
    let dir = tempfile::tempdir().unwrap();
    let manager = BackupManager::new(&store, dir.path()).unwrap();
    manager.create(None).unwrap();
    manager.create(None).unwrap();
    fs::write(dir.path().join("stale.json.tmp"), b"partial").unwrap();

    assert_eq!(manager.clear().unwrap(), 2);
    assert!(manager.list().unwrap().is_empty());
    assert!(!dir.path().join("stale.json.tmp").exists());
    assert_eq!(store.count().unwrap(), 3);
    assert_eq!(manager.clear().unwrap(), 0);
}

#[test]
fn restore_does_not_touch_catalog_and_can_snapshot_current_state() {
    let store = seeded_store();
    let dir = tempfile::tempdir().unwrap();
    let manager = BackupManager::new(&store, dir.path()).unwrap();
    let backup = manager.create(None).unwrap();
    ResourceService::new(&store)
        .set_snippet("me", "later", "x", None)
        .unwrap();

    let outcome = manager
        .restore_with(
            &backup.id.to_string(),
            RestoreOptions {
                backup_current: true,
            },
        )
        .unwrap();

    assert_eq!(outcome.restored, backup);
    assert_eq!(outcome.resource_count, 3);
    let safety = outcome.safety_backup.unwrap();
    assert_eq!(safety.resource_count, 4);

    let listed = manager.list().unwrap();
    assert_eq!(listed.len(), 2);
    assert!(listed.iter().any(|b| b.id == backup.id));
    assert!(listed.iter().any(|b| b.id == safety.id));

    manager.restore(&safety.id.to_string()).unwrap();
    assert!(store.get("me", ResourceKind::Snippet, "later").unwrap().is_some());
}

#[test]
fn create_leaves_no_temp_files() {
    let store = seeded_store();
    let dir = tempfile::tempdir().unwrap();
    let manager = BackupManager::new(&store, dir.path()).unwrap();
    let backup = manager.create(None).unwrap();

    let names: Vec<String> = fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec![format!("{}.json", backup.id)]);
}

#[test]
fn create_into_unwritable_location_is_storage_error() {
    let store = seeded_store();
    let dir = tempfile::tempdir().unwrap();
    let manager = BackupManager::new(&store, dir.path().join("catalog")).unwrap();
    fs::remove_dir_all(manager.dir()).unwrap();
    fs::write(manager.dir(), b"not a directory").unwrap();

    let err = manager.create(None).unwrap_err();
    assert!(matches!(err, BackupError::Io { .. }));
    assert_eq!(err.kind(), ErrorKind::Storage);
    assert!(err.kind().is_retriable());
}

#[test]
fn corrupt_archive_fails_restore_without_mutation() {
    let store = seeded_store();
    let dir = tempfile::tempdir().unwrap();
    let manager = BackupManager::new(&store, dir.path()).unwrap();
    let backup = manager.create(None).unwrap();
    let path = dir.path().join(format!("{}.json", backup.id));
    fs::write(&path, b"{ not json").unwrap();
    let before = store.snapshot().unwrap();

    let err = manager.restore(&backup.id.to_string()).unwrap_err();
    assert!(matches!(err, BackupError::InvalidArchive { .. }));
    assert_eq!(err.kind(), ErrorKind::Storage);
    assert_eq!(store.snapshot().unwrap(), before);
}

#[test]
fn failing_swap_rolls_back_to_previous_store() {
    let store = seeded_store();
    let dir = tempfile::tempdir().unwrap();
    let manager = BackupManager::new(&store, dir.path()).unwrap();
    let backup = manager.create(None).unwrap();
    let path = dir.path().join(format!("{}.json", backup.id));

    let mut archive: serde_json::Value =
        serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
    let resources = archive["resources"].as_array_mut().unwrap();
    let duplicate = resources[resources.len() - 1].clone();
    resources.push(duplicate);
    let count = resources.len();
    archive["resource_count"] = serde_json::json!(count);
    fs::write(&path, serde_json::to_vec(&archive).unwrap()).unwrap();

    ResourceService::new(&store)
        .set_snippet("me", "later", "x", None)
        .unwrap();
    let before = store.snapshot().unwrap();

    let err = manager.restore(&backup.id.to_string()).unwrap_err();
    assert!(matches!(err, BackupError::Store(_)));
    assert_eq!(err.kind(), ErrorKind::Storage);
    assert_eq!(store.snapshot().unwrap(), before);
}

#[test]
fn newer_archive_format_is_rejected() {
    let store = seeded_store();
    let dir = tempfile::tempdir().unwrap();
    let manager = BackupManager::new(&store, dir.path()).unwrap();
    let backup = manager.create(None).unwrap();
    let path = dir.path().join(format!("{}.json", backup.id));

    let mut archive: serde_json::Value =
        serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
    archive["format_version"] = serde_json::json!(99);
    fs::write(&path, serde_json::to_vec(&archive).unwrap()).unwrap();

    let err = manager.restore(&backup.id.to_string()).unwrap_err();
    assert!(matches!(
        err,
        BackupError::UnsupportedFormat {
            format_version: 99,
            ..
        }
    ));
}

#[test]
fn restore_excludes_concurrent_readers() {
    let store = seeded_store();
    let dir = tempfile::tempdir().unwrap();
    let manager = BackupManager::new(&store, dir.path()).unwrap();
    let empty_store = ResourceStore::open_in_memory().unwrap();
    let empty = BackupManager::new(&empty_store, dir.path().join("empty"))
        .unwrap()
        .create(None)
        .unwrap();
    fs::rename(
        dir.path().join("empty").join(format!("{}.json", empty.id)),
        dir.path().join(format!("{}.json", empty.id)),
    )
    .unwrap();
    let full = manager.create(None).unwrap();

    thread::scope(|scope| {
        let reader = scope.spawn(|| {
            for _ in 0..200 {
                let count = store.snapshot().unwrap().len();
                assert!(count == 0 || count == 3, "observed partial restore: {count}");
            }
        });
        for round in 0..20 {
            let id = if round % 2 == 0 { empty.id } else { full.id };
            manager.restore(&id.to_string()).unwrap();
        }
        reader.join().unwrap();
    });
}
