use crate::helpers::config_path;

use tracker_core::config::{ConfigStore, EyeTrackConfig};
use tracker_core::error::ConfigError;

use serde_json::json;

/// **VALUE**: First start on a machine writes the defaults to disk.
///
/// **WHY THIS MATTERS**: Users edit the generated file by hand. If nothing is
/// written there is nothing to edit and every later load falls back silently.
#[tokio::test]
async fn given_missing_file_when_loaded_then_defaults_written_and_in_memory() {
    // GIVEN: An empty directory
    let dir = tempfile::tempdir().unwrap();
    let path = config_path(&dir);

    // WHEN: Loading
    let store = ConfigStore::load(&path);

    // THEN: Memory and disk both hold the defaults
    assert_eq!(store.snapshot().await, EyeTrackConfig::default());
    assert_eq!(
        EyeTrackConfig::read_from(&path).unwrap(),
        EyeTrackConfig::default()
    );
}

#[tokio::test]
async fn given_corrupt_file_when_loaded_then_file_replaced_with_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = config_path(&dir);
    std::fs::write(&path, "{ this is not json").unwrap();

    let store = ConfigStore::load(&path);

    assert_eq!(store.snapshot().await, EyeTrackConfig::default());
    assert_eq!(
        EyeTrackConfig::read_from(&path).unwrap(),
        EyeTrackConfig::default()
    );
}

#[tokio::test]
async fn given_schema_violation_on_disk_when_loaded_then_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = config_path(&dir);
    std::fs::write(&path, r#"{ "osc": { "address": "not an ip" } }"#).unwrap();

    let store = ConfigStore::load(&path);

    assert_eq!(store.snapshot().await.osc.address, "127.0.0.1");
}

#[tokio::test]
async fn given_partial_file_when_loaded_then_given_fields_kept_rest_defaulted() {
    let dir = tempfile::tempdir().unwrap();
    let path = config_path(&dir);
    std::fs::write(
        &path,
        r#"{ "osc": { "receiver_port": 9101 }, "left_eye": { "capture_source": "http://cam" }, "legacy": 1 }"#,
    )
    .unwrap();

    let config = ConfigStore::load(&path).snapshot().await;

    assert_eq!(config.osc.receiver_port, 9101);
    assert_eq!(config.osc.sending_port, 9000);
    assert_eq!(config.left_eye.capture_source, "http://cam");
    assert_eq!(config.left_eye.threshold, 50);
}

#[tokio::test]
async fn given_valid_patch_when_updated_then_memory_and_disk_agree() {
    // GIVEN: A loaded store
    let dir = tempfile::tempdir().unwrap();
    let path = config_path(&dir);
    let store = ConfigStore::load(&path);

    // WHEN: Applying a partial update
    store
        .update(json!({
            "osc": { "mirror_eyes": true },
            "algorithm": { "blob": { "threshold": 80 } }
        }))
        .await
        .unwrap();

    // THEN: Memory reflects the update and disk matches memory
    let in_memory = store.snapshot().await;
    assert!(in_memory.osc.mirror_eyes);
    assert_eq!(in_memory.algorithm.blob.threshold, 80);
    assert_eq!(in_memory.algorithm.blob.maxsize, 25, "Sibling kept");
    assert_eq!(EyeTrackConfig::read_from(&path).unwrap(), in_memory);
}

/// **VALUE**: A rejected update changes nothing, in memory or on disk.
///
/// **BUG THIS CATCHES**: Applying fields one by one before validating the
/// whole payload would leave the record half-updated when a later field fails.
#[tokio::test]
async fn given_invalid_patch_when_updated_then_state_and_file_unchanged() {
    // GIVEN: A store with a non-default value already persisted
    let dir = tempfile::tempdir().unwrap();
    let path = config_path(&dir);
    let store = ConfigStore::load(&path);
    store.update(json!({ "debug": false })).await.unwrap();
    let before = store.snapshot().await;
    let file_before = std::fs::read_to_string(&path).unwrap();

    // WHEN: Posting a payload whose first field is fine but second is not
    let result = store
        .update(json!({
            "osc": { "mirror_eyes": true, "sending_port": -1 }
        }))
        .await;

    // THEN: Rejected, and nothing moved
    assert!(matches!(result, Err(ConfigError::ValidationError { .. })));
    assert_eq!(store.snapshot().await, before);
    assert_eq!(std::fs::read_to_string(&path).unwrap(), file_before);
}

#[tokio::test]
async fn given_constraint_violation_when_updated_then_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let store = ConfigStore::load(config_path(&dir));

    let result = store
        .update(json!({ "algorithm": { "blob": { "minsize": 100 } } }))
        .await;

    assert!(matches!(result, Err(ConfigError::ValidationError { .. })));
    assert_eq!(store.snapshot().await.algorithm.blob.minsize, 10);
}

#[tokio::test]
async fn given_toggle_when_applied_then_memory_flips_but_disk_does_not() {
    let dir = tempfile::tempdir().unwrap();
    let path = config_path(&dir);
    let store = ConfigStore::load(&path);

    assert!(store.toggle_sync_blink().await);

    assert!(store.snapshot().await.osc.sync_blink);
    assert!(!EyeTrackConfig::read_from(&path).unwrap().osc.sync_blink);

    store.save().await.unwrap();
    assert!(EyeTrackConfig::read_from(&path).unwrap().osc.sync_blink);
}

#[tokio::test]
async fn given_snapshot_when_mutated_then_store_is_unaffected() {
    let dir = tempfile::tempdir().unwrap();
    let store = ConfigStore::load(config_path(&dir));

    let mut snapshot = store.snapshot().await;
    snapshot.osc.sending_port = 1234;

    assert_eq!(store.snapshot().await.osc.sending_port, 9000);
}

#[tokio::test]
async fn given_concurrent_updates_when_applied_then_all_land_and_disk_matches() {
    let dir = tempfile::tempdir().unwrap();
    let path = config_path(&dir);
    let store = ConfigStore::load(&path);

    let mut tasks = Vec::new();
    for (i, field) in ["roi_x", "roi_y", "roi_w", "roi_h"].into_iter().enumerate() {
        let store = store.clone();
        tasks.push(tokio::spawn(async move {
            store
                .update(json!({ "right_eye": { field: i as u32 + 1 } }))
                .await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let config = store.snapshot().await;
    assert_eq!(
        (
            config.right_eye.roi_x,
            config.right_eye.roi_y,
            config.right_eye.roi_w,
            config.right_eye.roi_h
        ),
        (1, 2, 3, 4)
    );
    assert_eq!(EyeTrackConfig::read_from(&path).unwrap(), config);
}

/// **VALUE**: Writes to disk happen outside the record lock but still in commit order.
///
/// **WHY THIS MATTERS**: Workers read the record for every message, so the
/// lock cannot be held across file I/O. Once it is released early, two updates
/// could reach the disk out of order and leave a stale file behind.
///
/// **BUG THIS CATCHES**: Saving after the write lock is dropped without
/// serializing the saves, so the file ends up holding an older record.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn given_racing_updates_and_readers_when_settled_then_file_holds_last_commit() {
    // GIVEN: A store hammered by writers to one field and by readers
    let dir = tempfile::tempdir().unwrap();
    let path = config_path(&dir);
    let store = ConfigStore::load(&path);

    let mut writers = Vec::new();
    for threshold in 1..=32u8 {
        let store = store.clone();
        writers.push(tokio::spawn(async move {
            store
                .update(json!({ "algorithm": { "blob": { "threshold": threshold } } }))
                .await
        }));
    }
    let mut readers = Vec::new();
    for _ in 0..32 {
        let store = store.clone();
        readers.push(tokio::spawn(async move {
            store.read(|c| c.algorithm.blob.threshold).await
        }));
    }

    // WHEN: Everything has finished
    for writer in writers {
        writer.await.unwrap().unwrap();
    }
    for reader in readers {
        reader.await.unwrap();
    }

    // THEN: The file matches whichever update committed last
    let config = store.snapshot().await;
    assert!((1..=32).contains(&config.algorithm.blob.threshold));
    assert_eq!(EyeTrackConfig::read_from(&path).unwrap(), config);
}
