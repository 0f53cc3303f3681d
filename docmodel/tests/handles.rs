mod common;

use bson::{Bson, DateTime as BsonDateTime, Timestamp, doc};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

use docmodel::prelude::*;

use common::{RecordingDatabase, User, users};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Checkpoint {
    at: DateTime<Utc>,
    note: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FieldShape)]
struct Journey {
    start: Checkpoint,
    stops: Vec<Checkpoint>,
}

#[tokio::test]
async fn loading_a_missing_document_is_not_found() {
    let database = RecordingDatabase::new();

    let mut ghost = users(&database).by_id("ghost");
    let error = ghost.load().await.unwrap_err();

    assert!(error.is_not_found());
    assert!(matches!(
        error,
        ModelError::NotFound { ref id, ref collection } if id == "ghost" && collection == "users"
    ));
}

#[tokio::test]
async fn id_less_creation_allocates_once_and_fetches_nothing() {
    let database = RecordingDatabase::new();
    let users = users(&database);

    let fresh = users.create(None, None);
    let named = users.create(Some("alice"), None);

    assert!(fresh.is_new());
    assert!(!fresh.id().is_empty());
    assert!(!named.is_new());
    assert_eq!(named.id(), "alice");
    assert_eq!(database.calls("allocate_id"), 1);
    assert_eq!(database.calls("get_document"), 0);
    assert_eq!(database.calls("set_merge"), 0);
}

#[tokio::test]
async fn initial_fields_are_cached_but_not_changed() {
    let database = RecordingDatabase::new();

    let handle = users(&database).create(Some("alice"), Some(doc! { "name": "Alice" }));

    assert!(handle.changed_keys().is_empty());
    assert_eq!(handle.get(User::NAME).unwrap(), Some("Alice".to_string()));
    assert!(handle.get_data_for_save(true).is_empty());
}

#[tokio::test]
async fn typed_and_raw_fields_share_the_cache() {
    let database = RecordingDatabase::new();
    let mut handle = users(&database).by_id("alice");

    handle.set(User::NAME, &"Alice".to_string()).unwrap();
    handle.set_field("age", 30);

    assert_eq!(handle.get_field("name"), Some(FieldValue::from("Alice")));
    assert_eq!(handle.get(User::AGE).unwrap(), Some(Some(30)));
    assert_eq!(handle.get(User::LAST_SEEN).unwrap(), None);
    assert_eq!(handle.changed_keys(), ["name", "age"]);
}

#[tokio::test]
async fn timestamps_are_normalized_on_read() {
    let database = RecordingDatabase::new();
    let when = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
    database
        .seed("users", "bob", doc! { "name": "Bob", "createdAt": Bson::Timestamp(Timestamp { time: 1_700_000_000, increment: 1 }) })
        .await;

    let mut handle = users(&database).by_id("bob");
    handle.load().await.unwrap();
    handle.set_field("lastSeen", when);
    handle.save().await.unwrap();

    assert_eq!(
        handle.get_field("createdAt"),
        Some(FieldValue::DateTime(Utc.timestamp_opt(1_700_000_000, 0).unwrap()))
    );
    assert!(matches!(
        database.stored("users", "bob").await.unwrap().get("lastSeen"),
        Some(Bson::DateTime(_))
    ));

    let mut reloaded = users(&database).by_id("bob");
    reloaded.load().await.unwrap();

    assert_eq!(reloaded.get_field("lastSeen"), Some(FieldValue::DateTime(when)));
    assert_eq!(reloaded.get(User::LAST_SEEN).unwrap(), Some(Some(when)));
    assert_eq!(reloaded.to_shape().unwrap().last_seen, Some(when));
}

#[tokio::test]
async fn full_save_round_trips_the_shape() {
    let database = RecordingDatabase::new();
    let user = User {
        name: "Carol".to_string(),
        age: Some(41),
        last_seen: Some(Utc.with_ymd_and_hms(2023, 12, 24, 18, 0, 0).unwrap()),
    };

    let mut handle = users(&database).create(None, None);
    handle.set_shape(&user).unwrap();
    handle.save_with(SaveMode::All).await.unwrap();

    let mut reloaded = users(&database).by_id(handle.id());
    reloaded.load().await.unwrap();

    assert_eq!(reloaded.to_shape().unwrap(), user);
    assert_eq!(database.calls("set_merge"), 1);
}

#[tokio::test]
async fn changed_payload_holds_each_key_once_with_the_latest_value() {
    let database = RecordingDatabase::new();
    let mut handle = users(&database).by_id("alice");

    handle.set_field("name", "A").set_field("age", 1).set_field("name", "Alice");

    assert_eq!(handle.changed_keys(), ["name", "age", "name"]);
    assert_eq!(
        handle.get_data_for_save(true),
        FieldMap::from([
            ("age".to_string(), FieldWrite::Set(Bson::Int32(1))),
            ("name".to_string(), FieldWrite::Set(Bson::String("Alice".into()))),
        ])
    );
}

#[tokio::test]
async fn empty_payload_makes_no_write() {
    let database = RecordingDatabase::new();
    database.seed("users", "alice", doc! { "name": "Alice" }).await;

    let mut handle = users(&database).by_id("alice");
    handle.load().await.unwrap();
    handle.save().await.unwrap();

    handle.set_field("age", 3);
    handle.save().await.unwrap();
    handle.save().await.unwrap();

    assert_eq!(database.calls("set_merge"), 1);
    assert!(handle.changed_keys().is_empty());
}

#[tokio::test]
async fn changed_save_leaves_untouched_remote_fields() {
    let database = RecordingDatabase::new();
    database.seed("users", "alice", doc! { "name": "Alice", "age": 1 }).await;

    let mut handle = users(&database).by_id("alice");
    handle.set_field("age", 2);
    handle.save().await.unwrap();

    assert_eq!(
        database.stored("users", "alice").await,
        Some(doc! { "name": "Alice", "age": 2 })
    );
}

#[tokio::test]
async fn absent_values_delete_remote_fields() {
    let database = RecordingDatabase::new();
    database
        .seed("users", "alice", doc! { "name": "Alice", "age": 30, "nickname": "Al" })
        .await;

    let mut handle = users(&database).by_id("alice");
    handle.load().await.unwrap();
    handle.set_field("age", FieldValue::Absent);
    handle.set_field("nickname", None::<String>);

    let payload = handle.get_data_for_save(true);
    assert_eq!(payload.get("age"), Some(&FieldWrite::Delete));
    assert_eq!(payload.get("nickname"), Some(&FieldWrite::Delete));
    assert_eq!(handle.get_field("age"), Some(FieldValue::Absent));
    assert_eq!(handle.get(User::AGE).unwrap(), None);

    handle.save().await.unwrap();

    assert_eq!(database.stored("users", "alice").await, Some(doc! { "name": "Alice" }));
}

#[tokio::test]
async fn overlapping_saves_of_one_handle_persist_both_payloads() {
    let database = RecordingDatabase::new();
    let mut handle = users(&database).by_id("alice");

    handle.set_field("name", "Alice");
    let first = handle.prepare_save(SaveMode::Changed);
    handle.set_field("age", 5);
    let second = handle.prepare_save(SaveMode::Changed);

    assert!(handle.changed_keys().is_empty());
    assert_eq!(first.payload().len(), 1);
    assert_eq!(second.payload().len(), 1);

    let (first, second) = futures::join!(first.commit(), second.commit());
    first.unwrap();
    second.unwrap();

    assert_eq!(
        database.stored("users", "alice").await,
        Some(doc! { "name": "Alice", "age": 5 })
    );
}

#[tokio::test]
async fn concurrent_disjoint_saves_from_two_handles_merge() {
    let database = RecordingDatabase::new();
    let users = users(&database);

    let mut left = users.by_id("alice");
    let mut right = users.by_id("alice");
    left.set_field("name", "Alice");
    right.set_field("age", 7);

    let (left, right) = tokio::join!(left.save(), right.save());
    left.unwrap();
    right.unwrap();

    let stored = database.stored("users", "alice").await.unwrap();
    assert_eq!(stored.get_str("name").unwrap(), "Alice");
    assert_eq!(stored.get_i32("age").unwrap(), 7);
}

#[tokio::test]
async fn load_replaces_the_cache_and_clears_changes() {
    let database = RecordingDatabase::new();
    database.seed("users", "alice", doc! { "name": "Alice" }).await;

    let mut handle = users(&database).by_id("alice");
    handle.set_field("scratch", true);
    handle.load().await.unwrap();

    assert_eq!(handle.get_field("scratch"), None);
    assert!(handle.changed_keys().is_empty());
    assert_eq!(handle.get_all_fields().len(), 1);
}

#[tokio::test]
async fn delete_keeps_local_state() {
    let database = RecordingDatabase::new();
    database.seed("users", "alice", doc! { "name": "Alice" }).await;

    let mut handle = users(&database).by_id("alice");
    handle.load().await.unwrap();
    handle.set_field("age", 9);
    handle.delete().await.unwrap();

    assert_eq!(database.stored("users", "alice").await, None);
    assert_eq!(handle.get(User::NAME).unwrap(), Some("Alice".to_string()));
    assert_eq!(handle.changed_keys(), ["age"]);

    // Deleting twice is fine
    handle.delete().await.unwrap();
    assert_eq!(database.calls("delete_document"), 2);
}

#[tokio::test]
async fn resolver_paths_are_evaluated_on_every_access() {
    let database = RecordingDatabase::new();
    let tenant = Arc::new(Mutex::new("acme".to_string()));
    let users = CollectionBinder::<_, User>::new(
        Arc::clone(&database),
        CollectionPath::resolver({
            let tenant = Arc::clone(&tenant);
            move || format!("tenants/{}/users", tenant.lock().unwrap())
        }),
    );

    let mut handle = users.by_id("alice");
    assert_eq!(handle.location(), Location::new("tenants/acme/users", "alice"));

    *tenant.lock().unwrap() = "globex".to_string();
    handle.set_field("name", "Alice");
    handle.save().await.unwrap();

    assert_eq!(handle.location().to_string(), "tenants/globex/users/alice");
    assert!(database.stored("tenants/globex/users", "alice").await.is_some());
    assert!(database.stored("tenants/acme/users", "alice").await.is_none());
}

#[tokio::test]
async fn typed_date_writes_are_stored_natively() {
    let database = RecordingDatabase::new();
    let users = users(&database);
    let when = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();

    let mut handle = users.by_id("alice");
    handle.set(User::NAME, &"Alice".to_string()).unwrap();
    handle.set(User::LAST_SEEN, &Some(when)).unwrap();
    handle.save().await.unwrap();

    assert_eq!(handle.get_field("lastSeen"), Some(FieldValue::DateTime(when)));
    assert_eq!(handle.get(User::LAST_SEEN).unwrap(), Some(Some(when)));
    assert_eq!(
        database.stored("users", "alice").await.unwrap().get("lastSeen"),
        Some(&Bson::DateTime(BsonDateTime::from_millis(when.timestamp_millis())))
    );

    let seen = users
        .by_query(
            Query::builder()
                .filter(Filter::gt("lastSeen", Bson::DateTime(BsonDateTime::from_millis(0))))
                .build(),
        )
        .await
        .unwrap();
    assert_eq!(seen.len(), 1);
}

#[tokio::test]
async fn nested_dates_round_trip_through_shapes() {
    let database = RecordingDatabase::new();
    let journeys = CollectionBinder::<_, Journey>::new(Arc::clone(&database), "journeys");
    let journey = Journey {
        start: Checkpoint {
            at: Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap(),
            note: "depot".to_string(),
        },
        stops: vec![Checkpoint {
            at: Utc.timestamp_millis_opt(1_714_555_200_250).unwrap(),
            note: "customer".to_string(),
        }],
    };

    let mut handle = journeys.create(Some("j1"), None);
    handle.set_shape(&journey).unwrap();
    handle.save().await.unwrap();

    let stored = database.stored("journeys", "j1").await.unwrap();
    assert!(matches!(stored.get_document("start").unwrap().get("at"), Some(Bson::DateTime(_))));

    let mut reloaded = journeys.by_id("j1");
    reloaded.load().await.unwrap();

    assert_eq!(reloaded.to_shape().unwrap(), journey);
    assert_eq!(reloaded.get(Journey::STOPS).unwrap(), Some(journey.stops.clone()));
}

#[tokio::test]
async fn seeded_nested_timestamps_are_readable() {
    let database = RecordingDatabase::new();
    database
        .seed(
            "journeys",
            "j2",
            doc! {
                "start": { "at": Bson::DateTime(BsonDateTime::from_millis(1_000)), "note": "gate" },
                "stops": [],
            },
        )
        .await;

    let mut handle = CollectionBinder::<_, Journey>::new(Arc::clone(&database), "journeys").by_id("j2");
    handle.load().await.unwrap();

    let journey = handle.to_shape().unwrap();
    assert_eq!(journey.start.at, Utc.timestamp_opt(1, 0).unwrap());
    assert!(journey.stops.is_empty());
}
