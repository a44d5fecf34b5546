use serde_json::{Value, json};
use twin_migrate::export::JsonExportSource;
use twin_migrate::migrate::{MigrationReporter, MigrationSummary, PlanRecorder, migrate};
use twin_migrate::models::{EntityKind, FieldValue, SourceDocument, TargetDocument};
use twin_migrate::sqlite::SqliteDocumentStore;
use twin_migrate::store::{DocumentSink, WriteDisposition};
use twin_migrate::upsert::{Destination, UpsertOutcome, UpsertPlan};

fn sample_export() -> Value {
    json!({
        "__collections__": {
            "users": {
                "u1": {
                    "username": "ada",
                    "email": "ada@example.com",
                    "created_at": { "__datatype__": "timestamp", "value": { "_seconds": 1714557600, "_nanoseconds": 0 } },
                    "password_hash": "never-copied"
                }
            },
            "digital_twins": {
                "dt1": {
                    "user_id": "u1",
                    "name": "Ada's twin",
                    "created_at": "2024-05-01T10:00:00Z",
                    "__collections__": {
                        "conversations": {
                            "c1": {
                                "digital_twin_id": "spoofed-twin",
                                "summary": "greetings",
                                "created_at": { "$date": "2024-05-01T10:05:00Z" },
                                "message_count": 2,
                                "__collections__": {
                                    "messages": {
                                        "m1": {
                                            "role": "user",
                                            "content": "hi",
                                            "timestamp": "2024-05-01T10:05:00Z",
                                            "conversation_id": "spoofed-conversation"
                                        },
                                        "m2": {
                                            "role": "assistant",
                                            "content": "",
                                            "media": [{ "type": "image", "url": "https://cdn.example/a.png" }],
                                            "timestamp": "2024-05-01T10:06:00Z"
                                        }
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    })
}

fn load(export: &Value) -> JsonExportSource {
    JsonExportSource::from_json(export).expect("export should load")
}

#[derive(Default)]
struct EventLog {
    events: Vec<String>,
    dispositions: Vec<WriteDisposition>,
}

impl MigrationReporter for EventLog {
    fn stage_started(&mut self, kind: EntityKind, _dry_run: bool) {
        self.events.push(format!("stage:{}", kind.as_str()));
    }

    fn document_prepared(&mut self, source: &SourceDocument, plan: &UpsertPlan) {
        self.events
            .push(format!("{}:{}", plan.collection, source.path));
    }

    fn document_finished(&mut self, _kind: EntityKind, outcome: &UpsertOutcome) {
        if let UpsertOutcome::Written(ack) = outcome {
            self.dispositions.push(ack.disposition);
        }
    }
}

#[derive(Default)]
struct PreparedPlans(Vec<UpsertPlan>);

impl MigrationReporter for PreparedPlans {
    fn document_prepared(&mut self, _source: &SourceDocument, plan: &UpsertPlan) {
        self.0.push(plan.clone());
    }
}

fn store_state(store: &SqliteDocumentStore) -> Vec<(&'static str, Vec<Value>)> {
    [
        "users",
        "digital_twins",
        "conversations",
        "avatar_conversations",
    ]
    .into_iter()
    .map(|collection| {
        (
            collection,
            store.documents(collection).expect("documents should load"),
        )
    })
    .collect()
}

#[test]
fn end_to_end_hierarchy_lands_in_target_collections() {
    let source = load(&sample_export());
    let mut store = SqliteDocumentStore::open_in_memory("app").expect("store should open");
    let mut log = EventLog::default();

    let summary = migrate(&source, Destination::Live(&mut store), &mut log)
        .expect("migration should succeed");

    assert_eq!(
        summary,
        MigrationSummary {
            users: 1,
            digital_twins: 1,
            conversations: 1,
            messages: 2,
        }
    );
    assert!(
        log.dispositions
            .iter()
            .all(|disposition| *disposition == WriteDisposition::Inserted)
    );

    let user = store
        .find("users", "user_id", "u1")
        .expect("find")
        .expect("user should exist");
    assert_eq!(
        user,
        json!({
            "user_id": "u1",
            "username": "ada",
            "email": "ada@example.com",
            "created_at": { "$date": "2024-05-01T10:00:00Z" }
        })
    );

    let conversation = store
        .find("conversations", "conversation_id", "c1")
        .expect("find")
        .expect("conversation should exist");
    assert_eq!(conversation["digital_twin_id"], json!("dt1"));

    let messages = store
        .documents("avatar_conversations")
        .expect("documents should load");
    assert_eq!(messages.len(), 2);
    for message in &messages {
        assert_eq!(message["digital_twin_id"], json!("dt1"));
        assert_eq!(message["conversation_id"], json!("c1"));
    }
    assert_eq!(messages[0]["message_id"], json!("m1"));
    assert_eq!(messages[0]["type"], json!("text"));
    assert_eq!(messages[0]["sender"], json!("user"));
    assert_eq!(messages[1]["type"], json!("image"));
    assert_eq!(messages[1]["message"], json!(""));
}

#[test]
fn twin_with_one_conversation_and_two_messages_and_no_users() {
    let export = json!({
        "digital_twins": {
            "dt1": {
                "name": "twin",
                "__collections__": {
                    "conversations": {
                        "c1": {
                            "__collections__": {
                                "messages": {
                                    "m1": {
                                        "role": "user",
                                        "content": "hello",
                                        "digital_twin_id": "other-twin"
                                    },
                                    "m2": {
                                        "role": "assistant",
                                        "content": "hi",
                                        "conversation_id": "other-conversation"
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    });
    let source = load(&export);
    let mut store = SqliteDocumentStore::open_in_memory("app").expect("store should open");

    let summary = migrate(&source, Destination::Live(&mut store), &mut EventLog::default())
        .expect("migration should succeed");

    assert_eq!(
        summary,
        MigrationSummary {
            users: 0,
            digital_twins: 1,
            conversations: 1,
            messages: 2,
        }
    );
    let messages = store
        .documents("avatar_conversations")
        .expect("documents should load");
    assert_eq!(messages.len(), 2);
    for message in &messages {
        assert_eq!(message["digital_twin_id"], json!("dt1"));
        assert_eq!(message["conversation_id"], json!("c1"));
    }
    assert_eq!(store.count("users").expect("count"), 0);
}

#[test]
fn rerunning_a_live_migration_changes_nothing() {
    let source = load(&sample_export());
    let mut store = SqliteDocumentStore::open_in_memory("app").expect("store should open");

    migrate(&source, Destination::Live(&mut store), &mut EventLog::default())
        .expect("first run should succeed");
    let after_first = store_state(&store);

    let mut second = EventLog::default();
    let summary = migrate(&source, Destination::Live(&mut store), &mut second)
        .expect("second run should succeed");

    assert_eq!(store_state(&store), after_first);
    assert_eq!(summary.total(), 5);
    assert_eq!(second.dispositions.len(), 5);
    assert!(
        second
            .dispositions
            .iter()
            .all(|disposition| *disposition == WriteDisposition::Unchanged)
    );
}

#[test]
fn dry_run_plans_match_live_writes_and_touch_nothing() {
    let source = load(&sample_export());

    let mut recorder = PlanRecorder::new();
    let dry_summary =
        migrate(&source, Destination::DryRun, &mut recorder).expect("dry run should succeed");

    let mut store = SqliteDocumentStore::open_in_memory("app").expect("store should open");
    let mut prepared = PreparedPlans::default();
    let live_summary = migrate(&source, Destination::Live(&mut store), &mut prepared)
        .expect("live run should succeed");

    assert_eq!(dry_summary, live_summary);
    assert_eq!(recorder.plans(), prepared.0.as_slice());
}

#[test]
fn dry_run_leaves_an_existing_store_untouched() {
    let source = load(&sample_export());
    let store = SqliteDocumentStore::open_in_memory("app").expect("store should open");

    migrate(&source, Destination::DryRun, &mut PlanRecorder::new())
        .expect("dry run should succeed");

    assert!(
        store_state(&store)
            .iter()
            .all(|(_, documents)| documents.is_empty())
    );
}

#[test]
fn traversal_is_users_first_then_depth_first_per_twin() {
    let export = json!({
        "users": { "u1": {}, "u2": {} },
        "digital_twins": {
            "dt1": {
                "__collections__": {
                    "conversations": {
                        "c1": { "__collections__": { "messages": { "m1": {} } } },
                        "c2": {}
                    }
                }
            },
            "dt2": {
                "__collections__": {
                    "conversations": {
                        "c3": { "__collections__": { "messages": { "m2": {}, "m3": {} } } }
                    }
                }
            }
        }
    });
    let source = load(&export);
    let mut log = EventLog::default();

    migrate(&source, Destination::DryRun, &mut log).expect("dry run should succeed");

    assert_eq!(
        log.events,
        vec![
            "stage:users",
            "users:users/u1",
            "users:users/u2",
            "stage:digital_twins",
            "digital_twins:digital_twins/dt1",
            "conversations:digital_twins/dt1/conversations/c1",
            "avatar_conversations:digital_twins/dt1/conversations/c1/messages/m1",
            "conversations:digital_twins/dt1/conversations/c2",
            "digital_twins:digital_twins/dt2",
            "conversations:digital_twins/dt2/conversations/c3",
            "avatar_conversations:digital_twins/dt2/conversations/c3/messages/m2",
            "avatar_conversations:digital_twins/dt2/conversations/c3/messages/m3",
        ]
    );
}

#[test]
fn fields_outside_the_projection_survive_in_the_target() {
    let source = load(&sample_export());
    let mut store = SqliteDocumentStore::open_in_memory("app").expect("store should open");

    let mut existing = TargetDocument::new();
    existing.set("user_id", FieldValue::string("u1"));
    existing.set("plan", FieldValue::string("premium"));
    existing.set("email", FieldValue::string("stale@example.com"));
    store
        .upsert("users", "user_id", "u1", &existing)
        .expect("seed should succeed");

    migrate(&source, Destination::Live(&mut store), &mut EventLog::default())
        .expect("migration should succeed");

    let user = store
        .find("users", "user_id", "u1")
        .expect("find")
        .expect("user should exist");
    assert_eq!(user["plan"], json!("premium"));
    assert_eq!(user["email"], json!("ada@example.com"));
}

#[test]
fn empty_source_migrates_nothing() {
    let source = load(&json!({}));
    let mut store = SqliteDocumentStore::open_in_memory("app").expect("store should open");

    let summary = migrate(&source, Destination::Live(&mut store), &mut EventLog::default())
        .expect("migration should succeed");

    assert_eq!(summary, MigrationSummary::default());
}

#[test]
fn planned_message_upsert_shape() {
    let source = load(&sample_export());
    let mut recorder = PlanRecorder::new();
    migrate(&source, Destination::DryRun, &mut recorder).expect("dry run should succeed");

    let message_plan = recorder
        .plans()
        .iter()
        .find(|plan| plan.kind == EntityKind::Message && plan.key == "m2")
        .expect("m2 should be planned");
    let encoded = message_plan.to_json().expect("plan should encode");

    insta::assert_json_snapshot!(encoded, @r#"
    {
      "action": "upsert",
      "collection": "avatar_conversations",
      "doc": {
        "conversation_id": "c1",
        "digital_twin_id": "dt1",
        "media": [
          {
            "type": "image",
            "url": "https://cdn.example/a.png"
          }
        ],
        "message": "",
        "message_id": "m2",
        "sender": "assistant",
        "timestamp": {
          "$date": "2024-05-01T10:06:00Z"
        },
        "type": "image"
      },
      "filter": {
        "message_id": "m2"
      }
    }
    "#);
}
