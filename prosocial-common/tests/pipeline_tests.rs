//! Integration tests for the pipeline and lead data model
//!
//! Covers the stage-reorder permutation property, lead-stage moves touching
//! only the addressed lead, and duplicate-submit lead creation.

use prosocial_common::db::init::init_database;
use prosocial_common::db::models::Studio;
use prosocial_common::db::{leads, stages, studios};
use prosocial_common::Error;
use sqlx::SqlitePool;
use std::path::PathBuf;

struct TestDb {
    pool: SqlitePool,
    path: PathBuf,
}

impl Drop for TestDb {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

async fn setup(tag: &str) -> TestDb {
    let path = PathBuf::from(format!(
        "/tmp/prosocial-pipeline-{}-{}.db",
        tag,
        std::process::id()
    ));
    let _ = std::fs::remove_file(&path);

    let pool = init_database(&path).await.expect("init database");
    TestDb { pool, path }
}

async fn make_studio(pool: &SqlitePool, slug: &str) -> Studio {
    let new = studios::NewStudio {
        name: "Test Studio".to_string(),
        slug: slug.to_string(),
        email: Some("owner@studio.com".to_string()),
        phone: None,
        active: true,
    };
    studios::create_studio(pool, &new).await.expect("create studio")
}

fn lead_named(name: &str, request_key: Option<&str>) -> leads::NewLead {
    leads::NewLead {
        name: name.to_string(),
        email: None,
        phone: None,
        channel_id: None,
        agent_id: None,
        stage_id: None,
        notes: None,
        request_key: request_key.map(str::to_string),
    }
}

#[tokio::test]
async fn test_new_studio_gets_default_lead_stages() {
    let db = setup("default-stages").await;
    let studio = make_studio(&db.pool, "default-stages").await;

    let stage_list = stages::list_stages(&db.pool, &studio.guid, "lead")
        .await
        .unwrap();

    assert_eq!(stage_list.len(), 5);
    // Dense 0-based display order
    for (index, stage) in stage_list.iter().enumerate() {
        assert_eq!(stage.position, index as i64);
    }
    assert_eq!(stage_list[0].name, "New");
    assert_eq!(stage_list[4].name, "Lost");
}

#[tokio::test]
async fn test_reorder_applies_permutation() {
    let db = setup("reorder").await;
    let studio = make_studio(&db.pool, "reorder").await;

    let before = stages::list_stages(&db.pool, &studio.guid, "lead")
        .await
        .unwrap();

    // Reverse the pipeline
    let moves: Vec<stages::StagePosition> = before
        .iter()
        .enumerate()
        .map(|(index, stage)| stages::StagePosition {
            stage_id: stage.guid.clone(),
            position: (before.len() - 1 - index) as i64,
        })
        .collect();

    let after = stages::reorder_stages(&db.pool, &studio.guid, "lead", &moves)
        .await
        .unwrap();

    // Same stage set, positions still dense 0..n
    assert_eq!(after.len(), before.len());
    let mut before_ids: Vec<&str> = before.iter().map(|s| s.guid.as_str()).collect();
    let mut after_ids: Vec<&str> = after.iter().map(|s| s.guid.as_str()).collect();
    before_ids.sort_unstable();
    after_ids.sort_unstable();
    assert_eq!(before_ids, after_ids);

    for (index, stage) in after.iter().enumerate() {
        assert_eq!(stage.position, index as i64);
    }

    // First is now what used to be last
    assert_eq!(after[0].guid, before[4].guid);
}

#[tokio::test]
async fn test_reorder_rejects_partial_submission() {
    let db = setup("reorder-partial").await;
    let studio = make_studio(&db.pool, "reorder-partial").await;

    let before = stages::list_stages(&db.pool, &studio.guid, "lead")
        .await
        .unwrap();

    // Submitting only two of five stages must be rejected and change nothing
    let moves = vec![
        stages::StagePosition {
            stage_id: before[0].guid.clone(),
            position: 1,
        },
        stages::StagePosition {
            stage_id: before[1].guid.clone(),
            position: 0,
        },
    ];

    let result = stages::reorder_stages(&db.pool, &studio.guid, "lead", &moves).await;
    assert!(matches!(result, Err(Error::InvalidInput(_))));

    let after = stages::list_stages(&db.pool, &studio.guid, "lead")
        .await
        .unwrap();
    for (index, stage) in after.iter().enumerate() {
        assert_eq!(stage.guid, before[index].guid, "order changed after rejected reorder");
    }
}

#[tokio::test]
async fn test_move_lead_changes_only_that_lead() {
    let db = setup("move-lead").await;
    let studio = make_studio(&db.pool, "move-lead").await;

    let stage_list = stages::list_stages(&db.pool, &studio.guid, "lead")
        .await
        .unwrap();

    let first = leads::create_lead(&db.pool, &studio.guid, &lead_named("Ana", None))
        .await
        .unwrap()
        .lead;
    let second = leads::create_lead(&db.pool, &studio.guid, &lead_named("Bruno", None))
        .await
        .unwrap()
        .lead;

    // Both start in the first stage
    assert_eq!(first.stage_id, stage_list[0].guid);
    assert_eq!(second.stage_id, stage_list[0].guid);

    let target = &stage_list[3];
    let moved = leads::move_lead_stage(&db.pool, &studio.guid, &first.guid, &target.guid)
        .await
        .unwrap();
    assert_eq!(moved.stage_id, target.guid);

    // The other lead is untouched
    let untouched = leads::get_lead(&db.pool, &studio.guid, &second.guid)
        .await
        .unwrap();
    assert_eq!(untouched.stage_id, stage_list[0].guid);
}

#[tokio::test]
async fn test_move_lead_rejects_foreign_stage() {
    let db = setup("move-foreign").await;
    let studio_a = make_studio(&db.pool, "move-foreign-a").await;
    let studio_b = make_studio(&db.pool, "move-foreign-b").await;

    let lead = leads::create_lead(&db.pool, &studio_a.guid, &lead_named("Ana", None))
        .await
        .unwrap()
        .lead;

    let foreign_stages = stages::list_stages(&db.pool, &studio_b.guid, "lead")
        .await
        .unwrap();

    let result =
        leads::move_lead_stage(&db.pool, &studio_a.guid, &lead.guid, &foreign_stages[0].guid).await;
    assert!(matches!(result, Err(Error::NotFound(_))));
}

#[tokio::test]
async fn test_duplicate_request_key_creates_one_lead() {
    let db = setup("double-submit").await;
    let studio = make_studio(&db.pool, "double-submit").await;

    let payload = lead_named("Ana", Some("form-submit-42"));

    let first = leads::create_lead(&db.pool, &studio.guid, &payload)
        .await
        .unwrap();
    assert!(first.created);

    let second = leads::create_lead(&db.pool, &studio.guid, &payload)
        .await
        .unwrap();
    assert!(!second.created);
    assert_eq!(first.lead.guid, second.lead.guid);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM leads WHERE studio_id = ?")
        .bind(&studio.guid)
        .fetch_one(&db.pool)
        .await
        .unwrap();
    assert_eq!(count, 1, "double submit created extra leads");
}

#[tokio::test]
async fn test_delete_stage_with_leads_refused() {
    let db = setup("delete-stage").await;
    let studio = make_studio(&db.pool, "delete-stage").await;

    let stage_list = stages::list_stages(&db.pool, &studio.guid, "lead")
        .await
        .unwrap();
    let first_stage = &stage_list[0];

    leads::create_lead(&db.pool, &studio.guid, &lead_named("Ana", None))
        .await
        .unwrap();

    let result = stages::delete_stage(&db.pool, &studio.guid, &first_stage.guid).await;
    assert!(matches!(result, Err(Error::Conflict(_))));

    // An empty stage deletes fine
    let empty_stage = &stage_list[4];
    stages::delete_stage(&db.pool, &studio.guid, &empty_stage.guid)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_board_groups_leads_by_stage() {
    let db = setup("board").await;
    let studio = make_studio(&db.pool, "board").await;

    let stage_list = stages::list_stages(&db.pool, &studio.guid, "lead")
        .await
        .unwrap();

    let lead = leads::create_lead(&db.pool, &studio.guid, &lead_named("Ana", None))
        .await
        .unwrap()
        .lead;
    leads::move_lead_stage(&db.pool, &studio.guid, &lead.guid, &stage_list[2].guid)
        .await
        .unwrap();

    let columns = leads::board(&db.pool, &studio.guid, "lead").await.unwrap();
    assert_eq!(columns.len(), stage_list.len());
    assert_eq!(columns[2].leads.len(), 1);
    assert_eq!(columns[2].leads[0].guid, lead.guid);
    assert!(columns[0].leads.is_empty());
}
