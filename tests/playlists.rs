use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use actix_web::{App, test, web};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use sqlx::sqlite::SqlitePool;
use tokio_util::sync::CancellationToken;

use judgehub::config::default_languages;
use judgehub::database as db;
use judgehub::judge::{BatchPoller, Judge0Client, Orchestrator, PollPolicy, TestCase};
use judgehub::routes::{Difficulty, ProblemBody, ReferenceSolutions};
use judgehub::web_server::app_config;

static TEST_DB_COUNTER: AtomicU32 = AtomicU32::new(0);

async fn create_test_db() -> (SqlitePool, String) {
    let test_id = TEST_DB_COUNTER.fetch_add(1, Ordering::SeqCst);
    let db_path = format!("data/test_playlists_{}.db", test_id);

    db::remove_db(&db_path);
    let db_pool = db::init_db(&db_path)
        .await
        .expect("Failed to initialize test database");

    (db_pool, db_path)
}

struct TestDbGuard {
    db_path: String,
}

impl Drop for TestDbGuard {
    fn drop(&mut self) {
        db::remove_db(&self.db_path);
    }
}

// Playlists never reach the judge
fn idle_orchestrator() -> Orchestrator {
    let client =
        Judge0Client::new("http://127.0.0.1:9", None, Duration::from_secs(1)).unwrap();
    Orchestrator::new(
        BatchPoller::new(Arc::new(client), PollPolicy::default(), 1),
        default_languages(),
    )
}

async fn insert_problem(pool: &SqlitePool, title: &str, difficulty: Difficulty) -> i64 {
    let body = ProblemBody {
        title: title.to_string(),
        description: String::new(),
        difficulty,
        tags: Vec::new(),
        examples: json!({}),
        constraints: String::new(),
        hints: Some("think".to_string()),
        editorial: None,
        code_snippets: BTreeMap::new(),
        test_cases: vec![TestCase {
            input: "1".to_string(),
            output: "1".to_string(),
        }],
        reference_solutions: ReferenceSolutions::from_iter([("PYTHON", "print(1)")]),
    };
    db::create_problem(&body, "root", Arc::new(pool.clone()))
        .await
        .unwrap()
        .id
}

macro_rules! init_app {
    ($pool:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($pool))
                .app_data(web::Data::new(idle_orchestrator()))
                .app_data(web::Data::new(CancellationToken::new()))
                .configure(app_config),
        )
        .await
    };
}

macro_rules! create_playlist {
    ($app:expr, $user:expr, $name:expr) => {{
        let req = test::TestRequest::post()
            .uri("/playlists")
            .insert_header(("X-User-Id", $user))
            .set_json(json!({"name": $name, "description": "practice"}))
            .to_request();
        let resp = test::call_service(&$app, req).await;
        assert_eq!(resp.status(), 201);
        let body: Value = test::read_body_json(resp).await;
        body["id"].as_i64().unwrap()
    }};
}

#[actix_web::test]
async fn test_playlist_lifecycle() {
    let (db_pool, db_path) = create_test_db().await;
    let _guard = TestDbGuard { db_path };
    let easy = insert_problem(&db_pool, "Echo", Difficulty::Easy).await;
    let hard = insert_problem(&db_pool, "Graph", Difficulty::Hard).await;

    let app = init_app!(db_pool);
    let playlist_id = create_playlist!(app, "alice", "warmup");

    let req = test::TestRequest::post()
        .uri(&format!("/playlists/{playlist_id}/problems"))
        .insert_header(("X-User-Id", "alice"))
        .set_json(json!({"problem_ids": [easy, hard]}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body, json!({"added": 2}));

    // Adding again is a no-op
    let req = test::TestRequest::post()
        .uri(&format!("/playlists/{playlist_id}/problems"))
        .insert_header(("X-User-Id", "alice"))
        .set_json(json!({"problem_ids": [easy]}))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body, json!({"added": 0}));

    let req = test::TestRequest::get()
        .uri(&format!("/playlists/{playlist_id}"))
        .insert_header(("X-User-Id", "alice"))
        .to_request();
    let playlist: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(playlist["name"], "warmup");
    assert_eq!(playlist["description"], "practice");
    assert_eq!(
        playlist["problems"],
        json!([
            {"id": easy, "title": "Echo", "difficulty": "EASY"},
            {"id": hard, "title": "Graph", "difficulty": "HARD"}
        ])
    );

    let req = test::TestRequest::delete()
        .uri(&format!("/playlists/{playlist_id}/problems"))
        .insert_header(("X-User-Id", "alice"))
        .set_json(json!({"problem_ids": [easy]}))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body, json!({"removed": 1}));

    let req = test::TestRequest::get()
        .uri("/playlists")
        .insert_header(("X-User-Id", "alice"))
        .to_request();
    let playlists: Value = test::call_and_read_body_json(&app, req).await;
    let playlists = playlists.as_array().unwrap();
    assert_eq!(playlists.len(), 1);
    assert_eq!(playlists[0]["problems"].as_array().unwrap().len(), 1);

    let req = test::TestRequest::delete()
        .uri(&format!("/playlists/{playlist_id}"))
        .insert_header(("X-User-Id", "alice"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let req = test::TestRequest::get()
        .uri(&format!("/playlists/{playlist_id}"))
        .insert_header(("X-User-Id", "alice"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);
}

#[actix_web::test]
async fn test_playlists_are_private_to_their_owner() {
    let (db_pool, db_path) = create_test_db().await;
    let _guard = TestDbGuard { db_path };
    let problem = insert_problem(&db_pool, "Echo", Difficulty::Easy).await;

    let app = init_app!(db_pool);
    let playlist_id = create_playlist!(app, "alice", "mine");

    let req = test::TestRequest::get()
        .uri(&format!("/playlists/{playlist_id}"))
        .insert_header(("X-User-Id", "bob"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);

    let req = test::TestRequest::post()
        .uri(&format!("/playlists/{playlist_id}/problems"))
        .insert_header(("X-User-Id", "bob"))
        .set_json(json!({"problem_ids": [problem]}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);

    let req = test::TestRequest::delete()
        .uri(&format!("/playlists/{playlist_id}"))
        .insert_header(("X-User-Id", "bob"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);

    let req = test::TestRequest::get()
        .uri("/playlists")
        .insert_header(("X-User-Id", "bob"))
        .to_request();
    let playlists: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(playlists, json!([]));
}

#[actix_web::test]
async fn test_playlist_validation() {
    let (db_pool, db_path) = create_test_db().await;
    let _guard = TestDbGuard { db_path };

    let app = init_app!(db_pool);
    let playlist_id = create_playlist!(app, "alice", "dup");

    // Names are unique per user
    let req = test::TestRequest::post()
        .uri("/playlists")
        .insert_header(("X-User-Id", "alice"))
        .set_json(json!({"name": "dup"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    create_playlist!(app, "bob", "dup");

    let req = test::TestRequest::post()
        .uri("/playlists")
        .insert_header(("X-User-Id", "alice"))
        .set_json(json!({"name": "   "}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);

    let req = test::TestRequest::post()
        .uri(&format!("/playlists/{playlist_id}/problems"))
        .insert_header(("X-User-Id", "alice"))
        .set_json(json!({"problem_ids": []}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);

    let req = test::TestRequest::post()
        .uri(&format!("/playlists/{playlist_id}/problems"))
        .insert_header(("X-User-Id", "alice"))
        .set_json(json!({"problem_ids": [404]}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);
}
