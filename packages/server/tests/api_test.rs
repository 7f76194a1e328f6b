//! HTTP API tests driving the router in-process.

mod common;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use gamejam_server::{
    domain::{ExampleGame, SessionId},
    ui::build_router,
};
use serde_json::{Value, json};
use tower::ServiceExt;

use common::{CannedProvider, UnreachableProvider, app_state};

fn router() -> Router {
    build_router(app_state(CannedProvider::new(&["Hello", " world"])))
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            request = request.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    let response = app
        .clone()
        .oneshot(request.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn new_game(title: &str, author: &str) -> Value {
    json!({
        "title": title,
        "code": "return function(p) { p.setup = function() {}; p.draw = function() {}; }",
        "author_id": author,
        "author_username": format!("{} the maker", author),
    })
}

#[tokio::test]
async fn test_health_check() {
    // テスト項目: ヘルスチェックは {status: "ok"} を返す
    // given (前提条件):
    let app = router();

    // when (操作):
    let (status, body) = send(&app, Method::GET, "/api/health", None).await;

    // then (期待する結果):
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok"}));
}

#[tokio::test]
async fn test_game_crud_lifecycle() {
    // テスト項目: 作成、一覧、取得、部分更新、削除が一通り動作する
    // given (前提条件):
    let app = router();

    // when (操作): 作成
    let (status, created) = send(
        &app,
        Method::POST,
        "/api/games",
        Some(new_game("Pong", "alice")),
    )
    .await;

    // then (期待する結果):
    assert_eq!(status, StatusCode::OK);
    let id = created["game"]["id"].as_str().unwrap().to_string();
    assert_eq!(created["game"]["title"], "Pong");
    assert_eq!(created["game"]["description"], "");

    // when (操作): 作者で一覧
    let (status, listed) = send(&app, Method::GET, "/api/games?authorId=alice", None).await;

    // then (期待する結果):
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed["games"].as_array().unwrap().len(), 1);
    assert_eq!(listed["games"][0]["id"], id.as_str());

    // when (操作): 部分更新
    let (status, updated) = send(
        &app,
        Method::PATCH,
        &format!("/api/games/{}", id),
        Some(json!({"title": "Pong 2"})),
    )
    .await;

    // then (期待する結果): 指定したフィールドだけが変わる
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["game"]["title"], "Pong 2");
    assert_eq!(updated["game"]["code"], created["game"]["code"]);

    // when (操作): 取得
    let (status, fetched) = send(&app, Method::GET, &format!("/api/games/{}", id), None).await;

    // then (期待する結果):
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["game"]["title"], "Pong 2");

    // when (操作): 削除
    let (status, deleted) = send(&app, Method::DELETE, &format!("/api/games/{}", id), None).await;

    // then (期待する結果): 削除後は 404
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted, json!({"success": true}));
    let (status, body) = send(&app, Method::GET, &format!("/api/games/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"error": "Game not found"}));
}

#[tokio::test]
async fn test_list_games_only_returns_the_authors_games() {
    // テスト項目: 一覧は指定した作者のゲームだけを返す
    // given (前提条件):
    let app = router();
    send(&app, Method::POST, "/api/games", Some(new_game("Pong", "alice"))).await;
    send(&app, Method::POST, "/api/games", Some(new_game("Snake", "bob"))).await;

    // when (操作):
    let (status, listed) = send(&app, Method::GET, "/api/games?authorId=bob", None).await;

    // then (期待する結果):
    assert_eq!(status, StatusCode::OK);
    let games = listed["games"].as_array().unwrap();
    assert_eq!(games.len(), 1);
    assert_eq!(games[0]["title"], "Snake");
}

#[tokio::test]
async fn test_list_games_without_author_is_bad_request() {
    // テスト項目: authorId なしの一覧は 400
    // given (前提条件):
    let app = router();

    // when (操作):
    let (status, body) = send(&app, Method::GET, "/api/games", None).await;

    // then (期待する結果):
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Author ID is required"}));
}

#[tokio::test]
async fn test_create_game_with_missing_fields_is_bad_request() {
    // テスト項目: 必須フィールドが欠けた作成は 400
    // given (前提条件):
    let app = router();

    // when (操作):
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/games",
        Some(json!({"title": "Pong", "author_id": "alice"})),
    )
    .await;

    // then (期待する結果):
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Missing required fields"}));
}

#[tokio::test]
async fn test_create_game_with_malformed_body_is_bad_request() {
    // テスト項目: JSON として不正なボディは {error} 付きの 400
    // given (前提条件):
    let app = router();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/games")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    // when (操作):
    let response = app.oneshot(request).await.unwrap();

    // then (期待する結果):
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_unknown_game_is_not_found() {
    // テスト項目: 存在しない ID の取得・更新・削除は 404
    // given (前提条件):
    let app = router();

    // when (操作):
    let (get_status, _) = send(&app, Method::GET, "/api/games/missing", None).await;
    let (patch_status, _) = send(
        &app,
        Method::PATCH,
        "/api/games/missing",
        Some(json!({"title": "x"})),
    )
    .await;
    let (delete_status, _) = send(&app, Method::DELETE, "/api/games/missing", None).await;

    // then (期待する結果):
    assert_eq!(get_status, StatusCode::NOT_FOUND);
    assert_eq!(patch_status, StatusCode::NOT_FOUND);
    assert_eq!(delete_status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unsupported_methods_are_rejected() {
    // テスト項目: 対応していないメソッドは {error: "Method not allowed"} 付きの 405
    // given (前提条件):
    let app = router();

    // when (操作):
    let (collection_status, collection_body) =
        send(&app, Method::PUT, "/api/games", Some(json!({}))).await;
    let (item_status, _) = send(&app, Method::POST, "/api/games/some-id", Some(json!({}))).await;
    let (chat_status, _) = send(&app, Method::GET, "/api/chat", None).await;

    // then (期待する結果):
    assert_eq!(collection_status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(collection_body, json!({"error": "Method not allowed"}));
    assert_eq!(item_status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(chat_status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_chat_completion_streams_provider_text() {
    // テスト項目: /api/chat はプロバイダのテキストをそのままストリームする
    // given (前提条件):
    let provider = CannedProvider::new(&["Hello", " world"]);
    let app = build_router(app_state(provider.clone()));
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/chat")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({
                "messages": [{"role": "user", "content": "make pong"}],
                "codeState": "// current"
            })
            .to_string(),
        ))
        .unwrap();

    // when (操作):
    let response = app.oneshot(request).await.unwrap();

    // then (期待する結果):
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/event-stream"
    );
    assert_eq!(response.headers()[header::CACHE_CONTROL], "no-cache");
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"Hello world");

    let requests = provider.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].code_state.as_deref(), Some("// current"));
}

#[tokio::test]
async fn test_chat_completion_setup_failure_is_server_error() {
    // テスト項目: プロバイダの開始に失敗した場合は {error} 付きの 500
    // given (前提条件):
    let app = build_router(app_state(std::sync::Arc::new(UnreachableProvider)));

    // when (操作):
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/chat",
        Some(json!({"messages": [{"role": "user", "content": "hi"}]})),
    )
    .await;

    // then (期待する結果):
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("connection refused"));
}

#[tokio::test]
async fn test_unknown_session_is_not_found() {
    // テスト項目: 存在しないセッションの参照は 404
    // given (前提条件):
    let app = router();

    // when (操作):
    let (state_status, body) = send(&app, Method::GET, "/api/sessions/nobody", None).await;
    let (sketch_status, _) = send(&app, Method::GET, "/api/sessions/nobody/sketch", None).await;

    // then (期待する結果):
    assert_eq!(state_status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"error": "Session not found"}));
    assert_eq!(sketch_status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_session_state_lists_every_slot() {
    // テスト項目: セッション状態はすべてのスロットとエディタ状態を返す
    // given (前提条件):
    let state = app_state(CannedProvider::new(&[]));
    let session_id = SessionId::new("jam-1".to_string()).unwrap();
    state.registry.get_or_create(&session_id).await;
    let app = build_router(state);

    // when (操作):
    let (status, body) = send(&app, Method::GET, "/api/sessions/jam-1", None).await;

    // then (期待する結果):
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["session_id"], "jam-1");
    assert_eq!(body["state"]["chat_history"], json!([]));
    assert_eq!(body["state"]["batch_in_progress"], json!(false));
    assert_eq!(body["state"].as_object().unwrap().len(), 10);
    assert_eq!(body["editor"]["view_mode"], "play");
}

#[tokio::test]
async fn test_sketch_repairs_loaded_code() {
    // テスト項目: 読み込んだコードはラッパーを補われてから返される
    // given (前提条件):
    let state = app_state(CannedProvider::new(&[]));
    let session_id = SessionId::new("jam-2".to_string()).unwrap();
    let session = state.registry.get_or_create(&session_id).await;
    session
        .load_code("p.setup = function() {};\np.draw = function() {};")
        .await
        .unwrap();
    let app = build_router(state);

    // when (操作):
    let (status, body) = send(&app, Method::GET, "/api/sessions/jam-2/sketch", None).await;

    // then (期待する結果):
    assert_eq!(status, StatusCode::OK);
    assert!(
        body["code"]
            .as_str()
            .unwrap()
            .starts_with("return function(p) {")
    );
    assert_eq!(body["repairs"], json!(["wrapped bare setup/draw"]));
    assert!(body.get("fallback_reason").is_none());
}

#[tokio::test]
async fn test_new_session_serves_default_example() {
    // テスト項目: 新しいセッションのスケッチは既定のサンプルで、修復は不要
    // given (前提条件):
    let state = app_state(CannedProvider::new(&[]));
    let session_id = SessionId::new("jam-4".to_string()).unwrap();
    state.registry.get_or_create(&session_id).await;
    let app = build_router(state);

    // when (操作):
    let (status, body) = send(&app, Method::GET, "/api/sessions/jam-4/sketch", None).await;

    // then (期待する結果):
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], ExampleGame::BouncingShape.code());
    assert_eq!(body["repairs"], json!([]));
    assert!(body.get("fallback_reason").is_none());
}

#[tokio::test]
async fn test_sketch_of_cleared_session_falls_back() {
    // テスト項目: コードが空になったセッションはエラースケッチにフォールバックする
    // given (前提条件):
    let state = app_state(CannedProvider::new(&[]));
    let session_id = SessionId::new("jam-3".to_string()).unwrap();
    let session = state.registry.get_or_create(&session_id).await;
    session.load_code("  \n").await.unwrap();
    let app = build_router(state);

    // when (操作):
    let (status, body) = send(&app, Method::GET, "/api/sessions/jam-3/sketch", None).await;

    // then (期待する結果):
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["fallback_reason"], "sketch is empty");
    assert_eq!(body["repairs"], json!([]));
}
