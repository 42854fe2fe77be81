//! End-to-end tests of the HTTP surface against in-memory fakes of the chat
//! model, the Notion API and the settings table.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use api_lib::adapters::json_store::JsonFileStore;
use api_lib::config::Config;
use api_lib::web::{router, state::AppState};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use mind_brain_core::domain::{
    Message, NotionDatabase, NotionPageLayout, NotionSettings, NotionTodo, OAuthGrant, Todo,
};
use mind_brain_core::ports::{
    ChatCompletionService, NotionGateway, NotionSettingsRepository, PortError, PortResult, PromptKind,
};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

//=========================================================================================
// Fakes
//=========================================================================================

/// Answers every completion with the same text, or fails when there is none.
struct FixedChat(Option<String>);

#[async_trait]
impl ChatCompletionService for FixedChat {
    async fn complete(&self, _: PromptKind, _: &[Message]) -> PortResult<Option<String>> {
        self.0.clone().map(Some).ok_or_else(|| PortError::Unexpected("upstream down".into()))
    }
}

#[derive(Default)]
struct FakeNotion {
    rows: Vec<NotionTodo>,
    pages: Mutex<Vec<String>>,
}

#[async_trait]
impl NotionGateway for FakeNotion {
    async fn exchange_code(&self, code: &str, _: &str) -> PortResult<OAuthGrant> {
        if code != "good-code" {
            return Err(PortError::Unauthorized);
        }
        Ok(OAuthGrant {
            access_token: "oauth-token".into(),
            bot_id: Some("bot".into()),
            workspace_id: Some("ws".into()),
            workspace_name: Some("Home".into()),
            workspace_icon: None,
        })
    }

    async fn search_databases(&self, _: &str) -> PortResult<Vec<NotionDatabase>> {
        Ok(vec![NotionDatabase { id: "db-1".into(), title: "Todos".into(), url: None }])
    }

    async fn fetch_database(&self, token: &str, database_id: &str) -> PortResult<NotionDatabase> {
        if token != "secret_ok" {
            return Err(PortError::Unauthorized);
        }
        Ok(NotionDatabase { id: database_id.into(), title: "Todos".into(), url: None })
    }

    async fn page_layout(&self, _: &str, _: &str) -> PortResult<NotionPageLayout> {
        Ok(NotionPageLayout { title_property: "Name".into(), ..Default::default() })
    }

    async fn create_todo_page(&self, _: &str, _: &str, _: &NotionPageLayout, todo: &Todo) -> PortResult<String> {
        self.pages.lock().unwrap().push(todo.content.clone());
        Ok(format!("page-{}", todo.id))
    }

    async fn query_todos(&self, _: &str, _: &str) -> PortResult<Vec<NotionTodo>> {
        Ok(self.rows.clone())
    }
}

#[derive(Default)]
struct MemorySettings(Mutex<HashMap<String, NotionSettings>>);

#[async_trait]
impl NotionSettingsRepository for MemorySettings {
    async fn get_settings(&self, user_id: &str) -> PortResult<Option<NotionSettings>> {
        Ok(self.0.lock().unwrap().get(user_id).cloned())
    }

    async fn upsert_settings(&self, user_id: &str, settings: &NotionSettings) -> PortResult<()> {
        self.0.lock().unwrap().insert(user_id.to_string(), settings.clone());
        Ok(())
    }
}

//=========================================================================================
// Harness
//=========================================================================================

struct TestApp {
    app: Router,
    dir: TempDir,
}

fn app_with(chat: FixedChat, notion: FakeNotion) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let config = Arc::new(Config::for_tests(dir.path().to_path_buf()));
    let storage = Arc::new(JsonFileStore::open(dir.path()).unwrap());
    let state = AppState::new(
        config,
        storage,
        Arc::new(chat),
        Arc::new(notion),
        Arc::new(MemorySettings::default()),
    );
    TestApp { app: router(Arc::new(state)), dir }
}

fn app() -> TestApp {
    app_with(FixedChat(Some("你覺得是什麼讓你有這個想法？".into())), FakeNotion::default())
}

impl TestApp {
    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(json_request("POST", uri, body)).await
    }

    /// Replaces a storage file as an older or hand-edited client would have left it.
    fn write_stored(&self, key: &str, raw: &str) {
        std::fs::write(self.dir.path().join(format!("{key}.json")), raw).unwrap();
    }

    async fn new_thought(&self, content: &str) -> String {
        let (status, thought) = self.post("/thoughts", json!({ "content": content })).await;
        assert_eq!(status, StatusCode::CREATED);
        thought["id"].as_str().unwrap().to_string()
    }
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

//=========================================================================================
// Thoughts & Todos
//=========================================================================================

#[tokio::test]
async fn thoughts_can_be_recorded_and_read_back() {
    let app = app();
    let id = app.new_thought("想換工作").await;

    let (status, thought) = app.get(&format!("/thoughts/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(thought["content"], "想換工作");

    let (_, all) = app.get("/thoughts").await;
    assert_eq!(all.as_array().unwrap().len(), 1);

    let (status, _) = app.post("/thoughts", json!({ "content": "   " })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.get("/thoughts/404").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn an_odd_stored_thought_does_not_hide_the_others() {
    let app = app();
    app.write_stored(
        "thoughts-data",
        r#"[
            {"id":"1","content":"還在"},
            {"id":"2","content":"舊計畫","generatedActions":[{"id":9,"content":"散步","priority":"urgent","timeEstimate":20}]},
            {"id":"3","content":["not","text"]}
        ]"#,
    );

    let (status, all) = app.get("/thoughts").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all.as_array().unwrap().len(), 2);

    let (_, odd) = app.get("/thoughts/2").await;
    assert_eq!(odd["generatedActions"][0]["id"], "9");
    assert_eq!(odd["generatedActions"][0]["priority"], "medium");
    assert_eq!(odd["generatedActions"][0]["timeEstimate"], "20");

    app.new_thought("新的").await;
    let raw = std::fs::read_to_string(app.dir.path().join("thoughts-data.json")).unwrap();
    let stored: Vec<Value> = serde_json::from_str(&raw).unwrap();
    assert_eq!(stored.len(), 4);
    assert!(stored.iter().any(|t| t["id"] == "3"));
}

#[tokio::test]
async fn todo_lifecycle_keeps_both_schedule_field_sets() {
    let app = app();
    let (status, todo) = app
        .post("/todos", json!({ "content": "跑步", "startDate": "2025-04-01", "startTime": "07:00" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(todo["scheduledDate"], "2025-04-01");
    assert_eq!(todo["scheduledTime"], "07:00");
    let id = todo["id"].as_str().unwrap().to_string();

    let (_, toggled) = app.post(&format!("/todos/{id}/toggle"), json!({})).await;
    assert_eq!(toggled["done"], true);
    let (_, toggled) = app.post(&format!("/todos/{id}/toggle"), json!({})).await;
    assert_eq!(toggled["done"], false);

    let (_, on_day) = app.get("/todos/by-date/2025-04-01").await;
    assert_eq!(on_day.as_array().unwrap().len(), 1);

    let (status, _) = app
        .send(Request::delete(format!("/todos/{id}")).body(Body::empty()).unwrap())
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, on_day) = app.get("/todos/by-date/2025-04-01").await;
    assert!(on_day.as_array().unwrap().is_empty());

    let (status, _) = app.post("/todos/missing/toggle", json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn patching_a_todo_validates_the_schedule() {
    let app = app();
    let (_, todo) = app.post("/todos", json!({ "content": "讀書" })).await;
    let uri = format!("/todos/{}", todo["id"].as_str().unwrap());

    let (status, _) = app
        .send(json_request("PATCH", &uri, json!({ "startDate": "2025-05-03", "endDate": "2025-05-01" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, patched) = app
        .send(json_request("PATCH", &uri, json!({ "startDate": "2025-05-01", "endDate": "2025-05-03" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(patched["endDate"], "2025-05-03");

    let (_, available) = app.get("/todos?bucket=scheduled").await;
    assert_eq!(available.as_array().unwrap().len(), 1);
}

//=========================================================================================
// AI
//=========================================================================================

#[tokio::test]
async fn deep_dive_turn_is_answered_and_saved_on_the_thought() {
    let app = app();
    let id = app.new_thought("最近總是很累").await;

    let (status, turn) = app
        .post(&format!("/thoughts/{id}/deep-dive"), json!({ "message": "可能是睡不好" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(turn["outcome"], "answered");
    assert_eq!(turn["messages"].as_array().unwrap().len(), 3);

    let (_, thought) = app.get(&format!("/thoughts/{id}")).await;
    assert_eq!(thought["aiConversation"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn deep_dive_failure_keeps_the_user_turn() {
    let app = app_with(FixedChat(None), FakeNotion::default());
    let id = app.new_thought("想學畫畫").await;

    let (status, turn) = app
        .post(&format!("/thoughts/{id}/deep-dive"), json!({ "message": "不知道從哪開始" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(turn["outcome"], "failed");
    assert!(turn["error"].is_string());
    assert_eq!(turn["messages"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn action_plan_is_capped_and_can_be_accepted_or_scheduled() {
    let reply = json!([
        { "id": "a1", "content": "列出興趣", "priority": "high", "timeEstimate": "15分鐘", "category": "規劃" },
        { "id": "a2", "content": "找課程", "priority": "high", "timeEstimate": "30分鐘", "category": "學習" },
        { "id": "a3", "content": "問朋友", "priority": "low", "timeEstimate": "10分鐘", "category": "人際" },
        { "id": "a4", "content": "排時間", "priority": "medium", "timeEstimate": "5分鐘", "category": "規劃" },
        { "id": "a5", "content": "買材料", "priority": "medium", "timeEstimate": "1小時", "category": "其他" },
        { "id": "a6", "content": "多出來的", "priority": "low", "timeEstimate": "1小時", "category": "其他" }
    ]);
    let app = app_with(FixedChat(Some(reply.to_string())), FakeNotion::default());
    let id = app.new_thought("想培養新嗜好").await;

    let (status, plan) = app.post(&format!("/thoughts/{id}/action-plan"), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(plan["source"], "parsed");
    assert_eq!(plan["items"].as_array().unwrap().len(), 5);
    assert_eq!(plan["defaultSelection"], json!(["a1", "a2"]));

    let (status, accepted) = app
        .send(Request::post(format!("/thoughts/{id}/action-plan/accept")).body(Body::empty()).unwrap())
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(accepted.as_array().unwrap().len(), 2);
    assert_eq!(accepted[0]["thoughtId"], id.as_str());

    let (status, scheduled) = app
        .post(
            &format!("/thoughts/{id}/action-plan/a3/schedule"),
            json!({ "startDate": "2025-06-01", "startTime": "10:00" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(scheduled["content"], "問朋友");
    assert_eq!(scheduled["startTime"], "10:00");

    let (_, thought) = app.get(&format!("/thoughts/{id}")).await;
    assert_eq!(thought["generatedActions"].as_array().unwrap().len(), 4);

    let (status, _) = app
        .post(&format!("/thoughts/{id}/action-plan/a3/schedule"), json!({ "startDate": "2025-06-01" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn action_plan_reads_numeric_fields_as_text() {
    let reply = json!([
        { "id": 1, "content": "查房租", "priority": "high", "timeEstimate": 30, "category": 7 },
        { "content": "看房", "priority": 2 }
    ]);
    let app = app_with(FixedChat(Some(reply.to_string())), FakeNotion::default());
    let id = app.new_thought("想搬家").await;

    let (status, plan) = app.post(&format!("/thoughts/{id}/action-plan"), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(plan["source"], "parsed");
    let items = plan["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["id"], "1");
    assert_eq!(items[0]["timeEstimate"], "30");
    assert_eq!(items[0]["category"], "7");
    assert_eq!(items[1]["priority"], "medium");

    let (_, thought) = app.get(&format!("/thoughts/{id}")).await;
    assert_eq!(thought["generatedActions"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn failed_action_plan_request_falls_back_to_the_fixed_list() {
    let app = app_with(FixedChat(None), FakeNotion::default());
    let id = app.new_thought("想存錢").await;

    let (status, plan) = app.post(&format!("/thoughts/{id}/action-plan"), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(plan["source"], "fallback");
    assert_eq!(plan["items"].as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn mind_map_renders_as_json_and_svg() {
    let app = app();
    let id = app.new_thought("要不要搬家").await;
    app.post(&format!("/thoughts/{id}/deep-dive"), json!({ "message": "通勤太久了" })).await;

    let (status, map) = app.get(&format!("/thoughts/{id}/mind-map")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(map["source"], "timeline");
    assert!(!map["commands"].as_array().unwrap().is_empty());

    let response = app
        .app
        .clone()
        .oneshot(Request::get(format!("/thoughts/{id}/mind-map?format=svg")).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/svg+xml");
}

#[tokio::test]
async fn mind_map_view_values_are_validated_and_bounded() {
    let app = app();
    let id = app.new_thought("要不要換手機").await;

    for bad in ["offsetX=inf", "zoom=NaN", "width=-inf", "pointerY=infinity"] {
        let (status, _) = app.get(&format!("/thoughts/{id}/mind-map?{bad}")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{bad}");
    }

    let (status, map) = app
        .get(&format!("/thoughts/{id}/mind-map?zoom=0.5&offsetX=1e300&width=10000000&height=10000000"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(map["commands"].as_array().unwrap().len() < 1000);
}

#[tokio::test]
async fn ai_proxy_answers_in_chat_completion_shape() {
    let app = app();
    let (status, reply) = app
        .post("/ai-proxy", json!({ "type": "chat", "messages": [{ "role": "user", "content": "嗨" }] }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply["choices"][0]["message"]["content"], "你覺得是什麼讓你有這個想法？");

    let (status, _) = app.post("/ai-proxy", json!({ "type": "chat", "messages": [] })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

//=========================================================================================
// Calendar & Search
//=========================================================================================

#[tokio::test]
async fn dropping_a_todo_moves_it_into_the_hour_slot() {
    let app = app();
    let (_, todo) = app.post("/todos", json!({ "content": "寫報告" })).await;
    let id = todo["id"].as_str().unwrap();

    let (status, moved) = app
        .post("/calendar/drop", json!({ "todoId": id, "date": "2025-07-10", "time": "14:00" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(moved["startDate"], "2025-07-10");

    let (_, view) = app.get("/calendar?view=day&date=2025-07-10").await;
    let slot = &view["days"][0]["slots"][14];
    assert_eq!(slot["time"], "14:00");
    assert_eq!(slot["todos"][0]["id"], id);

    let (_, month) = app.get("/calendar?view=month&date=2025-07-10&nav=next").await;
    assert_eq!(month["anchor"], "2025-08-10");
    assert_eq!(month["days"].as_array().unwrap().len(), 42);
}

#[tokio::test]
async fn a_drag_started_earlier_is_dropped_later() {
    let app = app();
    let (_, todo) = app.post("/todos", json!({ "content": "繳費" })).await;
    let id = todo["id"].as_str().unwrap();

    let (status, _) = app.post("/calendar/drop", json!({ "date": "2025-07-11" })).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, gestures) = app.post("/calendar/drag", json!({ "todoId": id })).await;
    assert_eq!(gestures["dragging"], id);
    let (status, moved) = app.post("/calendar/drop", json!({ "date": "2025-07-11" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(moved["startTime"], "09:00");

    let (status, _) = app.post("/calendar/drop", json!({ "date": "2025-07-12" })).await;
    assert_eq!(status, StatusCode::CONFLICT);

    app.post("/calendar/drag", json!({ "todoId": id })).await;
    let (_, gestures) = app.send(Request::delete("/calendar/drag").body(Body::empty()).unwrap()).await;
    assert!(gestures["dragging"].is_null());
}

#[tokio::test]
async fn click_to_schedule_draft_defaults_to_nine_to_ten() {
    let app = app();
    let (status, draft) = app.post("/calendar/draft", json!({ "itemId": "x", "date": "2025-07-10" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(draft["startDate"], "2025-07-10");
    assert_eq!(draft["endDate"], "2025-07-10");

    let (status, draft) = app.post("/calendar/draft", json!({ "date": "2025-07-12", "time": "15:00" })).await;
    assert_eq!(status, StatusCode::OK);
    assert!(draft["endTime"].as_str().unwrap().starts_with("15:00"));

    app.send(Request::delete("/calendar/arm").body(Body::empty()).unwrap()).await;
    let (status, _) = app.post("/calendar/draft", json!({ "date": "2025-07-12" })).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn search_matches_thoughts_and_todos() {
    let app = app();
    app.new_thought("Learn Rust this year").await;
    app.post("/todos", json!({ "content": "read the rust book" })).await;
    app.post("/todos", json!({ "content": "groceries" })).await;

    let (_, results) = app.get("/search?q=RUST").await;
    assert_eq!(results["thoughts"].as_array().unwrap().len(), 1);
    assert_eq!(results["todos"].as_array().unwrap().len(), 1);
}

//=========================================================================================
// Notion
//=========================================================================================

#[tokio::test]
async fn manual_setup_requires_a_passing_test_before_saving() {
    let app = app();
    let creds = json!({ "token": "secret_ok", "databaseId": "db-9" });

    let (status, _) = app.send(json_request("PUT", "/settings/notion", creds.clone())).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .post("/settings/notion/test", json!({ "token": "secret_bad", "databaseId": "db-9" }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, tested) = app.post("/settings/notion/test", creds.clone()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tested["database"]["id"], "db-9");

    let (status, saved) = app.send(json_request("PUT", "/settings/notion", creds)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(saved["connected"], true);
    assert!(saved.get("notion_api_token").is_none());
}

#[tokio::test]
async fn sync_pushes_every_todo_and_pulls_only_new_content() {
    let notion = FakeNotion {
        rows: vec![
            NotionTodo { page_id: "p1".into(), content: "已經有了".into(), done: false, scheduled_date: None, scheduled_time: None },
            NotionTodo {
                page_id: "p2".into(),
                content: "新的".into(),
                done: true,
                scheduled_date: Some("2025-09-09".into()),
                scheduled_time: None,
            },
            NotionTodo { page_id: "p3".into(), content: "新的".into(), done: false, scheduled_date: None, scheduled_time: None },
        ],
        ..Default::default()
    };
    let app = app_with(FixedChat(None), notion);

    let (status, _) = app.post("/notion/sync/push", json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let creds = json!({ "token": "secret_ok", "databaseId": "db-1" });
    app.post("/settings/notion/test", creds.clone()).await;
    app.send(json_request("PUT", "/settings/notion", creds)).await;
    app.post("/todos", json!({ "content": "已經有了" })).await;

    let (status, pushed) = app.post("/notion/sync/push", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(pushed[0]["success"], true);

    let (status, pulled) = app.post("/notion/sync/pull", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(pulled["pulled"], 3);
    let created = pulled["created"].as_array().unwrap();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0]["done"], true);
    assert_eq!(created[0]["scheduledDate"], "2025-09-09");

    let (status, _) = app.post("/settings/notion/disconnect", json!({})).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.post("/notion/sync/pull", json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn oauth_redirect_round_trip_links_the_workspace() {
    let app = app();
    let response = app
        .app
        .clone()
        .oneshot(Request::get("/auth/notion/authorize").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let location = reqwest::Url::parse(response.headers()[header::LOCATION].to_str().unwrap()).unwrap();
    let params: HashMap<String, String> = location.query_pairs().into_owned().collect();
    assert_eq!(params["client_id"], "test-client");
    assert_eq!(params["owner"], "user");

    let (status, linked) = app
        .get(&format!("/auth/notion/callback?code=good-code&state={}", params["state"]))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(linked["settings"]["connected"], true);
    assert_eq!(linked["settings"]["databaseId"], "db-1");

    let (_, settings) = app.get("/settings/notion").await;
    assert_eq!(settings["oauth"]["status"], "connected");

    let other_user = Request::get("/settings/notion").header("x-user-id", "alice").body(Body::empty()).unwrap();
    let (_, settings) = app.send(other_user).await;
    assert_eq!(settings["connected"], false);
}

#[tokio::test]
async fn oauth_callback_with_a_foreign_state_is_rejected() {
    let app = app();
    app.get("/auth/notion/authorize").await;

    let (status, _) = app.get("/auth/notion/callback?code=good-code&state=forged").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.get("/auth/notion/callback?error=access_denied").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_routes_answer_with_json_404() {
    let app = app();
    let (status, body) = app.get("/nowhere").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Not found");
}
