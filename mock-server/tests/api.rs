use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, Echo, Forecast, Note, API_KEY_HEADER};
use tower::ServiceExt;

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes: bytes::Bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn get(uri: &str) -> Request<String> {
    Request::builder().uri(uri).body(String::new()).unwrap()
}

fn json_request(method: &str, uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

// --- hello ---

#[tokio::test]
async fn hello_greets_in_language() {
    let resp = app().oneshot(get("/hello/de?name=Welt")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_text(resp).await, "Hallo Welt");
}

#[tokio::test]
async fn hello_decodes_form_encoded_name() {
    let resp = app().oneshot(get("/hello/en?name=Jane+Doe")).await.unwrap();

    assert_eq!(body_text(resp).await, "Hello Jane Doe");
}

#[tokio::test]
async fn hello_without_name_greets_world() {
    let resp = app().oneshot(get("/hello")).await.unwrap();
    assert_eq!(body_text(resp).await, "Hello World");

    let resp = app().oneshot(get("/hello/fr")).await.unwrap();
    assert_eq!(body_text(resp).await, "Bonjour World");
}

#[tokio::test]
async fn hello_unknown_language_is_404() {
    let resp = app().oneshot(get("/hello/xx?name=Welt")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- notes ---

#[tokio::test]
async fn create_note_returns_201_with_timestamps() {
    let resp = app()
        .oneshot(json_request("POST", "/api/notes", r#"{"text":"Aloha"}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::CREATED);
    let note: Note = body_json(resp).await;
    assert_eq!(note.id, 1000);
    assert_eq!(note.text, "Aloha");
    assert!(note.updated.is_none());
}

#[tokio::test]
async fn create_note_from_form() {
    let resp = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/notes/form")
                .header(http::header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body("text=Hello+World%21".to_string())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::CREATED);
    let note: Note = body_json(resp).await;
    assert_eq!(note.text, "Hello World!");
}

#[tokio::test]
async fn create_note_malformed_json_returns_422() {
    let resp = app()
        .oneshot(json_request("POST", "/api/notes", r#"{"body":1}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn get_note_not_found() {
    let resp = app().oneshot(get("/api/notes/1000")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn get_note_bad_id_returns_400() {
    let resp = app().oneshot(get("/api/notes/not-a-number")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn update_note_not_found() {
    let resp = app()
        .oneshot(json_request("PUT", "/api/notes/1", r#"{"text":"Nope"}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_missing_note_is_idempotent() {
    let resp = app()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/notes/1")
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn notes_lifecycle() {
    use tower::Service;

    let mut app = app().into_service();

    // create
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request("POST", "/api/notes", r#"{"text":"Walk dog"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Note = body_json(resp).await;
    let id = created.id;

    // update answers 204 without a body
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request("PUT", &format!("/api/notes/{id}"), r#"{"text":"Walk cat"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(body_text(resp).await.is_empty());

    // get reflects the update
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(get(&format!("/api/notes/{id}")))
        .await
        .unwrap();
    let fetched: Note = body_json(resp).await;
    assert_eq!(fetched.text, "Walk cat");
    assert_eq!(fetched.created, created.created);
    assert!(fetched.updated.is_some());

    // list
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(get("/api/notes"))
        .await
        .unwrap();
    let notes: Vec<Note> = body_json(resp).await;
    assert_eq!(notes.len(), 1);

    // delete twice
    for _ in 0..2 {
        let resp = ServiceExt::ready(&mut app)
            .await
            .unwrap()
            .call(
                Request::builder()
                    .method("DELETE")
                    .uri(&format!("/api/notes/{id}"))
                    .body(String::new())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    }

    // gone
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(get(&format!("/api/notes/{id}")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- weather ---

#[tokio::test]
async fn forecast_requires_api_key() {
    let resp = app().oneshot(get("/api/weather/forecast?location=Berlin")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn forecast_answers_xml() {
    let resp = app()
        .oneshot(
            Request::builder()
                .uri("/api/weather/forecast?location=Berlin")
                .header(API_KEY_HEADER, "secret")
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[http::header::CONTENT_TYPE], "application/xml");
    let forecast: Forecast = quick_xml::de::from_str(&body_text(resp).await).unwrap();
    assert_eq!(forecast.location, "Berlin");
    assert_eq!(forecast.days.len(), 3);
}

#[tokio::test]
async fn forecast_delete_is_405() {
    let resp = app()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/weather/forecast")
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
}

// --- status and echo ---

#[tokio::test]
async fn status_endpoint_answers_requested_code() {
    let resp = app().oneshot(get("/status/503")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_text(resp).await, "status 503");
}

#[tokio::test]
async fn echo_reports_raw_request() {
    let resp = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/echo/a%2Fb/c%20d?q=x+y")
                .header(http::header::CONTENT_TYPE, "text/plain")
                .body("payload".to_string())
                .unwrap(),
        )
        .await
        .unwrap();

    let echo: Echo = body_json(resp).await;
    assert_eq!(echo.method, "POST");
    assert_eq!(echo.path, "/echo/a%2Fb/c%20d");
    assert_eq!(echo.query.as_deref(), Some("q=x+y"));
    assert_eq!(echo.content_type.as_deref(), Some("text/plain"));
    assert_eq!(echo.body, "payload");
}
