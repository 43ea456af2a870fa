use std::{collections::BTreeMap, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::IntoResponse,
    routing::{any, get, post},
    Form, Json, Router,
};
use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::debug;

/// Header the weather endpoint requires.
pub const API_KEY_HEADER: &str = "api-key";

const FIRST_NOTE_ID: i64 = 1000;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Note {
    pub id: i64,
    pub text: String,
    pub created: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,
}

/// Incoming note payload. Server-managed fields are ignored when present.
#[derive(Debug, Deserialize)]
pub struct NoteInput {
    pub text: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Forecast {
    pub location: String,
    #[serde(rename = "day")]
    pub days: Vec<DayForecast>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DayForecast {
    pub date: NaiveDate,
    pub condition: String,
    pub high: i32,
    pub low: i32,
}

/// Request as observed by the `/echo` endpoint.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Echo {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub content_type: Option<String>,
    pub body: String,
}

#[derive(Debug)]
struct NoteStore {
    next_id: i64,
    notes: BTreeMap<i64, Note>,
}

impl Default for NoteStore {
    fn default() -> Self {
        Self {
            next_id: FIRST_NOTE_ID,
            notes: BTreeMap::new(),
        }
    }
}

impl NoteStore {
    fn insert(&mut self, text: String) -> Note {
        let note = Note {
            id: self.next_id,
            text,
            created: Utc::now(),
            updated: None,
        };
        self.next_id += 1;
        self.notes.insert(note.id, note.clone());
        note
    }
}

type Db = Arc<RwLock<NoteStore>>;

pub fn app() -> Router {
    let db: Db = Arc::default();
    Router::new()
        .route("/hello", get(hello_world))
        .route("/hello/{lang}", get(hello))
        .route("/api/notes", get(list_notes).post(create_note))
        .route("/api/notes/form", post(create_note_from_form))
        .route("/api/notes/{id}", get(get_note).put(update_note).delete(delete_note))
        .route("/api/weather/forecast", get(forecast))
        .route("/status/{code}", any(status))
        .route("/echo/{*rest}", any(echo))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

#[derive(Deserialize)]
struct HelloParams {
    name: Option<String>,
}

fn greeting(lang: &str) -> Option<&'static str> {
    match lang {
        "de" => Some("Hallo"),
        "en" => Some("Hello"),
        "es" => Some("Hola"),
        "fr" => Some("Bonjour"),
        "it" => Some("Ciao"),
        _ => None,
    }
}

async fn hello_world() -> &'static str {
    "Hello World"
}

async fn hello(
    Path(lang): Path<String>,
    Query(params): Query<HelloParams>,
) -> Result<String, (StatusCode, String)> {
    let greeting = greeting(&lang)
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("unknown language {lang}")))?;
    let name = params.name.filter(|n| !n.is_empty()).unwrap_or_else(|| "World".to_string());
    Ok(format!("{greeting} {name}"))
}

async fn list_notes(State(db): State<Db>) -> Json<Vec<Note>> {
    let store = db.read().await;
    Json(store.notes.values().cloned().collect())
}

async fn create_note(
    State(db): State<Db>,
    Json(input): Json<NoteInput>,
) -> (StatusCode, Json<Note>) {
    let note = db.write().await.insert(input.text);
    debug!(id = note.id, "note created");
    (StatusCode::CREATED, Json(note))
}

async fn create_note_from_form(
    State(db): State<Db>,
    Form(input): Form<NoteInput>,
) -> (StatusCode, Json<Note>) {
    let note = db.write().await.insert(input.text);
    debug!(id = note.id, "note created from form");
    (StatusCode::CREATED, Json(note))
}

async fn get_note(State(db): State<Db>, Path(id): Path<i64>) -> Result<Json<Note>, StatusCode> {
    let store = db.read().await;
    store.notes.get(&id).cloned().map(Json).ok_or(StatusCode::NOT_FOUND)
}

async fn update_note(
    State(db): State<Db>,
    Path(id): Path<i64>,
    Json(input): Json<NoteInput>,
) -> StatusCode {
    let mut store = db.write().await;
    match store.notes.get_mut(&id) {
        Some(note) => {
            note.text = input.text;
            note.updated = Some(Utc::now());
            StatusCode::NO_CONTENT
        }
        None => StatusCode::NOT_FOUND,
    }
}

async fn delete_note(State(db): State<Db>, Path(id): Path<i64>) -> StatusCode {
    db.write().await.notes.remove(&id);
    StatusCode::NO_CONTENT
}

#[derive(Deserialize)]
struct ForecastParams {
    location: Option<String>,
}

/// Three-day forecast rendered as XML. Deterministic per location.
pub fn forecast_for(location: &str, start: NaiveDate) -> Forecast {
    const CONDITIONS: [&str; 4] = ["sunny", "cloudy", "rain", "snow"];
    let seed = location.bytes().map(i32::from).sum::<i32>();
    let days = (0..3u8)
        .map(|offset| {
            let index = (seed + i32::from(offset)).rem_euclid(CONDITIONS.len() as i32) as usize;
            let high = 10 + (seed + i32::from(offset) * 3).rem_euclid(15);
            DayForecast {
                date: start + Days::new(u64::from(offset)),
                condition: CONDITIONS[index].to_string(),
                high,
                low: high - 8,
            }
        })
        .collect();
    Forecast {
        location: location.to_string(),
        days,
    }
}

async fn forecast(
    headers: HeaderMap,
    Query(params): Query<ForecastParams>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let authorized = headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|key| !key.is_empty());
    if !authorized {
        return Err((StatusCode::UNAUTHORIZED, "missing api key".to_string()));
    }
    let location = params
        .location
        .filter(|l| !l.is_empty())
        .ok_or_else(|| (StatusCode::BAD_REQUEST, "location is required".to_string()))?;

    let forecast = forecast_for(&location, Utc::now().date_naive());
    let xml = quick_xml::se::to_string_with_root("weather-forecast", &forecast)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    Ok(([(header::CONTENT_TYPE, "application/xml")], xml))
}

/// Answers with the requested status code and a short text body.
async fn status(Path(code): Path<u16>) -> Result<(StatusCode, String), StatusCode> {
    let status = StatusCode::from_u16(code).map_err(|_| StatusCode::BAD_REQUEST)?;
    Ok((status, format!("status {code}")))
}

async fn echo(method: Method, uri: Uri, headers: HeaderMap, body: String) -> Json<Echo> {
    Json(Echo {
        method: method.to_string(),
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        content_type: headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body,
    })
}
