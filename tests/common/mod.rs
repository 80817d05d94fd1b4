#![allow(dead_code)]

use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Router,
};
use tokio::net::TcpListener;

/// How the fake API treats a page.
#[derive(Default, Clone)]
pub struct ApiBehaviour {
    pub server_error: HashSet<u32>,
    pub not_json: HashSet<u32>,
    pub delay: Option<Duration>,
}

#[derive(Default)]
pub struct ApiStats {
    pub hits: AtomicUsize,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

#[derive(Clone)]
struct AppState {
    behaviour: ApiBehaviour,
    stats: Arc<ApiStats>,
}

/// Verses on a fake page: page `n` holds chapter `n`, verses 1 and 2.
pub fn page_body(page: u32) -> String {
    format!(
        r#"{{"pages":[{{"chapter":{page},"verse":1,"text":"آية {page}:1","line":1}},{{"chapter":{page},"verse":2,"text":"آية {page}:2","line":2}}]}}"#
    )
}

pub fn info_body() -> &'static str {
    r#"{"chapters":[{"chapter":1,"name":"Al-Fatihah","arabicname":"الفاتحة"},{"chapter":2,"name":"Al-Baqarah","arabicname":"البقرة"}]}"#
}

async fn page(
    State(state): State<AppState>,
    Path((_edition, file)): Path<(String, String)>,
) -> (StatusCode, String) {
    let stats = &state.stats;
    stats.hits.fetch_add(1, Ordering::SeqCst);
    let now = stats.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
    stats.max_in_flight.fetch_max(now, Ordering::SeqCst);
    if let Some(delay) = state.behaviour.delay {
        tokio::time::sleep(delay).await;
    }
    stats.in_flight.fetch_sub(1, Ordering::SeqCst);

    let Some(num) = file.strip_suffix(".json").and_then(|n| n.parse::<u32>().ok()) else {
        return (StatusCode::NOT_FOUND, String::new());
    };
    if state.behaviour.server_error.contains(&num) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "boom".into());
    }
    if state.behaviour.not_json.contains(&num) {
        return (StatusCode::OK, "<html>not json</html>".into());
    }
    (StatusCode::OK, page_body(num))
}

async fn info(State(state): State<AppState>) -> String {
    state.stats.hits.fetch_add(1, Ordering::SeqCst);
    info_body().to_string()
}

/// Serves the fake API on an ephemeral local port and returns its base URL.
pub async fn spawn_api(behaviour: ApiBehaviour) -> (String, Arc<ApiStats>) {
    let stats = Arc::new(ApiStats::default());
    let app = Router::new()
        .route("/editions/{edition}/pages/{file}", get(page))
        .route("/info.json", get(info))
        .with_state(AppState {
            behaviour,
            stats: stats.clone(),
        });
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    (format!("http://{addr}/"), stats)
}
