//! Request handlers.
//!
//! Every record-store call and every render goes through the bridge. The
//! simulated remote calls run on the batch executor directly since they
//! never block a thread.

use std::convert::Infallible;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use axum::extract::State;
use axum::http::Method;
use axum::response::{IntoResponse, Response};
use axum::Json;
use offload_core::{ApiCallResult, Mode};
use offload_store::RecordId;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::dispatch::MethodTable;
use crate::error::AppError;
use crate::extract::{ApiPath, ApiQuery};
use crate::render::RenderedPage;
use crate::state::AppState;

type Shared = State<Arc<AppState>>;

/// How long `/simple-sleep` blocks its worker thread.
pub const SIMPLE_SLEEP: Duration = Duration::from_millis(250);

/// Optional tuning parameters accepted by every batched route.
#[derive(Debug, Default, Deserialize)]
pub struct BatchQuery {
    /// Per-call delay in milliseconds.
    pub sleep: Option<u64>,
    pub batch_size: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SaveQuery {
    #[serde(default)]
    pub text: String,
    pub batch_size: Option<usize>,
}

fn ok_json() -> Json<Value> {
    Json(json!({ "result": "ok" }))
}

fn secs(delay: Duration) -> f64 {
    delay.as_secs_f64()
}

// ─── Plain pages ──────────────────────────────────────────────────────────────

pub async fn index(State(state): Shared) -> Result<RenderedPage, AppError> {
    state.render("index", json!({})).await
}

/// Blocks a worker thread for [`SIMPLE_SLEEP`].
pub async fn simple_sleep(State(state): Shared) -> Result<Json<Value>, AppError> {
    state
        .bridge
        .run_blocking(|| {
            std::thread::sleep(SIMPLE_SLEEP);
            Ok::<_, Infallible>(())
        })
        .await?;
    Ok(ok_json())
}

/// The whole handler body runs on the worker pool.
pub async fn sync_hello_world(State(state): Shared) -> Result<RenderedPage, AppError> {
    let renderer = Arc::clone(&state.renderer);
    Ok(state
        .bridge
        .run_blocking(move || renderer.render("hello", json!({})))
        .await?)
}

pub async fn async_hello_world(State(state): Shared) -> Result<RenderedPage, AppError> {
    state.render("hello", json!({})).await
}

/// Lists every record; store access and rendering share one blocking call.
pub async fn sync_list(State(state): Shared) -> Result<RenderedPage, AppError> {
    let store = Arc::clone(&state.store);
    let renderer = Arc::clone(&state.renderer);
    Ok(state
        .bridge
        .run_blocking(move || -> Result<RenderedPage, AppError> {
            let entries = store.fetch_all()?;
            Ok(renderer.render("entries", json!({ "entries": entries }))?)
        })
        .await?)
}

// ─── Timing comparison ────────────────────────────────────────────────────────

pub async fn waiting_sequentially(
    state: Shared,
    query: ApiQuery<BatchQuery>,
) -> Result<RenderedPage, AppError> {
    waiting(state, query, Mode::Sequential).await
}

pub async fn waiting_concurrently(
    state: Shared,
    query: ApiQuery<BatchQuery>,
) -> Result<RenderedPage, AppError> {
    waiting(state, query, Mode::Concurrent).await
}

async fn waiting(
    State(state): Shared,
    ApiQuery(query): ApiQuery<BatchQuery>,
    mode: Mode,
) -> Result<RenderedPage, AppError> {
    let report = state
        .harness
        .compare(
            mode,
            state.defaults.total,
            state.batch_size(query.batch_size),
            state.delay(query.sleep),
        )
        .await?;
    state
        .render(
            "waiting",
            json!({
                "count": report.batches,
                "finished": report.elapsed_secs,
                "slept": report.per_unit_delay_secs,
                "method": report.label,
            }),
        )
        .await
}

// ─── Batched record views ─────────────────────────────────────────────────────

async fn api_calls(
    state: &AppState,
    batch_size: Option<usize>,
    delay: Duration,
) -> Result<Vec<ApiCallResult>, AppError> {
    let batch = state
        .executor
        .run_batched(state.defaults.total, state.batch_size(batch_size), delay)
        .await?;
    Ok(batch.into_results())
}

pub async fn async_list(
    State(state): Shared,
    ApiPath(sleep): ApiPath<u64>,
    ApiQuery(query): ApiQuery<BatchQuery>,
) -> Result<RenderedPage, AppError> {
    let delay = Duration::from_millis(sleep);
    let calls = api_calls(&state, query.batch_size, delay).await?;
    let entries = state.with_store(|s| s.fetch_all()).await?;
    state
        .render(
            "entries",
            json!({ "entries": entries, "sleep_in_seconds": secs(delay), "api_calls": calls }),
        )
        .await
}

/// Like [`async_list`] but bumps every counter first.
pub async fn async_update(
    State(state): Shared,
    ApiPath(sleep): ApiPath<u64>,
    ApiQuery(query): ApiQuery<BatchQuery>,
) -> Result<RenderedPage, AppError> {
    let delay = Duration::from_millis(sleep);
    let calls = api_calls(&state, query.batch_size, delay).await?;
    let touched = state.with_store(|s| s.increment_all()).await?;
    tracing::debug!(touched, "counters incremented");
    let entries = state.with_store(|s| s.fetch_all()).await?;
    state
        .render(
            "entries",
            json!({ "entries": entries, "sleep_in_seconds": secs(delay), "api_calls": calls }),
        )
        .await
}

/// Runs a batch, optionally renames the record and bumps its counter, then
/// runs a second batch.
pub async fn async_save(
    State(state): Shared,
    ApiPath((id, sleep)): ApiPath<(RecordId, u64)>,
    ApiQuery(query): ApiQuery<SaveQuery>,
) -> Result<RenderedPage, AppError> {
    let delay = Duration::from_millis(sleep);
    let mut calls = api_calls(&state, query.batch_size, delay).await?;

    let mut entry = state.with_store(move |s| s.fetch_one(id)).await?;
    if !query.text.is_empty() {
        entry.message = query.text;
        entry = state.with_store(move |s| s.increment_and_save(entry)).await?;
    }

    calls.extend(api_calls(&state, query.batch_size, delay).await?);
    state
        .render(
            "entry",
            json!({ "entry": entry, "sleep_in_seconds": secs(delay), "api_calls": calls }),
        )
        .await
}

pub async fn api_calling(
    State(state): Shared,
    ApiPath(sleep): ApiPath<u64>,
    ApiQuery(query): ApiQuery<BatchQuery>,
) -> Result<Json<Value>, AppError> {
    api_calls(&state, query.batch_size, Duration::from_millis(sleep)).await?;
    Ok(ok_json())
}

// ─── Detail view ──────────────────────────────────────────────────────────────

/// Context for one `/async-cbv-detail` request.
pub struct DetailRequest {
    pub state: Arc<AppState>,
    pub pk: RecordId,
    pub sleep: u64,
}

fn detail_table() -> &'static MethodTable<DetailRequest> {
    static TABLE: OnceLock<MethodTable<DetailRequest>> = OnceLock::new();
    TABLE.get_or_init(|| MethodTable::new().on(Method::GET, detail_get))
}

async fn detail_get(req: DetailRequest) -> Result<Response, AppError> {
    let DetailRequest { state, pk, sleep } = req;
    let entry = state.with_store(move |s| s.fetch_one(pk)).await?;
    let page = state
        .render(
            "entry",
            json!({ "entry": entry, "sleep_in_seconds": secs(Duration::from_millis(sleep)) }),
        )
        .await?;
    Ok(page.into_response())
}

/// Dispatches on the request verb; only `GET` (and `HEAD`) are served.
pub async fn async_cbv_detail(
    State(state): Shared,
    method: Method,
    ApiPath((pk, sleep)): ApiPath<(RecordId, u64)>,
) -> Result<Response, AppError> {
    detail_table()
        .dispatch(&method, DetailRequest { state, pk, sleep })
        .await
}
