use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_http::trace::TraceLayer;

use crate::{
    desk::{DeskError, Saved, TicketDesk},
    sync::EditOutcome,
    types::{
        AdjustTicketRequest, IngestEmailRequest, LocalSnapshot, Notice, PeopleSummary,
        SyncReport, Ticket, TicketEvent, TicketFilters, User,
    },
    validation::{FieldError, NewMemberForm},
};

#[derive(Clone)]
pub struct AppState {
    pub desk: Arc<TicketDesk>,
}

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ErrorBody>)>;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub notice: Notice,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldError>,
}

#[derive(Debug, Serialize)]
pub struct SavedResponse<T> {
    #[serde(flatten)]
    pub saved: Saved<T>,
    pub notice: Notice,
}

#[derive(Debug, Serialize)]
pub struct SyncResponse {
    pub report: SyncReport,
    pub notice: Notice,
}

#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub count: u64,
}

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    #[serde(default = "default_generate_count")]
    pub count: usize,
}

fn default_generate_count() -> usize {
    5
}

#[derive(Debug, Deserialize)]
pub struct CustomerQuery {
    pub customer_name: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/tickets", get(list_tickets))
        .route("/tickets/{id}", get(get_ticket))
        .route("/tickets/{id}/events", get(ticket_events))
        .route("/tickets/{id}/adjust", post(adjust_ticket))
        .route("/tickets/{id}/retriage", post(retriage_ticket))
        .route("/tickets/{id}/faq_answer", post(faq_answer))
        .route("/tickets/{id}/triage", post(triage))
        .route("/users", get(list_users).post(add_member))
        .route("/people/summary", get(people_summary))
        .route("/emails/ingest", post(ingest_email))
        .route("/sync", post(sync))
        .route("/stats/recompute", post(recompute_stats))
        .route("/local", get(local_snapshot))
        .route("/local/generate", post(generate_local_tickets))
        .route("/local/tickets", delete(delete_local_tickets))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

async fn list_tickets(
    State(state): State<AppState>,
    Query(filters): Query<TicketFilters>,
) -> Json<Vec<Ticket>> {
    Json(state.desk.list_tickets(&filters).await)
}

async fn get_ticket(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Ticket> {
    state.desk.ticket(&id).await.map(Json).map_err(desk_error)
}

async fn ticket_events(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<Vec<TicketEvent>> {
    Json(state.desk.ticket_events(&id).await)
}

async fn adjust_ticket(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<AdjustTicketRequest>,
) -> ApiResult<EditOutcome> {
    state
        .desk
        .adjust_ticket(&id, &request)
        .await
        .map(Json)
        .map_err(desk_error)
}

async fn retriage_ticket(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Ticket> {
    state
        .desk
        .retriage_ticket(&id)
        .await
        .map(Json)
        .map_err(desk_error)
}

async fn faq_answer(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Value> {
    state.desk.faq_answer(&id).await.map(Json).map_err(desk_error)
}

async fn triage(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Value> {
    state.desk.triage(&id).await.map(Json).map_err(desk_error)
}

async fn list_users(State(state): State<AppState>) -> Json<Vec<User>> {
    Json(state.desk.users().await)
}

async fn add_member(
    State(state): State<AppState>,
    Json(form): Json<NewMemberForm>,
) -> ApiResult<SavedResponse<User>> {
    let saved = state.desk.add_member(&form).await.map_err(desk_error)?;
    let notice = if saved.local_only {
        Notice::info("Saved locally", "Team member will be available once the API is reachable")
    } else {
        Notice::info("Team member added", format!("{} was added", saved.record.name))
    };
    Ok(Json(SavedResponse { saved, notice }))
}

async fn people_summary(State(state): State<AppState>) -> Json<PeopleSummary> {
    Json(state.desk.people_summary().await)
}

async fn ingest_email(
    State(state): State<AppState>,
    Json(request): Json<IngestEmailRequest>,
) -> ApiResult<SavedResponse<Ticket>> {
    let saved = state.desk.ingest_email(&request).await.map_err(desk_error)?;
    let notice = if saved.local_only {
        Notice::info("Saved locally", "Ticket will be submitted on the next sync")
    } else {
        Notice::info("Ticket created", format!("Ticket {} created", saved.record.id))
    };
    Ok(Json(SavedResponse { saved, notice }))
}

async fn sync(State(state): State<AppState>) -> Json<SyncResponse> {
    let report = state.desk.sync().await;
    let notice = Notice::info("Sync complete", report.summary());
    Json(SyncResponse { report, notice })
}

async fn recompute_stats(State(state): State<AppState>) -> Json<CountResponse> {
    let updated = state.desk.recompute_stats().await;
    Json(CountResponse {
        count: updated as u64,
    })
}

async fn local_snapshot(State(state): State<AppState>) -> Json<LocalSnapshot> {
    Json(state.desk.local_snapshot().await)
}

async fn generate_local_tickets(
    State(state): State<AppState>,
    Json(request): Json<GenerateRequest>,
) -> Json<Vec<Ticket>> {
    Json(state.desk.generate_local_tickets(request.count).await)
}

async fn delete_local_tickets(
    State(state): State<AppState>,
    Query(query): Query<CustomerQuery>,
) -> Json<CountResponse> {
    let count = state
        .desk
        .delete_local_tickets_by_customer(&query.customer_name)
        .await;
    Json(CountResponse { count })
}

fn desk_error(error: DeskError) -> (StatusCode, Json<ErrorBody>) {
    let status = match &error {
        DeskError::TicketNotFound(_) => StatusCode::NOT_FOUND,
        DeskError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        DeskError::LocalWrite(_) => StatusCode::INTERNAL_SERVER_ERROR,
        DeskError::Remote(_) => StatusCode::BAD_GATEWAY,
    };
    let fields = match &error {
        DeskError::Validation(errors) => errors.errors.clone(),
        _ => Vec::new(),
    };
    (
        status,
        Json(ErrorBody {
            notice: Notice::error(error.to_string()),
            fields,
        }),
    )
}
