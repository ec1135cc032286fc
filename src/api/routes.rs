use crate::api::error::ApiError;
use crate::api::state::AppState;
use crate::domain::model::{HistoryPage, RequesterId, TicketRecord, TicketSubmission};
use crate::utils::error::TriageError;
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    Json,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct TicketRequest {
    pub user_id: Option<RequesterId>,
    pub ticket_text: Option<String>,
}

impl TryFrom<TicketRequest> for TicketSubmission {
    type Error = TriageError;

    fn try_from(request: TicketRequest) -> Result<Self, Self::Error> {
        Ok(TicketSubmission {
            user_id: request
                .user_id
                .ok_or_else(|| TriageError::invalid_input("user_id", "is required"))?,
            ticket_text: request
                .ticket_text
                .ok_or_else(|| TriageError::invalid_input("ticket_text", "is required"))?,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryParams {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl HistoryParams {
    fn page(&self) -> Option<HistoryPage> {
        if self.limit.is_none() && self.offset.is_none() {
            return None;
        }
        Some(HistoryPage {
            limit: self.limit,
            offset: self.offset.unwrap_or(0),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub history: Vec<TicketRecord>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub model_loaded: bool,
}

pub async fn submit_ticket_handler(
    State(state): State<AppState>,
    payload: Result<Json<TicketRequest>, JsonRejection>,
) -> Result<Json<TicketRecord>, ApiError> {
    let Json(request) =
        payload.map_err(|e| TriageError::invalid_input("body", e.body_text()))?;

    let submission = TicketSubmission::try_from(request)?;

    let record = state
        .flow
        .submit(submission.user_id, submission.ticket_text)
        .await?;
    Ok(Json(record))
}

pub async fn history_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    params: Result<Query<HistoryParams>, QueryRejection>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let Query(params) =
        params.map_err(|e| TriageError::invalid_input("query", e.body_text()))?;

    let history = state
        .flow
        .history(&RequesterId::new(user_id), params.page())
        .await?;
    Ok(Json(HistoryResponse { history }))
}

pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        model_loaded: state.flow.classifier().is_loaded(),
    })
}
