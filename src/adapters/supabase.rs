//! Ticket store backed by a hosted Supabase project, spoken to through its
//! PostgREST interface. This module owns the translation between
//! `TicketRecord` and the column names of the `tickets` / `predictions`
//! tables; nothing outside it knows them.

use crate::core::{NewTicket, TicketRecord, TicketStore};
use crate::domain::model::{HistoryPage, RequesterId, TicketId};
use crate::utils::error::{Result, TriageError};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

const TICKETS_TABLE: &str = "tickets";
const PREDICTIONS_TABLE: &str = "predictions";

#[derive(Debug, Serialize)]
struct TicketRowInsert<'a> {
    user_id: &'a str,
    ticket_text: &'a str,
    actual_department: &'a str,
    confidence_score: f64,
    submitted_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct PredictionRowInsert<'a> {
    ticket_id: i64,
    predicted_department: &'a str,
    confidence_score: f64,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct TicketRow {
    ticket_id: i64,
    user_id: RequesterId,
    ticket_text: String,
    actual_department: Option<String>,
    confidence_score: Option<f64>,
    submitted_at: Option<String>,
}

/// Accepts both `timestamptz` output and naive timestamps written as UTC.
fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|naive| naive.and_utc())
}

impl TicketRow {
    /// Rows written by other tools may lack a department, a score or a usable
    /// timestamp. Those cannot become a `TicketRecord`; the error names why.
    fn into_record(self) -> std::result::Result<TicketRecord, String> {
        let label = self.actual_department.ok_or("no department")?;
        let confidence = self.confidence_score.ok_or("no confidence score")?;
        let submitted_at = match self.submitted_at.as_deref() {
            None => return Err("no submitted_at".to_string()),
            Some(raw) => parse_timestamp(raw)
                .ok_or_else(|| format!("unparseable submitted_at {:?}", raw))?,
        };

        Ok(TicketRecord {
            ticket_id: TicketId(self.ticket_id),
            requester_id: self.user_id,
            ticket_text: self.ticket_text,
            label,
            confidence,
            submitted_at,
        })
    }
}

#[derive(Clone)]
pub struct SupabaseTicketStore {
    client: Client,
    base_url: String,
    api_key: String,
}

impl fmt::Debug for SupabaseTicketStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupabaseTicketStore")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl SupabaseTicketStore {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TriageError::ConfigError {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
    }

    async fn check_status(response: Response, action: &str) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(TriageError::persistence(format!(
            "{} failed with status {}: {}",
            action, status, body
        )))
    }

    async fn insert_prediction(&self, record: &TicketRecord) -> Result<()> {
        let row = PredictionRowInsert {
            ticket_id: record.ticket_id.0,
            predicted_department: &record.label,
            confidence_score: record.confidence,
            created_at: Utc::now(),
        };

        let response = self
            .authorized(self.client.post(self.table_url(PREDICTIONS_TABLE)))
            .header("Prefer", "return=minimal")
            .json(&row)
            .send()
            .await
            .map_err(|e| TriageError::persistence(format!("insert into predictions: {}", e)))?;

        Self::check_status(response, "insert into predictions").await?;
        Ok(())
    }
}

#[async_trait]
impl TicketStore for SupabaseTicketStore {
    async fn insert(&self, ticket: NewTicket) -> Result<TicketRecord> {
        let row = TicketRowInsert {
            user_id: ticket.requester_id.as_str(),
            ticket_text: &ticket.ticket_text,
            actual_department: &ticket.label,
            confidence_score: ticket.confidence,
            submitted_at: ticket.submitted_at,
        };

        tracing::debug!("Inserting ticket into {}", self.table_url(TICKETS_TABLE));
        let response = self
            .authorized(self.client.post(self.table_url(TICKETS_TABLE)))
            .header("Prefer", "return=representation")
            .json(&row)
            .send()
            .await
            .map_err(|e| TriageError::persistence(format!("insert into tickets: {}", e)))?;

        let response = Self::check_status(response, "insert into tickets").await?;
        let rows: Vec<TicketRow> = response
            .json()
            .await
            .map_err(|e| TriageError::persistence(format!("decode inserted ticket: {}", e)))?;

        let inserted = rows
            .into_iter()
            .next()
            .ok_or_else(|| TriageError::persistence("insert into tickets returned no row"))?;
        let ticket_id = TicketId(inserted.ticket_id);

        // the stored row is authoritative for the id; our values for the rest
        let record = ticket.into_record(ticket_id);

        if let Err(e) = self.insert_prediction(&record).await {
            tracing::warn!(
                "Ticket {} stored but its prediction row was not: {}",
                record.ticket_id,
                e
            );
        }

        Ok(record)
    }

    async fn query(
        &self,
        requester_id: &RequesterId,
        page: Option<HistoryPage>,
    ) -> Result<Vec<TicketRecord>> {
        let mut params: Vec<(&str, String)> = vec![
            ("select", "*".to_string()),
            ("user_id", format!("eq.{}", requester_id)),
            // unclassified rows are excluded before limit/offset apply
            ("actual_department", "not.is.null".to_string()),
            ("confidence_score", "not.is.null".to_string()),
            ("submitted_at", "not.is.null".to_string()),
            ("order", "submitted_at.desc".to_string()),
        ];
        if let Some(page) = page {
            if let Some(limit) = page.limit {
                params.push(("limit", limit.to_string()));
            }
            if page.offset > 0 {
                params.push(("offset", page.offset.to_string()));
            }
        }

        let response = self
            .authorized(self.client.get(self.table_url(TICKETS_TABLE)))
            .query(&params)
            .send()
            .await
            .map_err(|e| TriageError::persistence(format!("query tickets: {}", e)))?;

        let response = Self::check_status(response, "query tickets").await?;
        let rows: Vec<TicketRow> = response
            .json()
            .await
            .map_err(|e| TriageError::persistence(format!("decode tickets: {}", e)))?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let ticket_id = row.ticket_id;
            match row.into_record() {
                Ok(record) => records.push(record),
                Err(reason) => tracing::warn!(
                    "Skipping ticket row {} for requester {}: {}",
                    ticket_id,
                    requester_id,
                    reason
                ),
            }
        }
        Ok(records)
    }
}
