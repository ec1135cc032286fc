use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Opaque requester identity. Upstream clients send either a string or an
/// integer user id, both are accepted and kept as text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, PartialOrd, Ord)]
#[serde(transparent)]
pub struct RequesterId(String);

impl RequesterId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequesterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RequesterId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl<'de> Deserialize<'de> for RequesterId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Int(i64),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(s) => RequesterId(s),
            Raw::Int(n) => RequesterId(n.to_string()),
        })
    }
}

/// Store-generated ticket identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketId(pub i64);

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketSubmission {
    pub user_id: RequesterId,
    pub ticket_text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationResult {
    pub label: String,
    pub confidence: f64,
}

/// Per-label posterior probabilities, ordered by label name.
pub type LabelDistribution = BTreeMap<String, f64>;

/// A classified ticket on its way into the store. It has no id yet, the store
/// assigns one on insert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTicket {
    pub requester_id: RequesterId,
    pub ticket_text: String,
    pub label: String,
    pub confidence: f64,
    pub submitted_at: DateTime<Utc>,
}

impl NewTicket {
    pub fn into_record(self, ticket_id: TicketId) -> TicketRecord {
        TicketRecord {
            ticket_id,
            requester_id: self.requester_id,
            ticket_text: self.ticket_text,
            label: self.label,
            confidence: self.confidence,
            submitted_at: self.submitted_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketRecord {
    pub ticket_id: TicketId,
    #[serde(rename = "user_id")]
    pub requester_id: RequesterId,
    pub ticket_text: String,
    #[serde(rename = "department")]
    pub label: String,
    pub confidence: f64,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HistoryPage {
    pub limit: Option<usize>,
    pub offset: usize,
}

impl HistoryPage {
    pub fn new(limit: usize, offset: usize) -> Self {
        Self {
            limit: Some(limit),
            offset,
        }
    }

    /// Slice an already-ordered history.
    pub fn apply<T>(&self, items: Vec<T>) -> Vec<T> {
        let iter = items.into_iter().skip(self.offset);
        match self.limit {
            Some(limit) => iter.take(limit).collect(),
            None => iter.collect(),
        }
    }
}
