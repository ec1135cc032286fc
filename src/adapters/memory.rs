use crate::core::{NewTicket, TicketRecord, TicketStore};
use crate::domain::model::{HistoryPage, RequesterId, TicketId};
use crate::utils::error::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Tables {
    last_id: i64,
    tickets: Vec<TicketRecord>,
}

/// Process-local ticket table. Ids start at 1 and increase per insert.
#[derive(Debug, Default)]
pub struct InMemoryTicketStore {
    tables: RwLock<Tables>,
}

impl InMemoryTicketStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.tables.read().await.tickets.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl TicketStore for InMemoryTicketStore {
    async fn insert(&self, ticket: NewTicket) -> Result<TicketRecord> {
        let mut tables = self.tables.write().await;
        tables.last_id += 1;
        let record = ticket.into_record(TicketId(tables.last_id));
        tables.tickets.push(record.clone());
        Ok(record)
    }

    async fn query(
        &self,
        requester_id: &RequesterId,
        page: Option<HistoryPage>,
    ) -> Result<Vec<TicketRecord>> {
        let tables = self.tables.read().await;
        let mut records: Vec<TicketRecord> = tables
            .tickets
            .iter()
            .filter(|r| &r.requester_id == requester_id)
            .cloned()
            .collect();

        // equal timestamps fall back to insertion order
        records.sort_by(|a, b| {
            b.submitted_at
                .cmp(&a.submitted_at)
                .then(b.ticket_id.0.cmp(&a.ticket_id.0))
        });

        Ok(match page {
            Some(page) => page.apply(records),
            None => records,
        })
    }
}
