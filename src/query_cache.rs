use std::time::Duration;

use moka::future::Cache;
use tracing::debug;

use crate::types::{Ticket, TicketFilters, User};

/// Distinct ticket queries kept at once. Search text is part of the key.
const MAX_TICKET_QUERIES: u64 = 256;

/// Short-lived memo of merged read results. Writes invalidate it.
#[derive(Debug, Clone)]
pub struct QueryCache {
    tickets: Cache<TicketFilters, Vec<Ticket>>,
    users: Cache<(), Vec<User>>,
}

impl QueryCache {
    pub fn new(ttl: Duration) -> Self {
        Self::with_capacity(ttl, MAX_TICKET_QUERIES)
    }

    pub fn with_capacity(ttl: Duration, max_ticket_queries: u64) -> Self {
        Self {
            tickets: Cache::builder()
                .max_capacity(max_ticket_queries)
                .time_to_live(ttl)
                .build(),
            users: Cache::builder().max_capacity(1).time_to_live(ttl).build(),
        }
    }

    pub async fn tickets(&self, filters: &TicketFilters) -> Option<Vec<Ticket>> {
        self.tickets.get(filters).await
    }

    pub async fn store_tickets(&self, filters: TicketFilters, tickets: Vec<Ticket>) {
        self.tickets.insert(filters, tickets).await;
    }

    pub async fn users(&self) -> Option<Vec<User>> {
        self.users.get(&()).await
    }

    pub async fn store_users(&self, users: Vec<User>) {
        self.users.insert((), users).await;
    }

    pub async fn invalidate_tickets(&self) {
        debug!(entries = self.tickets.entry_count(), "ticket reads invalidated");
        self.tickets.invalidate_all();
    }

    pub async fn invalidate_users(&self) {
        self.users.invalidate_all();
        debug!("user reads invalidated");
    }

    pub async fn invalidate_all(&self) {
        self.invalidate_tickets().await;
        self.invalidate_users().await;
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}
