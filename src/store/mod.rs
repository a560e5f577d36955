mod in_memory;
mod local;
mod sqlite;

use async_trait::async_trait;

use crate::types::{Ticket, User};

pub use in_memory::InMemoryRecordStore;
pub use local::LocalStore;
pub use sqlite::SqliteRecordStore;

/// Secondary lookup on the ticket table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TicketLookup {
    CustomerName(String),
    CustomerEmail(String),
    ExternalRef(String),
    Subject(String),
    Body(String),
    Unsynced,
}

impl TicketLookup {
    pub fn matches(&self, ticket: &Ticket) -> bool {
        match self {
            TicketLookup::CustomerName(name) => &ticket.customer_name == name,
            TicketLookup::CustomerEmail(email) => &ticket.customer_email == email,
            TicketLookup::ExternalRef(reference) => {
                ticket.external_ref.as_deref() == Some(reference.as_str())
            }
            TicketLookup::Subject(subject) => ticket.subject() == subject,
            TicketLookup::Body(body) => ticket.body() == body,
            TicketLookup::Unsynced => ticket.is_local(),
        }
    }
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get_user(&self, id: &str) -> anyhow::Result<Option<User>>;

    async fn list_users(&self) -> anyhow::Result<Vec<User>>;

    async fn put_user(&self, user: User) -> anyhow::Result<()>;

    async fn delete_user(&self, id: &str) -> anyhow::Result<bool>;

    async fn clear_users(&self) -> anyhow::Result<u64>;

    async fn get_ticket(&self, id: &str) -> anyhow::Result<Option<Ticket>>;

    async fn list_tickets(&self) -> anyhow::Result<Vec<Ticket>>;

    async fn put_ticket(&self, ticket: Ticket) -> anyhow::Result<()>;

    async fn delete_ticket(&self, id: &str) -> anyhow::Result<bool>;

    async fn find_tickets(&self, lookup: &TicketLookup) -> anyhow::Result<Vec<Ticket>>;

    async fn delete_tickets(&self, lookup: &TicketLookup) -> anyhow::Result<u64>;
}
