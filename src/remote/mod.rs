mod http;
mod offline;
#[cfg(test)]
pub(crate) mod scripted;

use async_trait::async_trait;
use serde_json::Value;

use crate::{
    synth::UserDraft,
    types::{AdjustTicketRequest, IngestEmailRequest, Ticket, TicketEvent, TicketFilters, User},
};

pub use http::HttpRemoteApi;
pub use offline::OfflineRemoteApi;

/// The ticket/user service this desk mirrors. Any call may fail; callers
/// decide how to degrade.
#[async_trait]
pub trait RemoteApi: Send + Sync {
    async fn list_tickets(&self, filters: &TicketFilters) -> anyhow::Result<Vec<Ticket>>;

    async fn get_ticket(&self, id: &str) -> anyhow::Result<Ticket>;

    async fn adjust_ticket(&self, id: &str, request: &AdjustTicketRequest)
    -> anyhow::Result<Ticket>;

    async fn retriage_ticket(&self, id: &str) -> anyhow::Result<Ticket>;

    async fn ticket_events(&self, id: &str) -> anyhow::Result<Vec<TicketEvent>>;

    async fn list_users(&self) -> anyhow::Result<Vec<User>>;

    async fn create_user(&self, draft: &UserDraft) -> anyhow::Result<User>;

    async fn ingest_email(&self, request: &IngestEmailRequest) -> anyhow::Result<Ticket>;

    async fn faq_answer(&self, ticket_id: &str) -> anyhow::Result<Value>;

    async fn triage(&self, ticket_id: &str) -> anyhow::Result<Value>;
}
