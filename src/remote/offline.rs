use async_trait::async_trait;
use serde_json::Value;

use crate::{
    synth::UserDraft,
    types::{AdjustTicketRequest, IngestEmailRequest, Ticket, TicketEvent, TicketFilters, User},
};

use super::RemoteApi;

/// Stand-in used when no remote is configured. Every call fails, so the desk
/// runs purely on the local cache.
#[derive(Debug, Default)]
pub struct OfflineRemoteApi;

fn offline<T>() -> anyhow::Result<T> {
    Err(anyhow::anyhow!("remote api is not configured"))
}

#[async_trait]
impl RemoteApi for OfflineRemoteApi {
    async fn list_tickets(&self, _filters: &TicketFilters) -> anyhow::Result<Vec<Ticket>> {
        offline()
    }

    async fn get_ticket(&self, _id: &str) -> anyhow::Result<Ticket> {
        offline()
    }

    async fn adjust_ticket(
        &self,
        _id: &str,
        _request: &AdjustTicketRequest,
    ) -> anyhow::Result<Ticket> {
        offline()
    }

    async fn retriage_ticket(&self, _id: &str) -> anyhow::Result<Ticket> {
        offline()
    }

    async fn ticket_events(&self, _id: &str) -> anyhow::Result<Vec<TicketEvent>> {
        offline()
    }

    async fn list_users(&self) -> anyhow::Result<Vec<User>> {
        offline()
    }

    async fn create_user(&self, _draft: &UserDraft) -> anyhow::Result<User> {
        offline()
    }

    async fn ingest_email(&self, _request: &IngestEmailRequest) -> anyhow::Result<Ticket> {
        offline()
    }

    async fn faq_answer(&self, _ticket_id: &str) -> anyhow::Result<Value> {
        offline()
    }

    async fn triage(&self, _ticket_id: &str) -> anyhow::Result<Value> {
        offline()
    }
}
