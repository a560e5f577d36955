use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    synth::UserDraft,
    types::{AdjustTicketRequest, IngestEmailRequest, Ticket, TicketEvent, TicketFilters, User},
};

use super::RemoteApi;

#[derive(Debug, Clone)]
pub struct HttpRemoteApi {
    client: Client,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct TicketRef<'a> {
    ticket_id: &'a str,
}

impl HttpRemoteApi {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        action: &'static str,
    ) -> anyhow::Result<T> {
        let response = request
            .send()
            .await
            .map_err(|error| {
                warn!(?error, action, "remote request failed");
                error
            })?
            .error_for_status()
            .map_err(|error| {
                warn!(?error, action, "remote returned error status");
                error
            })?
            .json::<T>()
            .await
            .map_err(|error| {
                warn!(?error, action, "failed to deserialize remote response");
                error
            })?;

        debug!(action, "remote request succeeded");
        Ok(response)
    }
}

fn filter_params(filters: &TicketFilters) -> Vec<(&'static str, String)> {
    let mut params = Vec::new();
    if let Some(status) = filters.status {
        params.push(("status", status.as_str().to_owned()));
    }
    if let Some(priority) = filters.priority {
        params.push(("priority", priority.as_str().to_owned()));
    }
    if let Some(assignee) = filters.assignee.as_ref().filter(|value| !value.is_empty()) {
        params.push(("assignee", assignee.clone()));
    }
    if let Some(q) = filters.q.as_ref().filter(|value| !value.is_empty()) {
        params.push(("q", q.clone()));
    }
    params
}

#[async_trait]
impl RemoteApi for HttpRemoteApi {
    async fn list_tickets(&self, filters: &TicketFilters) -> anyhow::Result<Vec<Ticket>> {
        let request = self
            .client
            .get(self.url("/tickets"))
            .query(&filter_params(filters));
        self.send(request, "list tickets").await
    }

    async fn get_ticket(&self, id: &str) -> anyhow::Result<Ticket> {
        let request = self.client.get(self.url(&format!("/tickets/{id}")));
        self.send(request, "fetch ticket").await
    }

    async fn adjust_ticket(
        &self,
        id: &str,
        request: &AdjustTicketRequest,
    ) -> anyhow::Result<Ticket> {
        let request = self
            .client
            .post(self.url(&format!("/tickets/{id}/adjust")))
            .json(request);
        self.send(request, "adjust ticket").await
    }

    async fn retriage_ticket(&self, id: &str) -> anyhow::Result<Ticket> {
        let request = self.client.post(self.url(&format!("/tickets/{id}/retriage")));
        self.send(request, "retriage ticket").await
    }

    async fn ticket_events(&self, id: &str) -> anyhow::Result<Vec<TicketEvent>> {
        let request = self.client.get(self.url(&format!("/tickets/{id}/events")));
        self.send(request, "fetch ticket events").await
    }

    async fn list_users(&self) -> anyhow::Result<Vec<User>> {
        let request = self.client.get(self.url("/users"));
        self.send(request, "fetch users").await
    }

    async fn create_user(&self, draft: &UserDraft) -> anyhow::Result<User> {
        let request = self.client.post(self.url("/users")).json(draft);
        self.send(request, "create user").await
    }

    async fn ingest_email(&self, request: &IngestEmailRequest) -> anyhow::Result<Ticket> {
        let request = self.client.post(self.url("/emails/ingest")).json(request);
        self.send(request, "ingest email").await
    }

    async fn faq_answer(&self, ticket_id: &str) -> anyhow::Result<Value> {
        let request = self
            .client
            .post(self.url("/ai/faq_answer"))
            .json(&TicketRef { ticket_id });
        self.send(request, "get faq answer").await
    }

    async fn triage(&self, ticket_id: &str) -> anyhow::Result<Value> {
        let request = self
            .client
            .post(self.url("/ai/triage"))
            .json(&TicketRef { ticket_id });
        self.send(request, "triage ticket").await
    }
}
