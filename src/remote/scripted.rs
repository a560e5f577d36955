use std::{
    collections::HashSet,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Value, json};
use tokio::sync::Mutex;

use crate::{
    synth::{TicketDraft, UserDraft, synthesize_ticket, synthesize_user},
    types::{
        AdjustTicketRequest, IngestEmailRequest, Provenance, Ticket, TicketEvent, TicketFilters,
        User,
    },
};

use super::RemoteApi;

/// In-process remote for tests: holds its own tickets and users and can be
/// told to fail.
#[derive(Debug, Default)]
pub(crate) struct ScriptedRemote {
    down: AtomicBool,
    tickets: Mutex<Vec<Ticket>>,
    users: Mutex<Vec<User>>,
    rejected_subjects: Mutex<HashSet<String>>,
    pub(crate) ingested: Mutex<Vec<IngestEmailRequest>>,
    pub(crate) adjust_calls: Mutex<Vec<String>>,
}

impl ScriptedRemote {
    pub(crate) fn online() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn unreachable() -> Arc<Self> {
        let remote = Self::default();
        remote.down.store(true, Ordering::SeqCst);
        Arc::new(remote)
    }

    pub(crate) fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    pub(crate) async fn seed_ticket(&self, mut ticket: Ticket) {
        ticket.provenance = Provenance::Authoritative;
        self.tickets.lock().await.push(ticket);
    }

    pub(crate) async fn seed_user(&self, user: User) {
        self.users.lock().await.push(user);
    }

    pub(crate) async fn reject_ingest_of(&self, subject: &str) {
        self.rejected_subjects
            .lock()
            .await
            .insert(subject.to_owned());
    }

    pub(crate) async fn stored_ticket(&self, id: &str) -> Option<Ticket> {
        self.tickets
            .lock()
            .await
            .iter()
            .find(|ticket| ticket.id == id)
            .cloned()
    }

    fn check(&self) -> anyhow::Result<()> {
        if self.down.load(Ordering::SeqCst) {
            return Err(anyhow::anyhow!("connection refused"));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteApi for ScriptedRemote {
    async fn list_tickets(&self, filters: &TicketFilters) -> anyhow::Result<Vec<Ticket>> {
        self.check()?;
        Ok(self
            .tickets
            .lock()
            .await
            .iter()
            .filter(|ticket| filters.status.is_none_or(|status| ticket.status == status))
            .cloned()
            .collect())
    }

    async fn get_ticket(&self, id: &str) -> anyhow::Result<Ticket> {
        self.check()?;
        self.stored_ticket(id)
            .await
            .ok_or_else(|| anyhow::anyhow!("404 ticket {id}"))
    }

    async fn adjust_ticket(
        &self,
        id: &str,
        request: &AdjustTicketRequest,
    ) -> anyhow::Result<Ticket> {
        self.adjust_calls.lock().await.push(id.to_owned());
        self.check()?;
        let mut tickets = self.tickets.lock().await;
        let ticket = tickets
            .iter_mut()
            .find(|ticket| ticket.id == id)
            .ok_or_else(|| anyhow::anyhow!("404 ticket {id}"))?;
        if let Some(status) = request.status {
            ticket.status = status;
        }
        if let Some(priority) = request.priority {
            ticket.priority = priority;
        }
        if let Some(assignee) = &request.assigned_user_id {
            ticket.assigned_user_id = assignee.clone();
        }
        if let Some(department) = request.assigned_department {
            ticket.assigned_department = department;
        }
        ticket.updated_at = Utc::now();
        Ok(ticket.clone())
    }

    async fn retriage_ticket(&self, id: &str) -> anyhow::Result<Ticket> {
        self.check()?;
        let mut tickets = self.tickets.lock().await;
        let ticket = tickets
            .iter_mut()
            .find(|ticket| ticket.id == id)
            .ok_or_else(|| anyhow::anyhow!("404 ticket {id}"))?;
        ticket.agent2_confidence = 0.9;
        ticket.updated_at = Utc::now();
        Ok(ticket.clone())
    }

    async fn ticket_events(&self, id: &str) -> anyhow::Result<Vec<TicketEvent>> {
        self.check()?;
        let event = serde_json::from_value(json!({
            "id": format!("ev-{id}"),
            "ticket_id": id,
            "actor_type": "system",
            "event_type": "created",
            "payload": { "source": "email" },
            "created_at": Utc::now(),
        }))?;
        Ok(vec![event])
    }

    async fn list_users(&self) -> anyhow::Result<Vec<User>> {
        self.check()?;
        Ok(self.users.lock().await.clone())
    }

    async fn create_user(&self, draft: &UserDraft) -> anyhow::Result<User> {
        self.check()?;
        let user = synthesize_user(draft.clone(), Utc::now());
        self.users.lock().await.push(user.clone());
        Ok(user)
    }

    async fn ingest_email(&self, request: &IngestEmailRequest) -> anyhow::Result<Ticket> {
        self.check()?;
        if self
            .rejected_subjects
            .lock()
            .await
            .contains(&request.subject)
        {
            return Err(anyhow::anyhow!("500 ingest failed"));
        }
        self.ingested.lock().await.push(request.clone());
        let ticket = synthesize_ticket(
            TicketDraft {
                customer_name: Some(request.customer_name.clone()),
                customer_email: Some(request.customer_email.clone()),
                subject: Some(request.subject.clone()),
                body: Some(request.body.clone()),
                synced: Some(true),
                ..TicketDraft::default()
            },
            Utc::now(),
        );
        self.tickets.lock().await.push(ticket.clone());
        Ok(ticket)
    }

    async fn faq_answer(&self, ticket_id: &str) -> anyhow::Result<Value> {
        self.check()?;
        Ok(json!({ "ticket_id": ticket_id, "answer": "Try resetting your password." }))
    }

    async fn triage(&self, ticket_id: &str) -> anyhow::Result<Value> {
        self.check()?;
        Ok(json!({ "ticket_id": ticket_id, "priority": "high" }))
    }
}
