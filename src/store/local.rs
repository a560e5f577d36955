use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, warn};

use crate::{
    synth::{TicketDraft, UserDraft, synthesize_ticket, synthesize_user},
    types::{AdjustTicketRequest, Provenance, Ticket, User},
};

use super::{RecordStore, TicketLookup};

/// Device-side cache shared by the desk and the sync driver.
///
/// Every backend error is logged and turned into an empty value so callers
/// see "no local data" instead of a failure.
#[derive(Clone)]
pub struct LocalStore {
    backend: Arc<dyn RecordStore>,
}

impl LocalStore {
    pub fn new(backend: Arc<dyn RecordStore>) -> Self {
        Self { backend }
    }

    pub async fn users(&self) -> Vec<User> {
        match self.backend.list_users().await {
            Ok(users) => {
                debug!(count = users.len(), "local users loaded");
                users
            }
            Err(error) => {
                error!(?error, "failed to list local users");
                Vec::new()
            }
        }
    }

    pub async fn user(&self, id: &str) -> Option<User> {
        self.backend.get_user(id).await.unwrap_or_else(|error| {
            error!(?error, user_id = %id, "failed to load local user");
            None
        })
    }

    pub async fn put_user(&self, user: User) -> bool {
        let user_id = user.id.clone();
        match self.backend.put_user(user).await {
            Ok(()) => true,
            Err(error) => {
                error!(?error, user_id = %user_id, "failed to write local user");
                false
            }
        }
    }

    pub async fn add_user(&self, draft: UserDraft) -> Option<User> {
        let user = synthesize_user(draft, Utc::now());
        if !self.put_user(user.clone()).await {
            return None;
        }
        debug!(user_id = %user.id, "local user added");
        Some(user)
    }

    pub async fn clear_users(&self) -> u64 {
        self.backend.clear_users().await.unwrap_or_else(|error| {
            error!(?error, "failed to clear local users");
            0
        })
    }

    /// Applies a workload delta. Missing ids and unknown users are ignored.
    pub async fn adjust_workload(&self, user_id: &str, delta: i64) {
        if user_id.is_empty() {
            return;
        }
        let Some(mut user) = self.user(user_id).await else {
            warn!(user_id = %user_id, "workload delta for unknown local user");
            return;
        };
        user.workload = (user.workload + delta).max(0);
        user.updated_at = Utc::now();
        let workload = user.workload;
        if self.put_user(user).await {
            debug!(user_id = %user_id, workload, "local workload adjusted");
        }
    }

    pub async fn tickets(&self) -> Vec<Ticket> {
        match self.backend.list_tickets().await {
            Ok(tickets) => {
                debug!(count = tickets.len(), "local tickets loaded");
                tickets
            }
            Err(error) => {
                error!(?error, "failed to list local tickets");
                Vec::new()
            }
        }
    }

    pub async fn ticket(&self, id: &str) -> Option<Ticket> {
        self.backend.get_ticket(id).await.unwrap_or_else(|error| {
            error!(?error, ticket_id = %id, "failed to load local ticket");
            None
        })
    }

    pub async fn put_ticket(&self, ticket: Ticket) -> bool {
        let ticket_id = ticket.id.clone();
        match self.backend.put_ticket(ticket).await {
            Ok(()) => true,
            Err(error) => {
                error!(?error, ticket_id = %ticket_id, "failed to write local ticket");
                false
            }
        }
    }

    pub async fn add_ticket(&self, draft: TicketDraft) -> Option<Ticket> {
        let ticket = synthesize_ticket(draft, Utc::now());
        if !self.put_ticket(ticket.clone()).await {
            return None;
        }
        debug!(ticket_id = %ticket.id, provenance = ticket.provenance.as_str(), "local ticket added");
        Some(ticket)
    }

    /// Stores a ticket exactly as the remote returned it.
    pub async fn replace_ticket(&self, mut ticket: Ticket) -> bool {
        ticket.provenance = Provenance::Authoritative;
        self.put_ticket(ticket).await
    }

    pub async fn find_tickets(&self, lookup: &TicketLookup) -> Vec<Ticket> {
        self.backend
            .find_tickets(lookup)
            .await
            .unwrap_or_else(|error| {
                error!(?error, ?lookup, "failed to query local tickets");
                Vec::new()
            })
    }

    pub async fn unsynced_tickets(&self) -> Vec<Ticket> {
        self.find_tickets(&TicketLookup::Unsynced).await
    }

    /// Writes an adjustment locally and marks the ticket as not accepted by the
    /// remote. Returns `None` when the ticket is not cached.
    pub async fn update_ticket(&self, id: &str, patch: &AdjustTicketRequest) -> Option<Ticket> {
        let mut ticket = self.ticket(id).await?;
        if let Some(status) = patch.status {
            ticket.status = status;
        }
        if let Some(priority) = patch.priority {
            ticket.priority = priority;
        }
        if let Some(assignee) = &patch.assigned_user_id {
            ticket.assigned_user_id = assignee.clone().filter(|id| !id.is_empty());
        }
        if let Some(department) = patch.assigned_department {
            ticket.assigned_department = department;
        }
        ticket.provenance = ticket.provenance.after_local_edit();
        ticket.updated_at = Utc::now();

        if !self.put_ticket(ticket.clone()).await {
            return None;
        }
        debug!(ticket_id = %id, "local ticket updated");
        Some(ticket)
    }

    pub async fn remove_ticket(&self, id: &str) -> bool {
        self.backend.delete_ticket(id).await.unwrap_or_else(|error| {
            error!(?error, ticket_id = %id, "failed to remove local ticket");
            false
        })
    }

    pub async fn delete_tickets(&self, lookup: &TicketLookup) -> u64 {
        self.backend
            .delete_tickets(lookup)
            .await
            .unwrap_or_else(|error| {
                error!(?error, ?lookup, "failed to delete local tickets");
                0
            })
    }

    pub async fn delete_tickets_by_customer_name(&self, name: &str) -> u64 {
        let deleted = self
            .delete_tickets(&TicketLookup::CustomerName(name.to_owned()))
            .await;
        debug!(customer_name = %name, deleted, "local tickets deleted by customer");
        deleted
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::LocalStore;
    use crate::{
        store::{InMemoryRecordStore, RecordStore, TicketLookup},
        synth::{TicketDraft, UserDraft},
        types::{AdjustTicketRequest, Provenance, Ticket, TicketStatus, User},
    };

    struct BrokenStore;

    #[async_trait]
    impl RecordStore for BrokenStore {
        async fn get_user(&self, _id: &str) -> anyhow::Result<Option<User>> {
            Err(anyhow::anyhow!("disk unavailable"))
        }
        async fn list_users(&self) -> anyhow::Result<Vec<User>> {
            Err(anyhow::anyhow!("disk unavailable"))
        }
        async fn put_user(&self, _user: User) -> anyhow::Result<()> {
            Err(anyhow::anyhow!("disk unavailable"))
        }
        async fn delete_user(&self, _id: &str) -> anyhow::Result<bool> {
            Err(anyhow::anyhow!("disk unavailable"))
        }
        async fn clear_users(&self) -> anyhow::Result<u64> {
            Err(anyhow::anyhow!("disk unavailable"))
        }
        async fn get_ticket(&self, _id: &str) -> anyhow::Result<Option<Ticket>> {
            Err(anyhow::anyhow!("disk unavailable"))
        }
        async fn list_tickets(&self) -> anyhow::Result<Vec<Ticket>> {
            Err(anyhow::anyhow!("disk unavailable"))
        }
        async fn put_ticket(&self, _ticket: Ticket) -> anyhow::Result<()> {
            Err(anyhow::anyhow!("disk unavailable"))
        }
        async fn delete_ticket(&self, _id: &str) -> anyhow::Result<bool> {
            Err(anyhow::anyhow!("disk unavailable"))
        }
        async fn find_tickets(&self, _lookup: &TicketLookup) -> anyhow::Result<Vec<Ticket>> {
            Err(anyhow::anyhow!("disk unavailable"))
        }
        async fn delete_tickets(&self, _lookup: &TicketLookup) -> anyhow::Result<u64> {
            Err(anyhow::anyhow!("disk unavailable"))
        }
    }

    #[tokio::test]
    async fn storage_errors_degrade_to_empty_results() {
        let local = LocalStore::new(Arc::new(BrokenStore));

        assert!(local.tickets().await.is_empty());
        assert!(local.users().await.is_empty());
        assert!(local.ticket("t-1").await.is_none());
        assert!(local.add_ticket(TicketDraft::default()).await.is_none());
        assert!(local.add_user(UserDraft::default()).await.is_none());
        assert_eq!(local.delete_tickets_by_customer_name("Ana").await, 0);
        local.adjust_workload("u-1", 1).await;
    }

    #[tokio::test]
    async fn update_marks_ticket_as_locally_modified() {
        let local = LocalStore::new(Arc::new(InMemoryRecordStore::default()));
        let ticket = local
            .add_ticket(TicketDraft {
                synced: Some(true),
                assigned_user_id: Some("u-1".into()),
                ..TicketDraft::default()
            })
            .await
            .expect("ticket added");
        assert_eq!(ticket.provenance, Provenance::Authoritative);

        let updated = local
            .update_ticket(
                &ticket.id,
                &AdjustTicketRequest {
                    status: Some(TicketStatus::OnGoing),
                    assigned_user_id: Some(None),
                    ..AdjustTicketRequest::default()
                },
            )
            .await
            .expect("ticket updated");

        assert_eq!(updated.provenance, Provenance::LocallyModified);
        assert!(!updated.synced());
        assert!(updated.is_local());
        assert_eq!(updated.status, TicketStatus::OnGoing);
        assert_eq!(updated.assigned_user_id, None);
        assert!(updated.updated_at >= ticket.updated_at);
        assert_eq!(local.unsynced_tickets().await.len(), 1);
    }

    #[tokio::test]
    async fn update_of_missing_ticket_returns_none() {
        let local = LocalStore::new(Arc::new(InMemoryRecordStore::default()));
        assert!(
            local
                .update_ticket("missing", &AdjustTicketRequest::default())
                .await
                .is_none()
        );
    }

    #[tokio::test]
    async fn workload_delta_clamps_at_zero_and_skips_unknown_users() {
        let local = LocalStore::new(Arc::new(InMemoryRecordStore::default()));
        let user = local
            .add_user(UserDraft {
                workload: Some(1),
                ..UserDraft::default()
            })
            .await
            .expect("user added");

        local.adjust_workload(&user.id, -1).await;
        local.adjust_workload(&user.id, -1).await;
        local.adjust_workload("", 1).await;
        local.adjust_workload("ghost", 1).await;

        let stored = local.user(&user.id).await.expect("user exists");
        assert_eq!(stored.workload, 0);
        assert_eq!(local.users().await.len(), 1);
    }

    #[tokio::test]
    async fn deletes_tickets_by_customer_name() {
        let local = LocalStore::new(Arc::new(InMemoryRecordStore::default()));
        for name in ["Ana", "Ana", "Budi"] {
            local
                .add_ticket(TicketDraft {
                    customer_name: Some(name.into()),
                    ..TicketDraft::default()
                })
                .await
                .expect("ticket added");
        }

        assert_eq!(local.delete_tickets_by_customer_name("Ana").await, 2);
        let remaining = local.tickets().await;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].customer_name, "Budi");
    }
}
