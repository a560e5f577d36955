use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    merge::{apply_filters, merge_tickets, merge_users, search_tickets, sort_for_display},
    query_cache::QueryCache,
    remote::RemoteApi,
    stats,
    store::LocalStore,
    sync::{EditError, EditOutcome, SyncDriver},
    synth::TicketDraft,
    types::{
        AdjustTicketRequest, IngestEmailRequest, LocalSnapshot, PeopleSummary, SyncReport, Ticket,
        TicketEvent, TicketFilters, User,
    },
    validation::{NewMemberForm, ValidationErrors},
};

/// Upper bound for one sample-ticket generation request.
pub const MAX_GENERATED_TICKETS: usize = 50;

#[derive(Debug, Error)]
pub enum DeskError {
    #[error("ticket {0} was not found remotely or locally")]
    TicketNotFound(String),
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    #[error("could not save locally: {0}")]
    LocalWrite(String),
    #[error("remote request failed: {0}")]
    Remote(String),
}

/// Whether a write reached the remote or only this device.
#[derive(Debug, Clone, Serialize)]
pub struct Saved<T> {
    pub record: T,
    pub local_only: bool,
}

/// The operations the dashboard UI calls. Reads merge remote and local data;
/// writes go through the sync driver or fall back to the local cache.
pub struct TicketDesk {
    remote: Arc<dyn RemoteApi>,
    local: LocalStore,
    reads: QueryCache,
    sync: SyncDriver,
}

impl TicketDesk {
    pub fn new(remote: Arc<dyn RemoteApi>, local: LocalStore, reads: QueryCache) -> Self {
        let sync = SyncDriver::new(remote.clone(), local.clone(), reads.clone());
        Self {
            remote,
            local,
            reads,
            sync,
        }
    }

    pub fn local(&self) -> &LocalStore {
        &self.local
    }

    /// Merged, filtered, searched and display-sorted ticket list.
    pub async fn list_tickets(&self, filters: &TicketFilters) -> Vec<Ticket> {
        if let Some(cached) = self.reads.tickets(filters).await {
            debug!(count = cached.len(), "ticket list served from query cache");
            return cached;
        }

        let (remote, local) = tokio::join!(self.remote.list_tickets(filters), self.local.tickets());
        let remote = match remote {
            Ok(tickets) => Some(tickets),
            Err(error) => {
                warn!(?error, "remote ticket list unavailable; using local cache only");
                None
            }
        };

        let degraded = remote.is_none();
        let merged = apply_filters(merge_tickets(remote, local), filters);
        let searched = search_tickets(&merged, filters.q.as_deref().unwrap_or_default());
        let tickets = sort_for_display(&searched);

        // Local-only results are not memoised so a recovered remote shows up
        // on the next read.
        if !degraded {
            self.reads.store_tickets(filters.clone(), tickets.clone()).await;
        }
        tickets
    }

    /// Remote copy unless the cache holds an unsynced edit of the same ticket.
    pub async fn ticket(&self, id: &str) -> Result<Ticket, DeskError> {
        let (remote, local) = tokio::join!(self.remote.get_ticket(id), self.local.ticket(id));
        match (remote, local) {
            (_, Some(local)) if local.is_local() => Ok(local),
            (Ok(remote), _) => Ok(remote),
            (Err(error), Some(local)) => {
                warn!(?error, ticket_id = %id, "remote ticket unavailable; using cached copy");
                Ok(local)
            }
            (Err(error), None) => {
                warn!(?error, ticket_id = %id, "ticket not found");
                Err(DeskError::TicketNotFound(id.to_owned()))
            }
        }
    }

    pub async fn ticket_events(&self, id: &str) -> Vec<TicketEvent> {
        self.remote.ticket_events(id).await.unwrap_or_else(|error| {
            warn!(?error, ticket_id = %id, "ticket events unavailable");
            Vec::new()
        })
    }

    pub async fn adjust_ticket(
        &self,
        id: &str,
        request: &AdjustTicketRequest,
    ) -> Result<EditOutcome, DeskError> {
        self.sync
            .edit_ticket(id, request)
            .await
            .map_err(|error| match error {
                EditError::NotCached(id) => DeskError::TicketNotFound(id),
                EditError::LocalWrite(id) => DeskError::LocalWrite(format!("ticket {id}")),
            })
    }

    pub async fn retriage_ticket(&self, id: &str) -> Result<Ticket, DeskError> {
        let ticket = self
            .remote
            .retriage_ticket(id)
            .await
            .map_err(|error| DeskError::Remote(error.to_string()))?;

        if self.local.ticket(id).await.is_some() {
            self.local.replace_ticket(ticket.clone()).await;
        }
        stats::recompute_user_stats(&self.local).await;
        self.reads.invalidate_all().await;
        info!(ticket_id = %id, "ticket retriaged");
        Ok(ticket)
    }

    pub async fn faq_answer(&self, ticket_id: &str) -> Result<Value, DeskError> {
        self.remote
            .faq_answer(ticket_id)
            .await
            .map_err(|error| DeskError::Remote(error.to_string()))
    }

    pub async fn triage(&self, ticket_id: &str) -> Result<Value, DeskError> {
        self.remote
            .triage(ticket_id)
            .await
            .map_err(|error| DeskError::Remote(error.to_string()))
    }

    pub async fn users(&self) -> Vec<User> {
        if let Some(cached) = self.reads.users().await {
            return cached;
        }

        let (remote, local) = tokio::join!(self.remote.list_users(), self.local.users());
        let remote = match remote {
            Ok(users) => Some(users),
            Err(error) => {
                warn!(?error, "remote user list unavailable; using local cache only");
                None
            }
        };
        let degraded = remote.is_none();
        let users = merge_users(remote, local);
        if !degraded {
            self.reads.store_users(users.clone()).await;
        }
        users
    }

    pub async fn people_summary(&self) -> PeopleSummary {
        PeopleSummary::from_users(&self.users().await)
    }

    /// Validates the form, then creates the member remotely or, failing
    /// that, on this device.
    pub async fn add_member(&self, form: &NewMemberForm) -> Result<Saved<User>, DeskError> {
        let draft = form.validate()?;

        let saved = match self.remote.create_user(&draft).await {
            Ok(user) => Saved {
                record: user,
                local_only: false,
            },
            Err(error) => {
                warn!(?error, "remote user create failed; saving locally");
                let user = self
                    .local
                    .add_user(draft)
                    .await
                    .ok_or_else(|| DeskError::LocalWrite("team member".to_owned()))?;
                Saved {
                    record: user,
                    local_only: true,
                }
            }
        };

        self.reads.invalidate_users().await;
        info!(user_id = %saved.record.id, local_only = saved.local_only, "team member added");
        Ok(saved)
    }

    /// Creates a ticket from an email, keeping it locally for a later push
    /// when the remote rejects it.
    pub async fn ingest_email(
        &self,
        request: &IngestEmailRequest,
    ) -> Result<Saved<Ticket>, DeskError> {
        let saved = match self.remote.ingest_email(request).await {
            Ok(ticket) => Saved {
                record: ticket,
                local_only: false,
            },
            Err(error) => {
                warn!(?error, "remote ingest failed; queueing ticket locally");
                let draft = TicketDraft::local_email(
                    request.customer_name.clone(),
                    request.customer_email.clone(),
                    request.subject.clone(),
                    request.body.clone(),
                );
                let ticket = self
                    .local
                    .add_ticket(draft)
                    .await
                    .ok_or_else(|| DeskError::LocalWrite("ticket".to_owned()))?;
                stats::recompute_user_stats(&self.local).await;
                Saved {
                    record: ticket,
                    local_only: true,
                }
            }
        };

        self.reads.invalidate_tickets().await;
        Ok(saved)
    }

    pub async fn sync(&self) -> SyncReport {
        self.sync.push_unsynced().await
    }

    pub async fn recompute_stats(&self) -> usize {
        let updated = stats::recompute_user_stats(&self.local).await;
        self.reads.invalidate_users().await;
        updated
    }

    pub async fn local_snapshot(&self) -> LocalSnapshot {
        let (tickets, unsynced) =
            tokio::join!(self.local.tickets(), self.local.unsynced_tickets());
        LocalSnapshot {
            total: tickets.len(),
            unsynced: unsynced.len(),
            tickets,
        }
    }

    /// Seeds `count` sample tickets that only exist on this device.
    pub async fn generate_local_tickets(&self, count: usize) -> Vec<Ticket> {
        let count = count.min(MAX_GENERATED_TICKETS);
        let mut created = Vec::new();
        for i in 1..=count {
            let draft = TicketDraft::local_email(
                format!("Generated {i}"),
                format!("gen{i}@example.com"),
                format!("Generated {i}"),
                format!("Generated ticket {i}"),
            );
            if let Some(ticket) = self.local.add_ticket(draft).await {
                created.push(ticket);
            }
        }

        stats::recompute_user_stats(&self.local).await;
        self.reads.invalidate_all().await;
        info!(created = created.len(), "sample tickets generated");
        created
    }

    pub async fn delete_local_tickets_by_customer(&self, customer_name: &str) -> u64 {
        let deleted = self
            .local
            .delete_tickets_by_customer_name(customer_name)
            .await;
        stats::recompute_user_stats(&self.local).await;
        self.reads.invalidate_all().await;
        deleted
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;

    use super::{DeskError, MAX_GENERATED_TICKETS, TicketDesk};
    use crate::{
        query_cache::QueryCache,
        remote::scripted::ScriptedRemote,
        store::{InMemoryRecordStore, LocalStore},
        synth::{TicketDraft, UserDraft, synthesize_ticket, synthesize_user},
        types::{IngestEmailRequest, Priority, Provenance, Ticket, TicketFilters, TicketStatus},
        validation::NewMemberForm,
    };

    fn local() -> LocalStore {
        LocalStore::new(Arc::new(InMemoryRecordStore::default()))
    }

    fn remote_ticket(id: &str, status: TicketStatus, priority: Priority) -> Ticket {
        synthesize_ticket(
            TicketDraft {
                id: Some(id.to_owned()),
                customer_name: Some(format!("Customer {id}")),
                status: Some(status),
                priority: Some(priority),
                synced: Some(true),
                ..TicketDraft::default()
            },
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn list_merges_remote_and_local_with_local_winning() {
        let remote = ScriptedRemote::online();
        remote
            .seed_ticket(remote_ticket("X", TicketStatus::Listed, Priority::Low))
            .await;
        remote
            .seed_ticket(remote_ticket("R", TicketStatus::Listed, Priority::High))
            .await;

        let local = local();
        local
            .add_ticket(TicketDraft {
                id: Some("X".into()),
                problem: Some("edited offline".into()),
                priority: Some(Priority::Medium),
                ..TicketDraft::default()
            })
            .await
            .expect("added");

        let desk = TicketDesk::new(remote, local, QueryCache::default());
        let tickets = desk.list_tickets(&TicketFilters::default()).await;

        assert_eq!(tickets.len(), 2);
        assert_eq!(tickets[0].id, "R");
        assert_eq!(tickets[1].id, "X");
        assert_eq!(tickets[1].problem, "edited offline");
        assert!(tickets[1].is_local());
    }

    #[tokio::test]
    async fn list_degrades_to_local_and_filters_uniformly() {
        let local = local();
        local
            .add_ticket(TicketDraft {
                customer_name: Some("Open".into()),
                ..TicketDraft::default()
            })
            .await
            .expect("added");
        local
            .add_ticket(TicketDraft {
                customer_name: Some("Closed".into()),
                status: Some(TicketStatus::Solve),
                ..TicketDraft::default()
            })
            .await
            .expect("added");

        let desk = TicketDesk::new(ScriptedRemote::unreachable(), local, QueryCache::default());
        let solved = desk
            .list_tickets(&TicketFilters {
                status: Some(TicketStatus::Solve),
                ..TicketFilters::default()
            })
            .await;
        assert_eq!(solved.len(), 1);
        assert_eq!(solved[0].customer_name, "Closed");

        let searched = desk
            .list_tickets(&TicketFilters {
                q: Some("OPEN".into()),
                ..TicketFilters::default()
            })
            .await;
        assert_eq!(searched.len(), 1);
        assert_eq!(searched[0].customer_name, "Open");
    }

    #[tokio::test]
    async fn writes_invalidate_cached_lists() {
        let remote = ScriptedRemote::online();
        let local = local();
        let desk = TicketDesk::new(remote, local, QueryCache::default());

        assert!(desk.list_tickets(&TicketFilters::default()).await.is_empty());
        desk.generate_local_tickets(2).await;
        assert_eq!(desk.list_tickets(&TicketFilters::default()).await.len(), 2);
    }

    #[tokio::test]
    async fn ticket_detail_prefers_unsynced_local_copy() {
        let remote = ScriptedRemote::online();
        remote
            .seed_ticket(remote_ticket("T", TicketStatus::Listed, Priority::Low))
            .await;
        let local = local();
        let desk = TicketDesk::new(remote.clone(), local.clone(), QueryCache::default());

        assert_eq!(
            desk.ticket("T").await.expect("found").provenance,
            Provenance::Authoritative
        );

        local
            .add_ticket(TicketDraft {
                id: Some("T".into()),
                status: Some(TicketStatus::Solve),
                ..TicketDraft::default()
            })
            .await
            .expect("added");
        assert_eq!(
            desk.ticket("T").await.expect("found").status,
            TicketStatus::Solve
        );

        remote.set_down(true);
        assert!(matches!(
            desk.ticket("missing").await,
            Err(DeskError::TicketNotFound(_))
        ));
    }

    #[tokio::test]
    async fn add_member_validates_before_any_call() {
        let remote = ScriptedRemote::online();
        let desk = TicketDesk::new(remote.clone(), local(), QueryCache::default());

        let result = desk
            .add_member(&NewMemberForm {
                name: "X".into(),
                ..NewMemberForm::default()
            })
            .await;
        assert!(matches!(result, Err(DeskError::Validation(_))));
        assert!(desk.users().await.is_empty());
    }

    #[tokio::test]
    async fn add_member_falls_back_to_local_store() {
        let local = local();
        let desk = TicketDesk::new(ScriptedRemote::unreachable(), local.clone(), QueryCache::default());

        let saved = desk
            .add_member(&NewMemberForm {
                name: "Eka".into(),
                email: "eka@example.com".into(),
                department: "operational".into(),
                skills: "shipping".into(),
            })
            .await
            .expect("saved locally");

        assert!(saved.local_only);
        assert_eq!(local.users().await.len(), 1);
        assert_eq!(desk.users().await[0].name, "Eka");
    }

    #[tokio::test]
    async fn users_merge_remote_roster_with_local_counters() {
        let remote = ScriptedRemote::online();
        let now = Utc::now();
        let remote_user = synthesize_user(
            UserDraft {
                id: Some("U1".into()),
                name: Some("Fajar".into()),
                ..UserDraft::default()
            },
            now,
        );
        remote.seed_user(remote_user.clone()).await;
        remote
            .seed_user(synthesize_user(
                UserDraft {
                    id: Some("U2".into()),
                    ..UserDraft::default()
                },
                now,
            ))
            .await;

        let local = local();
        let mut cached = remote_user;
        cached.workload = 4;
        local.put_user(cached).await;

        let desk = TicketDesk::new(remote, local, QueryCache::default());
        let users = desk.users().await;
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].workload, 4);
        assert_eq!(desk.people_summary().await.average_workload, 2);
    }

    #[tokio::test]
    async fn ingest_failure_queues_ticket_for_sync() {
        let remote = ScriptedRemote::unreachable();
        let local = local();
        let desk = TicketDesk::new(remote.clone(), local.clone(), QueryCache::default());
        let request = IngestEmailRequest {
            customer_name: "Gita".into(),
            customer_email: "gita@example.com".into(),
            subject: "Where is my parcel".into(),
            body: "Ordered last week".into(),
        };

        let saved = desk.ingest_email(&request).await.expect("queued");
        assert!(saved.local_only);
        assert_eq!(saved.record.provenance, Provenance::LocalOnly);
        assert_eq!(desk.local_snapshot().await.unsynced, 1);

        remote.set_down(false);
        let report = desk.sync().await;
        assert_eq!(report.summary(), "1 succeeded, 0 failed");
        assert_eq!(desk.local_snapshot().await.total, 0);
        assert_eq!(remote.ingested.lock().await[0], request);
    }

    #[tokio::test]
    async fn retriage_refreshes_cached_copy() {
        let remote = ScriptedRemote::online();
        remote
            .seed_ticket(remote_ticket("T", TicketStatus::Listed, Priority::Low))
            .await;
        let local = local();
        let mut cached = remote_ticket("T", TicketStatus::Listed, Priority::Low);
        cached.provenance = Provenance::LocallyModified;
        local.put_ticket(cached).await;

        let desk = TicketDesk::new(remote, local.clone(), QueryCache::default());
        let ticket = desk.retriage_ticket("T").await.expect("retriaged");
        assert_eq!(ticket.agent2_confidence, 0.9);

        let stored = local.ticket("T").await.expect("cached");
        assert_eq!(stored.provenance, Provenance::Authoritative);
        assert_eq!(stored.agent2_confidence, 0.9);
    }

    #[tokio::test]
    async fn events_degrade_to_empty() {
        let remote = ScriptedRemote::online();
        let desk = TicketDesk::new(remote.clone(), local(), QueryCache::default());
        assert_eq!(desk.ticket_events("T").await.len(), 1);
        remote.set_down(true);
        assert!(desk.ticket_events("T").await.is_empty());
        assert!(matches!(
            desk.faq_answer("T").await,
            Err(DeskError::Remote(_))
        ));
    }

    #[tokio::test]
    async fn sample_generation_is_capped() {
        let desk = TicketDesk::new(ScriptedRemote::unreachable(), local(), QueryCache::default());
        let created = desk.generate_local_tickets(usize::MAX).await;
        assert_eq!(created.len(), MAX_GENERATED_TICKETS);
        assert_eq!(desk.local_snapshot().await.unsynced, MAX_GENERATED_TICKETS);
        assert_eq!(created[0].customer_email, "gen1@example.com");
    }

    #[tokio::test]
    async fn status_filter_sees_the_local_copy_on_id_collision() {
        let remote = ScriptedRemote::online();
        remote
            .seed_ticket(remote_ticket("C", TicketStatus::Listed, Priority::Low))
            .await;
        remote
            .seed_ticket(remote_ticket("R", TicketStatus::Listed, Priority::Low))
            .await;
        let local = local();
        local
            .add_ticket(TicketDraft {
                id: Some("C".into()),
                status: Some(TicketStatus::Solve),
                ..TicketDraft::default()
            })
            .await
            .expect("added");

        let desk = TicketDesk::new(remote, local, QueryCache::default());
        let listed = desk
            .list_tickets(&TicketFilters {
                status: Some(TicketStatus::Listed),
                ..TicketFilters::default()
            })
            .await;
        let solved = desk
            .list_tickets(&TicketFilters {
                status: Some(TicketStatus::Solve),
                ..TicketFilters::default()
            })
            .await;

        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, "R");
        assert_eq!(solved.len(), 1);
        assert_eq!(solved[0].id, "C");
        assert!(solved[0].is_local());
    }

    #[tokio::test]
    async fn degraded_list_is_not_memoised() {
        let remote = ScriptedRemote::unreachable();
        remote
            .seed_ticket(remote_ticket("R", TicketStatus::Listed, Priority::Low))
            .await;
        let desk = TicketDesk::new(remote.clone(), local(), QueryCache::default());

        assert!(desk.list_tickets(&TicketFilters::default()).await.is_empty());
        remote.set_down(false);
        assert_eq!(desk.list_tickets(&TicketFilters::default()).await.len(), 1);
    }

    #[tokio::test]
    async fn deleting_generated_tickets_by_customer() {
        let desk = TicketDesk::new(ScriptedRemote::unreachable(), local(), QueryCache::default());
        desk.generate_local_tickets(3).await;
        assert_eq!(desk.delete_local_tickets_by_customer("Generated 2").await, 1);
        assert_eq!(desk.local_snapshot().await.total, 2);
    }
}
