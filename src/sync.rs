use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::{
    query_cache::QueryCache,
    remote::RemoteApi,
    stats,
    store::LocalStore,
    types::{AdjustTicketRequest, IngestEmailRequest, SyncFailure, SyncReport, Ticket},
};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EditPath {
    Remote,
    LocalFallback,
}

#[derive(Debug, Clone, Serialize)]
pub struct EditOutcome {
    pub ticket: Ticket,
    pub path: EditPath,
}

/// Why a fallback edit could not be applied.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EditError {
    #[error("ticket {0} is not available offline")]
    NotCached(String),
    #[error("could not save ticket {0} locally")]
    LocalWrite(String),
}

/// Pushes local work to the remote and applies edits remote-first.
pub struct SyncDriver {
    remote: Arc<dyn RemoteApi>,
    local: LocalStore,
    reads: QueryCache,
}

impl SyncDriver {
    pub fn new(remote: Arc<dyn RemoteApi>, local: LocalStore, reads: QueryCache) -> Self {
        Self {
            remote,
            local,
            reads,
        }
    }

    /// Submits every unsynced local ticket through email ingestion. Delivered
    /// tickets leave the cache; failures stay for the next attempt.
    pub async fn push_unsynced(&self) -> SyncReport {
        let pending = self.local.unsynced_tickets().await;
        info!(pending = pending.len(), "sync push start");

        let mut report = SyncReport::default();
        for ticket in pending {
            let request = IngestEmailRequest::from_ticket(&ticket);
            match self.remote.ingest_email(&request).await {
                Ok(created) => {
                    self.local.remove_ticket(&ticket.id).await;
                    info!(local_id = %ticket.id, remote_id = %created.id, "ticket synced");
                    report.succeeded += 1;
                }
                Err(error) => {
                    warn!(?error, ticket_id = %ticket.id, "ticket sync failed");
                    report.failed += 1;
                    report.failures.push(SyncFailure {
                        ticket_id: ticket.id.clone(),
                        error: error.to_string(),
                    });
                }
            }
        }

        stats::recompute_user_stats(&self.local).await;
        self.reads.invalidate_all().await;

        info!(
            succeeded = report.succeeded,
            failed = report.failed,
            "sync push finished"
        );
        report
    }

    /// Applies an adjustment remote-first. When the remote is unavailable the
    /// cached copy is edited instead and workloads are nudged until the next
    /// recomputation corrects them.
    pub async fn edit_ticket(
        &self,
        id: &str,
        request: &AdjustTicketRequest,
    ) -> Result<EditOutcome, EditError> {
        let outcome = match self.remote.adjust_ticket(id, request).await {
            Ok(adjusted) => Ok(self.accept_remote_edit(id, adjusted).await),
            Err(error) => {
                warn!(?error, ticket_id = %id, "remote adjust failed; editing local copy");
                self.edit_locally(id, request).await
            }
        };

        stats::recompute_user_stats(&self.local).await;
        self.reads.invalidate_all().await;
        outcome
    }

    async fn accept_remote_edit(&self, id: &str, adjusted: Ticket) -> EditOutcome {
        let ticket = match self.remote.get_ticket(id).await {
            Ok(fresh) => fresh,
            Err(error) => {
                warn!(?error, ticket_id = %id, "refetch after adjust failed; keeping adjust response");
                adjusted
            }
        };
        self.local.replace_ticket(ticket.clone()).await;
        info!(ticket_id = %id, "ticket adjusted remotely");

        EditOutcome {
            ticket,
            path: EditPath::Remote,
        }
    }

    async fn edit_locally(
        &self,
        id: &str,
        request: &AdjustTicketRequest,
    ) -> Result<EditOutcome, EditError> {
        let previous = self
            .local
            .ticket(id)
            .await
            .ok_or_else(|| EditError::NotCached(id.to_owned()))?
            .assigned_user_id;
        let ticket = self
            .local
            .update_ticket(id, request)
            .await
            .ok_or_else(|| EditError::LocalWrite(id.to_owned()))?;

        if request.touches_assignee() {
            let next = ticket.assigned_user_id.clone();
            if previous != next {
                if let Some(previous) = previous.as_deref() {
                    self.local.adjust_workload(previous, -1).await;
                }
                if let Some(next) = next.as_deref() {
                    self.local.adjust_workload(next, 1).await;
                }
            }
        }
        info!(ticket_id = %id, "ticket adjusted locally");

        Ok(EditOutcome {
            ticket,
            path: EditPath::LocalFallback,
        })
    }
}
