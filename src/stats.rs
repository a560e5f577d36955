//! Derived per-user counters.
//!
//! `workload` and `solved_count` are recomputed from the cached ticket set.
//! Recomputation only writes users whose counters drifted, so it is safe to
//! call after every mutation and converges no matter how often it runs.

use std::collections::HashMap;

use chrono::Utc;
use tracing::{debug, info};

use crate::{store::LocalStore, types::Ticket};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserTally {
    pub open: HashMap<String, i64>,
    pub solved: HashMap<String, i64>,
}

impl UserTally {
    pub fn workload(&self, user_id: &str) -> i64 {
        self.open.get(user_id).copied().unwrap_or(0)
    }

    pub fn solved_count(&self, user_id: &str) -> i64 {
        self.solved.get(user_id).copied().unwrap_or(0)
    }
}

pub fn tally(tickets: &[Ticket]) -> UserTally {
    let mut tally = UserTally::default();
    for ticket in tickets {
        let Some(user_id) = ticket.assigned_user_id.as_deref().filter(|id| !id.is_empty()) else {
            continue;
        };
        let counts = if ticket.status.is_solved() {
            &mut tally.solved
        } else {
            &mut tally.open
        };
        *counts.entry(user_id.to_owned()).or_insert(0) += 1;
    }
    tally
}

/// Brings every cached user's workload and solved count in line with the
/// cached tickets. Returns how many users were rewritten.
pub async fn recompute_user_stats(local: &LocalStore) -> usize {
    let tally = tally(&local.tickets().await);
    let mut updated = 0;

    for mut user in local.users().await {
        let workload = tally.workload(&user.id);
        let solved_count = tally.solved_count(&user.id);
        if user.workload == workload && user.solved_count == solved_count {
            continue;
        }
        user.workload = workload;
        user.solved_count = solved_count;
        user.updated_at = Utc::now();
        let user_id = user.id.clone();
        if local.put_user(user).await {
            debug!(user_id = %user_id, workload, solved_count, "user stats recomputed");
            updated += 1;
        }
    }

    info!(updated, "user stats recomputation finished");
    updated
}

/// Older variant that only repairs `solved_count`.
pub async fn recompute_solved_counts(local: &LocalStore) -> usize {
    let tally = tally(&local.tickets().await);
    let mut updated = 0;

    for mut user in local.users().await {
        let solved_count = tally.solved_count(&user.id);
        if user.solved_count == solved_count {
            continue;
        }
        user.solved_count = solved_count;
        user.updated_at = Utc::now();
        if local.put_user(user).await {
            updated += 1;
        }
    }

    debug!(updated, "solved counts recomputed");
    updated
}
