use std::collections::HashMap;

use crate::types::{Ticket, TicketFilters, User};

/// Combines a remote listing with the local cache. A local record always
/// replaces a remote record with the same id; when the remote listing is
/// missing the result is the local collection as-is.
pub fn merge_tickets(remote: Option<Vec<Ticket>>, local: Vec<Ticket>) -> Vec<Ticket> {
    merge_by_id(remote, local, |ticket| &ticket.id)
}

/// Same rule as tickets: the cached copy of a user wins over the remote one.
pub fn merge_users(remote: Option<Vec<User>>, local: Vec<User>) -> Vec<User> {
    merge_by_id(remote, local, |user| &user.id)
}

fn merge_by_id<T>(remote: Option<Vec<T>>, local: Vec<T>, id_of: fn(&T) -> &String) -> Vec<T> {
    let Some(remote) = remote else {
        return local;
    };

    let mut merged: Vec<T> = Vec::with_capacity(remote.len() + local.len());
    let mut positions: HashMap<String, usize> = HashMap::new();

    for record in remote.into_iter().chain(local) {
        match positions.get(id_of(&record)) {
            Some(&index) => merged[index] = record,
            None => {
                positions.insert(id_of(&record).clone(), merged.len());
                merged.push(record);
            }
        }
    }

    merged
}

/// Structured filters (everything except the free-text `q`).
pub fn apply_filters(tickets: Vec<Ticket>, filters: &TicketFilters) -> Vec<Ticket> {
    tickets
        .into_iter()
        .filter(|ticket| filters.status.is_none_or(|status| ticket.status == status))
        .filter(|ticket| {
            filters
                .priority
                .is_none_or(|priority| ticket.priority == priority)
        })
        .filter(|ticket| {
            filters
                .assignee
                .as_deref()
                .is_none_or(|assignee| ticket.assigned_user_id.as_deref() == Some(assignee))
        })
        .filter(|ticket| {
            filters
                .department
                .is_none_or(|department| ticket.assigned_department == department)
        })
        .collect()
}

/// Case-insensitive substring match over customer name, subject and email.
pub fn search_tickets(tickets: &[Ticket], query: &str) -> Vec<Ticket> {
    let needle = query.to_lowercase();
    if needle.is_empty() {
        return tickets.to_vec();
    }

    tickets
        .iter()
        .filter(|ticket| {
            ticket.customer_name.to_lowercase().contains(&needle)
                || ticket.subject().to_lowercase().contains(&needle)
                || ticket.customer_email.to_lowercase().contains(&needle)
        })
        .cloned()
        .collect()
}

/// Highest priority first, newest first within a priority.
pub fn sort_for_display(tickets: &[Ticket]) -> Vec<Ticket> {
    let mut sorted = tickets.to_vec();
    sorted.sort_by(|a, b| {
        b.priority
            .rank()
            .cmp(&a.priority.rank())
            .then_with(|| b.created_at.cmp(&a.created_at))
    });
    sorted
}
