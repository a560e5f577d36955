use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::types::{Ticket, User};

use super::{RecordStore, TicketLookup};

#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    users: Arc<RwLock<HashMap<String, User>>>,
    tickets: Arc<RwLock<HashMap<String, Ticket>>>,
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn get_user(&self, id: &str) -> anyhow::Result<Option<User>> {
        Ok(self.users.read().await.get(id).cloned())
    }

    async fn list_users(&self) -> anyhow::Result<Vec<User>> {
        let mut users = self.users.read().await.values().cloned().collect::<Vec<_>>();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(users)
    }

    async fn put_user(&self, user: User) -> anyhow::Result<()> {
        self.users.write().await.insert(user.id.clone(), user);
        Ok(())
    }

    async fn delete_user(&self, id: &str) -> anyhow::Result<bool> {
        Ok(self.users.write().await.remove(id).is_some())
    }

    async fn clear_users(&self) -> anyhow::Result<u64> {
        let mut users = self.users.write().await;
        let removed = users.len() as u64;
        users.clear();
        Ok(removed)
    }

    async fn get_ticket(&self, id: &str) -> anyhow::Result<Option<Ticket>> {
        Ok(self.tickets.read().await.get(id).cloned())
    }

    async fn list_tickets(&self) -> anyhow::Result<Vec<Ticket>> {
        let mut tickets = self
            .tickets
            .read()
            .await
            .values()
            .cloned()
            .collect::<Vec<_>>();
        tickets.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(tickets)
    }

    async fn put_ticket(&self, ticket: Ticket) -> anyhow::Result<()> {
        self.tickets.write().await.insert(ticket.id.clone(), ticket);
        Ok(())
    }

    async fn delete_ticket(&self, id: &str) -> anyhow::Result<bool> {
        Ok(self.tickets.write().await.remove(id).is_some())
    }

    async fn find_tickets(&self, lookup: &TicketLookup) -> anyhow::Result<Vec<Ticket>> {
        let mut matches = self
            .tickets
            .read()
            .await
            .values()
            .filter(|ticket| lookup.matches(ticket))
            .cloned()
            .collect::<Vec<_>>();
        matches.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(matches)
    }

    async fn delete_tickets(&self, lookup: &TicketLookup) -> anyhow::Result<u64> {
        let mut tickets = self.tickets.write().await;
        let initial_len = tickets.len();
        tickets.retain(|_, ticket| !lookup.matches(ticket));
        Ok((initial_len - tickets.len()) as u64)
    }
}
