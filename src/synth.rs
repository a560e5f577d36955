//! Turns partial input into fully populated records ready for storage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{
    Category, Department, Payload, Priority, Provenance, Ticket, TicketStatus, User,
};

/// Any subset of a user's fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<Department>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skills: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workload: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solved_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Any subset of a ticket's fields, under either content naming.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TicketDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub problem: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TicketStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_department: Option<Department>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent1_auto_answered: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent1_answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent2_confidence: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sla_due_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_payload: Option<Payload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synced: Option<bool>,
    #[serde(default, rename = "_local", skip_serializing_if = "Option::is_none")]
    pub local: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl TicketDraft {
    /// Draft for an emailed-in ticket that only exists on this device.
    pub fn local_email(
        customer_name: impl Into<String>,
        customer_email: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            customer_name: Some(customer_name.into()),
            customer_email: Some(customer_email.into()),
            subject: Some(subject.into()),
            body: Some(body.into()),
            local: Some(true),
            ..Self::default()
        }
    }
}

pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

pub fn synthesize_user(draft: UserDraft, now: DateTime<Utc>) -> User {
    User {
        id: draft.id.filter(|id| !id.is_empty()).unwrap_or_else(generate_id),
        name: draft.name.unwrap_or_else(|| "Unknown".to_owned()),
        email: draft.email.unwrap_or_default(),
        department: draft.department.unwrap_or(Department::CustomerService),
        skills: draft.skills.unwrap_or_default(),
        active: draft.active.unwrap_or(true),
        workload: draft.workload.unwrap_or(0).max(0),
        solved_count: draft.solved_count.unwrap_or(0).max(0),
        created_at: draft.created_at.unwrap_or(now),
        updated_at: now,
    }
}

pub fn synthesize_ticket(draft: TicketDraft, now: DateTime<Utc>) -> Ticket {
    let raw_payload = match &draft.raw_payload {
        Some(payload) => payload.clone(),
        None => draft_as_payload(&draft),
    };
    let synced = draft.synced.unwrap_or(false);
    let local = draft.local.unwrap_or(!synced);

    let customer_email = draft.customer_email.unwrap_or_default();
    let customer_name = draft
        .customer_name
        .unwrap_or_else(|| customer_email.clone());

    Ticket {
        id: draft.id.filter(|id| !id.is_empty()).unwrap_or_else(generate_id),
        external_ref: draft.external_ref,
        customer_name,
        customer_email,
        problem: draft.problem.or(draft.subject).unwrap_or_default(),
        description: draft.description.or(draft.body).unwrap_or_default(),
        status: draft.status.unwrap_or(TicketStatus::Listed),
        priority: draft.priority.unwrap_or(Priority::Low),
        category: draft.category.unwrap_or(Category::Other),
        tags: draft.tags.unwrap_or_default(),
        assigned_user_id: draft.assigned_user_id.filter(|id| !id.is_empty()),
        assigned_department: draft
            .assigned_department
            .unwrap_or(Department::CustomerService),
        agent1_auto_answered: draft.agent1_auto_answered.unwrap_or(false),
        agent1_answer: draft.agent1_answer,
        agent2_confidence: draft.agent2_confidence.unwrap_or(0.0).clamp(0.0, 1.0),
        sla_due_at: draft.sla_due_at.unwrap_or(now),
        raw_payload,
        provenance: Provenance::from_flags(synced, local),
        created_at: draft.created_at.unwrap_or(now),
        updated_at: now,
    }
}

fn draft_as_payload(draft: &TicketDraft) -> Payload {
    match serde_json::to_value(draft) {
        Ok(serde_json::Value::Object(map)) => map,
        _ => Payload::new(),
    }
}
