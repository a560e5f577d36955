use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Opaque JSON object kept in insertion order.
pub type Payload = Map<String, Value>;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Department {
    #[default]
    CustomerService,
    Finance,
    Operational,
    Chatbot,
}

impl Department {
    pub fn as_str(self) -> &'static str {
        match self {
            Department::CustomerService => "customer_service",
            Department::Finance => "finance",
            Department::Operational => "operational",
            Department::Chatbot => "chatbot",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "customer_service" => Some(Department::CustomerService),
            "finance" => Some(Department::Finance),
            "operational" => Some(Department::Operational),
            "chatbot" => Some(Department::Chatbot),
            _ => None,
        }
    }

    /// Departments a team member can belong to. `chatbot` only routes tickets.
    pub fn is_agent_department(self) -> bool {
        !matches!(self, Department::Chatbot)
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    #[default]
    Listed,
    OnGoing,
    Solve,
}

impl TicketStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TicketStatus::Listed => "listed",
            TicketStatus::OnGoing => "on_going",
            TicketStatus::Solve => "solve",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "listed" => Some(TicketStatus::Listed),
            "on_going" => Some(TicketStatus::OnGoing),
            "solve" => Some(TicketStatus::Solve),
            _ => None,
        }
    }

    pub fn is_solved(self) -> bool {
        matches!(self, TicketStatus::Solve)
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    #[default]
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "low" => Some(Priority::Low),
            "medium" => Some(Priority::Medium),
            "high" => Some(Priority::High),
            _ => None,
        }
    }

    pub fn rank(self) -> u8 {
        match self {
            Priority::Low => 1,
            Priority::Medium => 2,
            Priority::High => 3,
        }
    }

    pub fn sla_window(self) -> Duration {
        match self {
            Priority::High => Duration::hours(24),
            Priority::Medium => Duration::hours(72),
            Priority::Low => Duration::hours(120),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Billing,
    Refund,
    Login,
    Shipping,
    Cancellation,
    Technical,
    #[default]
    Other,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Billing => "billing",
            Category::Refund => "refund",
            Category::Login => "login",
            Category::Shipping => "shipping",
            Category::Cancellation => "cancellation",
            Category::Technical => "technical",
            Category::Other => "other",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "billing" => Some(Category::Billing),
            "refund" => Some(Category::Refund),
            "login" => Some(Category::Login),
            "shipping" => Some(Category::Shipping),
            "cancellation" => Some(Category::Cancellation),
            "technical" => Some(Category::Technical),
            "other" => Some(Category::Other),
            _ => None,
        }
    }
}

/// Where the current state of a cached ticket came from.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Matches what the remote returned on the last read.
    #[default]
    Authoritative,
    /// Known to the remote, edited locally since.
    LocallyModified,
    /// Never accepted by the remote.
    LocalOnly,
}

impl Provenance {
    pub fn as_str(self) -> &'static str {
        match self {
            Provenance::Authoritative => "authoritative",
            Provenance::LocallyModified => "locally_modified",
            Provenance::LocalOnly => "local_only",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "authoritative" => Some(Provenance::Authoritative),
            "locally_modified" => Some(Provenance::LocallyModified),
            "local_only" => Some(Provenance::LocalOnly),
            _ => None,
        }
    }

    /// Maps the legacy `synced` / `_local` flag pair onto a single state.
    pub fn from_flags(synced: bool, local: bool) -> Self {
        match (synced, local) {
            (false, _) => Provenance::LocalOnly,
            (true, false) => Provenance::Authoritative,
            (true, true) => Provenance::LocallyModified,
        }
    }

    /// State after a local edit.
    pub fn after_local_edit(self) -> Self {
        match self {
            Provenance::Authoritative | Provenance::LocallyModified => Provenance::LocallyModified,
            Provenance::LocalOnly => Provenance::LocalOnly,
        }
    }

    pub fn synced(self) -> bool {
        matches!(self, Provenance::Authoritative)
    }

    pub fn is_local(self) -> bool {
        !self.synced()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub department: Department,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub workload: i64,
    #[serde(default)]
    pub solved_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_true() -> bool {
    true
}

/// A support ticket. On the wire the subject and body travel under both their
/// current names (`problem`, `description`) and their older ones (`subject`,
/// `body`); either pair is accepted and both are always written.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(from = "TicketWire", into = "TicketWire")]
pub struct Ticket {
    pub id: String,
    pub external_ref: Option<String>,
    pub customer_name: String,
    pub customer_email: String,
    pub problem: String,
    pub description: String,
    pub status: TicketStatus,
    pub priority: Priority,
    pub category: Category,
    pub tags: Vec<String>,
    pub assigned_user_id: Option<String>,
    pub assigned_department: Department,
    pub agent1_auto_answered: bool,
    pub agent1_answer: Option<String>,
    pub agent2_confidence: f32,
    pub sla_due_at: DateTime<Utc>,
    pub raw_payload: Payload,
    pub provenance: Provenance,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize)]
struct TicketWire {
    id: String,
    #[serde(default)]
    external_ref: Option<String>,
    #[serde(default)]
    customer_name: String,
    #[serde(default)]
    customer_email: String,
    #[serde(default)]
    problem: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    subject: Option<String>,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    status: TicketStatus,
    #[serde(default)]
    priority: Priority,
    #[serde(default)]
    category: Category,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    assigned_user_id: Option<String>,
    #[serde(default)]
    assigned_department: Department,
    #[serde(default)]
    agent1_auto_answered: bool,
    #[serde(default)]
    agent1_answer: Option<String>,
    #[serde(default)]
    agent2_confidence: f32,
    sla_due_at: DateTime<Utc>,
    #[serde(default)]
    raw_payload: Payload,
    #[serde(default)]
    provenance: Provenance,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<TicketWire> for Ticket {
    fn from(wire: TicketWire) -> Self {
        Self {
            id: wire.id,
            external_ref: wire.external_ref,
            customer_name: wire.customer_name,
            customer_email: wire.customer_email,
            problem: wire.problem.or(wire.subject).unwrap_or_default(),
            description: wire.description.or(wire.body).unwrap_or_default(),
            status: wire.status,
            priority: wire.priority,
            category: wire.category,
            tags: wire.tags,
            assigned_user_id: wire.assigned_user_id,
            assigned_department: wire.assigned_department,
            agent1_auto_answered: wire.agent1_auto_answered,
            agent1_answer: wire.agent1_answer,
            agent2_confidence: wire.agent2_confidence,
            sla_due_at: wire.sla_due_at,
            raw_payload: wire.raw_payload,
            provenance: wire.provenance,
            created_at: wire.created_at,
            updated_at: wire.updated_at,
        }
    }
}

impl From<Ticket> for TicketWire {
    fn from(ticket: Ticket) -> Self {
        Self {
            id: ticket.id,
            external_ref: ticket.external_ref,
            customer_name: ticket.customer_name,
            customer_email: ticket.customer_email,
            subject: Some(ticket.problem.clone()),
            body: Some(ticket.description.clone()),
            problem: Some(ticket.problem),
            description: Some(ticket.description),
            status: ticket.status,
            priority: ticket.priority,
            category: ticket.category,
            tags: ticket.tags,
            assigned_user_id: ticket.assigned_user_id,
            assigned_department: ticket.assigned_department,
            agent1_auto_answered: ticket.agent1_auto_answered,
            agent1_answer: ticket.agent1_answer,
            agent2_confidence: ticket.agent2_confidence,
            sla_due_at: ticket.sla_due_at,
            raw_payload: ticket.raw_payload,
            provenance: ticket.provenance,
            created_at: ticket.created_at,
            updated_at: ticket.updated_at,
        }
    }
}

impl Ticket {
    pub fn subject(&self) -> &str {
        &self.problem
    }

    pub fn body(&self) -> &str {
        &self.description
    }

    pub fn synced(&self) -> bool {
        self.provenance.synced()
    }

    pub fn is_local(&self) -> bool {
        self.provenance.is_local()
    }

    pub fn sla_remaining(&self, now: DateTime<Utc>) -> Duration {
        self.sla_due_at - now
    }

    pub fn sla_expired(&self, now: DateTime<Utc>) -> bool {
        self.sla_remaining(now) < Duration::zero()
    }

    /// Name shown in the "Solver" column.
    pub fn solver_name(&self, users: &[User]) -> String {
        if let Some(user_id) = &self.assigned_user_id {
            return users
                .iter()
                .find(|user| &user.id == user_id)
                .map(|user| user.name.clone())
                .unwrap_or_else(|| self.assigned_department.as_str().to_owned());
        }
        if self.status == TicketStatus::Listed {
            return Department::Chatbot.as_str().to_owned();
        }
        self.assigned_department.as_str().to_owned()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActorType {
    System,
    Agent1,
    Agent2,
    Human,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Created,
    AutoReplied,
    Assigned,
    PriorityChanged,
    StatusChanged,
    NoteAdded,
    Resolved,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketEvent {
    pub id: String,
    pub ticket_id: String,
    pub actor_type: ActorType,
    pub event_type: EventType,
    #[serde(default)]
    pub payload: Payload,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct TicketFilters {
    #[serde(default)]
    pub status: Option<TicketStatus>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub department: Option<Department>,
    #[serde(default)]
    pub q: Option<String>,
}

/// Partial ticket adjustment. `assigned_user_id: Some(None)` clears the assignee.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AdjustTicketRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TicketStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_explicit_null"
    )]
    pub assigned_user_id: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_department: Option<Department>,
}

impl AdjustTicketRequest {
    pub fn touches_assignee(&self) -> bool {
        self.assigned_user_id.is_some()
    }
}

fn deserialize_explicit_null<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngestEmailRequest {
    pub customer_name: String,
    pub customer_email: String,
    pub subject: String,
    pub body: String,
}

impl IngestEmailRequest {
    pub fn from_ticket(ticket: &Ticket) -> Self {
        Self {
            customer_name: ticket.customer_name.clone(),
            customer_email: ticket.customer_email.clone(),
            subject: ticket.subject().to_owned(),
            body: ticket.body().to_owned(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NoticeVariant {
    #[default]
    Default,
    Destructive,
}

/// Transient user-facing notification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub description: String,
    pub variant: NoticeVariant,
}

impl Notice {
    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            variant: NoticeVariant::Default,
        }
    }

    pub fn error(description: impl Into<String>) -> Self {
        Self {
            title: "Error".to_owned(),
            description: description.into(),
            variant: NoticeVariant::Destructive,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncReport {
    pub succeeded: usize,
    pub failed: usize,
    pub failures: Vec<SyncFailure>,
}

impl SyncReport {
    pub fn summary(&self) -> String {
        format!("{} succeeded, {} failed", self.succeeded, self.failed)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncFailure {
    pub ticket_id: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PeopleSummary {
    pub total_users: usize,
    pub total_resolved: i64,
    pub average_workload: i64,
}

impl PeopleSummary {
    pub fn from_users(users: &[User]) -> Self {
        let total_resolved = users.iter().map(|user| user.solved_count).sum();
        let total_workload: i64 = users.iter().map(|user| user.workload).sum();
        let average_workload = if users.is_empty() {
            0
        } else {
            (total_workload as f64 / users.len() as f64).round() as i64
        };

        Self {
            total_users: users.len(),
            total_resolved,
            average_workload,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalSnapshot {
    pub total: usize,
    pub unsynced: usize,
    pub tickets: Vec<Ticket>,
}
