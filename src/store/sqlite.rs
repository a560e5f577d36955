use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    Row, SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
};

use crate::types::{
    Category, Department, Payload, Priority, Provenance, Ticket, TicketStatus, User,
};

use super::{RecordStore, TicketLookup};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY NOT NULL,
    name TEXT NOT NULL,
    email TEXT NOT NULL,
    department TEXT NOT NULL,
    skills_json TEXT NOT NULL,
    active INTEGER NOT NULL,
    workload INTEGER NOT NULL,
    solved_count INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS users_name_idx ON users (name);
CREATE INDEX IF NOT EXISTS users_email_idx ON users (email);
CREATE INDEX IF NOT EXISTS users_department_idx ON users (department);
CREATE INDEX IF NOT EXISTS users_created_at_idx ON users (created_at);
CREATE INDEX IF NOT EXISTS users_updated_at_idx ON users (updated_at);

CREATE TABLE IF NOT EXISTS tickets (
    id TEXT PRIMARY KEY NOT NULL,
    external_ref TEXT,
    customer_name TEXT NOT NULL,
    customer_email TEXT NOT NULL,
    subject TEXT NOT NULL,
    body TEXT NOT NULL,
    status TEXT NOT NULL,
    priority TEXT NOT NULL,
    category TEXT NOT NULL,
    tags_json TEXT NOT NULL,
    assigned_user_id TEXT,
    assigned_department TEXT NOT NULL,
    agent1_auto_answered INTEGER NOT NULL,
    agent1_answer TEXT,
    agent2_confidence REAL NOT NULL,
    sla_due_at TEXT NOT NULL,
    raw_payload_json TEXT NOT NULL,
    provenance TEXT NOT NULL,
    synced INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS tickets_external_ref_idx ON tickets (external_ref);
CREATE INDEX IF NOT EXISTS tickets_customer_email_idx ON tickets (customer_email);
CREATE INDEX IF NOT EXISTS tickets_customer_name_idx ON tickets (customer_name);
CREATE INDEX IF NOT EXISTS tickets_created_at_idx ON tickets (created_at);
CREATE INDEX IF NOT EXISTS tickets_synced_idx ON tickets (synced);
CREATE INDEX IF NOT EXISTS tickets_subject_idx ON tickets (subject);
CREATE INDEX IF NOT EXISTS tickets_body_idx ON tickets (body);

PRAGMA user_version = 1;
";

const TICKET_COLUMNS: &str = "id, external_ref, customer_name, customer_email, subject, body, status, priority, category, tags_json, assigned_user_id, assigned_department, agent1_auto_answered, agent1_answer, agent2_confidence, sla_due_at, raw_payload_json, provenance, created_at, updated_at";

const USER_COLUMNS: &str =
    "id, name, email, department, skills_json, active, workload, solved_count, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct SqliteRecordStore {
    pool: SqlitePool,
}

impl SqliteRecordStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;
        Self::bootstrap(pool).await
    }

    /// Private database that lives as long as the store.
    pub async fn in_memory() -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        Self::bootstrap(pool).await
    }

    async fn bootstrap(pool: SqlitePool) -> anyhow::Result<Self> {
        sqlx::raw_sql(SCHEMA).execute(&pool).await?;
        Ok(Self { pool })
    }

    pub async fn schema_version(&self) -> anyhow::Result<i64> {
        let (version,) = sqlx::query_as::<_, (i64,)>("PRAGMA user_version")
            .fetch_one(&self.pool)
            .await?;
        Ok(version)
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn get_user(&self, id: &str) -> anyhow::Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn list_users(&self) -> anyhow::Result<Vec<User>> {
        sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at ASC, id ASC"
        ))
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(user_from_row)
        .collect()
    }

    async fn put_user(&self, user: User) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO users (id, name, email, department, skills_json, active, workload, solved_count, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT (id)
             DO UPDATE SET name = excluded.name, email = excluded.email, department = excluded.department,
                 skills_json = excluded.skills_json, active = excluded.active, workload = excluded.workload,
                 solved_count = excluded.solved_count, created_at = excluded.created_at, updated_at = excluded.updated_at",
        )
        .bind(user.id)
        .bind(user.name)
        .bind(user.email)
        .bind(user.department.as_str())
        .bind(serde_json::to_string(&user.skills)?)
        .bind(user.active)
        .bind(user.workload)
        .bind(user.solved_count)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete_user(&self, id: &str) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn clear_users(&self) -> anyhow::Result<u64> {
        let result = sqlx::query("DELETE FROM users").execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn get_ticket(&self, id: &str) -> anyhow::Result<Option<Ticket>> {
        let row = sqlx::query(&format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(ticket_from_row).transpose()
    }

    async fn list_tickets(&self) -> anyhow::Result<Vec<Ticket>> {
        sqlx::query(&format!(
            "SELECT {TICKET_COLUMNS} FROM tickets ORDER BY created_at ASC, id ASC"
        ))
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(ticket_from_row)
        .collect()
    }

    async fn put_ticket(&self, ticket: Ticket) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO tickets (id, external_ref, customer_name, customer_email, subject, body, status, priority,
                 category, tags_json, assigned_user_id, assigned_department, agent1_auto_answered, agent1_answer,
                 agent2_confidence, sla_due_at, raw_payload_json, provenance, synced, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21)
             ON CONFLICT (id)
             DO UPDATE SET external_ref = excluded.external_ref, customer_name = excluded.customer_name,
                 customer_email = excluded.customer_email, subject = excluded.subject, body = excluded.body,
                 status = excluded.status, priority = excluded.priority, category = excluded.category,
                 tags_json = excluded.tags_json, assigned_user_id = excluded.assigned_user_id,
                 assigned_department = excluded.assigned_department,
                 agent1_auto_answered = excluded.agent1_auto_answered, agent1_answer = excluded.agent1_answer,
                 agent2_confidence = excluded.agent2_confidence, sla_due_at = excluded.sla_due_at,
                 raw_payload_json = excluded.raw_payload_json, provenance = excluded.provenance,
                 synced = excluded.synced, created_at = excluded.created_at, updated_at = excluded.updated_at",
        )
        .bind(&ticket.id)
        .bind(&ticket.external_ref)
        .bind(&ticket.customer_name)
        .bind(&ticket.customer_email)
        .bind(ticket.subject())
        .bind(ticket.body())
        .bind(ticket.status.as_str())
        .bind(ticket.priority.as_str())
        .bind(ticket.category.as_str())
        .bind(serde_json::to_string(&ticket.tags)?)
        .bind(&ticket.assigned_user_id)
        .bind(ticket.assigned_department.as_str())
        .bind(ticket.agent1_auto_answered)
        .bind(&ticket.agent1_answer)
        .bind(ticket.agent2_confidence)
        .bind(ticket.sla_due_at)
        .bind(serde_json::to_string(&ticket.raw_payload)?)
        .bind(ticket.provenance.as_str())
        .bind(ticket.synced())
        .bind(ticket.created_at)
        .bind(ticket.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete_ticket(&self, id: &str) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM tickets WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_tickets(&self, lookup: &TicketLookup) -> anyhow::Result<Vec<Ticket>> {
        let (clause, value) = lookup_clause(lookup);
        let sql = format!(
            "SELECT {TICKET_COLUMNS} FROM tickets WHERE {clause} ORDER BY created_at ASC, id ASC"
        );
        let mut query = sqlx::query(&sql);
        if let Some(value) = value {
            query = query.bind(value);
        }
        query
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(ticket_from_row)
            .collect()
    }

    async fn delete_tickets(&self, lookup: &TicketLookup) -> anyhow::Result<u64> {
        let (clause, value) = lookup_clause(lookup);
        let sql = format!("DELETE FROM tickets WHERE {clause}");
        let mut query = sqlx::query(&sql);
        if let Some(value) = value {
            query = query.bind(value);
        }
        let result = query.execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}

fn lookup_clause(lookup: &TicketLookup) -> (&'static str, Option<&str>) {
    match lookup {
        TicketLookup::CustomerName(name) => ("customer_name = ?1", Some(name.as_str())),
        TicketLookup::CustomerEmail(email) => ("customer_email = ?1", Some(email.as_str())),
        TicketLookup::ExternalRef(reference) => ("external_ref = ?1", Some(reference.as_str())),
        TicketLookup::Subject(subject) => ("subject = ?1", Some(subject.as_str())),
        TicketLookup::Body(body) => ("body = ?1", Some(body.as_str())),
        TicketLookup::Unsynced => ("synced = 0", None),
    }
}

fn user_from_row(row: &SqliteRow) -> anyhow::Result<User> {
    let department: String = row.try_get("department")?;
    let skills_json: String = row.try_get("skills_json")?;

    Ok(User {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        department: parse_column(&department, Department::parse, "department")?,
        skills: serde_json::from_str(&skills_json)?,
        active: row.try_get("active")?,
        workload: row.try_get("workload")?,
        solved_count: row.try_get("solved_count")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
    })
}

fn ticket_from_row(row: &SqliteRow) -> anyhow::Result<Ticket> {
    let status: String = row.try_get("status")?;
    let priority: String = row.try_get("priority")?;
    let category: String = row.try_get("category")?;
    let assigned_department: String = row.try_get("assigned_department")?;
    let provenance: String = row.try_get("provenance")?;
    let tags_json: String = row.try_get("tags_json")?;
    let raw_payload_json: String = row.try_get("raw_payload_json")?;

    Ok(Ticket {
        id: row.try_get("id")?,
        external_ref: row.try_get("external_ref")?,
        customer_name: row.try_get("customer_name")?,
        customer_email: row.try_get("customer_email")?,
        problem: row.try_get("subject")?,
        description: row.try_get("body")?,
        status: parse_column(&status, TicketStatus::parse, "status")?,
        priority: parse_column(&priority, Priority::parse, "priority")?,
        category: parse_column(&category, Category::parse, "category")?,
        tags: serde_json::from_str(&tags_json)?,
        assigned_user_id: row.try_get("assigned_user_id")?,
        assigned_department: parse_column(
            &assigned_department,
            Department::parse,
            "assigned_department",
        )?,
        agent1_auto_answered: row.try_get("agent1_auto_answered")?,
        agent1_answer: row.try_get("agent1_answer")?,
        agent2_confidence: row.try_get("agent2_confidence")?,
        sla_due_at: row.try_get::<DateTime<Utc>, _>("sla_due_at")?,
        raw_payload: serde_json::from_str::<Payload>(&raw_payload_json)?,
        provenance: parse_column(&provenance, Provenance::parse, "provenance")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
    })
}

fn parse_column<T>(raw: &str, parse: fn(&str) -> Option<T>, column: &str) -> anyhow::Result<T> {
    parse(raw).ok_or_else(|| anyhow::anyhow!("unknown {column} value `{raw}`"))
}
