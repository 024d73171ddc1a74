//! Event repository for database operations.

use std::collections::HashMap;

use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, instrument};

use crate::agent::Agent;
use crate::db::{self, StoreError, StoreResult};

use super::models::{
    CreateEventRequest, DEFAULT_EVENT_DRAMA, Event, EventWithAgents, HIGHLIGHT_DRAMA_THRESHOLD,
    HIGHLIGHT_LIMIT,
};

const EVENT_COLUMNS: &str = r#"
    id, event_type, relationship_id, description, drama_score, is_public, is_featured, created_at
"#;

/// Agent row joined with the event it is linked to.
#[derive(sqlx::FromRow)]
struct LinkedAgent {
    event_id: String,
    #[sqlx(flatten)]
    agent: Agent,
}

/// Repository for event database operations.
#[derive(Debug, Clone)]
pub struct EventRepository {
    pool: SqlitePool,
}

impl EventRepository {
    /// Create a new event repository.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Record an event and link its agents in one transaction.
    #[instrument(skip(self, request), fields(event_type = %request.event_type))]
    pub async fn create(&self, request: CreateEventRequest) -> StoreResult<EventWithAgents> {
        let event = Event {
            id: db::generate_id("evt"),
            event_type: request.event_type,
            relationship_id: request.relationship_id,
            description: request.description,
            drama_score: request.drama_score.unwrap_or(DEFAULT_EVENT_DRAMA),
            is_public: request.is_public.unwrap_or(true),
            is_featured: request.is_featured.unwrap_or(false),
            created_at: db::now(),
        };

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO events
                (id, event_type, relationship_id, description, drama_score, is_public, is_featured, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&event.id)
        .bind(&event.event_type)
        .bind(&event.relationship_id)
        .bind(&event.description)
        .bind(event.drama_score)
        .bind(event.is_public)
        .bind(event.is_featured)
        .bind(event.created_at)
        .execute(&mut *tx)
        .await?;

        for agent_id in &request.agent_ids {
            sqlx::query("INSERT OR IGNORE INTO event_agents (event_id, agent_id) VALUES (?, ?)")
                .bind(&event.id)
                .bind(agent_id)
                .execute(&mut *tx)
                .await?;
        }

        let mut expanded = Self::attach_agents(&mut tx, vec![event]).await?;
        tx.commit().await?;

        debug!("Created event with {} agents", request.agent_ids.len());
        expanded
            .pop()
            .ok_or_else(|| StoreError::not_found("event", "new"))
    }

    /// Most recent public events.
    #[instrument(skip(self))]
    pub async fn recent_public(&self, limit: i64) -> StoreResult<Vec<EventWithAgents>> {
        let mut conn = self.pool.acquire().await?;
        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE is_public = 1 \
             ORDER BY created_at DESC, rowid DESC LIMIT ?"
        );
        let events = sqlx::query_as::<_, Event>(&sql)
            .bind(limit)
            .fetch_all(&mut *conn)
            .await?;

        Self::attach_agents(&mut conn, events).await
    }

    /// Featured or high-drama events, most dramatic first.
    #[instrument(skip(self))]
    pub async fn highlights(&self) -> StoreResult<Vec<EventWithAgents>> {
        let mut conn = self.pool.acquire().await?;
        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE is_featured = 1 OR drama_score >= ? \
             ORDER BY drama_score DESC, created_at DESC LIMIT ?"
        );
        let events = sqlx::query_as::<_, Event>(&sql)
            .bind(HIGHLIGHT_DRAMA_THRESHOLD)
            .bind(HIGHLIGHT_LIMIT)
            .fetch_all(&mut *conn)
            .await?;

        Self::attach_agents(&mut conn, events).await
    }

    /// Load the linked agents of each event with one query.
    async fn attach_agents(
        conn: &mut SqliteConnection,
        events: Vec<Event>,
    ) -> StoreResult<Vec<EventWithAgents>> {
        if events.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            r#"
            SELECT ea.event_id,
                   a.id, a.name, a.gender, a.pronouns, a.dating_preference, a.bio, a.interests,
                   a.deal_breakers, a.ideal_partner, a.openness, a.conscientiousness,
                   a.extraversion, a.agreeableness, a.neuroticism, a.romanticism, a.jealousy,
                   a.flirtatiousness, a.loyalty, a.spontaneity, a.attachment_style,
                   a.love_language, a.status, a.current_partner_id, a.created_at, a.last_active
            FROM event_agents ea
            JOIN agents a ON a.id = ea.agent_id
            WHERE ea.event_id IN (
            "#,
        );
        let mut separated = builder.separated(", ");
        for event in &events {
            separated.push_bind(event.id.as_str());
        }
        separated.push_unseparated(") ORDER BY a.name");

        let rows = builder.build_query_as::<LinkedAgent>().fetch_all(conn).await?;

        let mut by_event: HashMap<String, Vec<Agent>> = HashMap::new();
        for row in rows {
            by_event.entry(row.event_id).or_default().push(row.agent);
        }

        Ok(events
            .into_iter()
            .map(|event| {
                let agents = by_event.remove(&event.id).unwrap_or_default();
                EventWithAgents { event, agents }
            })
            .collect())
    }
}
