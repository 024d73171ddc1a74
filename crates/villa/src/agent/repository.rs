//! Agent repository for database operations.

use std::collections::HashMap;

use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, instrument};

use crate::db::{self, StoreError, StoreResult};

use super::models::{Agent, AgentStatus, AgentUpsert};

const AGENT_COLUMNS: &str = r#"
    id, name, gender, pronouns, dating_preference, bio, interests, deal_breakers,
    ideal_partner, openness, conscientiousness, extraversion, agreeableness, neuroticism,
    romanticism, jealousy, flirtatiousness, loyalty, spontaneity, attachment_style,
    love_language, status, current_partner_id, created_at, last_active
"#;

/// Repository for agent database operations.
#[derive(Debug, Clone)]
pub struct AgentRepository {
    pool: SqlitePool,
}

impl AgentRepository {
    /// Create a new agent repository.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// List all agents, newest first.
    #[instrument(skip(self))]
    pub async fn list(&self) -> StoreResult<Vec<Agent>> {
        let sql = format!("SELECT {AGENT_COLUMNS} FROM agents ORDER BY created_at DESC, rowid DESC");
        let agents = sqlx::query_as::<_, Agent>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(agents)
    }

    /// Get an agent by ID.
    #[instrument(skip(self))]
    pub async fn get(&self, id: &str) -> StoreResult<Option<Agent>> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch(&mut conn, id).await
    }

    /// Create or update an agent by id.
    ///
    /// The stored row is read and merged inside one transaction so fields
    /// the upsert leaves unset keep their stored values. The transaction
    /// takes the write lock up front: a deferred one that reads first cannot
    /// upgrade once another connection has committed.
    #[instrument(skip(self, upsert), fields(agent_id = %upsert.id))]
    pub async fn upsert(&self, upsert: AgentUpsert) -> StoreResult<Agent> {
        let now = db::now();
        let mut tx = self.pool.begin_with("BEGIN IMMEDIATE").await?;

        let base = match Self::fetch(&mut *tx, &upsert.id).await? {
            Some(existing) => existing,
            None => {
                debug!("Creating agent {}", upsert.id);
                Agent::blank(upsert.id.clone(), now)
            }
        };
        let agent = upsert.apply(base, now);
        Self::write(&mut *tx, &agent).await?;

        tx.commit().await?;
        Ok(agent)
    }

    /// Set status and partner, stamping `last_active`.
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        id: &str,
        status: AgentStatus,
        current_partner_id: Option<&str>,
    ) -> StoreResult<Agent> {
        let result = sqlx::query(
            r#"
            UPDATE agents
            SET status = ?, current_partner_id = ?, last_active = ?
            WHERE id = ?
            "#,
        )
        .bind(status.as_str())
        .bind(current_partner_id)
        .bind(db::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("agent", id));
        }

        self.get(id)
            .await?
            .ok_or_else(|| StoreError::not_found("agent", id))
    }

    /// Fetch one agent on an existing connection or transaction.
    pub(crate) async fn fetch(conn: &mut SqliteConnection, id: &str) -> StoreResult<Option<Agent>> {
        let sql = format!("SELECT {AGENT_COLUMNS} FROM agents WHERE id = ?");
        let agent = sqlx::query_as::<_, Agent>(&sql)
            .bind(id)
            .fetch_optional(conn)
            .await?;
        Ok(agent)
    }

    /// Fetch a set of agents keyed by id. Unknown ids are absent from the map.
    pub(crate) async fn fetch_many(
        conn: &mut SqliteConnection,
        ids: &[&str],
    ) -> StoreResult<HashMap<String, Agent>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {AGENT_COLUMNS} FROM agents WHERE id IN ("));
        let mut separated = builder.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");

        let agents = builder.build_query_as::<Agent>().fetch_all(conn).await?;
        Ok(agents.into_iter().map(|a| (a.id.clone(), a)).collect())
    }

    async fn write(conn: &mut SqliteConnection, agent: &Agent) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO agents (
                id, name, gender, pronouns, dating_preference, bio, interests, deal_breakers,
                ideal_partner, openness, conscientiousness, extraversion, agreeableness,
                neuroticism, romanticism, jealousy, flirtatiousness, loyalty, spontaneity,
                attachment_style, love_language, status, current_partner_id, created_at,
                last_active
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                gender = excluded.gender,
                pronouns = excluded.pronouns,
                dating_preference = excluded.dating_preference,
                bio = excluded.bio,
                interests = excluded.interests,
                deal_breakers = excluded.deal_breakers,
                ideal_partner = excluded.ideal_partner,
                openness = excluded.openness,
                conscientiousness = excluded.conscientiousness,
                extraversion = excluded.extraversion,
                agreeableness = excluded.agreeableness,
                neuroticism = excluded.neuroticism,
                romanticism = excluded.romanticism,
                jealousy = excluded.jealousy,
                flirtatiousness = excluded.flirtatiousness,
                loyalty = excluded.loyalty,
                spontaneity = excluded.spontaneity,
                attachment_style = excluded.attachment_style,
                love_language = excluded.love_language,
                status = excluded.status,
                current_partner_id = excluded.current_partner_id,
                last_active = excluded.last_active
            "#,
        )
        .bind(&agent.id)
        .bind(&agent.name)
        .bind(&agent.gender)
        .bind(&agent.pronouns)
        .bind(&agent.dating_preference)
        .bind(&agent.bio)
        .bind(&agent.interests)
        .bind(&agent.deal_breakers)
        .bind(&agent.ideal_partner)
        .bind(agent.openness)
        .bind(agent.conscientiousness)
        .bind(agent.extraversion)
        .bind(agent.agreeableness)
        .bind(agent.neuroticism)
        .bind(agent.romanticism)
        .bind(agent.jealousy)
        .bind(agent.flirtatiousness)
        .bind(agent.loyalty)
        .bind(agent.spontaneity)
        .bind(&agent.attachment_style)
        .bind(&agent.love_language)
        .bind(agent.status.as_str())
        .bind(&agent.current_partner_id)
        .bind(agent.created_at)
        .bind(agent.last_active)
        .execute(conn)
        .await?;
        Ok(())
    }
}
