//! Relationship repository for database operations.

use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, instrument};

use crate::agent::AgentRepository;
use crate::db::{self, StoreError, StoreResult, is_unique_violation};

use super::models::{
    CreateOutcome, CreateRelationshipRequest, DEFAULT_RELATIONSHIP_SCORE, Relationship,
    RelationshipStatus, RelationshipUpdate, RelationshipWithAgents,
};

const RELATIONSHIP_COLUMNS: &str = r#"
    id, agent1_id, agent2_id, compatibility_score, status, health_score,
    created_at, updated_at, ended_at
"#;

/// Repository for relationship database operations.
#[derive(Debug, Clone)]
pub struct RelationshipRepository {
    pool: SqlitePool,
}

impl RelationshipRepository {
    /// Create a new relationship repository.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a relationship, or return the one that already links the pair.
    ///
    /// The unique pair index decides; a violation is answered with the
    /// stored record in either agent order.
    #[instrument(skip(self, request), fields(agent1 = %request.agent1_id, agent2 = %request.agent2_id))]
    pub async fn create_or_fetch(
        &self,
        request: CreateRelationshipRequest,
    ) -> StoreResult<CreateOutcome<RelationshipWithAgents>> {
        let id = db::generate_id("rel");
        let now = db::now();

        let inserted = sqlx::query(
            r#"
            INSERT INTO relationships
                (id, agent1_id, agent2_id, compatibility_score, status, health_score, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&request.agent1_id)
        .bind(&request.agent2_id)
        .bind(
            request
                .compatibility_score
                .unwrap_or(DEFAULT_RELATIONSHIP_SCORE),
        )
        .bind(request.status.unwrap_or_default().as_str())
        .bind(DEFAULT_RELATIONSHIP_SCORE)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await;

        match inserted {
            Ok(_) => {
                debug!("Created relationship {}", id);
                let created = self
                    .get(&id)
                    .await?
                    .ok_or_else(|| StoreError::not_found("relationship", &id))?;
                Ok(CreateOutcome::Created(created))
            }
            Err(err) if is_unique_violation(&err) => {
                debug!("Relationship already exists for pair, returning it");
                let mut conn = self.pool.acquire().await?;
                let existing =
                    Self::fetch_pair(&mut conn, &request.agent1_id, &request.agent2_id)
                        .await?
                        .ok_or_else(|| {
                            StoreError::Duplicate(format!(
                                "relationship {}/{}",
                                request.agent1_id, request.agent2_id
                            ))
                        })?;
                let mut expanded = Self::expand(&mut conn, vec![existing]).await?;
                let existing = expanded
                    .pop()
                    .ok_or_else(|| StoreError::not_found("relationship", &request.agent1_id))?;
                Ok(CreateOutcome::Existing(existing))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Get a relationship with both agents.
    #[instrument(skip(self))]
    pub async fn get(&self, id: &str) -> StoreResult<Option<RelationshipWithAgents>> {
        let mut conn = self.pool.acquire().await?;
        let sql = format!("SELECT {RELATIONSHIP_COLUMNS} FROM relationships WHERE id = ?");
        let relationship = sqlx::query_as::<_, Relationship>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        match relationship {
            Some(relationship) => Ok(Self::expand(&mut conn, vec![relationship]).await?.pop()),
            None => Ok(None),
        }
    }

    /// Apply the fields present in `update` and stamp `updated_at`.
    #[instrument(skip(self, update))]
    pub async fn update(
        &self,
        id: &str,
        update: RelationshipUpdate,
    ) -> StoreResult<RelationshipWithAgents> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE relationships SET updated_at = ");
        builder.push_bind(db::now());
        if let Some(status) = update.status {
            builder.push(", status = ").push_bind(status.as_str());
        }
        if let Some(health_score) = update.health_score {
            builder.push(", health_score = ").push_bind(health_score);
        }
        if let Some(ended_at) = update.ended_at {
            builder.push(", ended_at = ").push_bind(ended_at);
        }
        builder.push(" WHERE id = ").push_bind(id);

        let result = builder.build().execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("relationship", id));
        }

        self.get(id)
            .await?
            .ok_or_else(|| StoreError::not_found("relationship", id))
    }

    /// Relationships that are talking or coupled, most recently updated first.
    #[instrument(skip(self))]
    pub async fn list_active(&self) -> StoreResult<Vec<RelationshipWithAgents>> {
        let mut conn = self.pool.acquire().await?;
        let sql = format!(
            "SELECT {RELATIONSHIP_COLUMNS} FROM relationships \
             WHERE status IN (?, ?) \
             ORDER BY updated_at DESC, rowid DESC"
        );
        let relationships = sqlx::query_as::<_, Relationship>(&sql)
            .bind(RelationshipStatus::Talking.as_str())
            .bind(RelationshipStatus::Coupled.as_str())
            .fetch_all(&mut *conn)
            .await?;

        Self::expand(&mut conn, relationships).await
    }

    /// Relationships of an agent, split by the side the agent is on.
    #[instrument(skip(self))]
    pub async fn list_for_agent(
        &self,
        agent_id: &str,
    ) -> StoreResult<(Vec<Relationship>, Vec<Relationship>)> {
        let sql = format!(
            "SELECT {RELATIONSHIP_COLUMNS} FROM relationships \
             WHERE agent1_id = ? OR agent2_id = ? \
             ORDER BY created_at DESC"
        );
        let relationships = sqlx::query_as::<_, Relationship>(&sql)
            .bind(agent_id)
            .bind(agent_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(relationships
            .into_iter()
            .partition(|r| r.agent1_id == agent_id))
    }

    /// Find the relationship between two agents in either order.
    pub(crate) async fn fetch_pair(
        conn: &mut SqliteConnection,
        agent_a: &str,
        agent_b: &str,
    ) -> StoreResult<Option<Relationship>> {
        let sql = format!(
            "SELECT {RELATIONSHIP_COLUMNS} FROM relationships \
             WHERE (agent1_id = ? AND agent2_id = ?) OR (agent1_id = ? AND agent2_id = ?)"
        );
        let relationship = sqlx::query_as::<_, Relationship>(&sql)
            .bind(agent_a)
            .bind(agent_b)
            .bind(agent_b)
            .bind(agent_a)
            .fetch_optional(conn)
            .await?;
        Ok(relationship)
    }

    /// Attach both agents to each relationship.
    async fn expand(
        conn: &mut SqliteConnection,
        relationships: Vec<Relationship>,
    ) -> StoreResult<Vec<RelationshipWithAgents>> {
        let ids: Vec<&str> = relationships
            .iter()
            .flat_map(|r| [r.agent1_id.as_str(), r.agent2_id.as_str()])
            .collect();
        let agents = AgentRepository::fetch_many(conn, &ids).await?;

        relationships
            .into_iter()
            .map(|relationship| -> StoreResult<RelationshipWithAgents> {
                let agent1 = agents
                    .get(&relationship.agent1_id)
                    .cloned()
                    .ok_or_else(|| StoreError::not_found("agent", &relationship.agent1_id))?;
                let agent2 = agents
                    .get(&relationship.agent2_id)
                    .cloned()
                    .ok_or_else(|| StoreError::not_found("agent", &relationship.agent2_id))?;
                Ok(RelationshipWithAgents {
                    relationship,
                    agent1,
                    agent2,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{AgentPayload, TraitPrecedence};
    use crate::db::Database;

    async fn seed(db: &Database, ids: &[&str]) {
        let agents = AgentRepository::new(db.pool().clone());
        for id in ids {
            let payload = AgentPayload {
                id: id.to_string(),
                ..Default::default()
            };
            agents
                .upsert(payload.resolve(TraitPrecedence::FlatFirst))
                .await
                .unwrap();
        }
    }

    fn request(a: &str, b: &str) -> CreateRelationshipRequest {
        CreateRelationshipRequest {
            agent1_id: a.to_string(),
            agent2_id: b.to_string(),
            compatibility_score: None,
            status: None,
        }
    }

    #[tokio::test]
    async fn test_create_or_fetch_is_idempotent_across_order() {
        let db = Database::in_memory().await.unwrap();
        seed(&db, &["x", "y"]).await;
        let repo = RelationshipRepository::new(db.pool().clone());

        let first = repo.create_or_fetch(request("x", "y")).await.unwrap();
        assert!(first.was_created());
        let first = first.into_inner();
        assert_eq!(first.relationship.compatibility_score, 50);
        assert_eq!(first.relationship.status, RelationshipStatus::Talking);

        let second = repo.create_or_fetch(request("y", "x")).await.unwrap();
        assert!(!second.was_created());
        assert_eq!(second.into_inner().relationship.id, first.relationship.id);
    }

    #[tokio::test]
    async fn test_update_applies_only_present_fields() {
        let db = Database::in_memory().await.unwrap();
        seed(&db, &["x", "y"]).await;
        let repo = RelationshipRepository::new(db.pool().clone());
        let created = repo
            .create_or_fetch(request("x", "y"))
            .await
            .unwrap()
            .into_inner();

        let updated = repo
            .update(
                &created.relationship.id,
                RelationshipUpdate {
                    health_score: Some(20),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.relationship.health_score, 20);
        assert_eq!(updated.relationship.status, RelationshipStatus::Talking);
        assert!(updated.relationship.ended_at.is_none());
        assert!(updated.relationship.updated_at >= created.relationship.updated_at);
    }

    #[tokio::test]
    async fn test_update_unknown_relationship() {
        let db = Database::in_memory().await.unwrap();
        let repo = RelationshipRepository::new(db.pool().clone());
        let err = repo
            .update("rel_missing", RelationshipUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_list_for_agent_splits_sides() {
        let db = Database::in_memory().await.unwrap();
        seed(&db, &["x", "y", "z"]).await;
        let repo = RelationshipRepository::new(db.pool().clone());
        repo.create_or_fetch(request("x", "y")).await.unwrap();
        repo.create_or_fetch(request("z", "x")).await.unwrap();

        let (as_agent1, as_agent2) = repo.list_for_agent("x").await.unwrap();
        assert_eq!(as_agent1.len(), 1);
        assert_eq!(as_agent1[0].agent2_id, "y");
        assert_eq!(as_agent2.len(), 1);
        assert_eq!(as_agent2[0].agent1_id, "z");
    }
}
