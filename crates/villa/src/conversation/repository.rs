//! Conversation and message repository for database operations.

use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, instrument};

use crate::agent::AgentRepository;
use crate::db::{self, StoreError, StoreResult};

use super::models::{
    Conversation, ConversationWithMessages, CreateMessageRequest, Message, MessageWithAgents,
    UpdateDramaRequest,
};

const CONVERSATION_COLUMNS: &str =
    "id, relationship_id, last_message_at, drama_score, viral_potential, created_at";

const MESSAGE_COLUMNS: &str =
    "id, conversation_id, from_agent_id, to_agent_id, content, sentiment, created_at";

/// Repository for conversations and their messages.
#[derive(Debug, Clone)]
pub struct ConversationRepository {
    pool: SqlitePool,
}

impl ConversationRepository {
    /// Create a new conversation repository.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open a conversation under a relationship.
    #[instrument(skip(self))]
    pub async fn create(&self, relationship_id: &str) -> StoreResult<Conversation> {
        let id = db::generate_id("conv");
        let now = db::now();

        let exists: Option<(String,)> = sqlx::query_as("SELECT id FROM relationships WHERE id = ?")
            .bind(relationship_id)
            .fetch_optional(&self.pool)
            .await?;
        if exists.is_none() {
            return Err(StoreError::not_found("relationship", relationship_id));
        }

        sqlx::query(
            r#"
            INSERT INTO conversations (id, relationship_id, last_message_at, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(relationship_id)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        debug!("Created conversation {}", id);
        self.get(&id)
            .await?
            .ok_or_else(|| StoreError::not_found("conversation", &id))
    }

    /// Get a conversation by ID.
    #[instrument(skip(self))]
    pub async fn get(&self, id: &str) -> StoreResult<Option<Conversation>> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch(&mut conn, id).await
    }

    /// Get a conversation together with its messages, oldest first.
    #[instrument(skip(self))]
    pub async fn get_with_messages(&self, id: &str) -> StoreResult<Option<ConversationWithMessages>> {
        let mut conn = self.pool.acquire().await?;
        let Some(conversation) = Self::fetch(&mut conn, id).await? else {
            return Ok(None);
        };

        let sql = format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE conversation_id = ? \
             ORDER BY created_at ASC, rowid ASC"
        );
        let messages = sqlx::query_as::<_, Message>(&sql)
            .bind(id)
            .fetch_all(&mut *conn)
            .await?;

        Ok(Some(ConversationWithMessages {
            conversation,
            messages,
        }))
    }

    /// List conversations, optionally for one relationship, most recent activity first.
    #[instrument(skip(self))]
    pub async fn list(&self, relationship_id: Option<&str>) -> StoreResult<Vec<Conversation>> {
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {CONVERSATION_COLUMNS} FROM conversations"));
        if let Some(relationship_id) = relationship_id {
            builder.push(" WHERE relationship_id = ").push_bind(relationship_id);
        }
        builder.push(" ORDER BY last_message_at DESC, rowid DESC");

        let conversations = builder
            .build_query_as::<Conversation>()
            .fetch_all(&self.pool)
            .await?;
        Ok(conversations)
    }

    /// Update drama score and/or viral potential.
    #[instrument(skip(self, update))]
    pub async fn update_drama(&self, id: &str, update: UpdateDramaRequest) -> StoreResult<Conversation> {
        if update.drama_score.is_some() || update.viral_potential.is_some() {
            let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE conversations SET ");
            let mut assignments = builder.separated(", ");
            if let Some(drama_score) = update.drama_score {
                assignments.push("drama_score = ").push_bind_unseparated(drama_score);
            }
            if let Some(viral_potential) = update.viral_potential {
                assignments
                    .push("viral_potential = ")
                    .push_bind_unseparated(viral_potential);
            }
            builder.push(" WHERE id = ").push_bind(id);

            let result = builder.build().execute(&self.pool).await?;
            if result.rows_affected() == 0 {
                return Err(StoreError::not_found("conversation", id));
            }
        }

        self.get(id)
            .await?
            .ok_or_else(|| StoreError::not_found("conversation", id))
    }

    /// Post a message and bump the conversation's `last_message_at`.
    ///
    /// Both writes commit together.
    #[instrument(skip(self, request), fields(conversation_id = %request.conversation_id))]
    pub async fn post_message(&self, request: CreateMessageRequest) -> StoreResult<MessageWithAgents> {
        let id = db::generate_id("msg");
        let now = db::now();
        let mut tx = self.pool.begin().await?;

        let touched = sqlx::query("UPDATE conversations SET last_message_at = ? WHERE id = ?")
            .bind(now)
            .bind(&request.conversation_id)
            .execute(&mut *tx)
            .await?;
        if touched.rows_affected() == 0 {
            return Err(StoreError::not_found("conversation", &request.conversation_id));
        }

        sqlx::query(
            r#"
            INSERT INTO messages (id, conversation_id, from_agent_id, to_agent_id, content, sentiment, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&request.conversation_id)
        .bind(&request.from_agent_id)
        .bind(&request.to_agent_id)
        .bind(&request.content)
        .bind(&request.sentiment)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let message = Message {
            id,
            conversation_id: request.conversation_id,
            from_agent_id: request.from_agent_id,
            to_agent_id: request.to_agent_id,
            content: request.content,
            sentiment: request.sentiment,
            created_at: now,
        };
        let mut expanded = Self::expand_messages(&mut tx, vec![message]).await?;
        tx.commit().await?;

        expanded
            .pop()
            .ok_or_else(|| StoreError::not_found("message", "new"))
    }

    /// Most recent messages across all conversations.
    #[instrument(skip(self))]
    pub async fn recent_messages(&self, limit: i64) -> StoreResult<Vec<MessageWithAgents>> {
        let mut conn = self.pool.acquire().await?;
        let sql = format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages ORDER BY created_at DESC, rowid DESC LIMIT ?"
        );
        let messages = sqlx::query_as::<_, Message>(&sql)
            .bind(limit)
            .fetch_all(&mut *conn)
            .await?;

        Self::expand_messages(&mut conn, messages).await
    }

    async fn fetch(conn: &mut SqliteConnection, id: &str) -> StoreResult<Option<Conversation>> {
        let sql = format!("SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = ?");
        let conversation = sqlx::query_as::<_, Conversation>(&sql)
            .bind(id)
            .fetch_optional(conn)
            .await?;
        Ok(conversation)
    }

    /// Attach sender and recipient to each message.
    async fn expand_messages(
        conn: &mut SqliteConnection,
        messages: Vec<Message>,
    ) -> StoreResult<Vec<MessageWithAgents>> {
        let ids: Vec<&str> = messages
            .iter()
            .flat_map(|m| [m.from_agent_id.as_str(), m.to_agent_id.as_str()])
            .collect();
        let agents = AgentRepository::fetch_many(conn, &ids).await?;

        messages
            .into_iter()
            .map(|message| -> StoreResult<MessageWithAgents> {
                let from_agent = agents
                    .get(&message.from_agent_id)
                    .cloned()
                    .ok_or_else(|| StoreError::not_found("agent", &message.from_agent_id))?;
                let to_agent = agents
                    .get(&message.to_agent_id)
                    .cloned()
                    .ok_or_else(|| StoreError::not_found("agent", &message.to_agent_id))?;
                Ok(MessageWithAgents {
                    message,
                    from_agent,
                    to_agent,
                })
            })
            .collect()
    }
}
