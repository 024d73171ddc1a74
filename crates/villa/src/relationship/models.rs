//! Relationship data models.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::agent::Agent;

/// Default compatibility and health score for a new relationship.
pub const DEFAULT_RELATIONSHIP_SCORE: i64 = 50;

/// Lifecycle of a relationship: talking, then coupled, then ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RelationshipStatus {
    #[default]
    Talking,
    Coupled,
    Ended,
}

impl RelationshipStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipStatus::Talking => "talking",
            RelationshipStatus::Coupled => "coupled",
            RelationshipStatus::Ended => "ended",
        }
    }

    /// Whether the relationship is still live (shown in listings).
    pub fn is_active(&self) -> bool {
        matches!(self, RelationshipStatus::Talking | RelationshipStatus::Coupled)
    }
}

impl std::fmt::Display for RelationshipStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RelationshipStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "talking" => Ok(RelationshipStatus::Talking),
            "coupled" => Ok(RelationshipStatus::Coupled),
            "ended" => Ok(RelationshipStatus::Ended),
            _ => Err(format!("Invalid relationship status: {}", s)),
        }
    }
}

impl TryFrom<String> for RelationshipStatus {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Relationship entity from database.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    pub id: String,
    #[serde(rename = "agent1Id")]
    pub agent1_id: String,
    #[serde(rename = "agent2Id")]
    pub agent2_id: String,
    pub compatibility_score: i64,
    #[sqlx(try_from = "String")]
    pub status: RelationshipStatus,
    pub health_score: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

/// Relationship with both agents loaded.
#[derive(Debug, Clone, Serialize)]
pub struct RelationshipWithAgents {
    #[serde(flatten)]
    pub relationship: Relationship,
    pub agent1: Agent,
    pub agent2: Agent,
}

/// Request to create a relationship.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRelationshipRequest {
    #[serde(rename = "agent1Id")]
    pub agent1_id: String,
    #[serde(rename = "agent2Id")]
    pub agent2_id: String,
    pub compatibility_score: Option<i64>,
    pub status: Option<RelationshipStatus>,
}

/// Partial update body; only present fields are applied.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRelationshipRequest {
    pub status: Option<RelationshipStatus>,
    pub health_score: Option<i64>,
    /// RFC 3339 timestamp or plain `YYYY-MM-DD` date.
    pub ended_at: Option<String>,
}

/// Validated partial update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationshipUpdate {
    pub status: Option<RelationshipStatus>,
    pub health_score: Option<i64>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl TryFrom<UpdateRelationshipRequest> for RelationshipUpdate {
    type Error = String;

    fn try_from(request: UpdateRelationshipRequest) -> Result<Self, Self::Error> {
        let ended_at = request.ended_at.as_deref().map(parse_date).transpose()?;
        Ok(Self {
            status: request.status,
            health_score: request.health_score,
            ended_at,
        })
    }
}

impl RelationshipUpdate {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.health_score.is_none() && self.ended_at.is_none()
    }
}

/// Outcome of a create-or-fetch.
#[derive(Debug, Clone)]
pub enum CreateOutcome<T> {
    Created(T),
    Existing(T),
}

impl<T> CreateOutcome<T> {
    pub fn was_created(&self) -> bool {
        matches!(self, CreateOutcome::Created(_))
    }

    pub fn into_inner(self) -> T {
        match self {
            CreateOutcome::Created(value) | CreateOutcome::Existing(value) => value,
        }
    }
}

/// Parse a client-supplied date: RFC 3339, or a bare date taken as midnight UTC.
pub fn parse_date(input: &str) -> Result<DateTime<Utc>, String> {
    let input = input.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(input) {
        return Ok(ts.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d")
        && let Some(midnight) = date.and_hms_opt(0, 0, 0)
    {
        return Ok(midnight.and_utc());
    }
    Err(format!("Invalid date: {}", input))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_parse_date_rfc3339() {
        let ts = parse_date("2026-03-01T12:30:00+02:00").unwrap();
        assert_eq!(ts.hour(), 10);
        assert_eq!(ts.day(), 1);
    }

    #[test]
    fn test_parse_date_plain_date() {
        let ts = parse_date("2026-03-01").unwrap();
        assert_eq!(ts.to_rfc3339(), "2026-03-01T00:00:00+00:00");
    }

    #[test]
    fn test_parse_date_rejects_garbage() {
        assert!(parse_date("next tuesday").is_err());
    }

    #[test]
    fn test_update_from_request() {
        let update = RelationshipUpdate::try_from(UpdateRelationshipRequest {
            status: Some(RelationshipStatus::Ended),
            health_score: None,
            ended_at: Some("2026-05-01".to_string()),
        })
        .unwrap();
        assert_eq!(update.status, Some(RelationshipStatus::Ended));
        assert!(update.ended_at.is_some());
        assert!(!update.is_empty());
        assert!(RelationshipUpdate::default().is_empty());
    }

    #[test]
    fn test_active_statuses() {
        assert!(RelationshipStatus::Talking.is_active());
        assert!(RelationshipStatus::Coupled.is_active());
        assert!(!RelationshipStatus::Ended.is_active());
    }
}
