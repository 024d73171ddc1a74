//! Agent data models and upsert payload resolution.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;

use crate::relationship::Relationship;

/// Default score for personality and romance traits.
pub const DEFAULT_TRAIT_SCORE: i64 = 50;

/// Where an agent currently stands in the villa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    #[default]
    Single,
    Talking,
    Coupled,
    Dumped,
}

impl AgentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentStatus::Single => "single",
            AgentStatus::Talking => "talking",
            AgentStatus::Coupled => "coupled",
            AgentStatus::Dumped => "dumped",
        }
    }
}

impl std::fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AgentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "single" => Ok(AgentStatus::Single),
            "talking" => Ok(AgentStatus::Talking),
            "coupled" => Ok(AgentStatus::Coupled),
            "dumped" => Ok(AgentStatus::Dumped),
            _ => Err(format!("Invalid agent status: {}", s)),
        }
    }
}

impl TryFrom<String> for AgentStatus {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Agent entity from database.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    /// Externally supplied identifier.
    pub id: String,
    pub name: String,
    pub gender: Option<String>,
    pub pronouns: Option<String>,
    pub dating_preference: Option<String>,
    pub bio: Option<String>,
    pub interests: Json<Vec<String>>,
    pub deal_breakers: Json<Vec<String>>,
    pub ideal_partner: Option<String>,
    pub openness: i64,
    pub conscientiousness: i64,
    pub extraversion: i64,
    pub agreeableness: i64,
    pub neuroticism: i64,
    pub romanticism: i64,
    pub jealousy: i64,
    pub flirtatiousness: i64,
    pub loyalty: i64,
    pub spontaneity: i64,
    pub attachment_style: Option<String>,
    pub love_language: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: AgentStatus,
    pub current_partner_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
}

impl Agent {
    /// A freshly created agent with default scores and nothing else set.
    pub fn blank(id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            gender: None,
            pronouns: None,
            dating_preference: None,
            bio: None,
            interests: Json(Vec::new()),
            deal_breakers: Json(Vec::new()),
            ideal_partner: None,
            openness: DEFAULT_TRAIT_SCORE,
            conscientiousness: DEFAULT_TRAIT_SCORE,
            extraversion: DEFAULT_TRAIT_SCORE,
            agreeableness: DEFAULT_TRAIT_SCORE,
            neuroticism: DEFAULT_TRAIT_SCORE,
            romanticism: DEFAULT_TRAIT_SCORE,
            jealousy: DEFAULT_TRAIT_SCORE,
            flirtatiousness: DEFAULT_TRAIT_SCORE,
            loyalty: DEFAULT_TRAIT_SCORE,
            spontaneity: DEFAULT_TRAIT_SCORE,
            attachment_style: None,
            love_language: None,
            status: AgentStatus::Single,
            current_partner_id: None,
            created_at: now,
            last_active: now,
        }
    }
}

/// Big five personality scores, each optional.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BigFive {
    pub openness: Option<i64>,
    pub conscientiousness: Option<i64>,
    pub extraversion: Option<i64>,
    pub agreeableness: Option<i64>,
    pub neuroticism: Option<i64>,
}

impl BigFive {
    /// Field-wise `self`, falling back to `other`.
    fn or(self, other: BigFive) -> BigFive {
        BigFive {
            openness: self.openness.or(other.openness),
            conscientiousness: self.conscientiousness.or(other.conscientiousness),
            extraversion: self.extraversion.or(other.extraversion),
            agreeableness: self.agreeableness.or(other.agreeableness),
            neuroticism: self.neuroticism.or(other.neuroticism),
        }
    }
}

/// Romance style scores, each optional.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RomanceStyle {
    pub romanticism: Option<i64>,
    pub jealousy: Option<i64>,
    pub flirtatiousness: Option<i64>,
    pub loyalty: Option<i64>,
    pub spontaneity: Option<i64>,
}

impl RomanceStyle {
    fn or(self, other: RomanceStyle) -> RomanceStyle {
        RomanceStyle {
            romanticism: self.romanticism.or(other.romanticism),
            jealousy: self.jealousy.or(other.jealousy),
            flirtatiousness: self.flirtatiousness.or(other.flirtatiousness),
            loyalty: self.loyalty.or(other.loyalty),
            spontaneity: self.spontaneity.or(other.spontaneity),
        }
    }
}

/// Which source wins when a trait is given both flat and inside its group.
///
/// `POST /agents` prefers the flat field, `POST /agents/bulk` prefers the
/// nested group. Both behaviours are served as clients rely on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraitPrecedence {
    FlatFirst,
    NestedFirst,
}

/// Raw agent upsert body.
///
/// Trait scores may arrive flat (`openness`) or grouped
/// (`bigFive.openness`, `romanceStyle.jealousy`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentPayload {
    pub id: String,
    pub name: Option<String>,
    pub gender: Option<String>,
    pub pronouns: Option<String>,
    pub dating_preference: Option<String>,
    pub bio: Option<String>,
    pub interests: Option<Vec<String>>,
    pub deal_breakers: Option<Vec<String>>,
    pub ideal_partner: Option<String>,

    pub openness: Option<i64>,
    pub conscientiousness: Option<i64>,
    pub extraversion: Option<i64>,
    pub agreeableness: Option<i64>,
    pub neuroticism: Option<i64>,
    pub big_five: Option<BigFive>,

    pub romanticism: Option<i64>,
    pub jealousy: Option<i64>,
    pub flirtatiousness: Option<i64>,
    pub loyalty: Option<i64>,
    pub spontaneity: Option<i64>,
    pub romance_style: Option<RomanceStyle>,

    pub attachment_style: Option<String>,
    pub love_language: Option<String>,
    pub status: Option<AgentStatus>,
    pub current_partner_id: Option<String>,
}

impl AgentPayload {
    /// Merge flat and grouped trait values into a single upsert.
    pub fn resolve(self, precedence: TraitPrecedence) -> AgentUpsert {
        let flat_big_five = BigFive {
            openness: self.openness,
            conscientiousness: self.conscientiousness,
            extraversion: self.extraversion,
            agreeableness: self.agreeableness,
            neuroticism: self.neuroticism,
        };
        let flat_romance = RomanceStyle {
            romanticism: self.romanticism,
            jealousy: self.jealousy,
            flirtatiousness: self.flirtatiousness,
            loyalty: self.loyalty,
            spontaneity: self.spontaneity,
        };
        let nested_big_five = self.big_five.unwrap_or_default();
        let nested_romance = self.romance_style.unwrap_or_default();

        let (big_five, romance_style) = match precedence {
            TraitPrecedence::FlatFirst => (
                flat_big_five.or(nested_big_five),
                flat_romance.or(nested_romance),
            ),
            TraitPrecedence::NestedFirst => (
                nested_big_five.or(flat_big_five),
                nested_romance.or(flat_romance),
            ),
        };

        AgentUpsert {
            id: self.id,
            name: self.name.unwrap_or_default(),
            status: self.status.unwrap_or_default(),
            gender: self.gender,
            pronouns: self.pronouns,
            dating_preference: self.dating_preference,
            bio: self.bio,
            interests: self.interests,
            deal_breakers: self.deal_breakers,
            ideal_partner: self.ideal_partner,
            big_five,
            romance_style,
            attachment_style: self.attachment_style,
            love_language: self.love_language,
            current_partner_id: self.current_partner_id,
        }
    }
}

/// A resolved agent upsert.
///
/// `name` and `status` are always written. Every `None` keeps the stored
/// value, or the default for a new agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentUpsert {
    pub id: String,
    pub name: String,
    pub status: AgentStatus,
    pub gender: Option<String>,
    pub pronouns: Option<String>,
    pub dating_preference: Option<String>,
    pub bio: Option<String>,
    pub interests: Option<Vec<String>>,
    pub deal_breakers: Option<Vec<String>>,
    pub ideal_partner: Option<String>,
    pub big_five: BigFive,
    pub romance_style: RomanceStyle,
    pub attachment_style: Option<String>,
    pub love_language: Option<String>,
    pub current_partner_id: Option<String>,
}

impl AgentUpsert {
    /// Apply this upsert on top of `base` (the stored agent or a blank one).
    pub fn apply(self, mut base: Agent, now: DateTime<Utc>) -> Agent {
        base.name = self.name;
        base.status = self.status;
        base.gender = self.gender.or(base.gender);
        base.pronouns = self.pronouns.or(base.pronouns);
        base.dating_preference = self.dating_preference.or(base.dating_preference);
        base.bio = self.bio.or(base.bio);
        if let Some(interests) = self.interests {
            base.interests = Json(interests);
        }
        if let Some(deal_breakers) = self.deal_breakers {
            base.deal_breakers = Json(deal_breakers);
        }
        base.ideal_partner = self.ideal_partner.or(base.ideal_partner);

        let b = self.big_five;
        base.openness = b.openness.unwrap_or(base.openness);
        base.conscientiousness = b.conscientiousness.unwrap_or(base.conscientiousness);
        base.extraversion = b.extraversion.unwrap_or(base.extraversion);
        base.agreeableness = b.agreeableness.unwrap_or(base.agreeableness);
        base.neuroticism = b.neuroticism.unwrap_or(base.neuroticism);

        let r = self.romance_style;
        base.romanticism = r.romanticism.unwrap_or(base.romanticism);
        base.jealousy = r.jealousy.unwrap_or(base.jealousy);
        base.flirtatiousness = r.flirtatiousness.unwrap_or(base.flirtatiousness);
        base.loyalty = r.loyalty.unwrap_or(base.loyalty);
        base.spontaneity = r.spontaneity.unwrap_or(base.spontaneity);

        base.attachment_style = self.attachment_style.or(base.attachment_style);
        base.love_language = self.love_language.or(base.love_language);
        base.current_partner_id = self.current_partner_id.or(base.current_partner_id);
        base.last_active = now;
        base
    }
}

/// Request to change an agent's status.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAgentStatusRequest {
    pub status: AgentStatus,
    pub current_partner_id: Option<String>,
}

/// Response of the bulk upsert.
#[derive(Debug, Clone, Serialize)]
pub struct BulkUpsertResponse {
    pub count: usize,
    pub agents: Vec<Agent>,
}

/// Agent with its relationships, split by the side it is on.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentWithRelationships {
    #[serde(flatten)]
    pub agent: Agent,
    pub relationships_as_agent1: Vec<Relationship>,
    pub relationships_as_agent2: Vec<Relationship>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(value: serde_json::Value) -> AgentPayload {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_flat_first_prefers_flat_value() {
        let p = payload(serde_json::json!({
            "id": "a1",
            "openness": 80,
            "bigFive": { "openness": 20, "neuroticism": 35 },
        }));
        let upsert = p.resolve(TraitPrecedence::FlatFirst);
        assert_eq!(upsert.big_five.openness, Some(80));
        assert_eq!(upsert.big_five.neuroticism, Some(35));
        assert_eq!(upsert.big_five.extraversion, None);
    }

    #[test]
    fn test_nested_first_prefers_group_value() {
        let p = payload(serde_json::json!({
            "id": "a1",
            "jealousy": 90,
            "loyalty": 70,
            "romanceStyle": { "jealousy": 10 },
        }));
        let upsert = p.resolve(TraitPrecedence::NestedFirst);
        assert_eq!(upsert.romance_style.jealousy, Some(10));
        assert_eq!(upsert.romance_style.loyalty, Some(70));
    }

    #[test]
    fn test_defaults_for_name_and_status() {
        let upsert = payload(serde_json::json!({ "id": "a1" })).resolve(TraitPrecedence::FlatFirst);
        assert_eq!(upsert.name, "");
        assert_eq!(upsert.status, AgentStatus::Single);
    }

    #[test]
    fn test_apply_keeps_unspecified_fields() {
        let now = crate::db::now();
        let mut stored = Agent::blank("a1", now);
        stored.bio = Some("Loves sunsets".to_string());
        stored.openness = 77;
        stored.interests = Json(vec!["gym".to_string()]);

        let upsert = payload(serde_json::json!({
            "id": "a1",
            "name": "Jess",
            "agreeableness": 12,
        }))
        .resolve(TraitPrecedence::FlatFirst);
        let merged = upsert.apply(stored, now);

        assert_eq!(merged.name, "Jess");
        assert_eq!(merged.bio.as_deref(), Some("Loves sunsets"));
        assert_eq!(merged.openness, 77);
        assert_eq!(merged.agreeableness, 12);
        assert_eq!(merged.interests.0, vec!["gym".to_string()]);
    }

    #[test]
    fn test_apply_on_blank_uses_defaults() {
        let now = crate::db::now();
        let merged = payload(serde_json::json!({ "id": "a2", "status": "coupled" }))
            .resolve(TraitPrecedence::NestedFirst)
            .apply(Agent::blank("a2", now), now);
        assert_eq!(merged.status, AgentStatus::Coupled);
        assert_eq!(merged.spontaneity, DEFAULT_TRAIT_SCORE);
        assert!(merged.interests.0.is_empty());
    }

    #[test]
    fn test_status_parse() {
        assert_eq!("Coupled".parse::<AgentStatus>().unwrap(), AgentStatus::Coupled);
        assert!("married".parse::<AgentStatus>().is_err());
    }
}
