use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Github,
    Jira,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Github => "github",
            Self::Jira => "jira",
        }
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "github" => Ok(Self::Github),
            "jira" => Ok(Self::Jira),
            _ => Err(format!("unknown provider: {value}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ActorKind {
    Human,
    Bot,
}

impl ActorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Human => "human",
            Self::Bot => "bot",
        }
    }
}

impl FromStr for ActorKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "human" => Ok(Self::Human),
            "bot" => Ok(Self::Bot),
            _ => Err(format!("unknown actor kind: {value}")),
        }
    }
}

/// A provider-side account (GitHub user or Jira account) with exactly one
/// local record per (provider, external id).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalActor {
    pub id: Uuid,
    pub provider: Provider,
    pub external_id: String,
    pub login: String,
    pub display_name: Option<String>,
    pub kind: ActorKind,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewActor {
    pub provider: Provider,
    pub external_id: String,
    pub login: String,
    pub display_name: Option<String>,
    pub kind: ActorKind,
}
