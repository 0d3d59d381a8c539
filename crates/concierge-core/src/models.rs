//! Core data models used throughout Concierge.
//!
//! These types represent the structured knowledge document, the retrievable
//! chunks derived from it, and the retrieval results that flow through the
//! indexing and conversation pipeline.
//!
//! Keyed sections of [`KnowledgeBase`] deserialize into `BTreeMap` rather
//! than `HashMap`: chunk identity must be a pure function of the document,
//! so iteration order cannot depend on hash seeding.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The structured knowledge document a corpus is built from.
///
/// Every top-level section is optional — absent sections are simply
/// skipped during chunk building. A section that is present but
/// malformed fails chunk building with a
/// [`SchemaError`](crate::chunk::SchemaError).
#[derive(Debug, Clone, Deserialize)]
pub struct KnowledgeBase {
    pub company: Option<CompanySection>,
    pub services: Option<BTreeMap<String, ServiceSection>>,
    pub pricing: Option<BTreeMap<String, BTreeMap<String, serde_json::Value>>>,
    pub faq: Option<FaqSection>,
    pub team: Option<TeamSection>,
    pub contact: Option<BTreeMap<String, BTreeMap<String, serde_json::Value>>>,
}

/// Company overview: name, description, mission, and vision.
#[derive(Debug, Clone, Deserialize)]
pub struct CompanySection {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub mission: String,
    #[serde(default)]
    pub vision: String,
}

/// A single service offering.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceSection {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub details: Vec<String>,
    #[serde(default)]
    pub process: Vec<String>,
}

/// FAQ section: a list of question/answer entries.
#[derive(Debug, Clone, Deserialize)]
pub struct FaqSection {
    pub common_questions: Vec<FaqEntry>,
}

/// One FAQ question/answer pair.
#[derive(Debug, Clone, Deserialize)]
pub struct FaqEntry {
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub category: Option<String>,
}

/// Team section with leadership keyed by role.
#[derive(Debug, Clone, Deserialize)]
pub struct TeamSection {
    pub leadership: Option<BTreeMap<String, Leader>>,
}

/// A leadership team member.
#[derive(Debug, Clone, Deserialize)]
pub struct Leader {
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub background: Option<String>,
}

/// The knowledge-base section a chunk was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Company,
    Service,
    Pricing,
    Faq,
    Team,
    Contact,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Company => "company",
            Category::Service => "service",
            Category::Pricing => "pricing",
            Category::Faq => "faq",
            Category::Team => "team",
            Category::Contact => "contact",
        }
    }
}

impl std::str::FromStr for Category {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "company" => Ok(Category::Company),
            "service" => Ok(Category::Service),
            "pricing" => Ok(Category::Pricing),
            "faq" => Ok(Category::Faq),
            "team" => Ok(Category::Team),
            "contact" => Ok(Category::Contact),
            other => Err(anyhow::anyhow!("unknown chunk category: {}", other)),
        }
    }
}

/// A single retrievable unit of knowledge-base text.
///
/// `id` is derived from the source section and key, never generated, so
/// rebuilding from the same document yields identical ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub category: Category,
    pub content: String,
    pub metadata: BTreeMap<String, String>,
}

/// A ranked chunk returned from nearest-neighbor search.
///
/// `distance` is non-negative; lower means more similar. Produced per
/// query and never stored.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievalResult {
    pub chunk_id: String,
    pub content: String,
    pub metadata: BTreeMap<String, String>,
    pub distance: f64,
}

/// Coarse three-level estimate of retrieval adequacy for a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
        }
    }
}

/// Who produced a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::User => "User",
            ChatRole::Assistant => "Assistant",
        }
    }
}

/// One turn of a conversation session.
#[derive(Debug, Clone, Serialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
    pub timestamp: i64,
}
