//! Knowledge-base chunk builder.
//!
//! Converts a structured [`KnowledgeBase`] document into a flat set of
//! retrievable [`Chunk`]s with stable identifiers. The decomposition is
//! fixed: one chunk for the company overview, one per service description,
//! one per service process, one per pricing category, one per FAQ entry,
//! one per leadership member, and a single aggregated contact chunk.
//!
//! Smaller chunks retrieve more precisely; larger chunks answer more
//! completely. This granularity follows the corpus's natural structure
//! and sits between the two.
//!
//! # Guarantees
//!
//! - Pure function of the input document: no clocks, no randomness, no
//!   hash-order dependence (keyed sections are `BTreeMap`s).
//! - Chunk ids derive from the source section and key
//!   (`service_rpo_main`, `faq_3`, ...), so rebuilding from the same
//!   document yields identical ids.
//! - Absent top-level sections are skipped; malformed present sections
//!   fail with [`SchemaError`].

use std::collections::BTreeMap;

use thiserror::Error;

use crate::models::{Category, Chunk, KnowledgeBase};

/// A present-but-malformed knowledge-base section.
///
/// Fatal at build time: indexing must not proceed from a corpus that
/// would produce empty or misleading chunks.
#[derive(Debug, Error)]
#[error("malformed knowledge section '{section}': {reason}")]
pub struct SchemaError {
    pub section: String,
    pub reason: String,
}

impl SchemaError {
    fn new(section: &str, reason: impl Into<String>) -> Self {
        Self {
            section: section.to_string(),
            reason: reason.into(),
        }
    }
}

/// Build the full chunk set for a knowledge document.
///
/// Deterministic: calling this twice on the same document produces the
/// same chunks in the same order.
pub fn build_chunks(kb: &KnowledgeBase) -> Result<Vec<Chunk>, SchemaError> {
    let mut chunks = Vec::new();

    if let Some(company) = &kb.company {
        if company.name.trim().is_empty() || company.description.trim().is_empty() {
            return Err(SchemaError::new(
                "company",
                "name and description must be non-empty",
            ));
        }
        let mut content = format!("Company: {}. {}.", company.name, company.description);
        if !company.mission.trim().is_empty() {
            content.push_str(&format!(" Mission: {}.", company.mission));
        }
        if !company.vision.trim().is_empty() {
            content.push_str(&format!(" Vision: {}.", company.vision));
        }
        chunks.push(make_chunk(
            "company_overview",
            Category::Company,
            content,
            &[("type", "overview"), ("section", "company")],
        ));
    }

    if let Some(services) = &kb.services {
        for (key, service) in services {
            if service.name.trim().is_empty() || service.description.trim().is_empty() {
                return Err(SchemaError::new(
                    "services",
                    format!("service '{}' requires a name and description", key),
                ));
            }
            let mut content = format!("{}: {}.", service.name, service.description);
            if !service.details.is_empty() {
                content.push_str(&format!(" Details: {}", service.details.join(" ")));
            }
            chunks.push(make_chunk(
                &format!("service_{}_main", key),
                Category::Service,
                content,
                &[("type", "service"), ("service_name", key)],
            ));

            if !service.process.is_empty() {
                chunks.push(make_chunk(
                    &format!("service_{}_process", key),
                    Category::Service,
                    format!("{} process: {}", service.name, service.process.join(" -> ")),
                    &[("type", "process"), ("service_name", key)],
                ));
            }
        }
    }

    if let Some(pricing) = &kb.pricing {
        for (key, info) in pricing {
            let fields: Vec<String> = info
                .iter()
                .filter_map(|(k, v)| v.as_str().map(|s| format!("{}: {}", k, s)))
                .collect();
            if fields.is_empty() {
                return Err(SchemaError::new(
                    "pricing",
                    format!("pricing category '{}' has no text fields", key),
                ));
            }
            chunks.push(make_chunk(
                &format!("pricing_{}", key),
                Category::Pricing,
                format!("Pricing - {}: {}", key, fields.join(". ")),
                &[("type", "pricing"), ("pricing_type", key)],
            ));
        }
    }

    if let Some(faq) = &kb.faq {
        for (idx, qa) in faq.common_questions.iter().enumerate() {
            if qa.question.trim().is_empty() || qa.answer.trim().is_empty() {
                return Err(SchemaError::new(
                    "faq",
                    format!("entry {} requires a question and an answer", idx),
                ));
            }
            let category = qa.category.as_deref().unwrap_or("general");
            chunks.push(make_chunk(
                &format!("faq_{}", idx),
                Category::Faq,
                format!("Q: {} A: {}", qa.question, qa.answer),
                &[("type", "faq"), ("category", category)],
            ));
        }
    }

    if let Some(team) = &kb.team {
        if let Some(leadership) = &team.leadership {
            for (role, person) in leadership {
                if person.name.trim().is_empty() {
                    return Err(SchemaError::new(
                        "team",
                        format!("leadership role '{}' requires a name", role),
                    ));
                }
                let background = person.background.as_deref().unwrap_or("");
                let content = if person.title.trim().is_empty() {
                    format!("{}: {}", person.name, background)
                } else {
                    format!("{}, {}: {}", person.name, person.title, background)
                };
                chunks.push(make_chunk(
                    &format!("team_{}", role),
                    Category::Team,
                    content,
                    &[("type", "leadership")],
                ));
            }
        }
    }

    if let Some(contact) = &kb.contact {
        let mut lines: Vec<String> = Vec::new();
        for details in contact.values() {
            for (k, v) in details {
                if let Some(s) = v.as_str() {
                    lines.push(format!("{}: {}", k, s));
                }
            }
        }
        if lines.is_empty() {
            return Err(SchemaError::new("contact", "no text fields found"));
        }
        chunks.push(make_chunk(
            "contact_info",
            Category::Contact,
            format!("Contact information: {}", lines.join(". ")),
            &[("type", "contact")],
        ));
    }

    Ok(chunks)
}

fn make_chunk(id: &str, category: Category, content: String, metadata: &[(&str, &str)]) -> Chunk {
    let metadata: BTreeMap<String, String> = metadata
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Chunk {
        id: id.to_string(),
        category,
        content,
        metadata,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_kb() -> KnowledgeBase {
        serde_json::from_str(
            r#"{
            "company": {
                "name": "Atlas Talent Partners",
                "description": "A recruitment and business support firm",
                "mission": "Connect global teams with exceptional talent",
                "vision": "Talent without borders"
            },
            "services": {
                "bpo": {
                    "name": "Business Process Outsourcing",
                    "description": "Back-office operations support",
                    "details": ["Finance", "Customer support"]
                },
                "rpo": {
                    "name": "Recruitment Process Outsourcing",
                    "description": "End-to-end hiring",
                    "process": ["Intake", "Sourcing", "Screening", "Offer"]
                }
            },
            "pricing": {
                "rpo": {"model": "Percentage of salary", "rate": "15% below market"}
            },
            "faq": {
                "common_questions": [
                    {"question": "How fast can you fill roles?",
                     "answer": "Typically 60-70% faster than traditional methods",
                     "category": "speed"}
                ]
            },
            "team": {
                "leadership": {
                    "ceo": {"name": "R. Okafor", "title": "CEO", "background": "20 years in staffing"}
                }
            },
            "contact": {
                "main": {"email": "hello@atlas.example", "phone": "+1 555 0100"}
            }
        }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_full_document_chunk_set() {
        let chunks = build_chunks(&sample_kb()).unwrap();
        let ids: Vec<&str> = chunks.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "company_overview",
                "service_bpo_main",
                "service_rpo_main",
                "service_rpo_process",
                "pricing_rpo",
                "faq_0",
                "team_ceo",
                "contact_info",
            ]
        );
    }

    #[test]
    fn test_deterministic_across_rebuilds() {
        let a = build_chunks(&sample_kb()).unwrap();
        let b = build_chunks(&sample_kb()).unwrap();
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.id, y.id);
            assert_eq!(x.content, y.content);
            assert_eq!(x.metadata, y.metadata);
        }
    }

    #[test]
    fn test_absent_sections_skipped() {
        let kb: KnowledgeBase = serde_json::from_str(
            r#"{"faq": {"common_questions": [
                {"question": "Where are you based?", "answer": "Manila and Austin"}
            ]}}"#,
        )
        .unwrap();
        let chunks = build_chunks(&kb).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].id, "faq_0");
        assert_eq!(chunks[0].category, Category::Faq);
    }

    #[test]
    fn test_service_without_process_gets_no_process_chunk() {
        let chunks = build_chunks(&sample_kb()).unwrap();
        assert!(!chunks.iter().any(|c| c.id == "service_bpo_process"));
        assert!(chunks.iter().any(|c| c.id == "service_rpo_process"));
    }

    #[test]
    fn test_malformed_faq_entry_fails() {
        let kb: KnowledgeBase = serde_json::from_str(
            r#"{"faq": {"common_questions": [{"question": "", "answer": "yes"}]}}"#,
        )
        .unwrap();
        let err = build_chunks(&kb).unwrap_err();
        assert_eq!(err.section, "faq");
    }

    #[test]
    fn test_malformed_company_fails() {
        let kb: KnowledgeBase =
            serde_json::from_str(r#"{"company": {"name": " ", "description": "x"}}"#).unwrap();
        assert!(build_chunks(&kb).is_err());
    }

    #[test]
    fn test_faq_category_defaults_to_general() {
        let kb: KnowledgeBase = serde_json::from_str(
            r#"{"faq": {"common_questions": [{"question": "q", "answer": "a"}]}}"#,
        )
        .unwrap();
        let chunks = build_chunks(&kb).unwrap();
        assert_eq!(chunks[0].metadata.get("category").unwrap(), "general");
    }

    #[test]
    fn test_team_member_without_title_omits_title_segment() {
        let kb: KnowledgeBase = serde_json::from_str(
            r#"{"team": {"leadership": {
                "founder": {"name": "J. Rivera", "background": "Built two agencies"}
            }}}"#,
        )
        .unwrap();
        let chunks = build_chunks(&kb).unwrap();
        assert_eq!(chunks[0].content, "J. Rivera: Built two agencies");
        assert!(!chunks[0].content.contains(", :"));
    }

    #[test]
    fn test_contact_aggregated_into_one_chunk() {
        let chunks = build_chunks(&sample_kb()).unwrap();
        let contact: Vec<&Chunk> = chunks
            .iter()
            .filter(|c| c.category == Category::Contact)
            .collect();
        assert_eq!(contact.len(), 1);
        assert!(contact[0].content.contains("hello@atlas.example"));
        assert!(contact[0].content.contains("+1 555 0100"));
    }
}
