//! Retrieval-confidence scoring and low-confidence fallback text.
//!
//! Confidence is a retrieval-coverage heuristic: it counts how many
//! chunks came back, and deliberately ignores their distances. The
//! embedding model's distance scale is not calibrated against a
//! human-judged relevance threshold, so a distance cutoff would be
//! arbitrary; the result count is at least honest about coverage.
//!
//! The fallback selector is a pure function: keyword classification of
//! the query into a handful of intents, each mapped to a canned response
//! that steers the user to a human channel. No model call is involved.

use crate::models::{Confidence, RetrievalResult};

/// Map retrieval results to a confidence level by result count.
///
/// `>= 3` results → [`Confidence::High`], exactly `2` →
/// [`Confidence::Medium`], anything less → [`Confidence::Low`].
pub fn score(results: &[RetrievalResult]) -> Confidence {
    match results.len() {
        n if n >= 3 => Confidence::High,
        2 => Confidence::Medium,
        _ => Confidence::Low,
    }
}

/// Query intents recognized by the low-confidence fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FallbackIntent {
    Pricing,
    Contact,
    OpenQuestion,
    Other,
}

fn classify(query: &str) -> FallbackIntent {
    let q = query.to_lowercase();
    const PRICING: &[&str] = &["price", "pricing", "cost", "fee", "rate", "charge", "budget"];
    const CONTACT: &[&str] = &[
        "contact", "call", "email", "phone", "reach", "schedule", "consult", "meeting", "demo",
    ];
    const QUESTION: &[&str] = &["how", "what", "why", "when", "where", "who", "which", "?"];

    if PRICING.iter().any(|kw| q.contains(kw)) {
        FallbackIntent::Pricing
    } else if CONTACT.iter().any(|kw| q.contains(kw)) {
        FallbackIntent::Contact
    } else if QUESTION.iter().any(|kw| q.contains(kw)) {
        FallbackIntent::OpenQuestion
    } else {
        FallbackIntent::Other
    }
}

/// Select the canned low-confidence response for a query.
///
/// Deterministic and side-effect-free; called by the orchestrator when
/// [`score`] returns [`Confidence::Low`].
pub fn fallback(query: &str) -> String {
    match classify(query) {
        FallbackIntent::Pricing => "Pricing depends on the scope and scale of the engagement, so \
            I'd rather not guess. Our team can put together an accurate quote — please reach out \
            through the contact details on our site and we'll follow up quickly."
            .to_string(),
        FallbackIntent::Contact => "The fastest way to reach us is through the contact details \
            listed on our site — our team typically responds within one business day, and we're \
            happy to schedule a call at a time that suits you."
            .to_string(),
        FallbackIntent::OpenQuestion => "I don't have enough information in my knowledge base to \
            answer that accurately. Rather than guess, I'd suggest contacting our team directly — \
            they can give you a precise answer."
            .to_string(),
        FallbackIntent::Other => "I'm not sure I can help with that from the information I have. \
            If you'd like to talk it through with a person, please get in touch via the contact \
            details on our site."
            .to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn results(n: usize) -> Vec<RetrievalResult> {
        (0..n)
            .map(|i| RetrievalResult {
                chunk_id: format!("chunk_{}", i),
                content: String::new(),
                metadata: BTreeMap::new(),
                distance: 0.1 * i as f64,
            })
            .collect()
    }

    #[test]
    fn test_confidence_by_result_count() {
        assert_eq!(score(&results(0)), Confidence::Low);
        assert_eq!(score(&results(1)), Confidence::Low);
        assert_eq!(score(&results(2)), Confidence::Medium);
        assert_eq!(score(&results(3)), Confidence::High);
        assert_eq!(score(&results(10)), Confidence::High);
    }

    #[test]
    fn test_distances_ignored() {
        let mut far = results(3);
        for r in &mut far {
            r.distance = 1.99;
        }
        assert_eq!(score(&far), Confidence::High);
    }

    #[test]
    fn test_pricing_intent() {
        let msg = fallback("how much does an engagement cost?");
        assert!(msg.to_lowercase().contains("quote"));
    }

    #[test]
    fn test_contact_intent() {
        let msg = fallback("can I schedule a call with someone");
        assert!(msg.to_lowercase().contains("schedule"));
    }

    #[test]
    fn test_open_question_intent() {
        let msg = fallback("what is your data retention policy?");
        assert!(msg.to_lowercase().contains("knowledge base"));
    }

    #[test]
    fn test_other_intent() {
        let msg = fallback("blue bicycles");
        assert!(msg.to_lowercase().contains("get in touch"));
    }

    #[test]
    fn test_fallback_is_deterministic() {
        assert_eq!(fallback("pricing?"), fallback("pricing?"));
    }
}
