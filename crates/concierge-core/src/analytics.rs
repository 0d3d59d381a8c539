//! Usage analytics: a capacity-bounded event log with derived summary
//! statistics.
//!
//! The recorder is a diagnostic ring buffer, not durable storage: when
//! the capacity is reached the oldest events are dropped first.
//! Aggregation is purely additive and never fails — partially populated
//! events contribute zeros/absences to the summary instead of erroring.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use serde::Serialize;

use crate::models::Confidence;

/// How many distinct queries the summary reports by frequency.
const TOP_QUERIES: usize = 5;

/// Outcome record for one answered request.
#[derive(Debug, Clone)]
pub struct AnalyticsEvent {
    pub query: String,
    pub latency_ms: Option<u64>,
    pub cached: bool,
    pub confidence: Option<Confidence>,
    pub session_reused: bool,
    pub fallback: bool,
    pub error: bool,
    pub timestamp: i64,
}

impl AnalyticsEvent {
    /// An event with only the query populated; callers fill in what
    /// they know.
    pub fn for_query(query: &str) -> Self {
        Self {
            query: query.to_string(),
            latency_ms: None,
            cached: false,
            confidence: None,
            session_reused: false,
            fallback: false,
            error: false,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

/// Counts per confidence level.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConfidenceBreakdown {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

/// Aggregated view over the recorded events.
#[derive(Debug, Clone, Serialize)]
pub struct UsageSummary {
    pub total_queries: usize,
    pub cache_hits: usize,
    pub cache_hit_rate: f64,
    pub confidence: ConfidenceBreakdown,
    pub fallbacks: usize,
    pub errors: usize,
    pub avg_latency_ms: f64,
    pub top_queries: Vec<(String, usize)>,
}

/// Append-only, capacity-bounded analytics recorder.
pub struct AnalyticsRecorder {
    events: Mutex<VecDeque<AnalyticsEvent>>,
    capacity: usize,
}

impl AnalyticsRecorder {
    pub fn new(capacity: usize) -> Self {
        Self {
            events: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity,
        }
    }

    /// Append an event, dropping the oldest when at capacity.
    pub fn record(&self, event: AnalyticsEvent) {
        let mut events = self.events.lock().unwrap();
        while events.len() >= self.capacity {
            events.pop_front();
        }
        events.push_back(event);
    }

    /// Number of events currently retained.
    pub fn len(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Aggregate the retained events into a [`UsageSummary`].
    pub fn summarize(&self) -> UsageSummary {
        let events = self.events.lock().unwrap();

        let total = events.len();
        let cache_hits = events.iter().filter(|e| e.cached).count();
        let fallbacks = events.iter().filter(|e| e.fallback).count();
        let errors = events.iter().filter(|e| e.error).count();

        let mut confidence = ConfidenceBreakdown::default();
        for e in events.iter() {
            match e.confidence {
                Some(Confidence::High) => confidence.high += 1,
                Some(Confidence::Medium) => confidence.medium += 1,
                Some(Confidence::Low) => confidence.low += 1,
                None => {}
            }
        }

        let latencies: Vec<u64> = events.iter().filter_map(|e| e.latency_ms).collect();
        let avg_latency_ms = if latencies.is_empty() {
            0.0
        } else {
            latencies.iter().sum::<u64>() as f64 / latencies.len() as f64
        };

        let mut frequency: HashMap<String, usize> = HashMap::new();
        for e in events.iter() {
            let normalized = e.query.trim().to_lowercase();
            if !normalized.is_empty() {
                *frequency.entry(normalized).or_insert(0) += 1;
            }
        }
        let mut top_queries: Vec<(String, usize)> = frequency.into_iter().collect();
        top_queries.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        top_queries.truncate(TOP_QUERIES);

        UsageSummary {
            total_queries: total,
            cache_hits,
            cache_hit_rate: if total > 0 {
                cache_hits as f64 / total as f64
            } else {
                0.0
            },
            confidence,
            fallbacks,
            errors,
            avg_latency_ms,
            top_queries,
        }
    }
}
