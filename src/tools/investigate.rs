use serde::Serialize;
use std::collections::BTreeMap;

use crate::models::{FeedbackItem, Sentiment, Urgency};

const MAX_RELATED: usize = 5;
const MAX_SAMPLES: usize = 3;

pub const PRIORITIZE: &str =
    "This topic has more negative sentiment - consider prioritizing investigation.";
pub const MONITOR: &str = "Sentiment is balanced or positive - monitor but not urgent.";

#[derive(Debug, Default, PartialEq, Serialize)]
pub struct SentimentBreakdown {
    pub positive: usize,
    pub negative: usize,
    pub neutral: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Investigation {
    pub topic: String,
    pub feedback_count: usize,
    pub sentiment_breakdown: SentimentBreakdown,
    /// Always carries all four tiers, zero-filled
    pub urgency_breakdown: BTreeMap<Urgency, usize>,
    pub sample_feedback: Vec<String>,
    pub recommendation: &'static str,
}

/// Histogram view of the feedback related to `question`.
///
/// An item is related when its content or product contains the lower-cased
/// question. At most five related items are considered.
pub fn investigate(items: &[FeedbackItem], question: &str) -> Investigation {
    let topic = question.to_lowercase();
    let related: Vec<&FeedbackItem> = items
        .iter()
        .filter(|item| {
            item.content.to_lowercase().contains(&topic)
                || item.product.to_lowercase().contains(&topic)
        })
        .take(MAX_RELATED)
        .collect();

    let mut sentiment = SentimentBreakdown::default();
    let mut urgency: BTreeMap<Urgency, usize> = Urgency::ALL.iter().map(|u| (*u, 0)).collect();
    for item in &related {
        match item.sentiment {
            Sentiment::Positive => sentiment.positive += 1,
            Sentiment::Negative => sentiment.negative += 1,
            Sentiment::Neutral => sentiment.neutral += 1,
        }
        *urgency.entry(item.urgency).or_default() += 1;
    }

    let recommendation = if sentiment.negative > sentiment.positive {
        PRIORITIZE
    } else {
        MONITOR
    };

    Investigation {
        feedback_count: related.len(),
        sample_feedback: related
            .iter()
            .take(MAX_SAMPLES)
            .map(|item| item.content.clone())
            .collect(),
        sentiment_breakdown: sentiment,
        urgency_breakdown: urgency,
        recommendation,
        topic,
    }
}
