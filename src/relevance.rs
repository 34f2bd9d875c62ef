use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;
use tracing::debug;

use crate::models::FeedbackItem;

/// Query tokenization policy shared by every search call site
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenPolicy {
    /// Tokens with fewer characters than this are dropped
    pub min_token_len: usize,
    /// Short tokens kept regardless of length (product codes such as "r2")
    pub short_token_allowlist: Vec<String>,
}

impl Default for TokenPolicy {
    fn default() -> Self {
        Self {
            min_token_len: 3,
            short_token_allowlist: ["r2", "d1", "ai", "kv", "do"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl TokenPolicy {
    fn keeps(&self, token: &str) -> bool {
        token.chars().count() >= self.min_token_len
            || self
                .short_token_allowlist
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(token))
    }
}

/// A feedback item with its term-overlap score
#[derive(Debug, Clone, Serialize)]
pub struct ScoredItem {
    pub item: FeedbackItem,
    pub score: f64,
}

/// Term-overlap ranking over feedback content.
///
/// score = distinct matched query tokens / all query tokens, where a token
/// matches when it is a substring of the lower-cased content. Zero scores are
/// discarded and the rest are stable-sorted by descending score.
#[derive(Debug, Clone, Default)]
pub struct RelevanceSearch {
    policy: TokenPolicy,
}

impl RelevanceSearch {
    pub fn new(policy: TokenPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &TokenPolicy {
        &self.policy
    }

    /// Lower-case, split on whitespace, drop short tokens. Repeats are kept.
    pub fn tokenize(&self, query: &str) -> Vec<String> {
        query
            .to_lowercase()
            .split_whitespace()
            .filter(|token| self.policy.keeps(token))
            .map(String::from)
            .collect()
    }

    /// Distinct tokens found in `content` over the token count; 0.0 when there are no tokens
    pub fn score(&self, content: &str, tokens: &[String]) -> f64 {
        if tokens.is_empty() {
            return 0.0;
        }
        let content = content.to_lowercase();
        let matched = tokens
            .iter()
            .map(String::as_str)
            .collect::<HashSet<&str>>()
            .into_iter()
            .filter(|token| content.contains(token))
            .count();
        matched as f64 / tokens.len() as f64
    }

    /// Score and order `items` against `query`
    pub fn rank(&self, items: &[FeedbackItem], query: &str) -> Vec<ScoredItem> {
        let tokens = self.tokenize(query);
        if tokens.is_empty() {
            debug!(query, "No usable query tokens, returning empty result");
            return Vec::new();
        }

        let mut scored: Vec<ScoredItem> = items
            .iter()
            .filter_map(|item| {
                let score = self.score(&item.content, &tokens);
                (score > 0.0).then(|| ScoredItem {
                    item: item.clone(),
                    score,
                })
            })
            .collect();

        // sort_by is stable: equal scores keep input order
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));

        debug!(
            query,
            ?tokens,
            matches = scored.len(),
            "Relevance search complete"
        );
        scored
    }

    /// Ranked items without their scores
    pub fn search(&self, items: &[FeedbackItem], query: &str) -> Vec<FeedbackItem> {
        self.rank(items, query)
            .into_iter()
            .map(|scored| scored.item)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> RelevanceSearch {
        RelevanceSearch::new(TokenPolicy::default())
    }

    #[test]
    fn test_cold_start_example_ranks_full_match_first() {
        let items = vec![
            FeedbackItem::fixture("fb_001", "Workers cold starts are killing our API latency."),
            FeedbackItem::fixture("fb_002", "R2 pricing is fair and egress is free."),
        ];

        let ranked = engine().rank(&items, "cold start");
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].item.id, "fb_001");
        assert!((ranked[0].score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_all_short_tokens_yield_empty_result() {
        let items = vec![FeedbackItem::fixture("fb_001", "it is on to me")];
        assert!(engine().rank(&items, "it is on").is_empty());
        assert!(engine().rank(&items, "   ").is_empty());
    }

    #[test]
    fn test_scores_are_non_increasing_and_ties_keep_input_order() {
        let items = vec![
            FeedbackItem::fixture("a", "latency spikes"),
            FeedbackItem::fixture("b", "cold starts and latency spikes"),
            FeedbackItem::fixture("c", "latency again"),
            FeedbackItem::fixture("d", "nothing relevant"),
            FeedbackItem::fixture("e", "cold starts with latency"),
        ];

        let ranked = engine().rank(&items, "cold latency spikes");
        let ids: Vec<&str> = ranked.iter().map(|s| s.item.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "e", "c"]);
        assert!(ranked.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_allowlisted_product_codes_survive_tokenization() {
        let tokens = engine().tokenize("R2 is slow");
        assert_eq!(tokens, vec!["r2".to_string(), "slow".to_string()]);
    }

    #[test]
    fn test_repeated_tokens_match_once_but_count_in_denominator() {
        let search = engine();
        let tokens = search.tokenize("cold cold start");
        assert_eq!(tokens.len(), 3);
        assert!((search.score("cold boot", &tokens) - 1.0 / 3.0).abs() < 1e-9);

        let items = vec![FeedbackItem::fixture("fb_001", "cold boot")];
        let ranked = search.rank(&items, "cold cold start");
        assert_eq!(ranked.len(), 1);
        assert!((ranked[0].score - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_threshold_is_configurable() {
        let permissive = RelevanceSearch::new(TokenPolicy {
            min_token_len: 1,
            short_token_allowlist: Vec::new(),
        });
        let items = vec![FeedbackItem::fixture("fb_009", "Pages builds on CI")];
        assert_eq!(permissive.search(&items, "ci").len(), 1);
        assert!(engine().search(&items, "ci").is_empty());
    }
}
