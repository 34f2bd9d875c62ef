use serde::{Deserialize, Serialize};

use crate::models::{FeedbackItem, Source, Status, Urgency};

/// Equality constraints over the categorical feedback fields.
///
/// Every present constraint must equal the item's field exactly
/// (case-sensitive); absent constraints match everything. An empty
/// `product` string is treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct FeedbackFilters {
    #[schemars(description = "Filter by feedback source (support/discord/twitter)")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,

    #[schemars(description = "Filter by status (new/in_progress/resolved)")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,

    #[schemars(description = "Filter by urgency level (P0/P1/P2/P3)")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urgency: Option<Urgency>,

    #[schemars(description = "Filter by product name (e.g. workers, r2, pages, d1, ai)")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<String>,
}

impl FeedbackFilters {
    fn product_constraint(&self) -> Option<&str> {
        self.product.as_deref().filter(|p| !p.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.source.is_none()
            && self.status.is_none()
            && self.urgency.is_none()
            && self.product_constraint().is_none()
    }

    pub fn matches(&self, item: &FeedbackItem) -> bool {
        self.source.is_none_or(|source| item.source == source)
            && self.status.is_none_or(|status| item.status == status)
            && self.urgency.is_none_or(|urgency| item.urgency == urgency)
            && self
                .product_constraint()
                .is_none_or(|product| item.product == product)
    }

    /// Keep the items matching every constraint, preserving input order
    pub fn apply(&self, items: Vec<FeedbackItem>) -> Vec<FeedbackItem> {
        if self.is_empty() {
            return items;
        }
        items.into_iter().filter(|item| self.matches(item)).collect()
    }

    /// `source=support, status=any, ...` line used in summary prompts
    pub fn describe(&self) -> String {
        format!(
            "source={}, status={}, urgency={}, product={}",
            self.source.map_or("any", |s| s.as_str()),
            self.status.map_or("any", |s| s.as_str()),
            self.urgency.map_or("any", |u| u.as_str()),
            self.product_constraint().unwrap_or("any"),
        )
    }
}
