use serde::Serialize;

/// A product documentation note available to the agent
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocEntry {
    pub title: &'static str,
    pub content: &'static str,
}

pub const CATALOG: &[DocEntry] = &[
    DocEntry {
        title: "Workers Cold Starts",
        content: "Workers run on Cloudflare's global network. Cold starts can be minimized using Smart Placement or keeping workers warm with scheduled triggers.",
    },
    DocEntry {
        title: "R2 Pricing",
        content: "R2 has zero egress fees. You only pay for storage ($0.015/GB-month) and Class A ($4.50/million) / Class B ($0.36/million) operations.",
    },
    DocEntry {
        title: "D1 Transactions",
        content: "D1 supports transactions via the batch() API for atomic operations. Full ACID transaction support is on the roadmap.",
    },
    DocEntry {
        title: "Pages Build Performance",
        content: "Pages build times can be improved by using build caching, optimizing dependencies, and using incremental builds where possible.",
    },
    DocEntry {
        title: "Workers AI Models",
        content: "Workers AI supports various models including Llama, Stable Diffusion, Whisper, and embedding models. New models are added regularly.",
    },
    DocEntry {
        title: "Durable Objects",
        content: "Durable Objects provide strongly consistent, low-latency coordination for WebSocket connections, real-time collaboration, and stateful logic at the edge.",
    },
    DocEntry {
        title: "Workers KV",
        content: "Workers KV is an eventually consistent key-value store with global distribution. For stronger consistency, consider using Durable Objects.",
    },
];

/// Entries whose title or content contains `query` (case-insensitive);
/// the first two entries when nothing matches
pub fn search_docs(query: &str) -> Vec<&'static DocEntry> {
    let needle = query.to_lowercase();
    let relevant: Vec<&'static DocEntry> = CATALOG
        .iter()
        .filter(|doc| {
            doc.title.to_lowercase().contains(&needle)
                || doc.content.to_lowercase().contains(&needle)
        })
        .collect();

    if relevant.is_empty() {
        CATALOG.iter().take(2).collect()
    } else {
        relevant
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_title_and_content_case_insensitively() {
        let titles: Vec<&str> = search_docs("DURABLE OBJECTS").iter().map(|d| d.title).collect();
        assert_eq!(titles, vec!["Durable Objects", "Workers KV"]);
    }

    #[test]
    fn test_no_match_returns_first_two_entries() {
        let docs = search_docs("quantum billing");
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].title, "Workers Cold Starts");
        assert_eq!(docs[1].title, "R2 Pricing");
    }
}
