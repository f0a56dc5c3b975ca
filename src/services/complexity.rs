//! Keyword-category goal scoring.
//!
//! Complexity and criticality are scored by a deterministic, versioned
//! keyword table: each category present in the goal text contributes one
//! weight unit. The numeric contribution is a tuned constant, not a
//! documented formula; tuning happens by editing the table.

/// Version of the keyword tables below. Bump on any table change.
pub const KEYWORD_TABLE_VERSION: u32 = 1;

/// One scoring category: a name and its trigger keywords.
#[derive(Debug, Clone, Copy)]
pub struct KeywordCategory {
    pub name: &'static str,
    pub keywords: &'static [&'static str],
}

/// Categories that mark a goal as complex.
pub const COMPLEXITY_CATEGORIES: &[KeywordCategory] = &[
    KeywordCategory {
        name: "orchestration",
        keywords: &["orchestrat", "pipeline", "workflow", "scheduler", "batch"],
    },
    KeywordCategory {
        name: "integration",
        keywords: &["integrat", "interface", "adapter", "protocol", "api"],
    },
    KeywordCategory {
        name: "governance",
        keywords: &["governance", "compliance", "policy", "audit"],
    },
    KeywordCategory {
        name: "quality",
        keywords: &["quality", "test", "validation", "verification"],
    },
    KeywordCategory {
        name: "resilience",
        keywords: &["resilien", "security", "fault", "recovery", "failover"],
    },
    KeywordCategory {
        name: "coordination",
        keywords: &["master", "sub-spec", "subspec", "coordinat", "decompos"],
    },
];

/// Categories that mark a goal as critical-path work.
pub const CRITICALITY_CATEGORIES: &[KeywordCategory] = &[
    KeywordCategory {
        name: "schema",
        keywords: &["schema", "data model", "migration"],
    },
    KeywordCategory {
        name: "baseline",
        keywords: &["baseline", "foundation", "bootstrap"],
    },
    KeywordCategory {
        name: "dependency",
        keywords: &["dependency", "depends on", "prerequisite", "blocking"],
    },
    KeywordCategory {
        name: "platform-contract",
        keywords: &["platform", "contract", "runtime", "toolchain"],
    },
];

fn matched_categories(text: &str, categories: &[KeywordCategory]) -> u32 {
    let lowered = text.to_lowercase();
    let mut score = 0;
    for category in categories {
        if category.keywords.iter().any(|kw| lowered.contains(kw)) {
            score += 1;
        }
    }
    score
}

/// Complexity weight of a goal: matched complexity categories, floor 1.
pub fn complexity_weight(text: &str) -> u32 {
    matched_categories(text, COMPLEXITY_CATEGORIES).max(1)
}

/// Criticality score of a goal: matched criticality categories.
///
/// Unlike complexity there is no floor; a goal with no critical-path
/// keywords scores zero and sorts behind any critical one.
pub fn criticality_score(text: &str) -> u32 {
    matched_categories(text, CRITICALITY_CATEGORIES)
}
