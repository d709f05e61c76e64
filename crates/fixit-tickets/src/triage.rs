//! Keyword triage for newly filed tickets.
//!
//! Suggests a priority and a category from the ticket's title and
//! description. Suggestions are advisory; residents pick the final
//! values.

use std::collections::BTreeMap;

use fixit_core::models::ticket::{TicketCategory, TicketPriority};
use serde::Serialize;

struct PriorityRule {
    priority: TicketPriority,
    score: u32,
    keywords: &'static [&'static str],
}

/// Ordered most to least severe; ties resolve to the earlier rule.
static PRIORITY_RULES: &[PriorityRule] = &[
    PriorityRule {
        priority: TicketPriority::Urgent,
        score: 3,
        keywords: &[
            "emergency",
            "urgent",
            "immediately",
            "fire",
            "flood",
            "leak",
            "gas",
            "danger",
            "safety",
            "hazard",
            "broken",
            "not working",
            "stopped",
        ],
    },
    PriorityRule {
        priority: TicketPriority::High,
        score: 2,
        keywords: &[
            "important",
            "asap",
            "critical",
            "major",
            "serious",
            "elevator stuck",
            "no water",
            "no power",
            "overflowing",
        ],
    },
    PriorityRule {
        priority: TicketPriority::Medium,
        score: 1,
        keywords: &[
            "repair",
            "fix",
            "issue",
            "problem",
            "malfunction",
            "noise",
            "smell",
            "slow",
            "intermittent",
        ],
    },
    PriorityRule {
        priority: TicketPriority::Low,
        score: 0,
        keywords: &[
            "minor",
            "when possible",
            "convenience",
            "cosmetic",
            "request",
            "upgrade",
            "suggestion",
        ],
    },
];

static CATEGORY_KEYWORDS: &[(TicketCategory, &[&str])] = &[
    (
        TicketCategory::Hvac,
        &[
            "ac",
            "air conditioning",
            "heating",
            "cooling",
            "temperature",
            "thermostat",
            "vent",
            "hvac",
            "ventilation",
            "hot",
            "cold",
            "freezing",
            "warm",
        ],
    ),
    (
        TicketCategory::Electrical,
        &[
            "power",
            "electric",
            "light",
            "outlet",
            "socket",
            "switch",
            "circuit",
            "fuse",
            "breaker",
            "wire",
            "bulb",
            "flickering",
        ],
    ),
    (
        TicketCategory::Plumbing,
        &[
            "water", "pipe", "leak", "drain", "faucet", "toilet", "sink", "shower", "clog",
            "blocked", "overflow", "sewage",
        ],
    ),
    (
        TicketCategory::Security,
        &[
            "lock", "door", "camera", "cctv", "alarm", "access", "key", "badge", "intercom",
            "security",
        ],
    ),
    (
        TicketCategory::Appliance,
        &[
            "washer",
            "dryer",
            "refrigerator",
            "fridge",
            "dishwasher",
            "microwave",
            "oven",
            "stove",
            "appliance",
        ],
    ),
];

const MAX_REASONS: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrioritySuggestion {
    pub priority: TicketPriority,
    pub confidence: f64,
    pub reasoning: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySuggestion {
    pub suggested_category: TicketCategory,
    pub confidence: f64,
    /// Share of keyword hits per scored category.
    pub all_categories: BTreeMap<&'static str, f64>,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn normalize(title: &str, description: &str) -> String {
    format!("{title} {description}").to_lowercase()
}

/// Suggest a priority from keyword hits.
pub fn suggest_priority(title: &str, description: &str) -> PrioritySuggestion {
    let text = normalize(title, description);
    let mut reasoning = Vec::new();
    let mut best: Option<(TicketPriority, u32)> = None;

    for rule in PRIORITY_RULES {
        let mut score = 0;
        for keyword in rule.keywords.iter().filter(|k| text.contains(**k)) {
            score += rule.score;
            reasoning.push(format!(
                "Contains '{keyword}' (suggests {} priority)",
                rule.priority
            ));
        }
        if best.is_none_or(|(_, top)| score > top) {
            best = Some((rule.priority, score));
        }
    }

    match best {
        Some((priority, top)) if top > 0 => {
            reasoning.truncate(MAX_REASONS);
            PrioritySuggestion {
                priority,
                confidence: round2((0.5 + f64::from(top) * 0.15).min(0.95)),
                reasoning,
            }
        }
        _ => PrioritySuggestion {
            priority: TicketPriority::Medium,
            confidence: 0.5,
            reasoning: vec![
                "No specific priority keywords found".into(),
                "Defaulting to medium priority".into(),
            ],
        },
    }
}

/// Suggest a category from keyword hits.
pub fn suggest_category(title: &str, description: &str) -> CategorySuggestion {
    let text = normalize(title, description);
    let hits: Vec<(TicketCategory, usize)> = CATEGORY_KEYWORDS
        .iter()
        .map(|(category, keywords)| {
            let count = keywords.iter().filter(|k| text.contains(**k)).count();
            (*category, count)
        })
        .collect();
    let total: usize = hits.iter().map(|(_, n)| n).sum();

    if total == 0 {
        return CategorySuggestion {
            suggested_category: TicketCategory::Other,
            confidence: 0.3,
            all_categories: hits.iter().map(|(c, _)| (c.as_str(), 0.0)).collect(),
        };
    }

    let share = |n: usize| round2(n as f64 / total as f64);
    let mut top = hits[0];
    for &candidate in &hits[1..] {
        if candidate.1 > top.1 {
            top = candidate;
        }
    }

    CategorySuggestion {
        suggested_category: top.0,
        confidence: round2((share(top.1) + 0.3).min(0.95)),
        all_categories: hits.iter().map(|&(c, n)| (c.as_str(), share(n))).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_keywords_defaults_to_medium() {
        let s = suggest_priority("Question", "About the schedule");
        assert_eq!(s.priority, TicketPriority::Medium);
        assert_eq!(s.confidence, 0.5);
        assert_eq!(s.reasoning.len(), 2);
    }

    #[test]
    fn urgent_keywords_win() {
        let s = suggest_priority("Gas smell", "Emergency in the hallway");
        assert_eq!(s.priority, TicketPriority::Urgent);
        // "gas" + "emergency" = 6 -> 0.5 + 0.9 capped
        assert_eq!(s.confidence, 0.95);
        assert!(s.reasoning.iter().any(|r| r.contains("'gas'")));
    }

    #[test]
    fn medium_confidence_scales_with_hits() {
        let s = suggest_priority("Please repair", "odd noise");
        assert_eq!(s.priority, TicketPriority::Medium);
        assert_eq!(s.confidence, 0.8);
    }

    #[test]
    fn reasoning_is_capped() {
        let s = suggest_priority(
            "Emergency fire flood leak gas",
            "danger safety hazard broken stopped",
        );
        assert_eq!(s.reasoning.len(), MAX_REASONS);
    }

    #[test]
    fn low_only_text_still_defaults_to_medium() {
        // Low keywords score zero.
        let s = suggest_priority("Minor cosmetic request", "");
        assert_eq!(s.priority, TicketPriority::Medium);
        assert_eq!(s.confidence, 0.5);
    }

    #[test]
    fn plumbing_text_is_classified() {
        let s = suggest_category("Blocked drain", "The kitchen sink is clogged");
        assert_eq!(s.suggested_category, TicketCategory::Plumbing);
        assert!(s.confidence > 0.3);
        assert_eq!(s.all_categories.len(), CATEGORY_KEYWORDS.len());
    }

    #[test]
    fn unknown_text_is_other() {
        let s = suggest_category("Question", "Paperwork");
        assert_eq!(s.suggested_category, TicketCategory::Other);
        assert_eq!(s.confidence, 0.3);
        assert!(s.all_categories.values().all(|v| *v == 0.0));
    }
}
