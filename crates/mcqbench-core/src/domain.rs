//! Category → domain mapping for coarse-grained reporting.
//!
//! Rules are matched as lower-case substrings in declaration order and the
//! first hit wins. Categories can contain more than one keyword, so the
//! table is an ordered list rather than a map.

/// Domain assigned when no rule matches.
pub const DEFAULT_DOMAIN: &str = "Other";

// ── Built-in MMLU-Pro table ──

const MMLU_PRO_RULES: &[(&str, &str)] = &[
    ("math", "STEM"),
    ("physics", "STEM"),
    ("chemistry", "STEM"),
    ("biology", "STEM"),
    ("computer science", "STEM"),
    ("engineering", "STEM"),
    ("statistics", "STEM"),
    ("economics", "Social Sciences"),
    ("psychology", "Social Sciences"),
    ("business", "Social Sciences"),
    ("law", "Humanities"),
    ("philosophy", "Humanities"),
    ("history", "Humanities"),
    ("health", "Other"),
    ("other", "Other"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainRule {
    pub pattern: String,
    pub domain: String,
}

/// Ordered substring rules plus a fallback domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainRules {
    rules: Vec<DomainRule>,
    default: String,
}

impl DomainRules {
    /// Build a table from `(pattern, domain)` pairs. Patterns are lower-cased.
    pub fn new<P, D>(rules: impl IntoIterator<Item = (P, D)>, default: impl Into<String>) -> Self
    where
        P: AsRef<str>,
        D: Into<String>,
    {
        let rules = rules
            .into_iter()
            .map(|(pattern, domain)| DomainRule {
                pattern: pattern.as_ref().to_lowercase(),
                domain: domain.into(),
            })
            .collect();
        Self {
            rules,
            default: default.into(),
        }
    }

    /// The reporting table used for MMLU-Pro runs.
    pub fn mmlu_pro() -> Self {
        Self::new(MMLU_PRO_RULES.iter().copied(), DEFAULT_DOMAIN)
    }

    /// Domain of the first rule whose pattern occurs in `category`.
    pub fn classify(&self, category: &str) -> &str {
        let category = category.to_lowercase();
        self.rules
            .iter()
            .find(|rule| category.contains(rule.pattern.as_str()))
            .map(|rule| rule.domain.as_str())
            .unwrap_or(self.default.as_str())
    }

    pub fn rules(&self) -> &[DomainRule] {
        &self.rules
    }

    pub fn default_domain(&self) -> &str {
        &self.default
    }
}

impl Default for DomainRules {
    fn default() -> Self {
        Self::mmlu_pro()
    }
}
