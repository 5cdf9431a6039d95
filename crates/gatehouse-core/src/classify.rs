//! Path-based traffic classification.
//!
//! Rules are evaluated in order and the first match wins. Several prefixes
//! overlap (every webhook route also lives under `/api/`), so the order of
//! [`Classifier::default`] is significant.

use crate::traffic::TrafficClass;

/// Prefix that marks general API traffic.
pub const API_PREFIX: &str = "/api/";

/// True for `/api` and anything below it.
pub fn is_api_path(path: &str) -> bool {
    path == "/api" || path.starts_with(API_PREFIX)
}

/// A single path test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathMatch {
    Prefix(String),
    Contains(String),
}

impl PathMatch {
    pub fn prefix(p: impl Into<String>) -> Self {
        Self::Prefix(p.into())
    }

    pub fn contains(p: impl Into<String>) -> Self {
        Self::Contains(p.into())
    }

    pub fn matches(&self, path: &str) -> bool {
        match self {
            Self::Prefix(p) => path.starts_with(p.as_str()),
            Self::Contains(p) => path.contains(p.as_str()),
        }
    }
}

/// Assigns `class` when any of `any` matches and none of `unless` does.
#[derive(Debug, Clone)]
pub struct ClassRule {
    pub class: TrafficClass,
    any: Vec<PathMatch>,
    unless: Vec<PathMatch>,
}

impl ClassRule {
    pub fn new(class: TrafficClass, any: Vec<PathMatch>) -> Self {
        Self {
            class,
            any,
            unless: Vec::new(),
        }
    }

    #[must_use]
    pub fn unless(mut self, exclusions: Vec<PathMatch>) -> Self {
        self.unless = exclusions;
        self
    }

    pub fn matches(&self, path: &str) -> bool {
        self.any.iter().any(|m| m.matches(path)) && !self.unless.iter().any(|m| m.matches(path))
    }
}

/// Ordered rule list. Paths no rule claims fall back to [`TrafficClass::Api`].
#[derive(Debug, Clone)]
pub struct Classifier {
    rules: Vec<ClassRule>,
}

impl Classifier {
    pub fn new(rules: Vec<ClassRule>) -> Self {
        Self { rules }
    }

    pub fn classify(&self, path: &str) -> TrafficClass {
        self.rules
            .iter()
            .find(|rule| rule.matches(path))
            .map_or(TrafficClass::Api, |rule| rule.class)
    }
}

impl Default for Classifier {
    fn default() -> Self {
        use PathMatch as M;

        Self::new(vec![
            ClassRule::new(
                TrafficClass::Health,
                vec![M::prefix("/api/health"), M::prefix("/health")],
            ),
            ClassRule::new(
                TrafficClass::Webhook,
                vec![
                    M::contains("/webhook"),
                    M::prefix("/api/stripe/"),
                    M::prefix("/api/billing/webhook"),
                ],
            ),
            ClassRule::new(
                TrafficClass::Auth,
                vec![M::prefix("/api/auth"), M::prefix("/api/sso"), M::prefix("/auth")],
            ),
            ClassRule::new(
                TrafficClass::Public,
                vec![
                    M::prefix("/api/waitlist"),
                    M::prefix("/api/certificates/verify"),
                    M::prefix("/api/pricing"),
                    M::prefix("/api/courses"),
                ],
            )
            .unless(vec![M::contains("/enroll")]),
            ClassRule::new(TrafficClass::Api, vec![M::prefix(API_PREFIX)]),
        ])
    }
}
