use crate::error::FilterError;
use regex::Regex;
use std::sync::Arc;

/// One `appliesTo` value, compiled once when the rule is built.
#[derive(Debug, Clone)]
struct PathPattern {
    source: String,
    compiled: Result<Regex, regex::Error>,
}

impl PathPattern {
    fn new(source: String) -> Self {
        let compiled = full_match_regex(&source);
        Self { source, compiled }
    }
}

/// The pattern must parse on its own before it is wrapped in anchors, so an
/// unbalanced `)` cannot close the wrapping group and escape the anchors.
fn full_match_regex(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(pattern)?;
    Regex::new(&format!("^(?:{pattern})$"))
}

/// The `appliesTo` patterns configured for one workflow model.
///
/// An empty rule places no restriction on the page path. Clones share the
/// compiled patterns.
#[derive(Debug, Clone)]
pub struct ApplicabilityRule {
    patterns: Arc<[PathPattern]>,
}

impl ApplicabilityRule {
    pub fn new<I, S>(applies_to: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            patterns: applies_to
                .into_iter()
                .map(|s| PathPattern::new(s.into()))
                .collect(),
        }
    }

    pub fn universal() -> Self {
        Self {
            patterns: Arc::from(Vec::new()),
        }
    }

    pub fn applies_to(&self) -> Vec<&str> {
        self.patterns.iter().map(|p| p.source.as_str()).collect()
    }

    pub fn is_universal(&self) -> bool {
        self.patterns.is_empty()
    }

    /// True when `page_path` matches one of the patterns as a whole.
    ///
    /// The scan stops at the first match, so a broken pattern only surfaces
    /// when no earlier one matched.
    pub fn allows(&self, wid: &str, page_path: &str) -> Result<bool, FilterError> {
        if self.is_universal() {
            return Ok(true);
        }
        for pattern in self.patterns.iter() {
            let re = pattern
                .compiled
                .as_ref()
                .map_err(|source| FilterError::InvalidPattern {
                    wid: wid.to_string(),
                    pattern: pattern.source.clone(),
                    source: source.clone(),
                })?;
            if re.is_match(page_path) {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

impl Default for ApplicabilityRule {
    fn default() -> Self {
        Self::universal()
    }
}

impl PartialEq for ApplicabilityRule {
    fn eq(&self, other: &Self) -> bool {
        self.patterns.len() == other.patterns.len()
            && self
                .patterns
                .iter()
                .zip(other.patterns.iter())
                .all(|(a, b)| a.source == b.source)
    }
}

impl Eq for ApplicabilityRule {}

/// Looks up the applicability rule of a workflow model by its `wid`.
///
/// `None` means the model no longer exists.
pub trait ApplicabilityResolver: Send + Sync {
    fn lookup(&self, model_id: &str) -> Option<ApplicabilityRule>;
}

impl<F> ApplicabilityResolver for F
where
    F: Fn(&str) -> Option<ApplicabilityRule> + Send + Sync,
{
    fn lookup(&self, model_id: &str) -> Option<ApplicabilityRule> {
        self(model_id)
    }
}
