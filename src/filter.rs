use crate::applicability::ApplicabilityResolver;
use crate::error::FilterError;
use crate::page_info::{ModelEntry, PageInfo, TypeEntry};
use serde_json::Value;
use tracing::{debug, warn};

/// Kept/dropped counts for one filtering pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterStats {
    pub kept: usize,
    pub dropped: usize,
}

impl FilterStats {
    fn add(&mut self, other: FilterStats) {
        self.kept += other.kept;
        self.dropped += other.dropped;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOutcome {
    Filtered(FilterStats),
    /// The page info carried no `workflows`; it was left untouched.
    MissingWorkflows,
}

/// Removes workflow models that do not apply to `page_path`.
///
/// Works in place on the typed page info. Only the `models` list of each
/// workflow type is replaced, and surviving entries keep their order.
pub fn filter_page_info<R>(
    page_info: &mut PageInfo,
    page_path: &str,
    resolver: &R,
) -> FilterOutcome
where
    R: ApplicabilityResolver + ?Sized,
{
    let Some(workflows) = page_info.workflows.as_mut() else {
        warn!("No workflows found in existing page info. Check the order of page info providers.");
        return FilterOutcome::MissingWorkflows;
    };

    let mut stats = FilterStats::default();
    for (workflow_type, type_entry) in workflows.iter_mut() {
        let type_stats = filter_type_entry(type_entry, page_path, resolver);
        debug!(
            "Filtered workflow type {} for {}: kept {}, dropped {}",
            workflow_type, page_path, type_stats.kept, type_stats.dropped
        );
        stats.add(type_stats);
    }
    FilterOutcome::Filtered(stats)
}

/// JSON boundary for [`filter_page_info`].
///
/// Malformed shapes are reported as structural errors rather than skipped.
pub fn filter_page_info_json<R>(
    page_info: Value,
    page_path: &str,
    resolver: &R,
) -> Result<(Value, FilterOutcome), FilterError>
where
    R: ApplicabilityResolver + ?Sized,
{
    if !page_info.is_object() {
        return Err(FilterError::NotAnObject);
    }
    let mut typed: PageInfo = serde_json::from_value(page_info)?;
    let outcome = filter_page_info(&mut typed, page_path, resolver);
    Ok((serde_json::to_value(typed)?, outcome))
}

pub fn filter_type_entry<R>(type_entry: &mut TypeEntry, page_path: &str, resolver: &R) -> FilterStats
where
    R: ApplicabilityResolver + ?Sized,
{
    let before = type_entry.models.len();
    let models = std::mem::take(&mut type_entry.models);
    type_entry.models = models
        .into_iter()
        .filter(|model| is_applicable(model, page_path, resolver))
        .collect();
    let kept = type_entry.models.len();
    FilterStats {
        kept,
        dropped: before - kept,
    }
}

fn is_applicable<R>(model: &ModelEntry, page_path: &str, resolver: &R) -> bool
where
    R: ApplicabilityResolver + ?Sized,
{
    let Some(rule) = resolver.lookup(model.wid()) else {
        debug!("Workflow model {} not found, dropping it", model.wid());
        return false;
    };
    match rule.allows(model.wid(), page_path) {
        Ok(allowed) => allowed,
        Err(e) => {
            warn!("{}; dropping the model", e);
            false
        }
    }
}
