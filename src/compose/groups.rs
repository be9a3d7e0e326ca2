//! Proxy group resolution and merging.
//!
//! # Responsibilities
//! - Classify addon groups into literal and snippet groups, in declared order
//! - Resolve snippet groups against the baseline proxies
//! - Merge addon groups into the baseline list per merge mode
//! - Optionally resolve snippet groups the baseline itself carries
//!
//! # Design Decisions
//! - A failed snippet never aborts composition; it is recorded in the report
//! - `update` overwrites baseline groups by name and never adds new ones
//! - Later addon groups win when names repeat
//! - Once cancelled, remaining snippets are reported without being run

use std::collections::{HashMap, HashSet};

use crate::compose::mode::MergeMode;
use crate::compose::report::{ComposeError, ComposeReport, GroupFailure, GroupOrigin, ResolvedGroup};
use crate::model::{GroupMembers, ProxyGroup, SnippetDetection};
use crate::observability::metrics;
use crate::script::{Cancellation, ProxyBinding, ScriptError, ScriptEvaluator};

/// Resolves snippet groups and merges group lists.
#[derive(Debug, Clone, Copy)]
pub struct GroupComposer<'a> {
    evaluator: &'a ScriptEvaluator,
    detection: SnippetDetection,
    resolve_baseline: bool,
    cancel: &'a Cancellation,
}

impl<'a> GroupComposer<'a> {
    pub fn new(
        evaluator: &'a ScriptEvaluator,
        detection: SnippetDetection,
        resolve_baseline: bool,
        cancel: &'a Cancellation,
    ) -> Self {
        Self {
            evaluator,
            detection,
            resolve_baseline,
            cancel,
        }
    }

    /// Merge `addon` into `baseline` in place.
    pub fn compose(
        &self,
        baseline: &mut Vec<ProxyGroup>,
        addon: &[ProxyGroup],
        binding: &ProxyBinding,
        mode: &MergeMode,
        report: &mut ComposeReport,
    ) -> Result<(), ComposeError> {
        if !mode.merges() {
            tracing::debug!(mode = %mode, "Unrecognised merge mode, keeping baseline groups");
            return Ok(());
        }

        check_names(addon, GroupOrigin::Addon)?;
        check_names(baseline, GroupOrigin::Baseline)?;

        let resolved = self.resolve_addon(addon, binding, report);
        let addon_groups: Vec<ProxyGroup> = addon
            .iter()
            .map(|group| match resolved.get(group.name.as_str()) {
                Some(names) => group.with_resolved(names),
                None => group.clone(),
            })
            .collect();

        // Only resolved addon groups can overwrite a baseline group.
        let mut matched: HashMap<&str, &ProxyGroup> = HashMap::new();
        if *mode == MergeMode::Update {
            for group in addon_groups.iter().filter(|g| resolved.contains_key(g.name.as_str())) {
                matched.insert(group.name.as_str(), group);
            }
        }

        if self.resolve_baseline {
            let replaced: HashSet<&str> = matched.keys().copied().collect();
            self.resolve_baseline_groups(baseline, &replaced, binding, report);
        }

        match mode {
            MergeMode::Insert => {
                baseline.splice(0..0, addon_groups.iter().cloned());
            }
            MergeMode::Append => baseline.extend(addon_groups.iter().cloned()),
            MergeMode::Update => {
                for group in baseline.iter_mut() {
                    if let Some(&replacement) = matched.get(group.name.as_str()) {
                        *group = replacement.clone();
                    }
                }
            }
            MergeMode::Other(_) => {}
        }

        Ok(())
    }

    /// Evaluate every addon snippet group in declared order.
    fn resolve_addon<'g>(
        &self,
        addon: &'g [ProxyGroup],
        binding: &ProxyBinding,
        report: &mut ComposeReport,
    ) -> HashMap<&'g str, Vec<String>> {
        let snippets: Vec<(&str, &str)> = addon
            .iter()
            .filter_map(|group| match group.members(self.detection) {
                GroupMembers::Snippet(source) => Some((group.name.as_str(), source)),
                GroupMembers::Literal(_) => None,
            })
            .collect();

        let mut resolved = HashMap::with_capacity(snippets.len());
        for (name, source) in snippets {
            match self.resolve(name, source, binding, GroupOrigin::Addon, report) {
                Some(names) => {
                    resolved.insert(name, names);
                }
                None => {
                    resolved.remove(name);
                }
            }
        }
        resolved
    }

    /// Resolve baseline snippet groups in place. Failures keep the group as is.
    fn resolve_baseline_groups(
        &self,
        baseline: &mut [ProxyGroup],
        replaced: &HashSet<&str>,
        binding: &ProxyBinding,
        report: &mut ComposeReport,
    ) {
        for group in baseline.iter_mut() {
            if replaced.contains(group.name.as_str()) {
                continue;
            }
            let names = match group.members(self.detection) {
                GroupMembers::Snippet(source) => {
                    self.resolve(&group.name, source, binding, GroupOrigin::Baseline, report)
                }
                GroupMembers::Literal(_) => None,
            };
            if let Some(names) = names {
                *group = group.with_resolved(&names);
            }
        }
    }

    fn resolve(
        &self,
        name: &str,
        source: &str,
        binding: &ProxyBinding,
        origin: GroupOrigin,
        report: &mut ComposeReport,
    ) -> Option<Vec<String>> {
        let result = if self.cancel.is_cancelled() {
            Err(ScriptError::Cancelled)
        } else {
            self.evaluator.evaluate_with(source, binding, self.cancel)
        };
        match result {
            Ok(names) => {
                tracing::debug!(group = %name, origin = %origin, members = names.len(), "Resolved snippet group");
                metrics::record_snippet(origin, true);
                report.resolved.push(ResolvedGroup {
                    group: name.to_string(),
                    origin,
                    members: names.len(),
                });
                Some(names)
            }
            Err(error) => {
                tracing::warn!(group = %name, origin = %origin, error = %error, "Snippet group left unresolved");
                metrics::record_snippet(origin, false);
                report.failures.push(GroupFailure {
                    group: name.to_string(),
                    origin,
                    error,
                });
                None
            }
        }
    }
}

fn check_names(groups: &[ProxyGroup], origin: GroupOrigin) -> Result<(), ComposeError> {
    match groups.iter().position(|g| g.name.is_empty()) {
        Some(index) => Err(ComposeError::MalformedGroup { origin, index }),
        None => Ok(()),
    }
}
