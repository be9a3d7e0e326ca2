//! Top-level composition entry point.

use crate::compose::groups::GroupComposer;
use crate::compose::mode::MergeMode;
use crate::compose::report::{ComposeError, ComposeOutcome, ComposeReport};
use crate::compose::rules::compose_rules;
use crate::config::ScriptConfig;
use crate::model::{Document, SnippetDetection};
use crate::script::{Cancellation, ProxyBinding, ScriptEvaluator};
use crate::source::codec;

/// Merges an addon profile into a baseline profile.
#[derive(Debug, Clone)]
pub struct Composer {
    evaluator: ScriptEvaluator,
    detection: SnippetDetection,
    resolve_baseline: bool,
}

impl Default for Composer {
    fn default() -> Self {
        Self::from_config(&ScriptConfig::default())
    }
}

impl Composer {
    pub fn new(evaluator: ScriptEvaluator, detection: SnippetDetection, resolve_baseline: bool) -> Self {
        Self {
            evaluator,
            detection,
            resolve_baseline,
        }
    }

    pub fn from_config(config: &ScriptConfig) -> Self {
        let detection = if config.single_entry_heuristic {
            SnippetDetection::SingleEntry
        } else {
            SnippetDetection::ExplicitOnly
        };
        Self::new(
            ScriptEvaluator::from_config(config),
            detection,
            config.resolve_baseline_snippets,
        )
    }

    /// Compose `addon` into `baseline`.
    ///
    /// Without an addon the baseline is returned untouched, whatever the mode.
    /// Snippet failures do not fail the call; they are listed in the report.
    pub fn compose(
        &self,
        baseline: Document,
        addon: Option<Document>,
        mode: MergeMode,
    ) -> Result<ComposeOutcome, ComposeError> {
        self.compose_with(baseline, addon, mode, &Cancellation::new())
    }

    /// [`compose`](Self::compose) that stops evaluating snippets once
    /// `cancel` fires. Groups not yet resolved are reported as cancelled.
    pub fn compose_with(
        &self,
        mut baseline: Document,
        addon: Option<Document>,
        mode: MergeMode,
        cancel: &Cancellation,
    ) -> Result<ComposeOutcome, ComposeError> {
        let Some(addon) = addon else {
            tracing::debug!(mode = %mode, "No addon profile, returning baseline");
            return Ok(ComposeOutcome {
                document: baseline,
                report: ComposeReport::new(mode, false),
            });
        };

        let mut report = ComposeReport::new(mode.clone(), true);
        let binding = ProxyBinding::new(&baseline.proxies);
        if binding.is_empty() {
            tracing::debug!("Baseline has no proxies, snippets see an empty list");
        }
        let groups = GroupComposer::new(&self.evaluator, self.detection, self.resolve_baseline, cancel);
        groups.compose(
            &mut baseline.proxy_groups,
            &addon.proxy_groups,
            &binding,
            &mode,
            &mut report,
        )?;
        compose_rules(&mut baseline.rules, &addon.rules, &mode);

        tracing::info!(
            mode = %mode,
            proxies = binding.len(),
            groups = baseline.proxy_groups.len(),
            rules = baseline.rules.len(),
            resolved = report.resolved.len(),
            failed = report.failures.len(),
            "Composed profile"
        );

        Ok(ComposeOutcome {
            document: baseline,
            report,
        })
    }

    /// Compose and encode the result as YAML.
    pub fn compose_to_yaml(
        &self,
        baseline: Document,
        addon: Option<Document>,
        mode: MergeMode,
    ) -> Result<(Vec<u8>, ComposeReport), ComposeError> {
        let outcome = self.compose(baseline, addon, mode)?;
        let bytes = codec::serialize(&outcome.document).map_err(ComposeError::Serialize)?;
        Ok((bytes, outcome.report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ProxyGroup;

    fn profile(yaml: &str) -> Document {
        codec::parse(yaml.as_bytes()).unwrap()
    }

    const BASE: &str = r#"
port: 7890
proxies:
  - { name: us1, type: ss }
  - { name: us2, type: ss }
proxy-groups:
  - { name: Auto, type: url-test, proxies: [us1, us2] }
rules:
  - MATCH,Auto
"#;

    #[test]
    fn test_no_addon_returns_baseline_for_every_mode() {
        let composer = Composer::default();
        for mode in ["insert", "append", "update", "", "weird"] {
            let outcome = composer.compose(profile(BASE), None, MergeMode::parse(mode)).unwrap();
            assert_eq!(outcome.document, profile(BASE));
            assert!(!outcome.report.addon_present);
        }
    }

    #[test]
    fn test_addon_passthrough_fields_are_ignored() {
        let addon = profile("mode: global\nrules:\n  - DOMAIN,example.com,DIRECT\n");
        let outcome = Composer::default()
            .compose(profile(BASE), Some(addon), MergeMode::Insert)
            .unwrap();
        assert_eq!(outcome.document.extra.get("port"), Some(&serde_yaml::Value::from(7890)));
        assert_eq!(outcome.document.extra.get("mode"), None);
        assert_eq!(outcome.document.rules, vec!["DOMAIN,example.com,DIRECT", "MATCH,Auto"]);
    }

    #[test]
    fn test_compose_to_yaml_is_deterministic() {
        let addon = profile(
            r#"
proxy-groups:
  - name: B
    proxies: ["def filter(): return [p['name'] for p in proxies][::-1]"]
  - name: A
    proxies: ["def filter(): return ['us1']"]
"#,
        );
        let composer = Composer::default();
        let (first, _) = composer
            .compose_to_yaml(profile(BASE), Some(addon.clone()), MergeMode::Append)
            .unwrap();
        let (second, _) = composer
            .compose_to_yaml(profile(BASE), Some(addon), MergeMode::Append)
            .unwrap();
        assert_eq!(first, second);

        let composed = profile(std::str::from_utf8(&first).unwrap());
        assert_eq!(composed.proxy_groups[1], ProxyGroup::literal("B", ["us2", "us1"]));
    }

    const PROVIDER_ONLY: &str = "proxy-groups:\n- name: Auto\n  type: url-test\n  use:\n  - provider1\n";

    #[test]
    fn test_no_addon_serializes_unchanged() {
        let (yaml, _) = Composer::default()
            .compose_to_yaml(profile(PROVIDER_ONLY), None, MergeMode::Update)
            .unwrap();
        assert_eq!(std::str::from_utf8(&yaml).unwrap(), PROVIDER_ONLY);
    }

    #[test]
    fn test_merged_provider_group_keeps_no_proxies_key() {
        let (yaml, _) = Composer::default()
            .compose_to_yaml(profile(BASE), Some(profile(PROVIDER_ONLY)), MergeMode::Append)
            .unwrap();
        let composed = profile(std::str::from_utf8(&yaml).unwrap());
        assert_eq!(composed.proxy_groups.len(), 2);
        assert_eq!(composed.proxy_groups[1].proxies, None);
    }

    #[test]
    fn test_cancelled_compose_still_merges_literal_groups() {
        let addon = profile(
            r#"
proxy-groups:
  - name: Snippet
    proxies: ["def filter(): return ['us1']"]
  - { name: Plain, proxies: [us1, us2] }
"#,
        );
        let cancel = Cancellation::new();
        cancel.cancel();
        let outcome = Composer::default()
            .compose_with(profile(BASE), Some(addon), MergeMode::Append, &cancel)
            .unwrap();
        assert_eq!(outcome.document.proxy_groups.len(), 3);
        assert_eq!(outcome.report.failed_groups().collect::<Vec<_>>(), vec!["Snippet"]);
        assert_eq!(outcome.document.proxy_groups[2], ProxyGroup::literal("Plain", ["us1", "us2"]));
    }
}
