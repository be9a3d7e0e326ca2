//! Rule list merging.

use crate::compose::mode::MergeMode;

/// Merge addon rules into the baseline rules.
///
/// `update` cannot address individual rules and leaves the baseline as is.
pub fn compose_rules(baseline: &mut Vec<String>, addon: &[String], mode: &MergeMode) {
    match mode {
        MergeMode::Insert => {
            baseline.splice(0..0, addon.iter().cloned());
        }
        MergeMode::Append => baseline.extend_from_slice(addon),
        MergeMode::Update | MergeMode::Other(_) => {}
    }
}
