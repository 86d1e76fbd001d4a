//! Fixed step lists for each run kind.

use sysgauge_types::{RunKind, RunStep};

use crate::recommend::CATALOG;

/// Steps of the tools installation run.
pub const INSTALL_STEPS: [&str; 9] = [
    "Updating package list...",
    "Installing htop...",
    "Installing iotop...",
    "Installing sysstat...",
    "Installing powertop...",
    "Installing lm-sensors...",
    "Installing TLP...",
    "Enabling services...",
    "Detecting sensors...",
];

/// Steps of the system check run.
pub const CHECK_STEPS: [&str; 6] = [
    "Analyzing CPU performance...",
    "Checking memory usage...",
    "Evaluating disk performance...",
    "Monitoring temperature...",
    "Reviewing system configuration...",
    "Generating recommendations...",
];

/// The ordered steps a run of `kind` walks through.
///
/// Tweak runs apply one step per entry in the recommendation catalog.
pub fn plan_for(kind: RunKind) -> Vec<RunStep> {
    let descriptions: Vec<String> = match kind {
        RunKind::Install => INSTALL_STEPS.iter().map(|s| s.to_string()).collect(),
        RunKind::Check => CHECK_STEPS.iter().map(|s| s.to_string()).collect(),
        RunKind::Tweak => CATALOG
            .iter()
            .map(|rec| format!("Applying: {}...", rec.title))
            .collect(),
    };

    descriptions
        .into_iter()
        .enumerate()
        .map(|(index, description)| RunStep { index, description })
        .collect()
}

/// Percent complete after finishing the step at `index` of `total`.
pub fn percent_complete(index: usize, total: usize) -> f64 {
    if total == 0 {
        return 100.0;
    }
    (index + 1) as f64 / total as f64 * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plans_have_fixed_lengths() {
        assert_eq!(plan_for(RunKind::Install).len(), 9);
        assert_eq!(plan_for(RunKind::Check).len(), 6);
        assert_eq!(plan_for(RunKind::Tweak).len(), CATALOG.len());
    }

    #[test]
    fn steps_are_indexed_in_order() {
        for kind in [RunKind::Install, RunKind::Check, RunKind::Tweak] {
            for (i, step) in plan_for(kind).iter().enumerate() {
                assert_eq!(step.index, i);
            }
        }
        assert_eq!(plan_for(RunKind::Install)[0].description, "Updating package list...");
        assert_eq!(plan_for(RunKind::Tweak)[0].description, "Applying: Optimize CPU Usage...");
    }

    #[test]
    fn percent_reaches_hundred_on_last_step() {
        assert_eq!(percent_complete(0, 4), 25.0);
        assert_eq!(percent_complete(3, 4), 100.0);
        assert_eq!(percent_complete(0, 0), 100.0);
    }
}
