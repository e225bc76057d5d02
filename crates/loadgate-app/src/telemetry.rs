//! Tracing bootstrap.
//!
//! The base verbosity comes from `LOG_LEVEL` (default `info`). Individual
//! components can be tuned with `<COMPONENT>_LOG_LEVEL` variables, which
//! map to per-target filter directives.

use tracing_subscriber::EnvFilter;

/// Component names accepted as `<NAME>_LOG_LEVEL` and the tracing target
/// each one maps to.
const COMPONENT_TARGETS: &[(&str, &str)] = &[
    ("EVENTBUS", "loadgate_bus"),
    ("EVENTSTORE", "loadgate_event_store"),
    ("ACCOUNT", "loadgate_account"),
    ("TXNCREATOR", "loadgate_txn"),
    ("READER", "loadgate_app::reader"),
    ("WRITER", "loadgate_app::writer"),
    ("PROCESSMGR", "loadgate_app::process_manager"),
    ("RUNNER", "loadgate_app::runner"),
];

fn filter_directives() -> String {
    let base = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_owned());
    let mut directives = base;

    for (component, target) in COMPONENT_TARGETS {
        if let Ok(level) = std::env::var(format!("{component}_LOG_LEVEL")) {
            if !level.is_empty() {
                directives.push_str(&format!(",{target}={level}"));
            }
        }
    }

    directives
}

/// Installs the global tracing subscriber, emitting structured JSON
/// log lines.
pub fn init() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter_directives()))
        .json()
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_targets_are_unique() {
        let mut names: Vec<&str> = COMPONENT_TARGETS.iter().map(|(name, _)| *name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), COMPONENT_TARGETS.len());
    }
}
