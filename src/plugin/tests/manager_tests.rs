//! Tests for the Plugin Manager
//!
//! Registration, lookups, version filtering and the `first` hook helper.

use std::sync::Arc;
use super::mock_plugins::*;
use crate::model::Project;
use crate::plugin::context::PluginContext;
use crate::plugin::descriptor::PluginVersion;
use crate::plugin::error::PluginError;
use crate::plugin::instance::PluginCatalog;
use crate::plugin::manager::PluginManager;
use crate::plugin::settings::PluginSettings;
use crate::plugin::traits::{Plugin, PluginClass};

fn empty_manager() -> PluginManager {
    PluginManager::new(Arc::new(PluginCatalog::new(PluginSettings::default())), Vec::new())
}

fn populated_manager() -> PluginManager {
    let manager = empty_manager();
    manager.register::<MockTagger>();
    manager.register::<MockNotifier>();
    manager.register::<MockIssueTracker>();
    manager.register::<MockForwarder>();
    manager.register::<DisabledPlugin>();
    manager
}

fn titles(plugins: &[Arc<dyn Plugin>]) -> Vec<String> {
    plugins.iter().map(|p| p.title().to_string()).collect()
}

#[test]
fn test_all_is_sorted_by_title_and_skips_disabled() {
    let manager = populated_manager();

    assert_eq!(
        titles(&manager.all(None)),
        vec!["Mock Forwarder", "Mock Notifier", "Mock Tagger", "Mock Tracker"]
    );
    assert_eq!(manager.len(), 4);
    assert!(!manager.is_empty());
    assert!(!manager.exists("disabled-plugin"));
}

#[test]
fn test_all_filters_by_version() {
    let manager = populated_manager();

    assert_eq!(titles(&manager.all(Some(PluginVersion::V2))), vec!["Mock Tracker"]);
    assert_eq!(manager.all(Some(PluginVersion::V1)).len(), 3);
}

#[test]
fn test_get_and_exists() {
    let manager = populated_manager();

    assert!(manager.exists("mock-notifier"));
    assert_eq!(manager.get("mock-tagger").unwrap().title(), "Mock Tagger");

    let err = manager.get("missing").err().unwrap();
    assert!(matches!(err, PluginError::PluginNotFound { ref slug } if slug == "missing"));
}

#[test]
fn test_register_and_unregister() {
    let manager = empty_manager();
    assert!(manager.is_empty());

    manager.register::<MockNotifier>();
    manager.register::<MockNotifier>();
    assert_eq!(manager.len(), 1);

    assert!(manager.unregister(MockNotifier::CLASS_PATH));
    assert!(!manager.unregister(MockNotifier::CLASS_PATH));
    assert!(!manager.exists("mock-notifier"));

    // The catalog still knows the class, so it can come back by path
    manager.register_path(MockNotifier::CLASS_PATH).unwrap();
    assert!(manager.exists("mock-notifier"));

    let err = manager.register_path("nope.Missing").unwrap_err();
    assert!(matches!(err, PluginError::ClassNotRegistered { .. }));
}

#[test]
fn test_config_disabled_slugs() {
    let manager = populated_manager().with_disabled(vec!["mock-tagger"]);
    assert!(!manager.exists("mock-tagger"));

    manager.set_disabled("mock-tagger", false);
    assert!(manager.exists("mock-tagger"));
}

#[test]
fn test_failing_factories_do_not_break_lookups() {
    let manager = empty_manager();
    manager.register::<BrokenPlugin>();
    manager.register::<MisconfiguredPlugin>();
    manager.register::<MockTagger>();

    assert_eq!(titles(&manager.all(None)), vec!["Mock Tagger"]);
    assert_eq!(manager.class_paths().len(), 3);
}

#[test]
fn test_for_project_respects_project_options() {
    let manager = populated_manager();
    let ctx = PluginContext::in_memory();
    let project = Project::new(1, 1, "backend");

    // Notifier defaults off, tagger and forwarder default on
    let enabled = titles(&manager.for_project(&ctx, &project, Some(PluginVersion::V1)));
    assert_eq!(enabled, vec!["Mock Forwarder", "Mock Tagger"]);

    let notifier = manager.get("mock-notifier").unwrap();
    notifier.enable(&ctx, &project).unwrap();
    manager.get("mock-tagger").unwrap().disable(&ctx, &project).unwrap();

    let enabled = titles(&manager.for_project(&ctx, &project, Some(PluginVersion::V1)));
    assert_eq!(enabled, vec!["Mock Forwarder", "Mock Notifier"]);

    // Other projects are unaffected
    let other = Project::new(2, 1, "frontend");
    let enabled = titles(&manager.for_project(&ctx, &other, Some(PluginVersion::V1)));
    assert_eq!(enabled, vec!["Mock Forwarder", "Mock Tagger"]);
}

#[test]
fn test_for_project_skips_plugins_with_broken_options() {
    let manager = populated_manager();
    let ctx = PluginContext::in_memory();
    let project = Project::new(1, 1, "backend");

    let tagger = manager.get("mock-tagger").unwrap();
    tagger
        .set_option(&ctx, "enabled", serde_json::json!("yes please"), Some(project.id), None)
        .unwrap();

    let enabled = titles(&manager.for_project(&ctx, &project, Some(PluginVersion::V1)));
    assert_eq!(enabled, vec!["Mock Forwarder"]);
}

#[test]
fn test_configurable_and_site_plugins() {
    let manager = populated_manager();
    let ctx = PluginContext::in_memory();
    let project = Project::new(1, 1, "backend");

    assert_eq!(
        titles(&manager.configurable_for_project(&ctx, &project, None)),
        vec!["Mock Notifier", "Mock Tracker"]
    );
    assert_eq!(
        titles(&manager.plugin_that_can_be_configured()),
        vec!["Mock Notifier", "Mock Tracker"]
    );
    assert!(manager.for_site(None).is_empty());
}

#[test]
fn test_first_skips_failures_and_returns_first_result() {
    let manager = populated_manager();
    let mut visited = Vec::new();

    let result = manager.first("get_issue_label", None, |plugin| {
        visited.push(plugin.slug().to_string());
        match plugin.slug() {
            "mock-forwarder" => Err(PluginError::execution_failed("boom")),
            "mock-notifier" => Ok(None),
            other => Ok(Some(other.to_string())),
        }
    });

    assert_eq!(result, Some("mock-tagger".to_string()));
    assert_eq!(visited, vec!["mock-forwarder", "mock-notifier", "mock-tagger"]);
}

#[test]
fn test_first_skips_panicking_hook() {
    let manager = populated_manager();

    let result = manager.first("get_issue_label", None, |plugin| match plugin.slug() {
        "mock-notifier" => panic!("hook exploded"),
        "mock-tagger" => Ok(Some(plugin.slug().to_string())),
        _ => Ok(None),
    });

    assert_eq!(result, Some("mock-tagger".to_string()));
}

#[test]
fn test_first_without_result() {
    let manager = populated_manager();
    let result: Option<u32> = manager.first("noop", Some(PluginVersion::V2), |_| Ok(None));
    assert!(result.is_none());
}

#[test]
fn test_installed_instances_are_shared() {
    let catalog = Arc::new(PluginCatalog::new(PluginSettings::default()));
    let notifier = Arc::new(MockNotifier::new());
    install(&catalog, MockNotifier::CLASS_PATH, Arc::clone(&notifier));

    let manager = PluginManager::new(catalog, vec![MockNotifier::CLASS_PATH.to_string()]);
    let registered = manager.get("mock-notifier").unwrap();
    assert!(std::ptr::eq(
        Arc::as_ptr(&registered) as *const u8,
        Arc::as_ptr(&notifier) as *const u8
    ));
}
