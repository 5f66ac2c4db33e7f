//! Tests for the post-processing pipeline

use std::sync::Arc;
use serde_json::json;
use super::mock_plugins::*;
use crate::model::{Event, Group, Project};
use crate::plugin::context::PluginContext;
use crate::plugin::dispatch::{collect_actions, collect_annotations, post_process_group, preprocess_event};
use crate::plugin::bases::IssueTrackingPlugin;
use crate::plugin::instance::PluginCatalog;
use crate::plugin::manager::PluginManager;
use crate::plugin::settings::PluginSettings;
use crate::plugin::traits::{Plugin, PluginClass};

struct Pipeline {
    manager: PluginManager,
    notifier: Arc<MockNotifier>,
    forwarder: Arc<MockForwarder>,
}

fn pipeline() -> Pipeline {
    let catalog = Arc::new(PluginCatalog::new(PluginSettings::default()));
    let notifier = Arc::new(MockNotifier::new());
    let forwarder = Arc::new(MockForwarder::new());
    install(&catalog, MockNotifier::CLASS_PATH, Arc::clone(&notifier));
    install(&catalog, MockForwarder::CLASS_PATH, Arc::clone(&forwarder));

    let manager = PluginManager::new(
        catalog,
        vec![MockNotifier::CLASS_PATH.to_string(), MockForwarder::CLASS_PATH.to_string()],
    );
    manager.register::<MockTagger>();
    manager.register::<MockIssueTracker>();
    manager.register::<PanickingPlugin>();
    manager.register::<MockPreprocessor>();

    Pipeline { manager, notifier, forwarder }
}

#[tokio::test]
async fn test_post_process_runs_enabled_plugins() {
    let Pipeline { manager, notifier, forwarder } = pipeline();
    let ctx = PluginContext::in_memory();
    let project = Project::new(1, 1, "backend");
    let group = Group::new(7, 1, "boom");
    let mut event = Event::sample(&project);
    event.message = "boom".to_string();

    notifier.enable(&ctx, &project).unwrap();
    notifier
        .set_option(&ctx, "endpoint", json!("https://hooks.example.com"), Some(1), None)
        .unwrap();

    let report = post_process_group(&manager, &ctx, &event, &group, &project, &[]).await;

    assert_eq!(report.notified, vec!["mock-notifier"]);
    assert_eq!(report.forwarded, vec!["mock-forwarder"]);
    assert_eq!(report.tags, vec![("mock".to_string(), "boom".to_string())]);
    assert_eq!(report.failed, vec!["panicking-plugin"]);
    assert!(report.processed.contains(&"mock-tagger".to_string()));
    assert!(!report.processed.contains(&"mock-tracker".to_string()));

    assert_eq!(*notifier.sent.lock(), vec![7]);
    assert_eq!(forwarder.forwarded.lock().as_slice(), &[event.event_id.clone()]);
}

#[tokio::test]
async fn test_post_process_skips_unconfigured_notifier() {
    let Pipeline { manager, notifier, .. } = pipeline();
    let ctx = PluginContext::in_memory();
    let project = Project::new(1, 1, "backend");
    let group = Group::new(7, 1, "boom");
    let event = Event::sample(&project);

    notifier.enable(&ctx, &project).unwrap();
    let report = post_process_group(&manager, &ctx, &event, &group, &project, &[]).await;

    assert!(report.notified.is_empty());
    assert_eq!(notifier.sent_count(), 0);
    assert!(report.processed.contains(&"mock-notifier".to_string()));
}

#[tokio::test]
async fn test_post_process_respects_forwarding_rate_limit() {
    let Pipeline { manager, forwarder, .. } = pipeline();
    let ctx = PluginContext::in_memory();
    let project = Project::new(1, 1, "backend");
    let group = Group::new(7, 1, "boom");
    let event = Event::sample(&project);

    for _ in 0..3 {
        post_process_group(&manager, &ctx, &event, &group, &project, &[]).await;
    }
    assert_eq!(forwarder.forwarded.lock().len(), 2);
}

#[test]
fn test_preprocess_event_applies_v2_preprocessors() {
    let Pipeline { manager, .. } = pipeline();

    let data = preprocess_event(&manager, json!({"message": "boom"}));
    assert_eq!(data, json!({"message": "boom", "processed": true}));

    // Non-object data is left untouched
    assert_eq!(preprocess_event(&manager, json!("raw")), json!("raw"));
}

#[tokio::test]
async fn test_collect_annotations_and_actions() {
    let Pipeline { manager, .. } = pipeline();
    let ctx = PluginContext::in_memory();
    let project = Project::new(1, 1, "backend");
    let group = Group::new(7, 1, "boom");

    let tracker = manager.get("mock-tracker").unwrap();
    tracker.enable(&ctx, &project).unwrap();
    assert!(collect_annotations(&manager, &ctx, &project, &group).is_empty());

    let issue_tracker = tracker.as_issue_tracker().unwrap();
    let form = [("title".to_string(), json!("Crash"))].into_iter().collect();
    issue_tracker
        .open_issue(&ctx, &group, &project, None, &form, None)
        .await
        .unwrap();

    let annotations = collect_annotations(&manager, &ctx, &project, &group);
    assert_eq!(annotations.len(), 1);
    assert_eq!(annotations[0].0, "mock-tracker");
    assert_eq!(annotations[0].1.description, "MOCK-42");

    let actions = collect_actions(&manager, &ctx, &project, &group);
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0].1.label, "Create Mock Issue");
}
