//! End-to-end tests of the post-processing pipeline with the built-in
//! integrations talking to a mocked HTTP server.

use std::sync::Arc;
use serde_json::{json, Map, Value};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use sentry_plugins::model::{Event, Group, Project};
use sentry_plugins::plugin::builtin::{
    InterfaceTypesPlugin, PagerDutyPlugin, SplunkPlugin, UrlsPlugin, WebHooksPlugin,
};
use sentry_plugins::plugin::dispatch::collect_annotations;
use sentry_plugins::plugin::{
    builtin, post_process_group, IssueTrackingPlugin, Plugin, PluginCatalog, PluginClass, PluginContext,
    PluginManager, PluginSettings,
};

fn manager_with_pagerduty(events_url: String) -> PluginManager {
    let settings = PluginSettings::default().with_url_prefix("https://sentry.example.com");
    let catalog = PluginCatalog::new(settings.clone());
    catalog.add_class::<WebHooksPlugin>();
    catalog.add_class::<SplunkPlugin>();
    catalog.add_class::<UrlsPlugin>();
    catalog.add_class::<InterfaceTypesPlugin>();
    catalog.add_factory(
        PagerDutyPlugin::CLASS_PATH,
        Arc::new(move || {
            let plugin = PagerDutyPlugin::with_events_url(&settings, &events_url)?;
            Ok(Arc::new(plugin) as Arc<dyn Plugin>)
        }),
    );

    let class_list = [
        WebHooksPlugin::CLASS_PATH,
        SplunkPlugin::CLASS_PATH,
        UrlsPlugin::CLASS_PATH,
        InterfaceTypesPlugin::CLASS_PATH,
        PagerDutyPlugin::CLASS_PATH,
    ]
    .iter()
    .map(|path| path.to_string())
    .collect();

    PluginManager::new(Arc::new(catalog), class_list)
}

#[tokio::test]
async fn test_event_reaches_every_enabled_integration() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/hook"))
        .and(body_partial_json(json!({"project": "backend", "level": "error"})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/services/collector"))
        .and(header("Authorization", "Splunk secret-token"))
        .and(body_partial_json(json!({"index": "main", "source": "sentry"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"text": "Success", "code": 0})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/create_event.json"))
        .and(body_partial_json(json!({"service_key": "pd-key", "event_type": "trigger"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "success"})))
        .expect(1)
        .mount(&server)
        .await;

    let manager = manager_with_pagerduty(format!("{}/create_event.json", server.uri()));
    let ctx = PluginContext::in_memory();
    let project = Project::new(1, 7, "backend");

    for slug in ["webhooks", "splunk", "pagerduty", "interface_types"] {
        manager.get(slug).unwrap().enable(&ctx, &project).unwrap();
    }

    let webhooks = manager.get("webhooks").unwrap();
    webhooks
        .set_option(&ctx, "urls", json!(format!("{}/hook", server.uri())), Some(1), None)
        .unwrap();

    let splunk = manager.get("splunk").unwrap();
    splunk.set_option(&ctx, "instance", json!(server.uri()), Some(1), None).unwrap();
    splunk.set_option(&ctx, "index", json!("main"), Some(1), None).unwrap();
    splunk.set_option(&ctx, "source", json!("sentry"), Some(1), None).unwrap();
    splunk.set_option(&ctx, "token", json!("secret-token"), Some(1), None).unwrap();

    let pagerduty = manager.get("pagerduty").unwrap();
    pagerduty.set_option(&ctx, "service_key", json!("pd-key"), Some(1), None).unwrap();

    let event = Event::sample(&project);
    let group = Group::new(42, project.id, event.display_title());

    let report = post_process_group(&manager, &ctx, &event, &group, &project, &["rule-1".to_string()]).await;

    assert!(report.failed.is_empty(), "failed: {:?}", report.failed);
    assert_eq!(report.forwarded, vec!["splunk"]);

    let mut notified = report.notified.clone();
    notified.sort();
    assert_eq!(notified, vec!["pagerduty", "webhooks"]);

    assert!(report.tags.contains(&("url".to_string(), "http://example.com/foo".to_string())));
    assert!(report.tags.contains(&("interface_type".to_string(), "exception".to_string())));
}

#[tokio::test]
async fn test_failing_integration_does_not_stop_the_pipeline() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/create_event.json"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let manager = manager_with_pagerduty(format!("{}/create_event.json", server.uri()));
    let ctx = PluginContext::in_memory();
    let project = Project::new(2, 7, "frontend");

    for slug in ["webhooks", "pagerduty"] {
        manager.get(slug).unwrap().enable(&ctx, &project).unwrap();
    }
    manager
        .get("webhooks")
        .unwrap()
        .set_option(&ctx, "urls", json!(format!("{}/hook", server.uri())), Some(2), None)
        .unwrap();
    manager
        .get("pagerduty")
        .unwrap()
        .set_option(&ctx, "service_key", json!("pd-key"), Some(2), None)
        .unwrap();

    let event = Event::sample(&project);
    let group = Group::new(5, project.id, event.display_title());
    let report = post_process_group(&manager, &ctx, &event, &group, &project, &[]).await;

    // API failures are swallowed by the notifier, so pagerduty is neither notified nor failed
    assert_eq!(report.notified, vec!["webhooks"]);
    assert!(report.failed.is_empty());
}

#[tokio::test]
async fn test_disabled_project_receives_nothing() {
    let manager = manager_with_pagerduty("http://127.0.0.1:9/create_event.json".to_string());
    let ctx = PluginContext::in_memory();
    let project = Project::new(3, 7, "quiet");

    let event = Event::sample(&project);
    let group = Group::new(1, project.id, event.display_title());
    let report = post_process_group(&manager, &ctx, &event, &group, &project, &[]).await;

    // Only the URL tagger is on by default
    assert_eq!(report.processed, vec!["urls"]);
    assert!(report.notified.is_empty());
    assert!(report.forwarded.is_empty());
}

#[tokio::test]
async fn test_github_issue_is_linked_and_annotated() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/repos/getsentry/sentry/issues"))
        .and(header("Authorization", "Bearer gh-token"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "number": 1347,
            "title": "ZeroDivisionError",
            "html_url": "https://github.com/getsentry/sentry/issues/1347",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let settings = PluginSettings::default();
    let manager = PluginManager::new(Arc::new(builtin::catalog(settings)), builtin::default_class_list());
    let ctx = PluginContext::in_memory();
    let project = Project::new(4, 7, "api");
    let group = Group::new(11, project.id, "ZeroDivisionError");

    let github = manager.get("github").unwrap();
    github.enable(&ctx, &project).unwrap();
    github.set_option(&ctx, "repo", json!("getsentry/sentry"), Some(4), None).unwrap();
    github.set_option(&ctx, "github_url", json!(server.uri()), Some(4), None).unwrap();
    github.set_option(&ctx, "access_token", json!("gh-token"), None, Some(99)).unwrap();

    let tracker = github.as_issue_tracker().unwrap();
    let mut form = Map::new();
    form.insert("title".to_string(), Value::String("ZeroDivisionError".to_string()));
    form.insert("description".to_string(), Value::String("Details".to_string()));

    let linked = tracker
        .open_issue(&ctx, &group, &project, None, &form, Some(99))
        .await
        .unwrap();
    assert_eq!(linked.id, "1347");
    assert_eq!(linked.label, "GH-1347");

    let annotations = collect_annotations(&manager, &ctx, &project, &group);
    assert_eq!(annotations.len(), 1);
    assert_eq!(annotations[0].0, "github");
    assert_eq!(annotations[0].1.description, "GH-1347");
}
