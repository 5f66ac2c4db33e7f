//! Post-processing dispatch
//!
//! Runs the plugin hooks of the event pipeline. Every hook goes through
//! safe execution, so one failing plugin only removes itself from the
//! current run.

use log::{debug, info};
use serde::Serialize;
use serde_json::Value;
use crate::model::{Event, Group, Project};
use super::context::PluginContext;
use super::descriptor::PluginVersion;
use super::manager::PluginManager;
use super::safe::{safe_execute, safe_execute_async};
use super::traits::{PluginAction, PluginAnnotation};

/// What happened to one event in the pipeline
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PostProcessReport {
    /// Plugins whose `post_process` hook completed
    pub processed: Vec<String>,
    pub forwarded: Vec<String>,
    pub notified: Vec<String>,
    /// Tags contributed by tagging plugins
    pub tags: Vec<(String, String)>,
    /// Plugins with at least one failed hook
    pub failed: Vec<String>,
}

impl PostProcessReport {
    fn fail(&mut self, slug: &str) {
        if !self.failed.iter().any(|s| s == slug) {
            self.failed.push(slug.to_string());
        }
    }
}

/// Run every version 1 plugin enabled for the project over an event
pub async fn post_process_group(
    manager: &PluginManager,
    ctx: &PluginContext,
    event: &Event,
    group: &Group,
    project: &Project,
    rules: &[String],
) -> PostProcessReport {
    let mut report = PostProcessReport::default();

    for plugin in manager.for_project(ctx, project, Some(PluginVersion::V1)) {
        let slug = plugin.slug().to_string();
        debug!("post_process.plugin slug={} event_id={}", slug, event.event_id);

        match safe_execute_async(&slug, "post_process", plugin.post_process(ctx, event, group, project)).await {
            Some(()) => report.processed.push(slug.clone()),
            None => report.fail(&slug),
        }

        if let Some(forwarder) = plugin.as_data_forwarder() {
            match safe_execute_async(&slug, "forward_event", forwarder.forward(ctx, event, project)).await {
                Some(true) => report.forwarded.push(slug.clone()),
                Some(false) => {}
                None => report.fail(&slug),
            }
        }

        if let Some(notifier) = plugin.as_notifier() {
            let should_notify = safe_execute(&slug, "should_notify", || notifier.should_notify(ctx, group, project));
            match should_notify {
                Some(true) => {
                    match safe_execute_async(&slug, "notify", notifier.rule_notify(ctx, event, group, project, rules)).await {
                        Some(true) => report.notified.push(slug.clone()),
                        Some(false) => {}
                        None => report.fail(&slug),
                    }
                }
                Some(false) => {}
                None => report.fail(&slug),
            }
        }

        if plugin.as_tagger().is_some() {
            if let Some(tags) = safe_execute(&slug, "get_tags", || Ok(plugin.get_tags(event))) {
                for tag in tags {
                    if !report.tags.contains(&tag) {
                        report.tags.push(tag);
                    }
                }
            } else {
                report.fail(&slug);
            }
        }
    }

    info!(
        "post_process.complete event_id={} processed={} forwarded={} notified={} failed={}",
        event.event_id,
        report.processed.len(),
        report.forwarded.len(),
        report.notified.len(),
        report.failed.len()
    );
    report
}

/// Apply the event preprocessors of every version 2 plugin to raw event data
pub fn preprocess_event(manager: &PluginManager, data: Value) -> Value {
    let mut data = data;

    for plugin in manager.all(Some(PluginVersion::V2)) {
        let slug = plugin.slug();
        let processors = match safe_execute(slug, "get_event_preprocessors", || {
            Ok(plugin.get_event_preprocessors(&data))
        }) {
            Some(processors) => processors,
            None => continue,
        };

        for processor in processors {
            if let Some(Some(result)) = safe_execute(slug, "preprocess_event", || Ok(processor(&data))) {
                data = result;
            }
        }
    }

    data
}

/// Annotations of every plugin enabled for the project, tagged with the slug
pub fn collect_annotations(
    manager: &PluginManager,
    ctx: &PluginContext,
    project: &Project,
    group: &Group,
) -> Vec<(String, PluginAnnotation)> {
    manager
        .for_project(ctx, project, None)
        .into_iter()
        .flat_map(|plugin| {
            let slug = plugin.slug().to_string();
            safe_execute(&slug, "get_annotations", || plugin.get_annotations(ctx, group))
                .unwrap_or_default()
                .into_iter()
                .map(move |annotation| (slug.clone(), annotation))
        })
        .collect()
}

/// Actions of every plugin enabled for the project
pub fn collect_actions(
    manager: &PluginManager,
    ctx: &PluginContext,
    project: &Project,
    group: &Group,
) -> Vec<(String, PluginAction)> {
    manager
        .for_project(ctx, project, None)
        .into_iter()
        .flat_map(|plugin| {
            let slug = plugin.slug().to_string();
            safe_execute(&slug, "get_actions", || Ok(plugin.get_actions(ctx, group)))
                .unwrap_or_default()
                .into_iter()
                .map(move |action| (slug.clone(), action))
        })
        .collect()
}
