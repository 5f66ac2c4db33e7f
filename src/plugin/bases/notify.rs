//! Notification plugins
//!
//! Notifiers deliver alerts to a third party. Delivery is skipped when the
//! plugin is not configured for the project or when the project has hit the
//! per-plugin notification rate limit.

use async_trait::async_trait;
use log::info;
use serde_json::{json, Value};
use crate::model::{Event, Group, Notification, Project};
use crate::plugin::context::PluginContext;
use crate::plugin::error::PluginResult;
use crate::plugin::traits::Plugin;

#[async_trait]
pub trait NotificationPlugin: Plugin {
    /// Deliver a notification to the third party
    async fn notify_users(&self, ctx: &PluginContext, notification: &Notification) -> PluginResult<()>;

    /// Rate limit bucket for a project
    fn rate_limit_key(&self, project: &Project) -> String {
        format!("{}:{}", self.conf_key(), project.id)
    }

    fn is_rate_limited(&self, ctx: &PluginContext, project: &Project) -> bool {
        let settings = ctx.settings();
        ctx.rate_limiter().is_limited(
            &self.rate_limit_key(project),
            settings.notify_limit,
            settings.notify_window,
        )
    }

    fn should_notify(&self, ctx: &PluginContext, group: &Group, project: &Project) -> PluginResult<bool> {
        if !self.is_configured(ctx, project)? {
            return Ok(false);
        }

        if self.is_rate_limited(ctx, project) {
            info!(
                target: self.descriptor().logger_target().as_str(),
                "notification.rate_limited project_id={} group_id={}",
                project.id,
                group.id
            );
            return Ok(false);
        }

        Ok(true)
    }

    /// Deliver a notification, reporting whether it went out.
    ///
    /// API and validation failures are logged and reported as `false`
    /// unless `raise_exception` is set; any other failure propagates.
    async fn notify(
        &self,
        ctx: &PluginContext,
        notification: &Notification,
        raise_exception: bool,
    ) -> PluginResult<bool> {
        match self.notify_users(ctx, notification).await {
            Ok(()) => Ok(true),
            Err(err) if err.is_api_error() || err.is_user_facing() => {
                info!(
                    target: self.descriptor().logger_target().as_str(),
                    "notification-plugin.notify-failed event_id={} project_id={} error={}",
                    notification.event.event_id,
                    notification.project.id,
                    err
                );
                if raise_exception {
                    Err(err)
                } else {
                    Ok(false)
                }
            }
            Err(err) => Err(err),
        }
    }

    /// Notify for an event matched by alert rules
    async fn rule_notify(
        &self,
        ctx: &PluginContext,
        event: &Event,
        group: &Group,
        project: &Project,
        rules: &[String],
    ) -> PluginResult<bool> {
        let notification = Notification::new(event.clone(), group.clone(), project.clone())
            .with_rules(rules.to_vec());
        self.notify(ctx, &notification, false).await
    }

    /// Send a sample notification, propagating delivery errors.
    ///
    /// Reports `false` without sending when the project is not configured.
    async fn test_configuration(&self, ctx: &PluginContext, project: &Project) -> PluginResult<bool> {
        if !self.is_configured(ctx, project)? {
            return Ok(false);
        }
        let notification = Notification::sample(project);
        self.notify(ctx, &notification, true).await
    }
}

/// Common group/event summary shared by notifiers
pub fn group_data(ctx: &PluginContext, notification: &Notification) -> Value {
    let Notification { event, group, project, rules } = notification;
    json!({
        "id": group.id.to_string(),
        "project": project.slug,
        "project_name": project.name,
        "project_slug": project.slug,
        "logger": event.logger,
        "level": event.level,
        "culprit": group.culprit,
        "message": event.message,
        "url": group.absolute_url(&ctx.settings().url_prefix),
        "triggering_rules": rules,
    })
}
