//! Data forwarding plugins
//!
//! Forwarders ship every event of a project to an external sink. A forwarder
//! may declare a rate limit which is enforced per organization.

use std::time::Duration;
use async_trait::async_trait;
use log::info;
use serde_json::Value;
use crate::model::{Event, Project};
use crate::plugin::context::PluginContext;
use crate::plugin::error::PluginResult;
use crate::plugin::traits::Plugin;

#[async_trait]
pub trait DataForwardingPlugin: Plugin {
    /// `(limit, window)`; a zero limit disables rate limiting
    fn rate_limit(&self) -> (u32, Duration) {
        (0, Duration::ZERO)
    }

    fn event_payload(&self, event: &Event) -> Value {
        event.as_payload()
    }

    /// Send one event, reporting whether it was delivered
    async fn forward_event(
        &self,
        ctx: &PluginContext,
        event: &Event,
        project: &Project,
        payload: Value,
    ) -> PluginResult<bool>;

    /// Forward an event unless the organization is rate limited
    async fn forward(&self, ctx: &PluginContext, event: &Event, project: &Project) -> PluginResult<bool> {
        let (limit, window) = self.rate_limit();
        let key = format!("{}:{}", self.conf_key(), project.organization_id);

        if limit > 0 && !window.is_zero() && ctx.rate_limiter().is_limited(&key, limit, window) {
            info!(
                target: self.descriptor().logger_target().as_str(),
                "data_forwarding.skip_rate_limited event_id={} project_id={} organization_id={}",
                event.event_id,
                project.id,
                project.organization_id
            );
            return Ok(false);
        }

        let payload = self.event_payload(event);
        self.forward_event(ctx, event, project, payload).await
    }
}
