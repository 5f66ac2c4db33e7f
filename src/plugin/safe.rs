//! Safe hook execution
//!
//! A failing plugin must never break the caller. These wrappers run a hook,
//! log errors and panics against the plugin's log target, and turn the
//! failure into `None` so the caller can skip that plugin.

use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use futures::FutureExt;
use log::error;
use super::error::PluginResult;

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn target_for(slug: &str) -> String {
    format!("sentry.plugins.{}", slug)
}

/// Run a synchronous hook, swallowing its errors and panics
pub fn safe_execute<T, F>(slug: &str, hook: &str, f: F) -> Option<T>
where
    F: FnOnce() -> PluginResult<T>,
{
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => Some(value),
        Ok(Err(e)) => {
            error!(target: target_for(slug).as_str(), "{}.failed: {}", hook, e);
            None
        }
        Err(payload) => {
            error!(target: target_for(slug).as_str(), "{}.panicked: {}", hook, panic_message(payload.as_ref()));
            None
        }
    }
}

/// Run an asynchronous hook, swallowing its errors and panics
pub async fn safe_execute_async<T, Fut>(slug: &str, hook: &str, fut: Fut) -> Option<T>
where
    Fut: Future<Output = PluginResult<T>>,
{
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(Ok(value)) => Some(value),
        Ok(Err(e)) => {
            error!(target: target_for(slug).as_str(), "{}.failed: {}", hook, e);
            None
        }
        Err(payload) => {
            error!(target: target_for(slug).as_str(), "{}.panicked: {}", hook, panic_message(payload.as_ref()));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::error::PluginError;

    #[test]
    fn test_success_passes_through() {
        assert_eq!(safe_execute("test", "hook", || Ok(5)), Some(5));
    }

    #[test]
    fn test_error_becomes_none() {
        let result: Option<u32> = safe_execute("test", "hook", || Err(PluginError::validation("bad")));
        assert!(result.is_none());
    }

    #[test]
    fn test_panic_becomes_none() {
        let result: Option<u32> = safe_execute("test", "hook", || -> PluginResult<u32> { panic!("boom") });
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_async_variants() {
        assert_eq!(safe_execute_async("test", "hook", async { Ok::<_, PluginError>(1) }).await, Some(1));

        let failed: Option<u8> = safe_execute_async("test", "hook", async {
            Err(PluginError::host_error("example.com"))
        }).await;
        assert!(failed.is_none());

        let panicked: Option<u8> = safe_execute_async("test", "hook", async {
            if true {
                panic!("async boom");
            }
            Ok::<u8, PluginError>(0)
        }).await;
        assert!(panicked.is_none());
    }
}
