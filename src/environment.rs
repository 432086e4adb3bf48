use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::RwLock;

const ENV_DEV_MODE: &str = "INSIGHTS_DEV_MODE";
const ENV_HOST: &str = "INSIGHTS_HOST";

/// Where the host application is running and which build it is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentContext {
    pub dev_mode: bool,
    pub host: String,
    /// Free-form build metadata, attached to exceptions as JSON text.
    pub build: Value,
}

impl EnvironmentContext {
    pub fn new(dev_mode: bool, host: impl Into<String>, build: Value) -> Self {
        Self {
            dev_mode,
            host: host.into(),
            build,
        }
    }

    pub fn from_env() -> Self {
        let dev_mode = std::env::var(ENV_DEV_MODE)
            .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1"))
            .unwrap_or(false);
        let host = std::env::var(ENV_HOST).unwrap_or_else(|_| "unknown".to_string());

        Self {
            dev_mode,
            host,
            build: json!({
                "name": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION"),
            }),
        }
    }
}

/// Read access to the current environment. Read on every call, so an
/// implementation may change its answer over time.
pub trait Environment: Send + Sync {
    fn current(&self) -> EnvironmentContext;
}

impl Environment for EnvironmentContext {
    fn current(&self) -> EnvironmentContext {
        self.clone()
    }
}

/// An environment the host can update at runtime (e.g. after the host name
/// becomes known).
#[derive(Debug)]
pub struct SharedEnvironment {
    inner: RwLock<EnvironmentContext>,
}

impl SharedEnvironment {
    pub fn new(context: EnvironmentContext) -> Self {
        Self {
            inner: RwLock::new(context),
        }
    }

    pub fn replace(&self, context: EnvironmentContext) {
        *self.inner.write().unwrap_or_else(|p| p.into_inner()) = context;
    }
}

impl Environment for SharedEnvironment {
    fn current(&self) -> EnvironmentContext {
        self.inner.read().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_environment_reflects_replacement() {
        let env = SharedEnvironment::new(EnvironmentContext::new(false, "web", Value::Null));
        assert_eq!(env.current().host, "web");

        env.replace(EnvironmentContext::new(true, "excel", json!({ "commit": "abc" })));
        let current = env.current();
        assert!(current.dev_mode);
        assert_eq!(current.host, "excel");
        assert_eq!(current.build["commit"], "abc");
    }
}
