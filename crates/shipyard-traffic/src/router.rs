//! Traffic routing — resolves application keys to production selectors.
//!
//! The router maintains a mapping from `{namespace}/{name}` keys to the
//! selector currently serving production traffic. A selector names the
//! application and the color of the blue/green pair that is live; flips
//! happen under the write lock, so readers observe either the old or the
//! new selector, never a mix.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::debug;

use shipyard_state::Color;

/// The production traffic selector for one application.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Selector {
    /// Label map matched by the underlying service (`app`, `color`).
    pub labels: HashMap<String, String>,
    /// Port traffic is forwarded to.
    pub port: u16,
}

impl Selector {
    /// Selector targeting one color of an application's blue/green pair.
    pub fn for_color(name: &str, color: Color, port: u16) -> Self {
        let mut labels = HashMap::new();
        labels.insert("app".to_string(), name.to_string());
        labels.insert("color".to_string(), color.as_str().to_string());
        Self { labels, port }
    }

    /// The color this selector routes to, if the label is present.
    pub fn color(&self) -> Option<&str> {
        self.labels.get("color").map(String::as_str)
    }
}

/// Routes production traffic by application key.
#[derive(Clone)]
pub struct TrafficRouter {
    routes: Arc<RwLock<HashMap<String, Selector>>>,
}

impl TrafficRouter {
    pub fn new() -> Self {
        Self {
            routes: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Install or replace the production selector for an application.
    ///
    /// Replacement is atomic with respect to `route`: a concurrent reader
    /// sees the previous selector or the new one.
    pub fn set_route(&self, app_key: &str, selector: Selector) {
        let mut routes = self.routes.write().expect("routes lock");
        debug!(
            app = app_key,
            color = selector.color().unwrap_or("-"),
            port = selector.port,
            "production selector updated"
        );
        routes.insert(app_key.to_string(), selector);
    }

    /// The selector currently serving production traffic, if any.
    pub fn route(&self, app_key: &str) -> Option<Selector> {
        let routes = self.routes.read().expect("routes lock");
        routes.get(app_key).cloned()
    }

    /// Remove an application's route entirely (app deletion).
    pub fn remove_route(&self, app_key: &str) {
        let mut routes = self.routes.write().expect("routes lock");
        routes.remove(app_key);
    }

    /// List all routed application keys.
    pub fn list_routes(&self) -> Vec<String> {
        let routes = self.routes.read().expect("routes lock");
        routes.keys().cloned().collect()
    }
}

impl Default for TrafficRouter {
    fn default() -> Self {
        Self::new()
    }
}
