use ahash::AHashMap;
use serde::{Deserialize, Serialize};

pub type RouteId = u32;

/// An external line identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Route {
    pub feed_id: String,
    pub route_id: String,
    pub label: String,
    pub color: String,
}

impl Route {
    pub fn new(feed_id: &str, route_id: &str) -> Self {
        Self {
            feed_id: feed_id.to_string(),
            route_id: route_id.to_string(),
            label: route_id.to_string(),
            color: String::from("000000"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineStyle {
    pub css_class: Option<String>,
    pub dash_array: Vec<f64>,
}

/// Interns routes (feed, route_id) to u32 so the graphs only ever hold handles.
#[derive(Debug, Default)]
pub struct RouteRegistry {
    to_id: AHashMap<(String, String), RouteId>,
    from_id: Vec<Route>,
}

impl RouteRegistry {
    pub fn new() -> Self {
        Self {
            to_id: AHashMap::new(),
            from_id: Vec::new(),
        }
    }

    /// Returns the existing handle when (feed, route_id) is already known; the
    /// first registration's label and color win.
    pub fn get_or_insert(&mut self, route: Route) -> RouteId {
        let key = (route.feed_id.clone(), route.route_id.clone());
        if let Some(&id) = self.to_id.get(&key) {
            id
        } else {
            let id = self.from_id.len() as RouteId;
            self.from_id.push(route);
            self.to_id.insert(key, id);
            id
        }
    }

    pub fn get(&self, id: RouteId) -> Option<&Route> {
        self.from_id.get(id as usize)
    }

    pub fn get_by_val(&self, feed_id: &str, route_id: &str) -> Option<RouteId> {
        self.to_id
            .get(&(feed_id.to_string(), route_id.to_string()))
            .copied()
    }

    pub fn len(&self) -> usize {
        self.from_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.from_id.is_empty()
    }
}
