//! Request descriptors and per-request attempt tracking

use crate::types::{JsonObject, JsonValue, Method, StringMap};
use std::collections::HashMap;

/// Immutable description of one logical API request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestDescriptor {
    /// Resource path relative to the versioned base URL, already percent-encoded
    pub path: String,
    /// HTTP method
    pub method: Method,
    /// Query parameters (primitive values)
    pub query: JsonObject,
    /// JSON body
    pub body: Option<JsonValue>,
    /// Per-call headers, applied after the client's custom headers
    pub headers: HashMap<String, String>,
}

impl RequestDescriptor {
    /// Create a GET request for a path
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Create a request with an explicit method
    pub fn with_method(method: Method, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method,
            ..Default::default()
        }
    }

    /// Set the method
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Add a query parameter
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    /// Add every entry of an object as query parameters
    #[must_use]
    pub fn query_object(mut self, params: JsonObject) -> Self {
        self.query.extend(params);
        self
    }

    /// Set JSON body
    #[must_use]
    pub fn json(mut self, body: JsonValue) -> Self {
        self.body = Some(body);
        self
    }

    /// Add a header
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Derive the descriptor for a page by merging cursor parameters.
    ///
    /// GET requests take the cursor in the query, every other method in the
    /// body. Colliding keys are replaced; nested values are not merged.
    pub fn with_cursor(&self, cursor: &StringMap) -> Self {
        let mut derived = self.clone();
        if cursor.is_empty() {
            return derived;
        }

        if self.method.uses_query() {
            for (key, value) in cursor {
                derived
                    .query
                    .insert(key.clone(), JsonValue::String(value.clone()));
            }
        } else {
            let mut body = match derived.body.take() {
                Some(JsonValue::Object(map)) => map,
                _ => JsonObject::new(),
            };
            for (key, value) in cursor {
                body.insert(key.clone(), JsonValue::String(value.clone()));
            }
            derived.body = Some(JsonValue::Object(body));
        }
        derived
    }

    /// Copy of this descriptor without a parameter, in both query and body
    pub fn without_param(&self, key: &str) -> Self {
        let mut derived = self.clone();
        derived.query.remove(key);
        if let Some(JsonValue::Object(body)) = derived.body.as_mut() {
            body.remove(key);
        }
        derived
    }

    /// Query parameters rendered as strings for the query string
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::with_capacity(self.query.len());
        for (key, value) in &self.query {
            match value {
                JsonValue::Null => {}
                JsonValue::String(s) => pairs.push((key.clone(), s.clone())),
                JsonValue::Array(items) => {
                    let array_key = format!("{key}[]");
                    for item in items {
                        pairs.push((array_key.clone(), scalar_to_string(item)));
                    }
                }
                other => pairs.push((key.clone(), scalar_to_string(other))),
            }
        }
        pairs
    }
}

fn scalar_to_string(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Attempt counter owned by a single logical request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttemptState {
    sends: u32,
}

impl AttemptState {
    /// Fresh state before the first send
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a physical send and return its 0-based attempt index
    pub fn begin_send(&mut self) -> u32 {
        let attempt = self.sends;
        self.sends += 1;
        attempt
    }

    /// Index of the most recent send, `None` before the first one
    pub fn current_attempt(&self) -> Option<u32> {
        self.sends.checked_sub(1)
    }

    /// Number of physical sends made so far
    pub fn sends(&self) -> u32 {
        self.sends
    }
}
