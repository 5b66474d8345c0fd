//! Callbacks bound to a captured scope.
//!
//! A [`BoundCallback`] pairs a handler with the variables it captured when
//! it was registered and the name under which each event payload is bound.
//! Every invocation gets a fresh copy of the captured scope extended with
//! that one binding, so events never see each other's payloads.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::response::Response;

/// A value visible to a callback.
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    /// Nothing (disconnects and heart-beat timeouts)
    Null,
    /// Text, such as the `"host:port"` of a connecting event
    Text(String),
    /// A broker message or error
    Response(Response),
    /// A captured value
    Json(Value),
}

impl Binding {
    /// Whether this is [`Binding::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl From<Response> for Binding {
    fn from(response: Response) -> Self {
        Self::Response(response)
    }
}

impl From<Value> for Binding {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

impl From<&str> for Binding {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for Binding {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl<T: Into<Binding>> From<Option<T>> for Binding {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Variables in scope for one invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scope {
    vars: BTreeMap<String, Binding>,
}

impl Scope {
    /// An empty scope.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name`, replacing any earlier binding.
    pub fn bind(&mut self, name: impl Into<String>, value: impl Into<Binding>) {
        self.vars.insert(name.into(), value.into());
    }

    /// Look up a variable.
    pub fn get(&self, name: &str) -> Option<&Binding> {
        self.vars.get(name)
    }

    /// Look up a variable holding a response.
    pub fn response(&self, name: &str) -> Option<&Response> {
        match self.vars.get(name) {
            Some(Binding::Response(response)) => Some(response),
            _ => None,
        }
    }

    /// Look up a variable holding text.
    pub fn text(&self, name: &str) -> Option<&str> {
        match self.vars.get(name) {
            Some(Binding::Text(text)) => Some(text),
            Some(Binding::Json(Value::String(text))) => Some(text),
            _ => None,
        }
    }

    /// Names in scope, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.vars.keys().map(String::as_str).collect()
    }
}

type Handler = Arc<dyn Fn(&Scope) + Send + Sync>;

/// A handler with its captured scope and parameter name.
#[derive(Clone)]
pub struct BoundCallback {
    handler: Handler,
    captured: Scope,
    param: String,
}

impl fmt::Debug for BoundCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundCallback")
            .field("param", &self.param)
            .field("captured", &self.captured.names())
            .finish()
    }
}

impl BoundCallback {
    /// Bind event payloads to `param` and call `handler`.
    pub fn new<F>(param: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&Scope) + Send + Sync + 'static,
    {
        Self {
            handler: Arc::new(handler),
            captured: Scope::new(),
            param: param.into(),
        }
    }

    /// Capture a variable.
    #[must_use]
    pub fn capture(mut self, name: impl Into<String>, value: impl Into<Binding>) -> Self {
        self.captured.bind(name, value);
        self
    }

    /// Parameter name payloads are bound to.
    pub fn param(&self) -> &str {
        &self.param
    }

    /// The captured scope.
    pub fn captured(&self) -> &Scope {
        &self.captured
    }

    /// Call the handler with `payload` bound to the parameter name.
    ///
    /// The captured scope itself is left untouched.
    pub fn invoke(&self, payload: impl Into<Binding>) {
        let mut scope = self.captured.clone();
        scope.bind(self.param.clone(), payload);
        (self.handler)(&scope);
    }
}
