//! Active route of a request.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::RequestError;

/// Route matched for a request: the object (resource) and the action to run
/// on it, plus any parameters captured from the URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    object: String,
    action: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    params: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    variables: BTreeMap<String, String>,
}

impl Route {
    pub fn new(object: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            object: object.into(),
            action: action.into(),
            params: Vec::new(),
            variables: BTreeMap::new(),
        }
    }

    /// Builds a route from `[object, action, params...]`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ferrous_dispatch::{RequestError, Route};
    ///
    /// let route = Route::from_segments(["Blog", "show", "42"]).unwrap();
    /// assert_eq!(route.object(), "Blog");
    /// assert_eq!(route.action(), "show");
    /// assert_eq!(route.params(), ["42"]);
    ///
    /// assert_eq!(Route::from_segments(["Blog"]), Err(RequestError::IncompleteRoute(1)));
    /// ```
    pub fn from_segments<I, S>(segments: I) -> Result<Self, RequestError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut segments = segments.into_iter().map(Into::into);
        let (object, action) = match (segments.next(), segments.next()) {
            (Some(object), Some(action)) => (object, action),
            (Some(_), None) => return Err(RequestError::IncompleteRoute(1)),
            _ => return Err(RequestError::IncompleteRoute(0)),
        };
        Ok(Self {
            object,
            action,
            params: segments.collect(),
            variables: BTreeMap::new(),
        })
    }

    pub fn with_params(mut self, params: Vec<String>) -> Self {
        self.params = params;
        self
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    pub fn with_variables(mut self, variables: BTreeMap<String, String>) -> Self {
        self.variables.extend(variables);
        self
    }

    pub fn object(&self) -> &str {
        &self.object
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    pub fn variables(&self) -> &BTreeMap<String, String> {
        &self.variables
    }

    pub fn variable(&self, name: &str) -> Option<&str> {
        self.variables.get(name).map(String::as_str)
    }

    /// Name of the connector method serving this route.
    pub fn action_method(&self) -> String {
        format!("{}Action", self.action)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/{}", self.object, self.action)
    }
}
