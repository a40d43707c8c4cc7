//! Remote Boundary Types
//!
//! Error type and GraphQL envelopes shared by the remote service traits.

use std::collections::BTreeMap;
use std::pin::Pin;

use futures_util::Stream;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use clear_ai_core::ProgressEvent;

/// Errors returned across the remote boundary.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RemoteError {
    /// The transport could not deliver the request or the response.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The server answered with a GraphQL `errors` array.
    #[error("GraphQL error: {}", join_messages(.0))]
    Graphql(Vec<GraphqlError>),

    /// The response had no data for the requested field.
    #[error("Missing data for {0}")]
    MissingData(String),

    /// The response data did not match the expected shape.
    #[error("Invalid response for {operation}: {message}")]
    Decode { operation: String, message: String },
}

fn join_messages(errors: &[GraphqlError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

impl RemoteError {
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn decode(operation: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Decode {
            operation: operation.into(),
            message: msg.into(),
        }
    }
}

/// Stream of progress updates from one agent channel.
pub type ProgressStream = Pin<Box<dyn Stream<Item = Result<ProgressEvent, RemoteError>> + Send>>;

/// Stream of raw subscription payloads from the transport.
pub type GraphqlStream = Pin<Box<dyn Stream<Item = Result<GraphqlResponse, RemoteError>> + Send>>;

/// A GraphQL operation ready to hand to a transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphqlRequest {
    pub operation_name: String,
    pub query: String,
    #[serde(default)]
    pub variables: BTreeMap<String, Value>,
}

impl GraphqlRequest {
    pub fn new(operation_name: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            operation_name: operation_name.into(),
            query: query.into(),
            variables: BTreeMap::new(),
        }
    }

    /// Add a variable. `None` values are sent as JSON null.
    pub fn var(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.variables.insert(name.to_string(), value.into());
        self
    }

    /// Add a variable only when it is set
    pub fn opt_var(self, name: &str, value: Option<&str>) -> Self {
        match value {
            Some(v) => self.var(name, v),
            None => self,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphqlError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Value>,
}

/// The standard `{ data, errors }` response envelope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphqlResponse {
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub errors: Vec<GraphqlError>,
}

impl GraphqlResponse {
    pub fn from_data(data: Value) -> Self {
        Self {
            data: Some(data),
            errors: Vec::new(),
        }
    }

    /// Take the value under `data.<field>`.
    ///
    /// Any entry in `errors` fails the whole response, matching the client's
    /// default error policy.
    pub fn into_field(self, field: &str) -> Result<Value, RemoteError> {
        if !self.errors.is_empty() {
            return Err(RemoteError::Graphql(self.errors));
        }
        match self.data.and_then(|mut d| d.get_mut(field).map(Value::take)) {
            Some(Value::Null) | None => Err(RemoteError::MissingData(field.to_string())),
            Some(value) => Ok(value),
        }
    }
}
