//! API endpoint descriptions
//!
//! Sibling shape produced alongside entities by the completion-JSON
//! normalizer. A product's endpoint list is replaced wholesale on every
//! normalization run.

use crate::field::Field;
use crate::types::CanonicalType;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Path or query parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    /// Parameter name
    pub name: String,
    /// Canonical type
    #[serde(rename = "type")]
    pub param_type: CanonicalType,
    /// Must be supplied
    #[serde(default)]
    pub required: bool,
    /// Description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Parameter {
    /// Text parameter
    #[must_use]
    pub fn text(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            param_type: CanonicalType::Text,
            required: false,
            description: None,
        }
    }
}

/// Request body descriptor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestBody {
    /// Media type
    pub content_type: String,
    /// Entity the body carries, if named
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
    /// Inline body fields
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<Field>,
    /// Description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Response descriptor for one status code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseSpec {
    /// HTTP status code
    pub status: u16,
    /// Description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Entity returned, if named
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
    /// Free-form schema as produced
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
}

/// Request rate limit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimit {
    /// Requests allowed per window
    pub requests: u32,
    /// Window length in seconds
    pub window_seconds: u64,
}

/// One HTTP endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    /// Upper-cased HTTP method
    pub method: String,
    /// Route path
    pub path: String,
    /// Short summary
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Caller must be authenticated
    pub auth_required: bool,
    /// Roles allowed to call
    #[serde(default)]
    pub roles_allowed: Vec<String>,
    /// Permissions required
    #[serde(default)]
    pub permissions: Vec<String>,
    /// Path parameters
    #[serde(default)]
    pub path_params: Vec<Parameter>,
    /// Query parameters
    #[serde(default)]
    pub query_params: Vec<Parameter>,
    /// Request body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBody>,
    /// Responses keyed by status code
    #[serde(default)]
    pub responses: Vec<ResponseSpec>,
    /// Rate limit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<RateLimit>,
}

impl Endpoint {
    /// Authenticated endpoint with no parameters or responses
    #[must_use]
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into().to_ascii_uppercase(),
            path: path.into(),
            summary: None,
            auth_required: true,
            roles_allowed: Vec::new(),
            permissions: Vec::new(),
            path_params: Vec::new(),
            query_params: Vec::new(),
            request_body: None,
            responses: Vec::new(),
            rate_limit: None,
        }
    }

    /// Response for `status`, if described
    #[must_use]
    pub fn response(&self, status: u16) -> Option<&ResponseSpec> {
        self.responses.iter().find(|r| r.status == status)
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Self::new("GET", "/")
    }
}
