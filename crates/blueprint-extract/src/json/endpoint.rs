//! Endpoint normalization

use super::entity::field_list;
use super::value::{as_bool, as_string_list, as_text, as_u64, bool_of, kind_of, pick, text_of};
use super::Report;
use crate::config::ExtractionConfig;
use crate::degradation::DegradationKind;
use blueprint_model::{CanonicalType, Endpoint, Parameter, RateLimit, RequestBody, ResponseSpec};
use serde_json::{Map, Value};

const METHODS: &[&str] = &["GET", "POST", "PUT", "PATCH", "DELETE", "HEAD", "OPTIONS"];

/// Window used when a rate limit names none or names one too large
const DEFAULT_WINDOW_SECONDS: u64 = 60;

/// Endpoints from a list, a single object, or a path-keyed map
pub(crate) fn endpoints(report: &mut Report, config: &ExtractionConfig, value: &Value, location: &str) -> Vec<Endpoint> {
    match value {
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| endpoint(report, config, item, &format!("{location}[{i}]")))
            .collect(),
        Value::Object(map) if pick(map, &["path", "route", "url", "endpoint", "uri", "method"]).is_some() => {
            vec![endpoint(report, config, value, location)]
        }
        // `{ "/tasks": { "get": {...}, "post": {...} } }` or `{ "GET /tasks": {...} }`
        Value::Object(map) => map
            .iter()
            .flat_map(|(key, body)| keyed_endpoints(report, config, key, body, &format!("{location}.{key}")))
            .collect(),
        Value::Null => Vec::new(),
        other => {
            report.degrade(location, DegradationKind::ShapeMismatch, format!("expected list of endpoints, got {}", kind_of(other)));
            Vec::new()
        }
    }
}

fn keyed_endpoints(report: &mut Report, config: &ExtractionConfig, key: &str, body: &Value, location: &str) -> Vec<Endpoint> {
    let method_map = body.as_object().filter(|m| {
        !m.is_empty() && m.keys().all(|k| METHODS.contains(&k.to_ascii_uppercase().as_str()))
    });
    if let Some(methods) = method_map {
        return methods
            .iter()
            .map(|(method, op)| {
                let mut endpoint = endpoint(report, config, op, &format!("{location}.{method}"));
                endpoint.method = method.to_ascii_uppercase();
                endpoint.path = normalize_path(key);
                add_declared_path_params(&mut endpoint);
                endpoint
            })
            .collect();
    }
    let mut endpoint = endpoint(report, config, body, location);
    let (method, path) = split_method(key);
    if let Some(method) = method {
        endpoint.method = method;
    }
    endpoint.path = normalize_path(path);
    add_declared_path_params(&mut endpoint);
    vec![endpoint]
}

/// Endpoint from any JSON value
pub(crate) fn endpoint(report: &mut Report, config: &ExtractionConfig, value: &Value, location: &str) -> Endpoint {
    let empty = Map::new();
    let obj = match value {
        Value::Object(map) => map,
        Value::String(line) => {
            let (method, path) = split_method(line);
            let mut endpoint = Endpoint::new(method.unwrap_or_else(|| "GET".to_string()), normalize_path(path));
            add_declared_path_params(&mut endpoint);
            return endpoint;
        }
        other => {
            report.degrade(location, DegradationKind::ShapeMismatch, format!("expected object, got {}", kind_of(other)));
            &empty
        }
    };

    let raw_path = text_of(obj, &["path", "route", "url", "endpoint", "uri"]).unwrap_or_default();
    let (embedded_method, path) = split_method(&raw_path);
    let method = text_of(obj, &["method", "http_method", "httpMethod", "verb"])
        .map(|m| m.to_ascii_uppercase())
        .or(embedded_method)
        .unwrap_or_else(|| "GET".to_string());

    let mut endpoint = Endpoint::new(method, normalize_path(path));
    endpoint.summary = text_of(obj, &["summary", "description", "name", "title"]);
    endpoint.auth_required = auth_required(obj);
    endpoint.roles_allowed = pick(obj, &["roles_allowed", "rolesAllowed", "roles", "allowed_roles", "allowedRoles"])
        .map(as_string_list)
        .unwrap_or_default();
    endpoint.permissions = pick(obj, &["permissions", "scopes", "required_permissions"])
        .map(as_string_list)
        .unwrap_or_default();

    if let Some(params) = pick(obj, &["path_params", "pathParams", "params"]) {
        endpoint.path_params = parameters(report, params, &format!("{location}.path_params"));
    }
    if let Some(params) = pick(obj, &["query_params", "queryParams", "query"]) {
        endpoint.query_params = parameters(report, params, &format!("{location}.query_params"));
    }
    if let Some(Value::Array(params)) = pick(obj, &["parameters"]) {
        for (i, param) in params.iter().enumerate() {
            let place = param
                .as_object()
                .and_then(|p| text_of(p, &["in", "location", "place"]))
                .map(|p| p.to_ascii_lowercase());
            let Some(parsed) = parameter(report, param, &format!("{location}.parameters[{i}]")) else {
                continue;
            };
            match place.as_deref() {
                Some("path") => endpoint.path_params.push(parsed),
                Some("query") | None => endpoint.query_params.push(parsed),
                // Header and cookie parameters have no slot
                Some(_) => {}
            }
        }
    }
    add_declared_path_params(&mut endpoint);

    if let Some(body) = pick(obj, &["request_body", "requestBody", "body", "request"]) {
        endpoint.request_body = request_body(report, config, body, &format!("{location}.request_body"));
    }
    if let Some(responses) = pick(obj, &["responses", "response"]) {
        endpoint.responses = responses_of(report, responses, &format!("{location}.responses"));
    }
    if let Some(limit) = pick(obj, &["rate_limit", "rateLimit", "throttle"]) {
        endpoint.rate_limit = rate_limit(report, limit, &format!("{location}.rate_limit"));
        if endpoint.rate_limit.is_none() {
            report.degrade(format!("{location}.rate_limit"), DegradationKind::ShapeMismatch, "unreadable rate limit");
        }
    }
    endpoint
}

/// `("POST", "/x")` from `"POST /x"`; `(None, "/x")` from `"/x"`
fn split_method(text: &str) -> (Option<String>, &str) {
    let text = text.trim();
    if let Some((head, rest)) = text.split_once(char::is_whitespace) {
        let upper = head.to_ascii_uppercase();
        if METHODS.contains(&upper.as_str()) {
            return (Some(upper), rest.trim());
        }
    }
    (None, text)
}

fn normalize_path(path: &str) -> String {
    let path = path.trim();
    if path.is_empty() {
        "/".to_string()
    } else if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

fn auth_required(obj: &Map<String, Value>) -> bool {
    if let Some(public) = bool_of(obj, &["public", "is_public", "isPublic"]) {
        return !public;
    }
    match pick(obj, &["auth_required", "authRequired", "auth", "requires_auth", "requiresAuth", "authenticated", "protected"]) {
        Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "none" | "public" | "anonymous" | "optional" => false,
            other => as_bool(&Value::String(other.to_string())).unwrap_or(true),
        },
        Some(Value::Object(auth)) => bool_of(auth, &["required", "enabled"]).unwrap_or(true),
        Some(other) => as_bool(other).unwrap_or(true),
        None => true,
    }
}

/// Path parameters spelled in the path (`:id`, `{id}`) but not listed
fn add_declared_path_params(endpoint: &mut Endpoint) {
    let declared: Vec<String> = endpoint
        .path
        .split('/')
        .filter_map(|segment| {
            segment
                .strip_prefix(':')
                .or_else(|| segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')))
                .map(|name| name.trim_end_matches('?').to_string())
        })
        .filter(|name| !name.is_empty())
        .collect();
    for name in declared {
        if !endpoint.path_params.iter().any(|p| p.name == name) {
            let mut param = Parameter::text(name);
            param.required = true;
            endpoint.path_params.push(param);
        }
    }
}

fn parameters(report: &mut Report, value: &Value, location: &str) -> Vec<Parameter> {
    match value {
        Value::Array(items) => items
            .iter()
            .enumerate()
            .filter_map(|(i, item)| parameter(report, item, &format!("{location}[{i}]")))
            .collect(),
        // `{ "id": "string" }` or `{ "id": { "type": ... } }`
        Value::Object(map) => map
            .iter()
            .filter(|(name, _)| !name.trim().is_empty())
            .map(|(name, body)| {
                let mut param = match body {
                    Value::Object(obj) => parameter_from(obj).unwrap_or_else(|| Parameter::text(name.clone())),
                    other => {
                        let mut param = Parameter::text(name.clone());
                        if let Some(ty) = as_text(other) {
                            param.param_type = CanonicalType::normalize(&ty);
                        }
                        param
                    }
                };
                param.name.clone_from(name);
                param
            })
            .collect(),
        other => as_string_list(other).into_iter().map(Parameter::text).collect(),
    }
}

fn parameter(report: &mut Report, value: &Value, location: &str) -> Option<Parameter> {
    match value {
        Value::Object(obj) => {
            let param = parameter_from(obj);
            if param.is_none() {
                report.degrade(location, DegradationKind::ShapeMismatch, "parameter without name");
            }
            param
        }
        other => {
            let name = as_text(other)?;
            Some(Parameter::text(name))
        }
    }
}

fn parameter_from(obj: &Map<String, Value>) -> Option<Parameter> {
    let name = text_of(obj, &["name", "key", "param"])?;
    let mut param = Parameter::text(name);
    let ty = text_of(obj, &["type", "data_type", "dataType"]).or_else(|| {
        pick(obj, &["schema"])
            .and_then(Value::as_object)
            .and_then(|s| text_of(s, &["type"]))
    });
    if let Some(ty) = ty {
        param.param_type = CanonicalType::normalize(&ty);
    }
    param.required = bool_of(obj, &["required", "is_required", "isRequired"]).unwrap_or(false);
    param.description = text_of(obj, &["description", "desc"]);
    Some(param)
}

fn request_body(report: &mut Report, config: &ExtractionConfig, value: &Value, location: &str) -> Option<RequestBody> {
    let mut body = RequestBody {
        content_type: "application/json".to_string(),
        entity: None,
        fields: Vec::new(),
        description: None,
    };
    match value {
        Value::String(_) => body.entity = as_text(value),
        Value::Object(obj) => {
            if let Some(ct) = text_of(obj, &["content_type", "contentType", "media_type", "mediaType"]) {
                body.content_type = ct;
            }
            body.entity = text_of(obj, &["entity", "model", "schema_ref", "$ref"]);
            body.description = text_of(obj, &["description", "desc"]);
            match pick(obj, &["fields", "properties", "schema"]) {
                Some(fields @ (Value::Array(_) | Value::Object(_))) => {
                    body.fields = field_list(report, config, fields, &format!("{location}.fields"), 1);
                }
                Some(Value::String(entity)) if body.entity.is_none() => body.entity = Some(entity.clone()),
                _ => {}
            }
        }
        Value::Array(_) => body.fields = field_list(report, config, value, &format!("{location}.fields"), 1),
        Value::Bool(false) | Value::Null => return None,
        other => {
            report.degrade(location, DegradationKind::ShapeMismatch, format!("unreadable {} request body", kind_of(other)));
            return None;
        }
    }
    Some(body)
}

fn responses_of(report: &mut Report, value: &Value, location: &str) -> Vec<ResponseSpec> {
    let mut responses: Vec<ResponseSpec> = match value {
        Value::Array(items) => items
            .iter()
            .enumerate()
            .filter_map(|(i, item)| {
                let spec = item.as_object().and_then(|obj| {
                    let status = pick(obj, &["status", "status_code", "statusCode", "code"]).and_then(status_of)?;
                    Some(response_from(status, item))
                });
                if spec.is_none() {
                    report.degrade(format!("{location}[{i}]"), DegradationKind::ShapeMismatch, "response without status");
                }
                spec
            })
            .collect(),
        // Status-keyed map
        Value::Object(map) => map
            .iter()
            .filter_map(|(status, body)| {
                let status = status_of(&Value::String(status.clone()));
                if status.is_none() {
                    report.degrade(location, DegradationKind::ShapeMismatch, "non-numeric response status");
                }
                Some(response_from(status?, body))
            })
            .collect(),
        other => {
            report.degrade(location, DegradationKind::ShapeMismatch, format!("unreadable {} responses", kind_of(other)));
            Vec::new()
        }
    };
    responses.sort_by_key(|r| r.status);
    responses.dedup_by_key(|r| r.status);
    responses
}

fn status_of(value: &Value) -> Option<u16> {
    as_u64(value)
        .and_then(|n| u16::try_from(n).ok())
        .filter(|n| (100..600).contains(n))
}

fn response_from(status: u16, body: &Value) -> ResponseSpec {
    let mut spec = ResponseSpec {
        status,
        description: None,
        entity: None,
        schema: None,
    };
    match body {
        Value::Object(obj) => {
            spec.description = text_of(obj, &["description", "desc", "message"]);
            spec.entity = text_of(obj, &["entity", "model", "returns"]);
            spec.schema = pick(obj, &["schema", "body", "example"]).cloned();
        }
        other => spec.description = as_text(other),
    }
    spec
}

/// Rate limit from `{ requests, window }` or `"100/min"`
fn rate_limit(report: &mut Report, value: &Value, location: &str) -> Option<RateLimit> {
    match value {
        Value::Object(obj) => {
            let requests = pick(obj, &["requests", "limit", "max", "max_requests", "maxRequests"]).and_then(as_u64)?;
            let window_seconds = match pick(obj, &["window_seconds", "windowSeconds", "window_secs"]).and_then(as_u64) {
                Some(seconds) => seconds,
                None => match pick(obj, &["window", "per", "period", "interval"]) {
                    Some(Value::String(s)) => window_seconds(report, s, location).unwrap_or(DEFAULT_WINDOW_SECONDS),
                    Some(other) => as_u64(other).unwrap_or(DEFAULT_WINDOW_SECONDS),
                    None => DEFAULT_WINDOW_SECONDS,
                },
            };
            Some(RateLimit {
                requests: u32::try_from(requests).unwrap_or(u32::MAX),
                window_seconds,
            })
        }
        Value::String(s) => {
            let (count, window) = s.split_once('/').or_else(|| s.split_once(" per "))?;
            let requests = count.trim().parse::<u32>().ok()?;
            Some(RateLimit {
                requests,
                window_seconds: window_seconds(report, window, location)?,
            })
        }
        Value::Number(n) => Some(RateLimit {
            requests: n.as_u64().and_then(|n| u32::try_from(n).ok())?,
            window_seconds: DEFAULT_WINDOW_SECONDS,
        }),
        _ => None,
    }
}

/// Parsed window text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Window {
    Seconds(u64),
    /// Count times unit does not fit in `u64`
    Overflow,
}

/// Window seconds, falling back to the default when the window overflows
fn window_seconds(report: &mut Report, text: &str, location: &str) -> Option<u64> {
    match window_of(text)? {
        Window::Seconds(seconds) => Some(seconds),
        Window::Overflow => {
            report.degrade(
                location,
                DegradationKind::OutOfRange,
                format!("window `{}` too large, using {DEFAULT_WINDOW_SECONDS}s", text.trim()),
            );
            Some(DEFAULT_WINDOW_SECONDS)
        }
    }
}

/// Window length from `min`, `15m`, `hour`, `30 seconds`
fn window_of(text: &str) -> Option<Window> {
    let text = text.trim().to_ascii_lowercase();
    let digits: String = text.chars().take_while(char::is_ascii_digit).collect();
    let unit = text[digits.len()..].trim();
    let seconds = match unit {
        "s" | "sec" | "secs" | "second" | "seconds" => 1,
        "m" | "min" | "mins" | "minute" | "minutes" => 60,
        "h" | "hr" | "hour" | "hours" => 3_600,
        "d" | "day" | "days" => 86_400,
        "" if !digits.is_empty() => 1,
        _ => return None,
    };
    if digits.is_empty() {
        return Some(Window::Seconds(seconds));
    }
    // Only digits remain, so a failed parse means the count overflowed
    let Ok(count) = digits.parse::<u64>() else {
        return Some(Window::Overflow);
    };
    Some(count.checked_mul(seconds).map_or(Window::Overflow, Window::Seconds))
}

#[cfg(test)]
mod tests {
    use crate::degradation::DegradationKind;
    use crate::json::JsonNormalizer;
    use blueprint_model::{CanonicalType, RateLimit};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn minimal_endpoint_defaults() {
        let endpoint = JsonNormalizer::default().normalize_endpoint(&json!({"method": "post", "path": "/x"}));
        assert_eq!(endpoint.method, "POST");
        assert_eq!(endpoint.path, "/x");
        assert!(endpoint.auth_required);
        assert!(endpoint.roles_allowed.is_empty());
        assert!(endpoint.responses.is_empty());
    }

    #[test]
    fn empty_object_is_get_root() {
        let endpoint = JsonNormalizer::default().normalize_endpoint(&json!({}));
        assert_eq!(endpoint.method, "GET");
        assert_eq!(endpoint.path, "/");
    }

    #[test]
    fn path_params_from_path_and_parameters_list() {
        let endpoint = JsonNormalizer::default().normalize_endpoint(&json!({
            "route": "projects/:projectId/tasks/{taskId}",
            "parameters": [
                {"name": "projectId", "in": "path", "type": "ObjectId", "required": true},
                {"name": "limit", "in": "query", "type": "integer"},
                {"name": "X-Trace", "in": "header"},
                "q"
            ]
        }));
        assert_eq!(endpoint.path, "/projects/:projectId/tasks/{taskId}");
        let path: Vec<_> = endpoint.path_params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(path, vec!["projectId", "taskId"]);
        assert_eq!(endpoint.path_params[0].param_type, CanonicalType::Reference);
        assert!(endpoint.path_params[1].required);
        let query: Vec<_> = endpoint.query_params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(query, vec!["limit", "q"]);
        assert_eq!(endpoint.query_params[0].param_type, CanonicalType::Number);
    }

    #[test]
    fn auth_roles_and_rate_limits() {
        let n = JsonNormalizer::default();
        let endpoint = n.normalize_endpoint(&json!({"path": "/login", "auth": "none", "rate_limit": "10/min"}));
        assert!(!endpoint.auth_required);
        assert_eq!(endpoint.rate_limit, Some(RateLimit { requests: 10, window_seconds: 60 }));

        let endpoint = n.normalize_endpoint(&json!({
            "path": "/admin", "roles": "admin, owner", "rateLimit": {"requests": 5, "window": "15m"}
        }));
        assert!(endpoint.auth_required);
        assert_eq!(endpoint.roles_allowed, vec!["admin", "owner"]);
        assert_eq!(endpoint.rate_limit, Some(RateLimit { requests: 5, window_seconds: 900 }));

        let endpoint = n.normalize_endpoint(&json!({"path": "/health", "public": true}));
        assert!(!endpoint.auth_required);
    }

    #[test]
    fn responses_as_list_or_map() {
        let n = JsonNormalizer::default();
        let endpoint = n.normalize_endpoint(&json!({
            "path": "/tasks",
            "responses": {"200": {"description": "ok", "entity": "Task"}, "404": "missing", "oops": {}}
        }));
        assert_eq!(endpoint.responses.len(), 2);
        assert_eq!(endpoint.response(200).unwrap().entity.as_deref(), Some("Task"));
        assert_eq!(endpoint.response(404).unwrap().description.as_deref(), Some("missing"));

        let endpoint = n.normalize_endpoint(&json!({
            "path": "/tasks", "responses": [{"status": 201, "description": "created"}, {"description": "?"}]
        }));
        assert_eq!(endpoint.responses.len(), 1);
        assert_eq!(endpoint.responses[0].status, 201);
    }

    #[test]
    fn request_body_fields() {
        let endpoint = JsonNormalizer::default().normalize_endpoint(&json!({
            "method": "POST", "path": "/tasks",
            "body": {"fields": ["title:String", "assignee:ObjectId"]}
        }));
        let body = endpoint.request_body.unwrap();
        assert_eq!(body.content_type, "application/json");
        assert_eq!(body.fields.len(), 2);
        assert_eq!(body.fields[1].field_type, CanonicalType::Reference);
    }

    #[test]
    fn endpoint_lists_and_maps() {
        let n = JsonNormalizer::default();
        let list = n.normalize_endpoints_with_report(&json!(["GET /tasks", {"method": "delete", "path": "/tasks/:id"}]));
        assert_eq!(list.value.len(), 2);
        assert_eq!(list.value[0].path, "/tasks");
        assert_eq!(list.value[1].path_params[0].name, "id");

        let map = n.normalize_endpoints_with_report(&json!({
            "/tasks": {"get": {"summary": "list"}, "post": {}},
            "PUT /tasks/:id": {"summary": "update"}
        }));
        let methods: Vec<_> = map.value.iter().map(|e| (e.method.as_str(), e.path.as_str())).collect();
        assert_eq!(methods, vec![("GET", "/tasks"), ("POST", "/tasks"), ("PUT", "/tasks/:id")]);
        assert_eq!(map.value[2].path_params.len(), 1);
    }

    #[test]
    fn oversized_windows_fall_back_to_default() {
        let n = JsonNormalizer::default();
        for limit in [
            json!("1/18446744073709551615h"),
            json!("5/99999999999999999999999 seconds"),
            json!({"requests": 3, "window": "18446744073709551615d"}),
        ] {
            let report = n.normalize_endpoint_with_report(&json!({"method": "get", "path": "/x", "rate_limit": limit}));
            let window = report.value.rate_limit.map(|r| r.window_seconds);
            assert_eq!(window, Some(60), "{limit}");
            assert_eq!(report.degradations.len(), 1);
            assert_eq!(report.degradations[0].kind, DegradationKind::OutOfRange);
            assert_eq!(report.degradations[0].location, "endpoint.rate_limit");
        }

        // Largest window that still fits
        let endpoint = n.normalize_endpoint(&json!({"path": "/x", "rate_limit": "2/18446744073709551615s"}));
        assert_eq!(endpoint.rate_limit.map(|r| r.window_seconds), Some(u64::MAX));
    }
}
