//! Talking to an NGSI-LD context broker.
//!
//! [`BrokerClient`] builds the URL, headers and body for each entity
//! operation; a [`Transport`] carries them. [`BrokerLink`] pairs the two and
//! is what the host loads entities through and saves them back with.

use std::time::Duration;

use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::editor::Operation;

pub const API_PREFIX: [&str; 2] = ["ngsi-ld", "v1"];
pub const TENANT_HEADER: &str = "NGSILD-Tenant";
pub const DEFAULT_TENANT: &str = "Default";
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BrokerError {
    #[error("invalid broker URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("broker URL cannot take a path: {0}")]
    NotABase(String),

    #[error("request body is not JSON: {0}")]
    Body(String),

    #[error("invalid entity: {0}")]
    InvalidEntity(String),

    #[error("broker unreachable: {0}")]
    Transport(String),

    #[error("broker answered {status}: {detail}")]
    Status { status: u16, detail: String },

    #[error("broker sent a body that is not JSON: {0}")]
    Response(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

/// Bearer token and tenant supplied by the host's session manager.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub token: Option<String>,
    pub tenant: Option<String>,
}

impl Session {
    pub fn new(token: Option<String>, tenant: Option<String>) -> Self {
        Self { token, tenant }
    }

    /// Tenant from identity-provider token claims. `TenantId` may be a
    /// string or a list (first entry wins); several spellings are accepted.
    pub fn tenant_from_claims(claims: &Value) -> String {
        if let Some(tenant) = claims.get("TenantId") {
            match tenant {
                Value::String(s) => return s.clone(),
                Value::Array(items) => {
                    if let Some(first) = items.first().and_then(Value::as_str) {
                        return first.to_string();
                    }
                }
                _ => {}
            }
        }
        ["tenant_id", "tenantId", "Tenant", "tenant"]
            .iter()
            .find_map(|key| claims.get(*key).and_then(Value::as_str))
            .unwrap_or(DEFAULT_TENANT)
            .to_string()
    }

    fn headers(&self) -> Vec<(String, String)> {
        let mut headers = Vec::new();
        if let Some(tenant) = self
            .tenant
            .as_deref()
            .filter(|t| !t.is_empty() && *t != DEFAULT_TENANT)
        {
            headers.push((TENANT_HEADER.to_string(), tenant.to_string()));
        }
        if let Some(token) = self.token.as_deref().filter(|t| !t.is_empty()) {
            headers.push(("Authorization".to_string(), format!("Bearer {token}")));
        }
        headers
    }
}

/// Filters for listing entities.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityQuery {
    pub entity_type: Option<String>,
    pub attrs: Vec<String>,
    pub q: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerRequest {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl BrokerRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// HTTP/1.1-style text, for previews and logs.
    pub fn render(&self) -> String {
        let mut out = format!("{} {}\n", self.method.as_str(), self.url);
        for (name, value) in &self.headers {
            let value = if name == "Authorization" {
                "Bearer ***"
            } else {
                value.as_str()
            };
            out.push_str(&format!("{name}: {value}\n"));
        }
        if let Some(body) = &self.body {
            out.push('\n');
            out.push_str(body);
            out.push('\n');
        }
        out
    }
}

#[derive(Debug, Clone)]
pub struct BrokerClient {
    base: Url,
    session: Session,
}

impl BrokerClient {
    /// # Errors
    /// Fails when `base` is not an absolute URL that can carry a path.
    pub fn new(base: &str, session: Session) -> Result<Self, BrokerError> {
        let base = Url::parse(base)?;
        if base.cannot_be_a_base() {
            return Err(BrokerError::NotABase(base.to_string()));
        }
        Ok(Self { base, session })
    }

    pub const fn session(&self) -> &Session {
        &self.session
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(API_PREFIX).extend(segments);
        }
        url
    }

    fn request(&self, method: Method, segments: &[&str], body: Option<String>) -> BrokerRequest {
        let mut headers = vec![("Accept".to_string(), "application/ld+json".to_string())];
        if let Some(body) = &body {
            headers.push(("Content-Type".to_string(), content_type(body).to_string()));
        }
        headers.extend(self.session.headers());
        let request = BrokerRequest {
            method,
            url: self.url(segments),
            headers,
            body,
        };
        tracing::debug!(method = method.as_str(), url = %request.url, "broker request");
        request
    }

    pub fn list(&self, query: &EntityQuery) -> BrokerRequest {
        let mut request = self.request(Method::Get, &["entities"], None);
        {
            let mut pairs = request.url.query_pairs_mut();
            if let Some(ty) = &query.entity_type {
                pairs.append_pair("type", ty);
            }
            if !query.attrs.is_empty() {
                pairs.append_pair("attrs", &query.attrs.join(","));
            }
            if let Some(q) = &query.q {
                pairs.append_pair("q", q);
            }
            if let Some(limit) = query.limit {
                pairs.append_pair("limit", &limit.to_string());
            }
            if let Some(offset) = query.offset {
                pairs.append_pair("offset", &offset.to_string());
            }
        }
        if request.url.query() == Some("") {
            request.url.set_query(None);
        }
        request
    }

    pub fn get(&self, id: &str) -> BrokerRequest {
        self.request(Method::Get, &["entities", id], None)
    }

    /// # Errors
    /// Fails when the body is not a well-formed entity.
    pub fn create(&self, body: &str) -> Result<BrokerRequest, BrokerError> {
        check_entity(&parse_body(body)?)?;
        Ok(self.request(Method::Post, &["entities"], Some(body.to_string())))
    }

    /// Replace an entity; the id comes from the body.
    ///
    /// # Errors
    /// Fails when the body is not a well-formed entity.
    pub fn replace(&self, body: &str) -> Result<BrokerRequest, BrokerError> {
        let value = parse_body(body)?;
        check_entity(&value)?;
        let id = value["id"].as_str().unwrap_or_default();
        Ok(self.request(Method::Put, &["entities", id], Some(body.to_string())))
    }

    /// Partial update of the listed attributes.
    ///
    /// # Errors
    /// Fails when an attribute object lacks `type` or a value member.
    pub fn update_attrs(&self, id: &str, body: &str) -> Result<BrokerRequest, BrokerError> {
        let value = parse_body(body)?;
        let map = value
            .as_object()
            .ok_or_else(|| BrokerError::InvalidEntity("attributes must be an object".to_string()))?;
        for (name, attr) in map {
            if !matches!(name.as_str(), "id" | "type" | "@context") {
                check_attribute(name, attr)?;
            }
        }
        Ok(self.request(Method::Patch, &["entities", id, "attrs"], Some(body.to_string())))
    }

    pub fn delete(&self, id: &str) -> BrokerRequest {
        self.request(Method::Delete, &["entities", id], None)
    }
}

/// Status and body of a broker answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerResponse {
    pub status: u16,
    pub body: String,
}

impl BrokerResponse {
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Carries a built request to the broker.
///
/// Non-2xx answers are returned as responses; only failures to get an
/// answer at all are errors.
pub trait Transport {
    /// # Errors
    /// Fails when the broker cannot be reached or the answer cannot be read.
    fn send(&self, request: &BrokerRequest) -> Result<BrokerResponse, BrokerError>;
}

/// Blocking HTTP over `ureq`.
pub struct HttpTransport {
    agent: ureq::Agent,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(REQUEST_TIMEOUT).build(),
        }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: &BrokerRequest) -> Result<BrokerResponse, BrokerError> {
        let _scope = crate::perf::scope("broker.send");
        let mut call = self.agent.request(request.method.as_str(), request.url.as_str());
        for (name, value) in &request.headers {
            call = call.set(name, value);
        }
        let result = match &request.body {
            Some(body) => call.send_string(body),
            None => call.call(),
        };
        let response = match result {
            Ok(response) | Err(ureq::Error::Status(_, response)) => response,
            Err(ureq::Error::Transport(err)) => {
                tracing::warn!(url = %request.url, error = %err, "broker unreachable");
                return Err(BrokerError::Transport(err.to_string()));
            }
        };
        let status = response.status();
        let body = response
            .into_string()
            .map_err(|err| BrokerError::Transport(err.to_string()))?;
        Ok(BrokerResponse { status, body })
    }
}

/// A client and the transport its requests go over.
pub struct BrokerLink {
    client: BrokerClient,
    transport: Box<dyn Transport>,
}

impl std::fmt::Debug for BrokerLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrokerLink")
            .field("client", &self.client)
            .finish_non_exhaustive()
    }
}

impl BrokerLink {
    pub fn new(client: BrokerClient, transport: Box<dyn Transport>) -> Self {
        Self { client, transport }
    }

    /// Link over HTTP.
    pub fn http(client: BrokerClient) -> Self {
        Self::new(client, Box::new(HttpTransport::new()))
    }

    pub const fn client(&self) -> &BrokerClient {
        &self.client
    }

    /// Send `request` and insist on a 2xx answer.
    ///
    /// # Errors
    /// Transport failures, and [`BrokerError::Status`] carrying the broker's
    /// problem detail for any other status.
    pub fn execute(&self, request: &BrokerRequest) -> Result<BrokerResponse, BrokerError> {
        let response = self.transport.send(request)?;
        tracing::debug!(
            method = request.method.as_str(),
            url = %request.url,
            status = response.status,
            "broker response"
        );
        crate::perf::log_event(
            "broker.response",
            format!("method={} status={}", request.method.as_str(), response.status),
        );
        if response.is_success() {
            Ok(response)
        } else {
            Err(BrokerError::Status {
                status: response.status,
                detail: problem_detail(&response.body),
            })
        }
    }

    /// GET one entity.
    ///
    /// # Errors
    /// Fails when the request fails or the body is not JSON.
    pub fn fetch_entity(&self, id: &str) -> Result<Value, BrokerError> {
        let response = self.execute(&self.client.get(id))?;
        serde_json::from_str(&response.body).map_err(|err| BrokerError::Response(err.to_string()))
    }

    /// Store a document: POST for [`Operation::Create`], PUT otherwise.
    /// Returns the stored entity id.
    ///
    /// # Errors
    /// Fails for view-only documents, malformed entities and failed requests.
    pub fn store_entity(&self, body: &str, operation: Operation) -> Result<String, BrokerError> {
        let request = match operation {
            Operation::Create => self.client.create(body)?,
            Operation::Update => self.client.replace(body)?,
            Operation::View => {
                return Err(BrokerError::InvalidEntity("document is read-only".to_string()));
            }
        };
        self.execute(&request)?;
        let id = parse_body(body)?
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        tracing::info!(%id, method = request.method.as_str(), "entity stored");
        Ok(id)
    }
}

/// The most useful line of an error answer. NGSI-LD brokers send RFC 7807
/// problem details.
fn problem_detail(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            ["detail", "title", "error", "description"]
                .iter()
                .find_map(|key| value.get(*key).and_then(Value::as_str).map(str::to_string))
        })
        .unwrap_or_else(|| body.trim().chars().take(200).collect())
}

/// `application/ld+json` when the body carries its own `@context`.
pub fn content_type(body: &str) -> &'static str {
    match serde_json::from_str::<Value>(body) {
        Ok(value) if value.get("@context").is_some() => "application/ld+json",
        _ => "application/json",
    }
}

fn parse_body(body: &str) -> Result<Value, BrokerError> {
    serde_json::from_str(body).map_err(|err| BrokerError::Body(err.to_string()))
}

/// An entity needs string `id` and `type`; every attribute object needs
/// `type` and the member its kind carries.
///
/// # Errors
/// Names the first problem found.
pub fn check_entity(value: &Value) -> Result<(), BrokerError> {
    let map = value
        .as_object()
        .ok_or_else(|| BrokerError::InvalidEntity("entity must be a JSON object".to_string()))?;
    for key in ["id", "type"] {
        if !map.get(key).is_some_and(Value::is_string) {
            return Err(BrokerError::InvalidEntity(format!("missing string `{key}`")));
        }
    }
    for (name, attr) in map {
        if matches!(name.as_str(), "id" | "type" | "@context" | "scope") {
            continue;
        }
        check_attribute(name, attr)?;
    }
    Ok(())
}

fn check_attribute(name: &str, attr: &Value) -> Result<(), BrokerError> {
    // Multi-attributes are arrays of instances.
    if let Value::Array(instances) = attr {
        return instances.iter().try_for_each(|i| check_attribute(name, i));
    }
    let Some(kind) = attr.get("type").and_then(Value::as_str) else {
        return Err(BrokerError::InvalidEntity(format!(
            "attribute `{name}` has no `type`"
        )));
    };
    let member = match kind {
        "Relationship" => "object",
        "LanguageProperty" => "languageMap",
        "VocabProperty" => "vocab",
        "JsonProperty" => "json",
        _ => "value",
    };
    if attr.get(member).is_none() {
        return Err(BrokerError::InvalidEntity(format!(
            "attribute `{name}` of type {kind} has no `{member}`"
        )));
    }
    Ok(())
}
