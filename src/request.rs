//! Outbound request model
//!
//! A `Request` is what flows through the pipeline before it reaches the
//! transport. Hooks and authenticators mutate it in place; the client then
//! resolves its target against the host override and hands a
//! `reqwest::Request` to the retry executor.
//!
//! The body is held as `Bytes`, so a resolved request can always be replayed
//! on retry.

use crate::error::{Error, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;
use serde::Serialize;
use std::time::Duration;
use url::Url;

/// An outbound HTTP request
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    target: String,
    headers: HeaderMap,
    query: Vec<(String, String)>,
    body: Option<Bytes>,
    timeout: Option<Duration>,
}

impl Request {
    /// Create a request for an absolute URL or a path
    ///
    /// A path leaves scheme and host unset; they are filled in from the
    /// client's host override when the request is sent.
    pub fn new(method: Method, target: impl Into<String>) -> Self {
        Self {
            method,
            target: target.into(),
            headers: HeaderMap::new(),
            query: Vec::new(),
            body: None,
            timeout: None,
        }
    }

    /// Create a GET request
    pub fn get(target: impl Into<String>) -> Self {
        Self::new(Method::GET, target)
    }

    /// Create a POST request
    pub fn post(target: impl Into<String>) -> Self {
        Self::new(Method::POST, target)
    }

    /// Add a header
    pub fn header(mut self, key: &str, value: &str) -> Result<Self> {
        self.set_header(key, value)?;
        Ok(self)
    }

    /// Add a query parameter
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Set a raw body
    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Set a JSON body and content type
    pub fn json<T: Serialize + ?Sized>(mut self, value: &T) -> Result<Self> {
        let body = serde_json::to_vec(value)?;
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        self.body = Some(Bytes::from(body));
        Ok(self)
    }

    /// Set HTTP basic credentials
    #[must_use]
    pub fn basic_auth(mut self, username: &str, password: &str) -> Self {
        self.set_basic_auth(username, password);
        self
    }

    /// Set a bearer token
    pub fn bearer_auth(mut self, token: &str) -> Result<Self> {
        self.set_header(AUTHORIZATION.as_str(), &format!("Bearer {token}"))?;
        Ok(self)
    }

    /// Set a per-attempt timeout
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn query_pairs(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn body_bytes(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Insert or replace a header
    pub fn set_header(&mut self, key: &str, value: &str) -> Result<()> {
        let name = HeaderName::from_bytes(key.as_bytes())
            .map_err(|e| Error::request(format!("invalid header name '{key}': {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| Error::request(format!("invalid value for header '{key}': {e}")))?;
        self.headers.insert(name, value);
        Ok(())
    }

    /// Append a query parameter in place
    pub fn push_query(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.query.push((key.into(), value.into()));
    }

    /// Set HTTP basic credentials in place
    pub fn set_basic_auth(&mut self, username: &str, password: &str) {
        let encoded = STANDARD.encode(format!("{username}:{password}"));
        let mut value = HeaderValue::from_str(&format!("Basic {encoded}"))
            .unwrap_or_else(|_| HeaderValue::from_static("Basic"));
        value.set_sensitive(true);
        self.headers.insert(AUTHORIZATION, value);
    }

    /// Check whether scheme and host still have to come from the client
    pub fn is_relative(&self) -> bool {
        Url::parse(&self.target).is_err()
    }

    /// Resolve the target to an absolute URL
    ///
    /// Absolute targets are kept as they are. Relative targets take scheme,
    /// host and port from `host` and keep their own path, query and fragment;
    /// without a host they cannot be sent.
    pub fn resolve_url(&self, host: Option<&Url>) -> Result<Url> {
        let mut url = match Url::parse(&self.target) {
            Ok(url) => url,
            Err(_) => {
                let host = host.ok_or_else(|| {
                    Error::request(format!(
                        "request target '{}' has no scheme or host and no host is configured",
                        self.target
                    ))
                })?;
                self.with_host(host)?
            }
        };

        if !self.query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(self.query.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }

        Ok(url)
    }

    fn with_host(&self, host: &Url) -> Result<Url> {
        if self.target.starts_with("//") || self.target.starts_with("\\\\") {
            return Err(Error::request(format!(
                "request target '{}' names its own host",
                self.target
            )));
        }
        if host.cannot_be_a_base() {
            return Err(Error::request(format!("host '{host}' cannot carry a path")));
        }

        let (rest, fragment) = match self.target.split_once('#') {
            Some((rest, fragment)) => (rest, Some(fragment)),
            None => (self.target.as_str(), None),
        };
        let (path, query) = match rest.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (rest, None),
        };

        let mut url = host.clone();
        url.set_path(path);
        url.set_query(query);
        url.set_fragment(fragment);
        Ok(url)
    }

    /// Build the transport request
    pub fn into_reqwest(self, host: Option<&Url>) -> Result<reqwest::Request> {
        let url = self.resolve_url(host)?;
        let mut request = reqwest::Request::new(self.method, url);
        *request.headers_mut() = self.headers;
        *request.timeout_mut() = self.timeout;
        if let Some(body) = self.body {
            *request.body_mut() = Some(reqwest::Body::from(body));
        }
        Ok(request)
    }
}
