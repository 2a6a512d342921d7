//! Pre-request and post-response hooks
//!
//! Hooks run in the order they were configured. Pre-request hooks run once
//! per logical request, before authentication; they are not re-run on retry.
//! Post-response hooks run once over the final response.

use crate::request::Request;
use reqwest::header::HeaderMap;
use reqwest::Response;

/// Inspect or alter a request before it is sent
pub trait PreRequestHook: Send + Sync {
    fn on_request(&self, request: &mut Request) -> anyhow::Result<()>;
}

/// Inspect or alter the final response
pub trait PostResponseHook: Send + Sync {
    fn on_response(&self, response: &mut Response) -> anyhow::Result<()>;
}

impl<F> PreRequestHook for F
where
    F: Fn(&mut Request) -> anyhow::Result<()> + Send + Sync,
{
    fn on_request(&self, request: &mut Request) -> anyhow::Result<()> {
        self(request)
    }
}

impl<F> PostResponseHook for F
where
    F: Fn(&mut Response) -> anyhow::Result<()> + Send + Sync,
{
    fn on_response(&self, response: &mut Response) -> anyhow::Result<()> {
        self(response)
    }
}

/// Adds headers the request does not already carry
#[derive(Debug, Clone, Default)]
pub struct DefaultHeaders {
    headers: HeaderMap,
}

impl DefaultHeaders {
    pub fn new(headers: HeaderMap) -> Self {
        Self { headers }
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }
}

impl PreRequestHook for DefaultHeaders {
    fn on_request(&self, request: &mut Request) -> anyhow::Result<()> {
        let target = request.headers_mut();
        for (name, value) in &self.headers {
            if !target.contains_key(name) {
                target.insert(name.clone(), value.clone());
            }
        }
        Ok(())
    }
}
