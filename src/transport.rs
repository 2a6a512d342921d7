//! Transport collaborator
//!
//! The pipeline never manages connections, TLS or DNS itself. It hands a
//! fully built request to a `Transport`, which by default is a shared
//! `reqwest::Client`.

use async_trait::async_trait;
use reqwest::{Client, Request, Response};
use std::time::Duration;

/// Executes a single HTTP request
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: Request) -> Result<Response, reqwest::Error>;
}

#[async_trait]
impl Transport for Client {
    async fn execute(&self, request: Request) -> Result<Response, reqwest::Error> {
        Client::execute(self, request).await
    }
}

/// Build the default transport
pub fn default_client(timeout: Duration, user_agent: &str) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(timeout)
        .user_agent(user_agent)
        .build()
}
