//! Retry orchestration
//!
//! One executor drives one logical request. Exactly one execution is in
//! flight at a time; the request is replayed unchanged on every attempt.

use super::RetryPolicy;
use crate::backoff::Backoff;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::transport::Transport;
use reqwest::{Request, Response};
use tracing::{debug, warn};

/// Drives execute, evaluate and wait for a single request
pub struct RetryExecutor<'a> {
    transport: &'a dyn Transport,
    policy: Option<&'a dyn RetryPolicy>,
    backoff: Box<dyn Backoff>,
}

impl<'a> RetryExecutor<'a> {
    /// Create an executor
    ///
    /// Without a policy the request is executed once. The backoff instance
    /// belongs to this executor alone.
    pub fn new(
        transport: &'a dyn Transport,
        policy: Option<&'a dyn RetryPolicy>,
        backoff: Box<dyn Backoff>,
    ) -> Self {
        Self {
            transport,
            policy,
            backoff,
        }
    }

    /// Run the request until the policy is satisfied
    ///
    /// Fails with `RetryExhausted` when the backoff runs out while the policy
    /// still wants another attempt, with `RetryCancelled` when the context
    /// ends during a wait, and with `Cancelled` when it ends mid-execution.
    pub async fn execute(mut self, ctx: &Context, request: Request) -> Result<Response> {
        let transport = self.transport;
        let Some(policy) = self.policy else {
            return execute_once(transport, ctx, request, 1)
                .await?
                .map_err(Error::Http);
        };

        let mut attempts: u32 = 0;
        loop {
            let attempt = request
                .try_clone()
                .ok_or_else(|| Error::request("request body cannot be replayed"))?;
            attempts += 1;

            let outcome = execute_once(transport, ctx, attempt, attempts).await?;

            if !policy.should_retry(&outcome) {
                if attempts > 1 {
                    debug!(attempts, "Request settled after retries");
                }
                return outcome.map_err(Error::Http);
            }

            let last_status = outcome.as_ref().ok().map(Response::status);
            let Some(delay) = self.backoff.next_delay() else {
                warn!(attempts, ?last_status, "Retries exhausted");
                return Err(Error::RetryExhausted {
                    attempts,
                    last_status,
                });
            };

            match &outcome {
                Ok(response) => warn!(
                    status = response.status().as_u16(),
                    attempt = attempts,
                    ?delay,
                    "Retrying request"
                ),
                Err(e) => warn!(error = %e, attempt = attempts, ?delay, "Retrying request"),
            }
            drop(outcome);

            ctx.run(tokio::time::sleep(delay))
                .await
                .map_err(|source| Error::RetryCancelled { attempts, source })?;
        }
    }
}

/// Run one attempt; `attempt` is recorded if the context ends mid-flight
async fn execute_once(
    transport: &dyn Transport,
    ctx: &Context,
    request: Request,
    attempt: u32,
) -> Result<super::Outcome> {
    ctx.run(transport.execute(request))
        .await
        .map_err(|source| Error::Cancelled {
            attempts: attempt,
            source,
        })
}
