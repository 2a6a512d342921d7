//! CLI runner - executes commands

use crate::backoff::BackoffType;
use crate::cli::commands::{BackoffArg, Cli, Commands, FetchArgs};
use crate::client::HttpClient;
use crate::config::{HttpConfig, RateLimitConfig, RetryConfig};
use crate::context::Context;
use crate::decode::decode_bytes;
use crate::error::{Error, Result};
use crate::request::Request;
use reqwest::Method;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Fetch(args) => self.fetch(args).await,
            Commands::Validate => self.validate(),
        }
    }

    fn load_config(&self) -> Result<HttpConfig> {
        match &self.cli.config {
            Some(path) => {
                debug!(path = %path.display(), "Loading client config");
                HttpConfig::from_file(path)
            }
            None => Ok(HttpConfig::default()),
        }
    }

    async fn fetch(&self, args: &FetchArgs) -> Result<()> {
        let mut config = self.load_config()?;
        apply_overrides(&mut config, args);

        let request = build_request(args)?;
        let client = HttpClient::from_config(&config)?;
        let ctx = match args.timeout_ms {
            Some(ms) => Context::background().with_timeout(Duration::from_millis(ms)),
            None => Context::background(),
        };

        let start = Instant::now();
        let result = self.send_and_print(&client, &ctx, request).await;
        client.close();

        info!(
            target = %args.target,
            elapsed_ms = start.elapsed().as_millis() as u64,
            ok = result.is_ok(),
            "Fetch finished"
        );
        result
    }

    async fn send_and_print(&self, client: &HttpClient, ctx: &Context, request: Request) -> Result<()> {
        let response = client.send(ctx, request).await?;

        println!("{:?} {}", response.version(), response.status());
        if self.cli.verbose {
            for (name, value) in response.headers() {
                println!("{}: {}", name, value.to_str().unwrap_or("<binary>"));
            }
            println!();
        }

        let body = decode_bytes(response).await?;
        println!("{}", String::from_utf8_lossy(&body));
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        let Some(path) = &self.cli.config else {
            return Err(Error::config("no configuration file given (use --config)"));
        };
        let config = HttpConfig::from_file(path)?;
        let options = config.to_options()?;
        if let Some(limiter) = &options.rate_limiter {
            limiter.close();
        }

        println!("Configuration is valid: {}", path.display());
        println!(
            "  host: {}",
            options.host.as_ref().map_or("(none)", |url| url.as_str())
        );
        println!("  rate limiting: {}", config.rate_limit.is_some());
        println!("  retries: {}", config.retry.is_some());
        println!("  authentication: {}", !config.auth.is_none());
        Ok(())
    }
}

/// Fold command-line flags into the loaded config
///
/// Any retry flag enables retries. Without an explicit `--backoff` a config
/// that never retried switches to limited tries.
fn apply_overrides(config: &mut HttpConfig, args: &FetchArgs) {
    let wants_retry = !args.retry_statuses.is_empty()
        || args.retries.is_some()
        || args.backoff.is_some()
        || args.backoff_base_ms.is_some();

    if wants_retry {
        let retry = config.retry.get_or_insert_with(RetryConfig::default);
        if !args.retry_statuses.is_empty() {
            retry.statuses.clone_from(&args.retry_statuses);
        }
        if let Some(retries) = args.retries {
            retry.backoff.retries = retries;
        }
        if let Some(base_ms) = args.backoff_base_ms {
            retry.backoff.base_ms = base_ms;
        }
        retry.backoff.backoff_type = match args.backoff {
            Some(BackoffArg::None) => BackoffType::None,
            Some(BackoffArg::Constant) if args.retries.is_some() => BackoffType::LimitedTries,
            Some(BackoffArg::Constant) => BackoffType::Constant,
            Some(BackoffArg::Exponential) => BackoffType::Exponential,
            None if retry.backoff.backoff_type == BackoffType::None => BackoffType::LimitedTries,
            None => retry.backoff.backoff_type,
        };
    }

    if let Some(capacity) = args.rate_limit {
        config.rate_limit = Some(RateLimitConfig {
            capacity,
            refill_period_ms: args.refill_ms,
            ..RateLimitConfig::default()
        });
    }
}

fn build_request(args: &FetchArgs) -> Result<Request> {
    let method = Method::from_bytes(args.method.to_uppercase().as_bytes())
        .map_err(|e| Error::request(format!("invalid method '{}': {e}", args.method)))?;

    let mut request = Request::new(method, args.target.as_str());
    for header in &args.headers {
        let (name, value) = parse_header(header)?;
        request.set_header(name, value)?;
    }
    if let Some(data) = &args.data {
        request = request.body(data.clone());
    }
    Ok(request)
}

/// Split `Name: value`
fn parse_header(raw: &str) -> Result<(&str, &str)> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| Error::request(format!("header '{raw}' is not in 'Name: value' form")))?;
    Ok((name.trim(), value.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use wiremock::matchers::{body_string, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetch_args(extra: &[&str]) -> FetchArgs {
        let mut argv = vec!["solidafy-http", "fetch", "/target"];
        argv.extend_from_slice(extra);
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Fetch(args) => args,
            Commands::Validate => unreachable!(),
        }
    }

    #[test]
    fn test_parse_header() {
        assert_eq!(
            parse_header("Accept: application/json").unwrap(),
            ("Accept", "application/json")
        );
        assert_eq!(parse_header("X-Url:http://a:b").unwrap(), ("X-Url", "http://a:b"));
        assert!(parse_header("no-colon").is_err());
    }

    #[test]
    fn test_no_flags_leave_config_alone() {
        let mut config = HttpConfig::default();
        apply_overrides(&mut config, &fetch_args(&[]));
        assert_eq!(config, HttpConfig::default());
    }

    #[test]
    fn test_retry_status_enables_limited_tries() {
        let mut config = HttpConfig::default();
        apply_overrides(&mut config, &fetch_args(&["--retry-status", "503", "--retries", "2"]));

        let retry = config.retry.unwrap();
        assert_eq!(retry.statuses, vec![503]);
        assert_eq!(retry.backoff.backoff_type, BackoffType::LimitedTries);
        assert_eq!(retry.backoff.retries, 2);
    }

    #[test]
    fn test_backoff_selection() {
        let mut config = HttpConfig::default();
        apply_overrides(&mut config, &fetch_args(&["--backoff", "constant"]));
        assert_eq!(config.retry.unwrap().backoff.backoff_type, BackoffType::Constant);

        let mut config = HttpConfig::default();
        apply_overrides(
            &mut config,
            &fetch_args(&["--backoff", "exponential", "--backoff-base-ms", "20"]),
        );
        let backoff = config.retry.unwrap().backoff;
        assert_eq!(backoff.backoff_type, BackoffType::Exponential);
        assert_eq!(backoff.base_ms, 20);
    }

    #[test]
    fn test_rate_limit_flags() {
        let mut config = HttpConfig::default();
        apply_overrides(&mut config, &fetch_args(&["--rate-limit", "3", "--refill-ms", "250"]));
        let rate_limit = config.rate_limit.unwrap();
        assert_eq!(rate_limit.capacity, 3);
        assert_eq!(rate_limit.refill_period_ms, 250);
    }

    #[test]
    fn test_build_request_rejects_bad_method() {
        let args = fetch_args(&["-X", "NOT A METHOD"]);
        assert!(matches!(
            build_request(&args).unwrap_err(),
            Error::RequestConstruction { .. }
        ));
    }

    #[tokio::test]
    async fn test_fetch_against_server() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/items/1"))
            .and(header("x-trace", "1"))
            .and(body_string("payload"))
            .respond_with(ResponseTemplate::new(200).set_body_string("stored"))
            .expect(1)
            .mount(&server)
            .await;

        let url = format!("{}/items/1", server.uri());
        let cli = Cli::try_parse_from([
            "solidafy-http",
            "fetch",
            url.as_str(),
            "-X",
            "put",
            "-H",
            "X-Trace: 1",
            "-d",
            "payload",
            "--rate-limit",
            "2",
        ])
        .unwrap();

        Runner::new(cli).run().await.unwrap();
    }

    #[tokio::test]
    async fn test_fetch_retry_exhaustion_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;

        let cli = Cli::try_parse_from([
            "solidafy-http",
            "fetch",
            server.uri().as_str(),
            "--retry-status",
            "503",
            "--retries",
            "2",
            "--backoff-base-ms",
            "1",
        ])
        .unwrap();

        let err = Runner::new(cli).run().await.unwrap_err();
        assert!(err.is_retry_exhausted());
    }

    #[tokio::test]
    async fn test_validate_requires_config() {
        let cli = Cli::try_parse_from(["solidafy-http", "validate"]).unwrap();
        assert!(matches!(
            Runner::new(cli).run().await.unwrap_err(),
            Error::Config { .. }
        ));
    }

    #[tokio::test]
    async fn test_validate_config_file() {
        let file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        std::fs::write(
            file.path(),
            "host: https://api.example.com\nrate_limit:\n  capacity: 2\n",
        )
        .unwrap();

        let cli = Cli::try_parse_from([
            "solidafy-http",
            "validate",
            "--config",
            file.path().to_str().unwrap(),
        ])
        .unwrap();
        Runner::new(cli).run().await.unwrap();
    }
}
