//! Shared HTTP client construction for the arXiv API and PDF downloads.
//!
//! Both clients use the same policy: project User-Agent, gzip, a connect
//! timeout, and a whole-request timeout supplied by the caller.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Duration;

use reqwest::{Client, ClientBuilder, Proxy};
use tracing::warn;

use crate::user_agent;

/// Connect timeout applied to every client.
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

enum BuildClientFailure {
    Panic,
    Build(reqwest::Error),
}

/// Builds an HTTP client whose requests are bounded by `request_timeout`.
///
/// Some sandboxed environments panic while the builder reads system proxy
/// settings. In that case the build is retried with only the `*_PROXY`
/// environment variables honoured.
///
/// # Errors
///
/// Returns the underlying [`reqwest::Error`] when the builder rejects the
/// configuration.
pub fn build_http_client(request_timeout: Duration) -> Result<Client, reqwest::Error> {
    match try_build_client(request_timeout, false) {
        Ok(client) => Ok(client),
        Err(BuildClientFailure::Build(error)) => Err(error),
        Err(BuildClientFailure::Panic) => {
            warn!("HTTP client builder panicked while loading system proxy settings; retrying with env-proxy fallback");
            match try_build_client(request_timeout, true) {
                Ok(client) => Ok(client),
                Err(BuildClientFailure::Build(error)) => Err(error),
                // Last resort: no proxy lookup at all.
                Err(BuildClientFailure::Panic) => base_builder(request_timeout).no_proxy().build(),
            }
        }
    }
}

fn try_build_client(
    request_timeout: Duration,
    disable_system_proxy_lookup: bool,
) -> Result<Client, BuildClientFailure> {
    catch_unwind(AssertUnwindSafe(move || {
        let mut builder = base_builder(request_timeout);
        if disable_system_proxy_lookup {
            builder = apply_env_proxy_fallback(builder.no_proxy());
        }
        builder.build().map_err(BuildClientFailure::Build)
    }))
    .map_err(|_| BuildClientFailure::Panic)?
}

fn base_builder(request_timeout: Duration) -> ClientBuilder {
    Client::builder()
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS).min(request_timeout))
        .timeout(request_timeout)
        .gzip(true)
        .user_agent(user_agent::default_user_agent())
}

fn apply_env_proxy_fallback(mut builder: ClientBuilder) -> ClientBuilder {
    if let Some(proxy) = find_first_proxy_var(&["HTTPS_PROXY", "https_proxy", "ALL_PROXY", "all_proxy"])
        && let Ok(resolved) = Proxy::https(&proxy)
    {
        builder = builder.proxy(resolved);
    }
    if let Some(proxy) = find_first_proxy_var(&["HTTP_PROXY", "http_proxy", "ALL_PROXY", "all_proxy"])
        && let Ok(resolved) = Proxy::http(&proxy)
    {
        builder = builder.proxy(resolved);
    }
    builder
}

fn find_first_proxy_var(names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| {
        std::env::var(name)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    })
}
