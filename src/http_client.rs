//! Shared HTTP client construction policy.
//!
//! Every component that talks to the network (page extractor, prober, search
//! adapter, assistant, download proxy) builds its client here so connect
//! timeouts, compression, redirect handling and proxy compatibility stay
//! consistent. Per-operation timeouts are applied on each request instead of
//! on the client, because one client serves operations with different budgets.

use std::panic::{AssertUnwindSafe, catch_unwind, set_hook, take_hook};
use std::time::Duration;

use reqwest::redirect::Policy;
use reqwest::{Client, ClientBuilder, Proxy};
use thiserror::Error;
use tracing::warn;

/// Maximum redirect hops followed by every client.
const MAX_REDIRECTS: usize = 10;

/// Failure to construct an HTTP client.
#[derive(Debug, Error)]
pub enum ClientBuildError {
    /// The reqwest builder rejected the configuration.
    #[error("failed to build HTTP client for {purpose}: {source}")]
    Build {
        /// Which component requested the client.
        purpose: String,
        /// The underlying builder error.
        #[source]
        source: reqwest::Error,
    },

    /// Building panicked twice, including with the env-proxy fallback.
    #[error("HTTP client construction panicked for {purpose}")]
    Panicked {
        /// Which component requested the client.
        purpose: String,
    },
}

/// Builds an HTTP client with the shared policy.
///
/// `purpose` is only used for logging and error messages.
///
/// # Errors
///
/// Returns [`ClientBuildError`] when client construction fails.
pub fn build_http_client(
    purpose: &str,
    user_agent: &str,
    connect_timeout: Duration,
) -> Result<Client, ClientBuildError> {
    match try_build_client(user_agent, connect_timeout, false) {
        Ok(client) => Ok(client),
        Err(BuildClientFailure::Panic) => {
            // Some sandboxed environments panic when querying system proxy
            // settings; retry with env-var proxies only.
            warn!(
                purpose,
                "HTTP client hit system proxy panic; using env-proxy fallback builder"
            );
            match try_build_client(user_agent, connect_timeout, true) {
                Ok(client) => Ok(client),
                Err(BuildClientFailure::Panic) => Err(ClientBuildError::Panicked {
                    purpose: purpose.to_string(),
                }),
                Err(BuildClientFailure::Build(source)) => Err(ClientBuildError::Build {
                    purpose: purpose.to_string(),
                    source,
                }),
            }
        }
        Err(BuildClientFailure::Build(source)) => Err(ClientBuildError::Build {
            purpose: purpose.to_string(),
            source,
        }),
    }
}

enum BuildClientFailure {
    Panic,
    Build(reqwest::Error),
}

// `catch_unwind` does not suppress panic-hook output; silence it while the
// guarded build runs so expected recoveries keep stderr clean.
static CLIENT_BUILD_PANIC_HOOK_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

fn try_build_client(
    user_agent: &str,
    connect_timeout: Duration,
    disable_system_proxy_lookup: bool,
) -> Result<Client, BuildClientFailure> {
    let user_agent = user_agent.to_string();
    let _hook_guard = CLIENT_BUILD_PANIC_HOOK_LOCK
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    let previous_hook = take_hook();
    set_hook(Box::new(|_| {}));
    let outcome = catch_unwind(AssertUnwindSafe(move || {
        let mut builder = base_builder(user_agent, connect_timeout);
        if disable_system_proxy_lookup {
            builder = apply_env_proxy_fallback(builder.no_proxy());
        }
        builder.build().map_err(BuildClientFailure::Build)
    }));
    set_hook(previous_hook);
    outcome.map_err(|_| BuildClientFailure::Panic)?
}

fn base_builder(user_agent: String, connect_timeout: Duration) -> ClientBuilder {
    Client::builder()
        .connect_timeout(connect_timeout)
        .redirect(Policy::limited(MAX_REDIRECTS))
        .user_agent(user_agent)
        .gzip(true)
}

fn apply_env_proxy_fallback(mut builder: ClientBuilder) -> ClientBuilder {
    if let Some(proxy) = env_proxy_for_scheme("https")
        && let Ok(resolved) = Proxy::https(&proxy)
    {
        builder = builder.proxy(resolved);
    }
    if let Some(proxy) = env_proxy_for_scheme("http")
        && let Ok(resolved) = Proxy::http(&proxy)
    {
        builder = builder.proxy(resolved);
    }
    builder
}

fn env_proxy_for_scheme(scheme: &str) -> Option<String> {
    match scheme {
        "https" => find_first_proxy_var(&["HTTPS_PROXY", "https_proxy", "ALL_PROXY", "all_proxy"]),
        "http" => find_first_proxy_var(&["HTTP_PROXY", "http_proxy", "ALL_PROXY", "all_proxy"]),
        _ => None,
    }
}

fn find_first_proxy_var(names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| {
        std::env::var(name)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_http_client_succeeds_with_defaults() {
        let client = build_http_client("test", "filefinder-test", Duration::from_secs(5));
        assert!(client.is_ok(), "client should build: {:?}", client.err());
    }

    #[test]
    fn test_env_proxy_for_unknown_scheme_is_none() {
        assert!(env_proxy_for_scheme("ftp").is_none());
    }

    #[test]
    fn test_client_build_error_display_names_purpose() {
        let error = ClientBuildError::Panicked {
            purpose: "download-proxy".to_string(),
        };
        assert!(error.to_string().contains("download-proxy"));
    }
}
