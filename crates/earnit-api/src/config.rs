use std::{env, sync::OnceLock};

use tracing::warn;

/// Local development server used when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";
/// Runtime override read when no base URL was baked in at build time.
pub const BASE_URL_ENV: &str = "EARNIT_API_BASE_URL";

static RESOLVED: OnceLock<BaseUrl> = OnceLock::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseUrlSource {
    /// `API_BASE_URL` set when the crate was compiled.
    Compiled,
    /// `EARNIT_API_BASE_URL` set at runtime.
    Environment,
    Default,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseUrl {
    pub url: String,
    pub source: BaseUrlSource,
}

/// Pick the API base URL: build-time value, then runtime value, then the local default.
/// Blank or whitespace-only values count as missing; others are used trimmed.
pub fn resolve_base_url(compiled: Option<&str>, runtime: Option<&str>) -> BaseUrl {
    fn pick<'a>(value: Option<&'a str>) -> Option<&'a str> {
        value.map(str::trim).filter(|v| !v.is_empty())
    }

    if let Some(url) = pick(compiled) {
        return BaseUrl {
            url: url.to_string(),
            source: BaseUrlSource::Compiled,
        };
    }
    if let Some(url) = pick(runtime) {
        return BaseUrl {
            url: url.to_string(),
            source: BaseUrlSource::Environment,
        };
    }
    BaseUrl {
        url: DEFAULT_BASE_URL.to_string(),
        source: BaseUrlSource::Default,
    }
}

/// Base URL for this process, resolved on first use and never again.
pub fn default_base_url() -> &'static BaseUrl {
    RESOLVED.get_or_init(|| {
        let runtime = env::var(BASE_URL_ENV).ok();
        let resolved = resolve_base_url(option_env!("API_BASE_URL"), runtime.as_deref());
        if cfg!(debug_assertions) && resolved.source != BaseUrlSource::Compiled {
            warn!(url = %resolved.url, "API_BASE_URL missing from build env, using fallback");
        }
        resolved
    })
}

/// WebSocket endpoint for realtime updates: `http(s)` becomes `ws(s)` and the
/// token rides in the query string.
pub fn realtime_url(base: &str, token: &str) -> String {
    let base = base.trim_end_matches('/');
    let ws_base = match base.strip_prefix("http") {
        Some(rest) => format!("ws{rest}"),
        None => base.to_string(),
    };
    format!("{ws_base}/ws?token={token}")
}
