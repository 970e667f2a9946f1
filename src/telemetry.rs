//! Tracing setup for the service.
//!
//! LOG_LEVEL takes either a bare level ("debug") or full directives; unset or
//! unparsable falls back to `DEFAULT_DIRECTIVES`. LOG_FORMAT picks "json" for
//! structured lines, anything else prints the human-readable format.
//!
//! Targets: "ielts_backend" for service plumbing, "ielts" for learning events.
//! Request spans come from the TraceLayer in `routes`.

use tracing_subscriber::EnvFilter;

const DEFAULT_DIRECTIVES: &str = "info,ielts=debug,ielts_backend=debug,tower_http=info,axum=info";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    fn from_env_value(v: Option<&str>) -> Self {
        match v.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

fn filter_from(directives: Option<&str>) -> EnvFilter {
    directives
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_DIRECTIVES))
}

pub fn init_tracing() {
    let level = std::env::var("LOG_LEVEL").ok();
    let format = LogFormat::from_env_value(std::env::var("LOG_FORMAT").ok().as_deref());

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter_from(level.as_deref()))
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    // The two builders have different types, so each arm calls init itself.
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
    tracing::debug!(target: "ielts_backend", ?format, "Tracing initialized");
}
