//! Tracing subscriber setup.

use crate::config::Environment;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset. Connection-level chatter from the
/// backing service client stays at WARN everywhere.
pub fn default_directives(env: &Environment) -> &'static str {
    match env {
        Environment::Dev => "incident_desk=debug,tower_http=debug,hyper_util=warn,reqwest=info,info",
        Environment::Staging => "incident_desk=debug,tower_http=info,hyper_util=warn,reqwest=warn,info",
        Environment::Prod => "incident_desk=info,tower_http=info,hyper_util=warn,reqwest=warn,warn",
    }
}

pub fn init_logging(env: &Environment) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(env)));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_file(env.is_dev())
        .with_line_number(env.is_dev());

    let registry = tracing_subscriber::registry().with(filter);
    if env.is_prod() {
        // One flat JSON object per event for the log shipper
        registry
            .with(fmt_layer.json().flatten_event(true).with_current_span(true))
            .init();
    } else {
        registry.with(fmt_layer.pretty()).init();
    }

    tracing::info!(env = ?env, "Logging initialized");
}
