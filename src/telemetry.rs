//! src/telemetry.rs

use tracing::subscriber::set_global_default;
use tracing::Subscriber;
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_log::LogTracer;
use tracing_subscriber::{
    fmt::MakeWriter,
    layer::SubscriberExt,
    EnvFilter,
    Registry
};

/// Bunyan-formatted JSON subscriber. `RUST_LOG` wins over `env_filter` when set.
pub fn get_subscriber<Sink>(
    name: String,
    env_filter: String,
    sink: Sink
) -> impl Subscriber + Sync + Send
    where
        // Higher-ranked: the sink must hand out a writer for whatever borrow
        // the formatting layer holds, e.g. `std::io::stdout` or `std::io::sink`.
        Sink: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(env_filter));
    let formatting_layer = BunyanFormattingLayer::new(
        name,
        sink
    );

    Registry::default()
        .with(env_filter)
        // Stores span fields as JSON so the bunyan layer can print them on
        // every event inside the span (request_id, lead_email, ...).
        .with(JsonStorageLayer)
        .with(formatting_layer)
}

/// Installs `subscriber` globally and routes `log` records (actix-web's
/// access log among them) into it. Must be called only once.
pub fn init_subscriber(subscriber: impl Subscriber + Sync + Send) {
    LogTracer::init().expect("Failed to set logger");
    set_global_default(subscriber).expect("Failed to set subscriber");
}
