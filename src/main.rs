//! main.rs

use std::net::TcpListener;
use anyhow::Context;
use lead_relay::configurations::get_configuration;
use lead_relay::email_client::LeadMailer;
use lead_relay::startup::run;
use lead_relay::telemetry::{get_subscriber, init_subscriber};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = get_subscriber("lead_relay".into(), "info".into(), std::io::stdout);
    init_subscriber(subscriber);

    let configuration = get_configuration().context("Failed to read configuration")?;
    let mailer = LeadMailer::from_settings(configuration.email_client)
        .context("Failed to build the email client")?;
    if let Err(missing) = mailer.check() {
        // Keep serving: every lead will be answered with a configuration error.
        tracing::warn!(error.message = %missing, "Mail settings are incomplete");
    }

    let addr = format!("{}:{}", configuration.application.host, configuration.application.port);
    let listener = TcpListener::bind(&addr)
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!(%addr, "Lead relay listening");
    run(listener, mailer, configuration.application.allowed_origin)?.await?;
    Ok(())
}
