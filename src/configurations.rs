//! src/configurations.rs

use secrecy::{ExposeSecret, Secret};

#[derive(serde::Deserialize, Clone, Debug)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub email_client: EmailClientSettings,
}

#[derive(serde::Deserialize, Clone, Debug)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
    pub allowed_origin: String,
}

/// Mail provider settings. Everything that identifies who sends and who
/// receives is optional here: a deployment missing one of them still boots
/// and reports the gap on every lead submission.
#[derive(serde::Deserialize, Clone, Debug)]
pub struct EmailClientSettings {
    pub base_url: String,
    pub api_key: Option<Secret<String>>,
    pub sender_email: Option<String>,
    pub sales_recipient: Option<String>,
    pub bcc_email: Option<String>,
    pub timeout_milliseconds: u64,
}

/// Mail settings with every required value present and non-blank.
#[derive(Clone, Debug)]
pub struct MailSecrets {
    pub api_key: Secret<String>,
    pub sender_email: String,
    pub sales_recipient: String,
    pub bcc_email: Option<String>,
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("Mail secrets not configured: {}", .0.join(", "))]
pub struct MissingMailSecrets(pub Vec<&'static str>);

impl EmailClientSettings {
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.timeout_milliseconds)
    }

    pub fn resolve(&self) -> Result<MailSecrets, MissingMailSecrets> {
        let api_key = self
            .api_key
            .as_ref()
            .filter(|key| !key.expose_secret().trim().is_empty())
            .cloned();
        let sender_email = non_blank(&self.sender_email);
        let sales_recipient = non_blank(&self.sales_recipient);

        match (api_key, sender_email, sales_recipient) {
            (Some(api_key), Some(sender_email), Some(sales_recipient)) => Ok(MailSecrets {
                api_key,
                sender_email,
                sales_recipient,
                bcc_email: non_blank(&self.bcc_email),
            }),
            (api_key, sender_email, sales_recipient) => {
                let mut missing = Vec::new();
                if api_key.is_none() {
                    missing.push("api_key");
                }
                if sender_email.is_none() {
                    missing.push("sender_email");
                }
                if sales_recipient.is_none() {
                    missing.push("sales_recipient");
                }
                Err(MissingMailSecrets(missing))
            }
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

pub enum Environment {
    Local,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{} is not a supported environment. Use either `local` or `production`.",
                other
            )),
        }
    }
}

pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let base_path = std::env::current_dir()
        .map_err(|e| config::ConfigError::Message(format!("Failed to determine the current directory: {}", e)))?;
    let configuration_directory = base_path.join("configuration");

    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .map_err(config::ConfigError::Message)?;
    let environment_filename = format!("{}.yaml", environment.as_str());

    let settings = config::Config::builder()
        .add_source(config::File::from(configuration_directory.join("base.yaml")))
        .add_source(config::File::from(configuration_directory.join(environment_filename)))
        // `_` only splits the prefix off; `__` marks nesting, so
        // APP_EMAIL_CLIENT__API_KEY sets `email_client.api_key` and the single
        // underscores inside `email_client`/`api_key` survive. `try_parsing`
        // lets APP_APPLICATION__PORT land in a `u16`.
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    settings.try_deserialize::<Settings>()
}
