//! TOML configuration with environment overrides.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use url::Url;

use jobwatch_listings::{
    DEFAULT_USER_AGENT, EmptyPolicy, Extractor, FilterCriteria, HtmlSelectors, ListingFormat,
    ListingsError, MatchField,
};
use jobwatch_notify::{
    ConsoleNotifier, MailConfig, MultiNotifier, Notifier, NotifyError, ReportContext, SmtpNotifier,
};
use jobwatch_scheduler::{Schedule, ScheduleSlot, SchedulerError};

pub const SMTP_PASSWORD_ENV: &str = "JOBWATCH_SMTP_PASSWORD";
pub const SENDER_EMAIL_ENV: &str = "JOBWATCH_SENDER_EMAIL";
pub const RECEIVER_EMAIL_ENV: &str = "JOBWATCH_RECEIVER_EMAIL";
pub const SMTP_SERVER_ENV: &str = "JOBWATCH_SMTP_SERVER";
pub const SMTP_PORT_ENV: &str = "JOBWATCH_SMTP_PORT";

const DEFAULT_SNAPSHOT_PATH: &str = "jobwatch_snapshot.json";
const DEFAULT_SMTP_PORT: u16 = 587;

/// Errors raised while loading or applying configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("{0} must be set when notifications are sent by email")]
    MissingEmailSetting(&'static str),

    #[error(transparent)]
    Listings(#[from] ListingsError),

    #[error(transparent)]
    Notify(#[from] NotifyError),

    #[error(transparent)]
    Schedule(#[from] SchedulerError),
}

/// The whole configuration file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub source: SourceConfig,
    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(default)]
    pub snapshot: SnapshotConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default)]
    pub schedule: Vec<ScheduleSlot>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    Lever,
    Greenhouse,
    #[default]
    Html,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    pub url: String,
    #[serde(default)]
    pub format: SourceFormat,
    /// Site label for reports (default: the URL's host).
    pub name: Option<String>,
    pub user_agent: Option<String>,
    pub html: Option<HtmlSelectors>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilterConfig {
    #[serde(default)]
    pub keywords: Vec<String>,
    pub fields: Option<Vec<MatchField>>,
    #[serde(default)]
    pub when_empty: EmptyPolicy,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SnapshotConfig {
    #[serde(default = "default_snapshot_path")]
    pub path: PathBuf,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            path: default_snapshot_path(),
        }
    }
}

fn default_snapshot_path() -> PathBuf {
    PathBuf::from(DEFAULT_SNAPSHOT_PATH)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotifyMethod {
    #[default]
    Console,
    Email,
    Both,
}

impl NotifyMethod {
    fn uses_email(self) -> bool {
        matches!(self, Self::Email | Self::Both)
    }

    fn uses_console(self) -> bool {
        matches!(self, Self::Console | Self::Both)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NotifyConfig {
    #[serde(default)]
    pub method: NotifyMethod,
    pub smtp_server: Option<String>,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    pub sender: Option<String>,
    pub receiver: Option<String>,
    #[serde(default)]
    pub report_removed: bool,
    /// Only ever read from the environment.
    #[serde(skip)]
    pub password: Option<Secret>,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            method: NotifyMethod::default(),
            smtp_server: None,
            smtp_port: DEFAULT_SMTP_PORT,
            sender: None,
            receiver: None,
            report_removed: false,
            password: None,
        }
    }
}

fn default_smtp_port() -> u16 {
    DEFAULT_SMTP_PORT
}

/// A credential that never shows up in logs.
#[derive(Clone)]
pub struct Secret(String);

impl Secret {
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[redacted]")
    }
}

impl Config {
    /// Read the file at `path`, then apply environment overrides via `env`.
    pub fn load<F>(path: &Path, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Config = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.apply_env(env)?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay the `JOBWATCH_*` environment variables. Blank values are ignored.
    pub fn apply_env<F>(&mut self, env: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| env(name).filter(|v| !v.trim().is_empty());

        if let Some(server) = get(SMTP_SERVER_ENV) {
            self.notify.smtp_server = Some(server);
        }
        if let Some(port) = get(SMTP_PORT_ENV) {
            self.notify.smtp_port = port.trim().parse().map_err(|_| {
                ConfigError::Invalid(format!("{} is not a port number: {}", SMTP_PORT_ENV, port))
            })?;
        }
        if let Some(sender) = get(SENDER_EMAIL_ENV) {
            self.notify.sender = Some(sender);
        }
        if let Some(receiver) = get(RECEIVER_EMAIL_ENV) {
            self.notify.receiver = Some(receiver);
        }
        if let Some(password) = get(SMTP_PASSWORD_ENV) {
            self.notify.password = Some(Secret(password));
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        Url::parse(&self.source.url).map_err(|e| {
            ConfigError::Invalid(format!("source.url `{}`: {}", self.source.url, e))
        })?;
        if self.source.format == SourceFormat::Html && self.source.html.is_none() {
            return Err(ConfigError::Invalid(
                "source.format = \"html\" needs a [source.html] section with selectors".to_string(),
            ));
        }
        if let Some(fields) = &self.filter.fields
            && fields.is_empty()
        {
            return Err(ConfigError::Invalid(
                "filter.fields must name at least one field".to_string(),
            ));
        }
        Ok(())
    }

    /// Site label used in report subjects.
    pub fn site_name(&self) -> String {
        if let Some(name) = &self.source.name {
            return name.clone();
        }
        Url::parse(&self.source.url)
            .ok()
            .and_then(|url| url.host_str().map(str::to_string))
            .unwrap_or_else(|| self.source.url.clone())
    }

    pub fn user_agent(&self) -> &str {
        self.source.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT)
    }

    pub fn criteria(&self) -> FilterCriteria {
        let mut criteria = FilterCriteria::new(&self.filter.keywords)
            .with_empty_policy(self.filter.when_empty);
        if let Some(fields) = &self.filter.fields {
            criteria = criteria.with_fields(fields.clone());
        }
        criteria
    }

    pub fn extractor(&self) -> Result<Extractor, ConfigError> {
        let format = match self.source.format {
            SourceFormat::Lever => ListingFormat::Lever,
            SourceFormat::Greenhouse => ListingFormat::Greenhouse,
            SourceFormat::Html => {
                let selectors = self.source.html.clone().ok_or_else(|| {
                    ConfigError::Invalid("missing [source.html] selectors".to_string())
                })?;
                ListingFormat::Html(selectors)
            }
        };
        Ok(Extractor::new(&self.source.url, format, self.criteria())?)
    }

    /// The slots for scheduled mode. An empty list is an error here.
    pub fn schedule(&self) -> Result<Schedule, ConfigError> {
        Ok(Schedule::new(self.schedule.clone())?)
    }

    pub fn report_context(&self) -> ReportContext {
        ReportContext {
            site_name: self.site_name(),
            source_url: self.source.url.clone(),
            keywords: self.filter.keywords.clone(),
            include_removed: self.notify.report_removed,
        }
    }

    /// SMTP settings, checked for completeness.
    pub fn mail_config(&self) -> Result<MailConfig, ConfigError> {
        let notify = &self.notify;
        let server = notify
            .smtp_server
            .as_deref()
            .ok_or(ConfigError::MissingEmailSetting("notify.smtp_server"))?;
        let sender = notify
            .sender
            .as_deref()
            .ok_or(ConfigError::MissingEmailSetting("notify.sender"))?;
        let receiver = notify
            .receiver
            .as_deref()
            .ok_or(ConfigError::MissingEmailSetting("notify.receiver"))?;
        let password = notify
            .password
            .as_ref()
            .ok_or(ConfigError::MissingEmailSetting(SMTP_PASSWORD_ENV))?;

        Ok(MailConfig::new(
            server,
            notify.smtp_port,
            sender,
            receiver,
            password.expose(),
        )?)
    }

    /// Build the configured delivery channel(s).
    pub fn notifier(&self) -> Result<Box<dyn Notifier>, ConfigError> {
        let method = self.notify.method;
        let mut channels: Vec<Box<dyn Notifier>> = Vec::new();

        if method.uses_console() {
            channels.push(Box::new(ConsoleNotifier));
        }
        if method.uses_email() {
            channels.push(Box::new(SmtpNotifier::new(&self.mail_config()?)?));
        }

        if channels.len() == 1
            && let Some(channel) = channels.pop()
        {
            return Ok(channel);
        }
        Ok(Box::new(MultiNotifier::new(channels)))
    }
}
