use secrecy::{ExposeSecret, SecretString};
use std::env;
use std::str::FromStr;

use crate::MailerError;

/// How the SMTP connection is secured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SmtpSecurity {
    /// Upgrade a plain connection with STARTTLS (port 587).
    #[default]
    StartTls,
    /// Implicit TLS from the first byte (port 465).
    Tls,
    /// No encryption. Only for local relays such as a dev mail catcher.
    None,
}

impl FromStr for SmtpSecurity {
    type Err = MailerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "starttls" => Ok(Self::StartTls),
            "tls" | "ssl" => Ok(Self::Tls),
            "none" | "plain" => Ok(Self::None),
            other => Err(MailerError::Config(format!("Invalid SMTP_SECURITY: {}", other))),
        }
    }
}

/// Configuration for connecting to an SMTP relay.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    /// SMTP host
    pub smtp_host: String,
    /// SMTP port (default: 587)
    pub smtp_port: u16,
    /// Connection security (default: STARTTLS)
    pub security: SmtpSecurity,
    /// Login name, if the relay requires authentication
    pub username: Option<String>,
    /// Sender address placed in the From header
    pub from_address: String,
    /// Optional display name for the sender
    pub from_name: Option<String>,
    password: Option<SecretString>,
}

impl SmtpConfig {
    /// Create a new configuration with explicit values.
    pub fn new(
        smtp_host: impl Into<String>,
        smtp_port: u16,
        from_address: impl Into<String>,
    ) -> Self {
        Self {
            smtp_host: smtp_host.into(),
            smtp_port,
            security: SmtpSecurity::default(),
            username: None,
            from_address: from_address.into(),
            from_name: None,
            password: None,
        }
    }

    /// Create configuration from environment variables.
    ///
    /// Required:
    /// - `SMTP_HOST` - Relay host name
    /// - `SMTP_FROM` - Sender address
    ///
    /// Optional (with defaults):
    /// - `SMTP_PORT` - Default: 587
    /// - `SMTP_SECURITY` - `starttls` (default), `tls` or `none`
    /// - `SMTP_USERNAME` / `SMTP_PASSWORD` - Credentials, both or neither
    /// - `SMTP_FROM_NAME` - Sender display name
    pub fn from_env() -> Result<Self, MailerError> {
        let smtp_host =
            env::var("SMTP_HOST").map_err(|_| MailerError::MissingEnvVar("SMTP_HOST".to_string()))?;

        let from_address =
            env::var("SMTP_FROM").map_err(|_| MailerError::MissingEnvVar("SMTP_FROM".to_string()))?;

        let smtp_port = env::var("SMTP_PORT")
            .unwrap_or_else(|_| "587".to_string())
            .parse::<u16>()
            .map_err(|e| MailerError::Config(format!("Invalid SMTP_PORT: {}", e)))?;

        let security = match env::var("SMTP_SECURITY") {
            Ok(value) => value.parse()?,
            Err(_) => SmtpSecurity::default(),
        };

        let mut config = Self::new(smtp_host, smtp_port, from_address).with_security(security);
        config.from_name = env::var("SMTP_FROM_NAME").ok();

        match (env::var("SMTP_USERNAME"), env::var("SMTP_PASSWORD")) {
            (Ok(username), Ok(password)) => {
                config = config.with_credentials(username, password);
            }
            (Err(_), Err(_)) => {}
            (Ok(_), Err(_)) => return Err(MailerError::MissingEnvVar("SMTP_PASSWORD".to_string())),
            (Err(_), Ok(_)) => return Err(MailerError::MissingEnvVar("SMTP_USERNAME".to_string())),
        }

        Ok(config)
    }

    /// Whether SMTP is configured in the environment at all.
    pub fn is_configured_in_env() -> bool {
        env::var("SMTP_HOST").is_ok()
    }

    /// Get the password (exposes the secret).
    pub(crate) fn password(&self) -> Option<&str> {
        self.password.as_ref().map(|p| p.expose_secret())
    }

    /// Builder method to set credentials.
    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(SecretString::from(password.into()));
        self
    }

    /// Builder method to set connection security.
    pub fn with_security(mut self, security: SmtpSecurity) -> Self {
        self.security = security;
        self
    }

    /// Builder method to set the sender display name.
    pub fn with_from_name(mut self, name: impl Into<String>) -> Self {
        self.from_name = Some(name.into());
        self
    }

    /// The From header value.
    pub fn from_header(&self) -> String {
        match &self.from_name {
            Some(name) => format!("{} <{}>", name, self.from_address),
            None => self.from_address.clone(),
        }
    }
}
