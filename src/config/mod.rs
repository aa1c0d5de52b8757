use serde::Deserialize;

static CONFIG: OnceCell<Config> = OnceCell::const_new();

mod config_dir;
pub use config_dir::{CONFIG_PATH_ENV, find_config_file, read_config};

mod error;
pub use error::{ConfigError, ConfigResult};
use tokio::sync::OnceCell;

#[derive(Debug, Deserialize)]
pub struct Config {
    host: Host,
    app: App,
    admin: Admin,
    #[serde(default)]
    signup: Signup,
    smtp: Option<Smtp>,
}

#[derive(Debug, Deserialize)]
pub struct Host {
    bindto: String,
}

#[derive(Debug, Deserialize)]
pub struct App {
    jwt: String,
    database_uri: String,
    #[serde(default)]
    docs: bool,
    #[serde(default = "default_uploads_dir")]
    uploads_dir: String,
}

/// Bootstrap administrator, created on startup when missing.
#[derive(Debug, Deserialize)]
pub struct Admin {
    email: String,
    name: String,
    password: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct Signup {
    /// Initial contents of the allowed e-mail domain store.
    #[serde(default)]
    allowed_domains: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct Smtp {
    host: String,
    #[serde(default = "default_smtp_port")]
    port: u16,
    username: String,
    password: String,
    from: String,
}

fn default_uploads_dir() -> String {
    String::from("uploads")
}

fn default_smtp_port() -> u16 {
    587
}

impl Config {
    #[tracing::instrument]
    pub async fn get_or_init(use_local: bool) -> &'static Config {
        CONFIG
            .get_or_init(|| async {
                let config = match Self::load(use_local) {
                    Ok(c) => c,
                    Err(e) => {
                        if !matches!(e, error::ConfigError::ConfigNotFound) {
                            crate::error::log_error(&e);
                        }
                        tracing::error!("Config not found.");
                        std::process::exit(1);
                    }
                };

                config
            })
            .await
    }

    pub fn load(use_local: bool) -> ConfigResult<Self> {
        let bytes = read_config(use_local)?;
        Self::from_slice(&bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> ConfigResult<Self> {
        let config: Self = toml::from_slice(bytes)?;
        Ok(config)
    }

    #[inline]
    pub fn host(&self) -> &Host {
        &self.host
    }

    #[inline]
    pub fn app(&self) -> &App {
        &self.app
    }

    #[inline]
    pub fn admin(&self) -> &Admin {
        &self.admin
    }

    #[inline]
    pub fn signup(&self) -> &Signup {
        &self.signup
    }

    #[inline]
    pub fn smtp(&self) -> Option<&Smtp> {
        self.smtp.as_ref()
    }
}

impl Host {
    #[inline]
    pub fn bindto(&self) -> &str {
        &self.bindto
    }
}

impl App {
    #[inline]
    pub fn jwt(&self) -> &str {
        &self.jwt
    }

    #[inline]
    pub fn database_uri(&self) -> &str {
        &self.database_uri
    }

    #[inline]
    pub fn docs(&self) -> bool {
        self.docs
    }

    #[inline]
    pub fn uploads_dir(&self) -> &str {
        &self.uploads_dir
    }
}

impl Admin {
    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl Signup {
    pub fn allowed_domains(&self) -> &[String] {
        &self.allowed_domains
    }
}

impl Smtp {
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn from(&self) -> &str {
        &self.from
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn config_test() {
        let config = Config::get_or_init(true).await;
        assert_eq!(config.host().bindto(), "127.0.0.1:5000"); // defaults
        assert!(!config.signup().allowed_domains().is_empty());
    }

    #[test]
    fn optional_sections_default() {
        let config = Config::from_slice(
            br#"
            [host]
            bindto = "0.0.0.0:8080"

            [app]
            jwt = "secret"
            database_uri = "postgres://localhost/learnhub"

            [admin]
            email = "root@gmail.com"
            name = "Root"
            password = "root"
            "#,
        )
        .unwrap();

        assert!(config.smtp().is_none());
        assert!(config.signup().allowed_domains().is_empty());
        assert_eq!(config.app().uploads_dir(), "uploads");
        assert!(!config.app().docs());
    }

    #[test]
    fn smtp_port_defaults_to_submission() {
        let config = Config::from_slice(
            br#"
            [host]
            bindto = "0.0.0.0:8080"

            [app]
            jwt = "secret"
            database_uri = "postgres://localhost/learnhub"

            [admin]
            email = "root@gmail.com"
            name = "Root"
            password = "root"

            [smtp]
            host = "smtp.gmail.com"
            username = "bot"
            password = "pw"
            from = "LearnHub <bot@gmail.com>"
            "#,
        )
        .unwrap();

        let smtp = config.smtp().unwrap();
        assert_eq!(smtp.port(), 587);
        assert_eq!(smtp.host(), "smtp.gmail.com");
    }
}
