use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

use anyhow::{anyhow, bail, Result};

const DEV_DATABASE_URL: &str = "sqlite://warbler.db?mode=rwc";
const TEST_DATABASE_URL: &str = "sqlite::memory:";
const DEV_SECRET_KEY: &str = "it's a secret";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Testing,
    Production,
}

impl FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "testing" | "test" => Ok(Environment::Testing),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(anyhow!("unknown environment `{other}`")),
        }
    }
}

#[derive(Clone)]
pub struct Settings {
    pub environment: Environment,
    pub port: u16,
    pub addr: SocketAddr,
    pub database_url: String,
    pub secret_key: String,
    pub debug: bool,
    pub sql_echo: bool,
    pub session_ttl: chrono::Duration,
}

impl Settings {
    /// Reads settings from the process environment. `WARBLER_ENV` picks the
    /// defaults; production has none for the database URL or the secret key.
    pub fn from_env() -> Result<Self> {
        let environment = match env::var("WARBLER_ENV") {
            Ok(value) => value.parse()?,
            Err(_) => Environment::Development,
        };
        Self::resolve(environment, |key| env::var(key).ok())
    }

    /// Defaults for `environment` with nothing taken from the process
    /// environment.
    pub fn for_environment(environment: Environment) -> Result<Self> {
        Self::resolve(environment, |_| None)
    }

    fn resolve<F>(environment: Environment, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port: u16 = lookup("PORT")
            .and_then(|s| s.parse().ok())
            .unwrap_or(3000);
        let addr = SocketAddr::from(([0, 0, 0, 0], port));

        let database_url = match (lookup("DATABASE_URL"), environment) {
            (Some(url), _) => url,
            (None, Environment::Development) => DEV_DATABASE_URL.to_string(),
            (None, Environment::Testing) => TEST_DATABASE_URL.to_string(),
            (None, Environment::Production) => bail!("DATABASE_URL must be set in production"),
        };

        let secret_key = match (lookup("SECRET_KEY"), environment) {
            (Some(key), _) => key,
            (None, Environment::Production) => bail!("SECRET_KEY must be set in production"),
            (None, _) => DEV_SECRET_KEY.to_string(),
        };

        let sql_echo = lookup("SQL_ECHO")
            .map(|s| matches!(s.as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let session_ttl_hours: i64 = lookup("SESSION_TTL_HOURS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(24 * 7);

        Ok(Self {
            environment,
            port,
            addr,
            database_url,
            secret_key,
            debug: environment != Environment::Production,
            sql_echo,
            session_ttl: chrono::Duration::hours(session_ttl_hours),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn parses_environment_names() {
        assert_eq!("development".parse::<Environment>().unwrap(), Environment::Development);
        assert_eq!("Testing".parse::<Environment>().unwrap(), Environment::Testing);
        assert_eq!("prod".parse::<Environment>().unwrap(), Environment::Production);
        assert!("staging".parse::<Environment>().is_err());
    }

    #[test]
    fn testing_defaults_to_in_memory_database() {
        let settings = Settings::for_environment(Environment::Testing).unwrap();
        assert_eq!(settings.database_url, "sqlite::memory:");
        assert_eq!(settings.secret_key, DEV_SECRET_KEY);
        assert!(settings.debug);
        assert!(!settings.sql_echo);
        assert_eq!(settings.port, 3000);
    }

    #[test]
    fn development_defaults_to_local_file() {
        let settings = Settings::for_environment(Environment::Development).unwrap();
        assert_eq!(settings.database_url, DEV_DATABASE_URL);
        assert_eq!(settings.session_ttl, chrono::Duration::hours(168));
    }

    #[test]
    fn production_requires_database_url_and_secret() {
        assert!(Settings::for_environment(Environment::Production).is_err());

        let only_db = lookup_from(&[("DATABASE_URL", "sqlite://prod.db")]);
        assert!(Settings::resolve(Environment::Production, only_db).is_err());

        let both = lookup_from(&[
            ("DATABASE_URL", "sqlite://prod.db"),
            ("SECRET_KEY", "hunter2hunter2"),
            ("PORT", "8080"),
        ]);
        let settings = Settings::resolve(Environment::Production, both).unwrap();
        assert_eq!(settings.database_url, "sqlite://prod.db");
        assert_eq!(settings.port, 8080);
        assert!(!settings.debug);
    }

    #[test]
    fn overrides_win_over_defaults() {
        let lookup = lookup_from(&[
            ("DATABASE_URL", "sqlite://other.db"),
            ("SQL_ECHO", "true"),
            ("SESSION_TTL_HOURS", "2"),
        ]);
        let settings = Settings::resolve(Environment::Development, lookup).unwrap();
        assert_eq!(settings.database_url, "sqlite://other.db");
        assert!(settings.sql_echo);
        assert_eq!(settings.session_ttl, chrono::Duration::hours(2));
    }
}
