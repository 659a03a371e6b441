//! Session configuration and the immutable per-run session.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::client::DEFAULT_SERVER_URL;
use crate::driver::AutomationDriver;
use crate::geometry::DensityMultiplier;
use crate::result::{SmartError, SmartResult};

/// Environment variable overriding the classification service URL
pub const SERVER_URL_ENV: &str = "SMART_DRIVER_SERVER_URL";

/// Pick the service URL: explicit value, then environment, then default.
///
/// Blank values count as unset at every level.
#[must_use]
pub fn resolve_server_url(explicit: Option<&str>, env: Option<&str>) -> String {
    non_blank(explicit)
        .or_else(|| non_blank(env))
        .unwrap_or(DEFAULT_SERVER_URL)
        .to_string()
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|url| !url.is_empty())
}

/// Configuration for a [`crate::SmartDriver`] session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// API key for the classification service
    pub api_key: String,
    /// Service base URL; falls back to `SMART_DRIVER_SERVER_URL`, then the default
    pub server_url: Option<String>,
    /// Test case name. Setting it enables interactive mode, which is not
    /// implemented: every lookup then ends unresolved.
    pub test_case_name: Option<String>,
    /// Fixed run id; a random UUID is generated when absent
    pub run_id: Option<String>,
    /// Trust any TLS certificate (self-signed staging servers)
    pub accept_invalid_certs: bool,
}

impl SessionConfig {
    /// Create new config for an API key
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    /// Set the service URL
    #[must_use]
    pub fn with_server_url(mut self, url: impl Into<String>) -> Self {
        self.server_url = Some(url.into());
        self
    }

    /// Set the test case name (interactive mode)
    #[must_use]
    pub fn with_test_case_name(mut self, name: impl Into<String>) -> Self {
        self.test_case_name = Some(name.into());
        self
    }

    /// Pin the run id
    #[must_use]
    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }

    /// Trust invalid TLS certificates
    #[must_use]
    pub const fn with_accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }

    /// Parse from YAML
    pub fn from_yaml_str(yaml: &str) -> SmartResult<Self> {
        Ok(serde_yaml_ng::from_str(yaml)?)
    }

    /// Load from a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> SmartResult<Self> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml)
    }

    /// Service URL after applying the environment and default
    #[must_use]
    pub fn resolved_server_url(&self) -> String {
        let env = std::env::var(SERVER_URL_ENV).ok();
        resolve_server_url(self.server_url.as_deref(), env.as_deref())
    }

    /// Build the HTTP client described by this config
    pub fn http_client(&self) -> SmartResult<reqwest::Client> {
        reqwest::Client::builder()
            .danger_accept_invalid_certs(self.accept_invalid_certs)
            .build()
            .map_err(|e| SmartError::initialization(format!("HTTP client: {e}")))
    }
}

/// Everything fixed for the lifetime of one run. Never mutated once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    api_key: String,
    server_url: String,
    run_id: String,
    multiplier: DensityMultiplier,
    test_case_name: Option<String>,
}

impl Session {
    /// Build a session, measuring the density multiplier on `driver`.
    pub async fn establish<D: AutomationDriver>(
        driver: &D,
        config: &SessionConfig,
    ) -> SmartResult<Self> {
        let server_url = config.resolved_server_url();
        reqwest::Url::parse(&server_url).map_err(|e| {
            SmartError::invalid_config(format!("server url {server_url:?}: {e}"))
        })?;

        let pixel_width = driver.screenshot_pixel_width().await.map_err(|e| {
            SmartError::initialization(format!("could not read screenshot width: {e}"))
        })?;
        let window_width = driver.window_width().await.map_err(|e| {
            SmartError::initialization(format!("could not read window width: {e}"))
        })?;
        let multiplier = DensityMultiplier::from_widths(pixel_width, window_width)?;
        debug!("The screen multiplier is {}", multiplier.value());

        Ok(Self::from_parts(config, server_url, multiplier))
    }

    /// Assemble a session from already known values
    #[must_use]
    pub fn from_parts(
        config: &SessionConfig,
        server_url: impl Into<String>,
        multiplier: DensityMultiplier,
    ) -> Self {
        Self {
            api_key: config.api_key.clone(),
            server_url: server_url.into().trim_end_matches('/').to_string(),
            run_id: config
                .run_id
                .clone()
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            multiplier,
            test_case_name: config.test_case_name.clone(),
        }
    }

    /// API key
    #[must_use]
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Service base URL, without trailing slash
    #[must_use]
    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    /// Run id shared by every request of this session
    #[must_use]
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Density multiplier
    #[must_use]
    pub const fn multiplier(&self) -> DensityMultiplier {
        self.multiplier
    }

    /// Test case name, if interactive mode was requested
    #[must_use]
    pub fn test_case_name(&self) -> Option<&str> {
        self.test_case_name.as_deref()
    }

    /// Interactive mode short-circuits classification
    #[must_use]
    pub const fn is_interactive(&self) -> bool {
        self.test_case_name.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::MockDriver;
    use crate::result::DriverError;

    mod server_url_tests {
        use super::*;

        #[test]
        fn test_explicit_wins() {
            assert_eq!(
                resolve_server_url(Some("http://explicit"), Some("http://env")),
                "http://explicit"
            );
        }

        #[test]
        fn test_env_over_default() {
            assert_eq!(resolve_server_url(None, Some("http://env")), "http://env");
        }

        #[test]
        fn test_default() {
            assert_eq!(resolve_server_url(None, None), DEFAULT_SERVER_URL);
        }

        #[test]
        fn test_blank_explicit_value_falls_back_to_env() {
            assert_eq!(resolve_server_url(Some(""), Some("http://env")), "http://env");
            assert_eq!(resolve_server_url(Some("   "), Some(" http://env ")), "http://env");
        }

        #[test]
        fn test_blank_env_falls_back_to_default() {
            assert_eq!(resolve_server_url(Some(""), Some("")), DEFAULT_SERVER_URL);
        }

        #[test]
        fn test_blank_value_falls_back_to_default() {
            assert_eq!(resolve_server_url(Some("  "), None), DEFAULT_SERVER_URL);
        }
    }

    mod config_tests {
        use super::*;
        use std::io::Write;

        #[test]
        fn test_config_default() {
            let config = SessionConfig::default();
            assert!(config.api_key.is_empty());
            assert!(config.server_url.is_none());
            assert!(config.test_case_name.is_none());
            assert!(!config.accept_invalid_certs);
        }

        #[test]
        fn test_config_builder() {
            let config = SessionConfig::new("key")
                .with_server_url("http://localhost:9000")
                .with_test_case_name("checkout")
                .with_run_id("run-1")
                .with_accept_invalid_certs(true);

            assert_eq!(config.api_key, "key");
            assert_eq!(config.server_url.as_deref(), Some("http://localhost:9000"));
            assert_eq!(config.test_case_name.as_deref(), Some("checkout"));
            assert_eq!(config.run_id.as_deref(), Some("run-1"));
            assert!(config.accept_invalid_certs);
        }

        #[test]
        fn test_config_from_yaml() {
            let config = SessionConfig::from_yaml_str(
                "api_key: abc\nserver_url: https://staging.example\naccept_invalid_certs: true\n",
            )
            .unwrap();
            assert_eq!(config.api_key, "abc");
            assert_eq!(config.server_url.as_deref(), Some("https://staging.example"));
            assert!(config.accept_invalid_certs);
            assert!(config.run_id.is_none());
        }

        #[test]
        fn test_config_from_yaml_file() {
            let mut file = tempfile::NamedTempFile::new().unwrap();
            writeln!(file, "api_key: from-file").unwrap();
            let config = SessionConfig::from_yaml_file(file.path()).unwrap();
            assert_eq!(config.api_key, "from-file");
        }

        #[test]
        fn test_config_missing_file() {
            let err = SessionConfig::from_yaml_file("/nonexistent/smart-driver.yaml").unwrap_err();
            assert!(matches!(err, SmartError::Io(_)));
        }

        #[test]
        fn test_config_bad_yaml() {
            let err = SessionConfig::from_yaml_str("api_key: [unclosed").unwrap_err();
            assert!(matches!(err, SmartError::Yaml(_)));
        }

        #[test]
        fn test_http_client_builds() {
            assert!(SessionConfig::new("k")
                .with_accept_invalid_certs(true)
                .http_client()
                .is_ok());
        }
    }

    mod session_tests {
        use super::*;

        #[tokio::test]
        async fn test_establish_measures_multiplier() {
            let driver = MockDriver::new().with_screen(390, Some(1170));
            let config = SessionConfig::new("k").with_server_url("http://localhost:1");
            let session = Session::establish(&driver, &config).await.unwrap();

            assert!((session.multiplier().value() - 3.0).abs() < f64::EPSILON);
            assert_eq!(session.server_url(), "http://localhost:1");
            assert!(!session.is_interactive());
        }

        #[tokio::test]
        async fn test_establish_generates_run_id() {
            let driver = MockDriver::new();
            let config = SessionConfig::new("k").with_server_url("http://localhost:1");
            let a = Session::establish(&driver, &config).await.unwrap();
            let b = Session::establish(&driver, &config).await.unwrap();
            assert_ne!(a.run_id(), b.run_id());
            assert!(Uuid::parse_str(a.run_id()).is_ok());
        }

        #[tokio::test]
        async fn test_establish_keeps_injected_run_id() {
            let driver = MockDriver::new();
            let config = SessionConfig::new("k")
                .with_server_url("http://localhost:1")
                .with_run_id("fixed");
            let session = Session::establish(&driver, &config).await.unwrap();
            assert_eq!(session.run_id(), "fixed");
        }

        #[tokio::test]
        async fn test_unreadable_screenshot_is_fatal() {
            let driver = MockDriver::new()
                .with_screen(400, None)
                .with_screenshot(None);
            let config = SessionConfig::new("k").with_server_url("http://localhost:1");
            let err = Session::establish(&driver, &config).await.unwrap_err();
            assert!(matches!(err, SmartError::Initialization { .. }));
        }

        #[tokio::test]
        async fn test_zero_window_width_is_fatal() {
            let driver = MockDriver::new().with_screen(0, Some(800));
            let config = SessionConfig::new("k").with_server_url("http://localhost:1");
            let err = Session::establish(&driver, &config).await.unwrap_err();
            assert!(matches!(err, SmartError::Initialization { .. }));
        }

        #[tokio::test]
        async fn test_invalid_url_rejected() {
            let driver = MockDriver::new();
            let config = SessionConfig::new("k").with_server_url("not a url");
            let err = Session::establish(&driver, &config).await.unwrap_err();
            assert!(matches!(err, SmartError::InvalidConfig { .. }));
        }

        #[test]
        fn test_from_parts_interactive() {
            let config = SessionConfig::new("k").with_test_case_name("tc");
            let session = Session::from_parts(&config, "http://x/", DensityMultiplier::ONE);
            assert!(session.is_interactive());
            assert_eq!(session.test_case_name(), Some("tc"));
            assert_eq!(session.server_url(), "http://x");
        }

        #[test]
        fn test_driver_error_message_kept() {
            let err = SmartError::initialization(format!(
                "could not read screenshot width: {}",
                DriverError::Screenshot {
                    message: "x".to_string()
                }
            ));
            assert!(err.to_string().contains("Screenshot failed: x"));
        }
    }
}
