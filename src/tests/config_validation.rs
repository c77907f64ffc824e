#[cfg(test)]
mod tests {
    use serial_test::serial;
    use tempfile::TempDir;

    use crate::config::proc_loader::{expand_env_vars, file_to_config, parse_config};
    use crate::config::settings::{LogFormat, ServiceConfig};
    use crate::fetch::PaginationSettings;
    use crate::resilience::RetrySettings;
    use crate::utils::config_loader;
    use crate::utils::constants::{DEFAULT_BASE_URL, DEFAULT_CUSTOMER};
    use crate::utils::logging::{effective_logging_config, LogLevel};

    const VALID: &str = r#"
settings:
  api:
    base_url: "https://admin.googleapis.com/admin/directory/v1"
    customer: "C01abcd"
    user_agent: "directory-sync/2.1"
    compression: false
    timeout_ms: 10000
  retry:
    max_attempts: 3
    base_delay_ms: 500
  pagination:
    max_results: 200
    max_pages: 50
  logging:
    level: "debug"
    format: "json"
profiles:
  path: "/etc/gdirectory/profiles.yaml"
"#;

    #[tokio::test]
    async fn valid_config_parses_every_section() {
        let cfg = parse_config(VALID.to_string()).await.unwrap();

        let api = &cfg.settings.api;
        assert_eq!(api.customer, "C01abcd");
        assert_eq!(api.user_agent, "directory-sync/2.1");
        assert!(!api.compression);
        assert_eq!(api.timeout_ms, 10_000);

        let retry = RetrySettings::from_config(cfg.settings.retry.as_ref()).unwrap();
        assert_eq!(retry, RetrySettings::new(3, 500).unwrap());

        let pagination = PaginationSettings::from_config(cfg.settings.pagination.as_ref());
        assert_eq!(pagination, PaginationSettings { max_results: Some(200), max_pages: Some(50) });

        let logging = cfg.settings.logging.unwrap();
        assert_eq!(logging.level, "debug");
        assert_eq!(logging.format, LogFormat::Json);
        assert_eq!(cfg.profiles.path.as_deref(), Some("/etc/gdirectory/profiles.yaml"));
    }

    #[tokio::test]
    async fn empty_config_falls_back_to_defaults() {
        let cfg = parse_config(String::new()).await.unwrap();

        assert_eq!(cfg.settings.api.base_url, DEFAULT_BASE_URL);
        assert_eq!(cfg.settings.api.customer, DEFAULT_CUSTOMER);
        assert!(cfg.settings.api.compression);
        assert!(cfg.settings.retry.is_none());
        assert_eq!(RetrySettings::from_config(None).unwrap().max_attempts, 5);
        let logging = cfg.settings.logging.unwrap();
        assert_eq!(logging.level, "info");
        assert_eq!(logging.format, LogFormat::Compact);
    }

    #[tokio::test]
    async fn invalid_config_reports_every_issue() {
        let yaml = r#"
settings:
  api:
    base_url: "ftp://directory.example.com"
    customer: ""
    timeout_ms: 0
  retry:
    max_attempts: 9
    base_delay_ms: 0
  pagination:
    max_results: 1000
    max_pages: 0
  logging:
    level: "loud"
    format: "compact"
profiles:
  path: ""
"#;
        let err = parse_config(yaml.to_string()).await.unwrap_err().to_string();

        for expected in [
            "unsupported scheme 'ftp'",
            "settings.api.customer must not be empty",
            "settings.api.timeout_ms must be > 0",
            "settings.retry.max_attempts (9) must be within 1..=5",
            "settings.retry.base_delay_ms must be > 0",
            "settings.pagination.max_results (1000) must be within 1..=500",
            "settings.pagination.max_pages must be >= 1",
            "settings.logging.level 'loud' invalid",
            "profiles.path must not be empty",
        ] {
            assert!(err.contains(expected), "missing '{}' in: {}", expected, err);
        }
    }

    #[tokio::test]
    async fn relative_base_url_is_rejected() {
        let yaml = "settings:\n  api:\n    base_url: \"/admin/directory/v1\"\n";
        let err = parse_config(yaml.to_string()).await.unwrap_err().to_string();

        assert!(err.contains("must be an absolute http(s) url"), "{}", err);
    }

    #[tokio::test]
    async fn malformed_yaml_is_an_error() {
        let yaml = "settings:\n  retry:\n    max_attempts: [not, a, number]\n";
        assert!(parse_config(yaml.to_string()).await.is_err());
    }

    #[test]
    #[serial]
    fn env_placeholders_are_expanded() {
        std::env::set_var("GDIRECTORY_TEST_CUSTOMER", "C0xyz");
        std::env::remove_var("GDIRECTORY_TEST_MISSING");

        let expanded = expand_env_vars(
            "customer: ${GDIRECTORY_TEST_CUSTOMER}\nlevel: ${GDIRECTORY_TEST_MISSING:warn}\nother: ${GDIRECTORY_TEST_MISSING}\n",
        );
        std::env::remove_var("GDIRECTORY_TEST_CUSTOMER");

        assert_eq!(expanded, "customer: C0xyz\nlevel: warn\nother: \n");
    }

    #[tokio::test]
    #[serial]
    async fn config_file_is_expanded_then_validated() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gdirectory.yaml");
        std::fs::write(
            &path,
            "settings:\n  api:\n    customer: \"${GDIRECTORY_TEST_FILE_CUSTOMER:C0fallback}\"\n",
        )
        .unwrap();
        std::env::remove_var("GDIRECTORY_TEST_FILE_CUSTOMER");

        let cfg = file_to_config(&path).await.unwrap();

        assert_eq!(cfg.settings.api.customer, "C0fallback");
    }

    #[tokio::test]
    async fn missing_config_file_means_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.yaml");

        let cfg: ServiceConfig = config_loader::run(path.to_str().unwrap()).await.unwrap();

        assert_eq!(cfg.settings.api.base_url, DEFAULT_BASE_URL);
    }

    #[tokio::test]
    async fn cli_level_overrides_config_level() {
        let cfg = parse_config(VALID.to_string()).await.unwrap();

        let from_file = effective_logging_config(&cfg, None);
        assert_eq!(from_file.level, "debug");

        let overridden = effective_logging_config(&cfg, Some(LogLevel::WARN));
        assert_eq!(overridden.level, "warn");
        assert_eq!(overridden.format, LogFormat::Json);
    }
}
