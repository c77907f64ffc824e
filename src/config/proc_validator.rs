//! Configuration validation with aggregated errors.
//! - Aggregates all issues into Vec<String>
//! - Checks the api endpoint, retry budget, pagination bounds and logging

use tracing::{error, info};
use url::Url;

use crate::config::settings::{
    ApiSettings, LoggingConfig, PaginationConfig, RetryConfig, ServiceConfig,
};
use crate::observability::metrics::get_metrics;
use crate::utils::constants::{MAX_RESULTS_LIMIT, MAX_RETRY_ATTEMPTS, MIN_RETRY_ATTEMPTS};

/// Public entrypoint: returns Ok(()) or Err(Vec<String>) containing all issues.
pub async fn validate_service_config(cfg: &ServiceConfig) -> Result<(), Vec<String>> {
    let mut errors: Vec<String> = Vec::new();

    validate_api("settings.api", &cfg.settings.api, &mut errors);
    if let Some(retry) = &cfg.settings.retry {
        validate_retry("settings.retry", retry, &mut errors);
    }
    if let Some(pagination) = &cfg.settings.pagination {
        validate_pagination("settings.pagination", pagination, &mut errors);
    }
    if let Some(logging) = &cfg.settings.logging {
        validate_logging("settings.logging", logging, &mut errors);
    }
    if let Some(path) = &cfg.profiles.path {
        if path.trim().is_empty() {
            errors.push("profiles.path must not be empty when set".to_string());
        }
    }

    if errors.is_empty() {
        info!("config valid");
        Ok(())
    } else {
        error!("configuration validation errors ({}):", errors.len());
        for e in &errors {
            error!(" - {}", e);
        }
        get_metrics().await.config_validation_errors.inc();
        Err(errors)
    }
}

fn validate_api(ctx: &str, api: &ApiSettings, errors: &mut Vec<String>) {
    match Url::parse(&api.base_url) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
        Ok(url) => errors.push(format!(
            "{}.base_url '{}' has unsupported scheme '{}'",
            ctx,
            api.base_url,
            url.scheme()
        )),
        Err(e) => errors.push(format!(
            "{}.base_url '{}' must be an absolute http(s) url: {}",
            ctx, api.base_url, e
        )),
    }
    if api.customer.trim().is_empty() {
        errors.push(format!("{}.customer must not be empty", ctx));
    }
    if api.user_agent.trim().is_empty() {
        errors.push(format!("{}.user_agent must not be empty", ctx));
    }
    if api.timeout_ms == 0 {
        errors.push(format!("{}.timeout_ms must be > 0", ctx));
    }
}

fn validate_retry(ctx: &str, retry: &RetryConfig, errors: &mut Vec<String>) {
    if let Some(attempts) = retry.max_attempts {
        if !(MIN_RETRY_ATTEMPTS..=MAX_RETRY_ATTEMPTS).contains(&attempts) {
            errors.push(format!(
                "{}.max_attempts ({}) must be within {}..={}",
                ctx, attempts, MIN_RETRY_ATTEMPTS, MAX_RETRY_ATTEMPTS
            ));
        }
    }
    if let Some(0) = retry.base_delay_ms {
        errors.push(format!("{}.base_delay_ms must be > 0", ctx));
    }
}

fn validate_pagination(ctx: &str, pagination: &PaginationConfig, errors: &mut Vec<String>) {
    if let Some(max_results) = pagination.max_results {
        if max_results == 0 || max_results > MAX_RESULTS_LIMIT {
            errors.push(format!(
                "{}.max_results ({}) must be within 1..={}",
                ctx, max_results, MAX_RESULTS_LIMIT
            ));
        }
    }
    if let Some(0) = pagination.max_pages {
        errors.push(format!("{}.max_pages must be >= 1 when set", ctx));
    }
}

fn validate_logging(ctx: &str, logging: &LoggingConfig, errors: &mut Vec<String>) {
    let valid = ["trace", "debug", "info", "warn", "error"];
    if !valid.contains(&logging.level.to_lowercase().as_str()) {
        errors.push(format!(
            "{}.level '{}' invalid; allowed: {:?}",
            ctx, logging.level, valid
        ));
    }
}
