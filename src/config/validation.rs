use crate::config::types::{
    Config, CrawlerConfig, SitePolicyConfig, SourceConfig, StorageConfig, MAX_RECHECK_INTERVAL_DAYS,
};
use crate::politeness::is_known_preset;
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_storage_config(&config.storage)?;
    validate_sources(&config.sources)?;
    validate_site_policies(&config.site_policies)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "max-attempts must be >= 1, got {}",
            config.max_attempts
        )));
    }

    if config.min_delay_floor == 0 {
        return Err(ConfigError::Validation(
            "min-delay-floor must be greater than 0".to_string(),
        ));
    }

    if config.request_timeout == 0 {
        return Err(ConfigError::Validation(
            "request-timeout must be greater than 0".to_string(),
        ));
    }

    if config.recheck_interval_days > MAX_RECHECK_INTERVAL_DAYS {
        return Err(ConfigError::Validation(format!(
            "recheck-interval-days must be at most {}, got {}",
            MAX_RECHECK_INTERVAL_DAYS, config.recheck_interval_days
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    // Must be sendable as a header value
    if config.user_agent.chars().any(|c| c.is_control()) {
        return Err(ConfigError::Validation(format!(
            "user-agent contains control characters: {:?}",
            config.user_agent
        )));
    }

    Ok(())
}

/// Validates storage configuration
fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates seed sources
fn validate_sources(sources: &[SourceConfig]) -> Result<(), ConfigError> {
    if sources.is_empty() {
        return Err(ConfigError::Validation(
            "At least one [[source]] must be configured".to_string(),
        ));
    }

    for source in sources {
        if source.name.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "Source '{}' must have a non-empty name",
                source.url
            )));
        }

        let url = Url::parse(&source.url).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid source URL '{}': {}", source.url, e))
        })?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::InvalidUrl(format!(
                "Source URL '{}' must use http or https",
                source.url
            )));
        }

        if url.host_str().map_or(true, str::is_empty) {
            return Err(ConfigError::InvalidUrl(format!(
                "Source URL '{}' has no host",
                source.url
            )));
        }
    }

    Ok(())
}

/// Validates site policy entries
fn validate_site_policies(policies: &[SitePolicyConfig]) -> Result<(), ConfigError> {
    for policy in policies {
        validate_domain_pattern(&policy.domain)?;

        if let Some(preset) = &policy.preset {
            if !is_known_preset(preset) {
                return Err(ConfigError::Validation(format!(
                    "Unknown site-policy preset '{}' for domain '{}'",
                    preset, policy.domain
                )));
            }
        }

        for prefix in policy.allow.iter().chain(policy.deny.iter()) {
            if !prefix.starts_with('/') {
                return Err(ConfigError::Validation(format!(
                    "Path prefix '{}' for domain '{}' must start with '/'",
                    prefix, policy.domain
                )));
            }
        }
    }

    Ok(())
}

/// Validates a domain pattern (supports wildcards)
fn validate_domain_pattern(pattern: &str) -> Result<(), ConfigError> {
    if pattern.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain pattern cannot be empty".to_string(),
        ));
    }

    match pattern.strip_prefix("*.") {
        Some(domain) => validate_domain_string(domain),
        None => validate_domain_string(pattern),
    }
}

/// Validates a domain string (without wildcard prefix)
fn validate_domain_string(domain: &str) -> Result<(), ConfigError> {
    if domain.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain cannot be empty".to_string(),
        ));
    }

    if !domain
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' contains invalid characters",
            domain
        )));
    }

    if domain.starts_with('.')
        || domain.ends_with('.')
        || domain.starts_with('-')
        || domain.ends_with('-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot start or end with '.' or '-'",
            domain
        )));
    }

    if domain.contains("..") {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot contain consecutive dots",
            domain
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' must contain at least one dot (e.g., 'example.com')",
            domain
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(url: &str) -> SourceConfig {
        SourceConfig {
            url: url.to_string(),
            name: "Test".to_string(),
            enabled: true,
        }
    }

    fn base_config() -> Config {
        Config {
            crawler: CrawlerConfig::default(),
            storage: StorageConfig {
                database_path: "./test.db".to_string(),
            },
            sources: vec![source("https://example.com/")],
            site_policies: vec![],
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(validate(&base_config()).is_ok());
    }

    #[test]
    fn test_requires_a_source() {
        let mut config = base_config();
        config.sources.clear();
        assert!(matches!(validate(&config), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_source_scheme() {
        let mut config = base_config();
        config.sources = vec![source("ftp://example.com/")];
        assert!(matches!(validate(&config), Err(ConfigError::InvalidUrl(_))));

        config.sources = vec![source("not a url")];
        assert!(matches!(validate(&config), Err(ConfigError::InvalidUrl(_))));

        config.sources = vec![source("http://127.0.0.1:8080/")];
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_zero_floor_rejected() {
        let mut config = base_config();
        config.crawler.min_delay_floor = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_recheck_interval_bound() {
        let mut config = base_config();
        config.crawler.recheck_interval_days = MAX_RECHECK_INTERVAL_DAYS;
        assert!(validate(&config).is_ok());

        config.crawler.recheck_interval_days = MAX_RECHECK_INTERVAL_DAYS + 1;
        assert!(matches!(validate(&config), Err(ConfigError::Validation(_))));

        config.crawler.recheck_interval_days = 200_000_000_000_000;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_recheck_interval_saturates() {
        let mut crawler = CrawlerConfig::default();
        assert_eq!(crawler.recheck_interval(), chrono::Duration::days(7));

        crawler.recheck_interval_days = u64::MAX;
        assert_eq!(crawler.recheck_interval(), chrono::Duration::MAX);

        crawler.recheck_interval_days = 200_000_000_000_000;
        assert_eq!(crawler.recheck_interval(), chrono::Duration::MAX);
    }

    #[test]
    fn test_empty_user_agent_rejected() {
        let mut config = base_config();
        config.crawler.user_agent = "   ".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_unknown_preset_rejected() {
        let mut config = base_config();
        config.site_policies.push(SitePolicyConfig {
            domain: "*.example.com".to_string(),
            preset: Some("nonsense".to_string()),
            allow: vec![],
            deny: vec![],
        });
        assert!(validate(&config).is_err());

        config.site_policies[0].preset = Some("wikipedia".to_string());
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_prefix_must_be_absolute() {
        let mut config = base_config();
        config.site_policies.push(SitePolicyConfig {
            domain: "example.com".to_string(),
            preset: None,
            allow: vec![],
            deny: vec!["private".to_string()],
        });
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_validate_domain_pattern() {
        assert!(validate_domain_pattern("example.com").is_ok());
        assert!(validate_domain_pattern("*.example.com").is_ok());
        assert!(validate_domain_pattern("sub.example.com").is_ok());

        assert!(validate_domain_pattern("").is_err());
        assert!(validate_domain_pattern("*.").is_err());
        assert!(validate_domain_pattern("example").is_err());
        assert!(validate_domain_pattern(".example.com").is_err());
        assert!(validate_domain_pattern("example.com.").is_err());
    }
}
