use crate::error::{ErrorContext, Result};
use crate::types::{Config, SubhoundError};
use log::debug;
use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

/// Builds the effective configuration: defaults, then the optional TOML file,
/// then environment overrides.
pub fn load_config(config_path: Option<&str>) -> Result<Config> {
    let mut config = Config::default();

    if let Some(path) = config_path {
        if !Path::new(path).exists() {
            return Err(SubhoundError::ConfigError(format!(
                "Configuration file not found: {}",
                path
            )));
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file {}", path))?;
        apply_toml(&mut config, &contents)?;
        debug!("Loaded configuration from {}", path);
    }

    apply_env_overrides(&mut config)?;
    validate_config(&config)?;

    Ok(config)
}

fn apply_toml(config: &mut Config, contents: &str) -> Result<()> {
    let value: toml::Value =
        toml::from_str(contents).with_context(|| "Failed to parse configuration file".to_string())?;

    let Some(table) = value.as_table() else {
        return Ok(());
    };

    if let Some(secs) = table.get("timeout").and_then(|v| v.as_integer()) {
        config.timeout = seconds(secs, "timeout")?;
    }
    if let Some(secs) = table.get("connect_timeout").and_then(|v| v.as_integer()) {
        config.connect_timeout = seconds(secs, "connect_timeout")?;
    }
    if let Some(secs) = table.get("dns_timeout").and_then(|v| v.as_integer()) {
        config.dns_timeout = seconds(secs, "dns_timeout")?;
    }
    if let Some(retries) = table.get("retries").and_then(|v| v.as_integer()) {
        config.retries = u32::try_from(retries).with_context(|| "Invalid retries".to_string())?;
    }
    if let Some(agent) = table.get("user_agent").and_then(|v| v.as_str()) {
        config.user_agent = agent.to_string();
    }
    if let Some(proxy) = table.get("proxy").and_then(|v| v.as_str()) {
        config.proxy = Some(proxy.to_string());
    }

    if let Some(endpoints) = table.get("endpoints").and_then(|v| v.as_table()) {
        if let Some(url) = endpoints.get("crtsh").and_then(|v| v.as_str()) {
            config.endpoints.crtsh = url.to_string();
        }
        if let Some(url) = endpoints.get("geolocation").and_then(|v| v.as_str()) {
            config.endpoints.geolocation = url.to_string();
        }
        if let Some(url) = endpoints.get("ownership").and_then(|v| v.as_str()) {
            config.endpoints.ownership = url.to_string();
        }
    }

    if let Some(resolver) = table.get("resolver").and_then(|v| v.as_table()) {
        if let Some(system) = resolver.get("use_system_resolver").and_then(|v| v.as_bool()) {
            config.resolver.use_system_resolver = system;
        }
        if let Some(servers) = resolver.get("nameservers").and_then(|v| v.as_array()) {
            config.resolver.nameservers = servers
                .iter()
                .filter_map(|v| v.as_str().map(|s| s.to_string()))
                .collect();
        }
    }

    if let Some(output) = table.get("output").and_then(|v| v.as_table()) {
        if let Some(dir) = output.get("directory").and_then(|v| v.as_str()) {
            config.output.directory = dir.to_string();
        }
    }

    Ok(())
}

fn seconds(value: i64, key: &str) -> Result<Duration> {
    u64::try_from(value)
        .map(Duration::from_secs)
        .with_context(|| format!("Invalid value for {}", key))
}

fn apply_env_overrides(config: &mut Config) -> Result<()> {
    apply_overrides(config, |key| env::var(key).ok())
}

fn apply_overrides<F>(config: &mut Config, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup("SUBHOUND_TIMEOUT") {
        let secs = value.trim().parse::<u64>().with_context(|| "Invalid SUBHOUND_TIMEOUT".to_string())?;
        config.timeout = Duration::from_secs(secs);
    }
    if let Some(value) = lookup("SUBHOUND_DNS_TIMEOUT") {
        let secs = value
            .trim()
            .parse::<u64>()
            .with_context(|| "Invalid SUBHOUND_DNS_TIMEOUT".to_string())?;
        config.dns_timeout = Duration::from_secs(secs);
    }
    if let Some(value) = lookup("SUBHOUND_RETRIES") {
        config.retries = value.trim().parse::<u32>().with_context(|| "Invalid SUBHOUND_RETRIES".to_string())?;
    }
    if let Some(value) = lookup("SUBHOUND_PROXY") {
        config.proxy = Some(value.trim().to_string()).filter(|p| !p.is_empty());
    }
    if let Some(value) = lookup("SUBHOUND_REPORTS_DIR") {
        config.output.directory = value.trim().to_string();
    }
    Ok(())
}

pub fn validate_config(config: &Config) -> Result<()> {
    if config.timeout.is_zero() {
        return Err(SubhoundError::ConfigError("The HTTP timeout must be greater than 0".to_string()));
    }
    if config.connect_timeout.is_zero() {
        return Err(SubhoundError::ConfigError("The connect timeout must be greater than 0".to_string()));
    }
    if config.dns_timeout.is_zero() {
        return Err(SubhoundError::ConfigError("The DNS timeout must be greater than 0".to_string()));
    }
    if config.output.directory.trim().is_empty() {
        return Err(SubhoundError::ConfigError("The reports directory must not be empty".to_string()));
    }
    for (name, url) in [
        ("crtsh", &config.endpoints.crtsh),
        ("geolocation", &config.endpoints.geolocation),
        ("ownership", &config.endpoints.ownership),
    ] {
        reqwest::Url::parse(url).with_context(|| format!("Invalid {} endpoint {}", name, url))?;
    }
    if !config.resolver.use_system_resolver {
        if config.resolver.nameservers.is_empty() {
            return Err(SubhoundError::ConfigError(
                "At least one nameserver is required when the system resolver is disabled".to_string(),
            ));
        }
        for ns in &config.resolver.nameservers {
            ns.parse::<SocketAddr>()
                .with_context(|| format!("Invalid nameserver address {}", ns))?;
        }
    }
    Ok(())
}
