use anyhow::{Context, Result};
use time::macros::format_description;
use tracing_subscriber::fmt::time::LocalTime;
use tracing_subscriber::EnvFilter;
use url::Url;

use crate::args::{AdminCommand, Args, Command};

pub fn setup_logging(verbose: bool) {
    let default_level = if verbose { "info" } else { "error" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let timer = LocalTime::new(format_description!(
        "[hour]:[minute]:[second].[subsecond digits:3]"
    ));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(timer)
        .with_writer(std::io::stderr)
        .init();
}

/// Trims the input and adds `https://` unless an http(s) scheme is present.
pub fn normalize_url(input: &str) -> Result<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        anyhow::bail!("URL must not be empty");
    }

    let lower = trimmed.to_ascii_lowercase();
    let formatted = if lower.starts_with("http://") || lower.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    let parsed = Url::parse(&formatted).with_context(|| format!("Invalid URL: {}", trimmed))?;
    if parsed.host_str().is_none() {
        anyhow::bail!("URL has no host: {}", trimmed);
    }
    Ok(formatted)
}

/// Masks all but the first group of an IPv4 address, or the trailing groups
/// of an IPv6 address.
pub fn redact_ip(ip: &str) -> String {
    if ip.contains(':') {
        let groups: Vec<&str> = ip.split(':').collect();
        if groups.len() <= 2 {
            return "****".to_string();
        }
        let mut result = groups[..2].join(":");
        result.push_str(":****");
        return result;
    }

    let parts: Vec<&str> = ip.split('.').collect();
    if parts.len() != 4 {
        return ip.to_string();
    }

    let redacted_parts: Vec<String> = parts[1..].iter().map(|part| "*".repeat(part.len())).collect();
    format!("{}.{}", parts[0], redacted_parts.join("."))
}

pub fn validate_args(args: &Args) -> Result<()> {
    if let Some(limit) = args.daily_limit {
        if limit == 0 {
            anyhow::bail!("--daily-limit must be greater than 0");
        }
    }

    if args.ip_timeout == 0 {
        anyhow::bail!("--ip-timeout must be greater than 0");
    }

    if let Command::Admin {
        command: AdminCommand::List {
            limit: Some(limit), ..
        },
        ..
    } = &args.command
    {
        if *limit == 0 {
            anyhow::bail!("--limit must be greater than 0");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn normalize_adds_scheme() {
        assert_eq!(normalize_url("  shop.example.com ").unwrap(), "https://shop.example.com");
        assert_eq!(normalize_url("HTTP://shop.example.com").unwrap(), "HTTP://shop.example.com");
        assert_eq!(normalize_url("https://a.example/x?y=1").unwrap(), "https://a.example/x?y=1");
    }

    #[test]
    fn normalize_rejects_blank_and_garbage() {
        assert!(normalize_url("   ").is_err());
        assert!(normalize_url("https://").is_err());
    }

    #[test]
    fn redacts_addresses() {
        assert_eq!(redact_ip("192.168.10.7"), "192.***.**.*");
        assert_eq!(redact_ip("2001:db8:85a3::8a2e:370:7334"), "2001:db8:****");
        assert_eq!(redact_ip("unknown"), "unknown");
    }

    #[test]
    fn rejects_zero_limits() {
        let args = Args::try_parse_from(["shopaudit", "--daily-limit", "0", "quota"]).unwrap();
        assert!(validate_args(&args).is_err());

        let args = Args::try_parse_from(["shopaudit", "admin", "-p", "x", "list", "--limit", "0"]).unwrap();
        assert!(validate_args(&args).is_err());

        let args = Args::try_parse_from(["shopaudit", "quota"]).unwrap();
        assert!(validate_args(&args).is_ok());
    }
}
