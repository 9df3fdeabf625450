//! CLI parsing, origin-URL resolution, and configuration validation.

use clap::Parser;
use proxy_cache::policy::EvictionPolicy;

/// Positional and named arguments, as handed to `main` by the process
/// lifecycle. Validated into a [`Config`] before the listener starts.
#[derive(Parser, Debug)]
#[command(author, version, about = "A forward/reverse caching HTTP proxy", long_about = None)]
pub struct Args {
    /// The host or address to listen on.
    pub host: String,

    /// The port to listen on.
    pub port: u16,

    /// The origin server to forward requests to, e.g. `http://example.com`.
    pub origin: String,

    /// Maximum number of entries the response cache may hold. 0 disables caching.
    #[arg(short = 's', long = "cache-size-limit", default_value_t = 10)]
    pub cache_size_limit: i64,

    /// Seconds between periodic cache-eviction sweeps. 0 disables the cleaner.
    #[arg(short = 'i', long = "cache-clean-interval", default_value_t = 0)]
    pub cache_clean_interval: i64,

    /// Policy applied when `put` would push the cache past its size limit.
    #[arg(short = 'e', long = "eviction-policy", value_enum, default_value = "lru")]
    pub eviction_policy: EvictionPolicy,

    /// Number of reads an entry survives before expiring. Negative means unlimited.
    #[arg(short = 't', long = "hit-ttl", default_value_t = 10)]
    pub hit_ttl: i64,
}

/// Invalid CLI values, reported before any socket is opened.
#[derive(Debug)]
pub enum ConfigError {
    NegativeCacheSizeLimit(i64),
    NegativeCleanInterval(i64),
    ZeroHitTtl,
    InvalidOriginUrl(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NegativeCacheSizeLimit(value) => {
                write!(f, "cache-size-limit must be >= 0, got {value}")
            }
            ConfigError::NegativeCleanInterval(value) => {
                write!(f, "cache-clean-interval must be >= 0, got {value}")
            }
            ConfigError::ZeroHitTtl => write!(f, "hit-ttl must not be 0"),
            ConfigError::InvalidOriginUrl(origin) => {
                write!(f, "origin must start with http:// or https://, got {origin:?}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// The resolved origin: host/port to dial and whether to wrap the connection
/// in TLS. Host is taken verbatim from the origin URL (see [`OriginAddress::parse`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginAddress {
    pub host: String,
    pub port: u16,
    pub use_tls: bool,
}

impl OriginAddress {
    /// Resolves an origin URL of the form `http(s)://host[/...]`.
    ///
    /// `host` is the text between the first `//` and the remainder of the
    /// string, with trailing slashes trimmed; no `:port` suffix inside the
    /// URL is parsed out separately, and no path is stripped beyond trailing
    /// slashes, so `https://example.com:8443` resolves to host
    /// `"example.com:8443"` and still dials port 443.
    pub fn parse(origin_url: &str) -> Result<Self, ConfigError> {
        let (use_tls, rest) = if let Some(rest) = origin_url.strip_prefix("https://") {
            (true, rest)
        } else if let Some(rest) = origin_url.strip_prefix("http://") {
            (false, rest)
        } else {
            return Err(ConfigError::InvalidOriginUrl(origin_url.to_string()));
        };

        let host = rest.trim_end_matches('/').to_string();
        if host.is_empty() {
            return Err(ConfigError::InvalidOriginUrl(origin_url.to_string()));
        }

        let port = if use_tls { 443 } else { 80 };
        Ok(Self { host, port, use_tls })
    }

    /// The value substituted into the forwarded request's `Host` header.
    pub fn host_header(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Immutable, validated configuration the listener, handler, and cleaner are
/// all built from.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub origin: OriginAddress,
    pub size_limit: usize,
    pub clean_interval: u64,
    pub policy: EvictionPolicy,
    pub hit_ttl: i64,
}

impl Config {
    pub fn from_args(args: Args) -> Result<Self, ConfigError> {
        if args.cache_size_limit < 0 {
            return Err(ConfigError::NegativeCacheSizeLimit(args.cache_size_limit));
        }
        if args.cache_clean_interval < 0 {
            return Err(ConfigError::NegativeCleanInterval(args.cache_clean_interval));
        }
        if args.hit_ttl == 0 {
            return Err(ConfigError::ZeroHitTtl);
        }

        let origin = OriginAddress::parse(&args.origin)?;

        Ok(Self {
            host: args.host,
            port: args.port,
            origin,
            size_limit: args.cache_size_limit as usize,
            clean_interval: args.cache_clean_interval as u64,
            policy: args.eviction_policy,
            hit_ttl: args.hit_ttl,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("http://example.com", "example.com", 80, false)]
    #[case("https://example.com", "example.com", 443, true)]
    #[case("http://example.com/", "example.com", 80, false)]
    #[case("https://example.com:8443", "example.com:8443", 443, true)]
    fn parses_origin_url(
        #[case] url: &str,
        #[case] host: &str,
        #[case] port: u16,
        #[case] use_tls: bool,
    ) {
        let origin = OriginAddress::parse(url).unwrap();
        assert_eq!(origin.host, host);
        assert_eq!(origin.port, port);
        assert_eq!(origin.use_tls, use_tls);
    }

    #[test]
    fn rejects_origin_without_scheme() {
        assert!(matches!(
            OriginAddress::parse("example.com"),
            Err(ConfigError::InvalidOriginUrl(_))
        ));
    }

    #[test]
    fn host_header_combines_host_and_port() {
        let origin = OriginAddress::parse("https://example.com").unwrap();
        assert_eq!(origin.host_header(), "example.com:443");
    }

    fn args(size: i64, interval: i64, ttl: i64) -> Args {
        Args {
            host: "127.0.0.1".to_string(),
            port: 8080,
            origin: "http://example.com".to_string(),
            cache_size_limit: size,
            cache_clean_interval: interval,
            eviction_policy: EvictionPolicy::Lru,
            hit_ttl: ttl,
        }
    }

    #[test]
    fn rejects_negative_cache_size_limit() {
        assert!(matches!(
            Config::from_args(args(-1, 0, 10)),
            Err(ConfigError::NegativeCacheSizeLimit(-1))
        ));
    }

    #[test]
    fn rejects_negative_clean_interval() {
        assert!(matches!(
            Config::from_args(args(10, -1, 10)),
            Err(ConfigError::NegativeCleanInterval(-1))
        ));
    }

    #[test]
    fn rejects_zero_hit_ttl() {
        assert!(matches!(Config::from_args(args(10, 0, 0)), Err(ConfigError::ZeroHitTtl)));
    }

    #[test]
    fn accepts_valid_config() {
        assert!(Config::from_args(args(10, 0, 10)).is_ok());
    }
}
