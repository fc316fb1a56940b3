use std::env;
use std::num::ParseIntError;

#[derive(Debug, Clone)]
/// Application configuration loaded from environment variables.
pub struct Config {
    /// Address the signaling HTTP/WS server binds to.
    pub bind_addr: String,
    /// Port for the signaling server (serves `/ws`, `/healthz`).
    pub http_port: u16,
    /// Port for the HTTP metrics server (Prometheus).
    pub metrics_port: u16,
    /// Lower bound (inclusive) of the UDP/TCP port range the SFU media
    /// engine allocates transports from.
    pub rtc_min_port: u16,
    /// Upper bound (inclusive) of that range.
    pub rtc_max_port: u16,
    /// Publicly reachable IP to announce in ICE candidates, if the bind
    /// address isn't itself reachable (e.g. behind NAT).
    pub announced_ip: Option<String>,
    /// Number of SFU worker processes to spawn.
    pub sfu_workers: usize,
    /// Logging level (e.g., "info", "debug").
    pub rust_log: String,
}

#[derive(Debug)]
/// Errors that can occur during configuration loading.
pub enum ConfigError {
    /// A required environment variable is missing.
    MissingVariable(String),
    /// A value could not be parsed as the expected integer type.
    InvalidPort(String, ParseIntError),
    /// A port value was 0, which is logically invalid for this application.
    PortOutOfRange(String, u16),
    /// The RTC port range's lower bound is not below its upper bound.
    InvalidPortRange(u16, u16),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::MissingVariable(var) => write!(f, "{} is required", var),
            ConfigError::InvalidPort(val, err) => {
                write!(f, "{} must be a valid port number: {}", val, err)
            }
            ConfigError::PortOutOfRange(var, port) => {
                write!(f, "{} must be between 1 and 65535 (got {})", var, port)
            }
            ConfigError::InvalidPortRange(min, max) => {
                write!(
                    f,
                    "RTC_MIN_PORT ({}) must be less than RTC_MAX_PORT ({})",
                    min, max
                )
            }
        }
    }
}

impl std::error::Error for ConfigError {}

fn parse_port(var: &str, default: Option<u16>) -> Result<u16, ConfigError> {
    let raw = match env::var(var) {
        Ok(v) => v,
        Err(_) => match default {
            Some(d) => return Ok(d),
            None => return Err(ConfigError::MissingVariable(var.to_string())),
        },
    };
    let port: u16 = raw
        .parse()
        .map_err(|e| ConfigError::InvalidPort(var.to_string(), e))?;
    if port == 0 {
        return Err(ConfigError::PortOutOfRange(var.to_string(), port));
    }
    Ok(port)
}

/// Validates environment variables and returns a Config object.
/// Returns an error if any required variable is missing or invalid.
pub fn validate_env() -> Result<Config, ConfigError> {
    let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0".to_string());
    let http_port = parse_port("HTTP_PORT", Some(5000))?;
    let metrics_port = parse_port("METRICS_PORT", Some(3030))?;
    let rtc_min_port = parse_port("RTC_MIN_PORT", Some(40000))?;
    let rtc_max_port = parse_port("RTC_MAX_PORT", Some(49999))?;

    if rtc_min_port >= rtc_max_port {
        return Err(ConfigError::InvalidPortRange(rtc_min_port, rtc_max_port));
    }

    let announced_ip = env::var("ANNOUNCED_IP").ok().filter(|s| !s.is_empty());

    let sfu_workers: usize = match env::var("SFU_WORKERS") {
        Ok(raw) => raw
            .parse()
            .map_err(|e| ConfigError::InvalidPort("SFU_WORKERS".to_string(), e))?,
        Err(_) => std::thread::available_parallelism()
            .map(|n| n.get().min(4))
            .unwrap_or(1),
    };

    let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| {
        eprintln!("RUST_LOG not set, using default: info");
        "info".to_string()
    });

    Ok(Config {
        bind_addr,
        http_port,
        metrics_port,
        rtc_min_port,
        rtc_max_port,
        announced_ip,
        sfu_workers,
        rust_log,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    lazy_static::lazy_static! {
        static ref ENV_MUTEX: Mutex<()> = Mutex::new(());
    }

    // Helper to set up and tear down environment variables for tests.
    struct EnvGuard<'a> {
        vars: Vec<String>,
        _guard: std::sync::MutexGuard<'a, ()>,
    }

    impl<'a> EnvGuard<'a> {
        fn new() -> Self {
            let guard = ENV_MUTEX.lock().unwrap();
            EnvGuard {
                vars: Vec::new(),
                _guard: guard,
            }
        }

        fn set(&mut self, key: &str, value: &str) {
            env::set_var(key, value);
            self.vars.push(key.to_string());
        }

        fn unset(&mut self, key: &str) {
            env::remove_var(key);
            self.vars.push(key.to_string());
        }
    }

    impl<'a> Drop for EnvGuard<'a> {
        fn drop(&mut self) {
            for var in &self.vars {
                env::remove_var(var);
            }
        }
    }

    fn clear_all(guard: &mut EnvGuard) {
        for var in [
            "BIND_ADDR",
            "HTTP_PORT",
            "METRICS_PORT",
            "RTC_MIN_PORT",
            "RTC_MAX_PORT",
            "ANNOUNCED_IP",
            "SFU_WORKERS",
            "RUST_LOG",
        ] {
            guard.unset(var);
        }
    }

    #[test]
    fn test_validate_env_defaults() {
        let mut guard = EnvGuard::new();
        clear_all(&mut guard);

        let cfg = validate_env().expect("defaults alone should be valid");
        assert_eq!(cfg.bind_addr, "0.0.0.0");
        assert_eq!(cfg.http_port, 5000);
        assert_eq!(cfg.metrics_port, 3030);
        assert_eq!(cfg.rtc_min_port, 40000);
        assert_eq!(cfg.rtc_max_port, 49999);
        assert_eq!(cfg.announced_ip, None);
        assert_eq!(cfg.rust_log, "info");
    }

    #[test]
    fn test_validate_env_overrides() {
        let mut guard = EnvGuard::new();
        clear_all(&mut guard);
        guard.set("HTTP_PORT", "8080");
        guard.set("METRICS_PORT", "9090");
        guard.set("ANNOUNCED_IP", "203.0.113.7");
        guard.set("SFU_WORKERS", "2");
        guard.set("RUST_LOG", "debug");

        let cfg = validate_env().expect("overrides should be valid");
        assert_eq!(cfg.http_port, 8080);
        assert_eq!(cfg.metrics_port, 9090);
        assert_eq!(cfg.announced_ip.as_deref(), Some("203.0.113.7"));
        assert_eq!(cfg.sfu_workers, 2);
        assert_eq!(cfg.rust_log, "debug");
    }

    #[test]
    fn test_validate_env_invalid_port() {
        let mut guard = EnvGuard::new();
        clear_all(&mut guard);
        guard.set("HTTP_PORT", "not-a-number");

        let err = validate_env().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPort(_, _)));
        assert!(err.to_string().contains("HTTP_PORT"));
    }

    #[test]
    fn test_validate_env_port_out_of_range() {
        let mut guard = EnvGuard::new();
        clear_all(&mut guard);
        guard.set("HTTP_PORT", "0");

        let err = validate_env().unwrap_err();
        assert!(matches!(err, ConfigError::PortOutOfRange(_, _)));
    }

    #[test]
    fn test_validate_env_invalid_rtc_port_range() {
        let mut guard = EnvGuard::new();
        clear_all(&mut guard);
        guard.set("RTC_MIN_PORT", "50000");
        guard.set("RTC_MAX_PORT", "40000");

        let err = validate_env().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPortRange(_, _)));
    }

    #[test]
    fn test_validate_env_blank_announced_ip_is_none() {
        let mut guard = EnvGuard::new();
        clear_all(&mut guard);
        guard.set("ANNOUNCED_IP", "");

        let cfg = validate_env().expect("blank announced ip should be tolerated");
        assert_eq!(cfg.announced_ip, None);
    }
}
