use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://opensky-network.org";
pub const DEFAULT_CONFIG_FILE: &str = "opensky-tui.toml";
pub const DEFAULT_TIMEOUT_SECS: u64 = 20;
pub const DEFAULT_ALLOW_HTTP: bool = false;
pub const DEFAULT_MIN_LAT: &str = "45.8389";
pub const DEFAULT_MAX_LAT: &str = "47.8229";
pub const DEFAULT_MIN_LON: &str = "5.9962";
pub const DEFAULT_MAX_LON: &str = "10.5226";
pub const DEFAULT_LOG_FILE: &str = "opensky-tui.log";

#[derive(Debug, Clone)]
pub struct Config {
    pub api_base: String,
    pub allow_http: bool,
    pub timeout_secs: u64,
    pub config_path: PathBuf,
    pub min_lat: String,
    pub max_lat: String,
    pub min_lon: String,
    pub max_lon: String,
    pub client_id: String,
    pub client_secret: String,
    pub log_enabled: bool,
    pub log_level: String,
    pub log_file: String,
}

impl Config {
    /// `None` leaves the HTTP client on its own default.
    pub fn timeout(&self) -> Option<Duration> {
        if self.timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.timeout_secs))
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            allow_http: DEFAULT_ALLOW_HTTP,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            config_path: PathBuf::from(DEFAULT_CONFIG_FILE),
            min_lat: DEFAULT_MIN_LAT.to_string(),
            max_lat: DEFAULT_MAX_LAT.to_string(),
            min_lon: DEFAULT_MIN_LON.to_string(),
            max_lon: DEFAULT_MAX_LON.to_string(),
            client_id: String::new(),
            client_secret: String::new(),
            log_enabled: false,
            log_level: "info".to_string(),
            log_file: DEFAULT_LOG_FILE.to_string(),
        }
    }
}

// No client_secret key: the secret only comes from the environment.
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    api_base: Option<String>,
    allow_http: Option<bool>,
    timeout_secs: Option<u64>,
    min_lat: Option<f64>,
    max_lat: Option<f64>,
    min_lon: Option<f64>,
    max_lon: Option<f64>,
    client_id: Option<String>,
    log_enabled: Option<bool>,
    log_level: Option<String>,
    log_file: Option<String>,
}

pub enum ParseOutcome {
    Run(Config),
    Help,
}

pub fn parse_args() -> Result<Config> {
    let args: Vec<String> = env::args().skip(1).collect();
    match parse_args_from(&args)? {
        ParseOutcome::Run(config) => Ok(config),
        ParseOutcome::Help => {
            print_help();
            std::process::exit(0);
        }
    }
}

pub fn parse_args_from(args: &[String]) -> Result<ParseOutcome> {
    let mut explicit_config: Option<PathBuf> = None;
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "--config" {
            let value = iter
                .next()
                .ok_or_else(|| anyhow!("--config needs a value"))?;
            explicit_config = Some(PathBuf::from(value));
        }
    }

    let env_config = env::var("OPENSKY_CONFIG").ok().map(PathBuf::from);
    let config_path = explicit_config
        .clone()
        .or(env_config)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

    let mut config = Config::default();

    if config_path.exists() {
        if let Some(file_config) = load_file_config(&config_path)? {
            apply_file_config(&mut config, file_config);
        }
    } else if explicit_config.is_some() {
        return Err(anyhow!("Config file not found: {}", config_path.display()));
    }
    config.config_path = config_path;

    apply_env(&mut config);

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                iter.next();
            }
            "--api-base" => {
                config.api_base = iter
                    .next()
                    .ok_or_else(|| anyhow!("--api-base needs a value"))?
                    .to_string();
            }
            "--allow-http" => {
                config.allow_http = true;
            }
            "--timeout" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--timeout needs a value"))?;
                config.timeout_secs = value.parse()?;
            }
            "--bbox" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--bbox needs a value"))?;
                apply_bbox(&mut config, value)?;
            }
            "--client-id" => {
                config.client_id = iter
                    .next()
                    .ok_or_else(|| anyhow!("--client-id needs a value"))?
                    .to_string();
            }
            "--log" => {
                config.log_enabled = true;
            }
            "--no-log" => {
                config.log_enabled = false;
            }
            "--log-level" => {
                config.log_level = iter
                    .next()
                    .ok_or_else(|| anyhow!("--log-level needs a value"))?
                    .to_string();
            }
            "--log-file" => {
                config.log_file = iter
                    .next()
                    .ok_or_else(|| anyhow!("--log-file needs a value"))?
                    .to_string();
            }
            "-h" | "--help" => return Ok(ParseOutcome::Help),
            other => return Err(anyhow!("Unknown argument: {other}")),
        }
    }

    validate_security(&config)?;
    Ok(ParseOutcome::Run(config))
}

fn apply_env(config: &mut Config) {
    if let Ok(value) = env::var("OPENSKY_API_BASE") {
        config.api_base = value;
    }
    if let Ok(value) = env::var("OPENSKY_ALLOW_HTTP") {
        config.allow_http = is_truthy(&value);
    }
    if let Ok(value) = env::var("OPENSKY_TIMEOUT") {
        if let Ok(secs) = value.parse::<u64>() {
            config.timeout_secs = secs;
        }
    }
    if let Ok(value) = env::var("OPENSKY_BBOX") {
        let _ = apply_bbox(config, &value);
    }
    if let Ok(value) = env::var("OPENSKY_CLIENT_ID") {
        config.client_id = value;
    }
    if let Ok(value) = env::var("OPENSKY_CLIENT_SECRET") {
        config.client_secret = value;
    }
    if let Ok(value) = env::var("OPENSKY_LOG_ENABLED") {
        config.log_enabled = is_truthy(&value);
    }
    if let Ok(value) = env::var("OPENSKY_LOG_LEVEL") {
        config.log_level = value;
    }
    if let Ok(value) = env::var("OPENSKY_LOG_FILE") {
        config.log_file = value;
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(value.trim(), "1" | "true" | "yes" | "on")
}

/// Accepts `MIN_LAT,MAX_LAT,MIN_LON,MAX_LON`.
fn apply_bbox(config: &mut Config, value: &str) -> Result<()> {
    let parts: Vec<&str> = value.split(',').map(str::trim).collect();
    if parts.len() != 4 {
        return Err(anyhow!(
            "bounding box needs four comma-separated values, got {}",
            parts.len()
        ));
    }
    for part in &parts {
        part.parse::<f64>()
            .with_context(|| format!("invalid bounding box value: {part}"))?;
    }
    config.min_lat = parts[0].to_string();
    config.max_lat = parts[1].to_string();
    config.min_lon = parts[2].to_string();
    config.max_lon = parts[3].to_string();
    Ok(())
}

fn load_file_config(path: &Path) -> Result<Option<FileConfig>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;
    let cfg: FileConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config: {}", path.display()))?;
    Ok(Some(cfg))
}

fn apply_file_config(target: &mut Config, file: FileConfig) {
    if let Some(api_base) = file.api_base {
        target.api_base = api_base;
    }
    if let Some(allow_http) = file.allow_http {
        target.allow_http = allow_http;
    }
    if let Some(timeout_secs) = file.timeout_secs {
        target.timeout_secs = timeout_secs;
    }
    if let Some(min_lat) = file.min_lat {
        target.min_lat = min_lat.to_string();
    }
    if let Some(max_lat) = file.max_lat {
        target.max_lat = max_lat.to_string();
    }
    if let Some(min_lon) = file.min_lon {
        target.min_lon = min_lon.to_string();
    }
    if let Some(max_lon) = file.max_lon {
        target.max_lon = max_lon.to_string();
    }
    if let Some(client_id) = file.client_id {
        target.client_id = client_id;
    }
    if let Some(log_enabled) = file.log_enabled {
        target.log_enabled = log_enabled;
    }
    if let Some(log_level) = file.log_level {
        target.log_level = log_level;
    }
    if let Some(log_file) = file.log_file {
        target.log_file = log_file;
    }
}

fn print_help() {
    println!("opensky-tui");
    println!("Usage: opensky-tui [--config PATH] [--api-base URL] [--allow-http]");
    println!("       [--timeout SECONDS] [--bbox MIN_LAT,MAX_LAT,MIN_LON,MAX_LON]");
    println!("       [--client-id ID]");
    println!("       [--log] [--no-log] [--log-level LEVEL] [--log-file PATH]");
    println!("Environment: OPENSKY_CONFIG overrides config path");
    println!("Environment: OPENSKY_API_BASE overrides the API host");
    println!("Environment: OPENSKY_ALLOW_HTTP=1 allows http:// API hosts");
    println!("Environment: OPENSKY_TIMEOUT sets the request timeout (0 = client default)");
    println!("Environment: OPENSKY_BBOX prefills the bounding box");
    println!("Environment: OPENSKY_CLIENT_ID/OPENSKY_CLIENT_SECRET prefill credentials");
    println!("Environment: OPENSKY_LOG_ENABLED/LEVEL/FILE configure logging");
    println!("Keys: Tab/Shift-Tab field | Enter fetch | Up/Down rows | F2 sort");
    println!("      F3 export csv | F4 export json | F1 help | Esc quit");
}

fn validate_security(config: &Config) -> Result<()> {
    let trimmed = config.api_base.trim().to_ascii_lowercase();
    if trimmed.starts_with("http://") && !config.allow_http {
        return Err(anyhow!(
            "Refusing to send credentials over http (set allow_http=true or OPENSKY_ALLOW_HTTP=1 to override)"
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_file(name: &str) -> PathBuf {
        let mut dir = std::env::temp_dir();
        let suffix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        dir.push(format!("opensky-tui-config-test-{suffix}"));
        let _ = fs::create_dir_all(&dir);
        dir.push(name);
        dir
    }

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn default_uses_https() {
        let cfg = Config::default();
        assert!(validate_security(&cfg).is_ok());
        assert_eq!(cfg.timeout(), Some(Duration::from_secs(DEFAULT_TIMEOUT_SECS)));
    }

    #[test]
    fn http_base_rejected_unless_allowed() {
        let mut cfg = Config::default();
        cfg.api_base = "http://localhost:8080".to_string();
        let err = validate_security(&cfg).unwrap_err();
        assert!(err.to_string().contains("Refusing to send credentials over http"));
        cfg.allow_http = true;
        assert!(validate_security(&cfg).is_ok());
    }

    #[test]
    fn zero_timeout_means_client_default() {
        let cfg = Config {
            timeout_secs: 0,
            ..Config::default()
        };
        assert_eq!(cfg.timeout(), None);
    }

    #[test]
    fn load_file_config_parses_values() {
        let path = temp_file("config.toml");
        let content = r#"
api_base = "https://example.test"
timeout_secs = 7
min_lat = 40.5
max_lat = 41.0
min_lon = -74.25
max_lon = -73.5
client_id = "alice"
log_enabled = true
log_level = "debug"
log_file = "trace.log"
"#;
        fs::write(&path, content).unwrap();
        let cfg = load_file_config(&path).unwrap().unwrap();
        assert_eq!(cfg.api_base.as_deref(), Some("https://example.test"));
        assert_eq!(cfg.timeout_secs, Some(7));
        assert_eq!(cfg.min_lat, Some(40.5));
        assert_eq!(cfg.max_lon, Some(-73.5));
        assert_eq!(cfg.client_id.as_deref(), Some("alice"));
        assert_eq!(cfg.log_enabled, Some(true));
        assert_eq!(cfg.log_level.as_deref(), Some("debug"));
        let _ = fs::remove_file(&path);
        let _ = fs::remove_dir(path.parent().unwrap());
    }

    #[test]
    fn file_config_ignores_secret_key() {
        let path = temp_file("secret.toml");
        fs::write(&path, "client_secret = \"nope\"\n").unwrap();
        let cfg = load_file_config(&path).unwrap().unwrap();
        let mut target = Config::default();
        apply_file_config(&mut target, cfg);
        assert!(target.client_secret.is_empty());
        let _ = fs::remove_file(&path);
        let _ = fs::remove_dir(path.parent().unwrap());
    }

    #[test]
    fn apply_file_config_overrides() {
        let mut cfg = Config::default();
        let file = FileConfig {
            min_lat: Some(-10.0),
            max_lon: Some(12.5),
            timeout_secs: Some(0),
            log_enabled: Some(true),
            ..Default::default()
        };
        apply_file_config(&mut cfg, file);
        assert_eq!(cfg.min_lat, "-10");
        assert_eq!(cfg.max_lon, "12.5");
        assert_eq!(cfg.max_lat, DEFAULT_MAX_LAT);
        assert_eq!(cfg.timeout_secs, 0);
        assert!(cfg.log_enabled);
    }

    #[test]
    fn bbox_argument() {
        let mut cfg = Config::default();
        apply_bbox(&mut cfg, " 40.1, 41 ,-74.5,-73").unwrap();
        assert_eq!(
            (cfg.min_lat.as_str(), cfg.max_lat.as_str(), cfg.min_lon.as_str(), cfg.max_lon.as_str()),
            ("40.1", "41", "-74.5", "-73")
        );
        assert!(apply_bbox(&mut cfg, "1,2,3").is_err());
        assert!(apply_bbox(&mut cfg, "1,2,x,4").is_err());
        assert_eq!(cfg.min_lat, "40.1");
    }

    #[test]
    fn command_line_flags() {
        let path = temp_file("absent.toml");
        let err = parse_args_from(&args(&["--config", path.to_str().unwrap()]))
            .err()
            .unwrap();
        assert!(err.to_string().contains("Config file not found"));

        fs::write(&path, "log_level = \"warn\"\n").unwrap();
        let outcome = parse_args_from(&args(&[
            "--config",
            path.to_str().unwrap(),
            "--api-base",
            "https://mirror.example",
            "--timeout",
            "3",
            "--log",
        ]))
        .unwrap();
        let ParseOutcome::Run(cfg) = outcome else {
            panic!("expected config");
        };
        assert_eq!(cfg.api_base, "https://mirror.example");
        assert_eq!(cfg.timeout_secs, 3);
        assert!(cfg.log_enabled);
        assert_eq!(cfg.config_path, path);

        assert!(matches!(
            parse_args_from(&args(&["--config", path.to_str().unwrap(), "--help"])),
            Ok(ParseOutcome::Help)
        ));
        assert!(parse_args_from(&args(&["--config", path.to_str().unwrap(), "--bogus"])).is_err());
        let _ = fs::remove_file(&path);
        let _ = fs::remove_dir(path.parent().unwrap());
    }
}
