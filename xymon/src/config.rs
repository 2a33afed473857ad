use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use xymon_core::XymonConfig;

pub const DEFAULT_CONFIG_FILE: &str = "xymon.yaml";

#[derive(Debug, Default, Deserialize, Clone)]
pub struct ReportConfig {
    pub interval: Option<String>,
}

#[derive(Debug, Default, Deserialize, Clone)]
pub struct QueryConfig {
    pub use_tls: Option<bool>,
    pub colors: Option<String>,
    pub format: Option<String>,
}

/// Contents of `xymon.yaml`. Every field is optional.
#[derive(Debug, Default, Deserialize, Clone)]
pub struct Config {
    pub server: Option<String>,
    pub port: Option<u16>,
    pub cgi_prefix: Option<String>,
    pub xymon_home: Option<PathBuf>,
    pub report: Option<ReportConfig>,
    pub query: Option<QueryConfig>,
}

impl Config {
    /// Overlay the file's connection settings on `base`.
    pub fn apply(&self, mut base: XymonConfig) -> XymonConfig {
        if let Some(s) = &self.server {
            base.server = s.clone();
        }
        if let Some(p) = self.port {
            base.port = p;
        }
        if let Some(c) = &self.cgi_prefix {
            base.cgi_prefix = c.clone();
        }
        if let Some(h) = &self.xymon_home {
            base.xymon_home = Some(h.clone());
        }
        base
    }
}

/// Load the given config file, or `./xymon.yaml` if present.
/// A missing default file is not an error; an unreadable explicit one is.
pub fn load_config(path: Option<&Path>) -> Result<Option<Config>> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => {
            let p = Path::new(DEFAULT_CONFIG_FILE);
            if p.exists() { p.to_path_buf() } else { return Ok(None); }
        }
    };
    let s = fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
    let cfg = serde_yaml::from_str(&s).with_context(|| format!("parsing {}", path.display()))?;
    Ok(Some(cfg))
}

/// Defaults, then the config file, then the environment, then command-line flags.
pub fn resolve(file: Option<&Config>, server: Option<&str>, port: Option<u16>) -> XymonConfig {
    let mut cfg = XymonConfig::default();
    if let Some(f) = file {
        cfg = f.apply(cfg);
    }
    cfg = cfg.with_env();
    if let Some(s) = server {
        cfg = cfg.with_server(s);
    }
    if let Some(p) = port {
        cfg = cfg.with_port(p);
    }
    cfg
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = "server: xymon.example.net\nport: 1985\nxymon_home: /usr/lib/xymon/server\nreport:\n  interval: 1h\nquery:\n  use_tls: false\n  colors: red,yellow\n";

    #[test]
    fn loads_explicit_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(SAMPLE.as_bytes()).unwrap();
        let cfg = load_config(Some(f.path())).unwrap().unwrap();
        assert_eq!(cfg.server.as_deref(), Some("xymon.example.net"));
        assert_eq!(cfg.port, Some(1985));
        assert_eq!(cfg.report.unwrap().interval.as_deref(), Some("1h"));
        let q = cfg.query.unwrap();
        assert_eq!(q.use_tls, Some(false));
        assert_eq!(q.colors.as_deref(), Some("red,yellow"));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(Some(&dir.path().join("nope.yaml"))).is_err());
    }

    #[test]
    fn file_overlays_defaults() {
        let cfg: Config = serde_yaml::from_str(SAMPLE).unwrap();
        let x = cfg.apply(XymonConfig::default());
        assert_eq!(x.port, 1985);
        assert_eq!(x.cgi_prefix, xymon_core::config::DEFAULT_CGI_PREFIX);
        assert_eq!(x.xymon_home, Some(PathBuf::from("/usr/lib/xymon/server")));
    }

    #[test]
    fn flags_win() {
        let cfg: Config = serde_yaml::from_str(SAMPLE).unwrap();
        let x = resolve(Some(&cfg), Some("10.1.1.1"), Some(2000));
        assert_eq!(x.server, "10.1.1.1");
        assert_eq!(x.port, 2000);
    }
}
