use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

pub const DEFAULT_SERVER: &str = "localhost";
pub const DEFAULT_PORT: u16 = 1984;
pub const DEFAULT_CGI_PREFIX: &str = "/xymon-cgi";

/// Server hostname or address.
pub const ENV_SERVER: &str = "XYMSRV";
/// Path prefix of the Xymon CGI scripts on the web server.
pub const ENV_CGI_PREFIX: &str = "XYMONSERVERCGIURL";
/// Xymon installation directory; tools live in `$XYMONHOME/bin`.
pub const ENV_HOME: &str = "XYMONHOME";

/// Host and port of the Xymon listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub host: String,
    pub port: u16,
}

impl From<(&str, u16)> for Target {
    fn from((host, port): (&str, u16)) -> Self {
        Target { host: host.to_string(), port }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Client settings, built once at startup and handed to each client by reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XymonConfig {
    pub server: String,
    pub port: u16,
    pub cgi_prefix: String,
    pub xymon_home: Option<PathBuf>,
}

impl Default for XymonConfig {
    fn default() -> Self {
        XymonConfig {
            server: DEFAULT_SERVER.to_string(),
            port: DEFAULT_PORT,
            cgi_prefix: DEFAULT_CGI_PREFIX.to_string(),
            xymon_home: None,
        }
    }
}

impl XymonConfig {
    /// Defaults overridden by `XYMSRV`, `XYMONSERVERCGIURL` and `XYMONHOME`.
    pub fn from_env() -> Self {
        XymonConfig::default().with_env()
    }

    /// Like [`XymonConfig::from_env`] but reads variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        XymonConfig::default().with_lookup(lookup)
    }

    /// Override fields with the environment.
    pub fn with_env(self) -> Self {
        self.with_lookup(|key| std::env::var(key).ok())
    }

    /// Override fields with the variables `lookup` knows about. Empty values count as unset.
    pub fn with_lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
        if let Some(server) = get(ENV_SERVER) {
            self.server = server;
        }
        if let Some(cgi) = get(ENV_CGI_PREFIX) {
            self.cgi_prefix = cgi;
        }
        if let Some(home) = get(ENV_HOME) {
            self.xymon_home = Some(PathBuf::from(home));
        }
        self
    }

    pub fn with_server(mut self, server: impl Into<String>) -> Self {
        self.server = server.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_cgi_prefix(mut self, cgi_prefix: impl Into<String>) -> Self {
        self.cgi_prefix = cgi_prefix.into();
        self
    }

    pub fn with_xymon_home(mut self, home: impl Into<PathBuf>) -> Self {
        self.xymon_home = Some(home.into());
        self
    }

    pub fn target(&self) -> Target {
        (self.server.as_str(), self.port).into()
    }
}
