//! Wrappers for the tools shipped in `$XYMONHOME/bin`, mainly `xymongrep`.

use serde::Serialize;
use std::ffi::OsStr;
use std::io;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::string::FromUtf8Error;
use thiserror::Error;
use tracing::{debug, error};
use xymon_core::XymonConfig;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("XYMONHOME is not set")]
    HomeNotSet,
    #[error("failed to run {}: {source}", .path.display())]
    Spawn { path: PathBuf, source: io::Error },
    #[error("error while executing {cmd}: ({}) {stderr}", describe_exit(.code))]
    Failed { cmd: String, code: Option<i32>, stderr: String },
    #[error("{cmd} produced non UTF-8 output")]
    Utf8 { cmd: String, source: FromUtf8Error },
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(c) => c.to_string(),
        None => "killed by signal".to_string(),
    }
}

/// A host carrying a tag in hosts.cfg.
///
/// For `mytag=1,2,3` the params are `["1", "2", "3"]`; a bare tag has none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaggedHost {
    pub host: String,
    pub ip: String,
    pub params: Vec<String>,
}

/// Run `cmd` from the Xymon bin directory and return its stdout.
///
/// A non-zero exit is logged with the tool's stderr and returned as
/// [`ToolError::Failed`].
pub fn run_xymon_cmd<I, S>(config: &XymonConfig, cmd: &str, args: I) -> Result<String, ToolError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let home = config.xymon_home.as_ref().ok_or(ToolError::HomeNotSet)?;
    let path = home.join("bin").join(cmd);
    let mut command = Command::new(&path);
    command.args(args).stdin(Stdio::null());
    debug!(?command, "running xymon tool");
    let output = command
        .output()
        .map_err(|source| ToolError::Spawn { path: path.clone(), source })?;
    let cmd = path.display().to_string();
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim_end().to_string();
        let code = output.status.code();
        error!(%cmd, ?code, %stderr, "xymon tool failed");
        return Err(ToolError::Failed { cmd, code, stderr });
    }
    String::from_utf8(output.stdout).map_err(|source| ToolError::Utf8 { cmd, source })
}

/// Parse `xymongrep` output: `IP HOST # TAG[=P1,P2,...]` per line.
/// Lines with fewer than four fields are skipped.
pub fn parse_tagged_hosts(text: &str) -> Vec<TaggedHost> {
    let mut hosts = Vec::new();
    for line in text.lines() {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() < 4 {
            if !tokens.is_empty() {
                debug!(line, "skipping short xymongrep line");
            }
            continue;
        }
        let params = match tokens[3].split_once('=') {
            Some((_, list)) => list.split(',').map(str::to_string).collect(),
            None => Vec::new(),
        };
        hosts.push(TaggedHost { host: tokens[1].to_string(), ip: tokens[0].to_string(), params });
    }
    hosts
}

/// Hosts whose hosts.cfg entry carries `tag`, includes followed.
/// The tag may end in a wildcard (`mytag=*`) to match any parameters.
pub fn find_tagged_hosts(config: &XymonConfig, tag: &str) -> Result<Vec<TaggedHost>, ToolError> {
    let out = run_xymon_cmd(config, "xymongrep", ["--noextras", tag])?;
    Ok(parse_tagged_hosts(&out))
}
