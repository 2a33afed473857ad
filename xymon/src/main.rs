use anyhow::Result;
#[cfg(any(feature = "report", feature = "feed"))]
use anyhow::anyhow;
use clap::{Parser, Subcommand};
#[cfg(any(feature = "feed", feature = "hosts"))]
use output::OutputFormat;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
#[cfg(any(feature = "report", feature = "feed"))]
use xymon_core::Color;

mod config;
mod output;

#[derive(Debug, Parser)]
#[command(name = "xymon", version, about = "Report to and query a Xymon monitoring server")]
struct Cli {
    /// Optional config file (YAML). If omitted, loads ./xymon.yaml if present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Xymon server hostname or IP (overrides $XYMSRV)
    #[arg(long, global = true)]
    server: Option<String>,
    /// Xymon listener port
    #[arg(long, global = true)]
    port: Option<u16>,
    /// More log output (-v info, -vv debug, -vvv trace). RUST_LOG takes precedence.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print version information
    Version,
    /// Send a status report for one host/test
    #[cfg(feature = "report")]
    Report {
        host: String,
        test: String,
        /// green, yellow, red, clear, purple or blue
        color: Color,
        /// Status details; "-" reads from stdin
        message: String,
        /// Time until the status goes purple without a new report (e.g. 30m, 2h)
        #[arg(long)]
        interval: Option<String>,
    },
    /// Send raw data (e.g. RRD values) for one host/test
    #[cfg(feature = "report")]
    Data {
        host: String,
        test: String,
        /// Payload; "-" reads from stdin
        payload: String,
    },
    /// Send an arbitrary protocol message
    #[cfg(feature = "report")]
    Send {
        /// Message text; "-" reads from stdin
        message: String,
    },
    /// Query current statuses from appfeed
    #[cfg(feature = "feed")]
    Query {
        /// Host name or pattern
        #[arg(long)]
        host: Option<String>,
        /// Test name
        #[arg(long)]
        test: Option<String>,
        /// Page path
        #[arg(long)]
        page: Option<String>,
        /// Comma-separated colors (default: all)
        #[arg(long)]
        color: Option<String>,
        /// CGI directory prefix (overrides $XYMONSERVERCGIURL)
        #[arg(long)]
        cgi: Option<String>,
        /// Use plain HTTP instead of HTTPS
        #[arg(long, default_value_t = false)]
        no_tls: bool,
        /// Output format
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
    },
    /// Print the status of one host/test
    #[cfg(feature = "feed")]
    Status {
        host: String,
        test: String,
        /// CGI directory prefix (overrides $XYMONSERVERCGIURL)
        #[arg(long)]
        cgi: Option<String>,
        /// Use plain HTTP instead of HTTPS
        #[arg(long, default_value_t = false)]
        no_tls: bool,
    },
    /// List hosts carrying a hosts.cfg tag (runs xymongrep)
    #[cfg(feature = "hosts")]
    TaggedHosts {
        /// Tag, optionally with a wildcard (e.g. "http=*")
        tag: String,
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

#[cfg(feature = "report")]
fn arg_or_stdin(value: String) -> Result<String> {
    if value != "-" {
        return Ok(value);
    }
    let mut s = String::new();
    std::io::Read::read_to_string(&mut std::io::stdin(), &mut s)?;
    Ok(s.trim_end_matches('\n').to_string())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let file_cfg = config::load_config(cli.config.as_deref())?;
    let xymon_cfg = config::resolve(file_cfg.as_ref(), cli.server.as_deref(), cli.port);
    tracing::debug!(?xymon_cfg, "resolved configuration");

    match cli.command {
        Commands::Version => {
            println!("xymon {} (core {})", env!("CARGO_PKG_VERSION"), xymon_core::version());
        }
        #[cfg(feature = "report")]
        Commands::Report { host, test, color, message, interval } => {
            let interval = interval
                .or_else(|| file_cfg.as_ref().and_then(|f| f.report.as_ref()).and_then(|r| r.interval.clone()))
                .unwrap_or_else(|| report::DEFAULT_INTERVAL.to_string());
            let message = arg_or_stdin(message)?;
            let sender = report::Sender::new(&xymon_cfg);
            if !sender.report_with_interval(&host, &test, color, &message, &interval) {
                return Err(anyhow!("failed to send status to {}", sender.target()));
            }
        }
        #[cfg(feature = "report")]
        Commands::Data { host, test, payload } => {
            let payload = arg_or_stdin(payload)?;
            let sender = report::Sender::new(&xymon_cfg);
            if !sender.data(&host, &test, &payload) {
                return Err(anyhow!("failed to send data to {}", sender.target()));
            }
        }
        #[cfg(feature = "report")]
        Commands::Send { message } => {
            let message = arg_or_stdin(message)?;
            let sender = report::Sender::new(&xymon_cfg);
            sender.try_send_message(&message)?;
        }
        #[cfg(feature = "feed")]
        Commands::Query { host, test, page, color, cgi, no_tls, format } => {
            let query_cfg = file_cfg.as_ref().and_then(|f| f.query.clone()).unwrap_or_default();
            let colors = match color.or(query_cfg.colors) {
                Some(spec) => Color::parse_list(&spec)?,
                None => Vec::new(),
            };
            let format = match (format, query_cfg.format) {
                (Some(f), _) => f,
                (None, Some(name)) => <OutputFormat as clap::ValueEnum>::from_str(&name, true)
                    .map_err(|e| anyhow!("invalid output format in config: {}", e))?,
                (None, None) => OutputFormat::Text,
            };
            let mut query = appfeed::FeedQuery::default()
                .colors(&colors)
                .use_tls(!no_tls && query_cfg.use_tls.unwrap_or(true));
            query.host = host;
            query.test = test;
            query.page = page;
            query.cgi_prefix = cgi;
            let client = appfeed::FeedClient::new(&xymon_cfg)?;
            let statuses = client.query(&query);
            let stdout = std::io::stdout();
            output::write_statuses(&mut stdout.lock(), &statuses, format)?;
        }
        #[cfg(feature = "feed")]
        Commands::Status { host, test, cgi, no_tls } => {
            let use_tls = !no_tls
                && file_cfg.as_ref().and_then(|f| f.query.as_ref()).and_then(|q| q.use_tls).unwrap_or(true);
            let mut base = appfeed::FeedQuery::default().use_tls(use_tls);
            base.cgi_prefix = cgi;
            let client = appfeed::FeedClient::new(&xymon_cfg)?;
            println!("{}", client.status_with(&host, &test, base));
        }
        #[cfg(feature = "hosts")]
        Commands::TaggedHosts { tag, format } => {
            let hosts = xymongrep::find_tagged_hosts(&xymon_cfg, &tag)?;
            let stdout = std::io::stdout();
            output::write_tagged_hosts(&mut stdout.lock(), &hosts, format)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[cfg(feature = "report")]
    #[test]
    fn report_parses_color() {
        let cli = Cli::try_parse_from(["xymon", "report", "web1", "cpu", "RED", "load high", "--interval", "1h"]).unwrap();
        match cli.command {
            Commands::Report { color, interval, .. } => {
                assert_eq!(color, Color::Red);
                assert_eq!(interval.as_deref(), Some("1h"));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(Cli::try_parse_from(["xymon", "report", "web1", "cpu", "pink", "x"]).is_err());
    }

    #[cfg(feature = "feed")]
    #[test]
    fn query_flags() {
        let cli = Cli::try_parse_from(["xymon", "--server", "x", "query", "--host", "web1", "--no-tls", "--format", "json"]).unwrap();
        assert_eq!(cli.server.as_deref(), Some("x"));
        match cli.command {
            Commands::Query { host, no_tls, format, .. } => {
                assert_eq!(host.as_deref(), Some("web1"));
                assert!(no_tls);
                assert_eq!(format, Some(OutputFormat::Json));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[cfg(feature = "feed")]
    #[test]
    fn status_takes_cgi_prefix() {
        let cli = Cli::try_parse_from(["xymon", "status", "web1", "cpu", "--cgi", "/cgi-bin", "--no-tls"]).unwrap();
        match cli.command {
            Commands::Status { host, cgi, no_tls, .. } => {
                assert_eq!(host, "web1");
                assert_eq!(cgi.as_deref(), Some("/cgi-bin"));
                assert!(no_tls);
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
