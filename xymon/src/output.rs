//! Rendering of query results and tagged hosts.

use anyhow::Result;
use clap::ValueEnum;
use std::io::Write;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat { Text, Json, Jsonl, Yaml, Csv }

#[cfg(feature = "feed")]
pub fn write_statuses<W: Write>(w: &mut W, statuses: &appfeed::StatusCollection, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            for r in statuses.records() {
                write!(w, "{}.{} {} {}", r.host, r.test, r.status, r.summary.trim())?;
                if let (Some(text), Some(by)) = (&r.disabled, &r.by) {
                    write!(w, " (disabled by {}: {})", by, text)?;
                }
                writeln!(w)?;
            }
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *w, statuses)?;
            writeln!(w)?;
        }
        OutputFormat::Jsonl => {
            for r in statuses.records() {
                let mut obj = serde_json::to_value(r)?;
                if let Some(map) = obj.as_object_mut() {
                    map.insert("host".into(), r.host.clone().into());
                    map.insert("test".into(), r.test.clone().into());
                }
                writeln!(w, "{}", serde_json::to_string(&obj)?)?;
            }
        }
        OutputFormat::Yaml => {
            w.write_all(serde_yaml::to_string(statuses)?.as_bytes())?;
        }
        OutputFormat::Csv => {
            let mut wtr = csv::Writer::from_writer(w);
            wtr.write_record(["host", "test", "status", "summary", "url", "time", "changed", "disabled", "by"])?;
            for r in statuses.records() {
                wtr.write_record([
                    r.host.clone(),
                    r.test.clone(),
                    r.status.clone(),
                    r.summary.clone(),
                    r.url.clone().unwrap_or_default(),
                    r.time.map(|v| v.to_string()).unwrap_or_default(),
                    r.changed.map(|v| v.to_string()).unwrap_or_default(),
                    r.disabled.clone().unwrap_or_default(),
                    r.by.clone().unwrap_or_default(),
                ])?;
            }
            wtr.flush()?;
        }
    }
    Ok(())
}

#[cfg(feature = "hosts")]
pub fn write_tagged_hosts<W: Write>(w: &mut W, hosts: &[xymongrep::TaggedHost], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            for h in hosts {
                writeln!(w, "{} {} {}", h.ip, h.host, h.params.join(","))?;
            }
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *w, hosts)?;
            writeln!(w)?;
        }
        OutputFormat::Jsonl => {
            for h in hosts {
                writeln!(w, "{}", serde_json::to_string(h)?)?;
            }
        }
        OutputFormat::Yaml => {
            w.write_all(serde_yaml::to_string(hosts)?.as_bytes())?;
        }
        OutputFormat::Csv => {
            let mut wtr = csv::Writer::from_writer(w);
            wtr.write_record(["host", "ip", "params"])?;
            for h in hosts {
                wtr.write_record([h.host.as_str(), h.ip.as_str(), h.params.join(",").as_str()])?;
            }
            wtr.flush()?;
        }
    }
    Ok(())
}
