use roxmltree::{Document, Node};
use serde::Serialize;
use std::borrow::Cow;
use std::collections::BTreeMap;
use thiserror::Error;
use xymon_core::Color;

pub(crate) const NO_HOST: &str = "nohost";
pub(crate) const NO_TEST: &str = "notest";

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed XML: {0}")]
    Xml(#[from] roxmltree::Error),
    #[error("ServerStatus is missing <{0}>")]
    MissingField(&'static str),
    #[error("<{field}> is not an integer: {value:?}")]
    BadNumber { field: &'static str, value: String },
}

/// State of one test on one host.
///
/// Placeholders built for failed or empty queries only carry `status` and
/// `summary`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusRecord {
    #[serde(skip)]
    pub host: String,
    #[serde(skip)]
    pub test: String,
    pub status: String,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Last report, epoch seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<i64>,
    /// Last color change, epoch seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changed: Option<i64>,
    /// Why the test is disabled (blue only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disabled: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub by: Option<String>,
}

impl StatusRecord {
    pub fn placeholder(host: &str, test: &str, status: &str, summary: impl Into<String>) -> Self {
        StatusRecord {
            host: host.to_string(),
            test: test.to_string(),
            status: status.to_string(),
            summary: summary.into(),
            url: None,
            time: None,
            changed: None,
            disabled: None,
            by: None,
        }
    }

    /// The status as a color, if it is one.
    pub fn color(&self) -> Option<Color> {
        self.status.parse().ok()
    }
}

/// Records keyed by host, then by test.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct StatusCollection(BTreeMap<String, BTreeMap<String, StatusRecord>>);

impl StatusCollection {
    /// Group records; a later record for the same host/test replaces the earlier one.
    pub fn from_records(records: Vec<StatusRecord>) -> Self {
        let mut map: BTreeMap<String, BTreeMap<String, StatusRecord>> = BTreeMap::new();
        for r in records {
            map.entry(r.host.clone()).or_default().insert(r.test.clone(), r);
        }
        StatusCollection(map)
    }

    /// A collection holding a single synthetic record for the queried host/test.
    pub fn placeholder(
        host: Option<&str>,
        test: Option<&str>,
        status: &str,
        summary: impl Into<String>,
    ) -> Self {
        let record = StatusRecord::placeholder(
            host.unwrap_or(NO_HOST),
            test.unwrap_or(NO_TEST),
            status,
            summary,
        );
        Self::from_records(vec![record])
    }

    pub fn get(&self, host: &str, test: &str) -> Option<&StatusRecord> {
        self.0.get(host).and_then(|tests| tests.get(test))
    }

    pub fn host(&self, host: &str) -> Option<&BTreeMap<String, StatusRecord>> {
        self.0.get(host)
    }

    pub fn hosts(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Every record, ordered by host then test.
    pub fn records(&self) -> impl Iterator<Item = &StatusRecord> {
        self.0.values().flat_map(|tests| tests.values())
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.0.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Decode a feed body. The encoding named in the XML declaration wins, then
/// the HTTP `charset`; Latin-1 is mapped byte for byte, everything else is
/// read as UTF-8.
pub fn decode_feed<'a>(body: &'a [u8], charset: Option<&str>) -> Cow<'a, str> {
    let encoding = declared_encoding(body).or(charset);
    if encoding.is_some_and(is_latin1) {
        Cow::Owned(body.iter().map(|&b| char::from(b)).collect())
    } else {
        String::from_utf8_lossy(body)
    }
}

fn is_latin1(name: &str) -> bool {
    matches!(
        name.trim().to_ascii_lowercase().as_str(),
        "iso-8859-1" | "iso8859-1" | "iso_8859-1" | "latin1" | "latin-1" | "l1"
    )
}

/// `encoding` pseudo-attribute of a leading `<?xml ...?>` declaration.
fn declared_encoding(body: &[u8]) -> Option<&str> {
    let body = body.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(body);
    if !body.starts_with(b"<?xml") {
        return None;
    }
    let end = body.windows(2).position(|w| w == b"?>")?;
    let decl = std::str::from_utf8(&body[..end]).ok()?;
    let rest = &decl[decl.find("encoding")? + "encoding".len()..];
    let rest = rest.trim_start().strip_prefix('=')?.trim_start();
    let quote = rest.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let value = &rest[1..];
    value.find(quote).map(|i| &value[..i])
}

/// `charset` parameter of a Content-Type header value.
pub(crate) fn charset_param(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        key.trim().eq_ignore_ascii_case("charset").then(|| value.trim().trim_matches('"'))
    })
}

/// Parse an appfeed document. `base` (`scheme://server`) is prepended to each
/// detail URL.
pub fn parse_feed(xml: &str, base: &str) -> Result<Vec<StatusRecord>, ParseError> {
    let doc = Document::parse(xml)?;
    doc.descendants()
        .filter(|n| n.has_tag_name("ServerStatus"))
        .map(|n| parse_status(n, base))
        .collect()
}

fn parse_status(node: Node<'_, '_>, base: &str) -> Result<StatusRecord, ParseError> {
    let status = child_text(node, "Status")?.to_string();
    let mut record = StatusRecord {
        host: child_text(node, "Servername")?.to_string(),
        test: child_text(node, "Type")?.to_string(),
        summary: child_text(node, "MessageSummary")?.to_string(),
        url: Some(format!("{}{}", base, child_text(node, "DetailURL")?)),
        time: Some(child_epoch(node, "LogTime")?),
        changed: Some(child_epoch(node, "LastChange")?),
        disabled: None,
        by: None,
        status,
    };
    if record.status == Color::Blue.as_str() {
        record.disabled = Some(child_text(node, "DisableText")?.trim().to_string());
        record.by = Some(child_text(node, "DisabledBy")?.to_string());
    }
    Ok(record)
}

// Empty elements read as "".
fn child_text<'a>(node: Node<'a, '_>, name: &'static str) -> Result<&'a str, ParseError> {
    node.children()
        .find(|c| c.has_tag_name(name))
        .map(|c| c.text().unwrap_or(""))
        .ok_or(ParseError::MissingField(name))
}

fn child_epoch(node: Node<'_, '_>, name: &'static str) -> Result<i64, ParseError> {
    let text = child_text(node, name)?;
    text.trim()
        .parse()
        .map_err(|_| ParseError::BadNumber { field: name, value: text.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://xymon.example.net";

    fn server_status(host: &str, test: &str, status: &str, extra: &str) -> String {
        format!(
            "<ServerStatus><Servername>{host}</Servername><Type>{test}</Type><Status>{status}</Status>\
             <MessageSummary>{status} summary</MessageSummary><DetailURL>/xymon-cgi/svcstatus.sh?HOST={host}</DetailURL>\
             <LogTime>100</LogTime><LastChange> 50 </LastChange>{extra}</ServerStatus>"
        )
    }

    fn board(items: &[String]) -> String {
        format!("<?xml version=\"1.0\"?><StatusBoard>{}</StatusBoard>", items.concat())
    }

    #[test]
    fn parses_every_server_status() {
        let xml = board(&[
            server_status("web1", "cpu", "green", ""),
            server_status("web1", "disk", "yellow", ""),
            server_status("db1", "conn", "red", ""),
        ]);
        let records = parse_feed(&xml, BASE).unwrap();
        assert_eq!(records.len(), 3);
        let r = &records[1];
        assert_eq!((r.host.as_str(), r.test.as_str(), r.status.as_str()), ("web1", "disk", "yellow"));
        assert_eq!(r.summary, "yellow summary");
        assert_eq!(r.url.as_deref(), Some("https://xymon.example.net/xymon-cgi/svcstatus.sh?HOST=web1"));
        assert_eq!(r.time, Some(100));
        assert_eq!(r.changed, Some(50));
        assert_eq!(r.disabled, None);
        assert_eq!(r.by, None);
        assert_eq!(r.color(), Some(Color::Yellow));
    }

    #[test]
    fn blue_records_carry_disable_info() {
        let extra = "<DisableText>\n  maintenance window\n</DisableText><DisabledBy>ops</DisabledBy>";
        let xml = board(&[server_status("web1", "http", "blue", extra)]);
        let r = &parse_feed(&xml, BASE).unwrap()[0];
        assert_eq!(r.disabled.as_deref(), Some("maintenance window"));
        assert_eq!(r.by.as_deref(), Some("ops"));
    }

    #[test]
    fn non_blue_ignores_disable_info() {
        let extra = "<DisableText>stale</DisableText><DisabledBy>ops</DisabledBy>";
        let xml = board(&[server_status("web1", "http", "green", extra)]);
        let r = &parse_feed(&xml, BASE).unwrap()[0];
        assert!(r.disabled.is_none() && r.by.is_none());
    }

    #[test]
    fn blue_without_disable_text_is_malformed() {
        let xml = board(&[server_status("web1", "http", "blue", "<DisabledBy>ops</DisabledBy>")]);
        assert!(matches!(parse_feed(&xml, BASE), Err(ParseError::MissingField("DisableText"))));
    }

    #[test]
    fn missing_field_and_bad_number() {
        let xml = "<StatusBoard><ServerStatus><Servername>a</Servername></ServerStatus></StatusBoard>";
        assert!(matches!(parse_feed(xml, BASE), Err(ParseError::MissingField(_))));
        let xml = board(&[server_status("a", "b", "green", "")]).replace("<LogTime>100", "<LogTime>soon");
        assert!(matches!(parse_feed(&xml, BASE), Err(ParseError::BadNumber { field: "LogTime", .. })));
    }

    #[test]
    fn latin1_declaration_is_honoured() {
        let body = b"<?xml version='1.0' encoding='ISO-8859-1'?><StatusBoard/>temp 21\xB0C";
        assert!(decode_feed(body, None).ends_with("temp 21\u{b0}C"));
        assert!(decode_feed(b"<a>21\xB0C</a>", Some("iso-8859-1")).contains("21\u{b0}C"));
    }

    #[test]
    fn utf8_stays_utf8() {
        let body = "<?xml version=\"1.0\" encoding=\"UTF-8\"?><a>21\u{b0}C</a>".as_bytes();
        assert!(decode_feed(body, Some("ISO-8859-1")).contains("21\u{b0}C"));
        assert!(decode_feed("<a>\u{b0}</a>".as_bytes(), None).contains('\u{b0}'));
    }

    #[test]
    fn charset_from_content_type() {
        assert_eq!(charset_param("text/xml; charset=\"ISO-8859-1\""), Some("ISO-8859-1"));
        assert_eq!(charset_param("text/xml"), None);
    }

    #[test]
    fn invalid_xml() {
        assert!(matches!(parse_feed("not xml", BASE), Err(ParseError::Xml(_))));
    }

    #[test]
    fn empty_board_has_no_records() {
        assert!(parse_feed("<StatusBoard/>", BASE).unwrap().is_empty());
    }

    #[test]
    fn collection_groups_by_host_then_test() {
        let xml = board(&[
            server_status("web1", "cpu", "green", ""),
            server_status("web1", "disk", "yellow", ""),
            server_status("db1", "conn", "red", ""),
        ]);
        let c = StatusCollection::from_records(parse_feed(&xml, BASE).unwrap());
        assert_eq!(c.len(), 3);
        assert_eq!(c.hosts().collect::<Vec<_>>(), vec!["db1", "web1"]);
        assert_eq!(c.host("web1").unwrap().len(), 2);
        assert_eq!(c.get("db1", "conn").unwrap().status, "red");
        assert!(c.get("db1", "cpu").is_none());
    }

    #[test]
    fn placeholder_defaults_keys() {
        let c = StatusCollection::placeholder(None, Some("cpu"), "unknown", "x");
        assert_eq!(c.len(), 1);
        let r = c.get("nohost", "cpu").unwrap();
        assert_eq!((r.status.as_str(), r.summary.as_str()), ("unknown", "x"));
        assert!(r.url.is_none() && r.time.is_none());
    }

    #[test]
    fn serializes_as_nested_map() {
        let c = StatusCollection::placeholder(Some("web1"), Some("cpu"), "unmonitored", "no data for web1.cpu");
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"web1": {"cpu": {"status": "unmonitored", "summary": "no data for web1.cpu"}}})
        );
    }
}
