use xymon_core::Color;

/// Filter for an appfeed request. Unset fields match everything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedQuery {
    /// Host name or pattern.
    pub host: Option<String>,
    pub test: Option<String>,
    /// Page path as configured in hosts.cfg.
    pub page: Option<String>,
    /// Colors to include; empty means all of them.
    pub colors: Vec<Color>,
    /// Overrides the client's CGI prefix for this request.
    pub cgi_prefix: Option<String>,
    pub use_tls: bool,
}

impl Default for FeedQuery {
    fn default() -> Self {
        FeedQuery {
            host: None,
            test: None,
            page: None,
            colors: Vec::new(),
            cgi_prefix: None,
            use_tls: true,
        }
    }
}

impl FeedQuery {
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn test(mut self, test: impl Into<String>) -> Self {
        self.test = Some(test.into());
        self
    }

    pub fn page(mut self, page: impl Into<String>) -> Self {
        self.page = Some(page.into());
        self
    }

    pub fn colors(mut self, colors: &[Color]) -> Self {
        self.colors = colors.to_vec();
        self
    }

    pub fn cgi_prefix(mut self, cgi_prefix: impl Into<String>) -> Self {
        self.cgi_prefix = Some(cgi_prefix.into());
        self
    }

    pub fn use_tls(mut self, use_tls: bool) -> Self {
        self.use_tls = use_tls;
        self
    }

    /// Filter expression: `[page=P ][host=H ][test=T ]color=C1,C2,...`
    pub fn filter(&self) -> String {
        let colors = if self.colors.is_empty() { &Color::ALL[..] } else { &self.colors[..] };
        let mut parts = Vec::with_capacity(4);
        if let Some(p) = &self.page {
            parts.push(format!("page={}", p));
        }
        if let Some(h) = &self.host {
            parts.push(format!("host={}", h));
        }
        if let Some(t) = &self.test {
            parts.push(format!("test={}", t));
        }
        parts.push(format!("color={}", Color::join(colors)));
        parts.join(" ")
    }
}
