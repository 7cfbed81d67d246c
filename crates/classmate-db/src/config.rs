/// Where the schedule store lives.
///
/// The CLI resolves the URL (flag, `CLASSMATE_DATABASE_URL`, config file,
/// [`DbConfig::DEFAULT_URL`]) and hands the result here.
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub database_url: String,
}

/// A connection URL split at the last `/` of its path.
struct UrlParts<'a> {
    server: &'a str,
    database: &'a str,
    query: Option<&'a str>,
}

impl DbConfig {
    pub const DEFAULT_URL: &str = "postgresql://localhost:5432/classmate";

    pub const ENV_VAR: &str = "CLASSMATE_DATABASE_URL";

    /// Database `db-init` creates on demand when it is missing.
    const ADMIN_DATABASE: &str = "postgres";

    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
        }
    }

    fn parts(&self) -> UrlParts<'_> {
        let (base, query) = match self.database_url.split_once('?') {
            Some((base, query)) => (base, Some(query)),
            None => (self.database_url.as_str(), None),
        };
        // Anything after "scheme://" without a further slash is host only.
        let authority_start = base.find("://").map_or(0, |i| i + 3);
        match base[authority_start..].rfind('/') {
            Some(pos) => {
                let split = authority_start + pos;
                UrlParts {
                    server: &base[..split],
                    database: &base[split + 1..],
                    query,
                }
            }
            None => UrlParts {
                server: base,
                database: "",
                query,
            },
        }
    }

    /// The target database, if the URL names one that can be created
    /// without quoting: ASCII lowercase letters, digits and `_`, not
    /// starting with a digit.
    pub fn database_name(&self) -> Option<&str> {
        let name = self.parts().database;
        let plain = name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
        let leading_digit = name.starts_with(|c: char| c.is_ascii_digit());
        (!name.is_empty() && plain && !leading_digit).then_some(name)
    }

    /// URL of the admin database on the same server. Connection options
    /// such as `sslmode` carry over.
    pub fn admin_url(&self) -> String {
        let parts = self.parts();
        let mut url = format!("{}/{}", parts.server, Self::ADMIN_DATABASE);
        if let Some(query) = parts.query {
            url.push('?');
            url.push_str(query);
        }
        url
    }

    /// The URL with any password replaced by `***`, for logs and errors.
    pub fn redacted_url(&self) -> String {
        let url = &self.database_url;
        let Some(scheme_end) = url.find("://").map(|i| i + 3) else {
            return url.clone();
        };
        let Some(at) = url[scheme_end..].find('@').map(|i| scheme_end + i) else {
            return url.clone();
        };
        match url[scheme_end..at].find(':') {
            Some(colon) => format!("{}:***{}", &url[..scheme_end + colon], &url[at..]),
            None => url.clone(),
        }
    }
}
