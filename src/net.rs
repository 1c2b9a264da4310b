//! Requests, responses and the origin the app loads its assets from.
//!
//! The origin is either an HTTP base URL or a local directory served like a
//! static site. Both sit behind [`Fetch`], which the cache worker handle also
//! implements, so callers never know whether a response came from the cache.

use std::{
    fmt, fs, io,
    path::{Component, Path, PathBuf},
};

use reqwest::{blocking::Client, header, Url};
use tracing::trace;

use crate::error::{ConfigError, FetchError};

/// `Accept` value sent for page documents.
pub const HTML_ACCEPT: &str = "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Asset path relative to the origin, e.g. `./tickets.json`.
    pub url: String,
    pub accept: Option<String>,
}

impl Request {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            accept: None,
        }
    }

    /// A navigation request, the kind that may fall back to the offline shell.
    pub fn document(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            accept: Some(HTML_ACCEPT.into()),
        }
    }

    pub fn with_accept(mut self, accept: impl Into<String>) -> Self {
        self.accept = Some(accept.into());
        self
    }

    pub fn accepts_html(&self) -> bool {
        self.accept
            .as_deref()
            .is_some_and(|a| a.contains("text/html"))
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.status)
            .field("content_type", &self.content_type)
            .field("body_len", &self.body.len())
            .finish()
    }
}

impl Response {
    pub fn new(status: u16, content_type: Option<String>, body: Vec<u8>) -> Self {
        Self {
            status,
            content_type,
            body,
        }
    }

    /// 2xx.
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Anything that turns a [`Request`] into a [`Response`].
pub trait Fetch {
    fn fetch(&self, req: &Request) -> Result<Response, FetchError>;
}

impl<F: Fetch + ?Sized> Fetch for Box<F> {
    fn fetch(&self, req: &Request) -> Result<Response, FetchError> {
        (**self).fetch(req)
    }
}

/// Where assets live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    Http(Url),
    Dir(PathBuf),
}

impl Origin {
    /// `http://` and `https://` values are URLs, everything else a directory.
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        if s.starts_with("http://") || s.starts_with("https://") {
            let mut url =
                Url::parse(s).map_err(|e| ConfigError::Invalid(format!("origin {s}: {e}")))?;
            // joins are relative to the last path segment
            if !url.path().ends_with('/') {
                let path = format!("{}/", url.path());
                url.set_path(&path);
            }
            Ok(Self::Http(url))
        } else {
            Ok(Self::Dir(PathBuf::from(s)))
        }
    }

    /// Builds a live network client for this origin.
    pub fn connect(&self) -> Result<Box<dyn Fetch + Send>, FetchError> {
        let net: Box<dyn Fetch + Send> = match self {
            Self::Http(base) => Box::new(HttpNetwork::new(base.clone())?),
            Self::Dir(root) => Box::new(DirNetwork::new(root.clone())),
        };
        Ok(net)
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(url) => write!(f, "{url}"),
            Self::Dir(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Blocking HTTP client rooted at a base URL.
#[derive(Debug)]
pub struct HttpNetwork {
    client: Client,
    base: Url,
}

impl HttpNetwork {
    pub fn new(base: Url) -> Result<Self, FetchError> {
        let client = Client::builder()
            .build()
            .map_err(|e| FetchError::Network {
                url: base.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self { client, base })
    }
}

impl Fetch for HttpNetwork {
    fn fetch(&self, req: &Request) -> Result<Response, FetchError> {
        let network = |reason: String| FetchError::Network {
            url: req.url.clone(),
            reason,
        };
        let url = self.base.join(&req.url).map_err(|e| network(e.to_string()))?;
        trace!(%url, "http fetch");
        let mut builder = self.client.get(url);
        if let Some(accept) = &req.accept {
            builder = builder.header(header::ACCEPT, accept);
        }
        let resp = builder.send().map_err(|e| network(e.to_string()))?;
        let status = resp.status().as_u16();
        let content_type = resp
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = resp.bytes().map_err(|e| network(e.to_string()))?.to_vec();
        Ok(Response::new(status, content_type, body))
    }
}

/// Serves files below a directory the way a static web server would.
///
/// A missing root behaves like an unreachable host; a missing file is a 404.
#[derive(Debug, Clone)]
pub struct DirNetwork {
    root: PathBuf,
}

impl DirNetwork {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, url: &str) -> Option<PathBuf> {
        let path = url.split(&['?', '#'][..]).next().unwrap_or_default();
        let rel = Path::new(path.trim_start_matches('/'));
        let mut out = self.root.clone();
        for c in rel.components() {
            match c {
                Component::Normal(part) => out.push(part),
                Component::CurDir => {}
                _ => return None,
            }
        }
        if out == self.root || path.ends_with('/') {
            out.push("index.html");
        }
        Some(out)
    }
}

impl Fetch for DirNetwork {
    fn fetch(&self, req: &Request) -> Result<Response, FetchError> {
        if !self.root.is_dir() {
            return Err(FetchError::Network {
                url: req.url.clone(),
                reason: format!("{} is not reachable", self.root.display()),
            });
        }
        let Some(path) = self.resolve(&req.url) else {
            return Ok(Response::new(403, None, Vec::new()));
        };
        match fs::read(&path) {
            Ok(body) => Ok(Response::new(200, content_type_for(&path), body)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Response::new(404, None, Vec::new())),
            Err(e) => Err(FetchError::Network {
                url: req.url.clone(),
                reason: e.to_string(),
            }),
        }
    }
}

fn content_type_for(path: &Path) -> Option<String> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let ct = match ext.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css",
        "js" => "text/javascript",
        "json" => "application/json",
        "png" => "image/png",
        "svg" => "image/svg+xml",
        _ => "application/octet-stream",
    };
    Some(ct.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accept_header_detection() {
        assert!(Request::document("./").accepts_html());
        assert!(!Request::get("./app.js").accepts_html());
        assert!(!Request::get("./a").with_accept("application/json").accepts_html());
    }

    #[test]
    fn origin_parsing() {
        let o = Origin::parse("https://example.org/cards").unwrap();
        assert_eq!(o, Origin::Http(Url::parse("https://example.org/cards/").unwrap()));
        assert_eq!(Origin::parse("site").unwrap(), Origin::Dir(PathBuf::from("site")));
        assert!(Origin::parse("http://").is_err());
    }

    #[test]
    fn dir_network_serves_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("index.html"), "<html></html>").unwrap();
        fs::write(dir.path().join("tickets.json"), "[]").unwrap();
        let net = DirNetwork::new(dir.path());

        let r = net.fetch(&Request::get("./tickets.json")).unwrap();
        assert!(r.ok());
        assert_eq!(r.body, b"[]");
        assert_eq!(r.content_type.as_deref(), Some("application/json"));

        let r = net.fetch(&Request::get("./")).unwrap();
        assert_eq!(r.body, b"<html></html>");

        assert_eq!(net.fetch(&Request::get("./missing.css")).unwrap().status, 404);
        assert_eq!(net.fetch(&Request::get("../etc/passwd")).unwrap().status, 403);
    }

    #[test]
    fn missing_root_is_offline() {
        let dir = tempfile::tempdir().unwrap();
        let net = DirNetwork::new(dir.path().join("gone"));
        assert!(matches!(
            net.fetch(&Request::get("./tickets.json")),
            Err(FetchError::Network { .. })
        ));
    }
}
