//! Blocking client for the Neocities HTTP API
//!
//! Every operation is one request/response exchange. The API wraps each
//! JSON body in an envelope with a `result` field; error bodies carry an
//! `error_type` and a human-readable `message`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, multipart};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::auth::Credentials;
use crate::error::{Error, Result};
use crate::listing::{Listing, RemoteEntry};

/// Base URL for the Neocities API.
pub const BASE_URL: &str = "https://neocities.org/api";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// File extensions the hosting service accepts on the free tier.
// https://github.com/neocities/neocities/blob/master/models/site.rb
pub const ALLOWED_EXTENSIONS: &[&str] = &[
    "html", "htm", "txt", "text", "css", "js", "jpg", "jpeg", "png", "gif", "svg", "md",
    "markdown", "eot", "ttf", "woff", "woff2", "json", "geojson", "csv", "tsv", "mf", "ico",
    "pdf", "asc", "key", "pgp", "xml", "mid", "midi", "manifest", "otf", "webapp", "less",
    "sass", "rss", "kml", "dae", "obj", "mtl", "scss", "webp", "xcf", "epub", "gltf", "bin",
    "webmanifest", "knowl", "atom", "opml", "rdf",
];

/// True when the hosting service will accept a file with this name.
#[must_use]
pub fn allowed_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| {
            ALLOWED_EXTENSIONS
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(extension))
        })
}

/// Site metadata returned by the info endpoint.
#[derive(Debug, Clone, serde::Serialize, Deserialize)]
pub struct SiteInfo {
    pub sitename: String,
    #[serde(default)]
    pub views: u64,
    #[serde(default)]
    pub hits: u64,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub last_updated: Option<String>,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub latest_ipfs_hash: Option<String>,
}

/// Blocking API client holding the HTTP client and resolved credentials.
pub struct NeocitiesApi {
    client: Client,
    base_url: String,
    credentials: Credentials,
}

impl NeocitiesApi {
    /// Create a client with the default 60 second timeout.
    ///
    /// # Errors
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(credentials: Credentials) -> Result<Self> {
        Self::with_timeout(credentials, DEFAULT_TIMEOUT)
    }

    /// Create a client with a custom per-request timeout.
    ///
    /// # Errors
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn with_timeout(credentials: Credentials, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: BASE_URL.to_string(),
            credentials,
        })
    }

    fn auth(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.credentials {
            Credentials::ApiKey(key) => request.bearer_auth(key),
            Credentials::Password { username, password } => {
                request.basic_auth(username, Some(password.as_str()))
            }
        }
    }

    fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = self.auth(request).send()?;
        let status = response.status().as_u16();
        let body = response.bytes()?;
        decode(status, &body)
    }

    fn execute_ok(&self, request: RequestBuilder) -> Result<()> {
        let response = self.auth(request).send()?;
        let status = response.status().as_u16();
        let body = response.bytes()?;
        check_envelope(status, &body)
    }

    /// Fetch the site's file list; with `path`, only entries beneath that
    /// remote path.
    ///
    /// # Errors
    /// Returns [`Error::Api`] on a non-success response.
    pub fn list(&self, path: Option<&str>) -> Result<Listing> {
        debug!("GET /list path={}", path.unwrap_or("/"));
        let mut request = self.client.get(format!("{}/list", self.base_url));
        if let Some(path) = path {
            request = request.query(&[("path", path)]);
        }
        let response: ListResponse = self.execute(request)?;
        Ok(Listing::new(response.files))
    }

    /// Fetch site metadata; with `sitename`, any site's public info instead
    /// of the authenticated one's.
    ///
    /// # Errors
    /// Returns [`Error::Api`] on a non-success response.
    pub fn info(&self, sitename: Option<&str>) -> Result<SiteInfo> {
        debug!("GET /info sitename={}", sitename.unwrap_or("<own>"));
        let mut request = self.client.get(format!("{}/info", self.base_url));
        if let Some(sitename) = sitename {
            request = request.query(&[("sitename", sitename)]);
        }
        let response: InfoResponse = self.execute(request)?;
        Ok(response.info)
    }

    /// Fetch the API key for the authenticated site, generating one if the
    /// site doesn't have one yet.
    ///
    /// # Errors
    /// Returns [`Error::Api`] on a non-success response.
    pub fn key(&self) -> Result<String> {
        debug!("GET /key");
        let response: KeyResponse = self.execute(self.client.get(format!("{}/key", self.base_url)))?;
        Ok(response.api_key)
    }

    /// Upload local files in one request. Each entry maps a local path to
    /// its slash-separated destination. An empty map is a no-op success.
    ///
    /// # Errors
    /// Returns [`Error::Filesystem`] if a local file cannot be read and
    /// [`Error::Api`] on a non-success response.
    pub fn upload(&self, file_map: &[(PathBuf, String)]) -> Result<()> {
        if file_map.is_empty() {
            return Ok(());
        }
        let mut form = multipart::Form::new();
        for (local, remote) in file_map {
            let data = std::fs::read(local).map_err(|source| Error::Filesystem {
                path: local.clone(),
                source,
            })?;
            debug!("{} -> {remote}", local.display());
            let file_name = local
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| remote.clone());
            // The part name is the destination path on the site.
            form = form.part(remote.clone(), multipart::Part::bytes(data).file_name(file_name));
        }
        let request = self
            .client
            .post(format!("{}/upload", self.base_url))
            .multipart(form);
        self.execute_ok(request)
    }

    /// Upload one in-memory file to `remote`.
    ///
    /// # Errors
    /// Returns [`Error::Api`] on a non-success response.
    pub fn upload_bytes(&self, remote: &str, data: Vec<u8>) -> Result<()> {
        debug!("<memory> -> {remote}");
        let file_name = remote.rsplit('/').next().unwrap_or(remote).to_string();
        let form = multipart::Form::new().part(
            remote.to_string(),
            multipart::Part::bytes(data).file_name(file_name),
        );
        let request = self
            .client
            .post(format!("{}/upload", self.base_url))
            .multipart(form);
        self.execute_ok(request)
    }

    /// Delete remote paths in one request. Directory paths are deleted
    /// recursively by the service itself. An empty slice is a no-op success.
    ///
    /// # Errors
    /// Returns [`Error::Api`] on a non-success response.
    pub fn delete(&self, paths: &[String]) -> Result<()> {
        if paths.is_empty() {
            return Ok(());
        }
        debug!("POST /delete ({} paths)", paths.len());
        let form: Vec<(&str, &str)> = paths
            .iter()
            .map(|path| ("filenames[]", path.as_str()))
            .collect();
        let request = self
            .client
            .post(format!("{}/delete", self.base_url))
            .form(&form);
        self.execute_ok(request)
    }

    /// Download one file's content from the public site.
    ///
    /// # Errors
    /// Returns [`Error::Api`] on a non-success response.
    pub fn download_file(&self, sitename: &str, path: &str) -> Result<Vec<u8>> {
        let url = format!("https://{sitename}.neocities.org/{path}");
        debug!("GET {url}");
        let response = self.client.get(&url).send()?;
        let status = response.status();
        let bytes = response.bytes()?;
        if !status.is_success() {
            return Err(Error::Api {
                status: status.as_u16(),
                kind: None,
                message: format!("failed to fetch {path}"),
            });
        }
        Ok(bytes.to_vec())
    }
}

/// Every API body, success or error, carries a `result` discriminator.
#[derive(Deserialize)]
struct Envelope {
    result: String,
    #[serde(default)]
    error_type: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Deserialize)]
struct ListResponse {
    files: Vec<RemoteEntry>,
}

#[derive(Deserialize)]
struct InfoResponse {
    info: SiteInfo,
}

#[derive(Debug, Deserialize)]
struct KeyResponse {
    api_key: String,
}

/// Validate the status and envelope of a response body.
fn check_envelope(status: u16, body: &[u8]) -> Result<()> {
    let envelope: Envelope = match serde_json::from_slice(body) {
        Ok(envelope) => envelope,
        Err(err) if (200..300).contains(&status) => {
            return Err(Error::Api {
                status,
                kind: None,
                message: format!("malformed response: {err}"),
            });
        }
        Err(_) => {
            return Err(Error::Api {
                status,
                kind: None,
                message: body_snippet(body),
            });
        }
    };
    if !(200..300).contains(&status) || envelope.result != "success" {
        return Err(Error::Api {
            status,
            kind: envelope.error_type,
            message: envelope
                .message
                .unwrap_or_else(|| "request failed".to_string()),
        });
    }
    Ok(())
}

/// Decode a response body after envelope validation.
fn decode<T: DeserializeOwned>(status: u16, body: &[u8]) -> Result<T> {
    check_envelope(status, body)?;
    serde_json::from_slice(body).map_err(|err| Error::Api {
        status,
        kind: None,
        message: format!("malformed response: {err}"),
    })
}

/// First line of a non-JSON body, truncated, for error messages.
fn body_snippet(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    let line = text.lines().next().unwrap_or("");
    let mut snippet: String = line.chars().take(120).collect();
    if snippet.is_empty() {
        snippet = "empty response body".to_string();
    }
    snippet
}
