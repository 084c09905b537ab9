//! Blocking HTTP transport.
//!
//! Issues one request per call against `http://host:port/<path>` and funnels
//! every outcome through the status classification in
//! [`ClientError::check_status`]. Operations above this layer never look at
//! raw status codes.

use serde_json::Value;

use crate::{config::ClientConfig, error::ClientError};

/// HTTP plumbing shared by all operations of one client.
///
/// The underlying connection pool is released when the transport drops;
/// individual responses are fully read or dropped on every path out of a
/// request, success or error.
pub(crate) struct Transport {
    http: reqwest::blocking::Client,
    base: String,
}

impl Transport {
    pub(crate) fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let base = format!("http://{}:{}", config.host, config.port);
        let http = reqwest::blocking::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ClientError::Transport { url: base.clone(), reason: e.to_string() })?;
        Ok(Self { http, base })
    }

    /// Absolute URL for a wire path, for error context.
    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base, path)
    }

    /// GET returning the response body parsed as JSON.
    pub(crate) fn get_json(&self, path: &str) -> Result<Value, ClientError> {
        let url = self.url(path);
        let response = self.send("GET", self.http.get(&url), &url)?;
        response.json().map_err(|e| ClientError::Protocol { url, reason: e.to_string() })
    }

    /// GET returning the raw response body.
    pub(crate) fn get_text(&self, path: &str) -> Result<String, ClientError> {
        let url = self.url(path);
        let response = self.send("GET", self.http.get(&url), &url)?;
        response.text().map_err(|e| ClientError::Transport { url, reason: e.to_string() })
    }

    /// PUT with a JSON body.
    pub(crate) fn put_json(&self, path: &str, body: &Value) -> Result<(), ClientError> {
        let url = self.url(path);
        self.send("PUT", self.http.put(&url).json(body), &url).map(drop)
    }

    /// PUT with a raw text body.
    pub(crate) fn put_text(&self, path: &str, body: &str) -> Result<(), ClientError> {
        let url = self.url(path);
        self.send("PUT", self.http.put(&url).body(body.to_string()), &url).map(drop)
    }

    /// DELETE with no body.
    pub(crate) fn delete(&self, path: &str) -> Result<(), ClientError> {
        let url = self.url(path);
        self.send("DELETE", self.http.delete(&url), &url).map(drop)
    }

    fn send(
        &self,
        method: &str,
        request: reqwest::blocking::RequestBuilder,
        url: &str,
    ) -> Result<reqwest::blocking::Response, ClientError> {
        let response = request
            .send()
            .map_err(|e| ClientError::Transport { url: url.to_string(), reason: e.to_string() })?;
        let status = response.status().as_u16();
        tracing::debug!("{} {} -> {}", method, url, status);
        ClientError::check_status(status, url)?;
        Ok(response)
    }
}
