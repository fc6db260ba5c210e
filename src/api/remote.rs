//! Purpose: Blocking HTTP client for the rpnstack JSON API.
//! Exports: `RemoteClient`, `CreatedStack`.
//! Role: Mirrors every registry operation over HTTP for the CLI and tests.
//! Invariants: Stack contents decode as top-first JSON arrays, unchanged.
//! Invariants: Error envelopes decode back into the same `ErrorKind`.
#![allow(clippy::result_large_err)]

use crate::core::error::{Error, ErrorKind, parse_error_kind};
use crate::core::op::unknown_operator;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

type ApiResult<T> = Result<T, Error>;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct RemoteClient {
    inner: Arc<RemoteClientInner>,
}

struct RemoteClientInner {
    base_url: Url,
    agent: ureq::Agent,
}

/// Result of `POST /stack`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CreatedStack {
    pub key: String,
    pub location: String,
    pub values: Vec<i64>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: RemoteError,
}

#[derive(Deserialize)]
struct RemoteError {
    kind: String,
    message: Option<String>,
    hint: Option<String>,
    stack: Option<String>,
    op: Option<String>,
}

impl RemoteClient {
    pub fn new(base_url: impl Into<String>) -> ApiResult<Self> {
        let base_url = normalize_base_url(base_url.into())?;
        let agent = ureq::AgentBuilder::new().timeout(REQUEST_TIMEOUT).build();
        Ok(Self {
            inner: Arc::new(RemoteClientInner { base_url, agent }),
        })
    }

    pub fn list_operators(&self) -> ApiResult<Vec<String>> {
        let url = build_url(&self.inner.base_url, &["op"])?;
        self.request_json("GET", &url)
    }

    pub fn list_stacks(&self) -> ApiResult<Vec<String>> {
        let url = build_url(&self.inner.base_url, &["stack"])?;
        self.request_json("GET", &url)
    }

    pub fn create_stack(&self) -> ApiResult<CreatedStack> {
        let url = build_url(&self.inner.base_url, &["stack"])?;
        let response = self.send("POST", &url)?;
        let location = response
            .header("Location")
            .map(str::to_string)
            .ok_or_else(|| {
                Error::new(ErrorKind::Internal).with_message("create response missing Location")
            })?;
        let key = key_from_location(&location)?;
        let values = read_json_response(response)?;
        Ok(CreatedStack {
            key,
            location,
            values,
        })
    }

    pub fn get_stack(&self, key: &str) -> ApiResult<Vec<i64>> {
        let url = build_url(&self.inner.base_url, &["stack", stack_segment(key)?])?;
        self.request_json("GET", &url)
            .map_err(|err| with_stack(err, key))
    }

    pub fn delete_stack(&self, key: &str) -> ApiResult<()> {
        let url = build_url(&self.inner.base_url, &["stack", stack_segment(key)?])?;
        self.send("DELETE", &url)
            .map_err(|err| with_stack(err, key))?;
        Ok(())
    }

    pub fn push(&self, key: &str) -> ApiResult<Vec<i64>> {
        let url = build_url(&self.inner.base_url, &["stack", stack_segment(key)?])?;
        self.request_json("POST", &url)
            .map_err(|err| with_stack(err, key))
    }

    pub fn clear(&self, key: &str) -> ApiResult<Vec<i64>> {
        let url = build_url(&self.inner.base_url, &["stack", stack_segment(key)?, "clear"])?;
        self.request_json("POST", &url)
            .map_err(|err| with_stack(err, key))
    }

    pub fn apply(&self, op: &str, key: &str) -> ApiResult<Vec<i64>> {
        let key = stack_segment(key)?;
        if is_dot_segment(op) {
            return Err(unknown_operator(op).with_stack(key));
        }
        let url = build_url(&self.inner.base_url, &["op", op, "stack", key])?;
        self.request_json("POST", &url)
            .map_err(|err| with_stack(err, key))
    }

    fn request_json<R>(&self, method: &str, url: &Url) -> ApiResult<R>
    where
        R: DeserializeOwned,
    {
        let response = self.send(method, url)?;
        read_json_response(response)
    }

    fn send(&self, method: &str, url: &Url) -> ApiResult<ureq::Response> {
        let response = self
            .inner
            .agent
            .request(method, url.as_str())
            .set("Accept", "application/json")
            .call();
        match response {
            Ok(resp) => Ok(resp),
            Err(ureq::Error::Status(code, resp)) => Err(parse_error_response(code, resp)),
            Err(ureq::Error::Transport(err)) => Err(Error::new(ErrorKind::Io)
                .with_message("request failed")
                .with_hint(format!("Is the server running at {}?", self.inner.base_url))
                .with_source(err)),
        }
    }
}

fn with_stack(err: Error, key: &str) -> Error {
    if err.stack().is_some() {
        err
    } else {
        err.with_stack(key)
    }
}

fn normalize_base_url(raw: String) -> ApiResult<Url> {
    let mut url = Url::parse(&raw).map_err(|err| {
        Error::new(ErrorKind::Usage)
            .with_message("invalid server base url")
            .with_source(err)
    })?;
    let scheme = url.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("server base url must use http or https scheme"));
    }
    if url.path() != "/" && !url.path().is_empty() {
        return Err(
            Error::new(ErrorKind::Usage).with_message("server base url must not include a path")
        );
    }
    url.set_path("/");
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

// `.` and `..` would be resolved away by `build_url`; no live key is either.
fn stack_segment(key: &str) -> ApiResult<&str> {
    if is_dot_segment(key) {
        return Err(Error::new(ErrorKind::NotFound)
            .with_message("stack not found")
            .with_stack(key));
    }
    Ok(key)
}

fn is_dot_segment(segment: &str) -> bool {
    matches!(segment, "." | "..")
}

// Segments are percent-encoded, so `/` as an operator travels as `%2F`.
// Dot segments are dropped by `url`, so callers must reject them first.
fn build_url(base_url: &Url, segments: &[&str]) -> ApiResult<Url> {
    let mut url = base_url.clone();
    {
        let mut path = url.path_segments_mut().map_err(|_| {
            Error::new(ErrorKind::Usage).with_message("server base url cannot be a base")
        })?;
        path.clear();
        for segment in segments {
            path.push(segment);
        }
    }
    Ok(url)
}

fn key_from_location(location: &str) -> ApiResult<String> {
    let key = location
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default();
    if key.is_empty() || !location.contains("/stack/") {
        return Err(Error::new(ErrorKind::Internal)
            .with_message(format!("unexpected Location header {location:?}")));
    }
    Ok(key.to_string())
}

fn read_json_response<R>(response: ureq::Response) -> ApiResult<R>
where
    R: DeserializeOwned,
{
    let body = response.into_string().map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("failed to read response body")
            .with_source(err)
    })?;
    serde_json::from_str(&body).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("invalid response json")
            .with_source(err)
    })
}

fn parse_error_response(status: u16, response: ureq::Response) -> Error {
    let body = response.into_string().unwrap_or_default();
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(&body) {
        return error_from_remote(envelope.error);
    }
    let kind = error_kind_from_status(status);
    Error::new(kind).with_message(format!("server error status {status}"))
}

fn error_from_remote(remote: RemoteError) -> Error {
    let mut err = Error::new(parse_error_kind(&remote.kind));
    if let Some(message) = remote.message {
        err = err.with_message(message);
    }
    if let Some(hint) = remote.hint {
        err = err.with_hint(hint);
    }
    if let Some(stack) = remote.stack {
        err = err.with_stack(stack);
    }
    if let Some(op) = remote.op {
        err = err.with_op(op);
    }
    err
}

fn error_kind_from_status(status: u16) -> ErrorKind {
    match status {
        400 | 405 | 413 => ErrorKind::Usage,
        404 => ErrorKind::NotFound,
        500..=599 => ErrorKind::Internal,
        _ => ErrorKind::Io,
    }
}
