use crate::config::Credentials;
use anyhow::{Context, Result};
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::{Client, RequestBuilder, Response};
use retry::delay::Fixed;
use retry::OperationResult;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

pub(crate) const USER_AGENT: &str = "iic1103-cli-submit";

const CONNECT_ATTEMPTS: usize = 5;
const CONNECT_RETRY_INTERVAL_MS: u64 = 200;
const SOURCE_MIME_TYPE: &str = "application/octet-stream";

#[derive(Debug, Error)]
pub(crate) enum TransportError {
    #[error(transparent)]
    Request(#[from] reqwest::Error),
    #[error("{0}")]
    Retry(String),
    #[error("Failed to read file: {}", path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Everything the judge needs to accept a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SubmissionRequest {
    pub(crate) problem: String,
    pub(crate) language: String,
    pub(crate) mainclass: Option<String>,
    pub(crate) tag: Option<String>,
    pub(crate) files: Vec<PathBuf>,
}

struct SourceFile {
    name: String,
    contents: Vec<u8>,
}

/// One HTTP session per run. The login cookies live in the client's cookie
/// store, so the submission is sent as the logged in user.
pub(crate) struct Session {
    client: Client,
}

impl Session {
    pub(crate) fn new() -> Result<Self> {
        let client = Client::builder()
            .cookie_store(true)
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Session { client })
    }

    /// Posts the credentials to `login_url`. Any HTTP status is returned as is.
    pub(crate) fn login(
        &self,
        login_url: &Url,
        credentials: &Credentials,
    ) -> Result<Response, TransportError> {
        let mut fields = vec![("user", credentials.username.as_str()), ("script", "true")];
        if let Some(password) = &credentials.password {
            fields.push(("password", password.as_str()));
        }
        if let Some(token) = &credentials.token {
            fields.push(("token", token.as_str()));
        }

        debug!("Logging in as {} at {}", credentials.username, login_url);
        self.send_with_retry(|| Ok(self.client.post(login_url.clone()).form(&fields)))
    }

    /// Uploads the request's files to `submit_url`. Every file is read before
    /// anything is sent.
    pub(crate) fn submit(
        &self,
        submit_url: &Url,
        request: &SubmissionRequest,
    ) -> Result<Response, TransportError> {
        let sources = request
            .files
            .iter()
            .map(|path| read_source(path))
            .collect::<Result<Vec<_>, _>>()?;

        debug!("Submitting {} file(s) to {}", sources.len(), submit_url);
        self.send_with_retry(|| {
            Ok(self
                .client
                .post(submit_url.clone())
                .header("problem", request.problem.as_str())
                .multipart(build_form(request, &sources)?))
        })
    }

    /// Retries only while the connection cannot be set up.
    fn send_with_retry<F>(&self, build: F) -> Result<Response, TransportError>
    where
        F: Fn() -> reqwest::Result<RequestBuilder>,
    {
        let delays = Fixed::from_millis(CONNECT_RETRY_INTERVAL_MS).take(CONNECT_ATTEMPTS - 1);
        retry::retry(delays, || match build().and_then(RequestBuilder::send) {
            Ok(response) => OperationResult::Ok(response),
            Err(err) if err.is_connect() => {
                warn!("Connection failed: {}", err);
                OperationResult::Retry(err)
            }
            Err(err) => OperationResult::Err(err),
        })
        .map_err(|err| match err {
            retry::Error::Operation { error, .. } => TransportError::Request(error),
            retry::Error::Internal(message) => TransportError::Retry(message),
        })
    }
}

fn read_source(path: &Path) -> Result<SourceFile, TransportError> {
    let contents = std::fs::read(path).map_err(|source| TransportError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(SourceFile { name, contents })
}

fn build_form(request: &SubmissionRequest, sources: &[SourceFile]) -> reqwest::Result<Form> {
    let mut form = Form::new()
        .text("submit", "true")
        .text("submit_ctr", "2")
        .text("language", request.language.clone())
        .text("mainclass", request.mainclass.clone().unwrap_or_default())
        .text("problem", request.problem.clone())
        .text("tag", request.tag.clone().unwrap_or_default())
        .text("script", "true");
    for source in sources {
        let part = Part::bytes(source.contents.clone())
            .file_name(source.name.clone())
            .mime_str(SOURCE_MIME_TYPE)?;
        form = form.part("sub_file[]", part);
    }
    Ok(form)
}
