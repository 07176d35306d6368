use crate::config::Config;
use crate::language;
use crate::prompt::confirm_submission;
use crate::report::{offer_submission_page, parse_results, print_results};
use crate::session::{Session, SubmissionRequest, TransportError};
use anyhow::{Context, Result};
use clap::Args;
use reqwest::blocking::Response;
use reqwest::StatusCode;
use std::collections::HashSet;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Args)]
pub(crate) struct SubmitArgs {
    /// Files to submit
    #[arg(required = true)]
    files: Vec<PathBuf>,
    /// Which problem to submit to. Overrides default guess (first part of first filename)
    #[arg(short, long)]
    problem: Option<String>,
    /// Sets mainclass. Overrides default guess (first part of first filename)
    #[arg(short, long)]
    mainclass: Option<String>,
    /// Sets language. Overrides default guess (based on suffix of first filename)
    #[arg(short, long)]
    language: Option<String>,
    #[arg(short, long, hide = true)]
    tag: Option<String>,
    /// Force, no confirmation prompt before submission
    #[arg(short, long)]
    force: bool,
}

#[derive(Debug, Error)]
pub(crate) enum RequestError {
    #[error("Login connection failed")]
    LoginConnection(#[source] TransportError),
    #[error("Login failed.\n{}", login_rejection(.0))]
    LoginRejected(StatusCode),
    #[error("Submit connection failed")]
    SubmitConnection(#[source] TransportError),
    #[error("Submission failed.\n{}", submit_rejection(.0))]
    SubmitRejected(StatusCode),
}

fn login_rejection(status: &StatusCode) -> String {
    match *status {
        StatusCode::FORBIDDEN => "Incorrect username or password/token (403)".to_string(),
        StatusCode::NOT_FOUND => "Incorrect login URL (404)".to_string(),
        other => format!("Status code: {}", other.as_u16()),
    }
}

fn submit_rejection(status: &StatusCode) -> String {
    match *status {
        StatusCode::FORBIDDEN => "Access denied (403)".to_string(),
        StatusCode::NOT_FOUND => "Incorrect submit URL (404)".to_string(),
        other => format!("Status code: {}", other.as_u16()),
    }
}

pub(crate) fn submit(args: SubmitArgs, config: &Config) -> Result<()> {
    let request = build_request(
        args.problem,
        args.mainclass,
        args.language,
        args.tag,
        args.files,
        config,
    )?;

    let credentials = config.credentials()?;
    let login_url = config.get_url("loginurl", "login")?;
    let session = Session::new()?;
    let login_reply = session
        .login(&login_url, &credentials)
        .map_err(RequestError::LoginConnection)?;
    ensure_ok(&login_reply, RequestError::LoginRejected)?;

    let submit_url = config.get_url("submissionurl", "submit")?;

    let stdin = std::io::stdin();
    let mut input = stdin.lock();
    let mut output = std::io::stdout();
    if !args.force {
        confirm_submission(&mut input, &mut output, &request)?;
    }

    let response = match session.submit(&submit_url, &request) {
        Ok(response) => response,
        Err(err @ TransportError::ReadFile { .. }) => return Err(err.into()),
        Err(err) => return Err(RequestError::SubmitConnection(err).into()),
    };
    ensure_ok(&response, RequestError::SubmitRejected)?;
    let body = response
        .text()
        .context("Failed to read the submission response")?;

    print_results(&mut output, &parse_results(&body))?;

    let submissions_url = match config.get_url("submissionsurl", "submissions") {
        Ok(url) => url,
        Err(err) => {
            debug!("No submissions URL: {}", err);
            return Ok(());
        }
    };
    offer_submission_page(&mut input, &mut output, &body, &submissions_url, |url| {
        if let Err(err) = webbrowser::open(url) {
            warn!("Could not open {} in browser: {}", url, err);
        }
        Ok(())
    })?;
    Ok(())
}

/// Applies command line overrides on top of what the first file name suggests.
fn build_request(
    problem: Option<String>,
    mainclass: Option<String>,
    language: Option<String>,
    tag: Option<String>,
    files: Vec<PathBuf>,
    config: &Config,
) -> Result<SubmissionRequest> {
    let first_file = files.first().context("No files to submit")?;
    let guess = language::guess(first_file);
    let problem = problem.filter(|problem| !problem.is_empty());
    let language = language.filter(|language| !language.is_empty());
    let language = language::resolve_language(language.as_deref(), &guess, config)?;

    Ok(SubmissionRequest {
        problem: problem.unwrap_or_else(|| guess.stem.clone()),
        language,
        mainclass: mainclass.or(guess.mainclass),
        tag,
        files: dedup_files(files),
    })
}

fn dedup_files(files: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    files
        .into_iter()
        .filter(|file| seen.insert(file.clone()))
        .collect()
}

fn ensure_ok(response: &Response, rejected: fn(StatusCode) -> RequestError) -> Result<()> {
    let status = response.status();
    if status != StatusCode::OK {
        return Err(rejected(status).into());
    }
    Ok(())
}
