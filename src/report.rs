use crate::prompt::ask_yes_no;
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::{self, BufRead, Write};
use url::Url;

pub(crate) const DIVIDER: &str = "+-----------------------------+";

static RESULT_LIST: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\[(.*?)\]").unwrap());
static SUBMISSION_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"Submission ID: (\d+)").unwrap());

/// Turns the judge's `["AC", " WA"]` style list into bare tokens. Bodies
/// without a list are shown line by line.
pub(crate) fn parse_results(body: &str) -> Vec<String> {
    match RESULT_LIST.captures(body) {
        Some(captures) => captures[1]
            .split(',')
            .map(|token| {
                token
                    .replace(['"', '[', ']'], "")
                    .trim()
                    .to_string()
            })
            .filter(|token| !token.is_empty())
            .collect(),
        None => plain_text(body)
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect(),
    }
}

pub(crate) fn print_results<W: Write>(output: &mut W, results: &[String]) -> io::Result<()> {
    writeln!(output, "{}", DIVIDER)?;
    for result in results {
        writeln!(output, "{}", result)?;
    }
    writeln!(output, "{}", DIVIDER)
}

pub(crate) fn plain_text(body: &str) -> String {
    body.replace("<br />", "\n")
}

pub(crate) fn find_submission_id(text: &str) -> Option<&str> {
    SUBMISSION_ID
        .captures(text)
        .and_then(|captures| captures.get(1))
        .map(|id| id.as_str())
}

pub(crate) fn submission_url(submissions_url: &Url, submission_id: &str) -> String {
    format!(
        "{}/{}",
        submissions_url.as_str().trim_end_matches('/'),
        submission_id
    )
}

/// Offers to open the submission page when the body names a submission ID.
/// Returns the URL handed to `open`, if any.
pub(crate) fn offer_submission_page<R, W, F>(
    input: &mut R,
    output: &mut W,
    body: &str,
    submissions_url: &Url,
    open: F,
) -> io::Result<Option<String>>
where
    R: BufRead,
    W: Write,
    F: FnOnce(&str) -> io::Result<()>,
{
    let text = plain_text(body);
    let Some(submission_id) = find_submission_id(&text) else {
        return Ok(None);
    };
    writeln!(output, "Submission ID: {}", submission_id)?;
    if !ask_yes_no(input, output, "Open in browser")? {
        return Ok(None);
    }
    let url = submission_url(submissions_url, submission_id);
    open(&url)?;
    Ok(Some(url))
}
