use crate::session::SubmissionRequest;
use std::io::{self, BufRead, Write};
use thiserror::Error;

/// The user declined to go on.
#[derive(Debug, Error)]
#[error("Cancelling")]
pub(crate) struct Cancelled;

/// Asks `question` and reads one answer line. Only `y` or `Y`, surrounding
/// whitespace aside, counts as yes. End of input counts as no.
pub(crate) fn ask_yes_no<R, W>(input: &mut R, output: &mut W, question: &str) -> io::Result<bool>
where
    R: BufRead,
    W: Write,
{
    writeln!(output, "{} (y/N)?", question)?;
    output.flush()?;
    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(answer.trim().to_uppercase() == "Y")
}

/// Shows what is about to be submitted and waits for the user's go-ahead.
pub(crate) fn confirm_submission<R, W>(
    input: &mut R,
    output: &mut W,
    request: &SubmissionRequest,
) -> anyhow::Result<()>
where
    R: BufRead,
    W: Write,
{
    let files = request
        .files
        .iter()
        .map(|path| path.display().to_string())
        .collect::<Vec<_>>()
        .join(", ");
    writeln!(output, "Problem: {}", request.problem)?;
    writeln!(output, "Language: {}", request.language)?;
    writeln!(output, "Files: {}", files)?;
    if let Some(mainclass) = request.mainclass.as_deref().filter(|m| !m.is_empty()) {
        writeln!(output, "Mainclass: {}", mainclass)?;
    }
    if let Some(tag) = request.tag.as_deref().filter(|t| !t.is_empty()) {
        writeln!(output, "Tag: {}", tag)?;
    }

    if !ask_yes_no(input, output, "Submit")? {
        return Err(Cancelled.into());
    }
    Ok(())
}
