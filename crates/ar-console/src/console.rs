//! Line-oriented request console.
//!
//! One request per line, one pretty-printed JSON reply per request.
//! `feedback <handler_id> <yes|no> <request> [-- comment]` records explicit
//! feedback; `quit` or `exit` ends the session.

use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use ar_router::Router;

const FEEDBACK_USAGE: &str = "usage: feedback <handler_id> <yes|no> <request> [-- comment]";

/// One parsed console line.
#[derive(Debug, PartialEq, Eq)]
pub enum ConsoleInput<'a> {
    Empty,
    Quit,
    Feedback {
        handler_id: &'a str,
        was_helpful: bool,
        request: &'a str,
        comment: Option<&'a str>,
    },
    Request(&'a str),
}

pub fn parse_line(line: &str) -> Result<ConsoleInput<'_>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(ConsoleInput::Empty);
    }
    if line.eq_ignore_ascii_case("quit") || line.eq_ignore_ascii_case("exit") {
        return Ok(ConsoleInput::Quit);
    }

    let Some(rest) = line
        .strip_prefix("feedback ")
        .or_else(|| line.strip_prefix("feedback\t"))
    else {
        return Ok(ConsoleInput::Request(line));
    };

    let mut parts = rest.trim_start().splitn(3, char::is_whitespace);
    let handler_id = parts.next().unwrap_or_default();
    let verdict = parts.next().unwrap_or_default();
    let tail = parts.next().unwrap_or_default().trim();

    let was_helpful = match verdict.to_ascii_lowercase().as_str() {
        "yes" | "y" | "helpful" => true,
        "no" | "n" | "unhelpful" => false,
        _ => return Err(FEEDBACK_USAGE.into()),
    };

    let (request, comment) = match tail.split_once(" -- ") {
        Some((request, comment)) => (request.trim(), Some(comment.trim())),
        None => (tail, None),
    };
    if handler_id.is_empty() || request.is_empty() {
        return Err(FEEDBACK_USAGE.into());
    }

    Ok(ConsoleInput::Feedback {
        handler_id,
        was_helpful,
        request,
        comment: comment.filter(|c| !c.is_empty()),
    })
}

#[derive(Serialize)]
struct ErrorReply<'a> {
    error: &'a str,
}

/// Serve requests from `input` until EOF or `quit`.
pub async fn run<R, W>(router: &Router, input: R, mut output: W) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        let json = match parse_line(&line) {
            Ok(ConsoleInput::Empty) => continue,
            Ok(ConsoleInput::Quit) => break,
            Ok(ConsoleInput::Feedback {
                handler_id,
                was_helpful,
                request,
                comment,
            }) => {
                let ack = router
                    .submit_feedback(request, handler_id, was_helpful, comment.map(String::from))
                    .await;
                match ack {
                    Ok(ack) => serde_json::to_string_pretty(&ack)?,
                    Err(e) => error_json(&e.to_string())?,
                }
            }
            Ok(ConsoleInput::Request(text)) => {
                serde_json::to_string_pretty(&router.handle(text).await)?
            }
            Err(msg) => error_json(&msg)?,
        };
        output.write_all(json.as_bytes()).await?;
        output.write_all(b"\n").await?;
        output.flush().await?;
    }
    Ok(())
}

fn error_json(message: &str) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&ErrorReply { error: message })
}
