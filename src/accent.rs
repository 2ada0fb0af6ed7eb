//! Stress-mark annotation for Russian text.
//!
//! The annotator model runs out of process and marks stressed vowels with a
//! leading `+` (`прив+ет`). This module feeds it the text and rewrites the
//! marks as U+0301 COMBINING ACUTE ACCENT (`приве́т`).

use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::error::AccentError;

const COMBINING_ACUTE: char = '\u{0301}';
const STRESS_MARK: char = '+';

fn is_russian_vowel(c: char) -> bool {
    "аеёиоуыэюяАЕЁИОУЫЭЮЯ".contains(c)
}

/// Replace every `+` that precedes a Russian vowel with an acute accent on that vowel.
///
/// `ё` is always stressed and is emitted without the combining mark. A `+`
/// before anything else is kept as-is.
pub fn plus_marks_to_unicode(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 4);
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c != STRESS_MARK {
            out.push(c);
            continue;
        }
        match chars.peek().copied() {
            Some(vowel) if is_russian_vowel(vowel) => {
                chars.next();
                out.push(vowel);
                if !matches!(vowel, 'ё' | 'Ё') {
                    out.push(COMBINING_ACUTE);
                }
            }
            _ => out.push(c),
        }
    }
    out
}

/// Join CLI words, or fall back to the whole of stdin.
pub fn input_text(args: &[String], stdin: impl FnOnce() -> std::io::Result<String>) -> Result<String, AccentError> {
    let text = if args.is_empty() {
        stdin()?.trim().to_string()
    } else {
        args.join(" ")
    };

    if text.trim().is_empty() {
        return Err(AccentError::EmptyInput);
    }
    Ok(text)
}

/// Runs the external annotator: text on stdin, `+`-marked text on stdout.
#[derive(Debug, Clone)]
pub struct Accentizer {
    command: PathBuf,
    args: Vec<String>,
}

impl Accentizer {
    pub fn new(command: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
        }
    }

    /// Raw annotator output, with `+` marks.
    pub async fn annotate(&self, text: &str) -> Result<String, AccentError> {
        let mut child = Command::new(&self.command)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| AccentError::Spawn {
                command: self.command.display().to_string(),
                source,
            })?;

        // Stdin is fed concurrently with reading stdout so neither pipe can fill up.
        let stdin = child.stdin.take();
        let feed = async move {
            if let Some(mut stdin) = stdin {
                // An annotator that exits early closes the pipe; its exit status tells the story.
                if let Err(e) = stdin.write_all(text.as_bytes()).await
                    && e.kind() != ErrorKind::BrokenPipe
                {
                    return Err(e);
                }
                // Dropping stdin signals end of input.
            }
            Ok(())
        };
        let (fed, output) = tokio::join!(feed, child.wait_with_output());
        let output = output?;
        fed?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(AccentError::Annotator(if stderr.is_empty() {
                output.status.to_string()
            } else {
                stderr
            }));
        }

        let stdout = String::from_utf8(output.stdout).map_err(|_| AccentError::InvalidOutput)?;
        Ok(stdout.trim_end_matches(['\n', '\r']).to_string())
    }

    /// Annotated text with Unicode stress marks.
    pub async fn accentuate(&self, text: &str) -> Result<String, AccentError> {
        let marked = self.annotate(text).await?;
        tracing::debug!(input = text, annotated = %marked, "Annotator finished");
        Ok(plus_marks_to_unicode(&marked))
    }
}
