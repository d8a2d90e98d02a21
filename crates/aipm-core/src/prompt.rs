use crate::error::{AipmError, Result};
use std::io::{BufRead, Write};

/// Line-oriented question/answer channel used by interactive answer sources.
///
/// Implementors supply [`Prompter::read_line`] and [`Prompter::say`]; the
/// question helpers are built on top of them.
pub trait Prompter {
    /// Show `question` and read one line without its terminator.
    /// `None` means input is closed.
    fn read_line(&mut self, question: &str) -> Result<Option<String>>;

    fn say(&mut self, message: &str) -> Result<()>;

    /// Free-text answer; blank or closed input yields `default`.
    fn ask(&mut self, question: &str, default: &str) -> Result<String> {
        let label = if default.is_empty() {
            question.to_string()
        } else {
            format!("{question} [{default}]")
        };
        match self.read_line(&label)? {
            Some(line) if !line.trim().is_empty() => Ok(line.trim().to_string()),
            _ => Ok(default.to_string()),
        }
    }

    /// Re-asks until a non-blank answer arrives.
    fn ask_required(&mut self, question: &str) -> Result<String> {
        loop {
            match self.read_line(question)? {
                None => return Err(AipmError::InputClosed(question.to_string())),
                Some(line) if line.trim().is_empty() => self.say("  a value is required")?,
                Some(line) => return Ok(line.trim().to_string()),
            }
        }
    }

    /// Collect entries until a blank line or closed input.
    fn ask_list(&mut self, question: &str) -> Result<Vec<String>> {
        self.say(&format!("{question} (blank line to finish):"))?;
        let mut items = Vec::new();
        while let Some(line) = self.read_line("  -")? {
            let line = line.trim();
            if line.is_empty() {
                break;
            }
            items.push(line.to_string());
        }
        Ok(items)
    }

    /// Yes/no question. Blank or closed input yields `default`.
    fn confirm(&mut self, question: &str, default: bool) -> Result<bool> {
        let hint = if default { "[Y/n]" } else { "[y/N]" };
        loop {
            let Some(line) = self.read_line(&format!("{question} {hint}"))? else {
                return Ok(default);
            };
            match line.trim().to_lowercase().as_str() {
                "" => return Ok(default),
                "y" | "yes" => return Ok(true),
                "n" | "no" => return Ok(false),
                _ => self.say("  please answer y or n")?,
            }
        }
    }

    /// Pick one of `options` by number or name. Blank yields `default`.
    fn choose(&mut self, question: &str, options: &[&str], default: &str) -> Result<String> {
        let listing = options
            .iter()
            .enumerate()
            .map(|(i, o)| format!("{}) {o}", i + 1))
            .collect::<Vec<_>>()
            .join("  ");
        self.say(&format!("{question}: {listing}"))?;
        loop {
            let Some(line) = self.read_line(&format!("choice [{default}]"))? else {
                return Ok(default.to_string());
            };
            let line = line.trim();
            if line.is_empty() {
                return Ok(default.to_string());
            }
            if let Ok(n) = line.parse::<usize>() {
                if let Some(option) = n.checked_sub(1).and_then(|i| options.get(i)) {
                    return Ok(option.to_string());
                }
            } else if let Some(option) = options.iter().find(|o| o.eq_ignore_ascii_case(line)) {
                return Ok(option.to_string());
            }
            self.say(&format!("  choose 1-{}", options.len()))?;
        }
    }
}

// ---------------------------------------------------------------------------
// IoPrompter
// ---------------------------------------------------------------------------

/// [`Prompter`] over any reader/writer pair (stdin/stderr in the binary,
/// in-memory buffers in tests).
pub struct IoPrompter<R, W> {
    reader: R,
    writer: W,
}

impl<R: BufRead, W: Write> IoPrompter<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    pub fn into_writer(self) -> W {
        self.writer
    }
}

impl<R: BufRead, W: Write> Prompter for IoPrompter<R, W> {
    fn read_line(&mut self, question: &str) -> Result<Option<String>> {
        write!(self.writer, "{question} ")?;
        self.writer.flush()?;
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let trimmed = line.trim_end_matches(['\n', '\r']).len();
        line.truncate(trimmed);
        Ok(Some(line))
    }

    fn say(&mut self, message: &str) -> Result<()> {
        writeln!(self.writer, "{message}")?;
        Ok(())
    }
}
