use super::session::Runner;
use anyhow::Result;
use console::style;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::io::Write;

const PROMPT: &str = ">>> User: ";

/// Source of user input lines.
pub trait LineReader {
    /// Next line without its newline, or `None` when input has ended.
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>>;

    /// Remember a submitted line for recall. No-op by default.
    fn add_history(&mut self, _line: &str) {}
}

/// Line editor on the controlling terminal.
pub struct TerminalReader {
    editor: DefaultEditor,
}

impl TerminalReader {
    pub fn new() -> Result<Self> {
        Ok(Self {
            editor: DefaultEditor::new()?,
        })
    }
}

impl LineReader for TerminalReader {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        // Blocking read; keep the runtime's other workers free
        let line = tokio::task::block_in_place(|| self.editor.readline(prompt));
        match line {
            Ok(line) => Ok(Some(line)),
            Err(ReadlineError::Eof | ReadlineError::Interrupted) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn add_history(&mut self, line: &str) {
        let _ = self.editor.add_history_entry(line);
    }
}

/// `quit` or `exit`, surrounding whitespace ignored, case-sensitive.
pub fn is_exit_command(line: &str) -> bool {
    matches!(line.trim(), "quit" | "exit")
}

/// Read lines and forward each one to the runner until the user quits.
///
/// A failed turn is reported on `out` and the loop keeps going.
pub async fn chat_loop<R, W>(
    runner: &Runner,
    user_id: &str,
    session_id: &str,
    reader: &mut R,
    out: &mut W,
) -> Result<()>
where
    R: LineReader + ?Sized,
    W: Write + ?Sized,
{
    writeln!(
        out,
        "{} (user: {user_id})",
        style(format!("{} ready", runner.agent().name())).bold().cyan()
    )?;
    writeln!(out, "Type 'quit' or 'exit' to end the session.\n")?;

    while let Some(line) = reader.read_line(PROMPT)? {
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if is_exit_command(input) {
            break;
        }
        reader.add_history(input);

        match runner.run(user_id, session_id, input).await {
            Ok(reply) => writeln!(out, "<<< Assistant: {reply}\n")?,
            Err(e) => {
                tracing::error!(user = user_id, session = session_id, error = %e, "Turn failed");
                writeln!(out, "{} {e:#}\n", style("Error:").red().bold())?;
            }
        }
        out.flush()?;
    }

    writeln!(out, "Ending session. Goodbye!")?;
    Ok(())
}
