use std::io::{self, BufRead, Write};

/// Line-oriented user interaction used by the session.
pub trait Prompter {
    /// Prints `text` as-is.
    fn show(&mut self, text: &str) -> io::Result<()>;

    /// Prints `prompt` and reads one line without its line terminator.
    /// `None` means input is exhausted.
    fn ask(&mut self, prompt: &str) -> io::Result<Option<String>>;
}

/// Prompter bound to the process stdin/stdout.
pub struct StdioPrompter<R, W> {
    input: R,
    output: W,
}

impl StdioPrompter<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> StdioPrompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl<R: BufRead, W: Write> Prompter for StdioPrompter<R, W> {
    fn show(&mut self, text: &str) -> io::Result<()> {
        self.output.write_all(text.as_bytes())?;
        self.output.flush()
    }

    fn ask(&mut self, prompt: &str) -> io::Result<Option<String>> {
        self.show(prompt)?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let trimmed_len = line.trim_end_matches(['\n', '\r']).len();
        line.truncate(trimmed_len);
        Ok(Some(line))
    }
}
