use tracing::{debug, info};

use crate::adapters::llm::LLMAdapter;
use crate::core::completion::{request_completions, SessionError};
use crate::core::git::{CommitStatus, Committer};
use crate::core::terminal::Prompter;
use crate::core::transcript::Transcript;

/// What the user typed at the choice prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Zero-based index of the chosen candidate.
    Select(usize),
    Abort,
    Continue(String),
}

impl Decision {
    /// Numbers in `1..=choices` select, empty input aborts, anything else
    /// (including out-of-range numbers and whitespace) continues the
    /// conversation.
    pub fn parse(input: &str, choices: usize) -> Self {
        if input.is_empty() {
            return Self::Abort;
        }
        match input.trim().parse::<usize>() {
            Ok(n) if (1..=choices).contains(&n) => Self::Select(n - 1),
            _ => Self::Continue(input.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    Committed { message: String, status: CommitStatus },
    Aborted,
}

pub struct Session<'a> {
    adapter: &'a dyn LLMAdapter,
    prompter: &'a mut dyn Prompter,
    committer: &'a dyn Committer,
    transcript: Transcript,
    choices: usize,
}

impl<'a> Session<'a> {
    pub fn new(
        adapter: &'a dyn LLMAdapter,
        prompter: &'a mut dyn Prompter,
        committer: &'a dyn Committer,
        transcript: Transcript,
        choices: usize,
    ) -> Self {
        Self {
            adapter,
            prompter,
            committer,
            transcript,
            choices,
        }
    }

    #[cfg(test)]
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Runs rounds until the user commits or aborts.
    pub async fn run(&mut self) -> Result<SessionOutcome, SessionError> {
        let mut round = 1usize;
        loop {
            debug!("Round {} with {} messages", round, self.transcript.messages().len());
            let request = self.transcript.to_request(self.choices);
            let candidates = request_completions(self.adapter, &mut *self.prompter, &request).await?;
            self.transcript.push_candidates(&candidates);

            self.prompter.show(&render_candidates(&candidates))?;
            let input = self
                .prompter
                .ask(&choice_prompt(candidates.len()))?
                .ok_or(SessionError::Interrupted)?;

            match Decision::parse(&input, candidates.len()) {
                Decision::Select(index) => {
                    let message = candidates[index].clone();
                    self.prompter.show(&format!("\nYou selected: {message}\n\n"))?;
                    let status = self.commit(&message)?;
                    return Ok(SessionOutcome::Committed { message, status });
                }
                Decision::Abort => {
                    info!("Aborted without committing after {} rounds", round);
                    return Ok(SessionOutcome::Aborted);
                }
                Decision::Continue(text) => {
                    self.transcript.push_user(text);
                    round += 1;
                }
            }
        }
    }

    fn commit(&mut self, message: &str) -> Result<CommitStatus, SessionError> {
        let status = self.committer.commit(message);
        match &status {
            CommitStatus::Committed { output } => {
                if !output.is_empty() {
                    self.prompter.show(&format!("{output}\n"))?;
                }
                self.prompter.show("\nCommit successful.\n")?;
            }
            CommitStatus::Failed { detail } => {
                self.prompter.show(&format!("\nFailed to commit: {detail}\n"))?;
            }
        }
        Ok(status)
    }
}

pub fn render_candidates(candidates: &[String]) -> String {
    let mut out = String::from("\n");
    for (i, candidate) in candidates.iter().enumerate() {
        out.push_str(&format!("{}. {}\n", i + 1, candidate));
    }
    out.push('\n');
    out
}

pub fn choice_prompt(choices: usize) -> String {
    format!(
        "Choose an option (1-{choices}), type nothing to abort, anything else to continue chat:\n\n> "
    )
}
