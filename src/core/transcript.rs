use crate::adapters::llm::{ChatRequest, Message};

pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are a helpful assistant that helps the user write a good git commit message.

The first message from the user is a summary of the git log, the second one is a summary of the staged git diff, and an optional third message is a hint for the commit message.

Take the whole conversation into account and suggest a single commit message. Reply with the proposed commit message and nothing else, and never apologize.

Requirements:
- Use the imperative mood
- One line only
- Be clear and concise
- Follow standard commit message conventions
- Do not wrap the message in quotes"#;

pub const LOG_PREFIX: &str = "The git log summary is:\n";
pub const DIFF_PREFIX: &str = "The git diff summary is:\n";

/// Conversation sent to the chat API. Always opens with one system message
/// followed by the log, the diff and (optionally) the hint as user messages.
#[derive(Debug, Clone, PartialEq)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new(system_prompt: &str, log: &str, diff: &str, hint: Option<&str>) -> Self {
        let mut messages = vec![
            Message::system(system_prompt),
            Message::user(format!("{LOG_PREFIX}{log}")),
            Message::user(format!("{DIFF_PREFIX}{diff}")),
        ];
        if let Some(hint) = hint {
            messages.push(Message::user(hint));
        }
        Self { messages }
    }

    /// Records every candidate of a round, not just the chosen one.
    pub fn push_candidates(&mut self, candidates: &[String]) {
        self.messages
            .extend(candidates.iter().map(|c| Message::assistant(c.as_str())));
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.messages.push(Message::user(content));
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn to_request(&self, choices: usize) -> ChatRequest {
        ChatRequest {
            messages: self.messages.clone(),
            choices,
        }
    }
}
