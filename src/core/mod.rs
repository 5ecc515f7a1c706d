pub mod completion;
pub mod git;
pub mod limiter;
pub mod session;
pub mod terminal;
pub mod transcript;

pub use completion::SessionError;
pub use git::{CommitStatus, GitIntegration};
pub use limiter::{limit_diff, limit_log};
pub use session::{Session, SessionOutcome};
pub use terminal::StdioPrompter;
pub use transcript::Transcript;
