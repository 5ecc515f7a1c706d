use anyhow::{Context, Result};
use git2::{Repository, RepositoryOpenFlags};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tracing::{debug, warn};

/// Result of `git commit`; a failed commit is reported, never propagated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitStatus {
    Committed { output: String },
    Failed { detail: String },
}

pub trait Committer {
    fn commit(&self, message: &str) -> CommitStatus;
}

pub struct GitIntegration {
    workdir: PathBuf,
}

impl GitIntegration {
    pub fn new(repo_path: impl AsRef<Path>) -> Result<Self> {
        Self::open(repo_path, std::iter::empty::<&OsStr>())
    }

    /// Searches upwards from `repo_path` for a repository, never entering
    /// `ceiling_dirs`.
    fn open<I, O>(repo_path: impl AsRef<Path>, ceiling_dirs: I) -> Result<Self>
    where
        I: IntoIterator<Item = O>,
        O: AsRef<OsStr>,
    {
        let repo = Repository::open_ext(repo_path, RepositoryOpenFlags::empty(), ceiling_dirs)
            .context("Failed to find git repository")?;
        let workdir = repo
            .workdir()
            .context("Repository has no working directory (bare repository)")?
            .to_path_buf();
        debug!("Using repository at {}", workdir.display());
        Ok(Self { workdir })
    }

    /// Compact `git log` of at most `max_lines` commits. When git fails, for
    /// instance because there are no commits yet, its diagnostics are returned
    /// in place of the log.
    pub fn log_summary(&self, max_lines: usize) -> Result<String> {
        let output = self.git(&["log", "--oneline", "-n", &max_lines.to_string()])?;
        if output.status.success() {
            return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
        }

        let mut captured = String::from_utf8_lossy(&output.stdout).into_owned();
        captured.push_str(&String::from_utf8_lossy(&output.stderr));
        warn!("git log failed, using its output as the log summary");
        Ok(captured)
    }

    pub fn staged_diff(&self) -> Result<String> {
        let output = self.git(&["diff", "--cached"])?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("git diff --cached failed: {}", stderr.trim());
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn git(&self, args: &[&str]) -> Result<Output> {
        debug!("Running git {}", args.join(" "));
        Command::new("git")
            .args(args)
            .current_dir(&self.workdir)
            .output()
            .with_context(|| format!("Failed to run git {}", args.join(" ")))
    }
}

impl Committer for GitIntegration {
    fn commit(&self, message: &str) -> CommitStatus {
        let output = match self.git(&["commit", "-m", message]) {
            Ok(output) => output,
            Err(e) => {
                return CommitStatus::Failed {
                    detail: format!("{e:#}"),
                }
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if output.status.success() {
            return CommitStatus::Committed { output: stdout };
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let code = output
            .status
            .code()
            .map_or_else(|| "signal".to_string(), |c| c.to_string());
        let captured = [stderr, stdout]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("\n");
        CommitStatus::Failed {
            detail: format!("git commit exited with status {code}: {captured}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn init_repo() -> (tempfile::TempDir, Repository) {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        {
            let mut config = repo.config().unwrap();
            config.set_str("user.name", "Test User").unwrap();
            config.set_str("user.email", "test@example.com").unwrap();
            config.set_bool("commit.gpgsign", false).unwrap();
        }
        (dir, repo)
    }

    fn stage(repo: &Repository, name: &str, contents: &str) {
        let workdir = repo.workdir().unwrap();
        fs::write(workdir.join(name), contents).unwrap();
        let mut index = repo.index().unwrap();
        // git commit runs out of process; pick up its index changes first
        index.read(true).unwrap();
        index.add_path(Path::new(name)).unwrap();
        index.write().unwrap();
    }

    #[test]
    fn test_new_outside_repository_fails() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("not-a-repo");
        fs::create_dir(&nested).unwrap();

        let err = GitIntegration::open(&nested, [dir.path()])
            .err()
            .expect("no repository below the ceiling");
        assert!(err.to_string().contains("Failed to find git repository"));
    }

    #[test]
    fn test_new_finds_repository_from_subdirectory() {
        let (dir, _repo) = init_repo();
        let nested = dir.path().join("src");
        fs::create_dir(&nested).unwrap();

        assert!(GitIntegration::open(&nested, [dir.path().parent().unwrap()]).is_ok());
    }

    #[test]
    fn test_bare_repository_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        Repository::init_bare(dir.path()).unwrap();

        let err = GitIntegration::new(dir.path()).err().expect("bare repository");
        assert!(err.to_string().contains("bare repository"));
    }

    #[test]
    fn test_log_summary_without_commits_returns_diagnostics() {
        let (dir, _repo) = init_repo();
        let git = GitIntegration::new(dir.path()).unwrap();

        let log = git.log_summary(10).unwrap();
        assert!(!log.trim().is_empty());
        assert!(log.contains("fatal"), "unexpected log output: {log}");
    }

    #[test]
    fn test_staged_diff_contains_file_segment() {
        let (dir, repo) = init_repo();
        stage(&repo, "hello.txt", "hello\n");
        let git = GitIntegration::new(dir.path()).unwrap();

        let diff = git.staged_diff().unwrap();
        assert!(diff.starts_with("diff --git a/hello.txt b/hello.txt"));
        assert!(diff.contains("+hello"));
    }

    #[test]
    fn test_commit_then_log_shows_message() {
        let (dir, repo) = init_repo();
        stage(&repo, "hello.txt", "hello\n");
        let git = GitIntegration::new(dir.path()).unwrap();

        let status = git.commit("Add hello file");
        assert!(matches!(status, CommitStatus::Committed { .. }), "{status:?}");

        let log = git.log_summary(10).unwrap();
        assert_eq!(log.lines().count(), 1);
        assert!(log.trim_end().ends_with("Add hello file"));
        assert!(git.staged_diff().unwrap().is_empty());
    }

    #[test]
    fn test_commit_with_nothing_staged_reports_failure() {
        let (dir, _repo) = init_repo();
        let git = GitIntegration::new(dir.path()).unwrap();

        match git.commit("Empty") {
            CommitStatus::Failed { detail } => {
                assert!(detail.starts_with("git commit exited with status"))
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn test_log_summary_is_capped_by_git() {
        let (dir, repo) = init_repo();
        let git = GitIntegration::new(dir.path()).unwrap();
        for i in 0..3 {
            stage(&repo, "counter.txt", &i.to_string());
            assert!(matches!(
                git.commit(&format!("Bump counter to {i}")),
                CommitStatus::Committed { .. }
            ));
        }

        let log = git.log_summary(2).unwrap();
        assert_eq!(log.lines().count(), 2);
        assert!(log.lines().next().unwrap().ends_with("Bump counter to 2"));
    }
}
