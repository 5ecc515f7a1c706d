use serde::{Deserialize, Serialize};

/// Line that opens a new per-file segment in `git diff` output.
pub const DIFF_FILE_MARKER: &str = "diff --git";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TruncationLimits {
    #[serde(default = "default_log_lines")]
    pub log_lines: usize,

    #[serde(default = "default_diff_lines_per_file")]
    pub diff_lines_per_file: usize,

    #[serde(default = "default_diff_total_lines")]
    pub diff_total_lines: usize,
}

impl Default for TruncationLimits {
    fn default() -> Self {
        Self {
            log_lines: default_log_lines(),
            diff_lines_per_file: default_diff_lines_per_file(),
            diff_total_lines: default_diff_total_lines(),
        }
    }
}

fn default_log_lines() -> usize {
    10
}

fn default_diff_lines_per_file() -> usize {
    50
}

fn default_diff_total_lines() -> usize {
    500
}

/// Keeps the first `max_lines` lines of `log`, line endings untouched.
pub fn limit_log(log: &str, max_lines: usize) -> String {
    log.split_inclusive('\n').take(max_lines).collect()
}

/// Caps every file segment of a unified diff at `diff_lines_per_file` lines
/// (header included) and keeps whole segments while the accepted total stays
/// within `diff_total_lines`.
///
/// A segment is only judged once it is complete, i.e. when the next
/// `diff --git` header shows up or the input ends. Segments that would push
/// the total over budget are dropped entirely, including the last one.
pub fn limit_diff(diff: &str, limits: &TruncationLimits) -> String {
    let mut accepted: Vec<&str> = Vec::new();
    let mut segment: Vec<&str> = Vec::new();

    for line in diff.split('\n') {
        if line.starts_with(DIFF_FILE_MARKER) {
            flush_segment(&mut accepted, &segment, limits.diff_total_lines);
            segment.clear();
            segment.push(line);
        } else if segment.len() < limits.diff_lines_per_file {
            segment.push(line);
        }
    }
    flush_segment(&mut accepted, &segment, limits.diff_total_lines);

    accepted.join("\n")
}

fn flush_segment<'a>(accepted: &mut Vec<&'a str>, segment: &[&'a str], total_max: usize) {
    if accepted.len() + segment.len() <= total_max {
        accepted.extend_from_slice(segment);
    }
}
