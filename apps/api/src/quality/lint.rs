use std::sync::OnceLock;

use regex::Regex;

pub const EMPTY_RESUME: &str = "Resume text is empty.";
pub const EXCESSIVE_SPACING: &str = "Excessive spacing detected; normalize spacing for readability.";
pub const SHORT_LINES: &str = "Multiple short lines detected; ensure consistent bullet formatting.";

const SHORT_LINE_MAX_CHARS: usize = 80;
const SHORT_LINE_RUN: usize = 3;

static WHITESPACE_RUN: OnceLock<Regex> = OnceLock::new();

fn whitespace_run() -> &'static Regex {
    WHITESPACE_RUN.get_or_init(|| Regex::new(r"\s{3,}").expect("whitespace regex must compile"))
}

/// Formatting lint over raw resume text.
///
/// Empty input short-circuits with a single warning. The length warning is informational:
/// truncation has already happened upstream.
pub fn lint_resume(resume_text: &str, max_length: usize) -> Vec<String> {
    if resume_text.trim().is_empty() {
        return vec![EMPTY_RESUME.to_string()];
    }

    let mut issues = Vec::new();

    if resume_text.chars().count() > max_length {
        issues.push(format!(
            "Resume exceeds {max_length} characters; only the first {max_length} were analysed."
        ));
    }

    if whitespace_run().is_match(resume_text) {
        issues.push(EXCESSIVE_SPACING.to_string());
    }

    if has_short_line_run(resume_text) {
        issues.push(SHORT_LINES.to_string());
    }

    issues
}

/// True when at least three consecutive lines, the last one included, are each ≤ 80 chars.
fn has_short_line_run(text: &str) -> bool {
    let mut run = 0;
    for line in text.lines() {
        if line.chars().count() <= SHORT_LINE_MAX_CHARS {
            run += 1;
            if run >= SHORT_LINE_RUN {
                return true;
            }
        } else {
            run = 0;
        }
    }
    false
}
