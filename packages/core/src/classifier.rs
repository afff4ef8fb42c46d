//! Turns the captured streams of a build+run into a [`BuildResult`].
//!
//! The build tool prints its own progress and the program's output on the
//! same stdout. Everything after the final linking line belongs to the
//! program. Stderr decides success: anything there is fatal unless it
//! mentions `warning:` somewhere (case-insensitive). That is a substring
//! test, so a real error whose text happens to contain `warning:` is
//! reported as a warning.

use crate::models::BuildResult;

/// Line prefix the build tool prints right before running the executable.
pub const LINKING_MARKER: &str = "[2 of 2] Linking";

/// Case-insensitive token that downgrades stderr to warnings.
pub const WARNING_MARKER: &str = "warning:";

pub fn classify(stdout: &str, stderr: &str) -> BuildResult {
    if is_fatal(stderr) {
        return BuildResult {
            success: false,
            output: stdout.to_string(),
            full_output: None,
            warnings: None,
            error: Some(stderr.to_string()),
        };
    }

    BuildResult {
        success: true,
        output: program_output(stdout),
        full_output: Some(stdout.to_string()),
        warnings: Some(stderr.to_string()),
        error: None,
    }
}

pub fn is_fatal(stderr: &str) -> bool {
    !stderr.is_empty() && !stderr.to_lowercase().contains(WARNING_MARKER)
}

/// Lines after the last linking marker, trimmed. Without a marker the whole
/// of stdout is taken to be program output.
pub fn program_output(stdout: &str) -> String {
    let lines: Vec<&str> = stdout.split('\n').collect();
    let start = lines
        .iter()
        .rposition(|line| line.starts_with(LINKING_MARKER))
        .map_or(0, |index| index + 1);

    lines[start..].join("\n").trim().to_string()
}
