//! Record parsing for the two text artifacts a Gatling run leaves behind.
//!
//! * [`transcript`] splits the aggregate console output into one block per simulation.
//! * [`event_log`] reads a per-simulation `simulation.log` into a [`PerformanceRun`].

pub mod event_log;
pub mod transcript;

pub use event_log::{classify_line, parse_event_log, LogLine, PerformanceRun};
pub use transcript::{parse_transcript, SimulationTranscriptBlock, TranscriptIndex};

/// Splits text on `\n` or `\r\n`, keeping a trailing empty line when the text
/// ends with a newline so evidence re-joins to the original content.
pub(crate) fn split_lines(text: &str) -> Vec<String> {
    text.split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::split_lines;

    #[test]
    fn split_lines_handles_crlf_and_trailing_newline() {
        assert_eq!(split_lines("a\r\nb\nc\n"), vec!["a", "b", "c", ""]);
        assert_eq!(split_lines(""), vec![""]);
    }
}
