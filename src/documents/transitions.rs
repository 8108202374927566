//! Summarization state machine helpers.
//!
//! Every status write goes through one of these constructors so the pairing of status with
//! summary/error columns stays consistent: an error message only accompanies `failed`, and a
//! summary only appears together with `completed` (a reset leaves any prior summary alone).

use super::types::{DocumentPatch, Language, OutputType, SummaryStatus};

/// Whether the orchestrator may move a document from `from` to `to`.
///
/// Resets to `pending` are legal from any state.
pub fn can_transition(from: SummaryStatus, to: SummaryStatus) -> bool {
    use SummaryStatus::*;
    matches!(
        (from, to),
        (_, Pending)
            | (Pending | Completed | Failed, Processing)
            | (Processing, Completed | Failed)
    )
}

/// Enter `processing`, clearing any previous error and summary.
pub fn start_processing() -> DocumentPatch {
    DocumentPatch {
        summary_status: Some(SummaryStatus::Processing),
        summary: Some(None),
        summary_error: Some(None),
        ..DocumentPatch::default()
    }
}

/// Record the selection a run uses as the document's active configuration.
pub fn select_options(language: Language, output_type: OutputType) -> DocumentPatch {
    DocumentPatch {
        language: Some(language),
        output_type: Some(output_type),
        ..DocumentPatch::default()
    }
}

/// Enter `completed` with the generated summary.
pub fn complete(summary: String) -> DocumentPatch {
    DocumentPatch {
        summary_status: Some(SummaryStatus::Completed),
        summary: Some(Some(summary)),
        summary_error: Some(None),
        ..DocumentPatch::default()
    }
}

/// Enter `failed` with a reason.
pub fn fail(message: impl Into<String>) -> DocumentPatch {
    DocumentPatch {
        summary_status: Some(SummaryStatus::Failed),
        summary: Some(None),
        summary_error: Some(Some(message.into())),
        ..DocumentPatch::default()
    }
}

/// Return to `pending` and clear the error. The summary column is not touched.
pub fn reset() -> DocumentPatch {
    DocumentPatch {
        summary_status: Some(SummaryStatus::Pending),
        summary_error: Some(None),
        ..DocumentPatch::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use SummaryStatus::*;

    #[test]
    fn legal_transitions_follow_lifecycle() {
        assert!(can_transition(Pending, Processing));
        assert!(can_transition(Processing, Completed));
        assert!(can_transition(Processing, Failed));
        assert!(can_transition(Failed, Processing));
        assert!(can_transition(Completed, Pending));
        assert!(can_transition(Processing, Pending));

        assert!(!can_transition(Processing, Processing));
        assert!(!can_transition(Pending, Completed));
        assert!(!can_transition(Failed, Completed));
    }

    #[test]
    fn failure_carries_message_and_drops_summary() {
        let patch = fail("file not found");
        assert_eq!(patch.summary_status, Some(Failed));
        assert_eq!(patch.summary_error, Some(Some("file not found".into())));
        assert_eq!(patch.summary, Some(None));
    }

    #[test]
    fn reset_leaves_summary_column_alone() {
        let patch = reset();
        assert_eq!(patch.summary_status, Some(Pending));
        assert_eq!(patch.summary_error, Some(None));
        assert_eq!(patch.summary, None);
    }
}
