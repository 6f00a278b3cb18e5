//! Id derivation from user-typed titles.
//!
//! The backend assigns the final ids. These helpers reproduce its rules
//! closely enough for client-side duplicate pre-checks before submission.

/// Derive a state or transition id from a title.
///
/// Trimmed, each space replaced by `_`, lowercased. Runs of spaces are
/// kept one-for-one, so `"Send  Back"` and `"Send Back"` are distinct ids.
///
/// # Examples
///
/// ```
/// use wfm_core::naming::slugify;
///
/// assert_eq!(slugify("Draft Review"), "draft_review");
/// assert_eq!(slugify("  Send  Back "), "send__back");
/// ```
pub fn slugify(title: &str) -> String {
    title.trim().replace(' ', "_").to_lowercase()
}

/// Derive the id the backend gives a newly cloned workflow.
///
/// The backend trims the name and replaces `-` with `_`; case is kept.
///
/// ```
/// use wfm_core::naming::workflow_id_from_name;
///
/// assert_eq!(workflow_id_from_name("test-workflow-x"), "test_workflow_x");
/// ```
pub fn workflow_id_from_name(name: &str) -> String {
    name.trim().replace('-', "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_word() {
        assert_eq!(slugify("Review"), "review");
    }

    #[test]
    fn multi_word() {
        assert_eq!(slugify("Draft Review"), "draft_review");
    }

    #[test]
    fn space_runs_are_kept() {
        assert_eq!(slugify("Send  Back"), "send__back");
        assert_ne!(slugify("Send  Back"), slugify("Send Back"));
    }

    #[test]
    fn only_spaces_are_replaced() {
        assert_eq!(slugify("Send\tBack"), "send\tback");
    }

    #[test]
    fn surrounding_whitespace_trimmed() {
        assert_eq!(slugify("  Publish "), "publish");
    }

    #[test]
    fn empty_title() {
        assert_eq!(slugify("   "), "");
    }

    #[test]
    fn workflow_id_keeps_case() {
        assert_eq!(workflow_id_from_name(" My-Flow "), "My_Flow");
    }
}
