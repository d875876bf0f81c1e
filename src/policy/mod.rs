//! The reconciliation decision.
//!
//! [`decide`] is a pure function of the title, whether the marker label is
//! already on the pull request, and the active configuration. It returns the
//! [`Action`] needed to bring the label and comment in line with the title;
//! executing that action is the job of [`crate::reconcile`].

use crate::config::Configuration;

mod message;

pub use message::{format_response, is_stale_comment, normalize_login};

/// Name of this plugin, used in logs.
pub const PLUGIN_NAME: &str = "needs-retitle";

/// The label managed by this bot.
pub const NEEDS_RETITLE_LABEL: &str = "needs-retitle";

/// Why no mutation is needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoOpReason {
    /// The title matches and the label is absent (steady state).
    Compliant,
    /// The title does not match and the label is already there (steady state).
    AlreadyLabeled,
    /// No configuration has been loaded. Callers should warn.
    NoConfiguration,
}

/// The mutation required for one pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Nothing to do.
    NoOp(NoOpReason),

    /// Title does not match and the label is missing: add the label and
    /// explain why in a comment.
    AddLabelAndComment { message: String },

    /// Title now matches but the label is still present: remove the label
    /// and delete the bot's comments containing `message`.
    RemoveLabelAndPruneComments { message: String },
}

/// Decides what to do for a pull request with `title`.
pub fn decide(title: &str, has_marker_label: bool, config: Option<&Configuration>) -> Action {
    let Some(config) = config else {
        return Action::NoOp(NoOpReason::NoConfiguration);
    };

    match (config.title_ok(title), has_marker_label) {
        (false, false) => Action::AddLabelAndComment {
            message: config.error_message().to_string(),
        },
        (true, true) => Action::RemoveLabelAndPruneComments {
            message: config.error_message().to_string(),
        },
        (true, false) => Action::NoOp(NoOpReason::Compliant),
        (false, true) => Action::NoOp(NoOpReason::AlreadyLabeled),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Scopes;
    use proptest::prelude::*;

    const CONVENTIONAL: &str = "^(fix:|feat:|major:).*$";

    fn config() -> Configuration {
        Configuration::new(CONVENTIONAL, "", Scopes::default()).unwrap()
    }

    #[test]
    fn compliant_title_without_label_is_noop() {
        let action = decide("fix: bug", false, Some(&config()));
        assert_eq!(action, Action::NoOp(NoOpReason::Compliant));
    }

    #[test]
    fn non_compliant_title_without_label_adds() {
        let config = config();
        let action = decide("random change", false, Some(&config));
        assert_eq!(
            action,
            Action::AddLabelAndComment {
                message: config.error_message().to_string()
            }
        );
    }

    #[test]
    fn compliant_title_with_label_removes() {
        let config = config();
        let action = decide("feat: thing", true, Some(&config));
        assert_eq!(
            action,
            Action::RemoveLabelAndPruneComments {
                message: config.error_message().to_string()
            }
        );
    }

    #[test]
    fn non_compliant_title_with_label_is_noop() {
        let action = decide("random", true, Some(&config()));
        assert_eq!(action, Action::NoOp(NoOpReason::AlreadyLabeled));
    }

    #[test]
    fn custom_message_flows_into_action() {
        let config = Configuration::new(CONVENTIONAL, "Bad title!", Scopes::default()).unwrap();
        match decide("nope", false, Some(&config)) {
            Action::AddLabelAndComment { message } => assert_eq!(message, "Bad title!"),
            other => panic!("expected AddLabelAndComment, got {other:?}"),
        }
    }

    proptest! {
        #[test]
        fn absent_configuration_is_always_noop(title in ".*", labeled: bool) {
            prop_assert_eq!(
                decide(&title, labeled, None),
                Action::NoOp(NoOpReason::NoConfiguration)
            );
        }

        #[test]
        fn decision_depends_only_on_match_and_label(title in ".{0,40}", labeled: bool) {
            let config = config();
            let first = decide(&title, labeled, Some(&config));
            let second = decide(&title, labeled, Some(&config));
            prop_assert_eq!(&first, &second);

            let expected_mutation = config.title_ok(&title) == labeled;
            prop_assert_eq!(!matches!(first, Action::NoOp(_)), expected_mutation);
        }
    }
}
