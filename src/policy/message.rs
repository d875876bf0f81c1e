//! Comment formatting and matching.

/// Footer appended to every comment the bot posts.
const ABOUT_THIS_BOT: &str = "I am a bot that checks pull request titles. \
The `needs-retitle` label is removed automatically once the title matches the configured pattern.";

/// Formats the explanatory comment addressed to `author`.
pub fn format_response(author: &str, message: &str) -> String {
    format!("@{author}: {message}\n\n<details>\n\n{ABOUT_THIS_BOT}\n</details>")
}

/// Normalizes a login for comparison: case-insensitive, leading `@` ignored.
pub fn normalize_login(login: &str) -> String {
    login.trim_start_matches('@').to_lowercase()
}

/// Whether a comment is one of the bot's own explanatory comments.
///
/// Authorship must match the bot and the body must contain the message;
/// the body carries the author mention and footer, so this is a substring
/// check rather than equality.
pub fn is_stale_comment(bot_login: &str, message: &str, author: &str, body: &str) -> bool {
    normalize_login(bot_login) == normalize_login(author) && body.contains(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_mentions_author_and_message() {
        let body = format_response("octocat", "Wrong title");
        assert!(body.starts_with("@octocat: Wrong title\n"));
        assert!(body.contains("<details>"));
    }

    #[test]
    fn normalize_login_ignores_case_and_at() {
        assert_eq!(normalize_login("@Retitle-Bot"), "retitle-bot");
        assert_eq!(normalize_login("retitle-bot"), "retitle-bot");
    }

    #[test]
    fn own_comment_with_message_is_stale() {
        let body = format_response("octocat", "Wrong title");
        assert!(is_stale_comment("Retitle-Bot", "Wrong title", "retitle-bot", &body));
    }

    #[test]
    fn other_authors_are_never_stale() {
        assert!(!is_stale_comment(
            "retitle-bot",
            "Wrong title",
            "octocat",
            "quoting: Wrong title"
        ));
    }

    #[test]
    fn own_unrelated_comment_is_kept() {
        assert!(!is_stale_comment(
            "retitle-bot",
            "Wrong title",
            "retitle-bot",
            "Something else entirely"
        ));
    }
}
