//! Fallback token accounting

use crate::types::Usage;

/// Rough token estimate: a quarter of the character count, at least one
pub fn estimate_tokens(text: &str) -> u32 {
    let estimate = text.chars().count() / 4;
    u32::try_from(estimate).unwrap_or(u32::MAX).max(1)
}

/// Combine backend-reported counts with estimates
///
/// Only counts the backend reported as zero are estimated.
pub fn resolve_usage(reported: (u32, u32), prompt_text: &str, completion_text: &str) -> Usage {
    let (prompt, completion) = reported;

    let prompt = if prompt == 0 { estimate_tokens(prompt_text) } else { prompt };
    let completion = if completion == 0 {
        estimate_tokens(completion_text)
    } else {
        completion
    };

    Usage::new(prompt, completion)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimate_is_quarter_of_characters() {
        assert_eq!(estimate_tokens(""), 1);
        assert_eq!(estimate_tokens("abc"), 1);
        assert_eq!(estimate_tokens("abcdefgh"), 2);
        assert_eq!(estimate_tokens("ééééééééé"), 2);
    }

    #[test]
    fn reported_counts_are_kept() {
        assert_eq!(resolve_usage((10, 20), "x", "y"), Usage::new(10, 20));
    }

    #[test]
    fn only_zero_counts_are_estimated() {
        let usage = resolve_usage((0, 7), "twelve chars", "ignored");
        assert_eq!(usage, Usage::new(3, 7));

        let usage = resolve_usage((5, 0), "ignored", "sixteen chars!!!");
        assert_eq!(usage, Usage::new(5, 4));
        assert_eq!(usage.total_tokens, 9);
    }
}
