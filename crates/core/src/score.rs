use regex::Regex;
use std::sync::OnceLock;

static SCORE_PATTERN: OnceLock<Regex> = OnceLock::new();

fn score_pattern() -> &'static Regex {
    SCORE_PATTERN.get_or_init(|| {
        Regex::new(r"(?i)score\s*\*{0,2}\s*:\s*\*{0,2}\s*(\d+)\s*(?:/\s*10)?")
            .expect("score pattern is valid")
    })
}

/// Pulls the numeric score out of free-form evaluation text.
///
/// Looks for the first `Score: N` marker, tolerating case differences,
/// stray whitespace, markdown `**` emphasis around the label or the
/// number, and an optional `/10` suffix. The value is clamped to 0..=10.
///
/// Leniency is the contract here: evaluator output is model-generated
/// prose, and a missing or mangled marker must not abort a session, so
/// text without a readable score yields 0 rather than an error.
#[must_use]
pub fn extract_score(evaluation: &str) -> u8 {
    let Some(caps) = score_pattern().captures(evaluation) else {
        return 0;
    };
    let Some(digits) = caps.get(1) else {
        return 0;
    };
    match digits.as_str().parse::<u8>() {
        Ok(score) => score.min(10),
        // more digits than u8 holds, necessarily over the cap
        Err(_) => 10,
    }
}
