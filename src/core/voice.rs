use std::collections::HashMap;

/// Word bounds for a single writing sample
pub const MIN_SAMPLE_WORDS: i64 = 50;
pub const MAX_SAMPLE_WORDS: i64 = 2_000;

/// Longest accepted questionnaire answer
pub const MAX_ANSWER_CHARS: usize = 1_000;

/// Questionnaire keys a generation request cannot proceed without
pub const REQUIRED_ANSWER_KEYS: &[&str] = &["tone", "audience", "formality", "topics", "influences"];

/// Per-sample and total character budgets for the generation prompt.
/// Keeps the request inside the model's context window regardless of how
/// much material the user uploaded.
const MAX_PROMPT_CHARS_PER_SAMPLE: usize = 4_000;
const MAX_PROMPT_CHARS_TOTAL: usize = 24_000;

/// Longest style summary extracted from a generated artifact
const MAX_SUMMARY_CHARS: usize = 500;

/// Whitespace-delimited word count
pub fn word_count(text: &str) -> i64 {
    text.split_whitespace().count() as i64
}

/// Whether a single sample's word count is acceptable
pub fn sample_words_in_bounds(words: i64) -> bool {
    (MIN_SAMPLE_WORDS..=MAX_SAMPLE_WORDS).contains(&words)
}

/// Check questionnaire answers for required keys and per-answer size
pub fn validate_answers(answers: &HashMap<String, String>) -> Result<(), String> {
    for key in REQUIRED_ANSWER_KEYS {
        match answers.get(*key) {
            None => return Err(format!("Missing required answer: {}", key)),
            Some(value) if value.trim().is_empty() => {
                return Err(format!("Answer for '{}' is empty", key))
            }
            Some(value) if value.chars().count() > MAX_ANSWER_CHARS => {
                return Err(format!(
                    "Answer for '{}' exceeds {} characters",
                    key, MAX_ANSWER_CHARS
                ))
            }
            Some(_) => {}
        }
    }
    Ok(())
}

/// Whether a user has enough material for a generation run
pub fn generation_ready(questionnaire_done: bool, total_sample_words: i64, min_words: i64) -> bool {
    questionnaire_done && total_sample_words >= min_words
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Assemble the user-side prompt for a voice profile generation run
///
/// Questionnaire answers come first, then samples in order, each truncated to
/// the per-sample budget; assembly stops once the total budget is spent.
pub fn build_generation_prompt(
    answers: &HashMap<String, String>,
    samples: &[(&str, &str)],
) -> String {
    let mut prompt = String::from("Writer self-description:\n");

    for key in REQUIRED_ANSWER_KEYS {
        if let Some(value) = answers.get(*key) {
            prompt.push_str(&format!("- {}: {}\n", key, truncate_chars(value, MAX_ANSWER_CHARS)));
        }
    }

    prompt.push_str("\nWriting samples:\n");

    for (idx, (title, content)) in samples.iter().enumerate() {
        if prompt.len() >= MAX_PROMPT_CHARS_TOTAL {
            break;
        }
        let budget = (MAX_PROMPT_CHARS_TOTAL - prompt.len()).min(MAX_PROMPT_CHARS_PER_SAMPLE);
        let excerpt = truncate_chars(content, budget);
        if excerpt.is_empty() {
            break;
        }
        prompt.push_str(&format!("\n--- Sample {} ({}) ---\n{}\n", idx + 1, title, excerpt));
    }

    prompt
}

/// Split a generated artifact into a short style summary and the full
/// system prompt
///
/// The first paragraph doubles as the summary shown in the studio UI; the
/// whole artifact is what gets deployed as the system prompt.
pub fn extract_style_summary(artifact: &str) -> (String, String) {
    let trimmed = artifact.trim();
    let first_paragraph = trimmed
        .split("\n\n")
        .map(str::trim)
        .find(|p| !p.is_empty())
        .unwrap_or("");

    let summary = truncate_chars(first_paragraph, MAX_SUMMARY_CHARS).to_string();

    (summary, trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answers() -> HashMap<String, String> {
        REQUIRED_ANSWER_KEYS
            .iter()
            .map(|k| (k.to_string(), format!("my {}", k)))
            .collect()
    }

    #[test]
    fn test_word_count() {
        assert_eq!(word_count(""), 0);
        assert_eq!(word_count("   "), 0);
        assert_eq!(word_count("one two  three\nfour"), 4);
    }

    #[test]
    fn test_sample_bounds() {
        assert!(!sample_words_in_bounds(MIN_SAMPLE_WORDS - 1));
        assert!(sample_words_in_bounds(MIN_SAMPLE_WORDS));
        assert!(sample_words_in_bounds(MAX_SAMPLE_WORDS));
        assert!(!sample_words_in_bounds(MAX_SAMPLE_WORDS + 1));
    }

    #[test]
    fn test_validate_answers_complete() {
        assert!(validate_answers(&answers()).is_ok());
    }

    #[test]
    fn test_validate_answers_missing_key() {
        let mut a = answers();
        a.remove("tone");
        let err = validate_answers(&a).unwrap_err();
        assert!(err.contains("tone"));
    }

    #[test]
    fn test_validate_answers_empty_value() {
        let mut a = answers();
        a.insert("audience".to_string(), "  ".to_string());
        assert!(validate_answers(&a).is_err());
    }

    #[test]
    fn test_validate_answers_oversized() {
        let mut a = answers();
        a.insert("topics".to_string(), "x".repeat(MAX_ANSWER_CHARS + 1));
        assert!(validate_answers(&a).is_err());
    }

    #[test]
    fn test_generation_ready() {
        assert!(generation_ready(true, 300, 300));
        assert!(!generation_ready(true, 299, 300));
        assert!(!generation_ready(false, 1_000, 300));
    }

    #[test]
    fn test_prompt_contains_answers_and_samples() {
        let prompt = build_generation_prompt(
            &answers(),
            &[("Blog post", "Some writing here"), ("Newsletter", "More writing")],
        );

        assert!(prompt.contains("tone: my tone"));
        assert!(prompt.contains("Sample 1 (Blog post)"));
        assert!(prompt.contains("Sample 2 (Newsletter)"));
    }

    #[test]
    fn test_prompt_truncates_long_samples() {
        let long = "word ".repeat(5_000);
        let prompt = build_generation_prompt(&answers(), &[("Long", &long), ("Tail", &long)]);

        assert!(prompt.len() <= MAX_PROMPT_CHARS_TOTAL + 200);
        // per-sample budget bounds each excerpt
        assert!(prompt.matches("--- Sample").count() <= 2);
    }

    #[test]
    fn test_prompt_stops_at_total_budget() {
        let long = "a".repeat(MAX_PROMPT_CHARS_PER_SAMPLE);
        let samples: Vec<(&str, &str)> = (0..20).map(|_| ("S", long.as_str())).collect();
        let prompt = build_generation_prompt(&answers(), &samples);

        assert!(prompt.len() <= MAX_PROMPT_CHARS_TOTAL + 200);
        assert!(prompt.matches("--- Sample").count() < 20);
    }

    #[test]
    fn test_style_summary_first_paragraph() {
        let artifact = "A warm, direct voice.\n\nAlways write in second person.\nKeep it short.";
        let (summary, prompt) = extract_style_summary(artifact);

        assert_eq!(summary, "A warm, direct voice.");
        assert_eq!(prompt, artifact);
    }

    #[test]
    fn test_style_summary_truncated() {
        let artifact = "s".repeat(2_000);
        let (summary, _) = extract_style_summary(&artifact);
        assert_eq!(summary.chars().count(), 500);
    }

    #[test]
    fn test_style_summary_skips_leading_blank_lines() {
        let (summary, _) = extract_style_summary("\n\n  \n\nThe voice.\n\nRest.");
        assert_eq!(summary, "The voice.");
    }
}
