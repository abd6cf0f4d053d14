//! Paraphrase expansion for a challenge question.
//!
//! CLIP is sensitive to phrasing; scoring the same concept under several templates and
//! averaging smooths that out.

/// Expands `question` into the paraphrases scored for every candidate.
///
/// Duplicates (e.g. when the question is already lower-case) are removed while keeping
/// the first occurrence, so identical prompts are not double-weighted.
pub fn expand_question(question: &str) -> Vec<String> {
    let q = question.trim();
    if q.is_empty() {
        return Vec::new();
    }

    let candidates = [
        q.to_string(),
        q.to_lowercase(),
        title_case(q),
        format!("a {q}"),
        format!("an {q}"),
        format!("the {q}"),
        format!("{q} item"),
        format!("{q} object"),
        format!("picture of {q}"),
        format!("image of {q}"),
        format!("a photo of {q}"),
    ];

    let mut prompts: Vec<String> = Vec::with_capacity(candidates.len());
    for prompt in candidates {
        if !prompts.contains(&prompt) {
            prompts.push(prompt);
        }
    }
    prompts
}

/// Prompt used for every training sample.
pub fn training_prompt(question: &str) -> String {
    format!("a {}", question.trim().to_lowercase())
}

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
