// builder/lexical.rs
// Mild lexical calibration for early grades: plainer synonyms and a
// split for semicolon-chained sentences.

/// Grades at or below this get calibrated wording.
pub const CALIBRATION_GRADE_CEILING: u8 = 5;

const SYNONYMS: [(&str, &str); 8] = [
    ("utilize", "use"),
    ("utilizes", "uses"),
    ("approximately", "about"),
    ("consequently", "so"),
    ("additionally", "also"),
    ("numerous", "many"),
    ("obtain", "get"),
    ("purchase", "buy"),
];

/// Swaps heavyweight words for plain ones and breaks semicolon chains
/// into separate sentences. A no-op above the grade ceiling.
pub fn calibrate(text: &str, grade: u8) -> String {
    if grade > CALIBRATION_GRADE_CEILING {
        return text.to_string();
    }

    let mut words: Vec<String> = Vec::new();
    for token in text.split(' ') {
        let core: String = token
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        let replaced = SYNONYMS
            .iter()
            .find(|(from, _)| *from == core)
            .map(|(from, to)| swap_preserving_shell(token, from, to));
        words.push(replaced.unwrap_or_else(|| token.to_string()));
    }
    words.join(" ").replace("; ", ". ")
}

/// Replaces the word inside a token while keeping its punctuation and
/// leading capitalization.
fn swap_preserving_shell(token: &str, from: &str, to: &str) -> String {
    let lower = token.to_lowercase();
    let Some(pos) = lower.find(from) else {
        return token.to_string();
    };
    let prefix = &token[..pos];
    let suffix = &token[pos + from.len()..];
    let starts_upper = token[pos..]
        .chars()
        .next()
        .map(|c| c.is_uppercase())
        .unwrap_or(false);
    let mut replacement = to.to_string();
    if starts_upper {
        let mut chars = replacement.chars();
        if let Some(first) = chars.next() {
            replacement = first.to_uppercase().collect::<String>() + chars.as_str();
        }
    }
    format!("{}{}{}", prefix, replacement, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swaps_heavy_words_for_young_grades() {
        assert_eq!(
            calibrate("Utilize the chart to obtain your answer.", 4),
            "Use the chart to get your answer."
        );
    }

    #[test]
    fn preserves_punctuation_around_swaps() {
        assert_eq!(calibrate("approximately, yes", 3), "about, yes");
    }

    #[test]
    fn splits_semicolon_chains() {
        assert_eq!(
            calibrate("Count the petals; write the number.", 2),
            "Count the petals. write the number."
        );
    }

    #[test]
    fn leaves_older_grades_untouched() {
        let text = "Utilize the chart; obtain your answer.";
        assert_eq!(calibrate(text, 9), text);
    }
}
