//! Turns input text into the fixed-length vector the sentiment models are trained on.

/// Number of values fed to the model, one per leading character.
pub const FEATURE_LENGTH: usize = 128;

const HALF: usize = FEATURE_LENGTH / 2;

const POSITIVE_KEYWORDS: [&str; 20] = [
    "love", "great", "excellent", "amazing", "wonderful", "fantastic", "perfect", "best",
    "awesome", "good", "nice", "happy", "beautiful", "recommend", "impressed", "satisfied",
    "pleased", "exceeded", "quality", "value",
];

const NEGATIVE_KEYWORDS: [&str; 19] = [
    "hate", "bad", "terrible", "awful", "horrible", "worst", "poor", "disappointing",
    "disappointed", "waste", "broken", "useless", "regret", "never", "not recommend", "avoid",
    "defective", "cheap", "failed",
];

const NEGATION_PHRASES: [&str; 7] = [
    "not good",
    "not great",
    "not recommend",
    "didn't like",
    "don't like",
    "would not",
    "not at all",
];

const KEYWORD_WEIGHT: f32 = 0.4;
const KEYWORD_CAP: f32 = 2.0;

/// Maps `text` to [`FEATURE_LENGTH`] values in roughly `[-1, 1]`, shifted by keyword hits.
///
/// The first half of the vector carries positive evidence and the second half negative
/// evidence. The mapping is pure, so equal texts always produce equal vectors.
pub fn extract(text: &str) -> Vec<f32> {
    let mut features: Vec<f32> = text
        .chars()
        .take(FEATURE_LENGTH)
        .map(|c| c as u32 as f32)
        .chain(std::iter::repeat(0.0))
        .take(FEATURE_LENGTH)
        .map(|code| code / 127.5 - 1.0)
        .collect();

    let lower = text.to_lowercase();
    let positive = count_matches(&lower, &POSITIVE_KEYWORDS);
    let negative = count_matches(&lower, &NEGATIVE_KEYWORDS);
    let (head, tail) = features.split_at_mut(HALF);

    if positive > 0 {
        shift(head, keyword_boost(positive));
    }
    if negative > 0 {
        shift(tail, keyword_boost(negative));
    }

    if NEGATION_PHRASES.iter().any(|phrase| lower.contains(phrase)) {
        head.iter_mut().for_each(|v| *v *= 0.1);
        shift(tail, 1.2);
    }

    if negative > 0 && lower.contains("never") {
        shift(tail, 0.5);
    }

    features
}

fn count_matches(text: &str, keywords: &[&str]) -> usize {
    keywords.iter().filter(|word| text.contains(*word)).count()
}

fn keyword_boost(count: usize) -> f32 {
    (count as f32 * KEYWORD_WEIGHT).min(KEYWORD_CAP)
}

fn shift(values: &mut [f32], by: f32) {
    values.iter_mut().for_each(|v| *v += by);
}
