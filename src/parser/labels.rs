use super::normalize::normalize;

pub const DEFAULT_VIDEO_LABELS: &[&str] = &[
    "videó szöveg",
    "video szoveg",
    "videó leirat",
    "video leirat",
    "transcript",
    "videó",
    "video",
];

pub const DEFAULT_LESSON_LABELS: &[&str] = &["lecke szöveg", "lecke anyag", "leckeszöveg", "tananyag"];

pub fn default_video_labels() -> Vec<String> {
    DEFAULT_VIDEO_LABELS.iter().map(|s| s.to_string()).collect()
}

pub fn default_lesson_labels() -> Vec<String> {
    DEFAULT_LESSON_LABELS.iter().map(|s| s.to_string()).collect()
}

/// True when every token of any phrase occurs as a substring of the
/// normalized title. Tokens need not be contiguous or word-bounded, so
/// "video" also hits "videojáték".
pub fn label_match<S: AsRef<str>>(title: &str, phrases: &[S]) -> bool {
    let title = normalize(title);
    phrases.iter().any(|phrase| {
        let phrase = normalize(phrase.as_ref());
        phrase
            .split_whitespace()
            .all(|token| title.contains(token))
    })
}
