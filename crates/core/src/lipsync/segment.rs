use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunk {
    pub text: String,
    pub len: usize,
}

impl Chunk {
    fn new(text: String) -> Self {
        let len = text.chars().count();
        Self { text, len }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CharClass {
    Vowel,
    Other,
}

fn classify(c: char) -> Option<CharClass> {
    if c.is_whitespace() {
        return None;
    }
    match c.to_ascii_lowercase() {
        'a' | 'e' | 'i' | 'o' | 'u' | 'y' => Some(CharClass::Vowel),
        _ => Some(CharClass::Other),
    }
}

/// Splits `text` into maximal runs of vowels and maximal runs of other
/// non-whitespace characters. Whitespace only separates runs.
pub fn segment(text: &str) -> Vec<Chunk> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_class = None;

    for c in trimmed.chars() {
        let class = classify(c);
        if class != current_class && !current.is_empty() {
            chunks.push(Chunk::new(std::mem::take(&mut current)));
        }
        if class.is_some() {
            current.push(c);
        }
        current_class = class;
    }
    if !current.is_empty() {
        chunks.push(Chunk::new(current));
    }

    if chunks.is_empty() {
        return trimmed
            .split_whitespace()
            .map(|word| Chunk::new(word.to_owned()))
            .collect();
    }

    chunks
}
