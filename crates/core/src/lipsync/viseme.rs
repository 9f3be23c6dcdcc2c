use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Viseme {
    Open,
    Smile,
    Funnel,
    Pucker,
    Closed,
    Tense,
    Narrow,
}

impl Viseme {
    pub const ALL: [Viseme; 7] = [
        Viseme::Open,
        Viseme::Smile,
        Viseme::Funnel,
        Viseme::Pucker,
        Viseme::Closed,
        Viseme::Tense,
        Viseme::Narrow,
    ];

    /// Morph-target name this viseme drives on the avatar.
    pub fn shape_name(self) -> &'static str {
        match self {
            Viseme::Open => "mouthOpen",
            Viseme::Smile => "mouthSmile",
            Viseme::Funnel => "mouthFunnel",
            Viseme::Pucker => "mouthPucker",
            Viseme::Closed => "mouthClosed",
            Viseme::Tense => "mouthTense",
            Viseme::Narrow => "mouthNarrow",
        }
    }

    /// Open and funnel shapes also pull the jaw down.
    pub fn opens_jaw(self) -> bool {
        matches!(self, Viseme::Open | Viseme::Funnel)
    }
}

impl std::fmt::Display for Viseme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.shape_name())
    }
}

fn viseme_for_char(c: char) -> Viseme {
    match c {
        'a' => Viseme::Open,
        'e' | 'i' => Viseme::Smile,
        'o' => Viseme::Funnel,
        'u' => Viseme::Pucker,
        'm' => Viseme::Closed,
        'p' | 'b' => Viseme::Pucker,
        't' | 'd' => Viseme::Tense,
        's' => Viseme::Narrow,
        _ => Viseme::Open,
    }
}

/// Picks a mouth shape from the first character of a chunk. Crude on
/// purpose: one letter, one shape, no phoneme analysis.
pub fn pick_viseme(chunk: &str) -> Viseme {
    chunk
        .chars()
        .next()
        .and_then(|c| c.to_lowercase().next())
        .map(viseme_for_char)
        .unwrap_or(Viseme::Open)
}
