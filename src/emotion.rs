use ratatui::style::Color;

/// Display attributes for one emotion label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmotionDescriptor {
    pub label: &'static str,
    pub glyph: &'static str,
    /// Tint for calendar cells and timeline items.
    pub color: Color,
    /// Colour of the orb drawn by the save animation.
    pub orb: Color,
}

pub const DEFAULT_EMOTION: EmotionDescriptor = EmotionDescriptor {
    label: "default",
    glyph: "🤔",
    color: Color::Gray,
    orb: Color::Rgb(0xa1, 0xc4, 0xfd),
};

const EMOTIONS: [EmotionDescriptor; 6] = [
    EmotionDescriptor {
        label: "기쁨",
        glyph: "😄",
        color: Color::Yellow,
        orb: Color::Rgb(0xff, 0xd7, 0x00),
    },
    EmotionDescriptor {
        label: "슬픔",
        glyph: "😢",
        color: Color::Blue,
        orb: Color::Rgb(0x46, 0x82, 0xb4),
    },
    EmotionDescriptor {
        label: "분노",
        glyph: "😠",
        color: Color::Red,
        orb: Color::Rgb(0xb2, 0x22, 0x22),
    },
    EmotionDescriptor {
        label: "불안",
        glyph: "😟",
        color: Color::Magenta,
        orb: Color::Rgb(0x8a, 0x2b, 0xe2),
    },
    EmotionDescriptor {
        label: "당황",
        glyph: "😮",
        color: Color::LightRed,
        orb: Color::Rgb(0xff, 0x8c, 0x00),
    },
    EmotionDescriptor {
        label: "상처",
        glyph: "💔",
        color: Color::Green,
        orb: Color::Rgb(0x2e, 0x8b, 0x57),
    },
];

/// Looks up `label`, retrying with its first word (the server sometimes
/// appends a gloss, e.g. `"슬픔 (sad)"`). Unknown labels get the default.
pub fn describe(label: &str) -> &'static EmotionDescriptor {
    let label = label.trim();
    find(label)
        .or_else(|| label.split_whitespace().next().and_then(find))
        .unwrap_or(&DEFAULT_EMOTION)
}

fn find(label: &str) -> Option<&'static EmotionDescriptor> {
    EMOTIONS.iter().find(|e| e.label == label)
}
