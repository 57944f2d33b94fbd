use crate::config::{ThemeKind, ThemeSelection};
use ratatui::style::Color;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    pub name: &'static str,
    pub background: Color,
    pub primary: Color,
}

// Gradient palettes keep their first stop as the terminal background.
const PALETTE: [(&str, &str, &str); 9] = [
    ("default", "#ece9f7", "#6598e5"),
    ("sunset", "#ff7e5f", "#e5533b"),
    ("forest", "#5a3f37", "#92b57a"),
    ("sky", "#a1c4fd", "#6a89cc"),
    ("night", "#0f2027", "#a3b1c6"),
    ("sea", "#2c7744", "#92b57a"),
    ("current", "#ece9f7", "#6598e5"),
    ("blue", "#a1c4fd", "#6a89cc"),
    ("lightyellow", "#fff9e6", "#d4a237"),
];

pub fn parse_hex(hex: &str) -> Option<Color> {
    let hex = hex.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    Some(Color::Rgb(channel(0)?, channel(2)?, channel(4)?))
}

fn build(index: usize) -> Theme {
    let (name, bg, primary) = PALETTE[index % PALETTE.len()];
    Theme {
        name,
        background: parse_hex(bg).unwrap_or(Color::Reset),
        primary: parse_hex(primary).unwrap_or(Color::Cyan),
    }
}

/// Current theme plus cycling through the palette.
#[derive(Debug, Clone)]
pub struct ThemeSwitcher {
    index: usize,
}

impl ThemeSwitcher {
    /// Restores a persisted selection; image themes and unknown names fall
    /// back to the default palette.
    pub fn restore(selection: &ThemeSelection) -> Self {
        let index = match selection.kind {
            ThemeKind::Color => PALETTE
                .iter()
                .position(|(n, _, _)| *n == selection.name)
                .unwrap_or(0),
            ThemeKind::Image => {
                tracing::info!(value = %selection.value, "image themes are not drawable here");
                0
            }
        };
        ThemeSwitcher { index }
    }

    pub fn current(&self) -> Theme {
        build(self.index)
    }

    pub fn next(&mut self) -> ThemeSelection {
        self.index = (self.index + 1) % PALETTE.len();
        self.selection()
    }

    pub fn selection(&self) -> ThemeSelection {
        let name = self.current().name.to_string();
        ThemeSelection {
            value: name.clone(),
            name,
            kind: ThemeKind::Color,
        }
    }
}
