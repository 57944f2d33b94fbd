use std::time::Duration;

pub const CURTAIN_DURATION: Duration = Duration::from_millis(400);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Write,
    Calendar,
}

impl Screen {
    pub const ALL: [Screen; 2] = [Screen::Write, Screen::Calendar];

    pub fn title(self) -> &'static str {
        match self {
            Screen::Write => "일기 쓰기",
            Screen::Calendar => "나의 일기",
        }
    }

    pub fn index(self) -> usize {
        match self {
            Screen::Write => 0,
            Screen::Calendar => 1,
        }
    }
}

/// Navigation bar marker that follows the focused tab.
#[derive(Debug, Clone, Default)]
pub struct NavMarker {
    hovered: Option<usize>,
}

impl NavMarker {
    pub fn hover(&mut self, index: usize) {
        self.hovered = Some(index.min(Screen::ALL.len() - 1));
    }

    pub fn leave(&mut self) {
        self.hovered = None;
    }

    pub fn position(&self) -> Option<usize> {
        self.hovered
    }
}

/// Covers the body while switching screens, then reveals the target.
#[derive(Debug, Clone)]
pub struct Curtain {
    target: Screen,
    remaining: Duration,
}

impl Curtain {
    pub fn drop_to(target: Screen) -> Self {
        Curtain {
            target,
            remaining: CURTAIN_DURATION,
        }
    }

    /// Returns the target screen once the curtain has fully closed.
    pub fn advance(&mut self, elapsed: Duration) -> Option<Screen> {
        self.remaining = self.remaining.saturating_sub(elapsed);
        self.remaining.is_zero().then_some(self.target)
    }

    pub fn coverage(&self) -> f64 {
        1.0 - self.remaining.as_secs_f64() / CURTAIN_DURATION.as_secs_f64()
    }
}
