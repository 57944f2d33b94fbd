use crate::submission::TextInput;

pub struct Slide {
    pub title: &'static str,
    pub body: &'static str,
}

pub const SLIDES: [Slide; 4] = [
    Slide {
        title: "감정 일기에 오신 것을 환영해요",
        body: "하루의 마음을 기록하면 감정을 분석하고\n그 감정에 맞는 추천을 건네드려요.",
    },
    Slide {
        title: "일기 쓰기",
        body: "왼쪽 페이지에 일기를 쓰고 Ctrl+R로 분석하세요.\n후보 감정 칩을 골라 추천을 다시 받을 수 있어요.",
    },
    Slide {
        title: "달력",
        body: "달력에서 날짜마다 마지막 일기의 감정을 확인하고\n기록을 다시 읽거나 지울 수 있어요.",
    },
    Slide {
        title: "닉네임 설정",
        body: "불리고 싶은 이름을 입력하세요.",
    },
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OnboardingOutcome {
    Stay,
    /// Carousel closed; `nickname` is set when one was entered on the last slide.
    Finished { nickname: Option<String> },
}

/// Slide carousel shown until the user finishes or closes it once.
#[derive(Default)]
pub struct Onboarding {
    current: usize,
    pub nickname: TextInput,
}

impl Onboarding {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn slide(&self) -> &'static Slide {
        &SLIDES[self.current]
    }

    pub fn is_last(&self) -> bool {
        self.current + 1 == SLIDES.len()
    }

    pub fn has_previous(&self) -> bool {
        self.current > 0
    }

    pub fn next_label(&self) -> &'static str {
        if self.is_last() {
            "시작하기"
        } else {
            "다음"
        }
    }

    pub fn next(&mut self) -> OnboardingOutcome {
        if !self.is_last() {
            self.current += 1;
            return OnboardingOutcome::Stay;
        }
        let nickname = self.nickname.text().trim();
        OnboardingOutcome::Finished {
            nickname: (!nickname.is_empty()).then(|| nickname.to_string()),
        }
    }

    pub fn previous(&mut self) {
        self.current = self.current.saturating_sub(1);
    }

    pub fn jump(&mut self, slide: usize) {
        if slide < SLIDES.len() {
            self.current = slide;
        }
    }

    pub fn close(&self) -> OnboardingOutcome {
        OnboardingOutcome::Finished { nickname: None }
    }
}
