use serde::{Deserialize, Serialize};

use crate::units::Dimension;

/// Response language for notes, reports, and oracle prompts.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    En,
    Ko,
    #[default]
    Auto,
}

impl Lang {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "en" | "english" => Some(Lang::En),
            "ko" | "kr" | "korean" | "한국어" => Some(Lang::Ko),
            "auto" | "" => Some(Lang::Auto),
            _ => None,
        }
    }

    /// `Auto` becomes `Ko` when `text` contains Hangul, otherwise `En`.
    pub fn resolve(self, text: &str) -> Lang {
        match self {
            Lang::Auto if contains_hangul(text) => Lang::Ko,
            Lang::Auto => Lang::En,
            other => other,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Lang::En => "en",
            Lang::Ko => "ko",
            Lang::Auto => "auto",
        }
    }

    /// Instruction appended to oracle prompts.
    pub fn apply_to_prompt(self, prompt: &str) -> String {
        match self {
            Lang::Ko => format!("{prompt}\n\n모든 설명 문자열은 한국어로 작성하세요."),
            Lang::En => format!("{prompt}\n\nWrite every descriptive string in English."),
            Lang::Auto => prompt.to_string(),
        }
    }

    pub fn dimension_name(self, dimension: Dimension) -> &'static str {
        if self != Lang::Ko {
            return dimension.label();
        }
        match dimension {
            Dimension::Weight => "무게",
            Dimension::Volume => "부피",
            Dimension::Distance => "거리",
            Dimension::Energy => "에너지",
            Dimension::Time => "시간",
            Dimension::Power => "전력",
            Dimension::Pressure => "압력",
            Dimension::Area => "면적",
            Dimension::Temperature => "온도",
            Dimension::Currency => "금액",
            Dimension::Count => "수량",
            Dimension::Percentage => "비율",
            Dimension::Year => "연도",
        }
    }
}

pub fn contains_hangul(text: &str) -> bool {
    text.chars().any(|c| {
        matches!(c,
            '\u{AC00}'..='\u{D7A3}' |
            '\u{1100}'..='\u{11FF}' |
            '\u{3130}'..='\u{318F}'
        )
    })
}
