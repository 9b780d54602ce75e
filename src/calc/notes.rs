use crate::lang::Lang;
use crate::units::Dimension;

use super::fmt_num;

/// An explanation attached to a calculation, rendered per language.
#[derive(Debug, Clone, PartialEq)]
pub enum Note {
    MissingQuantity { needed: Vec<Dimension> },
    FactorOnly,
    Converted {
        value: f64,
        from: String,
        to_value: f64,
        to: String,
    },
    FromDescription { value: f64, unit: String },
    AssumedSingleUnit,
    BestEffortConversion { from: String, to: String },
    DimensionMismatch { from: String, to: String },
}

impl Note {
    pub fn render(&self, lang: Lang) -> String {
        let ko = lang == Lang::Ko;
        match self {
            Note::MissingQuantity { needed } => {
                let names: Vec<&str> = if needed.is_empty() {
                    vec![lang.dimension_name(Dimension::Count)]
                } else {
                    needed.iter().map(|d| lang.dimension_name(*d)).collect()
                };
                if ko {
                    let names = names.join(", ");
                    format!("{names} 정보가 없어 배출량을 계산하지 않았습니다. {names} 값을 알려주세요.")
                } else {
                    let names = names.join(" and ");
                    format!("No {names} given, so no emission was calculated. Please provide the {names}.")
                }
            }
            Note::FactorOnly if ko => "배출계수만 표시합니다.".to_string(),
            Note::FactorOnly => "Only the emission factor is shown.".to_string(),
            Note::Converted {
                value,
                from,
                to_value,
                to,
            } => {
                let (v, tv) = (fmt_num(*value), fmt_num(*to_value));
                if ko {
                    format!("{v} {from}을(를) {tv} {to}(으)로 환산했습니다.")
                } else {
                    format!("Converted {v} {from} to {tv} {to}.")
                }
            }
            Note::FromDescription { value, unit } => {
                let v = fmt_num(*value);
                if ko {
                    format!("활동 설명에서 찾은 {v} {unit}을(를) 사용했습니다.")
                } else {
                    format!("Used {v} {unit} found in the activity description.")
                }
            }
            Note::AssumedSingleUnit if ko => {
                "차량 또는 기기 수가 없어 1대로 가정했습니다.".to_string()
            }
            Note::AssumedSingleUnit => "No vehicle or device count given; assumed 1.".to_string(),
            Note::BestEffortConversion { from, to } => {
                if ko {
                    format!("{from}을(를) {to}(으)로 간주했습니다.")
                } else {
                    format!("Treated {from} as {to} without a strict conversion.")
                }
            }
            Note::DimensionMismatch { from, to } => {
                if ko {
                    format!(
                        "단위 {from}이(가) 배출계수 단위 {to}와(과) 맞지 않아 환산 없이 사용했고 신뢰도를 낮췄습니다."
                    )
                } else {
                    format!(
                        "Unit {from} does not match the factor unit {to}; the value was used unconverted and confidence lowered."
                    )
                }
            }
        }
    }
}
