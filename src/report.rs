//! The answer to one natural-language query, and its Markdown rendering.

use serde::Serialize;

use crate::calc::{CalculationResult, fmt_num};
use crate::lang::Lang;
use crate::markdown::{code_span, escape_md_cell, sanitize_heading};
use crate::model::{MatchResult, MatchType, QueryEntity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryStatus {
    /// Every entity has a computed emission.
    Complete,
    /// Some entities have a computed emission.
    Partial,
    /// Nothing could be computed from the information given.
    NeedsMoreInfo,
    /// The query could not be processed.
    Failed,
}

impl QueryStatus {
    pub fn label(self, lang: Lang) -> &'static str {
        match (self, lang == Lang::Ko) {
            (Self::Complete, false) => "complete",
            (Self::Partial, false) => "partial",
            (Self::NeedsMoreInfo, false) => "needs more information",
            (Self::Failed, false) => "failed",
            (Self::Complete, true) => "완료",
            (Self::Partial, true) => "일부 완료",
            (Self::NeedsMoreInfo, true) => "추가 정보 필요",
            (Self::Failed, true) => "실패",
        }
    }
}

/// An entity with no calculation: nothing matched, or its search failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Unmatched {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryReport {
    pub query: String,
    pub language: Lang,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,
    pub status: QueryStatus,
    pub calculations: Vec<CalculationResult>,
    pub unmatched: Vec<Unmatched>,
    pub missing_info: Vec<String>,
    /// Sum of the kilogram-denominated emissions whose quantity fit the factor's unit.
    pub total_emission: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl QueryReport {
    pub fn new(
        query: &str,
        language: Lang,
        intent: Option<String>,
        calculations: Vec<CalculationResult>,
        unmatched: Vec<Unmatched>,
        mut missing_info: Vec<String>,
    ) -> Self {
        for u in unmatched.iter().filter(|u| u.error.is_none()) {
            missing_info.push(more_detail(&u.name, language));
        }
        let total_emission = calculations
            .iter()
            .filter(|c| c.counts_toward_total())
            .map(|c| c.total_emission)
            .sum();
        Self {
            query: query.to_string(),
            language,
            intent,
            status: assess(&calculations, &unmatched),
            calculations,
            unmatched,
            missing_info,
            total_emission,
            error: None,
        }
    }

    pub fn failed(query: &str, language: Lang, error: String) -> Self {
        Self {
            query: query.to_string(),
            language,
            intent: None,
            status: QueryStatus::Failed,
            calculations: Vec::new(),
            unmatched: Vec::new(),
            missing_info: Vec::new(),
            total_emission: 0.0,
            error: Some(error),
        }
    }

    pub fn to_markdown(&self) -> String {
        let ko = self.language == Lang::Ko;
        let mut out = format!(
            "# {}: {}\n\n",
            if ko { "배출량 계산" } else { "Emission estimate" },
            sanitize_heading(&self.query)
        );
        out.push_str(&format!(
            "**{}:** {}\n\n",
            if ko { "상태" } else { "Status" },
            self.status.label(self.language)
        ));

        if let Some(ref error) = self.error {
            out.push_str(&format!("{}: {error}\n", if ko { "오류" } else { "Error" }));
            return out;
        }

        if !self.calculations.is_empty() {
            out.push_str(if ko {
                "| 활동 | 배출계수 | 배출량 | 신뢰도 |\n"
            } else {
                "| Activity | Factor | Emission | Confidence |\n"
            });
            out.push_str("|---|---|---|---|\n");
            for c in &self.calculations {
                let emission = if c.is_factor_only() {
                    "-".to_string()
                } else {
                    format!("{} {}", fmt_num(c.total_emission), c.emission_unit)
                };
                out.push_str(&format!(
                    "| {} | {} ({} {}) | {} | {:.0}% |\n",
                    escape_md_cell(&c.entity.name),
                    escape_md_cell(&c.record.title),
                    fmt_num(c.record.factor),
                    escape_md_cell(&c.record.unit),
                    emission,
                    c.confidence * 100.0
                ));
            }
            out.push_str(&format!(
                "\n**{}:** {} kg\n\n",
                if ko { "총 배출량" } else { "Total" },
                fmt_num(self.total_emission)
            ));

            for c in &self.calculations {
                out.push_str(&format!("## {}\n\n", sanitize_heading(&c.entity.name)));
                out.push_str(&format!("{}\n\n", code_span(&c.formula)));
                for note in &c.notes {
                    out.push_str(&format!("- {note}\n"));
                }
                if !c.notes.is_empty() {
                    out.push('\n');
                }
            }
        }

        let failures: Vec<_> = self
            .unmatched
            .iter()
            .filter_map(|u| u.error.as_ref().map(|e| (&u.name, e)))
            .collect();
        if !failures.is_empty() {
            out.push_str(if ko { "## 검색 실패\n\n" } else { "## Failed searches\n\n" });
            for (name, error) in failures {
                out.push_str(&format!("- {name} ({error})\n"));
            }
            out.push('\n');
        }

        if !self.missing_info.is_empty() {
            out.push_str(if ko {
                "## 추가로 필요한 정보\n\n"
            } else {
                "## Need more information\n\n"
            });
            for item in &self.missing_info {
                out.push_str(&format!("- {item}\n"));
            }
            out.push('\n');
        }

        out
    }
}

/// Matches for a single entity plus the calculation against the best one.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchReport {
    pub entity: QueryEntity,
    pub language: Lang,
    pub matches: Vec<MatchResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calculation: Option<CalculationResult>,
}

impl SearchReport {
    pub fn to_markdown(&self) -> String {
        let ko = self.language == Lang::Ko;
        let mut out = format!(
            "# {}: {}\n\n",
            if ko { "검색 결과" } else { "Matches" },
            sanitize_heading(&self.entity.name)
        );

        if self.matches.is_empty() {
            out.push_str(&format!("{}\n", more_detail(&self.entity.name, self.language)));
            return out;
        }

        out.push_str(if ko {
            "| # | 항목 | 부문 | 배출계수 | 점수 | 유형 |\n"
        } else {
            "| # | Title | Sector | Factor | Score | Match |\n"
        });
        out.push_str("|---|---|---|---|---|---|\n");
        for (i, m) in self.matches.iter().enumerate() {
            out.push_str(&format!(
                "| {} | {} | {} | {} {} | {:.2} | {} |\n",
                i + 1,
                escape_md_cell(&m.record.title),
                escape_md_cell(&m.record.sector),
                fmt_num(m.record.factor),
                escape_md_cell(&m.record.unit),
                m.relevance_score,
                match_label(m.match_type)
            ));
        }

        if let Some(ref c) = self.calculation {
            out.push_str(&format!("\n## {}\n\n", if ko { "계산" } else { "Calculation" }));
            out.push_str(&format!("{}\n\n", code_span(&c.formula)));
            for note in &c.notes {
                out.push_str(&format!("- {note}\n"));
            }
        }
        out
    }
}

fn match_label(match_type: MatchType) -> &'static str {
    match match_type {
        MatchType::Exact => "exact",
        MatchType::Fuzzy => "fuzzy",
        MatchType::Semantic => "semantic",
    }
}

fn assess(calculations: &[CalculationResult], unmatched: &[Unmatched]) -> QueryStatus {
    let computed = calculations.iter().filter(|c| !c.is_factor_only()).count();
    if calculations.is_empty() && !unmatched.is_empty() && unmatched.iter().all(|u| u.error.is_some()) {
        QueryStatus::Failed
    } else if computed > 0 && computed == calculations.len() && unmatched.is_empty() {
        QueryStatus::Complete
    } else if computed > 0 {
        QueryStatus::Partial
    } else {
        QueryStatus::NeedsMoreInfo
    }
}

fn more_detail(name: &str, lang: Lang) -> String {
    if lang == Lang::Ko {
        format!("'{name}'에 맞는 배출계수를 찾지 못했습니다. 활동을 더 구체적으로 설명해 주세요.")
    } else {
        format!("No emission factor found for '{name}'. Please describe the activity in more detail.")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calc::calculate;
    use crate::model::fixtures::record;

    fn calc(entity: QueryEntity, unit: &str, factor: f64) -> CalculationResult {
        let matched = MatchResult {
            record: record("r1", "Paper | recycled", "Materials", unit, factor),
            relevance_score: 0.9,
            match_type: MatchType::Fuzzy,
        };
        calculate(&entity, &matched, Lang::En)
    }

    #[test]
    fn complete_when_everything_computed() {
        let c = calc(QueryEntity::new("paper").with_quantity(2.0, "kg"), "kg/kg", 0.5);
        let report = QueryReport::new("2 kg paper", Lang::En, None, vec![c], vec![], vec![]);
        assert_eq!(report.status, QueryStatus::Complete);
        assert_eq!(report.total_emission, 1.0);
    }

    #[test]
    fn mismatched_units_stay_out_of_the_total() {
        let fits = calc(QueryEntity::new("paper").with_quantity(2.0, "kg"), "kg/kg", 0.5);
        let mismatch = calc(QueryEntity::new("paper").with_quantity(5.0, "kWh"), "kg/kg", 0.5);
        assert!((mismatch.total_emission - 2.5).abs() < 1e-9);
        let report = QueryReport::new("q", Lang::En, None, vec![fits, mismatch], vec![], vec![]);
        assert_eq!(report.calculations.len(), 2);
        assert_eq!(report.total_emission, 1.0);
    }

    #[test]
    fn factor_only_needs_more_info() {
        let c = calc(QueryEntity::new("paper"), "kg/kg", 0.5);
        let report = QueryReport::new("paper", Lang::En, None, vec![c], vec![], vec![]);
        assert_eq!(report.status, QueryStatus::NeedsMoreInfo);
        assert_eq!(report.total_emission, 0.0);
    }

    #[test]
    fn unmatched_entity_makes_partial_and_asks_for_detail() {
        let c = calc(QueryEntity::new("paper").with_quantity(2.0, "kg"), "kg/kg", 0.5);
        let unmatched = vec![Unmatched {
            name: "flux capacitor".into(),
            error: None,
        }];
        let report = QueryReport::new("q", Lang::En, None, vec![c], unmatched, vec![]);
        assert_eq!(report.status, QueryStatus::Partial);
        assert!(report.missing_info[0].contains("'flux capacitor'"));
    }

    #[test]
    fn all_searches_failing_is_failed() {
        let unmatched = vec![Unmatched {
            name: "truck".into(),
            error: Some("catalog rate limit exceeded".into()),
        }];
        let report = QueryReport::new("q", Lang::En, None, vec![], unmatched, vec![]);
        assert_eq!(report.status, QueryStatus::Failed);
        assert!(report.missing_info.is_empty());
        assert!(report.to_markdown().contains("## Failed searches"));
    }

    #[test]
    fn markdown_escapes_table_cells() {
        let c = calc(QueryEntity::new("paper").with_quantity(2.0, "kg"), "kg/kg", 0.5);
        let report = QueryReport::new("2 kg\npaper", Lang::En, None, vec![c], vec![], vec![]);
        let md = report.to_markdown();
        assert!(md.starts_with("# Emission estimate: 2 kg paper\n"));
        assert!(md.contains("| paper | Paper \\| recycled (0.5 kg/kg) | 1 kg | 95% |"));
        assert!(md.contains("`2 kg × 0.5 kg/kg = 1 kg`"));
    }

    #[test]
    fn korean_labels() {
        let report = QueryReport::failed("트럭", Lang::Ko, "oracle down".into());
        let md = report.to_markdown();
        assert!(md.contains("**상태:** 실패"));
        assert!(md.contains("오류: oracle down"));
    }

    #[test]
    fn serializes_camel_case() {
        let report = QueryReport::failed("q", Lang::En, "boom".into());
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["totalEmission"], 0.0);
        assert_eq!(json["missingInfo"], serde_json::json!([]));
    }

    #[test]
    fn search_report_lists_matches_and_formula() {
        let entity = QueryEntity::new("paper").with_quantity(2.0, "kg");
        let c = calc(entity.clone(), "kg/kg", 0.5);
        let report = SearchReport {
            entity,
            language: Lang::En,
            matches: vec![MatchResult {
                record: c.record.clone(),
                relevance_score: 0.9,
                match_type: MatchType::Fuzzy,
            }],
            calculation: Some(c),
        };
        let md = report.to_markdown();
        assert!(md.contains("| 1 | Paper \\| recycled | Materials | 0.5 kg/kg | 0.90 | fuzzy |"));
        assert!(md.contains("## Calculation"));
    }

    #[test]
    fn empty_search_report_asks_for_detail() {
        let report = SearchReport {
            entity: QueryEntity::new("flux capacitor"),
            language: Lang::En,
            matches: vec![],
            calculation: None,
        };
        assert!(report.to_markdown().contains("No emission factor found for 'flux capacitor'"));
    }
}
