//! Command-line surface of the `factorscout` binary.

use clap::{Args, Parser, Subcommand};
use serde::Serialize;

use crate::calc::fmt_num;
use crate::lang::Lang;
use crate::model::{EntityType, QueryEntity, ScenarioDetails, TransportDetails};
use crate::units;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Catalog JSON file or http(s) URL (overrides FACTORSCOUT_CATALOG)
    #[arg(long, global = true)]
    pub catalog: Option<String>,

    /// Response language: "en", "ko", or "auto"
    #[arg(long, global = true, default_value = "auto", value_parser = parse_lang)]
    pub lang: Lang,

    /// Print JSON instead of Markdown
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Extract activities from free text, match them, and calculate emissions
    Query {
        /// e.g. "30-ton rigid diesel truck, 75 km"
        text: String,
    },
    /// Match one activity against the catalog and calculate with the best factor
    Search(SearchArgs),
    /// Convert a value between two units of the same dimension
    Convert {
        #[arg(allow_negative_numbers = true)]
        value: f64,
        from: String,
        to: String,
    },
}

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Activity description
    #[arg(long)]
    pub name: String,

    /// transport, waste, liquid, food, energy, or general
    #[arg(long = "type", value_parser = parse_entity_type)]
    pub entity_type: Option<EntityType>,

    #[arg(long)]
    pub quantity: Option<f64>,

    /// Unit of --quantity
    #[arg(long, requires = "quantity")]
    pub unit: Option<String>,

    #[arg(long)]
    pub distance: Option<f64>,

    #[arg(long, default_value = "km")]
    pub distance_unit: String,
}

impl SearchArgs {
    /// A distance makes the activity a transport scenario.
    pub fn entity(&self) -> QueryEntity {
        let mut entity = QueryEntity::new(self.name.trim());
        entity.quantity = self.quantity;
        entity.unit = self.unit.clone();
        entity.entity_type = self.entity_type;
        if let Some(distance) = self.distance {
            entity.scenario = Some(ScenarioDetails::Transport(TransportDetails {
                distance: Some(distance),
                distance_unit: Some(self.distance_unit.clone()),
                ..Default::default()
            }));
            entity.entity_type.get_or_insert(EntityType::Transport);
        }
        entity
    }
}

fn parse_lang(raw: &str) -> Result<Lang, String> {
    Lang::parse(raw).ok_or_else(|| format!("unknown language '{raw}' (expected en, ko, or auto)"))
}

fn parse_entity_type(raw: &str) -> Result<EntityType, String> {
    EntityType::parse(raw).ok_or_else(|| format!("unknown activity type '{raw}'"))
}

#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("cannot convert '{from}' to '{to}': unknown unit or different dimensions")]
    Incompatible { from: String, to: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConvertReport {
    pub value: f64,
    pub from: String,
    pub to: String,
    pub result: f64,
}

impl ConvertReport {
    pub fn to_markdown(&self) -> String {
        format!(
            "{} {} = {} {}\n",
            fmt_num(self.value),
            self.from,
            fmt_num(self.result),
            self.to
        )
    }
}

pub fn convert(value: f64, from: &str, to: &str) -> Result<ConvertReport, ConvertError> {
    let conversion = units::convert(value, from, to);
    if !conversion.converted {
        return Err(ConvertError::Incompatible {
            from: from.to_string(),
            to: to.to_string(),
        });
    }
    Ok(ConvertReport {
        value,
        from: from.to_string(),
        to: to.to_string(),
        result: conversion.value,
    })
}

/// Pretty JSON when `json` is set, otherwise the Markdown rendering.
pub fn render<T: Serialize>(
    value: &T,
    json: bool,
    markdown: fn(&T) -> String,
) -> Result<String, serde_json::Error> {
    if json {
        serde_json::to_string_pretty(value).map(|mut s| {
            s.push('\n');
            s
        })
    } else {
        Ok(markdown(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("factorscout").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn query_with_global_flags() {
        let cli = parse(&["query", "30t truck 75km", "--lang", "ko", "--json"]);
        assert_eq!(cli.lang, Lang::Ko);
        assert!(cli.json);
        assert!(matches!(cli.command, Command::Query { ref text } if text == "30t truck 75km"));
    }

    #[test]
    fn search_builds_transport_entity() {
        let cli = parse(&[
            "search", "--name", "rigid truck", "--quantity", "30", "--unit", "tonne", "--distance",
            "75",
        ]);
        let Command::Search(args) = cli.command else {
            panic!("expected search");
        };
        let entity = args.entity();
        assert_eq!(entity.quantity, Some(30.0));
        assert_eq!(entity.entity_type, Some(EntityType::Transport));
        let distance = entity.scenario.as_ref().and_then(|s| s.distance()).unwrap();
        assert_eq!((distance.value, distance.unit), (75.0, "km"));
    }

    #[test]
    fn explicit_type_is_kept() {
        let cli = parse(&["search", "--name", "bus", "--type", "general", "--distance", "3"]);
        let Command::Search(args) = cli.command else {
            panic!("expected search");
        };
        assert_eq!(args.entity().entity_type, Some(EntityType::General));
    }

    #[test]
    fn rejects_unknown_language() {
        assert!(Cli::try_parse_from(["factorscout", "--lang", "fr", "query", "x"]).is_err());
    }

    #[test]
    fn convert_tonnes() {
        let report = convert(5.0, "tonne", "kg").unwrap();
        assert_eq!(report.result, 5000.0);
        assert_eq!(report.to_markdown(), "5 tonne = 5000 kg\n");
        assert!(convert(1.0, "kg", "km").is_err());
    }

    #[test]
    fn render_switches_format() {
        let report = convert(2000.0, "g", "kg").unwrap();
        let md = render(&report, false, ConvertReport::to_markdown).unwrap();
        assert_eq!(md, "2000 g = 2 kg\n");
        let json = render(&report, true, ConvertReport::to_markdown).unwrap();
        assert!(json.contains("\"result\": 2.0"));
    }
}
