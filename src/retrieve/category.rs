use std::fmt;

use serde::Serialize;

use super::tokenize;
use crate::model::EntityType;

/// Coarse activity category used to pick catalog queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Liquid,
    Rail,
    Hgv,
    Truck,
    PassengerCar,
    Aviation,
    Marine,
    Waste,
    Electric,
    Energy,
    Transport,
}

/// A row of the category table: keywords that select it and the catalog
/// substring queries it runs, most specific first.
#[derive(Debug)]
pub struct CategoryRule {
    pub category: Category,
    pub keywords: &'static [&'static str],
    pub queries: &'static [&'static str],
}

/// Priority order: the first rule with a keyword hit wins.
pub static CATEGORY_RULES: &[CategoryRule] = &[
    CategoryRule {
        category: Category::Liquid,
        keywords: &[
            "wastewater", "waste water", "sewage", "effluent", "water", "liquid", "tap water",
            "drinking water", "폐수", "하수", "상수도",
        ],
        queries: &["wastewater", "waste water", "water"],
    },
    CategoryRule {
        category: Category::Rail,
        keywords: &["rail", "railway", "train", "freight train", "tram", "subway", "metro", "기차", "철도"],
        queries: &["freight train", "rail", "train"],
    },
    CategoryRule {
        category: Category::Hgv,
        keywords: &[
            "hgv", "heavy goods", "articulated", "artic", "tractor trailer", "semi truck",
            "wheeler",
        ],
        queries: &["HGV", "articulated", "heavy goods"],
    },
    CategoryRule {
        category: Category::Truck,
        keywords: &["truck", "rigid", "lorry", "lorries", "tipper", "pickup", "트럭", "화물차"],
        queries: &["rigid truck", "truck", "lorry", "HGV"],
    },
    CategoryRule {
        category: Category::PassengerCar,
        keywords: &[
            "car", "passenger car", "sedan", "suv", "hatchback", "taxi", "drove", "driving",
            "자동차", "승용차",
        ],
        queries: &["passenger car", "cars", "car"],
    },
    CategoryRule {
        category: Category::Aviation,
        keywords: &[
            "flight", "flew", "plane", "aircraft", "airplane", "aviation", "air freight",
            "airline", "비행기", "항공",
        ],
        queries: &["flight", "aircraft", "air freight", "aviation"],
    },
    CategoryRule {
        category: Category::Marine,
        keywords: &[
            "ship", "vessel", "ferry", "boat", "tanker", "barge", "maritime", "marine", "선박", "배편",
        ],
        queries: &["cargo ship", "ship", "vessel", "ferry"],
    },
    CategoryRule {
        category: Category::Waste,
        keywords: &[
            "waste", "garbage", "trash", "rubbish", "landfill", "incineration", "incinerated",
            "recycling", "recycled", "compost", "composting", "refuse", "쓰레기", "폐기물",
        ],
        queries: &["waste", "landfill", "incineration", "recycling"],
    },
    CategoryRule {
        category: Category::Electric,
        keywords: &["electric", "ev", "battery", "charging", "전기차", "배터리"],
        queries: &["battery electric", "electric", "battery"],
    },
    CategoryRule {
        category: Category::Energy,
        keywords: &[
            "electricity", "kwh", "grid", "power", "natural gas", "heating", "boiler", "전기", "가스",
        ],
        queries: &["electricity", "grid", "natural gas"],
    },
    CategoryRule {
        category: Category::Transport,
        keywords: &[
            "transport", "transportation", "freight", "haul", "hauled", "hauling", "delivery",
            "shipping", "logistics", "vehicle", "van", "bus", "운송", "배송",
        ],
        queries: &["freight", "transport", "van"],
    },
];

impl Category {
    pub fn rule(self) -> &'static CategoryRule {
        CATEGORY_RULES
            .iter()
            .find(|r| r.category == self)
            .unwrap_or(&CATEGORY_RULES[CATEGORY_RULES.len() - 1])
    }

    pub fn label(self) -> &'static str {
        match self {
            Category::Liquid => "liquid",
            Category::Rail => "rail",
            Category::Hgv => "hgv",
            Category::Truck => "truck",
            Category::PassengerCar => "passenger_car",
            Category::Aviation => "aviation",
            Category::Marine => "marine",
            Category::Waste => "waste",
            Category::Electric => "electric",
            Category::Energy => "energy",
            Category::Transport => "transport",
        }
    }

    /// Whether `text` (a record title or sector) belongs to this category.
    pub fn matches(self, text: &str) -> bool {
        keyword_hit(self.rule().keywords, &Normalized::new(text))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

struct Normalized {
    lower: String,
    /// Space-padded, singularised token string for whole-word phrase checks.
    padded: String,
}

impl Normalized {
    fn new(text: &str) -> Self {
        Self {
            lower: text.to_lowercase(),
            padded: format!(" {} ", tokenize(text).join(" ")),
        }
    }
}

fn keyword_hit(keywords: &[&str], text: &Normalized) -> bool {
    keywords.iter().any(|kw| {
        if kw.is_ascii() {
            let phrase = tokenize(kw).join(" ");
            !phrase.is_empty() && text.padded.contains(&format!(" {phrase} "))
        } else {
            text.lower.contains(kw)
        }
    })
}

/// Classify an entity name by keyword, falling back to the entity type hint.
pub fn classify(name: &str, hint: Option<EntityType>) -> Option<Category> {
    let text = Normalized::new(name);
    CATEGORY_RULES
        .iter()
        .find(|rule| keyword_hit(rule.keywords, &text))
        .map(|rule| rule.category)
        .or(match hint {
            Some(EntityType::Transport) => Some(Category::Transport),
            Some(EntityType::Waste) => Some(Category::Waste),
            Some(EntityType::Liquid) => Some(Category::Liquid),
            Some(EntityType::Energy) => Some(Category::Energy),
            Some(EntityType::Food | EntityType::General) | None => None,
        })
}
