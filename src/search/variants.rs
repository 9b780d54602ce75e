use std::sync::LazyLock;

use regex::Regex;

/// A dash used as a separator: spaced on at least one side.
static SEPARATOR_DASH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*[-–—]\s+|\s+[-–—]\s*").unwrap());
static COMMA: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s*,\s*").unwrap());

/// Spellings of `name` to try against the catalog's exact-title lookup, verbatim first.
pub fn exact_variants(name: &str) -> Vec<String> {
    let trimmed = name.trim();
    let collapsed = collapse_whitespace(trimmed);
    let punctuated = collapse_punctuation(&collapsed);
    let folded = punctuated.to_lowercase();

    let mut variants: Vec<String> = Vec::with_capacity(5);
    for candidate in [name.to_string(), trimmed.to_string(), collapsed, punctuated, folded] {
        if !candidate.trim().is_empty() && !variants.contains(&candidate) {
            variants.push(candidate);
        }
    }
    variants
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Separator dashes become `" - "` and commas `", "`, the catalog's title style.
fn collapse_punctuation(text: &str) -> String {
    let dashed = SEPARATOR_DASH.replace_all(text, " - ");
    COMMA.replace_all(&dashed, ", ").into_owned()
}
