use crate::lang::Lang;

const EXTRACT_INSTRUCTIONS: &str = r#"You extract activities that emit greenhouse gases from a user's request.
Return only a JSON object with this shape:
{
  "intent": "calculate_emission" | "find_factor" | "other",
  "entities": [{
    "name": string,
    "quantity": number | null,
    "unit": string | null,
    "confidence": number between 0 and 1,
    "entityType": "transport" | "waste" | "liquid" | "food" | "energy" | "general",
    "scenarioDetails": object | null
  }],
  "missingInfo": [string],
  "confidence": number between 0 and 1
}
scenarioDetails keys by entityType:
- transport: vehicleType, vehicleCount, fuelType, cargoType, loadStatus, distance, distanceUnit, weight, weightUnit
- waste: wasteType, processingMethod, weight, weightUnit
- liquid: liquidType, processingMethod, volume, volumeUnit
- energy devices: deviceType, deviceCount, usage, usageUnit
Rules:
- "name" is a short catalog-style description of the activity, e.g. "rigid diesel truck container transport".
- "quantity" is a magnitude the user actually stated. Never take it from a size class or range
  such as "26-32t", "3.5-7.5 tonnes" or "50% laden".
- For freight, put the cargo mass in "quantity"/"unit" and the distance in scenarioDetails.
- One entity per distinct activity. List anything needed for a calculation but absent in "missingInfo"."#;

const STRATEGY_INSTRUCTIONS: &str = r#"You help locate an emission factor in a catalog organised by sector and subsector.
Return only a JSON object: {"sector": string | null, "subsector": string | null, "keywords": [string]}
"sector" must be copied exactly from the list of sectors below, or null when none fits.
"keywords" are up to five short English terms likely to appear in the factor title."#;

pub fn extraction(query: &str, lang: Lang) -> String {
    lang.apply_to_prompt(&format!("{EXTRACT_INSTRUCTIONS}\n\nRequest:\n{query}"))
}

pub fn strategy(name: &str, sectors: &[String], lang: Lang) -> String {
    let sectors = sectors
        .iter()
        .map(|s| format!("- {s}"))
        .collect::<Vec<_>>()
        .join("\n");
    lang.apply_to_prompt(&format!(
        "{STRATEGY_INSTRUCTIONS}\n\nSectors:\n{sectors}\n\nActivity:\n{name}"
    ))
}
