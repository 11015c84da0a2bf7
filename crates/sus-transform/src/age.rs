//! Age, race and numeric column decoding.

use sus_model::{RecordTable, Result};
use tracing::info;

pub const NO_INFORMATION: &str = "s/informação";
pub const OLDEST_GROUP: &str = "80+";
const YOUNGEST_GROUP: &str = "0-9";

fn decade_group(years: u32) -> String {
    if years >= 80 {
        return OLDEST_GROUP.to_string();
    }
    let start = years / 10 * 10;
    format!("{start}-{}", start + 9)
}

/// Decode a SIM age value into `(age label, age group)`.
///
/// The first digit is the unit: 0 seconds, 1 minutes, 2 hours, 3 months,
/// 4 years, 5 years above 100. Empty or unreadable values have no age and
/// fall in the "no information" group.
pub fn convert_age(raw: &str) -> (String, String) {
    let raw = raw.trim();
    match raw {
        "1 d" => return ("24 horas".to_string(), YOUNGEST_GROUP.to_string()),
        "0" => return ("0 segundos".to_string(), YOUNGEST_GROUP.to_string()),
        _ => {}
    }
    let decoded = raw.split_at_checked(1).and_then(|(unit, number)| {
        if number.is_empty() || !number.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let number: u32 = number.parse().ok()?;
        let decoded = match unit {
            "0" => (format!("{number} segundos"), YOUNGEST_GROUP.to_string()),
            "1" => (format!("{number} minutos"), YOUNGEST_GROUP.to_string()),
            "2" => (format!("{number} horas"), YOUNGEST_GROUP.to_string()),
            "3" => (format!("{number} meses"), YOUNGEST_GROUP.to_string()),
            "4" => (format!("{number} anos"), decade_group(number)),
            "5" => (format!("{} anos", number.checked_add(100)?), OLDEST_GROUP.to_string()),
            _ => return None,
        };
        Some(decoded)
    });
    decoded.unwrap_or_else(|| (String::new(), NO_INFORMATION.to_string()))
}

/// Age group of a plain age in years; unreadable values count as 0.
pub fn build_age_group(raw: &str) -> String {
    let years = raw.trim().parse::<i64>().unwrap_or(0).max(0);
    decade_group(u32::try_from(years).unwrap_or(u32::MAX))
}

/// SIVEP race code -> label.
pub fn build_race(raw: &str) -> &'static str {
    match raw.trim() {
        "1" => "branca",
        "2" => "preta",
        "3" => "amarela",
        "4" => "parda",
        "5" => "indígena",
        "9" => "ignorado",
        _ => NO_INFORMATION,
    }
}

/// Canonical integer text: placeholders and non-integers become empty.
pub fn normalize_numeric(raw: &str, placeholders: &[&str]) -> String {
    let raw = raw.trim();
    if placeholders.contains(&raw) {
        return String::new();
    }
    raw.parse::<i64>()
        .map(|value| value.to_string())
        .unwrap_or_default()
}

/// Rewrite a numeric column in place. Returns the number of placeholders
/// removed.
pub fn normalize_numeric_column(
    table: &mut RecordTable,
    column: &str,
    placeholders: &[&str],
) -> Result<usize> {
    let idx = table.require_column(column, "numeric columns")?;
    let mut removed = 0usize;
    for row in &mut table.rows {
        if placeholders.contains(&row[idx].trim()) {
            removed += 1;
        }
        row[idx] = normalize_numeric(&row[idx], placeholders);
    }
    info!(column, removed, "placeholder values removed");
    Ok(removed)
}

/// Replace the age column with its decoded label and fill `group_column`.
pub fn decode_age_column(table: &mut RecordTable, column: &str, group_column: &str) -> Result<()> {
    let idx = table.require_column(column, "age")?;
    let (labels, groups): (Vec<String>, Vec<String>) =
        table.column_values(idx).map(convert_age).unzip();
    table.set_column(column, labels)?;
    table.set_column(group_column, groups)?;
    Ok(())
}
