use anyhow::{anyhow, Result};
use tracing::warn;

use crate::db::Product;
use crate::extract::RawFields;

/// Token the menu page shows when a nutrient value is not published.
pub const NOT_AVAILABLE: &str = "N/A";

/// Unit suffix on the calories value ("250 ккал").
pub const CALORIE_UNIT: &str = "ккал";
/// Unit suffix on gram-denominated values ("12.5 г/g").
pub const GRAM_UNIT: &str = "г/g";

/// Collapse whitespace runs to single spaces and trim the ends.
///
/// NBSP (U+00A0) counts as whitespace here, so values copy-pasted out of the
/// nutrition table lose their non-breaking padding too.
pub fn clean_text(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Strip one occurrence of `unit` and parse the rest as a float.
///
/// The sentinel is only ever shown without a unit suffix, so the suffix is
/// removed first and the remainder compared against it. "N/A" maps to
/// `Ok(None)`; anything else that fails to parse is an error the caller must
/// surface (it means the page structure shifted under the selector).
pub fn parse_float(raw: &str, unit: &str) -> Result<Option<f64>> {
    let stripped = raw.trim().replacen(unit, "", 1);
    let rest = stripped.trim();
    if rest == NOT_AVAILABLE {
        return Ok(None);
    }
    rest.parse::<f64>()
        .map(Some)
        .map_err(|_| anyhow!("cannot parse {:?} as a number", rest))
}

/// Strip one occurrence of `unit` and parse the rest as an integer.
///
/// A literal "0" remainder is accepted before the sentinel check; the source
/// renders explicit zeroes that way and they must not fall through to the
/// "no value" path. Unlike `parse_float`, a malformed remainder is logged and
/// softened to `None` so one broken nutrient cell cannot sink the item.
pub fn parse_int(raw: &str, unit: &str) -> Option<i64> {
    let stripped = raw.trim().replacen(unit, "", 1);
    let rest = stripped.trim();
    if rest == "0" {
        return Some(0);
    }
    if rest == NOT_AVAILABLE {
        return None;
    }
    match rest.parse::<f64>() {
        Ok(v) => Some(v.trunc() as i64),
        Err(_) => {
            warn!("Unable to convert {:?} to int", rest);
            None
        }
    }
}

/// Assemble a `Product` from raw extracted fields.
///
/// NBSP substitution is applied across every raw field up front, then each
/// field goes through its own conversion. Float parse failures propagate so
/// the orchestrator can drop the item; the int path never errors.
pub fn build_product(mut raw: RawFields) -> Result<Product> {
    raw.replace_nbsp();
    Ok(Product {
        calories: parse_int(&raw.calories, CALORIE_UNIT),
        fats: parse_float(&raw.fats, GRAM_UNIT)?,
        proteins: parse_float(&raw.proteins, GRAM_UNIT)?,
        unsaturated_fats: clean_text(&raw.unsaturated_fats),
        sugar: clean_text(&raw.sugar),
        salt: clean_text(&raw.salt),
        portion: clean_text(&raw.portion),
        name: raw.name,
        description: raw.description,
    })
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_text_collapses_runs_and_nbsp() {
        let out = clean_text(" Біг\u{a0}\u{a0}Мак   меню \t\n 2x");
        assert_eq!(out, "Біг Мак меню 2x");
        assert!(!out.contains('\u{a0}'));
        assert!(!out.contains("  "));
    }

    #[test]
    fn clean_text_empty_is_empty() {
        assert_eq!(clean_text(""), "");
        assert_eq!(clean_text("   \u{a0} "), "");
    }

    #[test]
    fn parse_float_strips_unit() {
        assert_eq!(parse_float(" 12.5 г/g", GRAM_UNIT).unwrap(), Some(12.5));
    }

    #[test]
    fn parse_float_sentinel_is_none() {
        assert_eq!(parse_float(" N/A", GRAM_UNIT).unwrap(), None);
    }

    #[test]
    fn parse_float_malformed_is_error() {
        assert!(parse_float(" abc г/g", GRAM_UNIT).is_err());
        assert!(parse_float("", GRAM_UNIT).is_err());
    }

    #[test]
    fn parse_int_strips_unit() {
        assert_eq!(parse_int(" 250 ккал", CALORIE_UNIT), Some(250));
    }

    #[test]
    fn parse_int_literal_zero() {
        assert_eq!(parse_int(" 0", ""), Some(0));
        assert_eq!(parse_int("0 ккал", CALORIE_UNIT), Some(0));
    }

    #[test]
    fn parse_int_sentinel_is_none() {
        assert_eq!(parse_int(" N/A", CALORIE_UNIT), None);
    }

    #[test]
    fn parse_int_truncates_toward_zero() {
        assert_eq!(parse_int("12.9 ккал", CALORIE_UNIT), Some(12));
        assert_eq!(parse_int("-3.7", ""), Some(-3));
    }

    #[test]
    fn parse_int_malformed_softens_to_none() {
        assert_eq!(parse_int("abc", CALORIE_UNIT), None);
        assert_eq!(parse_int("", CALORIE_UNIT), None);
    }

    #[test]
    fn build_product_replaces_nbsp_everywhere() {
        let raw = RawFields {
            name: "Біг\u{a0}Мак".into(),
            description: "опис\u{a0}страви".into(),
            calories: "250\u{a0}ккал".into(),
            fats: "12.5\u{a0}г/g".into(),
            proteins: "N/A".into(),
            unsaturated_fats: "5\u{a0}г/g".into(),
            sugar: "N/A".into(),
            salt: "1.2 г/g".into(),
            portion: "210\u{a0}г/g".into(),
        };
        let p = build_product(raw).unwrap();
        assert_eq!(p.name, "Біг Мак");
        assert_eq!(p.description, "опис страви");
        assert_eq!(p.calories, Some(250));
        assert_eq!(p.fats, Some(12.5));
        assert_eq!(p.proteins, None);
        assert_eq!(p.unsaturated_fats, "5 г/g");
        assert_eq!(p.portion, "210 г/g");
    }

    #[test]
    fn build_product_bad_float_field_errors() {
        let raw = RawFields {
            fats: "жир".into(),
            proteins: "1 г/g".into(),
            ..RawFields::default()
        };
        assert!(build_product(raw).is_err());
    }
}
