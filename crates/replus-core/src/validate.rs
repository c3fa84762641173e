//! Field-level validation for raw form input.
//!
//! Messages match the wording users of the original web forms saw.

use rust_decimal::Decimal;

use crate::error::FieldErrors;
use crate::types::LineForm;

pub const MAX_NAME_LENGTH: usize = 50;
pub const MAX_DIGITS: u32 = 5;
pub const DECIMAL_PLACES: u32 = 2;

const REQUIRED: &str = "This field is required.";
const NOT_NEGATIVE: &str = "Ensure this value is greater than or equal to 0.";

/// Case-folded form of a name, used for case-insensitive uniqueness.
pub fn fold_name(name: &str) -> String {
    name.to_lowercase()
}

/// Trim and check a session or exercise name.
pub fn clean_name(raw: &str) -> Result<String, FieldErrors> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(FieldErrors::single("name", REQUIRED));
    }

    let length = name.chars().count();
    if length > MAX_NAME_LENGTH {
        return Err(FieldErrors::single(
            "name",
            format!(
                "Ensure this value has at most {} characters (it has {}).",
                MAX_NAME_LENGTH, length
            ),
        ));
    }

    Ok(name.to_string())
}

/// Parse and check the weight and reps of a line.
pub fn clean_line(form: &LineForm) -> Result<(Decimal, i32), FieldErrors> {
    let mut errors = FieldErrors::new();
    let weight = clean_weight(&form.weight, &mut errors);
    let reps = clean_reps(&form.reps, &mut errors);

    match (weight, reps) {
        (Some(weight), Some(reps)) if errors.is_empty() => Ok((weight, reps)),
        _ => Err(errors),
    }
}

fn clean_weight(raw: &str, errors: &mut FieldErrors) -> Option<Decimal> {
    let raw = raw.trim();
    if raw.is_empty() {
        errors.add("weight", REQUIRED);
        return None;
    }

    // Inputs that would lose precision are rejected rather than rounded.
    let Ok(value) = Decimal::from_str_exact(raw) else {
        errors.add("weight", "Enter a number.");
        return None;
    };

    if let Some(message) = check_decimal_shape(value) {
        errors.add("weight", message);
        return None;
    }

    if value.is_sign_negative() && !value.is_zero() {
        errors.add("weight", NOT_NEGATIVE);
        return None;
    }

    let mut weight = value;
    weight.rescale(DECIMAL_PLACES);
    Some(weight)
}

/// Enforce decimal(5,2): at most 5 digits, 2 of them after the point.
///
/// Digits are counted as written, so trailing zeros after the point count.
fn check_decimal_shape(value: Decimal) -> Option<String> {
    let scale = value.scale();
    let mantissa_digits = value.mantissa().unsigned_abs().to_string().len() as u32;

    let (digits, decimals) = if scale > mantissa_digits {
        (scale, scale)
    } else {
        (mantissa_digits, scale)
    };
    let whole_digits = digits - decimals;

    if digits > MAX_DIGITS {
        Some(format!(
            "Ensure that there are no more than {} digits in total.",
            MAX_DIGITS
        ))
    } else if decimals > DECIMAL_PLACES {
        Some(format!(
            "Ensure that there are no more than {} decimal places.",
            DECIMAL_PLACES
        ))
    } else if whole_digits > MAX_DIGITS - DECIMAL_PLACES {
        Some(format!(
            "Ensure that there are no more than {} digits before the decimal point.",
            MAX_DIGITS - DECIMAL_PLACES
        ))
    } else {
        None
    }
}

fn clean_reps(raw: &str, errors: &mut FieldErrors) -> Option<i32> {
    let raw = raw.trim();
    if raw.is_empty() {
        errors.add("reps", REQUIRED);
        return None;
    }

    let Ok(reps) = raw.parse::<i32>() else {
        errors.add("reps", "Enter a whole number.");
        return None;
    };

    if reps < 0 {
        errors.add("reps", NOT_NEGATIVE);
        return None;
    }

    Some(reps)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_name_trims() {
        assert_eq!(clean_name("  Push Day ").unwrap(), "Push Day");
    }

    #[test]
    fn test_clean_name_required() {
        let errors = clean_name("   ").unwrap_err();
        assert_eq!(errors.get("name").unwrap(), ["This field is required."]);
    }

    #[test]
    fn test_clean_name_too_long() {
        let long = "x".repeat(51);
        let errors = clean_name(&long).unwrap_err();
        assert_eq!(
            errors.get("name").unwrap(),
            ["Ensure this value has at most 50 characters (it has 51)."]
        );
        assert!(clean_name(&"x".repeat(50)).is_ok());
    }

    #[test]
    fn test_fold_name_is_case_insensitive() {
        assert_eq!(fold_name("Leg Day"), fold_name("leg day"));
        assert_eq!(fold_name("LEG DAY"), "leg day");
    }

    #[test]
    fn test_clean_line_valid() {
        let (weight, reps) = clean_line(&LineForm::new("102.5", "8")).unwrap();
        assert_eq!(weight.to_string(), "102.50");
        assert_eq!(reps, 8);

        let (weight, _) = clean_line(&LineForm::new(" 100 ", " 10 ")).unwrap();
        assert_eq!(weight.to_string(), "100.00");
    }

    #[test]
    fn test_clean_line_non_numeric() {
        let errors = clean_line(&LineForm::new("heavy", "lots")).unwrap_err();
        assert_eq!(errors.get("weight").unwrap(), ["Enter a number."]);
        assert_eq!(errors.get("reps").unwrap(), ["Enter a whole number."]);
    }

    #[test]
    fn test_clean_line_missing_fields() {
        let errors = clean_line(&LineForm::new("", "")).unwrap_err();
        assert_eq!(errors.get("weight").unwrap(), ["This field is required."]);
        assert_eq!(errors.get("reps").unwrap(), ["This field is required."]);
    }

    #[test]
    fn test_clean_line_decimal_limits() {
        let errors = clean_line(&LineForm::new("1234.5", "5")).unwrap_err();
        assert_eq!(
            errors.get("weight").unwrap(),
            ["Ensure that there are no more than 3 digits before the decimal point."]
        );

        let errors = clean_line(&LineForm::new("12.345", "5")).unwrap_err();
        assert_eq!(
            errors.get("weight").unwrap(),
            ["Ensure that there are no more than 2 decimal places."]
        );

        let errors = clean_line(&LineForm::new("123456", "5")).unwrap_err();
        assert_eq!(
            errors.get("weight").unwrap(),
            ["Ensure that there are no more than 5 digits in total."]
        );

        assert!(clean_line(&LineForm::new("999.99", "5")).is_ok());
        assert!(clean_line(&LineForm::new("0.05", "5")).is_ok());
        assert!(clean_line(&LineForm::new("100.00", "5")).is_ok());
    }

    #[test]
    fn test_clean_line_counts_trailing_zeros() {
        let errors = clean_line(&LineForm::new("12.340", "5")).unwrap_err();
        assert_eq!(
            errors.get("weight").unwrap(),
            ["Ensure that there are no more than 2 decimal places."]
        );

        let errors = clean_line(&LineForm::new("100.000", "5")).unwrap_err();
        assert_eq!(
            errors.get("weight").unwrap(),
            ["Ensure that there are no more than 2 decimal places."]
        );
    }

    #[test]
    fn test_clean_line_rejects_unrepresentable_weight() {
        let errors =
            clean_line(&LineForm::new("0.000000000000000000000000000001", "5")).unwrap_err();
        assert_eq!(errors.get("weight").unwrap(), ["Enter a number."]);
    }

    #[test]
    fn test_clean_line_rejects_negative() {
        let errors = clean_line(&LineForm::new("-5", "-1")).unwrap_err();
        assert_eq!(
            errors.get("weight").unwrap(),
            ["Ensure this value is greater than or equal to 0."]
        );
        assert_eq!(
            errors.get("reps").unwrap(),
            ["Ensure this value is greater than or equal to 0."]
        );
    }

    #[test]
    fn test_clean_line_only_bad_field_reported() {
        let errors = clean_line(&LineForm::new("80", "ten")).unwrap_err();
        assert!(errors.get("weight").is_none());
        assert_eq!(errors.get("reps").unwrap(), ["Enter a whole number."]);
    }
}
