//! Percentage normalisation.

/// Parse a raw score or rate into a whole-number percentage.
///
/// Accepts `85`, `85%`, `85,5` and fractions such as `0.85`. Any magnitude
/// below 1 is read as a fraction and scaled by 100. The result is rounded
/// but not clamped: `130` comes back as `130`.
///
/// Returns `None` for missing, blank, non-numeric or non-finite input.
pub fn normalize_percentage(raw: Option<&str>) -> Option<i64> {
  let raw = raw?.trim();
  if raw.is_empty() {
    return None;
  }

  let cleaned = raw.replace('%', "").replace(',', ".");
  let value: f64 = cleaned.trim().parse().ok()?;
  if !value.is_finite() {
    return None;
  }

  let value = if value.abs() < 1.0 { value * 100.0 } else { value };
  Some(value.round() as i64)
}

#[cfg(test)]
mod tests {
  use super::normalize_percentage as n;

  #[test]
  fn plain_and_percent_forms() {
    assert_eq!(n(Some("85")), Some(85));
    assert_eq!(n(Some("85%")), Some(85));
    assert_eq!(n(Some(" 85 % ")), Some(85));
  }

  #[test]
  fn fractions_are_scaled() {
    assert_eq!(n(Some("0.85")), Some(85));
    assert_eq!(n(Some("0.92")), Some(92));
    assert_eq!(n(Some("0,5")), Some(50));
  }

  #[test]
  fn comma_decimals_round() {
    assert_eq!(n(Some("85,5")), Some(86));
    assert_eq!(n(Some("72,4%")), Some(72));
  }

  #[test]
  fn empty_and_missing_are_none() {
    assert_eq!(n(Some("")), None);
    assert_eq!(n(Some("   ")), None);
    assert_eq!(n(None), None);
  }

  #[test]
  fn junk_is_none() {
    assert_eq!(n(Some("abc")), None);
    assert_eq!(n(Some("85 points")), None);
    assert_eq!(n(Some("NaN")), None);
    assert_eq!(n(Some("inf")), None);
  }

  #[test]
  fn values_are_not_clamped() {
    assert_eq!(n(Some("130")), Some(130));
    assert_eq!(n(Some("-20")), Some(-20));
    assert_eq!(n(Some("1")), Some(1));
    assert_eq!(n(Some("0")), Some(0));
  }
}
