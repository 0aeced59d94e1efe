//! Small utility helpers used across modules.

/// Very small and safe string templating.
/// Replaces occurrences of `{key}` in the template with provided values.
/// This is intentionally simple (no nested/conditional logic).
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = tpl.to_string();
  for (k, v) in pairs {
    let needle = format!("{{{}}}", k);
    out = out.replace(&needle, v);
  }
  out
}

/// Round to two decimal places for percentage fields in API responses.
pub fn round2(x: f64) -> f64 {
  (x * 100.0).round() / 100.0
}

/// Log-safe truncation for large strings.
/// Avoids spamming logs with huge prompt/response payloads.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.chars().count() <= max {
    s.to_string()
  } else {
    let head: String = s.chars().take(max).collect();
    format!("{}… ({} bytes total)", head, s.len())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fill_template_replaces_all_occurrences() {
    let out = fill_template("{lang} day {day}: learn {lang}", &[("lang", "Rust"), ("day", "3")]);
    assert_eq!(out, "Rust day 3: learn Rust");
  }

  #[test]
  fn fill_template_leaves_unknown_keys_alone() {
    let out = fill_template("keep {this}", &[("other", "x")]);
    assert_eq!(out, "keep {this}");
  }

  #[test]
  fn round2_keeps_two_decimals() {
    assert_eq!(round2(200.0 / 3.0), 66.67);
    assert_eq!(round2(100.0 / 3.0), 33.33);
    assert_eq!(round2(50.0), 50.0);
  }

  #[test]
  fn trunc_for_log_respects_char_boundaries() {
    let s = "Количество правильных ответов";
    let t = trunc_for_log(s, 10);
    assert!(t.starts_with("Количество"));
    assert!(t.contains("bytes total"));
  }
}
