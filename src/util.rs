//! Small utility helpers used across modules.

/// Very small and safe string templating.
/// Replaces occurrences of `{key}` in the template with provided values.
/// Single pass: placeholders inside substituted values are not expanded again.
/// No nested/conditional logic; unknown placeholders are left as-is.
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = String::with_capacity(tpl.len());
  let mut rest = tpl;
  while let Some(open) = rest.find('{') {
    out.push_str(&rest[..open]);
    let tail = &rest[open..];
    let hit = pairs.iter().find(|(k, _)| {
      tail.len() > k.len() + 1 && tail[1..].starts_with(*k) && tail[1 + k.len()..].starts_with('}')
    });
    match hit {
      Some((k, v)) => {
        out.push_str(v);
        rest = &tail[k.len() + 2..];
      }
      None => {
        out.push('{');
        rest = &tail[1..];
      }
    }
  }
  out.push_str(rest);
  out
}

/// Trim and drop empty strings: `Some("  ")` becomes `None`.
pub fn non_blank(s: Option<&str>) -> Option<String> {
  s.map(str::trim).filter(|t| !t.is_empty()).map(str::to_string)
}

/// Log-safe truncation for large strings (cuts on a char boundary).
/// Avoids spamming logs with huge model payloads.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.len() <= max {
    return s.to_string();
  }
  let mut cut = max;
  while !s.is_char_boundary(cut) {
    cut -= 1;
  }
  format!("{}… ({} bytes total)", &s[..cut], s.len())
}

/// Rounded completion percentage; 0 when there is nothing to complete.
pub fn calculate_progress(completed: usize, total: usize) -> u8 {
  if total == 0 {
    return 0;
  }
  let pct = (completed as f64 / total as f64 * 100.0).round();
  pct.clamp(0.0, 100.0) as u8
}
