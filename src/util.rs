//! Small utility helpers used across modules.

/// Split a comma-separated `tags` query value.
/// No trimming and no dropping of empty parts: `""` yields `[""]`, which the
/// exact-match filter counts as one requested tag.
pub fn split_tags(raw: &str) -> Vec<String> {
  raw.split(',').map(str::to_string).collect()
}

/// Log-safe truncation for large strings.
/// Avoids spamming logs with huge upstream error bodies.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.len() <= max {
    return s.to_string();
  }
  let mut end = max;
  while !s.is_char_boundary(end) {
    end -= 1;
  }
  format!("{}… ({} bytes total)", &s[..end], s.len())
}
