//! Small utility helpers used across modules.

/// Very small string templating.
/// Replaces `{key}` placeholders found in the template in one left-to-right
/// pass. Substituted values are copied verbatim and never rescanned, so a
/// value containing `{key}` text stays as written. Unknown placeholders and
/// stray braces are kept.
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = String::with_capacity(tpl.len());
  let mut rest = tpl;
  while let Some(open) = rest.find('{') {
    out.push_str(&rest[..open]);
    let after = &rest[open + 1..];
    let hit = after.find('}').and_then(|close| {
      let key = &after[..close];
      pairs.iter().find(|(k, _)| *k == key).map(|(_, v)| (*v, close))
    });
    match hit {
      Some((value, close)) => {
        out.push_str(value);
        rest = &after[close + 1..];
      }
      None => {
        out.push('{');
        rest = after;
      }
    }
  }
  out.push_str(rest);
  out
}

/// Strip a surrounding markdown code fence (```json ... ```) if the model added one.
pub fn strip_code_fences(s: &str) -> &str {
  let t = s.trim();
  let Some(rest) = t.strip_prefix("```") else { return t };
  let rest = rest.trim_start_matches(|c: char| c.is_ascii_alphabetic());
  rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Log-safe truncation for large strings.
/// Avoids spamming logs with huge request/response payloads.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.len() <= max {
    return s.to_string();
  }
  let mut cut = max;
  while !s.is_char_boundary(cut) { cut -= 1; }
  format!("{}… ({} bytes total)", &s[..cut], s.len())
}
