use serde_json::Value;

/// One step in a path through a JSON document.
#[derive(Debug, Clone, Copy)]
pub enum Step {
    Key(&'static str),
    Index(usize),
}

/// Follows `path` from `root`. JSON `null` counts as absent.
pub fn probe<'a>(root: &'a Value, path: &[Step]) -> Option<&'a Value> {
    let mut current = root;
    for step in path {
        current = match *step {
            Step::Key(k) => current.get(k)?,
            Step::Index(i) => current.get(i)?,
        };
    }
    (!current.is_null()).then_some(current)
}

/// Like [`probe`], but only yields non-empty strings.
pub fn probe_str<'a>(root: &'a Value, path: &[Step]) -> Option<&'a str> {
    probe(root, path)?.as_str().filter(|s| !s.is_empty())
}

/// Finds `"<field>":"..."` anywhere in `text` and decodes the JSON string
/// value, so `&`, `\/` and friends come back as real characters.
pub fn find_string_field(text: &str, field: &str) -> Option<String> {
    let needle = format!("\"{field}\":");
    let mut search_from = 0;

    while let Some(pos) = text[search_from..].find(&needle) {
        let value_start = search_from + pos + needle.len();
        let rest = text[value_start..].trim_start();
        let offset = text.len() - rest.len();

        if rest.starts_with('"') {
            if let Some(literal) = string_literal_at(text, offset) {
                if let Ok(decoded) = serde_json::from_str::<String>(literal) {
                    if !decoded.is_empty() {
                        return Some(decoded);
                    }
                }
            }
        }
        search_from = value_start;
    }

    None
}

/// Returns the full JSON string literal (quotes included) starting at `start`.
fn string_literal_at(text: &str, start: usize) -> Option<&str> {
    let bytes = text.as_bytes();
    if bytes.get(start) != Some(&b'"') {
        return None;
    }

    let mut i = start + 1;
    let mut escape = false;
    while i < bytes.len() {
        if escape {
            escape = false;
        } else if bytes[i] == b'\\' {
            escape = true;
        } else if bytes[i] == b'"' {
            return Some(&text[start..=i]);
        }
        i += 1;
    }
    None
}

/// Locates the first `"<field>":` followed by an object and returns that
/// object's source text. Occurrences holding `null` or a scalar are skipped.
pub fn find_object_field<'a>(text: &'a str, field: &str) -> Option<&'a str> {
    let needle = format!("\"{field}\":");
    let mut search_from = 0;

    while let Some(pos) = text[search_from..].find(&needle) {
        let value_start = search_from + pos + needle.len();
        let rest = text[value_start..].trim_start();
        if rest.starts_with('{') {
            if let Some(object) = balanced_object_at(text, text.len() - rest.len()) {
                return Some(object);
            }
        }
        search_from = value_start;
    }

    None
}

/// The object starting at `obj_start`, tracking brace depth and skipping
/// braces inside strings.
fn balanced_object_at(text: &str, obj_start: usize) -> Option<&str> {
    let mut depth: u32 = 0;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in text[obj_start..].char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        if ch == '\\' && in_string {
            escape_next = true;
            continue;
        }
        if ch == '"' {
            in_string = !in_string;
            continue;
        }
        if in_string {
            continue;
        }

        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[obj_start..obj_start + i + 1]);
                }
            }
            _ => {}
        }
    }

    None
}
