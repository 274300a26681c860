//! Label text normalization shared by the matcher and the validator

/// Lowercase and collapse every run of non-alphanumeric characters into `sep`
fn collapse(s: &str, sep: char) -> String {
    let mut out = String::with_capacity(s.len());
    let mut pending_sep = false;

    for c in s.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push(sep);
            }
            pending_sep = false;
            out.push(c);
        } else {
            pending_sep = true;
        }
    }

    out
}

/// `"Tomato - Late Blight"` -> `"tomato_late_blight"`
pub fn squash(s: &str) -> String {
    collapse(s, '_')
}

/// `"Tomato___Late_blight"` -> `"tomato late blight"`
pub fn spaced(s: &str) -> String {
    collapse(s, ' ')
}

/// Whole-word phrase containment over `spaced` text
pub fn contains_phrase(haystack: &str, phrase: &str) -> bool {
    if phrase.is_empty() {
        return false;
    }
    format!(" {} ", haystack).contains(&format!(" {} ", phrase))
}

/// Remove parenthetical qualifiers: `"corn (maize)"` -> `"corn "`
pub fn strip_parenthetical(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut depth = 0usize;

    for c in s.chars() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }

    out
}

/// Top-level parenthetical contents: `"Esca_(Black_Measles)"` -> `["Black_Measles"]`
pub fn parenthetical_contents(s: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;

    for c in s.chars() {
        match c {
            '(' => {
                if depth > 0 {
                    current.push(c);
                }
                depth += 1;
            }
            ')' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    out.push(std::mem::take(&mut current));
                } else {
                    current.push(c);
                }
            }
            ')' => {}
            _ if depth > 0 => current.push(c),
            _ => {}
        }
    }

    out
}

/// Uppercase the first letter of every space-separated word
pub fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Make a raw classifier label presentable: underscores to spaces, whitespace collapsed
pub fn tidy_label(s: &str) -> String {
    s.replace('_', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
