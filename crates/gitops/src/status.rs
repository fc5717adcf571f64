//! `git status --porcelain` (v1) parsing

use std::fmt;

/// One changed path as reported by porcelain status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    /// Two-column XY status code, e.g. `" M"`, `"??"`, `"R "`
    pub code: String,
    /// Path (the new path for renames)
    pub path: String,
    /// Original path for renames and copies
    pub original: Option<String>,
}

impl StatusEntry {
    pub fn is_untracked(&self) -> bool {
        self.code == "??"
    }
}

impl fmt::Display for StatusEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.original {
            Some(original) => write!(f, "{} {} -> {}", self.code, original, self.path),
            None => write!(f, "{} {}", self.code, self.path),
        }
    }
}

/// Parse porcelain v1 output; blank and malformed lines are skipped
pub fn parse_porcelain(output: &str) -> Vec<StatusEntry> {
    output.lines().filter_map(parse_line).collect()
}

fn parse_line(line: &str) -> Option<StatusEntry> {
    if line.len() < 4 || !line.is_char_boundary(2) || line.as_bytes()[2] != b' ' {
        return None;
    }
    let code = line[..2].to_string();
    let rest = &line[3..];

    let (original, path) = match rest.split_once(" -> ") {
        Some((from, to)) if code.contains('R') || code.contains('C') => {
            (Some(unquote(from)), unquote(to))
        }
        _ => (None, unquote(rest)),
    };

    Some(StatusEntry { code, path, original })
}

/// Strip the quotes git adds around paths with unusual characters
fn unquote(path: &str) -> String {
    path.strip_prefix('"')
        .and_then(|p| p.strip_suffix('"'))
        .unwrap_or(path)
        .to_string()
}
