use chrono::{DateTime, Utc};

use crate::Embedding;

/// A named person with the embeddings captured for them.
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    /// Canonical key derived from the display name, see [`identity_id`].
    pub id: String,

    /// Name as the user entered it.
    pub display_name: String,

    /// Captured embeddings in capture order.
    pub embeddings: Vec<Embedding>,

    pub created_at: DateTime<Utc>,

    /// Last time this identity was trained or recognized.
    pub last_seen_at: Option<DateTime<Utc>>,
}

impl Identity {
    /// Number of stored embeddings.
    pub fn sample_count(&self) -> usize {
        self.embeddings.len()
    }
}

/// Derives the canonical identity key from a display name.
///
/// Trims leading and trailing whitespace, so " Jane" and "Jane" share the
/// key `jane`. Then lowercases, collapses each remaining whitespace run into
/// `_`, and drops every character outside `[a-z0-9_]`. Different names may
/// map to the same key ("Jane Doe" and "jane  doe!") and then denote the
/// same identity. Names with no ASCII letters or digits ("李雷") map to the
/// empty key.
pub fn identity_id(display_name: &str) -> String {
    let mut out = String::with_capacity(display_name.len());
    let mut in_space = false;
    for c in display_name.trim().chars().flat_map(char::to_lowercase) {
        if c.is_whitespace() {
            if !in_space {
                out.push('_');
            }
            in_space = true;
            continue;
        }
        in_space = false;
        if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_from_simple_name() {
        assert_eq!(identity_id("Jane Doe"), "jane_doe");
        assert_eq!(identity_id("bob"), "bob");
    }

    #[test]
    fn id_collapses_whitespace_runs() {
        assert_eq!(identity_id("Jane \t  Doe"), "jane_doe");
        assert_eq!(identity_id("  Jane Doe  "), "jane_doe");
    }

    #[test]
    fn id_strips_other_characters() {
        assert_eq!(identity_id("O'Brien-Smith 2nd"), "obriensmith_2nd");
        assert_eq!(identity_id("Zoë"), "zo");
        assert_eq!(identity_id("!!!"), "");
        assert_eq!(identity_id("李雷"), "");
    }

    #[test]
    fn id_ignores_surrounding_whitespace() {
        assert_eq!(identity_id(" Jane"), "jane");
        assert_eq!(identity_id("Jane\n"), identity_id("Jane"));
    }

    #[test]
    fn colliding_names_share_an_id() {
        assert_eq!(identity_id("Jane Doe"), identity_id("jane  doe!"));
    }
}
