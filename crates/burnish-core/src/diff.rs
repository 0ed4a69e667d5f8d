//! Unified diff rendering using the `similar` crate.

use similar::TextDiff;

/// Render a unified diff between `old` and `new`. Returns an empty string
/// when the inputs match.
pub fn unified(name: &str, old: &str, new: &str) -> String {
    if old == new {
        return String::new();
    }
    let diff = TextDiff::from_lines(old, new);
    diff.unified_diff()
        .context_radius(3)
        .header(&format!("a/{name}"), &format!("b/{name}"))
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_inputs_produce_nothing() {
        assert_eq!(unified("x.go", "a\nb\n", "a\nb\n"), "");
    }

    #[test]
    fn changed_line_shows_both_sides() {
        let out = unified("x.go", "a\nb\nc\n", "a\nB\nc\n");
        assert!(out.contains("-b"), "{out}");
        assert!(out.contains("+B"), "{out}");
        assert!(out.contains("a/x.go"), "{out}");
    }
}
