//! Canonical source formatting.
//!
//! Applied to every rewritten file before it is stored, so that edits that
//! splice, delete, or copy lines leave no scars. The formatter is
//! line-based: it re-indents by nesting depth (tabs, labels and case arms
//! outdented one step), trims trailing whitespace, collapses runs of blank
//! lines, and removes a blank line directly after `{` or directly before
//! `}`. Raw-string and block-comment interiors pass through untouched.
//!
//! Formatting is idempotent: format(format(s)) == format(s).

/// Per-line lexical scan state that survives line boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Carry {
    None,
    RawString,
    BlockComment,
}

pub fn format_source(src: &str) -> String {
    // (text, verbatim) — verbatim lines sit inside a raw string or block
    // comment and are exempt from every cosmetic rule.
    let mut out_lines: Vec<(String, bool)> = Vec::new();
    let mut depth: i32 = 0;
    let mut group: i32 = 0; // parens and brackets
    let mut carry = Carry::None;

    for line in src.lines() {
        if carry != Carry::None {
            out_lines.push((line.to_string(), true));
            let (d, g, c) = scan_line(line, depth, group, carry);
            depth = d;
            group = g;
            carry = c;
            continue;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            out_lines.push((String::new(), false));
            continue;
        }

        let closers = leading_closers(trimmed);
        let mut indent = depth + group - closers;
        if is_label_line(trimmed) || is_case_line(trimmed) {
            indent -= 1;
        }
        let indent = indent.max(0) as usize;
        let mut formatted = String::with_capacity(indent + trimmed.len());
        for _ in 0..indent {
            formatted.push('\t');
        }
        formatted.push_str(trimmed);
        out_lines.push((formatted, false));

        let (d, g, c) = scan_line(line, depth, group, carry);
        depth = d;
        group = g;
        carry = c;
    }

    collapse_blanks(&mut out_lines);

    let mut out = String::with_capacity(src.len());
    for (i, (line, _)) in out_lines.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(line);
    }
    out.push('\n');
    out
}

/// Number of closing delimiters at the very start of the line.
fn leading_closers(trimmed: &str) -> i32 {
    let mut n = 0;
    for b in trimmed.bytes() {
        match b {
            b'}' | b')' | b']' => n += 1,
            _ => break,
        }
    }
    n
}

/// `Name:` alone on its line labels a statement; gofmt outdents it.
fn is_label_line(trimmed: &str) -> bool {
    let Some(body) = trimmed.strip_suffix(':') else {
        return false;
    };
    !body.is_empty()
        && body
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_')
        && !body.as_bytes()[0].is_ascii_digit()
        && !matches!(body, "default")
}

fn is_case_line(trimmed: &str) -> bool {
    trimmed.starts_with("case ")
        || trimmed.starts_with("case\t")
        || trimmed == "default:"
        || trimmed.starts_with("default:")
}

/// Walk one line, tracking delimiter depth outside strings and comments.
/// Returns the updated (brace depth, paren/bracket depth, carry state).
fn scan_line(line: &str, mut depth: i32, mut group: i32, mut carry: Carry) -> (i32, i32, Carry) {
    let bytes = line.as_bytes();
    let mut i = 0;
    let mut in_str = false;
    let mut in_rune = false;
    while i < bytes.len() {
        let b = bytes[i];
        match carry {
            Carry::RawString => {
                if b == b'`' {
                    carry = Carry::None;
                }
                i += 1;
                continue;
            }
            Carry::BlockComment => {
                if b == b'*' && i + 1 < bytes.len() && bytes[i + 1] == b'/' {
                    carry = Carry::None;
                    i += 2;
                    continue;
                }
                i += 1;
                continue;
            }
            Carry::None => {}
        }
        if in_str || in_rune {
            match b {
                b'\\' => i += 1,
                b'"' if in_str => in_str = false,
                b'\'' if in_rune => in_rune = false,
                _ => {}
            }
            i += 1;
            continue;
        }
        match b {
            b'"' => in_str = true,
            b'\'' => in_rune = true,
            b'`' => carry = Carry::RawString,
            b'/' if i + 1 < bytes.len() && bytes[i + 1] == b'/' => break,
            b'/' if i + 1 < bytes.len() && bytes[i + 1] == b'*' => {
                carry = Carry::BlockComment;
                i += 1;
            }
            b'{' => depth += 1,
            b'}' => depth -= 1,
            b'(' | b'[' => group += 1,
            b')' | b']' => group -= 1,
            _ => {}
        }
        i += 1;
    }
    (depth, group, carry)
}

/// Collapse blank-line runs to one; drop blanks just after `{` and just
/// before `}`; drop leading and trailing blanks. Verbatim lines are never
/// touched and never trigger a rule.
fn collapse_blanks(lines: &mut Vec<(String, bool)>) {
    let mut out: Vec<(String, bool)> = Vec::with_capacity(lines.len());
    for (line, verbatim) in lines.drain(..) {
        if !verbatim {
            if line.is_empty() {
                match out.last() {
                    None => continue,
                    Some((prev, false)) if prev.is_empty() => continue,
                    Some((prev, false)) if prev.trim_end().ends_with('{') => continue,
                    _ => {}
                }
            } else if line.trim_start().starts_with('}') {
                while matches!(out.last(), Some((prev, false)) if prev.is_empty()) {
                    out.pop();
                }
            }
        }
        out.push((line, verbatim));
    }
    while matches!(out.last(), Some((prev, false)) if prev.is_empty()) {
        out.pop();
    }
    *lines = out;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reindents_by_depth() {
        let src = "package p\n\nfunc f() {\nif a {\nx()\n}\n}\n";
        let want = "package p\n\nfunc f() {\n\tif a {\n\t\tx()\n\t}\n}\n";
        assert_eq!(format_source(src), want);
    }

    #[test]
    fn collapses_blank_after_open_and_before_close() {
        let src = "func f() {\n\n\tx()\n\n}\n";
        assert_eq!(format_source(src), "func f() {\n\tx()\n}\n");
    }

    #[test]
    fn collapses_blank_runs() {
        let src = "a()\n\n\n\nb()\n";
        assert_eq!(format_source(src), "a()\n\nb()\n");
    }

    #[test]
    fn labels_outdent() {
        let src = "func f() {\n\tx()\nLoop:\n\tfor {\n\t\tbreak Loop\n\t}\n}\n";
        assert_eq!(format_source(src), src);
    }

    #[test]
    fn case_arms_outdent() {
        let src = "func f() {\n\tswitch x {\n\tcase 1:\n\t\ta()\n\tdefault:\n\t\tb()\n\t}\n}\n";
        assert_eq!(format_source(src), src);
    }

    #[test]
    fn raw_strings_pass_through() {
        let src = "var x = `keep\n   { weird\nindent`\nvar y int\n";
        assert_eq!(format_source(src), src);
    }

    #[test]
    fn braces_in_strings_ignored() {
        let src = "func f() {\n\tx := \"{{{\"\n\ty := '}'\n\t_ = x\n\t_ = y\n}\n";
        assert_eq!(format_source(src), src);
    }

    #[test]
    fn continuation_inside_parens_indents() {
        let src = "func f() {\n\tg(a,\n\t\tb)\n}\n";
        assert_eq!(format_source(src), src);
    }

    #[test]
    fn idempotent() {
        let srcs = [
            "package p\n\nfunc f() {\nif a {\nx()\n}\n}\n",
            "func f() {\n\n\tx()\n\n}\n",
            "func f() {\n\tswitch x {\n\tcase 1:\n\t\ta()\n\t}\n}\n",
            "var x = `raw\nstring`\n",
        ];
        for src in srcs {
            let once = format_source(src);
            let twice = format_source(&once);
            assert_eq!(once, twice, "not idempotent for {src:?}");
        }
    }
}
