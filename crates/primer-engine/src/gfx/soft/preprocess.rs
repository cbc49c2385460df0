//! Conditional inclusion and object-like macros.
//!
//! Runs on the source text before lexing and keeps one output line per
//! input line, so diagnostics still point at the original source. Lines in
//! excluded groups come out empty. Directives in included groups stay in
//! place for the parser, which checks their position and handles
//! `#version`, `#extension` and `#error`.

use std::collections::HashMap;

use super::expr::{self, Term};
use super::lexer::Diagnostic;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Macro {
    Object(String),
    /// Function-like macros are tracked for `defined` but never expanded.
    Function,
}

/// One open `#if` group.
#[derive(Debug)]
struct Group {
    /// Lines of the current branch are emitted.
    active: bool,
    /// A branch of this group has been taken, or the enclosing group is excluded.
    taken: bool,
    seen_else: bool,
    line: u32,
}

/// Expands `source`, returning text with the same number of lines.
pub(crate) fn preprocess(source: &str) -> Result<String, Diagnostic> {
    let lines: Vec<&str> = source.split('\n').collect();
    let mut pp = Preprocessor::default();
    let mut out = String::with_capacity(source.len());

    let mut i = 0;
    while i < lines.len() {
        let line = i as u32 + 1;
        if !pp.in_comment && lines[i].trim_start().starts_with('#') {
            let mut end = i;
            while continues(lines[end]) && end + 1 < lines.len() {
                end += 1;
            }
            let text = lines[i..=end]
                .iter()
                .map(|l| {
                    let l = l.trim_end_matches('\r');
                    l.strip_suffix('\\').unwrap_or(l)
                })
                .collect::<Vec<_>>()
                .join(" ");
            let text = text.trim_start().trim_start_matches('#');

            let keep = pp.directive(text, line)?;
            for physical in &lines[i..=end] {
                if keep {
                    out.push_str(physical);
                }
                out.push('\n');
            }
            i = end + 1;
        } else {
            let expanded = pp.scan(lines[i]);
            if pp.active() {
                out.push_str(&expanded);
            }
            out.push('\n');
            i += 1;
        }
    }
    out.pop();

    if let Some(open) = pp.groups.last() {
        return Err(Diagnostic::new(open.line, "unterminated conditional directive"));
    }
    Ok(out)
}

fn continues(line: &str) -> bool {
    line.trim_end_matches('\r').ends_with('\\')
}

#[derive(Debug, Default)]
struct Preprocessor {
    macros: HashMap<String, Macro>,
    groups: Vec<Group>,
    /// Inside a `/* */` comment that spans lines.
    in_comment: bool,
}

impl Preprocessor {
    fn active(&self) -> bool {
        self.groups.iter().all(|g| g.active)
    }

    fn enclosing_active(&self) -> bool {
        let open = self.groups.len().saturating_sub(1);
        self.groups[..open].iter().all(|g| g.active)
    }

    /// Handles one logical directive line. Returns whether the parser should see it.
    fn directive(&mut self, text: &str, line: u32) -> Result<bool, Diagnostic> {
        let text = self.strip_comments(text);
        let text = text.trim();
        let (name, rest) = match text.find(char::is_whitespace) {
            Some(at) => (&text[..at], text[at..].trim()),
            None => (text, ""),
        };

        match name {
            "if" | "ifdef" | "ifndef" => {
                let parent = self.active();
                let taken = parent
                    && match name {
                        "if" => self.condition(rest, line)?,
                        "ifdef" => self.macros.contains_key(macro_name(rest, line)?),
                        _ => !self.macros.contains_key(macro_name(rest, line)?),
                    };
                self.groups.push(Group { active: taken, taken: taken || !parent, seen_else: false, line });
                Ok(parent)
            }
            "elif" => {
                let parent = self.enclosing_active();
                let group = self.open_group(name, line)?;
                if group.seen_else {
                    return Err(Diagnostic::new(line, "#elif after #else"));
                }
                let run = !group.taken;
                let taken = run && self.condition(rest, line)?;
                let group = self.open_group(name, line)?;
                group.active = taken;
                group.taken |= taken;
                Ok(parent)
            }
            "else" => {
                let parent = self.enclosing_active();
                let group = self.open_group(name, line)?;
                if group.seen_else {
                    return Err(Diagnostic::new(line, "#else after #else"));
                }
                group.seen_else = true;
                group.active = !group.taken;
                group.taken = true;
                Ok(parent)
            }
            "endif" => {
                let parent = self.enclosing_active();
                self.open_group(name, line)?;
                self.groups.pop();
                Ok(parent)
            }
            _ if !self.active() => Ok(false),
            "define" => {
                self.define(rest, line)?;
                Ok(true)
            }
            "undef" => {
                self.macros.remove(macro_name(rest, line)?);
                Ok(true)
            }
            "version" => {
                self.predefine(rest);
                Ok(true)
            }
            _ => Ok(true),
        }
    }

    fn open_group(&mut self, directive: &str, line: u32) -> Result<&mut Group, Diagnostic> {
        self.groups
            .last_mut()
            .ok_or_else(|| Diagnostic::new(line, format!("#{directive} without #if")))
    }

    /// Macros every stage sees once its version is known.
    fn predefine(&mut self, version: &str) {
        let mut words = version.split_whitespace();
        if let Some(number) = words.next() {
            self.macros.insert("__VERSION__".into(), Macro::Object(number.into()));
        }
        match words.next() {
            Some("es") => {
                self.macros.insert("GL_ES".into(), Macro::Object("1".into()));
            }
            Some("core") => {
                self.macros.insert("GL_core_profile".into(), Macro::Object("1".into()));
            }
            _ => {}
        }
    }

    fn define(&mut self, rest: &str, line: u32) -> Result<(), Diagnostic> {
        let end = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(rest.len());
        let name = macro_name(&rest[..end], line)?;
        if name.starts_with("GL_") || name.contains("__") {
            return Err(Diagnostic::new(line, format!("'{name}' : macro names with this prefix are reserved")));
        }

        let body = &rest[end..];
        let definition = if body.starts_with('(') {
            Macro::Function
        } else {
            Macro::Object(body.trim().to_string())
        };
        self.macros.insert(name.to_string(), definition);
        Ok(())
    }

    fn condition(&self, text: &str, line: u32) -> Result<bool, Diagnostic> {
        let invalid = || Diagnostic::new(line, format!("invalid expression in #if: '{text}'"));
        let mut terms = Vec::new();
        self.resolve(text, &mut Vec::new(), &mut terms).ok_or_else(invalid)?;
        expr::evaluate(&terms).map(|v| v != 0).ok_or_else(invalid)
    }

    /// Turns `#if` text into terms: `defined` is answered, macros are
    /// expanded, and any other identifier counts as zero.
    fn resolve(&self, text: &str, hidden: &mut Vec<String>, terms: &mut Vec<Term>) -> Option<()> {
        let mut rest = text.trim_start();
        while !rest.is_empty() {
            let first = rest.chars().next()?;
            if first.is_ascii_digit() {
                let end = rest
                    .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                    .unwrap_or(rest.len());
                terms.push(Term::Num(parse_int(&rest[..end])?));
                rest = &rest[end..];
            } else if first.is_ascii_alphabetic() || first == '_' {
                let (word, after) = split_ident(rest);
                rest = after;
                if word == "defined" {
                    let (name, after) = defined_operand(rest)?;
                    terms.push(Term::Num(i64::from(self.macros.contains_key(name))));
                    rest = after;
                    continue;
                }
                match self.macros.get(word) {
                    Some(Macro::Object(body)) if !hidden.iter().any(|h| h == word) => {
                        hidden.push(word.to_string());
                        self.resolve(body, hidden, terms)?;
                        hidden.pop();
                    }
                    _ => terms.push(Term::Num(0)),
                }
            } else {
                let op = Term::leading_op(rest)?;
                let Term::Op(spelling) = op else {
                    return None;
                };
                terms.push(op);
                rest = &rest[spelling.len()..];
            }
            rest = rest.trim_start();
        }
        Some(())
    }

    /// Expands macros in one source line, tracking comments across lines.
    fn scan(&mut self, line: &str) -> String {
        let mut out = String::with_capacity(line.len());
        let mut rest = line;
        while !rest.is_empty() {
            if self.in_comment {
                match rest.find("*/") {
                    Some(end) => {
                        out.push_str(&rest[..end + 2]);
                        rest = &rest[end + 2..];
                        self.in_comment = false;
                    }
                    None => {
                        out.push_str(rest);
                        break;
                    }
                }
                continue;
            }

            let comment = [rest.find("//"), rest.find("/*")].into_iter().flatten().min();
            let Some(at) = comment else {
                out.push_str(&self.substitute(rest, &mut Vec::new()));
                break;
            };
            out.push_str(&self.substitute(&rest[..at], &mut Vec::new()));
            if rest[at..].starts_with("//") {
                out.push_str(&rest[at..]);
                break;
            }
            out.push_str("/*");
            rest = &rest[at + 2..];
            self.in_comment = true;
        }
        out
    }

    /// Replaces object-like macros in comment-free text. A macro is not
    /// expanded again inside its own replacement.
    fn substitute(&self, text: &str, hidden: &mut Vec<String>) -> String {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(c) = rest.chars().next() {
            if c.is_ascii_alphabetic() || c == '_' {
                let (word, after) = split_ident(rest);
                match self.macros.get(word) {
                    Some(Macro::Object(body)) if !hidden.iter().any(|h| h == word) => {
                        hidden.push(word.to_string());
                        out.push_str(&self.substitute(body, hidden));
                        hidden.pop();
                    }
                    _ => out.push_str(word),
                }
                rest = after;
            } else if c.is_ascii_digit() || c == '.' {
                // Number suffixes and exponents are not identifiers.
                let end = rest[1..]
                    .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '.'))
                    .map_or(rest.len(), |e| e + 1);
                out.push_str(&rest[..end]);
                rest = &rest[end..];
            } else {
                out.push(c);
                rest = &rest[c.len_utf8()..];
            }
        }
        out
    }

    /// Drops comments from a directive line. An unclosed `/*` carries over.
    fn strip_comments(&mut self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        loop {
            let comment = [rest.find("//"), rest.find("/*")].into_iter().flatten().min();
            let Some(at) = comment else {
                out.push_str(rest);
                return out;
            };
            out.push_str(&rest[..at]);
            if rest[at..].starts_with("//") {
                return out;
            }
            match rest[at + 2..].find("*/") {
                Some(end) => {
                    out.push(' ');
                    rest = &rest[at + 2 + end + 2..];
                }
                None => {
                    self.in_comment = true;
                    return out;
                }
            }
        }
    }
}

fn split_ident(text: &str) -> (&str, &str) {
    let end = text
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(text.len());
    text.split_at(end)
}

/// Operand of `defined`: `NAME` or `(NAME)`.
fn defined_operand(text: &str) -> Option<(&str, &str)> {
    let text = text.trim_start();
    match text.strip_prefix('(') {
        Some(inner) => {
            let (name, after) = split_ident(inner.trim_start());
            let after = after.trim_start().strip_prefix(')')?;
            (!name.is_empty()).then_some((name, after))
        }
        None => {
            let (name, after) = split_ident(text);
            (!name.is_empty()).then_some((name, after))
        }
    }
}

fn macro_name(text: &str, line: u32) -> Result<&str, Diagnostic> {
    let name = text.split_whitespace().next().unwrap_or_default();
    let valid = name.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(name)
    } else {
        Err(Diagnostic::new(line, "macro name must be an identifier"))
    }
}

fn parse_int(text: &str) -> Option<i64> {
    let digits = text.trim_end_matches(['u', 'U']);
    match digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        Some(hex) => i64::from_str_radix(hex, 16).ok(),
        None if digits.len() > 1 && digits.starts_with('0') => i64::from_str_radix(&digits[1..], 8).ok(),
        None => digits.parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(src: &str) -> Vec<String> {
        preprocess(src).unwrap().split('\n').map(str::to_string).collect()
    }

    // ── conditionals ──────────────────────────────────────────────────────

    #[test]
    fn excluded_group_becomes_blank_lines() {
        let out = lines("a\n#if 0\nnot glsl @@\n#endif\nb");
        assert_eq!(out, vec!["a", "#if 0", "", "#endif", "b"]);
    }

    #[test]
    fn else_branch_is_taken_when_the_condition_fails() {
        let out = lines("#ifdef MISSING\none\n#elif 1 + 1 == 2\ntwo\n#else\nthree\n#endif");
        assert_eq!(out[1], "");
        assert_eq!(out[3], "two");
        assert_eq!(out[5], "");
    }

    #[test]
    fn nested_groups_inside_an_excluded_group_stay_excluded() {
        let out = lines("#if 0\n#if 1\nx\n#else\ny\n#endif\n#endif\nz");
        assert_eq!(out, vec!["#if 0", "", "", "", "", "", "#endif", "z"]);
    }

    #[test]
    fn defined_operator_in_both_spellings() {
        let out = lines("#define A\n#if defined(A) && !defined B\nyes\n#endif");
        assert_eq!(out[2], "yes");
    }

    #[test]
    fn error_in_excluded_group_is_dropped() {
        let out = lines("#ifndef GL_ES\n#else\n#error es only\n#endif");
        assert_eq!(out[2], "");
    }

    #[test]
    fn version_predefines_macros() {
        let out = lines("#version 300 es\n#if __VERSION__ >= 300 && GL_ES\nnew\n#endif");
        assert_eq!(out[2], "new");
    }

    #[test]
    fn comments_hide_directives() {
        let out = lines("/*\n#if 0\n*/\nx");
        assert_eq!(out, vec!["/*", "#if 0", "*/", "x"]);
    }

    #[test]
    fn unbalanced_groups_are_errors() {
        assert_eq!(preprocess("x\n#if 1\ny").unwrap_err().line, 2);
        assert_eq!(preprocess("#endif").unwrap_err().line, 1);
        assert_eq!(preprocess("#if 1\n#else\n#else\n#endif").unwrap_err().line, 3);
        assert_eq!(preprocess("#if 1\n#else\n#elif 1\n#endif").unwrap_err().line, 3);
    }

    #[test]
    fn malformed_condition_reports_its_line() {
        let err = preprocess("\n#if 1 +\n#endif").unwrap_err();
        assert_eq!(err.line, 2);
        assert!(err.message.contains("#if"));
    }

    // ── macros ────────────────────────────────────────────────────────────

    #[test]
    fn object_macros_expand_in_code_but_not_comments() {
        let out = lines("#define POS vec3\nin POS p; // POS\n");
        assert_eq!(out[1], "in vec3 p; // POS");
    }

    #[test]
    fn macros_expand_through_other_macros() {
        let out = lines("#define N 4\n#define SIZE (N * 2)\nfloat w[SIZE];");
        assert_eq!(out[2], "float w[(4 * 2)];");
    }

    #[test]
    fn self_reference_does_not_loop() {
        let out = lines("#define x x + 1\nx");
        assert_eq!(out[1], "x + 1");
    }

    #[test]
    fn undef_removes_the_macro() {
        let out = lines("#define A 1\n#undef A\nA");
        assert_eq!(out[2], "A");
    }

    #[test]
    fn numbers_are_not_expanded() {
        let out = lines("#define f 2\n1.0f + f");
        assert_eq!(out[1], "1.0f + 2");
    }

    #[test]
    fn function_like_macros_stay_unexpanded() {
        let out = lines("#define SQ(x) ((x) * (x))\n#ifdef SQ\nSQ(2)\n#endif");
        assert_eq!(out[2], "SQ(2)");
    }

    #[test]
    fn reserved_macro_names() {
        assert!(preprocess("#define GL_thing 1").is_err());
        assert!(preprocess("#define a__b 1").is_err());
        assert!(preprocess("#define 1x").is_err());
    }

    #[test]
    fn continued_directive_keeps_line_count() {
        let out = lines("#define LONG \\\n  7\nLONG");
        assert_eq!(out.len(), 3);
        assert_eq!(out[2], "7");
    }
}
