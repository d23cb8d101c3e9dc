// src/scan.rs

//! Syntactic import scanner.
//!
//! Finds the import specifiers of a module without executing it: comments are
//! stripped by a small state machine (which is also where malformed source is
//! caught and reported with a position), then three regexes collect
//! `require("...")`, `import ... from "..."` / bare `import "..."` and
//! `export ... from "..."` in source order.
//!
//! This is a syntactic scan, the same contract browserify-style bundlers use;
//! it does not evaluate conditionals or computed specifiers.

use std::path::Path;

use anyhow::Context;
use regex::Regex;

use crate::errors::{RepackError, Result};

/// Compiled scanner. Build once, reuse across modules.
#[derive(Debug)]
pub struct ImportScanner {
    require_re: Regex,
    import_re: Regex,
    export_re: Regex,
}

impl ImportScanner {
    pub fn new() -> Result<Self> {
        let require_re = Regex::new(r#"\brequire\s*\(\s*(?:'([^'\n]*)'|"([^"\n]*)")\s*\)"#)
            .context("building require regex")?;
        let import_re =
            Regex::new(r#"\bimport\s*(?:[\w$*{},\s]+?\bfrom\s*)?(?:'([^'\n]*)'|"([^"\n]*)")"#)
                .context("building import regex")?;
        let export_re =
            Regex::new(r#"\bexport\s+[\w$*{},\s]+?\bfrom\s*(?:'([^'\n]*)'|"([^"\n]*)")"#)
                .context("building export regex")?;
        Ok(Self {
            require_re,
            import_re,
            export_re,
        })
    }

    /// Scan `source` for import specifiers, in order of first occurrence.
    ///
    /// Returns [`RepackError::Parse`] for source the state machine cannot get
    /// through (unterminated strings or block comments).
    pub fn scan(&self, path: &Path, source: &str) -> Result<Vec<String>> {
        let stripped = strip_comments(path, source)?;

        let mut found: Vec<(usize, String)> = Vec::new();
        for re in [&self.require_re, &self.import_re, &self.export_re] {
            for caps in re.captures_iter(&stripped) {
                let Some(whole) = caps.get(0) else { continue };
                let spec = caps
                    .get(1)
                    .or_else(|| caps.get(2))
                    .map(|g| g.as_str().to_string())
                    .unwrap_or_default();
                if !spec.is_empty() {
                    found.push((whole.start(), spec));
                }
            }
        }
        found.sort_by_key(|(start, _)| *start);

        // First occurrence wins; repeated imports of the same specifier map
        // to the same edge anyway.
        let mut imports = Vec::new();
        for (_, spec) in found {
            if !imports.contains(&spec) {
                imports.push(spec);
            }
        }
        Ok(imports)
    }
}

/// Replace comments with spaces (newlines kept, so positions stay stable) and
/// validate string termination on the way.
fn strip_comments(path: &Path, source: &str) -> Result<String> {
    #[derive(PartialEq)]
    enum State {
        Code,
        LineComment,
        BlockComment,
        Str(char),
        Template,
    }

    let mut out = String::with_capacity(source.len());
    let mut state = State::Code;
    let mut chars = source.chars().peekable();
    let mut line = 1usize;
    let mut column = 1usize;
    let mut string_start = (0usize, 0usize);

    while let Some(c) = chars.next() {
        match state {
            State::Code => match c {
                '/' if chars.peek() == Some(&'/') => {
                    chars.next();
                    out.push_str("  ");
                    column += 1;
                    state = State::LineComment;
                }
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    out.push_str("  ");
                    column += 1;
                    string_start = (line, column);
                    state = State::BlockComment;
                }
                '\'' | '"' => {
                    out.push(c);
                    string_start = (line, column);
                    state = State::Str(c);
                }
                '`' => {
                    out.push(c);
                    state = State::Template;
                }
                _ => out.push(c),
            },
            State::LineComment => {
                if c == '\n' {
                    out.push('\n');
                    state = State::Code;
                } else {
                    out.push(' ');
                }
            }
            State::BlockComment => {
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    out.push_str("  ");
                    column += 1;
                    state = State::Code;
                } else if c == '\n' {
                    out.push('\n');
                } else {
                    out.push(' ');
                }
            }
            State::Str(quote) => match c {
                '\\' => {
                    out.push(c);
                    if let Some(escaped) = chars.next() {
                        out.push(escaped);
                        column += 1;
                    }
                }
                '\n' => {
                    return Err(parse_error(path, string_start, "unterminated string literal"));
                }
                _ => {
                    out.push(c);
                    if c == quote {
                        state = State::Code;
                    }
                }
            },
            State::Template => match c {
                '\\' => {
                    out.push(c);
                    if let Some(escaped) = chars.next() {
                        out.push(escaped);
                        column += 1;
                    }
                }
                '`' => {
                    out.push(c);
                    state = State::Code;
                }
                _ => out.push(c),
            },
        }

        if c == '\n' {
            line += 1;
            column = 1;
        } else {
            column += 1;
        }
    }

    match state {
        State::Code | State::LineComment => Ok(out),
        State::BlockComment => Err(parse_error(path, string_start, "unterminated block comment")),
        State::Str(_) => Err(parse_error(path, string_start, "unterminated string literal")),
        State::Template => Err(parse_error(path, string_start, "unterminated template literal")),
    }
}

fn parse_error(path: &Path, at: (usize, usize), message: &str) -> RepackError {
    RepackError::Parse {
        path: path.to_path_buf(),
        line: at.0,
        column: at.1,
        message: message.to_string(),
    }
}
