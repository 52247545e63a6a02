//! Streaming SQL statement reader
//!
//! Splits a file of SQL statements on `;` terminators while reading it line by
//! line. Terminators inside quoted strings, comments and `$tag$` bodies are
//! not treated as statement boundaries.

use std::io::{self, BufRead};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Mode {
    Normal,
    SingleQuote,
    DoubleQuote,
    BlockComment,
    Dollar(String),
}

/// Iterator over the statements of a SQL script
///
/// Each yielded statement is trimmed and carries no trailing `;`. A final
/// statement without a terminator is still yielded.
pub struct SqlStatements<R> {
    reader: R,
    mode: Mode,
    current: String,
    line: String,
    done: bool,
}

impl<R: BufRead> SqlStatements<R> {
    pub fn new(reader: R) -> Self {
        SqlStatements {
            reader,
            mode: Mode::Normal,
            current: String::new(),
            line: String::new(),
            done: false,
        }
    }

    /// Consume characters of `self.line` from `start`, returning the byte offset
    /// just past a statement terminator if one was found.
    fn scan(&mut self, start: usize) -> Option<usize> {
        let line = &self.line;
        let bytes = line.as_bytes();
        let mut i = start;

        while i < bytes.len() {
            let c = bytes[i];
            match &self.mode {
                Mode::Normal => match c {
                    b'\'' => self.mode = Mode::SingleQuote,
                    b'"' => self.mode = Mode::DoubleQuote,
                    b'-' if bytes.get(i + 1) == Some(&b'-') => {
                        // rest of the line is a comment
                        self.current.push_str(&line[i..]);
                        return None;
                    }
                    b'/' if bytes.get(i + 1) == Some(&b'*') => {
                        self.mode = Mode::BlockComment;
                        self.current.push_str("/*");
                        i += 2;
                        continue;
                    }
                    b'$' => {
                        if let Some(tag) = dollar_tag(&line[i..]) {
                            self.current.push_str(&tag);
                            i += tag.len();
                            self.mode = Mode::Dollar(tag);
                            continue;
                        }
                    }
                    b';' => return Some(i + 1),
                    _ => {}
                },
                Mode::SingleQuote => {
                    if c == b'\'' {
                        self.mode = Mode::Normal;
                    }
                }
                Mode::DoubleQuote => {
                    if c == b'"' {
                        self.mode = Mode::Normal;
                    }
                }
                Mode::BlockComment => {
                    if c == b'*' && bytes.get(i + 1) == Some(&b'/') {
                        self.current.push_str("*/");
                        self.mode = Mode::Normal;
                        i += 2;
                        continue;
                    }
                }
                Mode::Dollar(tag) => {
                    if line[i..].starts_with(tag.as_str()) {
                        let len = tag.len();
                        self.current.push_str(&line[i..i + len]);
                        self.mode = Mode::Normal;
                        i += len;
                        continue;
                    }
                }
            }

            // advance one full character to keep slices on char boundaries
            let width = line[i..].chars().next().map(char::len_utf8).unwrap_or(1);
            self.current.push_str(&line[i..i + width]);
            i += width;
        }
        None
    }

    fn take_current(&mut self) -> Option<String> {
        let stmt = self.current.trim().to_string();
        self.current.clear();
        if is_blank(&stmt) {
            None
        } else {
            Some(stmt)
        }
    }
}

impl<R: BufRead> Iterator for SqlStatements<R> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            // leftover text after a terminator on the previous line
            if !self.line.is_empty() {
                if let Some(end) = self.scan(0) {
                    self.line.drain(..end);
                    match self.take_current() {
                        Some(stmt) => return Some(Ok(stmt)),
                        None => continue,
                    }
                }
                self.line.clear();
            }

            if self.done {
                return self.take_current().map(Ok);
            }

            match self.reader.read_line(&mut self.line) {
                Ok(0) => self.done = true,
                Ok(_) => {}
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

/// Parse a `$tag$` opener at the start of `s`
fn dollar_tag(s: &str) -> Option<String> {
    let rest = &s[1..];
    let end = rest.find('$')?;
    let tag = &rest[..end];
    if tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !tag.starts_with(|c: char| c.is_ascii_digit())
    {
        Some(format!("${}$", tag))
    } else {
        None
    }
}

/// True when `stmt` holds nothing but whitespace and comments
fn is_blank(stmt: &str) -> bool {
    let mut rest = stmt.trim_start();
    loop {
        if rest.is_empty() {
            return true;
        }
        if let Some(after) = rest.strip_prefix("--") {
            rest = match after.find('\n') {
                Some(pos) => after[pos + 1..].trim_start(),
                None => "",
            };
        } else if let Some(after) = rest.strip_prefix("/*") {
            rest = match after.find("*/") {
                Some(pos) => after[pos + 2..].trim_start(),
                None => "",
            };
        } else {
            return false;
        }
    }
}
