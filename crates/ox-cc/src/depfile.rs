//! Makefile-style dependency file parser for compiler dotd output
//!
//! Parses the `.d` file the C/C++ preprocessor emits under `-MD -MF` to
//! recover the list of files actually read during compilation.
//!
//! ## Format
//!
//! One or more Make rules:
//! ```make
//! target1 target2: dep1 \
//!   dep2 dep3
//! ```
//!
//! With escaping rules:
//! - `\ ` (backslash space) = literal space in filename
//! - `\\` = literal backslash
//! - `\#` = literal hash
//! - `\` at end of line = line continuation
//!
//! Target names are ignored; dependencies from multiple rules concatenate.
//! Duplicates are preserved in first-seen order — the input-set updater keys
//! by exec path and tolerates them. The payload is latin-1 bytes.

use camino::{Utf8Path, Utf8PathBuf};
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DepfileError {
    #[error("failed to read depfile: {path}: {source}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed depfile rule: {line:?}")]
    Malformed { line: String },
}

/// Parse an on-disk `.d` file and return all dependency paths in order.
pub fn parse_depfile(path: &Utf8Path) -> Result<Vec<Utf8PathBuf>, DepfileError> {
    let content = std::fs::read(path).map_err(|source| DepfileError::Io {
        path: path.to_owned(),
        source,
    })?;

    parse_depfile_bytes(&content)
}

/// Parse a latin-1 `.d` payload, e.g. an in-memory reply from an executor.
pub fn parse_depfile_bytes(bytes: &[u8]) -> Result<Vec<Utf8PathBuf>, DepfileError> {
    // Latin-1 maps byte-for-byte onto the first 256 Unicode scalars.
    let content: String = bytes.iter().map(|&b| b as char).collect();
    parse_depfile_content(&content)
}

fn parse_depfile_content(content: &str) -> Result<Vec<Utf8PathBuf>, DepfileError> {
    let mut deps = Vec::new();
    let mut in_deps = false; // false = reading targets, true = reading deps
    let mut current_token = String::new();
    // Raw text of the current rule, for error reporting only.
    let mut rule_text = String::new();
    let mut chars = content.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '\n' {
            rule_text.push(ch);
        }
        match ch {
            ':' if !in_deps => {
                // Switch from targets to dependencies
                in_deps = true;
                current_token.clear();
            }
            '\\' => {
                // Escape sequence
                match chars.peek() {
                    Some('\n') => {
                        // Line continuation - consume the newline and any
                        // leading whitespace on the next line
                        chars.next();
                        while chars.peek() == Some(&' ') || chars.peek() == Some(&'\t') {
                            chars.next();
                        }
                        rule_text.push(' ');
                    }
                    Some(' ') => {
                        // Escaped space - literal space in filename
                        chars.next();
                        current_token.push(' ');
                        rule_text.push(' ');
                    }
                    Some('\\') => {
                        chars.next();
                        current_token.push('\\');
                        rule_text.push('\\');
                    }
                    Some('#') => {
                        chars.next();
                        current_token.push('#');
                        rule_text.push('#');
                    }
                    _ => {
                        // Unknown escape - just keep the backslash
                        current_token.push('\\');
                    }
                }
            }
            ' ' | '\t' | '\n' => {
                // Whitespace terminates a token
                if in_deps && !current_token.is_empty() {
                    deps.push(Utf8PathBuf::from(current_token.clone()));
                    current_token.clear();
                }
                // An unescaped newline ends the rule. A rule with tokens but
                // no ':' is not Make syntax.
                if ch == '\n' {
                    check_rule_complete(in_deps, &rule_text)?;
                    in_deps = false;
                    current_token.clear();
                    rule_text.clear();
                }
            }
            _ => {
                current_token.push(ch);
            }
        }
    }

    // Flush final token
    if in_deps && !current_token.is_empty() {
        deps.push(Utf8PathBuf::from(current_token));
    }
    check_rule_complete(in_deps, &rule_text)?;

    Ok(deps)
}

fn check_rule_complete(in_deps: bool, rule_text: &str) -> Result<(), DepfileError> {
    if !in_deps && !rule_text.trim().is_empty() {
        return Err(DepfileError::Malformed {
            line: rule_text.trim().to_string(),
        });
    }
    Ok(())
}
