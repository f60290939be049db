//! Recursive byte-level parser for nginx configuration files.
//!
//! The parser reads one byte at a time and flips between two states per
//! block: scanning the directive name, then scanning its arguments. The
//! split matters because several byte classes (`{`, `;`, `#`) mean
//! different things depending on whether a statement has started. `{`
//! recurses into a nested block, `}` returns to the caller, `;` finalizes
//! the pending statement.
//!
//! Two special modes layer on top: `include` statements trigger a
//! recursive sub-parse of every matched file (see the include module), and
//! directives whose name ends in `_by_lua_block` capture their body
//! verbatim instead of parsing it as configuration.

use crate::ast::Directive;
use crate::error::{ParseError, ParseResult};
use crate::include;
use crate::options::ParseOptions;
use crate::reader::ByteReader;
use std::io::Read;
use std::path::Path;

pub(crate) const LUA_BLOCK_SUFFIX: &str = "_by_lua_block";

/// Check if a directive name indicates an opaque Lua block.
///
/// The body of such a directive is embedded Lua code and is captured as a
/// single argument instead of being parsed as nested directives.
///
/// # Examples
/// ```
/// use ngx_conf::is_lua_block_directive;
///
/// assert!(is_lua_block_directive("content_by_lua_block"));
/// assert!(is_lua_block_directive("init_by_lua_block"));
/// assert!(!is_lua_block_directive("server"));
/// ```
pub fn is_lua_block_directive(name: &str) -> bool {
    // ends_with covers all *_by_lua_block directives from lua-nginx-module
    name.ends_with(LUA_BLOCK_SUFFIX)
}

/// Parse a configuration file from disk with default options.
pub fn parse_file<P: AsRef<Path>>(path: P) -> ParseResult<Vec<Directive>> {
    parse_file_with(path, &ParseOptions::default())
}

/// Parse a configuration file from disk.
///
/// The file is opened through the options' open capability and every
/// directive is annotated with the path exactly as given.
pub fn parse_file_with<P: AsRef<Path>>(
    path: P,
    options: &ParseOptions,
) -> ParseResult<Vec<Directive>> {
    let path = path.as_ref();
    let file_name = path.display().to_string();
    let input = options.open(path).map_err(|e| ParseError::Io {
        file: file_name.clone(),
        source: e,
    })?;
    Parser::new(input, file_name, options).parse()
}

/// Parse a configuration from a string with default options.
pub fn parse_string(source: &str) -> ParseResult<Vec<Directive>> {
    parse_string_with(source, &ParseOptions::default())
}

/// Parse a configuration from a string.
pub fn parse_string_with(source: &str, options: &ParseOptions) -> ParseResult<Vec<Directive>> {
    Parser::new(source.as_bytes(), String::new(), options).parse()
}

/// Parse a configuration from an arbitrary byte source with default options.
pub fn parse_reader<R: Read>(reader: R) -> ParseResult<Vec<Directive>> {
    parse_reader_with(reader, &ParseOptions::default())
}

/// Parse a configuration from an arbitrary byte source.
///
/// Directives are annotated with an empty file name; use
/// [`parse_file_with`] when the source has one.
pub fn parse_reader_with<R: Read>(reader: R, options: &ParseOptions) -> ParseResult<Vec<Directive>> {
    Parser::new(reader, String::new(), options).parse()
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum State {
    /// Awaiting or accumulating a directive name.
    Directive,
    /// The name is known; accumulating arguments.
    Args,
}

/// The in-progress token.
///
/// `present` distinguishes an empty quoted token (`''`) from no token at
/// all, and `line` records where the token started so a directive keeps
/// the line of its first significant byte even when its terminator sits
/// lines later.
#[derive(Default)]
struct Scratch {
    buf: Vec<u8>,
    present: bool,
    line: usize,
}

impl Scratch {
    fn push(&mut self, byte: u8, line: usize) {
        self.mark(line);
        self.buf.push(byte);
    }

    fn mark(&mut self, line: usize) {
        if !self.present {
            self.present = true;
            self.line = line;
        }
    }

    fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    fn take(&mut self) -> Option<(String, usize)> {
        if !self.present {
            return None;
        }
        let text = String::from_utf8_lossy(&self.buf).into_owned();
        let line = self.line;
        self.buf.clear();
        self.present = false;
        Some((text, line))
    }
}

struct Parser<'o, R> {
    reader: ByteReader<R>,
    options: &'o ParseOptions,
    file_name: String,
    line: usize,
}

impl<'o, R: Read> Parser<'o, R> {
    fn new(input: R, file_name: String, options: &'o ParseOptions) -> Self {
        Self {
            reader: ByteReader::new(input),
            options,
            file_name,
            line: 1,
        }
    }

    fn parse(mut self) -> ParseResult<Vec<Directive>> {
        let directives = self.parse_block(0)?;
        // Only whitespace may remain once the root block is done.
        loop {
            match self.read_byte()? {
                None => return Ok(directives),
                Some(b'\n') => self.line += 1,
                Some(b' ' | b'\t' | b'\r') => {}
                Some(_) => {
                    return Err(ParseError::UnexpectedEnd {
                        file: self.file_name.clone(),
                        line: self.line,
                    });
                }
            }
        }
    }

    fn parse_block(&mut self, depth: usize) -> ParseResult<Vec<Directive>> {
        let mut directives = Vec::new();
        let mut state = State::Directive;
        let mut scratch = Scratch::default();
        let mut pending: Option<Directive> = None;

        loop {
            let Some(byte) = self.read_byte()? else {
                if depth > 0 {
                    return Err(self.eof_error());
                }
                // EOF at the root block is the normal end of input; an
                // unterminated trailing statement is dropped.
                return Ok(directives);
            };

            match byte {
                b' ' | b'\t' => self.flush_token(&mut state, &mut scratch, &mut pending),
                b'\n' => {
                    self.line += 1;
                    self.flush_token(&mut state, &mut scratch, &mut pending);
                }
                b'\r' => {}
                b'#' if scratch.is_empty() => {
                    self.collect_comment(&mut pending, &mut directives)?;
                }
                b'/' if scratch.is_empty() => {
                    if self.peek_is(b'/')? {
                        self.read_byte()?;
                        self.collect_comment(&mut pending, &mut directives)?;
                    } else {
                        scratch.push(b'/', self.line);
                    }
                }
                b'\\' => match self.read_byte()? {
                    Some(next) => {
                        let line = self.line;
                        if next == b'\n' {
                            self.line += 1;
                        }
                        scratch.push(unescape(next), line);
                    }
                    None => scratch.push(b'\\', self.line),
                },
                b'"' | b'\'' if scratch.is_empty() => self.scan_string(byte, &mut scratch)?,
                b'$' => {
                    scratch.push(b'$', self.line);
                    if self.peek_is(b'{')? {
                        self.read_byte()?;
                        self.scan_variable(&mut scratch)?;
                    }
                }
                b';' => {
                    self.flush_token(&mut state, &mut scratch, &mut pending);
                    if let Some(node) = pending.take() {
                        directives.push(self.finish_statement(node)?);
                    }
                    state = State::Directive;
                }
                b'{' => match state {
                    State::Directive => {
                        let Some((name, line)) = scratch.take() else {
                            return Err(self.unexpected('{'));
                        };
                        let mut node = Directive::new(line, &self.file_name, name);
                        node.block = self.parse_block(depth + 1)?;
                        directives.push(node);
                    }
                    State::Args => {
                        self.flush_token(&mut state, &mut scratch, &mut pending);
                        let Some(mut node) = pending.take() else {
                            return Err(self.unexpected('{'));
                        };
                        if is_lua_block_directive(&node.directive) {
                            let body = self.scan_lua_block()?;
                            node.args.push(body);
                        } else {
                            if node.is("if") {
                                strip_condition_parens(&mut node.args);
                            }
                            node.block = self.parse_block(depth + 1)?;
                        }
                        directives.push(node);
                        state = State::Directive;
                    }
                },
                b'}' => match state {
                    State::Directive => return Ok(directives),
                    State::Args => return Err(self.unexpected('}')),
                },
                other => scratch.push(other, self.line),
            }
        }
    }

    /// Close the in-progress token: promote it to the pending directive's
    /// name, or append it as an argument.
    fn flush_token(
        &self,
        state: &mut State,
        scratch: &mut Scratch,
        pending: &mut Option<Directive>,
    ) {
        let Some((text, line)) = scratch.take() else {
            return;
        };
        match *state {
            State::Directive => {
                *pending = Some(Directive::new(line, &self.file_name, text));
                *state = State::Args;
            }
            State::Args => {
                if let Some(node) = pending.as_mut() {
                    node.args.push(text);
                }
            }
        }
    }

    fn finish_statement(&self, mut node: Directive) -> ParseResult<Directive> {
        if node.is("include") && !self.options.is_single_file() {
            include::resolve(&mut node, self.options)?;
        }
        Ok(node)
    }

    /// Consume the rest of the line as comment text. While a directive is
    /// still open the comment attaches to it; otherwise it becomes a
    /// standalone `"#"` node.
    fn collect_comment(
        &mut self,
        pending: &mut Option<Directive>,
        directives: &mut Vec<Directive>,
    ) -> ParseResult<()> {
        let line = self.line;
        let raw = self.read_line()?;
        let text = String::from_utf8_lossy(&raw);
        let text = text.trim();
        match pending.as_mut() {
            Some(node) => {
                if text.is_empty() {
                    return Ok(());
                }
                if !node.comment.is_empty() {
                    node.comment.push(' ');
                }
                node.comment.push_str(text);
            }
            None => directives.push(Directive::new_comment(line, &self.file_name, text)),
        }
        Ok(())
    }

    /// Scan a quoted string into the current token.
    ///
    /// Newlines inside the string count toward the line number. An
    /// immediately adjacent matching quote after the closing quote
    /// continues the same token, so `"a""b"` stays one argument.
    fn scan_string(&mut self, quote: u8, scratch: &mut Scratch) -> ParseResult<()> {
        scratch.mark(self.line);
        loop {
            let Some(byte) = self.read_byte()? else {
                return Err(self.eof_error());
            };
            match byte {
                b'\\' => {
                    let Some(next) = self.read_byte()? else {
                        return Err(self.eof_error());
                    };
                    let line = self.line;
                    if next == b'\n' {
                        self.line += 1;
                    }
                    match next {
                        b'"' | b'\'' | b'\\' => scratch.push(next, line),
                        b'n' => scratch.push(b'\n', line),
                        b'r' => scratch.push(b'\r', line),
                        b't' => scratch.push(b'\t', line),
                        _ => {
                            // Unknown escapes keep the backslash and the byte
                            scratch.push(b'\\', line);
                            scratch.push(next, line);
                        }
                    }
                }
                b'\n' => {
                    scratch.push(b'\n', self.line);
                    self.line += 1;
                }
                _ if byte == quote => {
                    if self.peek_is(quote)? {
                        self.read_byte()?;
                        continue;
                    }
                    return Ok(());
                }
                _ => scratch.push(byte, self.line),
            }
        }
    }

    /// Copy a `${…}` reference verbatim, braces included. The `$` has
    /// already been buffered and the `{` consumed.
    fn scan_variable(&mut self, scratch: &mut Scratch) -> ParseResult<()> {
        scratch.push(b'{', self.line);
        loop {
            let Some(byte) = self.read_byte()? else {
                return Err(self.eof_error());
            };
            scratch.push(byte, self.line);
            match byte {
                b'}' => return Ok(()),
                b'\n' => self.line += 1,
                _ => {}
            }
        }
    }

    /// Capture the body of a `*_by_lua_block` directive up to the matching
    /// closing brace.
    ///
    /// Braces inside Lua strings and `--` line comments do not count toward
    /// nesting. Only trailing whitespace is trimmed from the result.
    fn scan_lua_block(&mut self) -> ParseResult<String> {
        let mut body = Vec::new();
        let mut depth = 0usize;
        loop {
            let Some(byte) = self.read_byte()? else {
                return Err(self.eof_error());
            };
            match byte {
                b'{' => {
                    depth += 1;
                    body.push(byte);
                }
                b'}' => {
                    if depth == 0 {
                        break;
                    }
                    depth -= 1;
                    body.push(byte);
                }
                b'\n' => {
                    body.push(byte);
                    self.line += 1;
                }
                b'-' => {
                    if self.peek_is(b'-')? {
                        self.read_byte()?;
                        body.extend_from_slice(b"--");
                        body.extend_from_slice(&self.read_line()?);
                    } else {
                        body.push(byte);
                    }
                }
                b'"' | b'\'' => {
                    body.push(byte);
                    self.scan_lua_string(byte, &mut body)?;
                }
                _ => body.push(byte),
            }
        }
        let mut body = String::from_utf8_lossy(&body).into_owned();
        body.truncate(body.trim_end().len());
        Ok(body)
    }

    /// Copy a Lua string verbatim through its closing quote. `\<any>` is a
    /// two-byte literal pass-through.
    fn scan_lua_string(&mut self, quote: u8, body: &mut Vec<u8>) -> ParseResult<()> {
        loop {
            let Some(byte) = self.read_byte()? else {
                return Err(self.eof_error());
            };
            body.push(byte);
            match byte {
                b'\\' => {
                    let Some(next) = self.read_byte()? else {
                        return Err(self.eof_error());
                    };
                    body.push(next);
                    if next == b'\n' {
                        self.line += 1;
                    }
                }
                b'\n' => self.line += 1,
                _ if byte == quote => return Ok(()),
                _ => {}
            }
        }
    }

    fn read_byte(&mut self) -> ParseResult<Option<u8>> {
        let file = &self.file_name;
        self.reader.read_byte().map_err(|e| ParseError::Io {
            file: file.clone(),
            source: e,
        })
    }

    fn read_line(&mut self) -> ParseResult<Vec<u8>> {
        let file = &self.file_name;
        self.reader.read_line().map_err(|e| ParseError::Io {
            file: file.clone(),
            source: e,
        })
    }

    fn peek_is(&mut self, expected: u8) -> ParseResult<bool> {
        let file = &self.file_name;
        let peeked = self.reader.peek(1).map_err(|e| ParseError::Io {
            file: file.clone(),
            source: e,
        })?;
        Ok(peeked.first() == Some(&expected))
    }

    fn unexpected(&self, found: char) -> ParseError {
        ParseError::UnexpectedChar {
            file: self.file_name.clone(),
            line: self.line,
            found,
        }
    }

    fn eof_error(&self) -> ParseError {
        ParseError::UnexpectedEof {
            file: self.file_name.clone(),
            line: self.line,
        }
    }
}

/// Escape table for backslashes outside quoted strings: `n`/`r`/`t` map to
/// control characters, anything else passes through with the backslash
/// dropped.
fn unescape(byte: u8) -> u8 {
    match byte {
        b'n' => b'\n',
        b'r' => b'\r',
        b't' => b'\t',
        _ => byte,
    }
}

/// Strip the surrounding parentheses from an `if` condition, so that
/// `($scheme = http)` yields the arguments `$scheme`, `=`, `http`.
fn strip_condition_parens(args: &mut Vec<String>) {
    let wrapped = args.first().is_some_and(|a| a.starts_with('('))
        && args.last().is_some_and(|a| a.ends_with(')'));
    if !wrapped {
        return;
    }
    if let Some(first) = args.first_mut() {
        *first = first[1..].trim().to_string();
    }
    if let Some(last) = args.last_mut() {
        *last = last[..last.len() - 1].trim().to_string();
    }
    if args.last().is_some_and(String::is_empty) {
        args.pop();
    }
    if args.first().is_some_and(String::is_empty) {
        args.remove(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{all_directives, to_source};

    // ===== Basic statement tests =====

    #[test]
    fn test_simple_directive() {
        let tree = parse_string("worker_processes auto;").unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].directive, "worker_processes");
        assert_eq!(tree[0].args, vec!["auto"]);
        assert_eq!(tree[0].line, 1);
        assert_eq!(tree[0].file_name, "");
        assert!(tree[0].block.is_empty());
    }

    #[test]
    fn test_directive_without_args() {
        let tree = parse_string("ip_hash;").unwrap();
        assert_eq!(tree[0].directive, "ip_hash");
        assert!(tree[0].args.is_empty());
    }

    #[test]
    fn test_multiple_args() {
        let tree = parse_string("gzip_types text/plain text/css application/json;").unwrap();
        assert_eq!(
            tree[0].args,
            vec!["text/plain", "text/css", "application/json"]
        );
    }

    #[test]
    fn test_simple_block() {
        let tree = parse_string("events { worker_connections 1024; }").unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].directive, "events");
        assert_eq!(tree[0].line, 1);
        assert_eq!(tree[0].block.len(), 1);
        assert_eq!(tree[0].block[0].directive, "worker_connections");
        assert_eq!(tree[0].block[0].args, vec!["1024"]);
    }

    #[test]
    fn test_nested_blocks() {
        let tree = parse_string("http {\n    server {\n        listen 80;\n    }\n}").unwrap();
        let names: Vec<&str> = all_directives(&tree)
            .map(|d| d.directive.as_str())
            .collect();
        assert_eq!(names, vec!["http", "server", "listen"]);
    }

    #[test]
    fn test_statement_count_matches_input() {
        let tree = parse_string("a 1;\nb 2;\nc 3;\n").unwrap();
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn test_stray_semicolon_ignored() {
        let tree = parse_string(";\ngzip on;\n;").unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].directive, "gzip");
    }

    #[test]
    fn test_crlf_line_endings() {
        let tree = parse_string("gzip on;\r\nsendfile off;\r\n").unwrap();
        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].args, vec!["on"]);
        assert_eq!(tree[1].line, 2);
    }

    #[test]
    fn test_multiline_statement_keeps_start_line() {
        let tree = parse_string("log_format main\n    combined\n    escaped;\n").unwrap();
        assert_eq!(tree[0].line, 1);
        assert_eq!(tree[0].args, vec!["main", "combined", "escaped"]);
    }

    #[test]
    fn test_sibling_lines_non_decreasing() {
        let source = "a 1;\nb 2;\nhttp {\n    c 3;\n    d 4;\n}\ne 5;\n";
        let tree = parse_string(source).unwrap();
        let mut last = 0;
        for node in &tree {
            assert!(node.line >= last);
            last = node.line;
        }
        assert_eq!(tree[2].block[0].line, 4);
        assert_eq!(tree[2].block[1].line, 5);
    }

    // ===== Quoting tests =====

    #[test]
    fn test_double_quoted_argument() {
        let tree = parse_string(r#"add_header X-Custom "value with spaces";"#).unwrap();
        assert_eq!(tree[0].args, vec!["X-Custom", "value with spaces"]);
    }

    #[test]
    fn test_single_quoted_argument() {
        let tree = parse_string("set $var 'single quoted';").unwrap();
        assert_eq!(tree[0].args, vec!["$var", "single quoted"]);
    }

    #[test]
    fn test_quoted_arguments_with_escapes() {
        let tree =
            parse_string(r#"outer-quote "left" '-quote' "right-\"quote\"" "inner\"-\"quote";"#)
                .unwrap();
        assert_eq!(tree[0].directive, "outer-quote");
        assert_eq!(
            tree[0].args,
            vec!["left", "-quote", "right-\"quote\"", "inner\"-\"quote"]
        );
    }

    #[test]
    fn test_escape_sequences_inside_string() {
        let tree = parse_string(r#"log_format main "a\tb\nc";"#).unwrap();
        assert_eq!(tree[0].args[1], "a\tb\nc");
    }

    #[test]
    fn test_unknown_escape_inside_string_keeps_backslash() {
        let tree = parse_string(r#"log_format main "\d+ \w";"#).unwrap();
        assert_eq!(tree[0].args[1], "\\d+ \\w");
    }

    #[test]
    fn test_quote_mid_token_is_literal() {
        let tree = parse_string(r#"rewrite right-"quote" x;"#).unwrap();
        assert_eq!(tree[0].args, vec!["right-\"quote\"", "x"]);
    }

    #[test]
    fn test_adjacent_quotes_continue_token() {
        let tree = parse_string(r#"set $v "a""b";"#).unwrap();
        assert_eq!(tree[0].args, vec!["$v", "ab"]);
    }

    #[test]
    fn test_quote_then_bare_continuation() {
        let tree = parse_string(r#"set $v "a"bar;"#).unwrap();
        assert_eq!(tree[0].args, vec!["$v", "abar"]);
    }

    #[test]
    fn test_empty_quoted_argument() {
        let tree = parse_string(r#"set $v "";"#).unwrap();
        assert_eq!(tree[0].args, vec!["$v", ""]);
    }

    #[test]
    fn test_empty_quoted_directive_name() {
        let tree = parse_string(
            "map $http_upgrade $connection_upgrade {\n    default upgrade;\n    '' close;\n}",
        )
        .unwrap();
        let entries = &tree[0].block;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].directive, "default");
        assert_eq!(entries[1].directive, "");
        assert_eq!(entries[1].args, vec!["close"]);
    }

    #[test]
    fn test_newline_inside_string_counts_lines() {
        let tree = parse_string("set $v 'a\nb';\nnext y;\n").unwrap();
        assert_eq!(tree[0].args[1], "a\nb");
        assert_eq!(tree[0].line, 1);
        assert_eq!(tree[1].line, 3);
    }

    #[test]
    fn test_unterminated_string_fails() {
        let err = parse_string(r#"set $v "unclosed;"#).unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedEof { .. }));
    }

    // ===== Escapes outside strings =====

    #[test]
    fn test_escaped_space_outside_string() {
        let tree = parse_string(r"root /var/my\ www;").unwrap();
        assert_eq!(tree[0].args, vec!["/var/my www"]);
    }

    #[test]
    fn test_escaped_control_chars_outside_string() {
        let tree = parse_string(r"log a\tb;").unwrap();
        assert_eq!(tree[0].args, vec!["a\tb"]);
    }

    #[test]
    fn test_escaped_quote_outside_string() {
        let tree = parse_string(r#"log \"x;"#).unwrap();
        assert_eq!(tree[0].args, vec!["\"x"]);
    }

    // ===== Variable tests =====

    #[test]
    fn test_variable_argument_is_literal_text() {
        let tree = parse_string("proxy_set_header Host $host;").unwrap();
        assert_eq!(tree[0].args, vec!["Host", "$host"]);
    }

    #[test]
    fn test_braced_variable_kept_verbatim() {
        let tree = parse_string("return 200 ${request_uri};").unwrap();
        assert_eq!(tree[0].args, vec!["200", "${request_uri}"]);
    }

    #[test]
    fn test_braced_variable_with_whitespace() {
        let tree = parse_string("log_format m ${a b};").unwrap();
        assert_eq!(tree[0].args, vec!["m", "${a b}"]);
    }

    #[test]
    fn test_braced_variable_does_not_open_block() {
        let tree = parse_string("set $combined ${host}${uri};").unwrap();
        assert_eq!(tree[0].args, vec!["$combined", "${host}${uri}"]);
        assert!(tree[0].block.is_empty());
    }

    #[test]
    fn test_dollar_mid_token() {
        let tree = parse_string("return 301 https://$host$request_uri;").unwrap();
        assert_eq!(tree[0].args, vec!["301", "https://$host$request_uri"]);
    }

    #[test]
    fn test_unterminated_braced_variable_fails() {
        let err = parse_string("set $v ${oops;").unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedEof { .. }));
    }

    // ===== Comment tests =====

    #[test]
    fn test_standalone_comment() {
        let tree = parse_string("# This is a comment\nworker_processes auto;").unwrap();
        assert_eq!(tree.len(), 2);
        assert!(tree[0].is_comment());
        assert_eq!(tree[0].comment, "This is a comment");
        assert!(tree[0].args.is_empty());
        assert_eq!(tree[1].directive, "worker_processes");
    }

    #[test]
    fn test_comment_after_semicolon_is_standalone() {
        let tree = parse_string("\n\n\n\n\n\nlisten 127.0.0.1:8080; #listen").unwrap();
        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].directive, "listen");
        assert_eq!(tree[0].line, 7);
        assert_eq!(tree[0].args, vec!["127.0.0.1:8080"]);
        assert!(tree[1].is_comment());
        assert_eq!(tree[1].line, 7);
        assert_eq!(tree[1].comment, "listen");
    }

    #[test]
    fn test_comment_attaches_to_open_directive() {
        let tree = parse_string("listen 80 # default port\n;").unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].directive, "listen");
        assert_eq!(tree[0].args, vec!["80"]);
        assert_eq!(tree[0].comment, "default port");
    }

    #[test]
    fn test_attached_comment_lines_join_with_space() {
        let tree = parse_string("listen 80 # first\n          # second\n          ;").unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].comment, "first second");
    }

    #[test]
    fn test_double_slash_comment() {
        let tree = parse_string("// managed by tooling\ngzip on;").unwrap();
        assert!(tree[0].is_comment());
        assert_eq!(tree[0].comment, "managed by tooling");
    }

    #[test]
    fn test_hash_mid_token_is_literal() {
        let tree = parse_string("location ~* foo#bar { }").unwrap();
        assert_eq!(tree[0].args, vec!["~*", "foo#bar"]);
    }

    #[test]
    fn test_slash_argument_not_a_comment() {
        let tree = parse_string("location / { root /var/www; }").unwrap();
        assert_eq!(tree[0].args, vec!["/"]);
        assert_eq!(tree[0].block[0].args, vec!["/var/www"]);
    }

    #[test]
    fn test_comment_in_block() {
        let tree = parse_string("server {\n    # inner\n    listen 80;\n}").unwrap();
        let children = &tree[0].block;
        assert!(children[0].is_comment());
        assert_eq!(children[0].line, 2);
        assert_eq!(children[1].directive, "listen");
    }

    #[test]
    fn test_utf8_comment_and_argument() {
        let tree = parse_string("# これは日本語コメント\nserver_name пример.рф;").unwrap();
        assert_eq!(tree[0].comment, "これは日本語コメント");
        assert_eq!(tree[1].args, vec!["пример.рф"]);
    }

    // ===== If directive tests =====

    #[test]
    fn test_if_paren_stripping() {
        let tree = parse_string("if ($scheme = http) { return 200 foo; }").unwrap();
        assert_eq!(tree[0].directive, "if");
        assert_eq!(tree[0].args, vec!["$scheme", "=", "http"]);
        assert_eq!(tree[0].block[0].directive, "return");
        assert_eq!(tree[0].block[0].args, vec!["200", "foo"]);
    }

    #[test]
    fn test_if_single_argument_condition() {
        let tree = parse_string("if ($invalid_referer) { return 403; }").unwrap();
        assert_eq!(tree[0].args, vec!["$invalid_referer"]);
    }

    #[test]
    fn test_if_file_test_condition() {
        let tree = parse_string("if (-f $request_filename) { break; }").unwrap();
        assert_eq!(tree[0].args, vec!["-f", "$request_filename"]);
    }

    #[test]
    fn test_if_without_parens_untouched() {
        let tree = parse_string("if $a { }").unwrap();
        assert_eq!(tree[0].args, vec!["$a"]);
    }

    #[test]
    fn test_non_if_directive_keeps_parens() {
        let tree = parse_string("match (ok) { }").unwrap();
        assert_eq!(tree[0].args, vec!["(ok)"]);
    }

    // ===== Lua block tests =====

    #[test]
    fn test_lua_block_captured_as_argument() {
        let tree = parse_string(
            "init_by_lua_block {\n    print(\"Lua block code with curly brace str {\")\n}",
        )
        .unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].directive, "init_by_lua_block");
        assert_eq!(tree[0].args.len(), 1);
        assert_eq!(
            tree[0].args[0],
            "\n    print(\"Lua block code with curly brace str {\")"
        );
        assert!(tree[0].block.is_empty());
    }

    #[test]
    fn test_lua_block_nested_braces() {
        let tree =
            parse_string("content_by_lua_block { local t = { a = 1 } ngx.say(t.a) }").unwrap();
        assert_eq!(tree[0].args, vec![" local t = { a = 1 } ngx.say(t.a)"]);
    }

    #[test]
    fn test_lua_block_line_comment_hides_brace() {
        let tree =
            parse_string("rewrite_by_lua_block {\n    -- closing } brace\n    ngx.exit(200)\n}")
                .unwrap();
        assert_eq!(
            tree[0].args[0],
            "\n    -- closing } brace\n    ngx.exit(200)"
        );
    }

    #[test]
    fn test_lua_block_escaped_quote_in_string() {
        let tree = parse_string(r#"set_by_lua_block $x { return "a\"b" }"#).unwrap();
        assert_eq!(tree[0].args, vec!["$x", " return \"a\\\"b\""]);
    }

    #[test]
    fn test_lua_block_counts_lines() {
        let tree = parse_string("access_by_lua_block {\n    ngx.exit(403)\n}\nlisten 80;").unwrap();
        assert_eq!(tree[1].directive, "listen");
        assert_eq!(tree[1].line, 4);
    }

    #[test]
    fn test_lua_block_unterminated_fails() {
        let err = parse_string("init_by_lua_block {\n    print(1)\n").unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedEof { .. }));
    }

    #[test]
    fn test_directive_after_lua_block() {
        let tree = parse_string("init_by_lua_block { x = 1 }\ngzip on;").unwrap();
        assert_eq!(tree.len(), 2);
        assert_eq!(tree[1].directive, "gzip");
    }

    // ===== Error tests =====

    #[test]
    fn test_unexpected_open_brace() {
        let err = parse_string("{ }").unwrap_err();
        match err {
            ParseError::UnexpectedChar { found, line, .. } => {
                assert_eq!(found, '{');
                assert_eq!(line, 1);
            }
            e => panic!("expected UnexpectedChar, got {e:?}"),
        }
    }

    #[test]
    fn test_unexpected_close_brace_in_args() {
        let err = parse_string("listen 80 }").unwrap_err();
        match err {
            ParseError::UnexpectedChar { found, .. } => assert_eq!(found, '}'),
            e => panic!("expected UnexpectedChar, got {e:?}"),
        }
    }

    #[test]
    fn test_missing_semicolon_before_close_brace() {
        let err = parse_string("server {\n    listen 80\n}").unwrap_err();
        match err {
            ParseError::UnexpectedChar { found, line, .. } => {
                assert_eq!(found, '}');
                assert_eq!(line, 3);
            }
            e => panic!("expected UnexpectedChar, got {e:?}"),
        }
    }

    #[test]
    fn test_eof_inside_block() {
        let err = parse_string("server {\n    listen 80;\n").unwrap_err();
        match err {
            ParseError::UnexpectedEof { line, .. } => assert_eq!(line, 3),
            e => panic!("expected UnexpectedEof, got {e:?}"),
        }
    }

    #[test]
    fn test_stray_close_brace_then_content_fails() {
        let err = parse_string("server { }\n}\nlisten 80;").unwrap_err();
        match err {
            ParseError::UnexpectedEnd { line, .. } => assert_eq!(line, 3),
            e => panic!("expected UnexpectedEnd, got {e:?}"),
        }
    }

    #[test]
    fn test_error_location_accessor() {
        let err = parse_string("listen 80 }").unwrap_err();
        assert_eq!(err.location(), Some(("", 1)));
    }

    // ===== Include option tests =====

    #[test]
    fn test_include_without_root_fails() {
        let err = parse_string("include conf.d/*.conf;").unwrap_err();
        assert!(matches!(err, ParseError::MissingRoot));
        assert_eq!(err.to_string(), "not found root dir in options");
    }

    #[test]
    fn test_single_file_keeps_include_verbatim() {
        let options = ParseOptions::new().single_file(true);
        let tree = parse_string_with("include conf.d/*.conf;", &options).unwrap();
        assert_eq!(tree[0].directive, "include");
        assert_eq!(tree[0].args, vec!["conf.d/*.conf"]);
        assert!(tree[0].block.is_empty());
    }

    #[test]
    fn test_string_parse_never_touches_filesystem() {
        let options = ParseOptions::new()
            .glob_with(|_| panic!("glob must not be called"))
            .open_with(|_| panic!("open must not be called"));
        let tree = parse_string_with("http { server { listen 80; } }", &options).unwrap();
        assert_eq!(tree.len(), 1);
    }

    // ===== Reader entry point =====

    #[test]
    fn test_parse_reader_has_empty_file_name() {
        let tree = parse_reader("gzip on;".as_bytes()).unwrap();
        assert_eq!(tree[0].file_name, "");
        assert_eq!(tree[0].args, vec!["on"]);
    }

    // ===== Round-trip =====

    #[test]
    fn test_roundtrip_is_stable() {
        let source = r#"
# front matter
worker_processes auto;

http {
    log_format main "a b;c" '-';
    map $http_upgrade $connection_upgrade {
        default upgrade;
        '' close;
    }

    server {
        listen 80;
        if ($scheme = http) {
            return 301 https://$host$request_uri;
        }
        location / {
            content_by_lua_block {
                ngx.say("hello { world")
            }
        }
    }
}
"#;
        let first = to_source(&parse_string(source).unwrap());
        let second = to_source(&parse_string(&first).unwrap());
        assert_eq!(first, second);

        let names1: Vec<String> = all_directives(&parse_string(source).unwrap())
            .map(|d| d.directive.clone())
            .collect();
        let names2: Vec<String> = all_directives(&parse_string(&first).unwrap())
            .map(|d| d.directive.clone())
            .collect();
        assert_eq!(names1, names2);
    }

    #[test]
    fn test_roundtrip_preserves_args_exactly() {
        let source = r#"outer-quote "left" '-quote' "right-\"quote\"" "inner\"-\"quote";"#;
        let tree = parse_string(source).unwrap();
        let reparsed = parse_string(&to_source(&tree)).unwrap();
        assert_eq!(tree[0].args, reparsed[0].args);
    }
}
