//! AST types for nginx configuration files.
//!
//! The parser produces a tree of [`Directive`] nodes. Comments are synthetic
//! directives named `"#"`; included files contribute their top-level
//! directives as children of the `include` node that pulled them in.

use serde::{Deserialize, Serialize};

/// A single configuration statement: a name, its arguments, and optionally a
/// nested block or trailing comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Directive {
    /// 1-based line on which the directive begins in its source file.
    pub line: usize,
    /// The file the directive was read from, as given to the parser.
    /// Included directives keep the name of the file they came from.
    pub file_name: String,
    /// The directive name. Comment nodes use `"#"`; the empty string is
    /// legal (quote-first keys in `map` blocks).
    pub directive: String,
    /// Positional arguments in source order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    /// Nested directives for a brace block, or the expanded contents of an
    /// `include`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub block: Vec<Directive>,
    /// Comment text: the body of a `"#"` node, or comments attached to a
    /// directive that was still open when the comment appeared.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub comment: String,
}

impl Directive {
    pub(crate) fn new(line: usize, file_name: &str, directive: String) -> Self {
        Self {
            line,
            file_name: file_name.to_string(),
            directive,
            args: Vec::new(),
            block: Vec::new(),
            comment: String::new(),
        }
    }

    pub(crate) fn new_comment(line: usize, file_name: &str, text: &str) -> Self {
        let mut node = Self::new(line, file_name, "#".to_string());
        node.comment = text.to_string();
        node
    }

    /// Check if this directive has a specific name
    pub fn is(&self, name: &str) -> bool {
        self.directive == name
    }

    /// True for synthetic comment nodes.
    pub fn is_comment(&self) -> bool {
        self.directive == "#"
    }

    /// Get the first argument (useful for simple directives)
    pub fn first_arg(&self) -> Option<&str> {
        self.args.first().map(String::as_str)
    }

    /// Check if the first argument equals a specific value
    pub fn first_arg_is(&self, value: &str) -> bool {
        self.first_arg() == Some(value)
    }

    fn write_source(&self, output: &mut String, indent: usize) {
        let indent_str = "    ".repeat(indent);
        output.push_str(&indent_str);

        if self.is_comment() {
            output.push_str("# ");
            output.push_str(&self.comment);
            output.push('\n');
            return;
        }

        write_arg(output, &self.directive);

        if crate::parser::is_lua_block_directive(&self.directive) && !self.args.is_empty() {
            // The captured body is the final argument; everything before it
            // is a regular argument.
            let last = self.args.len() - 1;
            for arg in &self.args[..last] {
                output.push(' ');
                write_arg(output, arg);
            }
            output.push_str(" {");
            output.push_str(&self.args[last]);
            output.push('\n');
            output.push_str(&indent_str);
            output.push('}');
        } else if !self.block.is_empty() && !self.is("include") {
            for arg in &self.args {
                output.push(' ');
                write_arg(output, arg);
            }
            output.push_str(" {\n");
            for child in &self.block {
                child.write_source(output, indent + 1);
            }
            output.push_str(&indent_str);
            output.push('}');
        } else {
            // Simple statement. An include keeps its original pattern
            // arguments; its expanded block is derived data.
            for arg in &self.args {
                output.push(' ');
                write_arg(output, arg);
            }
            output.push(';');
        }

        if !self.comment.is_empty() {
            output.push_str(" # ");
            output.push_str(&self.comment);
        }

        output.push('\n');
    }
}

/// Reconstruct configuration syntax from a tree of directives.
///
/// The output reparses to an equivalent tree (ignoring whitespace and
/// comment attachment), which makes it usable for dumping transformed
/// configurations.
pub fn to_source(directives: &[Directive]) -> String {
    let mut output = String::new();
    for directive in directives {
        directive.write_source(&mut output, 0);
    }
    output
}

/// Write one argument, quoting it when the bare form would not survive a
/// reparse.
fn write_arg(output: &mut String, arg: &str) {
    let needs_quoting = arg.is_empty()
        || arg.starts_with("//")
        || arg
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, ';' | '{' | '}' | '#' | '"' | '\'' | '\\'));
    if !needs_quoting {
        output.push_str(arg);
        return;
    }
    output.push('"');
    for c in arg.chars() {
        match c {
            '"' => output.push_str("\\\""),
            '\\' => output.push_str("\\\\"),
            _ => output.push(c),
        }
    }
    output.push('"');
}

/// Returns a depth-first iterator over every directive in a tree,
/// skipping comment nodes.
pub fn all_directives(directives: &[Directive]) -> AllDirectives<'_> {
    AllDirectives {
        stack: vec![directives.iter()],
    }
}

/// Iterator over all directives in a tree (recursively)
pub struct AllDirectives<'a> {
    stack: Vec<std::slice::Iter<'a, Directive>>,
}

impl<'a> Iterator for AllDirectives<'a> {
    type Item = &'a Directive;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(iter) = self.stack.last_mut() {
            if let Some(directive) = iter.next() {
                if directive.is_comment() {
                    continue;
                }
                if !directive.block.is_empty() {
                    self.stack.push(directive.block.iter());
                }
                return Some(directive);
            }
            // Current iterator is exhausted, pop it
            self.stack.pop();
        }
        None
    }
}
