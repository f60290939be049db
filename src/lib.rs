//! nginx configuration file parser
//!
//! This crate parses nginx configuration files into a tree of
//! [`Directive`] nodes carrying source locations, arguments, nested
//! blocks, and comments. It accepts **any directive name**, so extension
//! modules (ngx_headers_more, lua-nginx-module, etc.) parse without
//! special configuration, and `*_by_lua_block` bodies are captured
//! verbatim as a single argument.
//!
//! # Quick Start
//!
//! ```
//! use ngx_conf::parse_string;
//!
//! let tree = parse_string("http { server { listen 80; } }").unwrap();
//!
//! for directive in ngx_conf::all_directives(&tree) {
//!     println!("{} at line {}", directive.directive, directive.line);
//! }
//! ```
//!
//! To parse from a file on disk, expanding `include` directives relative
//! to a root directory:
//!
//! ```no_run
//! use ngx_conf::{ParseOptions, parse_file_with};
//!
//! let options = ParseOptions::new().root("/etc/nginx");
//! let tree = parse_file_with("/etc/nginx/nginx.conf", &options).unwrap();
//! ```
//!
//! # Modules
//!
//! - [`ast`] — AST types: [`Directive`], the [`all_directives`] iterator,
//!   [`to_source`] reconstruction
//! - [`error`] — Error types: [`ParseError`], [`ParseResult`]
//! - [`options`] — [`ParseOptions`] and the glob/open capabilities
//! - [`parser`] — the parse entry points
//!
//! # Include expansion
//!
//! An `include` directive keeps its unresolved patterns in `args`; the
//! top-level directives of every matched file appear in `block`, each
//! annotated with its own file name and line numbers. Relative patterns
//! resolve against [`ParseOptions::root`]; with
//! [`ParseOptions::single_file`] the directive is kept verbatim instead.
//!
//! # Comments
//!
//! `#` and `//` comments become synthetic directives named `"#"` with the
//! text in `comment`, except while a statement is still open: then the
//! comment attaches to that statement's `comment` field.

pub mod ast;
pub mod error;
mod include;
pub mod options;
pub mod parser;
mod reader;

pub use ast::{AllDirectives, Directive, all_directives, to_source};
pub use error::{ParseError, ParseResult};
pub use options::{GlobFn, OpenFn, ParseOptions};
pub use parser::{
    is_lua_block_directive, parse_file, parse_file_with, parse_reader, parse_reader_with,
    parse_string, parse_string_with,
};
