//! Include directive resolution.
//!
//! An `include` statement keeps its pattern arguments and receives the
//! top-level directives of every matched file as its block, spliced in
//! glob order. Each matched file is parsed by a fresh parser instance with
//! its own line counter and file name; only the options record is shared,
//! so nested includes resolve their patterns against the same root as the
//! file that started the parse.
//!
//! Cycles are not detected: a configuration that includes itself recurses
//! until the stack runs out, and repeated includes of a shared snippet are
//! expanded every time.

use crate::ast::Directive;
use crate::error::{ParseError, ParseResult};
use crate::options::ParseOptions;
use crate::parser;
use log::debug;
use std::path::Path;

/// Expand the patterns of an `include` node into its block.
pub(crate) fn resolve(node: &mut Directive, options: &ParseOptions) -> ParseResult<()> {
    let patterns = node.args.clone();
    for pattern in patterns {
        let full_pattern = resolve_pattern(&pattern, options)?;
        let matches = options.glob(&full_pattern).map_err(|e| ParseError::Io {
            file: full_pattern.clone(),
            source: e,
        })?;
        debug!(
            "include pattern {:?} matched {} file(s)",
            full_pattern,
            matches.len()
        );
        for path in matches {
            let directives = parser::parse_file_with(&path, options)?;
            node.block.extend(directives);
        }
    }
    Ok(())
}

/// Prefix a relative pattern with the configured root directory.
fn resolve_pattern(pattern: &str, options: &ParseOptions) -> ParseResult<String> {
    if Path::new(pattern).is_absolute() {
        return Ok(pattern.to_string());
    }
    let Some(root) = options.root_dir() else {
        return Err(ParseError::MissingRoot);
    };
    Ok(root.join(pattern).display().to_string())
}
