//! Build-time folding of chained Tailwind variant calls.
//!
//! ```js
//! import { tw } from "./tailwind-variant.macro";
//! tw.md(tw.hover("ring"));
//! ```
//!
//! becomes
//!
//! ```js
//! "md:hover:ring";
//! ```
//!
//! [`transform_source`] is the entry point for hosts that hand over whole compilation
//! units. The pieces underneath ([`compose`], [`transform::resolve()`],
//! [`transform::transform_reference`]) are usable on their own against any tree that
//! implements [`syntax::SyntaxHost`].
//!
//! # Supported syntax
//!
//! The bundled parser reads a JavaScript subset: imports, exports, `const`/`let`/`var`,
//! function declarations, arrow functions, `if`/`else`, blocks, `return`, assignment,
//! conditional, unary and binary operators, calls, member access, tagged templates,
//! string and template literals, numbers, arrays and object literals.
//!
//! Not supported, and reported as a parse error for the whole unit: classes, loops,
//! `switch`, `try`, `new`, `async`/`await`, destructuring, spread arguments, method
//! shorthand, optional chaining, `++`/`--`, compound assignment, regular expression
//! literals, JSX and TypeScript syntax.

pub mod config;
pub mod errors;
pub mod syntax;
pub mod transform;
pub mod variants;

use tracing::debug;

pub use crate::config::{MacroOptions, TailwindConfig};
pub use crate::errors::{ErrorKind, MacroError, SourceContext};
pub use crate::variants::compose;

use crate::transform::references::{
    collect_references, find_macro_imports, macro_import_declarations,
};
use crate::transform::{run_pass, TransformContext};

/// Transforms one compilation unit, loading the tailwind config named by `options`.
pub fn transform_source(
    name: &str,
    source: &str,
    options: &MacroOptions,
) -> Result<String, MacroError> {
    let config = options.load_config()?;
    transform_with_config(name, source, options, &config)
}

/// Transforms one compilation unit with an already resolved config.
///
/// Units that do not import the macro are returned unchanged.
pub fn transform_with_config(
    name: &str,
    source: &str,
    options: &MacroOptions,
    config: &TailwindConfig,
) -> Result<String, MacroError> {
    let source_ctx = SourceContext::from_file(name, source);
    let mut tree = syntax::parse(&source_ctx)?;

    let imports = find_macro_imports(&tree, &options.import_name);
    if imports.is_empty() {
        return Ok(source.to_string());
    }

    // one context for every alias, so `css(tw("a"))` nests like `tw(tw("a"))`
    let mut references: Vec<_> = imports
        .iter()
        .flat_map(|import| collect_references(&tree, import))
        .collect();
    references.sort_by_key(|id| tree.node(*id).span.start);

    let mut ctx = TransformContext::new(
        &tree,
        imports[0].local_name.as_str(),
        config,
        &source_ctx,
        references,
    );
    let transformed = run_pass(&mut tree, &mut ctx)?;
    debug!(unit = name, imports = imports.len(), transformed, "macro pass finished");

    for declaration in macro_import_declarations(&imports) {
        tree.remove(declaration);
    }
    Ok(tree.render())
}
