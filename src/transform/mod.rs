//! # Macro pass
//!
//! Replaces every invocation of the macro in a compilation unit with the class string it
//! denotes. The pass is made of three cooperating pieces:
//!
//! - [`driver`] walks from a reference up its access chain, collects variants and
//!   arguments, and performs the substitution.
//! - [`resolve`] folds an argument expression to a string, transforming nested macro
//!   invocations on demand.
//! - [`references`] finds the macro import and its references in a [`SyntaxTree`].
//!
//! The resolver and driver are written against [`SyntaxHost`] only.
//!
//! [`SyntaxTree`]: crate::syntax::SyntaxTree

pub mod driver;
pub mod references;
pub mod resolve;

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::config::TailwindConfig;
use crate::errors::{MacroError, SourceContext};
use crate::syntax::SyntaxHost;

pub use driver::{collect_invocation, transform_reference, Invocation};
pub use resolve::resolve;

/// State threaded through one compilation unit's pass.
///
/// Holds the read-only configuration, the catalogue of references, and the idempotence
/// guard shared by every reference in the unit.
pub struct TransformContext<'a, N> {
    /// Local name the macro is bound to, used when a reference's own name is unavailable.
    pub name: String,
    pub config: &'a TailwindConfig,
    pub source: &'a SourceContext,
    references: Vec<N>,
    /// node -> indices of the references it strictly contains
    containing: HashMap<N, Vec<usize>>,
    transformed: HashSet<N>,
    in_progress: HashSet<N>,
    /// declarations whose initializer is currently being folded
    resolving: HashSet<N>,
}

impl<'a, N> TransformContext<'a, N>
where
    N: Copy + Eq + std::hash::Hash + std::fmt::Debug,
{
    pub fn new<H>(
        host: &H,
        name: impl Into<String>,
        config: &'a TailwindConfig,
        source: &'a SourceContext,
        references: Vec<N>,
    ) -> Self
    where
        H: SyntaxHost<Node = N>,
    {
        let mut containing: HashMap<N, Vec<usize>> = HashMap::new();
        for (index, reference) in references.iter().enumerate() {
            let mut current = host.parent(*reference);
            while let Some(ancestor) = current {
                containing.entry(ancestor).or_default().push(index);
                current = host.parent(ancestor);
            }
        }

        Self {
            name: name.into(),
            config,
            source,
            references,
            containing,
            transformed: HashSet::new(),
            in_progress: HashSet::new(),
            resolving: HashSet::new(),
        }
    }

    pub fn references(&self) -> &[N] {
        &self.references
    }

    pub fn is_transformed(&self, reference: N) -> bool {
        self.transformed.contains(&reference)
    }

    /// First reference inside `node` that has not been transformed yet.
    pub fn pending_reference_within(&self, node: N) -> Option<N> {
        self.containing
            .get(&node)?
            .iter()
            .map(|index| self.references[*index])
            .find(|reference| !self.transformed.contains(reference))
    }

    /// Marks a reference as being transformed. Returns false if it already is, which
    /// only happens when its own arguments depend on it.
    pub(crate) fn begin(&mut self, reference: N) -> bool {
        self.in_progress.insert(reference)
    }

    pub(crate) fn finish(&mut self, reference: N) {
        self.in_progress.remove(&reference);
        self.transformed.insert(reference);
    }

    pub(crate) fn enter_declaration(&mut self, declaration: N) -> bool {
        self.resolving.insert(declaration)
    }

    pub(crate) fn leave_declaration(&mut self, declaration: N) {
        self.resolving.remove(&declaration);
    }
}

/// Transforms every reference in the unit. Returns how many were transformed.
///
/// References are visited innermost-first; a reference already consumed while resolving
/// an enclosing invocation's arguments is skipped.
pub fn run_pass<H: SyntaxHost>(
    host: &mut H,
    ctx: &mut TransformContext<'_, H::Node>,
) -> Result<usize, MacroError> {
    let references = ctx.references().to_vec();
    for reference in references.into_iter().rev() {
        transform_reference(ctx, host, reference)?;
    }
    debug!(
        name = %ctx.name,
        transformed = ctx.transformed.len(),
        "macro pass complete"
    );
    Ok(ctx.transformed.len())
}
