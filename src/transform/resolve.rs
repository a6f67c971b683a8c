//! Constant expression resolver.
//!
//! Folds the small expression grammar that can denote a compile time string: string
//! literals, template literals whose interpolations fold, identifiers bound by `const` to
//! something that folds, and nested invocations of the macro itself.
//!
//! `Ok(None)` means the expression is legal but its value is not known at compile time.
//! Errors only come from nested macro invocations that are themselves malformed.

use tracing::trace;

use crate::errors::MacroError;
use crate::syntax::{Binding, BindingKind, NodeShape, SyntaxHost};
use crate::transform::{transform_reference, TransformContext};

pub fn resolve<H: SyntaxHost>(
    ctx: &mut TransformContext<'_, H::Node>,
    host: &mut H,
    node: H::Node,
) -> Result<Option<String>, MacroError> {
    let mut shape = host.shape(node);

    // a nested invocation is transformed in place, then read back as a literal
    if matches!(
        shape,
        NodeShape::Call { .. } | NodeShape::TaggedTemplate { .. }
    ) {
        if let Some(reference) = ctx.pending_reference_within(node) {
            transform_reference(ctx, host, reference)?;
            shape = host.shape(node);
        }
    }

    match shape {
        NodeShape::StringLiteral(value) => Ok(Some(value)),
        NodeShape::Template {
            quasis,
            expressions,
        } => {
            let mut values = Vec::with_capacity(expressions.len());
            for expression in expressions {
                values.push(resolve(ctx, host, expression)?);
            }
            if values.iter().any(Option::is_none) {
                trace!(?node, "template interpolation is not constant");
                return Ok(None);
            }

            let mut quasis = quasis.into_iter();
            let mut result = quasis.next().unwrap_or_default();
            for (value, quasi) in values.into_iter().flatten().zip(quasis) {
                result.push_str(&value);
                result.push_str(&quasi);
            }
            Ok(Some(result))
        }
        NodeShape::Identifier(name) => match host.binding(node) {
            Some(Binding {
                kind: BindingKind::Const,
                declaration,
                init: Some(init),
            }) => {
                if !ctx.enter_declaration(declaration) {
                    trace!(%name, "cyclic const initializer");
                    return Ok(None);
                }
                let value = resolve(ctx, host, init);
                ctx.leave_declaration(declaration);
                value
            }
            binding => {
                trace!(%name, kind = ?binding.map(|b| b.kind), "identifier is not a const binding");
                Ok(None)
            }
        },
        _ => Ok(None),
    }
}
