//! Invocation driver.
//!
//! For one reference, walks upward through the property accesses that qualify it,
//! collects their names as variants, resolves the arguments of the terminating call or
//! tagged template, and substitutes the composed class string for the whole expression.

use tracing::debug;

use crate::errors::MacroError;
use crate::syntax::{MemberProperty, NodeShape, SyntaxHost};
use crate::transform::{resolve, TransformContext};
use crate::variants::compose;

/// A fully collected macro invocation, ready for composition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation<N> {
    /// The call or tagged template expression that gets replaced.
    pub node: N,
    /// Variant names in chain order, as written.
    pub variants: Vec<String>,
    pub params: Vec<String>,
}

/// Transforms `reference` unless it already was. Nested references discovered while
/// resolving its arguments are transformed first.
pub fn transform_reference<H: SyntaxHost>(
    ctx: &mut TransformContext<'_, H::Node>,
    host: &mut H,
    reference: H::Node,
) -> Result<(), MacroError> {
    if ctx.is_transformed(reference) || !ctx.begin(reference) {
        return Ok(());
    }

    let name = match host.shape(reference) {
        NodeShape::Identifier(name) => name,
        _ => ctx.name.clone(),
    };

    let invocation = collect_invocation(ctx, host, &name, reference)?;
    let composed = compose(ctx.config, &invocation.variants, &invocation.params);
    debug!(
        %name,
        variants = ?invocation.variants,
        output = %composed,
        "transformed macro reference"
    );

    host.replace_with_string(invocation.node, composed);
    ctx.finish(reference);
    Ok(())
}

/// Walks from `reference` to the invocation that consumes it.
pub fn collect_invocation<H: SyntaxHost>(
    ctx: &mut TransformContext<'_, H::Node>,
    host: &mut H,
    name: &str,
    reference: H::Node,
) -> Result<Invocation<H::Node>, MacroError> {
    let mut variants = Vec::new();
    let mut child = reference;

    loop {
        let Some(parent) = host.parent(child) else {
            return Err(ctx.source.invalid_usage(name, host.span(reference)));
        };

        match host.shape(parent) {
            NodeShape::Call { callee, arguments } if callee == child => {
                let params = call_params(ctx, host, name, &arguments)?;
                return Ok(Invocation {
                    node: parent,
                    variants,
                    params,
                });
            }
            NodeShape::TaggedTemplate { tag, quasi } if tag == child => {
                let Some(param) = resolve(ctx, host, quasi)? else {
                    return Err(ctx.source.non_constant_argument(
                        format!("{name}`` macro only accepts compile time values"),
                        host.span(quasi),
                    ));
                };
                return Ok(Invocation {
                    node: parent,
                    variants,
                    params: vec![param],
                });
            }
            NodeShape::Member { object, property } if object == child => {
                let variant = match property {
                    MemberProperty::Named(variant) => variant,
                    MemberProperty::Computed(key) => match resolve(ctx, host, key)? {
                        Some(variant) => variant,
                        None => {
                            return Err(ctx.source.non_constant_variant(name, host.span(key)))
                        }
                    },
                };
                variants.push(variant);
                child = parent;
            }
            _ => return Err(ctx.source.invalid_usage(name, host.span(reference))),
        }
    }
}

fn call_params<H: SyntaxHost>(
    ctx: &mut TransformContext<'_, H::Node>,
    host: &mut H,
    name: &str,
    arguments: &[H::Node],
) -> Result<Vec<String>, MacroError> {
    let mut params = Vec::with_capacity(arguments.len());
    for argument in arguments {
        match resolve(ctx, host, *argument)? {
            Some(param) => params.push(param),
            None => {
                return Err(ctx.source.non_constant_argument(
                    format!("{name}() macro only accepts compile time parameters"),
                    host.span(*argument),
                ))
            }
        }
    }
    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TailwindConfig;
    use crate::errors::{ErrorKind, SourceContext};
    use crate::syntax::{parse, NodeId, NodeKind, SyntaxTree};

    fn references(tree: &SyntaxTree) -> Vec<NodeId> {
        let mut refs: Vec<_> = tree
            .ids()
            .filter(|id| matches!(tree.kind(*id), NodeKind::Ident(n) if n == "tw"))
            .collect();
        refs.sort_by_key(|id| tree.span(*id).start);
        refs
    }

    fn collect(source: &str) -> Result<Invocation<NodeId>, MacroError> {
        let source = SourceContext::from_file("test.js", source);
        let mut tree = parse(&source).unwrap();
        let config = TailwindConfig::default();
        let refs = references(&tree);
        let mut ctx = TransformContext::new(&tree, "tw", &config, &source, refs.clone());
        collect_invocation(&mut ctx, &mut tree, "tw", refs[0])
    }

    #[test]
    fn test_collects_named_and_computed_variants() {
        let invocation = collect("const v = 'focus';\ntw.md[\"group-hover\"][v](\"a\", `b`);").unwrap();
        assert_eq!(invocation.variants, vec!["md", "group-hover", "focus"]);
        assert_eq!(invocation.params, vec!["a", "b"]);
    }

    #[test]
    fn test_tagged_template_param() {
        let invocation = collect("tw.hover`ring p-2`;").unwrap();
        assert_eq!(invocation.variants, vec!["hover"]);
        assert_eq!(invocation.params, vec!["ring p-2"]);
    }

    #[test]
    fn test_bare_reference_is_invalid_usage() {
        let err = collect("const x = tw;").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidUsage);
        assert_eq!(err.span(), Some((10..12).into()));
    }

    #[test]
    fn test_uncalled_chain_points_at_reference() {
        let source = "let a = 1;
const x = tw.md.hover;";
        let err = collect(source).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidUsage);
        let at = source.find("tw").unwrap();
        assert_eq!(err.span(), Some((at..at + 2).into()));
    }

    #[test]
    fn test_reference_as_argument_is_invalid_usage() {
        let err = collect("foo(tw);").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidUsage);
    }

    #[test]
    fn test_runtime_variant_key() {
        let source = "let v = 'hover';\ntw.md[v](\"ring\");";
        let err = collect(source).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NonConstantVariant);
        let at = source.find("[v]").unwrap() + 1;
        assert_eq!(err.span(), Some((at..at + 1).into()));
    }

    #[test]
    fn test_runtime_argument_points_at_argument() {
        let source = "function f(p) { return tw(\"a\", p); }";
        let err = collect(source).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NonConstantArgument);
        let at = source.find(", p").unwrap() + 2;
        assert_eq!(err.span(), Some((at..at + 1).into()));
    }

    #[test]
    fn test_transform_is_idempotent() {
        let source = SourceContext::from_file("test.js", "tw.hover(\"ring\");");
        let mut tree = parse(&source).unwrap();
        let config = TailwindConfig::default();
        let refs = references(&tree);
        let mut ctx = TransformContext::new(&tree, "tw", &config, &source, refs.clone());
        transform_reference(&mut ctx, &mut tree, refs[0]).unwrap();
        transform_reference(&mut ctx, &mut tree, refs[0]).unwrap();
        assert!(ctx.is_transformed(refs[0]));
        assert_eq!(tree.render(), "\"hover:ring\";");
    }
}
