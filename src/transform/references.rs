//! Reference collection for the bundled [`SyntaxTree`] host.
//!
//! The macro is brought into scope with an import from a module whose specifier ends in
//! `tailwind-variant.macro`. Every identifier expression bound to that import is a
//! reference; shadowed names are not.

use crate::syntax::{BindingKind, NodeId, NodeKind, SyntaxHost, SyntaxTree};

pub const MACRO_MODULE_SUFFIX: &str = "tailwind-variant.macro";

/// One import specifier that binds the macro.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroImport {
    /// The whole import declaration, removed once the pass succeeds.
    pub declaration: NodeId,
    pub specifier: NodeId,
    /// Local name, which differs from the exported one when aliased.
    pub local_name: String,
}

pub fn is_macro_module(source: &str) -> bool {
    source.ends_with(MACRO_MODULE_SUFFIX)
}

/// Finds the specifiers importing `import_name` from the macro module, in source order.
///
/// A default import is accepted too, bound to whatever local name it was given.
pub fn find_macro_imports(tree: &SyntaxTree, import_name: &str) -> Vec<MacroImport> {
    let mut imports = Vec::new();
    for statement in tree.children(tree.root()) {
        let NodeKind::Import { source } = tree.kind(*statement) else {
            continue;
        };
        if !is_macro_module(source) {
            continue;
        }

        for specifier in tree.children(*statement) {
            let NodeKind::ImportSpecifier { imported } = tree.kind(*specifier) else {
                continue;
            };
            if imported != import_name && imported != "default" {
                continue;
            }
            let Some(local) = tree.children(*specifier).first() else {
                continue;
            };
            if let NodeKind::BindingIdent(local_name) = tree.kind(*local) {
                imports.push(MacroImport {
                    declaration: *statement,
                    specifier: *specifier,
                    local_name: local_name.clone(),
                });
            }
        }
    }
    imports
}

/// Identifier expressions that resolve to `import`, in source order.
pub fn collect_references(tree: &SyntaxTree, import: &MacroImport) -> Vec<NodeId> {
    let mut references: Vec<NodeId> = tree
        .ids()
        .filter(|id| matches!(tree.kind(*id), NodeKind::Ident(name) if *name == import.local_name))
        .filter(|id| {
            tree.binding(*id).is_some_and(|binding| {
                binding.kind == BindingKind::Import && binding.declaration == import.specifier
            })
        })
        .collect();
    references.sort_by_key(|id| tree.span(*id).start);
    references
}

/// Import declarations to drop after a successful pass.
pub fn macro_import_declarations(imports: &[MacroImport]) -> Vec<NodeId> {
    let mut declarations: Vec<NodeId> = imports.iter().map(|i| i.declaration).collect();
    declarations.dedup();
    declarations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SourceContext;
    use crate::syntax::parse;

    fn tree(source: &str) -> SyntaxTree {
        parse(&SourceContext::from_file("test.js", source)).unwrap()
    }

    #[test]
    fn test_finds_aliased_import() {
        let t = tree("import { tw as css } from \"../tailwind-variant.macro\";\ncss(\"a\");");
        let imports = find_macro_imports(&t, "tw");
        assert_eq!(imports.len(), 1);
        assert_eq!(imports[0].local_name, "css");
        assert_eq!(collect_references(&t, &imports[0]).len(), 1);
    }

    #[test]
    fn test_ignores_other_modules() {
        let t = tree("import { tw } from \"twind\";\ntw(\"a\");");
        assert!(find_macro_imports(&t, "tw").is_empty());
    }

    #[test]
    fn test_shadowed_names_are_not_references() {
        let t = tree(
            "import { tw } from \"./tailwind-variant.macro\";\n\
             tw(\"a\");\n\
             function f(tw) { return tw(\"b\"); }\n\
             tw.hover(tw(\"c\"));",
        );
        let imports = find_macro_imports(&t, "tw");
        let refs = collect_references(&t, &imports[0]);
        assert_eq!(refs.len(), 3);
        let starts: Vec<_> = refs.iter().map(|r| t.span(*r).start).collect();
        let mut sorted = starts.clone();
        sorted.sort();
        assert_eq!(starts, sorted);
    }

    #[test]
    fn test_default_import() {
        let t = tree("import variant from \"tailwind-variant.macro\";\nvariant.md(\"a\");");
        let imports = find_macro_imports(&t, "tw");
        assert_eq!(imports[0].local_name, "variant");
    }
}
