//! Parser for the macro host's JavaScript subset.
//!
//! Converts source text into a [`SyntaxTree`] with source location tracking. The parser is
//! purely syntactic; scope questions are answered later by the tree itself.

use pest::{error::InputLocation, iterators::Pair, Parser};
use pest_derive::Parser;

use crate::errors::{MacroError, SourceContext};
use crate::syntax::{DeclKind, NodeId, NodeKind, Span, SyntaxTree};

#[derive(Parser)]
#[grammar = "syntax/grammar.pest"]
struct HostParser;

// ============================================================================
// PUBLIC API
// ============================================================================

/// Parse a compilation unit into a syntax tree.
pub fn parse(source: &SourceContext) -> Result<SyntaxTree, MacroError> {
    let mut pairs = HostParser::parse(Rule::program, &source.content)
        .map_err(|e| convert_parse_error(e, source))?;

    let program = pairs
        .next()
        .ok_or_else(|| source.parse_error("empty parse result", Span::default()))?;

    let mut builder = TreeBuilder {
        tree: SyntaxTree::new(source.content.clone()),
        source,
    };
    let statements = program
        .into_inner()
        .filter(|p| p.as_rule() != Rule::EOI)
        .map(|p| builder.statement(p))
        .collect::<Result<Vec<_>, _>>()?;

    let root = builder.tree.push(
        NodeKind::Program,
        Span::new(0, source.content.len()),
        statements,
    );
    builder.tree.set_root(root);
    Ok(builder.tree)
}

// ============================================================================
// TREE BUILDER
// ============================================================================

struct TreeBuilder<'a> {
    tree: SyntaxTree,
    source: &'a SourceContext,
}

impl TreeBuilder<'_> {
    fn statement(&mut self, pair: Pair<Rule>) -> Result<NodeId, MacroError> {
        let span = get_span(&pair);
        match pair.as_rule() {
            Rule::import_decl => self.import_decl(pair),
            Rule::var_decl => self.var_decl(pair),
            Rule::function_decl => {
                let mut children = Vec::new();
                let mut params = 0;
                for inner in pair.into_inner() {
                    match inner.as_rule() {
                        Rule::kw_function => {}
                        Rule::binding_ident => children.push(self.binding_ident(&inner)),
                        Rule::params => {
                            let ids = self.params(inner);
                            params = ids.len();
                            children.extend(ids);
                        }
                        _ => children.push(self.statement(inner)?),
                    }
                }
                Ok(self.tree.push(NodeKind::Function { params }, span, children))
            }
            Rule::export_decl => {
                let mut children = Vec::new();
                for inner in pair.into_inner() {
                    match inner.as_rule() {
                        Rule::kw_export | Rule::kw_default => {}
                        Rule::var_decl | Rule::function_decl => {
                            children.push(self.statement(inner)?)
                        }
                        Rule::export_list => children.extend(self.export_list(inner)),
                        _ => children.push(self.expr(inner)?),
                    }
                }
                Ok(self.tree.push(NodeKind::Export, span, children))
            }
            Rule::if_stmt => {
                let mut children = Vec::new();
                for inner in pair.into_inner() {
                    match inner.as_rule() {
                        Rule::kw_if | Rule::kw_else => {}
                        _ if children.is_empty() => children.push(self.expr(inner)?),
                        _ => children.push(self.statement(inner)?),
                    }
                }
                Ok(self.tree.push(NodeKind::If, span, children))
            }
            Rule::return_stmt => {
                let children = pair
                    .into_inner()
                    .filter(|p| p.as_rule() != Rule::kw_return)
                    .map(|p| self.expr(p))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(self.tree.push(NodeKind::Return, span, children))
            }
            Rule::block => {
                let children = pair
                    .into_inner()
                    .map(|p| self.statement(p))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(self.tree.push(NodeKind::Block, span, children))
            }
            Rule::empty_stmt => Ok(self.tree.push(NodeKind::Empty, span, vec![])),
            Rule::expr_stmt => {
                let inner = self.first_inner(pair, "expression")?;
                let expr = self.expr(inner)?;
                Ok(self.tree.push(NodeKind::ExprStmt, span, vec![expr]))
            }
            rule => Err(self.unsupported(rule, span)),
        }
    }

    fn import_decl(&mut self, pair: Pair<Rule>) -> Result<NodeId, MacroError> {
        // pest lets the span run over trivia skipped while probing for `;`
        let mut span = get_span(&pair);
        let mut specifiers = Vec::new();
        let mut module = String::new();

        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::default_import => {
                    let spec_span = get_span(&inner);
                    let local = self.first_inner(inner, "import name")?;
                    let local = self.binding_ident(&local);
                    specifiers.push(self.tree.push(
                        NodeKind::ImportSpecifier {
                            imported: "default".into(),
                        },
                        spec_span,
                        vec![local],
                    ));
                }
                Rule::import_specifier => {
                    let spec_span = get_span(&inner);
                    let mut parts = inner.into_inner().filter(|p| p.as_rule() != Rule::kw_as);
                    let imported = parts.next().ok_or_else(|| {
                        self.source.parse_error("missing import name", spec_span)
                    })?;
                    let local = match parts.next() {
                        Some(alias) => self.binding_ident(&alias),
                        None => self.binding_ident(&imported),
                    };
                    specifiers.push(self.tree.push(
                        NodeKind::ImportSpecifier {
                            imported: imported.as_str().to_string(),
                        },
                        spec_span,
                        vec![local],
                    ));
                }
                Rule::string => {
                    span.end = get_span(&inner).end;
                    module = self.string_value(inner)?;
                }
                Rule::semi => span.end = get_span(&inner).end,
                _ => {}
            }
        }

        Ok(self
            .tree
            .push(NodeKind::Import { source: module }, span, specifiers))
    }

    /// Local names in `export { a, b as c }`. Re-exports from another module bind nothing.
    fn export_list(&mut self, pair: Pair<Rule>) -> Vec<NodeId> {
        if pair.clone().into_inner().any(|p| p.as_rule() == Rule::string) {
            return Vec::new();
        }
        let mut specifiers = Vec::new();
        for name in pair.into_inner().filter(|p| p.as_rule() == Rule::export_name) {
            let span = get_span(&name);
            let Some(local) = name.into_inner().next() else {
                continue;
            };
            let local = self.tree.push(
                NodeKind::Ident(local.as_str().to_string()),
                get_span(&local),
                vec![],
            );
            specifiers.push(self.tree.push(NodeKind::ExportSpecifier, span, vec![local]));
        }
        specifiers
    }

    fn var_decl(&mut self, pair: Pair<Rule>) -> Result<NodeId, MacroError> {
        let span = get_span(&pair);
        let mut kind = DeclKind::Var;
        let mut declarators = Vec::new();

        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::var_kind => {
                    kind = match inner.as_str() {
                        "const" => DeclKind::Const,
                        "let" => DeclKind::Let,
                        _ => DeclKind::Var,
                    }
                }
                Rule::declarator => {
                    let decl_span = get_span(&inner);
                    let mut children = Vec::new();
                    for part in inner.into_inner() {
                        match part.as_rule() {
                            Rule::binding_ident => children.push(self.binding_ident(&part)),
                            _ => children.push(self.expr(part)?),
                        }
                    }
                    declarators.push(self.tree.push(NodeKind::Declarator, decl_span, children));
                }
                rule => return Err(self.unsupported(rule, get_span(&inner))),
            }
        }

        Ok(self.tree.push(NodeKind::VarDecl(kind), span, declarators))
    }

    fn params(&mut self, pair: Pair<Rule>) -> Vec<NodeId> {
        pair.into_inner()
            .map(|p| self.binding_ident(&p))
            .collect()
    }

    // ------------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------------

    fn expr(&mut self, pair: Pair<Rule>) -> Result<NodeId, MacroError> {
        let span = get_span(&pair);
        match pair.as_rule() {
            Rule::arrow_fn => {
                let mut children = Vec::new();
                let mut params = 0;
                for inner in pair.into_inner() {
                    match inner.as_rule() {
                        Rule::params => {
                            let ids = self.params(inner);
                            params = ids.len();
                            children.extend(ids);
                        }
                        Rule::binding_ident => {
                            params = 1;
                            children.push(self.binding_ident(&inner));
                        }
                        Rule::block => children.push(self.statement(inner)?),
                        _ => children.push(self.expr(inner)?),
                    }
                }
                Ok(self.tree.push(NodeKind::Arrow { params }, span, children))
            }
            Rule::assign => {
                let mut children = pair
                    .into_inner()
                    .map(|p| self.expr(p))
                    .collect::<Result<Vec<_>, _>>()?;
                if children.len() == 1 {
                    return Ok(children.remove(0));
                }
                Ok(self.tree.push(NodeKind::Assign, span, children))
            }
            Rule::conditional => {
                let mut children = pair
                    .into_inner()
                    .map(|p| self.expr(p))
                    .collect::<Result<Vec<_>, _>>()?;
                if children.len() == 1 {
                    return Ok(children.remove(0));
                }
                Ok(self.tree.push(NodeKind::Conditional, span, children))
            }
            Rule::binary => self.binary(pair),
            Rule::unary => {
                let mut inner = pair.into_inner();
                let (Some(op), Some(operand)) = (inner.next(), inner.next()) else {
                    return Err(self.source.parse_error("missing operand", span));
                };
                let operand = self.expr(operand)?;
                Ok(self
                    .tree
                    .push(NodeKind::Unary(op.as_str().to_string()), span, vec![operand]))
            }
            Rule::object => {
                let children = pair
                    .into_inner()
                    .map(|p| self.property(p))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(self.tree.push(NodeKind::Object, span, children))
            }
            Rule::postfix => self.postfix(pair),
            Rule::paren_expr => {
                let inner = self.first_inner(pair, "expression")?;
                self.expr(inner)
            }
            Rule::array => {
                let children = pair
                    .into_inner()
                    .map(|p| self.expr(p))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(self.tree.push(NodeKind::Array, span, children))
            }
            Rule::string => {
                let value = self.string_value(pair)?;
                Ok(self.tree.push(NodeKind::StringLit(value), span, vec![]))
            }
            Rule::template => self.template(pair),
            Rule::number => Ok(self
                .tree
                .push(NodeKind::Number(pair.as_str().to_string()), span, vec![])),
            Rule::ident => Ok(self
                .tree
                .push(NodeKind::Ident(pair.as_str().to_string()), span, vec![])),
            rule => Err(self.unsupported(rule, span)),
        }
    }

    fn property(&mut self, pair: Pair<Rule>) -> Result<NodeId, MacroError> {
        let span = get_span(&pair);
        let mut computed = false;
        let mut children = Vec::new();

        for part in pair.into_inner() {
            match part.as_rule() {
                Rule::spread => {
                    let argument = self.first_inner(part, "spread argument")?;
                    let argument = self.expr(argument)?;
                    return Ok(self.tree.push(NodeKind::Spread, span, vec![argument]));
                }
                Rule::computed_key => {
                    computed = true;
                    let key = self.first_inner(part, "computed key")?;
                    children.push(self.expr(key)?);
                }
                Rule::ident_name => children.push(self.tree.push(
                    NodeKind::PropertyName(part.as_str().to_string()),
                    get_span(&part),
                    vec![],
                )),
                _ => children.push(self.expr(part)?),
            }
        }
        Ok(self.tree.push(NodeKind::Property { computed }, span, children))
    }

    fn binary(&mut self, pair: Pair<Rule>) -> Result<NodeId, MacroError> {
        let span = get_span(&pair);
        let mut inner = pair.into_inner();
        let first = inner
            .next()
            .ok_or_else(|| self.source.parse_error("missing operand", span))?;
        let mut lhs = self.expr(first)?;

        while let Some(op) = inner.next() {
            let rhs = inner
                .next()
                .ok_or_else(|| self.source.parse_error("missing operand", get_span(&op)))?;
            let rhs = self.expr(rhs)?;
            let span = self.tree.node(lhs).span.to(self.tree.node(rhs).span);
            lhs = self.tree.push(
                NodeKind::Binary(op.as_str().to_string()),
                span,
                vec![lhs, rhs],
            );
        }
        Ok(lhs)
    }

    /// Folds `primary (.name | [expr] | (args) | `tpl`)*` left to right.
    fn postfix(&mut self, pair: Pair<Rule>) -> Result<NodeId, MacroError> {
        let span = get_span(&pair);
        let mut inner = pair.into_inner();
        let primary = inner
            .next()
            .ok_or_else(|| self.source.parse_error("missing expression", span))?;
        let mut current = self.expr(primary)?;

        for op in inner {
            let op_span = get_span(&op);
            let full = Span::new(span.start, op_span.end);
            current = match op.as_rule() {
                Rule::member_access => {
                    let name = self.first_inner(op, "property name")?;
                    let property = self.tree.push(
                        NodeKind::PropertyName(name.as_str().to_string()),
                        get_span(&name),
                        vec![],
                    );
                    self.tree.push(
                        NodeKind::Member { computed: false },
                        full,
                        vec![current, property],
                    )
                }
                Rule::index_access => {
                    let key = self.first_inner(op, "index expression")?;
                    let key = self.expr(key)?;
                    self.tree
                        .push(NodeKind::Member { computed: true }, full, vec![current, key])
                }
                Rule::call_args => {
                    let mut children = vec![current];
                    for arg in op.into_inner() {
                        children.push(self.expr(arg)?);
                    }
                    self.tree.push(NodeKind::Call, full, children)
                }
                Rule::template => {
                    let quasi = self.template(op)?;
                    self.tree
                        .push(NodeKind::TaggedTemplate, full, vec![current, quasi])
                }
                rule => return Err(self.unsupported(rule, op_span)),
            };
        }
        Ok(current)
    }

    fn template(&mut self, pair: Pair<Rule>) -> Result<NodeId, MacroError> {
        let span = get_span(&pair);
        let mut quasis = Vec::new();
        let mut current = String::new();
        let mut expressions = Vec::new();

        for part in pair.into_inner() {
            match part.as_rule() {
                Rule::template_chars => current.push_str(&unescape(part.as_str())),
                Rule::interpolation => {
                    quasis.push(std::mem::take(&mut current));
                    let expr = self.first_inner(part, "interpolated expression")?;
                    expressions.push(self.expr(expr)?);
                }
                rule => return Err(self.unsupported(rule, get_span(&part))),
            }
        }
        quasis.push(current);

        Ok(self
            .tree
            .push(NodeKind::Template { quasis }, span, expressions))
    }

    // ------------------------------------------------------------------------
    // Leaves
    // ------------------------------------------------------------------------

    fn binding_ident(&mut self, pair: &Pair<Rule>) -> NodeId {
        self.tree.push(
            NodeKind::BindingIdent(pair.as_str().to_string()),
            get_span(pair),
            vec![],
        )
    }

    fn string_value(&self, pair: Pair<Rule>) -> Result<String, MacroError> {
        let span = get_span(&pair);
        let chars = pair
            .into_inner()
            .next()
            .ok_or_else(|| self.source.parse_error("malformed string", span))?;
        Ok(unescape(chars.as_str()))
    }

    fn first_inner<'i>(&self, pair: Pair<'i, Rule>, what: &str) -> Result<Pair<'i, Rule>, MacroError> {
        let span = get_span(&pair);
        pair.into_inner()
            .next()
            .ok_or_else(|| self.source.parse_error(format!("missing {what}"), span))
    }

    fn unsupported(&self, rule: Rule, span: Span) -> MacroError {
        self.source
            .parse_error(format!("unsupported construct: {rule:?}"), span)
    }
}

// ============================================================================
// UTILITIES
// ============================================================================

fn get_span(pair: &Pair<Rule>) -> Span {
    Span {
        start: pair.as_span().start(),
        end: pair.as_span().end(),
    }
}

/// Cooks escape sequences in string and template literal text.
fn unescape(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            result.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => result.push('\n'),
            Some('t') => result.push('\t'),
            Some('r') => result.push('\r'),
            Some('0') => result.push('\0'),
            Some('b') => result.push('\u{8}'),
            Some('f') => result.push('\u{c}'),
            Some('v') => result.push('\u{b}'),
            // line continuation
            Some('\n') => {}
            Some('\r') => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
            }
            Some('x') => {
                let hex: String = chars.by_ref().take(2).collect();
                push_code_point(&mut result, &hex, "\\x");
            }
            Some('u') => {
                let hex: String = if chars.peek() == Some(&'{') {
                    chars.next();
                    chars.by_ref().take_while(|c| *c != '}').collect()
                } else {
                    chars.by_ref().take(4).collect()
                };
                push_code_point(&mut result, &hex, "\\u");
            }
            Some(other) => result.push(other),
            None => result.push('\\'),
        }
    }

    result
}

fn push_code_point(out: &mut String, hex: &str, prefix: &str) {
    match u32::from_str_radix(hex, 16).ok().and_then(char::from_u32) {
        Some(c) => out.push(c),
        None => {
            out.push_str(prefix);
            out.push_str(hex);
        }
    }
}

fn convert_parse_error(error: pest::error::Error<Rule>, source: &SourceContext) -> MacroError {
    let span = match error.location {
        InputLocation::Pos(pos) => Span::new(pos, pos),
        InputLocation::Span((start, end)) => Span::new(start, end),
    };
    let message = match &error.variant {
        pest::error::ErrorVariant::ParsingError { positives, .. } if !positives.is_empty() => {
            format!("expected {positives:?}")
        }
        _ => "syntax error".to_string(),
    };
    source.parse_error(message, span)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use crate::syntax::{NodeShape, SyntaxHost};

    fn parse_str(source: &str) -> Result<SyntaxTree, MacroError> {
        parse(&SourceContext::from_file("test.js", source))
    }

    fn first_expr(tree: &SyntaxTree) -> NodeId {
        let stmt = tree.children(tree.root())[0];
        tree.children(stmt)[0]
    }

    #[test]
    fn test_empty_input() {
        let tree = parse_str("").unwrap();
        assert!(tree.children(tree.root()).is_empty());
    }

    #[test]
    fn test_import_with_alias() {
        let tree = parse_str("import { tw as css, other } from \"./tailwind-variant.macro\";")
            .unwrap();
        let import = tree.children(tree.root())[0];
        assert_eq!(
            tree.kind(import),
            &NodeKind::Import {
                source: "./tailwind-variant.macro".into()
            }
        );
        let specs = tree.children(import);
        assert_eq!(specs.len(), 2);
        let local = tree.children(specs[0])[0];
        assert_eq!(tree.kind(local), &NodeKind::BindingIdent("css".into()));
    }

    #[test]
    fn test_import_span_stops_before_trailing_comment() {
        let source = "import { tw } from \"./tailwind-variant.macro\"\n// note\ntw(\"a\");";
        let tree = parse_str(source).unwrap();
        let import = tree.children(tree.root())[0];
        assert_eq!(tree.span(import).end, source.find('\n').unwrap());

        let tree = parse_str("import { tw } from \"m\" ; // note").unwrap();
        let import = tree.children(tree.root())[0];
        assert_eq!(tree.span(import), Span::new(0, 24));
    }

    #[test]
    fn test_call_chain_shape() {
        let tree = parse_str("tw.md.hover(\"ring\", `a`);").unwrap();
        let NodeShape::Call { callee, arguments } = tree.shape(first_expr(&tree)) else {
            panic!("expected call");
        };
        assert_eq!(arguments.len(), 2);
        assert!(matches!(tree.shape(callee), NodeShape::Member { .. }));
    }

    #[test]
    fn test_tagged_template() {
        let tree = parse_str("tw.hover`ring ${x}`;").unwrap();
        let NodeShape::TaggedTemplate { quasi, .. } = tree.shape(first_expr(&tree)) else {
            panic!("expected tagged template");
        };
        let NodeShape::Template { quasis, expressions } = tree.shape(quasi) else {
            panic!("expected template");
        };
        assert_eq!(quasis, vec!["ring ".to_string(), String::new()]);
        assert_eq!(expressions.len(), 1);
    }

    #[test]
    fn test_string_escapes() {
        let tree = parse_str(r#"'it\'s \u{41}\x42\n';"#).unwrap();
        assert_eq!(
            tree.shape(first_expr(&tree)),
            NodeShape::StringLiteral("it's AB\n".into())
        );
    }

    #[test]
    fn test_keyword_prefixed_identifier() {
        let tree = parse_str("constant(1);").unwrap();
        assert!(matches!(tree.shape(first_expr(&tree)), NodeShape::Call { .. }));
    }

    #[test]
    fn test_object_literal_properties() {
        let tree = parse_str("({ a: tw(\"x\"), \"b-c\": 1, [k]: 2, d, ...rest });").unwrap();
        let object = first_expr(&tree);
        assert_eq!(tree.kind(object), &NodeKind::Object);
        let kinds: Vec<_> = tree
            .children(object)
            .iter()
            .map(|p| tree.kind(*p).clone())
            .collect();
        assert_eq!(
            kinds,
            vec![
                NodeKind::Property { computed: false },
                NodeKind::Property { computed: false },
                NodeKind::Property { computed: true },
                NodeKind::Property { computed: false },
                NodeKind::Spread,
            ]
        );
        let value = tree.children(tree.children(object)[0])[1];
        assert!(matches!(tree.shape(value), NodeShape::Call { .. }));
    }

    #[test]
    fn test_comparison_conditional_and_unary() {
        let tree = parse_str("a === b && !c ? x : typeof y;").unwrap();
        let conditional = first_expr(&tree);
        assert_eq!(tree.kind(conditional), &NodeKind::Conditional);
        let [test, _, alternate] = tree.children(conditional) else {
            panic!("expected three children");
        };
        assert_eq!(tree.kind(*test), &NodeKind::Binary("&&".into()));
        assert_eq!(tree.kind(*alternate), &NodeKind::Unary("typeof".into()));
    }

    #[test]
    fn test_if_else() {
        let tree = parse_str("if (a >= 1) { f(); } else g();").unwrap();
        let stmt = tree.children(tree.root())[0];
        assert_eq!(tree.kind(stmt), &NodeKind::If);
        assert_eq!(tree.children(stmt).len(), 3);
    }

    #[test]
    fn test_export_forms() {
        let tree = parse_str(
            "export const a = 1;\nexport default a;\nexport { a as b };\nexport { c } from \"./c\";",
        )
        .unwrap();
        let statements = tree.children(tree.root());
        assert_eq!(statements.len(), 4);
        assert!(statements.iter().all(|s| tree.kind(*s) == &NodeKind::Export));
        assert_eq!(tree.kind(tree.children(statements[0])[0]), &NodeKind::VarDecl(DeclKind::Const));
        assert_eq!(tree.kind(tree.children(statements[2])[0]), &NodeKind::ExportSpecifier);
        assert!(tree.children(statements[3]).is_empty());
    }

    #[test]
    fn test_unclosed_call_is_parse_error() {
        let err = parse_str("tw(\"a\"").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
    }
}
