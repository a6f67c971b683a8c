//! Syntax tree for the macro host.
//!
//! Source text is parsed into an arena of nodes addressed by [`NodeId`]. Each node keeps
//! its byte span in the original source, which lets [`SyntaxTree::render`] reproduce the
//! input verbatim apart from the nodes the macro pass replaced or removed.

pub mod host;
pub mod parser;

use serde::{Deserialize, Serialize};

pub use host::{Binding, BindingKind, MemberProperty, NodeShape, SyntaxHost};
pub use parser::parse;

/// Represents a span in the source code.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn to(self, other: Span) -> Span {
        Span::new(self.start, other.end)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DeclKind {
    Const,
    Let,
    Var,
}

impl From<DeclKind> for BindingKind {
    fn from(kind: DeclKind) -> Self {
        match kind {
            DeclKind::Const => BindingKind::Const,
            DeclKind::Let => BindingKind::Let,
            DeclKind::Var => BindingKind::Var,
        }
    }
}

/// Node payloads. Child layout is noted per variant.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// statements
    Program,
    /// specifiers
    Import { source: String },
    /// `[local]`; default imports use `imported == "default"`
    ImportSpecifier { imported: String },
    /// `[declaration]`, `[value]` for `export default`, or export specifiers
    Export,
    /// `[local]`
    ExportSpecifier,
    /// declarators
    VarDecl(DeclKind),
    /// `[id, init?]`
    Declarator,
    /// `[name, params.., body]`
    Function { params: usize },
    /// `[params.., body]`
    Arrow { params: usize },
    /// statements
    Block,
    /// `[value?]`
    Return,
    /// `[test, consequent, alternate?]`
    If,
    /// `[expr]`
    ExprStmt,
    Empty,
    StringLit(String),
    /// expressions; `quasis.len() == children.len() + 1`
    Template { quasis: Vec<String> },
    Number(String),
    /// Identifier in expression position.
    Ident(String),
    /// Identifier that declares a name.
    BindingIdent(String),
    /// Non-computed member property.
    PropertyName(String),
    /// `[object, property]`
    Member { computed: bool },
    /// `[callee, args..]`
    Call,
    /// `[tag, template]`
    TaggedTemplate,
    /// `[target, value]`
    Assign,
    /// `[test, consequent, alternate]`
    Conditional,
    /// `[lhs, rhs]`
    Binary(String),
    /// `[operand]`
    Unary(String),
    /// elements
    Array,
    /// properties
    Object,
    /// `[key, value]`, or `[value]` for shorthand
    Property { computed: bool },
    /// `[argument]`
    Spread,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Span,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    replaced: bool,
    removed: bool,
}

#[derive(Debug, Clone)]
pub struct SyntaxTree {
    source: String,
    nodes: Vec<Node>,
    root: NodeId,
}

impl SyntaxTree {
    pub(crate) fn new(source: String) -> Self {
        Self {
            source,
            nodes: Vec::new(),
            root: NodeId(0),
        }
    }

    /// Appends a node and adopts `children`.
    pub(crate) fn push(&mut self, kind: NodeKind, span: Span, children: Vec<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        for child in &children {
            self.nodes[child.index()].parent = Some(id);
        }
        self.nodes.push(Node {
            kind,
            span,
            parent: None,
            children,
            replaced: false,
            removed: false,
        });
        id
    }

    pub(crate) fn set_root(&mut self, root: NodeId) {
        self.root = root;
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.node(id).kind
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    /// All node ids, in arena order (children before parents).
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len() as u32).map(NodeId)
    }

    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.node(id).parent, move |p| self.node(*p).parent)
    }

    /// Drops a statement from the rendered output.
    pub fn remove(&mut self, id: NodeId) {
        self.nodes[id.index()].removed = true;
    }

    // ------------------------------------------------------------------------
    // Scopes
    // ------------------------------------------------------------------------

    /// Resolves `name` as seen from `from`, walking outwards through enclosing scopes.
    pub fn lookup(&self, from: NodeId, name: &str) -> Option<Binding<NodeId>> {
        self.ancestors(from)
            .find_map(|scope| self.lookup_in_scope(scope, name))
    }

    fn lookup_in_scope(&self, scope: NodeId, name: &str) -> Option<Binding<NodeId>> {
        let node = self.node(scope);
        match &node.kind {
            NodeKind::Program | NodeKind::Block => node
                .children
                .iter()
                .find_map(|stmt| self.declared_by_statement(*stmt, name)),
            NodeKind::Function { params } => node.children[1..1 + params]
                .iter()
                .find(|p| self.binding_name(**p) == Some(name))
                .map(|p| Binding {
                    kind: BindingKind::Param,
                    declaration: *p,
                    init: None,
                }),
            NodeKind::Arrow { params } => node.children[..*params]
                .iter()
                .find(|p| self.binding_name(**p) == Some(name))
                .map(|p| Binding {
                    kind: BindingKind::Param,
                    declaration: *p,
                    init: None,
                }),
            _ => None,
        }
    }

    fn declared_by_statement(&self, stmt: NodeId, name: &str) -> Option<Binding<NodeId>> {
        let node = self.node(stmt);
        match &node.kind {
            NodeKind::VarDecl(kind) => node.children.iter().find_map(|decl| {
                let children = self.children(*decl);
                let id = *children.first()?;
                (self.binding_name(id) == Some(name)).then(|| Binding {
                    kind: (*kind).into(),
                    declaration: *decl,
                    init: children.get(1).copied(),
                })
            }),
            NodeKind::Function { .. } => {
                let id = *node.children.first()?;
                (self.binding_name(id) == Some(name)).then_some(Binding {
                    kind: BindingKind::Function,
                    declaration: stmt,
                    init: None,
                })
            }
            NodeKind::Export => {
                let declaration = *node.children.first()?;
                self.declared_by_statement(declaration, name)
            }
            NodeKind::Import { .. } => node.children.iter().find_map(|spec| {
                let local = *self.children(*spec).first()?;
                (self.binding_name(local) == Some(name)).then_some(Binding {
                    kind: BindingKind::Import,
                    declaration: *spec,
                    init: None,
                })
            }),
            _ => None,
        }
    }

    fn binding_name(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).kind {
            NodeKind::BindingIdent(name) => Some(name),
            _ => None,
        }
    }

    // ------------------------------------------------------------------------
    // Rendering
    // ------------------------------------------------------------------------

    /// Prints the tree back to source text.
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(self.source.len());
        self.render_node(self.root, &mut out);
        out
    }

    fn render_node(&self, id: NodeId, out: &mut String) {
        let node = self.node(id);
        if node.removed {
            return;
        }
        if node.replaced {
            if let NodeKind::StringLit(value) = &node.kind {
                out.push_str(&quote(value));
            }
            return;
        }

        let mut cursor = node.span.start;
        for child in &node.children {
            let child_node = self.node(*child);
            out.push_str(&self.source[cursor..child_node.span.start]);
            self.render_node(*child, out);
            cursor = child_node.span.end;
            if child_node.removed {
                cursor = skip_line_break(&self.source, cursor);
            }
        }
        out.push_str(&self.source[cursor..node.span.end]);
    }
}

fn skip_line_break(source: &str, at: usize) -> usize {
    let rest = &source[at..];
    if rest.starts_with("\r\n") {
        at + 2
    } else if rest.starts_with('\n') {
        at + 1
    } else {
        at
    }
}

/// Double-quoted literal for `value`.
fn quote(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

impl SyntaxHost for SyntaxTree {
    type Node = NodeId;

    fn shape(&self, id: NodeId) -> NodeShape<NodeId> {
        let node = self.node(id);
        match &node.kind {
            NodeKind::StringLit(value) => NodeShape::StringLiteral(value.clone()),
            NodeKind::Template { quasis } => NodeShape::Template {
                quasis: quasis.clone(),
                expressions: node.children.clone(),
            },
            NodeKind::Ident(name) => NodeShape::Identifier(name.clone()),
            NodeKind::Call => match node.children.split_first() {
                Some((callee, arguments)) => NodeShape::Call {
                    callee: *callee,
                    arguments: arguments.to_vec(),
                },
                None => NodeShape::Other,
            },
            NodeKind::TaggedTemplate => match node.children.as_slice() {
                [tag, quasi] => NodeShape::TaggedTemplate {
                    tag: *tag,
                    quasi: *quasi,
                },
                _ => NodeShape::Other,
            },
            NodeKind::Member { computed } => match node.children.as_slice() {
                [object, property] => {
                    let property = match (&self.node(*property).kind, computed) {
                        (NodeKind::PropertyName(name), false) => {
                            MemberProperty::Named(name.clone())
                        }
                        _ => MemberProperty::Computed(*property),
                    };
                    NodeShape::Member {
                        object: *object,
                        property,
                    }
                }
                _ => NodeShape::Other,
            },
            _ => NodeShape::Other,
        }
    }

    fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    fn span(&self, id: NodeId) -> Span {
        self.node(id).span
    }

    fn binding(&self, ident: NodeId) -> Option<Binding<NodeId>> {
        match self.kind(ident) {
            NodeKind::Ident(name) => self.lookup(ident, name),
            _ => None,
        }
    }

    fn replace_with_string(&mut self, id: NodeId, value: String) {
        let node = &mut self.nodes[id.index()];
        node.kind = NodeKind::StringLit(value);
        node.replaced = true;
    }
}
