//! The capability interface the macro pass needs from a syntax tree.
//!
//! The resolver and the invocation driver only ever see nodes through this trait, so
//! they can run against any tree representation that can answer these questions.

use std::fmt::Debug;
use std::hash::Hash;

use crate::syntax::Span;

/// How a lexical binding was introduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingKind {
    Const,
    Let,
    Var,
    Param,
    Function,
    Import,
}

/// A resolved lexical binding for an identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding<N> {
    pub kind: BindingKind,
    /// The declarator, parameter, function or import specifier that introduced it.
    pub declaration: N,
    /// Initializer expression, for declarators that have one.
    pub init: Option<N>,
}

/// Property side of a member access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberProperty<N> {
    /// `object.name`
    Named(String),
    /// `object[expr]`
    Computed(N),
}

/// The node shapes the macro pass distinguishes. Everything else is `Other`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeShape<N> {
    StringLiteral(String),
    /// `quasis.len()` is always `expressions.len() + 1`; quasis hold cooked text.
    Template {
        quasis: Vec<String>,
        expressions: Vec<N>,
    },
    Identifier(String),
    Call {
        callee: N,
        arguments: Vec<N>,
    },
    TaggedTemplate {
        tag: N,
        quasi: N,
    },
    Member {
        object: N,
        property: MemberProperty<N>,
    },
    Other,
}

pub trait SyntaxHost {
    type Node: Copy + Eq + Hash + Debug;

    fn shape(&self, node: Self::Node) -> NodeShape<Self::Node>;

    fn parent(&self, node: Self::Node) -> Option<Self::Node>;

    fn span(&self, node: Self::Node) -> Span;

    /// Looks up the lexical binding an identifier expression refers to.
    fn binding(&self, ident: Self::Node) -> Option<Binding<Self::Node>>;

    /// Replaces `node` in place with a string literal holding `value`.
    fn replace_with_string(&mut self, node: Self::Node, value: String);
}
