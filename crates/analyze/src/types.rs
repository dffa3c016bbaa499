//! Type information consumed by the checker.
//!
//! The checker never needs a full type system. It only asks which members
//! an expression's static type exposes, so a [`TypeShape`] is a member set,
//! plus the awaited shape when the type is a promise.

use std::collections::{BTreeMap, BTreeSet};

use trytuple_core::{NodeId, NodeKind, SyntaxTree};

use crate::BRAND_MEMBER;

const PROMISE_MEMBERS: &[&str] = &["then", "catch", "finally"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeShape {
    members: BTreeSet<String>,
    awaited: Option<Box<TypeShape>>,
}

impl TypeShape {
    /// A type nothing is known about.
    pub fn opaque() -> Self {
        TypeShape::default()
    }

    /// The branded two-slot result: brand marker plus members "0" and "1".
    pub fn tracked_result() -> Self {
        TypeShape::opaque()
            .with_member(BRAND_MEMBER)
            .with_member("0")
            .with_member("1")
    }

    pub fn promise_of(inner: TypeShape) -> Self {
        let mut shape = TypeShape::opaque();
        for member in PROMISE_MEMBERS {
            shape = shape.with_member(member);
        }
        shape.awaited = Some(Box::new(inner));
        shape
    }

    pub fn with_member(mut self, name: &str) -> Self {
        self.members.insert(name.to_string());
        self
    }

    pub fn has_member(&self, name: &str) -> bool {
        self.members.contains(name)
    }

    pub fn is_opaque(&self) -> bool {
        self.members.is_empty() && self.awaited.is_none()
    }

    pub fn is_promise(&self) -> bool {
        self.awaited.is_some()
    }

    /// The type of `await value`: a promise unwraps, anything else is
    /// unchanged.
    pub fn awaited(&self) -> TypeShape {
        match &self.awaited {
            Some(inner) => (**inner).clone(),
            None => self.clone(),
        }
    }
}

/// A type query that could not be answered.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypeQueryError {
    #[error("node {index} does not belong to {file}")]
    ForeignNode { file: String, index: usize },
    #[error("type information for {file} is out of date")]
    Stale { file: String },
    #[error("type query failed: {0}")]
    Failed(String),
}

/// Host capability: resolve the static type of an expression node.
pub trait TypeQuery {
    fn type_of(&self, tree: &SyntaxTree, node: NodeId) -> Result<TypeShape, TypeQueryError>;
}

/// Call-result shapes declared per callee path (`fetchUser`,
/// `api.fetchUser`). Suits batch hosts without a type checker; the table
/// usually comes from `[types]` in `trytuple.toml`.
#[derive(Debug, Clone, Default)]
pub struct DeclaredTypes {
    callees: BTreeMap<String, TypeShape>,
}

impl DeclaredTypes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(&mut self, callee: &str, shape: TypeShape) {
        self.callees.insert(callee.to_string(), shape);
    }

    pub fn len(&self) -> usize {
        self.callees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callees.is_empty()
    }
}

impl TypeQuery for DeclaredTypes {
    fn type_of(&self, tree: &SyntaxTree, node: NodeId) -> Result<TypeShape, TypeQueryError> {
        if tree.get(node).is_none() {
            return Err(TypeQueryError::ForeignNode {
                file: tree.file_name().to_string(),
                index: node.index(),
            });
        }
        let node = tree.skip_outer_expressions(node);
        match tree.kind(node) {
            NodeKind::AwaitExpression { expression } => {
                Ok(self.type_of(tree, *expression)?.awaited())
            }
            NodeKind::CallExpression { callee, .. } => Ok(tree
                .callee_path(*callee)
                .and_then(|path| self.callees.get(&path).cloned())
                .unwrap_or_default()),
            _ => Ok(TypeShape::opaque()),
        }
    }
}

/// Several providers asked in order. The first non-opaque answer wins; an
/// error from any layer is returned as-is.
pub struct LayeredTypes<'a> {
    layers: Vec<&'a dyn TypeQuery>,
}

impl<'a> LayeredTypes<'a> {
    pub fn new() -> Self {
        LayeredTypes { layers: Vec::new() }
    }

    pub fn with(mut self, layer: &'a dyn TypeQuery) -> Self {
        self.layers.push(layer);
        self
    }
}

impl Default for LayeredTypes<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeQuery for LayeredTypes<'_> {
    fn type_of(&self, tree: &SyntaxTree, node: NodeId) -> Result<TypeShape, TypeQueryError> {
        for layer in &self.layers {
            let shape = layer.type_of(tree, node)?;
            if !shape.is_opaque() {
                return Ok(shape);
            }
        }
        Ok(TypeShape::opaque())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trytuple_core::parse;

    fn initializer(tree: &SyntaxTree) -> NodeId {
        tree.descendants(tree.root())
            .find_map(|id| match tree.kind(id) {
                NodeKind::VariableDeclaration { initializer, .. } => *initializer,
                _ => None,
            })
            .expect("initializer")
    }

    #[test]
    fn promise_members_and_await() {
        let shape = TypeShape::promise_of(TypeShape::tracked_result());
        assert!(shape.has_member("then"));
        assert!(!shape.has_member(BRAND_MEMBER));
        assert!(shape.awaited().has_member(BRAND_MEMBER));
        let plain = TypeShape::opaque().with_member("x");
        assert_eq!(plain.awaited(), plain);
    }

    #[test]
    fn declared_types_resolve_calls_by_path() {
        let mut declared = DeclaredTypes::new();
        declared.declare("api.load", TypeShape::promise_of(TypeShape::tracked_result()));

        let tree = parse("a.ts", "const [x] = await api.load(1);").unwrap();
        let shape = declared.type_of(&tree, initializer(&tree)).unwrap();
        assert!(shape.has_member(BRAND_MEMBER));

        let tree = parse("b.ts", "const [x] = api.other(1);").unwrap();
        assert!(declared.type_of(&tree, initializer(&tree)).unwrap().is_opaque());
    }

    #[test]
    fn layered_types_take_first_informative_answer() {
        let empty = DeclaredTypes::new();
        let mut full = DeclaredTypes::new();
        full.declare("f", TypeShape::tracked_result());
        let layered = LayeredTypes::new().with(&empty).with(&full);
        let tree = parse("a.ts", "const v = f();").unwrap();
        assert_eq!(
            layered.type_of(&tree, initializer(&tree)).unwrap(),
            TypeShape::tracked_result()
        );
    }
}
