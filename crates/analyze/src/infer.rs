//! Per-file inference of wrapper functions.
//!
//! A function that returns a `tryCatch` result is itself a source of the
//! branded type:
//!
//! ```ts
//! const load = () => tryCatch(parse(text));
//! const [value] = load(); // flagged through the type path
//! ```
//!
//! Bindings are resolved lexically (nearest enclosing block that declares
//! the name), and results are keyed by the binding's node, so two
//! same-named wrappers in sibling blocks are told apart. Wrappers of
//! wrappers are found by iterating to a fixpoint.

use std::collections::{HashMap, HashSet};

use trytuple_core::{NodeId, NodeKind, SyntaxTree};

use crate::types::{TypeQuery, TypeQueryError, TypeShape};
use crate::CONVERSION_FUNCTION;

/// Conversion entry points whose result never depends on the argument.
const SYNC_CONVERSIONS: &[&str] = &["tryCatch.sync", "tryCatchSync"];
const ASYNC_CONVERSIONS: &[&str] = &["tryCatch.async", "tryCatchAsync"];
/// Calls returning a re-typed `tryCatch`.
const CONVERSION_FACTORIES: &[&str] = &["tryCatch.errors", "tryCatchErrors"];

#[derive(Debug)]
enum Binding {
    Function { is_async: bool, returns: Vec<NodeId> },
    /// `const tc = tryCatch.errors<E>()` or `const tc = tryCatch`.
    Conversion,
}

#[derive(Debug)]
pub struct InferredTypes {
    file: String,
    node_count: usize,
    bindings: HashMap<NodeId, Binding>,
    /// Call-result shape of each inferred wrapper binding.
    results: HashMap<NodeId, TypeShape>,
}

impl InferredTypes {
    pub fn infer(tree: &SyntaxTree) -> Self {
        let mut inferred = InferredTypes {
            file: tree.file_name().to_string(),
            node_count: tree.len(),
            bindings: collect_bindings(tree),
            results: HashMap::new(),
        };

        let mut rounds = 0;
        loop {
            rounds += 1;
            let mut found = Vec::new();
            for (id, binding) in &inferred.bindings {
                if inferred.results.contains_key(id) {
                    continue;
                }
                let Binding::Function { is_async, returns } = binding else {
                    continue;
                };
                if let Some(shape) = returns.iter().find_map(|&r| inferred.eval(tree, r)) {
                    let shape = if *is_async {
                        TypeShape::promise_of(shape.awaited())
                    } else {
                        shape
                    };
                    found.push((*id, shape));
                }
            }
            if found.is_empty() {
                break;
            }
            inferred.results.extend(found);
        }
        tracing::debug!(
            file = %inferred.file,
            wrappers = inferred.results.len(),
            rounds,
            "wrapper inference finished"
        );
        inferred
    }

    /// Number of functions found to return the branded result.
    pub fn wrapper_count(&self) -> usize {
        self.results.len()
    }

    /// Static type of an expression, when inference knows it.
    fn eval(&self, tree: &SyntaxTree, expr: NodeId) -> Option<TypeShape> {
        let expr = tree.skip_outer_expressions(expr);
        match tree.kind(expr) {
            NodeKind::AwaitExpression { expression } => {
                self.eval(tree, *expression).map(|shape| shape.awaited())
            }
            NodeKind::CallExpression { callee, arguments } => {
                let callee = tree.skip_outer_expressions(*callee);
                let path = tree.callee_path(callee)?;
                if path == CONVERSION_FUNCTION {
                    return Some(self.conversion_result(tree, arguments.first().copied()));
                }
                if SYNC_CONVERSIONS.contains(&path.as_str()) {
                    return Some(TypeShape::tracked_result());
                }
                if ASYNC_CONVERSIONS.contains(&path.as_str()) {
                    return Some(TypeShape::promise_of(TypeShape::tracked_result()));
                }
                let NodeKind::Identifier { text } = tree.kind(callee) else {
                    return None;
                };
                let binding = resolve_binding(tree, text, callee)?;
                match self.bindings.get(&binding)? {
                    Binding::Conversion => {
                        Some(self.conversion_result(tree, arguments.first().copied()))
                    }
                    Binding::Function { .. } => self.results.get(&binding).cloned(),
                }
            }
            _ => None,
        }
    }

    /// `tryCatch(x)` yields a promise of the result when `x` is, or
    /// produces, a promise.
    fn conversion_result(&self, tree: &SyntaxTree, argument: Option<NodeId>) -> TypeShape {
        let is_async = argument.is_some_and(|arg| self.is_async_argument(tree, arg));
        if is_async {
            TypeShape::promise_of(TypeShape::tracked_result())
        } else {
            TypeShape::tracked_result()
        }
    }

    fn is_async_argument(&self, tree: &SyntaxTree, arg: NodeId) -> bool {
        let arg = tree.skip_outer_expressions(arg);
        match tree.kind(arg) {
            NodeKind::ArrowFunction { is_async, .. } | NodeKind::Function { is_async, .. } => {
                *is_async
            }
            NodeKind::NewExpression => tree
                .children(arg)
                .first()
                .and_then(|&c| tree.callee_path(c))
                .is_some_and(|path| path == "Promise"),
            NodeKind::Identifier { text } => resolve_binding(tree, text, arg)
                .and_then(|id| self.bindings.get(&id))
                .is_some_and(|b| matches!(b, Binding::Function { is_async: true, .. })),
            NodeKind::CallExpression { callee, .. } => {
                let callee = tree.skip_outer_expressions(*callee);
                match tree.kind(callee) {
                    NodeKind::Identifier { text } => resolve_binding(tree, text, callee)
                        .and_then(|id| self.bindings.get(&id))
                        .is_some_and(|b| matches!(b, Binding::Function { is_async: true, .. })),
                    _ => false,
                }
            }
            _ => false,
        }
    }
}

impl TypeQuery for InferredTypes {
    fn type_of(&self, tree: &SyntaxTree, node: NodeId) -> Result<TypeShape, TypeQueryError> {
        if tree.file_name() != self.file || tree.len() != self.node_count {
            return Err(TypeQueryError::Stale {
                file: tree.file_name().to_string(),
            });
        }
        if tree.get(node).is_none() {
            return Err(TypeQueryError::ForeignNode {
                file: self.file.clone(),
                index: node.index(),
            });
        }
        Ok(self.eval(tree, node).unwrap_or_default())
    }
}

fn collect_bindings(tree: &SyntaxTree) -> HashMap<NodeId, Binding> {
    let mut bindings = HashMap::new();
    for id in tree.descendants(tree.root()) {
        match tree.kind(id) {
            NodeKind::Function {
                name: Some(_),
                is_async,
                body: Some(body),
            } if is_declaration_position(tree, id) => {
                bindings.insert(
                    id,
                    Binding::Function {
                        is_async: *is_async,
                        returns: return_expressions(tree, *body),
                    },
                );
            }
            NodeKind::VariableDeclaration {
                name,
                initializer: Some(init),
            } if matches!(tree.kind(*name), NodeKind::Identifier { .. }) => {
                let init = tree.skip_outer_expressions(*init);
                let binding = match tree.kind(init) {
                    NodeKind::ArrowFunction { is_async, body } => {
                        let returns = if matches!(tree.kind(*body), NodeKind::Block) {
                            return_expressions(tree, *body)
                        } else {
                            vec![*body]
                        };
                        Binding::Function {
                            is_async: *is_async,
                            returns,
                        }
                    }
                    NodeKind::Function {
                        is_async,
                        body: Some(body),
                        ..
                    } => Binding::Function {
                        is_async: *is_async,
                        returns: return_expressions(tree, *body),
                    },
                    NodeKind::Identifier { text } if text == CONVERSION_FUNCTION => {
                        Binding::Conversion
                    }
                    NodeKind::CallExpression { callee, .. }
                        if tree
                            .callee_path(*callee)
                            .is_some_and(|p| CONVERSION_FACTORIES.contains(&p.as_str())) =>
                    {
                        Binding::Conversion
                    }
                    _ => continue,
                };
                bindings.insert(id, binding);
            }
            _ => {}
        }
    }
    bindings
}

fn is_declaration_position(tree: &SyntaxTree, id: NodeId) -> bool {
    tree.parent(id).is_some_and(|p| {
        matches!(
            tree.kind(p),
            NodeKind::SourceFile | NodeKind::Block | NodeKind::CaseClause | NodeKind::ExportDeclaration
        )
    })
}

/// `return` expressions of a function body, not descending into nested
/// functions or classes.
fn return_expressions(tree: &SyntaxTree, body: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut stack = vec![body];
    while let Some(id) = stack.pop() {
        match tree.kind(id) {
            NodeKind::ReturnStatement {
                expression: Some(expr),
            } => out.push(*expr),
            NodeKind::Function { .. }
            | NodeKind::ArrowFunction { .. }
            | NodeKind::ClassDeclaration { .. }
                if id != body => {}
            _ => stack.extend(tree.children(id).iter().rev().copied()),
        }
    }
    out
}

/// Nearest declaration of `name` visible from `from`: a function
/// declaration or a variable declarator in an enclosing block. A
/// parameter of the same name shadows everything outside it.
fn resolve_binding(tree: &SyntaxTree, name: &str, from: NodeId) -> Option<NodeId> {
    for scope in tree.ancestors(from).skip(1) {
        match tree.kind(scope) {
            NodeKind::SourceFile | NodeKind::Block | NodeKind::CaseClause => {
                for &stmt in tree.children(scope) {
                    if let Some(found) = declared_in(tree, stmt, name) {
                        return Some(found);
                    }
                }
            }
            NodeKind::Function { .. } | NodeKind::ArrowFunction { .. } => {
                let shadowed = tree.children(scope).iter().any(|&c| {
                    matches!(tree.kind(c), NodeKind::Parameter)
                        && tree
                            .descendants(c)
                            .any(|d| matches!(tree.kind(d), NodeKind::Identifier { text } if text == name))
                });
                if shadowed {
                    return None;
                }
            }
            _ => {}
        }
    }
    None
}

fn declared_in(tree: &SyntaxTree, stmt: NodeId, name: &str) -> Option<NodeId> {
    match tree.kind(stmt) {
        NodeKind::Function {
            name: Some(fn_name),
            ..
        } if fn_name == name => Some(stmt),
        NodeKind::VariableStatement | NodeKind::ExportDeclaration => {
            tree.children(stmt).iter().find_map(|&c| declared_in(tree, c, name))
        }
        NodeKind::VariableDeclarationList { .. } => tree.children(stmt).iter().copied().find(|&d| {
            matches!(
                tree.kind(d),
                NodeKind::VariableDeclaration { name: binding, .. }
                    if matches!(tree.kind(*binding), NodeKind::Identifier { text } if text == name)
            )
        }),
        _ => None,
    }
}
