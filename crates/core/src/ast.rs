//! Arena syntax tree.
//!
//! Every node lives in one `Vec<Node>` owned by the [`SyntaxTree`] and is
//! addressed by a [`NodeId`]. Nodes record their parent index, so walking
//! from a text offset back up to an enclosing declaration never needs a
//! shared, mutable tree object. A `NodeId` is the physical identity of a
//! node: two syntactically identical call sites always have distinct ids.

use serde::{Deserialize, Serialize};

/// Index of a node inside its tree's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Half-open byte range `[start, end)` into the file text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Span { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// True when `[start, end)` lies entirely inside this span.
    pub fn encloses(&self, start: usize, end: usize) -> bool {
        start >= self.start && end <= self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeclarationKind {
    Const,
    Let,
    Var,
}

/// Node payloads. Structural fields name the children that matter to the
/// checker; the full ordered child list is kept on [`Node::children`].
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    SourceFile,
    Block,
    EmptyStatement,
    /// `const a = 1, b = 2;`
    VariableStatement,
    /// `export ...`. An exported variable list hangs directly off this node.
    ExportDeclaration,
    VariableDeclarationList {
        kind: DeclarationKind,
    },
    VariableDeclaration {
        name: NodeId,
        initializer: Option<NodeId>,
    },
    /// Function declarations, function expressions and methods.
    Function {
        name: Option<String>,
        is_async: bool,
        body: Option<NodeId>,
    },
    ArrowFunction {
        is_async: bool,
        body: NodeId,
    },
    Parameter,
    ClassDeclaration {
        name: Option<String>,
    },
    PropertyDeclaration,
    ReturnStatement {
        expression: Option<NodeId>,
    },
    IfStatement,
    ForStatement,
    ForOfStatement {
        is_await: bool,
    },
    ForInStatement,
    WhileStatement,
    DoStatement,
    SwitchStatement,
    CaseClause,
    TryStatement,
    CatchClause,
    ThrowStatement,
    JumpStatement,
    LabeledStatement,
    ExpressionStatement,
    /// Imports, type aliases, interfaces and ambient declarations.
    OpaqueStatement,
    Identifier {
        text: String,
    },
    ArrayBindingPattern {
        elements: Vec<NodeId>,
    },
    ObjectBindingPattern {
        elements: Vec<NodeId>,
    },
    BindingElement {
        rest: bool,
        name: NodeId,
    },
    OmittedExpression,
    CallExpression {
        callee: NodeId,
        arguments: Vec<NodeId>,
    },
    NewExpression,
    AwaitExpression {
        expression: NodeId,
    },
    PropertyAccess {
        object: NodeId,
        name: String,
    },
    ElementAccess,
    Literal,
    ArrayLiteral,
    ObjectLiteral,
    PropertyAssignment,
    SpreadElement,
    Parenthesized {
        expression: NodeId,
    },
    PrefixUnary {
        operator: String,
    },
    PostfixUnary {
        operator: String,
    },
    Binary {
        operator: String,
    },
    Conditional,
    /// `x as T`, `x satisfies T`, `x!`.
    TypeAssertion {
        expression: NodeId,
    },
}

#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Span,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

/// One parsed file.
#[derive(Debug, Clone)]
pub struct SyntaxTree {
    file_name: String,
    text: String,
    nodes: Vec<Node>,
    root: NodeId,
}

impl SyntaxTree {
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.node(id).kind
    }

    pub fn span(&self, id: NodeId) -> Span {
        self.node(id).span
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    /// Source text covered by a node, without leading trivia.
    pub fn text_of(&self, id: NodeId) -> &str {
        let span = self.span(id);
        &self.text[span.start..span.end]
    }

    /// Iterate from `id` (inclusive) up to the root.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: Some(id),
        }
    }

    /// Depth-first pre-order walk starting at `id`, children in source order.
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        Descendants {
            tree: self,
            stack: vec![id],
        }
    }

    /// Smallest node whose span encloses `[start, end)`.
    ///
    /// Descends from the root through the child index, so the cost is the
    /// depth of the answer times the fan-out along the way. When two
    /// adjacent siblings both enclose an empty range on their shared
    /// boundary, the later one wins.
    pub fn innermost_enclosing(&self, start: usize, end: usize) -> Option<NodeId> {
        if !self.span(self.root).encloses(start, end) {
            return None;
        }
        let mut current = self.root;
        'descend: loop {
            for &child in self.children(current).iter().rev() {
                if self.span(child).encloses(start, end) {
                    current = child;
                    continue 'descend;
                }
            }
            return Some(current);
        }
    }

    /// Identifier text, or a dotted path for property-access chains such
    /// as `tryCatch.sync`. `None` for any other callee shape.
    pub fn callee_path(&self, id: NodeId) -> Option<String> {
        match self.kind(id) {
            NodeKind::Identifier { text } => Some(text.clone()),
            NodeKind::PropertyAccess { object, name } => {
                let base = self.callee_path(*object)?;
                Some(format!("{}.{}", base, name))
            }
            NodeKind::Parenthesized { expression } => self.callee_path(*expression),
            _ => None,
        }
    }

    /// Strip parentheses and type assertions around an expression.
    pub fn skip_outer_expressions(&self, mut id: NodeId) -> NodeId {
        loop {
            match self.kind(id) {
                NodeKind::Parenthesized { expression } | NodeKind::TypeAssertion { expression } => {
                    id = *expression;
                }
                _ => return id,
            }
        }
    }
}

pub struct Ancestors<'a> {
    tree: &'a SyntaxTree,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.next?;
        self.next = self.tree.parent(id);
        Some(id)
    }
}

pub struct Descendants<'a> {
    tree: &'a SyntaxTree,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.tree.children(id).iter().rev().copied());
        Some(id)
    }
}

/// Bottom-up arena builder used by the parser. Children are allocated
/// before their parent; allocating the parent back-patches their
/// parent links.
#[derive(Debug, Default)]
pub struct TreeBuilder {
    nodes: Vec<Node>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, kind: NodeKind, span: Span, children: Vec<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        for &child in &children {
            self.nodes[child.index()].parent = Some(id);
        }
        self.nodes.push(Node {
            kind,
            span,
            parent: None,
            children,
        });
        id
    }

    pub fn finish(self, file_name: &str, text: &str, root: NodeId) -> SyntaxTree {
        SyntaxTree {
            file_name: file_name.to_owned(),
            text: text.to_owned(),
            nodes: self.nodes,
            root,
        }
    }
}
