//! Locating candidate declarations.
//!
//! Only declarations whose list sits directly in a variable statement or
//! in the head of a `for`, `for..of` or `for..in` loop are candidates.
//! Exported lists hang off an `ExportDeclaration` and are skipped.

use trytuple_core::{NodeId, NodeKind, SyntaxTree};

/// An eligible declaration with its binding pattern and initializer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CandidateSite {
    pub declaration: NodeId,
    pub pattern: NodeId,
    pub initializer: Option<NodeId>,
}

pub fn is_eligible(tree: &SyntaxTree, declaration: NodeId) -> bool {
    let Some(list) = tree.parent(declaration) else {
        return false;
    };
    if !matches!(tree.kind(list), NodeKind::VariableDeclarationList { .. }) {
        return false;
    }
    tree.parent(list).is_some_and(|holder| {
        matches!(
            tree.kind(holder),
            NodeKind::VariableStatement
                | NodeKind::ForStatement
                | NodeKind::ForOfStatement { .. }
                | NodeKind::ForInStatement
        )
    })
}

/// Eligible declarations of `tree` in pre-order. Nested candidates inside
/// an initializer come after their enclosing declaration.
pub fn eligible_declarations(tree: &SyntaxTree) -> impl Iterator<Item = CandidateSite> + '_ {
    tree.descendants(tree.root()).filter_map(move |id| match tree.kind(id) {
        NodeKind::VariableDeclaration { name, initializer } if is_eligible(tree, id) => {
            Some(CandidateSite {
                declaration: id,
                pattern: *name,
                initializer: *initializer,
            })
        }
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use trytuple_core::parse;

    fn eligible_patterns(src: &str) -> Vec<String> {
        let tree = parse("t.ts", src).unwrap();
        eligible_declarations(&tree)
            .map(|site| tree.text_of(site.pattern).to_string())
            .collect()
    }

    #[test]
    fn statements_and_loop_heads_are_eligible() {
        let src = "const a = 1;\n\
                   for (let i = 0; i < 3; i++) {}\n\
                   for (const [k, v] of pairs) {}\n\
                   for (var key in obj) {}\n\
                   function f() { let b = 2; }";
        assert_eq!(eligible_patterns(src), vec!["a", "i", "[k, v]", "key", "b"]);
    }

    #[test]
    fn exported_declarations_are_skipped() {
        let src = "export const [a] = tryCatch(x);\nconst [b] = tryCatch(y);";
        assert_eq!(eligible_patterns(src), vec!["[b]"]);
    }

    #[test]
    fn nested_candidates_follow_their_parent() {
        let src = "const outer = () => {\n  const inner = tryCatch(x);\n  return inner;\n};";
        assert_eq!(eligible_patterns(src), vec!["outer", "inner"]);
    }
}
