//! Classification of the branded two-slot result type.

use std::collections::HashMap;

use trytuple_core::{NodeId, SyntaxTree};

use crate::types::{TypeQuery, TypeShape};
use crate::BRAND_MEMBER;

/// True iff the shape carries the brand marker, exposes members "0" and
/// "1", and does not expose "2". A longer tuple or a plain object never
/// matches.
pub fn is_tracked_result_type(shape: &TypeShape) -> bool {
    shape.has_member(BRAND_MEMBER)
        && shape.has_member("0")
        && shape.has_member("1")
        && !shape.has_member("2")
}

/// Answers "is this expression's type the tracked result?" for one file.
///
/// Answers are memoized by node identity for the lifetime of the oracle,
/// which callers scope to a single file visit. A failed type query is
/// logged and answered `false`.
pub struct TypeOracle<'q> {
    query: &'q dyn TypeQuery,
    cache: HashMap<NodeId, bool>,
}

impl<'q> TypeOracle<'q> {
    pub fn new(query: &'q dyn TypeQuery) -> Self {
        TypeOracle {
            query,
            cache: HashMap::new(),
        }
    }

    /// `callee` names the called function in the warning emitted when the
    /// type query fails.
    pub fn is_tracked(&mut self, tree: &SyntaxTree, expr: NodeId, callee: &str) -> bool {
        if let Some(&known) = self.cache.get(&expr) {
            return known;
        }
        let tracked = match self.query.type_of(tree, expr) {
            Ok(shape) => is_tracked_result_type(&shape),
            Err(err) => {
                tracing::warn!(
                    file = tree.file_name(),
                    callee,
                    error = %err,
                    "type checking failed for {}",
                    callee
                );
                false
            }
        };
        self.cache.insert(expr, tracked);
        tracked
    }

    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}
