//! Code-split extraction for `require.ensure(entries, callback, name)`.
//!
//! The entry array's string elements become chunk entries. When the
//! callback is a function with at least one parameter, that parameter is the
//! callback's require alias: a separate pass over the callback body rewrites
//! every call to the alias and records it as a nested request. The outer
//! rewriter never descends into a callback claimed this way.

use super::classify::{string_arg, string_arg_mut};
use super::replace::ReplacementTable;
use super::rewrite::Requester;
use super::TransformError;
use crate::request::{ChunkDescriptor, DependencyRequest, RequestKind};
use crate::resolve::IdAllocator;
use swc_ecma_ast::{BlockStmtOrExpr, CallExpr, Callee, Expr, ExprOrSpread, Lit, Pat, Prop};
use swc_ecma_visit::{VisitMut, VisitMutWith};
use tracing::trace;

/// Outcome of extracting one `require.ensure` call.
pub(crate) struct Extracted {
    pub chunk: ChunkDescriptor,
    /// Whether argument 1 was handled by the nested pass.
    pub callback_claimed: bool,
}

/// Explicit chunk name: the third argument, when it is a string literal.
fn explicit_name(call: &CallExpr) -> Option<String> {
    string_arg(&call.args, 2).map(|lit| lit.value.to_string())
}

/// Name of the first parameter of a function or arrow callback.
fn callback_alias(expr: &Expr) -> Option<String> {
    let first = match expr {
        Expr::Fn(f) => f.function.params.first().map(|param| &param.pat),
        Expr::Arrow(arrow) => arrow.params.first(),
        _ => None,
    }?;
    match first {
        Pat::Ident(binding) => Some(binding.id.sym.to_string()),
        _ => None,
    }
}

/// Extract a chunk from a `require.ensure` call whose first argument is an
/// array literal, rewriting entry and nested request strings in place.
pub(crate) fn extract_chunk(
    call: &mut CallExpr,
    requester: &Requester<'_>,
    ids: &dyn IdAllocator,
    replacements: &ReplacementTable,
) -> Result<Extracted, TransformError> {
    let name = explicit_name(call).unwrap_or_else(|| ids.next_unique_id().to_string());
    let mut chunk = ChunkDescriptor::new(name);

    if let Some(ExprOrSpread { spread: None, expr }) = call.args.first_mut() {
        if let Expr::Array(array) = &mut **expr {
            for elem in array.elems.iter_mut().flatten() {
                if elem.spread.is_some() {
                    continue;
                }
                if let Expr::Lit(Lit::Str(lit)) = &mut *elem.expr {
                    chunk
                        .entries
                        .push(requester.request(lit, RequestKind::RequireEnsureEntry)?);
                }
            }
        }
    }

    let mut callback_claimed = false;
    if let Some(ExprOrSpread { spread: None, expr }) = call.args.get_mut(1) {
        if let Some(alias) = callback_alias(expr) {
            let mut pass = CallbackPass {
                alias,
                requester,
                replacements,
                nested: Vec::new(),
                error: None,
            };
            match &mut **expr {
                Expr::Fn(f) => {
                    if let Some(body) = &mut f.function.body {
                        body.visit_mut_with(&mut pass);
                    }
                }
                Expr::Arrow(arrow) => match &mut *arrow.body {
                    BlockStmtOrExpr::BlockStmt(body) => body.visit_mut_with(&mut pass),
                    BlockStmtOrExpr::Expr(body) => body.visit_mut_with(&mut pass),
                },
                _ => {}
            }
            if let Some(error) = pass.error {
                return Err(error);
            }
            chunk.nested = pass.nested;
            callback_claimed = true;
        }
    }

    trace!(
        chunk = %chunk.name,
        entries = chunk.entries.len(),
        nested = chunk.nested.len(),
        "extracted chunk"
    );

    Ok(Extracted {
        chunk,
        callback_claimed,
    })
}

/// Nested pass over a claimed callback body.
///
/// Only calls whose callee is exactly the alias identifier are rewritten.
/// Replacement rules still apply to identifiers inside the body.
struct CallbackPass<'r, 'a> {
    alias: String,
    requester: &'r Requester<'a>,
    replacements: &'r ReplacementTable,
    nested: Vec<DependencyRequest>,
    error: Option<TransformError>,
}

impl CallbackPass<'_, '_> {
    fn is_alias_call(&self, call: &CallExpr) -> bool {
        match &call.callee {
            Callee::Expr(callee) => {
                matches!(&**callee, Expr::Ident(ident) if &*ident.sym == self.alias.as_str())
            }
            Callee::Super(_) | Callee::Import(_) => false,
        }
    }
}

impl VisitMut for CallbackPass<'_, '_> {
    fn visit_mut_expr(&mut self, expr: &mut Expr) {
        if self.error.is_some() || self.replacements.substitute(expr) {
            return;
        }
        expr.visit_mut_children_with(self);
    }

    fn visit_mut_prop(&mut self, prop: &mut Prop) {
        if self.error.is_some() || self.replacements.substitute_shorthand(prop) {
            return;
        }
        prop.visit_mut_children_with(self);
    }

    fn visit_mut_call_expr(&mut self, call: &mut CallExpr) {
        if self.error.is_some() {
            return;
        }
        if self.is_alias_call(call) {
            if let Some(lit) = string_arg_mut(&mut call.args, 0) {
                match self.requester.request(lit, RequestKind::RequireEnsureNested) {
                    Ok(request) => self.nested.push(request),
                    Err(error) => {
                        self.error = Some(error);
                        return;
                    }
                }
                for arg in call.args.iter_mut().skip(1) {
                    arg.visit_mut_with(self);
                }
                return;
            }
        }
        call.visit_mut_children_with(self);
    }
}
