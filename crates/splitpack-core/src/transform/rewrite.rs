//! The single mutating traversal.
//!
//! [`Rewriter`] walks the module depth-first, keeps the scope chain current,
//! and dispatches calls, import declarations and references to the
//! classifier, the chunk extractor and the replacement table. The first
//! failure is kept and the rest of the walk is skipped.

use super::chunks::{extract_chunk, Extracted};
use super::classify::{classify_call, string_arg_mut, CallReference};
use super::replace::ReplacementTable;
use super::scope::{BindingKind, Frame, ScopeChain};
use super::TransformError;
use crate::request::{ChunkDescriptor, DependencyRequest, RequestKind};
use crate::resolve::{IdAllocator, ImportResolver};
use std::path::Path;
use swc_ecma_ast::{
    ArrowExpr, BlockStmt, CallExpr, CatchClause, ClassExpr, Constructor, ExportAll, Expr, FnExpr,
    ForInStmt, ForOfStmt, ForStmt, Function, GetterProp, ImportDecl, Module, NamedExport, Prop,
    SetterProp, Str, SwitchStmt, TsImportEqualsDecl, TsModuleRef,
};
use swc_ecma_visit::{VisitMut, VisitMutWith};
use tracing::trace;

/// Hands request strings to the resolver and writes the identifier back.
pub(crate) struct Requester<'a> {
    file: &'a Path,
    resolver: &'a dyn ImportResolver,
}

impl<'a> Requester<'a> {
    pub fn new(file: &'a Path, resolver: &'a dyn ImportResolver) -> Self {
        Self { file, resolver }
    }

    /// Resolve the literal's value and replace it with the identifier's
    /// string form.
    pub fn request(
        &self,
        lit: &mut Str,
        kind: RequestKind,
    ) -> Result<DependencyRequest, TransformError> {
        let raw = lit.value.to_string();
        let id = self
            .resolver
            .import_request(&raw, self.file)
            .map_err(|e| TransformError::resolve(self.file, &e))?;

        trace!(request = %raw, id = %id, kind = %kind, "rewrote reference");

        lit.value = id.to_string().into();
        // Drop the original quoting so the generator prints the new value.
        lit.raw = None;
        Ok(DependencyRequest::new(raw, self.file, id, kind))
    }
}

/// Orchestrates one file's traversal.
pub(crate) struct Rewriter<'a> {
    requester: Requester<'a>,
    ids: &'a dyn IdAllocator,
    replacements: &'a ReplacementTable,
    scopes: ScopeChain,
    imports: Vec<DependencyRequest>,
    chunks: Vec<ChunkDescriptor>,
    error: Option<TransformError>,
}

impl<'a> Rewriter<'a> {
    pub fn new(
        file: &'a Path,
        resolver: &'a dyn ImportResolver,
        ids: &'a dyn IdAllocator,
        replacements: &'a ReplacementTable,
    ) -> Self {
        Self {
            requester: Requester::new(file, resolver),
            ids,
            replacements,
            scopes: ScopeChain::new(),
            imports: Vec::new(),
            chunks: Vec::new(),
            error: None,
        }
    }

    /// Collected imports and chunks, or the failure that stopped the walk.
    pub fn finish(self) -> Result<(Vec<DependencyRequest>, Vec<ChunkDescriptor>), TransformError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok((self.imports, self.chunks)),
        }
    }

    fn failed(&self) -> bool {
        self.error.is_some()
    }

    fn record(&mut self, lit: &mut Str, kind: RequestKind) {
        match self.requester.request(lit, kind) {
            Ok(request) => self.imports.push(request),
            Err(error) => self.error = Some(error),
        }
    }

    fn scoped<N>(&mut self, frame: Frame, node: &mut N)
    where
        N: VisitMutWith<Self>,
    {
        self.scopes.push(frame);
        node.visit_mut_children_with(self);
        self.scopes.pop();
    }

    fn visit_ensure(&mut self, call: &mut CallExpr) {
        match extract_chunk(call, &self.requester, self.ids, self.replacements) {
            Ok(Extracted {
                chunk,
                callback_claimed,
            }) => {
                self.chunks.push(chunk);
                // The entry array is done; a claimed callback was walked by
                // the nested pass.
                let skip = if callback_claimed { 2 } else { 1 };
                for arg in call.args.iter_mut().skip(skip) {
                    arg.visit_mut_with(self);
                }
            }
            Err(error) => self.error = Some(error),
        }
    }
}

impl VisitMut for Rewriter<'_> {
    fn visit_mut_module(&mut self, module: &mut Module) {
        let frame = Frame::for_module(module);
        self.scoped(frame, module);
    }

    fn visit_mut_function(&mut self, function: &mut Function) {
        let frame = Frame::for_function(function);
        self.scoped(frame, function);
    }

    fn visit_mut_fn_expr(&mut self, expr: &mut FnExpr) {
        let name = expr.ident.as_ref().map(|ident| ident.sym.to_string());
        let frame = Frame::for_expr_name(name.as_deref(), BindingKind::Function);
        self.scoped(frame, expr);
    }

    fn visit_mut_class_expr(&mut self, expr: &mut ClassExpr) {
        let name = expr.ident.as_ref().map(|ident| ident.sym.to_string());
        let frame = Frame::for_expr_name(name.as_deref(), BindingKind::Class);
        self.scoped(frame, expr);
    }

    fn visit_mut_constructor(&mut self, ctor: &mut Constructor) {
        let frame = Frame::for_constructor(ctor);
        self.scoped(frame, ctor);
    }

    fn visit_mut_getter_prop(&mut self, getter: &mut GetterProp) {
        let frame = Frame::for_getter(getter);
        self.scoped(frame, getter);
    }

    fn visit_mut_setter_prop(&mut self, setter: &mut SetterProp) {
        let frame = Frame::for_setter(setter);
        self.scoped(frame, setter);
    }

    fn visit_mut_arrow_expr(&mut self, arrow: &mut ArrowExpr) {
        let frame = Frame::for_arrow(arrow);
        self.scoped(frame, arrow);
    }

    fn visit_mut_block_stmt(&mut self, block: &mut BlockStmt) {
        let frame = Frame::for_block(&block.stmts);
        self.scoped(frame, block);
    }

    fn visit_mut_switch_stmt(&mut self, switch: &mut SwitchStmt) {
        let frame = Frame::for_switch(switch);
        self.scoped(frame, switch);
    }

    fn visit_mut_catch_clause(&mut self, clause: &mut CatchClause) {
        let frame = Frame::for_catch(clause);
        self.scoped(frame, clause);
    }

    fn visit_mut_for_stmt(&mut self, stmt: &mut ForStmt) {
        let frame = Frame::for_loop_init(stmt.init.as_ref());
        self.scoped(frame, stmt);
    }

    fn visit_mut_for_in_stmt(&mut self, stmt: &mut ForInStmt) {
        let frame = Frame::for_loop_head(&stmt.left);
        self.scoped(frame, stmt);
    }

    fn visit_mut_for_of_stmt(&mut self, stmt: &mut ForOfStmt) {
        let frame = Frame::for_loop_head(&stmt.left);
        self.scoped(frame, stmt);
    }

    fn visit_mut_expr(&mut self, expr: &mut Expr) {
        if self.failed() || self.replacements.substitute(expr) {
            return;
        }
        expr.visit_mut_children_with(self);
    }

    fn visit_mut_prop(&mut self, prop: &mut Prop) {
        if self.failed() || self.replacements.substitute_shorthand(prop) {
            return;
        }
        prop.visit_mut_children_with(self);
    }

    fn visit_mut_call_expr(&mut self, call: &mut CallExpr) {
        if self.failed() {
            return;
        }
        match classify_call(call) {
            Some(CallReference::Ensure) => self.visit_ensure(call),
            Some(CallReference::Specifier(kind))
                if kind.is_shadowable() && self.scopes.is_bound("require") =>
            {
                trace!(call = kind.as_str(), "require is shadowed, leaving call as written");
                call.visit_mut_children_with(self);
            }
            Some(CallReference::Specifier(kind)) => {
                if let (Some(request_kind), Some(lit)) =
                    (kind.request_kind(), string_arg_mut(&mut call.args, 0))
                {
                    self.record(lit, request_kind);
                }
                for arg in call.args.iter_mut().skip(1) {
                    arg.visit_mut_with(self);
                }
            }
            None => call.visit_mut_children_with(self),
        }
    }

    fn visit_mut_import_decl(&mut self, import: &mut ImportDecl) {
        if self.failed() || import.type_only {
            return;
        }
        self.record(&mut import.src, RequestKind::StaticImport);
    }

    fn visit_mut_named_export(&mut self, export: &mut NamedExport) {
        if self.failed() || export.type_only {
            return;
        }
        if let Some(src) = &mut export.src {
            self.record(src, RequestKind::ReExport);
        }
    }

    fn visit_mut_export_all(&mut self, export: &mut ExportAll) {
        if self.failed() || export.type_only {
            return;
        }
        self.record(&mut export.src, RequestKind::ReExport);
    }

    fn visit_mut_ts_import_equals_decl(&mut self, import: &mut TsImportEqualsDecl) {
        if self.failed() || import.is_type_only {
            return;
        }
        if let TsModuleRef::TsExternalModuleRef(external) = &mut import.module_ref {
            self.record(&mut external.expr, RequestKind::StaticImport);
        }
    }
}
