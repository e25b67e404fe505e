//! Lexical scope tracking for the `require` shadowing guard.
//!
//! The rewriter pushes a [`Frame`] whenever it enters a module, function,
//! block, catch clause or loop head, and pops it on exit. A frame is filled
//! up front with everything declared directly in that scope (including
//! hoisted `var` and function declarations), so a lookup from anywhere
//! inside sees bindings that appear later in the source.

use rustc_hash::FxHashMap as HashMap;
use swc_ecma_ast::{
    ArrowExpr, BlockStmt, BlockStmtOrExpr, CatchClause, Class, Constructor, Decl, DefaultDecl,
    ExportDefaultDecl, ForHead, Function, GetterProp, ImportSpecifier, Module, ModuleDecl,
    ModuleItem, ObjectPatProp, ParamOrTsParamProp, Pat, SetterProp, Stmt, SwitchStmt,
    TsParamPropParam, VarDecl, VarDeclKind, VarDeclOrExpr,
};
use swc_ecma_visit::{Visit, VisitWith};

/// How a name was bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingKind {
    Var,
    Let,
    Const,
    Function,
    Class,
    Param,
    Import,
    CatchParam,
}

impl From<VarDeclKind> for BindingKind {
    fn from(kind: VarDeclKind) -> Self {
        match kind {
            VarDeclKind::Var => Self::Var,
            VarDeclKind::Let => Self::Let,
            VarDeclKind::Const => Self::Const,
        }
    }
}

/// Names declared directly in one scope.
#[derive(Debug, Default, Clone)]
pub struct Frame {
    bindings: HashMap<String, BindingKind>,
}

impl Frame {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(&mut self, name: impl Into<String>, kind: BindingKind) {
        self.bindings.entry(name.into()).or_insert(kind);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<BindingKind> {
        self.bindings.get(name).copied()
    }

    /// Frame for a module's top level: imports, declarations, hoisted vars.
    #[must_use]
    pub fn for_module(module: &Module) -> Self {
        let mut frame = Self::new();
        for item in &module.body {
            match item {
                ModuleItem::ModuleDecl(ModuleDecl::Import(import)) => {
                    for specifier in &import.specifiers {
                        let local = match specifier {
                            ImportSpecifier::Named(s) => &s.local,
                            ImportSpecifier::Default(s) => &s.local,
                            ImportSpecifier::Namespace(s) => &s.local,
                        };
                        frame.declare(local.sym.to_string(), BindingKind::Import);
                    }
                }
                ModuleItem::ModuleDecl(ModuleDecl::ExportDecl(export)) => {
                    frame.declare_decl(&export.decl);
                }
                ModuleItem::ModuleDecl(ModuleDecl::ExportDefaultDecl(ExportDefaultDecl {
                    decl,
                    ..
                })) => match decl {
                    DefaultDecl::Fn(f) => {
                        if let Some(ident) = &f.ident {
                            frame.declare(ident.sym.to_string(), BindingKind::Function);
                        }
                    }
                    DefaultDecl::Class(c) => {
                        if let Some(ident) = &c.ident {
                            frame.declare(ident.sym.to_string(), BindingKind::Class);
                        }
                    }
                    DefaultDecl::TsInterfaceDecl(_) => {}
                },
                ModuleItem::ModuleDecl(_) => {}
                ModuleItem::Stmt(stmt) => frame.declare_stmt(stmt),
            }
        }
        module.visit_with(&mut VarHoister { frame: &mut frame });
        frame
    }

    /// Frame for a function: parameters and hoisted vars of the body.
    #[must_use]
    pub fn for_function(function: &Function) -> Self {
        let mut frame = Self::new();
        for param in &function.params {
            frame.declare_pat(&param.pat, BindingKind::Param);
        }
        frame.hoist(function.body.as_ref());
        frame
    }

    /// Frame for a class constructor, including TypeScript parameter properties.
    #[must_use]
    pub fn for_constructor(ctor: &Constructor) -> Self {
        let mut frame = Self::new();
        for param in &ctor.params {
            match param {
                ParamOrTsParamProp::Param(param) => frame.declare_pat(&param.pat, BindingKind::Param),
                ParamOrTsParamProp::TsParamProp(prop) => match &prop.param {
                    TsParamPropParam::Ident(binding) => {
                        frame.declare(binding.id.sym.to_string(), BindingKind::Param);
                    }
                    TsParamPropParam::Assign(assign) => {
                        frame.declare_pat(&assign.left, BindingKind::Param);
                    }
                },
            }
        }
        frame.hoist(ctor.body.as_ref());
        frame
    }

    /// Frame for an object-literal getter.
    #[must_use]
    pub fn for_getter(getter: &GetterProp) -> Self {
        let mut frame = Self::new();
        frame.hoist(getter.body.as_ref());
        frame
    }

    /// Frame for an object-literal setter.
    #[must_use]
    pub fn for_setter(setter: &SetterProp) -> Self {
        let mut frame = Self::new();
        frame.declare_pat(&setter.param, BindingKind::Param);
        frame.hoist(setter.body.as_ref());
        frame
    }

    /// Frame for an arrow function.
    #[must_use]
    pub fn for_arrow(arrow: &ArrowExpr) -> Self {
        let mut frame = Self::new();
        for pat in &arrow.params {
            frame.declare_pat(pat, BindingKind::Param);
        }
        if let BlockStmtOrExpr::BlockStmt(body) = &*arrow.body {
            frame.hoist(Some(body));
        }
        frame
    }

    /// Frame for a block: only declarations scoped to the block itself.
    #[must_use]
    pub fn for_block(stmts: &[Stmt]) -> Self {
        let mut frame = Self::new();
        for stmt in stmts {
            frame.declare_lexical_stmt(stmt);
        }
        frame
    }

    /// Frame for a `switch` body; all cases share one lexical scope.
    #[must_use]
    pub fn for_switch(switch: &SwitchStmt) -> Self {
        let mut frame = Self::new();
        for stmt in switch.cases.iter().flat_map(|case| &case.cons) {
            frame.declare_lexical_stmt(stmt);
        }
        frame
    }

    /// Frame for a catch clause parameter.
    #[must_use]
    pub fn for_catch(clause: &CatchClause) -> Self {
        let mut frame = Self::new();
        if let Some(param) = &clause.param {
            frame.declare_pat(param, BindingKind::CatchParam);
        }
        frame
    }

    /// Frame for `let`/`const` declared in a `for` loop head.
    #[must_use]
    pub fn for_loop_init(init: Option<&VarDeclOrExpr>) -> Self {
        let mut frame = Self::new();
        if let Some(VarDeclOrExpr::VarDecl(decl)) = init {
            frame.declare_lexical_var(decl);
        }
        frame
    }

    /// Frame for the left side of `for..in` / `for..of`.
    #[must_use]
    pub fn for_loop_head(head: &ForHead) -> Self {
        let mut frame = Self::new();
        if let ForHead::VarDecl(decl) = head {
            frame.declare_lexical_var(decl);
        }
        frame
    }

    /// Frame binding a named function or class expression's own name.
    #[must_use]
    pub fn for_expr_name(name: Option<&str>, kind: BindingKind) -> Self {
        let mut frame = Self::new();
        if let Some(name) = name {
            frame.declare(name, kind);
        }
        frame
    }

    fn hoist(&mut self, body: Option<&BlockStmt>) {
        if let Some(body) = body {
            body.visit_with(&mut VarHoister { frame: self });
        }
    }

    fn declare_stmt(&mut self, stmt: &Stmt) {
        if let Stmt::Decl(decl) = stmt {
            self.declare_decl(decl);
        }
    }

    fn declare_lexical_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Decl(Decl::Var(decl)) => self.declare_lexical_var(decl),
            Stmt::Decl(decl) => self.declare_decl(decl),
            _ => {}
        }
    }

    fn declare_lexical_var(&mut self, decl: &VarDecl) {
        if decl.kind != VarDeclKind::Var {
            self.declare_var(decl);
        }
    }

    fn declare_var(&mut self, decl: &VarDecl) {
        let kind = BindingKind::from(decl.kind);
        for declarator in &decl.decls {
            self.declare_pat(&declarator.name, kind);
        }
    }

    fn declare_decl(&mut self, decl: &Decl) {
        match decl {
            Decl::Fn(f) => self.declare(f.ident.sym.to_string(), BindingKind::Function),
            Decl::Class(c) => self.declare(c.ident.sym.to_string(), BindingKind::Class),
            Decl::Var(v) => self.declare_var(v),
            Decl::TsEnum(e) => self.declare(e.id.sym.to_string(), BindingKind::Const),
            _ => {}
        }
    }

    fn declare_pat(&mut self, pat: &Pat, kind: BindingKind) {
        match pat {
            Pat::Ident(binding) => self.declare(binding.id.sym.to_string(), kind),
            Pat::Array(array) => {
                for elem in array.elems.iter().flatten() {
                    self.declare_pat(elem, kind);
                }
            }
            Pat::Rest(rest) => self.declare_pat(&rest.arg, kind),
            Pat::Object(object) => {
                for prop in &object.props {
                    match prop {
                        ObjectPatProp::KeyValue(kv) => self.declare_pat(&kv.value, kind),
                        ObjectPatProp::Assign(assign) => {
                            self.declare(assign.key.sym.to_string(), kind);
                        }
                        ObjectPatProp::Rest(rest) => self.declare_pat(&rest.arg, kind),
                    }
                }
            }
            Pat::Assign(assign) => self.declare_pat(&assign.left, kind),
            Pat::Invalid(_) | Pat::Expr(_) => {}
        }
    }
}

/// Collects `var` declarations, stopping at nested function boundaries.
struct VarHoister<'a> {
    frame: &'a mut Frame,
}

impl Visit for VarHoister<'_> {
    fn visit_var_decl(&mut self, decl: &VarDecl) {
        if decl.kind == VarDeclKind::Var {
            self.frame.declare_var(decl);
        }
        decl.visit_children_with(self);
    }

    fn visit_function(&mut self, _: &Function) {}

    fn visit_arrow_expr(&mut self, _: &ArrowExpr) {}

    fn visit_class(&mut self, _: &Class) {}
}

/// Stack of frames from the outermost scope inwards.
#[derive(Debug, Default)]
pub struct ScopeChain {
    frames: Vec<Frame>,
}

impl ScopeChain {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    pub fn pop(&mut self) {
        self.frames.pop();
    }

    /// Innermost binding of `name`, if any scope declares it.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<BindingKind> {
        self.frames.iter().rev().find_map(|frame| frame.get(name))
    }

    #[must_use]
    pub fn is_bound(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::source::SourceFile;
    use crate::transform::swc::parse_module;

    fn module(text: &str) -> Module {
        swc_common::GLOBALS.set(&swc_common::Globals::default(), || {
            parse_module(&SourceFile::new("/src/a.js", text))
                .map(|parsed| parsed.module)
                .unwrap()
        })
    }

    #[test]
    fn test_module_frame_collects_top_level() {
        let m = module(
            "import req, { a as b } from 'x';\n\
             import * as ns from 'y';\n\
             const { c, d: [e] } = obj;\n\
             function f() { var inner = 1; }\n\
             class K {}\n\
             if (x) { var hoisted = 1; let blocked = 2; }\n\
             export const g = 1;\n\
             export default function h() {}",
        );
        let frame = Frame::for_module(&m);
        assert_eq!(frame.get("req"), Some(BindingKind::Import));
        assert_eq!(frame.get("b"), Some(BindingKind::Import));
        assert_eq!(frame.get("a"), None);
        assert_eq!(frame.get("ns"), Some(BindingKind::Import));
        assert_eq!(frame.get("c"), Some(BindingKind::Const));
        assert_eq!(frame.get("e"), Some(BindingKind::Const));
        assert_eq!(frame.get("f"), Some(BindingKind::Function));
        assert_eq!(frame.get("K"), Some(BindingKind::Class));
        assert_eq!(frame.get("hoisted"), Some(BindingKind::Var));
        assert_eq!(frame.get("g"), Some(BindingKind::Const));
        assert_eq!(frame.get("h"), Some(BindingKind::Function));
        assert_eq!(frame.get("inner"), None);
        assert_eq!(frame.get("blocked"), None);
    }

    #[test]
    fn test_function_frame_params_and_hoisting() {
        let m = module("function f(require, { a = 1 }, ...rest) { if (x) { var late; } }");
        let ModuleItem::Stmt(Stmt::Decl(Decl::Fn(f))) = &m.body[0] else {
            panic!("expected function declaration");
        };
        let frame = Frame::for_function(&f.function);
        assert_eq!(frame.get("require"), Some(BindingKind::Param));
        assert_eq!(frame.get("a"), Some(BindingKind::Param));
        assert_eq!(frame.get("rest"), Some(BindingKind::Param));
        assert_eq!(frame.get("late"), Some(BindingKind::Var));
    }

    #[test]
    fn test_block_frame_is_lexical_only() {
        let m = module("{ let a; var b; function c() {} }");
        let ModuleItem::Stmt(Stmt::Block(block)) = &m.body[0] else {
            panic!("expected block");
        };
        let frame = Frame::for_block(&block.stmts);
        assert_eq!(frame.get("a"), Some(BindingKind::Let));
        assert_eq!(frame.get("b"), None);
        assert_eq!(frame.get("c"), Some(BindingKind::Function));
    }

    #[test]
    fn test_switch_frame_spans_cases() {
        let m = module("switch (x) { case 1: let a; break; default: const b = 2; }");
        let ModuleItem::Stmt(Stmt::Switch(switch)) = &m.body[0] else {
            panic!("expected switch");
        };
        let frame = Frame::for_switch(switch);
        assert_eq!(frame.get("a"), Some(BindingKind::Let));
        assert_eq!(frame.get("b"), Some(BindingKind::Const));
    }

    #[test]
    fn test_arrow_frame() {
        let m = module("const f = (require, [x]) => { var y; };");
        let ModuleItem::Stmt(Stmt::Decl(Decl::Var(var))) = &m.body[0] else {
            panic!("expected variable declaration");
        };
        let Some(swc_ecma_ast::Expr::Arrow(arrow)) = var.decls[0].init.as_deref() else {
            panic!("expected arrow");
        };
        let frame = Frame::for_arrow(arrow);
        assert_eq!(frame.get("require"), Some(BindingKind::Param));
        assert_eq!(frame.get("x"), Some(BindingKind::Param));
        assert_eq!(frame.get("y"), Some(BindingKind::Var));
    }

    #[test]
    fn test_chain_lookup_innermost_first() {
        let mut chain = ScopeChain::new();
        let mut outer = Frame::new();
        outer.declare("require", BindingKind::Var);
        chain.push(outer);
        let mut inner = Frame::new();
        inner.declare("require", BindingKind::Param);
        chain.push(inner);

        assert_eq!(chain.lookup("require"), Some(BindingKind::Param));
        chain.pop();
        assert_eq!(chain.lookup("require"), Some(BindingKind::Var));
        chain.pop();
        assert!(!chain.is_bound("require"));
    }
}
