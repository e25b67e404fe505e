//! Reference classification.
//!
//! Decides whether a call expression is one of the recognized dependency
//! idioms and whether its arguments have a shape that can be resolved
//! statically. Classification never mutates the tree.

use crate::request::RequestKind;
use swc_ecma_ast::{Callee, CallExpr, Expr, ExprOrSpread, Lit, MemberProp, Str};

/// Recognized call names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    /// `require(..)`
    Require,
    /// `require.resolve(..)`
    RequireResolve,
    /// `require.ensure(..)`
    RequireEnsure,
    /// `module.hot.accept(..)`
    HotAccept,
    /// `module.hot.decline(..)`
    HotDecline,
}

impl CallKind {
    /// Look up a fully-qualified callee name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "require" => Some(Self::Require),
            "require.resolve" => Some(Self::RequireResolve),
            "require.ensure" => Some(Self::RequireEnsure),
            "module.hot.accept" => Some(Self::HotAccept),
            "module.hot.decline" => Some(Self::HotDecline),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Require => "require",
            Self::RequireResolve => "require.resolve",
            Self::RequireEnsure => "require.ensure",
            Self::HotAccept => "module.hot.accept",
            Self::HotDecline => "module.hot.decline",
        }
    }

    /// Whether a local `require` binding suppresses rewriting.
    #[must_use]
    pub fn is_shadowable(&self) -> bool {
        matches!(self, Self::Require | Self::RequireResolve)
    }

    /// Request kind recorded for the call's string argument.
    ///
    /// `None` for `require.ensure`, whose requests come from the chunk extractor.
    #[must_use]
    pub fn request_kind(&self) -> Option<RequestKind> {
        match self {
            Self::Require => Some(RequestKind::CallRequire),
            Self::RequireResolve => Some(RequestKind::CallResolve),
            Self::HotAccept => Some(RequestKind::HotAccept),
            Self::HotDecline => Some(RequestKind::HotDecline),
            Self::RequireEnsure => None,
        }
    }
}

/// A call the rewriter should act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallReference {
    /// Recognized name whose first argument is a string literal.
    Specifier(CallKind),
    /// `require.ensure` whose first argument is an array literal.
    Ensure,
}

/// Flatten an identifier or a chain of non-computed member accesses into
/// a dotted name: `a.b.c` -> `"a.b.c"`.
#[must_use]
pub fn dotted_name(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Ident(ident) => Some(ident.sym.to_string()),
        Expr::Member(member) => {
            let MemberProp::Ident(prop) = &member.prop else {
                return None;
            };
            let mut name = dotted_name(&member.obj)?;
            name.push('.');
            name.push_str(&prop.sym);
            Some(name)
        }
        _ => None,
    }
}

/// Dotted name of a call's callee, if it has one.
#[must_use]
pub fn callee_name(callee: &Callee) -> Option<String> {
    match callee {
        Callee::Expr(expr) => dotted_name(expr),
        Callee::Super(_) | Callee::Import(_) => None,
    }
}

/// The argument at `index` when it is a plain (non-spread) string literal.
#[must_use]
pub fn string_arg(args: &[ExprOrSpread], index: usize) -> Option<&Str> {
    match args.get(index)? {
        ExprOrSpread { spread: None, expr } => match &**expr {
            Expr::Lit(Lit::Str(lit)) => Some(lit),
            _ => None,
        },
        ExprOrSpread { spread: Some(_), .. } => None,
    }
}

/// Mutable access to the string literal argument at `index`.
pub fn string_arg_mut(args: &mut [ExprOrSpread], index: usize) -> Option<&mut Str> {
    let arg = args.get_mut(index)?;
    if arg.spread.is_some() {
        return None;
    }
    match &mut *arg.expr {
        Expr::Lit(Lit::Str(lit)) => Some(lit),
        _ => None,
    }
}

fn has_array_arg(args: &[ExprOrSpread]) -> bool {
    matches!(
        args.first(),
        Some(ExprOrSpread { spread: None, expr }) if matches!(**expr, Expr::Array(_))
    )
}

/// Classify a call expression.
///
/// Returns `None` for unrecognized names and for recognized names whose
/// arguments cannot be resolved statically; such calls are left as written.
#[must_use]
pub fn classify_call(call: &CallExpr) -> Option<CallReference> {
    let kind = CallKind::from_name(&callee_name(&call.callee)?)?;
    match kind {
        CallKind::RequireEnsure => has_array_arg(&call.args).then_some(CallReference::Ensure),
        CallKind::Require | CallKind::RequireResolve | CallKind::HotAccept | CallKind::HotDecline => {
            string_arg(&call.args, 0).map(|_| CallReference::Specifier(kind))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::swc::parse_expression;

    fn call(source: &str) -> CallExpr {
        match *parse_expression(source).unwrap() {
            Expr::Call(call) => call,
            other => panic!("not a call: {other:?}"),
        }
    }

    #[test]
    fn test_dotted_name() {
        let expr = parse_expression("a.b.c").unwrap();
        assert_eq!(dotted_name(&expr).as_deref(), Some("a.b.c"));
        let expr = parse_expression("a[b].c").unwrap();
        assert_eq!(dotted_name(&expr), None);
        let expr = parse_expression("a().b").unwrap();
        assert_eq!(dotted_name(&expr), None);
    }

    #[test]
    fn test_classify_require() {
        assert_eq!(
            classify_call(&call("require('./a')")),
            Some(CallReference::Specifier(CallKind::Require))
        );
        assert_eq!(
            classify_call(&call("require.resolve('./a')")),
            Some(CallReference::Specifier(CallKind::RequireResolve))
        );
    }

    #[test]
    fn test_classify_hot() {
        assert_eq!(
            classify_call(&call("module.hot.accept('./a', cb)")),
            Some(CallReference::Specifier(CallKind::HotAccept))
        );
        assert_eq!(
            classify_call(&call("module.hot.decline('./a')")),
            Some(CallReference::Specifier(CallKind::HotDecline))
        );
    }

    #[test]
    fn test_non_literal_arguments_are_ignored() {
        assert_eq!(classify_call(&call("require(name)")), None);
        assert_eq!(classify_call(&call("require(`./a`)")), None);
        assert_eq!(classify_call(&call("require(...names)")), None);
        assert_eq!(classify_call(&call("require()")), None);
        assert_eq!(classify_call(&call("module.hot.accept()")), None);
    }

    #[test]
    fn test_classify_ensure_requires_array() {
        assert_eq!(
            classify_call(&call("require.ensure(['./a'], function () {})")),
            Some(CallReference::Ensure)
        );
        assert_eq!(classify_call(&call("require.ensure(deps, cb)")), None);
        assert_eq!(classify_call(&call("require.ensure('./a', cb)")), None);
    }

    #[test]
    fn test_unrecognized_names() {
        assert_eq!(classify_call(&call("requireX('./a')")), None);
        assert_eq!(classify_call(&call("foo.require('./a')")), None);
        assert_eq!(classify_call(&call("module.hot.dispose('./a')")), None);
        assert_eq!(classify_call(&call("import('./a')")), None);
    }

    #[test]
    fn test_request_kinds() {
        assert_eq!(CallKind::Require.request_kind(), Some(RequestKind::CallRequire));
        assert_eq!(CallKind::RequireEnsure.request_kind(), None);
        assert!(CallKind::Require.is_shadowable());
        assert!(CallKind::RequireResolve.is_shadowable());
        assert!(!CallKind::RequireEnsure.is_shadowable());
        assert!(!CallKind::HotAccept.is_shadowable());
    }
}
