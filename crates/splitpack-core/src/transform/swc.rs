//! SWC-backed parser and code generator.
//!
//! The transform treats parsing and serialization as capabilities it calls
//! into; this module is the only place that talks to the SWC parser and
//! emitter directly.

use super::diagnostic::{codes, TransformError};
use super::source::{Dialect, SourceFile};
use swc_common::{
    comments::SingleThreadedComments, sync::Lrc, FileName, Globals, SourceMap, Span, Spanned, DUMMY_SP,
    GLOBALS,
};
use swc_ecma_ast::{EsVersion, Expr, ExprStmt, Module, ModuleItem, Stmt};
use swc_ecma_codegen::{text_writer::JsWriter, Emitter};
use swc_ecma_parser::{lexer::Lexer, EsSyntax, Parser, StringInput, Syntax, TsSyntax};
use swc_ecma_transforms_base::fixer::fixer;
use swc_ecma_visit::{FoldWith, VisitMut, VisitMutWith};

/// Language level accepted by the parser and emitted by the generator.
const TARGET: EsVersion = EsVersion::EsNext;

/// A parsed module together with the state needed to print it again.
pub(crate) struct ParsedModule {
    pub cm: Lrc<SourceMap>,
    pub comments: SingleThreadedComments,
    pub module: Module,
}

/// Generated code plus its source map (JSON text).
pub(crate) struct Emitted {
    pub code: String,
    pub source_map: Option<String>,
}

fn syntax_for(dialect: Dialect) -> Syntax {
    if dialect.typescript {
        Syntax::Typescript(TsSyntax {
            tsx: dialect.jsx,
            decorators: true,
            ..Default::default()
        })
    } else {
        Syntax::Es(EsSyntax {
            jsx: dialect.jsx,
            decorators: true,
            ..Default::default()
        })
    }
}

/// Parse a source file as an ES module.
///
/// Recoverable parser errors are fatal too; the first one is reported.
pub(crate) fn parse_module(file: &SourceFile) -> Result<ParsedModule, TransformError> {
    let cm: Lrc<SourceMap> = Lrc::default();
    let fm = cm.new_source_file(
        Lrc::new(FileName::Real(file.path.clone())),
        file.text.clone(),
    );
    let comments = SingleThreadedComments::default();

    let lexer = Lexer::new(
        syntax_for(file.dialect),
        TARGET,
        StringInput::from(&*fm),
        Some(&comments),
    );
    let mut parser = Parser::new_from(lexer);

    let module = parser
        .parse_module()
        .map_err(|e| syntax_error(&cm, &fm, file, &e))?;

    if let Some(e) = parser.take_errors().into_iter().next() {
        return Err(syntax_error(&cm, &fm, file, &e));
    }

    Ok(ParsedModule {
        cm,
        comments,
        module,
    })
}

/// Map a parser error to a diagnostic, with a position when the span is usable.
fn syntax_error(
    cm: &SourceMap,
    fm: &swc_common::SourceFile,
    file: &SourceFile,
    error: &swc_ecma_parser::error::Error,
) -> TransformError {
    let span = error.span();
    let message = error.kind().msg().into_owned();

    if span.is_dummy() || span.lo < fm.start_pos || span.lo > fm.end_pos {
        return TransformError::in_file(codes::TRANSFORM_SYNTAX_ERROR, &file.path, message);
    }

    let loc = cm.lookup_char_pos(span.lo);
    TransformError::syntax_at(
        &file.path,
        &file.text,
        u32::try_from(loc.line).unwrap_or(u32::MAX),
        u32::try_from(loc.col.0 + 1).unwrap_or(u32::MAX),
        message,
    )
}

/// Serialize a (rewritten) module back to code.
pub(crate) fn emit(
    parsed: ParsedModule,
    file: &SourceFile,
    source_maps: bool,
) -> Result<Emitted, TransformError> {
    let ParsedModule {
        cm,
        comments,
        module,
    } = parsed;

    // Substituted expressions may need parentheses in their new position.
    let module = module.fold_with(&mut fixer(Some(&comments)));

    let mut buf = Vec::new();
    let mut src_map_buf = Vec::new();

    {
        let writer = JsWriter::new(
            cm.clone(),
            "\n",
            &mut buf,
            if source_maps {
                Some(&mut src_map_buf)
            } else {
                None
            },
        );

        let mut emitter = Emitter {
            cfg: swc_ecma_codegen::Config::default().with_target(TARGET),
            cm: cm.clone(),
            comments: Some(&comments),
            wr: writer,
        };

        emitter
            .emit_module(&module)
            .map_err(|e| TransformError::emit(&file.path, format!("Failed to emit: {e}")))?;
    }

    let code = String::from_utf8(buf)
        .map_err(|e| TransformError::emit(&file.path, format!("Invalid UTF-8 output: {e}")))?;

    let source_map = if source_maps {
        let srcmap = cm.build_source_map(&src_map_buf);
        let mut map_buf = Vec::new();
        srcmap.to_writer(&mut map_buf).map_err(|e| {
            TransformError::emit(&file.path, format!("Failed to write source map: {e}"))
        })?;
        Some(String::from_utf8(map_buf).map_err(|e| {
            TransformError::emit(&file.path, format!("Invalid UTF-8 source map: {e}"))
        })?)
    } else {
        None
    };

    Ok(Emitted { code, source_map })
}

/// Parse a standalone expression, e.g. the right-hand side of a define.
///
/// The returned tree carries no source positions.
pub(crate) fn parse_expression(source: &str) -> Result<Box<Expr>, String> {
    GLOBALS.set(&Globals::default(), || parse_expression_inner(source))
}

fn parse_expression_inner(source: &str) -> Result<Box<Expr>, String> {
    let cm: Lrc<SourceMap> = Lrc::default();
    // The newline lets a trailing line comment end before the closing paren.
    let fm = cm.new_source_file(Lrc::new(FileName::Anon), format!("({source}\n)"));

    let lexer = Lexer::new(
        Syntax::Es(EsSyntax::default()),
        TARGET,
        StringInput::from(&*fm),
        None,
    );
    let mut parser = Parser::new_from(lexer);

    let mut module = parser
        .parse_module()
        .map_err(|e| e.kind().msg().into_owned())?;
    if let Some(e) = parser.take_errors().into_iter().next() {
        return Err(e.kind().msg().into_owned());
    }

    let expr = match (module.body.pop(), module.body.is_empty()) {
        (Some(ModuleItem::Stmt(Stmt::Expr(ExprStmt { expr, .. }))), true) => expr,
        _ => return Err("expected a single expression".to_string()),
    };

    let mut expr = match *expr {
        Expr::Paren(paren) => paren.expr,
        other => Box::new(other),
    };
    expr.visit_mut_with(&mut DropSpans);
    Ok(expr)
}

struct DropSpans;

impl VisitMut for DropSpans {
    fn visit_mut_span(&mut self, span: &mut Span) {
        *span = DUMMY_SP;
    }
}
