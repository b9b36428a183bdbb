//! PHP source transformer
//!
//! Rewrites a PHP file so it can live inside a module function:
//! - every include becomes a dispatcher call for the target's module id
//! - variables used in the top-level scope are declared `global`
//! - `const` declarations become `define()` calls
//! - the leading `<?php` and a trailing `?>` are dropped; inline HTML at
//!   either end gets the tag it needs to stay HTML
//!
//! Constructs that only work at file scope (`namespace`, `use`,
//! `declare(strict_types)`, `__halt_compiler`) are rejected.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use indexmap::IndexSet;
use tracing::warn;

use super::Loader;
use crate::artifact::dispatch_call;
use crate::builder::BuildContext;
use crate::error::{BuildError, BuildResult};
use crate::fs::FileSystem;
use crate::module_id::ModuleId;
use crate::php::ast::{BinaryOp, ClassDecl};
use crate::php::visit::{walk_args, walk_class};
use crate::php::{
    line_col, parse, walk_expr, walk_stmt, Expr, ExprKind, IncludeKind, Program, Span, Stmt,
    StmtKind, Visitor,
};

/// Variables PHP makes global on its own
const SUPERGLOBALS: &[&str] = &[
    "GLOBALS", "_SERVER", "_GET", "_POST", "_FILES", "_COOKIE", "_SESSION", "_REQUEST", "_ENV",
    "this",
];

/// The builtin `php` loader
#[derive(Debug, Clone, Copy, Default)]
pub struct PhpLoader;

impl PhpLoader {
    pub fn new() -> Self {
        Self
    }
}

impl Loader for PhpLoader {
    fn name(&self) -> &str {
        "php"
    }

    fn extensions(&self) -> Vec<String> {
        vec!["php".to_string()]
    }

    fn process(&self, cx: &mut BuildContext<'_>, path: &Path, contents: &[u8]) -> BuildResult<()> {
        let src = std::str::from_utf8(contents).map_err(|e| BuildError::LoaderFailed {
            path: path.to_path_buf(),
            loader: self.name().to_string(),
            message: format!("not valid UTF-8: {}", e),
        })?;
        let module = transform(src, path, cx.fs(), cx.diagnostics())?;
        cx.register_unit(path, &module.body);
        for (target, kind) in &module.includes {
            cx.include(path, target, *kind)?;
        }
        Ok(())
    }
}

/// Result of transforming one file
#[derive(Debug, Clone, PartialEq)]
pub struct Transformed {
    /// Function body, not yet wrapped
    pub body: String,
    /// Resolved include targets in source order, one per include site
    pub includes: Vec<(PathBuf, IncludeKind)>,
    /// Names declared `global`, in order of first use
    pub globals: Vec<String>,
}

/// Transform `src`, the contents of `path`
pub fn transform(
    src: &str,
    path: &Path,
    fs: &dyn FileSystem,
    diagnostics: bool,
) -> BuildResult<Transformed> {
    let program = parse(src).map_err(|err| {
        let (line, column) = line_col(src, err.offset);
        BuildError::Parse {
            path: path.to_path_buf(),
            line,
            column,
            message: err.message,
        }
    })?;
    reject_file_scope_constructs(src, path, &program)?;

    let mut scan = Scan::new(src, path);
    for stmt in &program.stmts {
        scan.visit_stmt(stmt)?;
    }
    for span in &scan.dynamic {
        let (line, column) = line_col(src, span.start);
        warn!(
            "dynamic variable access at top level of {}:{}:{} is not made global",
            path.display(),
            line,
            column
        );
    }

    let mut edits: Vec<(Span, String)> = Vec::new();
    let mut includes = Vec::new();
    for site in scan.sites.into_values() {
        let target = resolve(fs, path, &site.target);
        let id = ModuleId::from_path(&target, diagnostics);
        edits.push((
            site.span,
            dispatch_call(&id, site.kind.required(), site.kind.once()),
        ));
        includes.push((target, site.kind));
    }
    edits.extend(const_rewrites(src, &program));
    edits.sort_by_key(|(span, _)| span.start);

    let globals: Vec<String> = scan.globals.into_iter().collect();
    let body = render(src, &program, &edits, &globals);
    Ok(Transformed {
        body,
        includes,
        globals,
    })
}

fn resolve(fs: &dyn FileSystem, includer: &Path, target: &str) -> PathBuf {
    let target = Path::new(target);
    if target.is_absolute() {
        return fs.canonicalize(target);
    }
    let dir = includer.parent().unwrap_or_else(|| Path::new("/"));
    fs.canonicalize(&dir.join(target))
}

fn reject_file_scope_constructs(src: &str, path: &Path, program: &Program) -> BuildResult<()> {
    for stmt in &program.stmts {
        let kind = match &stmt.kind {
            StmtKind::Namespace { .. } => "namespace",
            StmtKind::Use(_) => "use",
            StmtKind::Declare { directives, .. }
                if directives
                    .iter()
                    .any(|(name, _)| name.eq_ignore_ascii_case("strict_types")) =>
            {
                "declare(strict_types)"
            }
            StmtKind::HaltCompiler => "__halt_compiler",
            _ => continue,
        };
        return Err(BuildError::UnsupportedSyntax {
            path: path.to_path_buf(),
            kind: kind.to_string(),
            line: line_col(src, stmt.span.start).0,
        });
    }
    Ok(())
}

/// `const A = 1, B = 2;` -> `define('A', 1); define('B', 2);`
fn const_rewrites(src: &str, program: &Program) -> Vec<(Span, String)> {
    program
        .stmts
        .iter()
        .filter_map(|stmt| {
            let StmtKind::Const(items) = &stmt.kind else {
                return None;
            };
            let last = items.last()?;
            let calls: Vec<String> = items
                .iter()
                .map(|item| {
                    format!(
                        "define({}, {})",
                        super::escape::single_quoted(&item.name),
                        &src[item.value.span.start..item.value.span.end]
                    )
                })
                .collect();
            Some((Span::new(stmt.span.start, last.span.end), calls.join("; ")))
        })
        .collect()
}

fn render(src: &str, program: &Program, edits: &[(Span, String)], globals: &[String]) -> String {
    if src.trim().is_empty() {
        return String::new();
    }

    let (start, prefix) = match program.stmts.first() {
        Some(Stmt {
            kind: StmtKind::Nop,
            span,
        }) if is_open_tag(&src[span.start..span.end]) => (span.end, ""),
        _ => (0, "?>\n"),
    };
    let ends_in_html = matches!(
        program.stmts.last().map(|s| &s.kind),
        Some(StmtKind::InlineHtml(text)) if !text.trim().is_empty()
    );
    let (end, suffix) = if ends_in_html {
        (src.len(), "<?php")
    } else {
        let trimmed = src.trim_end();
        match trimmed.strip_suffix("?>") {
            // the close tag also terminated the last statement
            Some(code) => {
                let code = code.trim_end();
                let end = code.len().max(start);
                let terminated = src[start..end].trim().is_empty()
                    || code.ends_with(';')
                    || ends_with_open_tag(code);
                (end, if terminated { "" } else { ";" })
            }
            None => (trimmed.len().max(start), ""),
        }
    };

    let mut out = String::new();
    if !globals.is_empty() {
        let names: Vec<String> = globals.iter().map(|name| format!("${}", name)).collect();
        out.push_str(&format!("global {};\n", names.join(", ")));
    }
    out.push_str(prefix);
    let mut cursor = start;
    for (span, replacement) in edits {
        if span.start < cursor || span.end > end {
            continue;
        }
        out.push_str(&src[cursor..span.start]);
        out.push_str(replacement);
        cursor = span.end;
    }
    out.push_str(&src[cursor..end]);
    out.push_str(suffix);
    out
}

fn is_open_tag(text: &str) -> bool {
    text.get(..5)
        .is_some_and(|tag| tag.eq_ignore_ascii_case("<?php"))
}

fn ends_with_open_tag(text: &str) -> bool {
    text.len() >= 5
        && text
            .get(text.len() - 5..)
            .is_some_and(|tag| tag.eq_ignore_ascii_case("<?php"))
}

/// Value of an include target built from constants only
fn constant_target(expr: &Expr, file: &Path) -> Option<String> {
    match &expr.kind {
        ExprKind::String(value) => Some(value.clone()),
        ExprKind::Name(name) => {
            let name = name.trim_start_matches('\\');
            if name.eq_ignore_ascii_case("__DIR__") {
                Some(file.parent()?.to_string_lossy().into_owned())
            } else if name.eq_ignore_ascii_case("__FILE__") {
                Some(file.to_string_lossy().into_owned())
            } else {
                None
            }
        }
        ExprKind::Binary {
            op: BinaryOp::Concat,
            left,
            right,
        } => {
            let mut value = constant_target(left, file)?;
            value.push_str(&constant_target(right, file)?);
            Some(value)
        }
        _ => None,
    }
}

struct IncludeSite {
    span: Span,
    kind: IncludeKind,
    target: String,
}

/// Collects include sites everywhere and variables of the top-level scope
struct Scan<'a> {
    src: &'a str,
    path: &'a Path,
    /// Function, class and closure bodies entered
    depth: usize,
    /// Parameters of the arrow functions being walked
    arrow_params: Vec<String>,
    globals: IndexSet<String>,
    /// Keyed by start offset, so a node walked twice counts once
    sites: BTreeMap<usize, IncludeSite>,
    dynamic: Vec<Span>,
}

impl<'a> Scan<'a> {
    fn new(src: &'a str, path: &'a Path) -> Self {
        Self {
            src,
            path,
            depth: 0,
            arrow_params: Vec::new(),
            globals: IndexSet::new(),
            sites: BTreeMap::new(),
            dynamic: Vec::new(),
        }
    }

    fn add_global(&mut self, name: &str) {
        if self.depth > 0
            || SUPERGLOBALS.contains(&name)
            || self.arrow_params.iter().any(|p| p == name)
        {
            return;
        }
        self.globals.insert(name.to_string());
    }

    fn nested<F>(&mut self, f: F) -> BuildResult<()>
    where
        F: FnOnce(&mut Self) -> BuildResult<()>,
    {
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn nested_class(&mut self, decl: &ClassDecl) -> BuildResult<()> {
        // constructor arguments are evaluated in the enclosing scope
        walk_args(self, &decl.args)?;
        self.nested(|scan| walk_class(scan, decl))
    }
}

impl Visitor for Scan<'_> {
    type Error = BuildError;

    fn visit_stmt(&mut self, stmt: &Stmt) -> BuildResult<()> {
        match &stmt.kind {
            StmtKind::Function(_) => self.nested(|scan| walk_stmt(scan, stmt)),
            StmtKind::ClassLike(decl) => self.nested_class(decl),
            StmtKind::Try { catches, .. } => {
                for var in catches.iter().filter_map(|c| c.var.as_deref()) {
                    self.add_global(var);
                }
                walk_stmt(self, stmt)
            }
            _ => walk_stmt(self, stmt),
        }
    }

    fn visit_expr(&mut self, expr: &Expr) -> BuildResult<()> {
        match &expr.kind {
            ExprKind::Variable(name) => {
                self.add_global(name);
                Ok(())
            }
            ExprKind::DynamicVariable(_) => {
                if self.depth == 0 {
                    self.dynamic.push(expr.span);
                }
                walk_expr(self, expr)
            }
            ExprKind::Closure(closure) => {
                for used in &closure.uses {
                    self.add_global(&used.name);
                }
                self.nested(|scan| walk_expr(scan, expr))
            }
            ExprKind::AnonymousClass(decl) => self.nested_class(decl),
            ExprKind::ArrowFunction { params, .. } => {
                let mark = self.arrow_params.len();
                self.arrow_params
                    .extend(params.iter().map(|param| param.name.clone()));
                let result = walk_expr(self, expr);
                self.arrow_params.truncate(mark);
                result
            }
            ExprKind::Include { kind, target } => {
                let Some(value) = constant_target(target, self.path) else {
                    let (line, column) = line_col(self.src, expr.span.start);
                    return Err(BuildError::DynamicInclude {
                        path: self.path.to_path_buf(),
                        line,
                        column,
                    });
                };
                self.sites.insert(
                    expr.span.start,
                    IncludeSite {
                        span: expr.span,
                        kind: *kind,
                        target: value,
                    },
                );
                Ok(())
            }
            _ => walk_expr(self, expr),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFs;

    fn run(src: &str) -> Transformed {
        transform(src, Path::new("/src/index.php"), &MemoryFs::new(), false).unwrap()
    }

    fn id(path: &str) -> ModuleId {
        ModuleId::from_path(Path::new(path), false)
    }

    #[test]
    fn include_becomes_dispatch_call() {
        let out = run("<?php\nrequire_once 'lib/util.php';\n");
        assert_eq!(
            out.body,
            format!("__phpinclude_dispatch('{}', true, true);", id("/src/lib/util.php"))
        );
        assert_eq!(
            out.includes,
            vec![(PathBuf::from("/src/lib/util.php"), IncludeKind::RequireOnce)]
        );
    }

    #[test]
    fn include_keeps_return_value_and_terminator() {
        let out = run("<?php $cfg = (include '../config.php') ?: [];");
        assert_eq!(
            out.body,
            format!(
                "global $cfg;\n$cfg = (__phpinclude_dispatch('{}', false, false)) ?: [];",
                id("/config.php")
            )
        );
    }

    #[test]
    fn magic_constants_and_concatenation_resolve() {
        let out = run("<?php include_once __DIR__ . '/a' . '.php'; require __FILE__ . '.inc.php';");
        let targets: Vec<_> = out.includes.iter().map(|(p, _)| p.clone()).collect();
        assert_eq!(
            targets,
            vec![
                PathBuf::from("/src/a.php"),
                PathBuf::from("/src/index.php.inc.php")
            ]
        );
    }

    #[test]
    fn dynamic_include_is_rejected_with_position() {
        let err = transform(
            "<?php\n\n  include $file;",
            Path::new("/src/index.php"),
            &MemoryFs::new(),
            false,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            BuildError::DynamicInclude {
                line: 3,
                column: 3,
                ..
            }
        ));
    }

    #[test]
    fn nested_includes_are_rewritten() {
        let out = run("<?php function boot() { return require 'boot.php'; }");
        assert!(out.body.contains(&format!(
            "return __phpinclude_dispatch('{}', true, false);",
            id("/src/boot.php")
        )));
        assert!(out.globals.is_empty());
    }

    #[test]
    fn top_level_variables_become_global() {
        let out = run(
            "<?php\n$x = 1;\nforeach ($items as $k => $v) { echo $x; }\nfunction f($local) { $inner = 2; }\n$cb = function () use ($x, $y) { $z = 3; };\n$double = fn($n) => $n * $factor;\necho $_SERVER['argv'][0];\n",
        );
        assert_eq!(
            out.globals,
            vec!["x", "items", "k", "v", "cb", "y", "double", "factor"]
        );
        assert!(out.body.starts_with("global $x, $items, $k, $v, $cb, $y, $double, $factor;\n"));
    }

    #[test]
    fn class_bodies_are_not_scanned_for_globals() {
        let out = run("<?php class A { public function m() { $this->x = $y; } }\n$obj = new class($arg) { public $p; };");
        assert_eq!(out.globals, vec!["obj", "arg"]);
    }

    #[test]
    fn catch_variable_is_global() {
        let out = run("<?php try { f(); } catch (Exception $e) { log($e); }");
        assert_eq!(out.globals, vec!["e"]);
    }

    #[test]
    fn leading_html_is_kept_outside_php() {
        let out = run("<h1>Title</h1>\n<?php echo 1; ?>\n<p>footer</p>\n");
        assert_eq!(out.body, "?>\n<h1>Title</h1>\n<?php echo 1; ?>\n<p>footer</p>\n<?php");
    }

    #[test]
    fn short_echo_start_is_treated_as_html() {
        let out = run("<?= 'hi' ?>");
        assert_eq!(out.body, "?>\n<?= 'hi';");
    }

    #[test]
    fn stripped_close_tag_keeps_statement_terminated() {
        assert_eq!(run("<?php echo 1 ?>").body, "echo 1;");
        assert_eq!(run("<h1>x</h1><?php ?>").body, "?>\n<h1>x</h1><?php");
    }

    #[test]
    fn trailing_close_tag_and_whitespace_are_dropped() {
        let out = run("<?php\necho 1;\n?>\n\n");
        assert_eq!(out.body, "echo 1;");
    }

    #[test]
    fn const_becomes_define() {
        let out = run("<?php const A = 1, B = A * 2;\necho B;");
        assert_eq!(out.body, "define('A', 1); define('B', A * 2);\necho B;");
    }

    #[test]
    fn file_scope_constructs_are_rejected() {
        for (src, kind) in [
            ("<?php namespace App;", "namespace"),
            ("<?php\nuse Foo\\Bar;", "use"),
            ("<?php declare(strict_types=1);", "declare(strict_types)"),
            ("<?php __halt_compiler(); data", "__halt_compiler"),
        ] {
            let err = transform(src, Path::new("/a.php"), &MemoryFs::new(), false).unwrap_err();
            match err {
                BuildError::UnsupportedSyntax { kind: got, .. } => assert_eq!(got, kind),
                other => panic!("{}: unexpected {:?}", src, other),
            }
        }
    }

    #[test]
    fn parse_error_reports_line_and_column() {
        let err = transform("<?php\n$a = ;", Path::new("/a.php"), &MemoryFs::new(), false)
            .unwrap_err();
        assert!(matches!(
            err,
            BuildError::Parse {
                line: 2,
                column: 6,
                ..
            }
        ));
    }

    #[test]
    fn empty_file_has_empty_body() {
        assert_eq!(run("").body, "");
        assert_eq!(run("<?php\n").body, "");
    }

    #[test]
    fn diagnostics_ids_carry_file_stem() {
        let out = transform(
            "<?php include 'helpers.php';",
            Path::new("/src/index.php"),
            &MemoryFs::new(),
            true,
        )
        .unwrap();
        assert!(out.body.contains("__helpers'"), "{}", out.body);
    }
}
