//! Syntax tree traversal
//!
//! `walk_*` functions visit every child node; a `Visitor` overrides the
//! hooks it cares about and calls back into `walk_*` to keep descending.
//! The matches are exhaustive, so a new node kind fails to compile here
//! until it is walked.

use super::ast::*;

pub trait Visitor {
    type Error;

    fn visit_stmt(&mut self, stmt: &Stmt) -> Result<(), Self::Error> {
        walk_stmt(self, stmt)
    }

    fn visit_expr(&mut self, expr: &Expr) -> Result<(), Self::Error> {
        walk_expr(self, expr)
    }
}

pub fn walk_stmts<V: Visitor + ?Sized>(v: &mut V, stmts: &[Stmt]) -> Result<(), V::Error> {
    stmts.iter().try_for_each(|stmt| v.visit_stmt(stmt))
}

fn walk_exprs<V: Visitor + ?Sized>(v: &mut V, exprs: &[Expr]) -> Result<(), V::Error> {
    exprs.iter().try_for_each(|expr| v.visit_expr(expr))
}

fn walk_opt<V: Visitor + ?Sized>(v: &mut V, expr: Option<&Expr>) -> Result<(), V::Error> {
    match expr {
        Some(expr) => v.visit_expr(expr),
        None => Ok(()),
    }
}

pub fn walk_stmt<V: Visitor + ?Sized>(v: &mut V, stmt: &Stmt) -> Result<(), V::Error> {
    match &stmt.kind {
        StmtKind::Expr(expr) => v.visit_expr(expr),
        StmtKind::Echo(exprs) | StmtKind::Global(exprs) | StmtKind::Unset(exprs) => {
            walk_exprs(v, exprs)
        }
        StmtKind::Block(body) => walk_stmts(v, body),
        StmtKind::If {
            cond,
            then,
            elseifs,
            otherwise,
        } => {
            v.visit_expr(cond)?;
            walk_stmts(v, then)?;
            for (cond, body) in elseifs {
                v.visit_expr(cond)?;
                walk_stmts(v, body)?;
            }
            match otherwise {
                Some(body) => walk_stmts(v, body),
                None => Ok(()),
            }
        }
        StmtKind::While { cond, body } | StmtKind::DoWhile { body, cond } => {
            v.visit_expr(cond)?;
            walk_stmts(v, body)
        }
        StmtKind::For {
            init,
            cond,
            step,
            body,
        } => {
            walk_exprs(v, init)?;
            walk_exprs(v, cond)?;
            walk_exprs(v, step)?;
            walk_stmts(v, body)
        }
        StmtKind::Foreach {
            subject,
            key,
            value,
            body,
        } => {
            v.visit_expr(subject)?;
            walk_opt(v, key.as_ref())?;
            v.visit_expr(value)?;
            walk_stmts(v, body)
        }
        StmtKind::Switch { subject, cases } => {
            v.visit_expr(subject)?;
            for case in cases {
                walk_opt(v, case.test.as_ref())?;
                walk_stmts(v, &case.body)?;
            }
            Ok(())
        }
        StmtKind::Break(value) | StmtKind::Continue(value) | StmtKind::Return(value) => {
            walk_opt(v, value.as_ref())
        }
        StmtKind::StaticVars(vars) => vars
            .iter()
            .try_for_each(|var| walk_opt(v, var.default.as_ref())),
        StmtKind::Function(decl) => walk_function(v, decl),
        StmtKind::ClassLike(decl) => walk_class(v, decl),
        StmtKind::Try {
            body,
            catches,
            finally,
        } => {
            walk_stmts(v, body)?;
            for catch in catches {
                walk_stmts(v, &catch.body)?;
            }
            match finally {
                Some(body) => walk_stmts(v, body),
                None => Ok(()),
            }
        }
        StmtKind::Namespace { body, .. } => match body {
            Some(body) => walk_stmts(v, body),
            None => Ok(()),
        },
        StmtKind::Const(items) => items.iter().try_for_each(|item| v.visit_expr(&item.value)),
        StmtKind::Declare { directives, body } => {
            for (_, value) in directives {
                v.visit_expr(value)?;
            }
            match body {
                Some(body) => walk_stmts(v, body),
                None => Ok(()),
            }
        }
        StmtKind::InlineHtml(_)
        | StmtKind::Use(_)
        | StmtKind::Goto(_)
        | StmtKind::Label(_)
        | StmtKind::HaltCompiler
        | StmtKind::Nop => Ok(()),
    }
}

pub fn walk_params<V: Visitor + ?Sized>(v: &mut V, params: &[Param]) -> Result<(), V::Error> {
    params
        .iter()
        .try_for_each(|param| walk_opt(v, param.default.as_ref()))
}

pub fn walk_function<V: Visitor + ?Sized>(v: &mut V, decl: &FunctionDecl) -> Result<(), V::Error> {
    walk_params(v, &decl.params)?;
    match &decl.body {
        Some(body) => walk_stmts(v, body),
        None => Ok(()),
    }
}

pub fn walk_args<V: Visitor + ?Sized>(v: &mut V, args: &[Arg]) -> Result<(), V::Error> {
    args.iter().try_for_each(|arg| v.visit_expr(&arg.value))
}

pub fn walk_class<V: Visitor + ?Sized>(v: &mut V, decl: &ClassDecl) -> Result<(), V::Error> {
    walk_args(v, &decl.args)?;
    for member in &decl.members {
        match member {
            ClassMember::Method(method) => walk_function(v, method)?,
            ClassMember::Property { default, .. } => walk_opt(v, default.as_ref())?,
            ClassMember::Const(items) => {
                for item in items {
                    v.visit_expr(&item.value)?;
                }
            }
            ClassMember::EnumCase { value, .. } => walk_opt(v, value.as_ref())?,
            ClassMember::TraitUse(_) => {}
        }
    }
    Ok(())
}

fn walk_items<V: Visitor + ?Sized>(v: &mut V, items: &[ArrayItem]) -> Result<(), V::Error> {
    for item in items {
        walk_opt(v, item.key.as_ref())?;
        walk_opt(v, item.value.as_ref())?;
    }
    Ok(())
}

fn walk_template<V: Visitor + ?Sized>(v: &mut V, parts: &[TemplatePart]) -> Result<(), V::Error> {
    for part in parts {
        if let TemplatePart::Expr(expr) = part {
            v.visit_expr(expr)?;
        }
    }
    Ok(())
}

pub fn walk_expr<V: Visitor + ?Sized>(v: &mut V, expr: &Expr) -> Result<(), V::Error> {
    match &expr.kind {
        ExprKind::Variable(_)
        | ExprKind::Int(_)
        | ExprKind::Float(_)
        | ExprKind::String(_)
        | ExprKind::Name(_) => Ok(()),
        ExprKind::DynamicVariable(inner)
        | ExprKind::Empty(inner)
        | ExprKind::Eval(inner)
        | ExprKind::Print(inner)
        | ExprKind::Clone(inner)
        | ExprKind::YieldFrom(inner)
        | ExprKind::Throw(inner) => v.visit_expr(inner),
        ExprKind::Template(parts) | ExprKind::ShellExec(parts) => walk_template(v, parts),
        ExprKind::Array(items) | ExprKind::List(items) => walk_items(v, items),
        ExprKind::Assign { target, value, .. } => {
            v.visit_expr(target)?;
            v.visit_expr(value)
        }
        ExprKind::Binary { left, right, .. } => {
            v.visit_expr(left)?;
            v.visit_expr(right)
        }
        ExprKind::Unary { operand, .. } => v.visit_expr(operand),
        ExprKind::Cast { expr, .. } => v.visit_expr(expr),
        ExprKind::Ternary {
            cond,
            then,
            otherwise,
        } => {
            v.visit_expr(cond)?;
            walk_opt(v, then.as_deref())?;
            v.visit_expr(otherwise)
        }
        ExprKind::Instanceof { expr, class } => {
            v.visit_expr(expr)?;
            v.visit_expr(class)
        }
        ExprKind::Call { callee, args } => {
            v.visit_expr(callee)?;
            walk_args(v, args)
        }
        ExprKind::New { class, args } => {
            v.visit_expr(class)?;
            walk_args(v, args)
        }
        ExprKind::AnonymousClass(decl) => walk_class(v, decl),
        ExprKind::PropertyFetch {
            object, property, ..
        } => {
            v.visit_expr(object)?;
            v.visit_expr(property)
        }
        ExprKind::MethodCall {
            object,
            method,
            args,
            ..
        } => {
            v.visit_expr(object)?;
            v.visit_expr(method)?;
            walk_args(v, args)
        }
        ExprKind::StaticPropertyFetch { class, property } => {
            v.visit_expr(class)?;
            v.visit_expr(property)
        }
        ExprKind::ClassConstFetch { class, .. } => v.visit_expr(class),
        ExprKind::StaticCall {
            class,
            method,
            args,
        } => {
            v.visit_expr(class)?;
            v.visit_expr(method)?;
            walk_args(v, args)
        }
        ExprKind::Index { base, index } => {
            v.visit_expr(base)?;
            walk_opt(v, index.as_deref())
        }
        ExprKind::Closure(closure) => {
            walk_params(v, &closure.params)?;
            walk_stmts(v, &closure.body)
        }
        ExprKind::ArrowFunction { params, body, .. } => {
            walk_params(v, params)?;
            v.visit_expr(body)
        }
        ExprKind::Match { subject, arms } => {
            v.visit_expr(subject)?;
            for arm in arms {
                if let Some(conditions) = &arm.conditions {
                    walk_exprs(v, conditions)?;
                }
                v.visit_expr(&arm.body)?;
            }
            Ok(())
        }
        ExprKind::Include { target, .. } => v.visit_expr(target),
        ExprKind::Isset(exprs) => walk_exprs(v, exprs),
        ExprKind::Exit(code) => walk_opt(v, code.as_deref()),
        ExprKind::Yield { key, value } => {
            walk_opt(v, key.as_deref())?;
            walk_opt(v, value.as_deref())
        }
    }
}
