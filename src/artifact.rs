//! Artifact assembly
//!
//! Layout of a bundle:
//!
//! ```text
//! <?php
//! <dispatch prelude>
//!
//! function __module_<id>()
//! {
//! <unit body>
//! }
//! ...
//!
//! __phpinclude_dispatch('<entry id>', true, false);
//! ```
//!
//! Every include in the sources became a call to the dispatcher, which
//! remembers executed modules so `_once` includes stay `_once` after
//! inlining.

use std::path::Path;

use crate::error::{BuildError, BuildResult};
use crate::module_id::ModuleId;
use crate::registry::Registry;

/// Name of the runtime dispatch function
pub const DISPATCH_FN: &str = "__phpinclude_dispatch";

/// Runtime half of include/require, emitted once per artifact
pub const PRELUDE: &str = r#"function __phpinclude_dispatch($module, $require, $once)
{
    static $executed = [];
    if ($once && isset($executed[$module])) {
        return true;
    }
    $executed[$module] = true;
    if (function_exists($module)) {
        return $module();
    }
    if ($require) {
        fwrite(defined('STDERR') ? STDERR : fopen('php://stderr', 'w'), "Fatal error: module $module is missing from the bundle\n");
        exit(255);
    }
    trigger_error("module $module is missing from the bundle", E_USER_WARNING);
    return false;
}"#;

/// Expression standing in for one include site
pub fn dispatch_call(id: &ModuleId, required: bool, once: bool) -> String {
    format!("{}('{}', {}, {})", DISPATCH_FN, id, required, once)
}

/// Wrap a transformed body in its module function.
///
/// `source` is only passed in diagnostics mode and ends up as a comment.
pub fn wrap_module(id: &ModuleId, body: &str, source: Option<&Path>) -> String {
    let mut out = format!("function {}()\n{{\n", id);
    if let Some(source) = source {
        out.push_str(&format!("// Generated from {}\n", source.display()));
    }
    out.push_str(body);
    out.push_str("\n}");
    out
}

/// Render the artifact for the registry's entry.
///
/// Only present units are emitted, in build order.
pub fn assemble(registry: &Registry) -> BuildResult<String> {
    let entry = registry
        .entry()
        .and_then(|path| registry.get(path))
        .ok_or_else(|| BuildError::EntryNotBuilt {
            path: registry.entry().map(Path::to_path_buf).unwrap_or_default(),
        })?;

    let mut out = String::from("<?php\n");
    out.push_str(PRELUDE);
    out.push_str("\n\n");
    for unit in registry.present_units() {
        out.push_str(unit.body());
        out.push('\n');
    }
    out.push('\n');
    out.push_str(&dispatch_call(entry.module_id(), true, false));
    out.push_str(";\n");
    Ok(out)
}
