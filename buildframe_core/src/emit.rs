//! Deterministic rendering of builder plans into Rust source text.
//!
//! Rendering is a pure function of the plan: identical plans always produce
//! byte-identical text. The output manager depends on that for no-op
//! detection, and reproducible builds depend on it across machines.

use crate::output::marker_line;
use crate::plan::{BuilderPlan, SetterKind, SetterSpec};
use crate::scanner::DefaultExpr;
use std::path::PathBuf;
use tracing::trace;

/// One rendered output file, ready for the output manager.
#[derive(Debug, Clone)]
pub struct Rendered {
    pub path: PathBuf,
    pub text: String,
}

/// Renders a builder plan into source text. Setter order follows the plan's
/// setter order, which follows declaration field order.
pub fn render(plan: &BuilderPlan) -> Rendered {
    trace!(declaration = %plan.type_name, "rendering builder");
    let mut out = String::new();

    push_header(&mut out, plan);
    push_error_enum(&mut out, plan);
    push_state_enums(&mut out, plan);
    push_builder_struct(&mut out, plan);
    push_builder_impl(&mut out, plan);
    push_default_impl(&mut out, plan);

    Rendered {
        path: plan.path.clone(),
        text: out,
    }
}

fn push_header(out: &mut String, plan: &BuilderPlan) {
    let stem = plan
        .path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("builder");
    let dir = plan
        .path
        .parent()
        .and_then(|p| p.file_name())
        .and_then(|s| s.to_str())
        .unwrap_or("generated");

    out.push_str(&marker_line(&plan.type_name, &plan.source_file));
    out.push('\n');
    out.push_str(&format!("//! Fluent builder for `{}`.\n", plan.type_name));
    out.push_str("//!\n");
    out.push_str("//! Regenerated by buildframe; do not edit by hand. Include this file as a\n");
    out.push_str("//! module next to the declaring type, e.g.\n");
    out.push_str(&format!(
        "//! `#[path = \"{}/{}.rs\"] mod {};` followed by\n",
        dir, stem, stem
    ));
    out.push_str(&format!("//! `use {}::*;`.\n", stem));
    out.push('\n');
    out.push_str("use super::*;\n");
    out.push('\n');
}

fn push_error_enum(out: &mut String, plan: &BuilderPlan) {
    let error = &plan.error_ident;
    out.push_str(&format!(
        "/// Error returned by [`{}::build`] when construction cannot complete.\n",
        plan.builder_ident
    ));
    out.push_str("#[derive(Debug)]\n");
    out.push_str(&format!("pub enum {} {{\n", error));
    out.push_str("    /// A required field was never supplied.\n");
    out.push_str("    MissingField(&'static str),\n");
    if has_nested(plan) {
        out.push_str("    /// A nested builder failed to produce its value.\n");
        out.push_str("    Nested {\n");
        out.push_str("        field: &'static str,\n");
        out.push_str("        message: String,\n");
        out.push_str("    },\n");
    }
    out.push_str("}\n");
    out.push('\n');

    out.push_str(&format!("impl ::std::fmt::Display for {} {{\n", error));
    out.push_str(
        "    fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {\n",
    );
    out.push_str("        match self {\n");
    out.push_str(&format!("            {}::MissingField(field) => {{\n", error));
    out.push_str("                write!(f, \"missing required field `{}`\", field)\n");
    out.push_str("            }\n");
    if has_nested(plan) {
        out.push_str(&format!(
            "            {}::Nested {{ field, message }} => {{\n",
            error
        ));
        out.push_str(
            "                write!(f, \"nested builder for `{}` failed: {}\", field, message)\n",
        );
        out.push_str("            }\n");
    }
    out.push_str("        }\n");
    out.push_str("    }\n");
    out.push_str("}\n");
    out.push('\n');
    out.push_str(&format!("impl ::std::error::Error for {} {{}}\n", error));
    out.push('\n');
}

fn push_state_enums(out: &mut String, plan: &BuilderPlan) {
    for setter in &plan.setters {
        let (ty, builder, state_ident) = match &setter.kind {
            SetterKind::Nested {
                ty,
                builder,
                state_ident,
                ..
            }
            | SetterKind::OptionalNested {
                ty,
                builder,
                state_ident,
                ..
            } => (ty, builder, state_ident),
            _ => continue,
        };
        out.push_str(&format!(
            "/// Pending state for the `{}` field of [`{}`].\n",
            setter.field, plan.builder_ident
        ));
        out.push_str(&format!("enum {} {{\n", state_ident));
        out.push_str(&format!("    Value({}),\n", ty));
        out.push_str(&format!("    Pending({}),\n", builder));
        out.push_str("}\n");
        out.push('\n');
    }
}

fn push_builder_struct(out: &mut String, plan: &BuilderPlan) {
    out.push_str(&format!("/// Fluent builder for `{}`.\n", plan.type_name));
    if plan.setters.is_empty() {
        out.push_str(&format!("pub struct {} {{}}\n", plan.builder_ident));
    } else {
        out.push_str(&format!("pub struct {} {{\n", plan.builder_ident));
        for setter in &plan.setters {
            out.push_str(&format!(
                "    {}: {},\n",
                ident(&setter.field),
                storage_type(setter)
            ));
        }
        out.push_str("}\n");
    }
    out.push('\n');
}

fn push_builder_impl(out: &mut String, plan: &BuilderPlan) {
    out.push_str(&format!("impl {} {{\n", plan.builder_ident));
    push_new(out, plan);
    for setter in &plan.setters {
        push_setter(out, plan, setter);
    }
    push_build(out, plan);
    out.push_str("}\n");
    out.push('\n');
}

fn push_new(out: &mut String, plan: &BuilderPlan) {
    out.push_str("    /// Creates an empty builder.\n");
    out.push_str("    pub fn new() -> Self {\n");
    if plan.setters.is_empty() {
        out.push_str("        Self {}\n");
    } else {
        out.push_str("        Self {\n");
        for setter in &plan.setters {
            out.push_str(&format!(
                "            {}: {},\n",
                ident(&setter.field),
                empty_init(setter)
            ));
        }
        out.push_str("        }\n");
    }
    out.push_str("    }\n");
}

fn push_setter(out: &mut String, plan: &BuilderPlan, setter: &SetterSpec) {
    let field = ident(&setter.field);
    let method = ident(&setter.method);

    match &setter.kind {
        SetterKind::Value { ty, .. } => {
            out.push('\n');
            out.push_str(&format!("    /// Sets `{}`.\n", setter.field));
            out.push_str(&format!(
                "    pub fn {}(mut self, value: {}) -> Self {{\n",
                method, ty
            ));
            out.push_str(&format!("        self.{} = Some(value);\n", field));
            out.push_str("        self\n");
            out.push_str("    }\n");
        }
        SetterKind::Optional { ty, .. } => {
            out.push('\n');
            out.push_str(&format!(
                "    /// Sets `{}`. Leaving it unset yields `None`.\n",
                setter.field
            ));
            out.push_str(&format!(
                "    pub fn {}(mut self, value: {}) -> Self {{\n",
                method, ty
            ));
            out.push_str(&format!("        self.{} = Some(value);\n", field));
            out.push_str("        self\n");
            out.push_str("    }\n");
        }
        SetterKind::Collection {
            element_ty,
            add_method,
            ..
        } => {
            out.push('\n');
            out.push_str(&format!(
                "    /// Appends one element to `{}`.\n",
                setter.field
            ));
            out.push_str(&format!(
                "    pub fn {}(mut self, value: {}) -> Self {{\n",
                ident(add_method),
                element_ty
            ));
            out.push_str(&format!("        self.{}.push(value);\n", field));
            out.push_str("        self\n");
            out.push_str("    }\n");
            out.push('\n');
            out.push_str(&format!("    /// Replaces `{}` wholesale.\n", setter.field));
            out.push_str(&format!(
                "    pub fn {}(mut self, values: Vec<{}>) -> Self {{\n",
                method, element_ty
            ));
            out.push_str(&format!("        self.{} = values;\n", field));
            out.push_str("        self\n");
            out.push_str("    }\n");
        }
        SetterKind::Nested {
            ty,
            builder,
            with_method,
            state_ident,
            ..
        }
        | SetterKind::OptionalNested {
            ty,
            builder,
            with_method,
            state_ident,
            ..
        } => {
            out.push('\n');
            out.push_str(&format!(
                "    /// Sets `{}` to an already built value.\n",
                setter.field
            ));
            out.push_str(&format!(
                "    pub fn {}(mut self, value: {}) -> Self {{\n",
                method, ty
            ));
            out.push_str(&format!(
                "        self.{} = Some({}::Value(value));\n",
                field, state_ident
            ));
            out.push_str("        self\n");
            out.push_str("    }\n");
            out.push('\n');
            out.push_str(&format!(
                "    /// Configures `{}` through a fresh [`{}`].\n",
                setter.field, builder
            ));
            out.push_str(&format!("    pub fn {}(\n", ident(with_method)));
            out.push_str("        mut self,\n");
            out.push_str(&format!(
                "        configure: impl FnOnce({}) -> {},\n",
                builder, builder
            ));
            out.push_str("    ) -> Self {\n");
            out.push_str(&format!(
                "        self.{} = Some({}::Pending(configure(\n",
                field, state_ident
            ));
            out.push_str(&format!("            {}::new(),\n", builder));
            out.push_str("        )));\n");
            out.push_str("        self\n");
            out.push_str("    }\n");
        }
    }
}

fn push_build(out: &mut String, plan: &BuilderPlan) {
    let error = &plan.error_ident;
    out.push('\n');
    out.push_str(&format!(
        "    /// Finalizes the builder into a `{}`.\n",
        plan.type_name
    ));
    out.push_str("    ///\n");
    out.push_str("    /// Fails if a required field was never supplied.\n");
    out.push_str(&format!(
        "    pub fn build(self) -> ::std::result::Result<{}, {}> {{\n",
        plan.type_name, error
    ));
    if plan.setters.is_empty() {
        out.push_str(&format!("        Ok({} {{}})\n", plan.type_name));
    } else {
        out.push_str(&format!("        Ok({} {{\n", plan.type_name));
        for setter in &plan.setters {
            push_finalize_field(out, plan, setter);
        }
        out.push_str("        })\n");
    }
    out.push_str("    }\n");
}

fn push_finalize_field(out: &mut String, plan: &BuilderPlan, setter: &SetterSpec) {
    let error = &plan.error_ident;
    let field = ident(&setter.field);

    match &setter.kind {
        SetterKind::Value { boxed, .. } => {
            // Boxed declarations re-wrap at finalize time; the default
            // expression always has the declared field type.
            let base = if *boxed {
                format!("self.{}.map(Box::new)", field)
            } else {
                format!("self.{}", field)
            };
            match &setter.default {
                None => out.push_str(&format!(
                    "            {}: {}.ok_or({}::MissingField(\"{}\"))?,\n",
                    field, base, error, setter.field
                )),
                Some(DefaultExpr::Trait) => out.push_str(&format!(
                    "            {}: {}.unwrap_or_default(),\n",
                    field, base
                )),
                Some(DefaultExpr::Expr(expr)) => out.push_str(&format!(
                    "            {}: {}.unwrap_or_else(|| {}),\n",
                    field, base, expr
                )),
            }
        }
        SetterKind::Optional { boxed, .. } => {
            if *boxed {
                out.push_str(&format!(
                    "            {}: self.{}.map(Box::new),\n",
                    field, field
                ));
            } else {
                out.push_str(&format!("            {}: self.{},\n", field, field));
            }
        }
        SetterKind::Collection { boxed, .. } => {
            if *boxed {
                out.push_str(&format!(
                    "            {}: self.{}.into_iter().map(Box::new).collect(),\n",
                    field, field
                ));
            } else {
                out.push_str(&format!("            {}: self.{},\n", field, field));
            }
        }
        SetterKind::Nested {
            state_ident, boxed, ..
        } => {
            out.push_str(&format!("            {}: match self.{} {{\n", field, field));
            if *boxed {
                out.push_str(&format!(
                    "                Some({}::Value(value)) => Box::new(value),\n",
                    state_ident
                ));
                out.push_str(&format!(
                    "                Some({}::Pending(builder)) => Box::new(\n",
                    state_ident
                ));
                out.push_str(&format!(
                    "                    builder.build().map_err(|e| {}::Nested {{\n",
                    error
                ));
                out.push_str(&format!(
                    "                        field: \"{}\",\n",
                    setter.field
                ));
                out.push_str("                        message: e.to_string(),\n");
                out.push_str("                    })?,\n");
                out.push_str("                ),\n");
            } else {
                out.push_str(&format!(
                    "                Some({}::Value(value)) => value,\n",
                    state_ident
                ));
                out.push_str(&format!(
                    "                Some({}::Pending(builder)) => {{\n",
                    state_ident
                ));
                out.push_str(&format!(
                    "                    builder.build().map_err(|e| {}::Nested {{\n",
                    error
                ));
                out.push_str(&format!(
                    "                        field: \"{}\",\n",
                    setter.field
                ));
                out.push_str("                        message: e.to_string(),\n");
                out.push_str("                    })?\n");
                out.push_str("                }\n");
            }
            match &setter.default {
                None => out.push_str(&format!(
                    "                None => return Err({}::MissingField(\"{}\")),\n",
                    error, setter.field
                )),
                Some(DefaultExpr::Trait) => {
                    out.push_str("                None => Default::default(),\n");
                }
                Some(DefaultExpr::Expr(expr)) => {
                    out.push_str(&format!("                None => {},\n", expr));
                }
            }
            out.push_str("            },\n");
        }
        SetterKind::OptionalNested {
            state_ident, boxed, ..
        } => {
            out.push_str(&format!("            {}: match self.{} {{\n", field, field));
            if *boxed {
                out.push_str(&format!(
                    "                Some({}::Value(value)) => Some(Box::new(value)),\n",
                    state_ident
                ));
                out.push_str(&format!(
                    "                Some({}::Pending(builder)) => Some(Box::new(\n",
                    state_ident
                ));
                out.push_str(&format!(
                    "                    builder.build().map_err(|e| {}::Nested {{\n",
                    error
                ));
                out.push_str(&format!(
                    "                        field: \"{}\",\n",
                    setter.field
                ));
                out.push_str("                        message: e.to_string(),\n");
                out.push_str("                    })?,\n");
                out.push_str("                )),\n");
            } else {
                out.push_str(&format!(
                    "                Some({}::Value(value)) => Some(value),\n",
                    state_ident
                ));
                out.push_str(&format!(
                    "                Some({}::Pending(builder)) => Some(\n",
                    state_ident
                ));
                out.push_str(&format!(
                    "                    builder.build().map_err(|e| {}::Nested {{\n",
                    error
                ));
                out.push_str(&format!(
                    "                        field: \"{}\",\n",
                    setter.field
                ));
                out.push_str("                        message: e.to_string(),\n");
                out.push_str("                    })?,\n");
                out.push_str("                ),\n");
            }
            out.push_str("                None => None,\n");
            out.push_str("            },\n");
        }
    }
}

fn push_default_impl(out: &mut String, plan: &BuilderPlan) {
    out.push_str(&format!("impl Default for {} {{\n", plan.builder_ident));
    out.push_str("    fn default() -> Self {\n");
    out.push_str("        Self::new()\n");
    out.push_str("    }\n");
    out.push_str("}\n");
}

fn has_nested(plan: &BuilderPlan) -> bool {
    plan.setters.iter().any(|s| {
        matches!(
            s.kind,
            SetterKind::Nested { .. } | SetterKind::OptionalNested { .. }
        )
    })
}

fn storage_type(setter: &SetterSpec) -> String {
    match &setter.kind {
        SetterKind::Value { ty, .. } | SetterKind::Optional { ty, .. } => {
            format!("Option<{}>", ty)
        }
        SetterKind::Collection { element_ty, .. } => format!("Vec<{}>", element_ty),
        SetterKind::Nested { state_ident, .. } | SetterKind::OptionalNested { state_ident, .. } => {
            format!("Option<{}>", state_ident)
        }
    }
}

fn empty_init(setter: &SetterSpec) -> &'static str {
    match &setter.kind {
        SetterKind::Collection { .. } => "Vec::new()",
        _ => "None",
    }
}

/// Escapes field and method names that collide with Rust keywords.
fn ident(name: &str) -> String {
    const KEYWORDS: &[&str] = &[
        "abstract", "as", "async", "await", "become", "box", "break", "const", "continue", "do",
        "dyn", "else", "enum", "extern", "false", "final", "fn", "for", "gen", "if", "impl", "in",
        "let", "loop", "macro", "match", "mod", "move", "mut", "override", "priv", "pub", "ref",
        "return", "static", "struct", "trait", "true", "try", "type", "typeof", "unsafe",
        "unsized", "use", "virtual", "where", "while", "yield",
    ];
    if KEYWORDS.contains(&name) {
        format!("r#{}", name)
    } else {
        name.to_string()
    }
}
