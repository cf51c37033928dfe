//! Normalized type models: classification of raw declarations into the
//! structural view the planner consumes.

use crate::report::{Diagnostic, DiagnosticKind};
use crate::scanner::{DefaultExpr, TypeDeclaration};
use quote::ToTokens;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use syn::Type as SynType;
use tracing::{debug, trace, warn};

/// A reference to another scanned type. An unresolved reference degrades to
/// scalar treatment at classification time; it is kept on the model only for
/// diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeRef {
    pub name: String,
    /// True when the declaration stores the reference behind a `Box`, as
    /// self-referential fields must. The builder API still passes the bare
    /// value; emission re-wraps it at finalize time.
    pub boxed: bool,
}

/// Structural classification of one field's type expression.
///
/// Classification precedence is fixed: explicit `Option` wrapper, then
/// explicit collection wrapper (`Vec`, slices, arrays), then a reference to
/// another scanned type, then scalar fallback. The outermost wrapper wins,
/// so `Option<Vec<T>>` is `Optional(Collection(T))`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// Any type the builder passes through opaquely; carries the source text.
    Scalar(String),
    Optional(Box<FieldKind>),
    Collection(Box<FieldKind>),
    Nested(TypeRef),
}

impl FieldKind {
    /// Reconstructs the Rust type text for this kind, as declared.
    pub fn rust_type(&self) -> String {
        match self {
            FieldKind::Scalar(text) => text.clone(),
            FieldKind::Optional(inner) => format!("Option<{}>", inner.rust_type()),
            FieldKind::Collection(inner) => format!("Vec<{}>", inner.rust_type()),
            FieldKind::Nested(type_ref) if type_ref.boxed => {
                format!("Box<{}>", type_ref.name)
            }
            FieldKind::Nested(type_ref) => type_ref.name.clone(),
        }
    }
}

/// Normalized view of one declared field.
#[derive(Debug, Clone)]
pub struct FieldModel {
    pub name: String,
    pub kind: FieldKind,
    /// True when `build()` must fail if the field was never supplied:
    /// scalar and nested fields without a default directive. Optional and
    /// collection fields are never required.
    pub required: bool,
    pub default: Option<DefaultExpr>,
}

/// Normalized view of one declaration. Field order is preserved from the
/// declaration; emission depends on it.
#[derive(Debug, Clone)]
pub struct TypeModel {
    pub name: String,
    pub builder_name: String,
    pub file: PathBuf,
    pub line: usize,
    pub fields: Vec<FieldModel>,
}

/// Result of the model-building stage. `models` preserves scan order.
#[derive(Debug, Default)]
pub struct ModelSet {
    pub models: Vec<TypeModel>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ModelSet {
    pub fn get(&self, name: &str) -> Option<&TypeModel> {
        self.models.iter().find(|m| m.name == name)
    }
}

/// Builds normalized models from raw declarations.
///
/// Duplicate type names across files are a fatal diagnostic for every
/// declaration carrying the name; the name is withheld from the model set
/// and references to it degrade to scalar treatment with a warning. Other
/// names proceed untouched.
pub fn build_models(declarations: Vec<TypeDeclaration>) -> ModelSet {
    let mut result = ModelSet::default();

    let mut counts: HashMap<String, usize> = HashMap::new();
    for declaration in &declarations {
        *counts.entry(declaration.name.clone()).or_default() += 1;
    }
    let withheld: HashSet<String> = counts
        .iter()
        .filter(|&(_, &count)| count > 1)
        .map(|(name, _)| name.clone())
        .collect();
    let known: HashSet<String> = counts
        .keys()
        .filter(|name| !withheld.contains(*name))
        .cloned()
        .collect();

    debug!(
        "building models for {} declarations ({} withheld by name collision)",
        declarations.len(),
        withheld.len()
    );

    for declaration in declarations {
        if withheld.contains(&declaration.name) {
            warn!(declaration = %declaration.name, "duplicate type name, withholding");
            result.diagnostics.push(
                Diagnostic::new(
                    DiagnosticKind::NameCollision,
                    format!(
                        "type name `{}` is declared in more than one scanned file; \
                         builder generation for this name is halted",
                        declaration.name
                    ),
                )
                .with_declaration(declaration.name.clone())
                .with_file(declaration.file.clone()),
            );
            continue;
        }

        let mut context = ClassifyContext {
            declaration: &declaration.name,
            file: &declaration.file,
            known: &known,
            withheld: &withheld,
            diagnostics: &mut result.diagnostics,
        };

        let mut fields = Vec::with_capacity(declaration.fields.len());
        for raw in &declaration.fields {
            let kind = classify(&raw.ty, &mut context);
            let required =
                matches!(kind, FieldKind::Scalar(_) | FieldKind::Nested(_)) && raw.default.is_none();
            trace!(field = %raw.name, ?kind, required, "classified field");
            fields.push(FieldModel {
                name: raw.name.clone(),
                kind,
                required,
                default: raw.default.clone(),
            });
        }

        let builder_name = declaration
            .directives
            .builder_name
            .clone()
            .unwrap_or_else(|| format!("{}Builder", declaration.name));

        result.models.push(TypeModel {
            name: declaration.name,
            builder_name,
            file: declaration.file,
            line: declaration.line,
            fields,
        });
    }

    result
}

struct ClassifyContext<'a> {
    declaration: &'a str,
    file: &'a std::path::Path,
    known: &'a HashSet<String>,
    withheld: &'a HashSet<String>,
    diagnostics: &'a mut Vec<Diagnostic>,
}

impl ClassifyContext<'_> {
    fn warn_unsupported(&mut self, raw: &str) {
        self.diagnostics.push(
            Diagnostic::new(
                DiagnosticKind::ParseWarning,
                format!(
                    "unsupported type syntax `{}`; treated as an opaque scalar",
                    raw
                ),
            )
            .with_declaration(self.declaration.to_string())
            .with_file(self.file.to_path_buf()),
        );
    }

    fn warn_unresolved(&mut self, name: &str) {
        self.diagnostics.push(
            Diagnostic::new(
                DiagnosticKind::ResolutionWarning,
                format!(
                    "reference to `{}` cannot be resolved within the scanned set; \
                     treated as an opaque scalar",
                    name
                ),
            )
            .with_declaration(self.declaration.to_string())
            .with_file(self.file.to_path_buf()),
        );
    }
}

fn classify(ty: &SynType, context: &mut ClassifyContext<'_>) -> FieldKind {
    match ty {
        SynType::Path(type_path) => classify_path(type_path, context),

        // [T] and [T; N] both accumulate like Vec<T>.
        SynType::Slice(slice) => {
            FieldKind::Collection(Box::new(classify(&slice.elem, context)))
        }
        SynType::Array(array) => {
            FieldKind::Collection(Box::new(classify(&array.elem, context)))
        }

        SynType::Paren(paren) => classify(&paren.elem, context),
        SynType::Group(group) => classify(&group.elem, context),

        other => {
            let raw = scalar_text(other);
            context.warn_unsupported(&raw);
            FieldKind::Scalar(raw)
        }
    }
}

fn classify_path(type_path: &syn::TypePath, context: &mut ClassifyContext<'_>) -> FieldKind {
    if type_path.qself.is_some() {
        let raw = scalar_text(&SynType::Path(type_path.clone()));
        context.warn_unsupported(&raw);
        return FieldKind::Scalar(raw);
    }

    let last = match type_path.path.segments.last() {
        Some(segment) => segment,
        None => {
            let raw = scalar_text(&SynType::Path(type_path.clone()));
            context.warn_unsupported(&raw);
            return FieldKind::Scalar(raw);
        }
    };
    let ident = last.ident.to_string();

    if let syn::PathArguments::AngleBracketed(args) = &last.arguments {
        let type_args: Vec<_> = args
            .args
            .iter()
            .filter_map(|arg| match arg {
                syn::GenericArgument::Type(t) => Some(t),
                _ => None,
            })
            .collect();

        match ident.as_str() {
            "Option" if type_args.len() == 1 => {
                return FieldKind::Optional(Box::new(classify(type_args[0], context)));
            }
            "Vec" if type_args.len() == 1 => {
                return FieldKind::Collection(Box::new(classify(type_args[0], context)));
            }
            // A boxed reference to a scanned type is still a nested field;
            // anything else behind a Box stays opaque so the emitted
            // builder passes the declared type through unchanged.
            "Box" if type_args.len() == 1 => {
                return match classify(type_args[0], context) {
                    FieldKind::Nested(mut type_ref) => {
                        type_ref.boxed = true;
                        FieldKind::Nested(type_ref)
                    }
                    _ => FieldKind::Scalar(scalar_text(&SynType::Path(type_path.clone()))),
                };
            }
            _ => {
                return FieldKind::Scalar(scalar_text(&SynType::Path(type_path.clone())));
            }
        }
    }

    if context.known.contains(&ident) {
        return FieldKind::Nested(TypeRef {
            name: ident,
            boxed: false,
        });
    }
    if context.withheld.contains(&ident) {
        context.warn_unresolved(&ident);
        return FieldKind::Scalar(scalar_text(&SynType::Path(type_path.clone())));
    }

    FieldKind::Scalar(scalar_text(&SynType::Path(type_path.clone())))
}

fn scalar_text(ty: &SynType) -> String {
    crate::scanner::normalize_type_text(&ty.to_token_stream().to_string())
}
