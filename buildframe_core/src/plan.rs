//! Builder shape planning: decides the concrete API of each generated
//! builder before any text is rendered.

use crate::config::BuildConfig;
use crate::dependency::{RecursionInfo, analyse_recursion};
use crate::model::{FieldKind, FieldModel, TypeModel};
use crate::report::{Diagnostic, DiagnosticKind};
use crate::scanner::DefaultExpr;
use convert_case::{Case, Casing};
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::{debug, trace};

/// The concrete shape of one setter (or setter pair) on a builder.
///
/// `boxed` records a declaration that stores the value behind a `Box`; the
/// setter still takes the bare value and finalize re-wraps it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetterKind {
    /// Plain value setter; storage is `Option<ty>`.
    Value { ty: String, boxed: bool },
    /// Setter takes the unwrapped value of an `Option` field.
    Optional { ty: String, boxed: bool },
    /// Additive setter appending one element, plus a bulk-replace setter.
    Collection {
        element_ty: String,
        add_method: String,
        boxed: bool,
    },
    /// Value setter plus a configurator taking a fresh nested builder.
    Nested {
        ty: String,
        builder: String,
        with_method: String,
        state_ident: String,
        boxed: bool,
    },
    /// Same as `Nested` for an `Option`-wrapped field; never required.
    OptionalNested {
        ty: String,
        builder: String,
        with_method: String,
        state_ident: String,
        boxed: bool,
    },
}

/// One field's setter specification.
#[derive(Debug, Clone)]
pub struct SetterSpec {
    /// Declared field name.
    pub field: String,
    /// Setter method name: the field name normalized to snake_case once.
    /// This rule is fixed so regeneration is stable across implementations.
    pub method: String,
    pub kind: SetterKind,
    pub required: bool,
    pub default: Option<DefaultExpr>,
}

/// The build-step specification: which fields must have been supplied by
/// finalize time, and the error type the emitted check produces.
#[derive(Debug, Clone)]
pub struct FinalizeSpec {
    pub required: Vec<String>,
    pub error_ident: String,
}

/// The fully decided shape of one generated builder, independent of output
/// text formatting.
#[derive(Debug, Clone)]
pub struct BuilderPlan {
    pub type_name: String,
    pub builder_ident: String,
    pub error_ident: String,
    pub source_file: PathBuf,
    pub path: PathBuf,
    pub setters: Vec<SetterSpec>,
    pub finalize: FinalizeSpec,
}

#[derive(Debug, Default)]
pub struct PlanSet {
    pub plans: Vec<BuilderPlan>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Plans one builder per type model. Setter order follows field order.
pub fn plan_builders(models: &[TypeModel], config: &BuildConfig) -> PlanSet {
    let mut result = PlanSet::default();
    let recursion = analyse_recursion(models);

    for model in models {
        debug!(declaration = %model.name, "planning builder shape");
        let builder_ident = model.builder_name.clone();
        let error_ident = format!("{}Error", builder_ident);

        let mut setters = Vec::with_capacity(model.fields.len());
        for field in &model.fields {
            setters.push(setter_spec(model, field, &builder_ident, &recursion, &mut result));
        }

        check_method_collisions(model, &setters, &mut result);

        let required: Vec<String> = model
            .fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name.clone())
            .collect();

        result.plans.push(BuilderPlan {
            type_name: model.name.clone(),
            builder_ident,
            error_ident: error_ident.clone(),
            source_file: model.file.clone(),
            path: config.output.target_path(&model.file, &model.name),
            setters,
            finalize: FinalizeSpec {
                required,
                error_ident,
            },
        });
    }

    result
}

fn setter_spec(
    model: &TypeModel,
    field: &FieldModel,
    builder_ident: &str,
    recursion: &RecursionInfo,
    result: &mut PlanSet,
) -> SetterSpec {
    let method = setter_method(&field.name);
    let mut default = field.default.clone();

    let kind = match &field.kind {
        FieldKind::Scalar(ty) => SetterKind::Value {
            ty: ty.clone(),
            boxed: false,
        },

        FieldKind::Nested(type_ref) => {
            if recursion.is_recursive_pair(&model.name, &type_ref.name) {
                trace!(
                    field = %field.name,
                    target = %type_ref.name,
                    "cyclic reference, requiring explicit supply"
                );
                SetterKind::Value {
                    ty: type_ref.name.clone(),
                    boxed: type_ref.boxed,
                }
            } else {
                SetterKind::Nested {
                    ty: type_ref.name.clone(),
                    builder: nested_builder_ident(&type_ref.name),
                    with_method: format!("{}_with", method),
                    state_ident: state_ident(builder_ident, &field.name),
                    boxed: type_ref.boxed,
                }
            }
        }

        FieldKind::Optional(inner) => {
            if default.is_some() {
                default = None;
                result.diagnostics.push(ignored_default(model, field));
            }
            match inner.as_ref() {
                FieldKind::Nested(type_ref) => {
                    if recursion.is_recursive_pair(&model.name, &type_ref.name) {
                        SetterKind::Optional {
                            ty: type_ref.name.clone(),
                            boxed: type_ref.boxed,
                        }
                    } else {
                        SetterKind::OptionalNested {
                            ty: type_ref.name.clone(),
                            builder: nested_builder_ident(&type_ref.name),
                            with_method: format!("{}_with", method),
                            state_ident: state_ident(builder_ident, &field.name),
                            boxed: type_ref.boxed,
                        }
                    }
                }
                other => SetterKind::Optional {
                    ty: other.rust_type(),
                    boxed: false,
                },
            }
        }

        FieldKind::Collection(inner) => {
            if default.is_some() {
                default = None;
                result.diagnostics.push(ignored_default(model, field));
            }
            match inner.as_ref() {
                FieldKind::Nested(type_ref) => SetterKind::Collection {
                    element_ty: type_ref.name.clone(),
                    add_method: add_method(&field.name),
                    boxed: type_ref.boxed,
                },
                other => SetterKind::Collection {
                    element_ty: other.rust_type(),
                    add_method: add_method(&field.name),
                    boxed: false,
                },
            }
        }
    };

    SetterSpec {
        field: field.name.clone(),
        method,
        kind,
        required: field.required,
        default,
    }
}

fn ignored_default(model: &TypeModel, field: &FieldModel) -> Diagnostic {
    Diagnostic::new(
        DiagnosticKind::ParseWarning,
        format!(
            "`default` directive on field `{}` is ignored: optional and collection \
             fields already default to empty",
            field.name
        ),
    )
    .with_declaration(model.name.clone())
    .with_file(model.file.clone())
}

/// A builder with two fields whose setters normalize to the same method name
/// would emit uncompilable code; surface it instead.
fn check_method_collisions(model: &TypeModel, setters: &[SetterSpec], result: &mut PlanSet) {
    let mut seen = HashSet::new();
    for setter in setters {
        let mut methods = vec![setter.method.clone()];
        match &setter.kind {
            SetterKind::Collection { add_method, .. } => methods.push(add_method.clone()),
            SetterKind::Nested { with_method, .. }
            | SetterKind::OptionalNested { with_method, .. } => methods.push(with_method.clone()),
            _ => {}
        }
        for method in methods {
            if !seen.insert(method.clone()) {
                result.diagnostics.push(
                    Diagnostic::new(
                        DiagnosticKind::ParseWarning,
                        format!(
                            "setter name `{}` is produced by more than one field; \
                             the generated builder will not compile as-is",
                            method
                        ),
                    )
                    .with_declaration(model.name.clone())
                    .with_file(model.file.clone()),
                );
            }
        }
    }
}

/// Setter method naming rule: the field name converted to snake_case.
pub fn setter_method(field: &str) -> String {
    field.to_case(Case::Snake)
}

/// Additive setter naming rule: `add_` plus the singularized snake_case
/// field name. Singularization strips one trailing `s` unless the name ends
/// in a double `s`.
pub fn add_method(field: &str) -> String {
    let base = setter_method(field);
    let singular = if base.len() > 1 && base.ends_with('s') && !base.ends_with("ss") {
        &base[..base.len() - 1]
    } else {
        base.as_str()
    };
    format!("add_{}", singular)
}

fn nested_builder_ident(type_name: &str) -> String {
    format!("{}Builder", type_name)
}

fn state_ident(builder_ident: &str, field: &str) -> String {
    format!("{}{}Field", builder_ident, field.to_case(Case::Pascal))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BuildConfig;
    use crate::model::build_models;
    use crate::scanner::{Directives, RawField, TypeDeclaration};
    use quote::ToTokens;
    use std::path::Path;

    fn raw_field(name: &str, ty: &str) -> RawField {
        let ty: syn::Type = syn::parse_str(ty).unwrap();
        let raw = crate::scanner::normalize_type_text(&ty.to_token_stream().to_string());
        RawField {
            name: name.to_string(),
            ty,
            raw,
            default: None,
        }
    }

    fn declaration(name: &str, fields: Vec<RawField>) -> TypeDeclaration {
        TypeDeclaration {
            name: name.to_string(),
            file: Path::new("src/models.rs").to_path_buf(),
            line: 1,
            order: 0,
            fields,
            directives: Directives::default(),
        }
    }

    fn plan(declarations: Vec<TypeDeclaration>) -> PlanSet {
        let models = build_models(declarations);
        assert!(models.diagnostics.is_empty());
        plan_builders(&models.models, &BuildConfig::default())
    }

    #[test]
    fn test_naming_rules() {
        assert_eq!(setter_method("userName"), "user_name");
        assert_eq!(setter_method("user_name"), "user_name");
        assert_eq!(add_method("tags"), "add_tag");
        assert_eq!(add_method("entries"), "add_entrie");
        assert_eq!(add_method("address"), "add_address");
        assert_eq!(add_method("s"), "add_s");
    }

    #[test]
    fn test_scenario_user_plan() {
        let set = plan(vec![declaration(
            "User",
            vec![
                raw_field("name", "String"),
                raw_field("age", "Option<i64>"),
                raw_field("tags", "Vec<String>"),
            ],
        )]);

        assert_eq!(set.plans.len(), 1);
        let plan = &set.plans[0];
        assert_eq!(plan.builder_ident, "UserBuilder");
        assert_eq!(plan.error_ident, "UserBuilderError");
        assert_eq!(
            plan.path,
            Path::new("src/generated/user_builder.rs").to_path_buf()
        );

        let methods: Vec<&str> = plan.setters.iter().map(|s| s.method.as_str()).collect();
        assert_eq!(methods, vec!["name", "age", "tags"]);

        assert_eq!(
            plan.setters[0].kind,
            SetterKind::Value {
                ty: "String".to_string(),
                boxed: false
            }
        );
        assert_eq!(
            plan.setters[1].kind,
            SetterKind::Optional {
                ty: "i64".to_string(),
                boxed: false
            }
        );
        assert_eq!(
            plan.setters[2].kind,
            SetterKind::Collection {
                element_ty: "String".to_string(),
                add_method: "add_tag".to_string(),
                boxed: false
            }
        );
        assert_eq!(plan.finalize.required, vec!["name".to_string()]);
    }

    #[test]
    fn test_nested_gets_configurator() {
        let set = plan(vec![
            declaration("Profile", vec![raw_field("bio", "String")]),
            declaration("User", vec![raw_field("profile", "Profile")]),
        ]);

        let user = set.plans.iter().find(|p| p.type_name == "User").unwrap();
        assert_eq!(
            user.setters[0].kind,
            SetterKind::Nested {
                ty: "Profile".to_string(),
                builder: "ProfileBuilder".to_string(),
                with_method: "profile_with".to_string(),
                state_ident: "UserBuilderProfileField".to_string(),
                boxed: false,
            }
        );
    }

    #[test]
    fn test_cyclic_reference_requires_explicit_supply() {
        let set = plan(vec![declaration(
            "Node",
            vec![
                raw_field("label", "String"),
                raw_field("next", "Option<Node>"),
            ],
        )]);

        let node = &set.plans[0];
        // The cyclic field degrades to a plain optional value setter: no
        // configurator, no auto-construction, finite builder.
        assert_eq!(
            node.setters[1].kind,
            SetterKind::Optional {
                ty: "Node".to_string(),
                boxed: false
            }
        );
        assert!(!node.setters[1].required);
    }

    #[test]
    fn test_direct_cycle_requires_explicit_supply() {
        let set = plan(vec![
            declaration("A", vec![raw_field("b", "B")]),
            declaration("B", vec![raw_field("a", "Option<A>")]),
        ]);

        let a = set.plans.iter().find(|p| p.type_name == "A").unwrap();
        assert_eq!(
            a.setters[0].kind,
            SetterKind::Value {
                ty: "B".to_string(),
                boxed: false
            }
        );
        let b = set.plans.iter().find(|p| p.type_name == "B").unwrap();
        assert_eq!(
            b.setters[0].kind,
            SetterKind::Optional {
                ty: "A".to_string(),
                boxed: false
            }
        );
    }

    #[test]
    fn test_boxed_self_reference() {
        let set = plan(vec![declaration(
            "Category",
            vec![
                raw_field("name", "String"),
                raw_field("parent", "Option<Box<Category>>"),
            ],
        )]);

        let category = &set.plans[0];
        // Setter takes the bare value; finalize re-boxes it.
        assert_eq!(
            category.setters[1].kind,
            SetterKind::Optional {
                ty: "Category".to_string(),
                boxed: true
            }
        );
    }

    #[test]
    fn test_default_on_collection_is_ignored_with_warning() {
        let mut field = raw_field("tags", "Vec<String>");
        field.default = Some(DefaultExpr::Trait);
        let set = plan(vec![declaration("User", vec![field])]);

        assert_eq!(set.diagnostics.len(), 1);
        assert_eq!(set.diagnostics[0].kind, DiagnosticKind::ParseWarning);
        assert_eq!(set.plans[0].setters[0].default, None);
    }

    #[test]
    fn test_method_collision_warns() {
        let set = plan(vec![declaration(
            "Clash",
            vec![raw_field("userName", "String"), raw_field("user_name", "u32")],
        )]);
        assert!(
            set.diagnostics
                .iter()
                .any(|d| d.message.contains("user_name"))
        );
    }

    #[test]
    fn test_optional_nested_acyclic() {
        let set = plan(vec![
            declaration("Profile", vec![raw_field("bio", "String")]),
            declaration("User", vec![raw_field("profile", "Option<Profile>")]),
        ]);
        let user = set.plans.iter().find(|p| p.type_name == "User").unwrap();
        assert!(matches!(
            &user.setters[0].kind,
            SetterKind::OptionalNested { ty, .. } if ty == "Profile"
        ));
    }

    #[test]
    fn test_collection_of_nested_takes_values() {
        let set = plan(vec![
            declaration("Item", vec![raw_field("sku", "String")]),
            declaration("Order", vec![raw_field("items", "Vec<Item>")]),
        ]);
        let order = set.plans.iter().find(|p| p.type_name == "Order").unwrap();
        assert_eq!(
            order.setters[0].kind,
            SetterKind::Collection {
                element_ty: "Item".to_string(),
                add_method: "add_item".to_string(),
                boxed: false
            }
        );
    }

    #[test]
    fn test_state_ident_uses_pascal_field() {
        let set = plan(vec![
            declaration("Profile", vec![raw_field("bio", "String")]),
            declaration(
                "User",
                vec![raw_field("home_profile", "Profile")],
            ),
        ]);
        let user = set.plans.iter().find(|p| p.type_name == "User").unwrap();
        assert!(matches!(
            &user.setters[0].kind,
            SetterKind::Nested { state_ident, .. } if state_ident == "UserBuilderHomeProfileField"
        ));
    }
}
