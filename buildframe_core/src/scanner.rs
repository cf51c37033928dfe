//! Declaration scanning: walks source roots and extracts marker-carrying
//! type declarations.

use crate::config::{BuildConfig, OutputRule};
use crate::error::{BuildframeError, Result};
use crate::report::{Diagnostic, DiagnosticKind};
use quote::ToTokens;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use syn::punctuated::Punctuated;
use syn::spanned::Spanned;
use syn::{Attribute, Expr, ExprLit, Item, ItemStruct, Lit, Meta, Token};
use tracing::{debug, trace, warn};
use walkdir::WalkDir;

/// The derive name that opts a declaration into builder generation.
pub const MARKER_DERIVE: &str = "Buildable";

/// Default value directive attached to a field with `#[buildable(default)]`
/// or `#[buildable(default = "expr")]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefaultExpr {
    /// Use `Default::default()`.
    Trait,
    /// Use the given expression verbatim.
    Expr(String),
}

/// Declaration-level derivation directives.
#[derive(Debug, Clone, Default)]
pub struct Directives {
    /// Custom builder type name from `#[buildable(name = "...")]`.
    pub builder_name: Option<String>,
}

/// One raw field entry as declared, before classification.
#[derive(Debug, Clone)]
pub struct RawField {
    pub name: String,
    pub ty: syn::Type,
    /// Normalized source text of the type expression.
    pub raw: String,
    pub default: Option<DefaultExpr>,
}

/// A raw parsed declaration eligible for derivation. Immutable once scanned.
#[derive(Debug, Clone)]
pub struct TypeDeclaration {
    pub name: String,
    pub file: PathBuf,
    pub line: usize,
    /// Item position within the declaring file, for deterministic ordering.
    pub order: usize,
    pub fields: Vec<RawField>,
    pub directives: Directives,
}

/// Result of one scan pass. Every diagnostic here either skipped a
/// declaration or a whole file (warnings), or records a per-file read
/// failure (fatal).
#[derive(Debug, Default)]
pub struct ScanResult {
    pub declarations: Vec<TypeDeclaration>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Walks the configured source roots and extracts eligible declarations.
pub struct Scanner<'a> {
    config: &'a BuildConfig,
    ignore: Vec<Regex>,
}

impl<'a> Scanner<'a> {
    pub fn new(config: &'a BuildConfig) -> Result<Self> {
        let mut ignore = Vec::with_capacity(config.ignore.len());
        for glob in &config.ignore {
            let regex = glob_to_regex(glob)
                .map_err(|e| BuildframeError::ignore_pattern(glob, e.to_string()))?;
            ignore.push(regex);
        }
        Ok(Self { config, ignore })
    }

    /// Scans all source roots. Declarations come back sorted by
    /// (file path, declaration order within file) so downstream emission
    /// order is reproducible regardless of directory-listing order.
    pub fn scan(&self) -> Result<ScanResult> {
        let mut result = ScanResult::default();
        let mut files = Vec::new();

        for root in &self.config.source_roots {
            if !root.is_dir() {
                return Err(BuildframeError::source_root(
                    root,
                    "not a readable directory",
                ));
            }
            debug!(root = %root.display(), "scanning source root");
            self.collect_files(root, &mut files, &mut result.diagnostics);
        }

        files.sort();
        files.dedup();
        debug!("found {} candidate source files", files.len());

        for file in &files {
            self.scan_file(file, &mut result);
        }

        result
            .declarations
            .sort_by(|a, b| a.file.cmp(&b.file).then(a.order.cmp(&b.order)));

        debug!(
            "scan complete: {} declarations, {} diagnostics",
            result.declarations.len(),
            result.diagnostics.len()
        );
        Ok(result)
    }

    fn collect_files(
        &self,
        root: &Path,
        files: &mut Vec<PathBuf>,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        let walker = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !self.prune_dir(root, entry));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    diagnostics.push(
                        Diagnostic::new(
                            DiagnosticKind::Io,
                            format!("failed to walk source tree: {}", e),
                        )
                        .with_file(root),
                    );
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "rs") {
                continue;
            }
            if self.is_ignored(root, path, false) {
                trace!(file = %path.display(), "ignored by pattern");
                continue;
            }
            files.push(entry.into_path());
        }
    }

    /// Directory pruning: generated output directories are always excluded
    /// so the pipeline never derives builders from its own output.
    fn prune_dir(&self, root: &Path, entry: &walkdir::DirEntry) -> bool {
        if !entry.file_type().is_dir() {
            return false;
        }
        match &self.config.output {
            OutputRule::Alongside { dir_name } => {
                if entry.file_name() == dir_name.as_str() {
                    return true;
                }
            }
            OutputRule::Flat { output_path } => {
                if entry.path().starts_with(output_path) {
                    return true;
                }
            }
        }
        entry.path() != root && self.is_ignored(root, entry.path(), true)
    }

    fn is_ignored(&self, root: &Path, path: &Path, is_dir: bool) -> bool {
        let rel = path.strip_prefix(root).unwrap_or(path);
        let mut candidate = rel.to_string_lossy().replace('\\', "/");
        if is_dir {
            candidate.push('/');
        }
        self.ignore.iter().any(|regex| regex.is_match(&candidate))
    }

    fn scan_file(&self, path: &Path, out: &mut ScanResult) {
        trace!(file = %path.display(), "parsing source file");
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                out.diagnostics.push(
                    Diagnostic::new(
                        DiagnosticKind::Io,
                        format!("failed to read source file: {}", e),
                    )
                    .with_file(path),
                );
                return;
            }
        };

        let syntax = match syn::parse_file(&content) {
            Ok(syntax) => syntax,
            Err(e) => {
                warn!(file = %path.display(), "file does not parse, skipping");
                out.diagnostics.push(
                    Diagnostic::new(
                        DiagnosticKind::ParseWarning,
                        format!("file does not parse and was skipped: {}", e),
                    )
                    .with_file(path),
                );
                return;
            }
        };

        for (order, item) in syntax.items.into_iter().enumerate() {
            match item {
                Item::Struct(item_struct) => {
                    if !self.has_marker(&item_struct.attrs) {
                        continue;
                    }
                    debug!(declaration = %item_struct.ident, "found marked struct");
                    match declaration_from_struct(&item_struct, path, order) {
                        Ok(declaration) => out.declarations.push(declaration),
                        Err(diagnostic) => out.diagnostics.push(diagnostic),
                    }
                }
                Item::Enum(item_enum) if self.has_marker(&item_enum.attrs) => {
                    out.diagnostics.push(
                        Diagnostic::new(
                            DiagnosticKind::ParseWarning,
                            "builder derivation supports structs with named fields only; \
                             enum declaration skipped",
                        )
                        .with_declaration(item_enum.ident.to_string())
                        .with_file(path),
                    );
                }
                _ => {}
            }
        }
    }

    fn has_marker(&self, attrs: &[Attribute]) -> bool {
        attrs.iter().any(|attr| {
            attr.path().is_ident("derive")
                && attr
                    .parse_args_with(Punctuated::<syn::Path, Token![,]>::parse_terminated)
                    .map(|paths| paths.iter().any(|p| self.is_marker_path(p)))
                    .unwrap_or(false)
        })
    }

    fn is_marker_path(&self, path: &syn::Path) -> bool {
        path.segments.last().is_some_and(|segment| {
            let ident = segment.ident.to_string();
            ident == MARKER_DERIVE || self.config.marker_aliases.iter().any(|a| *a == ident)
        })
    }
}

fn declaration_from_struct(
    item_struct: &ItemStruct,
    path: &Path,
    order: usize,
) -> std::result::Result<TypeDeclaration, Diagnostic> {
    let name = item_struct.ident.to_string();
    let skip = |message: String| {
        Diagnostic::new(DiagnosticKind::ParseWarning, message)
            .with_declaration(name.clone())
            .with_file(path)
    };

    if !item_struct.generics.params.is_empty() {
        return Err(skip(
            "builder derivation does not support generic declarations; skipped".to_string(),
        ));
    }

    let fields_named = match &item_struct.fields {
        syn::Fields::Named(fields_named) => fields_named,
        _ => {
            return Err(skip(
                "builder derivation supports structs with named fields only; skipped".to_string(),
            ));
        }
    };

    let directives = parse_directives(&item_struct.attrs)
        .map_err(|e| skip(format!("malformed buildable attribute: {}", e)))?;

    let mut fields = Vec::with_capacity(fields_named.named.len());
    for field in &fields_named.named {
        let field_name = field
            .ident
            .as_ref()
            .expect("named field without an identifier")
            .to_string();
        let field_name = field_name.trim_start_matches("r#").to_string();

        let default = parse_field_default(&field.attrs).map_err(|e| {
            skip(format!(
                "malformed buildable attribute on field `{}`: {}",
                field_name, e
            ))
        })?;

        let raw = normalize_type_text(&field.ty.to_token_stream().to_string());
        fields.push(RawField {
            name: field_name,
            ty: field.ty.clone(),
            raw,
            default,
        });
    }

    Ok(TypeDeclaration {
        name,
        file: path.to_path_buf(),
        line: item_struct.ident.span().start().line,
        order,
        fields,
        directives,
    })
}

fn parse_directives(attrs: &[Attribute]) -> syn::Result<Directives> {
    let mut directives = Directives::default();
    for attr in attrs {
        if !attr.path().is_ident("buildable") {
            continue;
        }
        let metas = attr.parse_args_with(Punctuated::<Meta, Token![,]>::parse_terminated)?;
        for meta in metas {
            match meta {
                Meta::NameValue(nv) if nv.path.is_ident("name") => {
                    if let Expr::Lit(ExprLit {
                        lit: Lit::Str(lit), ..
                    }) = &nv.value
                    {
                        let value = lit.value();
                        syn::parse_str::<syn::Ident>(&value).map_err(|_| {
                            syn::Error::new(
                                lit.span(),
                                format!("`{}` is not a valid builder type name", value),
                            )
                        })?;
                        directives.builder_name = Some(value);
                    } else {
                        return Err(syn::Error::new(
                            nv.value.span(),
                            "the `name` parameter must be a string literal.\n\n\
                             Example: #[buildable(name = \"CustomBuilder\")]",
                        ));
                    }
                }
                other => {
                    return Err(syn::Error::new(
                        other.span(),
                        "unknown parameter in buildable attribute.\n\n\
                         Valid declaration-level parameters are: name",
                    ));
                }
            }
        }
    }
    Ok(directives)
}

fn parse_field_default(attrs: &[Attribute]) -> syn::Result<Option<DefaultExpr>> {
    for attr in attrs {
        if !attr.path().is_ident("buildable") {
            continue;
        }
        let metas = attr.parse_args_with(Punctuated::<Meta, Token![,]>::parse_terminated)?;
        for meta in metas {
            match meta {
                Meta::Path(path) if path.is_ident("default") => {
                    return Ok(Some(DefaultExpr::Trait));
                }
                Meta::NameValue(nv) if nv.path.is_ident("default") => {
                    if let Expr::Lit(ExprLit {
                        lit: Lit::Str(lit), ..
                    }) = &nv.value
                    {
                        let value = lit.value();
                        syn::parse_str::<syn::Expr>(&value).map_err(|e| {
                            syn::Error::new(
                                lit.span(),
                                format!("`default` is not a valid expression: {}", e),
                            )
                        })?;
                        return Ok(Some(DefaultExpr::Expr(value)));
                    }
                    return Err(syn::Error::new(
                        nv.value.span(),
                        "the `default` parameter must be a string literal.\n\n\
                         Example: #[buildable(default = \"Vec::new()\")]",
                    ));
                }
                other => {
                    return Err(syn::Error::new(
                        other.span(),
                        "unknown parameter in buildable attribute.\n\n\
                         Valid field-level parameters are: default",
                    ));
                }
            }
        }
    }
    Ok(None)
}

/// Collapses the whitespace a token stream inserts into readable type text,
/// e.g. `Vec < String >` becomes `Vec<String>`.
pub(crate) fn normalize_type_text(text: &str) -> String {
    let mut out = text.split_whitespace().collect::<Vec<_>>().join(" ");
    for (from, to) in [
        (" ::", "::"),
        (":: ", "::"),
        (" <", "<"),
        ("< ", "<"),
        (" >", ">"),
        (" ,", ","),
        (", ", ","),
        ("& ", "&"),
        (" ;", ";"),
        ("; ", ";"),
        (" [", "["),
        ("[ ", "["),
        (" ]", "]"),
        ("( ", "("),
        (" )", ")"),
    ] {
        out = out.replace(from, to);
    }
    out.replace(',', ", ").replace(';', "; ")
}

/// Converts an ignore glob into an anchored regex. `**` crosses directory
/// separators, `*` and `?` do not.
pub(crate) fn glob_to_regex(glob: &str) -> std::result::Result<Regex, regex::Error> {
    let mut pattern = String::from("^");
    let mut chars = glob.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => {
                if chars.peek() == Some(&'*') {
                    chars.next();
                    if chars.peek() == Some(&'/') {
                        chars.next();
                        pattern.push_str("(?:.*/)?");
                    } else {
                        pattern.push_str(".*");
                    }
                } else {
                    pattern.push_str("[^/]*");
                }
            }
            '?' => pattern.push_str("[^/]"),
            '.' | '+' | '(' | ')' | '|' | '^' | '$' | '{' | '}' | '[' | ']' | '\\' => {
                pattern.push('\\');
                pattern.push(c);
            }
            _ => pattern.push(c),
        }
    }
    pattern.push('$');
    Regex::new(&pattern)
}
