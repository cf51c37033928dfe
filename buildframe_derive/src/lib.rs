use proc_macro::TokenStream;
use syn::{Data, DeriveInput, Fields, parse_macro_input};

/// Opts a struct into builder generation by the buildframe pipeline.
///
/// The derive expands to nothing: generated builders are companion source
/// files produced by a separate `buildframe generate` run, not macro
/// output. The marker exists so annotated projects compile and so the
/// scanner can detect eligibility syntactically. It still validates
/// placement so misuse fails at compile time instead of being silently
/// skipped at generation time.
///
/// Declaration-level and field-level options go through the `buildable`
/// helper attribute:
///
/// ```rust,ignore
/// #[derive(Buildable)]
/// #[buildable(name = "ReportAssembler")]
/// pub struct Report {
///     pub title: String,
///     #[buildable(default = "Vec::new()")]
///     pub sections: Vec<String>,
/// }
/// ```
#[proc_macro_derive(Buildable, attributes(buildable))]
pub fn buildable_derive(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(_) => TokenStream::new(),
            _ => syn::Error::new(
                input.ident.span(),
                "Buildable can only be used on structs with named fields",
            )
            .to_compile_error()
            .into(),
        },
        _ => syn::Error::new(input.ident.span(), "Buildable can only be used on structs")
            .to_compile_error()
            .into(),
    }
}
