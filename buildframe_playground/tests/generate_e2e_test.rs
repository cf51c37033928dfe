//! End-to-end tests for the derivation pipeline.
//!
//! Each test builds a throwaway source tree, runs the pipeline against it,
//! and inspects the report and the emitted files.

use buildframe_core::{BuildConfig, generate};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const USER_MODELS: &str = r#"
#[derive(Buildable)]
pub struct User {
    pub name: String,
    pub age: Option<i64>,
    pub tags: Vec<String>,
}
"#;

fn write(root: &Path, rel: &str, content: &str) -> PathBuf {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, content).unwrap();
    path
}

fn config_for(src: &Path) -> BuildConfig {
    BuildConfig::builder().source_root(src).build()
}

#[test]
fn scenario_user_builder() {
    let dir = TempDir::new().unwrap();
    let src = dir.path().join("src");
    write(&src, "models.rs", USER_MODELS);

    let report = generate(config_for(&src)).unwrap();
    assert_eq!(report.written, 1);
    assert_eq!(report.failed, 0);

    let text = fs::read_to_string(src.join("generated/user_builder.rs")).unwrap();
    let first_line = text.lines().next().unwrap();
    assert!(
        first_line.starts_with("// @generated generated-by:buildframe source:User@"),
        "missing or malformed marker: {first_line}"
    );

    // Setters for the scenario shape.
    assert!(text.contains("pub fn name(mut self, value: String) -> Self {"));
    assert!(text.contains("pub fn age(mut self, value: i64) -> Self {"));
    assert!(text.contains("pub fn add_tag(mut self, value: String) -> Self {"));
    assert!(text.contains("pub fn tags(mut self, values: Vec<String>) -> Self {"));

    // Only `name` is enforced at build time.
    assert!(text.contains("name: self.name.ok_or(UserBuilderError::MissingField(\"name\"))?,"));
    assert!(text.contains("age: self.age,"));
    assert!(text.contains("tags: self.tags,"));
}

#[test]
fn second_run_is_a_noop() {
    let dir = TempDir::new().unwrap();
    let src = dir.path().join("src");
    write(&src, "models.rs", USER_MODELS);
    let config = config_for(&src);

    let first = generate(config.clone()).unwrap();
    assert_eq!(first.written, 1);
    let bytes_after_first = fs::read(src.join("generated/user_builder.rs")).unwrap();

    let second = generate(config).unwrap();
    assert!(second.is_noop());
    assert_eq!(second.written, 0);
    assert_eq!(second.removed, 0);
    assert_eq!(second.unchanged, 1);

    let bytes_after_second = fs::read(src.join("generated/user_builder.rs")).unwrap();
    assert_eq!(bytes_after_first, bytes_after_second);
}

#[test]
fn regeneration_after_clean_is_byte_identical() {
    let dir = TempDir::new().unwrap();
    let src = dir.path().join("src");
    write(&src, "models.rs", USER_MODELS);
    let config = config_for(&src);

    generate(config.clone()).unwrap();
    let first = fs::read(src.join("generated/user_builder.rs")).unwrap();

    // A housekeeping wipe between runs is the normal cold-start case.
    fs::remove_dir_all(src.join("generated")).unwrap();
    let report = generate(config).unwrap();
    assert_eq!(report.written, 1);

    let second = fs::read(src.join("generated/user_builder.rs")).unwrap();
    assert_eq!(first, second);
}

#[test]
fn stale_builder_is_removed_when_declaration_disappears() {
    let dir = TempDir::new().unwrap();
    let src = dir.path().join("src");
    write(&src, "user.rs", USER_MODELS);
    write(
        &src,
        "widget.rs",
        r#"
#[derive(Buildable)]
pub struct Widget {
    pub label: String,
}
"#,
    );
    let config = config_for(&src);

    let first = generate(config.clone()).unwrap();
    assert_eq!(first.written, 2);
    let user_builder = src.join("generated/user_builder.rs");
    let widget_builder = src.join("generated/widget_builder.rs");
    assert!(user_builder.exists());
    assert!(widget_builder.exists());

    fs::remove_file(src.join("widget.rs")).unwrap();
    let second = generate(config).unwrap();

    // Exactly the orphaned file goes, nothing else.
    assert_eq!(second.removed, 1);
    assert_eq!(second.unchanged, 1);
    assert!(user_builder.exists());
    assert!(!widget_builder.exists());
}

#[test]
fn hand_written_file_is_never_overwritten() {
    let dir = TempDir::new().unwrap();
    let src = dir.path().join("src");
    write(&src, "models.rs", USER_MODELS);
    let hand_written = "// my precious hand-rolled builder\npub struct UserBuilder;\n";
    write(&src, "generated/user_builder.rs", hand_written);

    let report = generate(config_for(&src)).unwrap();

    assert_eq!(report.written, 0);
    assert_eq!(report.failed, 1);
    assert!(report.has_fatal());
    assert_eq!(
        fs::read_to_string(src.join("generated/user_builder.rs")).unwrap(),
        hand_written
    );
}

#[test]
fn field_order_is_preserved() {
    let dir = TempDir::new().unwrap();
    let src = dir.path().join("src");
    write(
        &src,
        "models.rs",
        r#"
#[derive(Buildable)]
pub struct Ordered {
    pub zebra: String,
    pub apple: String,
    pub mango: String,
}
"#,
    );

    generate(config_for(&src)).unwrap();
    let text = fs::read_to_string(src.join("generated/ordered_builder.rs")).unwrap();
    let zebra = text.find("pub fn zebra(").unwrap();
    let apple = text.find("pub fn apple(").unwrap();
    let mango = text.find("pub fn mango(").unwrap();
    assert!(zebra < apple && apple < mango, "setters were reordered");
}

#[test]
fn cyclic_declaration_generates_a_finite_builder() {
    let dir = TempDir::new().unwrap();
    let src = dir.path().join("src");
    write(
        &src,
        "models.rs",
        r#"
#[derive(Buildable)]
pub struct Node {
    pub label: String,
    pub next: Option<Box<Node>>,
}
"#,
    );

    let report = generate(config_for(&src)).unwrap();
    assert_eq!(report.written, 1);
    assert_eq!(report.failed, 0);

    let text = fs::read_to_string(src.join("generated/node_builder.rs")).unwrap();
    // The recursive field must be supplied explicitly: a plain value
    // setter, no configurator, no nested-builder expansion.
    assert!(text.contains("pub fn next(mut self, value: Node) -> Self {"));
    assert!(!text.contains("next_with"));
    assert!(!text.contains("Pending(NodeBuilder)"));
    assert!(text.contains("next: self.next.map(Box::new),"));
}

#[test]
fn nested_composition_references_sibling_builder() {
    let dir = TempDir::new().unwrap();
    let src = dir.path().join("src");
    write(
        &src,
        "models.rs",
        r#"
#[derive(Buildable)]
pub struct Profile {
    pub display_name: String,
}

#[derive(Buildable)]
pub struct Author {
    pub handle: String,
    pub profile: Profile,
}
"#,
    );

    let report = generate(config_for(&src)).unwrap();
    assert_eq!(report.written, 2);

    let text = fs::read_to_string(src.join("generated/author_builder.rs")).unwrap();
    assert!(text.contains("pub fn profile(mut self, value: Profile) -> Self {"));
    assert!(text.contains("pub fn profile_with("));
    assert!(text.contains("configure: impl FnOnce(ProfileBuilder) -> ProfileBuilder,"));
    assert!(
        text.contains("profile: match self.profile {"),
        "nested finalize must resolve the pending state"
    );
}

#[test]
fn duplicate_type_names_halt_that_name_only() {
    let dir = TempDir::new().unwrap();
    let src = dir.path().join("src");
    write(
        &src,
        "a.rs",
        r#"
#[derive(Buildable)]
pub struct User {
    pub name: String,
}
"#,
    );
    write(
        &src,
        "b.rs",
        r#"
#[derive(Buildable)]
pub struct User {
    pub email: String,
}

#[derive(Buildable)]
pub struct Widget {
    pub label: String,
}
"#,
    );

    let report = generate(config_for(&src)).unwrap();
    assert_eq!(report.failed, 2);
    assert_eq!(report.written, 1);
    assert!(!src.join("generated/user_builder.rs").exists());
    assert!(src.join("generated/widget_builder.rs").exists());
}

#[test]
fn flat_output_mode_collects_all_builders() {
    let dir = TempDir::new().unwrap();
    let src = dir.path().join("src");
    write(&src, "deep/nested/models.rs", USER_MODELS);
    write(
        &src,
        "widget.rs",
        r#"
#[derive(Buildable)]
pub struct Widget {
    pub label: String,
}
"#,
    );

    let out = dir.path().join("out/builders");
    let config = BuildConfig::builder().source_root(&src).flat(&out).build();

    // Cold start: the flat output directory does not exist yet.
    let report = generate(config).unwrap();
    assert_eq!(report.written, 2);
    assert!(out.join("user_builder.rs").exists());
    assert!(out.join("widget_builder.rs").exists());
}

#[test]
fn directives_shape_the_emitted_builder() {
    let dir = TempDir::new().unwrap();
    let src = dir.path().join("src");
    write(
        &src,
        "models.rs",
        r#"
#[derive(Buildable)]
#[buildable(name = "ReportAssembler")]
pub struct Report {
    #[buildable(default = "String::from(\"untitled\")")]
    pub title: String,
    pub author: String,
}
"#,
    );

    generate(config_for(&src)).unwrap();
    let text = fs::read_to_string(src.join("generated/report_builder.rs")).unwrap();
    assert!(text.contains("pub struct ReportAssembler {"));
    assert!(text.contains("pub enum ReportAssemblerError {"));
    assert!(text.contains("title: self.title.unwrap_or_else(|| String::from(\"untitled\")),"));
    assert!(
        text.contains("author: self.author.ok_or(ReportAssemblerError::MissingField(\"author\"))?,")
    );
}
