//! Output management: idempotent writes, ownership tracking through the
//! generated-file marker, and stale-file cleanup.

use crate::config::{BuildConfig, OutputRule};
use crate::emit::Rendered;
use crate::error::{BuildframeError, Result};
use crate::report::{Diagnostic, DiagnosticKind, GenerationReport};
use crate::scanner::glob_to_regex;
use regex::Regex;
use std::collections::HashSet;
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};
use walkdir::WalkDir;

/// Fixed prefix of the single-line ownership marker. Any file whose first
/// line starts with this is owned by the pipeline; nothing else is ever
/// deleted or overwritten.
pub const MARKER_PREFIX: &str = "// @generated generated-by:buildframe";

/// Full marker line for a generated file:
/// `// @generated generated-by:buildframe source:<name>@<file>`.
pub fn marker_line(type_name: &str, source_file: &Path) -> String {
    format!(
        "{} source:{}@{}",
        MARKER_PREFIX,
        type_name,
        display_path(source_file)
    )
}

/// Path text as written into markers: forward slashes on every platform so
/// regenerated files are byte-identical across machines.
pub fn display_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// True when the content's first line carries the ownership marker.
pub fn is_generated(content: &str) -> bool {
    content
        .lines()
        .next()
        .is_some_and(|line| line.starts_with(MARKER_PREFIX))
}

fn first_line(path: &Path) -> std::io::Result<String> {
    let file = fs::File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut line = String::new();
    reader.read_line(&mut line)?;
    Ok(line)
}

/// Collects every marker-owned file under the source roots (and the flat
/// output directory, when configured). An empty result is the normal
/// cold-start case after a housekeeping wipe.
pub fn collect_generated_files(config: &BuildConfig) -> Result<Vec<PathBuf>> {
    let mut ignore = Vec::with_capacity(config.ignore.len());
    for glob in &config.ignore {
        let regex = glob_to_regex(glob)
            .map_err(|e| BuildframeError::ignore_pattern(glob, e.to_string()))?;
        ignore.push(regex);
    }

    let mut roots: Vec<PathBuf> = config.source_roots.clone();
    if let OutputRule::Flat { output_path } = &config.output {
        roots.push(output_path.clone());
    }

    let mut found = Vec::new();
    for root in &roots {
        if !root.is_dir() {
            continue;
        }
        let walker = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                !(entry.file_type().is_dir()
                    && entry.path() != root.as_path()
                    && is_ignored_dir(root, entry.path(), &ignore))
            });
        for entry in walker.filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "rs") {
                continue;
            }
            match first_line(path) {
                Ok(line) if line.starts_with(MARKER_PREFIX) => {
                    trace!(file = %path.display(), "found generated file");
                    found.push(entry.into_path());
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(file = %path.display(), "could not read candidate file: {}", e);
                }
            }
        }
    }

    found.sort();
    found.dedup();
    debug!("tracking {} previously generated files", found.len());
    Ok(found)
}

fn is_ignored_dir(root: &Path, path: &Path, ignore: &[Regex]) -> bool {
    let rel = path.strip_prefix(root).unwrap_or(path);
    let mut candidate = rel.to_string_lossy().replace('\\', "/");
    candidate.push('/');
    ignore.iter().any(|regex| regex.is_match(&candidate))
}

/// Applies rendered files to disk and removes stale generated files.
///
/// Byte-identical content is skipped without touching the file. A planned
/// path occupied by a file without the marker is a fatal per-item
/// diagnostic; the file is left untouched. Stale paths are deleted only
/// after re-verifying they still carry the marker.
pub fn apply(rendered: &[Rendered], previously_generated: Vec<PathBuf>, report: &mut GenerationReport) {
    let current: HashSet<&Path> = rendered.iter().map(|r| r.path.as_path()).collect();

    for item in rendered {
        apply_one(item, report);
    }

    for stale in previously_generated {
        if current.contains(stale.as_path()) {
            continue;
        }
        remove_stale(&stale, report);
    }
}

fn apply_one(item: &Rendered, report: &mut GenerationReport) {
    match fs::read(&item.path) {
        Ok(existing) => {
            let existing_text = String::from_utf8_lossy(&existing);
            if !is_generated(&existing_text) {
                warn!(file = %item.path.display(), "would overwrite hand-written file");
                report.fail(
                    Diagnostic::new(
                        DiagnosticKind::OverwriteCollision,
                        "planned output path is occupied by a file without the generated \
                         marker; refusing to overwrite a hand-written file",
                    )
                    .with_file(&item.path),
                );
                return;
            }
            if blake3::hash(&existing) == blake3::hash(item.text.as_bytes()) {
                trace!(file = %item.path.display(), "content unchanged");
                report.record_unchanged(&item.path);
                return;
            }
            write_file(item, report);
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            if let Some(parent) = item.path.parent()
                && let Err(e) = fs::create_dir_all(parent)
            {
                report.fail(
                    Diagnostic::new(
                        DiagnosticKind::Io,
                        format!("failed to create output directory: {}", e),
                    )
                    .with_file(&item.path),
                );
                return;
            }
            write_file(item, report);
        }
        Err(e) => {
            report.fail(
                Diagnostic::new(
                    DiagnosticKind::Io,
                    format!("failed to read existing output file: {}", e),
                )
                .with_file(&item.path),
            );
        }
    }
}

fn write_file(item: &Rendered, report: &mut GenerationReport) {
    match fs::write(&item.path, &item.text) {
        Ok(()) => {
            debug!(file = %item.path.display(), "wrote generated file");
            report.record_written(&item.path);
        }
        Err(e) => {
            report.fail(
                Diagnostic::new(
                    DiagnosticKind::Io,
                    format!("failed to write generated file: {}", e),
                )
                .with_file(&item.path),
            );
        }
    }
}

fn remove_stale(path: &Path, report: &mut GenerationReport) {
    match fs::read_to_string(path) {
        Ok(content) if is_generated(&content) => match fs::remove_file(path) {
            Ok(()) => {
                debug!(file = %path.display(), "removed stale generated file");
                report.record_removed(path);
            }
            Err(e) => {
                report.fail(
                    Diagnostic::new(
                        DiagnosticKind::Io,
                        format!("failed to remove stale generated file: {}", e),
                    )
                    .with_file(path),
                );
            }
        },
        // The file changed hands since it was collected; leave it alone.
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            report.fail(
                Diagnostic::new(
                    DiagnosticKind::Io,
                    format!("failed to read stale candidate: {}", e),
                )
                .with_file(path),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn rendered(path: PathBuf, type_name: &str) -> Rendered {
        let text = format!(
            "{}\npub struct {}Builder {{}}\n",
            marker_line(type_name, Path::new("src/models.rs")),
            type_name
        );
        Rendered { path, text }
    }

    #[test]
    fn test_marker_line_format() {
        assert_eq!(
            marker_line("User", Path::new("src/models.rs")),
            "// @generated generated-by:buildframe source:User@src/models.rs"
        );
    }

    #[test]
    fn test_is_generated() {
        assert!(is_generated(
            "// @generated generated-by:buildframe source:User@src/models.rs\n"
        ));
        assert!(!is_generated("// hand written\n"));
        assert!(!is_generated(""));
    }

    #[test]
    fn test_apply_writes_then_skips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("generated/user_builder.rs");
        let item = rendered(path.clone(), "User");

        let mut report = GenerationReport::new();
        apply(std::slice::from_ref(&item), Vec::new(), &mut report);
        assert_eq!(report.written, 1);
        assert_eq!(report.unchanged, 0);
        assert!(path.exists());

        let mut second = GenerationReport::new();
        apply(std::slice::from_ref(&item), vec![path.clone()], &mut second);
        assert_eq!(second.written, 0);
        assert_eq!(second.unchanged, 1);
        assert_eq!(second.removed, 0);
    }

    #[test]
    fn test_apply_refuses_to_overwrite_hand_written_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("user_builder.rs");
        fs::write(&path, "pub struct HandWritten;\n").unwrap();

        let item = rendered(path.clone(), "User");
        let mut report = GenerationReport::new();
        apply(std::slice::from_ref(&item), Vec::new(), &mut report);

        assert_eq!(report.written, 0);
        assert_eq!(report.failed, 1);
        assert!(report.has_fatal());
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "pub struct HandWritten;\n"
        );
    }

    #[test]
    fn test_stale_marker_file_is_removed() {
        let dir = TempDir::new().unwrap();
        let stale = dir.path().join("old_builder.rs");
        fs::write(
            &stale,
            format!("{}\npub struct OldBuilder {{}}\n", marker_line("Old", Path::new("src/old.rs"))),
        )
        .unwrap();
        let hand = dir.path().join("keep.rs");
        fs::write(&hand, "pub struct Keep;\n").unwrap();

        let mut report = GenerationReport::new();
        apply(&[], vec![stale.clone(), hand.clone()], &mut report);

        assert_eq!(report.removed, 1);
        assert!(!stale.exists());
        // Files without the marker are never deleted, even if tracked.
        assert!(hand.exists());
    }

    #[test]
    fn test_collect_generated_files() {
        let dir = TempDir::new().unwrap();
        let gen_dir = dir.path().join("src/generated");
        fs::create_dir_all(&gen_dir).unwrap();
        let owned = gen_dir.join("user_builder.rs");
        fs::write(
            &owned,
            format!("{}\n", marker_line("User", Path::new("src/models.rs"))),
        )
        .unwrap();
        fs::write(dir.path().join("src/models.rs"), "pub struct User;\n").unwrap();

        let config = crate::config::BuildConfig::builder()
            .source_root(dir.path().join("src"))
            .build();
        let found = collect_generated_files(&config).unwrap();
        assert_eq!(found, vec![owned]);
    }
}
