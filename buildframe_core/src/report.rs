//! Diagnostics and the per-run generation report.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// How bad a diagnostic is. Fatal diagnostics halt the affected item only,
/// never the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    Warning,
    Fatal,
}

/// The diagnostic taxonomy of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DiagnosticKind {
    /// A declaration or field could not be parsed or classified.
    ParseWarning,
    /// A nested type reference could not be resolved; the field degraded to
    /// scalar treatment.
    ResolutionWarning,
    /// The same type name is declared in more than one scanned file.
    NameCollision,
    /// A planned output path is occupied by a file the pipeline does not own.
    OverwriteCollision,
    /// A read, write, or mkdir failed for a single file.
    Io,
}

impl DiagnosticKind {
    pub fn severity(&self) -> Severity {
        match self {
            DiagnosticKind::ParseWarning | DiagnosticKind::ResolutionWarning => Severity::Warning,
            DiagnosticKind::NameCollision
            | DiagnosticKind::OverwriteCollision
            | DiagnosticKind::Io => Severity::Fatal,
        }
    }
}

/// A single per-item diagnostic collected into the [`GenerationReport`].
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub declaration: Option<String>,
    pub file: Option<PathBuf>,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            declaration: None,
            file: None,
            message: message.into(),
        }
    }

    pub fn with_declaration(mut self, declaration: impl Into<String>) -> Self {
        self.declaration = Some(declaration.into());
        self
    }

    pub fn with_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn severity(&self) -> Severity {
        self.kind.severity()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.severity() {
            Severity::Warning => write!(f, "warning: ")?,
            Severity::Fatal => write!(f, "error: ")?,
        }
        write!(f, "{}", self.message)?;
        match (&self.declaration, &self.file) {
            (Some(decl), Some(file)) => write!(f, " ({} @ {})", decl, file.display()),
            (Some(decl), None) => write!(f, " ({})", decl),
            (None, Some(file)) => write!(f, " ({})", file.display()),
            (None, None) => Ok(()),
        }
    }
}

/// Disposition of a single output file within one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FileStatus {
    Written,
    Unchanged,
    Removed,
}

/// One output file touched (or deliberately left alone) by the run.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedFile {
    pub path: PathBuf,
    pub status: FileStatus,
}

/// Aggregate result of one `generate` invocation. Created fresh per run and
/// returned to the caller; never persisted.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerationReport {
    pub written: usize,
    pub unchanged: usize,
    pub removed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub files: Vec<GeneratedFile>,
    pub diagnostics: Vec<Diagnostic>,
}

impl GenerationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_written(&mut self, path: impl Into<PathBuf>) {
        self.written += 1;
        self.files.push(GeneratedFile {
            path: path.into(),
            status: FileStatus::Written,
        });
    }

    pub fn record_unchanged(&mut self, path: impl Into<PathBuf>) {
        self.unchanged += 1;
        self.files.push(GeneratedFile {
            path: path.into(),
            status: FileStatus::Unchanged,
        });
    }

    pub fn record_removed(&mut self, path: impl Into<PathBuf>) {
        self.removed += 1;
        self.files.push(GeneratedFile {
            path: path.into(),
            status: FileStatus::Removed,
        });
    }

    /// Records a warning that did not cost any output (a field degraded, a
    /// directive was ignored).
    pub fn warn(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Records a warning that skipped a declaration or file entirely.
    pub fn skip(&mut self, diagnostic: Diagnostic) {
        self.skipped += 1;
        self.diagnostics.push(diagnostic);
    }

    /// Records a fatal per-item diagnostic.
    pub fn fail(&mut self, diagnostic: Diagnostic) {
        self.failed += 1;
        self.diagnostics.push(diagnostic);
    }

    /// True when any diagnostic should make a strict caller exit non-zero.
    pub fn has_fatal(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity() == Severity::Fatal)
    }

    /// True when the run changed nothing on disk.
    pub fn is_noop(&self) -> bool {
        self.written == 0 && self.removed == 0
    }
}
