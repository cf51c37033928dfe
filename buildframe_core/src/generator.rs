//! Pipeline orchestration: scan, model, plan, render, apply.

use crate::config::BuildConfig;
use crate::emit::{Rendered, render};
use crate::error::Result;
use crate::model::build_models;
use crate::output;
use crate::plan::plan_builders;
use crate::report::{GenerationReport, Severity};
use crate::scanner::Scanner;
use tracing::{debug, info};

/// One full batch run over the configured source roots.
pub struct Generator {
    config: BuildConfig,
}

impl Generator {
    pub fn new(config: BuildConfig) -> Self {
        Self { config }
    }

    /// Runs the whole pipeline and returns the aggregate report.
    ///
    /// Per-item problems land in the report as diagnostics; only a
    /// structural impossibility for the whole run (an unreadable source
    /// root, an invalid ignore pattern) returns `Err`.
    pub fn generate(&self) -> Result<GenerationReport> {
        info!("starting builder generation");
        let mut report = GenerationReport::new();

        let scanner = Scanner::new(&self.config)?;
        let scan = scanner.scan()?;
        info!("found {} eligible declarations", scan.declarations.len());
        for diagnostic in scan.diagnostics {
            match diagnostic.severity() {
                Severity::Fatal => report.fail(diagnostic),
                Severity::Warning => report.skip(diagnostic),
            }
        }

        let models = build_models(scan.declarations);
        for diagnostic in models.diagnostics {
            match diagnostic.severity() {
                Severity::Fatal => report.fail(diagnostic),
                Severity::Warning => report.warn(diagnostic),
            }
        }

        let plans = plan_builders(&models.models, &self.config);
        for diagnostic in plans.diagnostics {
            report.warn(diagnostic);
        }
        debug!("planned {} builders", plans.plans.len());

        let mut rendered: Vec<Rendered> = plans.plans.iter().map(render).collect();
        // Write order is sorted here, never inherited from processing order.
        rendered.sort_by(|a, b| a.path.cmp(&b.path));

        let previously_generated = output::collect_generated_files(&self.config)?;
        output::apply(&rendered, previously_generated, &mut report);

        info!(
            written = report.written,
            unchanged = report.unchanged,
            removed = report.removed,
            skipped = report.skipped,
            failed = report.failed,
            "generation complete"
        );
        Ok(report)
    }
}

/// Convenience entry point: runs one generation batch with the given
/// configuration.
pub fn generate(config: BuildConfig) -> Result<GenerationReport> {
    Generator::new(config).generate()
}
