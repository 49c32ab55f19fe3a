// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::card::{Card, Metadata};
use crate::error::{FailureKind, FetchError, TaskError, WriteError};
use crate::filename::card_file_name;
use crate::progress::{ProgressEvent, SharedProgressReporter};
use crate::source::{FetchTask, Router};
use crate::tokens::{NameTemplate, compile_name_format};

/// Suffix for files being written; renamed into place once complete
const PARTIAL_SUFFIX: &str = ".partial";

/// A URL that was attempted and did not produce a card file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedFetch {
    pub url: String,
    pub kind: FailureKind,
    pub error: String,
}

/// Outcome of a fetch batch.
///
/// Every input URL lands in exactly one bucket, and each bucket keeps the
/// input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchReport {
    /// Number of input URLs
    pub total: usize,
    pub succeeded: Vec<String>,
    pub failed: Vec<FailedFetch>,
    pub invalid: Vec<String>,
}

impl FetchReport {
    pub fn failed_urls(&self) -> impl Iterator<Item = &str> {
        self.failed.iter().map(|f| f.url.as_str())
    }

    /// Every attempted URL failed and nothing was written
    pub fn all_failed(&self) -> bool {
        self.succeeded.is_empty() && !self.failed.is_empty()
    }
}

/// A validated fetch batch configuration
#[derive(Debug)]
pub struct FetchJob {
    output_dir: PathBuf,
    template: NameTemplate,
}

impl FetchJob {
    /// Resolve the output directory and compile the name format.
    ///
    /// A missing or blank directory means the current working directory; a
    /// missing or blank format means the default format. Both checks happen
    /// before any URL is looked at.
    pub fn prepare(
        output_dir: Option<&Path>,
        name_format: Option<&str>,
    ) -> Result<Self, FetchError> {
        let output_dir = match output_dir {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => std::env::current_dir().map_err(FetchError::CurrentDir)?,
        };
        if !output_dir.is_dir() {
            return Err(FetchError::OutputDirNotFound(output_dir));
        }

        let template = compile_name_format(name_format)?;

        Ok(Self {
            output_dir,
            template,
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Output path for a card with this metadata
    pub fn output_path(&self, metadata: &Metadata) -> PathBuf {
        self.output_dir
            .join(card_file_name(&self.template.execute(metadata)))
    }

    /// Classify the URLs and run every valid task in input order.
    ///
    /// Per-URL failures never abort the batch.
    pub async fn run<S: AsRef<str>>(
        &self,
        router: &Router,
        urls: &[S],
        reporter: SharedProgressReporter,
    ) -> FetchReport {
        let classification = router.classify(urls);
        let total_tasks = classification.tasks.len();

        reporter.report(ProgressEvent::UrlsClassified {
            total: urls.len(),
            valid: total_tasks,
            invalid: classification.invalid.len(),
        });

        let mut report = FetchReport {
            total: urls.len(),
            invalid: classification.invalid,
            ..Default::default()
        };
        // Output path -> URL that wrote it during this run
        let mut written: HashMap<PathBuf, String> = HashMap::new();

        for (task_index, task) in classification.tasks.iter().enumerate() {
            let url = task.original_url().to_string();
            reporter.report(ProgressEvent::FetchStarting {
                url: url.clone(),
                task_index,
                total_tasks,
            });

            match self.run_task(task).await {
                Ok(path) => {
                    if let Some(previous) = written.insert(path.clone(), url.clone()) {
                        tracing::warn!(
                            path = %path.display(),
                            previous = %previous,
                            url = %url,
                            "Output file overwritten by a later card in the same run"
                        );
                    }
                    tracing::info!(url = %url, path = %path.display(), "Card saved");
                    reporter.report(ProgressEvent::FetchSucceeded {
                        url: url.clone(),
                        path,
                    });
                    report.succeeded.push(url);
                }
                Err(e) => {
                    let kind = e.kind();
                    tracing::warn!(url = %url, %kind, error = %e, "Fetch failed");
                    reporter.report(ProgressEvent::FetchFailed {
                        url: url.clone(),
                        kind,
                        error: e.to_string(),
                    });
                    report.failed.push(FailedFetch {
                        url,
                        kind,
                        error: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            total = report.total,
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            invalid = report.invalid.len(),
            "Batch complete"
        );
        reporter.report(ProgressEvent::BatchCompleted {
            succeeded: report.succeeded.len(),
            failed: report.failed.len(),
            invalid: report.invalid.len(),
        });

        report
    }

    /// Fetch, verify and write one card; returns the written path
    async fn run_task(&self, task: &FetchTask) -> Result<PathBuf, TaskError> {
        tracing::debug!(url = task.original_url(), source = %task.source_id(), "Running task");
        let (metadata, card) = task.fetch_all().await?;

        verify(&metadata, &card)?;

        let bytes = card.encode().map_err(WriteError::Encode)?;
        let path = self.output_path(&metadata);
        write_atomically(&path, &bytes).await?;
        Ok(path)
    }
}

/// Check the card document on its own and against the platform metadata
fn verify(metadata: &Metadata, card: &Card) -> Result<(), TaskError> {
    let sheet = card.validate()?;
    metadata.check_consistency(sheet)?;
    Ok(())
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(PARTIAL_SUFFIX);
    PathBuf::from(name)
}

/// Write to a `.partial` sibling and rename into place. The partial file is
/// removed if anything fails.
async fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), WriteError> {
    let partial = partial_path(path);

    let result = async {
        tokio::fs::write(&partial, bytes).await?;
        tokio::fs::rename(&partial, path).await
    }
    .await;

    if let Err(e) = result {
        let _ = tokio::fs::remove_file(&partial).await;
        return Err(WriteError::FileWriteFailed {
            path: path.to_path_buf(),
            source: e,
        });
    }
    Ok(())
}
