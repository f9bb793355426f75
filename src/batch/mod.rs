//! Batch orchestration over many documents.
//!
//! Inputs are named byte buffers. Zip containers among them are expanded
//! exactly one level deep: each `.pptx` entry becomes its own job named
//! `container.zip/entry.pptx`. Duplicate names get a numeric suffix before
//! anything is scheduled, so results and archive entries stay unambiguous.
//! Containers that cannot be opened, or that hold no presentations, turn
//! into failed results without touching the rest of the batch.

use crate::common::{Diagnostics, Error, ProcessingResult, Result};
use crate::config::InversionConfig;
use crate::pool::{Job, WorkerBackend, WorkerPool};
use std::collections::HashSet;
use std::io::{Cursor, Read, Write};
use zip::write::SimpleFileOptions;

/// Default size of the worker pool.
pub const DEFAULT_MAX_WORKERS: usize = 2;

/// One input to a batch: a document or a zip container of documents.
#[derive(Debug, Clone)]
pub struct InputDocument {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl InputDocument {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

/// Pool sizing and execution backend for a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    pub backend: WorkerBackend,
    pub max_workers: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            backend: WorkerBackend::default(),
            max_workers: DEFAULT_MAX_WORKERS,
        }
    }
}

impl BatchOptions {
    fn validate(&self) -> Result<()> {
        if self.max_workers == 0 {
            return Err(Error::Config("max_workers must be at least 1".into()));
        }
        Ok(())
    }
}

/// Contrast advisories for a configuration. Poor contrast never blocks
/// processing; the warnings are surfaced once per batch.
pub fn validate_config(config: &InversionConfig) -> Vec<String> {
    config.contrast_warnings()
}

/// Process a single document outside any pool. Fails only on an invalid
/// configuration; document problems land in the returned result.
pub fn process_one(
    name: &str,
    bytes: &[u8],
    config: &InversionConfig,
) -> Result<ProcessingResult> {
    config.validate()?;
    Ok(crate::pool::protocol::process_job(config, name, bytes))
}

/// Everything a finished batch produced.
#[derive(Debug)]
pub struct BatchOutcome {
    /// One result per scheduled document, in completion order, after any
    /// failures produced during input expansion.
    pub results: Vec<ProcessingResult>,
    /// Zip archive of the successful outputs, `None` if nothing succeeded.
    pub archive: Option<Vec<u8>>,
    /// Contrast advisories for the configuration used.
    pub config_warnings: Vec<String>,
}

impl BatchOutcome {
    pub fn successful(&self) -> impl Iterator<Item = &ProcessingResult> {
        self.results.iter().filter(|r| r.succeeded)
    }

    pub fn failed(&self) -> impl Iterator<Item = &ProcessingResult> {
        self.results.iter().filter(|r| !r.succeeded)
    }

    /// Every warning in the batch, paired with the name of the document
    /// that produced it. For summary rendering.
    pub fn warnings(&self) -> impl Iterator<Item = (&str, &str)> {
        self.results.iter().flat_map(|r| {
            r.warnings.iter().map(move |w| (r.name.as_str(), w.as_str()))
        })
    }
}

/// Results as they finish. Expansion failures come first, then pool
/// results in completion order.
pub struct BatchStream {
    ready: std::vec::IntoIter<ProcessingResult>,
    pool: WorkerPool,
    config_warnings: Vec<String>,
}

impl BatchStream {
    pub fn config_warnings(&self) -> &[String] {
        &self.config_warnings
    }
}

impl Iterator for BatchStream {
    type Item = ProcessingResult;

    fn next(&mut self) -> Option<Self::Item> {
        self.ready.next().or_else(|| self.pool.next_result())
    }
}

/// Run a batch and collect everything, including the output archive.
pub fn process_batch(
    docs: Vec<InputDocument>,
    config: &InversionConfig,
    options: &BatchOptions,
) -> Result<BatchOutcome> {
    let mut stream = process_batch_streaming(docs, config, options)?;
    let config_warnings = stream.config_warnings().to_vec();
    let mut results = Vec::new();
    for result in stream.by_ref() {
        results.push(result);
    }
    let archive = build_archive(&results)?;
    Ok(BatchOutcome {
        results,
        archive,
        config_warnings,
    })
}

/// Run a batch, yielding results as workers finish them.
pub fn process_batch_streaming(
    docs: Vec<InputDocument>,
    config: &InversionConfig,
    options: &BatchOptions,
) -> Result<BatchStream> {
    config.validate()?;
    options.validate()?;
    let config_warnings = validate_config(config);

    let (jobs, early_failures) = expand_inputs(docs);
    tracing::debug!(
        jobs = jobs.len(),
        rejected = early_failures.len(),
        "batch inputs expanded"
    );
    let pool = WorkerPool::start(jobs, config, options.backend, options.max_workers)?;
    Ok(BatchStream {
        ready: early_failures.into_iter(),
        pool,
        config_warnings,
    })
}

/// Expand zip containers one level and give every job a unique name.
fn expand_inputs(docs: Vec<InputDocument>) -> (Vec<Job>, Vec<ProcessingResult>) {
    let mut jobs = Vec::with_capacity(docs.len());
    let mut failures = Vec::new();
    for doc in docs {
        if doc.name.to_ascii_lowercase().ends_with(".zip") {
            expand_container(doc, &mut jobs, &mut failures);
        } else {
            jobs.push(Job {
                name: doc.name,
                bytes: doc.bytes,
            });
        }
    }
    disambiguate(&mut jobs);
    (jobs, failures)
}

fn expand_container(
    doc: InputDocument,
    jobs: &mut Vec<Job>,
    failures: &mut Vec<ProcessingResult>,
) {
    let mut archive = match zip::ZipArchive::new(Cursor::new(doc.bytes.as_slice())) {
        Ok(archive) => archive,
        Err(err) => {
            failures.push(ProcessingResult::failure(
                &doc.name,
                Diagnostics::new(),
                format!("container could not be opened: {err}"),
            ));
            return;
        }
    };
    let mut found = 0usize;
    let mut unreadable = 0usize;
    for i in 0..archive.len() {
        let mut file = match archive.by_index(i) {
            Ok(file) => file,
            Err(err) => {
                unreadable += 1;
                failures.push(ProcessingResult::failure(
                    format!("{}/#{i}", doc.name),
                    Diagnostics::new(),
                    format!("container entry unreadable: {err}"),
                ));
                continue;
            }
        };
        if file.is_dir() || file.name().starts_with("__MACOSX/") {
            continue;
        }
        if !file.name().to_ascii_lowercase().ends_with(".pptx") {
            continue;
        }
        let entry_name = format!("{}/{}", doc.name, file.name());
        let mut bytes = Vec::with_capacity(file.size() as usize);
        match file.read_to_end(&mut bytes) {
            Ok(_) => {
                found += 1;
                jobs.push(Job {
                    name: entry_name,
                    bytes,
                });
            }
            Err(err) => {
                unreadable += 1;
                failures.push(ProcessingResult::failure(
                    entry_name,
                    Diagnostics::new(),
                    format!("container entry unreadable: {err}"),
                ));
            }
        }
    }
    if found == 0 && unreadable == 0 {
        failures.push(ProcessingResult::failure(
            &doc.name,
            Diagnostics::new(),
            "container holds no .pptx documents",
        ));
    }
}

/// Append ` (2)`, ` (3)`, ... before the extension until every job name is
/// unique, in input order.
fn disambiguate(jobs: &mut [Job]) {
    let mut used: HashSet<String> = HashSet::new();
    for job in jobs {
        if used.insert(job.name.clone()) {
            continue;
        }
        let mut n = 2;
        loop {
            let candidate = numbered(&job.name, n);
            if used.insert(candidate.clone()) {
                job.name = candidate;
                break;
            }
            n += 1;
        }
    }
}

fn numbered(name: &str, n: usize) -> String {
    let slash = name.rfind('/').map_or(0, |i| i + 1);
    match name[slash..].rfind('.') {
        Some(dot) if dot > 0 => {
            format!("{} ({n}){}", &name[..slash + dot], &name[slash + dot..])
        }
        _ => format!("{name} ({n})"),
    }
}

/// Zip up the successful outputs under their result names.
fn build_archive(results: &[ProcessingResult]) -> Result<Option<Vec<u8>>> {
    if !results.iter().any(|r| r.succeeded) {
        return Ok(None);
    }
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    for result in results {
        let Some(output) = result.output.as_deref().filter(|_| result.succeeded) else {
            continue;
        };
        writer.start_file(result.name.clone(), options)?;
        writer.write_all(output)?;
    }
    let cursor = writer.finish()?;
    Ok(Some(cursor.into_inner()))
}
