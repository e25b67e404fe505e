//! `splitpack transform` command implementation.
//!
//! Runs the transform stage over the given files and prints the rewritten
//! code, or one JSON document describing every file.

use miette::{miette, IntoDiagnostic, LabeledSpan, NamedSource, Report, Result};
use serde::Serialize;
use splitpack_core::{
    resolve_config, ChunkDescriptor, DependencyRequest, Error, IdAllocator, ImportResolver,
    ModuleRegistry, SequentialIds, SourceFile, TransformConfig, TransformError, TransformResult,
    Transformer,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Code for files that could not be read.
const FILE_READ_ERROR: &str = "FILE_READ_ERROR";

/// Transform command action.
#[derive(Debug, Clone)]
pub struct TransformAction {
    /// Files to transform (relative paths are taken from `cwd`).
    pub files: Vec<PathBuf>,
    /// Working directory.
    pub cwd: PathBuf,
    /// Explicit config file.
    pub config: Option<PathBuf>,
    /// `NAME=EXPR` defines, applied over the config file's.
    pub define: Vec<String>,
    /// Reject relative requests that do not exist on disk.
    pub check_exists: bool,
    /// Allow source maps (the config can still turn them off).
    pub source_maps: bool,
}

/// JSON output for the transform command.
#[derive(Serialize)]
struct TransformOutputJson {
    ok: bool,
    files: Vec<FileResultJson>,
    skipped: Vec<String>,
    duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorJson>,
}

#[derive(Serialize)]
struct FileResultJson {
    path: String,
    ok: bool,
    imports: Vec<DependencyRequest>,
    chunks: Vec<ChunkDescriptor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    contents: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    source_map: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorJson>,
}

#[derive(Serialize)]
struct ErrorJson {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    line: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    column: Option<u32>,
}

/// Why one file has no output.
enum Failure {
    Read(std::io::Error),
    Transform(TransformError),
}

impl Failure {
    fn to_json(&self) -> ErrorJson {
        match self {
            Self::Read(e) => ErrorJson {
                code: FILE_READ_ERROR.to_string(),
                message: e.to_string(),
                line: None,
                column: None,
            },
            Self::Transform(e) => {
                let location = e.location();
                ErrorJson {
                    code: e.code().to_string(),
                    message: e.message().to_string(),
                    line: location.map(|(line, _)| line),
                    column: location.map(|(_, column)| column),
                }
            }
        }
    }

    fn report(&self, path: &Path) -> Report {
        match self {
            Self::Read(e) => miette!(
                code = FILE_READ_ERROR,
                "Failed to read {}: {}",
                path.display(),
                e
            ),
            Self::Transform(TransformError::Located(d)) => {
                let labels: Vec<LabeledSpan> = byte_offset(&d.contents, d.line, d.column)
                    .map(|offset| LabeledSpan::at_offset(offset, "here"))
                    .into_iter()
                    .collect();
                miette!(code = d.code, labels = labels, "{}", d.message).with_source_code(
                    NamedSource::new(d.file.display().to_string(), d.contents.clone()),
                )
            }
            Self::Transform(TransformError::File(d)) => {
                miette!(code = d.code, "{}: {}", d.file.display(), d.message)
            }
        }
    }
}

/// Outcome for one input file.
struct FileReport {
    path: PathBuf,
    outcome: std::result::Result<TransformResult, Failure>,
}

impl FileReport {
    fn to_json(&self) -> FileResultJson {
        let path = self.path.display().to_string();
        match &self.outcome {
            Ok(result) => FileResultJson {
                path,
                ok: true,
                imports: result.imports.clone(),
                chunks: result.chunks.clone(),
                contents: Some(result.contents.clone()),
                source_map: result.source_map.clone(),
                error: None,
            },
            Err(failure) => FileResultJson {
                path,
                ok: false,
                imports: Vec::new(),
                chunks: Vec::new(),
                contents: None,
                source_map: None,
                error: Some(failure.to_json()),
            },
        }
    }
}

/// Run the transform command.
pub fn run(action: TransformAction, json: bool) -> Result<()> {
    let start = Instant::now();

    let (config, transformer) = match setup(&action) {
        Ok(ready) => ready,
        Err(e) => {
            if json {
                let out = TransformOutputJson {
                    ok: false,
                    files: Vec::new(),
                    skipped: Vec::new(),
                    duration_ms: elapsed_ms(start),
                    error: Some(ErrorJson {
                        code: setup_error_code(&e).to_string(),
                        message: e.to_string(),
                        line: None,
                        column: None,
                    }),
                };
                println!("{}", serde_json::to_string(&out).into_diagnostic()?);
                std::process::exit(1);
            }
            return Err(miette!(code = setup_error_code(&e), "{}", e));
        }
    };

    let (eligible, skipped): (Vec<PathBuf>, Vec<PathBuf>) = action
        .files
        .iter()
        .map(|file| absolutize(file, &action.cwd))
        .partition(|path| config.is_eligible(path));
    for path in &skipped {
        debug!(path = %path.display(), "skipping file with ineligible extension");
    }

    let reports = transform_files(&transformer, eligible);
    let failed = reports.iter().filter(|r| r.outcome.is_err()).count();

    info!(
        files = reports.len(),
        failed,
        duration_ms = elapsed_ms(start),
        "transform finished"
    );

    if json {
        let out = TransformOutputJson {
            ok: failed == 0,
            files: reports.iter().map(FileReport::to_json).collect(),
            skipped: skipped.iter().map(|p| p.display().to_string()).collect(),
            duration_ms: elapsed_ms(start),
            error: None,
        };
        println!("{}", serde_json::to_string(&out).into_diagnostic()?);
        if failed > 0 {
            std::process::exit(1);
        }
        return Ok(());
    }

    let multiple = reports.len() > 1;
    for report in &reports {
        match &report.outcome {
            Ok(result) => {
                if multiple {
                    println!("// {}", report.path.display());
                }
                print!("{}", result.contents);
            }
            Err(failure) => eprintln!("{:?}", failure.report(&report.path)),
        }
    }

    if failed > 0 {
        return Err(miette!(
            "{} of {} files failed to transform",
            failed,
            reports.len()
        ));
    }
    Ok(())
}

/// Load config, merge defines and build the shared transformer.
fn setup(action: &TransformAction) -> std::result::Result<(TransformConfig, Transformer), Error> {
    let mut config = resolve_config(action.config.as_deref(), &action.cwd)?;
    config.merge_defines(&action.define)?;
    if !action.source_maps {
        config.source_maps = false;
    }

    let resolver: Arc<dyn ImportResolver> =
        Arc::new(ModuleRegistry::new().with_check_exists(action.check_exists));
    let ids: Arc<dyn IdAllocator> = Arc::new(SequentialIds::new());
    let transformer = Transformer::from_config(&config, resolver, ids)?;

    debug!(
        defines = config.define.len(),
        source_maps = config.source_maps,
        check_exists = action.check_exists,
        "transform configured"
    );
    Ok((config, transformer))
}

/// Read and transform every file, keeping input order.
fn transform_files(transformer: &Transformer, paths: Vec<PathBuf>) -> Vec<FileReport> {
    let mut slots: Vec<Option<FileReport>> = Vec::with_capacity(paths.len());
    let mut positions = Vec::new();
    let mut sources = Vec::new();

    for path in paths {
        match SourceFile::read(&path) {
            Ok(file) => {
                positions.push(slots.len());
                slots.push(None);
                sources.push(file);
            }
            Err(e) => slots.push(Some(FileReport {
                path,
                outcome: Err(Failure::Read(e)),
            })),
        }
    }

    let results = transformer.transform_all(&sources);
    for ((slot, file), result) in positions.into_iter().zip(sources).zip(results) {
        slots[slot] = Some(FileReport {
            path: file.path,
            outcome: result.map_err(Failure::Transform),
        });
    }

    slots.into_iter().flatten().collect()
}

fn setup_error_code(error: &Error) -> &'static str {
    match error {
        Error::ConfigRead { .. } | Error::ConfigParse { .. } => "CONFIG_ERROR",
        Error::InvalidDefine(_) | Error::InvalidReplacement { .. } => "INVALID_DEFINE",
    }
}

fn absolutize(path: &Path, cwd: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}

/// Byte offset of a 1-based line and character column.
fn byte_offset(contents: &str, line: u32, column: u32) -> Option<usize> {
    let line_index = usize::try_from(line.checked_sub(1)?).ok()?;
    let column_index = usize::try_from(column.saturating_sub(1)).ok()?;

    let mut start = 0;
    for (index, text) in contents.split_inclusive('\n').enumerate() {
        if index == line_index {
            let within = text
                .char_indices()
                .nth(column_index)
                .map_or(text.len(), |(offset, _)| offset);
            return Some(start + within);
        }
        start += text.len();
    }
    None
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_offset() {
        let text = "let a = 1;\nlet é = 'x;\n";
        assert_eq!(byte_offset(text, 1, 1), Some(0));
        assert_eq!(byte_offset(text, 2, 1), Some(11));
        // `é` is two bytes wide.
        assert_eq!(byte_offset(text, 2, 7), Some(18));
        assert_eq!(byte_offset(text, 9, 1), None);
        assert_eq!(byte_offset(text, 0, 1), None);
    }

    #[test]
    fn test_setup_error_codes() {
        assert_eq!(
            setup_error_code(&Error::InvalidDefine("X".to_string())),
            "INVALID_DEFINE"
        );
        let unreadable = Error::ConfigRead {
            path: PathBuf::from("/work/splitpack.json"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };
        assert_eq!(setup_error_code(&unreadable), "CONFIG_ERROR");
    }

    #[test]
    fn test_absolutize() {
        let cwd = Path::new("/work");
        assert_eq!(absolutize(Path::new("src/a.js"), cwd), PathBuf::from("/work/src/a.js"));
        assert_eq!(absolutize(Path::new("/abs/a.js"), cwd), PathBuf::from("/abs/a.js"));
    }
}
