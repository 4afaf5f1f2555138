//! pdfsplit binary
//!
//! Splits PDF files on disk and writes the parts into an output directory.

mod args;

use anyhow::{bail, Context, Result};
use args::Args;
use clap::Parser;
use pdfsplit_core::{
    resolve, split_batch, split_batch_lenient, InputFile, OutputDocument, SplitError,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(exit_code(&e))
        }
    }
}

/// 2 when the request itself is wrong, 1 for everything else
fn exit_code(error: &anyhow::Error) -> u8 {
    match error.downcast_ref::<SplitError>() {
        Some(e) if e.is_validation() => 2,
        _ => 1,
    }
}

fn run(args: Args) -> Result<()> {
    // stdout carries the listing of written files, logs go to stderr
    tracing_subscriber::registry()
        .with(
            EnvFilter::from_default_env()
                .add_directive("pdfsplit_core=info".parse()?)
                .add_directive("pdfsplit=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let spec = resolve(&args.parameters()).context("Invalid split parameters")?;
    let options = args.options();
    let files = read_inputs(&args.files)?;

    fs::create_dir_all(&args.output_dir).with_context(|| {
        format!(
            "Failed to create output directory {}",
            args.output_dir.display()
        )
    })?;

    if !args.lenient {
        let outputs = split_batch(&files, &spec, &options).context("Split failed")?;
        write_outputs(&args.output_dir, &outputs)?;
        return Ok(());
    }

    let mut failed = 0;
    for (file, result) in files.iter().zip(split_batch_lenient(&files, &spec, &options)) {
        match result {
            Ok(outputs) => write_outputs(&args.output_dir, &outputs)?,
            Err(e) => {
                tracing::error!("{}: {}", file.name, e);
                failed += 1;
            }
        }
    }
    if failed > 0 {
        bail!("{} of {} files failed to split", failed, files.len());
    }

    Ok(())
}

fn read_inputs(paths: &[PathBuf]) -> Result<Vec<InputFile>> {
    paths
        .iter()
        .map(|path| {
            let bytes =
                fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
            let name = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            Ok(InputFile::new(name, bytes))
        })
        .collect()
}

fn write_outputs(dir: &Path, outputs: &[OutputDocument]) -> Result<()> {
    for output in outputs {
        let path = dir.join(&output.filename);
        fs::write(&path, &output.bytes)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!(
            "{}\t{}\t{}",
            output.filename,
            output.page_count,
            output.bytes.len()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_invalid_request_exits_with_2() {
        let error = Err::<(), _>(SplitError::InvalidPageSelector("\"abc\"".into()))
            .context("Invalid split parameters")
            .unwrap_err();
        assert_eq!(exit_code(&error), 2);
    }

    #[test]
    fn test_document_failure_exits_with_1() {
        let error = Err::<(), _>(SplitError::EmptyDocument)
            .context("Split failed")
            .unwrap_err();
        assert_eq!(exit_code(&error), 1);

        let io = anyhow::Error::new(std::io::Error::from(std::io::ErrorKind::NotFound));
        assert_eq!(exit_code(&io), 1);
    }
}
