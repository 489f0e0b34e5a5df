//! Subcommand bodies. Each writes its result to `out`.

use aliastrace_core::{ProgramInfo, RecordIndex, ValueId};
use aliastrace_log::{Direction, LogCounter, LogReader};
use aliastrace_replay::{ReplayEngine, SliceOutcome};
use color_eyre::Result;
use color_eyre::eyre::{WrapErr, bail};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub fn count(log: &Path, out: &mut impl Write) -> Result<()> {
    let total = LogCounter::count_file(log)?;
    writeln!(out, "{}", total)?;
    Ok(())
}

pub fn dump(log: &Path, reverse: bool, out: &mut impl Write) -> Result<()> {
    let direction = if reverse {
        Direction::Backward
    } else {
        Direction::Forward
    };
    for item in LogReader::open(log, direction)? {
        let (index, record) = item?;
        writeln!(out, "{:>10} {}", index.to_string(), record)?;
    }
    Ok(())
}

pub fn aliases(engine: &mut ReplayEngine, log: &Path, json: bool, out: &mut impl Write) -> Result<()> {
    let analysis = engine.build_aliases(log)?;
    if json {
        serde_json::to_writer_pretty(&mut *out, &analysis.report())?;
        writeln!(out)?;
        return Ok(());
    }

    for pair in analysis.all_alias_pairs().iter() {
        writeln!(out, "{} {}", pair.first(), pair.second())?;
    }
    for unknown in analysis.unknown_versions() {
        writeln!(
            out,
            "unknown version: {} points to {} outside any allocation",
            unknown.pointer, unknown.address
        )?;
    }
    writeln!(
        out,
        "{} alias pairs, {} version-unknown addresses",
        analysis.all_alias_pairs().len(),
        analysis.unknown_versions().len()
    )?;
    Ok(())
}

pub fn query(
    engine: &mut ReplayEngine,
    log: &Path,
    first: u32,
    second: u32,
    out: &mut impl Write,
) -> Result<()> {
    let analysis = engine.build_aliases(log)?;
    let answer = analysis.alias(ValueId::new(first), ValueId::new(second));
    writeln!(out, "{}", answer)?;
    Ok(())
}

/// Arguments of the `slice` subcommand
pub struct SliceRequest {
    pub log: PathBuf,
    pub program: PathBuf,
    pub values: Option<Vec<u32>>,
    pub records: Option<Vec<u64>>,
    pub output: Option<PathBuf>,
    pub json: bool,
}

pub fn slice(engine: &mut ReplayEngine, request: &SliceRequest, out: &mut impl Write) -> Result<()> {
    let text = std::fs::read_to_string(&request.program)
        .wrap_err_with(|| format!("reading program metadata {}", request.program.display()))?;
    let program = ProgramInfo::from_json(&text)?;

    let outcome = match (request.values.as_deref(), request.records.as_deref()) {
        (Some(&[a, b]), _) => {
            engine.slice_between(&request.log, &program, ValueId::new(a), ValueId::new(b))?
        }
        (None, Some(&[i, j])) => engine.slice_from_records(
            &request.log,
            &program,
            RecordIndex::from_raw(i),
            RecordIndex::from_raw(j),
        )?,
        _ => bail!("slice needs exactly two values or two record indices"),
    };

    match &request.output {
        Some(path) => {
            let file = File::create(path)
                .wrap_err_with(|| format!("creating output {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            render(&outcome, &program, request.json, &mut writer)?;
            writer.flush()?;
        }
        None => render(&outcome, &program, request.json, out)?,
    }
    Ok(())
}

fn render(outcome: &SliceOutcome, program: &ProgramInfo, json: bool, out: &mut impl Write) -> Result<()> {
    if json {
        serde_json::to_writer_pretty(&mut *out, outcome)?;
        writeln!(out)?;
    } else {
        outcome.print(out, program)?;
    }
    Ok(())
}
