//! lcov tracefile parsing.
//!
//! Format reference: `geninfo(1)`. A tracefile is a sequence of records, one
//! per source file, each terminated by `end_of_record`.

use serde::Serialize;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum LcovError {
    #[error("lcov file is missing \"end_of_record\" line(s)")]
    MissingEndOfRecord,

    #[error("malformed line {line:?}: {reason}")]
    Malformed { line: String, reason: &'static str },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Stats {
    /// `LF`: instrumented lines
    pub lines: Option<u32>,
    /// `LH`: lines with a non-zero hit count
    pub hit: Option<u32>,
    pub fn_found: Option<u32>,
    pub fn_hit: Option<u32>,
    pub br_found: Option<u32>,
    pub br_hit: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct LineHit {
    pub line: u32,
    pub hits: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionRecord {
    pub line: u32,
    pub name: String,
    pub hits: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BranchRecord {
    pub line: u32,
    pub block: u32,
    pub branch: u32,
    pub taken: u64,
}

/// Coverage data for one source file.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LcovRecord {
    pub test: Option<String>,
    pub file: Option<String>,
    pub stats: Stats,
    pub lines: Vec<LineHit>,
    pub functions: Vec<FunctionRecord>,
    pub branches: Vec<BranchRecord>,
}

impl LcovRecord {
    /// Fraction of instrumented lines that were hit, `LH / LF`.
    pub fn line_coverage(&self) -> f64 {
        match (self.stats.lines, self.stats.hit) {
            (Some(found), Some(hit)) if found > 0 => f64::from(hit) / f64::from(found),
            _ => 0.0,
        }
    }
}

/// Parses a whole tracefile.
///
/// Chunks without a `TN:` line are skipped, as is anything before the `TN:`
/// line of a chunk.
pub fn parse(content: &str) -> Result<Vec<LcovRecord>, LcovError> {
    if !content.contains("end_of_record") {
        return Err(LcovError::MissingEndOfRecord);
    }

    let mut records = Vec::new();

    for chunk in content.trim().split("end_of_record") {
        let mut lines = chunk.lines().skip_while(|l| !l.trim_start().starts_with("TN:"));

        let Some(first) = lines.next() else {
            continue;
        };

        let mut record = LcovRecord::default();
        parse_line(first, &mut record)?;
        for line in lines {
            parse_line(line, &mut record)?;
        }
        records.push(record);
    }

    Ok(records)
}

fn parse_line(line: &str, record: &mut LcovRecord) -> Result<(), LcovError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(());
    }

    let Some((key, content)) = line.split_once(':') else {
        tracing::debug!("Unknown lcov line {}", line);
        return Ok(());
    };
    let content = content.trim();

    match key {
        "TN" => record.test = Some(content.to_string()),
        "SF" => record.file = Some(content.to_string()),
        "LF" => record.stats.lines = Some(number(line, content)?),
        "LH" => record.stats.hit = Some(number(line, content)?),
        "DA" => {
            if content.contains("null") {
                return Ok(());
            }
            // DA:<line>,<hits>[,<checksum>]
            let mut parts = content.split(',');
            let line_no = number(line, parts.next().unwrap_or_default())?;
            let hits = number(line, parts.next().ok_or_else(|| malformed(line, "missing hit count"))?)?;
            record.lines.push(LineHit {
                line: line_no,
                hits,
            });
        }
        "FNF" => record.stats.fn_found = Some(number(line, content)?),
        "FNH" => record.stats.fn_hit = Some(number(line, content)?),
        "FN" => {
            let (line_no, name) = content
                .split_once(',')
                .ok_or_else(|| malformed(line, "expected <line>,<name>"))?;
            record.functions.push(FunctionRecord {
                line: number(line, line_no)?,
                name: name.to_string(),
                hits: None,
            });
        }
        "FNDA" => {
            let (hits, name) = content
                .split_once(',')
                .ok_or_else(|| malformed(line, "expected <hits>,<name>"))?;
            if hits.is_empty() || hits == "-" {
                return Ok(());
            }
            let hits = number(line, hits)?;
            for function in record.functions.iter_mut().filter(|f| f.name == name) {
                function.hits = Some(hits);
            }
        }
        "BRF" => record.stats.br_found = Some(number(line, content)?),
        "BRH" => record.stats.br_hit = Some(number(line, content)?),
        "BRDA" => {
            let parts: Vec<&str> = content.splitn(4, ',').collect();
            let [line_no, block, branch, taken] = parts[..] else {
                return Err(malformed(line, "expected <line>,<block>,<branch>,<taken>"));
            };
            record.branches.push(BranchRecord {
                line: number(line, line_no)?,
                block: number(line, block)?,
                branch: number(line, branch)?,
                taken: if taken == "-" { 0 } else { number(line, taken)? },
            });
        }
        other => tracing::debug!("Unknown lcov method name {}", other),
    }

    Ok(())
}

fn number<T: std::str::FromStr>(line: &str, text: &str) -> Result<T, LcovError> {
    text.trim()
        .parse()
        .map_err(|_| malformed(line, "expected a number"))
}

fn malformed(line: &str, reason: &'static str) -> LcovError {
    LcovError::Malformed {
        line: line.to_string(),
        reason,
    }
}

/// Fraction of a function's instrumented lines that were hit.
///
/// `lines` must be sorted by line number. Lines outside
/// `[src_start, src_end]` are ignored; a function with no instrumented lines
/// has coverage 0.
pub fn function_coverage(lines: &[LineHit], src_start: u32, src_end: u32) -> f64 {
    let first = lines.partition_point(|l| l.line < src_start);
    let in_range = lines[first..]
        .iter()
        .take_while(|l| l.line <= src_end);

    let (instrumented, hit) = in_range.fold((0u32, 0u32), |(total, hit), l| {
        (total + 1, hit + u32::from(l.hits > 0))
    });

    if instrumented == 0 {
        0.0
    } else {
        f64::from(hit) / f64::from(instrumented)
    }
}
