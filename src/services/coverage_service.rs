//! Coverage service - Attaches lcov coverage figures to stored graph nodes.
//!
//! # Coverage Rules
//!
//! - A `File` node receives `LH / LF` of its lcov record
//! - When a file is fully covered every function in it receives 1.0
//! - Otherwise a function receives the share of instrumented lines in its
//!   `[src_start, src_end]` span that were hit

use crate::{
    coverage::{
        self,
        lcov::{self, LcovRecord},
    },
    db::DbPool,
    error::AppError,
    models::{coverage::CoverageSummary, graph::FunctionSpan},
    services::graph_service,
};

/// Apply an lcov report to a processed repository.
///
/// All updates happen in one transaction; a report that fails to parse
/// leaves the stored coverage untouched.
///
/// # Arguments
///
/// * `pool` - Database connection pool
/// * `strip_prefix` - Prefix removed from `SF:` paths before matching
/// * `repo` - Repository name
/// * `lcov_path` - Location of the tracefile on the server's filesystem
///
/// # Errors
///
/// - `RepositoryNotFound`: the repository was never processed
/// - `Io`: the tracefile could not be read
/// - `Coverage`: the tracefile is malformed
pub async fn process_code_coverage(
    pool: &DbPool,
    strip_prefix: Option<&str>,
    repo: &str,
    lcov_path: &str,
) -> Result<CoverageSummary, AppError> {
    let repository = graph_service::get_repository(pool, repo).await?;

    let content = tokio::fs::read_to_string(lcov_path).await?;
    let records = lcov::parse(&content)?;
    tracing::info!("Parsed {} lcov records from {}", records.len(), lcov_path);

    let mut summary = CoverageSummary {
        repo: repository.name.clone(),
        ..Default::default()
    };

    let mut tx = pool.begin().await?;

    for record in &records {
        let location = record
            .file
            .as_deref()
            .and_then(|sf| coverage::source_location(sf, strip_prefix, &repository.path));
        let Some(location) = location else {
            summary.files_skipped += 1;
            continue;
        };

        let file_coverage = record.line_coverage();
        let file_id: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE graph_nodes
            SET coverage_percentage = $5
            WHERE repo = $1 AND label = 'File' AND path = $2 AND name = $3 AND ext = $4
            RETURNING id
            "#,
        )
        .bind(&repository.name)
        .bind(&location.dir)
        .bind(&location.name)
        .bind(&location.ext)
        .bind(file_coverage)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(file_id) = file_id else {
            tracing::debug!("No file node for {}", location.relative_path());
            summary.files_skipped += 1;
            continue;
        };
        summary.files_updated += 1;

        let updated = if file_coverage >= 1.0 {
            sqlx::query(
                r#"
                UPDATE graph_nodes
                SET coverage_percentage = 1.0
                WHERE file_id = $1 AND label = 'Function'
                "#,
            )
            .bind(file_id)
            .execute(&mut *tx)
            .await?
            .rows_affected()
        } else {
            let spans = sqlx::query_as::<_, FunctionSpan>(
                r#"
                SELECT id, src_start, src_end
                FROM graph_nodes
                WHERE file_id = $1 AND label = 'Function'
                "#,
            )
            .bind(file_id)
            .fetch_all(&mut *tx)
            .await?;

            let (ids, figures) = function_coverages(record, &spans);

            sqlx::query(
                r#"
                UPDATE graph_nodes AS n
                SET coverage_percentage = u.coverage
                FROM UNNEST($1::bigint[], $2::float8[]) AS u(id, coverage)
                WHERE n.id = u.id
                "#,
            )
            .bind(&ids)
            .bind(&figures)
            .execute(&mut *tx)
            .await?
            .rows_affected()
        };

        summary.functions_updated += usize::try_from(updated).unwrap_or(usize::MAX);
    }

    tx.commit().await?;

    tracing::info!(
        "Coverage applied to {}: {} files updated, {} skipped",
        summary.repo,
        summary.files_updated,
        summary.files_skipped
    );

    Ok(summary)
}

/// Coverage of each function span, returned as parallel id/figure vectors.
fn function_coverages(record: &LcovRecord, spans: &[FunctionSpan]) -> (Vec<i64>, Vec<f64>) {
    let mut lines = record.lines.clone();
    lines.sort_by_key(|l| l.line);

    spans
        .iter()
        .map(|span| {
            let start = span.src_start.unwrap_or(0).max(0) as u32;
            let end = span.src_end.unwrap_or(0).max(0) as u32;
            (span.id, lcov::function_coverage(&lines, start, end))
        })
        .unzip()
}
