//! Batch input parsing: plain-text URL lists and CSV files
//!
//! Rows are turned into jobs without validating the URL here; the runner
//! validates at dispatch so a malformed row surfaces as an `InvalidInput`
//! failure in the results instead of being silently dropped. Blank lines are
//! not jobs and are skipped entirely.

use crate::config::CaptureJob;
use crate::error::CaptureError;
use std::path::Path;
use tokio::fs;
use tracing::info;

/// Load capture jobs from a batch file.
///
/// `.csv` files pick the URL column by a `url` header, falling back to the
/// first column; an optional `name` column supplies the output file stem.
/// Everything else is treated as plain text, one URL per line, with blank
/// lines and `#` comments ignored.
pub async fn load_jobs(path: &Path) -> Result<Vec<CaptureJob>, CaptureError> {
    let content = fs::read_to_string(path)
        .await
        .map_err(|e| CaptureError::Io(format!("{}: {e}", path.display())))?;

    let is_csv = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("csv"))
        .unwrap_or(false);

    let jobs = if is_csv {
        parse_csv(&content)
    } else {
        parse_lines(&content)
    };

    info!("Loaded {} jobs from {}", jobs.len(), path.display());
    Ok(jobs)
}

fn parse_lines(content: &str) -> Vec<CaptureJob> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(CaptureJob::new)
        .collect()
}

fn parse_csv(content: &str) -> Vec<CaptureJob> {
    let mut lines = content.lines().map(str::trim).filter(|l| !l.is_empty());

    let first = match lines.next() {
        Some(line) => line,
        None => return Vec::new(),
    };

    let header_cells: Vec<&str> = split_row(first);
    let url_col = header_cells
        .iter()
        .position(|cell| cell.eq_ignore_ascii_case("url"));
    let name_col = header_cells
        .iter()
        .position(|cell| cell.eq_ignore_ascii_case("name") || cell.eq_ignore_ascii_case("output"));

    let mut jobs = Vec::new();

    // Without a recognized header the first row is data, URL in column 0.
    let (url_col, has_header) = match url_col {
        Some(col) => (col, true),
        None => (0, false),
    };

    if !has_header {
        jobs.push(row_to_job(&header_cells, url_col, None));
    }

    for line in lines {
        let cells = split_row(line);
        jobs.push(row_to_job(&cells, url_col, name_col));
    }

    jobs
}

fn row_to_job(cells: &[&str], url_col: usize, name_col: Option<usize>) -> CaptureJob {
    let url = cells.get(url_col).map(|c| c.trim()).unwrap_or("");
    let name = name_col
        .and_then(|col| cells.get(col))
        .map(|c| c.trim())
        .filter(|c| !c.is_empty());

    match name {
        Some(name) => CaptureJob::with_name(url, name),
        None => CaptureJob::new(url),
    }
}

// Comma split without quoting support; batch CSVs carry URLs and names, and
// the URL column is what matters.
fn split_row(line: &str) -> Vec<&str> {
    line.split(',').map(str::trim).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_lines_skips_blanks_and_comments() {
        let content = "https://a.example\n\n# comment\n  https://b.example  \n";
        let jobs = parse_lines(content);
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].url, "https://a.example");
        assert_eq!(jobs[1].url, "https://b.example");
    }

    #[test]
    fn test_parse_lines_keeps_malformed_rows_as_jobs() {
        // Malformed URLs must surface as InvalidInput results, so they have
        // to come out of parsing as jobs.
        let content = "https://a.example\nnot-a-url\nhttps://b.example\n";
        let jobs = parse_lines(content);
        assert_eq!(jobs.len(), 3);
        assert_eq!(jobs[1].url, "not-a-url");
    }

    #[test]
    fn test_parse_csv_with_header() {
        let content = "name,url\nhome,https://a.example\npricing,https://a.example/pricing\n";
        let jobs = parse_csv(content);
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].url, "https://a.example");
        assert_eq!(jobs[0].output_name.as_deref(), Some("home"));
        assert_eq!(jobs[1].output_name.as_deref(), Some("pricing"));
    }

    #[test]
    fn test_parse_csv_header_case_insensitive() {
        let content = "URL\nhttps://a.example\n";
        let jobs = parse_csv(content);
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].url, "https://a.example");
    }

    #[test]
    fn test_parse_csv_without_header_uses_first_column() {
        let content = "https://a.example,ignored\nhttps://b.example,also ignored\n";
        let jobs = parse_csv(content);
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].url, "https://a.example");
        assert_eq!(jobs[1].url, "https://b.example");
    }

    #[test]
    fn test_parse_csv_keeps_rows_with_missing_url_cell() {
        let content = "url,name\n,missing\nhttps://a.example,ok\n";
        let jobs = parse_csv(content);
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].url, "");
        assert_eq!(jobs[1].url, "https://a.example");
    }

    #[test]
    fn test_parse_csv_empty_file() {
        assert!(parse_csv("").is_empty());
        assert!(parse_csv("\n\n").is_empty());
    }

    #[tokio::test]
    async fn test_load_jobs_missing_file_is_io_error() {
        let err = load_jobs(Path::new("/nonexistent/urls.txt"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "IOError");
    }

    #[tokio::test]
    async fn test_load_jobs_reads_txt_and_csv() {
        use std::io::Write;

        let dir = tempfile::tempdir().unwrap();

        let txt = dir.path().join("urls.txt");
        let mut f = std::fs::File::create(&txt).unwrap();
        writeln!(f, "https://a.example\n\nhttps://b.example").unwrap();
        let jobs = load_jobs(&txt).await.unwrap();
        assert_eq!(jobs.len(), 2);

        let csv = dir.path().join("urls.csv");
        let mut f = std::fs::File::create(&csv).unwrap();
        writeln!(f, "url,name\nhttps://a.example,home").unwrap();
        let jobs = load_jobs(&csv).await.unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].output_name.as_deref(), Some("home"));
    }
}
