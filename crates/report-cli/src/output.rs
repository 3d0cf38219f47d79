use std::io::Write as _;
use std::path::Path;

use anyhow::Context as _;
use report_stream::prelude::*;
use report_stream::render::html_document;
use report_stream::ReportSummary;

/// Prints one run event. Chunks go to stdout as-is; failures go to stderr.
pub fn print_event(event: &StreamEvent) -> std::io::Result<()> {
    match event {
        StreamEvent::Chunk { text, .. } => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(text.as_bytes())?;
            stdout.flush()
        }
        StreamEvent::Completed { .. } => {
            println!();
            Ok(())
        }
        StreamEvent::Failed { message, .. } => {
            eprintln!("{message}");
            Ok(())
        }
        StreamEvent::Started { session_id } => {
            tracing::debug!(session_id = %session_id, "report started");
            Ok(())
        }
        StreamEvent::Metadata { report_id } => {
            tracing::info!(report_id = %report_id, "service assigned report id");
            Ok(())
        }
    }
}

/// Streams one report to stdout and returns its full text.
pub async fn stream_to_stdout(desk: ReportDesk, query: ReportQuery) -> anyhow::Result<String> {
    let mut run = desk.start(query).await?;
    while let Some(event) = run.next_event().await {
        print_event(&event)?;
        if event.is_terminal() {
            break;
        }
    }
    Ok(run.finish().await?)
}

/// Writes `markdown` rendered as a standalone HTML page.
pub fn write_html(path: &Path, title: &str, markdown: &str) -> anyhow::Result<()> {
    std::fs::write(path, html_document(title, markdown))
        .with_context(|| format!("writing {}", path.display()))?;
    tracing::info!(path = %path.display(), "wrote HTML report");
    Ok(())
}

/// One line of `reports list` output.
pub fn summary_line(summary: &ReportSummary) -> String {
    let language = summary
        .language
        .as_ref()
        .map(Language::as_str)
        .unwrap_or("-");
    format!(
        "{}\t{}\t{}\t{}",
        summary.report_id,
        summary.timestamp,
        language,
        shorten(&summary.query, 60)
    )
}

fn shorten(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{head}…")
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_line_truncates_long_queries_by_character() {
        let summary = ReportSummary {
            report_id: "r-1".into(),
            query: "ب".repeat(70),
            timestamp: "2024-03-21T10:00:00".into(),
            language: None,
        };
        let line = summary_line(&summary);
        assert!(line.starts_with("r-1\t2024-03-21T10:00:00\t-\t"));
        assert!(line.ends_with('…'));
        assert_eq!(line.split('\t').nth(3).map(|q| q.chars().count()), Some(61));
    }

    #[test]
    fn write_html_renders_markdown_document() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("report.html");
        write_html(&path, "query", "# عنوان\n\nbody").expect("write");
        let html = std::fs::read_to_string(&path).expect("read");
        assert!(html.contains("<h1 dir=\"auto\">عنوان</h1>"));
        assert!(html.contains("<title>query</title>"));
    }
}
