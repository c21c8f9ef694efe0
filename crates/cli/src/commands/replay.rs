//! `chatwire replay`: Feed a recorded event log through the runtime.
//!
//! Input is newline-delimited JSON, one AG-UI event per line. Lines that do
//! not decode are skipped with a warning, as a live transport would drop
//! them.

use std::path::PathBuf;
use std::sync::Arc;

use chatwire_citations::{CitationExtractor, SourceReference};
use chatwire_config::AppConfig;
use chatwire_core::{AgUiEvent, Conversation, RunStatus, TracingSink};
use chatwire_runtime::RunCoordinator;
use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{info, warn};

/// Everything a replay produced.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayReport {
    pub conversation: Conversation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partial_text: Option<String>,
    pub citations: Vec<SourceReference>,
    pub events: usize,
    pub skipped_lines: usize,
    pub citation_errors: usize,
}

pub async fn run(
    config: &AppConfig,
    input: Option<PathBuf>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let reader: Box<dyn AsyncBufRead + Unpin> = match input {
        Some(path) if path.as_os_str() != "-" => {
            let file = tokio::fs::File::open(&path)
                .await
                .map_err(|e| format!("Failed to open {}: {e}", path.display()))?;
            Box::new(BufReader::new(file))
        }
        _ => Box::new(BufReader::new(tokio::io::stdin())),
    };

    let report = replay(config, reader).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }
    Ok(())
}

/// Drive every event from `reader` through a fresh run coordinator.
pub async fn replay<R>(
    config: &AppConfig,
    reader: R,
) -> Result<ReplayReport, Box<dyn std::error::Error>>
where
    R: AsyncBufRead + Unpin,
{
    let extractor = CitationExtractor::from_ids(&config.citations.schemas)?;
    let mut coordinator = RunCoordinator::new(Arc::new(TracingSink)).with_extractor(extractor);

    let mut citations = Vec::new();
    let mut events = 0;
    let mut skipped_lines = 0;
    let mut citation_errors = 0;

    let mut lines = reader.lines();
    let mut line_no = 0;
    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let event: AgUiEvent = match serde_json::from_str(line) {
            Ok(event) => event,
            Err(e) => {
                warn!(line = line_no, error = %e, "Skipping undecodable event");
                skipped_lines += 1;
                continue;
            }
        };
        events += 1;

        match coordinator.handle(&event) {
            Ok(update) => {
                if !update.citations.is_empty() {
                    info!(line = line_no, count = update.citations.len(), "New citations");
                }
                citations.extend(update.citations);
            }
            Err(e) if config.replay.fail_on_citation_error => {
                return Err(format!("line {line_no}: {e}").into());
            }
            Err(e) => {
                warn!(line = line_no, error = %e, "Continuing past citation error");
                citation_errors += 1;
            }
        }
    }

    info!(events, skipped_lines, citations = citations.len(), "Replay finished");

    let partial_text = if config.replay.print_partial {
        coordinator.streaming().partial_text().map(str::to_string)
    } else {
        None
    };

    Ok(ReplayReport {
        conversation: coordinator.into_conversation(),
        partial_text,
        citations,
        events,
        skipped_lines,
        citation_errors,
    })
}

fn print_summary(report: &ReplayReport) {
    let conversation = &report.conversation;
    let status = match conversation.status() {
        RunStatus::Idle => "idle".to_string(),
        RunStatus::Running { run_id } => format!("running ({run_id})"),
        RunStatus::Completed => "completed".to_string(),
        RunStatus::Failed { error } => format!("failed: {error}"),
    };

    println!("💬 Replay of {} events", report.events);
    println!("==================");
    println!("  Status:      {status}");
    println!("  Messages:    {}", conversation.messages().len());
    for message in conversation.messages() {
        println!("    [{}] {}: {}", message.role, message.id, message.text);
    }
    if let Some(partial) = &report.partial_text {
        println!("    (unfinished) {partial}");
    }

    let in_flight: Vec<&str> = conversation.tool_calls().map(|c| c.name.as_str()).collect();
    if !in_flight.is_empty() {
        println!("  Tool calls:  {} in flight ({})", in_flight.len(), in_flight.join(", "));
    }

    println!("  Citations:   {}", report.citations.len());
    for source in &report.citations {
        let pages = if source.page_numbers.is_empty() {
            String::new()
        } else {
            let pages: Vec<String> = source.page_numbers.iter().map(u32::to_string).collect();
            format!(" p. {}", pages.join(", "))
        };
        println!("    [{}] {}{pages}", source.index, source.display_title());
    }

    if report.skipped_lines > 0 {
        println!("\n  ⚠️  {} undecodable line(s) skipped", report.skipped_lines);
    }
    if report.citation_errors > 0 {
        println!("  ⚠️  {} citation error(s) ignored", report.citation_errors);
    }
}
