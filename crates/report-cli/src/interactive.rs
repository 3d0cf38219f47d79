//! Line-driven session loop: each non-empty stdin line starts a new report.
//! Typing a new line while a report streams supersedes it; `:cancel` stops it.

use report_stream::prelude::*;
use tokio::io::{AsyncBufReadExt as _, BufReader};
use tracing::warn;

use crate::output::print_event;

const CANCEL_COMMAND: &str = ":cancel";

/// What a line of input asks for.
#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    Skip,
    Cancel,
    Query(&'a str),
}

fn classify(line: &str) -> Input<'_> {
    match line.trim() {
        "" => Input::Skip,
        CANCEL_COMMAND => Input::Cancel,
        query => Input::Query(query),
    }
}

async fn next_event(current: &mut Option<ReportRun>) -> Option<StreamEvent> {
    match current {
        Some(run) => run.next_event().await,
        None => std::future::pending().await,
    }
}

pub async fn run(client: ReportClient) -> anyhow::Result<()> {
    let desk = client.clone().into_desk()?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut current: Option<ReportRun> = None;
    let mut input_open = true;

    while input_open || current.is_some() {
        tokio::select! {
            line = lines.next_line(), if input_open => {
                let Some(line) = line? else {
                    input_open = false;
                    continue;
                };
                match classify(&line) {
                    Input::Skip => {}
                    Input::Cancel => {
                        desk.cancel_active();
                    }
                    Input::Query(text) => match desk.start(client.query(text)).await {
                        Ok(run) => {
                            if current.is_some() {
                                eprintln!();
                            }
                            current = Some(run);
                        }
                        Err(err) => warn!(error = %err, "query rejected"),
                    },
                }
            }
            event = next_event(&mut current) => {
                match event {
                    Some(event) => {
                        print_event(&event)?;
                        if event.is_terminal() {
                            current = None;
                        }
                    }
                    None => current = None,
                }
            }
        }
    }
    Ok(())
}
