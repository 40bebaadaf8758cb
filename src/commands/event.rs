//! Event intake commands.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use crate::output::{self, OutputFormat};
use microbadge_core::config::AppConfig;
use microbadge_core::error::AppError;
use microbadge_entity::event::{Attributes, NewEvent};
use microbadge_service::EventReport;

/// Arguments for event commands
#[derive(Debug, Args)]
pub struct EventArgs {
    /// Event subcommand
    #[command(subcommand)]
    pub command: EventCommand,
}

/// Event subcommands
#[derive(Debug, Subcommand)]
pub enum EventCommand {
    /// Submit one event and run the rules against it
    Submit {
        /// Subject user ID
        #[arg(short, long)]
        user: String,
        /// Event name
        #[arg(short, long)]
        name: String,
        /// Attributes as a JSON object
        #[arg(short, long, default_value = "{}")]
        attributes: String,
        /// Producing system
        #[arg(long)]
        source: Option<String>,
        /// Trigger type
        #[arg(long)]
        trigger: Option<String>,
    },
    /// Submit a JSON array of events read from a file
    SubmitBatch {
        /// Path to the JSON file
        file: String,
    },
    /// Run the rules against every pending event
    Reprocess,
}

/// Matched rule display row
#[derive(Debug, Serialize, Tabled)]
struct MatchRow {
    /// Event ID
    event_id: String,
    /// Rule
    rule: String,
    /// Badge
    badge_id: String,
    /// Points
    points: i64,
    /// Grant ID
    grant_id: String,
}

/// Execute event commands
pub async fn execute(
    args: &EventArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let engine = super::connect_engine(config).await?;

    let reports = match &args.command {
        EventCommand::SubmitBatch { file } => {
            let raw = tokio::fs::read_to_string(file).await.map_err(|e| {
                AppError::validation(format!("Failed to read '{}': {}", file, e))
            })?;
            let events: Vec<NewEvent> = super::parse_json_object(&raw, "event list")?;
            engine.submit_events(events).await?
        }
        EventCommand::Submit {
            user,
            name,
            attributes,
            source,
            trigger,
        } => {
            let attributes: Attributes = super::parse_json_object(attributes, "attributes")?;
            let event = NewEvent {
                name: name.clone(),
                source: source.clone(),
                user_id: user.clone(),
                trigger_type: trigger.clone(),
                attributes,
            };
            vec![engine.submit_event(event).await?]
        }
        EventCommand::Reprocess => engine.reprocess_unprocessed().await?,
    };

    print_reports(&reports, format);
    Ok(())
}

fn print_reports(reports: &[EventReport], format: OutputFormat) {
    if format == OutputFormat::Json {
        output::print_json(reports);
        return;
    }

    for report in reports {
        output::print_kv("Event", report.event_id.as_str());
    }
    let rows: Vec<MatchRow> = reports
        .iter()
        .flat_map(|r| {
            r.matches.iter().map(|m| MatchRow {
                event_id: r.event_id.to_string(),
                rule: format!("{} ({})", m.rule_name, m.rule_id),
                badge_id: m.badge_id.to_string(),
                points: m.points,
                grant_id: m.grant_id.to_string(),
            })
        })
        .collect();
    output::print_list(&rows, format);
}
