//! Rule evaluation commands.

use clap::{Args, Subcommand};

use crate::output::{self, OutputFormat};
use microbadge_core::config::AppConfig;
use microbadge_core::error::AppError;
use microbadge_core::types::RuleId;
use microbadge_entity::event::Attributes;

/// Arguments for rule commands
#[derive(Debug, Args)]
pub struct RuleArgs {
    /// Rule subcommand
    #[command(subcommand)]
    pub command: RuleCommand,
}

/// Rule subcommands
#[derive(Debug, Subcommand)]
pub enum RuleCommand {
    /// Evaluate a rule against a hypothetical event without granting
    Test {
        /// Rule ID
        rule_id: String,
        /// Event name
        event_name: String,
        /// Attributes as a JSON object
        #[arg(short, long, default_value = "{}")]
        attributes: String,
    },
}

/// Execute rule commands
pub async fn execute(
    args: &RuleArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let engine = super::connect_engine(config).await?;

    match &args.command {
        RuleCommand::Test {
            rule_id,
            event_name,
            attributes,
        } => {
            let attributes: Attributes = super::parse_json_object(attributes, "attributes")?;
            let result = engine
                .test_rule(&RuleId::from(rule_id.as_str()), event_name, &attributes)
                .await?;
            match format {
                OutputFormat::Json => output::print_json(&result),
                OutputFormat::Table => {
                    let verdict = format!("Rule '{}' ({})", result.rule_name, result.rule_id);
                    if result.matched {
                        output::print_success(&format!("{} matches", verdict));
                    } else {
                        output::print_warning(&format!("{} does not match", verdict));
                    }
                    output::print_kv("Badge", result.badge_id.as_str());
                    if let Some(points) = result.points {
                        output::print_kv("Bonus points", &points.to_string());
                    }
                }
            }
        }
    }

    Ok(())
}
