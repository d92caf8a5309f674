mod cli;

use authorizer::descriptor::{SubmissionOutcome, SuggestedValue, UploadDescriptor, UserValue};
use authorizer::resolve::Configuration;
use authorizer::submit::{SubmissionClient, SubmissionValues};
use authorizer::transform::CommandTransformer;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

fn main() {
    use clap::Parser;
    let cli = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_env("AUTHORIZER_LOG"))
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli
        .config
        .unwrap_or_else(authorizer::loader::default_config_path);

    let command_result = match cli.command {
        cli::Command::Resolve(resolve_cli) => resolve(&config_path, resolve_cli),
        cli::Command::Submit(submit_cli) => submit(&config_path, submit_cli),
    };

    if let Err(e) = command_result {
        for error in e.chain() {
            eprintln!("{error}")
        }
        std::process::exit(1);
    }
}

fn load(config_path: &Path) -> anyhow::Result<Configuration> {
    let configuration = authorizer::loader::try_load(config_path)?;
    tracing::info!(rules = configuration.rules.len(), "configuration resolved");
    Ok(configuration)
}

pub fn resolve(config_path: &Path, cli: cli::ResolveCommand) -> anyhow::Result<()> {
    let configuration = load(config_path)?;
    output(&cli.output, &configuration)
}

pub fn submit(config_path: &Path, cli: cli::SubmitCommand) -> anyhow::Result<()> {
    let configuration = load(config_path)?;

    let rule = configuration
        .rule(cli.rule)
        .ok_or_else(|| anyhow::anyhow!("no auto-complete rule #{}", cli.rule))?;
    let upload = rule
        .upload
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("auto-complete rule #{} has no upload", cli.rule))?;

    let user_values = user_values(upload, &cli.fields)?;
    let suggested = SuggestedValue::new(
        cli.suggestion,
        cli.description,
        (!user_values.is_empty()).then_some(user_values),
    );

    let mut client = SubmissionClient::with_timeout(Duration::from_secs(cli.timeout))?;
    if let Some(command) = cli.xml_transformer.as_deref() {
        let transformer = CommandTransformer::parse(command)
            .ok_or_else(|| anyhow::anyhow!("empty --xml-transformer"))?;
        client = client.with_xml_transformer(Arc::new(transformer));
    }
    if let Some(command) = cli.json_transformer.as_deref() {
        let transformer = CommandTransformer::parse(command)
            .ok_or_else(|| anyhow::anyhow!("empty --json-transformer"))?;
        client = client.with_json_transformer(Arc::new(transformer));
    }

    let values = SubmissionValues::from_suggested(
        &suggested,
        cli.selection.as_deref(),
        cli.dependent.as_deref(),
    );
    let outcome = client.submit(upload, &values);

    output(&cli.output, &outcome)?;
    anyhow::ensure!(
        outcome.success,
        "submission failed: {}",
        outcome_message(&outcome)
    );
    Ok(())
}

fn outcome_message(outcome: &SubmissionOutcome) -> &str {
    outcome.message.as_deref().unwrap_or("unknown reason")
}

/// Check `--field` values against the user fields of `upload`
fn user_values(
    upload: &UploadDescriptor,
    fields: &[(String, String)],
) -> anyhow::Result<Vec<UserValue>> {
    for (name, _) in fields {
        anyhow::ensure!(
            upload.user_field(name).is_some(),
            "unknown user field `{name}`"
        );
    }

    let mut user_values = vec![];
    for field in upload.user_fields.iter().flatten() {
        let input = fields
            .iter()
            .rev()
            .find(|(name, _)| *name == field.name)
            .map(|(_, value)| value.as_str())
            .unwrap_or_default();

        let user_value = field.accept(input)?;
        if !user_value.value.is_empty() {
            user_values.push(user_value);
        }
    }

    Ok(user_values)
}

fn output<T: serde::Serialize>(output: &cli::OutputArgs, value: &T) -> anyhow::Result<()> {
    match output.format {
        cli::OutputFormat::Yaml => serde_yaml::to_writer(std::io::stdout(), value)?,
        cli::OutputFormat::Json => serde_json::to_writer_pretty(std::io::stdout(), value)?,
    };

    Ok(())
}
