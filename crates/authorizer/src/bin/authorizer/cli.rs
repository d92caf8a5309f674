//! authorizer cli interface

use clap::{Parser, Subcommand, ValueEnum};
use std::fmt::Formatter;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (.xml, .yaml, .yml or .json)
    ///
    /// Defaults to $AUTHORIZER_CONFIG, or .authorizer/config.xml in the home directory
    #[clap(short = 'c', long = "config", global(true))]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the resolved rules of the configuration
    Resolve(ResolveCommand),

    /// Submit a new suggestion to the upload target of a rule
    Submit(SubmitCommand),
}

#[derive(Parser, Debug)]
pub struct ResolveCommand {
    #[clap(flatten)]
    pub output: OutputArgs,
}

#[derive(Parser, Debug)]
pub struct SubmitCommand {
    /// Position of the rule in the configuration, starting at 1
    #[clap(short = 'r', long = "rule")]
    pub rule: usize,

    /// The new value
    #[clap(short = 's', long = "suggestion")]
    pub suggestion: String,

    #[clap(short = 'd', long = "description")]
    pub description: Option<String>,

    /// Value of the rule's selection in the edited document
    #[clap(long = "selection")]
    pub selection: Option<String>,

    /// Value of the rule's dependent in the edited document
    #[clap(long = "dependent")]
    pub dependent: Option<String>,

    /// User field value, checked against the rule's user fields
    ///
    /// Can be specified multiple times. Fields that are not given are
    /// submitted as empty input.
    #[clap(short = 'f', long = "field", value_parser = parse_field)]
    pub fields: Vec<(String, String)>,

    /// Command transforming XML bodies, e.g. "xsltproc {transformation} -"
    #[clap(long = "xml-transformer")]
    pub xml_transformer: Option<String>,

    /// Command transforming JSON bodies
    #[clap(long = "json-transformer")]
    pub json_transformer: Option<String>,

    /// Seconds to wait for the server
    #[clap(long = "timeout", default_value_t = 30)]
    pub timeout: u64,

    #[clap(flatten)]
    pub output: OutputArgs,
}

fn parse_field(field: &str) -> Result<(String, String), String> {
    field
        .split_once('=')
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected NAME=VALUE, got `{field}`"))
}

#[derive(Parser, Debug)]
pub struct OutputArgs {
    #[arg(short = 'F', long = "output-format", default_value_t)]
    pub format: OutputFormat,
}

#[derive(ValueEnum, Clone, Default, Debug)]
pub enum OutputFormat {
    Json,
    #[default]
    Yaml,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Json => f.write_str("json"),
            OutputFormat::Yaml => f.write_str("yaml"),
        }
    }
}
