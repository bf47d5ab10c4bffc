use clap::{Parser, Subcommand};
use utils::version;

use crate::config::run::{RunArgs, ShowTemplateArgs};

#[derive(Parser)]
#[command(about, long_about, version = &**version::VERSION)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the rotation controller
    Run(Box<RunArgs>),
    /// Print the replacement deployment as YAML
    #[command(name = "show-template")]
    ShowTemplate(ShowTemplateArgs),
}
