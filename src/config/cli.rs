use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "ticket-triage")]
#[command(about = "Support ticket triage service: classifies tickets into departments")]
pub struct CliArgs {
    /// Path to TOML configuration file (defaults to ./triage.toml when present)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Override server.port from the configuration
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Validate configuration, load the model artifact, print its departments and exit
    #[arg(long)]
    pub check: bool,
}
