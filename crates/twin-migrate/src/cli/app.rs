use clap::{Args, Parser, Subcommand};

use super::commands::migrate::MigrateArgs;

#[derive(Debug, Parser)]
#[command(
    name = "twin-migrate",
    version,
    about = "Copy users, digital twins, conversations and messages into the target document store"
)]
pub struct Cli {
    #[command(flatten)]
    pub runtime: RuntimeArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Args)]
pub struct RuntimeArgs {
    #[arg(long, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    Migrate(MigrateArgs),
}
