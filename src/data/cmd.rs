use clap::Parser;

#[derive(Parser, Debug)]
#[command(author)]
pub struct Args {
    #[clap(subcommand)]
    pub sub: Option<SubCommand>,

    /// Print version information
    #[arg(short = 'V', long)]
    pub version: bool,
}

#[derive(clap::Subcommand, Debug)]
pub enum SubCommand {
    /// Install service
    Install,
    /// Run the clipboard monitor
    Run(RunArgs),
    /// Start service
    Start,
    /// Stop service
    Stop,
    /// Restart service
    Restart,
    /// Query service status
    Status,
    /// Uninstall service
    Uninstall(UninstallArgs),
}

#[derive(clap::Parser, Debug)]
pub struct RunArgs {
    /// Run hosted by the service manager
    #[clap(short = 'D', long)]
    pub daemon: bool,
}

#[derive(clap::Parser, Debug)]
pub struct UninstallArgs {
    /// Timeout waiting for the service to be deleted from the database
    #[clap(short, long, default_value_t = 5)]
    pub timeout: u64,
}

impl Args {
    pub fn is_daemon(&self) -> bool {
        matches!(&self.sub, Some(SubCommand::Run(RunArgs { daemon: true })))
    }
}
