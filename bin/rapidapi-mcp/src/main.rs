mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "rapidapi-mcp")]
#[command(about = "MCP server for researching APIs on the RapidAPI marketplace", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve MCP over stdin/stdout (default)
    Serve,

    /// Check configuration and the browser installation
    Doctor {
        /// Also launch the browser once and report its version
        #[arg(long)]
        launch: bool,
    },

    /// Inspect or run the marketplace tools
    Tools {
        #[command(subcommand)]
        command: ToolsCommands,
    },
}

#[derive(Subcommand)]
enum ToolsCommands {
    /// List all tools
    List,

    /// Show a tool's parameters
    Info {
        /// Tool name
        name: String,
    },

    /// Run a tool once and print its JSON result
    Run {
        /// Tool name
        name: String,

        /// Arguments as a JSON object
        #[arg(default_value = "{}")]
        params: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // stdout is the MCP channel, so logs go to stderr.
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            commands::serve::run().await?;
        }
        Commands::Doctor { launch } => {
            commands::doctor::run(launch).await?;
        }
        Commands::Tools { command } => match command {
            ToolsCommands::List => {
                commands::tools_cmd::list().await?;
            }
            ToolsCommands::Info { name } => {
                commands::tools_cmd::info(&name).await?;
            }
            ToolsCommands::Run { name, params } => {
                commands::tools_cmd::run(&name, &params).await?;
            }
        },
    }

    Ok(())
}
