use clap::{Parser, Subcommand};

mod commands;

use commands::check::CheckArgs;
use commands::mcp::McpCommand;

#[derive(Parser, Debug)]
#[command(name = "hipeac", version, about = "HiPEAC member directory MCP server")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the MCP server or inspect what it exposes.
    Mcp(McpCommand),

    /// Verify the configuration against the upstream database.
    Check(CheckArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.cmd {
        Command::Mcp(cmd) => commands::mcp::execute(cmd).await,
        Command::Check(args) => commands::check::execute(args).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_serve_overrides() {
        let cli = Cli::try_parse_from([
            "hipeac",
            "mcp",
            "serve",
            "-c",
            "prod.yaml",
            "--transport",
            "http",
            "--port",
            "9000",
        ])
        .unwrap();

        let Command::Mcp(cmd) = cli.cmd else {
            panic!("expected mcp command");
        };
        let commands::mcp::McpSubcommand::Serve(args) = cmd.command else {
            panic!("expected serve");
        };
        assert_eq!(args.config.to_str(), Some("prod.yaml"));
        assert_eq!(args.transport, Some(hipeac_core::Transport::Http));
        assert_eq!(args.port, Some(9000));
        assert_eq!(args.host, None);
    }

    #[test]
    fn test_unknown_transport_is_rejected() {
        let result = Cli::try_parse_from(["hipeac", "mcp", "serve", "--transport", "grpc"]);
        assert!(result.is_err());
    }
}
