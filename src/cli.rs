use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "framevault")]
#[command(author, version, about = "Container attachment extraction server")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server
    Serve {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Inspect or extract attachments of a single container file
    Attachments {
        #[command(subcommand)]
        command: AttachmentsCommand,
    },

    /// Remove every cached attachment of a media source
    Evict {
        /// Media source id
        media_source_id: String,
    },

    /// Check that external tools are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses --config if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}

#[derive(Subcommand)]
pub enum AttachmentsCommand {
    /// List attachment streams in a container
    List {
        /// Container file
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write one attachment stream to a file
    Extract {
        /// Container file
        file: PathBuf,

        /// Attachment stream index
        index: u32,

        /// Destination path
        #[arg(short, long)]
        output: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_serve_overrides() {
        let cli = Cli::parse_from(["framevault", "-v", "serve", "--port", "9000"]);
        assert!(cli.verbose);
        match cli.command {
            Commands::Serve { host, port } => {
                assert_eq!(host, None);
                assert_eq!(port, Some(9000));
            }
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn parses_attachment_extract() {
        let cli = Cli::parse_from([
            "framevault",
            "--config",
            "fv.json",
            "attachments",
            "extract",
            "movie.mkv",
            "3",
            "-o",
            "subs.vtt",
        ]);
        assert_eq!(cli.config, Some(PathBuf::from("fv.json")));
        match cli.command {
            Commands::Attachments {
                command: AttachmentsCommand::Extract { file, index, output },
            } => {
                assert_eq!(file, PathBuf::from("movie.mkv"));
                assert_eq!(index, 3);
                assert_eq!(output, PathBuf::from("subs.vtt"));
            }
            _ => panic!("expected attachments extract"),
        }
    }
}
