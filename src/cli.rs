use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

/// Command-line arguments for the crash agent.
///
/// Global options apply to every subcommand. Values given on the command
/// line override the configuration file.
#[derive(Parser, Debug)]
#[clap(name = "crash-agent", about = "Crash report inspection and upload agent")]
pub struct Args {
    /// Verbose logging
    #[clap(short, long, global = true)]
    pub verbose: bool,

    /// Path to configuration YAML file
    #[clap(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the hashed device identity
    Id,

    /// List crash reports
    List {
        /// Directory containing crash reports
        #[clap(long)]
        crash_dir: Option<PathBuf>,

        /// Show the package owning each crashed executable
        #[clap(long)]
        packages: bool,
    },

    /// Upload crash reports to the crash intake service
    Upload(UploadOpts),

    /// Print the contents of the system and kernel logs
    Logs,

    /// Write the default configuration to a file
    InitConfig {
        /// Path to output configuration file
        #[clap(default_value = "crash-agent.yaml")]
        path: PathBuf,
    },
}

#[derive(ClapArgs, Debug, Default)]
pub struct UploadOpts {
    /// Upload destination
    #[clap(long)]
    pub dest: Option<String>,

    /// Directory containing crash reports
    #[clap(long)]
    pub crash_dir: Option<PathBuf>,

    /// Delete crash reports after successful upload
    #[clap(long)]
    pub cleanup: bool,

    /// Upload regardless of the current network state
    #[clap(long)]
    pub skip_reachability_check: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_args() {
        let args = Args::parse_from([
            "crash-agent",
            "upload",
            "--dest",
            "http://localhost:8080",
            "--crash-dir",
            "/tmp/crash",
            "--cleanup",
        ]);

        match args.command {
            Commands::Upload(opts) => {
                assert_eq!(opts.dest.as_deref(), Some("http://localhost:8080"));
                assert_eq!(opts.crash_dir, Some(PathBuf::from("/tmp/crash")));
                assert!(opts.cleanup);
                assert!(!opts.skip_reachability_check);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = Args::parse_from(["crash-agent", "list", "--verbose", "-c", "/etc/agent.yaml"]);

        assert!(args.verbose);
        assert_eq!(args.config, Some(PathBuf::from("/etc/agent.yaml")));
        assert!(matches!(args.command, Commands::List { crash_dir: None, packages: false }));
    }

    #[test]
    fn test_init_config_default_path() {
        let args = Args::parse_from(["crash-agent", "init-config"]);
        match args.command {
            Commands::InitConfig { path } => assert_eq!(path, PathBuf::from("crash-agent.yaml")),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_subcommand_is_required() {
        assert!(Args::try_parse_from(["crash-agent"]).is_err());
    }
}
