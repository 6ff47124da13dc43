//! Command-line interface definition.
//!
//! ```text
//! servicho [OPTIONS] [ROOT]
//! ```

use crate::config::ConfigOverrides;
use clap::Parser;
use std::net::IpAddr;
use std::path::PathBuf;

/// servicho - live-reloading development server
#[derive(Parser, Debug)]
#[command(
    name = "servicho",
    version,
    about = "Serve a directory with live reload and component previews",
    long_about = "Serves files from ROOT over HTTP, injects a live-reload client into HTML pages,\n\
                  renders a preview page for .js/.jsx component modules, and reloads connected\n\
                  browsers whenever a file under ROOT changes."
)]
pub struct Cli {
    /// Directory to serve and watch (defaults to the current directory)
    #[arg(value_name = "ROOT")]
    pub root: Option<PathBuf>,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Config file (defaults to ROOT/servicho.config.json when present)
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Interface to bind both listeners to
    #[arg(long, value_name = "IP")]
    pub host: Option<IpAddr>,
}

impl Cli {
    /// The directory to serve.
    pub fn root_dir(&self) -> std::io::Result<PathBuf> {
        match &self.root {
            Some(root) => Ok(root.clone()),
            None => std::env::current_dir(),
        }
    }

    pub fn config_overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            config_path: self.config.clone(),
            host: self.host,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_defaults_to_cwd() {
        let cli = Cli::try_parse_from(["servicho"]).unwrap();
        assert!(cli.root.is_none());
        assert_eq!(cli.root_dir().unwrap(), std::env::current_dir().unwrap());
    }

    #[test]
    fn test_positional_root_and_flags() {
        let cli =
            Cli::try_parse_from(["servicho", "site", "--verbose", "--host", "0.0.0.0"]).unwrap();
        assert_eq!(cli.root, Some(PathBuf::from("site")));
        assert!(cli.verbose);
        assert_eq!(cli.config_overrides().host, Some("0.0.0.0".parse().unwrap()));
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        assert!(Cli::try_parse_from(["servicho", "-v", "-q"]).is_err());
    }

    #[test]
    fn test_rejects_second_root() {
        assert!(Cli::try_parse_from(["servicho", "a", "b"]).is_err());
    }

    #[test]
    fn test_config_path() {
        let cli = Cli::try_parse_from(["servicho", "--config", "dev.json"]).unwrap();
        assert_eq!(
            cli.config_overrides().config_path,
            Some(PathBuf::from("dev.json"))
        );
    }
}
