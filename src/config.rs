use std::time::Duration;

use clap::Parser;

/// Backend the client talks to when none is given
pub const DEFAULT_SERVER: &str = "http://127.0.0.1:5000";

/// How long an opened server-side file is kept before its temporary copy is removed
pub const DEFAULT_OPEN_RELEASE_SECS: u64 = 60;

/// Desktop client for a video metadata/download backend
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Base URL of the backend serving /get_info and /download
    #[arg(short, long, default_value = DEFAULT_SERVER)]
    pub server: String,

    /// Folder downloads are saved to
    #[arg(short, long, default_value = "./downloads")]
    pub download_dir: String,

    /// Seconds to keep a file opened from a server-side download
    #[arg(long, default_value_t = DEFAULT_OPEN_RELEASE_SECS)]
    pub open_release_secs: u64,
}

/// Runtime configuration of the client
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub server: String,
    pub download_dir: String,
    pub open_release_delay: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server: DEFAULT_SERVER.to_string(),
            download_dir: "./downloads".to_string(),
            open_release_delay: Duration::from_secs(DEFAULT_OPEN_RELEASE_SECS),
        }
    }
}

impl From<Args> for ClientConfig {
    fn from(args: Args) -> Self {
        Self {
            server: args.server,
            download_dir: args.download_dir,
            open_release_delay: Duration::from_secs(args.open_release_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_cli_defaults() {
        let args = Args::parse_from(["video_fetch_client"]);
        assert_eq!(ClientConfig::from(args), ClientConfig::default());
    }

    #[test]
    fn flags_override() {
        let args = Args::parse_from([
            "video_fetch_client",
            "--server",
            "http://media.lan:8080",
            "-d",
            "/srv/videos",
            "--open-release-secs",
            "5",
        ]);
        let config = ClientConfig::from(args);
        assert_eq!(config.server, "http://media.lan:8080");
        assert_eq!(config.download_dir, "/srv/videos");
        assert_eq!(config.open_release_delay, Duration::from_secs(5));
    }
}
