use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "reflect", about = "Reflect - strategic AI assessment in the terminal")]
pub struct CliArgs {
    /// Config file (defaults to <config_dir>/reflect/config.json)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Write spoken replies as WAV files into this directory
    #[arg(long)]
    pub audio_out: Option<PathBuf>,

    /// Directory for the exported brief and transcript
    #[arg(long, default_value = ".")]
    pub out_dir: PathBuf,

    /// Landing page used in the share link
    #[arg(long, default_value = "https://reflect.creativeprecision.co/")]
    pub share_url: String,

    /// Start in voice mode
    #[arg(long)]
    pub voice: bool,

    /// Log telemetry events
    #[arg(long)]
    pub telemetry: bool,

    /// Enable debug mode with verbose logging
    #[arg(long)]
    pub debug: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = CliArgs::parse_from(["reflect"]);
        assert!(args.config.is_none());
        assert_eq!(args.out_dir, PathBuf::from("."));
        assert!(!args.voice);
    }

    #[test]
    fn test_flags() {
        let args = CliArgs::parse_from([
            "reflect",
            "--audio-out",
            "/tmp/replies",
            "--voice",
            "--share-url",
            "https://example.com/",
        ]);
        assert_eq!(args.audio_out, Some(PathBuf::from("/tmp/replies")));
        assert!(args.voice);
        assert_eq!(args.share_url, "https://example.com/");
    }
}
