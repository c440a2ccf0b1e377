//! CLI argument parsing with clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use super::enums::Kind;

/// Convert images to SSTV audio and back
#[derive(Parser, Debug)]
#[command(name = "sstv-studio")]
#[command(version, about = "Convert images to SSTV audio and back", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Config file path
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List supported SSTV modes
    Modes,
    /// Suggest a mode for an image
    Recommend {
        /// Image to inspect
        image: PathBuf,
    },
    /// Encode an image into SSTV audio
    Encode {
        /// Image to encode
        image: PathBuf,
        /// SSTV mode (default: from config)
        #[arg(long, short)]
        mode: Option<String>,
        /// Output sample rate in Hz
        #[arg(long)]
        sample_rate: Option<u32>,
        /// PCM bit depth (8, 16, 24 or 32)
        #[arg(long)]
        bits: Option<u16>,
    },
    /// Decode SSTV audio into an image
    Decode {
        /// WAV file to decode
        audio: PathBuf,
    },
    /// Record from the microphone and decode
    Listen {
        /// Seconds to record
        #[arg(long, short)]
        duration: Option<f64>,
    },
    /// List stored files, newest first
    Files {
        /// Which files to show
        #[arg(long, default_value = "all")]
        kind: Kind,
    },
    /// Delete stored files
    Delete {
        /// Area: uploads or data
        folder: String,
        /// File names within the area
        #[arg(required = true)]
        filenames: Vec<String>,
    },
    /// Copy a stored file out of the store
    Export {
        /// Area: uploads or data
        folder: String,
        /// File name within the area
        filename: String,
        /// Destination file or directory
        #[arg(default_value = ".")]
        dest: PathBuf,
    },
    /// Delete stored files older than a threshold
    Clean {
        /// Age threshold in hours (default: from config)
        #[arg(long)]
        max_age_hours: Option<u64>,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Show current configuration
    Show,
    /// Create default config file
    Init,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_global_flags() {
        let args = Args::parse_from(["sstv-studio", "modes", "--json", "-c", "/tmp/c.toml"]);
        assert!(matches!(args.command, Command::Modes));
        assert!(args.json);
        assert_eq!(args.config, Some(PathBuf::from("/tmp/c.toml")));
    }

    #[test]
    fn test_args_encode_defaults() {
        let args = Args::parse_from(["sstv-studio", "encode", "photo.png"]);
        match args.command {
            Command::Encode {
                image,
                mode,
                sample_rate,
                bits,
            } => {
                assert_eq!(image, PathBuf::from("photo.png"));
                assert!(mode.is_none());
                assert!(sample_rate.is_none());
                assert!(bits.is_none());
            }
            _ => panic!("Expected Encode subcommand"),
        }
        assert!(!args.json);
    }

    #[test]
    fn test_args_encode_options() {
        let args = Args::parse_from([
            "sstv-studio",
            "encode",
            "photo.png",
            "--mode",
            "PD120",
            "--sample-rate",
            "48000",
            "--bits",
            "24",
        ]);
        match args.command {
            Command::Encode {
                mode,
                sample_rate,
                bits,
                ..
            } => {
                assert_eq!(mode.as_deref(), Some("PD120"));
                assert_eq!(sample_rate, Some(48000));
                assert_eq!(bits, Some(24));
            }
            _ => panic!("Expected Encode subcommand"),
        }
    }

    #[test]
    fn test_args_listen_duration() {
        let args = Args::parse_from(["sstv-studio", "listen", "-d", "12.5"]);
        assert!(matches!(args.command, Command::Listen { duration: Some(d) } if d == 12.5));
    }

    #[test]
    fn test_args_files_kind() {
        let args = Args::parse_from(["sstv-studio", "files"]);
        assert!(matches!(args.command, Command::Files { kind: Kind::All }));

        let args = Args::parse_from(["sstv-studio", "files", "--kind", "audio"]);
        assert!(matches!(args.command, Command::Files { kind: Kind::Audio }));
    }

    #[test]
    fn test_args_delete_requires_filename() {
        assert!(Args::try_parse_from(["sstv-studio", "delete", "data"]).is_err());

        let args = Args::parse_from(["sstv-studio", "delete", "data", "a.wav", "b.jpg"]);
        match args.command {
            Command::Delete { folder, filenames } => {
                assert_eq!(folder, "data");
                assert_eq!(filenames, vec!["a.wav", "b.jpg"]);
            }
            _ => panic!("Expected Delete subcommand"),
        }
    }

    #[test]
    fn test_args_export_defaults_to_cwd() {
        let args = Args::parse_from(["sstv-studio", "export", "data", "a.wav"]);
        match args.command {
            Command::Export {
                folder,
                filename,
                dest,
            } => {
                assert_eq!(folder, "data");
                assert_eq!(filename, "a.wav");
                assert_eq!(dest, PathBuf::from("."));
            }
            _ => panic!("Expected Export subcommand"),
        }
    }

    #[test]
    fn test_args_config_subcommands() {
        let args = Args::parse_from(["sstv-studio", "config", "show"]);
        assert!(matches!(
            args.command,
            Command::Config {
                action: ConfigAction::Show
            }
        ));

        let args = Args::parse_from(["sstv-studio", "config", "init"]);
        assert!(matches!(
            args.command,
            Command::Config {
                action: ConfigAction::Init
            }
        ));
    }

    #[test]
    fn test_args_command_required() {
        assert!(Args::try_parse_from(["sstv-studio"]).is_err());
    }
}
