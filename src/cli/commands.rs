//! Subcommand handlers.
//!
//! Every handler prints its result (as text, or as JSON with `--json`) and
//! returns whether the command succeeded.

use chrono::Local;
use serde::Serialize;
use serde_json::json;
use std::path::{Path, PathBuf};

use super::args::{Args, Command, ConfigAction};
use super::enums::Kind;
use crate::assets::{AssetRef, AssetStore};
use crate::capture::{self, CancelToken};
use crate::codec::LineScanCodec;
use crate::config::{default_path, Config, DEFAULT_CONFIG_TOML};
use crate::decoder::{self, DecodeRequest, DecodeResult};
use crate::encoder::{self, EncodeRequest, EncodeResult};
use crate::error::SstvError;
use crate::modes::{self, list_modes};

/// Loaded settings shared by the handlers.
pub struct Context {
    pub config: Config,
    pub json: bool,
    codec: LineScanCodec,
}

impl Context {
    pub fn new(config: Config, json: bool) -> Self {
        Self {
            config,
            json,
            codec: LineScanCodec::new(),
        }
    }

    fn store(&self) -> AssetStore {
        self.config.store()
    }

    /// The store with both areas created, for commands that write into it.
    fn open_store(&self) -> Result<AssetStore, SstvError> {
        let store = self.config.store();
        store.ensure_dirs()?;
        Ok(store)
    }

    fn emit<T: Serialize>(&self, value: &T, text: impl FnOnce()) {
        if self.json {
            match serde_json::to_string_pretty(value) {
                Ok(s) => println!("{}", s),
                Err(e) => eprintln!("Error: failed to serialize result: {}", e),
            }
        } else {
            text();
        }
    }
}

/// Dispatch a parsed command line. Returns false on failure.
pub fn run(args: Args) -> bool {
    if let Command::Config {
        action: ConfigAction::Init,
    } = args.command
    {
        return init_config(args.config.as_deref());
    }

    let config = match Config::load(args.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            return false;
        }
    };
    let ctx = Context::new(config, args.json);

    match args.command {
        Command::Modes => show_modes(&ctx),
        Command::Recommend { image } => recommend(&ctx, &image),
        Command::Encode {
            image,
            mode,
            sample_rate,
            bits,
        } => encode(&ctx, &image, mode, sample_rate, bits),
        Command::Decode { audio } => decode(&ctx, &audio),
        Command::Listen { duration } => listen(&ctx, duration),
        Command::Files { kind } => files(&ctx, kind),
        Command::Delete { folder, filenames } => delete(&ctx, &folder, &filenames),
        Command::Export {
            folder,
            filename,
            dest,
        } => export(&ctx, &folder, &filename, &dest),
        Command::Clean { max_age_hours } => clean(&ctx, max_age_hours),
        Command::Config { .. } => {
            show_config(&ctx, args.config.as_deref());
            true
        }
    }
}

fn show_modes(ctx: &Context) -> bool {
    let modes = list_modes(&ctx.codec);
    ctx.emit(&modes, || {
        println!("Supported modes:");
        for m in &modes {
            println!("  {:<14} {:>4}x{:<4} VIS {}", m.name, m.width, m.height, m.vis_code);
        }
    });
    true
}

fn recommend(ctx: &Context, image: &Path) -> bool {
    let mode = modes::recommend(image, &ctx.config.recommend);
    ctx.emit(&json!({ "image": image, "mode": mode }), || println!("{}", mode));
    true
}

fn encode(
    ctx: &Context,
    image: &Path,
    mode: Option<String>,
    sample_rate: Option<u32>,
    bits: Option<u16>,
) -> bool {
    let store = match ctx.open_store() {
        Ok(store) => store,
        Err(e) => return report_error(ctx, &e),
    };
    let now = Local::now();
    let stored = match store.ingest(image, &now) {
        Ok(path) => path,
        Err(e) => return report_error(ctx, &e),
    };

    let mode = mode.unwrap_or_else(|| ctx.config.encode.default_mode.clone());
    let mut request = EncodeRequest::new(stored, store.encoded_audio_path(image, &now), &mode);
    request.sample_rate = sample_rate.unwrap_or(ctx.config.encode.sample_rate);
    request.bit_depth = bits.unwrap_or(ctx.config.encode.bit_depth);

    let result = encoder::encode(&ctx.codec, &request);
    print_encode_result(ctx, &result);
    result.success
}

fn print_encode_result(ctx: &Context, result: &EncodeResult) {
    ctx.emit(result, || match (&result.output_path, &result.error) {
        (Some(path), _) => println!(
            "Encoded {} ({} Hz, {}-bit): {}",
            result.mode,
            result.sample_rate,
            result.bit_depth,
            path.display()
        ),
        (None, Some(error)) => eprintln!("Error: {}", error),
        (None, None) => eprintln!("Error: encoding failed"),
    });
}

fn decode(ctx: &Context, audio: &Path) -> bool {
    let store = match ctx.open_store() {
        Ok(store) => store,
        Err(e) => return report_error(ctx, &e),
    };
    let now = Local::now();
    let stored = match store.ingest(audio, &now) {
        Ok(path) => path,
        Err(e) => return report_error(ctx, &e),
    };

    let request = DecodeRequest::file(stored, store.decoded_image_path(audio, &now));
    let result = decoder::decode(&ctx.codec, &request);
    print_decode_result(ctx, &result);
    result.success
}

fn listen(ctx: &Context, duration: Option<f64>) -> bool {
    let duration = duration.unwrap_or(ctx.config.capture.duration_secs);
    let store = match ctx.open_store() {
        Ok(store) => store,
        Err(e) => return report_error(ctx, &e),
    };
    let output = store.mic_image_path(&Local::now());
    let recording = store.recording_path(&output);

    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        handler_token.cancel();
        eprintln!("\nReceived Ctrl+C, stopping capture...");
    }) {
        log::warn!("Could not install Ctrl+C handler: {}", e);
    }

    if !ctx.json {
        println!("Listening for {:.1}s...", duration);
    }
    let backend = capture::platform_backend(ctx.config.capture.device.as_deref());
    let request = DecodeRequest::live(duration, recording, output);
    let result = decoder::decode_with(&ctx.codec, &request, backend.as_deref(), &cancel);
    print_decode_result(ctx, &result);
    result.success
}

fn print_decode_result(ctx: &Context, result: &DecodeResult) {
    ctx.emit(result, || match (&result.output_path, &result.error) {
        (Some(path), _) => println!(
            "Decoded {}: {}",
            result.mode.as_deref().unwrap_or("image"),
            path.display()
        ),
        (None, Some(error)) => eprintln!("Error: {}", error),
        (None, None) => eprintln!("Error: decoding failed"),
    });
}

fn files(ctx: &Context, kind: Kind) -> bool {
    let records = ctx.store().browse(kind.into());
    ctx.emit(&json!({ "success": true, "files": records }), || {
        if records.is_empty() {
            println!("No files.");
        }
        for r in &records {
            println!(
                "  {:<8} {:<48} {:>10}  {}  {}",
                r.folder,
                r.name,
                r.size_display(),
                r.modified_at,
                r.path.display()
            );
        }
    });
    true
}

fn delete(ctx: &Context, folder: &str, filenames: &[String]) -> bool {
    // A single file reports why it could not be deleted.
    if let [filename] = filenames {
        return match ctx.store().remove(folder, filename) {
            Ok(path) => {
                ctx.emit(
                    &json!({ "success": true, "deleted": 1, "failed": 0, "path": path }),
                    || println!("Deleted {}", path.display()),
                );
                true
            }
            Err(e) => report_error(ctx, &e),
        };
    }

    let refs: Vec<AssetRef> = filenames.iter().map(|f| AssetRef::new(folder, f)).collect();
    let report = ctx.store().delete_many(&refs);
    ctx.emit(&report, || {
        println!("Deleted {} file(s), {} failed", report.deleted, report.failed)
    });
    report.failed == 0
}

fn export(ctx: &Context, folder: &str, filename: &str, dest: &Path) -> bool {
    match ctx.store().export(folder, filename, dest) {
        Ok(path) => {
            ctx.emit(&json!({ "success": true, "path": path }), || {
                println!("Exported {}", path.display())
            });
            true
        }
        Err(e) => report_error(ctx, &e),
    }
}

fn clean(ctx: &Context, max_age_hours: Option<u64>) -> bool {
    let hours = max_age_hours.unwrap_or(ctx.config.cleanup.max_age_hours);
    let deleted = ctx.store().expire_all(hours);
    ctx.emit(&json!({ "deleted": deleted, "max_age_hours": hours }), || {
        println!("Removed {} file(s) older than {}h", deleted, hours)
    });
    true
}

fn report_error(ctx: &Context, error: &SstvError) -> bool {
    ctx.emit(
        &json!({
            "success": false,
            "error": error.to_string(),
            "error_kind": error.kind(),
        }),
        || eprintln!("Error: {}", error),
    );
    false
}

fn config_path(explicit: Option<&Path>) -> PathBuf {
    explicit.map(PathBuf::from).unwrap_or_else(default_path)
}

fn show_config(ctx: &Context, explicit: Option<&Path>) {
    let path = config_path(explicit);
    if ctx.json {
        ctx.emit(&ctx.config, || {});
        return;
    }

    println!("Current configuration:");
    match toml::to_string_pretty(&ctx.config) {
        Ok(s) => println!("{}", s),
        Err(e) => eprintln!("Error: failed to render config: {}", e),
    }
    if path.exists() {
        println!("Config file: {} (exists)", path.display());
    } else {
        println!("Config file: {} (not found)", path.display());
    }
}

/// Write the commented default config, refusing to overwrite.
fn init_config(explicit: Option<&Path>) -> bool {
    let path = config_path(explicit);

    if path.exists() {
        eprintln!("Config file already exists: {}", path.display());
        eprintln!("Use 'sstv-studio config show' to view current settings.");
        return false;
    }

    if let Some(parent) = path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            eprintln!("Error creating config directory: {}", e);
            return false;
        }
    }

    if let Err(e) = std::fs::write(&path, DEFAULT_CONFIG_TOML) {
        eprintln!("Error writing config file: {}", e);
        return false;
    }

    println!("Created config file: {}", path.display());
    true
}
