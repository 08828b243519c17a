//! inshad - Main entry point
//!
//! CLI host composing the two core components: the conversion job
//! controller and the rhythm preview engine. The host owns the shared
//! selections (style, rhythm, tempo) and wires events to the terminal.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio::signal;
use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use inshad::api::{ApiClient, Session, VoiceQuery};
use inshad::job::JobController;
use inshad::preview::{paint, render, PreviewEngine};
use inshad_common::api::{GenerateRequest, SubmitTextRequest};
use inshad_common::config::{Settings, TomlConfig};
use inshad_common::events::{ConvertEvent, EventBus};

/// Default tempo for preview when neither the user nor a style supplies one
const DEFAULT_PREVIEW_BPM: u32 = 96;

/// Waveform height in terminal rows
const WAVEFORM_ROWS: usize = 9;

/// Command-line arguments for inshad
#[derive(Parser, Debug)]
#[command(name = "inshad")]
#[command(about = "Client and rhythm preview for the inshad conversion service")]
#[command(version)]
struct Cli {
    /// Remote API base URL
    #[arg(long, env = "INSHAD_API_URL", global = true)]
    api_url: Option<String>,

    /// Session token for authenticated endpoints
    #[arg(long, env = "INSHAD_TOKEN", global = true, hide_env_values = true)]
    token: Option<String>,

    /// TOML config file (defaults to the platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List catalog entries
    Catalog {
        #[command(subcommand)]
        what: CatalogKind,
    },

    /// Draw a rhythm's waveform and play it as a metronome
    Preview {
        /// Rhythm key from the catalog
        rhythm: String,

        /// Beats per minute (clamped to the playable range)
        #[arg(long)]
        tempo: Option<u32>,

        /// Playback length in seconds (0 = draw only)
        #[arg(long, default_value_t = 8)]
        seconds: u64,
    },

    /// Convert a poem into synthesized audio
    Convert(ConvertArgs),
}

#[derive(Subcommand, Debug)]
enum CatalogKind {
    Styles,
    Schools,
    Rhythms {
        /// Restrict to one school
        #[arg(long)]
        school: Option<String>,
    },
    Voices {
        #[arg(long, default_value = "elevenlabs")]
        provider: String,

        /// Dialect filter (elevenlabs only)
        #[arg(long)]
        dialect: Option<String>,

        /// List voices for all languages, not just Arabic
        #[arg(long)]
        all_langs: bool,
    },
}

#[derive(Args, Debug)]
struct ConvertArgs {
    /// Poem text file (UTF-8)
    #[arg(long, short)]
    input: PathBuf,

    /// Poem title (defaults to the input file name)
    #[arg(long, default_value = "")]
    title: String,

    /// Cultural style key
    #[arg(long, default_value = "najdi")]
    style: String,

    /// Rhythm key; defaults to the first suggestion for the detected meter
    #[arg(long)]
    rhythm: Option<String>,

    /// Voice id from the voices catalog
    #[arg(long, default_value = "male_01")]
    voice: String,

    #[arg(long, default_value = "elevenlabs")]
    voice_provider: String,

    /// Vocal delivery mode
    #[arg(long, default_value = "حماسي")]
    vocal_mode: String,

    /// Beats per minute; defaults to the style's default tempo
    #[arg(long)]
    tempo: Option<u32>,

    /// Skip the percussion track
    #[arg(long)]
    no_percussion: bool,

    /// Mix generated background music into the result
    #[arg(long)]
    music: bool,

    #[arg(long, default_value = "sunoapi")]
    music_provider: String,

    /// Background music level in dB
    #[arg(long, default_value_t = -10.0, allow_negative_numbers = true)]
    music_volume_db: f64,

    /// Output audio file
    #[arg(long, short)]
    output: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => TomlConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => TomlConfig::load_default().context("Failed to load config")?,
    };
    let settings = Settings::resolve(cli.api_url.clone(), cli.token.clone(), &config);

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| settings.log_filter.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let client = ApiClient::new(
        settings.api_base_url.clone(),
        Session::new(settings.token.clone()),
    )
    .context("Failed to create API client")?;

    match cli.command {
        Command::Catalog { what } => run_catalog(&client, what).await,
        Command::Preview {
            rhythm,
            tempo,
            seconds,
        } => run_preview(&client, &rhythm, tempo, seconds).await,
        Command::Convert(args) => run_convert(&client, args).await,
    }
}

async fn run_catalog(client: &ApiClient, what: CatalogKind) -> Result<()> {
    match what {
        CatalogKind::Styles => {
            for style in client.styles().await.context("Failed to load styles")? {
                println!(
                    "{:<12} {:>3} BPM  {}",
                    style.key, style.default_tempo, style.name_ar
                );
            }
        }
        CatalogKind::Schools => {
            for school in client.schools().await.context("Failed to load schools")? {
                println!("{:<12} {}", school.key, school.name_ar);
            }
        }
        CatalogKind::Rhythms { school } => {
            let rhythms = client
                .rhythms(school.as_deref())
                .await
                .context("Failed to load rhythms")?;
            for rhythm in rhythms {
                println!(
                    "{:<12} {:<6} {}  [{}]",
                    rhythm.rhythm_key,
                    rhythm.pattern_json.time_signature,
                    rhythm.name_ar,
                    rhythm.recommended_buhur.join(", ")
                );
            }
        }
        CatalogKind::Voices {
            provider,
            dialect,
            all_langs,
        } => {
            let query = VoiceQuery {
                provider,
                dialect,
                lang: if all_langs { "all" } else { "ar" }.to_string(),
                ..VoiceQuery::default()
            };
            let voices = client
                .voices(&query)
                .await
                .context("Failed to load voices (a session token is required)")?;
            for voice in voices {
                println!("{:<24} {:<12} {}", voice.voice_id, voice.category, voice.name);
            }
        }
    }
    Ok(())
}

async fn run_preview(
    client: &ApiClient,
    rhythm_key: &str,
    tempo: Option<u32>,
    seconds: u64,
) -> Result<()> {
    let template = client
        .find_rhythm(rhythm_key)
        .await
        .context("Failed to load rhythms")?
        .with_context(|| format!("Rhythm '{}' not found in catalog", rhythm_key))?;
    let pattern = template.pattern_json.clone();

    println!(
        "{} / {} ({})",
        template.rhythm_key, template.name_ar, pattern.time_signature
    );
    for line in paint(&render(&pattern), WAVEFORM_ROWS) {
        println!("{}", line);
    }

    if pattern.is_empty() {
        println!("(free meter: nothing to play)");
        return Ok(());
    }
    if seconds == 0 {
        return Ok(());
    }

    let tempo = tempo.unwrap_or(DEFAULT_PREVIEW_BPM);
    let engine = PreviewEngine::new(pattern, tempo);
    engine.start().await.context("Failed to start playback")?;
    println!("Playing at {} BPM for {}s (Ctrl+C to stop)...", tempo, seconds);

    tokio::select! {
        _ = tokio::time::sleep(Duration::from_secs(seconds)) => {}
        _ = signal::ctrl_c() => {}
    }
    engine.stop();
    Ok(())
}

async fn run_convert(client: &ApiClient, args: ConvertArgs) -> Result<()> {
    if !client.session().has_token() {
        bail!("A session token is required (pass --token or set INSHAD_TOKEN)");
    }

    let text = tokio::fs::read_to_string(&args.input)
        .await
        .with_context(|| format!("Cannot read {}", args.input.display()))?;
    let title = if args.title.is_empty() {
        args.input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    } else {
        args.title.clone()
    };

    let submission = client
        .submit_text(&SubmitTextRequest { text, title })
        .await
        .context("Text submission failed")?;
    println!(
        "Detected meter: {} ({:.0}% confidence)",
        submission.meter_guess,
        submission.meter_confidence * 100.0
    );
    for suggestion in &submission.suggested_rhythms {
        println!(
            "  suggested rhythm: {} ({})",
            suggestion.rhythm_key, suggestion.reason
        );
    }

    let rhythm_key = match args.rhythm.clone() {
        Some(key) => key,
        None => submission
            .suggested_rhythms
            .first()
            .map(|s| s.rhythm_key.clone())
            .context("No rhythm given and the server suggested none; pass --rhythm")?,
    };

    let tempo = match args.tempo {
        Some(tempo) => tempo,
        None => {
            let styles = client.styles().await.context("Failed to load styles")?;
            styles
                .iter()
                .find(|s| s.key == args.style)
                .map(|s| s.default_tempo)
                .with_context(|| format!("Style '{}' not found in catalog", args.style))?
        }
    };

    let request = GenerateRequest {
        submission_id: submission.id.clone(),
        style_key: args.style.clone(),
        rhythm_key,
        voice_actor: args.voice.clone(),
        voice_provider: args.voice_provider.clone(),
        vocal_mode: args.vocal_mode.clone(),
        tempo,
        add_percussion: !args.no_percussion,
        add_music: args.music,
        music_provider: if args.music {
            args.music_provider.clone()
        } else {
            "none".to_string()
        },
        music_volume_db: args.music_volume_db,
    };

    let events = EventBus::new(100);
    let controller = JobController::new(Arc::new(client.clone()), events);
    let mut rx = controller.subscribe();

    let handle = controller.submit(request).await?;
    println!("Job {} queued; polling...", handle.job_id);

    loop {
        tokio::select! {
            _ = signal::ctrl_c() => {
                controller.cancel();
                println!("Cancelled; the remote job keeps running without us.");
                return Ok(());
            }
            event = rx.recv() => match event {
                Ok(ConvertEvent::JobStatusChanged { status, .. }) => {
                    println!("  status: {}", status);
                }
                Ok(ConvertEvent::JobSucceeded { audio, .. }) => {
                    tokio::fs::write(&args.output, audio.as_slice())
                        .await
                        .with_context(|| format!("Cannot write {}", args.output.display()))?;
                    println!("Saved {} ({} bytes)", args.output.display(), audio.len());
                    return Ok(());
                }
                Ok(ConvertEvent::JobFailed { failure, .. }) => bail!("{}", failure),
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => {
                    bail!("Event stream closed unexpectedly")
                }
            }
        }
    }
}
