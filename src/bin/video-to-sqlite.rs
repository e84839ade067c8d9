use std::path::PathBuf;

use clap::Parser;
use colored::Colorize;
use env_logger::Builder;
use image::DynamicImage;
use indicatif::{ProgressBar, ProgressStyle};
use log::LevelFilter;
use serde_json::json;
use video_to_sqlite::{
    Fields, FrameRecord, IngestOptions, IngestSummary, PixelFormat, pixel_statistics,
};

const CLI_AFTER_HELP: &str = "Examples:\n  video-to-sqlite videos.db my_video.mp4\n  video-to-sqlite videos.db my_video.mp4 --prefix my_\n  video-to-sqlite videos.db my_video.mp4 --pixel-stats --progress";

/// Load data about frames from a video into SQLite.
///
/// Created tables are named `videos` and `frames`; use --prefix my_ to get
/// `my_videos` and `my_frames` instead.
#[derive(Debug, Parser)]
#[command(name = "video-to-sqlite", version, after_help = CLI_AFTER_HELP)]
struct Cli {
    /// SQLite database file to create or update.
    db_path: PathBuf,

    /// Video file to ingest.
    video_file: PathBuf,

    /// Prefix to use for the created database tables.
    #[arg(long, default_value = "")]
    prefix: String,

    /// Decode every frame and add max/min/mean pixel value columns.
    #[arg(long)]
    pixel_stats: bool,

    /// Pixel format used when decoding frames (rgb8, rgba8, gray8).
    #[arg(long)]
    pixel_format: Option<String>,

    /// ffprobe program to run instead of the one on PATH.
    #[arg(long)]
    ffprobe: Option<PathBuf>,

    /// Show a spinner while frames are decoded.
    #[arg(long)]
    progress: bool,

    /// Print the ingestion summary as JSON.
    #[arg(long)]
    json: bool,

    /// Show additional logging output.
    #[arg(long)]
    verbose: bool,
}

fn parse_pixel_format(value: &str) -> Option<PixelFormat> {
    match value.to_ascii_lowercase().as_str() {
        "rgb8" | "rgb" => Some(PixelFormat::Rgb8),
        "rgba8" | "rgba" => Some(PixelFormat::Rgba8),
        "gray8" | "gray" | "greyscale" | "grayscale" => Some(PixelFormat::Gray8),
        _ => None,
    }
}

fn init_logging(verbose: bool) {
    let mut builder = Builder::from_default_env();
    if verbose {
        builder.filter_level(LevelFilter::Debug);
    }
    builder.init();
}

fn build_options(cli: &Cli) -> Result<IngestOptions, Box<dyn std::error::Error>> {
    let mut options = IngestOptions::new().with_prefix(cli.prefix.clone());
    if let Some(program) = &cli.ffprobe {
        options = options.with_ffprobe(program.clone());
    }
    if let Some(value) = &cli.pixel_format {
        let format =
            parse_pixel_format(value).ok_or(format!("unsupported --pixel-format: {value}"))?;
        options = options.with_pixel_format(format);
    }
    Ok(options)
}

fn print_summary(summary: &IngestSummary, options: &IngestOptions, as_json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let video = &summary.video;
    if as_json {
        let payload = json!({
            "videos_table": options.videos_table(),
            "frames_table": options.frames_table(),
            "video": {
                "filename": video.filename,
                "duration": video.duration,
                "bitrate": video.bitrate,
                "codec": video.codec,
                "pixel_format": video.pixel_format,
                "resolution": video.resolution,
                "framerate": video.frames_per_second()?,
            },
            "frame_rows": summary.frame_rows,
            "enriched_frames": summary.enriched_frames,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        println!(
            "{} {}",
            "success:".green().bold(),
            format!(
                "{} ({} {} @ {} fps, {}) -> {} frame row(s) in {}",
                video.filename,
                video.codec,
                video.resolution,
                video.framerate,
                video.duration,
                summary.frame_rows,
                options.frames_table()
            )
            .green()
        );
    }
    Ok(())
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let options = build_options(&cli)?;

    if cli.pixel_format.is_some() && !cli.pixel_stats {
        eprintln!(
            "{} {}",
            "warning:".yellow().bold(),
            "--pixel-format only applies together with --pixel-stats".yellow()
        );
    }

    let summary = if cli.pixel_stats {
        let progress_bar = if cli.progress {
            let pb = ProgressBar::new_spinner();
            pb.set_style(ProgressStyle::with_template("{spinner:.green} {pos} frame(s) {msg}")?);
            Some(pb)
        } else {
            None
        };

        let mut callback = |frame: &DynamicImage, record: &FrameRecord| -> Fields {
            if let Some(pb) = &progress_bar {
                pb.inc(1);
            }
            pixel_statistics(frame, record)
        };
        let summary = video_to_sqlite::ingest_with_callback(
            &cli.db_path,
            &cli.video_file,
            &options,
            &mut callback,
        )?;

        if let Some(pb) = progress_bar {
            pb.finish_with_message("decoded");
        }
        summary
    } else {
        video_to_sqlite::ingest(&cli.db_path, &cli.video_file, &options)?
    };

    print_summary(&summary, &options, cli.json)
}

fn main() {
    if let Err(error) = run() {
        eprintln!("{} {error}", "error:".red().bold());
        std::process::exit(1);
    }
}
