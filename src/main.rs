use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tsunagi::compositor::DEFAULT_JPEG_QUALITY;
use tsunagi::{BatchReport, DocumentMetadata, DocumentReport, GroupStatus, TsunagiConfig};

#[derive(Parser)]
#[command(name = "tsunagi")]
#[command(about = "Group images by filename and join each group side by side")]
#[command(long_about = "\
Group images by filename and join each group side by side

Files named <key>_<number>.<ext> (jpg, jpeg, png, gif, bmp, tiff) that share a
key are joined left to right in numeric order and saved as <key>.jpg:

  source/
  ├── shop1_1.png        ─┐
  ├── shop1_2.png         ├─ output/shop1.jpg
  ├── shop1_10.png       ─┘
  ├── shop2_1.jpg        ── output/shop2.jpg
  └── notes.txt          (ignored)

Animated GIFs contribute their first frame. Set RUST_LOG=debug to see every
skipped file.")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Join every filename group of a directory into one image per group
    Stitch {
        /// Directory holding the images to group
        #[arg(long)]
        source: PathBuf,

        /// Directory receiving <key>.jpg files
        #[arg(long)]
        output: PathBuf,

        /// JPEG quality of the written composites (1-100)
        #[arg(long, default_value_t = DEFAULT_JPEG_QUALITY)]
        quality: u8,

        /// Custom filename pattern with named captures `key` and `index`
        #[arg(long)]
        pattern: Option<String>,

        /// Fail instead of creating the output directory when it is missing
        #[arg(long)]
        no_create_output: bool,
    },
    /// Compile a directory of images into an EPUB with one numbered title per page
    Document {
        /// Directory holding the images, taken in file-name order
        #[arg(long)]
        images: PathBuf,

        /// Directory receiving <title>.epub
        #[arg(long)]
        output: PathBuf,

        /// Document title, also used as the file name
        #[arg(long)]
        title: String,

        /// Author (repeatable)
        #[arg(long = "author")]
        authors: Vec<String>,

        /// Language code of the document
        #[arg(long, default_value = "en")]
        language: String,

        /// JPEG quality of the embedded images (1-100)
        #[arg(long, default_value_t = DEFAULT_JPEG_QUALITY)]
        quality: u8,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Command::Stitch {
            source,
            output,
            quality,
            pattern,
            no_create_output,
        } => {
            let mut builder = TsunagiConfig::builder();
            builder
                .source_path(source)
                .target_path(output)
                .output_quality(quality)
                .create_output_directory(!no_create_output);
            if let Some(pattern) = pattern {
                builder.group_name_regex_str(pattern);
            }
            let config = builder.build()?;

            let report = config.stitch_from_source().await?;
            print_batch_report(&report, &config);
        }
        Command::Document {
            images,
            output,
            title,
            authors,
            language,
            quality,
        } => {
            let config = TsunagiConfig::builder()
                .target_path(output)
                .output_quality(quality)
                .metadata(DocumentMetadata {
                    title,
                    authors,
                    language,
                    ..Default::default()
                })
                .build()?;

            let report = config.compile_document(&images).await?;
            print_document_report(&report);
        }
    }

    Ok(())
}

fn print_batch_report(report: &BatchReport, config: &TsunagiConfig) {
    if report.is_noop() {
        println!("No images named like <key>_<number>.<ext> were found; nothing to do.");
        return;
    }

    for group in &report.groups {
        match &group.status {
            GroupStatus::Stitched {
                output_path,
                width,
                height,
                images_used,
            } => println!(
                "ok    {} ({} images, {}x{}) -> {}",
                group.key,
                images_used,
                width,
                height,
                output_path.display()
            ),
            GroupStatus::NoUsableImages => println!("fail  {}: no usable images", group.key),
            GroupStatus::CompositeFailed(reason) => println!("fail  {}: {}", group.key, reason),
            GroupStatus::WriteFailed { reason, .. } => println!("fail  {}: {}", group.key, reason),
        }
        for failure in &group.decode_failures {
            println!("      skipped {}: {}", failure.path.display(), failure.reason);
        }
    }

    if report.succeeded() > 0 {
        println!(
            "\nStitched {} of {} groups into {}",
            report.succeeded(),
            report.groups.len(),
            config.target_path.display()
        );
    } else {
        println!("\nNo group could be stitched.");
    }
}

fn print_document_report(report: &DocumentReport) {
    for failure in &report.failures {
        println!("skipped {}: {}", failure.path.display(), failure.reason);
    }
    match &report.output_path {
        Some(path) => println!("Wrote {} pages to {}", report.pages.len(), path.display()),
        None => println!("No images could be added; no document written."),
    }
}
