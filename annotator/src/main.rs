//! Annotator binary.
//!
use std::{io, path::PathBuf};

use annotator::{
    config::{
        Config, ImageEmbedding, DEFAULT_MAX_LABELS, DEFAULT_MIN_CONFIDENCE, DEFAULT_OUTPUT_DIR,
        DEFAULT_REGION,
    },
    detect::RekognitionDetector,
    menu::{self, Selection},
    pipeline::Pipeline,
    source::{ImageSource, SourceLoader},
};
use anyhow::{bail, Result};
use aws_config::BehaviorVersion;
use aws_sdk_rekognition::config::Region;
use clap::{Parser, Subcommand};
use env_logger::TimestampPrecision;

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Region of the detection and storage services
    #[clap(long, env = "AWS_REGION", default_value = DEFAULT_REGION)]
    region: String,

    /// Directory that receives the annotated images and reports
    #[clap(long, default_value = DEFAULT_OUTPUT_DIR)]
    output_dir: PathBuf,

    /// Write an HTML report next to every annotated image
    #[clap(long)]
    html: bool,

    /// Embed the image into the HTML report instead of linking it
    #[clap(long, requires = "html")]
    inline_image: bool,

    /// TrueType font for the annotations
    #[clap(long)]
    font: Option<PathBuf>,

    /// Maximum number of labels to request per image
    #[clap(long, default_value_t = DEFAULT_MAX_LABELS)]
    max_labels: i32,

    /// Minimum confidence in percent for labels
    #[clap(long, default_value_t = DEFAULT_MIN_CONFIDENCE)]
    min_confidence: f32,

    /// Do not wait for Enter between images in the interactive menu
    #[clap(long)]
    no_pause: bool,

    #[clap(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze the built-in sample images
    Samples,
    /// Analyze local image files
    File {
        #[clap(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Analyze images stored in an S3 bucket
    Bucket {
        bucket: String,
        /// Object key, or "all" for every object in the bucket
        key: String,
    },
}

impl Args {
    fn config(&self) -> Config {
        let html_report = match (self.html, self.inline_image) {
            (false, _) => None,
            (true, false) => Some(ImageEmbedding::Linked),
            (true, true) => Some(ImageEmbedding::Inline),
        };

        Config {
            region: self.region.clone(),
            output_dir: self.output_dir.clone(),
            html_report,
            font: self.font.clone(),
            max_labels: self.max_labels,
            min_confidence: self.min_confidence,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Setup logger
    env_logger::builder()
        .format_timestamp(Some(TimestampPrecision::Millis))
        .init();

    println!("Rekognition visual analysis tool");
    println!("{}", "=".repeat(60));

    let config = args.config();
    log::info!("Using region {}", &config.region);

    // Credentials come from the standard provider chain
    let sdk_config = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(config.region.clone()))
        .load()
        .await;
    let detector =
        RekognitionDetector::new(aws_sdk_rekognition::Client::new(&sdk_config), &config);
    let loader = SourceLoader::new(
        reqwest::Client::new(),
        Some(aws_sdk_s3::Client::new(&sdk_config)),
    );
    let pipeline = Pipeline::from_config(detector, loader, &config);

    let (selections, interactive) = match args.command {
        Some(Command::Samples) => (vec![Selection::Samples], false),
        Some(Command::File { paths }) => (paths.into_iter().map(Selection::File).collect(), false),
        Some(Command::Bucket { bucket, key }) => (vec![Selection::Bucket { bucket, key }], false),
        None => match menu::select(&mut io::stdin().lock(), &mut io::stdout())? {
            Some(selection) => (vec![selection], true),
            None => return Ok(()),
        },
    };

    let mut sources = vec![];
    for selection in selections {
        match selection {
            Selection::Samples => sources.extend(ImageSource::samples()),
            Selection::File(path) => sources.push(ImageSource::File(path)),
            Selection::Bucket { bucket, key } => {
                match pipeline.loader().bucket_sources(&bucket, &key).await {
                    Ok(bucket_sources) => sources.extend(bucket_sources),
                    Err(err) => println!("Error processing image from S3: {err}"),
                }
            }
        }
    }

    let pause = interactive && !args.no_pause;
    let stats = pipeline
        .run(&sources, || {
            if pause {
                if let Err(err) = menu::wait_for_enter(&mut io::stdin().lock(), &mut io::stdout())
                {
                    log::warn!("Failed to read from stdin: {}", err);
                }
            }
        })
        .await;

    println!(
        "\nVisual analysis completed: {} processed, {} failed",
        stats.processed, stats.failed
    );
    println!("Results are in {}", config.output_dir.display());

    if stats.failed > 0 {
        println!("\nPlease check:");
        println!("1. AWS credentials are configured (aws configure)");
        println!("2. You have Rekognition (and S3) permissions");
        println!("3. Internet connection is working (for sample images)");
        println!("4. Your input is correct (image paths, S3 bucket/key)");
    }
    if stats.processed == 0 {
        bail!("no image could be analyzed");
    }

    Ok(())
}
