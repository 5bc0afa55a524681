//! The annotation pipeline.
//!
//! Every image runs through the same sequence: acquire bytes, validate, detect, render, persist.
//! Images are processed one after another. A failure aborts only the current image.
use std::path::PathBuf;

use common::Analysis;

use crate::{
    config::{Config, ImageEmbedding},
    detect::{analyze, decode_image, Detector},
    error::Result,
    font::load_font,
    output::{encode_png, OutputWriter},
    render::Renderer,
    report::{console_summary, html_report, ReportImage},
    source::{ImageSource, SourceLoader},
};

/// Artifacts produced for one image.
#[derive(Debug)]
pub struct Outcome {
    pub name: String,
    pub analysis: Analysis,
    pub image_path: PathBuf,
    pub json_path: PathBuf,
    pub report_path: Option<PathBuf>,
}

/// Tally of a batch run.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct RunStats {
    pub processed: usize,
    pub failed: usize,
}

pub struct Pipeline<D> {
    detector: D,
    loader: SourceLoader,
    renderer: Renderer,
    writer: OutputWriter,
    html_report: Option<ImageEmbedding>,
}

impl<D: Detector> Pipeline<D> {
    pub fn new(detector: D, loader: SourceLoader, renderer: Renderer, writer: OutputWriter) -> Self {
        Self {
            detector,
            loader,
            renderer,
            writer,
            html_report: None,
        }
    }

    /// Build a pipeline with the font and output settings of `config`.
    pub fn from_config(detector: D, loader: SourceLoader, config: &Config) -> Self {
        let renderer = Renderer::new(load_font(config.font.as_deref()));
        let writer = OutputWriter::new(&config.output_dir);

        Self::new(detector, loader, renderer, writer).with_html_report(config.html_report)
    }

    /// Also write an HTML report for every image.
    pub fn with_html_report(mut self, embedding: Option<ImageEmbedding>) -> Self {
        self.html_report = embedding;
        self
    }

    pub fn loader(&self) -> &SourceLoader {
        &self.loader
    }

    /// Run a single image through the pipeline.
    pub async fn process(&self, source: &ImageSource) -> Result<Outcome> {
        let name = source.name();

        let bytes = self.loader.load(source).await?;
        // Decoding first rejects bad input before any remote call
        let image = decode_image(&bytes)?;
        log::debug!("Decoded {} ({}x{})", name, image.width(), image.height());

        let analysis = analyze(&self.detector, &bytes).await?;
        let rendered = self.renderer.render(&image, &analysis)?;

        let png = encode_png(&rendered)?;
        let image_path = self.writer.write_image(&name, &png)?;
        let json_path = self.writer.write_json(&name, &analysis)?;

        let report_path = match self.html_report {
            Some(embedding) => {
                let linked_name = image_path
                    .file_name()
                    .map(|file| file.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let image_ref = match embedding {
                    ImageEmbedding::Inline => ReportImage::Inline(&png),
                    ImageEmbedding::Linked => ReportImage::Linked(&linked_name),
                };
                let html = html_report(&name, &analysis, image_ref);
                Some(self.writer.write_html(&name, &html)?)
            }
            None => None,
        };

        Ok(Outcome {
            name,
            analysis,
            image_path,
            json_path,
            report_path,
        })
    }

    /// Process all sources in order, reporting each result to the user.
    ///
    /// `between` is called before every image except the first one, e.g. to wait for the user.
    pub async fn run<F: FnMut()>(&self, sources: &[ImageSource], mut between: F) -> RunStats {
        let mut stats = RunStats::default();

        for (i, source) in sources.iter().enumerate() {
            if i > 0 {
                between();
            }

            println!("\nAnalyzing {source}");
            match self.process(source).await {
                Ok(outcome) => {
                    println!("{}", console_summary(&outcome.name, &outcome.analysis));
                    println!("Saved visualization: {}", outcome.image_path.display());
                    println!("Saved results: {}", outcome.json_path.display());
                    if let Some(report) = &outcome.report_path {
                        println!("Saved report: {}", report.display());
                    }
                    stats.processed += 1;
                }
                Err(err) => {
                    log::debug!("Processing {} failed: {:?}", source, err);
                    println!("Error processing {source}: {err}");
                    stats.failed += 1;
                }
            }
        }

        log::info!(
            "Processed {} images, {} failed",
            stats.processed,
            stats.failed
        );
        stats
    }
}
