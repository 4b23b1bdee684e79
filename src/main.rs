use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use cv_pom::config::{load_config_from, load_config_or_default};
use cv_pom::perception::annotator::annotate;
use cv_pom::perception::yolo_detector::YoloDetector;
use cv_pom::query::match_elements;
use cv_pom::{init_tracing, CvPomResult, ElementRegistry, Perception, Query};

#[derive(Parser)]
#[command(name = "cv-pom")]
#[command(about = "Detect UI elements in an image and print them as JSON")]
#[command(version)]
struct Cli {
    /// ONNX YOLOv8 model (overrides [detector].model_path)
    #[arg(long)]
    model: Option<PathBuf>,
    /// Screenshot to analyse
    #[arg(long)]
    media: PathBuf,
    /// JSON query used to filter the elements, e.g. '{"label": "button"}'
    #[arg(long)]
    query: Option<String>,
    /// Write an annotated copy of the image to this path
    #[arg(long, value_name = "OUT")]
    annotate: Option<PathBuf>,
    /// Config file (default: cv_pom.toml lookup)
    #[arg(long)]
    config: Option<PathBuf>,
}

fn run(cli: Cli) -> CvPomResult<()> {
    let mut config = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config_or_default()?,
    };
    if let Some(model) = cli.model {
        config.detector.model_path = Some(model);
    }
    let query = cli.query.as_deref().map(Query::parse).transpose()?;

    let detector = YoloDetector::from_config(&config.detector)?;
    let image = image::open(&cli.media)?;
    let mut perception = Perception::new(Box::new(detector), config.registry.clone());
    let registry = perception.build_registry(&image, false)?;

    let registry = match &query {
        Some(q) => ElementRegistry::from_elements(match_elements(&registry, q).cloned().collect()),
        None => registry,
    };

    if let Some(out) = &cli.annotate {
        annotate(&image, &registry, &config.registry.text_label).save(out)?;
        tracing::info!(path = %out.display(), "annotated image written");
    }

    if registry.is_empty() {
        println!("No object was found in the image: {}", cli.media.display());
    } else {
        println!("{}", registry.to_json_pretty()?);
    }
    Ok(())
}

fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    init_tracing();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "cv-pom failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
