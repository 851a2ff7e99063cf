use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::outline::{DEFAULT_SIMILARITY_CUTOFF, PipelineConfig};

#[derive(Parser, Debug)]
#[command(
    name = "pdf-outline",
    version,
    about = "Infer titles and heading outlines from PDF documents"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Outline(OutlineArgs),
    Annotate(AnnotateArgs),
    Predict(PredictArgs),
    Batch(BatchArgs),
    Features(FeaturesArgs),
    Chunk(ChunkArgs),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum MarkdownSource {
    Structural,
    Layout,
}

impl MarkdownSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Structural => "structural",
            Self::Layout => "layout",
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct PipelineArgs {
    #[arg(long, value_enum, default_value_t = MarkdownSource::Structural)]
    pub markdown_source: MarkdownSource,

    #[arg(long, default_value_t = DEFAULT_SIMILARITY_CUTOFF)]
    pub similarity_cutoff: f64,

    #[arg(long)]
    pub max_pages: Option<usize>,
}

impl PipelineArgs {
    pub fn config(&self) -> PipelineConfig {
        PipelineConfig {
            markdown_source: self.markdown_source,
            similarity_cutoff: self.similarity_cutoff,
            max_pages: self.max_pages,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct OutlineArgs {
    #[arg(long)]
    pub pdf: PathBuf,

    #[arg(long)]
    pub model: PathBuf,

    #[arg(long)]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub pipeline: PipelineArgs,
}

#[derive(Args, Debug, Clone)]
pub struct AnnotateArgs {
    #[arg(long)]
    pub input_dir: PathBuf,

    #[arg(long)]
    pub output_dir: PathBuf,

    #[command(flatten)]
    pub pipeline: PipelineArgs,
}

#[derive(Args, Debug, Clone)]
pub struct PredictArgs {
    #[arg(long)]
    pub model: PathBuf,

    #[arg(long)]
    pub annotated_dir: PathBuf,

    #[arg(long)]
    pub output_dir: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct BatchArgs {
    #[arg(long)]
    pub input_dir: PathBuf,

    #[arg(long)]
    pub output_dir: PathBuf,

    #[arg(long)]
    pub model: PathBuf,

    #[arg(long)]
    pub manifest_path: Option<PathBuf>,

    #[command(flatten)]
    pub pipeline: PipelineArgs,
}

#[derive(Args, Debug, Clone)]
pub struct FeaturesArgs {
    #[arg(long)]
    pub input_dir: PathBuf,

    #[arg(long)]
    pub output_dir: PathBuf,

    #[arg(long)]
    pub max_pages: Option<usize>,
}

#[derive(Args, Debug, Clone)]
pub struct ChunkArgs {
    #[arg(long)]
    pub pdf: PathBuf,

    #[arg(long)]
    pub model: PathBuf,

    #[arg(long)]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub pipeline: PipelineArgs,
}
