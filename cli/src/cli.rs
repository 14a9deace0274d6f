use std::path::PathBuf;

/// Historical redlining grades apportioned onto census tracts
#[derive(clap::Parser, Debug)]
#[command(name = "redline", version, about, propagate_version = true)]
pub struct Cli {
    /// Increase output verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Compute per-tract grade coverage from two shapefiles (forbids stdout)
    Apportion(ApportionArgs),

    /// Run the full study described by a JSON config (forbids stdout)
    Study(StudyArgs),
}

/// Mirrors `redline::OverlayMode` for the command line.
#[derive(clap::ValueEnum, Clone, Copy, Debug, Default)]
pub enum Overlay {
    /// Sum overlaps region by region; overlapping regions count twice
    #[default]
    Summed,
    /// Union each grade's regions first
    Dissolved,
}

impl From<Overlay> for redline::OverlayMode {
    fn from(overlay: Overlay) -> Self {
        match overlay {
            Overlay::Summed => redline::OverlayMode::Summed,
            Overlay::Dissolved => redline::OverlayMode::Dissolved,
        }
    }
}

#[derive(clap::Args, Debug)]
pub struct ApportionArgs {
    /// Census tract shapefile (.shp)
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub tracts: PathBuf,

    /// Historical grade shapefile (.shp)
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub grades: PathBuf,

    /// Output coverage file, defaults to "./coverage.csv"
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub output: Option<PathBuf>,

    /// Tract id attribute
    #[arg(long, default_value = "GEO_ID")]
    pub id_field: String,

    /// Grade label attribute
    #[arg(long, default_value = "holc_grade")]
    pub grade_field: String,

    /// How same-grade regions are combined
    #[arg(long, value_enum, default_value_t = Overlay::Summed)]
    pub overlay: Overlay,

    /// Overwrite the output file if it exists
    #[arg(long)]
    pub force: bool,
}

#[derive(clap::Args, Debug)]
pub struct StudyArgs {
    /// Study configuration (JSON)
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Output study table, defaults to "./study.csv"
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub output: Option<PathBuf>,

    /// Overwrite the output file if it exists
    #[arg(long)]
    pub force: bool,
}
