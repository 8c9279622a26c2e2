use clap::{Args, Parser, Subcommand, ValueHint};
use std::path::PathBuf;

/// SeaSight pack tooling (argument schema only)
#[derive(Parser, Debug)]
#[command(name = "seapack", version, about, propagate_version = true)]
pub struct Cli {
    /// Increase output verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build a signed forecast pack from gridded sources
    Build(BuildArgs),

    /// Verify a pack directory (signature, part hashes, masks)
    Verify(VerifyArgs),

    /// Rasterize a coastline shapefile into a land-mask sidecar
    Rasterize(RasterizeArgs),
}

#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Region name, e.g. NATL_050
    #[arg(long)]
    pub region: String,

    /// Cycle time as an ISO 8601 UTC instant, e.g. 2025-09-15T12:00:00Z
    #[arg(long)]
    pub cycle: String,

    /// Target grid as lat0/lat1/lon0/lon1/d
    #[arg(long)]
    pub grid: String,

    /// Wind source file (u, v)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub wind: Option<PathBuf>,

    /// Wave source file (hs, tp, dir)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub wave: Option<PathBuf>,

    /// Current source file (water_u, water_v)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub current: Option<PathBuf>,

    /// Coastline polygon shapefile; placeholder land rules when absent
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub coastline: Option<PathBuf>,

    /// Shallow water depth threshold in meters
    #[arg(long, default_value_t = 20.0)]
    pub depth_threshold: f64,

    /// Ed25519 signing key: env:NAME (base64 seed) or a seed file path
    #[arg(long)]
    pub signing_key: String,

    /// Output directory for the pack
    #[arg(long, value_hint = ValueHint::DirPath)]
    pub out: PathBuf,
}

#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Pack directory to verify
    #[arg(value_hint = ValueHint::DirPath)]
    pub pack_dir: PathBuf,

    /// Base64 Ed25519 public key; format-only signature check when absent
    #[arg(long)]
    pub public_key: Option<String>,
}

#[derive(Args, Debug)]
pub struct RasterizeArgs {
    /// Input polygon shapefile (.shp)
    #[arg(value_hint = ValueHint::FilePath)]
    pub shapefile: PathBuf,

    /// Target grid as lat0/lat1/lon0/lon1/d
    #[arg(long)]
    pub grid: String,

    /// Coastal dilation iterations applied to the rasterized mask
    #[arg(long, default_value_t = 0)]
    pub dilate: usize,

    /// Output sidecar path
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    pub output: PathBuf,
}
