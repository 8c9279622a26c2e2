use anyhow::{Context, Result};

use crate::cli::{Cli, RasterizeArgs};
use crate::grid::Grid;
use crate::mask::{dilate, rasterize, write_sidecar};
use crate::shapefile::read_polygons_from_path;

pub fn run(cli: &Cli, args: &RasterizeArgs) -> Result<()> {
    let grid = Grid::parse(&args.grid).context("bad --grid")?;
    let polygons = read_polygons_from_path(&args.shapefile)
        .with_context(|| format!("reading {}", args.shapefile.display()))?;
    if cli.verbose > 0 {
        eprintln!(
            "[rasterize] {} polygons onto {}x{} cells",
            polygons.len(),
            grid.rows(),
            grid.cols()
        );
    }

    let mut mask = rasterize(&polygons, &grid);
    if args.dilate > 0 {
        mask = dilate(&mask, args.dilate);
    }
    write_sidecar(&args.output, &grid, &mask)?;

    let land_cells = mask.iter().filter(|&&v| v != 0).count();
    println!(
        "Wrote {}x{} mask ({land_cells} land cells) -> {}",
        grid.rows(),
        grid.cols(),
        args.output.display()
    );
    Ok(())
}
