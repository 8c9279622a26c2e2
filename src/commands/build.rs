use anyhow::{bail, Context, Result};

use crate::cli::{BuildArgs, Cli};
use crate::grid::Grid;
use crate::ingest::{ingest_source, FlatGridSource, SourceKind, SourceReader};
use crate::manifest::normalize_cycle_iso;
use crate::mask;
use crate::pack::write_pack;
use crate::shapefile::read_polygons_from_path;
use crate::sign::load_signing_key;

pub fn run(cli: &Cli, args: &BuildArgs) -> Result<()> {
    let grid = Grid::parse(&args.grid).context("bad --grid")?;
    let cycle_iso = normalize_cycle_iso(&args.cycle).context("bad --cycle")?;
    // Key is loaded at entry and dropped (zeroized) with this frame.
    let signer = load_signing_key(&args.signing_key)?;

    if cli.verbose > 0 {
        eprintln!(
            "[build] region={} cycle={cycle_iso} grid={}x{} cells",
            args.region,
            grid.rows(),
            grid.cols()
        );
    }

    // Ingest whatever sources were given. A broken source is logged and
    // skipped; the pack is built from the rest.
    let reader = FlatGridSource;
    let mut fields = Vec::new();
    let sources = [
        (SourceKind::Wind, &args.wind),
        (SourceKind::Wave, &args.wave),
        (SourceKind::Current, &args.current),
    ];
    for (kind, path) in sources {
        let Some(path) = path else { continue };
        if cli.verbose > 0 {
            eprintln!("[build] ingesting {} source {}", kind.as_str(), path.display());
        }
        match reader
            .read(path)
            .and_then(|data| ingest_source(kind, &data, &grid))
        {
            Ok(mut ingested) => fields.append(&mut ingested),
            Err(e) => eprintln!("[build] skipping {} source: {e}", kind.as_str()),
        }
    }
    if fields.is_empty() {
        bail!("No data ingested");
    }

    if cli.verbose > 0 {
        eprintln!("[build] generating safety masks");
    }
    let land = match &args.coastline {
        Some(shp) => {
            let polygons = read_polygons_from_path(shp)
                .with_context(|| format!("rasterizing coastline {}", shp.display()))?;
            if cli.verbose > 0 {
                eprintln!("[build] rasterizing {} coastline polygons", polygons.len());
            }
            mask::rasterize(&polygons, &grid)
        }
        None => mask::synth_land(&grid),
    };
    let shallow = mask::synth_shallow(&grid, args.depth_threshold);
    let restricted = mask::synth_restricted(&grid);
    // One-cell coastal safety margin on every mask.
    let masks = [
        ("land", mask::dilate(&land, 1)),
        ("shallow", mask::dilate(&shallow, 1)),
        ("restricted", mask::dilate(&restricted, 1)),
    ];

    if cli.verbose > 0 {
        eprintln!("[build] writing pack to {}", args.out.display());
    }
    let manifest = write_pack(
        &args.out,
        &args.region,
        &cycle_iso,
        grid,
        &fields,
        &masks,
        &signer,
    )?;

    println!(
        "Built pack {} -> {} ({} fields, {} masks)",
        args.region,
        args.out.display(),
        manifest.fields.len(),
        manifest.masks.len()
    );
    Ok(())
}
