//! meshtile CLI - cut an OBJ mesh into quadtree/octree tiles.
//!
//! Usage: meshtile [OPTIONS] <INPUT> <OUTPUT_DIR>
//!
//! Tiles are written as `tile_L{lod}_{index}.obj` with a material library
//! next to each tile when the source has materials.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use meshtile::prelude::*;

#[derive(Parser, Debug)]
#[command(name = "meshtile")]
#[command(author, version, about = "Spatial mesh tiler with quadric decimation", long_about = None)]
struct Cli {
    /// Input OBJ file
    input: PathBuf,

    /// Directory that receives the tiles
    output: PathBuf,

    /// Number of subdivision levels
    #[arg(short, long, default_value = "2")]
    depth: u32,

    /// Subdivide along Z as well (octree instead of quadtree)
    #[arg(long)]
    octree: bool,

    /// Comma separated triangle ratios, one per LOD level
    #[arg(long, value_delimiter = ',', default_value = "1.0")]
    lods: Vec<f64>,

    /// Decimate the whole mesh to this many triangles before tiling
    #[arg(long, conflicts_with = "lossless_tiles")]
    decimate_before: Option<isize>,

    /// Remove redundant geometry from every tile before building LODs
    #[arg(long)]
    lossless_tiles: bool,

    /// Never collapse edges on open borders
    #[arg(long)]
    preserve_borders: bool,

    /// How fast the collapse threshold grows between passes
    #[arg(long, default_value = "7.0")]
    aggressiveness: f64,

    /// Number of worker threads (default: one per core)
    #[arg(short, long)]
    threads: Option<usize>,

    /// Skip writing material libraries
    #[arg(long)]
    no_materials: bool,

    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn job_config(&self) -> TilingJobConfig {
        let mode = if self.octree {
            TilingMode::Octree
        } else {
            TilingMode::Quadtree
        };
        let decimation = match (self.decimate_before, self.lossless_tiles) {
            (Some(target), _) => DecimationStage::BeforeTiling(target),
            (None, true) => DecimationStage::PerTile,
            (None, false) => DecimationStage::None,
        };
        let decimator = DecimatorOptions::default()
            .with_preserve_borders(self.preserve_borders)
            .with_aggressiveness(self.aggressiveness);

        let mut config = TilingJobConfig::default()
            .with_mode(mode)
            .with_depth(self.depth)
            .with_decimation(decimation)
            .with_lod_ratios(self.lods.clone())
            .with_decimator(decimator);
        if let Some(threads) = self.threads {
            config = config.with_threads(threads);
        }
        config
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn write_tiles(output: &JobOutput, dir: &Path, options: &ObjWriteOptions) -> anyhow::Result<usize> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

    for tile in &output.tiles {
        let path = dir.join(format!("tile_L{}_{}.obj", tile.lod, tile.index));
        ObjWriter::write_mesh_with_options(&tile.mesh, &path, options)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        debug!(
            path = %path.display(),
            triangles = tile.mesh.face_count(),
            "Wrote tile"
        );
    }
    Ok(output.tiles.len())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let start = Instant::now();
    let mesh = read_mesh(&cli.input)
        .with_context(|| format!("Failed to load {}", cli.input.display()))?;
    info!(
        path = %cli.input.display(),
        vertices = mesh.vertex_count(),
        triangles = mesh.face_count(),
        materials = mesh.materials.len(),
        "Loaded mesh"
    );

    let job = TilingJob::new(cli.job_config());
    let output = job.run(&mesh, &CancellationToken::new())?;

    let options = ObjWriteOptions::default().with_write_materials(!cli.no_materials);
    let written = write_tiles(&output, &cli.output, &options)?;

    info!(
        tiles = written,
        leaves = output.stats.leaves,
        triangles = output.stats.output_triangles,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Done"
    );
    Ok(())
}
