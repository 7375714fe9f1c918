//! Batch tiling jobs
//!
//! A job takes one source mesh through the whole pipeline: optional
//! decimation of the root, recursive tiling, optional lossless cleanup of
//! each leaf, and LOD generation per leaf. Jobs can run on a dedicated rayon
//! pool and are cancellable at every tiling level.

use meshtile_core::{BoundingBox, Error, Mesh, Result};
use meshtile_simplification::{
    build_lod_levels, decimate_mesh, decimate_mesh_lossless, generate_lods, DecimatorOptions,
};
use meshtile_tiling::{recurse_split, CancellationToken, TileCollector, TilingMode};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Where decimation happens in a job, besides LOD generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DecimationStage {
    /// Tiles are cut from the source mesh as is
    #[default]
    None,
    /// Decimate the whole mesh to this many triangles before tiling
    BeforeTiling(isize),
    /// Run lossless decimation on every leaf before its LODs are built
    PerTile,
}

/// Thread pool configuration for a job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadPoolConfig {
    /// Number of threads to use (None = rayon's default)
    pub num_threads: Option<usize>,
    pub thread_name_prefix: String,
}

impl Default for ThreadPoolConfig {
    fn default() -> Self {
        Self {
            num_threads: None,
            thread_name_prefix: "meshtile".to_string(),
        }
    }
}

impl ThreadPoolConfig {
    pub fn with_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = Some(num_threads);
        self
    }

    pub fn with_thread_name_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    pub fn build(&self) -> Result<ThreadPool> {
        let mut builder = ThreadPoolBuilder::new();

        if let Some(num_threads) = self.num_threads {
            builder = builder.num_threads(num_threads);
        }

        if !self.thread_name_prefix.is_empty() {
            let prefix = self.thread_name_prefix.clone();
            builder = builder.thread_name(move |index| format!("{}-{}", prefix, index));
        }

        builder
            .build()
            .map_err(|e| Error::Algorithm(format!("Failed to create thread pool: {}", e)))
    }
}

/// Configuration of a [`TilingJob`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TilingJobConfig {
    pub mode: TilingMode,
    /// Number of subdivision levels; 0 keeps the mesh as a single tile
    pub depth: u32,
    pub decimation: DecimationStage,
    /// Triangle ratios per LOD level; the first level is always full detail
    pub lod_ratios: Vec<f64>,
    pub decimator: DecimatorOptions,
    /// Run on a dedicated pool with this many threads
    pub threads: Option<usize>,
    /// Order leaves by their bounds instead of completion order
    pub sort_output: bool,
}

impl Default for TilingJobConfig {
    fn default() -> Self {
        Self {
            mode: TilingMode::Quadtree,
            depth: 2,
            decimation: DecimationStage::None,
            lod_ratios: vec![1.0],
            decimator: DecimatorOptions::default(),
            threads: None,
            sort_output: true,
        }
    }
}

impl TilingJobConfig {
    pub fn with_mode(mut self, mode: TilingMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_depth(mut self, depth: u32) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_decimation(mut self, decimation: DecimationStage) -> Self {
        self.decimation = decimation;
        self
    }

    pub fn with_lod_ratios(mut self, ratios: Vec<f64>) -> Self {
        self.lod_ratios = ratios;
        self
    }

    pub fn with_decimator(mut self, options: DecimatorOptions) -> Self {
        self.decimator = options;
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    pub fn with_sort_output(mut self, sort: bool) -> Self {
        self.sort_output = sort;
        self
    }
}

/// One output tile
#[derive(Debug, Clone)]
pub struct Tile {
    /// LOD level, 0 = full detail
    pub lod: usize,
    /// Position of the leaf among all leaves of the job
    pub index: usize,
    pub mesh: Mesh,
    pub bounds: BoundingBox,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobStats {
    pub input_triangles: usize,
    /// Triangles entering the tiler, after any root decimation
    pub tiled_triangles: usize,
    pub leaves: usize,
    pub tiles: usize,
    pub output_triangles: usize,
    pub split_operations: usize,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, Default)]
pub struct JobOutput {
    /// Ordered by LOD level, then leaf index
    pub tiles: Vec<Tile>,
    pub stats: JobStats,
}

impl JobOutput {
    /// Tiles of a single LOD level
    pub fn level(&self, lod: usize) -> impl Iterator<Item = &Tile> + '_ {
        self.tiles.iter().filter(move |tile| tile.lod == lod)
    }
}

pub struct TilingJob {
    config: TilingJobConfig,
}

impl TilingJob {
    pub fn new(config: TilingJobConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TilingJobConfig {
        &self.config
    }

    /// Run the job on `mesh`. Returns [`Error::Cancelled`] if `cancel` fires
    /// before the tiles are complete.
    pub fn run(&self, mesh: &Mesh, cancel: &CancellationToken) -> Result<JobOutput> {
        match self.config.threads {
            Some(threads) => {
                let pool = ThreadPoolConfig::default().with_threads(threads).build()?;
                pool.install(|| self.execute(mesh, cancel))
            }
            None => self.execute(mesh, cancel),
        }
    }

    fn execute(&self, mesh: &Mesh, cancel: &CancellationToken) -> Result<JobOutput> {
        let start = Instant::now();
        let config = &self.config;
        let depth = i32::try_from(config.depth)
            .map_err(|_| Error::InvalidData(format!("tiling depth {} is too large", config.depth)))?;
        let levels = build_lod_levels(&config.lod_ratios)?;
        cancel.check()?;

        let root: Cow<'_, Mesh> = match config.decimation {
            DecimationStage::BeforeTiling(target) => {
                Cow::Owned(decimate_mesh(mesh, target, &config.decimator)?)
            }
            DecimationStage::None | DecimationStage::PerTile => Cow::Borrowed(mesh),
        };

        let mut stats = JobStats {
            input_triangles: mesh.face_count(),
            tiled_triangles: root.face_count(),
            ..JobStats::default()
        };

        let bounds = match root.bounding_box().filter(|_| !root.is_empty()) {
            Some(bounds) => bounds,
            None => {
                debug!("Nothing to tile");
                stats.elapsed = start.elapsed();
                return Ok(JobOutput {
                    tiles: Vec::new(),
                    stats,
                });
            }
        };

        let collector = TileCollector::new();
        stats.split_operations =
            recurse_split(&root, depth, &bounds, config.mode, &collector, cancel)?;
        let leaves = if config.sort_output {
            collector.into_sorted_tiles()
        } else {
            collector.into_tiles()
        };
        stats.leaves = leaves.len();

        let per_leaf: Vec<Vec<Tile>> = leaves
            .into_par_iter()
            .enumerate()
            .map(|(index, leaf)| -> Result<Vec<Tile>> {
                cancel.check()?;
                let leaf = match config.decimation {
                    DecimationStage::PerTile => decimate_mesh_lossless(&leaf, &config.decimator)?,
                    _ => leaf,
                };
                let lods = generate_lods(&leaf, &levels, &config.decimator)?;
                Ok(lods
                    .into_iter()
                    .enumerate()
                    .filter_map(|(lod, mesh)| {
                        let bounds = mesh.bounding_box()?;
                        Some(Tile {
                            lod,
                            index,
                            mesh,
                            bounds,
                        })
                    })
                    .collect())
            })
            .collect::<Result<_>>()?;

        let mut tiles: Vec<Tile> = per_leaf.into_iter().flatten().collect();
        tiles.sort_by_key(|tile| (tile.lod, tile.index));

        stats.tiles = tiles.len();
        stats.output_triangles = tiles.iter().map(|tile| tile.mesh.face_count()).sum();
        stats.elapsed = start.elapsed();

        info!(
            mode = ?config.mode,
            depth = config.depth,
            lods = levels.len(),
            input = stats.input_triangles,
            leaves = stats.leaves,
            tiles = stats.tiles,
            triangles = stats.output_triangles,
            operations = stats.split_operations,
            elapsed_ms = stats.elapsed.as_millis() as u64,
            "Tiling job complete"
        );

        Ok(JobOutput { tiles, stats })
    }
}
