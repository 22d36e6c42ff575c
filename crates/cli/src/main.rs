//! CLI for s2-tiles - tile GeoJSON on demand, inspect cells, query points
//!
//! This is a thin wrapper around the s2-tiles-core library.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use geojson::{GeoJson, Value};
use log::info;
use s2_tiles_core::{
    CellId, ChordAngle, FileVector, PointIndex, PointShape, Projection, S2Point, SourceData,
    TileStore, TileStoreOptions, VectorStore,
};
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(
    name = "s2-tiles",
    about = "S2 cell ids, on-demand vector tiles and point queries",
    version
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print one tile of a GeoJSON file as JSON
    Tile(TileArgs),
    /// Describe the cell at a location or token
    Cell(CellArgs),
    /// List point features within a radius
    Near(NearArgs),
}

#[derive(Args, Debug)]
struct TileArgs {
    /// Input GeoJSON or S2 feature file
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Cube face (always 0 for wm)
    #[arg(long, default_value = "0")]
    face: u8,

    /// Tile zoom
    #[arg(long)]
    zoom: u8,

    /// Tile column
    #[arg(long)]
    i: u32,

    /// Tile row
    #[arg(long)]
    j: u32,

    /// Minimum zoom level
    #[arg(long, default_value = "0")]
    minzoom: u8,

    /// Maximum zoom level
    #[arg(long, default_value = "20")]
    maxzoom: u8,

    /// Zoom to index eagerly on load
    #[arg(long, default_value = "4")]
    index_maxzoom: u8,

    /// Simplification tolerance (0 disables)
    #[arg(long, default_value = "3")]
    tolerance: f64,

    /// Tile buffer as a fraction of the tile
    #[arg(long, default_value = "0.0625")]
    buffer: f64,

    /// Projection (wm, s2); inferred from the input when omitted
    #[arg(long)]
    projection: Option<String>,

    /// Keep lon/lat bounding boxes on features
    #[arg(long)]
    build_bbox: bool,
}

#[derive(Args, Debug)]
struct CellArgs {
    /// Longitude in degrees
    #[arg(long, allow_hyphen_values = true, required_unless_present = "token")]
    lon: Option<f64>,

    /// Latitude in degrees
    #[arg(long, allow_hyphen_values = true, required_unless_present = "token")]
    lat: Option<f64>,

    /// Cell level (default: leaf)
    #[arg(long)]
    level: Option<u8>,

    /// Hex cell token instead of a location
    #[arg(long, conflicts_with_all = ["lon", "lat"])]
    token: Option<String>,
}

#[derive(Args, Debug)]
struct NearArgs {
    /// Input GeoJSON file
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Longitude in degrees
    #[arg(long, allow_hyphen_values = true)]
    lon: f64,

    /// Latitude in degrees
    #[arg(long, allow_hyphen_values = true)]
    lat: f64,

    /// Search radius in degrees
    #[arg(long)]
    radius_deg: f64,

    /// Keep the index in a temporary file instead of memory
    #[arg(long)]
    on_disk: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    match cli.command {
        Command::Tile(args) => run_tile(&args),
        Command::Cell(args) => run_cell(&args),
        Command::Near(args) => run_near(&args),
    }
}

fn read_source(path: &Path) -> Result<SourceData> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    text.parse::<SourceData>()
        .with_context(|| format!("Failed to parse {}", path.display()))
}

fn read_geojson(path: &Path) -> Result<GeoJson> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    text.parse::<GeoJson>()
        .with_context(|| format!("Failed to parse GeoJSON in {}", path.display()))
}

fn run_tile(args: &TileArgs) -> Result<()> {
    let mut options = TileStoreOptions::new(args.minzoom, args.maxzoom)
        .with_index_maxzoom(args.index_maxzoom)
        .with_tolerance(args.tolerance)
        .with_buffer(args.buffer)
        .with_build_bbox(args.build_bbox);
    if let Some(projection) = &args.projection {
        let projection: Projection = projection.parse().context("Invalid --projection")?;
        options = options.with_projection(projection);
    }

    let data = read_source(&args.input)?;
    let mut store = TileStore::from_source(&data, options).context("Failed to build tile store")?;

    let id = CellId::from_ij(args.face, args.i, args.j, Some(args.zoom));
    match store.get_tile(id) {
        Some(tile) => {
            info!("Tile {} holds {} features", id, tile.feature_count());
            println!("{}", serde_json::to_string_pretty(tile)?);
        }
        None => {
            info!("Tile {} is empty or out of range", id);
            println!("null");
        }
    }
    Ok(())
}

fn run_cell(args: &CellArgs) -> Result<()> {
    let id = match (&args.token, args.lon, args.lat) {
        (Some(token), _, _) => CellId::from_token(token).context("Invalid --token")?,
        (None, Some(lon), Some(lat)) => CellId::from_lon_lat(lon, lat),
        _ => anyhow::bail!("Either --token or both --lon and --lat are required"),
    };
    let id = match args.level {
        Some(level) if level > 30 => anyhow::bail!("Invalid level: {}", level),
        Some(level) if level < id.level() => id.parent(Some(level)),
        _ => id,
    };

    let (face, level, i, j) = id.to_face_ij();
    let (lon, lat) = id.to_lon_lat();
    let summary = json!({
        "id": id.id(),
        "token": id.to_token(),
        "face": face,
        "level": level,
        "i": i,
        "j": j,
        "lon": lon,
        "lat": lat,
        "path": id.to_string(),
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

/// Properties kept with each indexed point.
type Properties = Option<serde_json::Map<String, serde_json::Value>>;

fn run_near(args: &NearArgs) -> Result<()> {
    let data = read_geojson(&args.input)?;
    let points = collect_points(&data);
    info!("Loaded {} points from {}", points.len(), args.input.display());

    if args.on_disk {
        let store = FileVector::new().context("Failed to create index file")?;
        search(PointIndex::with_store(store), points, args)
    } else {
        search(PointIndex::new(), points, args)
    }
}

fn search<S>(
    mut index: PointIndex<Properties, S>,
    points: Vec<(S2Point, Properties)>,
    args: &NearArgs,
) -> Result<()>
where
    S: VectorStore<PointShape<Properties>>,
{
    index.insert_points(points).context("Failed to index points")?;

    let target = S2Point::from_lon_lat(args.lon, args.lat);
    let radius = ChordAngle::from_degrees(args.radius_deg);
    let matches = index
        .search_radius(target, radius)
        .context("Radius search failed")?;
    info!("{} point(s) within {} degrees", matches.len(), args.radius_deg);

    for shape in matches {
        let (lon, lat) = shape.point.to_lon_lat();
        let meters = ChordAngle::from_points(&target, &shape.point).meters();
        let line = json!({
            "lon": lon,
            "lat": lat,
            "distance_m": meters,
            "cell": shape.cell.to_token(),
            "properties": shape.data,
        });
        println!("{}", line);
    }

    index.close().context("Failed to release index")?;
    Ok(())
}

/// Every Point and MultiPoint position in `data`.
fn collect_points(data: &GeoJson) -> Vec<(S2Point, Properties)> {
    let mut out = Vec::new();
    let mut push = |value: &Value, properties: &Properties| match value {
        Value::Point(p) if p.len() >= 2 => {
            out.push((S2Point::from_lon_lat(p[0], p[1]), properties.clone()));
        }
        Value::MultiPoint(ps) => {
            for p in ps.iter().filter(|p| p.len() >= 2) {
                out.push((S2Point::from_lon_lat(p[0], p[1]), properties.clone()));
            }
        }
        _ => {}
    };

    match data {
        GeoJson::Geometry(geometry) => push(&geometry.value, &None),
        GeoJson::Feature(feature) => {
            if let Some(geometry) = &feature.geometry {
                push(&geometry.value, &feature.properties);
            }
        }
        GeoJson::FeatureCollection(collection) => {
            for feature in &collection.features {
                if let Some(geometry) = &feature.geometry {
                    push(&geometry.value, &feature.properties);
                }
            }
        }
    }
    out
}
