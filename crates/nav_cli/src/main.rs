use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use image::{Rgb, RgbImage};
use nav_core::config::Profiles;
use nav_core::download::Downloader;
use nav_core::geodesy::{
    airline_properties, azimuth_to_compass_label, display_distance_km, Point,
};
use nav_core::tiles::{tile_extent, to_tile_index, UrlTemplate};
use nav_core::{GeoRaster, MapFrame, SlippyMap};

// ── CLI definition ─────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "navmap",
    about = "Slippy-map tiles, airline distances and heading-up map frames",
    long_about = "Inspect tile addressing, measure airline distances and bearings,\n\
                  and render north-up or heading-up map frames to PNG."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the tile under a position: index, bounds and URL
    Tile {
        /// Position like "50.90838N 11.56821E"
        position: Point,
        #[arg(long, default_value_t = 17)]
        zoom: u8,
        /// URL template with {x}, {y} and {z}
        #[arg(long, default_value = "https://tile.openstreetmap.org/{z}/{x}/{y}.png")]
        url_template: String,
    },
    /// Distance and bearings of the direct line between two positions
    Airline {
        from: Point,
        to: Point,
    },
    /// Render a map frame around a position to a PNG file
    Render {
        /// Position like "50.90838N 11.56821E"
        position: Point,
        /// Map provider name from the profiles
        #[arg(long, default_value = "OpenStreetMap")]
        provider: String,
        /// Profiles file; the built-in profiles are used when absent
        #[arg(long, env = "NAVMAP_PROFILES")]
        profiles: Option<PathBuf>,
        /// Zoom level, defaults to the provider's default
        #[arg(long)]
        zoom: Option<u8>,
        #[arg(long, default_value_t = 480)]
        width: u32,
        #[arg(long, default_value_t = 272)]
        height: u32,
        /// Direction of travel in degrees; this direction points up
        #[arg(long, default_value_t = 0.0)]
        heading: f64,
        /// Draw a marker at the position
        #[arg(long)]
        marker: bool,
        #[arg(long, short, default_value = "frame.png")]
        output: PathBuf,
    },
    /// Print the built-in provider profiles as JSON
    Profiles,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Tile {
            position,
            zoom,
            url_template,
        } => cmd_tile(position, zoom, &url_template),
        Commands::Airline { from, to } => cmd_airline(from, to),
        Commands::Render {
            position,
            provider,
            profiles,
            zoom,
            width,
            height,
            heading,
            marker,
            output,
        } => cmd_render(RenderArgs {
            position,
            provider,
            profiles,
            zoom,
            width,
            height,
            heading,
            marker,
            output,
        }),
        Commands::Profiles => cmd_profiles(),
    };

    if let Err(err) = result {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

// ── tile ───────────────────────────────────────────────────────────

fn cmd_tile(position: Point, zoom: u8, url_template: &str) -> Result<()> {
    let template = UrlTemplate::parse(url_template)?;
    let key = to_tile_index(position.lat_deg, position.lon_deg, zoom)
        .with_context(|| format!("no tile for {position}"))?;
    let extent = tile_extent(key);
    println!("tile:  {key}");
    println!("north: {:.6}", extent.north_lat);
    println!("south: {:.6}", extent.south_lat);
    println!("west:  {:.6}", extent.west_lon);
    println!("east:  {:.6}", extent.east_lon);
    println!("url:   {}", template.url_for(key));
    Ok(())
}

// ── airline ────────────────────────────────────────────────────────

fn cmd_airline(from: Point, to: Point) -> Result<()> {
    let props = airline_properties(from, to);
    println!("distance: {} km", display_distance_km(props.distance_m));
    match (props.azimuth_1_to_2_deg, props.azimuth_2_to_1_deg) {
        (Some(forward), Some(back)) => {
            let label = azimuth_to_compass_label(forward);
            println!("bearing:  {forward:.1}° ({})", label.long_name());
            println!("back:     {back:.1}° ({})", azimuth_to_compass_label(back));
        }
        _ => println!("bearing:  undefined"),
    }
    Ok(())
}

// ── render ─────────────────────────────────────────────────────────

struct RenderArgs {
    position: Point,
    provider: String,
    profiles: Option<PathBuf>,
    zoom: Option<u8>,
    width: u32,
    height: u32,
    heading: f64,
    marker: bool,
    output: PathBuf,
}

fn cmd_render(args: RenderArgs) -> Result<()> {
    let profiles = match &args.profiles {
        Some(path) => Profiles::load(path)
            .with_context(|| format!("failed to load profiles from {}", path.display()))?,
        None => Profiles::builtin(),
    };
    let kind = profiles.map_provider(&args.provider)?;
    let mut map = SlippyMap::from_provider(kind, downloader()?, profiles.tile_cache)?;
    if let Some(zoom) = args.zoom {
        let applied = map.set_zoom(zoom);
        if applied != zoom {
            log::warn!("zoom {zoom} outside the provider range, using {applied}");
        }
    }

    let frame = map.get_rotated_cropped_tile(
        args.position.lat_deg,
        args.position.lon_deg,
        args.width,
        args.height,
        args.heading.to_radians(),
    )?;
    let stats = map.cache_stats();
    log::info!(
        "{} tiles fetched, {} failed, {} cache hits",
        stats.misses - stats.failures,
        stats.failures,
        stats.hits
    );

    let scale = frame.scale_m_per_px();
    let kind = frame_kind(&frame);
    let marker_at = frame.angle_to_pixel(args.position.lat_deg, args.position.lon_deg);
    let mut image = frame.into_image();
    if args.marker {
        draw_marker(&mut image, marker_at.0, marker_at.1);
    }
    image
        .save(&args.output)
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    println!(
        "wrote {} ({}x{} {kind}, zoom {}, {scale:.2} m/px)",
        args.output.display(),
        image.width(),
        image.height(),
        map.current_zoom(),
    );
    if !map.map_copyright().is_empty() {
        println!("map data {}", map.map_copyright());
    }
    Ok(())
}

#[cfg(feature = "http")]
fn downloader() -> Result<Box<dyn Downloader>> {
    Ok(Box::new(nav_core::download::HttpDownloader::new()?))
}

/// Only the debug provider renders without `http`.
#[cfg(not(feature = "http"))]
fn downloader() -> Result<Box<dyn Downloader>> {
    Ok(Box::new(nav_core::download::OfflineDownloader))
}

/// Red cross, 9 px wide.
fn draw_marker(image: &mut RgbImage, row: i64, col: i64) {
    let red = Rgb([220, 20, 20]);
    for d in -4i64..=4 {
        for (x, y) in [(col + d, row), (col, row + d)] {
            if x >= 0 && y >= 0 && x < i64::from(image.width()) && y < i64::from(image.height()) {
                image.put_pixel(x as u32, y as u32, red);
            }
        }
    }
}

// ── profiles ───────────────────────────────────────────────────────

fn cmd_profiles() -> Result<()> {
    println!("{}", Profiles::builtin().to_json_pretty()?);
    Ok(())
}

fn frame_kind(frame: &MapFrame) -> &'static str {
    match frame {
        MapFrame::Straight(_) => "north-up",
        MapFrame::Rotated(_) => "heading-up",
    }
}
