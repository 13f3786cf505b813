//! Pick command: resolve a map click to the feature under it.

use clap::Args;
use parcelview::config::ConfigFile;
use parcelview::geometry::{format_area, geodesic_area, LatLng, Shape};
use parcelview::layers::{FeatureGeometry, MapFeature};
use parcelview::pick::{HitPicker, PickLayer};

use super::common::{
    district_loader, format_properties, interrupt_token, load_district, parse_lat_lng,
};
use crate::error::CliError;

/// Arguments for `parcelview pick`.
#[derive(Debug, Args)]
pub struct PickArgs {
    /// District whose layers are searched
    #[arg(long)]
    pub district: String,

    /// Click position as lat,lng
    #[arg(value_parser = parse_lat_lng, allow_hyphen_values = true)]
    pub at: LatLng,

    /// Also search doors and constructions (one group per floor)
    #[arg(long)]
    pub overlays: bool,
}

/// Run the pick command.
pub async fn run(args: PickArgs, config: &ConfigFile) -> Result<(), CliError> {
    let loader = district_loader(config).await?;
    let base = load_district(&loader, &args.district).await?;

    let (doors, floors) = if args.overlays {
        let cancel = Some(interrupt_token());
        let (doors, constructions) = tokio::try_join!(
            loader.load_overlay(&config.layers.door, &args.district, cancel.clone()),
            loader.load_overlay(&config.layers.construction, &args.district, cancel),
        )?;
        let floors = constructions.by_floor(&config.layers.floor_field);
        (Some(doors), floors)
    } else {
        (None, Vec::new())
    };

    let mut layers: Vec<PickLayer<'_, &'static str>> = Vec::new();
    if let Some(doors) = &doors {
        layers.push(PickLayer::new(doors, |_| Some("door")));
    }
    if !floors.is_empty() {
        layers.push(PickLayer::merged(floors.iter().collect(), |_| Some("construction")));
    }
    layers.push(PickLayer::new(&base.buildings, |_| Some("building")));
    layers.push(PickLayer::new(&base.lots, |_| Some("lot")));
    layers.push(PickLayer::new(&base.blocks, |_| Some("block")));

    let picker = HitPicker::new(config.pick_settings());
    match picker.pick(args.at, &layers) {
        Some(hit) => {
            println!("{} #{} (layer {})", hit.payload, hit.feature.id, hit.group);
            if let Some(area) = feature_area(hit.feature) {
                println!("  Area:       {}", format_area(area));
            }
            println!("  Properties: {}", format_properties(&hit.feature.properties));
        }
        None => {
            println!(
                "Nothing at {:.6}, {:.6} in district {}",
                args.at.lat, args.at.lng, base.district
            );
            println!("  Searched {} layer group(s)", searched_groups(&layers));
        }
    }

    Ok(())
}

/// Geodesic area of a polygon feature in square metres.
fn feature_area(feature: &MapFeature) -> Option<f64> {
    match &feature.geometry {
        FeatureGeometry::Area(shape) => Some(shape_area(shape)),
        _ => None,
    }
}

fn shape_area(shape: &Shape) -> f64 {
    shape
        .parts()
        .into_iter()
        .map(|(outer, holes)| {
            let holes: f64 = holes.iter().map(|h| geodesic_area(h.points())).sum();
            (geodesic_area(outer.points()) - holes).max(0.0)
        })
        .sum()
}

fn searched_groups(layers: &[PickLayer<'_, &'static str>]) -> usize {
    layers
        .iter()
        .flat_map(|layer| layer.groups.iter())
        .filter(|group| group.is_visible())
        .count()
}
