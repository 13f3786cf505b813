//! Search command: find blocks or lots by their codes.

use clap::Args;
use parcelview::config::ConfigFile;
use parcelview::layers::{matches_bounds, search_blocks, search_lots, SearchQuery};

use super::common::{district_loader, format_properties, load_district};
use crate::error::CliError;

/// Maximum matches listed individually.
const LISTED_MATCHES: usize = 20;

/// Arguments for `parcelview search`.
#[derive(Debug, Args)]
pub struct SearchArgs {
    /// District whose layers are loaded and searched
    #[arg(long)]
    pub district: String,

    /// Sector code (padded to 2 digits)
    #[arg(long, default_value = "")]
    pub sector: String,

    /// Block code (padded to 3 digits)
    #[arg(long, default_value = "")]
    pub block: String,

    /// Lot code (padded to 3 digits, needs --block)
    #[arg(long, default_value = "")]
    pub lot: String,
}

/// Run the search command.
pub async fn run(args: SearchArgs, config: &ConfigFile) -> Result<(), CliError> {
    let query = SearchQuery::new(&args.district, &args.sector, &args.block, &args.lot)?;
    let fields = config.search_fields();

    let loader = district_loader(config).await?;
    let layers = load_district(&loader, &args.district).await?;

    let matches = if query.is_lot_search() {
        search_lots(&layers.lots, &query, &fields)
    } else {
        search_blocks(&layers.blocks, &query, &fields)
    };

    if matches.is_empty() {
        println!("No matches in district {}", layers.district);
        return Ok(());
    }

    println!("{}", query.describe(matches.len()));
    for feature in matches.iter().take(LISTED_MATCHES) {
        println!("  #{} {}", feature.id, format_properties(&feature.properties));
    }
    if matches.len() > LISTED_MATCHES {
        println!("  ... and {} more", matches.len() - LISTED_MATCHES);
    }

    if let Some(bounds) = matches_bounds(&matches) {
        let center = bounds.center();
        println!(
            "Bounds: {:.6},{:.6} to {:.6},{:.6} (center {:.6},{:.6})",
            bounds.south, bounds.west, bounds.north, bounds.east, center.lat, center.lng
        );
    }

    Ok(())
}
