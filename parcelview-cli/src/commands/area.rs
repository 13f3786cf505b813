//! Area command: measure a drawn polygon or path.

use clap::Args;
use parcelview::geometry::{format_area, format_distance, geodesic_area, path_length, LatLng};

use super::common::parse_lat_lng;
use crate::error::CliError;

/// Arguments for `parcelview area`.
#[derive(Debug, Args)]
pub struct AreaArgs {
    /// Vertices as lat,lng in drawing order
    #[arg(required = true, value_parser = parse_lat_lng, allow_hyphen_values = true)]
    pub points: Vec<LatLng>,

    /// Measure an open path instead of a closed polygon
    #[arg(long)]
    pub path: bool,
}

/// Measurement of the drawn vertices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    /// Square metres; 0 for paths
    pub area: f64,
    /// Perimeter or path length in metres
    pub length: f64,
}

/// Measure `points` as a polygon, or as a path when `open` is set.
pub fn measure(points: &[LatLng], open: bool) -> Measurement {
    if open {
        return Measurement {
            area: 0.0,
            length: path_length(points),
        };
    }

    let mut closed = points.to_vec();
    if let (Some(first), Some(last)) = (points.first(), points.last()) {
        if points.len() > 2 && first != last {
            closed.push(*first);
        }
    }
    Measurement {
        area: geodesic_area(points),
        length: path_length(&closed),
    }
}

/// Run the area command.
pub fn run(args: AreaArgs) -> Result<(), CliError> {
    if !args.path && args.points.len() < 3 {
        return Err(CliError::InvalidArgument(
            "a polygon needs at least three points (use --path to measure a line)".to_string(),
        ));
    }

    let m = measure(&args.points, args.path);
    if args.path {
        println!("Length:    {}", format_distance(m.length));
    } else {
        println!("Area:      {}", format_area(m.area));
        println!("Perimeter: {}", format_distance(m.length));
    }
    println!("Vertices:  {}", args.points.len());
    Ok(())
}
