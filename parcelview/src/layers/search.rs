//! Local code search over loaded block and lot layers.
//!
//! Codes are compared leniently: `"33"`, `"033"` and `33` all match, so a
//! user does not need to know how the service pads or types a code.

use thiserror::Error;

use crate::geometry::BoundingBox;
use crate::layers::feature::{LayerGroup, MapFeature};

/// Width sector codes are padded to.
pub const SECTOR_CODE_WIDTH: usize = 2;
/// Width block codes are padded to.
pub const BLOCK_CODE_WIDTH: usize = 3;
/// Width lot codes are padded to.
pub const LOT_CODE_WIDTH: usize = 3;

/// Rejected search input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SearchError {
    #[error("Select a district or enter a sector or block")]
    MissingScope,

    #[error("A lot search needs a block code too")]
    LotWithoutBlock,
}

/// Property names holding the searchable codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchFields {
    pub district: String,
    pub sector: String,
    pub block: String,
    pub lot: String,
}

impl Default for SearchFields {
    fn default() -> Self {
        Self {
            district: "ubigeo".to_string(),
            sector: "cod_sector".to_string(),
            block: "cod_mzna".to_string(),
            lot: "cod_lote".to_string(),
        }
    }
}

/// Validated, padded search input. Empty parts are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    pub district: Option<String>,
    pub sector: Option<String>,
    pub block: Option<String>,
    pub lot: Option<String>,
}

impl SearchQuery {
    /// Normalise raw input and check it names something to search.
    ///
    /// # Errors
    ///
    /// * [`SearchError::MissingScope`] when district, sector and block are all empty
    /// * [`SearchError::LotWithoutBlock`] when a lot is given without a block
    pub fn new(district: &str, sector: &str, block: &str, lot: &str) -> Result<Self, SearchError> {
        let query = Self {
            district: non_empty(district.trim().to_string()),
            sector: non_empty(pad_code(sector, SECTOR_CODE_WIDTH)),
            block: non_empty(pad_code(block, BLOCK_CODE_WIDTH)),
            lot: non_empty(pad_code(lot, LOT_CODE_WIDTH)),
        };

        if query.district.is_none() && query.sector.is_none() && query.block.is_none() {
            return Err(SearchError::MissingScope);
        }
        if query.lot.is_some() && query.block.is_none() {
            return Err(SearchError::LotWithoutBlock);
        }
        Ok(query)
    }

    /// Whether this query targets lots rather than blocks.
    pub fn is_lot_search(&self) -> bool {
        self.lot.is_some()
    }

    /// One-line description of a successful search.
    pub fn describe(&self, matches: usize) -> String {
        if let (Some(lot), Some(block)) = (&self.lot, &self.block) {
            return format!("Lot {lot} (block {block}) found");
        }
        if let (Some(block), None, None) = (&self.block, &self.sector, &self.district) {
            return format!("Block {block} found");
        }

        let mut tags = Vec::new();
        if let Some(district) = &self.district {
            tags.push(format!("district {district}"));
        }
        if let Some(sector) = &self.sector {
            tags.push(format!("sector {sector}"));
        }
        if let Some(block) = &self.block {
            tags.push(format!("block {block}"));
        }
        format!("{} block(s) found: {}", matches, tags.join(", "))
    }
}

fn non_empty(s: String) -> Option<String> {
    (!s.is_empty()).then_some(s)
}

/// Strip leading zeros; an all-zero code becomes `"0"`.
fn strip_zeros(code: &str) -> &str {
    let stripped = code.trim_start_matches('0');
    if stripped.is_empty() && !code.is_empty() {
        "0"
    } else {
        stripped
    }
}

/// Whether two codes are equal, directly or after stripping leading zeros.
///
/// Both are trimmed first; an empty code never matches.
pub fn codes_match(a: &str, b: &str) -> bool {
    let (a, b) = (a.trim(), b.trim());
    if a.is_empty() || b.is_empty() {
        return false;
    }
    a == b || strip_zeros(a) == strip_zeros(b)
}

/// Left-pad an all-digit code with zeros to `width`. Other input is only
/// trimmed.
pub fn pad_code(code: &str, width: usize) -> String {
    let code = code.trim();
    if !code.is_empty() && width > 0 && code.bytes().all(|b| b.is_ascii_digit()) {
        format!("{code:0>width$}")
    } else {
        code.to_string()
    }
}

fn property_matches(feature: &MapFeature, field: &str, code: &str) -> bool {
    feature
        .property_text(field)
        .is_some_and(|value| codes_match(&value, code))
}

/// Lots matching both the block and the lot code of `query`.
///
/// Empty for queries without a lot.
pub fn search_lots<'a>(
    lots: &'a LayerGroup,
    query: &SearchQuery,
    fields: &SearchFields,
) -> Vec<&'a MapFeature> {
    let (Some(block), Some(lot)) = (&query.block, &query.lot) else {
        return Vec::new();
    };
    lots.features()
        .iter()
        .filter(|f| property_matches(f, &fields.block, block))
        .filter(|f| property_matches(f, &fields.lot, lot))
        .collect()
}

/// Blocks matching every code given in `query`.
pub fn search_blocks<'a>(
    blocks: &'a LayerGroup,
    query: &SearchQuery,
    fields: &SearchFields,
) -> Vec<&'a MapFeature> {
    let filters = [
        (&fields.block, &query.block),
        (&fields.sector, &query.sector),
        (&fields.district, &query.district),
    ];
    blocks
        .features()
        .iter()
        .filter(|f| {
            filters.iter().all(|(field, code)| match code {
                Some(code) => property_matches(f, field, code),
                None => true,
            })
        })
        .collect()
}

/// Combined bounds of `features`, for zooming to search results.
pub fn matches_bounds(features: &[&MapFeature]) -> Option<BoundingBox> {
    features
        .iter()
        .filter_map(|f| f.bounds)
        .reduce(|mut acc, b| {
            acc.union(&b);
            acc
        })
}
