//////////////////////////////////////////////////////////////////////
// pure tile counting - no drawing in here, everything in mm

use phf::phf_map;

use crate::errors::*;

const SQRT_2: f64 = std::f64::consts::SQRT_2;

// slack for comparing mm positions that should land exactly on
// a tile boundary
const EPS: f64 = 1e-9;

//////////////////////////////////////////////////////////////////////

#[derive(Debug,PartialEq,Eq,Hash,Clone,Copy)]
pub enum LayingMethod {
    Direct,       // axis aligned, flush against one corner
    DirectCenter, // axis aligned, symmetric about the midpoint
    Diagonal      // square tiles at 45 degrees
}

// define a lookup table matching method strings to enumeration
pub static METHOD_LOOKUP: phf::Map<&'static str, LayingMethod> = phf_map! {
    "direct" => LayingMethod::Direct,
    "direct_center" => LayingMethod::DirectCenter,
    "diagonal" => LayingMethod::Diagonal,
};

impl LayingMethod {

    pub fn from_name(name: &str) -> Result<Self> {
        match METHOD_LOOKUP.get(name) {
            Some(&method) => Ok(method),
            None => bail!(ErrorKind::UnsupportedMethod(name.to_string()))
        }
    }

    // numeric codes used by the calculator forms
    pub fn from_code(code: i64) -> Result<Self> {
        match code {
            1 => Ok(LayingMethod::Direct),
            2 => Ok(LayingMethod::DirectCenter),
            3 => Ok(LayingMethod::Diagonal),
            _ => bail!(ErrorKind::UnsupportedMethod(code.to_string()))
        }
    }

}

//////////////////////////////////////////////////////////////////////
// a floor (length x width) or a room (length x width x height)

#[derive(Debug,PartialEq,Clone,Copy)]
pub struct Surface {
    pub length: f64,
    pub width: f64,
    pub height: Option<f64>
}

impl Surface {

    pub fn floor(length: f64, width: f64) -> Result<Self> {
        Ok(Surface {
            length: ensure_positive("length", length)?,
            width: ensure_positive("width", width)?,
            height: None
        })
    }

    pub fn room(length: f64, width: f64, height: f64) -> Result<Self> {
        Ok(Surface {
            height: Some(ensure_positive("height", height)?),
            ..Self::floor(length, width)?
        })
    }

    pub fn perimeter(&self) -> f64 {
        2.0 * (self.length + self.width)
    }

    pub fn wall_height(&self) -> Result<f64> {
        match self.height {
            Some(h) => Ok(h),
            None => bail!(ErrorKind::InvalidDimension("height".to_string(), 0.0))
        }
    }

}

//////////////////////////////////////////////////////////////////////
// tile dimensions. on a floor, width runs along the surface length
// (the image x axis); on walls, width runs along the perimeter

#[derive(Debug,PartialEq,Clone,Copy)]
pub struct TileSpec {
    pub width: u32,
    pub height: u32,
    pub delimiter: f64
}

impl TileSpec {

    pub fn new(width: u32, height: u32, delimiter: f64) -> Result<Self> {

        if width < 1 {
            bail!(ErrorKind::InvalidDimension("tile width".to_string(), width as f64));
        }

        if height < 1 {
            bail!(ErrorKind::InvalidDimension("tile height".to_string(), height as f64));
        }

        if !(delimiter >= 0.0) || !delimiter.is_finite() {
            bail!(ErrorKind::InvalidDimension("delimiter".to_string(), delimiter));
        }

        Ok(TileSpec { width, height, delimiter })

    }

    pub fn w(&self) -> f64 { self.width as f64 }
    pub fn h(&self) -> f64 { self.height as f64 }

    pub fn is_square(&self) -> bool {
        self.width == self.height
    }

    pub fn area_m2(&self) -> f64 {
        self.w() * self.h() / 1e6
    }

}

//////////////////////////////////////////////////////////////////////

#[derive(Debug,PartialEq,Clone,Copy)]
pub struct DoorCutout {
    pub width: f64,
    pub height: f64
}

impl DoorCutout {

    pub fn new(width: f64, height: f64) -> Result<Self> {
        Ok(DoorCutout {
            width: ensure_positive("door width", width)?,
            height: ensure_positive("door height", height)?
        })
    }

    pub fn area_m2(&self) -> f64 {
        self.width * self.height / 1e6
    }

    // the door must fit the shortest wall it could be placed on
    pub fn check_fits(&self, room: &Surface) -> Result<()> {

        let height = room.wall_height()?;
        let shortest = room.length.min(room.width);

        if self.width > shortest || self.height > height {
            bail!(ErrorKind::DoorExceedsWall(self.width, self.height,
                                             shortest, height));
        }

        Ok(())

    }

    // door sits centered on the third wall (a length wall) of the
    // unrolled perimeter: length, width, length, width
    pub fn perimeter_span(&self, room: &Surface) -> (f64, f64) {
        let start = room.length + room.width + 0.5 * (room.length - self.width);
        (start, start + self.width)
    }

}

//////////////////////////////////////////////////////////////////////
// what the calculator hands back to the outside world

#[derive(Debug,PartialEq,Clone)]
pub struct Estimate {
    pub count: u64,
    pub reserve: u64,
    pub total: u64,
    pub cost: Option<f64>,
    pub area_m2: f64
}

impl Estimate {

    pub fn new(count: u64, area_m2: f64,
               reserve_percent: f64, price: Option<f64>) -> Self {

        let reserve = reserve_count(count, reserve_percent);
        let total = count.saturating_add(reserve);

        let cost = match price {
            Some(p) if p > 0.0 => Some(round2(total as f64 * p)),
            _ => None
        };

        Estimate { count, reserve, total, cost, area_m2 }

    }

}

pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

pub fn reserve_count(count: u64, reserve_percent: f64) -> u64 {

    if !(reserve_percent > 0.0) {
        return 0;
    }

    // trim float noise so 5% of 100 stays 5 and not 6
    let raw = count as f64 * reserve_percent / 100.0;
    let raw = (raw * 1e9).round() / 1e9;

    raw.ceil() as u64

}

//////////////////////////////////////////////////////////////////////
// one dimensional counts

fn ceil_count(x: f64) -> u64 {
    if x > 0.0 { x.ceil() as u64 } else { 0 }
}

// drop the last tile if the covered length already overshoots the
// span by a whole tile plus grout
pub fn check_with_delimiters(span: f64, tile: f64, delimiter: f64, count: u64) -> u64 {

    if count == 0 {
        return 0;
    }

    let c = count as f64;
    let covered = c * tile + delimiter * (c - 1.0);

    if covered - span >= tile + delimiter {
        count - 1
    } else {
        count
    }

}

// every tile is preceded by one grout line
pub fn direct_count(span: f64, tile: f64, delimiter: f64) -> u64 {

    let raw = ceil_count((span - delimiter) / (tile + delimiter)).max(1);

    check_with_delimiters(span, tile, delimiter, raw).max(1)

}

// one tile straddling the midpoint plus k tiles on each side
pub fn direct_center_count(span: f64, tile: f64, delimiter: f64) -> u64 {

    let half = 0.5 * span - (0.5 * tile + delimiter);
    let k = ceil_count(half / (tile + delimiter));
    let k = check_with_delimiters(half, tile, delimiter, k);

    k.saturating_mul(2).saturating_add(1)

}

// diamonds of the half-offset rows, always in pairs
fn even_row_count(span: f64, tile: f64, delimiter: f64) -> u64 {

    let half = 0.5 * span - 0.5 * delimiter;
    let m = ceil_count(half / (tile + delimiter));
    let m = check_with_delimiters(half, tile, delimiter, m);

    m.saturating_mul(2)

}

//////////////////////////////////////////////////////////////////////
// two dimensional counts

// rows x columns, rejecting surfaces too large to count; u64::MAX
// marks a saturated axis count
fn grid_count(cols: u64, rows: u64) -> Result<u64> {
    match cols.checked_mul(rows) {
        Some(count) if count < u64::MAX => Ok(count),
        _ => bail!(ErrorKind::InvalidDimension("tile count".to_string(),
                                                 cols as f64 * rows as f64))
    }
}

pub fn floor_tile_count(surface: &Surface, tile: &TileSpec,
                        method: LayingMethod) -> Result<u64> {

    let d = tile.delimiter;

    let count = match method {

        LayingMethod::Direct => {
            grid_count(direct_count(surface.length, tile.w(), d),
                       direct_count(surface.width, tile.h(), d))?
        },

        LayingMethod::DirectCenter => {
            grid_count(direct_center_count(surface.length, tile.w(), d),
                       direct_center_count(surface.width, tile.h(), d))?
        },

        LayingMethod::Diagonal => {

            if !tile.is_square() {
                bail!(ErrorKind::IncompatibleTileShape(tile.w(), tile.h()));
            }

            let diag = SQRT_2 * tile.w();
            let ddiag = SQRT_2 * d;

            let center = grid_count(direct_center_count(surface.length, diag, ddiag),
                                    direct_center_count(surface.width, diag, ddiag))?;

            let even = grid_count(even_row_count(surface.length, diag, ddiag),
                                  even_row_count(surface.width, diag, ddiag))?;

            match center.checked_add(even) {
                Some(count) if count < u64::MAX => count,
                _ => bail!(ErrorKind::InvalidDimension("tile count".to_string(),
                                                          center as f64 + even as f64))
            }

        }

    };

    Ok(count)

}

pub fn estimate_floor(surface: &Surface, tile: &TileSpec, method: LayingMethod,
                      reserve_percent: f64, price: Option<f64>) -> Result<Estimate> {

    let count = floor_tile_count(surface, tile, method)?;
    let area = surface.length * surface.width / 1e6;

    Ok(Estimate::new(count, area, reserve_percent, price))

}

//////////////////////////////////////////////////////////////////////
// walls: a direct grid over the unrolled perimeter x height, minus
// the tiles lying wholly inside the door

// how many grid tiles [d + i*step, (i+1)*step] lie wholly in [lo, hi]
fn whole_tiles_within(lo: f64, hi: f64, tile: f64, delimiter: f64, limit: u64) -> u64 {

    let step = tile + delimiter;

    let first = ((lo - delimiter) / step - EPS).ceil().max(0.0) as i64;
    let last = (hi / step + EPS).floor() as i64 - 1;
    let last = last.min(limit as i64 - 1);

    if last < first {
        0
    } else {
        (last - first + 1) as u64
    }

}

pub fn wall_tile_count(room: &Surface, tile: &TileSpec,
                       door: Option<&DoorCutout>) -> Result<u64> {

    let height = room.wall_height()?;
    let d = tile.delimiter;

    let cols = direct_count(room.perimeter(), tile.w(), d);
    let rows = direct_count(height, tile.h(), d);

    let mut count = grid_count(cols, rows)?;

    if let Some(door) = door {

        door.check_fits(room)?;

        let (lo, hi) = door.perimeter_span(room);

        let door_cols = whole_tiles_within(lo, hi, tile.w(), d, cols);
        let door_rows = whole_tiles_within(0.0, door.height, tile.h(), d, rows);

        count -= door_cols * door_rows;

    }

    Ok(count)

}

pub fn estimate_walls(room: &Surface, tile: &TileSpec, door: Option<&DoorCutout>,
                      reserve_percent: f64, price: Option<f64>) -> Result<Estimate> {

    let count = wall_tile_count(room, tile, door)?;

    let mut area = room.perimeter() * room.wall_height()? / 1e6;

    if let Some(door) = door {
        area -= door.area_m2();
    }

    Ok(Estimate::new(count, area, reserve_percent, price))

}

//////////////////////////////////////////////////////////////////////
// price of one tile when the shop quotes price per square meter

pub fn tile_cost(tile: &TileSpec, price_per_m2: f64) -> Result<(f64, f64)> {

    if !(price_per_m2 >= 0.0) {
        bail!(ErrorKind::InvalidDimension("price".to_string(), price_per_m2));
    }

    let area = tile.area_m2();

    Ok((area, round2(area * price_per_m2)))

}

//////////////////////////////////////////////////////////////////////
