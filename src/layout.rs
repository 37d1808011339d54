//////////////////////////////////////////////////////////////////////
// tiles and walls: where every tile of a wall goes, which of its
// edges were cut, and what partial tile is left for the next wall

use log::debug;
use phf::phf_map;

use crate::canvas::*;
use crate::errors::*;
use crate::geometry::{DoorCutout, TileSpec};

//////////////////////////////////////////////////////////////////////
// vertical tiling direction: rows start at the ceiling or the floor

#[derive(Debug,PartialEq,Eq,Clone,Copy)]
pub enum YDirection {
    TopDown,  // cut row ends up at the floor
    BottomUp  // cut row ends up at the ceiling
}

static DIRECTION_LOOKUP: phf::Map<&'static str, YDirection> = phf_map! {
    "top_down" => YDirection::TopDown,
    "bottom_up" => YDirection::BottomUp,
};

impl YDirection {

    pub fn from_name(name: &str) -> Result<Self> {
        match DIRECTION_LOOKUP.get(name) {
            Some(&dir) => Ok(dir),
            None => bail!(ErrorKind::InvalidDirection(name.to_string()))
        }
    }

    // 1 is top down, -1 is bottom up
    pub fn from_sign(sign: i32) -> Result<Self> {
        match sign {
            1 => Ok(YDirection::TopDown),
            -1 => Ok(YDirection::BottomUp),
            _ => bail!(ErrorKind::InvalidDirection(sign.to_string()))
        }
    }

}

impl Default for YDirection {
    fn default() -> Self { YDirection::BottomUp }
}

//////////////////////////////////////////////////////////////////////
// partial tile state between walls, in pixels of the current canvas.
//
// max_x is how much of the last tile in each row this wall used up;
// the next wall starts its rows with the rest of that tile.

#[derive(Debug,PartialEq,Eq,Clone,Copy,Default)]
pub struct Carry {
    pub max_x: Option<i32>,
    pub max_y: Option<i32>
}

#[derive(Debug,PartialEq,Clone,Copy)]
pub struct WallTileOptions {
    pub tile: TileSpec,
    pub start_x: Option<i32>, // consumed by the first tile of every row
    pub start_y: Option<i32>  // consumed by the first row
}

impl WallTileOptions {

    pub fn new(tile: TileSpec) -> Self {
        WallTileOptions { tile, start_x: None, start_y: None }
    }

    // continue the horizontal cut pattern of the previous wall
    pub fn continuing(tile: TileSpec, carry: &Carry) -> Self {
        WallTileOptions { tile, start_x: carry.max_x, start_y: None }
    }

}

//////////////////////////////////////////////////////////////////////

#[derive(Debug,PartialEq,Eq,Clone,Copy,Default)]
pub struct CutEdges {
    pub top: bool,
    pub left: bool,
    pub right: bool,
    pub bottom: bool
}

impl CutEdges {
    pub fn any(&self) -> bool {
        self.top || self.left || self.right || self.bottom
    }
}

// what drawing a shape reports back
#[derive(Debug,PartialEq,Clone,Copy)]
pub struct DrawReport {
    pub bounds: PxRect,
    pub tiles: u64,
    pub carry: Carry,
    pub door: Option<PxRect>
}

//////////////////////////////////////////////////////////////////////
// the capability shared by tiles and walls

pub trait Drawable {

    fn draw(&self, canvas: &Canvas, at: Position) -> Result<DrawReport>;

    // dimension ticks outside the corners
    fn draw_contour_out(&self, canvas: &Canvas, at: Position, length: i32);

    // nominal size in mm
    fn size(&self) -> MmSize;

    // drawn size in pixels
    fn footprint(&self, canvas: &Canvas) -> PxSize;

}

//////////////////////////////////////////////////////////////////////

#[derive(Debug,PartialEq,Clone,Copy)]
pub struct Tile {
    pub nominal: MmSize,
    pub drawn: PxSize,
    pub cuts: CutEdges
}

impl Tile {

    pub fn new(nominal: MmSize, drawn: PxSize, cuts: CutEdges) -> Self {
        Tile { nominal, drawn, cuts }
    }

    fn edge_color(cut: bool) -> &'static Color {
        if cut { &CUT_COLOR } else { &TILE_EDGE_COLOR }
    }

}

impl Drawable for Tile {

    fn draw(&self, canvas: &Canvas, at: Position) -> Result<DrawReport> {

        let rect = PxRect::new(at, self.drawn);

        canvas.fill_rect(&rect, &TILE_FILL_COLOR);

        let (w, h) = (self.drawn.width, self.drawn.height);

        let tl = at;
        let tr = at.offset(w, 0);
        let br = at.offset(w, h);
        let bl = at.offset(0, h);

        canvas.line(tl, tr, Self::edge_color(self.cuts.top));
        canvas.line(bl, tl, Self::edge_color(self.cuts.left));
        canvas.line(tr, br, Self::edge_color(self.cuts.right));
        canvas.line(br, bl, Self::edge_color(self.cuts.bottom));

        Ok(DrawReport { bounds: rect, tiles: 1, carry: Carry::default(), door: None })

    }

    // tiles carry no dimension marks
    fn draw_contour_out(&self, _canvas: &Canvas, _at: Position, _length: i32) { }

    fn size(&self) -> MmSize {
        self.nominal
    }

    fn footprint(&self, _canvas: &Canvas) -> PxSize {
        self.drawn
    }

}

//////////////////////////////////////////////////////////////////////
// one tile of a wall layout, already positioned on the canvas

#[derive(Debug,PartialEq,Clone,Copy)]
pub struct PlacedTile {
    pub tile: Tile,
    pub rect: PxRect,
    pub continuation: bool, // rest of a tile counted on the previous wall
    pub in_door: bool       // hidden by the door opening
}

#[derive(Debug,Clone)]
pub struct WallLayout {
    pub bounds: PxRect,
    pub tiles: Vec<PlacedTile>,
    pub door: Option<PxRect>,
    pub count: u64,
    pub carry: Carry
}

//////////////////////////////////////////////////////////////////////

#[derive(Debug,Clone)]
pub struct Wall {
    size: MmSize,
    options: WallTileOptions,
    door: Option<DoorCutout>,
    direction: YDirection,
    contour_out: Option<i32>
}

impl Wall {

    pub fn new(width: f64, height: f64, options: WallTileOptions) -> Result<Wall> {

        ensure_positive("wall width", width)?;
        ensure_positive("wall height", height)?;

        Ok(Wall {
            size: MmSize::new(width, height),
            options,
            door: None,
            direction: YDirection::default(),
            contour_out: None
        })

    }

    pub fn with_door(mut self, door: DoorCutout) -> Result<Wall> {

        if door.width > self.size.width || door.height > self.size.height {
            bail!(ErrorKind::DoorExceedsWall(door.width, door.height,
                                             self.size.width, self.size.height));
        }

        self.door = Some(door);

        Ok(self)

    }

    pub fn with_direction(mut self, direction: YDirection) -> Wall {
        self.direction = direction;
        self
    }

    pub fn with_contour_out(mut self, length: i32) -> Wall {
        self.contour_out = Some(length);
        self
    }

    // door is centered along the wall and stands on the floor
    fn door_rect(&self, canvas: &Canvas, at: Position, wall: PxSize) -> Option<PxRect> {

        self.door.map(|door| {
            let size = PxSize::new(canvas.to_pixels(door.width),
                                   canvas.to_pixels(door.height));
            let pos = Position::new(at.x + wall.width / 2 - size.width / 2,
                                    at.y + wall.height - size.height);
            PxRect::new(pos, size)
        })

    }

    //////////////////////////////////////////////////////////////////////
    // walk rows from the starting edge and tiles from the left; every
    // row and every tile is preceded by one grout gap

    pub fn layout(&self, canvas: &Canvas, at: Position) -> Result<WallLayout> {

        let wall = self.footprint(canvas);

        if wall.width <= 0 || wall.height <= 0 {
            bail!(ErrorKind::InvalidDimension("wall size in pixels".to_string(),
                                              wall.width.min(wall.height) as f64));
        }

        let tile = &self.options.tile;

        let tw = canvas.to_pixels(tile.w()).max(1);
        let th = canvas.to_pixels(tile.h()).max(1);
        let td = canvas.to_pixels(tile.delimiter).max(1);

        let start_x = checked_offset("start_x", self.options.start_x, tw)?;
        let start_y = checked_offset("start_y", self.options.start_y, th)?;

        let nominal = MmSize::new(tile.w(), tile.h());
        let door = self.door_rect(canvas, at, wall);

        let mut tiles = Vec::new();
        let mut count = 0;
        let mut carry = Carry::default();

        let mut y = 0;
        let mut first_row = true;

        loop {

            y += td;

            let room_y = wall.height - td - y;
            if room_y <= 0 {
                break;
            }

            let lead_y = if first_row { start_y } else { None };

            let mut h = th - lead_y.unwrap_or(0);
            let clip_y = h > room_y;
            if clip_y {
                h = room_y;
            }

            let (top, cut_top, cut_bottom) = match self.direction {
                YDirection::TopDown => (at.y + y, lead_y.is_some(), clip_y),
                YDirection::BottomUp => (at.y + wall.height - (y + h), clip_y, lead_y.is_some())
            };

            let mut x = 0;
            let mut first_col = true;

            loop {

                x += td;

                let room_x = wall.width - td - x;
                if room_x <= 0 {
                    break;
                }

                let lead_x = if first_col { start_x } else { None };

                let mut w = tw - lead_x.unwrap_or(0);
                let clip_x = w > room_x;
                if clip_x {
                    w = room_x;
                    carry.max_x = Some(lead_x.unwrap_or(0) + w);
                }

                let cuts = CutEdges {
                    top: cut_top,
                    left: lead_x.is_some(),
                    right: clip_x,
                    bottom: cut_bottom
                };

                let cell = Tile::new(nominal, PxSize::new(w, h), cuts);
                let placed = Placed::new(Shape::Tile(cell), Position::new(at.x + x, top));
                let rect = placed.rect(canvas);

                let continuation = lead_x.is_some() || lead_y.is_some();
                let in_door = door.map_or(false, |d| placed.is_in_area(&d, canvas));

                if !continuation && !in_door {
                    count += 1;
                }

                tiles.push(PlacedTile {
                    tile: cell,
                    rect,
                    continuation,
                    in_door
                });

                x += w;
                first_col = false;

                if clip_x {
                    break;
                }

            }

            if clip_y {
                carry.max_y = Some(lead_y.unwrap_or(0) + h);
            }

            y += h;
            first_row = false;

            if clip_y {
                break;
            }

        }

        Ok(WallLayout {
            bounds: PxRect::new(at, wall),
            tiles,
            door,
            count,
            carry
        })

    }

}

fn checked_offset(what: &str, offset: Option<i32>, tile: i32) -> Result<Option<i32>> {

    match offset {
        Some(v) if v <= 0 || v >= tile => {
            bail!(ErrorKind::InvalidDimension(what.to_string(), v as f64))
        },
        _ => Ok(offset)
    }

}

impl Drawable for Wall {

    fn draw(&self, canvas: &Canvas, at: Position) -> Result<DrawReport> {

        // lay out first so nothing is drawn for a bad wall
        let layout = self.layout(canvas, at)?;

        let PxSize { width: w, height: h } = layout.bounds.size;

        canvas.line(at, at.offset(w, 0), &OUTLINE_COLOR);
        canvas.line(at.offset(w, 0), at.offset(w, h), &OUTLINE_COLOR);
        canvas.line(at.offset(w, h), at.offset(0, h), &OUTLINE_COLOR);
        canvas.line(at.offset(0, h), at, &OUTLINE_COLOR);

        if let Some(length) = self.contour_out {
            self.draw_contour_out(canvas, at, length);
        }

        for placed in layout.tiles.iter().filter(|t| !t.in_door) {
            Placed::new(Shape::Tile(placed.tile), placed.rect.pos).draw(canvas)?;
        }

        if let Some(door) = &layout.door {

            canvas.fill_rect(door, &WHITE);

            let bl = door.pos.offset(0, door.size.height);
            let br = door.pos.offset(door.size.width, door.size.height);
            let tr = door.pos.offset(door.size.width, 0);

            canvas.line(bl, door.pos, &CUT_COLOR);
            canvas.line(br, tr, &CUT_COLOR);
            canvas.line(door.pos, tr, &CUT_COLOR);

        }

        let cut = layout.tiles.iter().filter(|t| t.tile.cuts.any()).count();

        debug!("wall {:.0}x{:.0} mm: {} tiles ({} cut), start_x={:?} carry={:?}",
               self.size.width, self.size.height, layout.count, cut,
               self.options.start_x, layout.carry);

        Ok(DrawReport {
            bounds: layout.bounds,
            tiles: layout.count,
            carry: layout.carry,
            door: layout.door
        })

    }

    fn draw_contour_out(&self, canvas: &Canvas, at: Position, length: i32) {

        let PxSize { width: w, height: h } = self.footprint(canvas);

        let corners = [
            (at, -1, -1),
            (at.offset(w, 0), 1, -1),
            (at.offset(0, h), -1, 1),
            (at.offset(w, h), 1, 1)
        ];

        for &(p, sx, sy) in &corners {
            canvas.line(p, p.offset(sx * length, 0), &OUTLINE_COLOR);
            canvas.line(p, p.offset(0, sy * length), &OUTLINE_COLOR);
        }

    }

    fn size(&self) -> MmSize {
        self.size
    }

    fn footprint(&self, canvas: &Canvas) -> PxSize {
        PxSize::new(canvas.to_pixels(self.size.width),
                    canvas.to_pixels(self.size.height))
    }

}

//////////////////////////////////////////////////////////////////////
// closed set of drawable shapes

#[derive(Debug,Clone)]
pub enum Shape {
    Tile(Tile),
    Wall(Wall)
}

impl Drawable for Shape {

    fn draw(&self, canvas: &Canvas, at: Position) -> Result<DrawReport> {
        match self {
            Shape::Tile(t) => t.draw(canvas, at),
            Shape::Wall(w) => w.draw(canvas, at)
        }
    }

    fn draw_contour_out(&self, canvas: &Canvas, at: Position, length: i32) {
        match self {
            Shape::Tile(t) => t.draw_contour_out(canvas, at, length),
            Shape::Wall(w) => w.draw_contour_out(canvas, at, length)
        }
    }

    fn size(&self) -> MmSize {
        match self {
            Shape::Tile(t) => t.size(),
            Shape::Wall(w) => w.size()
        }
    }

    fn footprint(&self, canvas: &Canvas) -> PxSize {
        match self {
            Shape::Tile(t) => t.footprint(canvas),
            Shape::Wall(w) => w.footprint(canvas)
        }
    }

}

// a shape pinned to a canvas position
#[derive(Debug,Clone)]
pub struct Placed {
    pub shape: Shape,
    pub pos: Position
}

impl Placed {

    pub fn new(shape: Shape, pos: Position) -> Self {
        Placed { shape, pos }
    }

    pub fn draw(&self, canvas: &Canvas) -> Result<DrawReport> {
        self.shape.draw(canvas, self.pos)
    }

    pub fn rect(&self, canvas: &Canvas) -> PxRect {
        PxRect::new(self.pos, self.shape.footprint(canvas))
    }

    pub fn is_in_area(&self, area: &PxRect, canvas: &Canvas) -> bool {
        area.strictly_contains(&self.rect(canvas))
    }

}

//////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {

    use super::*;

    // 1 px per mm keeps the arithmetic readable
    fn canvas() -> Canvas {
        Canvas::with_scale(PxSize::new(2000, 1000), 1.0).unwrap()
    }

    fn options(w: u32, h: u32, d: f64) -> WallTileOptions {
        WallTileOptions::new(TileSpec::new(w, h, d).unwrap())
    }

    #[test]
    fn rows_and_columns_with_trailing_cut() {
        let canvas = canvas();
        let wall = Wall::new(250.0, 210.0, options(100, 100, 2.0)).unwrap()
            .with_direction(YDirection::TopDown);
        let layout = wall.layout(&canvas, Position::new(0, 0)).unwrap();

        // x: 2 + 100 + 2 + 100 + 2 + 42 (+ 2 trailing grout) = 250
        // y: 2 + 100 + 2 + 100 + 2 + 2 (+ 2) = 210
        assert_eq!(layout.tiles.len(), 9);
        assert_eq!(layout.count, 9);
        assert_eq!(layout.carry.max_x, Some(42));
        assert_eq!(layout.carry.max_y, Some(2));

        let last = layout.tiles[2];
        assert_eq!(last.rect, PxRect::new(Position::new(206, 2), PxSize::new(42, 100)));
        assert!(last.tile.cuts.right);
        assert!(!last.tile.cuts.left);

        let bottom = layout.tiles[6];
        assert_eq!(bottom.rect.size.height, 2);
        assert!(bottom.tile.cuts.bottom);
        assert!(!bottom.tile.cuts.top);
    }

    #[test]
    fn bottom_up_cuts_at_the_ceiling() {
        let canvas = canvas();
        let wall = Wall::new(250.0, 210.0, options(100, 100, 2.0)).unwrap();
        let layout = wall.layout(&canvas, Position::new(10, 20)).unwrap();

        let first = layout.tiles[0];
        // first row sits on the floor: 20 + 210 - (2 + 100)
        assert_eq!(first.rect.pos, Position::new(12, 128));

        let top_row = layout.tiles[6];
        assert_eq!(top_row.rect.pos.y, 20 + 210 - (206 + 2));
        assert!(top_row.tile.cuts.top);
        assert!(!top_row.tile.cuts.bottom);
    }

    #[test]
    fn inherited_offset_is_not_counted() {
        let canvas = canvas();
        let mut opts = options(100, 100, 2.0);
        opts.start_x = Some(42);
        let wall = Wall::new(250.0, 104.0, opts).unwrap();
        let layout = wall.layout(&canvas, Position::new(0, 0)).unwrap();

        // one row: 2 + 58 (rest of the cut tile) + 2 + 100 + 2 + 84 + 2
        let first = layout.tiles[0];
        assert_eq!(first.rect.size.width, 58);
        assert!(first.continuation);
        assert!(first.tile.cuts.left);
        assert_eq!(layout.tiles.len(), 3);
        assert_eq!(layout.count, 2);
        assert_eq!(layout.carry.max_x, Some(84));
    }

    #[test]
    fn exact_fit_leaves_no_carry() {
        let canvas = canvas();
        // 2 + 100 + 2 + 100 + 2 + 100 + 2 = 308
        let wall = Wall::new(308.0, 104.0, options(100, 100, 2.0)).unwrap();
        let layout = wall.layout(&canvas, Position::new(0, 0)).unwrap();
        assert_eq!(layout.count, 3);
        assert_eq!(layout.carry.max_x, None);
        assert!(layout.tiles.iter().all(|t| !t.tile.cuts.any()));
    }

    #[test]
    fn door_hides_whole_tiles_only() {
        let canvas = canvas();
        let door = DoorCutout::new(300.0, 250.0).unwrap();
        let wall = Wall::new(1000.0, 500.0, options(100, 100, 0.0)).unwrap()
            .with_door(door).unwrap();
        let layout = wall.layout(&canvas, Position::new(0, 0)).unwrap();

        let door_rect = layout.door.unwrap();
        assert_eq!(door_rect, PxRect::new(Position::new(350, 250), PxSize::new(300, 250)));

        let hidden: Vec<_> = layout.tiles.iter().filter(|t| t.in_door).collect();
        assert!(!hidden.is_empty());
        for t in &hidden {
            assert!(door_rect.strictly_contains(&t.rect));
        }

        let total = layout.tiles.iter().filter(|t| !t.continuation).count() as u64;
        assert_eq!(layout.count + hidden.len() as u64, total);
    }

    #[test]
    fn door_bigger_than_wall_is_rejected() {
        let door = DoorCutout::new(900.0, 2000.0).unwrap();
        let err = Wall::new(800.0, 2500.0, options(100, 100, 1.0)).unwrap()
            .with_door(door).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::DoorExceedsWall(..)));
    }

    #[test]
    fn bad_walls_are_rejected() {
        assert!(Wall::new(0.0, 100.0, options(100, 100, 1.0)).is_err());
        assert!(Wall::new(100.0, -3.0, options(100, 100, 1.0)).is_err());

        let mut opts = options(100, 100, 1.0);
        opts.start_x = Some(100);
        let wall = Wall::new(500.0, 500.0, opts).unwrap();
        assert!(wall.layout(&canvas(), Position::new(0, 0)).is_err());
    }

    #[test]
    fn directions() {
        assert_eq!(YDirection::from_name("top_down").unwrap(), YDirection::TopDown);
        assert_eq!(YDirection::from_sign(-1).unwrap(), YDirection::BottomUp);
        let err = YDirection::from_name("sideways").unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidDirection(..)));
        assert!(YDirection::from_sign(0).is_err());
    }

    #[test]
    fn placed_area_test() {
        let canvas = canvas();
        let tile = Tile::new(MmSize::new(100.0, 100.0), PxSize::new(10, 10), CutEdges::default());
        let area = PxRect::new(Position::new(0, 0), PxSize::new(50, 50));
        assert!(Placed::new(Shape::Tile(tile), Position::new(5, 5)).is_in_area(&area, &canvas));
        assert!(!Placed::new(Shape::Tile(tile), Position::new(40, 5)).is_in_area(&area, &canvas));
    }

    #[test]
    fn drawing_reports_layout() {
        let canvas = canvas();
        let wall = Wall::new(250.0, 210.0, options(100, 100, 2.0)).unwrap()
            .with_contour_out(15);
        let report = Placed::new(Shape::Wall(wall), Position::new(20, 20)).draw(&canvas).unwrap();
        assert_eq!(report.tiles, 9);
        assert_eq!(report.carry.max_x, Some(42));
        assert_eq!(report.bounds.size, PxSize::new(250, 210));
        assert_eq!(report.door, None);
    }

    #[test]
    fn drawing_reports_door_and_skips_its_tiles() {
        let canvas = canvas();
        let door = DoorCutout::new(300.0, 250.0).unwrap();
        let wall = Wall::new(1000.0, 500.0, options(100, 100, 0.0)).unwrap()
            .with_door(door).unwrap();
        let layout = wall.layout(&canvas, Position::new(10, 10)).unwrap();
        let report = Placed::new(Shape::Wall(wall), Position::new(10, 10)).draw(&canvas).unwrap();
        assert_eq!(report.door, Some(PxRect::new(Position::new(360, 260), PxSize::new(300, 250))));
        assert_eq!(report.tiles, layout.count);
        assert!(layout.tiles.iter().any(|t| t.in_door));
    }

}
