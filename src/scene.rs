//////////////////////////////////////////////////////////////////////
// whole pictures: one floor plan, or four walls unrolled side by side

use log::{debug, info};

use crate::canvas::*;
use crate::errors::*;
use crate::geometry::{DoorCutout, LayingMethod, Surface, TileSpec};
use crate::layout::*;

//////////////////////////////////////////////////////////////////////
// pull in some types from nalgebra

type Vec2d = nalgebra::Vector2<f64>;
type Point2d = nalgebra::geometry::Point2<f64>;

const SQRT_2: f64 = std::f64::consts::SQRT_2;

// wall scheme proportions, relative to the room length
const CONTOUR_PERCENT: f64 = 3.0;
const PADDING_PERCENT: f64 = 8.0;
const GAP_CONTOURS: f64 = 3.0;

// which of the four unrolled walls holds the door
const DOOR_WALL: usize = 2;

#[derive(Debug,Clone,Copy)]
pub struct SceneConfig {
    pub floor_bound: PxSize,
    pub wall_target: PxSize,
    pub direction: YDirection
}

impl Default for SceneConfig {
    fn default() -> Self {
        SceneConfig {
            floor_bound: PxSize::new(1000, 1000),
            wall_target: PxSize::new(1280, 720),
            direction: YDirection::default()
        }
    }
}

//////////////////////////////////////////////////////////////////////
// grout center lines along one axis of a floor, in mm from the edge

pub fn axis_lines(span: f64, tile: f64, delimiter: f64, method: LayingMethod) -> Result<Vec<f64>> {

    let step = tile + delimiter;
    let mut lines = Vec::new();

    match method {

        // tile k starts at d + k*step, the line before it sits mid grout
        LayingMethod::Direct => {
            let mut k = 1.0;
            while k * step + delimiter < span {
                lines.push(k * step + 0.5 * delimiter);
                k += 1.0;
            }
        },

        // the center tile straddles span/2, walk outwards both ways
        LayingMethod::DirectCenter => {
            let center = 0.5 * span;
            let mut offset = 0.5 * tile + 0.5 * delimiter;
            while center + offset + 0.5 * delimiter < span {
                lines.push(center - offset);
                lines.push(center + offset);
                offset += step;
            }
            lines.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        },

        LayingMethod::Diagonal => {
            bail!(ErrorKind::UnsupportedMethod("axis lines for diagonal".to_string()));
        }

    }

    Ok(lines)

}

//////////////////////////////////////////////////////////////////////

fn draw_border(canvas: &Canvas, size: PxSize, color: &Color) {

    let (r, b) = (size.width - 1, size.height - 1);

    canvas.line(Position::new(0, 0), Position::new(r, 0), color);
    canvas.line(Position::new(r, 0), Position::new(r, b), color);
    canvas.line(Position::new(r, b), Position::new(0, b), color);
    canvas.line(Position::new(0, b), Position::new(0, 0), color);

}

fn draw_axis_grid(canvas: &Canvas, surface: &Surface, tile: &TileSpec,
                  method: LayingMethod, size: PxSize) -> Result<()> {

    let d = tile.delimiter;

    // tiny tiles can map several lines onto one pixel column
    let mut last = -1;

    for x in axis_lines(surface.length, tile.w(), d, method)? {
        let px = canvas.to_pixels(x);
        if px > 0 && px < size.width - 1 && px != last {
            canvas.line(Position::new(px, 0), Position::new(px, size.height - 1),
                        &FLOOR_LINE_COLOR);
            last = px;
        }
    }

    last = -1;

    for y in axis_lines(surface.width, tile.h(), d, method)? {
        let py = canvas.to_pixels(y);
        if py > 0 && py < size.height - 1 && py != last {
            canvas.line(Position::new(0, py), Position::new(size.width - 1, py),
                        &FLOOR_LINE_COLOR);
            last = py;
        }
    }

    Ok(())

}

// two families of 45 degree lines through the grout around the
// diamond centered on the floor
fn draw_diagonal_grid(canvas: &Canvas, tile: &TileSpec, size: PxSize) {

    let sf = canvas.scale_factor();

    let diag = sf * SQRT_2 * tile.w();
    let ddiag = sf * SQRT_2 * tile.delimiter;
    let repeat = diag + ddiag;

    let (w, h) = (size.width as f64, size.height as f64);
    let center = Point2d::new(0.5 * w, 0.5 * h);

    let first = 0.5 * (diag + ddiag);

    // x - y = u lines run down-right, x + y = v lines run down-left
    let u0 = center.x - center.y + first;
    let v0 = center.x + center.y + first;

    let families = [
        (u0, -h, w, Vec2d::new(1.0, 1.0)),
        (v0, 0.0, w + h, Vec2d::new(-1.0, 1.0))
    ];

    for &(origin, lo, hi, dir) in &families {

        let kmin = ((lo - origin) / repeat).floor() as i64 - 1;
        let kmax = ((hi - origin) / repeat).ceil() as i64 + 1;

        for k in kmin..=kmax {
            let anchor = Point2d::new(origin + k as f64 * repeat, 0.0);
            let end = anchor + dir * h;
            canvas.segment(anchor.x, anchor.y, end.x, end.y, &FLOOR_LINE_COLOR);
        }

    }

}

pub fn render_floor(surface: &Surface, tile: &TileSpec, method: LayingMethod,
                    config: &SceneConfig) -> Result<Image> {

    if method == LayingMethod::Diagonal && !tile.is_square() {
        bail!(ErrorKind::IncompatibleTileShape(tile.w(), tile.h()));
    }

    let content = MmSize::new(surface.length, surface.width);

    let mut canvas = Canvas::fit(config.floor_bound, &content)?;

    let size = PxSize::new(canvas.to_pixels(surface.length).max(1),
                           canvas.to_pixels(surface.width).max(1));

    canvas.crop(size)?;

    match method {
        LayingMethod::Direct | LayingMethod::DirectCenter => {
            draw_axis_grid(&canvas, surface, tile, method, size)?;
        },
        LayingMethod::Diagonal => {
            draw_diagonal_grid(&canvas, tile, size);
        }
    }

    draw_border(&canvas, size, &FLOOR_LINE_COLOR);

    info!("rendered {:?} floor {}x{} px", method, size.width, size.height);

    Ok(canvas.into_image())

}

//////////////////////////////////////////////////////////////////////

#[derive(Debug,PartialEq,Clone,Copy)]
pub struct WallReport {
    pub span: f64,
    pub start_x: Option<i32>,
    pub tiles: u64,
    pub carry: Carry,
    // door opening in pixels of the final image
    pub door: Option<PxRect>
}

pub struct RoomRender {
    pub image: Image,
    pub walls: Vec<WallReport>,
    pub tiles: u64
}

// expected extent of the wall scheme in mm
fn room_content(room: &Surface, height: f64) -> (MmSize, f64, f64, f64) {

    let contour = room.length / 100.0 * CONTOUR_PERCENT;
    let gap = contour * GAP_CONTOURS;
    let padding = room.length / 100.0 * PADDING_PERCENT;

    let content = MmSize::new(
        room.perimeter() + gap * 3.0 + padding * 2.0,
        height + contour * 2.0
    );

    (content, contour, gap, padding)

}

pub fn render_room_walls(room: &Surface, tile: &TileSpec, door: Option<&DoorCutout>,
                         config: &SceneConfig) -> Result<RoomRender> {

    let height = room.wall_height()?;

    if let Some(door) = door {
        door.check_fits(room)?;
    }

    let (content, contour, gap, padding) = room_content(room, height);

    let target = config.wall_target;
    let mut canvas = Canvas::fit(target, &content)?;

    let contour_px = canvas.to_pixels(contour);
    let gap_px = canvas.to_pixels(gap);
    let padding_px = canvas.to_pixels(padding);

    let top = target.height / 2 - canvas.to_pixels(content.height) / 2 + contour_px;

    let spans = [room.length, room.width, room.length, room.width];

    let mut walls = Vec::with_capacity(spans.len());
    let mut carry = Carry::default();
    let mut x = padding_px;
    let mut right = x;

    for (i, &span) in spans.iter().enumerate() {

        let options = if i == 0 {
            WallTileOptions::new(*tile)
        } else {
            WallTileOptions::continuing(*tile, &carry)
        };

        let mut wall = Wall::new(span, height, options)?
            .with_direction(config.direction)
            .with_contour_out(contour_px);

        if i == DOOR_WALL {
            if let Some(door) = door {
                wall = wall.with_door(*door)?;
            }
        }

        let report = Placed::new(Shape::Wall(wall), Position::new(x, top)).draw(&canvas)?;

        walls.push(WallReport {
            span,
            start_x: options.start_x,
            tiles: report.tiles,
            carry: report.carry,
            door: report.door
        });

        carry = report.carry;
        right = report.bounds.right();
        x = right + gap_px;

    }

    // the last wall's trailing cut has nowhere to go
    debug!("dropping carry {:?} of the last wall", carry);

    let used_width = right + padding_px;

    if used_width < canvas.size().width {
        canvas.crop(PxSize::new(used_width, target.height))?;
    }

    let mut image = canvas.into_image();

    if image.size() != target {

        let (scl, dx, dy) = image.letterbox_transform(target);

        for wall in walls.iter_mut() {
            wall.door = wall.door.map(|r| {
                let x0 = (dx + scl * r.pos.x as f64).ceil() as i32;
                let y0 = (dy + scl * r.pos.y as f64).ceil() as i32;
                let x1 = (dx + scl * r.right() as f64).floor() as i32;
                let y1 = (dy + scl * r.bottom() as f64).floor() as i32;
                PxRect::new(Position::new(x0, y0), PxSize::new(x1 - x0, y1 - y0))
            });
        }

        image = image.letterbox(target)?;

    }

    let tiles = walls.iter().map(|w| w.tiles).sum();

    info!("rendered {} walls, {} tiles drawn, {}x{} px",
          walls.len(), tiles, image.width(), image.height());

    Ok(RoomRender { image, walls, tiles })

}

//////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {

    use super::*;

    fn tile(w: u32, h: u32, d: f64) -> TileSpec {
        TileSpec::new(w, h, d).unwrap()
    }

    #[test]
    fn direct_lines_match_direct_count() {
        let lines = axis_lines(3950.0, 400.0, 1.5, LayingMethod::Direct).unwrap();
        assert_eq!(lines.len() as u64 + 1, crate::geometry::direct_count(3950.0, 400.0, 1.5));
        assert!((lines[0] - 402.25).abs() < 1e-9);
    }

    #[test]
    fn center_lines_are_symmetric() {
        let span = 2460.0;
        let lines = axis_lines(span, 400.0, 1.5, LayingMethod::DirectCenter).unwrap();
        assert_eq!(lines.len() % 2, 0);
        let n = lines.len();
        for i in 0..n / 2 {
            assert!((lines[i] + lines[n - 1 - i] - span).abs() < 1e-9);
        }
        assert_eq!(lines.len() as u64 + 1,
                   crate::geometry::direct_center_count(span, 400.0, 1.5));
    }

    #[test]
    fn diagonal_floor_needs_square_tiles() {
        let floor = Surface::floor(3000.0, 2000.0).unwrap();
        let err = render_floor(&floor, &tile(400, 200, 1.0), LayingMethod::Diagonal,
                               &SceneConfig::default());
        assert!(matches!(err.err().map(|e| e.0), Some(ErrorKind::IncompatibleTileShape(..))));
    }

    #[test]
    fn floor_image_fits_bound() {
        let config = SceneConfig::default();
        let floor = Surface::floor(3950.0, 2460.0).unwrap();
        for &method in &[LayingMethod::Direct, LayingMethod::DirectCenter, LayingMethod::Diagonal] {
            let image = render_floor(&floor, &tile(400, 400, 1.5), method, &config).unwrap();
            assert!(image.width() <= config.floor_bound.width);
            assert!(image.height() <= config.floor_bound.height);
            assert!(image.width() > image.height());
        }
    }

    #[test]
    fn walls_chain_their_cuts() {
        let room = Surface::room(3950.0, 2460.0, 2450.0).unwrap();
        let door = DoorCutout::new(600.0, 2100.0).unwrap();
        let render = render_room_walls(&room, &tile(400, 280, 1.5), Some(&door),
                                       &SceneConfig::default()).unwrap();

        assert_eq!(render.walls.len(), 4);
        assert_eq!(render.walls[0].start_x, None);
        for pair in render.walls.windows(2) {
            assert_eq!(pair[0].carry.max_x, pair[1].start_x);
        }
        assert_eq!(render.image.size(), SceneConfig::default().wall_target);
        assert_eq!(render.tiles, render.walls.iter().map(|w| w.tiles).sum::<u64>());
    }

    #[test]
    fn oversized_door_is_rejected_before_drawing() {
        let room = Surface::room(3000.0, 800.0, 2500.0).unwrap();
        let door = DoorCutout::new(900.0, 2000.0).unwrap();
        let err = render_room_walls(&room, &tile(200, 200, 1.0), Some(&door),
                                    &SceneConfig::default());
        assert!(matches!(err.err().map(|e| e.0), Some(ErrorKind::DoorExceedsWall(..))));
    }

}
