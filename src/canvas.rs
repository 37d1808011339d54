//////////////////////////////////////////////////////////////////////
// mm -> pixel raster surface built on a cairo image surface

use std::path::Path;

use log::{debug, warn};

use crate::errors::*;

//////////////////////////////////////////////////////////////////////
// constants for the auto-fit scale search

const FIT_SHRINK: f64 = 0.9;
const FIT_GROW: f64 = 1.0625;
const MAX_FIT_ITERATIONS: usize = 10_000;
const MIN_SCALE_FACTOR: f64 = 1e-12;

// no surface bigger than this on either axis
pub const MAX_CANVAS_EDGE: i32 = 16_384;

//////////////////////////////////////////////////////////////////////
// colors are RGBA in [0, 1]

pub type Color = [f64; 4];

pub const WHITE: Color = [1.0, 1.0, 1.0, 1.0];
pub const OUTLINE_COLOR: Color = [80.0 / 255.0, 80.0 / 255.0, 80.0 / 255.0, 1.0];
pub const TILE_EDGE_COLOR: Color = [120.0 / 255.0, 120.0 / 255.0, 120.0 / 255.0, 1.0];
pub const CUT_COLOR: Color = [1.0, 0.0, 0.0, 1.0];
pub const TILE_FILL_COLOR: Color = [185.0 / 255.0, 203.0 / 255.0, 218.0 / 255.0, 1.0];
pub const FLOOR_LINE_COLOR: Color = [1.0, 0.0, 0.0, 1.0];

//////////////////////////////////////////////////////////////////////
// sizes never mix units: MmSize is real world, PxSize is raster

#[derive(Debug,PartialEq,Clone,Copy)]
pub struct MmSize {
    pub width: f64,
    pub height: f64
}

impl MmSize {
    pub fn new(width: f64, height: f64) -> Self {
        MmSize { width, height }
    }
}

#[derive(Debug,PartialEq,Eq,Clone,Copy,Default)]
pub struct Position {
    pub x: i32,
    pub y: i32
}

impl Position {

    pub fn new(x: i32, y: i32) -> Self {
        Position { x, y }
    }

    pub fn offset(&self, dx: i32, dy: i32) -> Self {
        Position { x: self.x + dx, y: self.y + dy }
    }

}

#[derive(Debug,PartialEq,Eq,Clone,Copy)]
pub struct PxSize {
    pub width: i32,
    pub height: i32
}

impl PxSize {
    pub fn new(width: i32, height: i32) -> Self {
        PxSize { width, height }
    }
}

// pixel rectangle, top left corner plus size
#[derive(Debug,PartialEq,Eq,Clone,Copy)]
pub struct PxRect {
    pub pos: Position,
    pub size: PxSize
}

impl PxRect {

    pub fn new(pos: Position, size: PxSize) -> Self {
        PxRect { pos, size }
    }

    pub fn right(&self) -> i32 { self.pos.x + self.size.width }
    pub fn bottom(&self) -> i32 { self.pos.y + self.size.height }

    // true if other lies inside self without touching its edges
    pub fn strictly_contains(&self, other: &PxRect) -> bool {
        other.pos.x > self.pos.x && other.right() < self.right() &&
            other.pos.y > self.pos.y && other.bottom() < self.bottom()
    }

}

//////////////////////////////////////////////////////////////////////

fn check_edge(what: &str, value: i32) -> Result<i32> {

    if value <= 0 || value > MAX_CANVAS_EDGE {
        bail!(ErrorKind::InvalidDimension(what.to_string(), value as f64));
    }

    Ok(value)

}

fn blank_surface(size: PxSize, background: Color) -> Result<(cairo::ImageSurface, cairo::Context)> {

    let width = check_edge("canvas width", size.width)?;
    let height = check_edge("canvas height", size.height)?;

    let surface = cairo::ImageSurface::create(cairo::Format::ARgb32, width, height)?;
    let ctx = cairo::Context::new(&surface);

    ctx.set_source_rgba(background[0], background[1], background[2], background[3]);
    ctx.paint();

    Ok((surface, ctx))

}

//////////////////////////////////////////////////////////////////////
// bounded hill climb: shrink while content overflows, grow while the
// grown content still fits, stop when neither step fires

pub fn fit_scale_factor(bound: PxSize, content: &MmSize) -> Result<f64> {

    let bw = check_edge("canvas width", bound.width)? as f64;
    let bh = check_edge("canvas height", bound.height)? as f64;

    ensure_positive("content width", content.width)?;
    ensure_positive("content height", content.height)?;

    let fits = |sf: f64| content.width * sf <= bw && content.height * sf <= bh;

    let mut sf = 1.0;
    let mut converged = false;

    for _ in 0..MAX_FIT_ITERATIONS {

        let mut change = false;

        if !fits(sf) {
            sf *= FIT_SHRINK;
            change = true;
        }

        if fits(sf * FIT_GROW) {
            sf *= FIT_GROW;
            change = true;
        }

        if !change {
            converged = true;
            break;
        }

    }

    if !converged {
        warn!("scale search hit {} iterations, settling on {}", MAX_FIT_ITERATIONS, sf);
    }

    while !fits(sf) && sf > MIN_SCALE_FACTOR {
        sf *= FIT_SHRINK;
    }

    Ok(sf.max(MIN_SCALE_FACTOR))

}

//////////////////////////////////////////////////////////////////////

pub struct Canvas {
    size: PxSize,
    scale_factor: f64,
    surface: cairo::ImageSurface,
    ctx: cairo::Context
}

impl Canvas {

    pub fn with_scale(size: PxSize, scale_factor: f64) -> Result<Canvas> {

        ensure_positive("scale factor", scale_factor)?;

        let (surface, ctx) = blank_surface(size, WHITE)?;

        // hard pixel edges so cut lines stay one pixel wide
        ctx.set_antialias(cairo::Antialias::None);
        ctx.set_line_width(1.0);
        ctx.set_line_cap(cairo::LineCap::Square);

        Ok(Canvas { size, scale_factor, surface, ctx })

    }

    // pick the largest scale factor that fits content into size
    pub fn fit(size: PxSize, content: &MmSize) -> Result<Canvas> {

        let sf = fit_scale_factor(size, content)?;

        debug!("scale factor auto set to: {:.6} for {:.1}x{:.1} mm in {}x{} px",
               sf, content.width, content.height, size.width, size.height);

        Self::with_scale(size, sf)

    }

    pub fn size(&self) -> PxSize {
        self.size
    }

    pub fn scale_factor(&self) -> f64 {
        self.scale_factor
    }

    pub fn to_pixels(&self, mm: f64) -> i32 {
        (self.scale_factor * mm).floor() as i32
    }

    fn set_color(&self, color: &Color) {
        self.ctx.set_source_rgba(color[0], color[1], color[2], color[3]);
    }

    // one pixel line through pixel centers, both ends inclusive
    pub fn line(&self, p0: Position, p1: Position, color: &Color) {

        self.set_color(color);
        self.ctx.move_to(p0.x as f64 + 0.5, p0.y as f64 + 0.5);
        self.ctx.line_to(p1.x as f64 + 0.5, p1.y as f64 + 0.5);
        self.ctx.stroke();

    }

    // line in fractional pixel coordinates, for slanted grids
    pub fn segment(&self, x0: f64, y0: f64, x1: f64, y1: f64, color: &Color) {

        self.set_color(color);
        self.ctx.move_to(x0, y0);
        self.ctx.line_to(x1, y1);
        self.ctx.stroke();

    }

    pub fn polygon(&self, points: &[Position], fill: &Color) {

        if points.len() < 3 {
            return;
        }

        self.set_color(fill);

        for (i, p) in points.iter().enumerate() {
            if i == 0 {
                self.ctx.move_to(p.x as f64, p.y as f64);
            } else {
                self.ctx.line_to(p.x as f64, p.y as f64);
            }
        }

        self.ctx.close_path();
        self.ctx.fill();

    }

    pub fn fill_rect(&self, rect: &PxRect, fill: &Color) {

        let PxRect { pos, size } = *rect;

        self.polygon(&[
            pos,
            pos.offset(size.width, 0),
            pos.offset(size.width, size.height),
            pos.offset(0, size.height)
        ], fill);

    }

    // keep only the top left width x height pixels
    pub fn crop(&mut self, size: PxSize) -> Result<()> {

        let size = PxSize::new(size.width.min(self.size.width),
                               size.height.min(self.size.height));

        if size == self.size {
            return Ok(());
        }

        let (surface, ctx) = blank_surface(size, WHITE)?;

        ctx.set_source_surface(&self.surface, 0.0, 0.0);
        ctx.paint();

        ctx.set_antialias(cairo::Antialias::None);
        ctx.set_line_width(1.0);
        ctx.set_line_cap(cairo::LineCap::Square);

        debug!("cropped canvas {}x{} -> {}x{}",
               self.size.width, self.size.height, size.width, size.height);

        self.surface = surface;
        self.ctx = ctx;
        self.size = size;

        Ok(())

    }

    pub fn into_image(self) -> Image {
        Image::from_surface(self.surface, self.size)
    }

}

//////////////////////////////////////////////////////////////////////
// a finished raster, what post-processors consume and produce

pub struct Image {
    surface: cairo::ImageSurface,
    size: PxSize
}

impl Image {

    pub fn from_surface(surface: cairo::ImageSurface, size: PxSize) -> Image {
        Image { surface, size }
    }

    pub fn blank(size: PxSize, background: Color) -> Result<Image> {
        let (surface, _) = blank_surface(size, background)?;
        Ok(Image { surface, size })
    }

    pub fn size(&self) -> PxSize {
        self.size
    }

    pub fn width(&self) -> i32 {
        self.size.width
    }

    pub fn height(&self) -> i32 {
        self.size.height
    }

    pub fn surface(&self) -> &cairo::ImageSurface {
        &self.surface
    }

    // scale and whole-pixel offset that letterbox() applies
    pub fn letterbox_transform(&self, target: PxSize) -> (f64, f64, f64) {

        if self.size == target {
            return (1.0, 0.0, 0.0);
        }

        let sw = target.width as f64 / self.size.width as f64;
        let sh = target.height as f64 / self.size.height as f64;
        let scl = sw.min(sh);

        let dx = 0.5 * (target.width as f64 - scl * self.size.width as f64);
        let dy = 0.5 * (target.height as f64 - scl * self.size.height as f64);

        (scl, dx.floor(), dy.floor())

    }

    // new image of target size holding this one scaled uniformly and
    // centered, white elsewhere
    pub fn letterbox(&self, target: PxSize) -> Result<Image> {

        let (scl, dx, dy) = self.letterbox_transform(target);

        let out = Image::blank(target, WHITE)?;

        {
            let ctx = cairo::Context::new(&out.surface);
            ctx.translate(dx, dy);
            ctx.scale(scl, scl);
            ctx.set_source_surface(&self.surface, 0.0, 0.0);
            ctx.paint();
        }

        Ok(out)

    }

    pub fn to_png(&self) -> Result<Vec<u8>> {

        let mut buf: Vec<u8> = vec![];

        self.surface.flush();
        self.surface.write_to_png(&mut buf)
            .map_err(|e| Error::from(format!("error encoding png: {:?}", e)))?;

        Ok(buf)

    }

    pub fn save_png(&self, path: &Path) -> Result<()> {

        let buf = self.to_png()?;

        std::fs::write(path, buf).chain_err(|| format!("writing {:}", path.display()))?;

        Ok(())

    }

}

//////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn auto_fit_stays_in_bounds() {
        let bounds = [PxSize::new(1000, 1000), PxSize::new(1280, 720), PxSize::new(3, 500)];
        let contents = [MmSize::new(3950.0, 2460.0), MmSize::new(1e-3, 2e-3),
                        MmSize::new(12.0, 12.0), MmSize::new(1e6, 10.0)];
        for bound in &bounds {
            for content in &contents {
                let sf = fit_scale_factor(*bound, content).unwrap();
                assert!(sf > 0.0);
                assert!((content.width * sf).floor() as i32 <= bound.width);
                assert!((content.height * sf).floor() as i32 <= bound.height);
            }
        }
    }

    #[test]
    fn auto_fit_is_close_to_the_limit() {
        let content = MmSize::new(3950.0, 2460.0);
        let sf = fit_scale_factor(PxSize::new(1000, 1000), &content).unwrap();
        // one more growth step would overflow the longer side
        assert!(content.width * sf * FIT_GROW > 1000.0);
    }

    #[test]
    fn auto_fit_rejects_empty_content() {
        assert!(fit_scale_factor(PxSize::new(100, 100), &MmSize::new(0.0, 10.0)).is_err());
        assert!(fit_scale_factor(PxSize::new(0, 100), &MmSize::new(10.0, 10.0)).is_err());
    }

    #[test]
    fn to_pixels_floors() {
        let canvas = Canvas::with_scale(PxSize::new(10, 10), 0.25).unwrap();
        assert_eq!(canvas.to_pixels(10.0), 2);
        assert_eq!(canvas.to_pixels(11.9), 2);
        assert_eq!(canvas.to_pixels(12.0), 3);
    }

    #[test]
    fn crop_never_grows() {
        let mut canvas = Canvas::with_scale(PxSize::new(100, 50), 1.0).unwrap();
        canvas.crop(PxSize::new(60, 80)).unwrap();
        assert_eq!(canvas.size(), PxSize::new(60, 50));
    }

    #[test]
    fn strict_containment() {
        let door = PxRect::new(Position::new(10, 10), PxSize::new(20, 20));
        assert!(door.strictly_contains(&PxRect::new(Position::new(11, 11), PxSize::new(5, 5))));
        assert!(!door.strictly_contains(&PxRect::new(Position::new(10, 11), PxSize::new(5, 5))));
        assert!(!door.strictly_contains(&PxRect::new(Position::new(20, 20), PxSize::new(10, 5))));
    }

}
