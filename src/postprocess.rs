//////////////////////////////////////////////////////////////////////
// Image -> Image steps run after a scene is rendered

use std::path::Path;

use image::io::Reader as ImageReader;
use log::{debug, warn};

use crate::canvas::*;
use crate::errors::*;

const MAX_FONT_ITERATIONS: usize = 1_000;

pub trait PostProcess {

    fn name(&self) -> &str;

    fn apply(&self, image: Image) -> Result<Image>;

}

// ordered list of post-processors, composed by the caller
#[derive(Default)]
pub struct Pipeline {
    steps: Vec<Box<dyn PostProcess>>
}

impl Pipeline {

    pub fn new() -> Self {
        Pipeline { steps: vec![] }
    }

    pub fn with(mut self, step: impl PostProcess + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn run(&self, image: Image) -> Result<Image> {

        if self.is_empty() {
            return Ok(image);
        }

        debug!("running {} post-processor(s)", self.len());

        let mut image = image;

        for step in &self.steps {
            image = step.apply(image).chain_err(|| format!("in post-processor {:}", step.name()))?;
        }

        Ok(image)

    }

}

//////////////////////////////////////////////////////////////////////
// semi-transparent label across the middle of the picture

#[derive(Debug,Clone,PartialEq)]
pub struct WatermarkConfig {
    pub text: String,
    pub font_family: String,
    pub max_font_size: f64,
    pub min_font_size: f64,
    pub font_step: f64,
    pub margin: f64,
    pub alpha: f64
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        WatermarkConfig {
            text: "www.tilecutter.ru".to_string(),
            font_family: "sans-serif".to_string(),
            max_font_size: 60.0,
            min_font_size: 1.0,
            font_step: 2.0,
            margin: 10.0,
            alpha: 128.0 / 255.0
        }
    }
}

// shrink from max_font_size until measure(size) fits inside bounds
// minus the margin; measure returns (width, height) of the text
pub fn fit_font_size<F>(config: &WatermarkConfig, bounds: PxSize, measure: F) -> f64
where F: Fn(f64) -> (f64, f64) {

    let (bw, bh) = (bounds.width as f64, bounds.height as f64);
    let step = config.font_step.max(f64::EPSILON);

    let mut size = config.max_font_size;

    for _ in 0..MAX_FONT_ITERATIONS {

        let (tw, th) = measure(size);

        if tw + config.margin < bw && th + config.margin < bh {
            return size;
        }

        if size - step < config.min_font_size {
            break;
        }

        size -= step;

    }

    warn!("watermark does not fit {}x{}, using font size {}",
          bounds.width, bounds.height, config.min_font_size);

    config.min_font_size

}

pub struct Watermark {
    config: WatermarkConfig
}

impl Watermark {

    pub fn new(config: WatermarkConfig) -> Self {
        Watermark { config }
    }

}

impl PostProcess for Watermark {

    fn name(&self) -> &str {
        "watermark"
    }

    fn apply(&self, image: Image) -> Result<Image> {

        let text = self.config.text.trim();

        if text.is_empty() {
            return Ok(image);
        }

        let out = Image::blank(image.size(), [0.0, 0.0, 0.0, 0.0])?;

        {

            let ctx = cairo::Context::new(out.surface());

            ctx.set_source_surface(image.surface(), 0.0, 0.0);
            ctx.paint();

            ctx.select_font_face(&self.config.font_family,
                                 cairo::FontSlant::Normal,
                                 cairo::FontWeight::Normal);

            let size = fit_font_size(&self.config, image.size(), |size| {
                ctx.set_font_size(size);
                let extents = ctx.text_extents(text);
                (extents.width, extents.height)
            });

            debug!("watermark font size {} for {}x{}", size, image.width(), image.height());

            ctx.set_font_size(size);

            let extents = ctx.text_extents(text);

            let x = 0.5 * image.width() as f64 - 0.5 * (extents.width + 2.0 * extents.x_bearing);
            let y = 0.5 * image.height() as f64 - 0.5 * (extents.height + 2.0 * extents.y_bearing);

            ctx.set_source_rgba(0.0, 0.0, 0.0, self.config.alpha);
            ctx.move_to(x, y);
            ctx.show_text(text);

        }

        Ok(out)

    }

}

pub fn apply_watermark(image: Image, text: &str) -> Result<Image> {

    let config = WatermarkConfig { text: text.to_string(), ..Default::default() };

    Watermark::new(config).apply(image)

}

//////////////////////////////////////////////////////////////////////
// repeat a texture under the picture; white parts of the picture
// take on the texture, lines stay put

pub struct Background {
    pattern: cairo::SurfacePattern
}

// decode a texture into a repeating cairo pattern; cairo wants BGRX
// rows padded out to its stride
fn load_texture(filename: &Path) -> Result<cairo::SurfacePattern> {

    let texture = ImageReader::open(filename)
        .and_then(|reader| reader.with_guessed_format())
        .chain_err(|| format!("texture file not found: {:}", filename.display()))?
        .decode()
        .chain_err(|| format!("can't decode texture {:}", filename.display()))?
        .to_bgra8();

    let (width, height) = texture.dimensions();

    if width == 0 || height == 0 {
        bail!("texture {:} is empty", filename.display());
    }

    let format = cairo::Format::Rgb24;

    let stride = format.stride_for_width(width)
        .map_err(|_| Error::from(format!("texture {:} is too wide", filename.display())))?
        as usize;

    let mut data = vec![0u8; stride * height as usize];

    let rows = texture.as_raw().chunks(width as usize * 4);

    for (src, dst) in rows.zip(data.chunks_mut(stride)) {
        dst[..src.len()].copy_from_slice(src);
    }

    let surface = cairo::ImageSurface::create_for_data(
        data, format, width as i32, height as i32, stride as i32)?;

    debug!("texture {:} is {}x{}", filename.display(), width, height);

    let pattern = cairo::SurfacePattern::create(&surface);
    pattern.set_extend(cairo::Extend::Repeat);

    Ok(pattern)

}

impl Background {

    pub fn from_file(filename: &Path) -> Result<Self> {
        Ok(Background { pattern: load_texture(filename)? })
    }

}

impl PostProcess for Background {

    fn name(&self) -> &str {
        "background"
    }

    fn apply(&self, image: Image) -> Result<Image> {

        let out = Image::blank(image.size(), WHITE)?;

        {
            let ctx = cairo::Context::new(out.surface());

            ctx.set_source(&self.pattern);
            ctx.paint();

            ctx.set_operator(cairo::Operator::Multiply);
            ctx.set_source_surface(image.surface(), 0.0, 0.0);
            ctx.paint();
        }

        Ok(out)

    }

}

//////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {

    use super::*;

    // pretend every glyph is 0.6 em wide and 1 em tall
    fn measure(chars: usize) -> impl Fn(f64) -> (f64, f64) {
        move |size| (0.6 * size * chars as f64, size)
    }

    #[test]
    fn font_fits_large_image_at_max_size() {
        let config = WatermarkConfig::default();
        let size = fit_font_size(&config, PxSize::new(1280, 720), measure(17));
        assert_eq!(size, 60.0);
    }

    #[test]
    fn font_shrinks_in_steps() {
        let config = WatermarkConfig::default();
        let size = fit_font_size(&config, PxSize::new(300, 300), measure(17));
        // 0.6 * 17 * s + 10 < 300 first holds at s = 28
        assert_eq!(size, 28.0);
        assert_eq!((config.max_font_size - size) % config.font_step, 0.0);
    }

    #[test]
    fn degenerate_image_gets_minimum_font() {
        let config = WatermarkConfig::default();
        let size = fit_font_size(&config, PxSize::new(4, 4), measure(17));
        assert_eq!(size, config.min_font_size);
    }

    struct Stamp(&'static str, std::rc::Rc<std::cell::RefCell<Vec<&'static str>>>);

    impl PostProcess for Stamp {
        fn name(&self) -> &str { self.0 }
        fn apply(&self, image: Image) -> Result<Image> {
            self.1.borrow_mut().push(self.0);
            Ok(image)
        }
    }

    #[test]
    fn pipeline_runs_in_order() {
        let log = std::rc::Rc::new(std::cell::RefCell::new(vec![]));
        let pipeline = Pipeline::new()
            .with(Stamp("first", log.clone()))
            .with(Stamp("second", log.clone()));
        assert_eq!(pipeline.len(), 2);
        let image = Image::blank(PxSize::new(8, 8), WHITE).unwrap();
        let out = pipeline.run(image).unwrap();
        assert_eq!(out.size(), PxSize::new(8, 8));
        assert_eq!(*log.borrow(), vec!["first", "second"]);
    }

    #[test]
    fn watermark_keeps_size_and_skips_blank_text() {
        let image = Image::blank(PxSize::new(200, 100), WHITE).unwrap();
        let out = Watermark::new(WatermarkConfig::default()).apply(image).unwrap();
        assert_eq!(out.size(), PxSize::new(200, 100));

        let image = Image::blank(PxSize::new(20, 10), WHITE).unwrap();
        assert_eq!(apply_watermark(image, "  ").unwrap().size(), PxSize::new(20, 10));
    }

    #[test]
    fn watermark_is_grey_and_centered() {
        let image = Image::blank(PxSize::new(400, 200), WHITE).unwrap();
        let out = apply_watermark(image, &WatermarkConfig::default().text).unwrap();

        let png = out.to_png().unwrap();
        let img = image::load_from_memory(&png).unwrap().to_rgba8();
        let (w, h) = img.dimensions();

        // half transparent black over white never gets darker than mid grey
        assert!(img.pixels().all(|p| p[0] >= 100 && p[1] >= 100 && p[2] >= 100));

        let mut center_darkened = false;
        for y in h / 4..3 * h / 4 {
            for x in w / 4..3 * w / 4 {
                if img.get_pixel(x, y)[0] < 200 {
                    center_darkened = true;
                }
            }
        }
        assert!(center_darkened);

        for x in 0..w {
            assert_eq!(img.get_pixel(x, 0)[0], 255);
            assert_eq!(img.get_pixel(x, h - 1)[0], 255);
        }
        for y in 0..h {
            assert_eq!(img.get_pixel(0, y)[0], 255);
            assert_eq!(img.get_pixel(w - 1, y)[0], 255);
        }
    }

    #[test]
    fn undecodable_texture_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tiles.png");
        std::fs::write(&path, b"not an image").unwrap();

        let err = Background::from_file(&path).err().unwrap();
        assert!(err.iter().any(|e| e.to_string().contains("tiles.png")), "{}", err);
    }

}
