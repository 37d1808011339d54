//////////////////////////////////////////////////////////////////////
// job files: one keyword per line, '#' starts a comment
//
//   room 3950 2460 2450
//   tile 400 280
//   delimiter 1.5
//   door 600 2100
//   reserve 5

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use log::info;

use crate::errors::*;
use crate::geometry::*;
use crate::layout::YDirection;
use crate::postprocess::*;
use crate::scene::*;

//////////////////////////////////////////////////////////////////////

#[derive(Debug,PartialEq,Clone,Copy)]
pub enum JobKind {
    Floor { length: f64, width: f64 },
    Room { length: f64, width: f64, height: f64 },
    TileCost
}

#[derive(Debug,PartialEq,Clone)]
pub enum WatermarkSetting {
    Text(String),
    Off
}

// raw keyword values as read from the file
#[derive(Debug,PartialEq,Clone,Default)]
pub struct JobSpec {
    kind: Option<JobKind>,
    tile: Option<(u32, u32)>,
    delimiter: Option<f64>,
    method: Option<LayingMethod>,
    direction: Option<YDirection>,
    door: Option<(f64, f64)>,
    price: Option<f64>,
    reserve: Option<f64>,
    watermark: Option<WatermarkSetting>,
    watermark_font: Option<String>,
    background: Option<PathBuf>,
    output: Option<PathBuf>
}

//////////////////////////////////////////////////////////////////////
// macro for parsing the tokens following a keyword

macro_rules! parse_tokens {

    // finalizer - no more input to match, just error if remaining
    // input or return collected outputs
    ($it:ident { } -> { $($tuple:ident,)* } ) => (
        match $it.next() {
            Some(value) => Err(format!("found extra token(s) starting with \"{:}\"", value)),
            None => Ok(($($tuple),*))
        }
    );

    // name, type pair
    ($it:ident { $name:ident : $type:ident, $($ts:tt)* } -> { $($tuple:ident,)* } ) => (
        match $it.next() {
            None => Err(format!("missing token for {:}", stringify!($name)) ),
            Some(value) => if let Ok($name) = value.parse::<$type>() {
                parse_tokens!( $it { $($ts)* } -> { $($tuple,)* $name, } )
            } else {
                Err(format!("error parsing {:} as type {:}",
                            value, stringify!($type)))
            }
        }
    );

    // Entry point
    ($a:expr, { $($ts:tt)+ }) => (
        {
            let mut it = $a.iter();
            parse_tokens!( it { $($ts)* , } -> { } )
        }
    );

    // Entry point
    ($a:expr, { }) => (
        {
            let mut it = $a.iter();
            parse_tokens!( it { } -> { } )
        }
    )

}

//////////////////////////////////////////////////////////////////////
// macros for inspecting/validating individual fields of JobSpec

macro_rules! copy_field {

    ($dst:ident, $src:ident, $field:ident) => (
        if $src.$field.is_some() {
            if $dst.$field.is_some() {
                bail!("{:} is already set", stringify!($field));
            }
            $dst.$field = $src.$field;
        }
    )

}

//////////////////////////////////////////////////////////////////////

fn rel_path(orig_filename: &Path, child_filename: &str) -> PathBuf {

    match orig_filename.parent() {
        None => PathBuf::from(child_filename),
        Some(parent) => parent.join(child_filename)
    }

}

impl JobSpec {

    pub fn new() -> JobSpec {
        Default::default()
    }

    fn update(&mut self, other: JobSpec) -> Result<()> {

        copy_field!(self, other, kind);
        copy_field!(self, other, tile);
        copy_field!(self, other, delimiter);
        copy_field!(self, other, method);
        copy_field!(self, other, direction);
        copy_field!(self, other, door);
        copy_field!(self, other, price);
        copy_field!(self, other, reserve);
        copy_field!(self, other, watermark);
        copy_field!(self, other, watermark_font);
        copy_field!(self, other, background);
        copy_field!(self, other, output);

        Ok(())

    }

    fn parse_keyword(filename: &Path,
                     keyword: &str,
                     rest: &[&str]) -> Result<JobSpec> {

        let mut update = JobSpec::new();

        match keyword {

            "floor" => {

                let (length, width) = parse_tokens!(rest, { length: f64, width: f64 })?;

                update.kind = Some(JobKind::Floor { length, width });

            },

            "room" => {

                let (length, width, height) = parse_tokens!(rest, {
                    length: f64,
                    width: f64,
                    height: f64
                })?;

                update.kind = Some(JobKind::Room { length, width, height });

            },

            "tile_cost" => {

                parse_tokens!(rest, { })?;

                update.kind = Some(JobKind::TileCost);

            },

            "tile" => {

                let (width, height) = parse_tokens!(rest, { width: u32, height: u32 })?;

                update.tile = Some((width, height));

            },

            "delimiter" => {

                let length = parse_tokens!(rest, { length: f64 })?;

                update.delimiter = Some(length);

            },

            "method" => {

                let name = parse_tokens!(rest, { name: String })?;

                // calculator form codes 1, 2, 3 are accepted too
                let method = match name.parse::<i64>() {
                    Ok(code) => LayingMethod::from_code(code)?,
                    Err(_) => LayingMethod::from_name(&name)?
                };

                update.method = Some(method);

            },

            "direction" => {

                let name = parse_tokens!(rest, { name: String })?;

                let direction = match name.parse::<i32>() {
                    Ok(sign) => YDirection::from_sign(sign)?,
                    Err(_) => YDirection::from_name(&name)?
                };

                update.direction = Some(direction);

            },

            "door" => {

                let (w, h) = parse_tokens!(rest, { width: f64, height: f64 })?;

                update.door = Some((w, h));

            },

            "price" => {

                let price = parse_tokens!(rest, { price: f64 })?;

                update.price = Some(price);

            },

            "reserve" => {

                let percent = parse_tokens!(rest, { percent: f64 })?;

                if !(0.0..=100.0).contains(&percent) {
                    bail!("reserve must be between 0 and 100 percent");
                }

                update.reserve = Some(percent);

            },

            "watermark" => {

                if rest.is_empty() {
                    bail!("missing token for text");
                }

                update.watermark = Some(WatermarkSetting::Text(rest.join(" ")));

            },

            "no_watermark" => {

                parse_tokens!(rest, { })?;

                update.watermark = Some(WatermarkSetting::Off);

            },

            "watermark_font" => {

                let family = parse_tokens!(rest, { family: String })?;

                update.watermark_font = Some(family);

            },

            "background" => {

                let bfilename = parse_tokens!(rest, { filename: String })?;

                update.background = Some(rel_path(filename, &bfilename));

            },

            "output" => {

                let ofilename = parse_tokens!(rest, { filename: String })?;

                update.output = Some(rel_path(filename, &ofilename));

            },

            _ => {
                bail!("unrecognized keyword");
            }

        };

        Ok(update)

    }

    fn update_from(&mut self, filename: &Path, line: &str) -> Result<()> {

        let mut trimmed = line.trim();

        if let Some(pos) = trimmed.find('#') {
            trimmed = &trimmed[0..pos];
        }

        let tokens: Vec<&str> = trimmed.split_whitespace().collect();

        if tokens.is_empty() {
            return Ok(());
        }

        let keyword = tokens[0];
        let rest = &tokens[1..];

        let update = Self::parse_keyword(filename, keyword, rest).chain_err(
            || format!("while parsing keyword {:}", keyword))?;

        self.update(update)

    }

    pub fn parse(filename: &Path, istr: &mut impl BufRead) -> Result<JobSpec> {

        let mut js = JobSpec::new();
        let mut lineno = 0;

        loop {

            let mut line = String::new();

            lineno += 1;

            let len = istr.read_line(&mut line).chain_err(
                || format!("{:}:{:}: read error", filename.display(), lineno))?;

            if len == 0 {
                break;
            }

            js.update_from(filename, line.as_str()).chain_err(
                || format!("{:}:{:}: parse error", filename.display(), lineno))?;

        }

        let mut unset_fields = Vec::new();

        if js.kind.is_none() {
            unset_fields.push("floor/room/tile_cost");
        }

        if js.tile.is_none() {
            unset_fields.push("tile");
        }

        if js.kind == Some(JobKind::TileCost) && js.price.is_none() {
            unset_fields.push("price");
        }

        if !unset_fields.is_empty() {
            bail!("{:}: the following field(s) were unset: {:}",
                  filename.display(), unset_fields.as_slice().join(", "));
        }

        Ok(js)

    }

    pub fn load(filename: &Path) -> Result<JobSpec> {

        let f = File::open(filename).chain_err(|| format!("opening {:}", filename.display()))?;
        let mut reader = BufReader::new(f);

        Self::parse(filename, &mut reader)

    }

}

//////////////////////////////////////////////////////////////////////
// a validated job, ready to run

#[derive(Debug,Clone)]
pub struct Job {
    pub kind: JobKind,
    pub tile: TileSpec,
    pub method: LayingMethod,
    pub door: Option<DoorCutout>,
    pub price: Option<f64>,
    pub reserve: f64,
    pub scene: SceneConfig,
    pub watermark: Option<WatermarkConfig>,
    pub background: Option<PathBuf>,
    pub output: PathBuf
}

#[derive(Debug,Clone,PartialEq)]
pub enum JobResult {
    Estimate { estimate: Estimate, image: PathBuf },
    TileCost { area_m2: f64, cost: f64 }
}

impl Job {

    pub fn from_spec(filename: &Path, js: JobSpec) -> Result<Job> {

        let kind = match js.kind {
            Some(kind) => kind,
            None => bail!("no job kind")
        };

        let (tw, th) = match js.tile {
            Some(dims) => dims,
            None => bail!("no tile size")
        };

        let tile = TileSpec::new(tw, th, js.delimiter.unwrap_or(0.0))?;

        let door = match js.door {
            Some((w, h)) => {
                if let JobKind::Floor { .. } = kind {
                    bail!("door only makes sense for a room");
                }
                Some(DoorCutout::new(w, h)?)
            },
            None => None
        };

        let mut scene = SceneConfig::default();

        if let Some(direction) = js.direction {
            scene.direction = direction;
        }

        let watermark = match js.watermark {
            Some(WatermarkSetting::Off) => None,
            setting => {
                let mut config = WatermarkConfig::default();
                if let Some(WatermarkSetting::Text(text)) = setting {
                    config.text = text;
                }
                if let Some(family) = js.watermark_font {
                    config.font_family = family;
                }
                Some(config)
            }
        };

        let output = match js.output {
            Some(output) => output,
            None => {
                let basename = match filename.file_stem() {
                    None => "output",
                    Some(os_str) => os_str.to_str().unwrap_or("output")
                };
                rel_path(filename, &(basename.to_owned() + ".png"))
            }
        };

        Ok(Job {
            kind,
            tile,
            method: js.method.unwrap_or(LayingMethod::Direct),
            door,
            price: js.price,
            reserve: js.reserve.unwrap_or(0.0),
            scene,
            watermark,
            background: js.background,
            output
        })

    }

    pub fn load(filename: &Path) -> Result<Job> {
        let js = JobSpec::load(filename)?;
        Self::from_spec(filename, js)
    }

    pub fn pipeline(&self) -> Result<Pipeline> {

        let mut pipeline = Pipeline::new();

        if let Some(background) = &self.background {
            pipeline = pipeline.with(Background::from_file(background)?);
        }

        if let Some(config) = &self.watermark {
            pipeline = pipeline.with(Watermark::new(config.clone()));
        }

        Ok(pipeline)

    }

    pub fn run(&self) -> Result<JobResult> {

        let (estimate, image) = match self.kind {

            JobKind::TileCost => {
                let price = self.price.unwrap_or(0.0);
                let (area_m2, cost) = tile_cost(&self.tile, price)?;
                return Ok(JobResult::TileCost { area_m2, cost });
            },

            JobKind::Floor { length, width } => {
                let floor = Surface::floor(length, width)?;
                let estimate = estimate_floor(&floor, &self.tile, self.method,
                                              self.reserve, self.price)?;
                let image = render_floor(&floor, &self.tile, self.method, &self.scene)?;
                (estimate, image)
            },

            JobKind::Room { length, width, height } => {
                let room = Surface::room(length, width, height)?;
                let door = self.door.as_ref();
                let estimate = estimate_walls(&room, &self.tile, door,
                                              self.reserve, self.price)?;
                let render = render_room_walls(&room, &self.tile, door, &self.scene)?;
                (estimate, render.image)
            }

        };

        let image = self.pipeline()?.run(image)?;

        image.save_png(&self.output)?;

        info!("wrote {:}", self.output.display());

        Ok(JobResult::Estimate { estimate, image: self.output.clone() })

    }

}

//////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {

    use super::*;

    fn parse(text: &str) -> Result<JobSpec> {
        JobSpec::parse(Path::new("jobs/test.job"), &mut text.as_bytes())
    }

    #[test]
    fn parses_a_room_job() {
        let js = parse("# bathroom\n\
                        room 3950 2460 2450\n\
                        tile 400 280   # wide tiles\n\
                        delimiter 1.5\n\
                        door 600 2100\n\
                        reserve 5\n\
                        direction top_down\n").unwrap();
        let job = Job::from_spec(Path::new("jobs/test.job"), js).unwrap();
        assert_eq!(job.kind, JobKind::Room { length: 3950.0, width: 2460.0, height: 2450.0 });
        assert_eq!(job.tile, TileSpec::new(400, 280, 1.5).unwrap());
        assert_eq!(job.door, Some(DoorCutout::new(600.0, 2100.0).unwrap()));
        assert_eq!(job.reserve, 5.0);
        assert_eq!(job.scene.direction, YDirection::TopDown);
        assert_eq!(job.output, PathBuf::from("jobs/test.png"));
        assert_eq!(job.watermark, Some(WatermarkConfig::default()));
    }

    #[test]
    fn floor_defaults() {
        let js = parse("floor 5000 3000\ntile 400 400\n").unwrap();
        let job = Job::from_spec(Path::new("floor.job"), js).unwrap();
        assert_eq!(job.method, LayingMethod::Direct);
        assert_eq!(job.tile.delimiter, 0.0);
        assert_eq!(job.price, None);
        assert_eq!(job.output, PathBuf::from("floor.png"));
    }

    #[test]
    fn watermark_settings() {
        let js = parse("floor 5000 3000\ntile 400 400\nwatermark tiles  by   me\nwatermark_font serif\n").unwrap();
        let job = Job::from_spec(Path::new("a.job"), js).unwrap();
        let config = job.watermark.unwrap();
        assert_eq!(config.text, "tiles by me");
        assert_eq!(config.font_family, "serif");

        let js = parse("floor 5000 3000\ntile 400 400\nno_watermark\n").unwrap();
        assert!(Job::from_spec(Path::new("a.job"), js).unwrap().watermark.is_none());
    }

    #[test]
    fn unknown_method_is_unsupported() {
        let err = parse("floor 1 1\ntile 4 4\nmethod herringbone\n").unwrap_err();
        let unsupported = err.iter().any(|e| e.to_string().contains("unsupported laying method"));
        assert!(unsupported, "{}", err);
    }

    #[test]
    fn numeric_method_and_direction_codes() {
        let js = parse("room 3000 2000 2500\ntile 300 300\nmethod 2\ndirection 1\n").unwrap();
        let job = Job::from_spec(Path::new("a.job"), js).unwrap();
        assert_eq!(job.method, LayingMethod::DirectCenter);
        assert_eq!(job.scene.direction, YDirection::TopDown);

        let err = parse("floor 1 1\ntile 4 4\nmethod 4\n").unwrap_err();
        assert!(err.iter().any(|e| e.to_string().contains("unsupported laying method")));

        let err = parse("room 1 1 1\ntile 4 4\ndirection 0\n").unwrap_err();
        assert!(err.iter().any(|e| e.to_string().contains("invalid vertical tiling direction")));
    }

    #[test]
    fn unknown_direction_is_invalid() {
        let err = parse("room 1 1 1\ntile 4 4\ndirection sideways\n").unwrap_err();
        assert!(err.iter().any(|e| e.to_string().contains("invalid vertical tiling direction")));
    }

    #[test]
    fn duplicate_and_missing_fields() {
        let err = parse("floor 1 1\nfloor 2 2\ntile 4 4\n").unwrap_err();
        assert!(err.iter().any(|e| e.to_string().contains("already set")));

        let err = parse("tile 4 4\n").unwrap_err();
        assert!(err.to_string().contains("floor/room/tile_cost"));

        let err = parse("tile_cost\ntile 4 4\n").unwrap_err();
        assert!(err.to_string().contains("price"));
    }

    #[test]
    fn token_errors() {
        assert!(parse("floor 1\ntile 4 4\n").is_err());
        assert!(parse("floor 1 2 3\ntile 4 4\n").is_err());
        assert!(parse("floor 1 2\ntile 4.5 4\n").is_err());
        assert!(parse("floor 1 2\ntile 4 4\nreserve 150\n").is_err());
        assert!(parse("floor 1 2\ntile 4 4\nwallpaper 3\n").is_err());
    }

    #[test]
    fn door_on_floor_is_rejected() {
        let js = parse("floor 5000 3000\ntile 400 400\ndoor 600 2000\n").unwrap();
        assert!(Job::from_spec(Path::new("a.job"), js).is_err());
    }

    #[test]
    fn tile_cost_job_runs_without_image() {
        let js = parse("tile_cost\ntile 400 400\nprice 500\n").unwrap();
        let job = Job::from_spec(Path::new("a.job"), js).unwrap();
        assert_eq!(job.run().unwrap(), JobResult::TileCost { area_m2: 0.16, cost: 80.0 });
    }

}
