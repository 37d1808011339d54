//////////////////////////////////////////////////////////////////////
// use error chain so we can use Result<> everywhere
// for error handling

error_chain! {

    foreign_links {
        Fmt(::std::fmt::Error);
        Io(::std::io::Error);
        Cairo(::cairo::Error);
        Image(::image::ImageError);
    }

    errors {

        InvalidDimension(what: String, value: f64) {
            description("invalid dimension")
            display("invalid {}: {} (must be positive)", what, value)
        }

        UnsupportedMethod(name: String) {
            description("unsupported laying method")
            display("unsupported laying method or draw routine: {}", name)
        }

        IncompatibleTileShape(width: f64, height: f64) {
            description("incompatible tile shape")
            display("diagonal laying needs square tiles, got {}x{}", width, height)
        }

        DoorExceedsWall(door_width: f64, door_height: f64,
                        wall_width: f64, wall_height: f64) {
            description("door exceeds wall")
            display("door {}x{} does not fit wall {}x{}",
                    door_width, door_height, wall_width, wall_height)
        }

        InvalidDirection(name: String) {
            description("invalid tiling direction")
            display("invalid vertical tiling direction: {}", name)
        }

    }

}

//////////////////////////////////////////////////////////////////////
// most inputs are "positive mm" values, check them in one place

pub fn ensure_positive(what: &str, value: f64) -> Result<f64> {

    if !(value > 0.0) || !value.is_finite() {
        bail!(ErrorKind::InvalidDimension(what.to_string(), value));
    }

    Ok(value)

}
