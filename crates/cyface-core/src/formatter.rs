//! Conversion of sensor-native floating point units into the fixed-point
//! integers of the transfer format.
//!
//! | Quantity | Native unit | Wire unit |
//! |----------|-------------|-----------|
//! | latitude, longitude | degrees | micro-degrees |
//! | speed | m/s | cm/s |
//! | acceleration | m/s² | mm/s² |
//! | rotation | rad/s | mrad/s |
//! | magnetic direction | µT | 10 nT |
//! | accuracy | cm | cm |
//!
//! Every conversion rounds to the nearest integer and panics if the result
//! does not fit into an `i32`.

/// Degrees to micro-degrees.
pub fn coordinate(degrees: f64) -> i32 {
    to_i32(degrees * 1_000_000.0, "coordinate")
}

/// Metres per second to centimetres per second.
pub fn speed(meters_per_second: f64) -> i32 {
    to_i32(meters_per_second * 100.0, "speed")
}

/// Metres per second squared to millimetres per second squared.
pub fn acceleration(meters_per_second_squared: f64) -> i32 {
    to_i32(meters_per_second_squared * 1_000.0, "acceleration")
}

/// Radians per second to milliradians per second.
pub fn rotation(radians_per_second: f64) -> i32 {
    to_i32(radians_per_second * 1_000.0, "rotation")
}

/// Micro-tesla to units of ten nano-tesla.
pub fn direction(micro_tesla: f64) -> i32 {
    to_i32(micro_tesla * 100.0, "direction")
}

/// Accuracy is already in centimetres on the wire.
pub fn accuracy(centimeters: f64) -> i32 {
    to_i32(centimeters, "accuracy")
}

fn to_i32(value: f64, quantity: &str) -> i32 {
    let rounded = value.round();
    assert!(
        rounded >= f64::from(i32::MIN) && rounded <= f64::from(i32::MAX),
        "{} {} does not fit into 32 bits",
        quantity,
        value
    );
    rounded as i32
}
