//! Delta encoding of value streams.
//!
//! The first value of a stream is emitted unchanged, every following value
//! as the difference to its predecessor. One [`Offsetter`] tracks exactly one
//! stream: sharing it between the latitudes and longitudes of a measurement,
//! or between two measurements, corrupts the chain.

/// Streaming delta encoder for one channel.
#[derive(Debug, Default)]
pub struct Offsetter {
    previous: Option<i64>,
}

impl Offsetter {
    /// A fresh encoder whose next value is emitted unchanged.
    pub fn new() -> Self {
        Self::default()
    }

    /// Encode the next value.
    ///
    /// # Panics
    ///
    /// If the difference to the previous value does not fit into an `i32`.
    pub fn offset(&mut self, value: i64) -> i64 {
        match self.previous.replace(value) {
            None => value,
            Some(previous) => {
                let delta = value
                    .checked_sub(previous)
                    .filter(|delta| i32::try_from(*delta).is_ok());
                match delta {
                    Some(delta) => delta,
                    None => panic!(
                        "delta between {} and {} does not fit into 32 bits",
                        previous, value
                    ),
                }
            }
        }
    }
}
