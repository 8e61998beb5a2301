use crate::model::Coordinate;

use super::{Geolocation, PositionOptions, PositionSink};

/// A position known up front, e.g. from config or command-line flags.
#[derive(Debug, Clone, Copy)]
pub struct FixedGeolocation {
    coords: Coordinate,
}

impl FixedGeolocation {
    pub fn new(coords: Coordinate) -> Self {
        Self { coords }
    }
}

impl Geolocation for FixedGeolocation {
    fn is_supported(&self) -> bool {
        true
    }

    fn is_secure_context(&self) -> bool {
        true
    }

    fn request_position(&self, _options: PositionOptions, sink: PositionSink) {
        sink.success(self.coords.into());
    }
}
