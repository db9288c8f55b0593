// Domain layer: launch models and ports (generator / desktop interfaces).

pub mod model;
pub mod ports;
