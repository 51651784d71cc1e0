// Domain layer: core models, network payload shapes and ports (interfaces).

pub mod model;
pub mod payload;
pub mod ports;
