// Domain layer: request/response shapes and the data source port.

pub mod model;
pub mod ports;
