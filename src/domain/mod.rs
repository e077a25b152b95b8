// Domain layer: core models and ports (interfaces). Depends only on serde, chrono and async-trait.

pub mod model;
pub mod ports;
