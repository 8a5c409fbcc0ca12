// Domain layer: farm models and the store ports the allocator writes through.

pub mod model;
pub mod ports;
