// Domain layer: typed records, report values and the ports the adapters implement.

pub mod model;
pub mod ports;
pub mod report;
