pub const TYPICAL_SWAP_GAS_COST: u64 = 60_000;
pub const TYPICAL_MINIMAL_LIQUIDITY: f64 = 1000_f64;

// Router tuning defaults, overridable through RouterConfig
pub const DEFAULT_MAX_HOPS: usize = 3;
pub const DEFAULT_MAX_PATHS: usize = 10;
pub const DEFAULT_STEPS: usize = 100;
pub const DEFAULT_ITERATION_CAP: usize = 1000;
pub const ROUNDING_TOLERANCE: f64 = 1e-9;

// Flows below this are treated as zero when reading back an allocation
pub const FLOW_EPSILON: f64 = 1e-12;
