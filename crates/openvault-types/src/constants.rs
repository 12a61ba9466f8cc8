//! System-wide constants for the OpenVault settlement engine.

/// Denominator for basis-point fractions (100% == 10,000 bps).
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Seconds per (non-leap) year, used by time-proportional fee accrual.
pub const SECONDS_PER_YEAR: u64 = 31_536_000;

/// Default decimal precision for share prices (8 decimal places).
pub const SHARE_PRICE_DECIMALS: u32 = 8;

/// Default settlement proposal cooldown in seconds (24 hours).
pub const DEFAULT_COOLDOWN_SECS: i64 = 86_400;

/// Default guardian-acceptance requirement for proposal execution.
pub const DEFAULT_REQUIRE_ACCEPTANCE: bool = false;

/// Upper bound on the ceiling-conversion dust loop. The loop terminates far
/// earlier for any venue with fixed-point price resolution; this bound turns
/// a would-be hang on corrupt state into a hard error.
pub const MAX_DUST_ITERATIONS: u32 = 1_000;

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "OpenVault";
