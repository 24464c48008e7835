/// Number of guessing rounds in one ride.
pub const NUM_ROUNDS: u8 = 4;

/// Seconds players get to lock in a guess before the round resolves without them.
pub const DEFAULT_ROUND_DURATION_SECS: u64 = 15;

/// Seconds givers get to hand out their sips before the rest are forfeited.
pub const DEFAULT_DISTRIBUTION_DURATION_SECS: u64 = 20;

/// Sips at stake in rounds 1 through 4.
pub const DEFAULT_STAKES: [u32; NUM_ROUNDS as usize] = [2, 4, 8, 16];

/// A lobby with no live subscribers for this long starts shutting down.
pub const DEFAULT_IDLE_CLOSE_AFTER_SECS: u64 = 15 * 60;

/// Time between a lobby entering `shutting_down` and its teardown.
pub const DEFAULT_SHUTDOWN_GRACE_SECS: u64 = 30;

/// Snapshots buffered per subscriber before it is evicted as too slow.
pub const DEFAULT_SUBSCRIBER_BUFFER: usize = 32;

pub const MAX_NAME_LENGTH: usize = 32;

/// Attempts at drawing an unused lobby code before giving up.
pub const MAX_CODE_GENERATION_ATTEMPTS: usize = 256;
