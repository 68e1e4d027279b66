// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

/// Delay before the first retry of a failed manifold (3 seconds)
pub const DEFAULT_ERROR_DELAY_MS: u64 = 3_000;
/// Delay before restarting a worker that asked to be bounced (10 milliseconds)
pub const DEFAULT_BOUNCE_DELAY_MS: u64 = 10;
/// Multiplier applied to the retry delay after each consecutive failure
pub const DEFAULT_BACKOFF_FACTOR: f64 = 2.0;
/// Upper bound for any retry delay (2 minutes)
pub const DEFAULT_MAX_DELAY_MS: u64 = 120_000;
/// A worker that stays up this long before failing starts over at the base delay (1 minute)
pub const DEFAULT_BACKOFF_RESET_MS: u64 = 60_000;
/// How long engine shutdown may take before it is reported as failed (30 seconds)
pub const DEFAULT_SHUTDOWN_TIMEOUT_MS: u64 = 30_000;
