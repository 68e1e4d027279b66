// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod worker;

pub use worker::{downcast_worker, AsAny, Worker};
