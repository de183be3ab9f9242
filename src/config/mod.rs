// SPDX-License-Identifier: MPL-2.0
//! Engine configuration constants.
//!
//! There is no persisted configuration; the engine is tuned entirely
//! through the compile-time defaults below.

mod defaults;

pub use defaults::*;
