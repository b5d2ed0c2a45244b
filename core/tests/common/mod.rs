// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Shared setup for sync integration tests.

#![allow(dead_code)]

mod fixtures;
mod server;

pub use fixtures::*;
pub use server::*;
