// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the nfsc CLI

pub mod browse;
pub mod config;
pub mod modify;

pub use self::browse::BrowseCommand;
pub use self::config::ConfigCommand;
pub use self::modify::ModifyCommand;
