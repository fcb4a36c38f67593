// SYNOID Shorts Library
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Vertical short-form video assembly: the media engine plus the agent
// layer that feeds it.

pub mod agent;
pub mod config;
pub mod engine;
pub mod error;

pub use error::{Result, ShortsError};
