// SYNOID Shorts Agent Modules
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Orchestration around the media engine: scripts in, fetched and
// validated media through the engine, finished shorts out.

pub mod background_job;
pub mod batch;
pub mod collaborators;
pub mod event_log;
pub mod fetch;
pub mod health;
pub mod script;
pub mod shorts;
pub mod validation;
