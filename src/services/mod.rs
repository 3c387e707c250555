// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

pub mod aggregations;
pub mod bridge;
pub mod elasticsearch;
pub mod engine;
pub mod events;
pub mod filters;
pub mod health;
pub mod ingestion;
pub mod logging;
pub mod memory_engine;
pub mod normalizer;
pub mod query;
pub mod search;
