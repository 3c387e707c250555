// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

pub mod facets;
pub mod health;
pub mod ingestion;
pub mod search;
pub mod version;
