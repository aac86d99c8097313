// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

pub mod collection;
pub mod item;
pub mod vulnerability;

pub use collection::ItemCollection;
pub use item::{Confirmable, Identifiable, Item, ItemKind, VulnerabilityMatchable};
pub use vulnerability::{VulnDatabase, VulnerabilityRecord};
