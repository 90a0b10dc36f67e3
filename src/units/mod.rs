// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Built-in units, registered in the catalog under their implementation names.
//!
//! | implementation       | unit               | entry point | contract source     |
//! |----------------------|--------------------|-------------|---------------------|
//! | `summary_and_tags`   | `SummaryAndTags`   | sync        | control flow        |
//! | `echo`               | `Echo`             | sync        | declared types      |
//! | `headline_generator` | `HeadlineGenerator`| async       | instance inspection |
//! | `image_headliner`    | `ImageHeadliner`   | sync        | control flow        |

mod echo;
mod headline_generator;
mod image_headliner;
mod summary_and_tags;

pub use echo::Echo;
pub use headline_generator::HeadlineGenerator;
pub use image_headliner::ImageHeadliner;
pub use summary_and_tags::SummaryAndTags;

use crate::discovery::UnitCatalog;

pub fn register_builtins(catalog: &mut UnitCatalog) {
    catalog.register("summary_and_tags", SummaryAndTags::class());
    catalog.register("echo", Echo::class());
    catalog.register("headline_generator", HeadlineGenerator::class());
    catalog.register("image_headliner", ImageHeadliner::class());
}
