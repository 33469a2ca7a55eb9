//! Test fixtures and data builders
//!
//! This module provides step-sequence builders and common fixtures.

pub mod builders;

pub use builders::SequenceBuilder;

use crate::automation::Step;

/// Common step sequences for various scenarios
pub struct Fixtures;

impl Fixtures {
    /// `count` text-entry steps that do not restart on failure
    pub fn typing_sequence(count: usize) -> Vec<Step> {
        (0..count)
            .fold(SequenceBuilder::new(), |builder, i| {
                builder.type_text(&format!("value-{}", i + 1))
            })
            .build()
    }

    /// `count` text-entry steps that all restart the sequence on failure
    pub fn restartable_sequence(count: usize) -> Vec<Step> {
        (0..count)
            .fold(SequenceBuilder::new(), |builder, i| {
                builder
                    .type_text(&format!("value-{}", i + 1))
                    .restart_on_failure()
            })
            .build()
    }

    /// A login form: open the page, fill two fields, submit
    pub fn login_form() -> Vec<Step> {
        SequenceBuilder::new()
            .navigate("https://example.com/login")
            .type_text("{{user}}")
            .type_text("{{password}}")
            .click()
            .build()
    }
}
