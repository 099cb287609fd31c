//! Session-scoped photo queue with an explicit lifecycle: created when the
//! session starts, drained by one submission, cleared only on request.

use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, info};

use crate::batch::RawPhoto;

static TRAILING_DIGITS: OnceLock<Regex> = OnceLock::new();

fn trailing_digits() -> &'static Regex {
    TRAILING_DIGITS.get_or_init(|| Regex::new(r"\d+$").expect("trailing digits pattern"))
}

/// The photos one user session has queued so far, plus the identifier they
/// will be tagged with. Only the session itself appends or clears; there is
/// no concurrent writer.
#[derive(Debug, Default)]
pub struct Session {
    identifier: String,
    queue: Vec<RawPhoto>,
}

impl Session {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            queue: Vec::new(),
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn set_identifier(&mut self, identifier: impl Into<String>) {
        self.identifier = identifier.into();
    }

    pub fn add_photo(&mut self, photo: RawPhoto) {
        debug!(
            name = photo.original_name.as_deref().unwrap_or("<unnamed>"),
            bytes = photo.size(),
            "photo queued"
        );
        self.queue.push(photo);
    }

    pub fn photo_count(&self) -> usize {
        self.queue.len()
    }

    pub fn queued_bytes(&self) -> u64 {
        self.queue.iter().map(RawPhoto::size).sum()
    }

    /// Hand the queued photos to one submission, leaving the queue empty.
    pub fn take_photos(&mut self) -> Vec<RawPhoto> {
        std::mem::take(&mut self.queue)
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }

    /// Advance the identifier after a successful send: `EQ-009` becomes
    /// `EQ-010`. Identifiers without trailing digits stay as they are.
    pub fn advance_serial(&mut self) {
        let next = increment_serial(&self.identifier);
        if next != self.identifier {
            info!(from = %self.identifier, to = %next, "identifier advanced");
            self.identifier = next;
        }
    }
}

/// Increment the trailing run of digits, preserving zero padding. Inputs
/// without trailing digits are returned unchanged.
pub fn increment_serial(identifier: &str) -> String {
    let Some(m) = trailing_digits().find(identifier) else {
        return identifier.to_string();
    };
    let digits = m.as_str();
    let width = digits.len();
    let Ok(value) = digits.parse::<u128>() else {
        return identifier.to_string();
    };
    format!(
        "{}{:0width$}",
        &identifier[..m.start()],
        value + 1,
        width = width
    )
}
