//! # Program Listing Annotator
//!
//! The DTR interface prints program listings without step numbers. This
//! module puts them back.
//!
//! A listing starts at a `PRP` or `LIST` header. Every following line gets a
//! ` NN ` prefix with the next step number, except label lines: those already
//! start with their own step number followed by the `♦` marker, and resync
//! the counter instead.
//!
//! ```text
//! PRP TEST          PRP TEST
//! A            ->    01 A
//!  05♦LBL "B"        05♦LBL "B"
//! STO 00             06 STO 00
//! ```
//!
//! Non-listing printouts (`PRFLAGS`, `PRKEYS`, `PRREG`, `STATUS`) end listing
//! mode.

use tracing::debug;

use crate::protocol::charset::LABEL_MARKER;

/// Headers that open a program listing
const LISTING_HEADERS: [&str; 2] = ["PRP", "LIST"];

/// Headers of printouts that are not program listings
const PRINTOUT_HEADERS: [&str; 4] = ["PRFLAGS", "PRKEYS", "PRREG", "STATUS"];

/// Listing state carried across lines of one connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListingState {
    pub in_listing: bool,
    pub line_number: u32,
}

/// What a line's header says about the printout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Header {
    Listing,
    Printout,
}

/// Prefixes reconstructed step numbers onto listing lines.
#[derive(Debug, Clone, Default)]
pub struct ListingAnnotator {
    state: ListingState,
}

impl ListingAnnotator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ListingState {
        self.state
    }

    /// Forget the current listing.
    pub fn reset(&mut self) {
        self.state = ListingState::default();
    }

    /// Annotate one completed line, updating the listing state.
    pub fn annotate(&mut self, line: String) -> String {
        match header(&line) {
            Some(Header::Listing) => {
                debug!("listing started: {:?}", line.trim());
                self.state = ListingState {
                    in_listing: true,
                    line_number: 0,
                };
                return line;
            }
            Some(Header::Printout) => {
                if self.state.in_listing {
                    debug!("listing ended by {:?}", line.trim());
                }
                self.reset();
                return line;
            }
            None => {}
        }

        if !self.state.in_listing {
            return line;
        }

        if let Some(number) = label_number(&line) {
            self.state.line_number = number;
            return line;
        }

        self.state.line_number += 1;
        format!(" {:02} {}", self.state.line_number, line)
    }
}

fn header(line: &str) -> Option<Header> {
    let normalized = line.trim().to_uppercase();
    if LISTING_HEADERS.iter().any(|h| normalized.starts_with(h)) {
        Some(Header::Listing)
    } else if PRINTOUT_HEADERS.iter().any(|h| normalized.starts_with(h)) {
        Some(Header::Printout)
    } else {
        None
    }
}

/// Step number of a label line (` NN♦...`), if this is one.
fn label_number(line: &str) -> Option<u32> {
    let mut chars = line.chars();
    let (space, tens, ones, marker) = (chars.next()?, chars.next()?, chars.next()?, chars.next()?);
    if space != ' ' || marker != LABEL_MARKER {
        return None;
    }
    Some(tens.to_digit(10)? * 10 + ones.to_digit(10)?)
}
