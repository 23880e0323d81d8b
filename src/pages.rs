//! Page-range policy shared by both tools.
//!
//! `pdftoppm` and `pdftotext` take the same `-f <first>` / `-l <last>` flags.
//! The extractors add one policy on top: a configured *page quantity* that
//! supplies the last page when the caller gives a start but no end.
//!
//! | `page_start` | `page_end` | quantity | emitted            |
//! |--------------|------------|----------|--------------------|
//! | –            | –          | any      | nothing            |
//! | `s`          | –          | –        | `-f s`             |
//! | `s`          | –          | `q`      | `-f s -l s+q`      |
//! | any          | `e`        | any      | `... -l e`         |
//!
//! An explicit end always wins over the quantity.

use crate::error::XpdfError;
use std::ffi::OsString;
use std::num::NonZeroU32;

/// Validate a page quantity: it must be strictly positive.
pub fn page_quantity(n: i64) -> Result<NonZeroU32, XpdfError> {
    if n <= 0 {
        return Err(XpdfError::InvalidArgument(
            "Page quantity must be a positive value".into(),
        ));
    }
    u32::try_from(n)
        .ok()
        .and_then(NonZeroU32::new)
        .ok_or_else(|| XpdfError::InvalidArgument(format!("Page quantity {n} is too large")))
}

/// The page window of a single extraction call (1-indexed, inclusive).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageRange {
    pub start: Option<u32>,
    pub end: Option<u32>,
}

impl PageRange {
    pub fn new(start: Option<u32>, end: Option<u32>) -> Self {
        Self { start, end }
    }

    /// Every page of the document.
    pub fn all() -> Self {
        Self::default()
    }

    /// The last page to process, or `None` for "through the end".
    pub fn effective_end(&self, quantity: Option<NonZeroU32>) -> Option<u32> {
        match (self.end, self.start, quantity) {
            (Some(end), _, _) => Some(end),
            (None, Some(start), Some(q)) => Some(start.saturating_add(q.get())),
            _ => None,
        }
    }

    /// Append the `-f` / `-l` flags for this range to `args`.
    pub fn push_args(&self, quantity: Option<NonZeroU32>, args: &mut Vec<OsString>) {
        if let Some(start) = self.start {
            args.push("-f".into());
            args.push(start.to_string().into());
        }
        if let Some(end) = self.effective_end(quantity) {
            args.push("-l".into());
            args.push(end.to_string().into());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(n: u32) -> Option<NonZeroU32> {
        NonZeroU32::new(n)
    }

    fn args(range: PageRange, quantity: Option<NonZeroU32>) -> Vec<String> {
        let mut out = Vec::new();
        range.push_args(quantity, &mut out);
        out.into_iter()
            .map(|s| s.into_string().unwrap())
            .collect()
    }

    #[test]
    fn quantity_must_be_positive() {
        for n in [0, -1, -100, i64::MIN] {
            assert!(page_quantity(n).is_err(), "{n} should be rejected");
        }
        assert_eq!(page_quantity(3).unwrap().get(), 3);
    }

    #[test]
    fn quantity_overflow_is_rejected() {
        assert!(page_quantity(i64::from(u32::MAX) + 1).is_err());
    }

    #[test]
    fn no_range_emits_nothing() {
        assert!(args(PageRange::all(), None).is_empty());
        // Quantity alone has no start to count from.
        assert!(args(PageRange::all(), q(5)).is_empty());
    }

    #[test]
    fn start_only() {
        assert_eq!(args(PageRange::new(Some(2), None), None), ["-f", "2"]);
    }

    #[test]
    fn start_plus_quantity() {
        assert_eq!(
            args(PageRange::new(Some(2), None), q(3)),
            ["-f", "2", "-l", "5"]
        );
    }

    #[test]
    fn explicit_end_wins_over_quantity() {
        assert_eq!(
            args(PageRange::new(Some(1), Some(1)), q(10)),
            ["-f", "1", "-l", "1"]
        );
        assert_eq!(args(PageRange::new(None, Some(4)), q(10)), ["-l", "4"]);
    }

    #[test]
    fn effective_end_saturates() {
        let r = PageRange::new(Some(u32::MAX), None);
        assert_eq!(r.effective_end(q(2)), Some(u32::MAX));
    }
}
