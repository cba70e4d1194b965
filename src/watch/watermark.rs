use chrono::{DateTime, Utc};

/// Single "last completion" timestamp used as the emission floor.
///
/// Only ever moves forward: `advance` with an older candidate is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Watermark {
    floor: DateTime<Utc>,
}

impl Watermark {
    pub fn new(floor: DateTime<Utc>) -> Self {
        Self { floor }
    }

    pub fn current(&self) -> DateTime<Utc> {
        self.floor
    }

    /// Raises the floor to `candidate` if it is newer. Returns whether it moved.
    pub fn advance(&mut self, candidate: DateTime<Utc>) -> bool {
        if candidate > self.floor {
            self.floor = candidate;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_advance_moves_forward_only() {
        let mut watermark = Watermark::new(t0());

        assert!(watermark.advance(t0() + Duration::seconds(10)));
        assert!(!watermark.advance(t0() + Duration::seconds(5)));
        assert!(!watermark.advance(t0() + Duration::seconds(10)));

        assert_eq!(watermark.current(), t0() + Duration::seconds(10));
    }

    #[test]
    fn test_non_decreasing_over_arbitrary_sequence() {
        let mut watermark = Watermark::new(t0());
        let offsets = [30, -5, 12, 45, 44, 0, -100, 46, 3];

        let mut previous = watermark.current();
        for offset in offsets {
            watermark.advance(t0() + Duration::seconds(offset));
            assert!(watermark.current() >= previous);
            previous = watermark.current();
        }

        assert_eq!(watermark.current(), t0() + Duration::seconds(46));
    }
}
