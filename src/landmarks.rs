//! Hand landmark frames and their validation.

use thiserror::Error;

pub const WRIST: usize = 0;
pub const THUMB_TIP: usize = 4;
pub const INDEX_TIP: usize = 8;
pub const MIDDLE_TIP: usize = 12;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LandmarkError {
    #[error("invalid landmark {index}: ({x}, {y}) is not a normalized coordinate")]
    InvalidLandmark { index: usize, x: f64, y: f64 },
    #[error("hand has {len} landmarks, landmark {index} is missing")]
    MissingLandmark { index: usize, len: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// The four landmarks the recognizer reads from one detected hand.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LandmarkFrame {
    pub index_tip: Point,
    pub middle_tip: Point,
    pub thumb_tip: Point,
    pub wrist: Point,
}

impl LandmarkFrame {
    /// Validated constructor. Every coordinate must be finite and in [0, 1].
    pub fn new(
        index_tip: Point,
        middle_tip: Point,
        thumb_tip: Point,
        wrist: Point,
    ) -> Result<Self, LandmarkError> {
        for (index, p) in [
            (INDEX_TIP, index_tip),
            (MIDDLE_TIP, middle_tip),
            (THUMB_TIP, thumb_tip),
            (WRIST, wrist),
        ] {
            check(index, p)?;
        }
        Ok(Self {
            index_tip,
            middle_tip,
            thumb_tip,
            wrist,
        })
    }

    /// Pick the tracked landmarks out of a full hand, indexed by anatomical id.
    pub fn from_hand(hand: &[[f64; 2]]) -> Result<Self, LandmarkError> {
        let at = |index: usize| -> Result<Point, LandmarkError> {
            hand.get(index)
                .map(|[x, y]| Point::new(*x, *y))
                .ok_or(LandmarkError::MissingLandmark {
                    index,
                    len: hand.len(),
                })
        };
        Self::new(at(INDEX_TIP)?, at(MIDDLE_TIP)?, at(THUMB_TIP)?, at(WRIST)?)
    }
}

fn check(index: usize, p: Point) -> Result<(), LandmarkError> {
    let ok = |v: f64| v.is_finite() && (0.0..=1.0).contains(&v);
    if ok(p.x) && ok(p.y) {
        Ok(())
    } else {
        Err(LandmarkError::InvalidLandmark {
            index,
            x: p.x,
            y: p.y,
        })
    }
}
