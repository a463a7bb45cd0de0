//! # Selection
//!
//! Anchor/focus points addressing a character offset inside a text node.
//! Offsets count characters, not bytes.

use crate::node::{Mark, Path};
use serde::{Deserialize, Serialize};

/// A caret position: a text node path and a character offset into it
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Point {
    pub path: Path,
    pub offset: usize,
}

impl Point {
    pub fn new(path: Path, offset: usize) -> Self {
        Self { path, offset }
    }
}

/// Current selection of an editing session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub anchor: Point,
    pub focus: Point,

    /// Marks to apply to the next inserted text (collapsed selections only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marks: Option<Vec<Mark>>,
}

impl Selection {
    pub fn new(anchor: Point, focus: Point) -> Self {
        Self {
            anchor,
            focus,
            marks: None,
        }
    }

    pub fn collapsed(point: Point) -> Self {
        Self::new(point.clone(), point)
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }

    pub fn is_backward(&self) -> bool {
        self.focus < self.anchor
    }

    /// The earlier of anchor and focus
    pub fn start(&self) -> &Point {
        if self.is_backward() {
            &self.focus
        } else {
            &self.anchor
        }
    }

    /// The later of anchor and focus
    pub fn end(&self) -> &Point {
        if self.is_backward() {
            &self.anchor
        } else {
            &self.focus
        }
    }

    pub fn collapse_to_start(&self) -> Selection {
        Selection::collapsed(self.start().clone())
    }

    pub fn collapse_to_end(&self) -> Selection {
        Selection::collapsed(self.end().clone())
    }

    pub fn with_marks(mut self, marks: Option<Vec<Mark>>) -> Self {
        self.marks = marks;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backward_selection_orders_points() {
        let sel = Selection::new(Point::new(vec![1, 0], 2), Point::new(vec![0, 0], 4));

        assert!(sel.is_backward());
        assert_eq!(sel.start(), &Point::new(vec![0, 0], 4));
        assert_eq!(sel.end(), &Point::new(vec![1, 0], 2));
    }

    #[test]
    fn test_points_order_by_path_then_offset() {
        assert!(Point::new(vec![0, 1], 0) > Point::new(vec![0, 0], 9));
        assert!(Point::new(vec![0, 0], 3) > Point::new(vec![0, 0], 1));
        assert!(Point::new(vec![2], 0) > Point::new(vec![1, 5, 2], 0));
    }
}
