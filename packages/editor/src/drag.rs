//! Drag gesture state for condition groups dropped onto the document

/// Pointer state while a condition group is dragged
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DragState {
    #[default]
    Idle,
    Dragging { over_target: bool },
}

impl DragState {
    pub fn start(&mut self) {
        *self = DragState::Dragging { over_target: false };
    }

    /// Track whether the pointer is over the drop target. Ignored when idle.
    pub fn pointer_move(&mut self, inside: bool) {
        if let DragState::Dragging { over_target } = self {
            *over_target = inside;
        }
    }

    /// End the gesture. Returns true if it ended over the target; the state
    /// is reset either way.
    pub fn pointer_up(&mut self) -> bool {
        let dropped = matches!(self, DragState::Dragging { over_target: true });
        *self = DragState::Idle;
        dropped
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self, DragState::Dragging { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drop_over_target() {
        let mut drag = DragState::default();
        drag.start();
        drag.pointer_move(true);

        assert!(drag.pointer_up());
        assert_eq!(drag, DragState::Idle);
    }

    #[test]
    fn test_leaving_target_cancels_drop() {
        let mut drag = DragState::default();
        drag.start();
        drag.pointer_move(true);
        drag.pointer_move(false);

        assert!(!drag.pointer_up());
        assert_eq!(drag, DragState::Idle);
    }

    #[test]
    fn test_moves_while_idle_are_ignored() {
        let mut drag = DragState::default();
        drag.pointer_move(true);

        assert_eq!(drag, DragState::Idle);
        assert!(!drag.pointer_up());
    }
}
