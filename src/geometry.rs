use serde::{Deserialize, Serialize};

/// Top-left corner of a window frame in root coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }
}

/// Signed frame origin with size, as reported by the window system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl FrameRect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_parts(position: Position, size: Size) -> Self {
        Self::new(position.x, position.y, size.width, size.height)
    }

    pub fn position(&self) -> Position {
        Position::new(self.x, self.y)
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

/// Size that covers `width_percent`/`height_percent` of `work_area`.
///
/// Percent values are in 0..=100; results are floored.
pub fn percent_size(work_area: FrameRect, width_percent: u8, height_percent: u8) -> Size {
    let scale = |base: i32, pct: u8| base.max(0).saturating_mul(i32::from(pct)) / 100;
    Size::new(
        scale(work_area.width, width_percent),
        scale(work_area.height, height_percent),
    )
}

/// Origin that centers `size` inside `work_area`.
pub fn centered(work_area: FrameRect, size: Size) -> Position {
    Position::new(
        work_area.x + (work_area.width - size.width) / 2,
        work_area.y + (work_area.height - size.height) / 2,
    )
}

/// Default frame for a freshly matched pane: a percentage of the work area,
/// centered within it.
pub fn default_frame(work_area: FrameRect, width_percent: u8, height_percent: u8) -> FrameRect {
    let size = percent_size(work_area, width_percent, height_percent);
    FrameRect::from_parts(centered(work_area, size), size)
}
