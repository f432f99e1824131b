//! Coordinate model
//!
//! Three spaces are in play each tick:
//! - **frame space**: pixels of the captured buffer, origin at its top-left;
//! - **game space**: the playfield, origin at the top-left of the [`CaptureBox`];
//! - **ROI space**: a region of interest inside game space, origin at the ROI corner.
//!
//! Every offset between them goes through [`CaptureBox::to_game_space`],
//! [`CaptureBox::to_frame_space`] and [`Rect::to_parent`].

pub mod rect;
pub mod vec2;

pub use rect::{CaptureBox, Point, Rect, RoiExtents};
pub use vec2::Vec2;
