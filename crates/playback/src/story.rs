//! Story branching.
//!
//! At the end of every story track the controller asks a [`BranchSource`]
//! which tracks may follow. An empty answer ends the story; otherwise the
//! listener picks one of the offered tracks with a button.

use heapless::Vec;
use platform::{Button, FolderId};

/// Most options a branch point can offer: one per button.
pub const MAX_BRANCHES: usize = 3;

/// Tracks offered at a branch point, in button order.
pub type BranchOptions = Vec<u16, MAX_BRANCHES>;

/// Supplies the branch structure of story folders.
pub trait BranchSource {
    /// Tracks the listener may choose after `track` of `folder`, which holds
    /// `track_count` tracks. Empty means the story is over.
    fn options(&self, folder: FolderId, track: u16, track_count: u16) -> BranchOptions;
}

/// Linear stories: the only option after a track is the one that follows it.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequentialBranches;

impl BranchSource for SequentialBranches {
    fn options(&self, _folder: FolderId, track: u16, track_count: u16) -> BranchOptions {
        let mut options = BranchOptions::new();
        if let Some(next) = track.checked_add(1).filter(|n| *n <= track_count) {
            options.push(next).ok();
        }
        options
    }
}

/// Option index chosen by a button at a branch point.
#[must_use]
pub const fn option_for_button(button: Button) -> usize {
    match button {
        Button::Previous => 0,
        Button::Next => 1,
        Button::PlayPause => 2,
    }
}
