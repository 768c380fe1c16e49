//! Session ring: the viewport bound to a selection cursor and the outbound
//! scheduler.
//!
//! Whenever the window moves the controller queues, in this order:
//!
//! - `RING_POSITION`: `[row_hi, row_lo, col_hi, col_lo, width, height]`
//! - `GRID_CONTENT`: one RGB24 group per visible cell, row-major
//!
//! and on every selection change `SCENE_SELECT` / `TRACK_SELECT` with
//! `[relative_index, 1]` when the selection is inside the window or
//! `[min(absolute, 127), 0]` when it is not.

use padlink_frame::command::{
    GRID_CONTENT, RING_NAVIGATE, RING_POSITION, RING_SELECT, SCENE_SELECT, TRACK_SELECT,
};
use padlink_frame::value::{pack14_array, pack_rgb24, MAX_14BIT};
use padlink_frame::Rgb;
use padlink_transport::TransmitSink;
use tracing::{debug, trace};

use crate::clock::Clock;
use crate::scheduler::CoalescingScheduler;
use crate::viewport::{Direction, Viewport, Window};

/// Host-side view of the cell grid.
pub trait GridSource {
    /// Display color of an absolute cell inside the extent.
    fn cell_color(&self, row: usize, col: usize) -> Rgb;

    /// Called after the window moved, e.g. to redraw the host's highlight box.
    fn highlight_changed(&mut self, _window: &Window) {}
}

/// What the host should do after an inbound navigation frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationAction {
    /// The window moved; the host may adopt `suggested` as its selection.
    Moved {
        window: Window,
        suggested: (usize, usize),
    },
    /// Already at the edge; nothing changed.
    Unchanged,
    /// The hardware picked a cell; the host should select it.
    Select { row: usize, col: usize },
    /// Malformed or unrelated frame.
    Ignored,
}

/// Keeps the hardware window in step with the host's selection.
#[derive(Debug, Clone)]
pub struct RingController {
    viewport: Viewport,
    selected: (usize, usize),
}

impl RingController {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            selected: (0, 0),
        }
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Current selection as `(row, col)`.
    pub fn selection(&self) -> (usize, usize) {
        self.selected
    }

    /// The host selected `(row, col)`: follow it and report the selection.
    ///
    /// Returns whether the window moved.
    pub fn select<G, S, C>(
        &mut self,
        row: usize,
        col: usize,
        source: &mut G,
        scheduler: &mut CoalescingScheduler<S, C>,
    ) -> bool
    where
        G: GridSource + ?Sized,
        S: TransmitSink,
        C: Clock,
    {
        self.selected = (row, col);
        let moved = self.viewport.ensure_visible(row, col);
        if moved {
            self.emit_window(source, scheduler);
        }
        self.emit_selection(scheduler);
        moved
    }

    /// Move the window one cell. Returns the suggested new selection when it
    /// moved.
    ///
    /// The selection is kept while it stays visible and otherwise snaps to
    /// the window centre.
    pub fn navigate<G, S, C>(
        &mut self,
        direction: Direction,
        source: &mut G,
        scheduler: &mut CoalescingScheduler<S, C>,
    ) -> Option<(usize, usize)>
    where
        G: GridSource + ?Sized,
        S: TransmitSink,
        C: Clock,
    {
        if !self.viewport.shift(direction, 1) {
            trace!(?direction, "ring already at edge");
            return None;
        }
        let window = self.viewport.window();
        debug!(
            ?direction,
            row_offset = window.row_offset,
            col_offset = window.col_offset,
            "ring navigated"
        );

        self.emit_window(source, scheduler);
        let (row, col) = self.selected;
        if !self.viewport.is_visible(row, col) {
            self.selected = self.centre();
        }
        self.emit_selection(scheduler);
        Some(self.selected)
    }

    fn centre(&self) -> (usize, usize) {
        let window = self.viewport.window();
        let last_row = self.viewport.total_rows().saturating_sub(1);
        let last_col = self.viewport.total_cols().saturating_sub(1);
        (
            (window.row_offset + window.height / 2).min(last_row),
            (window.col_offset + window.width / 2).min(last_col),
        )
    }

    /// The host's row or column count changed.
    ///
    /// A selection past the new extent is pulled back to the last cell.
    ///
    /// Position and content are re-sent even when the offsets hold, since
    /// the cells under the window may differ.
    pub fn extent_changed<G, S, C>(
        &mut self,
        total_rows: usize,
        total_cols: usize,
        source: &mut G,
        scheduler: &mut CoalescingScheduler<S, C>,
    ) -> bool
    where
        G: GridSource + ?Sized,
        S: TransmitSink,
        C: Clock,
    {
        let moved = self.viewport.resize_extent(total_rows, total_cols);
        let (row, col) = self.selected;
        self.selected = (
            row.min(total_rows.saturating_sub(1)),
            col.min(total_cols.saturating_sub(1)),
        );
        debug!(total_rows, total_cols, moved, "ring extent changed");
        self.emit_window(source, scheduler);
        if self.selected != (row, col) {
            self.emit_selection(scheduler);
        }
        moved
    }

    /// Handle `RING_NAVIGATE` (`[direction]`) and `RING_SELECT` (`[x, y]`).
    pub fn handle_navigation<G, S, C>(
        &mut self,
        command: u8,
        payload: &[u8],
        source: &mut G,
        scheduler: &mut CoalescingScheduler<S, C>,
    ) -> NavigationAction
    where
        G: GridSource + ?Sized,
        S: TransmitSink,
        C: Clock,
    {
        match (command, payload) {
            (RING_NAVIGATE, [byte, ..]) => {
                let Some(direction) = Direction::from_wire(*byte) else {
                    debug!(byte, "unknown ring direction");
                    return NavigationAction::Ignored;
                };
                match self.navigate(direction, source, scheduler) {
                    Some(suggested) => NavigationAction::Moved {
                        window: self.viewport.window(),
                        suggested,
                    },
                    None => NavigationAction::Unchanged,
                }
            }
            (RING_SELECT, [x, y, ..]) => match self.viewport.to_absolute(*x as usize, *y as usize)
            {
                Some((row, col)) => NavigationAction::Select { row, col },
                None => {
                    debug!(x, y, "ring select outside window");
                    NavigationAction::Ignored
                }
            },
            _ => NavigationAction::Ignored,
        }
    }

    /// Queue position, content and selection regardless of what was sent.
    pub fn send_complete_state<G, S, C>(
        &mut self,
        source: &mut G,
        scheduler: &mut CoalescingScheduler<S, C>,
    ) where
        G: GridSource + ?Sized,
        S: TransmitSink,
        C: Clock,
    {
        self.emit_window(source, scheduler);
        self.emit_selection(scheduler);
    }

    fn emit_window<G, S, C>(&self, source: &mut G, scheduler: &mut CoalescingScheduler<S, C>)
    where
        G: GridSource + ?Sized,
        S: TransmitSink,
        C: Clock,
    {
        let window = self.viewport.window();
        scheduler.queue(RING_POSITION, &position_payload(&window));
        scheduler.queue(GRID_CONTENT, &self.grid_payload(source));
        source.highlight_changed(&window);
    }

    fn grid_payload<G: GridSource + ?Sized>(&self, source: &G) -> Vec<u8> {
        let window = self.viewport.window();
        let mut payload = Vec::with_capacity(window.width * window.height * 6);
        for y in 0..window.height {
            for x in 0..window.width {
                let color = match self.viewport.to_absolute(x, y) {
                    Some((row, col)) => source.cell_color(row, col),
                    None => Rgb::BLACK,
                };
                payload.extend_from_slice(&pack_rgb24(color.r, color.g, color.b));
            }
        }
        payload
    }

    fn emit_selection<S, C>(&self, scheduler: &mut CoalescingScheduler<S, C>)
    where
        S: TransmitSink,
        C: Clock,
    {
        let window = self.viewport.window();
        let (row, col) = self.selected;
        scheduler.queue(
            SCENE_SELECT,
            &selection_payload(row, window.row_offset, window.height),
        );
        scheduler.queue(
            TRACK_SELECT,
            &selection_payload(col, window.col_offset, window.width),
        );
    }
}

/// Offsets travel as 14-bit pairs; anything past `MAX_14BIT` is sent as
/// `MAX_14BIT`.
fn position_payload(window: &Window) -> [u8; 6] {
    let [row_hi, row_lo] = pack14_array(offset14(window.row_offset, "row"));
    let [col_hi, col_lo] = pack14_array(offset14(window.col_offset, "col"));
    [
        row_hi,
        row_lo,
        col_hi,
        col_lo,
        window.width.min(0x7F) as u8,
        window.height.min(0x7F) as u8,
    ]
}

fn offset14(offset: usize, axis: &'static str) -> u16 {
    if offset > usize::from(MAX_14BIT) {
        debug!(axis, offset, max = MAX_14BIT, "ring offset clamped to 14 bits");
        return MAX_14BIT;
    }
    offset as u16
}

fn selection_payload(index: usize, offset: usize, size: usize) -> [u8; 2] {
    match index.checked_sub(offset) {
        Some(relative) if relative < size => [relative.min(0x7F) as u8, 1],
        _ => [index.min(0x7F) as u8, 0],
    }
}
