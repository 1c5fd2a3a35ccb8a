use std::ops::Range;

/// Scroll window and cursor of the track list. `cursor_row` is 1-based so
/// the selected catalog index is `scroll_offset + cursor_row - 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewState {
    scroll_offset: usize,
    cursor_row: usize,
    viewport_rows: usize,
    len: usize,
}

impl ViewState {
    pub fn new(len: usize, viewport_rows: usize) -> Self {
        Self {
            scroll_offset: 0,
            cursor_row: 1,
            viewport_rows: viewport_rows.max(1),
            len,
        }
    }

    pub fn scroll_offset(&self) -> usize {
        self.scroll_offset
    }

    pub fn cursor_row(&self) -> usize {
        self.cursor_row
    }

    pub fn viewport_rows(&self) -> usize {
        self.viewport_rows
    }

    pub fn selected(&self) -> Option<usize> {
        (self.len > 0).then(|| self.scroll_offset + self.cursor_row - 1)
    }

    pub fn visible(&self) -> Range<usize> {
        self.scroll_offset..(self.scroll_offset + self.viewport_rows).min(self.len)
    }

    pub fn scroll_down(&mut self) {
        if self.scroll_offset < self.max_offset() {
            self.scroll_offset += 1;
        }
    }

    pub fn scroll_up(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_sub(1);
    }

    pub fn cursor_down(&mut self) {
        if self.cursor_row < self.last_row() {
            self.cursor_row += 1;
        } else {
            self.scroll_down();
        }
    }

    pub fn cursor_up(&mut self) {
        if self.cursor_row > 1 {
            self.cursor_row -= 1;
        } else {
            self.scroll_up();
        }
    }

    pub fn jump_top(&mut self) {
        self.scroll_offset = 0;
        self.cursor_row = 1;
    }

    pub fn jump_bottom(&mut self) {
        self.scroll_offset = self.max_offset();
        self.cursor_row = self.last_row();
    }

    /// Adopts a new viewport height, keeping the selected track on screen.
    pub fn on_resize(&mut self, new_rows: usize) {
        let selected = self.selected();
        self.viewport_rows = new_rows.max(1);

        if self.len <= self.viewport_rows {
            self.scroll_offset = 0;
        } else {
            self.scroll_offset = self.scroll_offset.min(self.max_offset());
        }

        match selected {
            Some(index) => {
                if index >= self.scroll_offset + self.viewport_rows {
                    self.scroll_offset = index + 1 - self.viewport_rows;
                }
                self.cursor_row = index - self.scroll_offset + 1;
            }
            None => self.cursor_row = 1,
        }
    }

    fn max_offset(&self) -> usize {
        self.len.saturating_sub(self.viewport_rows)
    }

    fn last_row(&self) -> usize {
        self.viewport_rows.min(self.len).max(1)
    }
}
