//! Multi-line prompt composer.

/// Maximum prompt length accepted by the composer, in characters.
const MAX_INPUT_LENGTH: usize = 16_000;

/// Text being composed plus a cursor. The cursor is a character index, so
/// multi-byte input never splits a code point.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MessageInputState {
    text: String,
    cursor: usize,
}

impl MessageInputState {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn cursor_position(&self) -> usize {
        self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    /// Inserts a character at the cursor.
    /// Returns false when the prompt is already at the length limit.
    pub fn insert_char(&mut self, ch: char) -> bool {
        if self.char_count() >= MAX_INPUT_LENGTH {
            return false;
        }
        let at = self.byte_index(self.cursor);
        self.text.insert(at, ch);
        self.cursor += 1;
        true
    }

    pub fn insert_newline(&mut self) -> bool {
        self.insert_char('\n')
    }

    /// Backspace.
    pub fn delete_char_before(&mut self) {
        if self.cursor > 0 {
            self.remove_range(self.cursor - 1, self.cursor);
            self.cursor -= 1;
        }
    }

    /// Delete key.
    pub fn delete_char_at(&mut self) {
        if self.cursor < self.char_count() {
            self.remove_range(self.cursor, self.cursor + 1);
        }
    }

    /// Removes the word left of the cursor together with the whitespace after it.
    pub fn delete_word_before(&mut self) {
        let chars: Vec<char> = self.text.chars().take(self.cursor).collect();
        let mut start = chars.len();
        while start > 0 && chars[start - 1].is_whitespace() {
            start -= 1;
        }
        while start > 0 && !chars[start - 1].is_whitespace() {
            start -= 1;
        }
        self.remove_range(start, self.cursor);
        self.cursor = start;
    }

    pub fn move_cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_cursor_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.char_count());
    }

    /// Moves to the start of the current line.
    pub fn move_cursor_home(&mut self) {
        self.cursor = self.line_start(self.cursor);
    }

    /// Moves to the end of the current line.
    pub fn move_cursor_end(&mut self) {
        self.cursor = self.line_end(self.cursor);
    }

    /// Moves to the same column of the previous line, clamped to its length.
    pub fn move_cursor_up(&mut self) {
        let start = self.line_start(self.cursor);
        if start == 0 {
            return;
        }
        let column = self.cursor - start;
        let previous_start = self.line_start(start - 1);
        self.cursor = (previous_start + column).min(start - 1);
    }

    /// Moves to the same column of the next line, clamped to its length.
    pub fn move_cursor_down(&mut self) {
        let end = self.line_end(self.cursor);
        if end == self.char_count() {
            return;
        }
        let column = self.cursor - self.line_start(self.cursor);
        let next_start = end + 1;
        self.cursor = (next_start + column).min(self.line_end(next_start));
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.cursor = 0;
    }

    fn line_start(&self, position: usize) -> usize {
        self.text
            .chars()
            .take(position)
            .collect::<Vec<_>>()
            .iter()
            .rposition(|ch| *ch == '\n')
            .map_or(0, |newline| newline + 1)
    }

    fn line_end(&self, position: usize) -> usize {
        self.text
            .chars()
            .skip(position)
            .position(|ch| ch == '\n')
            .map_or(self.char_count(), |offset| position + offset)
    }

    fn remove_range(&mut self, start: usize, end: usize) {
        let from = self.byte_index(start);
        let to = self.byte_index(end);
        self.text.drain(from..to);
    }

    fn byte_index(&self, char_index: usize) -> usize {
        self.text
            .char_indices()
            .nth(char_index)
            .map_or(self.text.len(), |(byte_index, _)| byte_index)
    }
}
