//! Single-line input editor with history and keyword completion.
//!
//! The editor never clears the screen. After every key it moves back to the
//! column where the line started (with backspace characters), rewrites the
//! buffer, blanks whatever the previous render left behind and steps back to
//! the logical cursor. Positions on screen are measured in terminal columns,
//! so wide characters take two backspaces.

use crate::keyword;
use crate::platform::TerminalIO;
use std::io;
use std::iter;
use unicode_width::UnicodeWidthChar;

/// Terminal columns taken by `chars`.
fn columns(chars: &[char]) -> usize {
    chars.iter().map(|ch| ch.width().unwrap_or(0)).sum()
}

/// Keys the editor understands, already decoded from terminal events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Backspace,
    Delete,
    /// Ctrl+W, Ctrl+Backspace, Alt+Backspace
    WordDelete,
    Tab,
    Up,
    Down,
    Left,
    Right,
    CtrlLeft,
    CtrlRight,
    Home,
    End,
    Enter,
    /// Ctrl+C
    Interrupt,
    /// Ctrl+D
    Eof,
}

/// Result of reading one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scan {
    Line(String),
    /// The line was abandoned with Ctrl+C.
    Interrupted,
    /// Ctrl+D on an empty line.
    Eof,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Completion {
    candidates: Vec<&'static str>,
    index: usize,
}

#[derive(Debug, Default)]
pub struct LineEditor {
    buffer: Vec<char>,
    cursor: usize,
    /// Oldest first.
    history: Vec<String>,
    /// `history.len()` while not browsing.
    history_cursor: usize,
    /// The line being typed before history browsing started.
    draft: Option<Vec<char>>,
    completion: Option<Completion>,
    rendered_len: usize,
    rendered_cursor: usize,
    /// Longest line that fits after the prompt.
    capacity: usize,
}

impl LineEditor {
    pub fn new() -> Self {
        Self {
            capacity: usize::MAX,
            ..Self::default()
        }
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    /// Reads one line from `terminal`, echoing edits as they happen.
    pub fn scan(&mut self, terminal: &mut dyn TerminalIO) -> io::Result<Scan> {
        self.reset();
        self.capacity = terminal.columns_remaining()?.saturating_sub(1).max(1);

        terminal.enter_raw()?;
        let result = self.read_line(terminal);
        let left = terminal.leave_raw();
        let scan = result?;
        left?;
        Ok(scan)
    }

    fn read_line(&mut self, terminal: &mut dyn TerminalIO) -> io::Result<Scan> {
        loop {
            let key = terminal.read_key()?;
            if let Some(scan) = self.handle_key(key) {
                terminal.write_str("\r\n")?;
                terminal.flush()?;
                return Ok(scan);
            }
            self.repaint(terminal)?;
        }
    }

    fn reset(&mut self) {
        self.buffer.clear();
        self.cursor = 0;
        self.history_cursor = self.history.len();
        self.draft = None;
        self.completion = None;
        self.rendered_len = 0;
        self.rendered_cursor = 0;
    }

    fn line(&self) -> String {
        self.buffer.iter().collect()
    }

    fn load(&mut self, line: Vec<char>) {
        self.buffer = line;
        self.cursor = self.buffer.len();
    }

    /// Applies one key to the editor state. Returns the finished scan, if any.
    fn handle_key(&mut self, key: Key) -> Option<Scan> {
        if key != Key::Tab {
            self.completion = None;
        }

        match key {
            Key::Char(ch) => {
                if columns(&self.buffer) + ch.width().unwrap_or(0) <= self.capacity {
                    self.buffer.insert(self.cursor, ch);
                    self.cursor += 1;
                }
            }
            Key::Backspace => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                    self.buffer.remove(self.cursor);
                }
            }
            Key::Delete => {
                if self.cursor < self.buffer.len() {
                    self.buffer.remove(self.cursor);
                }
            }
            Key::WordDelete => self.delete_word(),
            Key::Tab => self.complete(),
            Key::Up => self.history_back(),
            Key::Down => self.history_forward(),
            Key::Left => self.cursor = self.cursor.saturating_sub(1),
            Key::Right => self.cursor = (self.cursor + 1).min(self.buffer.len()),
            Key::CtrlLeft => {
                self.cursor = self.buffer[..self.cursor]
                    .iter()
                    .rposition(|c| *c == ' ')
                    .unwrap_or(0);
            }
            Key::CtrlRight => {
                let from = (self.cursor + 1).min(self.buffer.len());
                self.cursor = self.buffer[from..]
                    .iter()
                    .position(|c| *c == ' ')
                    .map_or(self.buffer.len(), |i| from + i);
            }
            Key::Home => self.cursor = 0,
            Key::End => self.cursor = self.buffer.len(),
            Key::Enter => {
                let line = self.line();
                self.remember(&line);
                return Some(Scan::Line(line));
            }
            Key::Interrupt => return Some(Scan::Interrupted),
            Key::Eof => {
                if self.buffer.is_empty() {
                    return Some(Scan::Eof);
                }
                if self.cursor < self.buffer.len() {
                    self.buffer.remove(self.cursor);
                }
            }
        }
        None
    }

    /// Removes from the nearest space before the cursor (inclusive) up to it.
    fn delete_word(&mut self) {
        let start = self.buffer[..self.cursor]
            .iter()
            .rposition(|c| *c == ' ')
            .unwrap_or(0);
        self.buffer.drain(start..self.cursor);
        self.cursor = start;
    }

    fn complete(&mut self) {
        if let Some(completion) = &mut self.completion {
            completion.index = (completion.index + 1) % completion.candidates.len();
            let next = completion.candidates[completion.index];
            self.load(next.chars().collect());
            return;
        }

        let typed = self.line();
        let typed = typed.trim_end();
        if typed.contains(' ') {
            return;
        }

        let candidates: Vec<&'static str> = match typed.chars().next() {
            None => keyword::names(),
            Some(first) => keyword::names()
                .into_iter()
                .filter(|k| k.starts_with(first))
                .collect(),
        };
        let Some(first) = candidates.first() else {
            return;
        };
        self.load(first.chars().collect());
        self.completion = Some(Completion {
            candidates,
            index: 0,
        });
    }

    fn history_back(&mut self) {
        if self.history_cursor == 0 {
            return;
        }
        if self.history_cursor == self.history.len() {
            self.draft = Some(self.buffer.clone());
        }
        self.history_cursor -= 1;
        self.load(self.history[self.history_cursor].chars().collect());
    }

    fn history_forward(&mut self) {
        if self.history_cursor >= self.history.len() {
            return;
        }
        self.history_cursor += 1;
        if self.history_cursor == self.history.len() {
            let draft = self.draft.take().unwrap_or_default();
            self.load(draft);
        } else {
            self.load(self.history[self.history_cursor].chars().collect());
        }
    }

    /// Appends a non-blank line to history; an earlier copy moves to the end.
    fn remember(&mut self, line: &str) {
        if line.trim().is_empty() {
            return;
        }
        self.history.retain(|h| h != line);
        self.history.push(line.to_string());
        self.history_cursor = self.history.len();
    }

    fn repaint(&mut self, terminal: &mut dyn TerminalIO) -> io::Result<()> {
        let line_width = columns(&self.buffer);
        let cursor_width = columns(&self.buffer[..self.cursor]);
        let stale = self.rendered_len.saturating_sub(line_width);
        let back = line_width + stale - cursor_width;

        let out: String = iter::repeat_n('\x08', self.rendered_cursor)
            .chain(self.buffer.iter().copied())
            .chain(iter::repeat_n(' ', stale))
            .chain(iter::repeat_n('\x08', back))
            .collect();
        terminal.write_str(&out)?;
        terminal.flush()?;

        self.rendered_len = line_width;
        self.rendered_cursor = cursor_width;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// A terminal that replays keys and emulates a single screen row.
    struct FakeTerminal {
        keys: VecDeque<Key>,
        columns: usize,
        row: Vec<char>,
        col: usize,
        raw: bool,
    }

    impl FakeTerminal {
        fn new(keys: &[Key]) -> Self {
            Self {
                keys: keys.iter().copied().collect(),
                columns: 80,
                row: Vec::new(),
                col: 0,
                raw: false,
            }
        }

        fn screen(&self) -> String {
            self.row
                .iter()
                .filter(|cell| **cell != '\0')
                .collect::<String>()
                .trim_end()
                .to_string()
        }
    }

    impl TerminalIO for FakeTerminal {
        fn enter_raw(&mut self) -> io::Result<()> {
            self.raw = true;
            Ok(())
        }

        fn leave_raw(&mut self) -> io::Result<()> {
            self.raw = false;
            Ok(())
        }

        fn read_key(&mut self) -> io::Result<Key> {
            assert!(self.raw, "keys must be read in raw mode");
            self.keys
                .pop_front()
                .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "no more keys"))
        }

        fn write_str(&mut self, text: &str) -> io::Result<()> {
            for ch in text.chars() {
                match ch {
                    '\x08' => self.col = self.col.checked_sub(1).expect("cursor left of line start"),
                    '\r' | '\n' => {}
                    ch => {
                        // Wide characters fill a second cell with a placeholder.
                        let extra = ch.width().unwrap_or(0).saturating_sub(1);
                        let cells = iter::once(ch).chain(iter::repeat_n('\0', extra));
                        for cell in cells {
                            if self.col == self.row.len() {
                                self.row.push(cell);
                            } else {
                                self.row[self.col] = cell;
                            }
                            self.col += 1;
                        }
                    }
                }
            }
            Ok(())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }

        fn columns_remaining(&mut self) -> io::Result<usize> {
            Ok(self.columns)
        }
    }

    fn typed(text: &str) -> Vec<Key> {
        text.chars().map(Key::Char).collect()
    }

    fn keys(parts: &[&[Key]]) -> Vec<Key> {
        parts.concat()
    }

    fn scan(editor: &mut LineEditor, keys: &[Key]) -> (Scan, FakeTerminal) {
        let mut term = FakeTerminal::new(keys);
        let result = editor.scan(&mut term).unwrap();
        (result, term)
    }

    #[test]
    fn test_typing_and_enter() {
        let mut editor = LineEditor::new();
        let (result, term) = scan(&mut editor, &keys(&[&typed("echo 1"), &[Key::Enter]]));
        assert_eq!(result, Scan::Line("echo 1".to_string()));
        assert_eq!(term.screen(), "echo 1");
        assert!(!term.raw);
        assert_eq!(editor.history(), ["echo 1"]);
    }

    #[test]
    fn test_screen_tracks_buffer_and_cursor() {
        let mut editor = LineEditor::new();
        let mut term = FakeTerminal::new(&[]);
        let steps = keys(&[
            &typed("hello world"),
            &[Key::CtrlLeft, Key::Backspace, Key::Backspace],
            &typed("XY"),
            &[Key::End, Key::WordDelete, Key::Home, Key::Delete],
        ]);
        editor.reset();
        for key in steps {
            assert_eq!(editor.handle_key(key), None);
            editor.repaint(&mut term).unwrap();
            assert_eq!(term.screen(), editor.line().trim_end());
            assert_eq!(term.col, editor.cursor);
        }
        assert_eq!(editor.line(), "elXY");
    }

    #[test]
    fn test_backspace_at_start_is_noop() {
        let mut editor = LineEditor::new();
        let (result, _) = scan(&mut editor, &[Key::Backspace, Key::Char('a'), Key::Enter]);
        assert_eq!(result, Scan::Line("a".to_string()));
    }

    #[test]
    fn test_word_delete_without_space_clears_prefix() {
        let mut editor = LineEditor::new();
        let (result, _) = scan(
            &mut editor,
            &keys(&[&typed("abc"), &[Key::Left, Key::WordDelete, Key::Enter]]),
        );
        assert_eq!(result, Scan::Line("c".to_string()));
    }

    #[test]
    fn test_ctrl_word_motion() {
        let mut editor = LineEditor::new();
        editor.reset();
        for key in typed("ab cd ef") {
            editor.handle_key(key);
        }
        editor.handle_key(Key::CtrlLeft);
        assert_eq!(editor.cursor, 5);
        editor.handle_key(Key::CtrlLeft);
        assert_eq!(editor.cursor, 2);
        editor.handle_key(Key::CtrlLeft);
        assert_eq!(editor.cursor, 0);
        editor.handle_key(Key::CtrlRight);
        assert_eq!(editor.cursor, 2);
        editor.handle_key(Key::CtrlRight);
        assert_eq!(editor.cursor, 5);
        editor.handle_key(Key::CtrlRight);
        assert_eq!(editor.cursor, 8);
    }

    #[test]
    fn test_tab_on_empty_buffer_cycles_all_keywords() {
        let mut editor = LineEditor::new();
        editor.reset();
        let names = keyword::names();
        for expected in names.iter().chain(names.first()) {
            editor.handle_key(Key::Tab);
            assert_eq!(editor.line(), *expected);
            assert_eq!(editor.cursor, expected.chars().count());
        }
    }

    #[test]
    fn test_tab_uses_first_character() {
        let mut editor = LineEditor::new();
        editor.reset();
        editor.handle_key(Key::Char('t'));
        for expected in ["title", "touch", "type", "title"] {
            editor.handle_key(Key::Tab);
            assert_eq!(editor.line(), expected);
        }

        // Typing ends the cycle.
        editor.handle_key(Key::Char(' '));
        editor.handle_key(Key::Tab);
        assert_eq!(editor.line(), "title");
    }

    #[test]
    fn test_tab_ignored_after_space_or_without_candidates() {
        let mut editor = LineEditor::new();
        editor.reset();
        for key in typed("ls x") {
            editor.handle_key(key);
        }
        editor.handle_key(Key::Tab);
        assert_eq!(editor.line(), "ls x");

        editor.reset();
        editor.handle_key(Key::Char('q'));
        editor.handle_key(Key::Tab);
        assert_eq!(editor.line(), "q");
    }

    #[test]
    fn test_history_navigation_is_bounded() {
        let mut editor = LineEditor::new();
        for line in ["a = 1", "b = 2"] {
            scan(&mut editor, &keys(&[&typed(line), &[Key::Enter]]));
        }

        editor.reset();
        editor.handle_key(Key::Up);
        assert_eq!(editor.line(), "b = 2");
        editor.handle_key(Key::Up);
        assert_eq!(editor.line(), "a = 1");
        editor.handle_key(Key::Up);
        assert_eq!(editor.line(), "a = 1");
        editor.handle_key(Key::Down);
        assert_eq!(editor.line(), "b = 2");
        editor.handle_key(Key::Down);
        assert_eq!(editor.line(), "");
        editor.handle_key(Key::Down);
        assert_eq!(editor.line(), "");
    }

    #[test]
    fn test_down_restores_draft() {
        let mut editor = LineEditor::new();
        scan(&mut editor, &keys(&[&typed("old"), &[Key::Enter]]));

        editor.reset();
        for key in typed("new") {
            editor.handle_key(key);
        }
        editor.handle_key(Key::Up);
        assert_eq!(editor.line(), "old");
        editor.handle_key(Key::Down);
        assert_eq!(editor.line(), "new");
    }

    #[test]
    fn test_history_moves_duplicates_and_skips_blank() {
        let mut editor = LineEditor::new();
        for line in ["a", "b", "a", "   "] {
            scan(&mut editor, &keys(&[&typed(line), &[Key::Enter]]));
        }
        assert_eq!(editor.history(), ["b", "a"]);
    }

    #[test]
    fn test_full_line_drops_input() {
        let mut editor = LineEditor::new();
        let mut term = FakeTerminal::new(&keys(&[&typed("abcdef"), &[Key::Enter]]));
        term.columns = 4;
        assert_eq!(editor.scan(&mut term).unwrap(), Scan::Line("abc".to_string()));
    }

    #[test]
    fn test_wide_characters_are_measured_in_columns() {
        let mut editor = LineEditor::new();
        let mut term = FakeTerminal::new(&[]);
        let steps = keys(&[
            &typed("ab日本語"),
            &[Key::Left, Key::Backspace],
            &typed("x"),
            &[Key::Home, Key::Delete, Key::End, Key::Backspace],
        ]);
        editor.reset();
        for key in steps {
            editor.handle_key(key);
            editor.repaint(&mut term).unwrap();
            assert_eq!(term.screen(), editor.line());
            assert_eq!(term.col, columns(&editor.buffer[..editor.cursor]));
        }
        assert_eq!(editor.line(), "b日x");
    }

    #[test]
    fn test_full_line_counts_wide_characters_twice() {
        let mut editor = LineEditor::new();
        let mut term = FakeTerminal::new(&keys(&[&typed("日本語a"), &[Key::Enter]]));
        term.columns = 6;
        assert_eq!(editor.scan(&mut term).unwrap(), Scan::Line("日本a".to_string()));
    }

    #[test]
    fn test_interrupt_and_eof() {
        let mut editor = LineEditor::new();
        let (result, _) = scan(&mut editor, &keys(&[&typed("ls"), &[Key::Interrupt]]));
        assert_eq!(result, Scan::Interrupted);
        assert!(editor.history().is_empty());

        let (result, _) = scan(&mut editor, &[Key::Eof]);
        assert_eq!(result, Scan::Eof);

        let (result, _) = scan(&mut editor, &[Key::Char('a'), Key::Eof, Key::Enter]);
        assert_eq!(result, Scan::Line("a".to_string()));
    }

    #[test]
    fn test_read_error_leaves_raw_mode() {
        let mut editor = LineEditor::new();
        let mut term = FakeTerminal::new(&typed("x"));
        assert!(editor.scan(&mut term).is_err());
        assert!(!term.raw);
    }
}
