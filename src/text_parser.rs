use crate::Tag;

/// A byte-oriented cursor over a string.
///
/// Used by `Feature` parsing and by the rule-file lexer.
pub(crate) struct TextParser<'a> {
    pos: usize,
    text: &'a str,
}

impl<'a> TextParser<'a> {
    #[inline]
    pub fn new(text: &'a str) -> Self {
        TextParser { pos: 0, text }
    }

    #[inline]
    pub fn at_end(&self) -> bool {
        self.pos >= self.text.len()
    }

    #[inline]
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Moves back to a position returned by [`pos`](Self::pos).
    #[inline]
    pub fn set_pos(&mut self, pos: usize) {
        self.pos = pos.min(self.text.len());
    }

    #[inline]
    pub fn curr_byte(&self) -> Option<u8> {
        self.text.as_bytes().get(self.pos).copied()
    }

    #[inline]
    pub fn peek_byte(&self, offset: usize) -> Option<u8> {
        self.text.as_bytes().get(self.pos + offset).copied()
    }

    #[inline]
    pub fn advance(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.text.len());
    }

    /// Returns a 1-based `(line, column)` pair for the current position.
    pub fn line_column(&self) -> (usize, usize) {
        let consumed = &self.text[..self.pos];
        let line = consumed.bytes().filter(|b| *b == b'\n').count() + 1;
        let column = match consumed.rfind('\n') {
            Some(idx) => consumed[idx + 1..].chars().count() + 1,
            None => consumed.chars().count() + 1,
        };
        (line, column)
    }

    pub fn consume_byte(&mut self, c: u8) -> Option<()> {
        let curr = self.curr_byte()?;
        if curr != c {
            return None;
        }

        self.advance(1);
        Some(())
    }

    pub fn skip_spaces(&mut self) {
        // Unlike harfbuzz::ISSPACE, is_ascii_whitespace doesn't includes `\v`, but whatever.
        while let Some(c) = self.curr_byte() {
            if !c.is_ascii_whitespace() {
                break;
            }

            self.advance(1);
        }
    }

    pub fn consume_quote(&mut self) -> Option<u8> {
        let c = self.curr_byte()?;
        if matches!(c, b'\'' | b'"') {
            self.advance(1);
            Some(c)
        } else {
            None
        }
    }

    pub fn consume_bytes<F>(&mut self, f: F) -> &'a str
    where
        F: Fn(u8) -> bool,
    {
        let start = self.pos;
        self.skip_bytes(f);
        &self.text[start..self.pos]
    }

    pub fn skip_bytes<F>(&mut self, f: F)
    where
        F: Fn(u8) -> bool,
    {
        while let Some(c) = self.curr_byte() {
            if !f(c) {
                break;
            }

            self.advance(1);
        }
    }

    pub fn consume_tag(&mut self) -> Option<Tag> {
        let tag = self.consume_bytes(|c| c.is_ascii_alphanumeric() || c == b'_');
        if tag.len() > 4 {
            return None;
        }

        Some(Tag::from_bytes_lossy(tag.as_bytes()))
    }

    pub fn consume_i32(&mut self) -> Option<i32> {
        let start = self.pos;

        if matches!(self.curr_byte(), Some(b'-') | Some(b'+')) {
            self.advance(1);
        }

        self.skip_bytes(|c| c.is_ascii_digit());
        match self.text[start..self.pos].parse::<i32>() {
            Ok(n) => Some(n),
            Err(_) => {
                self.pos = start;
                None
            }
        }
    }

    pub fn consume_bool(&mut self) -> Option<bool> {
        self.skip_spaces();

        let value = self.consume_bytes(|c| c.is_ascii_alphabetic()).as_bytes();
        if value.len() == 2 {
            if value[0].to_ascii_lowercase() == b'o' && value[1].to_ascii_lowercase() == b'n' {
                return Some(true);
            }
        } else if value.len() == 3 {
            if value[0].to_ascii_lowercase() == b'o'
                && value[1].to_ascii_lowercase() == b'f'
                && value[2].to_ascii_lowercase() == b'f'
            {
                return Some(false);
            }
        }

        None
    }

    /// Consumes a run of identifier bytes: ASCII letters, digits, `_` and `-`.
    pub fn consume_ident(&mut self) -> &'a str {
        self.consume_bytes(|c| c.is_ascii_alphanumeric() || c == b'_' || c == b'-')
    }

    /// Consumes the text up to (not including) the next `c`.
    pub fn consume_until(&mut self, c: u8) -> Option<&'a str> {
        let start = self.pos;
        let len = self.text.as_bytes()[start..].iter().position(|b| *b == c)?;
        self.pos += len;
        Some(&self.text[start..self.pos])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_column_counts_from_one() {
        let mut p = TextParser::new("ab\ncde");
        assert_eq!(p.line_column(), (1, 1));
        p.advance(4);
        assert_eq!(p.line_column(), (2, 2));
    }

    #[test]
    fn consume_i32_restores_on_failure() {
        let mut p = TextParser::new("-x");
        assert_eq!(p.consume_i32(), None);
        assert_eq!(p.pos(), 0);
    }
}
