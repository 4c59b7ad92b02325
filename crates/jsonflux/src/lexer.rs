use memchr::memchr2;

use crate::{
    error::Error,
    events::{Event, NumberKind},
};

/// JSON whitespace; deliberately narrower than Unicode whitespace.
fn is_ws(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\n' | b'\r')
}

fn is_number_byte(byte: u8) -> bool {
    byte.is_ascii_digit() || matches!(byte, b'-' | b'+' | b'.' | b'e' | b'E')
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum Container {
    Object,
    Array,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum State {
    /// Expecting a value: top level, after `:` or after `,` in an array.
    Value,
    /// Inside an object: first key or `}`.
    KeyOrEnd,
    /// Inside an object after `,`: a key is mandatory.
    Key,
    /// After a key: `:`.
    Colon,
    /// After a value inside a container: `,` or the closing bracket.
    CommaOrEnd,
    /// Inside an array: first element or `]`.
    ValueOrEnd,
    /// Top-level value consumed; only trivia may follow.
    Done,
}

/// Incremental push lexer over byte chunks.
///
/// Input arrives through [`Lexer::feed`] in arbitrary slices; events are
/// pulled with [`Lexer::next_event`], which returns `None` when the buffered
/// input ends mid-token and more bytes are needed. The lexer checks the full
/// JSON structure (commas, colons, nesting, one top-level value), skips
/// JavaScript-style comments, decodes string escapes including surrogate
/// pairs, and reports byte offsets for every token and error.
pub(crate) struct Lexer {
    buf: Vec<u8>,
    pos: usize,
    /// Global offset of `buf[0]`.
    base: u64,
    eof: bool,
    max_depth: usize,
    stack: Vec<Container>,
    state: State,
    /// Decoded payload of the last string or key token.
    scratch: String,
    /// Verbatim lexeme of the last number token.
    lexeme: String,
}

/// Outcome of a scan attempt that may hit the end of buffered input.
enum Scan<T> {
    Token(T),
    NeedMore,
}

impl Lexer {
    pub(crate) fn new(max_depth: usize) -> Lexer {
        Lexer {
            buf: Vec::new(),
            pos: 0,
            base: 0,
            eof: false,
            max_depth,
            stack: Vec::new(),
            state: State::Value,
            scratch: String::new(),
            lexeme: String::new(),
        }
    }

    pub(crate) fn feed(&mut self, chunk: &[u8]) {
        // Drop the consumed prefix so the buffer tracks the unparsed tail,
        // not the whole document.
        if self.pos > 0 {
            self.buf.drain(..self.pos);
            self.base += self.pos as u64;
            self.pos = 0;
        }
        self.buf.extend_from_slice(chunk);
    }

    pub(crate) fn finish(&mut self) {
        self.eof = true;
    }

    fn offset_at(&self, index: usize) -> u64 {
        self.base + index as u64
    }

    /// Checks that the document ended cleanly; called after the final
    /// [`Lexer::next_event`] returned `None` with EOF signalled.
    pub(crate) fn ensure_complete(&self) -> Result<(), Error> {
        if self.state != State::Done {
            return Err(Error::syntax(
                "unexpected end of input",
                self.offset_at(self.buf.len()),
            ));
        }
        Ok(())
    }

    /// The next token, or `None` when more input (or EOF) is needed.
    pub(crate) fn next_event(&mut self) -> Result<Option<(Event<'_>, u64)>, Error> {
        loop {
            match self.skip_trivia()? {
                Scan::NeedMore => return Ok(None),
                Scan::Token(()) => {}
            }
            let Some(&byte) = self.buf.get(self.pos) else {
                if self.eof && self.state != State::Done {
                    return Err(Error::syntax(
                        "unexpected end of input",
                        self.offset_at(self.pos),
                    ));
                }
                return Ok(None);
            };
            let start = self.pos;
            match self.state {
                State::Done => {
                    return Err(Error::syntax(
                        "trailing characters after the top-level value",
                        self.offset_at(start),
                    ));
                }
                State::Colon => {
                    if byte != b':' {
                        return Err(Error::syntax(
                            "expected ':' after object key",
                            self.offset_at(start),
                        ));
                    }
                    self.pos += 1;
                    self.state = State::Value;
                }
                State::CommaOrEnd => match byte {
                    b',' => {
                        self.pos += 1;
                        self.state = match self.stack.last() {
                            Some(Container::Object) => State::Key,
                            _ => State::Value,
                        };
                    }
                    b'}' if self.stack.last() == Some(&Container::Object) => {
                        self.pos += 1;
                        self.stack.pop();
                        self.after_value();
                        return Ok(Some((Event::ObjectEnd, self.offset_at(start))));
                    }
                    b']' if self.stack.last() == Some(&Container::Array) => {
                        self.pos += 1;
                        self.stack.pop();
                        self.after_value();
                        return Ok(Some((Event::ArrayEnd, self.offset_at(start))));
                    }
                    _ => {
                        return Err(Error::syntax(
                            "expected ',' or a closing bracket",
                            self.offset_at(start),
                        ));
                    }
                },
                State::KeyOrEnd | State::Key => match byte {
                    b'"' => match self.scan_string(start)? {
                        Scan::NeedMore => return Ok(None),
                        Scan::Token(()) => {
                            self.state = State::Colon;
                            return Ok(Some((Event::Key(&self.scratch), self.offset_at(start))));
                        }
                    },
                    b'}' if self.state == State::KeyOrEnd => {
                        self.pos += 1;
                        self.stack.pop();
                        self.after_value();
                        return Ok(Some((Event::ObjectEnd, self.offset_at(start))));
                    }
                    _ => {
                        return Err(Error::syntax(
                            "expected an object key",
                            self.offset_at(start),
                        ));
                    }
                },
                State::Value | State::ValueOrEnd => match byte {
                    b']' if self.state == State::ValueOrEnd => {
                        self.pos += 1;
                        self.stack.pop();
                        self.after_value();
                        return Ok(Some((Event::ArrayEnd, self.offset_at(start))));
                    }
                    b'{' => {
                        self.check_depth(start)?;
                        self.pos += 1;
                        self.stack.push(Container::Object);
                        self.state = State::KeyOrEnd;
                        return Ok(Some((Event::ObjectBegin, self.offset_at(start))));
                    }
                    b'[' => {
                        self.check_depth(start)?;
                        self.pos += 1;
                        self.stack.push(Container::Array);
                        self.state = State::ValueOrEnd;
                        return Ok(Some((Event::ArrayBegin, self.offset_at(start))));
                    }
                    b'"' => match self.scan_string(start)? {
                        Scan::NeedMore => return Ok(None),
                        Scan::Token(()) => {
                            self.after_value();
                            return Ok(Some((
                                Event::String(&self.scratch),
                                self.offset_at(start),
                            )));
                        }
                    },
                    b't' => match self.scan_literal(start, "true")? {
                        Scan::NeedMore => return Ok(None),
                        Scan::Token(()) => {
                            self.after_value();
                            return Ok(Some((Event::Bool(true), self.offset_at(start))));
                        }
                    },
                    b'f' => match self.scan_literal(start, "false")? {
                        Scan::NeedMore => return Ok(None),
                        Scan::Token(()) => {
                            self.after_value();
                            return Ok(Some((Event::Bool(false), self.offset_at(start))));
                        }
                    },
                    b'n' => match self.scan_literal(start, "null")? {
                        Scan::NeedMore => return Ok(None),
                        Scan::Token(()) => {
                            self.after_value();
                            return Ok(Some((Event::Null, self.offset_at(start))));
                        }
                    },
                    b'-' | b'0'..=b'9' => match self.scan_number(start)? {
                        Scan::NeedMore => return Ok(None),
                        Scan::Token(kind) => {
                            self.after_value();
                            return Ok(Some((
                                Event::Number(&self.lexeme, kind),
                                self.offset_at(start),
                            )));
                        }
                    },
                    other => {
                        return Err(Error::syntax(
                            format!("unexpected byte 0x{other:02x}"),
                            self.offset_at(start),
                        ));
                    }
                },
            }
        }
    }

    fn after_value(&mut self) {
        self.state = if self.stack.is_empty() {
            State::Done
        } else {
            State::CommaOrEnd
        };
    }

    fn check_depth(&self, start: usize) -> Result<(), Error> {
        if self.stack.len() >= self.max_depth {
            return Err(Error::syntax(
                "nesting depth exceeded",
                self.offset_at(start),
            ));
        }
        Ok(())
    }

    /// Skips whitespace and JavaScript-style comments.
    fn skip_trivia(&mut self) -> Result<Scan<()>, Error> {
        loop {
            while let Some(&byte) = self.buf.get(self.pos) {
                if !is_ws(byte) {
                    break;
                }
                self.pos += 1;
            }
            if self.buf.get(self.pos) != Some(&b'/') {
                return Ok(Scan::Token(()));
            }
            let start = self.pos;
            match self.buf.get(self.pos + 1) {
                None if !self.eof => return Ok(Scan::NeedMore),
                Some(&b'/') => {
                    // Line comment: runs to the newline, or to EOF. Left
                    // unconsumed until its end is buffered, as rescanning
                    // must restart from the `//`.
                    match memchr::memchr(b'\n', &self.buf[self.pos + 2..]) {
                        Some(nl) => self.pos += 2 + nl + 1,
                        None if self.eof => {
                            self.pos = self.buf.len();
                            return Ok(Scan::Token(()));
                        }
                        None => return Ok(Scan::NeedMore),
                    }
                }
                Some(&b'*') => {
                    let mut search = self.pos + 2;
                    loop {
                        match memchr::memchr(b'*', &self.buf[search..]) {
                            Some(star) => {
                                let star = search + star;
                                match self.buf.get(star + 1) {
                                    Some(&b'/') => {
                                        self.pos = star + 2;
                                        break;
                                    }
                                    Some(_) => search = star + 1,
                                    None if self.eof => {
                                        return Err(Error::syntax(
                                            "unterminated comment",
                                            self.offset_at(start),
                                        ));
                                    }
                                    None => return Ok(Scan::NeedMore),
                                }
                            }
                            None if self.eof => {
                                return Err(Error::syntax(
                                    "unterminated comment",
                                    self.offset_at(start),
                                ));
                            }
                            None => return Ok(Scan::NeedMore),
                        }
                    }
                }
                _ => {
                    return Err(Error::syntax(
                        "unexpected byte 0x2f",
                        self.offset_at(start),
                    ));
                }
            }
        }
    }

    fn scan_literal(&mut self, start: usize, literal: &'static str) -> Result<Scan<()>, Error> {
        let bytes = literal.as_bytes();
        let available = self.buf.len() - start;
        if available < bytes.len() {
            if self.buf[start..] == bytes[..available] && !self.eof {
                return Ok(Scan::NeedMore);
            }
            return Err(Error::syntax(
                format!("malformed token, expected '{literal}'"),
                self.offset_at(start),
            ));
        }
        if &self.buf[start..start + bytes.len()] != bytes {
            return Err(Error::syntax(
                format!("malformed token, expected '{literal}'"),
                self.offset_at(start),
            ));
        }
        self.pos = start + bytes.len();
        Ok(Scan::Token(()))
    }

    fn scan_number(&mut self, start: usize) -> Result<Scan<NumberKind>, Error> {
        let mut end = start;
        while end < self.buf.len() && is_number_byte(self.buf[end]) {
            end += 1;
        }
        if end == self.buf.len() && !self.eof {
            return Ok(Scan::NeedMore);
        }
        let Some(kind) = classify_number(&self.buf[start..end]) else {
            return Err(Error::syntax("malformed number", self.offset_at(start)));
        };
        self.lexeme.clear();
        // The charset check above guarantees ASCII.
        self.lexeme
            .push_str(std::str::from_utf8(&self.buf[start..end]).unwrap_or_default());
        self.pos = end;
        Ok(Scan::Token(kind))
    }

    /// Scans a string starting at the opening quote. On success the decoded
    /// payload is in `self.scratch` and `self.pos` is past the closing
    /// quote. The token is only consumed once the closing quote is in the
    /// buffer, so a chunk boundary inside the string rescans from `start`.
    fn scan_string(&mut self, start: usize) -> Result<Scan<()>, Error> {
        let mut out: Vec<u8> = Vec::new();
        let mut i = start + 1;
        loop {
            let Some(window) = self.buf.get(i..) else {
                break;
            };
            let Some(step) = memchr2(b'"', b'\\', window) else {
                break;
            };
            // Reject raw control characters in the scanned span.
            if let Some(bad) = window[..step].iter().position(|b| *b < 0x20) {
                return Err(Error::syntax(
                    "control character in string",
                    self.offset_at(i + bad),
                ));
            }
            out.extend_from_slice(&window[..step]);
            i += step;
            if self.buf[i] == b'"' {
                let text = String::from_utf8(out).map_err(|_| {
                    Error::syntax("invalid UTF-8 in string", self.offset_at(start))
                })?;
                self.scratch = text;
                self.pos = i + 1;
                return Ok(Scan::Token(()));
            }
            // Escape sequence.
            match self.decode_escape(i, &mut out)? {
                Scan::NeedMore => return Ok(Scan::NeedMore),
                Scan::Token(next) => i = next,
            }
        }
        if self.eof {
            return Err(Error::syntax("unterminated string", self.offset_at(start)));
        }
        Ok(Scan::NeedMore)
    }

    /// Decodes one escape sequence at `i` (pointing at the backslash) into
    /// `out`, returning the index just past it.
    fn decode_escape(&self, i: usize, out: &mut Vec<u8>) -> Result<Scan<usize>, Error> {
        let Some(&escape) = self.buf.get(i + 1) else {
            return if self.eof {
                Err(Error::syntax("unterminated string", self.offset_at(i)))
            } else {
                Ok(Scan::NeedMore)
            };
        };
        let simple = match escape {
            b'"' => Some(b'"'),
            b'\\' => Some(b'\\'),
            b'/' => Some(b'/'),
            b'b' => Some(0x08),
            b'f' => Some(0x0c),
            b'n' => Some(b'\n'),
            b'r' => Some(b'\r'),
            b't' => Some(b'\t'),
            b'u' => None,
            other => {
                return Err(Error::syntax(
                    format!("invalid escape character 0x{other:02x}"),
                    self.offset_at(i + 1),
                ));
            }
        };
        if let Some(byte) = simple {
            out.push(byte);
            return Ok(Scan::Token(i + 2));
        }
        let Scan::Token((first, mut next)) = self.hex_escape(i)? else {
            return Ok(Scan::NeedMore);
        };
        let code = match first {
            0xD800..=0xDBFF => {
                // A high surrogate must pair with a following \uXXXX low one.
                if self.buf.get(next) != Some(&b'\\') || self.buf.get(next + 1) != Some(&b'u') {
                    if self.buf.len() < next + 2 && !self.eof {
                        return Ok(Scan::NeedMore);
                    }
                    return Err(Error::syntax(
                        "unpaired UTF-16 surrogate",
                        self.offset_at(i),
                    ));
                }
                let Scan::Token((second, after)) = self.hex_escape(next)? else {
                    return Ok(Scan::NeedMore);
                };
                if !(0xDC00..=0xDFFF).contains(&second) {
                    return Err(Error::syntax(
                        "unpaired UTF-16 surrogate",
                        self.offset_at(i),
                    ));
                }
                next = after;
                0x10000 + ((u32::from(first) & 0x3ff) << 10 | (u32::from(second) & 0x3ff))
            }
            0xDC00..=0xDFFF => {
                return Err(Error::syntax(
                    "unpaired UTF-16 surrogate",
                    self.offset_at(i),
                ));
            }
            code => u32::from(code),
        };
        let Some(c) = char::from_u32(code) else {
            return Err(Error::syntax(
                "invalid unicode escape",
                self.offset_at(i),
            ));
        };
        out.extend_from_slice(c.encode_utf8(&mut [0; 4]).as_bytes());
        Ok(Scan::Token(next))
    }

    /// Reads the four hex digits of a `\uXXXX` escape whose backslash sits
    /// at `i`; returns the code unit and the index just past it.
    fn hex_escape(&self, i: usize) -> Result<Scan<(u16, usize)>, Error> {
        let digits_at = i + 2;
        let Some(digits) = self.buf.get(digits_at..digits_at + 4) else {
            return if self.eof {
                Err(Error::syntax("unterminated string", self.offset_at(i)))
            } else {
                Ok(Scan::NeedMore)
            };
        };
        let mut unit: u16 = 0;
        for (at, &digit) in digits.iter().enumerate() {
            let Some(value) = (digit as char).to_digit(16) else {
                return Err(Error::syntax(
                    "invalid unicode escape",
                    self.offset_at(digits_at + at),
                ));
            };
            unit = unit * 16 + value as u16;
        }
        Ok(Scan::Token((unit, digits_at + 4)))
    }
}

/// Validates the RFC 8259 number grammar and classifies the lexeme.
fn classify_number(bytes: &[u8]) -> Option<NumberKind> {
    let mut i = 0;
    if bytes.first() == Some(&b'-') {
        i += 1;
    }
    let int_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let int_len = i - int_start;
    if int_len == 0 || (int_len > 1 && bytes[int_start] == b'0') {
        return None;
    }
    let mut kind = NumberKind::Integer;
    if i < bytes.len() && bytes[i] == b'.' {
        kind = NumberKind::Decimal;
        i += 1;
        let frac_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i == frac_start {
            return None;
        }
    }
    if i < bytes.len() && matches!(bytes[i], b'e' | b'E') {
        kind = NumberKind::Decimal;
        i += 1;
        if i < bytes.len() && matches!(bytes[i], b'+' | b'-') {
            i += 1;
        }
        let exp_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i == exp_start {
            return None;
        }
    }
    (i == bytes.len()).then_some(kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Pulls every event from a single complete document.
    fn lex(text: &str) -> Result<Vec<String>, Error> {
        lex_chunked(&[text.as_bytes()])
    }

    fn lex_chunked(chunks: &[&[u8]]) -> Result<Vec<String>, Error> {
        let mut lexer = Lexer::new(64);
        let mut events = Vec::new();
        for (i, chunk) in chunks.iter().enumerate() {
            lexer.feed(chunk);
            if i == chunks.len() - 1 {
                lexer.finish();
            }
            while let Some((event, offset)) = lexer.next_event()? {
                events.push(format!("{offset}:{event:?}"));
            }
        }
        lexer.ensure_complete()?;
        Ok(events)
    }

    #[test]
    fn simple_object() {
        let events = lex(r#"{"a": 1, "b": [true, null]}"#).unwrap();
        assert_eq!(
            events,
            vec![
                "0:ObjectBegin",
                "1:Key(\"a\")",
                "6:Number(\"1\", Integer)",
                "9:Key(\"b\")",
                "14:ArrayBegin",
                "15:Bool(true)",
                "21:Null",
                "25:ArrayEnd",
                "26:ObjectEnd",
            ]
        );
    }

    #[test]
    fn chunk_boundaries_anywhere() {
        let text = r#"{"key": [1.5e2, "vaélue", // c
            {"x": false}]} "#;
        // Split at every byte position; results must be identical.
        let whole = lex(text).unwrap();
        let bytes = text.as_bytes();
        for split in 1..bytes.len() {
            let parts = [&bytes[..split], &bytes[split..]];
            assert_eq!(lex_chunked(&parts).unwrap(), whole, "split at {split}");
        }
    }

    #[test]
    fn comments_are_skipped() {
        let events = lex("// header\n[1, /* two */ 2]").unwrap();
        assert_eq!(events.len(), 4);
    }

    #[test]
    fn surrogate_pair_decodes() {
        let events = lex(r#""😀""#).unwrap();
        assert_eq!(events, vec!["0:String(\"😀\")"]);
    }

    #[test]
    fn trailing_garbage_rejected() {
        let err = lex("1 2").unwrap_err();
        assert!(err.to_string().contains("trailing"));
    }

    #[test]
    fn unterminated_string_rejected() {
        assert!(lex(r#""abc"#).is_err());
    }

    #[test]
    fn unterminated_comment_rejected() {
        assert!(lex("/* nope").is_err());
    }

    #[test]
    fn missing_comma_rejected() {
        assert!(lex("[1 2]").is_err());
    }

    #[test]
    fn depth_limit_enforced() {
        let deep = "[".repeat(65);
        let mut lexer = Lexer::new(64);
        lexer.feed(deep.as_bytes());
        let mut result = Ok(());
        loop {
            match lexer.next_event() {
                Ok(Some(_)) => {}
                Ok(None) => break,
                Err(err) => {
                    result = Err(err);
                    break;
                }
            }
        }
        assert!(result.unwrap_err().to_string().contains("depth"));
    }

    #[test]
    fn top_level_scalar() {
        let events = lex("9223372036854775808").unwrap();
        assert_eq!(events, vec!["0:Number(\"9223372036854775808\", Integer)"]);
    }

    #[test]
    fn malformed_numbers_rejected() {
        assert!(lex("01").is_err());
        assert!(lex("1.").is_err());
        assert!(lex("-").is_err());
        assert!(lex("1e+").is_err());
    }

    #[test]
    fn empty_input_rejected() {
        assert!(matches!(lex("  "), Err(Error::Syntax { .. })));
    }
}
