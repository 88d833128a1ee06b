//! Incremental `Transfer-Encoding: chunked` body decoder (spec 4.B).
//!
//! Encoded as an explicit two-state sum type rather than a sentinel integer,
//! per the design note calling for the chunked decoder's state to be a
//! tagged enum: [`ChunkState::AwaitingSize`] while looking for the next
//! `<hex-size>[;ext]\r\n` line, [`ChunkState::InChunk`] while copying the
//! `remaining` data bytes of the current chunk (plus its trailing CRLF).

use memchr::memchr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChunkState {
    AwaitingSize,
    InChunk { remaining: usize },
    AwaitingTrailerEnd,
    Done,
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Feed {
    /// More bytes are needed before progress can be made; nothing was consumed.
    NeedMore,
    /// The terminating `0` chunk and any trailers were consumed. Decoding is complete.
    Done,
    /// Malformed chunk framing.
    Invalid,
    /// Decoded size exceeds the configured body limit.
    TooLarge,
}

pub(crate) struct ChunkedDecoder {
    state: ChunkState,
    max_body_size: usize,
    decoded_len: usize,
}

impl ChunkedDecoder {
    pub(crate) fn new(max_body_size: usize) -> Self {
        Self {
            state: ChunkState::AwaitingSize,
            max_body_size,
            decoded_len: 0,
        }
    }

    pub(crate) fn is_done(&self) -> bool {
        self.state == ChunkState::Done
    }

    /// Consumes as much of `input` as it can, appending decoded data bytes to
    /// `out`. Returns how many bytes of `input` were consumed alongside the
    /// outcome; callers drain that many bytes before the next `feed`.
    pub(crate) fn feed(&mut self, input: &[u8], out: &mut Vec<u8>) -> (usize, Feed) {
        let mut consumed = 0;

        loop {
            match self.state {
                ChunkState::Done => return (consumed, Feed::Done),
                ChunkState::AwaitingSize => {
                    let buf = &input[consumed..];
                    let Some(line_end) = memchr(b'\n', buf) else {
                        return (consumed, Feed::NeedMore);
                    };
                    if line_end == 0 || buf[line_end - 1] != b'\r' {
                        return (consumed, Feed::Invalid);
                    }
                    let size_line = &buf[..line_end - 1];
                    let size_field = match memchr(b';', size_line) {
                        Some(pos) => &size_line[..pos],
                        None => size_line,
                    };
                    let Some(size) = parse_hex(size_field) else {
                        return (consumed, Feed::Invalid);
                    };

                    consumed += line_end + 1;

                    if size == 0 {
                        self.state = ChunkState::AwaitingTrailerEnd;
                    } else {
                        self.state = ChunkState::InChunk { remaining: size };
                    }
                }
                ChunkState::InChunk { remaining } => {
                    let buf = &input[consumed..];
                    let take = remaining.min(buf.len());

                    if self.max_body_size != 0 && self.decoded_len + take > self.max_body_size {
                        return (consumed, Feed::TooLarge);
                    }

                    out.extend_from_slice(&buf[..take]);
                    self.decoded_len += take;
                    consumed += take;

                    if take < remaining {
                        self.state = ChunkState::InChunk {
                            remaining: remaining - take,
                        };
                        return (consumed, Feed::NeedMore);
                    }

                    // Full chunk copied; the data must be followed by CRLF.
                    let tail = &input[consumed..];
                    if tail.len() < 2 {
                        return (consumed, Feed::NeedMore);
                    }
                    if tail[0] != b'\r' || tail[1] != b'\n' {
                        return (consumed, Feed::Invalid);
                    }
                    consumed += 2;
                    self.state = ChunkState::AwaitingSize;
                }
                ChunkState::AwaitingTrailerEnd => {
                    let buf = &input[consumed..];
                    // No-trailers fast path: "\r\n" immediately.
                    if buf.len() >= 2 && &buf[..2] == b"\r\n" {
                        consumed += 2;
                        self.state = ChunkState::Done;
                        return (consumed, Feed::Done);
                    }
                    // Trailers present: consume up to the first blank line.
                    let Some(pos) = find_double_crlf(buf) else {
                        return (consumed, Feed::NeedMore);
                    };
                    consumed += pos + 4;
                    self.state = ChunkState::Done;
                    return (consumed, Feed::Done);
                }
            }

            if consumed > input.len() {
                unreachable!("chunk decoder consumed more than it was given");
            }
        }
    }
}

fn find_double_crlf(buf: &[u8]) -> Option<usize> {
    let mut start = 0;
    while let Some(rel) = memchr(b'\r', &buf[start..]) {
        let pos = start + rel;
        if buf.len() >= pos + 4 && &buf[pos..pos + 4] == b"\r\n\r\n" {
            return Some(pos);
        }
        start = pos + 1;
    }
    None
}

fn parse_hex(bytes: &[u8]) -> Option<usize> {
    if bytes.is_empty() {
        return None;
    }
    let mut value: usize = 0;
    for &b in bytes {
        let digit = match b {
            b'0'..=b'9' => b - b'0',
            b'a'..=b'f' => b - b'a' + 10,
            b'A'..=b'F' => b - b'A' + 10,
            _ => return None,
        };
        value = value.checked_mul(16)?.checked_add(digit as usize)?;
    }
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(chunks: &[u8], limit: usize) -> (Vec<u8>, Feed) {
        let mut decoder = ChunkedDecoder::new(limit);
        let mut out = Vec::new();
        let mut input = chunks;
        loop {
            let (consumed, feed) = decoder.feed(input, &mut out);
            input = &input[consumed..];
            match feed {
                Feed::NeedMore => return (out, Feed::NeedMore),
                other => return (out, other),
            }
        }
    }

    #[test]
    fn single_chunk() {
        let (out, feed) = decode_all(b"5\r\nhello\r\n0\r\n\r\n", 0);
        assert_eq!(feed, Feed::Done);
        assert_eq!(out, b"hello");
    }

    #[test]
    fn multiple_chunks() {
        let (out, feed) = decode_all(b"4\r\nWiki\r\n5\r\npedia\r\n0\r\n\r\n", 0);
        assert_eq!(feed, Feed::Done);
        assert_eq!(out, b"Wikipedia");
    }

    #[test]
    fn chunk_extension_ignored() {
        let (out, feed) = decode_all(b"5;foo=bar\r\nhello\r\n0\r\n\r\n", 0);
        assert_eq!(feed, Feed::Done);
        assert_eq!(out, b"hello");
    }

    #[test]
    fn one_byte_at_a_time() {
        let data = b"3\r\nabc\r\n0\r\n\r\n";
        let mut decoder = ChunkedDecoder::new(0);
        let mut out = Vec::new();
        let mut done_count = 0;

        for i in 1..=data.len() {
            let input = &data[..i];
            let already = out.len();
            let mut offset = 0;
            loop {
                let (consumed, feed) = decoder.feed(&input[offset..], &mut out);
                offset += consumed;
                match feed {
                    Feed::NeedMore => break,
                    Feed::Done => {
                        done_count += 1;
                        break;
                    }
                    Feed::Invalid | Feed::TooLarge => panic!("unexpected {:?}", feed),
                }
            }
            let _ = already;
        }

        assert_eq!(out, b"abc");
        assert_eq!(done_count, 1);
    }

    #[test]
    fn trailers_discarded() {
        let (out, feed) = decode_all(b"3\r\nabc\r\n0\r\nX-Trailer: 1\r\n\r\n", 0);
        assert_eq!(feed, Feed::Done);
        assert_eq!(out, b"abc");
    }

    #[test]
    fn missing_crlf_after_data_is_invalid() {
        let (_, feed) = decode_all(b"3\r\nabcXX0\r\n\r\n", 0);
        assert_eq!(feed, Feed::Invalid);
    }

    #[test]
    fn over_limit_reports_too_large() {
        let (_, feed) = decode_all(b"5\r\nhello\r\n0\r\n\r\n", 3);
        assert_eq!(feed, Feed::TooLarge);
    }

    #[test]
    fn zero_limit_means_unlimited() {
        let (out, feed) = decode_all(b"5\r\nhello\r\n0\r\n\r\n", 0);
        assert_eq!(feed, Feed::Done);
        assert_eq!(out, b"hello");
    }
}
