use std::io::{self, BufRead, Read};

use tiny_http::{Header, Method};

use crate::logger::get_reporter;
use crate::utils::Result;


const MODULE: &str = "REQUEST";

pub const CONTENT_LENGTH: &str = "Content-Length";

const MAX_HEAD_SIZE: usize = 16 * 1024;
const MAX_HEADERS: usize = 64;

pub const MALFORMED_CONTENT_LENGTH: &str = "malformed content length";
pub const MALFORMED_HEAD: &str = "malformed request head";
pub const HEAD_TOO_LARGE: &str = "request head too large";
pub const INCOMPLETE_HEAD: &str = "incomplete request head";
pub const HEAD_READ_ERROR: &str = "head read error";


/// Request line and headers of one exchange.
#[derive(Debug)]
pub struct RequestHead {
    pub method: Method,
    pub url: String,
    pub headers: Vec<Header>,
}

impl RequestHead {
    pub fn content_length(&self) -> Result<Option<usize>> {
        content_length(&self.headers)
    }
}


/// Reads the raw head up to and including the blank line that ends it.
///
/// Empty lines before the request line are skipped. Nothing past the blank line is consumed.
pub fn read_head<R: BufRead>(reader: &mut R) -> Result<Vec<u8>> {
    let mut head = Vec::new();
    loop {
        let start = head.len();
        let limit = (MAX_HEAD_SIZE + 1 - start) as u64;
        let n = reader.by_ref().take(limit).read_until(b'\n', &mut head)
            .map_err(get_reporter(MODULE, "Read", HEAD_READ_ERROR))?;
        if n == 0 {
            return Err(INCOMPLETE_HEAD);
        }
        if head.len() > MAX_HEAD_SIZE {
            return Err(HEAD_TOO_LARGE);
        }
        let line = &head[start..];
        if line == b"\r\n" || line == b"\n" {
            if start == 0 {
                head.clear();
                continue;
            }
            return Ok(head);
        }
    }
}

pub fn parse_head(raw: &[u8]) -> Result<RequestHead> {
    let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
    let mut req = httparse::Request::new(&mut headers);
    match req.parse(raw) {
        Ok(httparse::Status::Complete(_)) => {}
        Ok(httparse::Status::Partial) => return Err(MALFORMED_HEAD),
        Err(e) => {
            warn!("[{}] Could not parse request head: {}", MODULE, e);
            return Err(MALFORMED_HEAD);
        }
    }

    let method = req.method.unwrap_or_default().parse::<Method>().map_err(|_| MALFORMED_HEAD)?;
    let url = req.path.unwrap_or_default().to_string();
    let headers = req.headers.iter()
        .map(|h| Header::from_bytes(h.name.as_bytes(), h.value).map_err(|_| MALFORMED_HEAD))
        .collect::<Result<Vec<Header>>>()?;

    Ok(RequestHead { method, url, headers })
}

/// Declared body length of a request, `None` when the header is absent.
pub fn content_length(headers: &[Header]) -> Result<Option<usize>> {
    match headers.iter().find(|h| h.field.equiv(CONTENT_LENGTH)) {
        None => Ok(None),
        Some(h) => h.value.as_str().trim().parse::<usize>()
            .map(Some)
            .map_err(|e| {
                warn!("[{}] Bad Content-Length `{}`: {}", MODULE, h.value, e);
                MALFORMED_CONTENT_LENGTH
            }),
    }
}

/// Reads exactly `length` bytes, or everything up to end of stream when no length is known.
pub fn read_body(reader: &mut dyn Read, length: Option<usize>) -> io::Result<Vec<u8>> {
    match length {
        Some(n) => {
            let mut buf = vec![0u8; n];
            reader.read_exact(&mut buf)?;
            Ok(buf)
        }
        None => {
            let mut buf = Vec::new();
            reader.read_to_end(&mut buf)?;
            Ok(buf)
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn header(name: &str, value: &str) -> Header {
        Header::from_bytes(name.as_bytes(), value.as_bytes()).unwrap()
    }

    #[test]
    fn head_stops_at_blank_line() {
        let mut reader = Cursor::new(b"PUT / HTTP/1.1\r\nContent-Length: 5\r\n\r\nhello".to_vec());
        let head = read_head(&mut reader).unwrap();
        assert_eq!(head, b"PUT / HTTP/1.1\r\nContent-Length: 5\r\n\r\n");

        let mut rest = Vec::new();
        reader.read_to_end(&mut rest).unwrap();
        assert_eq!(rest, b"hello");
    }

    #[test]
    fn leading_empty_lines_are_skipped() {
        let mut reader = Cursor::new(b"\r\n\r\nGET / HTTP/1.1\r\n\r\n".to_vec());
        assert_eq!(read_head(&mut reader).unwrap(), b"GET / HTTP/1.1\r\n\r\n");
    }

    #[test]
    fn head_cut_by_eof_is_incomplete() {
        let mut reader = Cursor::new(b"GET / HTTP/1.1\r\nHost: x\r\n".to_vec());
        assert_eq!(read_head(&mut reader), Err(INCOMPLETE_HEAD));

        let mut reader = Cursor::new(Vec::new());
        assert_eq!(read_head(&mut reader), Err(INCOMPLETE_HEAD));
    }

    #[test]
    fn oversized_head_is_rejected() {
        let mut raw = b"GET / HTTP/1.1\r\nX-Big: ".to_vec();
        raw.extend(std::iter::repeat(b'a').take(MAX_HEAD_SIZE));
        raw.extend_from_slice(b"\r\n\r\n");
        let mut reader = Cursor::new(raw);
        assert_eq!(read_head(&mut reader), Err(HEAD_TOO_LARGE));
    }

    #[test]
    fn parsed_head_keeps_method_url_and_headers() {
        let head = parse_head(b"PUT /upload HTTP/1.1\r\nHost: x\r\nContent-Length: 5\r\n\r\n").unwrap();
        assert_eq!(head.method, Method::Put);
        assert_eq!(head.url, "/upload");
        assert_eq!(head.headers.len(), 2);
        assert_eq!(head.content_length(), Ok(Some(5)));
    }

    #[test]
    fn unknown_methods_still_parse() {
        let head = parse_head(b"BREW / HTTP/1.1\r\n\r\n").unwrap();
        assert!(matches!(head.method, Method::NonStandard(_)));
    }

    #[test]
    fn garbage_head_is_malformed() {
        assert_eq!(parse_head(b"NOT HTTP\r\n\r\n").err(), Some(MALFORMED_HEAD));
        assert_eq!(parse_head(b"GET / HTTP/1.1\r\nNo colon here\r\n\r\n").err(), Some(MALFORMED_HEAD));
    }

    #[test]
    fn missing_header_means_unknown_length() {
        let headers = vec![header("Host", "x")];
        assert_eq!(content_length(&headers), Ok(None));
    }

    #[test]
    fn header_name_is_case_insensitive() {
        let headers = vec![header("content-length", "5")];
        assert_eq!(content_length(&headers), Ok(Some(5)));
    }

    #[test]
    fn zero_is_a_length() {
        let headers = vec![header("Content-Length", "0")];
        assert_eq!(content_length(&headers), Ok(Some(0)));
    }

    #[test]
    fn garbage_and_negative_lengths_are_malformed() {
        for value in ["abc", "-5", "5x", ""] {
            let headers = vec![header("Content-Length", value)];
            assert_eq!(content_length(&headers), Err(MALFORMED_CONTENT_LENGTH), "value {:?}", value);
        }
    }

    #[test]
    fn known_length_consumes_exactly_that_many_bytes() {
        let mut reader = Cursor::new(b"helloEXTRA".to_vec());
        let body = read_body(&mut reader, Some(5)).unwrap();
        assert_eq!(body, b"hello");
        assert_eq!(reader.position(), 5);
    }

    #[test]
    fn unknown_length_reads_to_exhaustion() {
        let mut reader = Cursor::new(b"all of it\r\n".to_vec());
        let body = read_body(&mut reader, None).unwrap();
        assert_eq!(body, b"all of it\r\n");
        assert_eq!(reader.position(), 11);
    }

    #[test]
    fn short_stream_is_an_error() {
        let mut reader = Cursor::new(b"hel".to_vec());
        let err = read_body(&mut reader, Some(5)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
