use std::fmt::Display;
use std::io::{self, Write};

use crate::logger::get_reporter;
use crate::request::CONTENT_LENGTH;
use crate::utils::ResultV;


const MODULE: &str = "RESPONSE";

const HTTP_VERSION: &str = "HTTP/1.1";
const CRLF: &[u8] = b"\r\n";

pub const STATUS_ALREADY_SENT: &str = "status already sent";
pub const STATUS_NOT_SENT: &str = "status not sent";
pub const HEADERS_ALREADY_ENDED: &str = "headers already ended";
pub const HEADERS_NOT_ENDED: &str = "headers not ended";
pub const INVALID_CONTENT_LENGTH: &str = "invalid content length";
pub const LENGTH_MISMATCH: &str = "body length mismatch";
pub const IO_ERROR: &str = "io error";


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Status,
    Headers,
    Body,
}

/// Writes one response onto a raw stream: status line, headers, blank line, body, in that order.
pub struct ResponseWriter<'a> {
    out: &'a mut dyn Write,
    phase: Phase,
    status: Option<u16>,
    declared_length: Option<usize>,
    body_sent: usize,
    bytes_sent: usize,
}

impl<'a> ResponseWriter<'a> {
    pub fn new(out: &'a mut dyn Write) -> ResponseWriter<'a> {
        ResponseWriter {
            out,
            phase: Phase::Status,
            status: None,
            declared_length: None,
            body_sent: 0,
            bytes_sent: 0,
        }
    }

    pub fn send_response(&mut self, code: u16, reason: &str) -> ResultV {
        if self.phase != Phase::Status {
            return Err(STATUS_ALREADY_SENT);
        }
        self.emit(format!("{} {} {}\r\n", HTTP_VERSION, code, reason).as_bytes())?;
        self.status = Some(code);
        self.phase = Phase::Headers;
        Ok(())
    }

    pub fn send_header(&mut self, name: &str, value: impl Display) -> ResultV {
        match self.phase {
            Phase::Status => return Err(STATUS_NOT_SENT),
            Phase::Body => return Err(HEADERS_ALREADY_ENDED),
            Phase::Headers => {}
        }
        let value = value.to_string();
        if name.eq_ignore_ascii_case(CONTENT_LENGTH) {
            let length = value.trim().parse::<usize>().map_err(|_| INVALID_CONTENT_LENGTH)?;
            self.declared_length = Some(length);
        }
        self.emit(format!("{}: {}\r\n", name, value).as_bytes())
    }

    pub fn end_headers(&mut self) -> ResultV {
        match self.phase {
            Phase::Status => return Err(STATUS_NOT_SENT),
            Phase::Body => return Err(HEADERS_ALREADY_ENDED),
            Phase::Headers => {}
        }
        self.emit(CRLF)?;
        self.phase = Phase::Body;
        Ok(())
    }

    pub fn write_body(&mut self, data: &[u8]) -> ResultV {
        if self.phase != Phase::Body {
            return Err(HEADERS_NOT_ENDED);
        }
        if let Some(declared) = self.declared_length {
            if self.body_sent + data.len() > declared {
                return Err(LENGTH_MISMATCH);
            }
        }
        self.emit(data)?;
        self.body_sent += data.len();
        Ok(())
    }

    /// Checks that the response is complete and flushes it.
    pub fn finish(&mut self) -> ResultV {
        match self.phase {
            Phase::Status => return Err(STATUS_NOT_SENT),
            Phase::Headers => return Err(HEADERS_NOT_ENDED),
            Phase::Body => {}
        }
        if self.declared_length.is_some_and(|declared| declared != self.body_sent) {
            return Err(LENGTH_MISMATCH);
        }
        self.out.flush().map_err(Self::report)
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn bytes_sent(&self) -> usize {
        self.bytes_sent
    }

    fn emit(&mut self, data: &[u8]) -> ResultV {
        self.out.write_all(data).map_err(Self::report)?;
        self.bytes_sent += data.len();
        Ok(())
    }

    fn report(e: io::Error) -> &'static str {
        get_reporter(MODULE, "Write", IO_ERROR)(e)
    }
}
