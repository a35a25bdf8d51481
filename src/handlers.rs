use std::io::Write;
use std::str::FromStr;

use tiny_http::{Method, StatusCode};

use crate::config::HandlerConfig;
use crate::context::Context;
use crate::request::CONTENT_LENGTH;
use crate::response::ResponseWriter;
use crate::utils::{Result, ResultV};


const MODULE: &str = "HANDLERS";

pub const HTTP_200: u16 = 200;
pub const HTTP_400: u16 = 400;
pub const HTTP_500: u16 = 500;
pub const HTTP_501: u16 = 501;

const REASON_OK: &str = "OK";
const TEST_HEADER: &str = "X-Test";
const TEST_HEADER_VALUE: &str = "Testing";

const FULL_PAYLOAD: &[u8] = b"Hello World\r\n";
const SIMPLE_PAYLOAD: &[u8] = b"Data\r\n";

pub const UNKNOWN_POLICY_ERROR: &str = "unknown response policy";


/// Per-method callbacks for one exchange.
///
/// Methods missing from [`RequestHandler::methods`] never reach the handler;
/// the server answers them with 501.
pub trait RequestHandler: Send + Sync {
    /// HTTP methods this handler has a callback for
    fn methods(&self) -> &[Method];

    fn do_get(&self, out: &mut ResponseWriter) -> ResultV;

    /// Called after the whole request body has been consumed
    fn do_put(&self, _body: &[u8], out: &mut ResponseWriter) -> ResultV {
        self.do_get(out)
    }
}

/// Shape of the fixed response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponsePolicy {
    /// `X-Test` and `Content-Length` headers, `Hello World\r\n` body
    #[default]
    Full,
    /// `X-Test` header, `Data\r\n` body, no length
    Simple,
    /// Status line only
    Minimal,
}

impl FromStr for ResponsePolicy {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "full" => Ok(ResponsePolicy::Full),
            "simple" => Ok(ResponsePolicy::Simple),
            "minimal" => Ok(ResponsePolicy::Minimal),
            _ => {
                error!("[{}] Unknown response policy: {}", MODULE, s);
                Err(UNKNOWN_POLICY_ERROR)
            }
        }
    }
}

pub struct StaticHandler {
    policy: ResponsePolicy,
    methods: Vec<Method>,
}

impl StaticHandler {
    pub fn new(policy: ResponsePolicy, accept_put: bool) -> StaticHandler {
        let mut methods = vec![Method::Get];
        if accept_put {
            methods.push(Method::Put);
        }
        StaticHandler { policy, methods }
    }

    pub fn from_config(cfg: &HandlerConfig) -> Result<StaticHandler> {
        Ok(Self::new(cfg.policy.parse()?, cfg.accept_put))
    }

    pub fn policy(&self) -> ResponsePolicy {
        self.policy
    }
}

impl RequestHandler for StaticHandler {
    fn methods(&self) -> &[Method] {
        &self.methods
    }

    fn do_get(&self, out: &mut ResponseWriter) -> ResultV {
        out.send_response(HTTP_200, REASON_OK)?;
        match self.policy {
            ResponsePolicy::Full => {
                out.send_header(TEST_HEADER, TEST_HEADER_VALUE)?;
                out.send_header(CONTENT_LENGTH, FULL_PAYLOAD.len())?;
                out.end_headers()?;
                out.write_body(FULL_PAYLOAD)
            }
            ResponsePolicy::Simple => {
                out.send_header(TEST_HEADER, TEST_HEADER_VALUE)?;
                out.end_headers()?;
                out.write_body(SIMPLE_PAYLOAD)
            }
            ResponsePolicy::Minimal => out.end_headers(),
        }
    }

    fn do_put(&self, body: &[u8], out: &mut ResponseWriter) -> ResultV {
        info!("[{}] Received {} bytes: {}", MODULE, body.len(), String::from_utf8_lossy(body));
        self.do_get(out)
    }
}


/// Plain-text status response for exchanges that never reach a handler callback.
pub fn respond(stream: &mut dyn Write, ctx: &mut Context, code: u16, msg_opt: Option<&str>) -> ResultV {
    let reason = StatusCode(code).default_reason_phrase();
    let mut message = format!("{}: {}", code, reason);
    if let Some(msg) = msg_opt {
        message = format!("{}\n\n{}", message, msg);
    }

    let mut out = ResponseWriter::new(stream);
    let result = write_status_page(&mut out, code, reason, &message);
    ctx.record_response(&out, &result);

    result
}

fn write_status_page(out: &mut ResponseWriter, code: u16, reason: &str, message: &str) -> ResultV {
    out.send_response(code, reason)?;
    out.send_header(CONTENT_LENGTH, message.len())?;
    out.end_headers()?;
    out.write_body(message.as_bytes())?;
    out.finish()
}


#[cfg(test)]
mod tests {
    use super::*;

    fn render(handler: &StaticHandler, put_body: Option<&[u8]>) -> Vec<u8> {
        let mut buf: Vec<u8> = Vec::new();
        let mut w = ResponseWriter::new(&mut buf);
        match put_body {
            Some(body) => handler.do_put(body, &mut w).unwrap(),
            None => handler.do_get(&mut w).unwrap(),
        }
        w.finish().unwrap();
        buf
    }

    #[test]
    fn full_policy_response() {
        let handler = StaticHandler::new(ResponsePolicy::Full, true);
        assert_eq!(
            render(&handler, None),
            b"HTTP/1.1 200 OK\r\nX-Test: Testing\r\nContent-Length: 13\r\n\r\nHello World\r\n".to_vec()
        );
    }

    #[test]
    fn simple_policy_has_no_length() {
        let handler = StaticHandler::new(ResponsePolicy::Simple, true);
        assert_eq!(render(&handler, None), b"HTTP/1.1 200 OK\r\nX-Test: Testing\r\n\r\nData\r\n".to_vec());
    }

    #[test]
    fn minimal_policy_is_status_line_only() {
        let handler = StaticHandler::new(ResponsePolicy::Minimal, true);
        assert_eq!(render(&handler, None), b"HTTP/1.1 200 OK\r\n\r\n".to_vec());
    }

    #[test]
    fn get_is_idempotent() {
        let handler = StaticHandler::new(ResponsePolicy::Full, true);
        assert_eq!(render(&handler, None), render(&handler, None));
    }

    #[test]
    fn put_answers_like_get() {
        for policy in [ResponsePolicy::Full, ResponsePolicy::Simple, ResponsePolicy::Minimal] {
            let handler = StaticHandler::new(policy, true);
            assert_eq!(render(&handler, Some(&b"hello"[..])), render(&handler, None), "{:?}", policy);
        }
    }

    #[test]
    fn put_callback_follows_config() {
        assert_eq!(StaticHandler::new(ResponsePolicy::Full, true).methods(), &[Method::Get, Method::Put]);
        assert_eq!(StaticHandler::new(ResponsePolicy::Full, false).methods(), &[Method::Get]);
    }

    #[test]
    fn policy_names() {
        assert_eq!("full".parse::<ResponsePolicy>(), Ok(ResponsePolicy::Full));
        assert_eq!("Simple".parse::<ResponsePolicy>(), Ok(ResponsePolicy::Simple));
        assert_eq!("MINIMAL".parse::<ResponsePolicy>(), Ok(ResponsePolicy::Minimal));
        assert_eq!("verbose".parse::<ResponsePolicy>(), Err(UNKNOWN_POLICY_ERROR));
        assert_eq!(ResponsePolicy::default(), ResponsePolicy::Full);
    }

    #[test]
    fn status_page_carries_reason_and_length() {
        let mut buf: Vec<u8> = Vec::new();
        let mut ctx = Context::new(None);
        respond(&mut buf, &mut ctx, HTTP_501, None).unwrap();
        assert_eq!(buf, b"HTTP/1.1 501 Not Implemented\r\nContent-Length: 20\r\n\r\n501: Not Implemented".to_vec());
        assert!(ctx.finish_time_us > 0);
    }

    #[test]
    fn status_page_appends_message() {
        let mut buf: Vec<u8> = Vec::new();
        let mut ctx = Context::new(None);
        respond(&mut buf, &mut ctx, HTTP_500, Some("malformed content length")).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("HTTP/1.1 500 Internal Server Error\r\n"), "{}", text);
        assert!(text.ends_with("\r\n\r\n500: Internal Server Error\n\nmalformed content length"), "{}", text);
    }

    #[test]
    fn handler_from_config() {
        let cfg = HandlerConfig { policy: "simple".to_string(), accept_put: false };
        let handler = StaticHandler::from_config(&cfg).unwrap();
        assert_eq!(handler.policy(), ResponsePolicy::Simple);
        assert_eq!(handler.methods(), &[Method::Get]);

        let cfg = HandlerConfig { policy: "other".to_string(), accept_put: true };
        assert_eq!(StaticHandler::from_config(&cfg).err(), Some(UNKNOWN_POLICY_ERROR));
    }
}
