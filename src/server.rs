use std::io::{self, BufReader, Read};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::time::Duration;

use tiny_http::Method;

use crate::config::ServerConfig;
use crate::context::Context;
use crate::handlers::{respond, RequestHandler, HTTP_400, HTTP_500, HTTP_501};
use crate::logger::get_reporter;
use crate::request::{parse_head, read_body, read_head, RequestHead, HEAD_READ_ERROR, INCOMPLETE_HEAD};
use crate::response::ResponseWriter;
use crate::utils::{Result, ResultV};


const MODULE: &str = "SERVER";

const LINGER_TIMEOUT: Duration = Duration::from_secs(2);
const LINGER_LIMIT: u64 = 64 * 1024;

pub const BIND_ERROR: &str = "bind error";
pub const ACCEPT_ERROR: &str = "accept error";
pub const READ_ERROR: &str = "body read error";


/// Sequential HTTP server: one connection, one exchange, then close; the next connection is
/// accepted only after that.
pub struct HttpServer<H: RequestHandler> {
    listener: TcpListener,
    handler: H,
}

impl<H: RequestHandler> HttpServer<H> {
    pub fn bind(cfg: &ServerConfig, handler: H) -> Result<HttpServer<H>> {
        let addr = cfg.address();
        let listener = TcpListener::bind(&addr).map_err(|e| {
            error!("[{}] Could not start server at {}: {}", MODULE, addr, e);
            BIND_ERROR
        })?;
        Ok(HttpServer { listener, handler })
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.local_addr().ok()
    }

    /// Blocks until one connection arrives and serves it.
    pub fn handle_request(&self) -> ResultV {
        let (stream, peer) = self.listener.accept().map_err(get_reporter(MODULE, "Accept", ACCEPT_ERROR))?;
        self.handle_connection(stream, Some(peer))
    }

    pub fn serve_forever(&self) -> ! {
        loop {
            // failures are logged where they happen
            self.handle_request().ok();
        }
    }

    fn handle_connection(&self, stream: TcpStream, peer: Option<SocketAddr>) -> ResultV {
        let mut ctx = Context::new(peer);
        let result = self.exchange(&stream, &mut ctx);
        close(&stream);
        result
    }

    fn exchange(&self, stream: &TcpStream, ctx: &mut Context) -> ResultV {
        let mut reader = BufReader::new(stream);
        let mut writer = stream;

        let head = match read_head(&mut reader).and_then(|raw| parse_head(&raw)) {
            Ok(head) => head,
            Err(e @ (INCOMPLETE_HEAD | HEAD_READ_ERROR)) => {
                warn!("[{}] Dropping connection [{}]: {}", MODULE, ctx.qid, e);
                return Err(e);
            }
            Err(e) => {
                respond(&mut writer, ctx, HTTP_400, Some(e))?;
                return Err(e);
            }
        };
        ctx.record_request(&head);

        if !self.handler.methods().contains(&head.method) {
            return respond(&mut writer, ctx, HTTP_501, None);
        }

        let body = match head.method {
            Method::Get => None,
            Method::Put => match Self::read_request_body(&mut reader, &head) {
                Ok(body) => Some(body),
                Err(e) => {
                    respond(&mut writer, ctx, HTTP_500, Some(e))?;
                    return Err(e);
                }
            },
            _ => return respond(&mut writer, ctx, HTTP_501, None),
        };

        let mut out = ResponseWriter::new(&mut writer);
        let result = match &body {
            Some(body) => self.handler.do_put(body, &mut out),
            None => self.handler.do_get(&mut out),
        }.and_then(|_| out.finish());

        ctx.record_response(&out, &result);
        result
    }

    fn read_request_body(reader: &mut BufReader<&TcpStream>, head: &RequestHead) -> Result<Vec<u8>> {
        let length = head.content_length()?;
        read_body(reader, length).map_err(get_reporter(MODULE, "Read", READ_ERROR))
    }
}

/// Sends FIN, then drains what the client still has in flight; unread input at close time
/// turns the FIN into a reset.
fn close(stream: &TcpStream) {
    if let Err(e) = stream.shutdown(Shutdown::Write) {
        debug!("[{}] Shutdown error: {}", MODULE, e);
        return;
    }
    if stream.set_read_timeout(Some(LINGER_TIMEOUT)).is_ok() {
        let mut rest = Read::take(stream, LINGER_LIMIT);
        io::copy(&mut rest, &mut io::sink()).ok();
    }
}
