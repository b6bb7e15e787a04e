//! Network time taken from the `Date` header of a plain HTTP `HEAD` request.

use std::{
    io::{self, Read, Write},
    net::{TcpStream, ToSocketAddrs},
    time::Duration,
};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::TimeError;

pub const TIME_HOST: &str = "www.google.com";
pub const TIME_PORT: u16 = 80;
pub const TIMEOUT: Duration = Duration::from_secs(5);

const RESPONSE_MAX: usize = 4096;

/// Source of the current UTC time.
pub trait TimeSource {
    fn fetch(&self) -> Result<DateTime<Utc>, TimeError>;
}

#[derive(Debug, Clone)]
pub struct NetworkTime {
    pub host: String,
    pub port: u16,
    /// Bounds connect, send and receive separately.
    pub timeout: Duration,
}

impl Default for NetworkTime {
    fn default() -> Self {
        Self {
            host: TIME_HOST.to_string(),
            port: TIME_PORT,
            timeout: TIMEOUT,
        }
    }
}

impl TimeSource for NetworkTime {
    fn fetch(&self) -> Result<DateTime<Utc>, TimeError> {
        let resolve_err = |source| TimeError::Resolve {
            host: self.host.clone(),
            source,
        };
        let addr = (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(resolve_err)?
            .next()
            .ok_or_else(|| resolve_err(io::Error::new(io::ErrorKind::NotFound, "no address")))?;

        let mut stream = TcpStream::connect_timeout(&addr, self.timeout)?;
        stream.set_read_timeout(Some(self.timeout))?;
        stream.set_write_timeout(Some(self.timeout))?;

        let request = format!(
            "HEAD / HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
            self.host
        );
        stream.write_all(request.as_bytes())?;

        let response = read_headers(&mut stream)?;
        debug!("received {} bytes from {addr}", response.len());

        parse_date_header(&String::from_utf8_lossy(&response))
    }
}

/// Reads until the blank line ending the headers, end of stream, or
/// [`RESPONSE_MAX`] bytes. A server that holds the connection open past the
/// headers runs into the read timeout; whatever arrived by then is kept.
fn read_headers(mut reader: impl Read) -> io::Result<Vec<u8>> {
    let mut response = Vec::with_capacity(RESPONSE_MAX);
    let mut chunk = [0u8; 512];

    while response.len() < RESPONSE_MAX && !has_header_end(&response) {
        let want = chunk.len().min(RESPONSE_MAX - response.len());
        match reader.read(&mut chunk[..want]) {
            Ok(0) => break,
            Ok(n) => response.extend_from_slice(&chunk[..n]),
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err)
                if !response.is_empty()
                    && matches!(err.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) =>
            {
                debug!("read timed out after {} bytes, keeping them", response.len());
                break;
            }
            Err(err) => return Err(err),
        }
    }

    Ok(response)
}

fn has_header_end(response: &[u8]) -> bool {
    response.windows(4).any(|w| w == b"\r\n\r\n")
}

/// Finds the `Date` header among the response headers and parses it as
/// RFC 2822 (`Tue, 15 Nov 1994 08:12:31 GMT`).
pub fn parse_date_header(response: &str) -> Result<DateTime<Utc>, TimeError> {
    let value = response
        .lines()
        .skip(1)
        .take_while(|line| !line.is_empty())
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.trim().eq_ignore_ascii_case("date").then(|| value.trim())
        })
        .ok_or(TimeError::MissingDate)?;

    DateTime::parse_from_rfc2822(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| TimeError::BadDate(value.to_string()))
}
