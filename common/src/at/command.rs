use core::fmt::Write;

use heapless::String;

use crate::config::NodeConfig;
use crate::payload::{PAYLOAD_SIZE, Payload};

pub const AT_COMMAND_SIZE: usize = 100;
/// Room for the `AT*WHTTP=2,DATA,` prefix, the payload and the line terminator.
pub const DATA_COMMAND_SIZE: usize = PAYLOAD_SIZE + 20;

/// Commands sent to the modem, one per step of the upload sequence.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AtCommand {
    /// Turns off the UART echo of the modem.
    EchoOff,
    /// Asks whether the SIM card is ready.
    SimReady,
    NetworkRegistration,
    IpAddress,
    /// Opens an HTTP POST to the configured endpoint.
    HttpOpen,
    HttpHeader,
    /// Commits the prepared request.
    HttpSend,
}

impl AtCommand {
    /// Formats the command line, including the terminating CRLF.
    pub fn line(&self, config: &NodeConfig) -> crate::Result<String<AT_COMMAND_SIZE>> {
        let mut line = String::new();
        match self {
            AtCommand::EchoOff => write!(line, "ATE0\r\n")?,
            AtCommand::SimReady => write!(line, "AT*CPIN?\r\n")?,
            AtCommand::NetworkRegistration => write!(line, "AT+CEREG?\r\n")?,
            AtCommand::IpAddress => write!(line, "AT*WWANIP?\r\n")?,
            AtCommand::HttpOpen => write!(line, "AT*WHTTP=0,POST,{}\r\n", config.http_endpoint)?,
            AtCommand::HttpHeader => {
                write!(line, "AT*WHTTP=2,HEAD,Content-Type: {}\r\n", config.content_type)?
            }
            AtCommand::HttpSend => write!(line, "AT*WHTTP=3\r\n")?,
        }
        Ok(line)
    }
}

/// Formats the command carrying the request body.
pub fn http_data(payload: &Payload) -> crate::Result<String<DATA_COMMAND_SIZE>> {
    let mut line = String::new();
    write!(line, "AT*WHTTP=2,DATA,{}\r\n", payload.as_str())?;
    Ok(line)
}
