//! Telnet wire constants and the inbound command filter.
//!
//! Only the small subset of telnet needed by a line-oriented MUD front-end
//! lives here: the command and option byte tables, helpers to compose
//! outbound negotiation directives, and `TelnetFilter`, which strips
//! inbound IAC sequences out of the data stream and answers them with a
//! best-effort refusal policy. This is not a full option negotiation
//! engine; options we have not advertised are declined and
//! subnegotiation payloads are discarded.

use bytes::BytesMut;

/// Interpret As Command: marks the start of a telnet command sequence.
pub const IAC: u8 = 255;
/// You are not to use option.
pub const DONT: u8 = 254;
/// Please, you use option.
pub const DO: u8 = 253;
/// I won't use option.
pub const WONT: u8 = 252;
/// I will use option.
pub const WILL: u8 = 251;
/// Subnegotiation begin.
pub const SB: u8 = 250;
/// Go ahead.
#[allow(dead_code)]
pub const GA: u8 = 249;
/// No operation.
#[allow(dead_code)]
pub const NOP: u8 = 241;
/// Subnegotiation end.
pub const SE: u8 = 240;

/// Telnet option codes used by MUD clients.
#[allow(dead_code)]
pub mod option {
    /// Binary transmission (RFC 856).
    pub const BINARY: u8 = 0;
    /// Echo (RFC 857): the side that WILLs this echoes typed characters.
    pub const ECHO: u8 = 1;
    /// Suppress go-ahead (RFC 858).
    pub const SUPPRESS_GO_AHEAD: u8 = 3;
    /// Terminal type (RFC 1091).
    pub const TTYPE: u8 = 24;
    /// Negotiate about window size (RFC 1073).
    pub const NAWS: u8 = 31;
}

/// The forced directive: tells the client this server will perform
/// character echoing, so the client should suspend local echo.
pub const WILL_ECHO: [u8; 3] = [IAC, WILL, option::ECHO];

/// Compose `IAC WILL <option>`.
pub fn will(opt: u8) -> [u8; 3] {
    [IAC, WILL, opt]
}

/// Compose `IAC WONT <option>`.
pub fn wont(opt: u8) -> [u8; 3] {
    [IAC, WONT, opt]
}

/// Compose `IAC DONT <option>`.
pub fn dont(opt: u8) -> [u8; 3] {
    [IAC, DONT, opt]
}

/// Parser state between calls to [`TelnetFilter::filter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Plain data bytes.
    Data,
    /// Saw a CR; the next byte decides the line-ending form.
    DataCr,
    /// Saw an IAC; the next byte is a command.
    Iac,
    /// Saw IAC WILL/WONT/DO/DONT; the next byte is the option code.
    Negotiate(u8),
    /// Inside an IAC SB ... IAC SE block.
    Subnegotiation,
    /// Saw an IAC inside a subnegotiation block.
    SubnegotiationIac,
}

/// Per-connection filter that separates telnet commands from data.
///
/// Feed it raw socket bytes; it appends clean data bytes (with line
/// endings normalized to `\n`) to one buffer and any negotiation replies
/// to another. The replies follow the refusal policy described in the
/// module docs: client options are declined with DONT, requests for
/// server options we never advertised are declined with WONT, and
/// requests for options we did advertise are already granted and get no
/// reply (re-sending WILL would duplicate the advertisement).
#[derive(Debug)]
pub struct TelnetFilter {
    state: State,
    /// Options this server has advertised WILL for on this connection.
    advertised: Vec<u8>,
    /// Options we have already conceded with WONT, to avoid reply loops.
    refused: Vec<u8>,
}

impl TelnetFilter {
    /// Create a filter for a connection that advertised the given
    /// server-side options at open.
    pub fn new(advertised: &[u8]) -> Self {
        TelnetFilter {
            state: State::Data,
            advertised: advertised.to_vec(),
            refused: Vec::new(),
        }
    }

    /// Consume `input`, appending data bytes to `data` and negotiation
    /// replies to `replies`.
    pub fn filter(&mut self, input: &[u8], data: &mut BytesMut, replies: &mut BytesMut) {
        for &byte in input {
            match self.state {
                State::Data => match byte {
                    IAC => self.state = State::Iac,
                    b'\r' => self.state = State::DataCr,
                    0 => {} // stray NUL, drop
                    _ => data.extend_from_slice(&[byte]),
                },

                State::DataCr => {
                    // Telnet sends line breaks as CR LF or CR NUL; both
                    // normalize to a single \n. A bare CR followed by
                    // data is treated as a line break too.
                    data.extend_from_slice(b"\n");
                    match byte {
                        b'\n' | 0 => self.state = State::Data,
                        IAC => self.state = State::Iac,
                        b'\r' => {} // stay, another break follows
                        _ => {
                            data.extend_from_slice(&[byte]);
                            self.state = State::Data;
                        }
                    }
                }

                State::Iac => match byte {
                    // Escaped 0xFF data byte
                    IAC => {
                        data.extend_from_slice(&[IAC]);
                        self.state = State::Data;
                    }
                    WILL | WONT | DO | DONT => self.state = State::Negotiate(byte),
                    SB => self.state = State::Subnegotiation,
                    // NOP, GA, and anything else single-byte: ignore
                    _ => self.state = State::Data,
                },

                State::Negotiate(verb) => {
                    self.answer(verb, byte, replies);
                    self.state = State::Data;
                }

                State::Subnegotiation => {
                    if byte == IAC {
                        self.state = State::SubnegotiationIac;
                    }
                }

                State::SubnegotiationIac => match byte {
                    SE => self.state = State::Data,
                    // IAC IAC inside SB is an escaped payload byte
                    _ => self.state = State::Subnegotiation,
                },
            }
        }
    }

    /// Answer one negotiation request per the refusal policy.
    fn answer(&mut self, verb: u8, opt: u8, replies: &mut BytesMut) {
        match verb {
            DO => {
                if self.advertised.contains(&opt) {
                    // Already granted by our WILL at open; stay silent.
                } else if !self.refused.contains(&opt) {
                    self.refused.push(opt);
                    replies.extend_from_slice(&wont(opt));
                }
            }
            DONT => {
                if !self.refused.contains(&opt) {
                    self.refused.push(opt);
                    self.advertised.retain(|&o| o != opt);
                    replies.extend_from_slice(&wont(opt));
                }
            }
            // Client-side options are declined wholesale.
            WILL => replies.extend_from_slice(&dont(opt)),
            WONT => {}
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(filter: &mut TelnetFilter, input: &[u8]) -> (Vec<u8>, Vec<u8>) {
        let mut data = BytesMut::new();
        let mut replies = BytesMut::new();
        filter.filter(input, &mut data, &mut replies);
        (data.to_vec(), replies.to_vec())
    }

    #[test]
    fn test_will_echo_bytes() {
        assert_eq!(WILL_ECHO, [255, 251, 1]);
        assert_eq!(will(option::ECHO), WILL_ECHO);
    }

    #[test]
    fn test_plain_data_passes_through() {
        let mut f = TelnetFilter::new(&[]);
        let (data, replies) = run(&mut f, b"look\r\n");
        assert_eq!(data, b"look\n");
        assert!(replies.is_empty());
    }

    #[test]
    fn test_cr_nul_line_ending() {
        let mut f = TelnetFilter::new(&[]);
        let (data, _) = run(&mut f, b"north\r\0south\r\n");
        assert_eq!(data, b"north\nsouth\n");
    }

    #[test]
    fn test_iac_iac_unescapes() {
        let mut f = TelnetFilter::new(&[]);
        let (data, _) = run(&mut f, &[b'a', IAC, IAC, b'b']);
        assert_eq!(data, &[b'a', IAC, b'b']);
    }

    #[test]
    fn test_do_unadvertised_option_refused_once() {
        let mut f = TelnetFilter::new(&[]);
        let (data, replies) = run(&mut f, &[IAC, DO, option::ECHO, IAC, DO, option::ECHO]);
        assert!(data.is_empty());
        // Second DO gets no second WONT
        assert_eq!(replies, wont(option::ECHO));
    }

    #[test]
    fn test_do_advertised_option_is_silent() {
        let mut f = TelnetFilter::new(&[option::ECHO]);
        let (_, replies) = run(&mut f, &[IAC, DO, option::ECHO]);
        assert!(replies.is_empty());
    }

    #[test]
    fn test_client_will_is_declined() {
        let mut f = TelnetFilter::new(&[]);
        let (_, replies) = run(&mut f, &[IAC, WILL, option::NAWS]);
        assert_eq!(replies, dont(option::NAWS));
    }

    #[test]
    fn test_dont_concedes_advertised_option() {
        let mut f = TelnetFilter::new(&[option::SUPPRESS_GO_AHEAD]);
        let (_, replies) = run(&mut f, &[IAC, DONT, option::SUPPRESS_GO_AHEAD]);
        assert_eq!(replies, wont(option::SUPPRESS_GO_AHEAD));

        // Option is conceded; a later DO does not restart the exchange
        let (_, replies) = run(&mut f, &[IAC, DO, option::SUPPRESS_GO_AHEAD]);
        assert!(replies.is_empty());
    }

    #[test]
    fn test_subnegotiation_is_discarded() {
        let mut f = TelnetFilter::new(&[]);
        let mut input = vec![b'x'];
        input.extend_from_slice(&[IAC, SB, option::TTYPE, 0, b'v', b't', IAC, SE]);
        input.push(b'y');
        let (data, replies) = run(&mut f, &input);
        assert_eq!(data, b"xy");
        assert!(replies.is_empty());
    }

    #[test]
    fn test_command_split_across_reads() {
        let mut f = TelnetFilter::new(&[]);
        let (data, replies) = run(&mut f, &[b'h', b'i', IAC]);
        assert_eq!(data, b"hi");
        assert!(replies.is_empty());

        let (data, replies) = run(&mut f, &[DO, option::TTYPE]);
        assert!(data.is_empty());
        assert_eq!(replies, wont(option::TTYPE));
    }

    #[test]
    fn test_nop_and_ga_ignored() {
        let mut f = TelnetFilter::new(&[]);
        let (data, replies) = run(&mut f, &[b'a', IAC, NOP, b'b', IAC, GA, b'c']);
        assert_eq!(data, b"abc");
        assert!(replies.is_empty());
    }
}
