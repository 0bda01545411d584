// Copyright (C) 2026  ircfs developers

// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.

// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN
// THE SOFTWARE.

use std::cmp;
use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::time::{Duration, Instant};

use mio::Registry;

use crate::irc::conversation::ConversationSet;
use crate::irc::names::is_channel;
use crate::irc::output::{write_out, SERVER_NICK};
use crate::irc::parse::Message;

/// Longest wire message, CRLF included.
pub const MESG_MAX: usize = 512;

const BUF_SIZ: usize = 8 * 1024;

/// Terminates a wire message with CRLF. A message that would overflow the
/// protocol limit is cut at the boundary and reframed, so the stream never
/// desynchronises even when the payload is lost.
pub fn frame(text: &str) -> Vec<u8> {
    let mut mesg = Vec::with_capacity(text.len() + 2);
    mesg.extend_from_slice(text.as_bytes());
    mesg.extend_from_slice(b"\r\n");
    if mesg.len() > MESG_MAX {
        mesg.truncate(MESG_MAX);
        mesg[MESG_MAX - 2] = b'\r';
        mesg[MESG_MAX - 1] = b'\n';
    }
    mesg
}

#[derive(Debug, PartialEq)]
enum Flow {
    Continue,
    Quit,
}

#[derive(Debug, PartialEq)]
pub enum ClientReadStat {
    Blocked,
    Okay,
    HasWritableData,
    Eof,
    /// Our own QUIT came back; the session is over.
    Quit,
}

#[derive(Debug, PartialEq)]
pub enum ClientWriteStat {
    Blocked,
    Okay,
    Drained,
}

/// Protocol state for the one server connection: the registered nickname,
/// the receive buffer with its partial-line carry, and the buffered writer
/// drained on writable readiness.
pub struct Client {
    nick: String,
    read_buffer: [u8; BUF_SIZ],
    read_head: usize,
    write_buffer: VecDeque<u8>,
    last_rx: Instant,
}

impl Client {
    pub fn new(nick: &str) -> Client {
        Client {
            nick: nick.to_owned(),
            read_buffer: [0u8; BUF_SIZ],
            read_head: 0,
            write_buffer: VecDeque::with_capacity(BUF_SIZ),
            last_rx: Instant::now(),
        }
    }

    pub fn nick(&self) -> &str {
        &self.nick
    }

    /// Time since the last byte arrived from the server.
    pub fn idle(&self) -> Duration {
        self.last_rx.elapsed()
    }

    pub fn queue(&mut self, mesg: &[u8]) {
        self.write_buffer.extend(mesg);
    }

    pub fn has_pending(&self) -> bool {
        !self.write_buffer.is_empty()
    }

    /// The `PASS`/`NICK`/`USER` greeting, as one byte string so it can go
    /// out in a single write.
    pub fn registration(pass: Option<&str>, nick: &str, realname: &str) -> Vec<u8> {
        let mut mesg = Vec::new();
        if let Some(pass) = pass {
            mesg.extend_from_slice(&frame(&format!("PASS {}", pass)));
        }
        mesg.extend_from_slice(&frame(&format!("NICK {}", nick)));
        mesg.extend_from_slice(&frame(&format!("USER {} 0 * :{}", nick, realname)));
        mesg
    }

    /// Reads whatever the socket has, handles every complete line and
    /// carries the partial tail over to the next call.
    pub fn receive_data<T: Read>(
        &mut self,
        readable: &mut T,
        convs: &mut ConversationSet,
        registry: &Registry,
    ) -> io::Result<ClientReadStat> {
        if self.read_head == self.read_buffer.len() {
            // a whole buffer without a newline is not IRC
            log::warn!("discarding {} unterminated bytes from the server", self.read_head);
            self.read_head = 0;
        }

        let len = match readable.read(&mut self.read_buffer[self.read_head..]) {
            Ok(0) => return Ok(ClientReadStat::Eof),
            Ok(size) => size + self.read_head,
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                return Ok(ClientReadStat::Blocked)
            }
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {
                return Ok(ClientReadStat::Okay)
            }
            Err(err) => return Err(err),
        };
        self.last_rx = Instant::now();
        let pending_before = self.write_buffer.len();

        // collect the complete-line ranges first; the handler needs the
        // whole client mutable
        let mut lines: Vec<(usize, usize)> = Vec::new();
        let mut start = 0usize;
        while start < len {
            match self.read_buffer[start..len].iter().position(|&b| b == b'\n') {
                Some(eol) => {
                    let mut end = start + eol;
                    if end > start && self.read_buffer[end - 1] == b'\r' {
                        end -= 1;
                    }
                    lines.push((start, end));
                    start += eol + 1;
                }
                None => break,
            }
        }
        let partial = start;

        for (s, e) in lines {
            if s == e {
                continue;
            }
            let line = String::from_utf8_lossy(&self.read_buffer[s..e]).into_owned();
            log::debug!("server: {}", line);
            if self.handle_line(&line, convs, registry) == Flow::Quit {
                return Ok(ClientReadStat::Quit);
            }
        }

        // move the partial line to the front for the next read
        if partial < len {
            self.read_buffer.copy_within(partial..len, 0);
            self.read_head = len - partial;
        } else {
            self.read_head = 0;
        }

        if self.write_buffer.len() > pending_before {
            Ok(ClientReadStat::HasWritableData)
        } else {
            Ok(ClientReadStat::Okay)
        }
    }

    /// One server line through the routing table: update state, answer on
    /// the wire where the protocol demands it, and decide which `out` file
    /// gets the human-readable rendering.
    fn handle_line(&mut self, raw: &str, convs: &mut ConversationSet, registry: &Registry) -> Flow {
        let msg = Message::parse(raw);
        let from = msg.nick.unwrap_or("");
        let command = msg.command.unwrap_or("");
        let params = msg.params.unwrap_or("");
        let middle = msg.middle.unwrap_or("");
        let trailing = msg.trailing.unwrap_or("");

        let mut body: Option<String> = None;
        // chat messages appear under the sender, system events under -!-
        let mut sender: Option<&str> = None;
        // verb-specific destination, overriding the generic routing below
        let mut route: Option<String> = None;
        let mut flow = Flow::Continue;

        match command {
            "" | "PONG" => {}
            "PING" => {
                let token = if msg.trailing.is_some() { trailing } else { params };
                self.queue(&frame(&format!("PONG {}", token)));
            }
            "001" => {
                // whatever nickname the server registered is the one we have
                if !params.is_empty() && params != self.nick {
                    log::info!("server registered us as '{}'", params);
                    self.nick = params.to_owned();
                }
            }
            "353" => {
                body = Some(format!("= {}", trailing));
                // the channel sits at the end of the middle parameters
                route = msg
                    .middle
                    .and_then(|m| m.split_once(' '))
                    .map(|(_, chan)| chan.to_owned());
            }
            "ERROR" => {
                body = Some(format!("error: {}", trailing));
                route = Some(String::new());
            }
            "TOPIC" => {
                body = Some(format!("{} changed topic to: {}", from, trailing));
            }
            "MODE" => {
                let modes = if msg.trailing.is_some() { trailing } else { middle };
                body = Some(format!("{} changed mode to: {}", from, modes));
            }
            "KICK" => {
                body = Some(format!(
                    "{} has kicked {} from {} ({})",
                    from, middle, params, trailing
                ));
                if middle == self.nick {
                    convs.remove(registry, params);
                }
            }
            "PART" => {
                body = Some(format!("{} has parted {} ({})", from, params, trailing));
                if from == self.nick {
                    convs.remove(registry, params);
                }
            }
            "JOIN" => {
                // some servers put the channel in the trailing
                let chan = if params.is_empty() { trailing } else { params };
                body = Some(format!("{} has joined {}", from, chan));
                route = Some(chan.to_owned());
                if let Err(err) = convs.add(registry, chan) {
                    log::error!("cannot open conversation '{}': {}", chan, err);
                }
            }
            "QUIT" => {
                body = Some(format!("{} has quit ({})", from, trailing));
                if from == self.nick {
                    flow = Flow::Quit;
                }
            }
            "NICK" => {
                body = Some(format!("{} changed nick to: {}", from, trailing));
                if from == self.nick {
                    self.nick = trailing.to_owned();
                }
            }
            "PRIVMSG" | "NOTICE" => {
                body = Some(trailing.to_owned());
                sender = Some(from);
                if params == self.nick {
                    // a direct message: the sender becomes a conversation
                    if let Err(err) = convs.add(registry, from) {
                        log::error!("cannot open conversation '{}': {}", from, err);
                    }
                    route = Some(from.to_owned());
                }
            }
            _ => {
                if msg.trailing.is_some() {
                    body = Some(if middle.is_empty() {
                        trailing.to_owned()
                    } else {
                        format!("{} {}", middle, trailing)
                    });
                }
            }
        }

        if let Some(body) = body {
            if !body.is_empty() {
                let nickname = sender.unwrap_or(SERVER_NICK);
                match route {
                    Some(dest) => write_out(convs, registry, &dest, nickname, &body),
                    None if msg.host.is_none() || params.is_empty() => {
                        write_out(convs, registry, "", SERVER_NICK, &body)
                    }
                    None if is_channel(params) => {
                        write_out(convs, registry, params, nickname, &body)
                    }
                    None => write_out(convs, registry, from, nickname, &body),
                }
            }
        }
        flow
    }

    /// Drains as much of the write buffer as the socket accepts; unwritten
    /// bytes go back to the front untouched.
    pub fn write_data<T: Write>(&mut self, writable: &mut T) -> io::Result<ClientWriteStat> {
        if self.write_buffer.is_empty() {
            return Ok(ClientWriteStat::Drained);
        }

        let wlen = cmp::min(BUF_SIZ, self.write_buffer.len());
        let wbuf = self.write_buffer.drain(..wlen).collect::<Vec<u8>>();

        match writable.write(&wbuf) {
            Ok(size) if size != wlen => {
                for &byte in wbuf[size..].iter().rev() {
                    self.write_buffer.push_front(byte);
                }
                Ok(ClientWriteStat::Okay)
            }
            Ok(_) => Ok(ClientWriteStat::Okay),
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                for &byte in wbuf.iter().rev() {
                    self.write_buffer.push_front(byte);
                }
                Ok(ClientWriteStat::Blocked)
            }
            Err(err) => Err(err),
        }
    }
}
