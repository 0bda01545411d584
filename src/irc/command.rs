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

use crate::irc::client::frame;
use crate::irc::names::is_channel;

/// What one line read from a conversation FIFO asks the client to do.
/// Plain text becomes a `PRIVMSG` to the enclosing conversation; `/x`-style
/// lines select from the command table below; anything else after a slash
/// goes to the server verbatim.
#[derive(Debug, Default, PartialEq)]
pub struct Dispatch {
    /// Conversation to materialise before anything is sent.
    pub open: Option<String>,
    /// Framed bytes for the server.
    pub wire: Option<Vec<u8>>,
    /// Line to record locally as ourselves: (conversation, body).
    pub echo: Option<(String, String)>,
}

impl Dispatch {
    fn none() -> Dispatch {
        Dispatch::default()
    }

    fn wire(text: String) -> Dispatch {
        Dispatch {
            wire: Some(frame(&text)),
            ..Dispatch::default()
        }
    }
}

fn privmsg(target: &str, body: &str) -> Dispatch {
    Dispatch {
        open: None,
        wire: Some(frame(&format!("PRIVMSG {} :{}", target, body))),
        echo: Some((target.to_owned(), body.to_owned())),
    }
}

/// `/r PRIVMSG target :body` (or the NOTICE equivalent) shows up in the
/// local log as if it had been sent the normal way.
fn raw_echo(raw: &str) -> Option<(String, String)> {
    let rest = raw
        .strip_prefix("PRIVMSG ")
        .or_else(|| raw.strip_prefix("NOTICE "))?;
    let (target, body) = rest.split_once(" :")?;
    Some((target.to_owned(), body.to_owned()))
}

/// Translates one FIFO line into wire traffic and local effects. `conv` is
/// the canonical name of the conversation the line arrived on; the empty
/// name is the server conversation.
pub fn dispatch(conv: &str, line: &str) -> Dispatch {
    if !line.starts_with('/') {
        return privmsg(conv, line);
    }

    // "/x" alone or "/x ..." selects from the table; any other shape after
    // the slash is a raw command for the server.
    let bytes = line.as_bytes();
    if bytes.len() == 1 || (bytes.len() >= 3 && bytes[2] != b' ') {
        return Dispatch::wire(line[1..].to_owned());
    }
    let rest = line.get(3..).unwrap_or("");

    match bytes[1] {
        b'a' => {
            if rest.is_empty() {
                Dispatch::wire("AWAY".to_owned())
            } else {
                Dispatch::wire(format!("AWAY :{}", rest))
            }
        }
        b'i' => {
            if rest.is_empty() {
                Dispatch::none()
            } else {
                Dispatch::wire(format!("INVITE {} {}", rest, conv))
            }
        }
        b'j' => {
            if rest.is_empty() {
                return Dispatch::none();
            }
            let (first, remainder) = match rest.split_once(' ') {
                Some((first, remainder)) => (first, remainder),
                None => (rest, ""),
            };
            if is_channel(first) {
                Dispatch::wire(format!("JOIN {} {}", first, remainder))
            } else {
                // a direct correspondent: open the conversation, then
                // message them
                Dispatch {
                    open: Some(first.to_owned()),
                    wire: Some(frame(&format!("PRIVMSG {} :{}", first, remainder))),
                    echo: None,
                }
            }
        }
        b'k' => {
            if rest.is_empty() {
                Dispatch::none()
            } else {
                Dispatch::wire(format!("KICK {} {}", conv, rest))
            }
        }
        b'l' => {
            if conv.is_empty() {
                Dispatch::none()
            } else if rest.is_empty() {
                Dispatch::wire(format!("PART {}", conv))
            } else {
                Dispatch::wire(format!("PART {} :{}", conv, rest))
            }
        }
        b'm' => {
            if rest.is_empty() {
                Dispatch::none()
            } else {
                Dispatch::wire(format!("MODE {} {}", conv, rest))
            }
        }
        b'n' => {
            if rest.is_empty() {
                Dispatch::none()
            } else {
                Dispatch::wire(format!("NICK {}", rest))
            }
        }
        b'p' => privmsg(conv, rest),
        b'q' => {
            if rest.is_empty() {
                Dispatch::wire("QUIT".to_owned())
            } else {
                Dispatch::wire(format!("QUIT :{}", rest))
            }
        }
        b'r' => {
            if rest.is_empty() {
                Dispatch::none()
            } else {
                Dispatch {
                    open: None,
                    echo: raw_echo(rest),
                    wire: Some(frame(rest)),
                }
            }
        }
        b't' => {
            if rest.is_empty() {
                Dispatch::wire(format!("TOPIC {}", conv))
            } else {
                Dispatch::wire(format!("TOPIC {} :{}", conv, rest))
            }
        }
        b'u' => Dispatch::wire(format!("NAMES {}", conv)),
        _ => Dispatch::wire(line[1..].to_owned()),
    }
}
