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

/// One server line decomposed into views over the original, CRLF-stripped
/// input. Tags are not supported; this client never requests any
/// capability that would produce them.
///
/// `params` is the first middle parameter on its own, `middle` is every
/// remaining middle parameter in one space-joined piece and `trailing` is
/// the final parameter introduced by ` :`. The routing layer leans on
/// exactly this split.
#[derive(Debug, Default, PartialEq)]
pub struct Message<'a> {
    pub nick: Option<&'a str>,
    pub user: Option<&'a str>,
    pub host: Option<&'a str>,
    pub command: Option<&'a str>,
    pub params: Option<&'a str>,
    pub middle: Option<&'a str>,
    pub trailing: Option<&'a str>,
}

impl<'a> Message<'a> {
    pub fn parse(raw: &'a str) -> Message<'a> {
        let mut msg = Message::default();

        // A line starting with ':' carries a prefix, otherwise the first
        // word already is the command.
        let rest = match raw.strip_prefix(':') {
            Some(prefixed) => {
                let (prefix, rest) = match prefixed.split_once(' ') {
                    Some((prefix, rest)) => (prefix, rest),
                    None => (prefixed, ""),
                };
                // nick[!user]@host, where the user part only exists when a
                // host does; a bare word is a server name kept in `nick`.
                match prefix.split_once('@') {
                    Some((who, host)) => {
                        msg.host = Some(host);
                        match who.split_once('!') {
                            Some((nick, user)) => {
                                msg.nick = Some(nick);
                                msg.user = Some(user);
                            }
                            None => msg.nick = Some(who),
                        }
                    }
                    None => msg.nick = Some(prefix),
                }
                rest
            }
            None => raw,
        };
        if rest.is_empty() {
            return msg;
        }

        let tail = match rest.split_once(' ') {
            Some((command, tail)) => {
                msg.command = Some(command);
                tail
            }
            None => {
                msg.command = Some(rest);
                return msg;
            }
        };

        // A parameter block opening with ':' is all trailing.
        if let Some(trailing) = tail.strip_prefix(':') {
            msg.params = Some("");
            msg.middle = Some("");
            msg.trailing = Some(trailing);
            return msg;
        }

        let head = match tail.find(" :") {
            Some(at) => {
                msg.trailing = Some(&tail[at + 2..]);
                &tail[..at]
            }
            None => tail,
        };
        match head.split_once(' ') {
            Some((params, middle)) => {
                msg.params = Some(params);
                msg.middle = Some(middle);
            }
            None => msg.params = Some(head),
        }
        msg
    }
}
