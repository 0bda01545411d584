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

use std::fs::OpenOptions;
use std::io::Write;

use chrono::Local;
use mio::Registry;

use crate::irc::conversation::ConversationSet;
use crate::irc::names::normalize;

/// Displayed nick for server-originated system events.
pub const SERVER_NICK: &str = "-!-";

/// Appends `TIMESTAMP <nick> body` to the target conversation's `out` file.
///
/// The file is opened and closed per line so external tools may rotate or
/// tail it freely. If the open fails (usually because the conversation has
/// no directory yet) the conversation is materialised once and the open
/// retried; after that the line is dropped. Nothing here ever reaches the
/// server.
pub fn write_out(
    convs: &mut ConversationSet,
    registry: &Registry,
    target: &str,
    nick: &str,
    body: &str,
) {
    let canonical = match normalize(target) {
        Some(canonical) => canonical,
        None => return,
    };
    let path = convs.out_path(&canonical);
    let mut file = match OpenOptions::new().append(true).create(true).open(&path) {
        Ok(file) => file,
        Err(_) => {
            if !convs.add(registry, target).unwrap_or(false) {
                return;
            }
            match OpenOptions::new().append(true).create(true).open(&path) {
                Ok(file) => file,
                Err(err) => {
                    log::debug!("dropping line for '{}': {}", canonical, err);
                    return;
                }
            }
        }
    };
    let stamp = Local::now().format("%Y-%m-%d %H:%M");
    if let Err(err) = writeln!(file, "{} <{}> {}", stamp, nick, body) {
        log::debug!("write to '{}' failed: {}", path.display(), err);
    }
}
