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

use std::collections::BTreeMap;
use std::fs::DirBuilder;
use std::io;
use std::os::unix::fs::DirBuilderExt;
use std::os::unix::io::{AsRawFd, FromRawFd, OwnedFd};
use std::path::PathBuf;

use mio::unix::SourceFd;
use mio::{Interest, Registry, Token};
use nix::errno::Errno;
use nix::fcntl::{self, OFlag};
use nix::sys::stat::Mode;
use nix::unistd;

use crate::irc::names::normalize;

const IN_FILE: &str = "in";
const OUT_FILE: &str = "out";

/// Longest line accepted from a FIFO; bytes past this are dropped until the
/// terminating newline.
const LINE_MAX: usize = 4096;

/// Tokens 0 and 1 belong to the server socket and the signal source.
const FIRST_CONV_TOKEN: usize = 2;

fn nix_err(err: Errno) -> io::Error {
    io::Error::from_raw_os_error(err as i32)
}

/// Outcome of one line read attempt on a conversation FIFO.
#[derive(Debug, PartialEq)]
pub enum FifoRead {
    Line(String),
    /// Nothing buffered; the descriptor is fine as it is.
    Empty,
    /// EOF (the writer went away) or a read error; the descriptor must be
    /// reopened, or the conversation dropped if that fails.
    Failed,
}

/// A channel or direct correspondent, backed by a directory holding the
/// `in` FIFO this descriptor reads and the `out` log.
pub struct Conversation {
    raw_name: String,
    canonical: String,
    token: Token,
    fifo: OwnedFd,
}

impl Conversation {
    pub fn raw_name(&self) -> &str {
        &self.raw_name
    }

    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    pub fn token(&self) -> Token {
        self.token
    }

    /// Reads one newline-terminated line, a byte at a time. The descriptor
    /// is non-blocking, so a writer that stalls mid-line counts as a
    /// failure rather than a reason to stall the whole loop; CR before the
    /// newline is stripped.
    pub fn read_line(&self) -> FifoRead {
        let mut line: Vec<u8> = Vec::with_capacity(128);
        let mut byte = [0u8; 1];
        loop {
            match unistd::read(self.fifo.as_raw_fd(), &mut byte) {
                Ok(0) => return FifoRead::Failed,
                Ok(_) => {
                    if byte[0] == b'\n' {
                        break;
                    }
                    if line.len() < LINE_MAX {
                        line.push(byte[0]);
                    }
                }
                Err(Errno::EAGAIN) => {
                    return if line.is_empty() {
                        FifoRead::Empty
                    } else {
                        FifoRead::Failed
                    };
                }
                Err(Errno::EINTR) => continue,
                Err(_) => return FifoRead::Failed,
            }
        }
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        FifoRead::Line(String::from_utf8_lossy(&line).into_owned())
    }
}

/// Every open conversation, keyed by canonical name. The empty name is the
/// server conversation rooted at the base directory itself; it exists from
/// registration until shutdown.
pub struct ConversationSet {
    base: PathBuf,
    convs: BTreeMap<String, Conversation>,
    next_token: usize,
}

impl ConversationSet {
    pub fn new(base: PathBuf) -> ConversationSet {
        ConversationSet {
            base,
            convs: BTreeMap::new(),
            next_token: FIRST_CONV_TOKEN,
        }
    }

    fn dir_path(&self, canonical: &str) -> PathBuf {
        if canonical.is_empty() {
            self.base.clone()
        } else {
            self.base.join(canonical)
        }
    }

    fn in_path(&self, canonical: &str) -> PathBuf {
        self.dir_path(canonical).join(IN_FILE)
    }

    pub fn out_path(&self, canonical: &str) -> PathBuf {
        self.dir_path(canonical).join(OUT_FILE)
    }

    pub fn get(&self, canonical: &str) -> Option<&Conversation> {
        self.convs.get(canonical)
    }

    pub fn by_token(&self, token: Token) -> Option<&Conversation> {
        self.convs.values().find(|conv| conv.token == token)
    }

    pub fn contains(&self, canonical: &str) -> bool {
        self.convs.contains_key(canonical)
    }

    pub fn len(&self) -> usize {
        self.convs.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Conversation> {
        self.convs.values()
    }

    /// Opens a conversation for `raw` and registers its FIFO with the poll.
    /// A live entry whose backing directory still exists is reused; a stale
    /// one is rebuilt. Returns false when the name does not normalize, in
    /// which case nothing happens at all.
    pub fn add(&mut self, registry: &Registry, raw: &str) -> io::Result<bool> {
        let canonical = match normalize(raw) {
            Some(canonical) => canonical,
            None => return Ok(false),
        };
        if self.convs.contains_key(&canonical) {
            if self.dir_path(&canonical).is_dir() {
                return Ok(true);
            }
            // the backing directory vanished under us
            self.remove_canonical(registry, &canonical);
        }

        let fifo = self.open_fifo(&canonical)?;
        let token = Token(self.next_token);
        self.next_token += 1;
        registry.register(&mut SourceFd(&fifo.as_raw_fd()), token, Interest::READABLE)?;
        self.convs.insert(
            canonical.clone(),
            Conversation {
                raw_name: raw.to_owned(),
                canonical,
                token,
                fifo,
            },
        );
        Ok(true)
    }

    pub fn remove(&mut self, registry: &Registry, raw: &str) {
        if let Some(canonical) = normalize(raw) {
            self.remove_canonical(registry, &canonical);
        }
    }

    fn remove_canonical(&mut self, registry: &Registry, canonical: &str) {
        if let Some(conv) = self.convs.remove(canonical) {
            let _ = registry.deregister(&mut SourceFd(&conv.fifo.as_raw_fd()));
        }
    }

    /// Swaps in a fresh descriptor after a failed read, keeping the token so
    /// in-flight events still resolve. Returns false when the FIFO cannot
    /// be reopened and the conversation was dropped instead.
    pub fn reopen(&mut self, registry: &Registry, canonical: &str) -> bool {
        let fifo = match self.open_fifo(canonical) {
            Ok(fifo) => fifo,
            Err(err) => {
                log::error!("cannot reopen fifo for '{}': {}", canonical, err);
                self.remove_canonical(registry, canonical);
                return false;
            }
        };
        match self.convs.get_mut(canonical) {
            Some(conv) => {
                let _ = registry.deregister(&mut SourceFd(&conv.fifo.as_raw_fd()));
                if let Err(err) =
                    registry.register(&mut SourceFd(&fifo.as_raw_fd()), conv.token, Interest::READABLE)
                {
                    log::error!("cannot re-register fifo for '{}': {}", canonical, err);
                    self.remove_canonical(registry, canonical);
                    return false;
                }
                conv.fifo = fifo;
                true
            }
            None => false,
        }
    }

    /// Ensures the conversation directory and its `in` FIFO exist, then
    /// opens the FIFO read-only and non-blocking. The empty canonical name
    /// lives in the base directory directly.
    fn open_fifo(&self, canonical: &str) -> io::Result<OwnedFd> {
        let dir = self.dir_path(canonical);
        if !canonical.is_empty() && !dir.is_dir() {
            DirBuilder::new().recursive(true).mode(0o700).create(&dir)?;
        }
        let path = self.in_path(canonical);
        if !path.exists() {
            unistd::mkfifo(&path, Mode::S_IRUSR | Mode::S_IWUSR).map_err(nix_err)?;
        }
        let fd = fcntl::open(&path, OFlag::O_RDONLY | OFlag::O_NONBLOCK, Mode::empty())
            .map_err(nix_err)?;
        Ok(unsafe { OwnedFd::from_raw_fd(fd) })
    }
}

#[cfg(test)]
mod test {
    use std::fs::OpenOptions;
    use std::io::Write;
    use std::os::unix::fs::FileTypeExt;

    use mio::Poll;
    use tempfile::TempDir;

    use super::{ConversationSet, FifoRead};

    fn set() -> (Poll, ConversationSet, TempDir) {
        let dir = TempDir::new().unwrap();
        let poll = Poll::new().unwrap();
        let convs = ConversationSet::new(dir.path().to_path_buf());
        (poll, convs, dir)
    }

    #[test]
    fn add_creates_directory_and_fifo() {
        let (poll, mut convs, dir) = set();
        assert!(convs.add(poll.registry(), "#Test").unwrap());
        assert!(convs.contains("#test"));
        assert!(dir.path().join("#test").is_dir());
        let meta = std::fs::metadata(dir.path().join("#test").join("in")).unwrap();
        assert!(meta.file_type().is_fifo());
    }

    #[test]
    fn server_conversation_lives_in_the_base() {
        let (poll, mut convs, dir) = set();
        assert!(convs.add(poll.registry(), "").unwrap());
        let meta = std::fs::metadata(dir.path().join("in")).unwrap();
        assert!(meta.file_type().is_fifo());
        assert_eq!(convs.out_path(""), dir.path().join("out"));
    }

    #[test]
    fn add_is_keyed_by_canonical_name() {
        let (poll, mut convs, _dir) = set();
        assert!(convs.add(poll.registry(), "#chan").unwrap());
        assert!(convs.add(poll.registry(), "#CHAN").unwrap());
        assert!(convs.add(poll.registry(), "#Chan[1],#other").unwrap());
        assert_eq!(convs.len(), 2);
        assert!(convs.contains("#chan"));
        assert!(convs.contains("#chan{1}"));
    }

    #[test]
    fn stale_directories_are_rebuilt() {
        let (poll, mut convs, dir) = set();
        convs.add(poll.registry(), "#chan").unwrap();
        std::fs::remove_dir_all(dir.path().join("#chan")).unwrap();

        assert!(convs.add(poll.registry(), "#chan").unwrap());
        assert_eq!(convs.len(), 1);
        let meta = std::fs::metadata(dir.path().join("#chan").join("in")).unwrap();
        assert!(meta.file_type().is_fifo());
    }

    #[test]
    fn invalid_names_are_silently_refused() {
        let (poll, mut convs, _dir) = set();
        assert!(!convs.add(poll.registry(), "bad name").unwrap());
        assert_eq!(convs.len(), 0);
    }

    #[test]
    fn remove_forgets_the_conversation() {
        let (poll, mut convs, dir) = set();
        convs.add(poll.registry(), "#chan").unwrap();
        convs.remove(poll.registry(), "#CHAN");
        assert!(!convs.contains("#chan"));
        // the directory stays for the logs
        assert!(dir.path().join("#chan").is_dir());
    }

    #[test]
    fn tokens_resolve_back_to_their_conversation() {
        let (poll, mut convs, _dir) = set();
        convs.add(poll.registry(), "#a").unwrap();
        convs.add(poll.registry(), "#b").unwrap();
        let token = convs.get("#b").unwrap().token();
        assert_eq!(convs.by_token(token).unwrap().canonical(), "#b");
    }

    #[test]
    fn read_line_round() {
        let (poll, mut convs, dir) = set();
        convs.add(poll.registry(), "#chan").unwrap();
        let conv = convs.get("#chan").unwrap();

        let mut writer = OpenOptions::new()
            .write(true)
            .open(dir.path().join("#chan").join("in"))
            .unwrap();
        writer.write_all(b"hello world\r\n").unwrap();

        assert_eq!(conv.read_line(), FifoRead::Line("hello world".to_owned()));
        // nothing buffered but the writer is still around
        assert_eq!(conv.read_line(), FifoRead::Empty);

        drop(writer);
        // EOF once the last writer is gone
        assert_eq!(conv.read_line(), FifoRead::Failed);
    }

    #[test]
    fn reopen_keeps_the_conversation_alive() {
        let (poll, mut convs, dir) = set();
        convs.add(poll.registry(), "#chan").unwrap();
        let token = convs.get("#chan").unwrap().token();

        {
            let writer = OpenOptions::new()
                .write(true)
                .open(dir.path().join("#chan").join("in"))
                .unwrap();
            drop(writer);
        }
        assert_eq!(convs.get("#chan").unwrap().read_line(), FifoRead::Failed);

        assert!(convs.reopen(poll.registry(), "#chan"));
        assert!(convs.contains("#chan"));
        assert_eq!(convs.get("#chan").unwrap().token(), token);

        // the fresh descriptor picks up new writers as usual
        let mut writer = OpenOptions::new()
            .write(true)
            .open(dir.path().join("#chan").join("in"))
            .unwrap();
        writer.write_all(b"back\n").unwrap();
        assert_eq!(convs.get("#chan").unwrap().read_line(), FifoRead::Line("back".to_owned()));
    }
}
