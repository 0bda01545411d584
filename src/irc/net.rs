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

use std::io::{self, Write};
use std::net::{self, ToSocketAddrs};
use std::path::Path;
use std::time::Duration;

use mio::net::TcpStream;
use mio::{Events, Interest, Poll, Registry, Token};
use mio_signals::{Signal, SignalSet, Signals};

use crate::config::Settings;
use crate::irc::client::{frame, Client, ClientReadStat, ClientWriteStat};
use crate::irc::command::dispatch;
use crate::irc::conversation::{ConversationSet, FifoRead};
use crate::irc::output::write_out;

/// Seconds without server traffic before the connection is declared dead;
/// a keepalive PING goes out at each third of this window.
pub const PING_TMOUT: u64 = 300;

const IRC_CONN: Token = Token(0);
const SIGNAL_TOKEN: Token = Token(1);

#[derive(thiserror::Error, Debug)]
pub enum RunError {
    #[error("cannot connect to '{0}'")]
    Connect(String, #[source] io::Error),
    #[error("cannot identify - message cropped")]
    Identify,
    #[error("cannot create server conversation")]
    ServerConversation(#[source] io::Error),
    #[error("cannot multiplex selected descriptors")]
    Multiplex(#[source] io::Error),
    #[error("ping timeout")]
    PingTimeout,
    #[error("remote host closed connection")]
    ConnectionClosed,
    #[error(transparent)]
    Io(#[from] io::Error),
}

fn open_conn(conn_str: &str) -> io::Result<net::TcpStream> {
    let mut last_err = io::Error::new(io::ErrorKind::Other, "no address resolved");
    for addr in conn_str.to_socket_addrs()? {
        match net::TcpStream::connect(addr) {
            Ok(conn) => return Ok(conn),
            Err(err) => last_err = err,
        }
    }
    Err(last_err)
}

/// Sends `PASS`/`NICK`/`USER` in one write while the stream is still
/// blocking; a short write means registration cannot be trusted.
fn identify(conn: &mut net::TcpStream, settings: &Settings) -> Result<(), RunError> {
    let mesg = Client::registration(
        settings.pass.as_deref(),
        &settings.nick,
        &settings.realname,
    );
    match conn.write(&mesg) {
        Ok(n) if n == mesg.len() => Ok(()),
        Ok(_) => Err(RunError::Identify),
        Err(err) => Err(RunError::Io(err)),
    }
}

/// Pulls every buffered line out of one conversation FIFO and acts on it.
/// Returns true when something was queued for the server. A failed read
/// swaps the descriptor, or drops the conversation if even that fails.
fn drain_fifo(
    client: &mut Client,
    convs: &mut ConversationSet,
    registry: &Registry,
    token: Token,
) -> bool {
    let mut queued = false;
    loop {
        let (result, canonical) = match convs.by_token(token) {
            Some(conv) => (conv.read_line(), conv.canonical().to_owned()),
            None => return queued,
        };
        match result {
            FifoRead::Empty => return queued,
            FifoRead::Failed => {
                convs.reopen(registry, &canonical);
                return queued;
            }
            FifoRead::Line(line) => {
                log::debug!("'{}' in: {}", canonical, line);
                let action = dispatch(&canonical, &line);
                if let Some(open) = action.open {
                    if let Err(err) = convs.add(registry, &open) {
                        log::error!("cannot open conversation '{}': {}", open, err);
                    }
                }
                if let Some((target, body)) = action.echo {
                    let nick = client.nick().to_owned();
                    write_out(convs, registry, &target, &nick, &body);
                }
                if let Some(wire) = action.wire {
                    client.queue(&wire);
                    queued = true;
                }
            }
        }
    }
}

/// Returns true when a termination signal arrived.
fn drain_signals(signals: &mut Signals) -> io::Result<bool> {
    loop {
        match signals.receive()? {
            Some(Signal::Interrupt) | Some(Signal::Terminate) | Some(Signal::Quit) => {
                return Ok(true)
            }
            Some(_) => (),
            None => return Ok(false),
        }
    }
}

/// Connects, registers, then multiplexes the server socket against every
/// conversation FIFO until our own QUIT comes back (clean exit), the
/// server goes away, or the liveness window closes.
pub fn event_loop(settings: &Settings, base: &Path) -> Result<(), RunError> {
    let conn_str = format!("{}:{}", settings.host, settings.port);
    let mut conn = open_conn(&conn_str).map_err(|err| RunError::Connect(conn_str.clone(), err))?;

    let mut poll = Poll::new()?;
    let mut events = Events::with_capacity(128);
    let mut signals = Signals::new(SignalSet::all())?;

    let mut convs = ConversationSet::new(base.to_path_buf());
    convs
        .add(poll.registry(), "")
        .map_err(RunError::ServerConversation)?;

    identify(&mut conn, settings)?;
    conn.set_nonblocking(true)?;
    let mut conn = TcpStream::from_std(conn);
    let mut client = Client::new(&settings.nick);

    poll.registry()
        .register(&mut conn, IRC_CONN, Interest::READABLE)?;
    poll.registry()
        .register(&mut signals, SIGNAL_TOKEN, Interest::READABLE)?;

    log::info!("connected to {}", conn_str);

    loop {
        if let Err(err) = poll.poll(&mut events, Some(Duration::from_secs(PING_TMOUT / 3))) {
            if err.kind() == io::ErrorKind::Interrupted {
                continue;
            }
            return Err(RunError::Multiplex(err));
        }

        if events.is_empty() {
            // poll timed out: either the link is dead or it needs a nudge
            if client.idle() >= Duration::from_secs(PING_TMOUT) {
                return Err(RunError::PingTimeout);
            }
            client.queue(&frame(&format!("PING {}", settings.host)));
        } else {
            // server traffic settles before user input from the FIFOs
            for event in events.iter() {
                match event.token() {
                    SIGNAL_TOKEN => {
                        if drain_signals(&mut signals)? {
                            client.queue(&frame("QUIT"));
                            let _ = client.write_data(&mut conn);
                            return Ok(());
                        }
                    }
                    IRC_CONN => {
                        if event.is_readable() {
                            loop {
                                match client.receive_data(&mut conn, &mut convs, poll.registry())? {
                                    ClientReadStat::Okay | ClientReadStat::HasWritableData => (),
                                    ClientReadStat::Blocked => break,
                                    ClientReadStat::Eof => return Err(RunError::ConnectionClosed),
                                    ClientReadStat::Quit => {
                                        let _ = client.write_data(&mut conn);
                                        return Ok(());
                                    }
                                }
                            }
                        }
                        if event.is_writable() {
                            loop {
                                match client.write_data(&mut conn)? {
                                    ClientWriteStat::Okay => (),
                                    ClientWriteStat::Blocked | ClientWriteStat::Drained => break,
                                }
                            }
                        }
                    }
                    _ => (),
                }
            }
            for event in events.iter() {
                match event.token() {
                    IRC_CONN | SIGNAL_TOKEN => (),
                    token => {
                        drain_fifo(&mut client, &mut convs, poll.registry(), token);
                    }
                }
            }
        }

        // arm the writer whenever something is waiting; re-registering also
        // re-arms the edge-triggered readiness
        let interest = if client.has_pending() {
            Interest::READABLE | Interest::WRITABLE
        } else {
            Interest::READABLE
        };
        poll.registry().reregister(&mut conn, IRC_CONN, interest)?;
    }
}

#[cfg(test)]
mod test {
    use std::fs;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::path::PathBuf;
    use std::thread::spawn;

    use tempfile::TempDir;

    use crate::config::Settings;
    use super::event_loop;

    fn expect_line(reader: &mut impl BufRead, want: &str) {
        let mut line = String::new();
        reader.read_line(&mut line).unwrap();
        assert_eq!(line, format!("{}\r\n", want));
    }

    #[test]
    fn full_session() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().to_path_buf();
        let fifo = base.join("in");

        let serv = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = serv.local_addr().unwrap().port();
        let settings = Settings {
            irc_dir: PathBuf::from("unused"),
            host: "127.0.0.1".to_owned(),
            port,
            nick: "bot".to_owned(),
            realname: "a bot".to_owned(),
            pass: None,
        };

        let server = spawn(move || {
            let (stream, _) = serv.accept().unwrap();
            let mut writer = stream.try_clone().unwrap();
            let mut reader = BufReader::new(stream);

            expect_line(&mut reader, "NICK bot");
            expect_line(&mut reader, "USER bot 0 * :a bot");

            writer.write_all(b":irc.test 001 bot :Welcome\r\n").unwrap();
            writer.write_all(b":bot!b@h JOIN #test\r\n").unwrap();
            writer
                .write_all(b":alice!a@h PRIVMSG #test :hello bot\r\n")
                .unwrap();
            writer.write_all(b"PING :keepalive\r\n").unwrap();
            expect_line(&mut reader, "PONG keepalive");

            // by now the server conversation FIFO exists; ask to quit
            // through it like a user would
            let mut user = std::fs::OpenOptions::new().write(true).open(&fifo).unwrap();
            user.write_all(b"/q bye\n").unwrap();
            drop(user);

            expect_line(&mut reader, "QUIT :bye");
            writer.write_all(b":bot!b@h QUIT :bye\r\n").unwrap();
        });

        event_loop(&settings, dir.path()).unwrap();
        server.join().unwrap();

        assert!(dir.path().join("#test").is_dir());
        let chan = fs::read_to_string(dir.path().join("#test").join("out")).unwrap();
        assert!(chan.contains(" <-!-> bot has joined #test\n"), "got {:?}", chan);
        assert!(chan.contains(" <alice> hello bot\n"), "got {:?}", chan);
        // the quit came from us, so only the server knows
        assert!(!chan.contains("has quit"));
    }

    #[test]
    fn refused_connection_is_a_startup_error() {
        let dir = TempDir::new().unwrap();
        // bind-then-drop to get a port nobody listens on
        let port = {
            let serv = TcpListener::bind("127.0.0.1:0").unwrap();
            serv.local_addr().unwrap().port()
        };
        let settings = Settings {
            irc_dir: PathBuf::from("unused"),
            host: "127.0.0.1".to_owned(),
            port,
            nick: "bot".to_owned(),
            realname: "bot".to_owned(),
            pass: None,
        };
        assert!(event_loop(&settings, dir.path()).is_err());
    }
}
