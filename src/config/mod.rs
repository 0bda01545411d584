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

pub mod cmdline;
pub mod config_file;

use std::env;
use std::path::PathBuf;

use nix::unistd;

use self::cmdline::ParsedArgs;
use self::config_file::FileConfig;

const DEFAULT_HOST: &str = "irc.freenode.net";
const DEFAULT_PORT: u16 = 6667;
const IRC_DIR: &str = "irc";

#[derive(thiserror::Error, Debug)]
pub enum SettingsError {
    #[error("failed to get passwd file")]
    Passwd,
}

/// Everything the engine needs, resolved from built-in defaults, the
/// optional config file and the command line, in that order of precedence.
#[derive(Debug, Clone)]
pub struct Settings {
    pub irc_dir: PathBuf,
    pub host: String,
    pub port: u16,
    pub nick: String,
    pub realname: String,
    pub pass: Option<String>,
}

impl Settings {
    pub fn resolve(args: ParsedArgs, file: FileConfig) -> Result<Settings, SettingsError> {
        let host = args
            .server
            .or(file.server)
            .unwrap_or_else(|| DEFAULT_HOST.to_owned());
        let port = args.port.or(file.port).unwrap_or(DEFAULT_PORT);

        // nick and irc-dir fall back to the password database, never $HOME
        let nick = args.nick.or(file.nick);
        let irc_dir = args.irc_dir.or(file.irc_dir);
        let (nick, irc_dir) = match (nick, irc_dir) {
            (Some(nick), Some(irc_dir)) => (nick, irc_dir),
            (nick, irc_dir) => {
                let user = unistd::User::from_uid(unistd::getuid())
                    .ok()
                    .flatten()
                    .ok_or(SettingsError::Passwd)?;
                let nick = nick.unwrap_or_else(|| user.name.clone());
                let irc_dir = irc_dir
                    .unwrap_or_else(|| user.dir.join(IRC_DIR).to_string_lossy().into_owned());
                (nick, irc_dir)
            }
        };

        let irc_dir = PathBuf::from(irc_dir.trim_end_matches('/'));
        let realname = args.realname.or(file.realname).unwrap_or_else(|| nick.clone());
        let pass = args
            .pass_var
            .or(file.pass_var)
            .and_then(|var| env::var(var).ok());

        Ok(Settings {
            irc_dir,
            host,
            port,
            nick,
            realname,
            pass,
        })
    }
}

#[cfg(test)]
mod test {
    use std::env;
    use std::path::PathBuf;

    use super::cmdline::ParsedArgs;
    use super::config_file::FileConfig;
    use super::Settings;

    fn full_args() -> ParsedArgs {
        ParsedArgs {
            config: None,
            irc_dir: Some("/tmp/irc/".to_owned()),
            server: Some("irc.args.net".to_owned()),
            port: Some(7000),
            nick: Some("argnick".to_owned()),
            pass_var: None,
            realname: None,
        }
    }

    #[test]
    fn flags_win_over_the_file() {
        let file = FileConfig {
            server: Some("irc.file.net".to_owned()),
            port: Some(6697),
            nick: Some("filenick".to_owned()),
            realname: Some("File Name".to_owned()),
            irc_dir: Some("/file/irc".to_owned()),
            pass_var: None,
        };
        let settings = Settings::resolve(full_args(), file).unwrap();
        assert_eq!(settings.host, "irc.args.net");
        assert_eq!(settings.port, 7000);
        assert_eq!(settings.nick, "argnick");
        // unset flags fall through to the file
        assert_eq!(settings.realname, "File Name");
        // trailing slashes are trimmed
        assert_eq!(settings.irc_dir, PathBuf::from("/tmp/irc"));
    }

    #[test]
    fn realname_defaults_to_the_nick() {
        let settings = Settings::resolve(full_args(), FileConfig::default()).unwrap();
        assert_eq!(settings.realname, "argnick");
        assert_eq!(settings.host, "irc.args.net");
    }

    #[test]
    fn defaults_apply_when_nothing_is_given() {
        let args = ParsedArgs {
            nick: Some("bot".to_owned()),
            irc_dir: Some("/tmp/irc".to_owned()),
            ..ParsedArgs::default()
        };
        let settings = Settings::resolve(args, FileConfig::default()).unwrap();
        assert_eq!(settings.host, "irc.freenode.net");
        assert_eq!(settings.port, 6667);
        assert!(settings.pass.is_none());
    }

    #[test]
    fn password_comes_from_the_named_env_var() {
        env::set_var("IRCFS_TEST_PASS", "hunter2");
        let args = ParsedArgs {
            nick: Some("bot".to_owned()),
            irc_dir: Some("/tmp/irc".to_owned()),
            pass_var: Some("IRCFS_TEST_PASS".to_owned()),
            ..ParsedArgs::default()
        };
        let settings = Settings::resolve(args, FileConfig::default()).unwrap();
        assert_eq!(settings.pass.as_deref(), Some("hunter2"));

        let args = ParsedArgs {
            nick: Some("bot".to_owned()),
            irc_dir: Some("/tmp/irc".to_owned()),
            pass_var: Some("IRCFS_TEST_UNSET".to_owned()),
            ..ParsedArgs::default()
        };
        let settings = Settings::resolve(args, FileConfig::default()).unwrap();
        assert!(settings.pass.is_none());
    }
}
