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

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use serde::Deserialize;

/// On-disk defaults, all optional; command-line flags win over every one
/// of these.
#[derive(Deserialize, Debug, Default)]
pub struct FileConfig {
    pub server: Option<String>,
    pub port: Option<u16>,
    pub nick: Option<String>,
    pub realname: Option<String>,
    pub irc_dir: Option<String>,
    /// Name of the environment variable holding the server password.
    pub pass_var: Option<String>,
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    Io(#[from] io::Error),
    #[error("cannot parse config file: {0}")]
    Toml(#[from] toml::de::Error),
}

impl FileConfig {
    pub fn from_str(c: &str) -> Result<FileConfig, ConfigError> {
        toml::from_str::<FileConfig>(c).map_err(|e| e.into())
    }

    pub fn from_path(p: &Path) -> Result<FileConfig, ConfigError> {
        let mut f = File::open(p)?;
        let mut c = String::new();
        f.read_to_string(&mut c)?;
        FileConfig::from_str(&c)
    }
}

#[cfg(test)]
mod test {
    use super::FileConfig;

    #[test]
    fn full_file() {
        let conf = FileConfig::from_str(
            r##"
server = "irc.example.net"
port = 6697
nick = "bot"
realname = "A Bot"
irc_dir = "/tmp/irc"
pass_var = "IRC_PASS"
"##,
        )
        .unwrap();
        assert_eq!(conf.server.as_deref(), Some("irc.example.net"));
        assert_eq!(conf.port, Some(6697));
        assert_eq!(conf.nick.as_deref(), Some("bot"));
        assert_eq!(conf.realname.as_deref(), Some("A Bot"));
        assert_eq!(conf.irc_dir.as_deref(), Some("/tmp/irc"));
        assert_eq!(conf.pass_var.as_deref(), Some("IRC_PASS"));
    }

    #[test]
    fn everything_is_optional() {
        let conf = FileConfig::from_str("").unwrap();
        assert!(conf.server.is_none());
        assert!(conf.port.is_none());
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(FileConfig::from_str("server = [not a string").is_err());
    }
}
