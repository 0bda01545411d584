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

use std::env;

const USAGE: &str = "usage: ircfs [-c <config>] [-i <irc-dir>] [-s <server>] [-p <port>] \
[-n <nick>] [-k <passwd-env-var>] [-f <fullname>]";

#[derive(thiserror::Error, Debug)]
#[error("{0}")]
pub struct UsageError(String);

/// Raw command-line options: `-x VALUE` pairs before any positional words.
/// Everything is optional here; defaults are resolved one layer up.
#[derive(Debug, Default)]
pub struct ParsedArgs {
    pub config: Option<String>,
    pub irc_dir: Option<String>,
    pub server: Option<String>,
    pub port: Option<u16>,
    pub nick: Option<String>,
    pub pass_var: Option<String>,
    pub realname: Option<String>,
}

impl ParsedArgs {
    pub fn new() -> Result<ParsedArgs, UsageError> {
        let args = env::args().skip(1).collect::<Vec<String>>();
        ParsedArgs::from_args(&args)
    }

    pub fn from_args(args: &[String]) -> Result<ParsedArgs, UsageError> {
        if args.len() % 2 != 0 {
            return Err(UsageError(format!(
                "missing argument for option '{}'\n{}",
                args.last().map(String::as_str).unwrap_or(""),
                USAGE
            )));
        }

        let mut ret = ParsedArgs::default();
        let mut iter = args.iter();
        while let Some(flag) = iter.next() {
            if !flag.starts_with('-') {
                break;
            }
            let value = match iter.next() {
                Some(value) => value,
                None => {
                    return Err(UsageError(format!(
                        "missing argument for option '{}'\n{}",
                        flag, USAGE
                    )))
                }
            };
            match flag.as_str() {
                "-c" => ret.config = Some(value.clone()),
                "-i" => ret.irc_dir = Some(value.clone()),
                "-s" => ret.server = Some(value.clone()),
                "-p" => {
                    ret.port = Some(value.parse().map_err(|_| {
                        UsageError(format!("not a port number: '{}'\n{}", value, USAGE))
                    })?)
                }
                "-n" => ret.nick = Some(value.clone()),
                "-k" => ret.pass_var = Some(value.clone()),
                "-f" => ret.realname = Some(value.clone()),
                _ => return Err(UsageError(USAGE.to_owned())),
            }
        }
        Ok(ret)
    }
}
