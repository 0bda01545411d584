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

mod config;
mod irc;

use std::env;
use std::error::Error;
use std::fs::DirBuilder;
use std::io;
use std::os::unix::fs::DirBuilderExt;
use std::path::{Path, PathBuf};
use std::process;

use config::cmdline::{ParsedArgs, UsageError};
use config::config_file::{ConfigError, FileConfig};
use config::{Settings, SettingsError};
use irc::net::{event_loop, RunError};

#[derive(thiserror::Error, Debug)]
enum MainError {
    #[error(transparent)]
    Cmdline(#[from] UsageError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error("cannot create main directory '{}'", .0.display())]
    Dirtree(PathBuf, #[source] io::Error),
    #[error("cannot change working directory to '{}'", .0.display())]
    Chdir(PathBuf, #[source] io::Error),
    #[error(transparent)]
    Run(#[from] RunError),
}

fn run() -> Result<(), MainError> {
    let args = ParsedArgs::new()?;
    let file = match &args.config {
        Some(path) => FileConfig::from_path(Path::new(path))?,
        None => FileConfig::default(),
    };
    let settings = Settings::resolve(args, file)?;

    // everything happens relative to <irc-dir>/<host>
    let path = settings.irc_dir.join(&settings.host);
    DirBuilder::new()
        .recursive(true)
        .mode(0o700)
        .create(&path)
        .map_err(|err| MainError::Dirtree(path.clone(), err))?;
    env::set_current_dir(&path).map_err(|err| MainError::Chdir(path.clone(), err))?;

    event_loop(&settings, Path::new("."))?;
    Ok(())
}

fn main() {
    env_logger::builder()
        .target(env_logger::Target::Stderr)
        .init();

    if let Err(err) = run() {
        eprintln!("ircfs: {}", err);
        let mut source = err.source();
        while let Some(cause) = source {
            eprintln!("  caused by: {}", cause);
            source = cause.source();
        }
        process::exit(1);
    }
}
