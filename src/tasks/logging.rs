/* ********************************************************************** **
**  This file is part of mlwf.                                            **
**                                                                        **
**  mlwf is free software: you can redistribute it and/or modify it under **
**  the terms of the GNU General Public License as published by the Free  **
**  Software Foundation, either version 3 of the License, or (at your     **
**  option) any later version.                                            **
**                                                                        **
**      http://www.gnu.org/licenses/                                      **
**                                                                        **
** Do note that, while the whole of mlwf is licensed under the GPL, many  **
** parts of it are licensed under more permissive terms.                  **
** ********************************************************************** */

use crate::FailResult;

use std::fmt;
use std::path::{Path, PathBuf};
use log::{Level, LevelFilter};

/// Builder-style setup for logging
#[derive(Debug, Clone, Default)]
pub struct GlobalLogger {
    path: Option<PathBuf>,
    verbosity: Verbosity,
}

impl GlobalLogger {
    /// NOTE: Relative paths will not be resolved until apply() is called.
    pub fn path<P: AsRef<Path>>(&mut self, path: P) -> &mut Self
    { self.path = Some(path.as_ref().to_owned()); self }

    /// Any integer will be accepted; the level will be truncated
    /// to the most extreme value supported.
    pub fn verbosity(&mut self, level: u64) -> &mut Self
    {
        self.verbosity = match level {
            0 => Verbosity::Default,
            1 => Verbosity::Loud,
            _ => Verbosity::Louder,
        };
        self
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Verbosity { Default, Loud, Louder }

impl Default for Verbosity {
    fn default() -> Self { Verbosity::Default }
}

impl GlobalLogger {
    /// NOTE: Calling this more than once fails, as the `log` facade
    ///       only accepts one logger.
    pub fn apply(&mut self) -> FailResult<()>
    {
        use std::time::Instant;

        let ours = match self.verbosity {
            Verbosity::Default => LevelFilter::Info,
            Verbosity::Loud => LevelFilter::Debug,
            Verbosity::Louder => LevelFilter::Trace,
        };

        let start = Instant::now();
        let mut fern = fern::Dispatch::new();
        fern = fern.format(move |out, message, record| {
                let t = start.elapsed();
                out.finish(format_args!("[{:>4}.{:03}s][{}][{}] {}",
                    t.as_secs(),
                    t.subsec_millis(),
                    record.target(),
                    ColorizedLevel(record.level()),
                    message))
            })
            .level(LevelFilter::Warn)
            .level_for("mlwf", ours)
            .level_for("mlwf_tasks", ours)
            .level_for("mlwf_tasks_config", ours)
            .level_for("mlwf_wannier", ours)
            .level_for("mlwf_minimize", ours)
            .chain(std::io::stdout());

        if let Some(path) = self.path.as_ref() {
            fern = fern.chain(fern::log_file(path)?);
        }

        fern.apply()?;
        Ok(())
    }
}

#[derive(Debug, Copy, Clone)]
pub struct ColorizedLevel(pub Level);
impl fmt::Display for ColorizedLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let style = match self.0 {
            Level::Error => ansi_term::Colour::Red.bold(),
            Level::Warn  => ansi_term::Colour::Red.normal(),
            Level::Info  => ansi_term::Colour::Cyan.bold(),
            Level::Debug => ansi_term::Colour::Yellow.dimmed(),
            Level::Trace => ansi_term::Colour::Cyan.normal(),
        };
        write!(f, "{}", style.paint(self.0.to_string()))
    }
}
