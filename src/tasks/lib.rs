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

//! Application layer of mlwf: logging, the command-line entry points,
//! and the commands they run.

#[macro_use] extern crate serde_derive;
#[macro_use] extern crate log;
#[macro_use] extern crate failure;

mod logging;
mod cmd;
pub mod entry_points;

pub use crate::cmd::{run_localize, PdosOutput, Summary};
pub use crate::logging::GlobalLogger;

pub type FailResult<T> = Result<T, failure::Error>;
