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
use crate::logging::GlobalLogger;

use mlwf_tasks_config::{Settings, YamlRead};

use std::ffi::OsStr;
use std::path::PathBuf;

use clap::{App, Arg};

fn wrap_result_main<F>(main: F)
where F: FnOnce() -> FailResult<()>,
{
    main().unwrap_or_else(|e| {
        for cause in e.iter_chain() {
            error!("{}", cause);
        }

        if std::env::var_os("RUST_BACKTRACE") == Some(OsStr::new("1").to_owned()) {
            error!("{}", e.backtrace());
        } else {
            error!("(for more detail, try again with RUST_BACKTRACE=1)");
        }
        std::process::exit(1);
    });
}

// %% CRATES: binary: mlwf-localize %%
pub fn mlwf_localize() {
    wrap_result_main(|| {
        let matches = {
            App::new("mlwf-localize")
                .version(env!("CARGO_PKG_VERSION"))
                .about("Maximally localized Wannier functions from Bloch states on a grid.")
                .args(&[
                    Arg::with_name("config")
                        .required(true)
                        .value_name("CONFIG")
                        .help("settings yaml"),
                    Arg::with_name("input")
                        .required(true)
                        .value_name("INPUT")
                        .help("Bloch states and band energies, as grid data json"),
                    Arg::with_name("output")
                        .short("o")
                        .long("output")
                        .takes_value(true)
                        .value_name("OUTDIR")
                        .required(true)
                        .help("output directory (created if missing)"),
                    Arg::with_name("log")
                        .long("log")
                        .takes_value(true)
                        .value_name("LOGFILE")
                        .help("also write the log to this file"),
                    Arg::with_name("verbose")
                        .short("v")
                        .multiple(true)
                        .help("more log output; may be repeated"),
                ])
                .get_matches()
        };

        let mut logger = GlobalLogger::default();
        logger.verbosity(matches.occurrences_of("verbose"));
        if let Some(path) = matches.value_of_os("log") {
            logger.path(path);
        }
        logger.apply()?;

        // clap enforces the required arguments
        let path_of = |name: &str| -> FailResult<PathBuf> {
            matches.value_of_os(name)
                .map(PathBuf::from)
                .ok_or_else(|| format_err!("missing argument: {}", name))
        };
        let config = path_of("config")?;
        let input = path_of("input")?;
        let outdir = path_of("output")?;

        let settings = Settings::from_reader(mlwf_fs_util::open_text(&config)?)?.validate()?;
        let summary = crate::run_localize(&settings, &input, &outdir)?;
        info!("Final functional value: {:.10}", summary.functional_value);
        Ok(())
    });
}
