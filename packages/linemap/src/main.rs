// Copyright (c) 2026 MCU-Debug Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use vmlinux_linemap::annotator::{UsageError, USAGE};
use vmlinux_linemap::cli::{run_create, run_view, Cli, Command};
use vmlinux_linemap::logging;

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) {
                let _ = e.print();
                return ExitCode::SUCCESS;
            }
            let _ = e.print();
            eprintln!("{}", USAGE);
            return ExitCode::from(1);
        }
    };

    let _logger = match logging::init(cli.command.debug(), "info") {
        Ok(handle) => Some(handle),
        Err(e) => {
            eprintln!("Failed to start logger: {:#}", e);
            None
        }
    };

    let result = match cli.command {
        Command::Create(args) => run_create(args),
        Command::View(args) => run_view(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if let Some(usage) = e.downcast_ref::<UsageError>() {
                eprintln!("{}: {}", usage, USAGE);
                let mut cmd = Cli::command();
                if let Some(view) = cmd.find_subcommand_mut("view") {
                    eprintln!("{}", view.render_usage());
                }
            } else if logging::is_debug() {
                eprintln!("Error: {:?}", e);
            } else {
                eprintln!("Error: {:#}", e);
            }
            ExitCode::from(1)
        }
    }
}
