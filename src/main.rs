// TACK, a compact Lisp runtime for small machines.

// SPDX-FileCopyrightText: © 2021 Matthew Rothlisberger
// SPDX-License-Identifier: AGPL-3.0-only

// TACK is licensed under the terms of the GNU Affero General Public
// License version 3. See the top-level LICENSES directory for the
// license text.

// Find full copyright information in the top-level COPYRIGHT file.

// <>

// src/main.rs

// Command line entry point.

// <>

use std::env;
use std::io;
use std::process;

fn main() {
    // RUST_LOG overrides the default level
    if let Err(e) = simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Warn)
        .env()
        .init()
    {
        eprintln!("logger: {}", e);
    }

    // tack file <filename> to run a file
    // tack or tack repl for the REPL
    let args: Vec<String> = env::args().collect();
    let res = match args.get(1).map(String::as_str) {
        Some("file") => match args.get(2) {
            Some(path) => tack::run_file(path).map(|out| {
                for line in out {
                    println!("{}", line);
                }
            }),
            None => {
                eprintln!("usage: tack file <filename>");
                process::exit(2);
            }
        },
        None | Some("repl") => tack::repl(io::stdin().lock()),
        Some(other) => {
            eprintln!("unknown command '{}'; expected 'file' or 'repl'", other);
            process::exit(2);
        }
    };

    if let Err(e) = res {
        log::error!("{}", e);
        process::exit(1);
    }
}
