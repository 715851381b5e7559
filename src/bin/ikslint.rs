/*
** This file is a part of Iksxml (streaming XML parser with DTD support)
** Copyright (C) 2000-2025 Gurer Ozen
**
** Iksxml is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

use std::collections::HashMap;
use std::env;
use std::fs::File;
use std::io::Read;
use std::io::stdin;
use std::process::ExitCode;

use log::{Level, LevelFilter, Log, Metadata, Record};

use iksxml::HandlerError;
use iksxml::ParserConfig;
use iksxml::SaxEvent;
use iksxml::SaxHandler;
use iksxml::XmlError;
use iksxml::XmlParser;

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn print_version() {
    println!("ikslint (iksxml) v{}", VERSION);
}

fn print_usage() {
    println!(concat!(
        "Usage: ikslint [OPTIONS] [FILE.xml...]\n",
        "This tool checks the well-formedness of XML documents.\n",
        "Options:\n",
        "  -s, --stat           Overall statistics\n",
        "  -c, --count          Tag counts\n",
        "  -n, --no-namespaces  Do not process namespaces\n",
        "  -d, --no-dtd         Do not load external DTD subsets\n",
        "      --debug          Log parser internals to stderr\n",
        "  -h, --help           Display this help message and exit\n",
        "  -v, --version        Display the version and exit\n",
        "Report issues at https://github.com/meduketto/iksemel-rust/issues"
    ));
}

struct StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Debug
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

struct Handler {
    do_stats: bool,
    do_tag_count: bool,
    level: usize,
    max_depth: usize,
    nr_tags: usize,
    nr_cdata_size: usize,
    nr_declarations: usize,
    tag_map: HashMap<String, usize>,
}

impl Handler {
    fn new(do_stats: bool, do_tag_count: bool) -> Self {
        Handler {
            do_stats,
            do_tag_count,
            level: 0,
            max_depth: 0,
            nr_tags: 0,
            nr_cdata_size: 0,
            nr_declarations: 0,
            tag_map: HashMap::new(),
        }
    }

    fn report(&mut self) {
        if self.do_stats {
            println!(
                "Elements: {}, max depth: {}, DTD declarations: {}",
                self.nr_tags, self.max_depth, self.nr_declarations
            );
            println!("Total size of character data: {} bytes.", self.nr_cdata_size);
        }
        if self.do_tag_count {
            println!("Tag counts:");
            for (tag, count) in self.tag_map.iter() {
                println!("  {}: {}", tag, count);
            }
        }
        self.level = 0;
        self.max_depth = 0;
        self.nr_tags = 0;
        self.nr_cdata_size = 0;
        self.nr_declarations = 0;
        self.tag_map.clear();
    }
}

impl SaxHandler for Handler {
    fn handle_event(&mut self, event: &SaxEvent) -> Result<(), HandlerError> {
        match event {
            SaxEvent::BeginElement { name, .. } => {
                self.nr_tags += 1;
                self.level += 1;
                self.max_depth = self.max_depth.max(self.level);
                if self.do_tag_count {
                    *self.tag_map.entry(name.to_string()).or_insert(0) += 1;
                }
            }
            SaxEvent::EndElement { .. } => {
                self.level -= 1;
            }
            SaxEvent::Text(text) | SaxEvent::CDataSection(text) => {
                self.nr_cdata_size += text.len();
            }
            SaxEvent::InternalEntityDecl { .. }
            | SaxEvent::ExternalEntityDecl { .. }
            | SaxEvent::UnparsedEntityDecl { .. }
            | SaxEvent::NotationDecl(_)
            | SaxEvent::ElementDecl(_)
            | SaxEvent::AttributeDecl(_) => {
                self.nr_declarations += 1;
            }
            _ => (),
        }
        Ok(())
    }

    fn resolve_entity(
        &mut self,
        _public_id: Option<&str>,
        system_id: &str,
    ) -> Result<Box<dyn Read>, HandlerError> {
        let path = system_id.strip_prefix("file://").unwrap_or(system_id);
        Ok(Box::new(File::open(path)?))
    }
}

fn file_url(file: &str) -> Option<String> {
    let path = std::path::absolute(file).ok()?;
    Some(format!("file://{}", path.display()))
}

struct Linter {
    handler: Handler,
    config: ParserConfig,
}

impl Linter {
    fn new(do_stats: bool, do_tag_count: bool, config: ParserConfig) -> Self {
        Linter {
            handler: Handler::new(do_stats, do_tag_count),
            config,
        }
    }

    fn lint_file(&mut self, file: &str, is_stream: bool) -> bool {
        let reader: Box<dyn Read> = if is_stream {
            Box::new(stdin())
        } else {
            match File::open(file) {
                Ok(f) => Box::new(f),
                Err(e) => {
                    eprintln!("Error reading file '{}': {}", file, e);
                    return false;
                }
            }
        };
        let config = if is_stream {
            self.config.clone()
        } else {
            self.config.clone().system_id(file_url(file))
        };
        let mut parser = XmlParser::new(config);
        match parser.parse_reader(&mut self.handler, reader) {
            Ok(()) => {
                self.handler.report();
                true
            }
            Err(err) => {
                report_error(file, &err);
                self.handler.report();
                false
            }
        }
    }
}

fn report_error(file: &str, err: &XmlError) {
    let source = err.system_id().unwrap_or(file);
    eprintln!(
        "Error in '{}' at line {} column {}: {} ({})",
        source,
        err.position().line,
        err.position().column,
        err.message(),
        err.kind()
    );
}

fn main() -> ExitCode {
    let mut args = env::args();

    let mut files = Vec::new();
    let mut do_stats = false;
    let mut do_tag_count = false;
    let mut config = ParserConfig::new();

    // Skip the first argument (program name)
    args.next();
    for arg in args {
        match arg.as_str() {
            "-s" | "--stat" => {
                do_stats = true;
            }
            "-c" | "--count" => {
                do_tag_count = true;
            }
            "-cs" | "-sc" => {
                do_stats = true;
                do_tag_count = true;
            }
            "-n" | "--no-namespaces" => {
                config = config.namespaces(false);
            }
            "-d" | "--no-dtd" => {
                config = config.load_external_dtd(false);
            }
            "--debug" => {
                if log::set_logger(&LOGGER).is_ok() {
                    log::set_max_level(LevelFilter::Debug);
                }
            }
            "-h" | "--help" => {
                print_usage();
                return ExitCode::SUCCESS;
            }
            "-v" | "--version" => {
                print_version();
                return ExitCode::SUCCESS;
            }
            _ => {
                files.push(arg);
            }
        }
    }

    let mut linter = Linter::new(do_stats, do_tag_count, config);
    if files.is_empty() {
        if !linter.lint_file("stdin", true) {
            return ExitCode::FAILURE;
        }
    } else {
        for file in files {
            if !linter.lint_file(&file, false) {
                return ExitCode::FAILURE;
            }
        }
    }

    ExitCode::SUCCESS
}
