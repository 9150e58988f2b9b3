use anyhow::{Context, Result, bail, format_err};
use clap::{Arg, ArgAction, ArgMatches, Command};
use dialoguer::Confirm;
use indoc::indoc;
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};

use bsod_dump::{
    DecodedField, DiagnosticsSink, DumpEvent, DumpParser, ParserSettings, Recorded,
};
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::exit;

#[derive(Copy, Clone, PartialOrd, PartialEq, Eq, Debug)]
pub enum DumpOutputFormat {
    Text,
    Json,
    Jsonl,
}

enum Input {
    Stdin,
    File(PathBuf),
}

struct BsodDump {
    parser_settings: ParserSettings,
    input: Input,
    output_format: DumpOutputFormat,
    output: Box<dyn Write>,
    verbosity_level: Option<LevelFilter>,
}

/// Writes the trace as it is produced. Write failures are kept and surfaced after the parse.
struct OutputSink<'w> {
    format: DumpOutputFormat,
    output: &'w mut dyn Write,
    error: Option<io::Error>,
}

impl OutputSink<'_> {
    fn write_recorded(&mut self, item: Recorded) {
        if self.error.is_some() {
            return;
        }

        let result = match self.format {
            DumpOutputFormat::Text => match &item {
                Recorded::Field(field) => writeln!(self.output, "{field}"),
                Recorded::Event(event) => writeln!(self.output, "{:>5} {}", event.level(), event),
            },
            DumpOutputFormat::Jsonl => serde_json::to_writer(&mut self.output, &item)
                .map_err(io::Error::from)
                .and_then(|_| writeln!(self.output)),
            // The whole report is written once parsing is done.
            DumpOutputFormat::Json => Ok(()),
        };

        if let Err(e) = result {
            self.error = Some(e);
        }
    }
}

impl DiagnosticsSink for OutputSink<'_> {
    fn field(&mut self, field: &DecodedField) {
        self.write_recorded(Recorded::Field(field.clone()));
    }

    fn event(&mut self, event: &DumpEvent) {
        self.write_recorded(Recorded::Event(event.clone()));
    }
}

impl BsodDump {
    pub fn from_cli_matches(matches: &ArgMatches) -> Result<Self> {
        let input = match matches
            .get_one::<String>("INPUT")
            .expect("This is a required argument")
            .as_str()
        {
            "-" => Input::Stdin,
            path => Input::File(PathBuf::from(path)),
        };

        let output_format = match matches
            .get_one::<String>("output-format")
            .map(String::as_str)
            .unwrap_or("text")
        {
            "json" => DumpOutputFormat::Json,
            "jsonl" => DumpOutputFormat::Jsonl,
            _ => DumpOutputFormat::Text,
        };

        let verbosity_level = match matches.get_count("verbose") {
            0 => None,
            1 => Some(LevelFilter::Info),
            2 => Some(LevelFilter::Debug),
            3 => Some(LevelFilter::Trace),
            _ => {
                eprintln!("using more than  -vvv does not affect verbosity level");
                Some(LevelFilter::Trace)
            }
        };

        let max_render_len = *matches
            .get_one::<usize>("max-render-len")
            .expect("has set default");

        let output: Box<dyn Write> = if let Some(path) = matches.get_one::<String>("output-target")
        {
            Box::new(
                Self::create_output_file(path, !matches.get_flag("no-confirm-overwrite"))
                    .with_context(|| {
                        format!("An error occurred while creating output file at `{path}`")
                    })?,
            )
        } else {
            Box::new(io::stdout())
        };

        Ok(BsodDump {
            parser_settings: ParserSettings::new()
                .max_render_len(max_render_len)
                .scan_string_table(!matches.get_flag("no-strings")),
            input,
            output_format,
            output,
            verbosity_level,
        })
    }

    /// Main entry point for `BsodDump`
    pub fn run(&mut self) -> Result<()> {
        self.try_to_initialize_logging();

        let parser = match &self.input {
            Input::File(path) => DumpParser::from_path(path)
                .with_context(|| format!("Failed to open file {}", path.display()))?,
            Input::Stdin => {
                // Decoding seeks around (the string table lives past the header), so stdin is
                // buffered in full.
                let mut buffer = Vec::new();
                io::stdin()
                    .lock()
                    .read_to_end(&mut buffer)
                    .context("Failed to read dump from stdin")?;
                DumpParser::from_buffer(buffer)
            }
        };
        let mut parser = parser.with_configuration(self.parser_settings.clone());

        let mut sink = OutputSink {
            format: self.output_format,
            output: &mut self.output,
            error: None,
        };

        let parsed = parser.parse(&mut sink);

        if let Some(e) = sink.error.take() {
            return Err(e).context("Failed to write output");
        }

        let report = parsed.context("Failed to parse dump header")?;

        if self.output_format == DumpOutputFormat::Json {
            serde_json::to_writer_pretty(&mut self.output, &report)
                .context("Failed to serialize report")?;
            writeln!(self.output)?;
        }

        self.output.flush()?;
        Ok(())
    }

    /// If `prompt` is passed, will display a confirmation prompt before overwriting files.
    fn create_output_file(path: impl AsRef<Path>, prompt: bool) -> Result<File> {
        let p = path.as_ref();

        if p.is_dir() {
            bail!(
                "There is a directory at {}, refusing to overwrite",
                p.display()
            );
        }

        if p.exists() {
            if prompt {
                match Confirm::new()
                    .with_prompt(format!(
                        "Are you sure you want to override output file at {}",
                        p.display()
                    ))
                    .default(false)
                    .interact()
                {
                    Ok(true) => Ok(File::create(p)?),
                    Ok(false) => bail!("Cancelled"),
                    Err(e) => Err(format_err!(
                        "Failed to write confirmation prompt to term caused by\n{e}"
                    )),
                }
            } else {
                Ok(File::create(p)?)
            }
        } else {
            // Ok to assume p is not an existing directory
            match p.parent() {
                Some(parent) if !parent.as_os_str().is_empty() && !parent.exists() => {
                    fs::create_dir_all(parent)?;
                    Ok(File::create(p)?)
                }
                Some(_) => Ok(File::create(p)?),
                None => bail!("Output file cannot be root."),
            }
        }
    }

    fn try_to_initialize_logging(&self) {
        if let Some(level) = self.verbosity_level {
            if let Err(e) = TermLogger::init(
                level,
                Config::default(),
                TerminalMode::Stderr,
                ColorChoice::Auto,
            ) {
                eprintln!("Failed to initialize logging: {e}");
            }
        }
    }
}

fn cli() -> Command {
    Command::new("BSOD dump parser")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Utility to decode Windows kernel crash dump headers (PAGEDUMP / PAGEDU64)")
        .arg(
            Arg::new("INPUT")
                .required(true)
                .help("Dump file to decode, `-` reads from stdin"),
        )
        .arg(
            Arg::new("output-format")
                .short('o')
                .long("format")
                .value_parser(["text", "json", "jsonl"])
                .default_value("text")
                .help("Sets the output format")
                .long_help(indoc!(
                    r#"Sets the output format:
                        "text"  - one line per decoded field, summaries inline.
                        "json"  - the full report as a single JSON document.
                        "jsonl" - one JSON object per decoded field or summary event.
                    "#
                )),
        )
        .arg(
            Arg::new("output-target")
                .long("output")
                .short('f')
                .action(ArgAction::Set)
                .help(indoc!(
                    "Writes output to the file specified instead of stdout, errors will still be printed to stderr.
                       Will ask for confirmation before overwriting files, to allow overwriting, pass `--no-confirm-overwrite`
                       Will create parent directories if needed."
                )),
        )
        .arg(
            Arg::new("no-confirm-overwrite")
                .long("no-confirm-overwrite")
                .action(ArgAction::SetTrue)
                .help("When set, will not ask for confirmation before overwriting files, useful for automation"),
        )
        .arg(
            Arg::new("max-render-len")
                .long("max-render-len")
                .value_parser(clap::value_parser!(usize))
                .default_value("32")
                .help("Number of bytes of every field rendered as hex / ASCII."),
        )
        .arg(
            Arg::new("no-strings")
                .long("no-strings")
                .action(ArgAction::SetTrue)
                .help("When set, the loaded module string table of 64-bit dumps is not scanned."),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .action(ArgAction::Count)
                .help("-v - info, -vv - debug, -vvv - trace."),
        )
}

fn main() {
    let matches = cli().get_matches();

    let result = BsodDump::from_cli_matches(&matches).and_then(|mut app| app.run());

    if let Err(e) = result {
        eprintln!("{e:?}");
        exit(1);
    }
}
