#![deny(rust_2018_idioms)]

use argh::FromArgs;
use std::{
    env, fs,
    io::{self, BufRead, BufWriter, Write},
    path::{Path, PathBuf},
    process::ExitCode,
    str::FromStr,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

type Error = Box<dyn std::error::Error>;
type Result<T = (), E = Error> = std::result::Result<T, E>;

/// Prints the canonical event line of XML documents
#[derive(Debug, FromArgs)]
struct Args {
    /// read one escaped document per line from standard input
    #[argh(switch)]
    stdin: bool,

    /// how many bytes to buffer when writing
    #[argh(option)]
    output_buffer_size: Option<usize>,

    /// the file to read
    #[argh(positional)]
    filename: Option<PathBuf>,
}

impl Args {
    const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

    fn apply_environment_variables(&mut self) {
        if !self.stdin {
            self.filename.ambient_value("XMLREF_FILE");
        }
        self.output_buffer_size
            .ambient_value("XMLREF_OUTPUT_BUFFER_SIZE");
    }

    fn into_options(self) -> Options {
        let Self {
            stdin,
            output_buffer_size,
            filename,
        } = self;

        let input = match filename {
            Some(filename) if !stdin => Input::File(filename),
            _ => Input::Lines,
        };
        let output_buffer_size = output_buffer_size.unwrap_or(Self::DEFAULT_BUFFER_SIZE);

        Options {
            input,
            output_buffer_size,
        }
    }
}

#[derive(Debug)]
enum Input {
    File(PathBuf),
    Lines,
}

#[derive(Debug)]
struct Options {
    input: Input,
    output_buffer_size: usize,
}

impl Options {
    fn from_env_and_command_line() -> Self {
        let mut args: Args = argh::from_env();
        args.apply_environment_variables();
        args.into_options()
    }
}

trait AmbientValue {
    fn ambient_value(&mut self, env_var_name: &str);
}

impl<T> AmbientValue for Option<T>
where
    T: FromStr,
{
    fn ambient_value(&mut self, env_var_name: &str) {
        if self.is_none() {
            if let Ok(v) = env::var(env_var_name) {
                *self = v.parse().ok();
            }
        }
    }
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let Options {
        input,
        output_buffer_size,
    } = Options::from_env_and_command_line();

    let out = io::stdout();
    let out = out.lock();
    let out = BufWriter::with_capacity(output_buffer_size, out);

    match input {
        Input::File(filename) => {
            let accepted = one_file(&filename, out)?;
            Ok(if accepted {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Input::Lines => {
            let count = each_line(io::stdin().lock(), out)?;
            debug!(count, "processed lines");
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn one_file(filename: &Path, mut out: impl Write) -> Result<bool> {
    let accepted = match fs::read_to_string(filename) {
        Ok(source) => xmlref::write_result(&mut out, &source)?,
        Err(e) => {
            writeln!(out, "Error: unable to read {}: {}", filename.display(), e)?;
            false
        }
    };
    out.flush()?;

    Ok(accepted)
}

fn each_line(input: impl BufRead, mut out: impl Write) -> Result<usize> {
    let mut count = 0;

    for line in input.split(b'\n') {
        let line = line?;
        let line = String::from_utf8_lossy(&line);
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let source = xmlref::decode_line(line);
        xmlref::write_result(&mut out, &source)?;
        out.flush()?;
        count += 1;
    }

    Ok(count)
}
