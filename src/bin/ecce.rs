use std::env;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process;

use ecce::cli::{decode_hex, estimate_capacity, parse_size, DEFAULT_CAPACITY};
use ecce::{Console, EcceError, Editor, FileNotes, Flow, Interrupt, Session, Target};

fn usage() {
    eprintln!(
        "Usage: ecce [-from] <in|-> [[-to] <out|->] [-log <file>] \
         [-command <cmds> | -hex-command <hex>] [-size <n>[K|M]]\n\n\
         Edits <in> and writes the result to <out> (default: back to <in>).\n\
         With '-' as input the text is read from stdin and -command is required;\n\
         commands then come from /dev/tty when there is one.\n\
         Commands given with -command run first; the rest are read interactively.\n\
         '%c' saves and exits, '%a' exits without saving."
    );
}

#[derive(Default)]
struct Args {
    from: Option<String>,
    to: Option<String>,
    log: Option<String>,
    command: Option<String>,
    size: Option<usize>,
}

fn parse_args(args: &[String]) -> Result<Option<Args>, EcceError> {
    let mut parsed = Args::default();
    let mut idx = 1;
    while idx < args.len() {
        let arg = args[idx].as_str();
        if arg == "--help" || arg == "-h" {
            return Ok(None);
        }
        if arg.len() > 1 && arg.starts_with('-') {
            let flag = arg.strip_prefix("--").unwrap_or(&arg[1..]);
            let value = args
                .get(idx + 1)
                .cloned()
                .ok_or_else(|| EcceError::Usage(format!("missing value for {arg}")))?;
            match flag {
                "from" => parsed.from = Some(value),
                "to" => parsed.to = Some(value),
                "log" => parsed.log = Some(value),
                "command" | "hex-command" => {
                    if parsed.command.is_some() {
                        return Err(EcceError::Usage(
                            "only one -command \"...\" or -hex-command \"...\" is allowed".to_string(),
                        ));
                    }
                    parsed.command = Some(if flag == "command" { value } else { decode_hex(&value)? });
                }
                "size" => parsed.size = Some(parse_size(&value)?),
                _ => return Err(EcceError::Usage(format!("unknown option '{arg}'"))),
            }
            idx += 2;
            continue;
        }
        if parsed.from.is_none() {
            parsed.from = Some(arg.to_string());
        } else if parsed.to.is_none() {
            parsed.to = Some(arg.to_string());
        } else if parsed.log.is_none() {
            parsed.log = Some(arg.to_string());
        } else {
            return Err(EcceError::Usage(format!("unexpected argument '{arg}'")));
        }
        idx += 1;
    }
    Ok(Some(parsed))
}

fn is_stdio(name: &str) -> bool {
    name == "-"
}

/// Command input when the text itself comes from stdin.
fn terminal_input() -> Box<dyn BufRead> {
    match File::open("/dev/tty") {
        Ok(tty) => {
            eprintln!("ecce: using /dev/tty for command input");
            Box::new(BufReader::new(tty))
        }
        Err(e) => {
            log::debug!("no terminal: {e}");
            eprintln!("ecce: warning - no command input stream");
            Box::new(io::empty())
        }
    }
}

fn load(from: &str) -> Result<String, EcceError> {
    let bytes = if is_stdio(from) {
        let mut bytes = Vec::new();
        io::stdin().read_to_end(&mut bytes)?;
        bytes
    } else {
        fs::read(from).map_err(|e| {
            log::debug!("cannot read {from}: {e}");
            EcceError::NotFound(from.to_string())
        })?
    };
    String::from_utf8(bytes).map_err(|_| EcceError::Encoding)
}

fn run(args: Args) -> Result<Flow, EcceError> {
    let from = args.from.ok_or(EcceError::NoInput)?;
    let stdin_text = is_stdio(&from);
    if stdin_text && args.command.is_none() {
        return Err(EcceError::Usage(
            "\"-command '...'\" is required when the input file is stdin".to_string(),
        ));
    }

    let text = load(&from)?;
    let capacity = match args.size {
        Some(size) => size,
        None if stdin_text => DEFAULT_CAPACITY.max(ecce::cli::capacity_for(text.len() as u64)),
        None => estimate_capacity(Path::new(&from)),
    };
    log::debug!("buffer of {capacity} cells for {} bytes", text.len());

    let interrupt = Interrupt::new();
    let raised = interrupt.clone();
    if let Err(e) = ctrlc::set_handler(move || raised.raise()) {
        log::warn!("cannot install interrupt handler: {e}");
    }

    let mut editor = Editor::with_text(capacity, &text)?;
    editor.set_interrupt(interrupt);

    let input: Box<dyn BufRead> = if stdin_text {
        terminal_input()
    } else {
        Box::new(BufReader::new(io::stdin()))
    };
    let mut console = Console::new(input, Box::new(io::stderr()), Box::new(FileNotes::in_temp_dir()));
    if let Some(log_path) = &args.log {
        match File::create(log_path) {
            Ok(f) => console = console.with_log(Box::new(f)),
            Err(e) => {
                log::debug!("cannot create {log_path}: {e}");
                eprintln!("ecce: Warning - cannot create \"{log_path}\"");
            }
        }
    }
    if let Some(command) = &args.command {
        console.queue(command);
    }

    let out = args.to.unwrap_or(from);
    let target = if is_stdio(&out) {
        Target::Stdout
    } else {
        Target::Path(PathBuf::from(out))
    };

    eprintln!("Ecce");
    let mut session = Session::new(editor, console, target);
    session.run()
}

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let parsed = match parse_args(&args) {
        Ok(Some(a)) => a,
        Ok(None) => {
            usage();
            return;
        }
        Err(e) => {
            eprintln!("ecce: {e}");
            usage();
            process::exit(e.exit_code());
        }
    };
    if parsed.from.is_none() {
        usage();
        process::exit(EcceError::NoInput.exit_code());
    }

    match run(parsed) {
        Ok(Flow::Closed) => {}
        Ok(flow) => process::exit(flow.exit_code()),
        Err(e) => {
            match &e {
                EcceError::NotFound(_) | EcceError::TooLarge(_) => eprintln!("{e}"),
                _ => eprintln!("ecce: {e}"),
            }
            process::exit(e.exit_code());
        }
    }
}
