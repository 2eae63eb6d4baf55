use clap::{Parser, Subcommand};
use knot::form::{Control, FormKind, Ui};
use knot::{
    FormOptions, InputBox, Interface, ParseConfig, TypeId, TypeManager, Value, load_interface,
    lucky, parse_arguments, render_error, render_with, text, wire,
};
use miette::{IntoDiagnostic, Result, miette};
use rand::SeedableRng;
use rand::rngs::StdRng;
use reedline::{DefaultPrompt, DefaultPromptSegment, Reedline, Signal};
use std::io::{BufRead, BufReader, StdinLock};
use std::path::PathBuf;
use std::time::Instant;
use tracing::debug;

/// Knot - encode, decode and fill in values of an interface description
#[derive(Parser, Debug)]
#[command(name = "knot")]
#[command(about = "Work with values of an interface description", long_about = None)]
struct Args {
    /// Interface description (JSON)
    interface: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the service's methods and their signatures
    Methods,

    /// Generate random arguments for a method
    Lucky {
        method: String,

        /// Seed for reproducible output
        #[arg(long)]
        seed: Option<u64>,

        /// Generate return values instead of arguments
        #[arg(long)]
        returns: bool,
    },

    /// Encode an argument list such as `(42, opt "x", vec {1; 2})`
    Encode {
        method: String,

        /// Argument list in text syntax, as printed by `lucky` and `decode`
        args: String,

        #[arg(long)]
        returns: bool,
    },

    /// Decode a hex message
    Decode {
        method: String,

        hex: String,

        #[arg(long)]
        returns: bool,
    },

    /// Fill in the arguments of a method interactively
    Form {
        method: String,

        /// Fill empty inputs with random values
        #[arg(long)]
        lucky: bool,

        #[arg(long)]
        seed: Option<u64>,

        #[arg(long)]
        returns: bool,
    },
}

/// Where form answers come from: a line editor or piped stdin.
enum Answers<'a> {
    Editor(Box<Reedline>),
    Lines(std::io::Lines<BufReader<StdinLock<'a>>>),
}

impl Answers<'_> {
    fn open() -> Self {
        if atty::is(atty::Stream::Stdin) {
            Answers::Editor(Box::new(Reedline::create()))
        } else {
            Answers::Lines(BufReader::new(std::io::stdin().lock()).lines())
        }
    }

    /// Ask a question. `None` means the user is done.
    fn ask(&mut self, question: &str) -> Result<Option<String>> {
        match self {
            Answers::Editor(editor) => {
                let prompt = DefaultPrompt::new(
                    DefaultPromptSegment::Basic(question.to_string()),
                    DefaultPromptSegment::Empty,
                );
                match editor.read_line(&prompt).into_diagnostic()? {
                    Signal::Success(buffer) => Ok(Some(buffer)),
                    Signal::CtrlD | Signal::CtrlC => Ok(None),
                }
            }
            Answers::Lines(lines) => lines.next().transpose().into_diagnostic(),
        }
    }

    fn require(&mut self, question: &str) -> Result<String> {
        self.ask(question)?
            .ok_or_else(|| miette!("input ended before the form was complete"))
    }
}

fn seeded(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

fn signature(iface: &Interface, method: &str, returns: bool) -> Result<Vec<TypeId>, knot::Error> {
    let (_, func) = iface
        .method(method)
        .map_err(|error| knot::Error::Interface {
            error,
            json: String::new(),
        })?;
    Ok(if returns {
        func.rets.clone()
    } else {
        func.args.clone()
    })
}

/// Walk a form, asking for every leaf and control. Rejected leaves are
/// asked again.
fn ask_form(
    mgr: &TypeManager,
    input: &mut InputBox,
    path: &str,
    options: &FormOptions,
    lucky: bool,
    answers: &mut Answers<'_>,
) -> Result<()> {
    let kind = match &input.ui {
        Ui::Empty => return Ok(()),
        Ui::Form(form) => form.kind.clone(),
        Ui::Leaf(leaf) => {
            let question = format!("{} : {} = ", path, leaf.placeholder);
            loop {
                let answer = answers.require(&question)?;
                input.set_text(&answer).into_diagnostic()?;
                if lucky && answer.is_empty() {
                    return Ok(());
                }
                input.parse(mgr).into_diagnostic()?;
                match &input.rejection {
                    Some(rejection) => {
                        eprintln!("{}", rejection.message);
                        input.focus();
                    }
                    None => return Ok(()),
                }
            }
        }
    };

    match kind {
        FormKind::Record(fields) => {
            for (i, field) in fields.iter().enumerate() {
                let child_path = format!("{}.{}", path, field.name);
                if let Some(child) = input.child_mut(i) {
                    ask_form(mgr, child, &child_path, options, lucky, answers)?;
                }
            }
        }
        FormKind::Variant(fields) => {
            let names: Vec<&str> = fields.iter().map(|f| f.name.as_str()).collect();
            let question = format!("{} ({}) = ", path, names.join(" | "));
            let index = loop {
                let answer = answers.require(&question)?;
                match names.iter().position(|n| *n == answer.trim()) {
                    Some(index) => break index,
                    None => eprintln!("choose one of: {}", names.join(", ")),
                }
            };
            input.select(mgr, options, index).into_diagnostic()?;
            if let Some(child) = input.child_mut(0) {
                let child_path = format!("{}.{}", path, names[index]);
                ask_form(mgr, child, &child_path, options, lucky, answers)?;
            }
        }
        FormKind::Opt(_) => {
            let answer = answers.require(&format!("{} present? [y/N] ", path))?;
            let checked = matches!(answer.trim(), "y" | "Y" | "yes");
            input.set_checked(mgr, options, checked).into_diagnostic()?;
            if let Some(child) = input.child_mut(0) {
                ask_form(mgr, child, path, options, lucky, answers)?;
            }
        }
        FormKind::Vec(_) => {
            let answer = answers.require(&format!("{} length = ", path))?;
            input.set_length(mgr, options, &answer).into_diagnostic()?;
            let len = input.children().len();
            if let Some(Control::Length(text)) = input.form().map(|f| &f.control) {
                debug!(requested = %text, len, "vector length");
            }
            for i in 0..len {
                let child_path = format!("{}[{}]", path, i);
                if let Some(child) = input.child_mut(i) {
                    ask_form(mgr, child, &child_path, options, lucky, answers)?;
                }
            }
        }
    }
    Ok(())
}

fn run_form(
    iface: &Interface,
    types: &[TypeId],
    lucky: bool,
    seed: Option<u64>,
) -> Result<()> {
    let mgr = iface.manager();
    let options = FormOptions::default();
    let mut answers = Answers::open();
    let mut rng = seeded(seed);
    let config = ParseConfig { random: lucky };

    let mut values = Vec::with_capacity(types.len());
    for (i, &ty) in types.iter().enumerate() {
        let mut input = render_with(mgr, ty, &options).into_diagnostic()?;
        ask_form(mgr, &mut input, &format!("arg{}", i), &options, lucky, &mut answers)?;
        match input
            .parse_with(mgr, &config, &options, &mut rng)
            .into_diagnostic()?
        {
            Some(value) => values.push(value),
            None => return Err(miette!("argument {} was rejected", i)),
        }
    }

    let start = Instant::now();
    let bytes = wire::encode(mgr, types, &values).into_diagnostic()?;
    let elapsed = start.elapsed();
    println!("{}", text::args_to_text(mgr, types, &values).into_diagnostic()?);
    println!("{}", hex::encode(bytes));
    println!("encoded in {:?}", elapsed);
    Ok(())
}

fn run(iface: &Interface, command: Command) -> Result<Result<(), knot::Error>> {
    let mgr = iface.manager();
    match command {
        Command::Methods => {
            for (name, ty) in iface.methods() {
                println!("{} : {}", name, mgr.display(ty));
            }
        }
        Command::Lucky {
            method,
            seed,
            returns,
        } => {
            let types = match signature(iface, &method, returns) {
                Ok(types) => types,
                Err(e) => return Ok(Err(e)),
            };
            let mut rng = seeded(seed);
            let values = types
                .iter()
                .map(|&ty| lucky(mgr, ty, &mut rng, &Default::default()))
                .collect::<std::result::Result<Vec<Value>, _>>()
                .map_err(knot::Error::Type);
            let values = match values {
                Ok(values) => values,
                Err(e) => return Ok(Err(e)),
            };
            println!("{}", text::args_to_text(mgr, &types, &values).into_diagnostic()?);
            match wire::encode(mgr, &types, &values) {
                Ok(bytes) => println!("{}", hex::encode(bytes)),
                Err(e) => return Ok(Err(e.into())),
            }
        }
        Command::Encode {
            method,
            args,
            returns,
        } => {
            let result = signature(iface, &method, returns).and_then(|types| {
                let values = parse_arguments(mgr, &types, &args)?;
                Ok(wire::encode(mgr, &types, &values)?)
            });
            match result {
                Ok(bytes) => println!("{}", hex::encode(bytes)),
                Err(e) => return Ok(Err(e)),
            }
        }
        Command::Decode {
            method,
            hex: input,
            returns,
        } => {
            let bytes = hex::decode(input.trim())
                .map_err(|e| miette!("invalid hex input: {}", e))?;
            let result = signature(iface, &method, returns).and_then(|types| {
                let values = wire::decode(mgr, &types, &bytes)?;
                Ok((types, values))
            });
            match result {
                Ok((types, values)) => {
                    println!("{}", text::args_to_text(mgr, &types, &values).into_diagnostic()?)
                }
                Err(e) => return Ok(Err(e)),
            }
        }
        Command::Form {
            method,
            lucky,
            seed,
            returns,
        } => {
            let types = match signature(iface, &method, returns) {
                Ok(types) => types,
                Err(e) => return Ok(Err(e)),
            };
            run_form(iface, &types, lucky, seed)?;
        }
    }
    Ok(Ok(()))
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging subscriber
    use tracing_subscriber::{EnvFilter, fmt};

    // Use RUST_LOG environment variable to control log level
    // Default to WARN if not set
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("warn"))
        .into_diagnostic()?;

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let json = std::fs::read_to_string(&args.interface)
        .map_err(|e| miette!("cannot read {}: {}", args.interface.display(), e))?;
    let iface = match load_interface(&json) {
        Ok(iface) => iface,
        Err(e) => {
            render_error(&e);
            std::process::exit(1);
        }
    };
    debug!(path = %args.interface.display(), "loaded interface");

    if let Err(e) = run(&iface, args.command)? {
        render_error(&e);
        std::process::exit(1);
    }
    Ok(())
}
