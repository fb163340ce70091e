mod demo;

use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chat_command_dispatch::{
    Command as BotCommand, DispatchConfig, DispatchOutcome, Dispatcher, FormatOptions, LevelTable,
    Message, MessageTransport, SentMessage, Services,
};
use clap::{Args, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "command-console")]
#[command(about = "Run chat-bot commands from a terminal")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Dispatch every stdin line as a chat message.
    Run(SessionArgs),
    /// Dispatch a single message; exits non-zero unless the command completes.
    Exec(ExecArgs),
    /// List registered commands and their arguments.
    List(ConfigArgs),
    /// Write the default dispatcher configuration to a file.
    InitConfig(InitConfigArgs),
}

#[derive(Debug, Args)]
struct ConfigArgs {
    /// Dispatcher configuration YAML.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct SessionArgs {
    #[command(flatten)]
    config: ConfigArgs,
    /// Author id of the simulated messages.
    #[arg(long, default_value = "console")]
    user: String,
    /// Channel id of the simulated messages.
    #[arg(long, default_value = "terminal")]
    channel: String,
    /// Group id; omitted for a direct-message session.
    #[arg(long)]
    group: Option<String>,
    /// Treat the channel as restricted (nsfw).
    #[arg(long)]
    restricted: bool,
    /// Permission level granted to the user.
    #[arg(long, default_value_t = 0)]
    level: u32,
    /// Mark the author as a bot.
    #[arg(long)]
    bot: bool,
}

#[derive(Debug, Args)]
struct ExecArgs {
    #[command(flatten)]
    session: SessionArgs,
    /// Message content, including the prefix.
    message: String,
}

#[derive(Debug, Args)]
struct InitConfigArgs {
    /// Destination file.
    #[arg(long)]
    output: PathBuf,
    /// Overwrite an existing file.
    #[arg(long)]
    force: bool,
}

/// Prints outbound messages to stdout.
#[derive(Debug, Default)]
struct ConsoleTransport {
    sent: AtomicU64,
}

#[async_trait]
impl MessageTransport for ConsoleTransport {
    async fn send(
        &self,
        channel_id: &str,
        content: &str,
        options: &FormatOptions,
    ) -> chat_command_dispatch::Result<SentMessage> {
        let id = self.sent.fetch_add(1, Ordering::Relaxed) + 1;
        let rendered = options.render(content);
        println!("[#{channel_id}] {rendered}");
        Ok(SentMessage {
            id: format!("out-{id}"),
            channel_id: channel_id.to_string(),
            content: rendered,
        })
    }
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Run(args) => run_session(args).await,
        Command::Exec(args) => run_exec(args).await,
        Command::List(args) => run_list(args),
        Command::InitConfig(args) => run_init_config(args),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn load_config(args: &ConfigArgs) -> Result<DispatchConfig, String> {
    match &args.config {
        Some(path) => DispatchConfig::load(path)
            .map_err(|e| format!("failed to load config {}: {e}", path.display())),
        None => Ok(DispatchConfig::default()),
    }
}

fn build_dispatcher(
    config: DispatchConfig,
    session: Option<&SessionArgs>,
) -> Result<Dispatcher, String> {
    let permissions = match session {
        Some(args) => LevelTable::new().with_user(&args.user, args.level),
        None => LevelTable::new(),
    };
    let mut dispatcher = Dispatcher::new(config, Services::new().with_permissions(permissions));
    for definition in demo::definitions() {
        let name = definition.name().to_string();
        dispatcher
            .register(definition)
            .map_err(|e| format!("failed to register `{name}`: {e}"))?;
    }
    Ok(dispatcher)
}

fn message(args: &SessionArgs, id: usize, content: &str) -> Message {
    let mut message = Message::new(id.to_string(), &args.user, &args.channel, content);
    message.group_id = args.group.clone();
    message.channel.restricted = args.restricted;
    message.author_is_bot = args.bot;
    message
}

fn describe(outcome: &DispatchOutcome) -> String {
    match outcome {
        DispatchOutcome::Completed => "completed".to_string(),
        DispatchOutcome::Inhibited(gate) => format!("inhibited by {gate}"),
        DispatchOutcome::InvalidArguments(errors) => {
            format!("invalid arguments: {}", errors.fields().collect::<Vec<_>>().join(", "))
        }
        DispatchOutcome::Failed(reason) => format!("failed: {reason}"),
    }
}

async fn run_session(args: SessionArgs) -> Result<(), String> {
    let dispatcher = build_dispatcher(load_config(&args.config)?, Some(&args))?;
    let transport: Arc<dyn MessageTransport> = Arc::new(ConsoleTransport::default());

    for (index, line) in io::stdin().lock().lines().enumerate() {
        let line = line.map_err(|e| format!("failed to read stdin: {e}"))?;
        if line.trim().is_empty() {
            continue;
        }
        match dispatcher
            .handle(message(&args, index + 1, &line), Arc::clone(&transport))
            .await
        {
            Ok(Some(outcome)) => debug!(input = %line, outcome = %describe(&outcome), "Dispatched"),
            Ok(None) => debug!(input = %line, "Not a command"),
            Err(err) => eprintln!("error: {err}"),
        }
    }
    Ok(())
}

async fn run_exec(args: ExecArgs) -> Result<(), String> {
    let session = &args.session;
    let dispatcher = build_dispatcher(load_config(&session.config)?, Some(session))?;
    let transport = Arc::new(ConsoleTransport::default());

    let outcome = dispatcher
        .handle(message(session, 1, &args.message), transport)
        .await
        .map_err(|e| e.to_string())?;
    match outcome {
        Some(DispatchOutcome::Completed) => Ok(()),
        Some(other) => Err(describe(&other)),
        None => Err(format!("not a command: {:?}", args.message)),
    }
}

fn run_list(args: ConfigArgs) -> Result<(), String> {
    let dispatcher = build_dispatcher(load_config(&args)?, None)?;
    let prefix = &dispatcher.config().prefix;
    for command in dispatcher.registry().iter() {
        print_command(command, prefix, 0);
    }
    Ok(())
}

fn print_command(command: &BotCommand, prefix: &str, depth: usize) {
    let options = command.options();
    let mut usage = format!("{}{}", "  ".repeat(depth), if depth == 0 { prefix } else { "" });
    usage.push_str(&options.name);
    for name in options.args.names() {
        let optional = options.args.get(name).is_some_and(|schema| schema.is_optional());
        let rest = options.args.rest_field() == Some(name);
        let label = if rest { format!("{name}...") } else { name.to_string() };
        if optional {
            usage.push_str(&format!(" [{label}]"));
        } else {
            usage.push_str(&format!(" <{label}>"));
        }
    }

    let mut notes = Vec::new();
    if !options.aliases.is_empty() {
        notes.push(format!("aliases: {}", options.aliases.join(", ")));
    }
    if let Some(requirement) = options.permission {
        notes.push(format!("level {}", requirement.level));
    }
    if options.nsfw {
        notes.push("restricted".to_string());
    }
    if !options.usage_limit.is_disabled() {
        notes.push(format!(
            "{} per {}ms",
            options.usage_limit.bucket, options.usage_limit.window_ms
        ));
    }

    let description = options.description.as_deref().unwrap_or_default();
    if notes.is_empty() {
        println!("{usage}  {description}");
    } else {
        println!("{usage}  {description} ({})", notes.join("; "));
    }
    for sub in command.subcommands() {
        print_command(sub, prefix, depth + 1);
    }
}

fn run_init_config(args: InitConfigArgs) -> Result<(), String> {
    if args.output.exists() && !args.force {
        return Err(format!(
            "{} already exists (use --force to overwrite)",
            args.output.display()
        ));
    }
    DispatchConfig::default()
        .save(&args.output)
        .map_err(|e| format!("failed to write {}: {e}", args.output.display()))?;
    println!("Wrote {}", args.output.display());
    Ok(())
}
