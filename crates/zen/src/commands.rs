#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlashCommand {
    Files,
    Grep,
    Buffers,
    Word,
    Recent,
    Git,
    Resume,
    Open(String),
    New,
    Scratch,
    Close,
    Cursor { line: usize, column: usize },
    Match(usize),
    List,
    Help,
    Quit,
    /// Known command with missing or malformed arguments.
    Usage(&'static str),
    Unknown(String),
}

pub const HELP_TEXT: &str = "Commands: /files, /grep, /buffers, /word, /recent, /git, /resume, \
/open <path> (/e), /new, /scratch, /close, /cursor <line> <col>, /cc <n>, /ls, /help, /quit";

pub fn parse_slash_command(input: &str) -> Option<SlashCommand> {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return None;
    }

    let (command, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim()),
        None => (trimmed, ""),
    };

    let parsed = match command {
        "/files" => SlashCommand::Files,
        "/grep" => SlashCommand::Grep,
        "/buffers" => SlashCommand::Buffers,
        "/word" => SlashCommand::Word,
        "/recent" => SlashCommand::Recent,
        "/git" => SlashCommand::Git,
        "/resume" => SlashCommand::Resume,
        "/open" | "/e" if rest.is_empty() => SlashCommand::Usage("/open <path>"),
        "/open" | "/e" => SlashCommand::Open(rest.to_string()),
        "/new" => SlashCommand::New,
        "/scratch" => SlashCommand::Scratch,
        "/close" => SlashCommand::Close,
        "/cursor" => parse_cursor(rest).unwrap_or(SlashCommand::Usage("/cursor <line> <col>")),
        "/cc" => rest
            .parse()
            .ok()
            .filter(|number| *number > 0)
            .map_or(SlashCommand::Usage("/cc <n>"), SlashCommand::Match),
        "/ls" => SlashCommand::List,
        "/help" => SlashCommand::Help,
        "/quit" | "/q" => SlashCommand::Quit,
        _ => SlashCommand::Unknown(command.to_string()),
    };

    Some(parsed)
}

fn parse_cursor(rest: &str) -> Option<SlashCommand> {
    let mut parts = rest.split_whitespace();
    let line = parts.next()?.parse().ok()?;
    let column = match parts.next() {
        Some(column) => column.parse().ok()?,
        None => 1,
    };
    if parts.next().is_some() {
        return None;
    }
    Some(SlashCommand::Cursor { line, column })
}
