use clap::Command;
use std::ffi::OsString;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Arity {
    Flag,
    OptionalValue,
    Value,
}

/// Splits raw arguments into the ones `command` understands and the rest.
/// Unknown flags, their values and stray positionals end up in the second
/// list so that the parse never fails on them.
pub fn split_known_args<I, T>(mut command: Command, raw: I) -> (Vec<OsString>, Vec<OsString>)
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    command.build();

    let mut raw = raw.into_iter().map(Into::into).peekable();
    let mut known = Vec::new();
    let mut ignored = Vec::new();

    if let Some(bin) = raw.next() {
        known.push(bin);
    }

    while let Some(arg) = raw.next() {
        let Some(text) = arg.to_str() else {
            ignored.push(arg);
            continue;
        };

        if text == "--" {
            ignored.extend(raw.by_ref());
            break;
        }

        let (arity, inline_value) = match classify(&command, text) {
            Some(found) => found,
            None => {
                let takes_next = text.starts_with('-') && !text.contains('=');
                ignored.push(arg);
                if takes_next && raw.peek().is_some_and(|next| !looks_like_flag(next)) {
                    ignored.extend(raw.next());
                }
                continue;
            }
        };

        known.push(arg);
        if inline_value {
            continue;
        }
        match arity {
            Arity::Flag => {}
            Arity::Value => known.extend(raw.next()),
            Arity::OptionalValue => {
                if raw.peek().is_some_and(|next| !looks_like_flag(next)) {
                    known.extend(raw.next());
                }
            }
        }
    }

    (known, ignored)
}

fn classify(command: &Command, text: &str) -> Option<(Arity, bool)> {
    if let Some(long) = text.strip_prefix("--") {
        let (name, inline_value) = match long.split_once('=') {
            Some((name, _)) => (name, true),
            None => (long, false),
        };
        if name == "help" {
            return Some((Arity::Flag, false));
        }
        let arg = command
            .get_arguments()
            .find(|arg| arg.get_long() == Some(name))?;
        return Some((arity_of(arg), inline_value));
    }

    let short = text.strip_prefix('-')?;
    let mut chars = short.chars();
    let (Some(ch), None) = (chars.next(), chars.next()) else {
        return None;
    };
    if ch == 'h' {
        return Some((Arity::Flag, false));
    }
    let arg = command
        .get_arguments()
        .find(|arg| arg.get_short() == Some(ch))?;
    Some((arity_of(arg), false))
}

fn arity_of(arg: &clap::Arg) -> Arity {
    if !arg.get_action().takes_values() {
        return Arity::Flag;
    }
    match arg.get_num_args() {
        Some(range) if range.min_values() == 0 => Arity::OptionalValue,
        _ => Arity::Value,
    }
}

fn looks_like_flag(value: &OsString) -> bool {
    value
        .to_str()
        .is_some_and(|s| s.starts_with('-') && s.len() > 1)
}
