/// Flags that consume the following argument as their value.
const VALUE_FLAGS: &[&str] = &[
    "--api-url",
    "--config",
    "--role",
    "--goal",
    "--backstory",
    "--llm",
    "--tools",
    "--description",
    "--expected-output",
    "--agent",
    "--agents",
    "--tasks",
    "--process",
    "--manager-llm",
    "--inputs",
];

pub(crate) fn parse_string_flag(args: &[String], flag: &str) -> Option<String> {
    let mut i = 1;
    while i < args.len() {
        if args[i] == flag {
            if i + 1 < args.len() {
                return Some(args[i + 1].clone());
            }
            return None;
        }
        i += 1;
    }
    None
}

pub(crate) fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().skip(1).any(|a| a == flag)
}

/// Comma-separated flag value, trimmed, blanks dropped.
pub(crate) fn parse_list_flag(args: &[String], flag: &str) -> Vec<String> {
    parse_string_flag(args, flag)
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Everything after the program name that is neither a flag nor a flag value.
pub(crate) fn positional_args(args: &[String]) -> Vec<String> {
    let mut out = Vec::new();
    let mut i = 1;
    while i < args.len() {
        let arg = args[i].as_str();
        if VALUE_FLAGS.contains(&arg) {
            i += 2;
        } else if arg.starts_with('-') && arg.len() > 1 {
            i += 1;
        } else {
            out.push(args[i].clone());
            i += 1;
        }
    }
    out
}

pub(crate) fn verbosity(args: &[String]) -> u8 {
    args.iter()
        .skip(1)
        .map(|a| match a.as_str() {
            "-v" | "--verbose" => 1,
            "-vv" => 2,
            _ => 0,
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(s: &str) -> Vec<String> {
        s.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn reads_flag_values() {
        let args = argv("crewdeck tasks create --agent Writer --description Draft");
        assert_eq!(parse_string_flag(&args, "--agent").as_deref(), Some("Writer"));
        assert_eq!(parse_string_flag(&args, "--missing"), None);
    }

    #[test]
    fn trailing_flag_without_value_is_none() {
        let args = argv("crewdeck kickoff c1 --inputs");
        assert_eq!(parse_string_flag(&args, "--inputs"), None);
    }

    #[test]
    fn list_flag_splits_and_trims() {
        let args = argv("crewdeck crews create --agents Researcher,,Writer, --tasks t1");
        assert_eq!(parse_list_flag(&args, "--agents"), vec!["Researcher", "Writer"]);
        assert!(parse_list_flag(&args, "--nothing").is_empty());
    }

    #[test]
    fn positional_skips_flags_and_values() {
        let args = argv("crewdeck -v kickoff --api-url http://x c1 c2 --inputs {} --verbose");
        assert_eq!(positional_args(&args), vec!["kickoff", "c1", "c2"]);
    }

    #[test]
    fn verbosity_accumulates() {
        assert_eq!(verbosity(&argv("crewdeck ping")), 0);
        assert_eq!(verbosity(&argv("crewdeck -v ping --verbose")), 2);
        assert_eq!(verbosity(&argv("crewdeck -vv ping")), 2);
    }
}
