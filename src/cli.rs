//! Minimal flag parsing for the offline bins: `--name value` and
//! `--name=value`, nothing else.

use std::path::PathBuf;
use std::str::FromStr;

pub fn args() -> Vec<String> {
    std::env::args().skip(1).collect()
}

pub fn value(args: &[String], name: &str) -> Option<String> {
    let eq_prefix = format!("--{name}=");
    let flag = format!("--{name}");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(raw) = arg.strip_prefix(&eq_prefix) {
            let trimmed = raw.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if *arg == flag
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            return Some(next.trim().to_string());
        }
    }
    None
}

pub fn path_value(args: &[String], name: &str) -> Option<PathBuf> {
    value(args, name).map(PathBuf::from)
}

pub fn parsed<T: FromStr>(args: &[String], name: &str) -> Option<T> {
    value(args, name)?.parse::<T>().ok()
}
