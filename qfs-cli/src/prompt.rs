use anyhow::{bail, Result};
use qfs::config::{available_workers, default_root_path};
use qfs::{ConfigOverrides, Query};
use std::io::{BufRead, Write};
use std::num::NonZeroUsize;

/// Asks for every search setting in turn, re-prompting until each answer is usable.
///
/// Every answer counts as explicit, including the ones that pick a default.
pub fn prompt_config<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
) -> Result<ConfigOverrides> {
    writeln!(out, " Quick File Search (QFS)\n")?;

    let pattern = loop {
        let answer = ask(input, out, "Enter the file name to search for (case insensitive): ")?;
        if answer.is_empty() {
            writeln!(out, "File name cannot be empty.")?;
            continue;
        }
        match Query::parse(&answer) {
            Ok(_) => break answer,
            Err(e) => writeln!(out, "{e}")?,
        }
    };

    let cores = available_workers();
    writeln!(out, "\nYour system has {cores} logical cores available.")?;
    let max_workers = loop {
        let answer = ask(
            input,
            out,
            &format!("Enter how many cores to use for search (1-{cores}): "),
        )?;
        match answer.parse::<usize>() {
            Ok(n) if (1..=cores.get()).contains(&n) => {
                break NonZeroUsize::new(n).unwrap_or(NonZeroUsize::MIN)
            }
            Ok(_) => writeln!(out, "Invalid number")?,
            Err(_) => writeln!(out, "Not a number.")?,
        }
    };

    let dir = ask(input, out, "Enter the starting directory (Default - root): ")?;
    let root_path = if dir.is_empty() {
        default_root_path()
    } else {
        crate::resolve_dir(&dir)?
    };

    let save_results = is_yes(&ask(input, out, "Save search results to file? (y/n, default: n): ")?);
    let print_during_search = if save_results {
        !is_no(&ask(input, out, "Print results during search? (y/n, default: y): ")?)
    } else {
        true
    };

    Ok(ConfigOverrides {
        pattern: Some(pattern),
        root_path: Some(root_path),
        max_workers: Some(max_workers),
        print_during_search: Some(print_during_search),
        save_results: Some(save_results),
        ..ConfigOverrides::default()
    })
}

/// Blocks until the user presses Enter; a closed input returns immediately.
pub fn wait_for_enter<R: BufRead, W: Write>(input: &mut R, out: &mut W) -> Result<()> {
    write!(out, "Press enter to close...")?;
    out.flush()?;
    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(())
}

fn ask<R: BufRead, W: Write>(input: &mut R, out: &mut W, question: &str) -> Result<String> {
    write!(out, "{question}")?;
    out.flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        bail!("Input closed before all questions were answered");
    }
    Ok(line.trim().to_string())
}

fn is_yes(answer: &str) -> bool {
    answer.eq_ignore_ascii_case("y")
}

fn is_no(answer: &str) -> bool {
    answer.eq_ignore_ascii_case("n")
}
