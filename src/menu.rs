//! Interactive edition picker used when no `--edition` flag is given.

use std::io::{BufRead, Write};

use crate::config::Edition;
use crate::Result;

/// Prompts until a valid choice is entered.
/// Returns `None` when the user picks `0` or the input ends.
pub fn select_edition<R: BufRead, W: Write>(mut input: R, mut out: W) -> Result<Option<Edition>> {
    let editions = Edition::ALL;
    let mut line = String::new();
    loop {
        writeln!(out, "Select Quran edition:")?;
        for (i, edition) in editions.iter().enumerate() {
            writeln!(out, "{}: {edition}", i + 1)?;
        }
        writeln!(out, "0: Exit")?;
        write!(out, "Enter the number of the edition: ")?;
        out.flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        match line.trim().parse::<usize>() {
            Ok(0) => {
                writeln!(out, "Goodbye!")?;
                return Ok(None);
            }
            Ok(n) if n <= editions.len() => return Ok(Some(editions[n - 1])),
            Ok(_) => writeln!(
                out,
                "Invalid choice. Please enter a number between 1 and {}",
                editions.len()
            )?,
            Err(_) => writeln!(out, "Please enter a valid number")?,
        }
    }
}
