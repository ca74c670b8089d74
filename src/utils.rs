// src/utils.rs
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

/// Reads lines from a file into a vector of strings.
pub fn read_lines(path: &Path) -> io::Result<Vec<String>> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    reader.lines().collect()
}

/// Trims each line and drops blank ones, keeping file order and repeats.
pub fn normalize_domains<I, S>(lines: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    lines
        .into_iter()
        .map(|line| line.as_ref().trim().trim_end_matches('.').to_string())
        .filter(|line| !line.is_empty())
        .collect()
}

/// Domains listed in the input file, one per line.
pub fn read_domains(path: &Path) -> io::Result<Vec<String>> {
    read_lines(path).map(normalize_domains)
}
