//! Pairwise Alignment
//!
//! Realignment needs a gapped alignment of two sequences. Two implementations:
//!
//! - [`GlobalAligner`]: in-process Needleman-Wunsch with linear gap cost.
//! - [`KalignAligner`]: shells out to a `kalign` binary and reads its FASTA output.
use crate::error::AlignError;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::Builder;

pub trait Aligner {
    /// Align two sequences, returning them gapped to equal length in input order.
    fn align(&self, sequences: &[&str; 2]) -> Result<(String, String), AlignError>;
}

/// Records `(description, sequence)` in file order. Sequence lines are concatenated.
pub fn parse_fasta(text: &str) -> Vec<(String, String)> {
    let mut records: Vec<(String, String)> = Vec::new();
    for line in text.lines().map(str::trim) {
        if line.is_empty() {
            continue;
        }
        if let Some(description) = line.strip_prefix('>') {
            records.push((description.to_string(), String::new()));
        } else if let Some((_, sequence)) = records.last_mut() {
            sequence.push_str(line);
        }
    }
    records
}

/// A3M records with insertions (lowercase) removed, so all rows share the
/// query's column count.
pub fn parse_a3m(text: &str) -> Vec<String> {
    parse_fasta(text)
        .into_iter()
        .map(|(_, sequence)| {
            sequence
                .chars()
                .filter(|c| !c.is_ascii_lowercase())
                .collect()
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TracebackDir {
    Diag,
    Up,
    Left,
    Stop,
}

struct TracebackMatrix {
    data: Vec<TracebackDir>,
    cols: usize,
}

impl TracebackMatrix {
    fn new(rows: usize, cols: usize) -> Self {
        Self {
            data: vec![TracebackDir::Stop; rows * cols],
            cols,
        }
    }

    #[inline]
    fn get(&self, row: usize, col: usize) -> TracebackDir {
        self.data[row * self.cols + col]
    }

    #[inline]
    fn set(&mut self, row: usize, col: usize, dir: TracebackDir) {
        self.data[row * self.cols + col] = dir;
    }
}

/// Global alignment with a match/mismatch score and a linear gap penalty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobalAligner {
    pub match_score: i32,
    pub mismatch_score: i32,
    pub gap_score: i32,
}

impl Default for GlobalAligner {
    fn default() -> Self {
        Self {
            match_score: 1,
            mismatch_score: -1,
            gap_score: -1,
        }
    }
}

impl Aligner for GlobalAligner {
    fn align(&self, sequences: &[&str; 2]) -> Result<(String, String), AlignError> {
        let a: Vec<char> = sequences[0].chars().collect();
        let b: Vec<char> = sequences[1].chars().collect();
        let (rows, cols) = (a.len() + 1, b.len() + 1);

        let mut matrix = TracebackMatrix::new(rows, cols);
        let mut previous: Vec<i32> = (0..cols as i32).map(|j| j * self.gap_score).collect();
        let mut current = vec![0; cols];
        for j in 1..cols {
            matrix.set(0, j, TracebackDir::Left);
        }

        for i in 1..rows {
            current[0] = i as i32 * self.gap_score;
            matrix.set(i, 0, TracebackDir::Up);
            for j in 1..cols {
                let substitution = if a[i - 1] == b[j - 1] {
                    self.match_score
                } else {
                    self.mismatch_score
                };
                let diag = previous[j - 1] + substitution;
                let up = previous[j] + self.gap_score;
                let left = current[j - 1] + self.gap_score;
                // ties prefer diagonal, then up
                let (score, dir) = if diag >= up && diag >= left {
                    (diag, TracebackDir::Diag)
                } else if up >= left {
                    (up, TracebackDir::Up)
                } else {
                    (left, TracebackDir::Left)
                };
                current[j] = score;
                matrix.set(i, j, dir);
            }
            std::mem::swap(&mut previous, &mut current);
        }

        let mut aligned_a = Vec::with_capacity(rows + cols);
        let mut aligned_b = Vec::with_capacity(rows + cols);
        let (mut i, mut j) = (a.len(), b.len());
        loop {
            match matrix.get(i, j) {
                TracebackDir::Diag => {
                    aligned_a.push(a[i - 1]);
                    aligned_b.push(b[j - 1]);
                    i -= 1;
                    j -= 1;
                }
                TracebackDir::Up => {
                    aligned_a.push(a[i - 1]);
                    aligned_b.push('-');
                    i -= 1;
                }
                TracebackDir::Left => {
                    aligned_a.push('-');
                    aligned_b.push(b[j - 1]);
                    j -= 1;
                }
                TracebackDir::Stop => break,
            }
        }
        Ok((
            aligned_a.into_iter().rev().collect(),
            aligned_b.into_iter().rev().collect(),
        ))
    }
}

/// External `kalign` binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KalignAligner {
    binary_path: PathBuf,
}

impl KalignAligner {
    /// Shortest sequence kalign will align.
    pub const MIN_SEQUENCE_LENGTH: usize = 6;

    pub fn new(binary_path: impl Into<PathBuf>) -> Self {
        Self {
            binary_path: binary_path.into(),
        }
    }
}

impl Aligner for KalignAligner {
    fn align(&self, sequences: &[&str; 2]) -> Result<(String, String), AlignError> {
        for sequence in sequences {
            if sequence.len() < Self::MIN_SEQUENCE_LENGTH {
                return Err(AlignError::SequenceTooShort(sequence.len()));
            }
        }
        let io_failed = |e: std::io::Error| AlignError::Failed(e.to_string());

        let input = Builder::new()
            .suffix(".fasta")
            .tempfile()
            .map_err(io_failed)?;
        let fasta: String = sequences
            .iter()
            .enumerate()
            .map(|(i, sequence)| format!(">sequence {}\n{}\n", i, sequence))
            .collect();
        fs::write(&input, fasta).map_err(io_failed)?;
        let output = Builder::new()
            .suffix(".a3m")
            .tempfile()
            .map_err(io_failed)?;

        log::debug!("Launching {} for realignment", self.binary_path.display());
        let result = Command::new(&self.binary_path)
            .arg("-i")
            .arg(input.path())
            .arg("-o")
            .arg(output.path())
            .arg("-format")
            .arg("fasta")
            .output()
            .map_err(io_failed)?;
        if !result.status.success() {
            return Err(AlignError::Failed(format!(
                "kalign exited with {}: {}",
                result.status,
                String::from_utf8_lossy(&result.stderr).trim()
            )));
        }

        let text = fs::read_to_string(output.path()).map_err(io_failed)?;
        let mut aligned = parse_a3m(&text).into_iter();
        match (aligned.next(), aligned.next(), aligned.next()) {
            (Some(a), Some(b), None) => Ok((a, b)),
            _ => Err(AlignError::UnexpectedOutput(parse_a3m(&text).len())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_identical() {
        let (a, b) = GlobalAligner::default().align(&["MKVLA", "MKVLA"]).unwrap();
        assert_eq!((a.as_str(), b.as_str()), ("MKVLA", "MKVLA"));
    }

    #[test]
    fn test_global_insertion() {
        let (a, b) = GlobalAligner::default().align(&["MKVLAG", "MKLAG"]).unwrap();
        assert_eq!(a, "MKVLAG");
        assert_eq!(b, "MK-LAG");
    }

    #[test]
    fn test_global_empty() {
        let (a, b) = GlobalAligner::default().align(&["", "MK"]).unwrap();
        assert_eq!((a.as_str(), b.as_str()), ("--", "MK"));
    }

    #[test]
    fn test_parse_a3m() {
        let text = ">query\nMKV-L\n>hit one\nMKaaV-\nL\n";
        assert_eq!(parse_a3m(text), ["MKV-L", "MKV-L"]);
        let records = parse_fasta(text);
        assert_eq!(records[1].0, "hit one");
    }

    #[test]
    fn test_kalign_short_sequence() {
        let aligner = KalignAligner::new("kalign");
        assert_eq!(
            aligner.align(&["MKV", "MKVLAG"]),
            Err(AlignError::SequenceTooShort(3))
        );
    }

    #[test]
    fn test_kalign_missing_binary() {
        let aligner = KalignAligner::new("/nonexistent/kalign");
        assert!(matches!(
            aligner.align(&["MKVLAG", "MKVLAG"]),
            Err(AlignError::Failed(_))
        ));
    }
}
