use std::str::FromStr;

use super::error::SelectionError;

/// The events a user asked for.
///
/// Parsed from the display expression used on the command line and in configuration files:
///
/// - `all`: every event in the file
/// - `12`: a single event
/// - `3:10`: events 3 through 9 (the stop is exclusive)
/// - `1|76|356`: exactly these events in this order, repeats allowed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventSelection {
    All,
    Single(usize),
    Range(usize, usize),
    List(Vec<usize>),
}

impl Default for EventSelection {
    fn default() -> Self {
        Self::Single(0)
    }
}

fn parse_index(expr: &str, s: &str) -> Result<usize, SelectionError> {
    s.trim()
        .parse::<usize>()
        .map_err(|_| SelectionError::Parse(expr.to_string()))
}

impl FromStr for EventSelection {
    type Err = SelectionError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let expr = s.trim();
        if expr.eq_ignore_ascii_case("all") {
            Ok(Self::All)
        } else if let Some((start, stop)) = expr.split_once(':') {
            let start = parse_index(s, start)?;
            let stop = parse_index(s, stop)?;
            if start > stop {
                return Err(SelectionError::InvalidRange(start, stop));
            }
            Ok(Self::Range(start, stop))
        } else if expr.contains('|') {
            let indices = expr
                .split('|')
                .map(|item| parse_index(s, item))
                .collect::<Result<Vec<usize>, SelectionError>>()?;
            Ok(Self::List(indices))
        } else {
            Ok(Self::Single(parse_index(s, expr)?))
        }
    }
}

impl std::fmt::Display for EventSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Single(index) => write!(f, "{index}"),
            Self::Range(start, stop) => write!(f, "{start}:{stop}"),
            Self::List(indices) => {
                let items: Vec<String> = indices.iter().map(|i| i.to_string()).collect();
                write!(f, "{}", items.join("|"))
            }
        }
    }
}

impl EventSelection {
    /// Resolve the selection against the number of events in a file.
    ///
    /// Returns the on-disk indices in request order. Fails on the first index that does
    /// not exist in the file; nothing is returned in that case.
    pub fn resolve(&self, n_events: usize) -> Result<Vec<usize>, SelectionError> {
        let check = |index: usize| {
            if index >= n_events {
                Err(SelectionError::OutOfRange { index, n_events })
            } else {
                Ok(index)
            }
        };
        match self {
            Self::All => Ok((0..n_events).collect()),
            Self::Single(index) => Ok(vec![check(*index)?]),
            Self::Range(start, stop) => {
                if start > stop {
                    return Err(SelectionError::InvalidRange(*start, *stop));
                }
                if *stop > n_events {
                    check((*start).max(n_events))?;
                }
                Ok((*start..*stop).collect())
            }
            Self::List(indices) => indices.iter().map(|i| check(*i)).collect(),
        }
    }
}
