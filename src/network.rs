/// Stream network connectivity.
///
/// A gauge's correction can be carried to the reaches below it. The
/// network is read from a drainage-line export with one row per reach:
///
///   COMID,NextDownID,order_
///   101,201,1
///   301,-1,3        (NextDownID -1 marks an outlet)
///
/// Extra columns are ignored; column order does not matter.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

/// Marker used by the drainage-line tables for "no downstream reach".
pub const OUTLET: i64 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reach {
    pub id: i64,
    pub next_down: i64,
    pub order: u32,
}

#[derive(Debug)]
pub enum NetworkError {
    Io { path: String, source: std::io::Error },
    Parse(String),
    UnknownReach(i64),
    Cycle(i64),
}

impl std::fmt::Display for NetworkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NetworkError::Io { path, source } => write!(f, "I/O error on {}: {}", path, source),
            NetworkError::Parse(msg) => write!(f, "Network parse error: {}", msg),
            NetworkError::UnknownReach(id) => write!(f, "Reach {} is not in the network", id),
            NetworkError::Cycle(id) => write!(f, "Network cycles back through reach {}", id),
        }
    }
}

impl std::error::Error for NetworkError {}

/// Reach lookup keyed by COMID.
#[derive(Debug, Clone, Default)]
pub struct StreamNetwork {
    reaches: HashMap<i64, Reach>,
}

impl StreamNetwork {
    pub fn from_reaches(reaches: impl IntoIterator<Item = Reach>) -> Self {
        Self {
            reaches: reaches.into_iter().map(|r| (r.id, r)).collect(),
        }
    }

    /// Parses a drainage-line CSV.
    pub fn from_csv(text: &str) -> Result<Self, NetworkError> {
        let mut lines = text
            .lines()
            .enumerate()
            .filter(|(_, l)| !l.trim().is_empty() && !l.trim().starts_with('#'));

        let (_, header) = lines
            .next()
            .ok_or_else(|| NetworkError::Parse("No header line found".to_string()))?;
        let headers: Vec<&str> = header.split(',').map(|h| h.trim().trim_matches('"')).collect();
        let column = |name: &str| {
            headers
                .iter()
                .position(|h| *h == name)
                .ok_or_else(|| NetworkError::Parse(format!("Missing {} column", name)))
        };
        let id_col = column("COMID")?;
        let next_col = column("NextDownID")?;
        let order_col = column("order_")?;

        let mut reaches = HashMap::new();
        for (idx, line) in lines {
            let fields: Vec<&str> = line.split(',').map(|f| f.trim().trim_matches('"')).collect();
            let field = |col: usize| {
                fields.get(col).copied().ok_or_else(|| {
                    NetworkError::Parse(format!("line {}: too few columns", idx + 1))
                })
            };
            let int = |col: usize| -> Result<i64, NetworkError> {
                let raw = field(col)?;
                // Some exports write integer ids as floats ("101.0").
                raw.parse::<i64>()
                    .or_else(|_| raw.parse::<f64>().map(|v| v as i64))
                    .map_err(|_| NetworkError::Parse(format!("line {}: bad integer '{}'", idx + 1, raw)))
            };

            let reach = Reach {
                id: int(id_col)?,
                next_down: int(next_col)?,
                order: u32::try_from(int(order_col)?).map_err(|_| {
                    NetworkError::Parse(format!("line {}: negative stream order", idx + 1))
                })?,
            };
            if reaches.insert(reach.id, reach).is_some() {
                return Err(NetworkError::Parse(format!(
                    "line {}: duplicate COMID {}",
                    idx + 1,
                    reach.id
                )));
            }
        }

        Ok(Self { reaches })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, NetworkError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| NetworkError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_csv(&text)
    }

    pub fn len(&self) -> usize {
        self.reaches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reaches.is_empty()
    }

    pub fn reach(&self, id: i64) -> Option<&Reach> {
        self.reaches.get(&id)
    }

    /// Reach ids below `start`, nearest first.
    ///
    /// With `same_order` the walk continues only while the current reach
    /// has the start reach's stream order; the first reach of a different
    /// order is still included, since the walk steps onto it before
    /// checking.
    ///
    /// # Errors
    /// - `UnknownReach` - `start`, or a reach the walk steps onto, is missing.
    /// - `Cycle` - the walk revisits a reach.
    pub fn downstream_ids(&self, start: i64, same_order: bool) -> Result<Vec<i64>, NetworkError> {
        let mut current = self.reach(start).ok_or(NetworkError::UnknownReach(start))?;
        let order = current.order;
        let mut visited = HashSet::from([start]);
        let mut ids = Vec::new();

        while current.next_down != OUTLET && (!same_order || current.order == order) {
            let next = current.next_down;
            if !visited.insert(next) {
                return Err(NetworkError::Cycle(next));
            }
            ids.push(next);
            current = self.reach(next).ok_or(NetworkError::UnknownReach(next))?;
        }

        Ok(ids)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
