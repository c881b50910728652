//! Column-oriented layout of a [`SearchOutput`], keyed by column label.
use std::fmt::{self, Display};
use std::str::FromStr;

use thiserror::Error;

use super::output::SearchOutput;

/// A column of a [`ResultTable`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Column {
    /// Candidate identifiers
    Id,
    /// Candidate distances
    Distance,
    /// The matched candidate peak for the query peak at this 0-based index,
    /// labeled `P{index + 1}`
    Peak(usize),
}

impl Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id => f.write_str("id"),
            Self::Distance => f.write_str("dist"),
            Self::Peak(i) => write!(f, "P{}", i + 1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown result column {0:?}")]
pub struct ColumnParseError(String);

impl FromStr for Column {
    type Err = ColumnParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "id" => Ok(Self::Id),
            "dist" => Ok(Self::Distance),
            _ => s
                .strip_prefix('P')
                .and_then(|n| n.parse::<usize>().ok())
                .and_then(|n| n.checked_sub(1))
                .map(Self::Peak)
                .ok_or_else(|| ColumnParseError(s.to_string())),
        }
    }
}

/// A borrowed view of one column's values
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColumnData<'a> {
    Id(&'a [String]),
    Distance(&'a [f64]),
    /// `None` marks a result that left this query peak unmatched
    Peak(&'a [Option<usize>]),
}

impl ColumnData<'_> {
    pub fn len(&self) -> usize {
        match self {
            Self::Id(v) => v.len(),
            Self::Distance(v) => v.len(),
            Self::Peak(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The ranked results laid out as parallel columns. Row `i` of every column
/// belongs to the `i`-th ranked result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultTable {
    ids: Vec<String>,
    distances: Vec<f64>,
    peaks: Vec<Vec<Option<usize>>>,
}

impl ResultTable {
    pub fn from_output(output: &SearchOutput) -> Self {
        let n_rows = output.len();
        let n_peaks = output.query_peak_count();

        let mut ids = Vec::with_capacity(n_rows);
        let mut distances = Vec::with_capacity(n_rows);
        let mut peaks = vec![Vec::with_capacity(n_rows); n_peaks];

        for result in output {
            ids.push(result.candidate_id().to_string());
            distances.push(result.distance());
            let correspondence = result.correspondence();
            for (qi, column) in peaks.iter_mut().enumerate() {
                column.push(correspondence.get(qi));
            }
        }

        Self {
            ids,
            distances,
            peaks,
        }
    }

    pub fn num_rows(&self) -> usize {
        self.ids.len()
    }

    /// The number of `P` columns
    pub fn num_peak_columns(&self) -> usize {
        self.peaks.len()
    }

    /// All column labels in output order
    pub fn columns(&self) -> impl Iterator<Item = Column> + '_ {
        [Column::Id, Column::Distance]
            .into_iter()
            .chain((0..self.peaks.len()).map(Column::Peak))
    }

    pub fn column(&self, column: Column) -> Option<ColumnData<'_>> {
        match column {
            Column::Id => Some(ColumnData::Id(&self.ids)),
            Column::Distance => Some(ColumnData::Distance(&self.distances)),
            Column::Peak(i) => self.peaks.get(i).map(|v| ColumnData::Peak(v)),
        }
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn distances(&self) -> &[f64] {
        &self.distances
    }

    pub fn peak_column(&self, query_index: usize) -> Option<&[Option<usize>]> {
        self.peaks.get(query_index).map(|v| v.as_slice())
    }
}

#[cfg(feature = "serde")]
mod serialize {
    use serde::ser::{SerializeMap, Serializer};
    use serde::Serialize;

    use super::{Column, ResultTable};

    impl Serialize for ResultTable {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            let mut map = serializer.serialize_map(Some(2 + self.peaks.len()))?;
            map.serialize_entry(&Column::Id.to_string(), &self.ids)?;
            map.serialize_entry(&Column::Distance.to_string(), &self.distances)?;
            for (i, column) in self.peaks.iter().enumerate() {
                map.serialize_entry(&Column::Peak(i).to_string(), column)?;
            }
            map.end()
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::align::Alignment;
    use crate::search::output::MatchResult;

    fn output() -> SearchOutput {
        SearchOutput::ranked(
            3,
            vec![
                MatchResult::new(
                    "b".into(),
                    0.3,
                    Alignment::from_pairs(vec![Some(0), None, None]),
                ),
                MatchResult::new(
                    "a".into(),
                    0.1,
                    Alignment::from_pairs(vec![Some(2), Some(0), None]),
                ),
            ],
        )
    }

    #[test]
    fn test_columns_parallel() {
        let table = output().to_table();
        assert_eq!(table.num_rows(), 2);
        assert_eq!(table.num_peak_columns(), 3);

        let labels: Vec<String> = table.columns().map(|c| c.to_string()).collect();
        assert_eq!(labels, ["id", "dist", "P1", "P2", "P3"]);
        for col in table.columns() {
            assert_eq!(table.column(col).unwrap().len(), table.num_rows());
        }

        assert_eq!(table.ids(), ["a", "b"]);
        assert_eq!(table.peak_column(0).unwrap(), &[Some(2), Some(0)]);
        assert_eq!(table.peak_column(2).unwrap(), &[None, None]);
        assert!(table.column(Column::Peak(3)).is_none());
    }

    #[test]
    fn test_empty_output_keeps_peak_columns() {
        let table = SearchOutput::ranked(2, Vec::new()).to_table();
        assert_eq!(table.num_rows(), 0);
        assert_eq!(table.columns().count(), 4);
        assert!(table.column(Column::Peak(1)).unwrap().is_empty());
    }

    #[test]
    fn test_column_labels() {
        assert_eq!("P1".parse::<Column>().unwrap(), Column::Peak(0));
        assert_eq!("dist".parse::<Column>().unwrap(), Column::Distance);
        assert!("P0".parse::<Column>().is_err());
        assert!("mz".parse::<Column>().is_err());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serialize() {
        let value = serde_json::to_value(output().to_table()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "id": ["a", "b"],
                "dist": [0.1, 0.3],
                "P1": [2, 0],
                "P2": [0, null],
                "P3": [null, null],
            })
        );
    }
}
