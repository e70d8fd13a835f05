use serde_json::{Map, Value};

/// Row/column data with an index label per row.
///
/// Cells are JSON values so a single type covers prices, dates and text.
/// The index mirrors what the provider keys rows by (usually a date).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    pub index: Vec<String>,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            index: Vec::new(),
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a row. Short rows are padded with nulls, long rows truncated.
    pub fn push_row(&mut self, index: impl Into<String>, mut row: Vec<Value>) {
        row.resize(self.columns.len(), Value::Null);
        self.index.push(index.into());
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Move the index into a trailing column called `name` and drop it.
    pub fn with_index_column(mut self, name: &str) -> Self {
        self.columns.push(name.to_string());
        for (row, label) in self.rows.iter_mut().zip(self.index.drain(..)) {
            row.push(Value::String(label));
        }
        self
    }
}

/// Structured data returned by a provider call.
#[derive(Clone, Debug, PartialEq)]
pub enum Payload {
    /// Tabular rows, persisted as CSV.
    Table(Table),
    /// Key-value mapping, persisted as JSON.
    Keyed(Map<String, Value>),
    /// Sequence of records (e.g. news items), persisted as JSON.
    List(Vec<Value>),
    /// Any other value. Usable if non-null, but has no storage format.
    Scalar(Value),
}

impl Payload {
    /// Short name of the payload shape, for logs and errors.
    pub fn shape(&self) -> &'static str {
        match self {
            Self::Table(_) => "table",
            Self::Keyed(_) => "keyed",
            Self::List(_) => "list",
            Self::Scalar(_) => "scalar",
        }
    }

    /// Number of rows, entries or items. Scalars count as one unless null.
    pub fn len(&self) -> usize {
        match self {
            Self::Table(table) => table.len(),
            Self::Keyed(map) => map.len(),
            Self::List(items) => items.len(),
            Self::Scalar(Value::Null) => 0,
            Self::Scalar(_) => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Table> for Payload {
    fn from(table: Table) -> Self {
        Payload::Table(table)
    }
}

impl From<Map<String, Value>> for Payload {
    fn from(map: Map<String, Value>) -> Self {
        Payload::Keyed(map)
    }
}

impl From<Vec<Value>> for Payload {
    fn from(items: Vec<Value>) -> Self {
        Payload::List(items)
    }
}
