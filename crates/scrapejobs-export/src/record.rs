//! Result records and the items carried on the export channel.

use std::fmt;

/// A self-describing result with index-aligned headers and values.
pub trait Record: Send {
    /// Column names.
    fn headers(&self) -> Vec<String>;

    /// Column values, one per header.
    fn row(&self) -> Vec<String>;
}

/// Owned record built from explicit headers and values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldRecord {
    headers: Vec<String>,
    values: Vec<String>,
}

impl FieldRecord {
    /// Create a record from headers and values.
    pub fn new<H, V>(headers: H, values: V) -> Self
    where
        H: IntoIterator,
        H::Item: Into<String>,
        V: IntoIterator,
        V::Item: Into<String>,
    {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Create a record from `(header, value)` pairs.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let (headers, values) = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .unzip();
        Self { headers, values }
    }
}

impl Record for FieldRecord {
    fn headers(&self) -> Vec<String> {
        self.headers.clone()
    }

    fn row(&self) -> Vec<String> {
        self.values.clone()
    }
}

/// One item of the result stream.
pub enum ResultData {
    /// A single record.
    Record(Box<dyn Record>),
    /// A batch of items; only `Record` elements are written.
    Collection(Vec<ResultData>),
    /// Any other payload. Fatal when it reaches the writer.
    Unsupported { type_name: String },
}

impl ResultData {
    /// Wrap a single record.
    pub fn record(record: impl Record + 'static) -> Self {
        ResultData::Record(Box::new(record))
    }

    /// Wrap a batch of records.
    pub fn collection<R>(records: impl IntoIterator<Item = R>) -> Self
    where
        R: Record + 'static,
    {
        ResultData::Collection(records.into_iter().map(ResultData::record).collect())
    }

    /// Describe a payload of type `T` that the writer cannot handle.
    pub fn unsupported<T: ?Sized>() -> Self {
        ResultData::Unsupported {
            type_name: std::any::type_name::<T>().to_string(),
        }
    }

    /// Short description of the item's shape.
    pub fn shape(&self) -> String {
        match self {
            ResultData::Record(_) => "record".to_string(),
            ResultData::Collection(items) => format!("collection[{}]", items.len()),
            ResultData::Unsupported { type_name } => type_name.clone(),
        }
    }
}

impl fmt::Debug for ResultData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResultData::Record(record) => f.debug_tuple("Record").field(&record.headers()).finish(),
            ResultData::Collection(items) => f.debug_tuple("Collection").field(items).finish(),
            ResultData::Unsupported { type_name } => f
                .debug_struct("Unsupported")
                .field("type_name", type_name)
                .finish(),
        }
    }
}
