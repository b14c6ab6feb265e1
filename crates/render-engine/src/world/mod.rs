//! In-memory Typst world for document export
//!
//! One world per export: a single main source plus `sys.inputs` built
//! from JSON. No filesystem or package access.

pub mod fonts;

use chrono::{DateTime, Datelike, Timelike, Utc};
use typst::diag::{FileError, FileResult};
use typst::foundations::{Array, Bytes, Datetime, Dict, Value};
use typst::syntax::{FileId, Source, VirtualPath};
use typst::text::{Font, FontBook};
use typst::utils::LazyHash;
use typst::{Library, World};

use fonts::{global_font_cache, FontCache};

const MAIN_PATH: &str = "/main.typ";

pub struct ExportWorld {
    main: Source,
    font_cache: &'static FontCache,
    /// Fixed at creation so one export sees one date
    time: DateTime<Utc>,
    library: LazyHash<Library>,
}

impl ExportWorld {
    /// World compiling `source` with `inputs` exposed as `sys.inputs`
    pub fn new(source: &str, inputs: &serde_json::Map<String, serde_json::Value>) -> Self {
        let id = FileId::new(None, VirtualPath::new(MAIN_PATH));

        let mut dict = Dict::new();
        for (key, value) in inputs {
            dict.insert(key.as_str().into(), json_to_value(value));
        }

        Self {
            main: Source::new(id, source.to_string()),
            font_cache: global_font_cache(),
            time: Utc::now(),
            library: LazyHash::new(Library::builder().with_inputs(dict).build()),
        }
    }
}

/// Convert a JSON value to a Typst value
fn json_to_value(json: &serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::None,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => Value::Float(n.as_f64().unwrap_or_default()),
        },
        serde_json::Value::String(s) => Value::Str(s.as_str().into()),
        serde_json::Value::Array(items) => {
            let items: Vec<Value> = items.iter().map(json_to_value).collect();
            Value::Array(Array::from(items.as_slice()))
        }
        serde_json::Value::Object(obj) => {
            let mut dict = Dict::new();
            for (k, v) in obj {
                dict.insert(k.as_str().into(), json_to_value(v));
            }
            Value::Dict(dict)
        }
    }
}

impl World for ExportWorld {
    fn library(&self) -> &LazyHash<Library> {
        &self.library
    }

    fn book(&self) -> &LazyHash<FontBook> {
        self.font_cache.book()
    }

    fn main(&self) -> FileId {
        self.main.id()
    }

    fn source(&self, id: FileId) -> FileResult<Source> {
        if id == self.main.id() {
            Ok(self.main.clone())
        } else {
            Err(FileError::NotFound(id.vpath().as_rootless_path().into()))
        }
    }

    fn file(&self, id: FileId) -> FileResult<Bytes> {
        Err(FileError::NotFound(id.vpath().as_rootless_path().into()))
    }

    fn font(&self, index: usize) -> Option<Font> {
        self.font_cache.font(index)
    }

    fn today(&self, offset: Option<i64>) -> Option<Datetime> {
        let adjusted = self.time + chrono::Duration::hours(offset.unwrap_or(0));
        Datetime::from_ymd_hms(
            adjusted.year(),
            adjusted.month() as u8,
            adjusted.day() as u8,
            adjusted.hour() as u8,
            adjusted.minute() as u8,
            adjusted.second() as u8,
        )
    }
}
