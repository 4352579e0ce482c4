//! Data loader – reads the CV data file and parses it into a JSON map.
//!
//! No schema is enforced: any structure is legal as long as the template can
//! reference it. The only requirement is an object at the top level.

use std::fs;
use std::path::Path;

use serde_json::{Map, Value};

use crate::error::{CvError, Result};

/// The parsed top-level data mapping.
pub type Document = Map<String, Value>;

/// Load CV data from a JSON file.
///
/// Fails with [`CvError::DataNotFound`] when the path does not exist,
/// [`CvError::DataParse`] when the content is not well-formed JSON, and
/// [`CvError::DataRoot`] when the top level is not an object.
pub fn load_document(path: &Path) -> Result<Document> {
    if !path.exists() {
        return Err(CvError::DataNotFound(path.to_path_buf()));
    }
    let text = fs::read_to_string(path).map_err(|source| CvError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let value: Value = serde_json::from_str(&text).map_err(|source| CvError::DataParse {
        path: path.to_path_buf(),
        source,
    })?;
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(CvError::DataRoot),
    }
}

/// The person's name as found at `personal.name`, if present.
pub fn person_name(data: &Document) -> Option<&str> {
    data.get("personal")?.get("name")?.as_str()
}

/// Derive the default output file name from the data.
///
/// `personal.name` (fallback `cv`) is lower-cased, spaces become
/// underscores, and the result is wrapped as `cv_<slug>.pdf` – so
/// `"Jane Q. Doe"` yields `cv_jane_q._doe.pdf`.
pub fn default_output_name(data: &Document) -> String {
    let name = person_name(data).unwrap_or("cv");
    let slug = name.to_lowercase().replace(' ', "_");
    format!("cv_{slug}.pdf")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn data_from(json: &str) -> Document {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn output_name_from_personal_name() {
        let data = data_from(r#"{"personal": {"name": "Jane Q. Doe"}}"#);
        assert_eq!(default_output_name(&data), "cv_jane_q._doe.pdf");
    }

    #[test]
    fn output_name_without_name_field() {
        let data = data_from(r#"{"work": []}"#);
        assert_eq!(default_output_name(&data), "cv_cv.pdf");
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_document(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, CvError::DataNotFound(_)));
    }

    #[test]
    fn malformed_json_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(b"{not json").unwrap();
        let err = load_document(&path).unwrap_err();
        assert!(matches!(err, CvError::DataParse { .. }));
    }

    #[test]
    fn non_object_root_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("list.json");
        fs::write(&path, "[1, 2, 3]").unwrap();
        let err = load_document(&path).unwrap_err();
        assert!(matches!(err, CvError::DataRoot));
    }

    #[test]
    fn loads_nested_structure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cv.json");
        fs::write(&path, r#"{"personal": {"name": "Ada"}, "skills": ["Rust"]}"#).unwrap();
        let doc = load_document(&path).unwrap();
        assert_eq!(person_name(&doc), Some("Ada"));
        assert_eq!(doc["skills"][0], "Rust");
    }
}
